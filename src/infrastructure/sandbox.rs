use crate::domain::payment::{CreatedOrder, OrderRequest, PaymentCallback, PaymentRecord};
use crate::domain::ports::PaymentGateway;
use crate::error::{ConfigError, GatewayError};
use crate::infrastructure::signature::SignatureVerifier;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct Ledger {
    orders: HashMap<String, OrderRequest>,
    payments: HashMap<String, PaymentRecord>,
    unavailable: bool,
}

/// In-memory stand-in for the payment gateway.
///
/// Issues order and payment ids, signs success callbacks with the same secret
/// the service verifies against, and lets a caller script the settlement
/// status of each payment. Clones share one ledger.
#[derive(Clone)]
pub struct SandboxGateway {
    key_id: String,
    signer: SignatureVerifier,
    ledger: Arc<RwLock<Ledger>>,
}

impl SandboxGateway {
    pub fn new(key_id: impl Into<String>, key_secret: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            key_id: key_id.into(),
            signer: SignatureVerifier::new(key_secret)?,
            ledger: Arc::default(),
        })
    }

    /// Simulates the renter completing checkout for `order_id`; the payment
    /// settles with `status` and the signed callback is returned.
    pub async fn pay(&self, order_id: &str, status: &str) -> Result<PaymentCallback, GatewayError> {
        let mut ledger = self.ledger.write().await;
        let order = ledger.orders.get(order_id).ok_or_else(|| GatewayError::Rejected {
            status: 400,
            body: format!("unknown order {order_id}"),
        })?;
        let payment_id = format!("pay_{}", Uuid::new_v4().simple());
        let record = PaymentRecord {
            id: payment_id.clone(),
            order_id: order_id.to_string(),
            status: status.to_string(),
            notes: order.notes.clone(),
        };
        ledger.payments.insert(payment_id.clone(), record);
        Ok(PaymentCallback {
            signature: self.signer.sign(order_id, &payment_id),
            payment_id,
            order_id: order_id.to_string(),
        })
    }

    /// Makes every subsequent call fail as if the gateway were down.
    pub async fn set_unavailable(&self, unavailable: bool) {
        self.ledger.write().await.unavailable = unavailable;
    }

    pub async fn order(&self, order_id: &str) -> Option<OrderRequest> {
        self.ledger.read().await.orders.get(order_id).cloned()
    }

    pub async fn order_count(&self) -> usize {
        self.ledger.read().await.orders.len()
    }
}

#[async_trait]
impl PaymentGateway for SandboxGateway {
    async fn create_order(&self, order: OrderRequest) -> Result<CreatedOrder, GatewayError> {
        let mut ledger = self.ledger.write().await;
        if ledger.unavailable {
            return Err(GatewayError::Unavailable("sandbox offline".to_string()));
        }
        let order_id = format!("order_{}", Uuid::new_v4().simple());
        let created = CreatedOrder {
            order_id: order_id.clone(),
            key_id: self.key_id.clone(),
            amount: order.amount,
            currency: order.currency.clone(),
        };
        ledger.orders.insert(order_id, order);
        Ok(created)
    }

    async fn fetch_payment(&self, payment_id: &str) -> Result<PaymentRecord, GatewayError> {
        let ledger = self.ledger.read().await;
        if ledger.unavailable {
            return Err(GatewayError::Unavailable("sandbox offline".to_string()));
        }
        ledger
            .payments
            .get(payment_id)
            .cloned()
            .ok_or_else(|| GatewayError::PaymentNotFound(payment_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ids::{BookingRequestId, RoomId, UserId};
    use crate::domain::money::MinorUnits;

    fn order() -> OrderRequest {
        OrderRequest::token(
            MinorUnits(50_000),
            "INR",
            BookingRequestId::new(),
            RoomId::new(),
            &UserId::new("renter"),
            0,
        )
    }

    #[tokio::test]
    async fn test_pay_produces_verifiable_callback() {
        let gateway = SandboxGateway::new("rzp_test_key", "secret").unwrap();
        let created = gateway.create_order(order()).await.unwrap();
        assert_eq!(created.key_id, "rzp_test_key");
        assert_eq!(created.amount, MinorUnits(50_000));

        let callback = gateway.pay(&created.order_id, "captured").await.unwrap();
        let verifier = SignatureVerifier::new("secret").unwrap();
        assert!(verifier.verify(&callback.order_id, &callback.payment_id, &callback.signature));

        let record = gateway.fetch_payment(&callback.payment_id).await.unwrap();
        assert_eq!(record.order_id, created.order_id);
        assert_eq!(record.status, "captured");
    }

    #[tokio::test]
    async fn test_unknown_payment_and_outage() {
        let gateway = SandboxGateway::new("key", "secret").unwrap();
        assert_eq!(
            gateway.fetch_payment("pay_missing").await,
            Err(GatewayError::PaymentNotFound("pay_missing".to_string()))
        );

        gateway.set_unavailable(true).await;
        assert!(matches!(
            gateway.create_order(order()).await,
            Err(GatewayError::Unavailable(_))
        ));
        assert_eq!(gateway.order_count().await, 0);
    }
}
