use crate::config::GatewayConfig;
use crate::domain::money::MinorUnits;
use crate::domain::payment::{CreatedOrder, OrderRequest, PaymentRecord};
use crate::domain::ports::PaymentGateway;
use crate::error::GatewayError;
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// HTTP adapter for a Razorpay-compatible gateway.
///
/// One request per call with a bounded timeout. Status codes map onto
/// [`GatewayError`]; retrying is left to the caller.
#[derive(Debug, Clone)]
pub struct RazorpayClient {
    http: Client,
    config: GatewayConfig,
}

#[derive(Serialize)]
struct CreateOrderBody<'a> {
    amount: u64,
    currency: &'a str,
    receipt: &'a str,
    payment_capture: u8,
    notes: &'a BTreeMap<String, String>,
}

#[derive(Deserialize)]
struct OrderEntity {
    id: String,
    amount: u64,
    currency: String,
}

#[derive(Deserialize)]
struct PaymentEntity {
    id: String,
    #[serde(default)]
    order_id: Option<String>,
    status: String,
    #[serde(default)]
    notes: serde_json::Value,
}

impl RazorpayClient {
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GatewayError::Unavailable(e.to_string()))?;
        Ok(Self { http, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    async fn read_failure(response: Response) -> GatewayError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if status.is_server_error() {
            GatewayError::Unavailable(format!("{status}: {body}"))
        } else {
            GatewayError::Rejected {
                status: status.as_u16(),
                body,
            }
        }
    }
}

fn transport(err: reqwest::Error) -> GatewayError {
    if err.is_timeout() {
        GatewayError::Unavailable("request timed out".to_string())
    } else {
        GatewayError::Unavailable(err.to_string())
    }
}

/// The gateway sends `notes` as an object, or as `[]` when there are none.
fn notes_map(value: serde_json::Value) -> BTreeMap<String, String> {
    match value {
        serde_json::Value::Object(map) => map
            .into_iter()
            .map(|(k, v)| match v {
                serde_json::Value::String(s) => (k, s),
                other => (k, other.to_string()),
            })
            .collect(),
        _ => BTreeMap::new(),
    }
}

#[async_trait]
impl PaymentGateway for RazorpayClient {
    async fn create_order(&self, order: OrderRequest) -> Result<CreatedOrder, GatewayError> {
        let body = CreateOrderBody {
            amount: order.amount.value(),
            currency: &order.currency,
            receipt: &order.receipt,
            payment_capture: 1,
            notes: &order.notes,
        };
        let response = self
            .http
            .post(self.url("/v1/orders"))
            .basic_auth(&self.config.key_id, Some(&self.config.key_secret))
            .json(&body)
            .send()
            .await
            .map_err(transport)?;

        if !response.status().is_success() {
            let err = Self::read_failure(response).await;
            warn!(error = %err, "order creation failed");
            return Err(err);
        }

        let entity: OrderEntity = response.json().await.map_err(transport)?;
        debug!(order_id = %entity.id, "order created");
        Ok(CreatedOrder {
            order_id: entity.id,
            key_id: self.config.key_id.clone(),
            amount: MinorUnits(entity.amount),
            currency: entity.currency,
        })
    }

    async fn fetch_payment(&self, payment_id: &str) -> Result<PaymentRecord, GatewayError> {
        let response = self
            .http
            .get(self.url(&format!("/v1/payments/{payment_id}")))
            .basic_auth(&self.config.key_id, Some(&self.config.key_secret))
            .send()
            .await
            .map_err(transport)?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(GatewayError::PaymentNotFound(payment_id.to_string()));
        }
        if !response.status().is_success() {
            let err = Self::read_failure(response).await;
            warn!(error = %err, payment_id, "payment fetch failed");
            return Err(err);
        }

        let entity: PaymentEntity = response.json().await.map_err(transport)?;
        Ok(PaymentRecord {
            id: entity.id,
            order_id: entity.order_id.unwrap_or_default(),
            status: entity.status,
            notes: notes_map(entity.notes),
        })
    }
}
