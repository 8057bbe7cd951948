use super::ids::{BookingRequestId, RoomId, UserId};
use super::money::MinorUnits;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const PAYMENT_TYPE_TOKEN: &str = "room_booking_token";
pub const TOKEN_DESCRIPTION: &str = "Room Booking Token";

/// Note keys binding an order to the booking that created it.
pub const NOTE_BOOKING_REQUEST_ID: &str = "booking_request_id";
pub const NOTE_ROOM_ID: &str = "room_id";
pub const NOTE_USER_ID: &str = "user_id";
pub const NOTE_PAYMENT_TYPE: &str = "payment_type";
pub const NOTE_DESCRIPTION: &str = "description";

/// An order to be created at the payment gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub amount: MinorUnits,
    pub currency: String,
    pub receipt: String,
    pub notes: BTreeMap<String, String>,
}

impl OrderRequest {
    /// Builds the token order for a booking request.
    pub fn token(
        amount: MinorUnits,
        currency: &str,
        booking_request_id: BookingRequestId,
        room_id: RoomId,
        user_id: &UserId,
        issued_at_millis: i64,
    ) -> Self {
        let notes = BTreeMap::from([
            (NOTE_BOOKING_REQUEST_ID.to_string(), booking_request_id.to_string()),
            (NOTE_ROOM_ID.to_string(), room_id.to_string()),
            (NOTE_USER_ID.to_string(), user_id.to_string()),
            (NOTE_PAYMENT_TYPE.to_string(), PAYMENT_TYPE_TOKEN.to_string()),
            (NOTE_DESCRIPTION.to_string(), TOKEN_DESCRIPTION.to_string()),
        ]);
        Self {
            amount,
            currency: currency.to_string(),
            receipt: format!("token_{booking_request_id}_{issued_at_millis}"),
            notes,
        }
    }
}

/// An order accepted by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedOrder {
    pub order_id: String,
    /// Public key id the client needs to open the hosted payment UI.
    pub key_id: String,
    pub amount: MinorUnits,
    pub currency: String,
}

/// Settlement state of a payment as reported by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub id: String,
    pub order_id: String,
    pub status: String,
    #[serde(default)]
    pub notes: BTreeMap<String, String>,
}

impl PaymentRecord {
    /// A payment counts once the gateway has captured or authorized it.
    pub fn is_successful(&self) -> bool {
        matches!(self.status.as_str(), "captured" | "authorized")
    }

    /// True when the notes name a booking request other than `expected`.
    pub fn is_bound_elsewhere(&self, expected: BookingRequestId) -> bool {
        self.notes
            .get(NOTE_BOOKING_REQUEST_ID)
            .is_some_and(|bound| *bound != expected.to_string())
    }
}

/// What the client receives after a successful `create_order`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderTicket {
    pub order_id: String,
    pub key_id: String,
    pub amount: MinorUnits,
    pub currency: String,
}

impl From<CreatedOrder> for OrderTicket {
    fn from(order: CreatedOrder) -> Self {
        Self {
            order_id: order.order_id,
            key_id: order.key_id,
            amount: order.amount,
            currency: order.currency,
        }
    }
}

/// Success callback delivered by the hosted payment UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentCallback {
    pub payment_id: String,
    pub order_id: String,
    pub signature: String,
}

/// Why a payment attempt ended without a success callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum PaymentAbort {
    Cancelled,
    Failed { detail: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_order_binds_booking() {
        let booking = BookingRequestId::new();
        let room = RoomId::new();
        let order = OrderRequest::token(
            MinorUnits(1_200_000),
            "INR",
            booking,
            room,
            &UserId::new("renter-1"),
            1_700_000_000_000,
        );

        assert_eq!(order.receipt, format!("token_{booking}_1700000000000"));
        assert_eq!(order.notes[NOTE_BOOKING_REQUEST_ID], booking.to_string());
        assert_eq!(order.notes[NOTE_ROOM_ID], room.to_string());
        assert_eq!(order.notes[NOTE_USER_ID], "renter-1");
        assert_eq!(order.notes[NOTE_PAYMENT_TYPE], PAYMENT_TYPE_TOKEN);
    }

    #[test]
    fn test_payment_success_statuses() {
        let mut record = PaymentRecord {
            id: "pay_1".to_string(),
            order_id: "order_1".to_string(),
            status: "captured".to_string(),
            notes: BTreeMap::new(),
        };
        assert!(record.is_successful());
        record.status = "authorized".to_string();
        assert!(record.is_successful());
        for status in ["created", "failed", "refunded", ""] {
            record.status = status.to_string();
            assert!(!record.is_successful());
        }
    }

    #[test]
    fn test_unbound_payment_is_not_elsewhere() {
        let mut record = PaymentRecord {
            id: "pay_1".to_string(),
            order_id: "order_1".to_string(),
            status: "captured".to_string(),
            notes: BTreeMap::new(),
        };
        let booking = BookingRequestId::new();
        assert!(!record.is_bound_elsewhere(booking));

        record
            .notes
            .insert(NOTE_BOOKING_REQUEST_ID.to_string(), booking.to_string());
        assert!(!record.is_bound_elsewhere(booking));
        assert!(record.is_bound_elsewhere(BookingRequestId::new()));
    }
}
