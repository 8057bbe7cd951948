use super::ids::{RoomId, UserId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A bookable room.
///
/// `available` and `booking` are shared state across every renter's session;
/// they only change through the store's lock and rollback primitives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub owner_id: UserId,
    pub title: String,
    pub monthly_price: Decimal,
    pub available: bool,
    pub booking: bool,
}

impl Room {
    pub fn new(id: RoomId, owner_id: UserId, title: impl Into<String>, monthly_price: Decimal) -> Self {
        Self {
            id,
            owner_id,
            title: title.into(),
            monthly_price,
            available: true,
            booking: false,
        }
    }

    pub fn is_locked(&self) -> bool {
        !self.available && self.booking
    }
}
