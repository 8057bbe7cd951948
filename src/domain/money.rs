use crate::error::ReservationError;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Currency of every token order.
pub const CURRENCY_INR: &str = "INR";

/// Represents a positive monetary amount in major units (rupees).
///
/// Token fees are always strictly positive; a zero or negative fee is a data
/// problem on the room or booking request and is rejected up front.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self, ReservationError> {
        if value > Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(ReservationError::BadRequest(
                "Invalid token amount".to_string(),
            ))
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Converts to the gateway's minor units (paise), rounding half away from zero.
    pub fn to_minor_units(&self) -> Result<MinorUnits, ReservationError> {
        self.0
            .checked_mul(Decimal::ONE_HUNDRED)
            .ok_or_else(|| ReservationError::BadRequest("Invalid token amount".to_string()))?
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_u64()
            .map(MinorUnits)
            .ok_or_else(|| ReservationError::BadRequest("Invalid token amount".to_string()))
    }
}

/// An amount expressed in the currency's smallest unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MinorUnits(pub u64);

impl MinorUnits {
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for MinorUnits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
