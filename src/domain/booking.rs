use super::ids::{BookingRequestId, RoomId, UserId};
use super::room::Room;
use crate::error::ReservationError;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Shortest stay, in months, that may proceed to the token payment.
pub const MIN_STAY_MONTHS: u8 = 6;

/// Stay durations offered by the booking wizard.
pub const STAY_OPTIONS: [u8; 4] = [3, 6, 9, 12];

/// Protocol stage of a booking request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Initiated,
    NotEligible,
    TokenPending,
    Confirmed,
    PaymentFailed,
    PaymentCancelled,
}

impl Stage {
    /// Coarse external status mirrored from the stage.
    pub fn status(self) -> BookingStatus {
        match self {
            Stage::Initiated | Stage::TokenPending => BookingStatus::Initiated,
            Stage::NotEligible => BookingStatus::NotEligible,
            Stage::Confirmed => BookingStatus::Approved,
            Stage::PaymentFailed => BookingStatus::PaymentFailed,
            Stage::PaymentCancelled => BookingStatus::PaymentCancelled,
        }
    }

    pub fn is_terminal(self) -> bool {
        self == Stage::Confirmed
    }

    /// Transition table for stage changes requested by the wizard.
    ///
    /// Confirmation is not listed here: it is driven by a verified payment and
    /// goes through [`BookingRequest::confirm`].
    pub fn can_transition_to(self, next: Stage) -> bool {
        use Stage::*;
        matches!(
            (self, next),
            (Initiated, Initiated | NotEligible | TokenPending)
                | (NotEligible, Initiated | NotEligible | TokenPending)
                | (
                    TokenPending,
                    TokenPending | NotEligible | PaymentFailed | PaymentCancelled
                )
                | (PaymentFailed | PaymentCancelled, TokenPending)
        )
    }

    /// Whether the drop (move-in visit) may be scheduled at this stage.
    pub fn allows_drop_schedule(self) -> bool {
        matches!(
            self,
            Stage::TokenPending | Stage::PaymentFailed | Stage::PaymentCancelled | Stage::Confirmed
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Initiated => "initiated",
            Stage::NotEligible => "not_eligible",
            Stage::TokenPending => "token_pending",
            Stage::Confirmed => "confirmed",
            Stage::PaymentFailed => "payment_failed",
            Stage::PaymentCancelled => "payment_cancelled",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// External-facing status read by dashboards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Initiated,
    NotEligible,
    Approved,
    PaymentFailed,
    PaymentCancelled,
}

impl BookingStatus {
    /// Statuses for which dashboards show an "in progress" banner.
    pub const ACTIVE: [BookingStatus; 4] = [
        BookingStatus::Initiated,
        BookingStatus::Approved,
        BookingStatus::PaymentCancelled,
        BookingStatus::PaymentFailed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            BookingStatus::Initiated => "initiated",
            BookingStatus::NotEligible => "not_eligible",
            BookingStatus::Approved => "approved",
            BookingStatus::PaymentFailed => "payment_failed",
            BookingStatus::PaymentCancelled => "payment_cancelled",
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenterCategory {
    Student,
    Professional,
}

/// One renter's attempt to reserve one room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingRequest {
    pub id: BookingRequestId,
    pub room_id: RoomId,
    pub renter_id: UserId,
    pub category: Option<RenterCategory>,
    /// Course of study or job role, depending on the category.
    pub qualifier: Option<String>,
    pub stay_months: Option<u8>,
    pub stage: Stage,
    pub token_required: bool,
    pub token_paid: bool,
    /// Token fee in major units, equal to the room's monthly price at creation.
    pub token_amount: Option<Decimal>,
    pub status: BookingStatus,
    pub drop_date: Option<NaiveDate>,
    pub drop_time: Option<NaiveTime>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BookingRequest {
    /// Opens a fresh request in the `initiated` stage for `room`.
    pub fn open(room: &Room, renter_id: UserId, now: DateTime<Utc>) -> Self {
        Self {
            id: BookingRequestId::new(),
            room_id: room.id,
            renter_id,
            category: None,
            qualifier: None,
            stay_months: None,
            stage: Stage::Initiated,
            token_required: false,
            token_paid: false,
            token_amount: Some(room.monthly_price),
            status: BookingStatus::Initiated,
            drop_date: None,
            drop_time: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_owned_by(&self, user: &UserId) -> bool {
        &self.renter_id == user
    }

    /// Moves to `next` if the transition table allows it.
    pub fn advance(&mut self, next: Stage, now: DateTime<Utc>) -> Result<(), ReservationError> {
        if self.token_paid || self.stage.is_terminal() || !self.stage.can_transition_to(next) {
            return Err(ReservationError::Conflict(format!(
                "cannot move booking request from {} to {}",
                self.stage, next
            )));
        }
        self.stage = next;
        self.status = next.status();
        self.token_required = matches!(
            next,
            Stage::TokenPending | Stage::PaymentFailed | Stage::PaymentCancelled
        );
        self.updated_at = now;
        Ok(())
    }

    /// Marks the token as paid. A verified payment confirms the request from
    /// any unpaid stage.
    pub fn confirm(&mut self, now: DateTime<Utc>) -> Result<(), ReservationError> {
        if self.token_paid {
            return Err(ReservationError::Conflict("Token already paid".to_string()));
        }
        self.token_paid = true;
        self.token_required = true;
        self.stage = Stage::Confirmed;
        self.status = BookingStatus::Approved;
        self.updated_at = now;
        Ok(())
    }

    pub fn schedule_drop(
        &mut self,
        date: NaiveDate,
        time: Option<NaiveTime>,
        now: DateTime<Utc>,
    ) -> Result<(), ReservationError> {
        if !self.stage.allows_drop_schedule() {
            return Err(ReservationError::Conflict(format!(
                "drop cannot be scheduled while booking request is {}",
                self.stage
            )));
        }
        self.drop_date = Some(date);
        self.drop_time = time;
        self.updated_at = now;
        Ok(())
    }

    /// Drop date and time combined; a missing time means start of day.
    pub fn drop_at(&self) -> Option<NaiveDateTime> {
        self.drop_date
            .map(|date| date.and_time(self.drop_time.unwrap_or(NaiveTime::MIN)))
    }
}
