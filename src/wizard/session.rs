use super::WizardError;
use super::step::{WizardEvent, WizardStep, transition};
use crate::application::dashboard::resume_step;
use crate::application::reservation::{BookingProgress, ReservationApi};
use crate::domain::booking::{BookingRequest, MIN_STAY_MONTHS, RenterCategory, STAY_OPTIONS, Stage};
use crate::domain::ids::{RoomId, UserId};
use crate::domain::payment::{OrderTicket, PaymentAbort, PaymentCallback};
use crate::error::ReservationError;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use std::sync::Arc;
use tracing::{info, warn};

/// How the hosted payment UI ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentOutcome {
    Completed(PaymentCallback),
    Cancelled,
    Failed { reason: String },
}

/// The gateway's hosted checkout, opened for one order.
#[async_trait]
pub trait PaymentSheet: Send + Sync {
    async fn present(&self, ticket: &OrderTicket) -> PaymentOutcome;
}

/// What the renter should do after a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Remediation {
    /// Money may have moved but the room went to someone else.
    Refund,
    Retry,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    Cancelled,
    GatewayRejected(String),
    RoomTaken,
    PaymentNotSuccessful { status: String },
    Other(String),
}

impl FailureReason {
    pub fn message(&self) -> String {
        match self {
            FailureReason::Cancelled => "Payment cancelled by you".to_string(),
            FailureReason::GatewayRejected(detail) => {
                format!("The payment gateway rejected the payment: {detail}")
            }
            FailureReason::RoomTaken => {
                "This room was just booked by someone else. Any amount debited will be refunded."
                    .to_string()
            }
            FailureReason::PaymentNotSuccessful { status } => {
                format!("Payment was not successful (status: {status})")
            }
            FailureReason::Other(detail) => format!("Something went wrong: {detail}"),
        }
    }

    pub fn remediation(&self) -> Remediation {
        match self {
            FailureReason::RoomTaken => Remediation::Refund,
            _ => Remediation::Retry,
        }
    }
}

impl From<&ReservationError> for FailureReason {
    fn from(err: &ReservationError) -> Self {
        match err {
            ReservationError::RoomNoLongerAvailable => FailureReason::RoomTaken,
            ReservationError::PaymentNotSuccessful { status } => {
                FailureReason::PaymentNotSuccessful {
                    status: status.clone(),
                }
            }
            ReservationError::GatewayUnavailable(detail) | ReservationError::BadGateway(detail) => {
                FailureReason::GatewayRejected(detail.clone())
            }
            other => FailureReason::Other(other.to_string()),
        }
    }
}

/// One renter's pass through the booking wizard for one room.
///
/// The booking request is created when the session opens and every later
/// step updates it in place; a retry after a failed payment reuses it.
pub struct BookingWizard {
    api: Arc<dyn ReservationApi>,
    sheet: Arc<dyn PaymentSheet>,
    caller: UserId,
    request: BookingRequest,
    step: WizardStep,
    category: Option<RenterCategory>,
    qualifier: String,
    stay_months: Option<u8>,
    failure: Option<FailureReason>,
}

impl BookingWizard {
    pub async fn open(
        api: Arc<dyn ReservationApi>,
        sheet: Arc<dyn PaymentSheet>,
        room_id: RoomId,
        caller: UserId,
    ) -> Result<Self, WizardError> {
        let request = api.open_booking_request(room_id, &caller).await?;
        Ok(Self {
            api,
            sheet,
            caller,
            request,
            step: WizardStep::UserType,
            category: None,
            qualifier: String::new(),
            stay_months: None,
            failure: None,
        })
    }

    /// Reopens an existing request where its dashboard banner points.
    pub fn resume(
        api: Arc<dyn ReservationApi>,
        sheet: Arc<dyn PaymentSheet>,
        request: BookingRequest,
        caller: UserId,
        now: DateTime<Utc>,
    ) -> Result<Self, WizardError> {
        if !request.is_owned_by(&caller) {
            return Err(ReservationError::Forbidden.into());
        }
        if request.token_paid {
            return Err(ReservationError::Conflict("Token already paid".to_string()).into());
        }
        Ok(Self {
            step: resume_step(&request, now),
            category: request.category,
            qualifier: request.qualifier.clone().unwrap_or_default(),
            stay_months: request.stay_months,
            failure: None,
            api,
            sheet,
            caller,
            request,
        })
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn request(&self) -> &BookingRequest {
        &self.request
    }

    pub fn failure(&self) -> Option<&FailureReason> {
        self.failure.as_ref()
    }

    pub fn stay_months(&self) -> Option<u8> {
        self.stay_months
    }

    fn fire(&mut self, event: WizardEvent) -> Result<WizardStep, WizardError> {
        let next = transition(self.step, event).ok_or(WizardError::IllegalTransition {
            step: self.step,
            event,
        })?;
        self.step = next;
        Ok(next)
    }

    fn expect_step(&self, expected: WizardStep, event: WizardEvent) -> Result<(), WizardError> {
        if self.step == expected {
            Ok(())
        } else {
            Err(WizardError::IllegalTransition {
                step: self.step,
                event,
            })
        }
    }

    pub fn choose_category(&mut self, category: RenterCategory) -> Result<(), WizardError> {
        self.expect_step(WizardStep::UserType, WizardEvent::CategoryChosen)?;
        self.category = Some(category);
        Ok(())
    }

    pub fn set_qualifier(&mut self, qualifier: impl Into<String>) -> Result<(), WizardError> {
        self.expect_step(WizardStep::Details, WizardEvent::DetailsEntered)?;
        self.qualifier = qualifier.into();
        Ok(())
    }

    /// Advances past the user-type, details and token-confirm steps.
    pub fn next(&mut self) -> Result<WizardStep, WizardError> {
        match self.step {
            WizardStep::UserType => {
                if self.category.is_none() {
                    return Err(WizardError::Input("Please select an option".to_string()));
                }
                self.fire(WizardEvent::CategoryChosen)
            }
            WizardStep::Details => {
                if self.qualifier.trim().is_empty() {
                    return Err(WizardError::Input("Please fill in the details".to_string()));
                }
                self.fire(WizardEvent::DetailsEntered)
            }
            WizardStep::TokenConfirm => self.fire(WizardEvent::TokenAccepted),
            step => Err(WizardError::IllegalTransition {
                step,
                event: WizardEvent::TokenAccepted,
            }),
        }
    }

    pub fn choose_duration(&mut self, months: u8) -> Result<(), WizardError> {
        self.expect_step(WizardStep::Duration, WizardEvent::DurationChosen { months })?;
        if !STAY_OPTIONS.contains(&months) {
            return Err(WizardError::Input(format!(
                "Choose one of {STAY_OPTIONS:?} months"
            )));
        }
        self.stay_months = Some(months);
        Ok(())
    }

    /// Records the classification answers and applies the minimum stay
    /// policy.
    pub async fn continue_from_duration(&mut self) -> Result<WizardStep, WizardError> {
        let months = self
            .stay_months
            .ok_or_else(|| WizardError::Input("Please select a duration".to_string()))?;
        let event = WizardEvent::DurationChosen { months };
        self.expect_step(WizardStep::Duration, event)?;

        let stage = if months < MIN_STAY_MONTHS {
            Stage::NotEligible
        } else {
            Stage::TokenPending
        };
        let progress = BookingProgress {
            category: self.category,
            qualifier: Some(self.qualifier.clone()),
            stay_months: Some(months),
            stage: Some(stage),
        };
        self.request = self
            .api
            .save_progress(self.request.id, &self.caller, progress)
            .await?;
        self.fire(event)
    }

    pub fn change_duration(&mut self) -> Result<WizardStep, WizardError> {
        let next = self.fire(WizardEvent::ChangeDuration)?;
        self.stay_months = None;
        Ok(next)
    }

    pub async fn schedule_drop(
        &mut self,
        date: NaiveDate,
        time: Option<NaiveTime>,
    ) -> Result<WizardStep, WizardError> {
        self.expect_step(WizardStep::DropSchedule, WizardEvent::DropScheduled)?;
        self.request = self
            .api
            .schedule_drop(self.request.id, &self.caller, date, time)
            .await?;
        self.fire(WizardEvent::DropScheduled)
    }

    /// Creates the order, opens the payment sheet and verifies the result.
    /// Ends at `success` or `failed`.
    pub async fn pay(&mut self) -> Result<WizardStep, WizardError> {
        self.fire(WizardEvent::Pay)?;
        self.run_payment().await
    }

    /// Tries the payment again on the same booking request.
    pub async fn retry(&mut self) -> Result<WizardStep, WizardError> {
        self.fire(WizardEvent::Retry)?;
        self.failure = None;
        self.run_payment().await
    }

    pub fn back(&mut self) -> Result<WizardStep, WizardError> {
        self.fire(WizardEvent::Back)
    }

    /// Ends the session, handing back the last known state of the request.
    pub fn close(self) -> BookingRequest {
        self.request
    }

    async fn run_payment(&mut self) -> Result<WizardStep, WizardError> {
        let id = self.request.id;
        let room_id = self.request.room_id;

        let ticket = match self.api.create_order(id, room_id, &self.caller).await {
            Ok(ticket) => ticket,
            Err(e) => return self.fail(FailureReason::from(&e)).await,
        };

        match self.sheet.present(&ticket).await {
            PaymentOutcome::Completed(callback) => {
                match self
                    .api
                    .verify_payment(id, room_id, &callback, &self.caller)
                    .await
                {
                    Ok(()) => {
                        info!(booking_request_id = %id, "booking confirmed");
                        self.refresh().await;
                        self.fire(WizardEvent::PaymentVerified)
                    }
                    Err(e) => self.fail(FailureReason::from(&e)).await,
                }
            }
            PaymentOutcome::Cancelled => {
                self.report_abort(PaymentAbort::Cancelled).await;
                self.fail(FailureReason::Cancelled).await
            }
            PaymentOutcome::Failed { reason } => {
                self.report_abort(PaymentAbort::Failed {
                    detail: reason.clone(),
                })
                .await;
                self.fail(FailureReason::GatewayRejected(reason)).await
            }
        }
    }

    async fn fail(&mut self, reason: FailureReason) -> Result<WizardStep, WizardError> {
        warn!(booking_request_id = %self.request.id, reason = %reason.message(), "payment failed");
        self.failure = Some(reason);
        self.refresh().await;
        self.fire(WizardEvent::PaymentFailed)
    }

    async fn report_abort(&mut self, abort: PaymentAbort) {
        match self
            .api
            .report_payment_abort(self.request.id, &self.caller, abort)
            .await
        {
            Ok(request) => self.request = request,
            Err(e) => warn!(error = %e, "could not record payment abort"),
        }
    }

    async fn refresh(&mut self) {
        match self.api.booking_request(self.request.id, &self.caller).await {
            Ok(request) => self.request = request,
            Err(e) => warn!(error = %e, "could not refresh booking request"),
        }
    }
}
