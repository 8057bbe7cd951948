use crate::domain::booking::{BookingRequest, BookingStatus, MIN_STAY_MONTHS, RenterCategory, Stage};
use crate::domain::ids::{BookingRequestId, RoomId, UserId};
use crate::domain::money::{Amount, CURRENCY_INR};
use crate::domain::payment::{OrderRequest, OrderTicket, PaymentAbort, PaymentCallback};
use crate::domain::ports::{BookingRequestStoreBox, PaymentGatewayBox, RoomStoreBox};
use crate::domain::room::Room;
use crate::error::{GatewayError, ReservationError, Result};
use crate::infrastructure::signature::SignatureVerifier;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};

/// Classification answers and the stage the wizard wants to record with them.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingProgress {
    pub category: Option<RenterCategory>,
    pub qualifier: Option<String>,
    pub stay_months: Option<u8>,
    pub stage: Option<Stage>,
}

/// Owns booking requests and runs the token payment protocol.
///
/// Stateless between calls: every operation loads what it needs from the
/// stores, and concurrent verifications are arbitrated solely by
/// [`RoomStore::try_lock`](crate::domain::ports::RoomStore::try_lock).
pub struct ReservationService {
    bookings: BookingRequestStoreBox,
    rooms: RoomStoreBox,
    gateway: PaymentGatewayBox,
    verifier: SignatureVerifier,
}

impl ReservationService {
    pub fn new(
        bookings: BookingRequestStoreBox,
        rooms: RoomStoreBox,
        gateway: PaymentGatewayBox,
        verifier: SignatureVerifier,
    ) -> Self {
        Self {
            bookings,
            rooms,
            gateway,
            verifier,
        }
    }

    /// Creates the booking request for a freshly opened wizard session.
    #[instrument(skip_all, fields(room_id = %room_id, renter = %caller))]
    pub async fn open_booking_request(
        &self,
        room_id: RoomId,
        caller: &UserId,
    ) -> Result<BookingRequest> {
        let room = self
            .rooms
            .get(room_id)
            .await?
            .ok_or(ReservationError::NotFound)?;
        let request = BookingRequest::open(&room, caller.clone(), Utc::now());
        self.bookings.insert(request.clone()).await?;
        info!(booking_request_id = %request.id, "booking request opened");
        Ok(request)
    }

    /// Records classification answers and the wizard's stage decision.
    #[instrument(skip_all, fields(booking_request_id = %id))]
    pub async fn save_progress(
        &self,
        id: BookingRequestId,
        caller: &UserId,
        progress: BookingProgress,
    ) -> Result<BookingRequest> {
        let mut request = self.load_owned(id, None, caller).await?;
        if request.token_paid {
            return Err(ReservationError::Conflict("Token already paid".to_string()));
        }

        let stay_months = progress.stay_months.or(request.stay_months);
        if stay_months == Some(0) {
            return Err(ReservationError::BadRequest(
                "stay duration must be at least one month".to_string(),
            ));
        }
        if let Some(stage) = progress.stage {
            match stage {
                Stage::Initiated | Stage::NotEligible => {}
                Stage::TokenPending => {
                    if stay_months.is_none_or(|m| m < MIN_STAY_MONTHS) {
                        return Err(ReservationError::BadRequest(format!(
                            "minimum stay is {MIN_STAY_MONTHS} months"
                        )));
                    }
                }
                other => {
                    return Err(ReservationError::BadRequest(format!(
                        "stage {other} cannot be set directly"
                    )));
                }
            }
            request.advance(stage, Utc::now())?;
        }

        if progress.category.is_some() {
            request.category = progress.category;
        }
        if let Some(qualifier) = progress.qualifier {
            let qualifier = qualifier.trim();
            request.qualifier = (!qualifier.is_empty()).then(|| qualifier.to_string());
        }
        request.stay_months = stay_months;
        request.updated_at = Utc::now();

        self.bookings.update(request.clone()).await?;
        Ok(request)
    }

    #[instrument(skip_all, fields(booking_request_id = %id, drop_date = %date))]
    pub async fn schedule_drop(
        &self,
        id: BookingRequestId,
        caller: &UserId,
        date: NaiveDate,
        time: Option<NaiveTime>,
    ) -> Result<BookingRequest> {
        let mut request = self.load_owned(id, None, caller).await?;
        request.schedule_drop(date, time, Utc::now())?;
        self.bookings.update(request.clone()).await?;
        info!("drop scheduled");
        Ok(request)
    }

    /// Creates a gateway order for the token fee. Never touches the room.
    #[instrument(skip_all, fields(booking_request_id = %id, room_id = %room_id))]
    pub async fn create_order(
        &self,
        id: BookingRequestId,
        room_id: RoomId,
        caller: &UserId,
    ) -> Result<OrderTicket> {
        let mut request = self.load_owned(id, Some(room_id), caller).await?;
        if request.token_paid {
            return Err(ReservationError::Conflict("Token already paid".to_string()));
        }

        let amount = match request.token_amount {
            Some(amount) => amount,
            None => {
                self.rooms
                    .get(room_id)
                    .await?
                    .ok_or_else(|| ReservationError::BadRequest("room not found".to_string()))?
                    .monthly_price
            }
        };
        let minor_units = Amount::new(amount)?.to_minor_units()?;

        let order = OrderRequest::token(
            minor_units,
            CURRENCY_INR,
            id,
            room_id,
            caller,
            Utc::now().timestamp_millis(),
        );
        let created = self.gateway.create_order(order).await.map_err(|e| {
            warn!(error = %e, "gateway refused order");
            match e {
                GatewayError::Rejected { .. } | GatewayError::PaymentNotFound(_) => {
                    ReservationError::BadGateway(e.to_string())
                }
                GatewayError::Unavailable(_) => ReservationError::GatewayUnavailable(e.to_string()),
            }
        })?;

        // A retry from payment_failed/payment_cancelled re-enters token_pending here.
        // The order already exists, so a failed stage write only gets logged.
        request.advance(Stage::TokenPending, Utc::now())?;
        if let Err(e) = self.bookings.update(request).await {
            error!(error = %e, "could not record token_pending stage");
        }

        info!(order_id = %created.order_id, amount = %created.amount, "token order created");
        Ok(created.into())
    }

    /// Verifies a reported payment and, if genuine, locks the room for the
    /// caller.
    #[instrument(
        skip_all,
        fields(booking_request_id = %id, room_id = %room_id, order_id = %callback.order_id)
    )]
    pub async fn verify_payment(
        &self,
        id: BookingRequestId,
        room_id: RoomId,
        callback: &PaymentCallback,
        caller: &UserId,
    ) -> Result<()> {
        let mut request = self.load_owned(id, Some(room_id), caller).await?;
        if request.token_paid {
            return Err(ReservationError::Conflict("Token already paid".to_string()));
        }

        if !self
            .verifier
            .verify(&callback.order_id, &callback.payment_id, &callback.signature)
        {
            warn!("payment signature mismatch");
            return Err(ReservationError::InvalidSignature);
        }

        let payment = self
            .gateway
            .fetch_payment(&callback.payment_id)
            .await
            .map_err(|e| {
                warn!(error = %e, "payment lookup failed");
                ReservationError::BadGateway(e.to_string())
            })?;

        if payment.order_id != callback.order_id || payment.is_bound_elsewhere(id) {
            warn!(reported_order = %payment.order_id, "payment bound to another order");
            return Err(ReservationError::OrderMismatch);
        }
        if !payment.is_successful() {
            info!(status = %payment.status, "payment not successful");
            return Err(ReservationError::PaymentNotSuccessful {
                status: payment.status,
            });
        }

        if !self.rooms.try_lock(room_id).await? {
            warn!(payment_id = %payment.id, "valid payment lost the room to another renter");
            return Err(ReservationError::RoomNoLongerAvailable);
        }

        request.confirm(Utc::now())?;
        if let Err(e) = self.bookings.update(request).await {
            error!(error = %e, "confirmation write failed, releasing room");
            if let Err(rollback) = self.rooms.rollback_lock(room_id).await {
                error!(error = %rollback, "room rollback failed");
            }
            return Err(ReservationError::Internal(
                "Failed to finalize booking after payment".to_string(),
            ));
        }

        info!(payment_id = %payment.id, "room locked, booking confirmed");
        Ok(())
    }

    /// Records that the hosted payment UI ended without a payment.
    #[instrument(skip_all, fields(booking_request_id = %id))]
    pub async fn report_payment_abort(
        &self,
        id: BookingRequestId,
        caller: &UserId,
        abort: PaymentAbort,
    ) -> Result<BookingRequest> {
        let mut request = self.load_owned(id, None, caller).await?;
        if request.token_paid {
            return Err(ReservationError::Conflict("Token already paid".to_string()));
        }
        if request.stage != Stage::TokenPending {
            return Ok(request);
        }

        let next = match &abort {
            PaymentAbort::Cancelled => Stage::PaymentCancelled,
            PaymentAbort::Failed { detail } => {
                info!(detail = %detail, "payment attempt failed");
                Stage::PaymentFailed
            }
        };
        request.advance(next, Utc::now())?;
        self.bookings.update(request.clone()).await?;
        Ok(request)
    }

    pub async fn booking_request(
        &self,
        id: BookingRequestId,
        caller: &UserId,
    ) -> Result<BookingRequest> {
        self.load_owned(id, None, caller).await
    }

    /// The caller's booking requests that dashboards still care about.
    pub async fn active_booking_requests(&self, caller: &UserId) -> Result<Vec<BookingRequest>> {
        Ok(self
            .bookings
            .list_for_renter(caller, &BookingStatus::ACTIVE)
            .await?)
    }

    /// Every stored booking request and room, for operator reports.
    pub async fn snapshot(&self) -> Result<(Vec<BookingRequest>, Vec<Room>)> {
        Ok((self.bookings.all().await?, self.rooms.all().await?))
    }

    pub async fn room(&self, room_id: RoomId) -> Result<Room> {
        self.rooms
            .get(room_id)
            .await?
            .ok_or(ReservationError::NotFound)
    }

    async fn load_owned(
        &self,
        id: BookingRequestId,
        room_id: Option<RoomId>,
        caller: &UserId,
    ) -> Result<BookingRequest> {
        let request = self
            .bookings
            .get(id)
            .await?
            .ok_or(ReservationError::NotFound)?;
        if !request.is_owned_by(caller) {
            return Err(ReservationError::Forbidden);
        }
        if room_id.is_some_and(|room| room != request.room_id) {
            return Err(ReservationError::BadRequest(
                "Invalid room for this booking request".to_string(),
            ));
        }
        Ok(request)
    }
}

/// The reservation operations a booking wizard drives.
#[async_trait]
pub trait ReservationApi: Send + Sync {
    async fn open_booking_request(&self, room_id: RoomId, caller: &UserId)
    -> Result<BookingRequest>;

    async fn booking_request(&self, id: BookingRequestId, caller: &UserId)
    -> Result<BookingRequest>;

    async fn save_progress(
        &self,
        id: BookingRequestId,
        caller: &UserId,
        progress: BookingProgress,
    ) -> Result<BookingRequest>;

    async fn schedule_drop(
        &self,
        id: BookingRequestId,
        caller: &UserId,
        date: NaiveDate,
        time: Option<NaiveTime>,
    ) -> Result<BookingRequest>;

    async fn create_order(
        &self,
        id: BookingRequestId,
        room_id: RoomId,
        caller: &UserId,
    ) -> Result<OrderTicket>;

    async fn verify_payment(
        &self,
        id: BookingRequestId,
        room_id: RoomId,
        callback: &PaymentCallback,
        caller: &UserId,
    ) -> Result<()>;

    async fn report_payment_abort(
        &self,
        id: BookingRequestId,
        caller: &UserId,
        abort: PaymentAbort,
    ) -> Result<BookingRequest>;
}

#[async_trait]
impl ReservationApi for ReservationService {
    async fn open_booking_request(
        &self,
        room_id: RoomId,
        caller: &UserId,
    ) -> Result<BookingRequest> {
        ReservationService::open_booking_request(self, room_id, caller).await
    }

    async fn booking_request(
        &self,
        id: BookingRequestId,
        caller: &UserId,
    ) -> Result<BookingRequest> {
        ReservationService::booking_request(self, id, caller).await
    }

    async fn save_progress(
        &self,
        id: BookingRequestId,
        caller: &UserId,
        progress: BookingProgress,
    ) -> Result<BookingRequest> {
        ReservationService::save_progress(self, id, caller, progress).await
    }

    async fn schedule_drop(
        &self,
        id: BookingRequestId,
        caller: &UserId,
        date: NaiveDate,
        time: Option<NaiveTime>,
    ) -> Result<BookingRequest> {
        ReservationService::schedule_drop(self, id, caller, date, time).await
    }

    async fn create_order(
        &self,
        id: BookingRequestId,
        room_id: RoomId,
        caller: &UserId,
    ) -> Result<OrderTicket> {
        ReservationService::create_order(self, id, room_id, caller).await
    }

    async fn verify_payment(
        &self,
        id: BookingRequestId,
        room_id: RoomId,
        callback: &PaymentCallback,
        caller: &UserId,
    ) -> Result<()> {
        ReservationService::verify_payment(self, id, room_id, callback, caller).await
    }

    async fn report_payment_abort(
        &self,
        id: BookingRequestId,
        caller: &UserId,
        abort: PaymentAbort,
    ) -> Result<BookingRequest> {
        ReservationService::report_payment_abort(self, id, caller, abort).await
    }
}
