//! Offline race: many renters per room running the full wizard against the
//! sandbox gateway at once.

use crate::application::reservation::ReservationService;
use crate::domain::booking::{BookingRequest, RenterCategory};
use crate::domain::ids::UserId;
use crate::domain::payment::OrderTicket;
use crate::domain::ports::{BookingRequestStoreBox, RoomStore, RoomStoreBox};
use crate::domain::room::Room;
use crate::error::{ReservationError, Result, StoreError};
use crate::infrastructure::sandbox::SandboxGateway;
use crate::infrastructure::signature::SignatureVerifier;
use crate::wizard::WizardError;
use crate::wizard::session::{BookingWizard, PaymentOutcome, PaymentSheet};
use crate::wizard::step::WizardStep;
use async_trait::async_trait;
use chrono::{Days, Utc};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, info, instrument};
use uuid::Uuid;

pub const SANDBOX_KEY_ID: &str = "rzp_test_sandbox";

/// A payment sheet where every renter completes checkout and the payment
/// settles with `status`.
pub struct SandboxSheet {
    gateway: SandboxGateway,
    status: String,
}

impl SandboxSheet {
    pub fn new(gateway: SandboxGateway, status: impl Into<String>) -> Self {
        Self {
            gateway,
            status: status.into(),
        }
    }
}

#[async_trait]
impl PaymentSheet for SandboxSheet {
    async fn present(&self, ticket: &OrderTicket) -> PaymentOutcome {
        match self.gateway.pay(&ticket.order_id, &self.status).await {
            Ok(callback) => PaymentOutcome::Completed(callback),
            Err(e) => PaymentOutcome::Failed {
                reason: e.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct SimulationReport {
    pub booking_requests: Vec<BookingRequest>,
    pub rooms: Vec<Room>,
}

async fn run_session(
    service: Arc<ReservationService>,
    sheet: Arc<SandboxSheet>,
    room: Room,
    renter: UserId,
    seq: usize,
) -> Result<WizardStep, WizardError> {
    let mut wizard = BookingWizard::open(service, sheet, room.id, renter).await?;
    let category = if seq % 2 == 0 {
        RenterCategory::Student
    } else {
        RenterCategory::Professional
    };
    wizard.choose_category(category)?;
    wizard.next()?;
    wizard.set_qualifier(format!("simulated renter {seq}"))?;
    wizard.next()?;
    wizard.choose_duration(12)?;
    wizard.continue_from_duration().await?;
    wizard.next()?;
    let drop_date = Utc::now()
        .date_naive()
        .checked_add_days(Days::new(7))
        .ok_or_else(|| WizardError::Input("drop date out of range".to_string()))?;
    wizard.schedule_drop(drop_date, None).await?;
    wizard.pay().await
}

/// Seeds `rooms` into the given stores, races `renters_per_room` wizard
/// sessions on each, and returns the final state of both stores.
///
/// Rooms already present in the store are left as they are.
#[instrument(skip_all, fields(rooms = rooms.len(), renters_per_room = renters_per_room))]
pub async fn simulate(
    bookings: BookingRequestStoreBox,
    room_store: RoomStoreBox,
    rooms: Vec<Room>,
    renters_per_room: usize,
) -> Result<SimulationReport> {
    for room in &rooms {
        match room_store.insert(room.clone()).await {
            Ok(()) => {}
            Err(StoreError::Duplicate(id)) => debug!(room_id = %id, "room already stored"),
            Err(e) => return Err(e.into()),
        }
    }

    let secret = Uuid::new_v4().simple().to_string();
    let gateway = SandboxGateway::new(SANDBOX_KEY_ID, &secret)
        .map_err(|e| ReservationError::Internal(e.to_string()))?;
    let verifier =
        SignatureVerifier::new(&secret).map_err(|e| ReservationError::Internal(e.to_string()))?;
    let service = Arc::new(ReservationService::new(
        bookings,
        room_store,
        Box::new(gateway.clone()),
        verifier,
    ));
    let sheet = Arc::new(SandboxSheet::new(gateway, "captured"));

    let mut sessions = JoinSet::new();
    for room in &rooms {
        for seq in 0..renters_per_room {
            let renter = UserId::new(format!("renter-{seq}"));
            sessions.spawn(run_session(
                service.clone(),
                sheet.clone(),
                room.clone(),
                renter,
                seq,
            ));
        }
    }

    let mut confirmed = 0usize;
    while let Some(joined) = sessions.join_next().await {
        let step = joined
            .map_err(|e| ReservationError::Internal(e.to_string()))?
            .map_err(|e| ReservationError::Internal(e.to_string()))?;
        if step == WizardStep::Success {
            confirmed += 1;
        }
    }
    info!(confirmed, "simulation finished");

    let (booking_requests, rooms) = service.snapshot().await?;
    Ok(SimulationReport {
        booking_requests,
        rooms,
    })
}
