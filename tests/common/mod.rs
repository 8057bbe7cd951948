#![allow(dead_code)]

use async_trait::async_trait;
use roomlock::application::reservation::{BookingProgress, ReservationService};
use roomlock::domain::booking::{BookingRequest, BookingStatus, RenterCategory, Stage};
use roomlock::domain::ids::{BookingRequestId, RoomId, UserId};
use roomlock::domain::ports::{BookingRequestStore, RoomStore};
use roomlock::domain::room::Room;
use roomlock::error::StoreError;
use roomlock::infrastructure::in_memory::{InMemoryBookingRequestStore, InMemoryRoomStore};
use roomlock::infrastructure::sandbox::SandboxGateway;
use roomlock::infrastructure::signature::SignatureVerifier;
use rust_decimal::Decimal;
use std::fs::File;
use std::io::Error;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

pub const KEY_ID: &str = "rzp_test_key";
pub const SECRET: &str = "integration_secret";

pub fn generate_rooms_csv(path: &Path, rows: usize) -> Result<Vec<RoomId>, Error> {
    let file = File::create(path)?;
    let mut wtr = csv::WriterBuilder::new().from_writer(file);

    wtr.write_record(["id", "owner_id", "title", "monthly_price"])?;

    let mut ids = Vec::with_capacity(rows);
    for i in 1..=rows {
        let id = RoomId::new();
        wtr.write_record([
            id.to_string(),
            format!("owner-{i}"),
            format!("Room {i}"),
            format!("{}", 5000 + i * 500),
        ])?;
        ids.push(id);
    }

    wtr.flush()?;
    Ok(ids)
}

/// Booking store whose writes of paid requests can be made to fail.
#[derive(Clone, Default)]
pub struct FlakyBookingStore {
    inner: InMemoryBookingRequestStore,
    fail_confirmations: Arc<AtomicBool>,
}

impl FlakyBookingStore {
    pub fn fail_confirmations(&self, fail: bool) {
        self.fail_confirmations.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl BookingRequestStore for FlakyBookingStore {
    async fn insert(&self, request: BookingRequest) -> Result<(), StoreError> {
        self.inner.insert(request).await
    }

    async fn get(&self, id: BookingRequestId) -> Result<Option<BookingRequest>, StoreError> {
        self.inner.get(id).await
    }

    async fn update(&self, request: BookingRequest) -> Result<(), StoreError> {
        if request.token_paid && self.fail_confirmations.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("disk full".to_string()));
        }
        self.inner.update(request).await
    }

    async fn list_for_renter(
        &self,
        renter: &UserId,
        statuses: &[BookingStatus],
    ) -> Result<Vec<BookingRequest>, StoreError> {
        self.inner.list_for_renter(renter, statuses).await
    }

    async fn all(&self) -> Result<Vec<BookingRequest>, StoreError> {
        self.inner.all().await
    }
}

pub struct Harness {
    pub service: Arc<ReservationService>,
    pub gateway: SandboxGateway,
    pub rooms: InMemoryRoomStore,
    pub bookings: FlakyBookingStore,
}

impl Harness {
    pub async fn with_rooms(rooms: &[Room]) -> Self {
        let room_store = InMemoryRoomStore::new();
        for room in rooms {
            room_store.insert(room.clone()).await.unwrap();
        }
        let bookings = FlakyBookingStore::default();
        let gateway = SandboxGateway::new(KEY_ID, SECRET).unwrap();
        let service = ReservationService::new(
            Box::new(bookings.clone()),
            Box::new(room_store.clone()),
            Box::new(gateway.clone()),
            SignatureVerifier::new(SECRET).unwrap(),
        );
        Self {
            service: Arc::new(service),
            gateway,
            rooms: room_store,
            bookings,
        }
    }

    /// Opens a request and walks it to `token_pending` as the wizard would.
    pub async fn ready_request(&self, room: RoomId, renter: &UserId) -> BookingRequest {
        let request = self
            .service
            .open_booking_request(room, renter)
            .await
            .unwrap();
        self.service
            .save_progress(
                request.id,
                renter,
                BookingProgress {
                    category: Some(RenterCategory::Professional),
                    qualifier: Some("Analyst".to_string()),
                    stay_months: Some(12),
                    stage: Some(Stage::TokenPending),
                },
            )
            .await
            .unwrap()
    }

    pub async fn room(&self, id: RoomId) -> Room {
        self.rooms.get(id).await.unwrap().unwrap()
    }
}

pub fn room(price: Decimal) -> Room {
    Room::new(RoomId::new(), UserId::new("owner"), "Test room", price)
}
