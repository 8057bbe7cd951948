use super::booking::{BookingRequest, BookingStatus};
use super::ids::{BookingRequestId, RoomId, UserId};
use super::payment::{CreatedOrder, OrderRequest, PaymentRecord};
use super::room::Room;
use crate::error::{GatewayError, ReservationError, StoreError};
use async_trait::async_trait;

#[async_trait]
pub trait BookingRequestStore: Send + Sync {
    /// Inserts a new request; an existing id is a `StoreError::Duplicate`.
    async fn insert(&self, request: BookingRequest) -> Result<(), StoreError>;
    async fn get(&self, id: BookingRequestId) -> Result<Option<BookingRequest>, StoreError>;
    /// Replaces an existing request (last writer wins).
    async fn update(&self, request: BookingRequest) -> Result<(), StoreError>;
    /// Requests of `renter` whose status is in `statuses`, newest first.
    async fn list_for_renter(
        &self,
        renter: &UserId,
        statuses: &[BookingStatus],
    ) -> Result<Vec<BookingRequest>, StoreError>;
    async fn all(&self) -> Result<Vec<BookingRequest>, StoreError>;
}

#[async_trait]
pub trait RoomStore: Send + Sync {
    async fn insert(&self, room: Room) -> Result<(), StoreError>;
    async fn get(&self, id: RoomId) -> Result<Option<Room>, StoreError>;
    async fn all(&self) -> Result<Vec<Room>, StoreError>;
    /// Sets `available=false, booking=true` only if the room is still
    /// available, as one conditional write. Returns whether this call won.
    async fn try_lock(&self, id: RoomId) -> Result<bool, StoreError>;
    /// Unconditionally resets `available=true, booking=false`.
    async fn rollback_lock(&self, id: RoomId) -> Result<(), StoreError>;
}

/// Outbound adapter to the payment gateway. Implementations never retry.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_order(&self, order: OrderRequest) -> Result<CreatedOrder, GatewayError>;
    async fn fetch_payment(&self, payment_id: &str) -> Result<PaymentRecord, GatewayError>;
}

/// Resolves a bearer credential into the caller's user id.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn authenticate(&self, bearer: &str) -> Result<UserId, ReservationError>;
}

pub type BookingRequestStoreBox = Box<dyn BookingRequestStore>;
pub type RoomStoreBox = Box<dyn RoomStore>;
pub type PaymentGatewayBox = Box<dyn PaymentGateway>;
