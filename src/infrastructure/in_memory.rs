use crate::domain::booking::{BookingRequest, BookingStatus};
use crate::domain::ids::{BookingRequestId, RoomId, UserId};
use crate::domain::ports::{BookingRequestStore, RoomStore};
use crate::domain::room::Room;
use crate::error::StoreError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A thread-safe in-memory store for booking requests.
///
/// Uses `Arc<RwLock<HashMap<..>>>` so clones share the same data.
#[derive(Default, Clone)]
pub struct InMemoryBookingRequestStore {
    requests: Arc<RwLock<HashMap<BookingRequestId, BookingRequest>>>,
}

impl InMemoryBookingRequestStore {
    /// Creates a new, empty in-memory booking request store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BookingRequestStore for InMemoryBookingRequestStore {
    async fn insert(&self, request: BookingRequest) -> Result<(), StoreError> {
        let mut requests = self.requests.write().await;
        match requests.entry(request.id) {
            Entry::Occupied(_) => Err(StoreError::Duplicate(request.id.to_string())),
            Entry::Vacant(slot) => {
                slot.insert(request);
                Ok(())
            }
        }
    }

    async fn get(&self, id: BookingRequestId) -> Result<Option<BookingRequest>, StoreError> {
        let requests = self.requests.read().await;
        Ok(requests.get(&id).cloned())
    }

    async fn update(&self, request: BookingRequest) -> Result<(), StoreError> {
        let mut requests = self.requests.write().await;
        match requests.get_mut(&request.id) {
            Some(current) => {
                *current = request;
                Ok(())
            }
            None => Err(StoreError::Missing(request.id.to_string())),
        }
    }

    async fn list_for_renter(
        &self,
        renter: &UserId,
        statuses: &[BookingStatus],
    ) -> Result<Vec<BookingRequest>, StoreError> {
        let requests = self.requests.read().await;
        let mut matching: Vec<BookingRequest> = requests
            .values()
            .filter(|r| &r.renter_id == renter && statuses.contains(&r.status))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matching)
    }

    async fn all(&self) -> Result<Vec<BookingRequest>, StoreError> {
        let requests = self.requests.read().await;
        Ok(requests.values().cloned().collect())
    }
}

/// A thread-safe in-memory store for rooms.
///
/// The lock primitives take the write guard once and test-and-set inside it,
/// so the conditional update has no window between read and write.
#[derive(Default, Clone)]
pub struct InMemoryRoomStore {
    rooms: Arc<RwLock<HashMap<RoomId, Room>>>,
}

impl InMemoryRoomStore {
    /// Creates a new, empty in-memory room store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RoomStore for InMemoryRoomStore {
    async fn insert(&self, room: Room) -> Result<(), StoreError> {
        let mut rooms = self.rooms.write().await;
        match rooms.entry(room.id) {
            Entry::Occupied(_) => Err(StoreError::Duplicate(room.id.to_string())),
            Entry::Vacant(slot) => {
                slot.insert(room);
                Ok(())
            }
        }
    }

    async fn get(&self, id: RoomId) -> Result<Option<Room>, StoreError> {
        let rooms = self.rooms.read().await;
        Ok(rooms.get(&id).cloned())
    }

    async fn all(&self) -> Result<Vec<Room>, StoreError> {
        let rooms = self.rooms.read().await;
        Ok(rooms.values().cloned().collect())
    }

    async fn try_lock(&self, id: RoomId) -> Result<bool, StoreError> {
        let mut rooms = self.rooms.write().await;
        match rooms.get_mut(&id) {
            Some(room) if room.available => {
                room.available = false;
                room.booking = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn rollback_lock(&self, id: RoomId) -> Result<(), StoreError> {
        let mut rooms = self.rooms.write().await;
        if let Some(room) = rooms.get_mut(&id) {
            room.available = true;
            room.booking = false;
        }
        Ok(())
    }
}
