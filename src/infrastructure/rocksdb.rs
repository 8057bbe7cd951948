use crate::domain::booking::{BookingRequest, BookingStatus};
use crate::domain::ids::{BookingRequestId, RoomId, UserId};
use crate::domain::ports::{BookingRequestStore, RoomStore};
use crate::domain::room::Room;
use crate::error::StoreError;
use async_trait::async_trait;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, IteratorMode, Options};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Column Family for booking requests.
pub const CF_BOOKING_REQUESTS: &str = "booking_requests";
/// Column Family for rooms.
pub const CF_ROOMS: &str = "rooms";

/// A persistent store implementation using RocksDB.
///
/// Booking requests and rooms live in separate Column Families, keyed by the
/// raw UUID bytes and stored as JSON. The database is opened exclusively by
/// this process, so the room lock's read-check-write is serialised by
/// `room_guard`.
///
/// `Clone` shares the underlying `Arc<DB>` and guard.
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
    room_guard: Arc<Mutex<()>>,
}

impl From<rocksdb::Error> for StoreError {
    fn from(err: rocksdb::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at `path`, creating the
    /// "booking_requests" and "rooms" column families if missing.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_requests = ColumnFamilyDescriptor::new(CF_BOOKING_REQUESTS, Options::default());
        let cf_rooms = ColumnFamilyDescriptor::new(CF_ROOMS, Options::default());

        let db = DB::open_cf_descriptors(&opts, path, vec![cf_requests, cf_rooms])?;

        Ok(Self {
            db: Arc::new(db),
            room_guard: Arc::default(),
        })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily, StoreError> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Backend(format!("{name} column family not found")))
    }

    fn read<T: DeserializeOwned>(&self, cf: &str, key: &[u8]) -> Result<Option<T>, StoreError> {
        match self.db.get_cf(self.cf(cf)?, key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn write<T: Serialize>(&self, cf: &str, key: &[u8], value: &T) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec(value)?;
        self.db.put_cf(self.cf(cf)?, key, bytes)?;
        Ok(())
    }

    fn scan<T: DeserializeOwned>(&self, cf: &str) -> Result<Vec<T>, StoreError> {
        let mut items = Vec::new();
        for item in self.db.iterator_cf(self.cf(cf)?, IteratorMode::Start) {
            let (_key, value) = item?;
            items.push(serde_json::from_slice(&value)?);
        }
        Ok(items)
    }

    /// Read-modify-write of one room under the room guard.
    fn modify_room<F>(&self, id: RoomId, f: F) -> Result<bool, StoreError>
    where
        F: FnOnce(&mut Room) -> bool,
    {
        let _guard = self
            .room_guard
            .lock()
            .map_err(|_| StoreError::Backend("room guard poisoned".to_string()))?;
        let key = id.0.as_bytes();
        let Some(mut room) = self.read::<Room>(CF_ROOMS, key)? else {
            return Ok(false);
        };
        if !f(&mut room) {
            return Ok(false);
        }
        self.write(CF_ROOMS, key, &room)?;
        Ok(true)
    }
}

#[async_trait]
impl BookingRequestStore for RocksDBStore {
    async fn insert(&self, request: BookingRequest) -> Result<(), StoreError> {
        let key = request.id.0.as_bytes();
        if self.db.get_pinned_cf(self.cf(CF_BOOKING_REQUESTS)?, key)?.is_some() {
            return Err(StoreError::Duplicate(request.id.to_string()));
        }
        self.write(CF_BOOKING_REQUESTS, key, &request)
    }

    async fn get(&self, id: BookingRequestId) -> Result<Option<BookingRequest>, StoreError> {
        self.read(CF_BOOKING_REQUESTS, id.0.as_bytes())
    }

    async fn update(&self, request: BookingRequest) -> Result<(), StoreError> {
        let key = request.id.0.as_bytes();
        if self.db.get_pinned_cf(self.cf(CF_BOOKING_REQUESTS)?, key)?.is_none() {
            return Err(StoreError::Missing(request.id.to_string()));
        }
        self.write(CF_BOOKING_REQUESTS, key, &request)
    }

    async fn list_for_renter(
        &self,
        renter: &UserId,
        statuses: &[BookingStatus],
    ) -> Result<Vec<BookingRequest>, StoreError> {
        let mut found: Vec<BookingRequest> = self
            .scan::<BookingRequest>(CF_BOOKING_REQUESTS)?
            .into_iter()
            .filter(|r| &r.renter_id == renter && statuses.contains(&r.status))
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }

    async fn all(&self) -> Result<Vec<BookingRequest>, StoreError> {
        self.scan(CF_BOOKING_REQUESTS)
    }
}

#[async_trait]
impl RoomStore for RocksDBStore {
    async fn insert(&self, room: Room) -> Result<(), StoreError> {
        let key = room.id.0.as_bytes();
        if self.db.get_pinned_cf(self.cf(CF_ROOMS)?, key)?.is_some() {
            return Err(StoreError::Duplicate(room.id.to_string()));
        }
        self.write(CF_ROOMS, key, &room)
    }

    async fn get(&self, id: RoomId) -> Result<Option<Room>, StoreError> {
        self.read(CF_ROOMS, id.0.as_bytes())
    }

    async fn all(&self) -> Result<Vec<Room>, StoreError> {
        self.scan(CF_ROOMS)
    }

    async fn try_lock(&self, id: RoomId) -> Result<bool, StoreError> {
        self.modify_room(id, |room| {
            if !room.available {
                return false;
            }
            room.available = false;
            room.booking = true;
            true
        })
    }

    async fn rollback_lock(&self, id: RoomId) -> Result<(), StoreError> {
        self.modify_room(id, |room| {
            room.available = true;
            room.booking = false;
            true
        })?;
        Ok(())
    }
}
