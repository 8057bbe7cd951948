use crate::domain::ids::{RoomId, UserId};
use crate::domain::money::Amount;
use crate::domain::room::Room;
use crate::error::{ReservationError, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;

#[derive(Debug, Deserialize)]
struct RoomRow {
    id: RoomId,
    owner_id: String,
    title: String,
    monthly_price: Decimal,
}

impl TryFrom<RoomRow> for Room {
    type Error = ReservationError;

    fn try_from(row: RoomRow) -> Result<Self> {
        let price = Amount::new(row.monthly_price)?;
        Ok(Room::new(row.id, UserId::new(row.owner_id), row.title, price.value()))
    }
}

/// Reads room listings (`id,owner_id,title,monthly_price`) from a CSV source.
///
/// Whitespace around fields is trimmed. Every room starts available.
pub struct RoomReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> RoomReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(source);
        Self { reader }
    }

    /// Lazily deserializes rooms, one `Result` per row.
    pub fn rooms(self) -> impl Iterator<Item = Result<Room>> {
        self.reader.into_deserialize::<RoomRow>().map(|row| {
            row.map_err(|e| ReservationError::BadRequest(format!("invalid room row: {e}")))
                .and_then(Room::try_from)
        })
    }
}
