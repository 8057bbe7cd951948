use crate::domain::booking::BookingRequest;
use crate::domain::room::Room;
use std::io::Write;

/// Writes final booking request and room state as CSV.
///
/// Each section starts with its own header row, so the writer is flexible
/// about record lengths.
pub struct ReportWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> ReportWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::WriterBuilder::new().flexible(true).from_writer(sink),
        }
    }

    /// One row per request, ordered by room then renter.
    pub fn write_booking_requests(
        &mut self,
        mut requests: Vec<BookingRequest>,
    ) -> Result<(), csv::Error> {
        requests.sort_by(|a, b| {
            (a.room_id, a.renter_id.as_str()).cmp(&(b.room_id, b.renter_id.as_str()))
        });
        self.writer.write_record([
            "booking_request_id",
            "room_id",
            "renter_id",
            "stage",
            "status",
            "token_paid",
            "token_amount",
        ])?;
        for r in requests {
            self.writer.write_record([
                r.id.to_string(),
                r.room_id.to_string(),
                r.renter_id.to_string(),
                r.stage.to_string(),
                r.status.to_string(),
                r.token_paid.to_string(),
                r.token_amount.map(|a| a.to_string()).unwrap_or_default(),
            ])?;
        }
        self.writer.flush()?;
        Ok(())
    }

    pub fn write_rooms(&mut self, mut rooms: Vec<Room>) -> Result<(), csv::Error> {
        rooms.sort_by_key(|room| room.id);
        self.writer
            .write_record(["room_id", "title", "monthly_price", "available", "booking"])?;
        for room in rooms {
            self.writer.write_record([
                room.id.to_string(),
                room.title,
                room.monthly_price.to_string(),
                room.available.to_string(),
                room.booking.to_string(),
            ])?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
