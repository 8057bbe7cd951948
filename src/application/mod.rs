//! Application layer: the reservation service and the read models built on it.
//!
//! `ReservationService` owns booking requests and the token payment protocol.
//! It holds no state of its own between calls; the room store's conditional
//! write is the only arbiter between concurrent payers.

pub mod dashboard;
pub mod reservation;
pub mod simulation;
