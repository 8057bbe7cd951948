//! Domain model of the token-reservation pipeline.
//!
//! Pure types and ports: nothing in here performs I/O.

pub mod booking;
pub mod ids;
pub mod money;
pub mod payment;
pub mod ports;
pub mod room;
