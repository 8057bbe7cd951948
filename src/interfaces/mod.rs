//! Inbound and outbound surfaces: CSV files and the HTTP API.

pub mod csv;
pub mod http;
