//! Adapters implementing the domain ports.

pub mod identity;
pub mod in_memory;
pub mod razorpay;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
pub mod sandbox;
pub mod signature;
