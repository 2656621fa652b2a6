//! Adapters implementing the domain ports.

pub mod clock;
pub mod in_memory;
pub mod policy;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
