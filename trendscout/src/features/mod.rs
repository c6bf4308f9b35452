/// In-memory TTL cache of merged tables.
#[cfg(feature = "cache")]
pub mod cache;
