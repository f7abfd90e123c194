//! Keyset Stats - statistics over group-buy keyset records.
//!
//! The `statistics` module is the aggregation engine; `store`, `database`
//! and `server` host it as a small service.

pub mod database;
pub mod server;
pub mod statistics;
pub mod store;
