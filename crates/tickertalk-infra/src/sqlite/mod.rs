//! SQLite storage layer.
//!
//! The stock-price database is opened read-only; generated SQL runs through
//! [`executor::SqliteExecutor`].

pub mod executor;
