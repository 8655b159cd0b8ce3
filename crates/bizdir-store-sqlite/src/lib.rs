//! SQLite backend for the bizdir directory store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Every call is bounded by a timeout;
//! reads are retried on transient failures.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::{SearchLogEntry, SqliteStore, StoreOptions};
