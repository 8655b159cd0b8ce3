//! Domain types, the [`store::DirectoryStore`] trait, and the pure logic of
//! the bizdir directory: attribute aggregation, connection transitions,
//! disclosure and search.
//!
//! No HTTP or database code lives here.

pub mod aggregate;
pub mod company;
pub mod connection;
pub mod error;
pub mod search;
pub mod store;
pub mod visibility;

pub use error::{Classify, Error, ErrorKind, Result};
