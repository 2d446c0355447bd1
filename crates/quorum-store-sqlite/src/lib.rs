//! SQLite backend for the Quorum post store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Entity-scoped writes run inside
//! `BEGIN IMMEDIATE` transactions, which take SQLite's write lock up front.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::{SqliteStore, StoreOptions};
