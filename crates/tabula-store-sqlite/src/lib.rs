//! SQLite backend for Tabula.
//!
//! Dataset tables, the table registry and the history log all live in one
//! SQLite database. Wraps [`tokio_rusqlite`] so all database access runs on a
//! dedicated thread without blocking the async runtime; every operation is a
//! single transaction.

mod apply;
mod capture;
mod encode;
mod history;
mod ops;
mod schema;
mod store;
mod tables;
mod transform;

pub mod error;

pub use error::{Error, Result};
pub use history::SqliteHistory;
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
