//! Core types and trait definitions for the Tabula mutation history.
//!
//! This crate is deliberately free of HTTP and database dependencies. It owns
//! the undo-log rules (append, capacity, frontier, undo, listing) as generic
//! algorithms over the [`history::HistoryLog`] seam, so the policy can be
//! exercised against [`memory::MemoryLog`] as well as a real backend.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod entry;
pub mod error;
pub mod history;
pub mod inverse;
pub mod memory;
pub mod store;
pub mod table;
pub mod transform;
pub mod value;

pub use error::{CoreError, Error, Result};
