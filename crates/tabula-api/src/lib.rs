//! JSON REST API for Tabula.
//!
//! Exposes an axum [`Router`] backed by any [`tabula_core::store::SheetStore`].
//! Auth, TLS, and transport concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", tabula_api::api_router(store.clone()))
//! ```

pub mod columns;
pub mod error;
pub mod history;
pub mod rows;
pub mod tables;

use std::sync::Arc;

use axum::{
  Router,
  routing::{delete, get, post},
};
use tabula_core::store::SheetStore;

pub use error::ApiError;

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>) -> Router<()>
where
  S: SheetStore + Clone + 'static,
{
  const TABLE: &str = "/datasets/{dataset_id}/tables/{table}";

  Router::new()
    // Tables
    .route("/datasets/{dataset_id}/tables", get(tables::list::<S>).post(tables::create::<S>))
    .route(TABLE, get(tables::get_one::<S>).delete(tables::delete_one::<S>))
    .route(&format!("{TABLE}/rename"), post(tables::rename::<S>))
    // Rows
    .route(&format!("{TABLE}/rows"), get(rows::list::<S>).post(rows::insert::<S>))
    .route(&format!("{TABLE}/rows/delete"), post(rows::delete::<S>))
    .route(&format!("{TABLE}/rows/delete-where"), post(rows::delete_where::<S>))
    .route(&format!("{TABLE}/transform"), post(rows::transform::<S>))
    // Columns
    .route(&format!("{TABLE}/columns"), post(columns::add::<S>))
    .route(&format!("{TABLE}/columns/{{column}}"), delete(columns::drop_one::<S>))
    .route(&format!("{TABLE}/columns/{{column}}/rename"), post(columns::rename::<S>))
    .route(&format!("{TABLE}/columns/{{column}}/retype"), post(columns::retype::<S>))
    // History
    .route(&format!("{TABLE}/history"), get(history::list::<S>))
    .route(&format!("{TABLE}/history/{{entry_id}}/undo"), post(history::undo::<S>))
    .route(&format!("{TABLE}/history/purge-after"), post(history::purge_after::<S>))
    .with_state(store)
}
