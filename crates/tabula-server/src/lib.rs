//! HTTP server wiring for Tabula.
//!
//! Mounts [`tabula_api::api_router`] under `/api` with request tracing.

use std::{path::PathBuf, sync::Arc};

use axum::Router;
use serde::Deserialize;
use tabula_core::{entry::HistoryLimit, store::SheetStore};
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `TABULA_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  pub host:          String,
  pub port:          u16,
  pub store_path:    PathBuf,
  /// Undoable entries kept per table; `0` or unset keeps all of them.
  #[serde(default)]
  pub history_limit: u32,
}

impl ServerConfig {
  pub fn history_limit(&self) -> HistoryLimit { HistoryLimit(self.history_limit) }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// The full application router for `store`.
pub fn app<S>(store: Arc<S>) -> Router
where
  S: SheetStore + Clone + 'static,
{
  Router::new()
    .nest("/api", tabula_api::api_router(store))
    .layer(TraceLayer::new_for_http())
}
