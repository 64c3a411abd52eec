//! Handlers for `/datasets/{d}/tables/{t}/history` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `.../history` | `?start&length&search&order_by&dir`; `length=-1` returns everything |
//! | `POST` | `.../history/{id}/undo` | 409 unless `id` is the undo frontier |
//! | `POST` | `.../history/purge-after` | Body: `{"after":"<rfc3339>"}` |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tabula_core::{
  entry::{Direction, EntryId, HistoryPage, HistoryQuery, LogEntry, OrderKey, Ordering},
  store::SheetStore,
  table::TableRef,
};

use crate::error::ApiError;

// ─── List ────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct HistoryParams {
  /// Offset of the first entry returned.
  #[serde(default)]
  pub start:    usize,
  /// Page size; negative or absent returns every remaining entry.
  pub length:   Option<i64>,
  /// Case-insensitive substring filter on the description.
  pub search:   Option<String>,
  pub order_by: Option<OrderKey>,
  pub dir:      Option<Direction>,
}

impl From<HistoryParams> for HistoryQuery {
  fn from(p: HistoryParams) -> Self {
    HistoryQuery {
      offset:   p.start,
      limit:    p.length.and_then(|n| usize::try_from(n).ok()),
      ordering: p.order_by.map(|key| Ordering { key, direction: p.dir.unwrap_or_default() }),
      search:   p.search,
    }
  }
}

/// `GET .../history`
pub async fn list<S: SheetStore>(
  State(store): State<Arc<S>>,
  Path((dataset_id, table)): Path<(i64, String)>,
  Query(params): Query<HistoryParams>,
) -> Result<Json<HistoryPage>, ApiError> {
  let page = store
    .history(TableRef::new(dataset_id, table), params.into())
    .await
    .map_err(ApiError::store)?;
  Ok(Json(page))
}

// ─── Undo ────────────────────────────────────────────────────────────────────

/// `POST .../history/{id}/undo` — returns the retired entry.
pub async fn undo<S: SheetStore>(
  State(store): State<Arc<S>>,
  Path((dataset_id, table, entry_id)): Path<(i64, String, EntryId)>,
) -> Result<Json<LogEntry>, ApiError> {
  let entry = store
    .undo(TableRef::new(dataset_id, table), entry_id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(entry))
}

// ─── Purge ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct PurgeBody {
  pub after: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Purged {
  pub purged: u64,
}

/// `POST .../history/purge-after` — called after restoring the table from a
/// backup taken at `after`.
pub async fn purge_after<S: SheetStore>(
  State(store): State<Arc<S>>,
  Path((dataset_id, table)): Path<(i64, String)>,
  Json(body): Json<PurgeBody>,
) -> Result<Json<Purged>, ApiError> {
  let purged = store
    .purge_history_after(TableRef::new(dataset_id, table), body.after)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(Purged { purged }))
}
