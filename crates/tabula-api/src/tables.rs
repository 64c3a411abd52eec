//! Handlers for `/datasets/{dataset_id}/tables` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`    | `/datasets/{d}/tables` | All tables of the dataset |
//! | `POST`   | `/datasets/{d}/tables` | Body: [`CreateTableBody`]; returns 201 |
//! | `GET`    | `/datasets/{d}/tables/{t}` | Registry entry with columns |
//! | `DELETE` | `/datasets/{d}/tables/{t}` | Drops the table and its history |
//! | `POST`   | `/datasets/{d}/tables/{t}/rename` | Body: `{"name":"..."}` |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;
use tabula_core::{
  store::SheetStore,
  table::{TableInfo, TableRef},
  value::ColumnDef,
};

use crate::error::ApiError;

// ─── List / create ───────────────────────────────────────────────────────────

/// `GET /datasets/{d}/tables`
pub async fn list<S: SheetStore>(
  State(store): State<Arc<S>>,
  Path(dataset_id): Path<i64>,
) -> Result<Json<Vec<TableInfo>>, ApiError> {
  let tables = store.list_tables(dataset_id).await.map_err(ApiError::store)?;
  Ok(Json(tables))
}

#[derive(Debug, Deserialize)]
pub struct CreateTableBody {
  pub name:        String,
  #[serde(default)]
  pub columns:     Vec<ColumnDef>,
  pub description: Option<String>,
}

/// `POST /datasets/{d}/tables` — returns 201 + the new [`TableInfo`].
pub async fn create<S: SheetStore>(
  State(store): State<Arc<S>>,
  Path(dataset_id): Path<i64>,
  Json(body): Json<CreateTableBody>,
) -> Result<impl IntoResponse, ApiError> {
  let info = store
    .create_table(TableRef::new(dataset_id, body.name), body.columns, body.description)
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(info)))
}

// ─── Single table ────────────────────────────────────────────────────────────

/// `GET /datasets/{d}/tables/{t}`
pub async fn get_one<S: SheetStore>(
  State(store): State<Arc<S>>,
  Path((dataset_id, table)): Path<(i64, String)>,
) -> Result<Json<TableInfo>, ApiError> {
  let table = TableRef::new(dataset_id, table);
  let info = store
    .describe_table(table.clone())
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("table {table} not found")))?;
  Ok(Json(info))
}

/// `DELETE /datasets/{d}/tables/{t}`
pub async fn delete_one<S: SheetStore>(
  State(store): State<Arc<S>>,
  Path((dataset_id, table)): Path<(i64, String)>,
) -> Result<StatusCode, ApiError> {
  store
    .delete_table(TableRef::new(dataset_id, table))
    .await
    .map_err(ApiError::store)?;
  Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct RenameBody {
  pub name: String,
}

/// `POST /datasets/{d}/tables/{t}/rename`
pub async fn rename<S: SheetStore>(
  State(store): State<Arc<S>>,
  Path((dataset_id, table)): Path<(i64, String)>,
  Json(body): Json<RenameBody>,
) -> Result<Json<TableInfo>, ApiError> {
  let info = store
    .rename_table(TableRef::new(dataset_id, table), body.name)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(info))
}
