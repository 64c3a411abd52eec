//! Handlers for `/datasets/{d}/tables/{t}/columns` endpoints.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;
use tabula_core::{
  store::{Outcome, SheetStore},
  table::TableRef,
  value::{ColumnDef, ColumnType},
};

use crate::error::ApiError;

/// `POST .../columns` — body is a [`ColumnDef`]; returns 201.
pub async fn add<S: SheetStore>(
  State(store): State<Arc<S>>,
  Path((dataset_id, table)): Path<(i64, String)>,
  Json(column): Json<ColumnDef>,
) -> Result<impl IntoResponse, ApiError> {
  let outcome = store
    .add_column(TableRef::new(dataset_id, table), column)
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(outcome)))
}

/// `DELETE .../columns/{c}`
pub async fn drop_one<S: SheetStore>(
  State(store): State<Arc<S>>,
  Path((dataset_id, table, column)): Path<(i64, String, String)>,
) -> Result<Json<Outcome>, ApiError> {
  let outcome = store
    .drop_column(TableRef::new(dataset_id, table), column)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(outcome))
}

#[derive(Debug, Deserialize)]
pub struct RenameBody {
  pub name: String,
}

/// `POST .../columns/{c}/rename`
pub async fn rename<S: SheetStore>(
  State(store): State<Arc<S>>,
  Path((dataset_id, table, column)): Path<(i64, String, String)>,
  Json(body): Json<RenameBody>,
) -> Result<Json<Outcome>, ApiError> {
  let outcome = store
    .rename_column(TableRef::new(dataset_id, table), column, body.name)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(outcome))
}

#[derive(Debug, Deserialize)]
pub struct RetypeBody {
  #[serde(rename = "type")]
  pub column_type: ColumnType,
}

/// `POST .../columns/{c}/retype` — body: `{"type":"text"}`.
pub async fn retype<S: SheetStore>(
  State(store): State<Arc<S>>,
  Path((dataset_id, table, column)): Path<(i64, String, String)>,
  Json(body): Json<RetypeBody>,
) -> Result<Json<Outcome>, ApiError> {
  let outcome = store
    .retype_column(TableRef::new(dataset_id, table), column, body.column_type)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(outcome))
}
