//! Handlers for row endpoints and transformations.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/datasets/{d}/tables/{t}/rows` | All rows in id order |
//! | `POST` | `/datasets/{d}/tables/{t}/rows` | Body: `{"values":{...}}`; returns 201 |
//! | `POST` | `/datasets/{d}/tables/{t}/rows/delete` | Body: `{"ids":[...]}` |
//! | `POST` | `/datasets/{d}/tables/{t}/rows/delete-where` | Body: `{"predicates":[...]}` |
//! | `POST` | `/datasets/{d}/tables/{t}/transform` | Body: a tagged [`Transform`] |

use std::{collections::BTreeMap, sync::Arc};

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;
use tabula_core::{
  store::{Outcome, SheetStore},
  table::{Predicate, TableRef},
  transform::Transform,
  value::{Row, Value},
};

use crate::error::ApiError;

/// `GET /datasets/{d}/tables/{t}/rows`
pub async fn list<S: SheetStore>(
  State(store): State<Arc<S>>,
  Path((dataset_id, table)): Path<(i64, String)>,
) -> Result<Json<Vec<Row>>, ApiError> {
  let rows = store
    .rows(TableRef::new(dataset_id, table))
    .await
    .map_err(ApiError::store)?;
  Ok(Json(rows))
}

#[derive(Debug, Deserialize)]
pub struct InsertBody {
  #[serde(default)]
  pub values: BTreeMap<String, Value>,
}

/// `POST /datasets/{d}/tables/{t}/rows` — returns 201 + the new row id and
/// its history entry.
pub async fn insert<S: SheetStore>(
  State(store): State<Arc<S>>,
  Path((dataset_id, table)): Path<(i64, String)>,
  Json(body): Json<InsertBody>,
) -> Result<impl IntoResponse, ApiError> {
  let inserted = store
    .insert_row(TableRef::new(dataset_id, table), body.values)
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(inserted)))
}

#[derive(Debug, Deserialize)]
pub struct DeleteBody {
  pub ids: Vec<i64>,
}

/// `POST /datasets/{d}/tables/{t}/rows/delete`
pub async fn delete<S: SheetStore>(
  State(store): State<Arc<S>>,
  Path((dataset_id, table)): Path<(i64, String)>,
  Json(body): Json<DeleteBody>,
) -> Result<Json<Outcome>, ApiError> {
  let outcome = store
    .delete_rows(TableRef::new(dataset_id, table), body.ids)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(outcome))
}

#[derive(Debug, Deserialize)]
pub struct DeleteWhereBody {
  pub predicates: Vec<Predicate>,
}

/// `POST /datasets/{d}/tables/{t}/rows/delete-where`
pub async fn delete_where<S: SheetStore>(
  State(store): State<Arc<S>>,
  Path((dataset_id, table)): Path<(i64, String)>,
  Json(body): Json<DeleteWhereBody>,
) -> Result<Json<Outcome>, ApiError> {
  if body.predicates.is_empty() {
    return Err(ApiError::BadRequest("at least one predicate is required".into()));
  }
  let outcome = store
    .delete_where(TableRef::new(dataset_id, table), body.predicates)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(outcome))
}

/// `POST /datasets/{d}/tables/{t}/transform`
pub async fn transform<S: SheetStore>(
  State(store): State<Arc<S>>,
  Path((dataset_id, table)): Path<(i64, String)>,
  Json(body): Json<Transform>,
) -> Result<Json<Outcome>, ApiError> {
  let outcome = store
    .transform(TableRef::new(dataset_id, table), body)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(outcome))
}
