//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use tabula_core::{CoreError, Error as Domain};
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  /// The request is valid but conflicts with the current state, e.g. undoing
  /// an entry that is not the frontier.
  #[error("conflict: {0}")]
  Conflict(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  /// Classify a backend error by the domain error it carries.
  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + CoreError + Send + Sync + 'static,
  {
    let classified = match e.core() {
      Some(d) if d.is_not_found() => Some(Self::NotFound(d.to_string())),
      Some(
        d @ (Domain::UndoNotFrontier { .. } | Domain::TableExists { .. } | Domain::ColumnExists(_)),
      ) => Some(Self::Conflict(d.to_string())),
      Some(d @ (Domain::InvalidName(_) | Domain::NotNumeric(_) | Domain::InvalidArgument(_))) => {
        Some(Self::BadRequest(d.to_string()))
      }
      _ => None,
    };
    classified.unwrap_or_else(|| Self::Store(Box::new(e)))
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Conflict(m) => (StatusCode::CONFLICT, m.clone()),
      ApiError::Store(e) => {
        tracing::error!(error = %e, "store error");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
      }
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}
