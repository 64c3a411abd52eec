//! Error type for `tabula-store-sqlite`.

use tabula_core::CoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] tabula_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("sqlite error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("decode error: {0}")]
  Decode(String),
}

impl Error {
  /// Classify a failure of a pre-mutation read. Domain errors (unknown
  /// column, missing row) keep their identity; anything else becomes
  /// [`tabula_core::Error::Capture`].
  pub(crate) fn capture(self) -> Self {
    match self {
      Self::Core(e) => Self::Core(e),
      other => Self::Core(tabula_core::Error::Capture(other.to_string())),
    }
  }
}

impl CoreError for Error {
  fn core(&self) -> Option<&tabula_core::Error> {
    match self {
      Self::Core(e) => Some(e),
      _ => None,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
