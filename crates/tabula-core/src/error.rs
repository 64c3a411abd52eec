//! Error types for `tabula-core`.

use thiserror::Error;

use crate::entry::EntryId;

#[derive(Debug, Error)]
pub enum Error {
  /// The pre-mutation read needed to build an inverse failed. Nothing was
  /// mutated and nothing was logged.
  #[error("failed to capture pre-mutation state: {0}")]
  Capture(String),

  /// The log write failed; the forward mutation is rolled back with it.
  #[error("failed to append history entry: {0}")]
  Append(String),

  #[error("entry {entry_id} is not the undo frontier (frontier: {frontier:?})")]
  UndoNotFrontier {
    entry_id: EntryId,
    frontier: Option<EntryId>,
  },

  /// The stored inverse failed; the entry is left undoable.
  #[error("inverse of entry {entry_id} failed: {reason}")]
  UndoExecution { entry_id: EntryId, reason: String },

  #[error("table not found: {dataset_id}/{table_name}")]
  TableNotFound { dataset_id: i64, table_name: String },

  #[error("table already exists: {dataset_id}/{table_name}")]
  TableExists { dataset_id: i64, table_name: String },

  #[error("history entry not found: {0}")]
  EntryNotFound(EntryId),

  #[error("column not found: {0}")]
  ColumnNotFound(String),

  #[error("column already exists: {0}")]
  ColumnExists(String),

  #[error("row not found: {0}")]
  RowNotFound(i64),

  #[error("invalid name: {0:?}")]
  InvalidName(String),

  #[error("column {0} has non-numeric values")]
  NotNumeric(String),

  #[error("invalid argument: {0}")]
  InvalidArgument(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

impl Error {
  /// True for errors caused by addressing something that does not exist.
  pub fn is_not_found(&self) -> bool {
    matches!(
      self,
      Self::TableNotFound { .. }
        | Self::EntryNotFound(_)
        | Self::ColumnNotFound(_)
        | Self::RowNotFound(_)
    )
  }
}

/// Backend error types expose the core error they wrap, if any, so that outer
/// layers can map domain failures without knowing the backend.
pub trait CoreError {
  fn core(&self) -> Option<&Error>;
}

impl CoreError for Error {
  fn core(&self) -> Option<&Error> { Some(self) }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
