//! Inverse commands — the closed set of ways a logged mutation can be undone.
//!
//! Every mutating operation builds its inverse from state captured *before*
//! the forward command runs, and hands it to the log writer. A backend
//! interprets these variants through [`crate::history::InverseApplier`]; no
//! raw statement text is ever stored.

use serde::{Deserialize, Serialize};

use crate::value::{Cell, ColumnType, Row};

/// A command that, executed right after its forward command, restores the
/// prior state of exactly the rows and columns that command touched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InverseCommand {
  /// Undoes a row insert.
  DeleteRows { ids: Vec<i64> },

  /// Undoes row removal (single, bulk, predicate, outlier, deduplication).
  /// Rows come back with their original ids.
  RestoreRows { rows: Vec<Row> },

  /// Undoes a column add or a generated-column transform.
  DropColumns { columns: Vec<String> },

  /// Undoes a column drop: recreate with the original type, then restore the
  /// value of every row keyed by row id.
  RestoreColumn {
    column:      String,
    column_type: ColumnType,
    cells:       Vec<Cell>,
  },

  /// Undoes a rename: `column` is the current name, `restore_to` the old one.
  RenameColumn { column: String, restore_to: String },

  /// Undoes a retype by casting back to the previously declared type.
  RetypeColumn {
    column:      String,
    column_type: ColumnType,
  },

  /// Undoes a cell-level bulk update. Holds only the rows that changed.
  RestoreCells { column: String, cells: Vec<Cell> },
}

impl InverseCommand {
  pub fn for_row_insert(row_id: i64) -> Self { Self::DeleteRows { ids: vec![row_id] } }

  /// `rows` must be the full pre-delete snapshot of every deleted row.
  pub fn for_row_delete(rows: Vec<Row>) -> Self { Self::RestoreRows { rows } }

  pub fn for_column_add(column: impl Into<String>) -> Self {
    Self::DropColumns { columns: vec![column.into()] }
  }

  /// One inverse drops every column generated by a single operation.
  pub fn for_generated_columns(columns: Vec<String>) -> Self { Self::DropColumns { columns } }

  pub fn for_column_drop(
    column: impl Into<String>,
    column_type: ColumnType,
    cells: Vec<Cell>,
  ) -> Self {
    Self::RestoreColumn { column: column.into(), column_type, cells }
  }

  pub fn for_column_rename(from: impl Into<String>, to: impl Into<String>) -> Self {
    Self::RenameColumn { column: to.into(), restore_to: from.into() }
  }

  pub fn for_column_retype(column: impl Into<String>, previous: ColumnType) -> Self {
    Self::RetypeColumn { column: column.into(), column_type: previous }
  }

  /// `before` holds the pre-update value of each changed cell only.
  pub fn for_cell_update(column: impl Into<String>, before: Vec<Cell>) -> Self {
    Self::RestoreCells { column: column.into(), cells: before }
  }

  /// True when the inverse would do nothing, i.e. the forward command touched
  /// no rows. Such operations are not logged.
  pub fn is_noop(&self) -> bool {
    match self {
      Self::DeleteRows { ids } => ids.is_empty(),
      Self::RestoreRows { rows } => rows.is_empty(),
      Self::DropColumns { columns } => columns.is_empty(),
      Self::RestoreCells { cells, .. } => cells.is_empty(),
      Self::RestoreColumn { .. } | Self::RenameColumn { .. } | Self::RetypeColumn { .. } => false,
    }
  }

  pub fn to_json(&self) -> crate::Result<String> { Ok(serde_json::to_string(self)?) }

  pub fn from_json(s: &str) -> crate::Result<Self> { Ok(serde_json::from_str(s)?) }
}
