//! The `SheetStore` trait and its result types.
//!
//! The trait is implemented by storage backends (e.g. `tabula-store-sqlite`).
//! Higher layers (`tabula-api`, `tabula-server`) depend on this abstraction,
//! not on any concrete backend.

use std::{collections::BTreeMap, future::Future};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  CoreError,
  entry::{EntryId, HistoryPage, HistoryQuery, LogEntry},
  table::{Predicate, TableInfo, TableRef},
  transform::Transform,
  value::{ColumnDef, ColumnType, Row, Value},
};

// ─── Results ─────────────────────────────────────────────────────────────────

/// What a logged mutation did.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
  /// The history entry that can undo it; `None` when nothing changed and
  /// nothing was logged.
  pub entry_id:      Option<EntryId>,
  pub rows_affected: u64,
  /// Columns created by the operation, if any.
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub columns:       Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsertedRow {
  pub row_id:   i64,
  pub entry_id: EntryId,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a Tabula backend: dataset tables plus their history.
///
/// Every mutating method runs its capture, forward command and log append as
/// one atomic unit: either the mutation and its history entry both persist,
/// or neither does.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait SheetStore: Send + Sync {
  type Error: std::error::Error + CoreError + Send + Sync + 'static;

  // ── Tables ────────────────────────────────────────────────────────────

  /// Create a table. Logged as a note.
  fn create_table(
    &self,
    table: TableRef,
    columns: Vec<ColumnDef>,
    description: Option<String>,
  ) -> impl Future<Output = Result<TableInfo, Self::Error>> + Send + '_;

  /// Drop a table and purge its whole history.
  fn delete_table(&self, table: TableRef) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Rename a table; its history follows it. Logged as a note.
  fn rename_table(
    &self,
    table: TableRef,
    new_name: String,
  ) -> impl Future<Output = Result<TableInfo, Self::Error>> + Send + '_;

  fn list_tables(
    &self,
    dataset_id: i64,
  ) -> impl Future<Output = Result<Vec<TableInfo>, Self::Error>> + Send + '_;

  /// Returns `None` if the table does not exist.
  fn describe_table(
    &self,
    table: TableRef,
  ) -> impl Future<Output = Result<Option<TableInfo>, Self::Error>> + Send + '_;

  /// All rows in id order.
  fn rows(&self, table: TableRef) -> impl Future<Output = Result<Vec<Row>, Self::Error>> + Send + '_;

  // ── Rows ──────────────────────────────────────────────────────────────

  fn insert_row(
    &self,
    table: TableRef,
    values: BTreeMap<String, Value>,
  ) -> impl Future<Output = Result<InsertedRow, Self::Error>> + Send + '_;

  /// Delete rows by id. Every id must exist.
  fn delete_rows(
    &self,
    table: TableRef,
    ids: Vec<i64>,
  ) -> impl Future<Output = Result<Outcome, Self::Error>> + Send + '_;

  /// Delete every row matching `predicates`.
  fn delete_where(
    &self,
    table: TableRef,
    predicates: Vec<Predicate>,
  ) -> impl Future<Output = Result<Outcome, Self::Error>> + Send + '_;

  // ── Columns ───────────────────────────────────────────────────────────

  fn add_column(
    &self,
    table: TableRef,
    column: ColumnDef,
  ) -> impl Future<Output = Result<Outcome, Self::Error>> + Send + '_;

  fn drop_column(
    &self,
    table: TableRef,
    column: String,
  ) -> impl Future<Output = Result<Outcome, Self::Error>> + Send + '_;

  fn rename_column(
    &self,
    table: TableRef,
    column: String,
    new_name: String,
  ) -> impl Future<Output = Result<Outcome, Self::Error>> + Send + '_;

  fn retype_column(
    &self,
    table: TableRef,
    column: String,
    column_type: ColumnType,
  ) -> impl Future<Output = Result<Outcome, Self::Error>> + Send + '_;

  // ── Transformations ───────────────────────────────────────────────────

  fn transform(
    &self,
    table: TableRef,
    transform: Transform,
  ) -> impl Future<Output = Result<Outcome, Self::Error>> + Send + '_;

  // ── History ───────────────────────────────────────────────────────────

  fn history(
    &self,
    table: TableRef,
    query: HistoryQuery,
  ) -> impl Future<Output = Result<HistoryPage, Self::Error>> + Send + '_;

  /// Undo `entry_id`, which must be the table's undo frontier.
  fn undo(
    &self,
    table: TableRef,
    entry_id: EntryId,
  ) -> impl Future<Output = Result<LogEntry, Self::Error>> + Send + '_;

  /// Drop history entries newer than `after`. Called when the table is
  /// restored from a backup taken at `after`.
  fn purge_history_after(
    &self,
    table: TableRef,
    after: DateTime<Utc>,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;
}
