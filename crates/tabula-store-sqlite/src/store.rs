//! [`SqliteStore`] — the SQLite implementation of [`SheetStore`].

use std::{collections::BTreeMap, path::Path};

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use tabula_core::{
  entry::{EntryId, HistoryLimit, HistoryPage, HistoryQuery, LogEntry},
  history::HistoryLog as _,
  store::{InsertedRow, Outcome, SheetStore},
  table::{Predicate, TableInfo, TableRef},
  transform::Transform,
  value::{ColumnDef, ColumnType, Row, Value},
};

use crate::{
  Error, Result, SqliteHistory,
  encode::RawTable,
  ops,
  schema::SCHEMA,
  tables, transform,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Tabula store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn:  tokio_rusqlite::Connection,
  limit: HistoryLimit,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn, limit: HistoryLimit::UNBOUNDED };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn, limit: HistoryLimit::UNBOUNDED };
    store.init_schema().await?;
    Ok(store)
  }

  /// Cap the number of undoable entries kept per table.
  pub fn with_history_limit(mut self, limit: HistoryLimit) -> Self {
    self.limit = limit;
    self
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run `op` in its own transaction. It commits only if `op` succeeds.
  async fn write<T, F>(&self, op: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&Connection, HistoryLimit) -> Result<T> + Send + 'static,
  {
    let limit = self.limit;
    self.conn.call(move |conn| Ok(in_transaction(conn, |tx| op(tx, limit)))).await?
  }

  async fn read<T, F>(&self, op: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&Connection) -> Result<T> + Send + 'static,
  {
    self.conn.call(move |conn| Ok(op(conn))).await?
  }
}

fn in_transaction<T>(conn: &mut Connection, op: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
  let tx = conn.transaction()?;
  let out = op(&tx)?;
  tx.commit()?;
  Ok(out)
}

// ─── SheetStore impl ─────────────────────────────────────────────────────────

impl SheetStore for SqliteStore {
  type Error = Error;

  // ── Tables ──────────────────────────────────────────────────────────────

  async fn create_table(
    &self,
    table: TableRef,
    columns: Vec<ColumnDef>,
    description: Option<String>,
  ) -> Result<TableInfo> {
    let info = self
      .write(move |conn, limit| ops::create_table(conn, limit, &table, &columns, description))
      .await?;
    tracing::info!(table = %info.table_ref(), "table created");
    Ok(info)
  }

  async fn delete_table(&self, table: TableRef) -> Result<()> {
    let t = table.clone();
    let purged = self.write(move |conn, _| ops::delete_table(conn, &t)).await?;
    tracing::info!(%table, purged, "table deleted with its history");
    Ok(())
  }

  async fn rename_table(&self, table: TableRef, new_name: String) -> Result<TableInfo> {
    let from = table.clone();
    let info = self
      .write(move |conn, limit| ops::rename_table(conn, limit, &table, &new_name))
      .await?;
    tracing::info!(from = %from, to = %info.table_ref(), "table renamed");
    Ok(info)
  }

  async fn list_tables(&self, dataset_id: i64) -> Result<Vec<TableInfo>> {
    self
      .read(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT dataset_id, table_name, description, created_at
           FROM user_tables WHERE dataset_id = ?1 ORDER BY table_name",
        )?;
        let raws = stmt
          .query_map([dataset_id], RawTable::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        raws
          .into_iter()
          .map(|raw| {
            let columns = tables::columns(conn, &TableRef::new(raw.dataset_id, &raw.table_name))?;
            raw.into_info(columns)
          })
          .collect()
      })
      .await
  }

  async fn describe_table(&self, table: TableRef) -> Result<Option<TableInfo>> {
    self.read(move |conn| tables::describe(conn, &table)).await
  }

  async fn rows(&self, table: TableRef) -> Result<Vec<Row>> {
    self
      .read(move |conn| {
        tables::require(conn, &table)?;
        tables::select_rows(conn, &table, None, &[])
      })
      .await
  }

  // ── Rows ────────────────────────────────────────────────────────────────

  async fn insert_row(&self, table: TableRef, values: BTreeMap<String, Value>) -> Result<InsertedRow> {
    self.write(move |conn, limit| ops::insert_row(conn, limit, &table, &values)).await
  }

  async fn delete_rows(&self, table: TableRef, ids: Vec<i64>) -> Result<Outcome> {
    self.write(move |conn, limit| ops::delete_rows(conn, limit, &table, &ids)).await
  }

  async fn delete_where(&self, table: TableRef, predicates: Vec<Predicate>) -> Result<Outcome> {
    self
      .write(move |conn, limit| ops::delete_where(conn, limit, &table, &predicates))
      .await
  }

  // ── Columns ─────────────────────────────────────────────────────────────

  async fn add_column(&self, table: TableRef, column: ColumnDef) -> Result<Outcome> {
    self.write(move |conn, limit| ops::add_column(conn, limit, &table, &column)).await
  }

  async fn drop_column(&self, table: TableRef, column: String) -> Result<Outcome> {
    self.write(move |conn, limit| ops::drop_column(conn, limit, &table, &column)).await
  }

  async fn rename_column(&self, table: TableRef, column: String, new_name: String) -> Result<Outcome> {
    self
      .write(move |conn, limit| ops::rename_column(conn, limit, &table, &column, &new_name))
      .await
  }

  async fn retype_column(
    &self,
    table: TableRef,
    column: String,
    column_type: ColumnType,
  ) -> Result<Outcome> {
    self
      .write(move |conn, limit| ops::retype_column(conn, limit, &table, &column, column_type))
      .await
  }

  // ── Transformations ─────────────────────────────────────────────────────

  async fn transform(&self, table: TableRef, transform: Transform) -> Result<Outcome> {
    self
      .write(move |conn, limit| transform::run(conn, limit, &table, &transform))
      .await
  }

  // ── History ─────────────────────────────────────────────────────────────

  async fn history(&self, table: TableRef, query: HistoryQuery) -> Result<HistoryPage> {
    self
      .read(move |conn| {
        tables::require(conn, &table)?;
        tabula_core::history::list(&SqliteHistory::new(conn), &table, &query)
      })
      .await
  }

  async fn undo(&self, table: TableRef, entry_id: EntryId) -> Result<LogEntry> {
    let t = table.clone();
    let result = self
      .write(move |conn, _| {
        tables::require(conn, &t)?;
        tabula_core::history::undo(&mut SqliteHistory::new(conn), &t, entry_id)
      })
      .await;

    match &result {
      Ok(entry) => tracing::info!(%table, entry_id, description = %entry.description, "undone"),
      Err(Error::Core(e @ tabula_core::Error::UndoExecution { .. })) => {
        tracing::warn!(%table, entry_id, error = %e, "inverse failed; entry left undoable");
      }
      Err(_) => {}
    }
    result
  }

  async fn purge_history_after(&self, table: TableRef, after: DateTime<Utc>) -> Result<u64> {
    let t = table.clone();
    let purged = self
      .write(move |conn, _| {
        tables::require(conn, &t)?;
        SqliteHistory::new(conn).purge_after(&t, after)
      })
      .await?;
    tracing::info!(%table, %after, purged, "history purged after restore point");
    Ok(purged)
  }
}
