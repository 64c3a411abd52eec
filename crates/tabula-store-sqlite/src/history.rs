//! [`SqliteHistory`]: the `history` table behind the core undo-log rules.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension as _};
use tabula_core::{
  entry::{Direction, EntryId, HistoryQuery, LogEntry, NewEntry, OrderKey, Retirement},
  history::{HistoryLog, InverseApplier},
  inverse::InverseCommand,
  table::TableRef,
};

use crate::{
  Error, Result,
  apply::apply_inverse,
  encode::{ENTRY_COLUMNS, RawEntry, encode_dt},
};

/// History log and inverse interpreter bound to one connection.
///
/// Built on the transaction of the operation in progress, so appends,
/// evictions and undo retirements commit or roll back together with the
/// mutation that caused them.
pub struct SqliteHistory<'c> {
  conn: &'c Connection,
}

impl<'c> SqliteHistory<'c> {
  pub fn new(conn: &'c Connection) -> Self { Self { conn } }
}

/// Escape `%`, `_` and the escape character itself for a `LIKE` pattern.
fn like_pattern(term: &str) -> String {
  let mut out = String::with_capacity(term.len() + 2);
  out.push('%');
  for ch in term.chars() {
    if matches!(ch, '%' | '_' | '\\') {
      out.push('\\');
    }
    out.push(ch);
  }
  out.push('%');
  out
}

fn order_by(query: &HistoryQuery) -> &'static str {
  let Some(ordering) = query.ordering else {
    return "ORDER BY id ASC";
  };
  match (ordering.key, ordering.direction) {
    (OrderKey::Timestamp, Direction::Asc) => "ORDER BY timestamp ASC, id ASC",
    (OrderKey::Timestamp, Direction::Desc) => "ORDER BY timestamp DESC, id DESC",
    (OrderKey::Description, Direction::Asc) => "ORDER BY description ASC, id ASC",
    (OrderKey::Description, Direction::Desc) => "ORDER BY description DESC, id DESC",
  }
}

impl HistoryLog for SqliteHistory<'_> {
  type Error = Error;

  fn insert(&mut self, entry: &NewEntry) -> Result<EntryId> {
    let inverse_json = entry.inverse.as_ref().map(InverseCommand::to_json).transpose()?;
    let is_note = entry.inverse.is_none();
    self.conn.execute(
      "INSERT INTO history
         (dataset_id, table_name, timestamp, description, inverse_json, undone, retired)
       VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
      rusqlite::params![
        entry.table.dataset_id,
        entry.table.table_name,
        encode_dt(entry.timestamp),
        entry.description,
        inverse_json,
        is_note,
        is_note.then(|| Retirement::Note.to_string()),
      ],
    )?;
    Ok(self.conn.last_insert_rowid())
  }

  fn get(&self, table: &TableRef, id: EntryId) -> Result<Option<LogEntry>> {
    let raw = self
      .conn
      .query_row(
        &format!(
          "SELECT {ENTRY_COLUMNS} FROM history
           WHERE id = ?1 AND dataset_id = ?2 AND table_name = ?3"
        ),
        rusqlite::params![id, table.dataset_id, table.table_name],
        RawEntry::from_row,
      )
      .optional()?;
    raw.map(RawEntry::into_entry).transpose()
  }

  fn count_undoable(&self, table: &TableRef) -> Result<u64> {
    let n: i64 = self.conn.query_row(
      "SELECT COUNT(*) FROM history WHERE dataset_id = ?1 AND table_name = ?2 AND undone = 0",
      rusqlite::params![table.dataset_id, table.table_name],
      |r| r.get(0),
    )?;
    Ok(n as u64)
  }

  fn oldest_undoable(&self, table: &TableRef) -> Result<Option<EntryId>> {
    Ok(self.conn.query_row(
      "SELECT MIN(id) FROM history WHERE dataset_id = ?1 AND table_name = ?2 AND undone = 0",
      rusqlite::params![table.dataset_id, table.table_name],
      |r| r.get(0),
    )?)
  }

  fn newest_undoable(&self, table: &TableRef) -> Result<Option<EntryId>> {
    Ok(self.conn.query_row(
      "SELECT MAX(id) FROM history WHERE dataset_id = ?1 AND table_name = ?2 AND undone = 0",
      rusqlite::params![table.dataset_id, table.table_name],
      |r| r.get(0),
    )?)
  }

  fn retire(&mut self, id: EntryId, how: Retirement) -> Result<bool> {
    let changed = self.conn.execute(
      "UPDATE history SET undone = 1, inverse_json = NULL, retired = ?2
       WHERE id = ?1 AND undone = 0",
      rusqlite::params![id, how.to_string()],
    )?;
    if how == Retirement::Expired && changed == 1 {
      tracing::debug!(entry_id = id, "history entry expired");
    }
    Ok(changed == 1)
  }

  fn entries(&self, table: &TableRef, query: &HistoryQuery) -> Result<Vec<LogEntry>> {
    let sql = format!(
      "SELECT {ENTRY_COLUMNS} FROM history
       WHERE dataset_id = ?1 AND table_name = ?2
         AND (?3 IS NULL OR description LIKE ?3 ESCAPE '\\')
       {}
       LIMIT ?4 OFFSET ?5",
      order_by(query)
    );
    let limit = query.limit.map_or(-1, |n| n as i64);
    let mut stmt = self.conn.prepare(&sql)?;
    let raws = stmt
      .query_map(
        rusqlite::params![
          table.dataset_id,
          table.table_name,
          query.search_term().map(like_pattern),
          limit,
          query.offset as i64,
        ],
        RawEntry::from_row,
      )?
      .collect::<rusqlite::Result<Vec<_>>>()?;
    raws.into_iter().map(RawEntry::into_entry).collect()
  }

  fn count(&self, table: &TableRef, search: Option<&str>) -> Result<u64> {
    let n: i64 = self.conn.query_row(
      "SELECT COUNT(*) FROM history
       WHERE dataset_id = ?1 AND table_name = ?2
         AND (?3 IS NULL OR description LIKE ?3 ESCAPE '\\')",
      rusqlite::params![table.dataset_id, table.table_name, search.map(like_pattern)],
      |r| r.get(0),
    )?;
    Ok(n as u64)
  }

  fn purge(&mut self, table: &TableRef) -> Result<u64> {
    let n = self.conn.execute(
      "DELETE FROM history WHERE dataset_id = ?1 AND table_name = ?2",
      rusqlite::params![table.dataset_id, table.table_name],
    )?;
    Ok(n as u64)
  }

  fn purge_after(&mut self, table: &TableRef, after: DateTime<Utc>) -> Result<u64> {
    let n = self.conn.execute(
      "DELETE FROM history WHERE dataset_id = ?1 AND table_name = ?2 AND timestamp > ?3",
      rusqlite::params![table.dataset_id, table.table_name, encode_dt(after)],
    )?;
    Ok(n as u64)
  }

  fn rename(&mut self, table: &TableRef, new_name: &str) -> Result<u64> {
    let n = self.conn.execute(
      "UPDATE history SET table_name = ?3 WHERE dataset_id = ?1 AND table_name = ?2",
      rusqlite::params![table.dataset_id, table.table_name, new_name],
    )?;
    Ok(n as u64)
  }
}

impl InverseApplier for SqliteHistory<'_> {
  type Error = Error;

  fn apply(&mut self, table: &TableRef, inverse: &InverseCommand) -> Result<()> {
    apply_inverse(self.conn, table, inverse)
  }
}
