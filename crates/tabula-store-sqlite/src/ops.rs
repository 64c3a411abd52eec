//! Logged table, row and column operations.
//!
//! Each function runs inside the caller's transaction and follows the same
//! order: validate, capture the state the inverse needs, run the forward
//! statement, then append the history entry. Any error rolls all of it back.

use std::collections::BTreeMap;

use chrono::Utc;
use rusqlite::Connection;
use tabula_core::{
  entry::{EntryId, HistoryLimit, NewEntry},
  history::{HistoryLog as _, append},
  inverse::InverseCommand,
  store::{InsertedRow, Outcome},
  table::{Predicate, ROW_ID, TableInfo, TableRef, validate_column_name, validate_name},
  value::{ColumnDef, ColumnType, Value},
};

use crate::{
  Error, Result, SqliteHistory, capture,
  encode::{encode_dt, physical, quote_ident},
  tables,
};

// ─── Logging ─────────────────────────────────────────────────────────────────

/// Append an undoable entry for `table`, unless `inverse` would do nothing.
pub(crate) fn record(
  conn: &Connection,
  limit: HistoryLimit,
  table: &TableRef,
  description: String,
  inverse: InverseCommand,
) -> Result<Option<EntryId>> {
  if inverse.is_noop() {
    return Ok(None);
  }
  let id = append(&mut SqliteHistory::new(conn), limit, NewEntry::new(table.clone(), description, inverse))?;
  tracing::debug!(%table, entry_id = id, "history entry appended");
  Ok(Some(id))
}

fn note(conn: &Connection, limit: HistoryLimit, table: &TableRef, description: String) -> Result<EntryId> {
  let id = append(&mut SqliteHistory::new(conn), limit, NewEntry::note(table.clone(), description))?;
  tracing::debug!(%table, entry_id = id, "history note appended");
  Ok(id)
}

fn core(e: tabula_core::Error) -> Error { Error::Core(e) }

// ─── Tables ──────────────────────────────────────────────────────────────────

pub fn create_table(
  conn: &Connection,
  limit: HistoryLimit,
  table: &TableRef,
  columns: &[ColumnDef],
  description: Option<String>,
) -> Result<TableInfo> {
  validate_name(&table.table_name)?;
  for (i, column) in columns.iter().enumerate() {
    validate_column_name(&column.name)?;
    if columns[..i].iter().any(|c| c.name.eq_ignore_ascii_case(&column.name)) {
      return Err(core(tabula_core::Error::ColumnExists(column.name.clone())));
    }
  }
  if tables::lookup(conn, table)?.is_some() {
    return Err(core(tabula_core::Error::TableExists {
      dataset_id: table.dataset_id,
      table_name: table.table_name.clone(),
    }));
  }

  let mut defs = vec![format!("{ROW_ID} INTEGER PRIMARY KEY AUTOINCREMENT")];
  defs.extend(columns.iter().map(|c| format!("{} {}", quote_ident(&c.name), c.column_type)));
  conn.execute(&format!("CREATE TABLE {} ({})", physical(table), defs.join(", ")), [])?;
  conn.execute(
    "INSERT INTO user_tables (dataset_id, table_name, description, created_at)
     VALUES (?1, ?2, ?3, ?4)",
    rusqlite::params![table.dataset_id, table.table_name, description, encode_dt(Utc::now())],
  )?;

  note(conn, limit, table, "Created table".to_owned())?;
  tables::describe(conn, table)?.ok_or_else(|| core(table.not_found()))
}

/// Drop the table, its registry row and its whole history.
pub fn delete_table(conn: &Connection, table: &TableRef) -> Result<u64> {
  tables::require(conn, table)?;
  conn.execute(&format!("DROP TABLE {}", physical(table)), [])?;
  conn.execute(
    "DELETE FROM user_tables WHERE dataset_id = ?1 AND table_name = ?2",
    rusqlite::params![table.dataset_id, table.table_name],
  )?;
  SqliteHistory::new(conn).purge(table)
}

pub fn rename_table(
  conn: &Connection,
  limit: HistoryLimit,
  table: &TableRef,
  new_name: &str,
) -> Result<TableInfo> {
  validate_name(new_name)?;
  tables::require(conn, table)?;
  let renamed = table.renamed(new_name);
  if tables::lookup(conn, &renamed)?.is_some() {
    return Err(core(tabula_core::Error::TableExists {
      dataset_id: renamed.dataset_id,
      table_name: renamed.table_name.clone(),
    }));
  }

  conn.execute(
    &format!(
      "ALTER TABLE {} RENAME TO {}",
      physical(table),
      physical(&renamed)
    ),
    [],
  )?;
  conn.execute(
    "UPDATE user_tables SET table_name = ?3 WHERE dataset_id = ?1 AND table_name = ?2",
    rusqlite::params![table.dataset_id, table.table_name, new_name],
  )?;
  SqliteHistory::new(conn).rename(table, new_name)?;

  note(conn, limit, &renamed, format!("Renamed table from {}", table.table_name))?;
  tables::describe(conn, &renamed)?.ok_or_else(|| core(renamed.not_found()))
}

// ─── Rows ────────────────────────────────────────────────────────────────────

pub fn insert_row(
  conn: &Connection,
  limit: HistoryLimit,
  table: &TableRef,
  values: &BTreeMap<String, Value>,
) -> Result<InsertedRow> {
  tables::require(conn, table)?;
  let known = tables::columns(conn, table)?;
  for name in values.keys() {
    validate_column_name(name)?;
    if !known.iter().any(|c| &c.name == name) {
      return Err(core(tabula_core::Error::ColumnNotFound(name.clone())));
    }
  }

  let row_id = tables::insert_row(conn, table, None, values)?;
  let entry_id = record(
    conn,
    limit,
    table,
    format!("Added row #{row_id}"),
    InverseCommand::for_row_insert(row_id),
  )?
  .ok_or_else(|| core(tabula_core::Error::Append("row insert produced no entry".into())))?;

  Ok(InsertedRow { row_id, entry_id })
}

pub fn delete_rows(
  conn: &Connection,
  limit: HistoryLimit,
  table: &TableRef,
  ids: &[i64],
) -> Result<Outcome> {
  tables::require(conn, table)?;
  let mut ids = ids.to_vec();
  ids.sort_unstable();
  ids.dedup();
  if ids.is_empty() {
    return Ok(Outcome::default());
  }

  let rows = capture::rows(conn, table, &ids)?;
  let deleted = tables::delete_rows(conn, table, &ids)?;
  let description = match ids.as_slice() {
    [id] => format!("Deleted row #{id}"),
    _ => format!("Deleted {deleted} rows"),
  };
  let entry_id = record(conn, limit, table, description, InverseCommand::for_row_delete(rows))?;

  Ok(Outcome { entry_id, rows_affected: deleted, columns: Vec::new() })
}

pub fn delete_where(
  conn: &Connection,
  limit: HistoryLimit,
  table: &TableRef,
  predicates: &[Predicate],
) -> Result<Outcome> {
  tables::require(conn, table)?;
  let rows = capture::matching_rows(conn, table, predicates)?;
  if rows.is_empty() {
    return Ok(Outcome::default());
  }

  let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
  let deleted = tables::delete_rows(conn, table, &ids)?;
  let description = format!("Deleted {deleted} rows matching {}", describe_predicates(predicates));
  let entry_id = record(conn, limit, table, description, InverseCommand::for_row_delete(rows))?;

  Ok(Outcome { entry_id, rows_affected: deleted, columns: Vec::new() })
}

fn describe_predicates(predicates: &[Predicate]) -> String {
  use tabula_core::table::{Comparison, Connective};

  let mut out = String::new();
  for (i, p) in predicates.iter().enumerate() {
    if i > 0 {
      out.push_str(match p.connective {
        Connective::And => " and ",
        Connective::Or => " or ",
      });
    }
    let op = match p.comparison {
      Comparison::Eq => "=",
      Comparison::Ne => "!=",
      Comparison::Lt => "<",
      Comparison::Le => "<=",
      Comparison::Gt => ">",
      Comparison::Ge => ">=",
      Comparison::Contains => "contains",
    };
    out.push_str(&format!("{} {op} {}", p.column, p.value.render()));
  }
  out
}

// ─── Columns ─────────────────────────────────────────────────────────────────

pub fn add_column(
  conn: &Connection,
  limit: HistoryLimit,
  table: &TableRef,
  column: &ColumnDef,
) -> Result<Outcome> {
  validate_column_name(&column.name)?;
  tables::require(conn, table)?;
  tables::require_absent(conn, table, &column.name)?;

  tables::add_column(conn, table, column)?;
  let entry_id = record(
    conn,
    limit,
    table,
    format!("Added column {}", column.name),
    InverseCommand::for_column_add(&column.name),
  )?;

  Ok(Outcome { entry_id, rows_affected: 0, columns: vec![column.name.clone()] })
}

pub fn drop_column(
  conn: &Connection,
  limit: HistoryLimit,
  table: &TableRef,
  column: &str,
) -> Result<Outcome> {
  validate_column_name(column)?;
  tables::require(conn, table)?;
  let (column_type, cells) = capture::column(conn, table, column)?;

  tables::drop_column(conn, table, column)?;
  let rows_affected = cells.len() as u64;
  let entry_id = record(
    conn,
    limit,
    table,
    format!("Deleted column {column}"),
    InverseCommand::for_column_drop(column, column_type, cells),
  )?;

  Ok(Outcome { entry_id, rows_affected, columns: Vec::new() })
}

pub fn rename_column(
  conn: &Connection,
  limit: HistoryLimit,
  table: &TableRef,
  column: &str,
  new_name: &str,
) -> Result<Outcome> {
  validate_column_name(column)?;
  validate_column_name(new_name)?;
  tables::require(conn, table)?;
  capture::column_type(conn, table, column)?;
  if column == new_name {
    return Ok(Outcome::default());
  }
  if !column.eq_ignore_ascii_case(new_name) {
    tables::require_absent(conn, table, new_name)?;
  }

  tables::rename_column(conn, table, column, new_name)?;
  let entry_id = record(
    conn,
    limit,
    table,
    format!("Renamed column {column} to {new_name}"),
    InverseCommand::for_column_rename(column, new_name),
  )?;

  Ok(Outcome { entry_id, rows_affected: 0, columns: vec![new_name.to_owned()] })
}

pub fn retype_column(
  conn: &Connection,
  limit: HistoryLimit,
  table: &TableRef,
  column: &str,
  column_type: ColumnType,
) -> Result<Outcome> {
  validate_column_name(column)?;
  tables::require(conn, table)?;
  let previous = capture::column_type(conn, table, column)?;
  if previous == column_type {
    return Ok(Outcome::default());
  }

  tables::retype_column(conn, table, column, column_type)?;
  let entry_id = record(
    conn,
    limit,
    table,
    format!("Updated column {column} to have type {column_type}"),
    InverseCommand::for_column_retype(column, previous),
  )?;

  Ok(Outcome { entry_id, rows_affected: 0, columns: Vec::new() })
}
