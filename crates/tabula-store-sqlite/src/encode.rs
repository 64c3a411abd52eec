//! Encoding and decoding helpers between Rust domain types and the
//! representations stored in SQLite.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings (microseconds, `Z`)
//! so that text order equals time order. Inverse commands are stored as JSON.
//! Identifiers are always quoted; values are always bound as parameters.

use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Value as SqlValue;
use tabula_core::{
  entry::{LogEntry, Retirement},
  inverse::InverseCommand,
  table::{TableInfo, TableRef},
  value::{ColumnDef, ColumnType, Value},
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339_opts(SecondsFormat::Micros, true) }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::Decode(e.to_string()))
}

// ─── Identifiers ─────────────────────────────────────────────────────────────

/// Quote an identifier for interpolation into SQL.
pub fn quote_ident(name: &str) -> String { format!("\"{}\"", name.replace('"', "\"\"")) }

/// The quoted physical name of a user table.
pub fn physical(table: &TableRef) -> String {
  quote_ident(&format!("d{}_{}", table.dataset_id, table.table_name))
}

// ─── Values ──────────────────────────────────────────────────────────────────

pub fn encode_value(v: &Value) -> SqlValue {
  match v {
    Value::Null => SqlValue::Null,
    Value::Integer(i) => SqlValue::Integer(*i),
    Value::Real(r) => SqlValue::Real(*r),
    Value::Text(s) => SqlValue::Text(s.clone()),
    Value::Blob(b) => SqlValue::Blob(b.clone()),
  }
}

pub fn decode_value(v: SqlValue) -> Value {
  match v {
    SqlValue::Null => Value::Null,
    SqlValue::Integer(i) => Value::Integer(i),
    SqlValue::Real(r) => Value::Real(r),
    SqlValue::Text(s) => Value::Text(s),
    SqlValue::Blob(b) => Value::Blob(b),
  }
}

// ─── ColumnType ──────────────────────────────────────────────────────────────

pub fn decode_column_type(decl: &str) -> Result<ColumnType> {
  ColumnType::from_str(decl).map_err(|_| Error::Decode(format!("unknown column type: {decl:?}")))
}

/// SQL expression converting `expr` to `to`.
pub fn cast_expr(expr: &str, to: ColumnType) -> String {
  match to {
    ColumnType::Integer => format!("CAST({expr} AS INTEGER)"),
    ColumnType::Real => format!("CAST({expr} AS REAL)"),
    ColumnType::Text => format!("CAST({expr} AS TEXT)"),
    ColumnType::Date => format!("date({expr})"),
    ColumnType::Time => format!("time({expr})"),
    ColumnType::Timestamp => format!("datetime({expr})"),
  }
}

// ─── Inverse / retirement ────────────────────────────────────────────────────

pub fn decode_retirement(s: &str) -> Result<Retirement> {
  Retirement::from_str(s).map_err(|_| Error::Decode(format!("unknown retirement: {s:?}")))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw columns read directly from a `history` row.
pub struct RawEntry {
  pub id:           i64,
  pub dataset_id:   i64,
  pub table_name:   String,
  pub timestamp:    String,
  pub description:  String,
  pub inverse_json: Option<String>,
  pub undone:       bool,
  pub retired:      Option<String>,
}

/// Column list matching [`RawEntry::from_row`].
pub const ENTRY_COLUMNS: &str =
  "id, dataset_id, table_name, timestamp, description, inverse_json, undone, retired";

impl RawEntry {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:           row.get(0)?,
      dataset_id:   row.get(1)?,
      table_name:   row.get(2)?,
      timestamp:    row.get(3)?,
      description:  row.get(4)?,
      inverse_json: row.get(5)?,
      undone:       row.get(6)?,
      retired:      row.get(7)?,
    })
  }

  pub fn into_entry(self) -> Result<LogEntry> {
    Ok(LogEntry {
      id:          self.id,
      dataset_id:  self.dataset_id,
      table_name:  self.table_name,
      timestamp:   decode_dt(&self.timestamp)?,
      description: self.description,
      inverse:     self.inverse_json.as_deref().map(InverseCommand::from_json).transpose()?,
      undone:      self.undone,
      retired:     self.retired.as_deref().map(decode_retirement).transpose()?,
    })
  }
}

/// Raw columns read from a `user_tables` row.
pub struct RawTable {
  pub dataset_id:  i64,
  pub table_name:  String,
  pub description: Option<String>,
  pub created_at:  String,
}

impl RawTable {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      dataset_id:  row.get(0)?,
      table_name:  row.get(1)?,
      description: row.get(2)?,
      created_at:  row.get(3)?,
    })
  }

  pub fn into_info(self, columns: Vec<ColumnDef>) -> Result<TableInfo> {
    Ok(TableInfo {
      dataset_id: self.dataset_id,
      name: self.table_name,
      description: self.description,
      created_at: decode_dt(&self.created_at)?,
      columns,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn quoting_escapes_embedded_quotes() {
    assert_eq!(quote_ident("a\"b"), "\"a\"\"b\"");
    assert_eq!(physical(&TableRef::new(3, "my table")), "\"d3_my table\"");
  }

  #[test]
  fn timestamps_are_fixed_width_and_ordered() {
    let a = DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z").unwrap().with_timezone(&Utc);
    let b = a + chrono::Duration::milliseconds(500);
    let (ea, eb) = (encode_dt(a), encode_dt(b));
    assert_eq!(ea.len(), eb.len());
    assert!(ea < eb);
    assert_eq!(decode_dt(&eb).unwrap(), b);
  }
}
