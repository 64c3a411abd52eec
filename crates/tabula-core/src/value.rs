//! Cell values, column types and row snapshots.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

// ─── Value ───────────────────────────────────────────────────────────────────

/// A single cell value. Tagged so that `Integer(1)` and `Real(1.0)` survive a
/// JSON round-trip through the log unchanged.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
  #[default]
  Null,
  Integer(i64),
  Real(f64),
  Text(String),
  Blob(Vec<u8>),
}

impl Value {
  pub fn is_null(&self) -> bool { matches!(self, Self::Null) }

  /// Numeric view used by the statistical transforms. Text is parsed so that
  /// imported `TEXT` columns holding numbers still qualify.
  pub fn as_f64(&self) -> Option<f64> {
    match self {
      Self::Integer(i) => Some(*i as f64),
      Self::Real(r) => Some(*r),
      Self::Text(s) => s.trim().parse().ok(),
      Self::Null | Self::Blob(_) => None,
    }
  }

  /// Display form used in log descriptions and one-hot column names.
  pub fn render(&self) -> String {
    match self {
      Self::Null => "NULL".to_owned(),
      Self::Integer(i) => i.to_string(),
      Self::Real(r) => r.to_string(),
      Self::Text(s) => s.clone(),
      Self::Blob(b) => format!("<{} bytes>", b.len()),
    }
  }
}

impl From<i64> for Value {
  fn from(v: i64) -> Self { Self::Integer(v) }
}

impl From<f64> for Value {
  fn from(v: f64) -> Self { Self::Real(v) }
}

impl From<&str> for Value {
  fn from(v: &str) -> Self { Self::Text(v.to_owned()) }
}

impl From<String> for Value {
  fn from(v: String) -> Self { Self::Text(v) }
}

impl<T: Into<Value>> From<Option<T>> for Value {
  fn from(v: Option<T>) -> Self { v.map_or(Self::Null, Into::into) }
}

// ─── ColumnType ──────────────────────────────────────────────────────────────

/// Declared type of a user column. The `Display` form is the SQL declaration.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  Display,
  EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum ColumnType {
  Integer,
  Real,
  Text,
  Date,
  Time,
  Timestamp,
}

/// A column name together with its declared type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
  pub name:        String,
  #[serde(rename = "type")]
  pub column_type: ColumnType,
}

impl ColumnDef {
  pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
    Self { name: name.into(), column_type }
  }
}

// ─── Rows ────────────────────────────────────────────────────────────────────

/// A full row as read from a user table. `id` is the generated row identifier
/// and is not repeated inside `values`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
  pub id:     i64,
  pub values: BTreeMap<String, Value>,
}

impl Row {
  pub fn get(&self, column: &str) -> &Value {
    static NULL: Value = Value::Null;
    self.values.get(column).unwrap_or(&NULL)
  }
}

/// The value of one column in one row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
  pub row_id: i64,
  pub value:  Value,
}

impl Cell {
  pub fn new(row_id: i64, value: impl Into<Value>) -> Self {
    Self { row_id, value: value.into() }
  }
}
