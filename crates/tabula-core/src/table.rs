//! Table addressing, registry metadata and row predicates.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  value::{ColumnDef, Value},
};

/// Name of the generated row identifier present in every user table.
pub const ROW_ID: &str = "id";

/// Temporary column used while a column's type is rewritten.
pub const SCRATCH_COLUMN: &str = "__tabula_retype";

/// Identifies one user table: the `(dataset_id, table_name)` pair that keys
/// both the table itself and its history.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableRef {
  pub dataset_id: i64,
  pub table_name: String,
}

impl TableRef {
  pub fn new(dataset_id: i64, table_name: impl Into<String>) -> Self {
    Self { dataset_id, table_name: table_name.into() }
  }

  /// The same dataset, a different table name.
  pub fn renamed(&self, table_name: impl Into<String>) -> Self {
    Self::new(self.dataset_id, table_name)
  }

  pub fn not_found(&self) -> Error {
    Error::TableNotFound {
      dataset_id: self.dataset_id,
      table_name: self.table_name.clone(),
    }
  }
}

impl fmt::Display for TableRef {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}/{}", self.dataset_id, self.table_name)
  }
}

/// Reject names that cannot be used as a table or column identifier.
pub fn validate_name(name: &str) -> Result<()> {
  if name.trim().is_empty() || name.contains('\0') {
    return Err(Error::InvalidName(name.to_owned()));
  }
  Ok(())
}

/// Like [`validate_name`], and additionally refuses the reserved row id and
/// scratch column.
pub fn validate_column_name(name: &str) -> Result<()> {
  validate_name(name)?;
  if name.eq_ignore_ascii_case(ROW_ID) || name.eq_ignore_ascii_case(SCRATCH_COLUMN) {
    return Err(Error::InvalidName(name.to_owned()));
  }
  Ok(())
}

/// Registry entry for a user table, with its current columns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableInfo {
  pub dataset_id:  i64,
  pub name:        String,
  pub description: Option<String>,
  pub created_at:  DateTime<Utc>,
  pub columns:     Vec<ColumnDef>,
}

impl TableInfo {
  pub fn table_ref(&self) -> TableRef { TableRef::new(self.dataset_id, &self.name) }

  pub fn column(&self, name: &str) -> Option<&ColumnDef> {
    self.columns.iter().find(|c| c.name == name)
  }
}

// ─── Predicates ──────────────────────────────────────────────────────────────

/// How a predicate joins onto the ones before it. Ignored on the first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Connective {
  #[default]
  And,
  Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
  Eq,
  Ne,
  Lt,
  Le,
  Gt,
  Ge,
  /// Substring match on the text form of the cell.
  Contains,
}

/// One `[connective] column comparison value` clause of a bulk delete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Predicate {
  #[serde(default)]
  pub connective: Connective,
  pub column:     String,
  pub comparison: Comparison,
  pub value:      Value,
}

impl Predicate {
  pub fn new(column: impl Into<String>, comparison: Comparison, value: impl Into<Value>) -> Self {
    Self {
      connective: Connective::And,
      column: column.into(),
      comparison,
      value: value.into(),
    }
  }

  pub fn or(mut self) -> Self {
    self.connective = Connective::Or;
    self
  }
}
