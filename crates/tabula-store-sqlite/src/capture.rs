//! Pre-mutation reads.
//!
//! Everything an inverse needs is read here, before the forward command runs.
//! Failures are classified through [`Error::capture`], so a broken read is
//! reported as a capture failure while an unknown column or row keeps its
//! own error.

use rusqlite::{Connection, types::Value as SqlValue};
use tabula_core::{
  table::{Comparison, Connective, Predicate, ROW_ID, TableRef},
  value::{Cell, ColumnType, Row},
};

use crate::{
  Error, Result,
  encode::{encode_value, quote_ident},
  tables,
};

/// Full snapshot of the rows with `ids`. Every id must exist.
pub fn rows(conn: &Connection, table: &TableRef, ids: &[i64]) -> Result<Vec<Row>> {
  let found = tables::rows_by_id(conn, table, ids).map_err(Error::capture)?;
  if let Some(missing) = ids.iter().find(|id| !found.iter().any(|r| r.id == **id)) {
    return Err(tabula_core::Error::RowNotFound(*missing).into());
  }
  Ok(found)
}

/// Full snapshot of the rows matching `predicates`.
pub fn matching_rows(conn: &Connection, table: &TableRef, predicates: &[Predicate]) -> Result<Vec<Row>> {
  let (filter, params) = where_clause(conn, table, predicates)?;
  tables::select_rows(conn, table, Some(&filter), &params).map_err(Error::capture)
}

/// Declared type and every `(id, value)` of `column`.
pub fn column(conn: &Connection, table: &TableRef, column: &str) -> Result<(ColumnType, Vec<Cell>)> {
  let column_type = column_type(conn, table, column)?;
  let cells = tables::select_cells(conn, table, column, None, &[]).map_err(Error::capture)?;
  Ok((column_type, cells))
}

pub fn column_type(conn: &Connection, table: &TableRef, column: &str) -> Result<ColumnType> {
  tables::column_type(conn, table, column).map_err(Error::capture)
}

/// The `(id, value)` pairs of `column` selected by `filter`.
pub fn cells_where(
  conn: &Connection,
  table: &TableRef,
  column: &str,
  filter: &str,
  params: &[SqlValue],
) -> Result<Vec<Cell>> {
  tables::select_cells(conn, table, column, Some(filter), params).map_err(Error::capture)
}

/// Full rows selected by `filter`.
pub fn rows_where(conn: &Connection, table: &TableRef, filter: &str, params: &[SqlValue]) -> Result<Vec<Row>> {
  tables::select_rows(conn, table, Some(filter), params).map_err(Error::capture)
}

// ─── Predicates ──────────────────────────────────────────────────────────────

/// Render `predicates` as a `WHERE` body with positional parameters.
fn where_clause(
  conn: &Connection,
  table: &TableRef,
  predicates: &[Predicate],
) -> Result<(String, Vec<SqlValue>)> {
  if predicates.is_empty() {
    return Err(tabula_core::Error::InvalidArgument("at least one predicate is required".into()).into());
  }

  let known = tables::columns(conn, table).map_err(Error::capture)?;
  let mut sql = String::new();
  let mut params = Vec::with_capacity(predicates.len());

  for (i, p) in predicates.iter().enumerate() {
    if p.column != ROW_ID && !known.iter().any(|c| c.name == p.column) {
      return Err(tabula_core::Error::ColumnNotFound(p.column.clone()).into());
    }
    if i > 0 {
      sql.push_str(match p.connective {
        Connective::And => " AND ",
        Connective::Or => " OR ",
      });
    }
    let col = quote_ident(&p.column);
    let clause = match p.comparison {
      Comparison::Eq => format!("{col} IS ?"),
      Comparison::Ne => format!("{col} IS NOT ?"),
      Comparison::Lt => format!("{col} < ?"),
      Comparison::Le => format!("{col} <= ?"),
      Comparison::Gt => format!("{col} > ?"),
      Comparison::Ge => format!("{col} >= ?"),
      Comparison::Contains => format!("instr(CAST({col} AS TEXT), CAST(? AS TEXT)) > 0"),
    };
    sql.push_str(&clause);
    params.push(encode_value(&p.value));
  }
  Ok((sql, params))
}
