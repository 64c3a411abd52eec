//! Low-level statements against user tables and the table registry.
//!
//! Shared by the forward operations and the inverse interpreter. Nothing here
//! touches the history log.

use std::collections::BTreeMap;

use rusqlite::{Connection, OptionalExtension as _, params_from_iter, types::Value as SqlValue};
use tabula_core::{
  table::{ROW_ID, SCRATCH_COLUMN, TableInfo, TableRef},
  value::{Cell, ColumnDef, ColumnType, Row},
};

use crate::{
  Result,
  encode::{RawTable, cast_expr, decode_column_type, decode_value, encode_value, physical, quote_ident},
};

// ─── Registry ────────────────────────────────────────────────────────────────

pub fn lookup(conn: &Connection, table: &TableRef) -> Result<Option<RawTable>> {
  Ok(
    conn
      .query_row(
        "SELECT dataset_id, table_name, description, created_at
         FROM user_tables WHERE dataset_id = ?1 AND table_name = ?2",
        rusqlite::params![table.dataset_id, table.table_name],
        RawTable::from_row,
      )
      .optional()?,
  )
}

/// Fail with `TableNotFound` unless `table` is registered.
pub fn require(conn: &Connection, table: &TableRef) -> Result<()> {
  match lookup(conn, table)? {
    Some(_) => Ok(()),
    None => Err(table.not_found().into()),
  }
}

pub fn describe(conn: &Connection, table: &TableRef) -> Result<Option<TableInfo>> {
  match lookup(conn, table)? {
    Some(raw) => Ok(Some(raw.into_info(columns(conn, table)?)?)),
    None => Ok(None),
  }
}

// ─── Columns ─────────────────────────────────────────────────────────────────

/// Data columns in declaration order, excluding the row id.
pub fn columns(conn: &Connection, table: &TableRef) -> Result<Vec<ColumnDef>> {
  let name = format!("d{}_{}", table.dataset_id, table.table_name);
  let mut stmt =
    conn.prepare("SELECT name, type FROM pragma_table_info(?1) WHERE name != ?2 ORDER BY cid")?;
  let raw = stmt
    .query_map(rusqlite::params![name, ROW_ID], |row| {
      Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  raw
    .into_iter()
    .map(|(name, decl)| Ok(ColumnDef::new(name, decode_column_type(&decl)?)))
    .collect()
}

/// Declared type of `column`, or `ColumnNotFound`.
pub fn column_type(conn: &Connection, table: &TableRef, column: &str) -> Result<ColumnType> {
  columns(conn, table)?
    .into_iter()
    .find(|c| c.name == column)
    .map(|c| c.column_type)
    .ok_or_else(|| tabula_core::Error::ColumnNotFound(column.to_owned()).into())
}

/// Fail with `ColumnExists` if `column` is already present. SQLite column
/// names are unique up to ASCII case.
pub fn require_absent(conn: &Connection, table: &TableRef, column: &str) -> Result<()> {
  if columns(conn, table)?.iter().any(|c| c.name.eq_ignore_ascii_case(column)) {
    return Err(tabula_core::Error::ColumnExists(column.to_owned()).into());
  }
  Ok(())
}

pub fn add_column(conn: &Connection, table: &TableRef, column: &ColumnDef) -> Result<()> {
  conn.execute(
    &format!(
      "ALTER TABLE {} ADD COLUMN {} {}",
      physical(table),
      quote_ident(&column.name),
      column.column_type
    ),
    [],
  )?;
  Ok(())
}

pub fn drop_column(conn: &Connection, table: &TableRef, column: &str) -> Result<()> {
  conn.execute(
    &format!("ALTER TABLE {} DROP COLUMN {}", physical(table), quote_ident(column)),
    [],
  )?;
  Ok(())
}

pub fn rename_column(conn: &Connection, table: &TableRef, from: &str, to: &str) -> Result<()> {
  conn.execute(
    &format!(
      "ALTER TABLE {} RENAME COLUMN {} TO {}",
      physical(table),
      quote_ident(from),
      quote_ident(to)
    ),
    [],
  )?;
  Ok(())
}

/// Change a column's declared type, converting every value.
///
/// SQLite cannot alter a column type in place, so the values are cast into a
/// scratch column which then replaces the original. The column moves to the
/// end of the table.
pub fn retype_column(conn: &Connection, table: &TableRef, column: &str, to: ColumnType) -> Result<()> {
  let t = physical(table);
  let scratch = quote_ident(SCRATCH_COLUMN);
  let col = quote_ident(column);

  conn.execute(&format!("ALTER TABLE {t} ADD COLUMN {scratch} {to}"), [])?;
  conn.execute(&format!("UPDATE {t} SET {scratch} = {}", cast_expr(&col, to)), [])?;
  conn.execute(&format!("ALTER TABLE {t} DROP COLUMN {col}"), [])?;
  conn.execute(&format!("ALTER TABLE {t} RENAME COLUMN {scratch} TO {col}"), [])?;
  Ok(())
}

// ─── Rows ────────────────────────────────────────────────────────────────────

/// Read full rows, optionally restricted by a `WHERE` clause over `params`.
pub fn select_rows(
  conn: &Connection,
  table: &TableRef,
  filter: Option<&str>,
  params: &[SqlValue],
) -> Result<Vec<Row>> {
  let where_clause = filter.map(|f| format!("WHERE {f}")).unwrap_or_default();
  let sql = format!("SELECT * FROM {} {where_clause} ORDER BY {ROW_ID}", physical(table));

  let mut stmt = conn.prepare(&sql)?;
  let names: Vec<String> = stmt.column_names().into_iter().map(str::to_owned).collect();
  let rows = stmt
    .query_map(params_from_iter(params.iter()), |row| {
      let mut id = 0;
      let mut values = BTreeMap::new();
      for (i, name) in names.iter().enumerate() {
        if name == ROW_ID {
          id = row.get(i)?;
        } else {
          values.insert(name.clone(), decode_value(row.get::<_, SqlValue>(i)?));
        }
      }
      Ok(Row { id, values })
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(rows)
}

/// Rows with the given ids, in id order. Missing ids are skipped.
pub fn rows_by_id(conn: &Connection, table: &TableRef, ids: &[i64]) -> Result<Vec<Row>> {
  if ids.is_empty() {
    return Ok(Vec::new());
  }
  let placeholders = vec!["?"; ids.len()].join(", ");
  let params: Vec<SqlValue> = ids.iter().map(|id| SqlValue::Integer(*id)).collect();
  select_rows(conn, table, Some(&format!("{ROW_ID} IN ({placeholders})")), &params)
}

/// `(id, value)` for every row, in id order, optionally filtered.
pub fn select_cells(
  conn: &Connection,
  table: &TableRef,
  column: &str,
  filter: Option<&str>,
  params: &[SqlValue],
) -> Result<Vec<Cell>> {
  let where_clause = filter.map(|f| format!("WHERE {f}")).unwrap_or_default();
  let sql = format!(
    "SELECT {ROW_ID}, {} FROM {} {where_clause} ORDER BY {ROW_ID}",
    quote_ident(column),
    physical(table)
  );
  let mut stmt = conn.prepare(&sql)?;
  let cells = stmt
    .query_map(params_from_iter(params.iter()), |row| {
      Ok(Cell {
        row_id: row.get(0)?,
        value:  decode_value(row.get::<_, SqlValue>(1)?),
      })
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(cells)
}

/// Insert a row. With `id` set the row gets exactly that id back.
pub fn insert_row(
  conn: &Connection,
  table: &TableRef,
  id: Option<i64>,
  values: &BTreeMap<String, tabula_core::value::Value>,
) -> Result<i64> {
  let mut names: Vec<String> = Vec::with_capacity(values.len() + 1);
  let mut params: Vec<SqlValue> = Vec::with_capacity(values.len() + 1);
  if let Some(id) = id {
    names.push(ROW_ID.to_owned());
    params.push(SqlValue::Integer(id));
  }
  for (name, value) in values {
    names.push(quote_ident(name));
    params.push(encode_value(value));
  }

  let sql = if names.is_empty() {
    format!("INSERT INTO {} DEFAULT VALUES", physical(table))
  } else {
    format!(
      "INSERT INTO {} ({}) VALUES ({})",
      physical(table),
      names.join(", "),
      vec!["?"; names.len()].join(", ")
    )
  };
  conn.execute(&sql, params_from_iter(params.iter()))?;
  Ok(conn.last_insert_rowid())
}

/// Delete rows by id; fails with `RowNotFound` if any id is absent.
pub fn delete_rows(conn: &Connection, table: &TableRef, ids: &[i64]) -> Result<u64> {
  let mut stmt = conn.prepare(&format!("DELETE FROM {} WHERE {ROW_ID} = ?1", physical(table)))?;
  for id in ids {
    if stmt.execute([id])? == 0 {
      return Err(tabula_core::Error::RowNotFound(*id).into());
    }
  }
  Ok(ids.len() as u64)
}

/// Write each cell's value into `column`; fails with `RowNotFound` if a row
/// is absent.
pub fn update_cells(conn: &Connection, table: &TableRef, column: &str, cells: &[Cell]) -> Result<u64> {
  let mut stmt = conn.prepare(&format!(
    "UPDATE {} SET {} = ?1 WHERE {ROW_ID} = ?2",
    physical(table),
    quote_ident(column)
  ))?;
  for cell in cells {
    if stmt.execute(rusqlite::params![encode_value(&cell.value), cell.row_id])? == 0 {
      return Err(tabula_core::Error::RowNotFound(cell.row_id).into());
    }
  }
  Ok(cells.len() as u64)
}

/// Distinct non-NULL values of `column` in text form, sorted.
pub fn distinct_text(conn: &Connection, table: &TableRef, column: &str) -> Result<Vec<String>> {
  let col = quote_ident(column);
  let mut stmt = conn.prepare(&format!(
    "SELECT DISTINCT CAST({col} AS TEXT) FROM {} WHERE {col} IS NOT NULL ORDER BY 1",
    physical(table)
  ))?;
  let values = stmt.query_map([], |r| r.get(0))?.collect::<rusqlite::Result<Vec<String>>>()?;
  Ok(values)
}
