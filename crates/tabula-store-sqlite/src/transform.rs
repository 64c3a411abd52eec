//! Logged transformations.
//!
//! Bulk cell updates capture only the cells they are about to change; row
//! removals capture full rows; generated-column transforms need no capture,
//! their inverse simply drops what they created.

use rusqlite::{Connection, OptionalExtension as _, types::Value as SqlValue};
use tabula_core::{
  entry::HistoryLimit,
  inverse::InverseCommand,
  store::Outcome,
  table::{TableRef, validate_column_name},
  transform::{
    DatePart, ImputeStrategy, NormalizeMethod, Transform, bin_label, mean, median, std_dev,
  },
  value::{Cell, ColumnDef, ColumnType, Value},
};

use crate::{
  Error, Result, capture,
  encode::{decode_value, encode_value, physical, quote_ident},
  ops::record,
  tables,
};

fn invalid(msg: impl Into<String>) -> Error { tabula_core::Error::InvalidArgument(msg.into()).into() }

/// Run `transform` against `table` and log its inverse.
pub fn run(
  conn: &Connection,
  limit: HistoryLimit,
  table: &TableRef,
  transform: &Transform,
) -> Result<Outcome> {
  tables::require(conn, table)?;
  if let Some(column) = transform.column() {
    capture::column_type(conn, table, column)?;
  }

  match transform {
    Transform::FindReplace { column, find, replace } => {
      find_replace(conn, limit, table, column, find, replace)
    }
    Transform::Impute { column, strategy } => impute(conn, limit, table, column, strategy),
    Transform::Normalize { column, method } => normalize(conn, limit, table, column, *method),
    Transform::RemoveOutliers { column, threshold } => {
      remove_outliers(conn, limit, table, column, *threshold)
    }
    Transform::Deduplicate => deduplicate(conn, limit, table),
    Transform::ExtractDatePart { column, part } => {
      extract_date_part(conn, limit, table, column, *part)
    }
    Transform::OneHotEncode { column } => one_hot_encode(conn, limit, table, column),
    Transform::BinInterval { column, bins } => bin_interval(conn, limit, table, column, *bins),
  }
}

/// Numeric view of `cells`; any value that is not a number fails the
/// transform.
fn numbers(column: &str, cells: &[Cell]) -> Result<Vec<f64>> {
  cells
    .iter()
    .map(|c| {
      c.value
        .as_f64()
        .ok_or_else(|| tabula_core::Error::NotNumeric(column.to_owned()).into())
    })
    .collect()
}

fn non_null_cells(conn: &Connection, table: &TableRef, column: &str) -> Result<Vec<Cell>> {
  capture::cells_where(conn, table, column, &format!("{} IS NOT NULL", quote_ident(column)), &[])
}

// ─── Cell updates ────────────────────────────────────────────────────────────

fn find_replace(
  conn: &Connection,
  limit: HistoryLimit,
  table: &TableRef,
  column: &str,
  find: &str,
  replace: &str,
) -> Result<Outcome> {
  if find.is_empty() {
    return Err(invalid("find text must not be empty"));
  }
  if find == replace {
    return Ok(Outcome::default());
  }

  let col = quote_ident(column);
  let filter = format!("instr(CAST({col} AS TEXT), ?1) > 0");
  let needle = [SqlValue::Text(find.to_owned())];
  let before = capture::cells_where(conn, table, column, &filter, &needle)?;
  if before.is_empty() {
    return Ok(Outcome::default());
  }

  let updated = conn.execute(
    &format!(
      "UPDATE {} SET {col} = replace(CAST({col} AS TEXT), ?1, ?2) WHERE {filter}",
      physical(table)
    ),
    rusqlite::params![find, replace],
  )? as u64;
  let entry_id = record(
    conn,
    limit,
    table,
    format!("Replaced \"{find}\" with \"{replace}\" in column {column}"),
    InverseCommand::for_cell_update(column, before),
  )?;

  Ok(Outcome { entry_id, rows_affected: updated, columns: Vec::new() })
}

fn impute(
  conn: &Connection,
  limit: HistoryLimit,
  table: &TableRef,
  column: &str,
  strategy: &ImputeStrategy,
) -> Result<Outcome> {
  let col = quote_ident(column);
  let before = capture::cells_where(conn, table, column, &format!("{col} IS NULL"), &[])?;
  if before.is_empty() {
    return Ok(Outcome::default());
  }

  let fill = match strategy {
    ImputeStrategy::Mean | ImputeStrategy::Median => {
      let xs = numbers(column, &non_null_cells(conn, table, column)?)?;
      let stat = if matches!(strategy, ImputeStrategy::Mean) { mean(&xs) } else { median(&xs) };
      Value::Real(stat.ok_or_else(|| invalid(format!("column {column} has no values to impute from")))?)
    }
    ImputeStrategy::Mode => conn
      .query_row(
        &format!(
          "SELECT {col} FROM {} WHERE {col} IS NOT NULL
           GROUP BY {col} ORDER BY COUNT(*) DESC, {col} ASC LIMIT 1",
          physical(table)
        ),
        [],
        |r| r.get::<_, SqlValue>(0),
      )
      .optional()
      .map_err(|e| Error::from(e).capture())?
      .map(decode_value)
      .ok_or_else(|| invalid(format!("column {column} has no values to impute from")))?,
    ImputeStrategy::Constant(value) if value.is_null() => {
      return Err(invalid("constant fill value must not be NULL"));
    }
    ImputeStrategy::Constant(value) => value.clone(),
  };

  let updated = conn.execute(
    &format!("UPDATE {} SET {col} = ?1 WHERE {col} IS NULL", physical(table)),
    [encode_value(&fill)],
  )? as u64;
  let entry_id = record(
    conn,
    limit,
    table,
    format!("Imputed {updated} missing values in column {column} with {}", fill.render()),
    InverseCommand::for_cell_update(column, before),
  )?;

  Ok(Outcome { entry_id, rows_affected: updated, columns: Vec::new() })
}

fn normalize(
  conn: &Connection,
  limit: HistoryLimit,
  table: &TableRef,
  column: &str,
  method: NormalizeMethod,
) -> Result<Outcome> {
  let cells = non_null_cells(conn, table, column)?;
  let xs = numbers(column, &cells)?;
  if xs.is_empty() {
    return Ok(Outcome::default());
  }

  let scaled: Vec<f64> = match method {
    NormalizeMethod::MinMax => {
      let lo = xs.iter().copied().fold(f64::INFINITY, f64::min);
      let hi = xs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
      let range = hi - lo;
      xs.iter().map(|x| if range == 0.0 { 0.0 } else { (x - lo) / range }).collect()
    }
    NormalizeMethod::ZScore => {
      let m = mean(&xs).unwrap_or_default();
      let sd = std_dev(&xs).unwrap_or_default();
      xs.iter().map(|x| if sd == 0.0 { 0.0 } else { (x - m) / sd }).collect()
    }
  };

  let (before, after): (Vec<Cell>, Vec<Cell>) = cells
    .into_iter()
    .zip(scaled)
    .filter(|(cell, x)| cell.value != Value::Real(*x))
    .map(|(cell, x)| {
      let row_id = cell.row_id;
      (cell, Cell::new(row_id, x))
    })
    .unzip();
  if before.is_empty() {
    return Ok(Outcome::default());
  }

  let updated = tables::update_cells(conn, table, column, &after)?;
  let label = match method {
    NormalizeMethod::MinMax => "min-max",
    NormalizeMethod::ZScore => "z-score",
  };
  let entry_id = record(
    conn,
    limit,
    table,
    format!("Normalized column {column} ({label})"),
    InverseCommand::for_cell_update(column, before),
  )?;

  Ok(Outcome { entry_id, rows_affected: updated, columns: Vec::new() })
}

// ─── Row removals ────────────────────────────────────────────────────────────

fn remove_outliers(
  conn: &Connection,
  limit: HistoryLimit,
  table: &TableRef,
  column: &str,
  threshold: f64,
) -> Result<Outcome> {
  if !(threshold.is_finite() && threshold > 0.0) {
    return Err(invalid("outlier threshold must be a positive number"));
  }
  let cells = non_null_cells(conn, table, column)?;
  let xs = numbers(column, &cells)?;
  let (Some(m), Some(sd)) = (mean(&xs), std_dev(&xs)) else {
    return Ok(Outcome::default());
  };

  let ids: Vec<i64> = cells
    .iter()
    .zip(&xs)
    .filter(|(_, x)| (*x - m).abs() > threshold * sd)
    .map(|(cell, _)| cell.row_id)
    .collect();
  if ids.is_empty() {
    return Ok(Outcome::default());
  }

  let rows = capture::rows(conn, table, &ids)?;
  let deleted = tables::delete_rows(conn, table, &ids)?;
  let entry_id = record(
    conn,
    limit,
    table,
    format!("Removed {deleted} outliers from column {column}"),
    InverseCommand::for_row_delete(rows),
  )?;

  Ok(Outcome { entry_id, rows_affected: deleted, columns: Vec::new() })
}

/// Remove every row equal on all data columns to a row with a smaller id.
fn deduplicate(conn: &Connection, limit: HistoryLimit, table: &TableRef) -> Result<Outcome> {
  let columns = tables::columns(conn, table).map_err(Error::capture)?;
  if columns.is_empty() {
    return Ok(Outcome::default());
  }

  let t = physical(table);
  let equal = columns
    .iter()
    .map(|c| {
      let col = quote_ident(&c.name);
      format!("o.{col} IS {t}.{col}")
    })
    .collect::<Vec<_>>()
    .join(" AND ");
  let filter = format!("EXISTS (SELECT 1 FROM {t} o WHERE o.id < {t}.id AND {equal})");

  let rows = capture::rows_where(conn, table, &filter, &[])?;
  if rows.is_empty() {
    return Ok(Outcome::default());
  }

  let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
  let deleted = tables::delete_rows(conn, table, &ids)?;
  let entry_id = record(
    conn,
    limit,
    table,
    format!("Removed {deleted} duplicate rows"),
    InverseCommand::for_row_delete(rows),
  )?;

  Ok(Outcome { entry_id, rows_affected: deleted, columns: Vec::new() })
}

// ─── Generated columns ───────────────────────────────────────────────────────

fn add_generated(conn: &Connection, table: &TableRef, column: &ColumnDef) -> Result<()> {
  validate_column_name(&column.name)?;
  tables::require_absent(conn, table, &column.name)?;
  tables::add_column(conn, table, column)
}

fn extract_date_part(
  conn: &Connection,
  limit: HistoryLimit,
  table: &TableRef,
  column: &str,
  part: DatePart,
) -> Result<Outcome> {
  let col = quote_ident(column);
  let (column_type, expr) = match part {
    DatePart::DayOfWeek => (ColumnType::Integer, format!("CAST(strftime('%w', {col}) AS INTEGER)")),
    DatePart::Month => (ColumnType::Integer, format!("CAST(strftime('%m', {col}) AS INTEGER)")),
    DatePart::Year => (ColumnType::Integer, format!("CAST(strftime('%Y', {col}) AS INTEGER)")),
    DatePart::Date => (ColumnType::Date, format!("date({col})")),
    DatePart::Time => (ColumnType::Time, format!("time({col})")),
  };
  let target = ColumnDef::new(format!("{column} ({})", part.label()), column_type);

  add_generated(conn, table, &target)?;
  let updated = conn.execute(
    &format!("UPDATE {} SET {} = {expr}", physical(table), quote_ident(&target.name)),
    [],
  )? as u64;
  let entry_id = record(
    conn,
    limit,
    table,
    format!("Extracted {} from column {column}", part.label()),
    InverseCommand::for_column_add(&target.name),
  )?;

  Ok(Outcome { entry_id, rows_affected: updated, columns: vec![target.name] })
}

/// One column name per distinct value. Values that differ only in ASCII case
/// would name the same SQLite column, so repeats get a numeric suffix.
fn one_hot_names(column: &str, values: &[String]) -> Vec<String> {
  let mut taken: Vec<String> = Vec::with_capacity(values.len());
  for value in values {
    let base = format!("{column}_{value}");
    let mut name = base.clone();
    let mut n = 2;
    while taken.iter().any(|t| t.eq_ignore_ascii_case(&name)) {
      name = format!("{base}_{n}");
      n += 1;
    }
    taken.push(name);
  }
  taken
}

fn one_hot_encode(
  conn: &Connection,
  limit: HistoryLimit,
  table: &TableRef,
  column: &str,
) -> Result<Outcome> {
  let col = quote_ident(column);
  let distinct = tables::distinct_text(conn, table, column).map_err(Error::capture)?;
  if distinct.is_empty() {
    return Ok(Outcome::default());
  }

  let mut created = Vec::with_capacity(distinct.len());
  for (value, name) in distinct.iter().zip(one_hot_names(column, &distinct)) {
    let target = ColumnDef::new(name, ColumnType::Integer);
    add_generated(conn, table, &target)?;
    conn.execute(
      &format!(
        "UPDATE {} SET {} = CASE WHEN CAST({col} AS TEXT) = ?1 THEN 1 ELSE 0 END",
        physical(table),
        quote_ident(&target.name)
      ),
      [value],
    )?;
    created.push(target.name);
  }

  let rows_affected: i64 =
    conn.query_row(&format!("SELECT COUNT(*) FROM {}", physical(table)), [], |r| r.get(0))?;
  let entry_id = record(
    conn,
    limit,
    table,
    format!("One-hot encoded column {column} into {} columns", created.len()),
    InverseCommand::for_generated_columns(created.clone()),
  )?;

  Ok(Outcome { entry_id, rows_affected: rows_affected as u64, columns: created })
}

fn bin_interval(
  conn: &Connection,
  limit: HistoryLimit,
  table: &TableRef,
  column: &str,
  bins: u32,
) -> Result<Outcome> {
  if bins == 0 {
    return Err(invalid("bin count must be at least 1"));
  }
  let cells = non_null_cells(conn, table, column)?;
  let xs = numbers(column, &cells)?;
  if xs.is_empty() {
    return Ok(Outcome::default());
  }
  let lo = xs.iter().copied().fold(f64::INFINITY, f64::min);
  let hi = xs.iter().copied().fold(f64::NEG_INFINITY, f64::max);

  let target = ColumnDef::new(format!("{column}_bin"), ColumnType::Text);
  add_generated(conn, table, &target)?;
  let labels: Vec<Cell> = cells
    .iter()
    .zip(&xs)
    .map(|(cell, x)| Cell::new(cell.row_id, bin_label(*x, lo, hi, bins)))
    .collect();
  let updated = tables::update_cells(conn, table, &target.name, &labels)?;
  let entry_id = record(
    conn,
    limit,
    table,
    format!("Binned column {column} into {bins} intervals"),
    InverseCommand::for_column_add(&target.name),
  )?;

  Ok(Outcome { entry_id, rows_affected: updated, columns: vec![target.name] })
}
