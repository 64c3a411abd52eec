//! The single interpreter for [`InverseCommand`].

use rusqlite::Connection;
use tabula_core::{inverse::InverseCommand, table::TableRef, value::ColumnDef};

use crate::{Result, tables};

/// Execute `inverse` against `table`. The caller owns the transaction; any
/// error must roll it back.
pub fn apply_inverse(conn: &Connection, table: &TableRef, inverse: &InverseCommand) -> Result<()> {
  tables::require(conn, table)?;

  match inverse {
    InverseCommand::DeleteRows { ids } => {
      tables::delete_rows(conn, table, ids)?;
    }
    InverseCommand::RestoreRows { rows } => {
      for row in rows {
        tables::insert_row(conn, table, Some(row.id), &row.values)?;
      }
    }
    InverseCommand::DropColumns { columns } => {
      for column in columns {
        tables::drop_column(conn, table, column)?;
      }
    }
    InverseCommand::RestoreColumn { column, column_type, cells } => {
      tables::add_column(conn, table, &ColumnDef::new(column.clone(), *column_type))?;
      tables::update_cells(conn, table, column, cells)?;
    }
    InverseCommand::RenameColumn { column, restore_to } => {
      tables::rename_column(conn, table, column, restore_to)?;
    }
    InverseCommand::RetypeColumn { column, column_type } => {
      tables::retype_column(conn, table, column, *column_type)?;
    }
    InverseCommand::RestoreCells { column, cells } => {
      tables::update_cells(conn, table, column, cells)?;
    }
  }
  Ok(())
}
