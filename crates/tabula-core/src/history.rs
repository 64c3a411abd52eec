//! The undo-log rules: log writer, capacity manager, frontier, undo executor
//! and history listing.
//!
//! Each rule is a free function generic over the [`HistoryLog`] seam, so a
//! backend only supplies storage primitives. Backends call these inside the
//! same transaction as the forward mutation (or the inverse, for undo); every
//! error is expected to abort that transaction.

use std::fmt::Display;

use chrono::{DateTime, Utc};

use crate::{
  Error,
  entry::{
    EntryId, HistoryItem, HistoryLimit, HistoryPage, HistoryQuery, LogEntry, NewEntry, Retirement,
  },
  inverse::InverseCommand,
  table::TableRef,
};

// ─── Seams ───────────────────────────────────────────────────────────────────

/// Storage primitives for the history log of one store.
///
/// Implementations must give every entry an id greater than any id ever
/// handed out before, across all tables.
pub trait HistoryLog {
  type Error: std::error::Error + From<Error>;

  /// Persist `entry`. An entry without an inverse is written as a note
  /// (`undone = true`, retired as [`Retirement::Note`]).
  fn insert(&mut self, entry: &NewEntry) -> Result<EntryId, Self::Error>;

  fn get(&self, table: &TableRef, id: EntryId) -> Result<Option<LogEntry>, Self::Error>;

  /// Number of `undone = false` entries for the table.
  fn count_undoable(&self, table: &TableRef) -> Result<u64, Self::Error>;

  /// Minimum id among `undone = false` entries.
  fn oldest_undoable(&self, table: &TableRef) -> Result<Option<EntryId>, Self::Error>;

  /// Maximum id among `undone = false` entries. Use [`frontier`] rather than
  /// calling this directly.
  fn newest_undoable(&self, table: &TableRef) -> Result<Option<EntryId>, Self::Error>;

  /// Set `undone = true`, clear the inverse and record `how`, but only if the
  /// entry is still `undone = false`. Returns whether it changed.
  fn retire(&mut self, id: EntryId, how: Retirement) -> Result<bool, Self::Error>;

  /// One page of entries, filtered, ordered and windowed per `query`.
  fn entries(&self, table: &TableRef, query: &HistoryQuery) -> Result<Vec<LogEntry>, Self::Error>;

  /// Number of entries for the table, optionally restricted to a search term.
  fn count(&self, table: &TableRef, search: Option<&str>) -> Result<u64, Self::Error>;

  /// Delete every entry of the table.
  fn purge(&mut self, table: &TableRef) -> Result<u64, Self::Error>;

  /// Delete the table's entries strictly newer than `after`.
  fn purge_after(&mut self, table: &TableRef, after: DateTime<Utc>) -> Result<u64, Self::Error>;

  /// Re-key the table's entries onto `new_name`.
  fn rename(&mut self, table: &TableRef, new_name: &str) -> Result<u64, Self::Error>;
}

/// Executes inverse commands against the command store.
pub trait InverseApplier {
  type Error: Display;

  fn apply(&mut self, table: &TableRef, inverse: &InverseCommand) -> Result<(), Self::Error>;
}

// ─── Log writer & capacity ───────────────────────────────────────────────────

/// Append a log entry and enforce the capacity policy for its table.
///
/// Any failure is reported as [`Error::Append`]; the caller's transaction
/// must roll the forward mutation back with it.
pub fn append<L: HistoryLog>(
  log: &mut L,
  limit: HistoryLimit,
  entry: NewEntry,
) -> Result<EntryId, L::Error> {
  let id = log.insert(&entry).map_err(append_failed)?;
  if entry.inverse.is_some() {
    enforce_capacity(log, &entry.table, limit).map_err(append_failed)?;
  }
  Ok(id)
}

fn append_failed<E: Display + From<Error>>(e: E) -> E { Error::Append(e.to_string()).into() }

/// Expire the oldest undoable entries until at most `limit` remain.
///
/// With a fixed limit this evicts at most one entry per append. It loops so
/// that a lowered limit is honoured on the next append too. Returns the ids
/// that were expired, oldest first.
pub fn enforce_capacity<L: HistoryLog>(
  log: &mut L,
  table: &TableRef,
  limit: HistoryLimit,
) -> Result<Vec<EntryId>, L::Error> {
  let Some(bound) = limit.bound() else {
    return Ok(Vec::new());
  };

  let mut evicted = Vec::new();
  let mut live = log.count_undoable(table)?;
  while live > bound {
    let Some(oldest) = log.oldest_undoable(table)? else { break };
    if log.retire(oldest, Retirement::Expired)? {
      evicted.push(oldest);
    }
    live -= 1;
  }
  Ok(evicted)
}

// ─── Frontier & undo ─────────────────────────────────────────────────────────

/// The single entry of `table` that may be undone: the newest entry that is
/// still `undone = false`.
pub fn frontier<L: HistoryLog>(log: &L, table: &TableRef) -> Result<Option<EntryId>, L::Error> {
  log.newest_undoable(table)
}

/// Undo entry `id` of `table`.
///
/// The entry must exist, be `undone = false` and be the frontier; there is no
/// cascading undo. If the inverse fails the entry is left untouched and the
/// failure is returned as [`Error::UndoExecution`]. Returns the entry as it
/// stands after the undo.
pub fn undo<S>(
  store: &mut S,
  table: &TableRef,
  id: EntryId,
) -> Result<LogEntry, <S as HistoryLog>::Error>
where
  S: HistoryLog + InverseApplier,
{
  let entry = store.get(table, id)?.ok_or(Error::EntryNotFound(id))?;
  let current = frontier(&*store, table)?;

  let not_frontier = || Error::UndoNotFrontier { entry_id: id, frontier: current };
  if entry.undone || current != Some(id) {
    return Err(not_frontier().into());
  }
  let Some(inverse) = entry.inverse.as_ref() else {
    return Err(not_frontier().into());
  };

  store.apply(table, inverse).map_err(|e| Error::UndoExecution {
    entry_id: id,
    reason:   e.to_string(),
  })?;

  // Check-and-set: a concurrent undo that got here first wins.
  if !store.retire(id, Retirement::Undone)? {
    return Err(not_frontier().into());
  }

  Ok(LogEntry {
    inverse: None,
    undone: true,
    retired: Some(Retirement::Undone),
    ..entry
  })
}

// ─── Query ───────────────────────────────────────────────────────────────────

/// A page of `table`'s history annotated with undo eligibility.
pub fn list<L: HistoryLog>(
  log: &L,
  table: &TableRef,
  query: &HistoryQuery,
) -> Result<HistoryPage, L::Error> {
  let current = frontier(log, table)?;
  let records_total = log.count(table, None)?;
  let records_filtered = match query.search_term() {
    Some(term) => log.count(table, Some(term))?,
    None => records_total,
  };

  let entries = log
    .entries(table, query)?
    .into_iter()
    .map(|e| HistoryItem::from_entry(e, current))
    .collect();

  Ok(HistoryPage { records_total, records_filtered, entries })
}
