//! An in-memory [`HistoryLog`] and [`InverseApplier`].
//!
//! Useful for exercising the history rules without a database. Applied
//! inverses are recorded rather than executed.

use chrono::{DateTime, Utc};

use crate::{
  Error, Result,
  entry::{Direction, EntryId, HistoryQuery, LogEntry, NewEntry, OrderKey, Retirement},
  history::{HistoryLog, InverseApplier},
  inverse::InverseCommand,
  table::TableRef,
};

#[derive(Debug, Default)]
pub struct MemoryLog {
  entries:    Vec<LogEntry>,
  last_id:    EntryId,
  applied:    Vec<(TableRef, InverseCommand)>,
  fail_apply: Option<String>,
}

impl MemoryLog {
  pub fn new() -> Self { Self::default() }

  /// Every entry of every table, in id order.
  pub fn all_entries(&self) -> &[LogEntry] { &self.entries }

  pub fn entry(&self, id: EntryId) -> Option<&LogEntry> { self.entries.iter().find(|e| e.id == id) }

  /// Inverses passed to [`InverseApplier::apply`], in order.
  pub fn applied(&self) -> &[(TableRef, InverseCommand)] { &self.applied }

  /// Make the next `apply` fail with `reason`.
  pub fn fail_next_apply(&mut self, reason: impl Into<String>) {
    self.fail_apply = Some(reason.into());
  }

  fn of<'a>(&'a self, table: &'a TableRef) -> impl Iterator<Item = &'a LogEntry> + 'a {
    self
      .entries
      .iter()
      .filter(move |e| e.dataset_id == table.dataset_id && e.table_name == table.table_name)
  }
}

fn matches_search(entry: &LogEntry, search: Option<&str>) -> bool {
  search.is_none_or(|s| entry.description.to_lowercase().contains(&s.to_lowercase()))
}

impl HistoryLog for MemoryLog {
  type Error = Error;

  fn insert(&mut self, entry: &NewEntry) -> Result<EntryId> {
    self.last_id += 1;
    let is_note = entry.inverse.is_none();
    self.entries.push(LogEntry {
      id:          self.last_id,
      dataset_id:  entry.table.dataset_id,
      table_name:  entry.table.table_name.clone(),
      timestamp:   entry.timestamp,
      description: entry.description.clone(),
      inverse:     entry.inverse.clone(),
      undone:      is_note,
      retired:     is_note.then_some(Retirement::Note),
    });
    Ok(self.last_id)
  }

  fn get(&self, table: &TableRef, id: EntryId) -> Result<Option<LogEntry>> {
    Ok(self.of(table).find(|e| e.id == id).cloned())
  }

  fn count_undoable(&self, table: &TableRef) -> Result<u64> {
    Ok(self.of(table).filter(|e| !e.undone).count() as u64)
  }

  fn oldest_undoable(&self, table: &TableRef) -> Result<Option<EntryId>> {
    Ok(self.of(table).filter(|e| !e.undone).map(|e| e.id).min())
  }

  fn newest_undoable(&self, table: &TableRef) -> Result<Option<EntryId>> {
    Ok(self.of(table).filter(|e| !e.undone).map(|e| e.id).max())
  }

  fn retire(&mut self, id: EntryId, how: Retirement) -> Result<bool> {
    match self.entries.iter_mut().find(|e| e.id == id && !e.undone) {
      Some(entry) => {
        entry.undone = true;
        entry.inverse = None;
        entry.retired = Some(how);
        Ok(true)
      }
      None => Ok(false),
    }
  }

  fn entries(&self, table: &TableRef, query: &HistoryQuery) -> Result<Vec<LogEntry>> {
    let search = query.search_term();
    let mut found: Vec<LogEntry> =
      self.of(table).filter(|e| matches_search(e, search)).cloned().collect();

    if let Some(ordering) = query.ordering {
      found.sort_by(|a, b| {
        let primary = match ordering.key {
          OrderKey::Timestamp => a.timestamp.cmp(&b.timestamp),
          OrderKey::Description => a.description.cmp(&b.description),
        };
        let ord = primary.then(a.id.cmp(&b.id));
        match ordering.direction {
          Direction::Asc => ord,
          Direction::Desc => ord.reverse(),
        }
      });
    }

    Ok(
      found
        .into_iter()
        .skip(query.offset)
        .take(query.limit.unwrap_or(usize::MAX))
        .collect(),
    )
  }

  fn count(&self, table: &TableRef, search: Option<&str>) -> Result<u64> {
    Ok(self.of(table).filter(|e| matches_search(e, search)).count() as u64)
  }

  fn purge(&mut self, table: &TableRef) -> Result<u64> {
    let before = self.entries.len();
    self.entries.retain(|e| e.table_ref() != *table);
    Ok((before - self.entries.len()) as u64)
  }

  fn purge_after(&mut self, table: &TableRef, after: DateTime<Utc>) -> Result<u64> {
    let before = self.entries.len();
    self.entries.retain(|e| e.table_ref() != *table || e.timestamp <= after);
    Ok((before - self.entries.len()) as u64)
  }

  fn rename(&mut self, table: &TableRef, new_name: &str) -> Result<u64> {
    let mut renamed = 0;
    for entry in self.entries.iter_mut().filter(|e| e.table_ref() == *table) {
      entry.table_name = new_name.to_owned();
      renamed += 1;
    }
    Ok(renamed)
  }
}

impl InverseApplier for MemoryLog {
  type Error = Error;

  fn apply(&mut self, table: &TableRef, inverse: &InverseCommand) -> Result<()> {
    if let Some(reason) = self.fail_apply.take() {
      return Err(Error::InvalidArgument(reason));
    }
    self.applied.push((table.clone(), inverse.clone()));
    Ok(())
  }
}
