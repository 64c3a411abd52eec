//! Log entries and the read-side types built from them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::{inverse::InverseCommand, table::TableRef};

/// Store-wide, monotonically increasing entry identifier.
pub type EntryId = i64;

// ─── Entries ─────────────────────────────────────────────────────────────────

/// Why an entry is no longer undoable.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Retirement {
  /// Its inverse was executed.
  Undone,
  /// Evicted from the undoable window by the capacity policy.
  Expired,
  /// Informational entry; it never had an inverse.
  Note,
}

/// One logged mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
  pub id:          EntryId,
  pub dataset_id:  i64,
  pub table_name:  String,
  pub timestamp:   DateTime<Utc>,
  pub description: String,
  /// `None` once consumed or expired, and always for notes.
  pub inverse:     Option<InverseCommand>,
  pub undone:      bool,
  pub retired:     Option<Retirement>,
}

impl LogEntry {
  pub fn table_ref(&self) -> TableRef { TableRef::new(self.dataset_id, &self.table_name) }

  /// Place this entry in the lifecycle, given the table's current frontier.
  pub fn state(&self, frontier: Option<EntryId>) -> EntryState {
    match (self.undone, self.retired) {
      (false, _) if frontier == Some(self.id) => EntryState::Undoable,
      (false, _) => EntryState::Historical,
      (true, Some(Retirement::Expired)) => EntryState::Expired,
      (true, Some(Retirement::Note)) => EntryState::Note,
      (true, _) => EntryState::Consumed,
    }
  }
}

/// Input to [`crate::history::append`]. The id is assigned by the log.
#[derive(Debug, Clone)]
pub struct NewEntry {
  pub table:       TableRef,
  pub timestamp:   DateTime<Utc>,
  pub description: String,
  /// `None` writes a note: permanent history that is never undoable.
  pub inverse:     Option<InverseCommand>,
}

impl NewEntry {
  pub fn new(table: TableRef, description: impl Into<String>, inverse: InverseCommand) -> Self {
    Self {
      table,
      timestamp: Utc::now(),
      description: description.into(),
      inverse: Some(inverse),
    }
  }

  pub fn note(table: TableRef, description: impl Into<String>) -> Self {
    Self {
      table,
      timestamp: Utc::now(),
      description: description.into(),
      inverse: None,
    }
  }

  pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
    self.timestamp = timestamp;
    self
  }
}

/// Lifecycle of an entry. Transitions only ever move forward:
/// `Undoable → Historical` (a newer entry arrived), and either of those to
/// `Consumed` (undo) or `Expired` (eviction).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryState {
  Undoable,
  Historical,
  Consumed,
  Expired,
  Note,
}

// ─── Capacity ────────────────────────────────────────────────────────────────

/// Maximum number of undoable entries kept per table. Zero means unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HistoryLimit(pub u32);

impl HistoryLimit {
  pub const UNBOUNDED: Self = Self(0);

  pub fn bound(self) -> Option<u64> { (self.0 > 0).then_some(u64::from(self.0)) }
}

// ─── Query ───────────────────────────────────────────────────────────────────

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OrderKey {
  Timestamp,
  Description,
}

#[derive(
  Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Direction {
  #[default]
  Asc,
  Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ordering {
  pub key:       OrderKey,
  pub direction: Direction,
}

/// Parameters for [`crate::history::list`].
#[derive(Debug, Clone, Default)]
pub struct HistoryQuery {
  pub offset:   usize,
  /// `None` returns every remaining entry.
  pub limit:    Option<usize>,
  /// `None` keeps creation order.
  pub ordering: Option<Ordering>,
  /// Case-insensitive substring filter on the description.
  pub search:   Option<String>,
}

impl HistoryQuery {
  /// The search term, if it is non-empty.
  pub fn search_term(&self) -> Option<&str> {
    self.search.as_deref().filter(|s| !s.is_empty())
  }
}

/// One row of a history listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryItem {
  pub entry_id:    EntryId,
  pub timestamp:   DateTime<Utc>,
  pub description: String,
  pub undone:      bool,
  /// Exactly one item per table has this set while anything is undoable.
  pub is_frontier: bool,
  pub state:       EntryState,
}

impl HistoryItem {
  pub fn from_entry(entry: LogEntry, frontier: Option<EntryId>) -> Self {
    let state = entry.state(frontier);
    Self {
      entry_id: entry.id,
      timestamp: entry.timestamp,
      description: entry.description,
      undone: entry.undone,
      is_frontier: frontier == Some(entry.id),
      state,
    }
  }
}

/// A page of history plus the counts needed for pagination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryPage {
  /// All entries for the table, ignoring the search filter.
  pub records_total:    u64,
  /// Entries matching the search filter.
  pub records_filtered: u64,
  pub entries:          Vec<HistoryItem>,
}
