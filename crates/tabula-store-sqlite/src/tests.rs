//! Integration tests for `SqliteStore` against an in-memory database.

use std::{collections::BTreeMap, time::Duration};

use chrono::Utc;
use rusqlite::Connection;
use tabula_core::{
  CoreError as _,
  entry::{Direction, EntryState, HistoryLimit, HistoryQuery, OrderKey, Ordering},
  history::HistoryLog as _,
  store::SheetStore,
  table::{Comparison, Predicate, TableRef},
  transform::{DatePart, ImputeStrategy, NormalizeMethod, Transform},
  value::{ColumnDef, ColumnType, Row, Value},
};

use crate::{Error, SqliteHistory, SqliteStore, ops, schema::SCHEMA};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn people() -> TableRef { TableRef::new(1, "people") }

fn core(e: &Error) -> &tabula_core::Error { e.core().expect("core error") }

fn values(pairs: &[(&str, Value)]) -> BTreeMap<String, Value> {
  pairs.iter().map(|(k, v)| ((*k).to_owned(), v.clone())).collect()
}

async fn people_table(s: &SqliteStore) {
  s.create_table(
    people(),
    vec![ColumnDef::new("name", ColumnType::Text), ColumnDef::new("age", ColumnType::Integer)],
    None,
  )
  .await
  .unwrap();
}

async fn add_person(s: &SqliteStore, name: &str, age: i64) -> i64 {
  s.insert_row(people(), values(&[("name", name.into()), ("age", age.into())]))
    .await
    .unwrap()
    .row_id
}

async fn single_column_table(s: &SqliteStore, column: &str, ty: ColumnType, cells: &[Value]) -> TableRef {
  let t = TableRef::new(1, "data");
  s.create_table(t.clone(), vec![ColumnDef::new(column, ty)], None).await.unwrap();
  for v in cells {
    s.insert_row(t.clone(), values(&[(column, v.clone())])).await.unwrap();
  }
  t
}

async fn column_values(s: &SqliteStore, t: &TableRef, column: &str) -> Vec<Value> {
  s.rows(t.clone()).await.unwrap().iter().map(|r| r.get(column).clone()).collect()
}

async fn frontier(s: &SqliteStore, t: &TableRef) -> Option<i64> {
  s.history(t.clone(), HistoryQuery::default())
    .await
    .unwrap()
    .entries
    .into_iter()
    .find(|i| i.is_frontier)
    .map(|i| i.entry_id)
}

// ─── Tables ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_table_logs_a_note() {
  let s = store().await;
  people_table(&s).await;

  let info = s.describe_table(people()).await.unwrap().unwrap();
  assert_eq!(info.columns.len(), 2);
  assert_eq!(info.column("age").unwrap().column_type, ColumnType::Integer);

  let page = s.history(people(), HistoryQuery::default()).await.unwrap();
  assert_eq!(page.records_total, 1);
  assert_eq!(page.entries[0].description, "Created table");
  assert_eq!(page.entries[0].state, EntryState::Note);
  assert!(!page.entries[0].is_frontier);
}

#[tokio::test]
async fn duplicate_table_is_rejected() {
  let s = store().await;
  people_table(&s).await;
  let err = s.create_table(people(), vec![], None).await.unwrap_err();
  assert!(matches!(core(&err), tabula_core::Error::TableExists { .. }));
}

#[tokio::test]
async fn table_names_differing_only_in_case_collide() {
  let s = store().await;
  people_table(&s).await;
  let err = s.create_table(TableRef::new(1, "People"), vec![], None).await.unwrap_err();
  assert!(matches!(core(&err), tabula_core::Error::TableExists { .. }));

  let err = s
    .create_table(
      TableRef::new(2, "t"),
      vec![ColumnDef::new("name", ColumnType::Text), ColumnDef::new("NAME", ColumnType::Text)],
      None,
    )
    .await
    .unwrap_err();
  assert!(matches!(core(&err), tabula_core::Error::ColumnExists(_)));
  assert!(s.describe_table(TableRef::new(2, "t")).await.unwrap().is_none());
}

#[tokio::test]
async fn delete_table_purges_only_its_history() {
  let s = store().await;
  people_table(&s).await;
  let orders = TableRef::new(1, "orders");
  s.create_table(orders.clone(), vec![ColumnDef::new("total", ColumnType::Real)], None)
    .await
    .unwrap();
  add_person(&s, "ada", 36).await;
  let last = s
    .insert_row(orders.clone(), values(&[("total", Value::Real(9.5))]))
    .await
    .unwrap()
    .entry_id;

  s.delete_table(people()).await.unwrap();
  assert!(s.describe_table(people()).await.unwrap().is_none());
  assert_eq!(s.history(orders.clone(), HistoryQuery::default()).await.unwrap().records_total, 2);

  people_table(&s).await;
  let page = s.history(people(), HistoryQuery::default()).await.unwrap();
  assert_eq!(page.records_total, 1);
  assert!(page.entries[0].entry_id > last);
}

#[tokio::test]
async fn rename_table_keeps_history_addressable() {
  let s = store().await;
  people_table(&s).await;
  add_person(&s, "ada", 36).await;
  let inserted = frontier(&s, &people()).await.unwrap();

  let info = s.rename_table(people(), "persons".into()).await.unwrap();
  let persons = info.table_ref();
  assert_eq!(persons, TableRef::new(1, "persons"));

  let page = s.history(persons.clone(), HistoryQuery::default()).await.unwrap();
  assert_eq!(page.records_total, 3);
  assert_eq!(page.entries[2].description, "Renamed table from people");
  assert_eq!(page.entries[2].state, EntryState::Note);

  s.undo(persons.clone(), inserted).await.unwrap();
  assert!(s.rows(persons).await.unwrap().is_empty());

  let err = s.history(people(), HistoryQuery::default()).await.unwrap_err();
  assert!(core(&err).is_not_found());
}

// ─── Row round trips ─────────────────────────────────────────────────────────

#[tokio::test]
async fn insert_then_undo_removes_the_row() {
  let s = store().await;
  people_table(&s).await;
  let inserted = s
    .insert_row(people(), values(&[("name", "ada".into()), ("age", Value::Integer(36))]))
    .await
    .unwrap();

  let entry = s.undo(people(), inserted.entry_id).await.unwrap();
  assert!(entry.undone);
  assert!(entry.inverse.is_none());
  assert!(s.rows(people()).await.unwrap().is_empty());
}

#[tokio::test]
async fn row_delete_round_trip_keeps_ids() {
  let s = store().await;
  people_table(&s).await;
  let x = add_person(&s, "x", 30).await;
  add_person(&s, "y", 40).await;
  let before = s.rows(people()).await.unwrap();

  let outcome = s.delete_rows(people(), vec![x]).await.unwrap();
  assert_eq!(outcome.rows_affected, 1);
  assert_eq!(s.rows(people()).await.unwrap().len(), 1);

  let entry_id = outcome.entry_id.unwrap();
  let history = s.history(people(), HistoryQuery::default()).await.unwrap();
  assert_eq!(history.entries.last().unwrap().description, format!("Deleted row #{x}"));

  s.undo(people(), entry_id).await.unwrap();
  assert_eq!(s.rows(people()).await.unwrap(), before);
}

#[tokio::test]
async fn deleting_a_missing_row_changes_nothing() {
  let s = store().await;
  people_table(&s).await;
  let x = add_person(&s, "x", 30).await;

  let err = s.delete_rows(people(), vec![x, x + 10]).await.unwrap_err();
  assert!(matches!(core(&err), tabula_core::Error::RowNotFound(id) if *id == x + 10));
  assert_eq!(s.rows(people()).await.unwrap().len(), 1);
  assert_eq!(s.history(people(), HistoryQuery::default()).await.unwrap().records_total, 2);
}

#[tokio::test]
async fn predicate_delete_round_trip() {
  let s = store().await;
  people_table(&s).await;
  add_person(&s, "ada", 36).await;
  add_person(&s, "bob", 25).await;
  add_person(&s, "cy", 52).await;
  let before = s.rows(people()).await.unwrap();

  let outcome = s
    .delete_where(people(), vec![
      Predicate::new("age", Comparison::Gt, 50_i64),
      Predicate::new("name", Comparison::Contains, "ad").or(),
    ])
    .await
    .unwrap();
  assert_eq!(outcome.rows_affected, 2);
  let left: Vec<Row> = s.rows(people()).await.unwrap();
  assert_eq!(left.len(), 1);
  assert_eq!(left[0].get("name"), &Value::from("bob"));

  s.undo(people(), outcome.entry_id.unwrap()).await.unwrap();
  assert_eq!(s.rows(people()).await.unwrap(), before);
}

#[tokio::test]
async fn predicate_delete_matching_nothing_logs_nothing() {
  let s = store().await;
  people_table(&s).await;
  add_person(&s, "ada", 36).await;

  let outcome = s
    .delete_where(people(), vec![Predicate::new("age", Comparison::Lt, 0_i64)])
    .await
    .unwrap();
  assert_eq!(outcome.entry_id, None);
  assert_eq!(s.history(people(), HistoryQuery::default()).await.unwrap().records_total, 2);
}

#[tokio::test]
async fn insert_into_unknown_column_is_rejected() {
  let s = store().await;
  people_table(&s).await;
  let err = s.insert_row(people(), values(&[("email", "a@b".into())])).await.unwrap_err();
  assert!(matches!(core(&err), tabula_core::Error::ColumnNotFound(c) if c == "email"));
}

// ─── Column round trips ──────────────────────────────────────────────────────

#[tokio::test]
async fn column_drop_round_trip_restores_every_value() {
  let s = store().await;
  let t = single_column_table(&s, "score", ColumnType::Integer, &[
    Value::Integer(10),
    Value::Null,
    Value::Integer(20),
  ])
  .await;

  let outcome = s.drop_column(t.clone(), "score".into()).await.unwrap();
  assert!(s.describe_table(t.clone()).await.unwrap().unwrap().columns.is_empty());

  s.undo(t.clone(), outcome.entry_id.unwrap()).await.unwrap();
  let info = s.describe_table(t.clone()).await.unwrap().unwrap();
  assert_eq!(info.columns, vec![ColumnDef::new("score", ColumnType::Integer)]);

  let rows = s.rows(t).await.unwrap();
  let restored: Vec<(i64, Value)> = rows.iter().map(|r| (r.id, r.get("score").clone())).collect();
  assert_eq!(restored, vec![
    (1, Value::Integer(10)),
    (2, Value::Null),
    (3, Value::Integer(20)),
  ]);
}

#[tokio::test]
async fn dropping_an_unknown_column_logs_nothing() {
  let s = store().await;
  people_table(&s).await;

  let err = s.drop_column(people(), "missing".into()).await.unwrap_err();
  assert!(matches!(core(&err), tabula_core::Error::ColumnNotFound(_)));
  assert_eq!(s.history(people(), HistoryQuery::default()).await.unwrap().records_total, 1);
  assert_eq!(s.describe_table(people()).await.unwrap().unwrap().columns.len(), 2);
}

#[tokio::test]
async fn the_row_id_column_is_reserved() {
  let s = store().await;
  people_table(&s).await;
  let err = s.drop_column(people(), "id".into()).await.unwrap_err();
  assert!(matches!(core(&err), tabula_core::Error::InvalidName(_)));
}

#[tokio::test]
async fn the_retype_scratch_column_is_reserved() {
  let s = store().await;
  people_table(&s).await;
  let err = s
    .add_column(people(), ColumnDef::new("__tabula_retype", ColumnType::Text))
    .await
    .unwrap_err();
  assert!(matches!(core(&err), tabula_core::Error::InvalidName(_)));
}

#[tokio::test]
async fn add_column_round_trip() {
  let s = store().await;
  people_table(&s).await;
  let outcome = s.add_column(people(), ColumnDef::new("email", ColumnType::Text)).await.unwrap();
  assert_eq!(outcome.columns, vec!["email".to_owned()]);

  let err = s.add_column(people(), ColumnDef::new("email", ColumnType::Text)).await.unwrap_err();
  assert!(matches!(core(&err), tabula_core::Error::ColumnExists(_)));

  s.undo(people(), outcome.entry_id.unwrap()).await.unwrap();
  let info = s.describe_table(people()).await.unwrap().unwrap();
  assert!(info.column("email").is_none());
}

#[tokio::test]
async fn adding_a_column_that_differs_only_in_case_is_a_conflict() {
  let s = store().await;
  people_table(&s).await;
  let err = s.add_column(people(), ColumnDef::new("Name", ColumnType::Text)).await.unwrap_err();
  assert!(matches!(core(&err), tabula_core::Error::ColumnExists(_)));
  assert_eq!(s.history(people(), HistoryQuery::default()).await.unwrap().records_total, 1);
}

#[tokio::test]
async fn rename_column_round_trip() {
  let s = store().await;
  people_table(&s).await;
  add_person(&s, "ada", 36).await;

  let outcome = s.rename_column(people(), "age".into(), "years".into()).await.unwrap();
  let rows = s.rows(people()).await.unwrap();
  assert_eq!(rows[0].get("years"), &Value::Integer(36));

  s.undo(people(), outcome.entry_id.unwrap()).await.unwrap();
  let rows = s.rows(people()).await.unwrap();
  assert_eq!(rows[0].get("age"), &Value::Integer(36));
  assert!(!rows[0].values.contains_key("years"));
}

#[tokio::test]
async fn retype_round_trip_casts_back() {
  let s = store().await;
  people_table(&s).await;
  add_person(&s, "ada", 36).await;

  let outcome = s.retype_column(people(), "age".into(), ColumnType::Text).await.unwrap();
  let info = s.describe_table(people()).await.unwrap().unwrap();
  assert_eq!(info.column("age").unwrap().column_type, ColumnType::Text);
  assert_eq!(column_values(&s, &people(), "age").await, vec![Value::from("36")]);

  let history = s.history(people(), HistoryQuery::default()).await.unwrap();
  assert_eq!(history.entries.last().unwrap().description, "Updated column age to have type TEXT");

  s.undo(people(), outcome.entry_id.unwrap()).await.unwrap();
  let info = s.describe_table(people()).await.unwrap().unwrap();
  assert_eq!(info.column("age").unwrap().column_type, ColumnType::Integer);
  assert_eq!(column_values(&s, &people(), "age").await, vec![Value::Integer(36)]);
}

#[tokio::test]
async fn retype_to_the_same_type_logs_nothing() {
  let s = store().await;
  people_table(&s).await;
  let outcome = s.retype_column(people(), "age".into(), ColumnType::Integer).await.unwrap();
  assert_eq!(outcome.entry_id, None);
}

// ─── Frontier & capacity ─────────────────────────────────────────────────────

#[tokio::test]
async fn limit_two_scenario() {
  let s = store().await.with_history_limit(HistoryLimit(2));
  people_table(&s).await;
  let a = s.add_column(people(), ColumnDef::new("a", ColumnType::Text)).await.unwrap();
  let b = s.add_column(people(), ColumnDef::new("b", ColumnType::Text)).await.unwrap();
  let c = s.add_column(people(), ColumnDef::new("c", ColumnType::Text)).await.unwrap();
  let (a, b, c) = (a.entry_id.unwrap(), b.entry_id.unwrap(), c.entry_id.unwrap());

  let page = s.history(people(), HistoryQuery::default()).await.unwrap();
  let states: Vec<_> = page.entries.iter().map(|i| i.state).collect();
  assert_eq!(states, vec![
    EntryState::Note,
    EntryState::Expired,
    EntryState::Historical,
    EntryState::Undoable,
  ]);
  assert_eq!(frontier(&s, &people()).await, Some(c));

  s.undo(people(), c).await.unwrap();
  assert_eq!(frontier(&s, &people()).await, Some(b));

  let err = s.undo(people(), c).await.unwrap_err();
  assert!(matches!(
    core(&err),
    tabula_core::Error::UndoNotFrontier { entry_id, frontier: Some(f) } if *entry_id == c && *f == b
  ));

  s.undo(people(), b).await.unwrap();
  let err = s.undo(people(), a).await.unwrap_err();
  assert!(matches!(core(&err), tabula_core::Error::UndoNotFrontier { frontier: None, .. }));

  // `a` expired, so its column stays.
  let info = s.describe_table(people()).await.unwrap().unwrap();
  let names: Vec<_> = info.columns.iter().map(|c| c.name.as_str()).collect();
  assert_eq!(names, vec!["name", "age", "a"]);
}

#[tokio::test]
async fn undo_of_a_non_frontier_entry_changes_nothing() {
  let s = store().await;
  people_table(&s).await;
  add_person(&s, "ada", 36).await;
  let first = s.history(people(), HistoryQuery::default()).await.unwrap().entries[1].entry_id;
  add_person(&s, "bob", 25).await;

  let before = s.history(people(), HistoryQuery::default()).await.unwrap();
  let err = s.undo(people(), first).await.unwrap_err();
  assert!(matches!(core(&err), tabula_core::Error::UndoNotFrontier { .. }));
  assert_eq!(s.rows(people()).await.unwrap().len(), 2);
  assert_eq!(s.history(people(), HistoryQuery::default()).await.unwrap(), before);
}

#[tokio::test]
async fn undo_of_unknown_entry_is_not_found() {
  let s = store().await;
  people_table(&s).await;
  let err = s.undo(people(), 999).await.unwrap_err();
  assert!(matches!(core(&err), tabula_core::Error::EntryNotFound(999)));
}

#[test]
fn failed_inverse_leaves_the_entry_undoable() {
  let mut conn = Connection::open_in_memory().unwrap();
  conn.execute_batch(SCHEMA).unwrap();
  let t = people();
  ops::create_table(&conn, HistoryLimit::UNBOUNDED, &t, &[], None).unwrap();
  let added = ops::add_column(&conn, HistoryLimit::UNBOUNDED, &t, &ColumnDef::new("score", ColumnType::Real))
    .unwrap()
    .entry_id
    .unwrap();

  // Out-of-band change the inverse cannot cope with.
  conn.execute(r#"ALTER TABLE "d1_people" DROP COLUMN "score""#, []).unwrap();

  let tx = conn.transaction().unwrap();
  let err = tabula_core::history::undo(&mut SqliteHistory::new(&tx), &t, added).unwrap_err();
  drop(tx);
  assert!(matches!(core(&err), tabula_core::Error::UndoExecution { entry_id, .. } if *entry_id == added));

  let entry = SqliteHistory::new(&conn).get(&t, added).unwrap().unwrap();
  assert!(!entry.undone);
  assert!(entry.inverse.is_some());
}

#[test]
fn failed_append_rolls_back_the_mutation() {
  let mut conn = Connection::open_in_memory().unwrap();
  conn.execute_batch(SCHEMA).unwrap();
  let t = people();
  ops::create_table(&conn, HistoryLimit::UNBOUNDED, &t, &[ColumnDef::new("name", ColumnType::Text)], None)
    .unwrap();
  conn
    .execute_batch(
      "CREATE TRIGGER refuse_history BEFORE INSERT ON history
       BEGIN SELECT RAISE(ABORT, 'log is read-only'); END;",
    )
    .unwrap();

  let tx = conn.transaction().unwrap();
  let err = ops::insert_row(&tx, HistoryLimit::UNBOUNDED, &t, &values(&[("name", "ada".into())]))
    .unwrap_err();
  drop(tx);
  assert!(matches!(core(&err), tabula_core::Error::Append(_)));

  let rows: i64 = conn.query_row(r#"SELECT COUNT(*) FROM "d1_people""#, [], |r| r.get(0)).unwrap();
  assert_eq!(rows, 0);
  assert_eq!(SqliteHistory::new(&conn).count(&t, None).unwrap(), 1);
}

#[test]
fn failed_capture_mutates_and_logs_nothing() {
  let mut conn = Connection::open_in_memory().unwrap();
  conn.execute_batch(SCHEMA).unwrap();
  let t = people();
  ops::create_table(&conn, HistoryLimit::UNBOUNDED, &t, &[ColumnDef::new("age", ColumnType::Integer)], None)
    .unwrap();
  ops::insert_row(&conn, HistoryLimit::UNBOUNDED, &t, &values(&[("age", Value::Integer(36))])).unwrap();

  // A column whose declared type cannot be read back breaks the snapshot.
  conn.execute(r#"ALTER TABLE "d1_people" ADD COLUMN "shape" GEOMETRY"#, []).unwrap();

  let tx = conn.transaction().unwrap();
  let err = ops::delete_where(&tx, HistoryLimit::UNBOUNDED, &t, &[Predicate::new(
    "age",
    Comparison::Ge,
    Value::Integer(0),
  )])
  .unwrap_err();
  drop(tx);
  assert!(matches!(core(&err), tabula_core::Error::Capture(_)));

  let rows: i64 = conn.query_row(r#"SELECT COUNT(*) FROM "d1_people""#, [], |r| r.get(0)).unwrap();
  assert_eq!(rows, 1);
  assert_eq!(SqliteHistory::new(&conn).count(&t, None).unwrap(), 2);
}

// ─── History maintenance ─────────────────────────────────────────────────────

#[tokio::test]
async fn purge_after_drops_only_newer_entries() {
  let s = store().await;
  people_table(&s).await;
  add_person(&s, "ada", 36).await;
  tokio::time::sleep(Duration::from_millis(10)).await;
  let restore_point = Utc::now();
  tokio::time::sleep(Duration::from_millis(10)).await;
  add_person(&s, "bob", 25).await;

  assert_eq!(s.purge_history_after(people(), restore_point).await.unwrap(), 1);
  let page = s.history(people(), HistoryQuery::default()).await.unwrap();
  let descs: Vec<_> = page.entries.iter().map(|i| i.description.as_str()).collect();
  assert_eq!(descs, vec!["Created table", "Added row #1"]);
}

#[tokio::test]
async fn history_listing_searches_orders_and_pages() {
  let s = store().await;
  people_table(&s).await;
  let a = add_person(&s, "ada", 36).await;
  let b = add_person(&s, "bob", 25).await;
  s.delete_rows(people(), vec![a]).await.unwrap();
  s.delete_rows(people(), vec![b]).await.unwrap();

  let query = HistoryQuery {
    search: Some("deleted".into()),
    ordering: Some(Ordering { key: OrderKey::Timestamp, direction: Direction::Desc }),
    limit: Some(1),
    ..Default::default()
  };
  let page = s.history(people(), query).await.unwrap();
  assert_eq!(page.records_total, 5);
  assert_eq!(page.records_filtered, 2);
  assert_eq!(page.entries.len(), 1);
  assert_eq!(page.entries[0].description, format!("Deleted row #{b}"));
  assert!(page.entries[0].is_frontier);

  let wildcard = HistoryQuery { search: Some("%".into()), ..Default::default() };
  assert_eq!(s.history(people(), wildcard).await.unwrap().records_filtered, 0);

  let by_desc = HistoryQuery {
    ordering: Some(Ordering { key: OrderKey::Description, direction: Direction::Asc }),
    offset: 3,
    ..Default::default()
  };
  let page = s.history(people(), by_desc).await.unwrap();
  let descs: Vec<_> = page.entries.iter().map(|i| i.description.as_str()).collect();
  assert_eq!(descs, vec![format!("Deleted row #{a}"), format!("Deleted row #{b}")]);
}

// ─── Transformations ─────────────────────────────────────────────────────────

#[tokio::test]
async fn find_replace_round_trip() {
  let s = store().await;
  people_table(&s).await;
  for name in ["apple pie", "banana", "apple"] {
    add_person(&s, name, 1).await;
  }
  let before = s.rows(people()).await.unwrap();

  let outcome = s
    .transform(people(), Transform::FindReplace {
      column:  "name".into(),
      find:    "apple".into(),
      replace: "pear".into(),
    })
    .await
    .unwrap();
  assert_eq!(outcome.rows_affected, 2);
  assert_eq!(column_values(&s, &people(), "name").await, vec![
    Value::from("pear pie"),
    Value::from("banana"),
    Value::from("pear"),
  ]);

  s.undo(people(), outcome.entry_id.unwrap()).await.unwrap();
  assert_eq!(s.rows(people()).await.unwrap(), before);
}

#[tokio::test]
async fn impute_mean_round_trip() {
  let s = store().await;
  let t = single_column_table(&s, "score", ColumnType::Real, &[
    Value::Real(10.0),
    Value::Null,
    Value::Real(20.0),
  ])
  .await;

  let outcome = s
    .transform(t.clone(), Transform::Impute { column: "score".into(), strategy: ImputeStrategy::Mean })
    .await
    .unwrap();
  assert_eq!(outcome.rows_affected, 1);
  assert_eq!(column_values(&s, &t, "score").await[1], Value::Real(15.0));

  s.undo(t.clone(), outcome.entry_id.unwrap()).await.unwrap();
  assert_eq!(column_values(&s, &t, "score").await[1], Value::Null);
}

#[tokio::test]
async fn impute_without_nulls_logs_nothing() {
  let s = store().await;
  let t = single_column_table(&s, "score", ColumnType::Real, &[Value::Real(1.0)]).await;
  let outcome = s
    .transform(t, Transform::Impute { column: "score".into(), strategy: ImputeStrategy::Mode })
    .await
    .unwrap();
  assert_eq!(outcome.entry_id, None);
}

#[tokio::test]
async fn impute_mean_on_text_is_not_numeric() {
  let s = store().await;
  let t = single_column_table(&s, "label", ColumnType::Text, &["x".into(), Value::Null]).await;
  let err = s
    .transform(t, Transform::Impute { column: "label".into(), strategy: ImputeStrategy::Mean })
    .await
    .unwrap_err();
  assert!(matches!(core(&err), tabula_core::Error::NotNumeric(_)));
}

#[tokio::test]
async fn normalize_round_trip() {
  let s = store().await;
  let t = single_column_table(&s, "score", ColumnType::Real, &[
    Value::Real(0.0),
    Value::Real(5.0),
    Value::Real(10.0),
  ])
  .await;
  let before = s.rows(t.clone()).await.unwrap();

  let outcome = s
    .transform(t.clone(), Transform::Normalize {
      column: "score".into(),
      method: NormalizeMethod::MinMax,
    })
    .await
    .unwrap();
  // 0.0 is already normalized, so only two cells change.
  assert_eq!(outcome.rows_affected, 2);
  let scaled: Vec<_> = column_values(&s, &t, "score").await.iter().filter_map(Value::as_f64).collect();
  assert_eq!(scaled, vec![0.0, 0.5, 1.0]);

  s.undo(t.clone(), outcome.entry_id.unwrap()).await.unwrap();
  assert_eq!(s.rows(t).await.unwrap(), before);
}

#[tokio::test]
async fn outlier_removal_round_trip() {
  let s = store().await;
  let mut cells = vec![Value::Integer(1); 9];
  cells.push(Value::Integer(100));
  let t = single_column_table(&s, "score", ColumnType::Integer, &cells).await;
  let before = s.rows(t.clone()).await.unwrap();

  let outcome = s
    .transform(t.clone(), Transform::RemoveOutliers { column: "score".into(), threshold: 2.0 })
    .await
    .unwrap();
  assert_eq!(outcome.rows_affected, 1);
  assert_eq!(s.rows(t.clone()).await.unwrap().len(), 9);

  s.undo(t.clone(), outcome.entry_id.unwrap()).await.unwrap();
  assert_eq!(s.rows(t).await.unwrap(), before);
}

#[tokio::test]
async fn deduplicate_keeps_the_lowest_id() {
  let s = store().await;
  people_table(&s).await;
  let first = add_person(&s, "ada", 36).await;
  add_person(&s, "ada", 36).await;
  add_person(&s, "bob", 25).await;
  let before = s.rows(people()).await.unwrap();

  let outcome = s.transform(people(), Transform::Deduplicate).await.unwrap();
  assert_eq!(outcome.rows_affected, 1);
  let ids: Vec<_> = s.rows(people()).await.unwrap().iter().map(|r| r.id).collect();
  assert_eq!(ids, vec![first, first + 2]);

  s.undo(people(), outcome.entry_id.unwrap()).await.unwrap();
  assert_eq!(s.rows(people()).await.unwrap(), before);
}

#[tokio::test]
async fn date_part_extraction_round_trip() {
  let s = store().await;
  let t = single_column_table(&s, "created", ColumnType::Date, &["2024-03-15".into()]).await;

  let outcome = s
    .transform(t.clone(), Transform::ExtractDatePart { column: "created".into(), part: DatePart::Year })
    .await
    .unwrap();
  assert_eq!(outcome.columns, vec!["created (YEAR)".to_owned()]);
  assert_eq!(column_values(&s, &t, "created (YEAR)").await, vec![Value::Integer(2024)]);

  let dow = s
    .transform(t.clone(), Transform::ExtractDatePart {
      column: "created".into(),
      part:   DatePart::DayOfWeek,
    })
    .await
    .unwrap();
  assert_eq!(column_values(&s, &t, "created (DOW)").await, vec![Value::Integer(5)]);

  s.undo(t.clone(), dow.entry_id.unwrap()).await.unwrap();
  s.undo(t.clone(), outcome.entry_id.unwrap()).await.unwrap();
  let info = s.describe_table(t).await.unwrap().unwrap();
  assert_eq!(info.columns, vec![ColumnDef::new("created", ColumnType::Date)]);
}

#[tokio::test]
async fn one_hot_encoding_is_undone_in_one_step() {
  let s = store().await;
  let t = single_column_table(&s, "color", ColumnType::Text, &[
    "red".into(),
    "blue".into(),
    "red".into(),
    Value::Null,
  ])
  .await;

  let outcome = s
    .transform(t.clone(), Transform::OneHotEncode { column: "color".into() })
    .await
    .unwrap();
  assert_eq!(outcome.columns, vec!["color_blue".to_owned(), "color_red".to_owned()]);
  assert_eq!(column_values(&s, &t, "color_red").await, vec![
    Value::Integer(1),
    Value::Integer(0),
    Value::Integer(1),
    Value::Integer(0),
  ]);

  s.undo(t.clone(), outcome.entry_id.unwrap()).await.unwrap();
  let info = s.describe_table(t).await.unwrap().unwrap();
  assert_eq!(info.columns.len(), 1);
}

#[tokio::test]
async fn one_hot_encoding_separates_values_differing_only_in_case() {
  let s = store().await;
  let t = single_column_table(&s, "color", ColumnType::Text, &["Red".into(), "red".into()]).await;

  let outcome = s
    .transform(t.clone(), Transform::OneHotEncode { column: "color".into() })
    .await
    .unwrap();
  assert_eq!(outcome.columns, vec!["color_Red".to_owned(), "color_red_2".to_owned()]);
  assert_eq!(column_values(&s, &t, "color_Red").await, vec![Value::Integer(1), Value::Integer(0)]);
  assert_eq!(column_values(&s, &t, "color_red_2").await, vec![Value::Integer(0), Value::Integer(1)]);

  s.undo(t.clone(), outcome.entry_id.unwrap()).await.unwrap();
  assert_eq!(s.describe_table(t).await.unwrap().unwrap().columns.len(), 1);
}

#[tokio::test]
async fn interval_binning_round_trip() {
  let s = store().await;
  let t = single_column_table(&s, "score", ColumnType::Integer, &[
    Value::Integer(0),
    Value::Integer(5),
    Value::Integer(10),
  ])
  .await;

  let outcome = s
    .transform(t.clone(), Transform::BinInterval { column: "score".into(), bins: 2 })
    .await
    .unwrap();
  assert_eq!(column_values(&s, &t, "score_bin").await, vec![
    Value::from("[0, 5)"),
    Value::from("[5, 10]"),
    Value::from("[5, 10]"),
  ]);

  s.undo(t.clone(), outcome.entry_id.unwrap()).await.unwrap();
  assert!(s.describe_table(t).await.unwrap().unwrap().column("score_bin").is_none());
}

#[tokio::test]
async fn zero_bins_is_invalid() {
  let s = store().await;
  let t = single_column_table(&s, "score", ColumnType::Integer, &[Value::Integer(1)]).await;
  let err = s
    .transform(t, Transform::BinInterval { column: "score".into(), bins: 0 })
    .await
    .unwrap_err();
  assert!(matches!(core(&err), tabula_core::Error::InvalidArgument(_)));
}
