//! SQL schema for the Tabula SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.
//!
//! User tables are not declared here; each one is created on demand under
//! the physical name `d<dataset_id>_<table_name>`. SQLite resolves those
//! names without regard to ASCII case, so the registry and the log compare
//! table names with `NOCASE` too.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS user_tables (
    dataset_id  INTEGER NOT NULL,
    table_name  TEXT    NOT NULL COLLATE NOCASE,
    description TEXT,
    created_at  TEXT    NOT NULL,
    PRIMARY KEY (dataset_id, table_name)
);

-- One row per logged mutation. AUTOINCREMENT keeps ids unique across the
-- whole store, even after purges.
CREATE TABLE IF NOT EXISTS history (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    dataset_id   INTEGER NOT NULL,
    table_name   TEXT    NOT NULL COLLATE NOCASE,
    timestamp    TEXT    NOT NULL,   -- RFC 3339 UTC, fixed width
    description  TEXT    NOT NULL,
    inverse_json TEXT,               -- InverseCommand; NULL once retired
    undone       INTEGER NOT NULL DEFAULT 0,
    retired      TEXT,               -- 'undone' | 'expired' | 'note'
    CHECK (undone IN (0, 1)),
    CHECK (undone = 1 OR inverse_json IS NOT NULL)
);

CREATE INDEX IF NOT EXISTS history_table_idx
    ON history(dataset_id, table_name, undone, id);

PRAGMA user_version = 1;
";
