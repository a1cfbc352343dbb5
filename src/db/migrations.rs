use rusqlite_migration::{Migrations, M};

/// Define all schema migrations.
/// Uses SQLite user_version pragma for tracking — no migration table needed.
pub fn migrations() -> Migrations<'static> {
    Migrations::new(vec![M::up(
        "-- Migration 1: latest-value history

CREATE TABLE history (
    key TEXT PRIMARY KEY,
    frame TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
",
    )])
}
