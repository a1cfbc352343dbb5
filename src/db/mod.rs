pub mod migrations;

use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Type alias for the shared database connection.
/// rusqlite is synchronous — we wrap in Arc<Mutex> for thread safety
/// with tokio::task::spawn_blocking for DB operations.
pub type DbPool = Arc<Mutex<Connection>>;

/// Initialize the SQLite database: create data directory if needed,
/// open (or create) the database file, enable WAL mode, and run migrations.
pub fn init_db(data_dir: &str) -> Result<DbPool, Box<dyn std::error::Error>> {
    std::fs::create_dir_all(data_dir)?;

    let db_path = Path::new(data_dir).join("pulseboard.db");
    let mut conn = Connection::open(&db_path)?;

    // WAL mode for better concurrent read performance
    conn.pragma_update(None, "journal_mode", "WAL")?;

    let migrations = migrations::migrations();
    migrations.to_latest(&mut conn)?;

    tracing::info!("Database initialized at {}", db_path.display());

    Ok(Arc::new(Mutex::new(conn)))
}

/// Load all persisted history rows, used to rebuild the in-memory store at
/// startup so replay state survives a process restart.
pub fn load_history(db: &DbPool) -> Result<Vec<(String, String)>, rusqlite::Error> {
    let conn = db.lock().expect("DB lock for history load");
    let mut stmt = conn.prepare("SELECT key, frame FROM history")?;
    let mut rows = Vec::new();
    for row in stmt.query_map([], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })? {
        match row {
            Ok(entry) => rows.push(entry),
            // A skipped row is a replay gap for that key — make it visible
            Err(e) => tracing::warn!(error = %e, "Skipping unreadable history row"),
        }
    }
    Ok(rows)
}

/// Write-through a single history entry. Callers run this via
/// `tokio::task::spawn_blocking`; failures are logged, never propagated —
/// the in-memory store stays authoritative and the live broadcast has
/// already been attempted.
pub fn persist_entry(db: &DbPool, key: &str, frame: &str) -> Result<(), rusqlite::Error> {
    let conn = db.lock().expect("DB lock for history persist");
    conn.execute(
        "INSERT INTO history (key, frame, updated_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(key) DO UPDATE SET frame = excluded.frame, updated_at = excluded.updated_at",
        rusqlite::params![key, frame, chrono::Utc::now().to_rfc3339()],
    )?;
    Ok(())
}
