// SQLite database setup
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Database directory error: {0}")]
    Io(#[from] std::io::Error),
}

pub type DbResult<T> = Result<T, DbError>;

/// One SQLite connection shared by all request handlers
#[derive(Clone)]
pub struct DbConnection {
    conn: Arc<Mutex<Connection>>,
}

impl DbConnection {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Recovers a poisoned lock; the connection itself stays valid
    pub fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Open (or create) the database file at `db_path`
pub fn init_db(db_path: &Path) -> DbResult<DbConnection> {
    match db_path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => std::fs::create_dir_all(dir)?,
        _ => {}
    }

    let conn = Connection::open(db_path)?;
    ensure_schema(&conn)?;

    log::info!("Database ready at {}", db_path.display());
    Ok(DbConnection::new(conn))
}

/// Private in-memory database, used by tests
pub fn init_db_in_memory() -> DbResult<DbConnection> {
    let conn = Connection::open_in_memory()?;
    ensure_schema(&conn)?;
    Ok(DbConnection::new(conn))
}

fn ensure_schema(conn: &Connection) -> DbResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS player_performance (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            average REAL NOT NULL,
            strike_rate REAL NOT NULL,
            bowling_average REAL NOT NULL,
            economy_rate REAL NOT NULL,
            fielding_stats INTEGER NOT NULL,
            label INTEGER NOT NULL
        )",
        [],
    )?;

    Ok(())
}
