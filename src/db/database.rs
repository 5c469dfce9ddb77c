use crate::config::{DatabaseConfig, DatabaseLocation};
use crate::db::DbError;
use duckdb::Connection;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Process-wide handle on the configured database.
///
/// Holds the root connection opened at startup. Request handling never uses
/// it directly; each request takes its own [`Session`] cloned from it.
#[derive(Clone)]
pub struct Database {
    root: Arc<Mutex<Connection>>,
    open_sessions: Arc<AtomicUsize>,
}

impl Database {
    pub fn open(config: &DatabaseConfig) -> Result<Self, DbError> {
        let conn = match config.location() {
            DatabaseLocation::InMemory => {
                info!("Opening in-memory database");
                Connection::open_in_memory()?
            }
            DatabaseLocation::File(path) => {
                if let Some(parent) = path.parent() {
                    if !parent.as_os_str().is_empty() && !parent.exists() {
                        info!("Creating database directory: {}", parent.display());
                        std::fs::create_dir_all(parent)?;
                    }
                }
                info!("Opening database at {}", path.display());
                Connection::open(&path)?
            }
        };

        Ok(Self::from_connection(conn))
    }

    pub fn in_memory() -> Result<Self, DbError> {
        Ok(Self::from_connection(Connection::open_in_memory()?))
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self {
            root: Arc::new(Mutex::new(conn)),
            open_sessions: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Opens a request-scoped connection against the same database.
    pub fn open_session(&self) -> Result<Session, DbError> {
        let conn = {
            let root = self.root.lock().map_err(|_| DbError::Poisoned)?;
            root.try_clone()?
        };

        let open = self.open_sessions.fetch_add(1, Ordering::SeqCst) + 1;
        debug!("Database session opened ({} open)", open);

        Ok(Session {
            conn: Some(conn),
            open_sessions: Arc::clone(&self.open_sessions),
        })
    }

    /// Number of sessions currently open.
    pub fn open_sessions(&self) -> usize {
        self.open_sessions.load(Ordering::SeqCst)
    }
}

/// A database connection owned by one request.
///
/// Closed exactly once: by [`Session::close`] or, on every other exit path, on drop.
pub struct Session {
    conn: Option<Connection>,
    open_sessions: Arc<AtomicUsize>,
}

impl Session {
    pub fn connection(&self) -> Result<&Connection, DbError> {
        self.conn.as_ref().ok_or(DbError::Closed)
    }

    pub fn close(mut self) -> Result<(), DbError> {
        self.release()
    }

    fn release(&mut self) -> Result<(), DbError> {
        let Some(conn) = self.conn.take() else {
            return Ok(());
        };

        let open = self.open_sessions.fetch_sub(1, Ordering::SeqCst) - 1;
        debug!("Database session closed ({} open)", open);

        conn.close().map_err(|(_, e)| DbError::from(e))
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            warn!("Failed to close database session: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sessions_share_the_same_database() {
        let db = Database::in_memory().unwrap();

        let writer = db.open_session().unwrap();
        writer
            .connection()
            .unwrap()
            .execute_batch("CREATE TABLE t (id INTEGER); INSERT INTO t VALUES (42);")
            .unwrap();
        writer.close().unwrap();

        let reader = db.open_session().unwrap();
        let value: i32 = reader
            .connection()
            .unwrap()
            .query_row("SELECT id FROM t", [], |row| row.get(0))
            .unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn close_and_drop_release_once() {
        let db = Database::in_memory().unwrap();

        let first = db.open_session().unwrap();
        let second = db.open_session().unwrap();
        assert_eq!(db.open_sessions(), 2);

        first.close().unwrap();
        assert_eq!(db.open_sessions(), 1);

        drop(second);
        assert_eq!(db.open_sessions(), 0);
    }

    #[test]
    fn opens_file_database_in_created_directory() {
        let dir = std::env::temp_dir().join(format!("sqlprompt-db-{}", std::process::id()));
        let config = DatabaseConfig {
            server: dir.join("nested").to_string_lossy().to_string(),
            database: "inventory".to_string(),
            user: "reader".to_string(),
            password: "secret".to_string(),
            connect_timeout_secs: 30,
        };

        let db = Database::open(&config).unwrap();
        db.open_session().unwrap().close().unwrap();
        assert!(dir.join("nested").join("inventory.duckdb").exists());

        drop(db);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
