pub mod database;
pub mod db_utils;
pub mod schema_manager;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("Database error: {0}")]
    DuckDb(#[from] duckdb::Error),

    #[error("Failed to prepare database location: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database handle is poisoned")]
    Poisoned,

    #[error("Database session is already closed")]
    Closed,
}
