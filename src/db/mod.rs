//! Database module for SQLite persistence.
//!
//! SQLite is the record store for wines. Schema rules are checked by the adapter before any
//! write and backed by table constraints.

mod query;
mod repository;
mod schema;

pub use query::*;
pub use repository::*;
pub use schema::*;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

/// Errors reported by the record store adapter.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The document did not satisfy the wine schema; nothing was written.
    #[error("{0}")]
    Validation(ValidationFailure),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Initialize the database connection pool and run migrations.
pub async fn init_database(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
        .busy_timeout(std::time::Duration::from_secs(30));

    // Ensure the parent directory exists
    if let Some(parent) = options.get_filename().parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await.ok();
        }
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    // Run embedded migrations
    run_migrations(&pool).await?;

    Ok(pool)
}

/// Run database migrations.
async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    // AUTOINCREMENT keeps ids monotonic and never reuses ids of deleted rows.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS wines (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL CHECK (name <> ''),
            year INTEGER NOT NULL CHECK (year >= 1),
            country TEXT NOT NULL CHECK (country <> ''),
            type TEXT NOT NULL CHECK (type IN ('red', 'white', 'rose')),
            description TEXT
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_wines_country ON wines(country);
        CREATE INDEX IF NOT EXISTS idx_wines_year ON wines(year);
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
