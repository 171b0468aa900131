//! Database initialization
//!
//! Opens (or creates) the processing ledger database and makes sure the
//! `transcribed_files` table exists. Safe to call on every startup.

use crate::config::{DatabaseConfig, LedgerBackend};
use crate::Result;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::path::Path;
use tracing::info;

/// Open the ledger described by `config`
pub async fn open_ledger_pool(config: &DatabaseConfig) -> Result<SqlitePool> {
    match config.backend {
        LedgerBackend::Sqlite => init_database(&config.path).await,
        LedgerBackend::Memory => init_memory_database().await,
    }
}

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    // mode=rwc: read, write, create
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(4)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new ledger database: {}", db_path.display());
    } else {
        info!("Opened existing ledger database: {}", db_path.display());
    }

    // WAL lets an inspection command read while a run is writing
    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;

    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    create_transcribed_files_table(&pool).await?;

    Ok(pool)
}

/// Initialize a throwaway in-memory ledger
///
/// Every SQLite in-memory connection is its own database, so the pool is
/// pinned to a single connection that never idles out.
pub async fn init_memory_database() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await?;

    info!("Using in-memory ledger database (entries are discarded on exit)");

    create_transcribed_files_table(&pool).await?;

    Ok(pool)
}

/// Create the `transcribed_files` table (idempotent)
pub async fn create_transcribed_files_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS transcribed_files (
            file_id INTEGER PRIMARY KEY AUTOINCREMENT,
            file_location TEXT NOT NULL UNIQUE,
            date_transcribed TEXT,
            date_added TEXT,
            created_date TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            last_modified_date TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
