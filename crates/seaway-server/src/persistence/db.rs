//! SQLite pool setup and schema migration.

use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;

const SCHEMA: &str = include_str!("../../migrations/001_init.sql");

/// Shared handle to the vessel database.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Open the database at `db_path` (or `:memory:`), creating the file and its
/// parent directory when missing, then apply the schema.
pub async fn init_database(db_path: &str, max_connections: u32) -> Result<Database> {
    let in_memory = db_path == ":memory:";

    let options = if in_memory {
        SqliteConnectOptions::from_str("sqlite::memory:")?
    } else {
        if let Some(parent) = Path::new(db_path).parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create database directory {}", parent.display()))?;
        }
        SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
    };

    // Every in-memory connection is its own database, so keep exactly one alive.
    let pool_options = if in_memory {
        SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new().max_connections(max_connections.max(1))
    };

    tracing::info!(path = db_path, "Opening vessel database");
    let pool = pool_options
        .connect_with(options)
        .await
        .with_context(|| format!("Failed to open database {}", db_path))?;

    apply_schema(&pool).await?;
    Ok(Database { pool })
}

async fn apply_schema(pool: &SqlitePool) -> Result<()> {
    let statements = SCHEMA
        .split(';')
        .map(|chunk| {
            chunk
                .lines()
                .filter(|line| !line.trim_start().starts_with("--"))
                .collect::<Vec<_>>()
                .join("\n")
        })
        .filter(|statement| !statement.trim().is_empty());

    let mut applied = 0usize;
    for statement in statements {
        sqlx::query(statement.trim())
            .execute(pool)
            .await
            .with_context(|| format!("Schema statement failed: {}", statement.trim()))?;
        applied += 1;
    }

    tracing::debug!(statements = applied, "Schema up to date");
    Ok(())
}
