//! Inventory database using SQLite
//!
//! This module owns the connection pool and schema bootstrap, plus the
//! ingestion run audit trail. Entity access lives in [`crate::gateway`].

mod schema;

pub use schema::*;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::ingest::ProcessingResult;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{FromRow, Sqlite, Transaction};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

/// Ingestion run status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Completed,
    Partial,
    Failed,
}

impl RunStatus {
    /// Classify a finished ingestion
    pub fn of(result: &ProcessingResult) -> Self {
        if result.success {
            RunStatus::Completed
        } else if result.processed_rows > 0 {
            RunStatus::Partial
        } else {
            RunStatus::Failed
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunStatus::Running => write!(f, "running"),
            RunStatus::Completed => write!(f, "completed"),
            RunStatus::Partial => write!(f, "partial"),
            RunStatus::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for RunStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "running" => Ok(RunStatus::Running),
            "completed" => Ok(RunStatus::Completed),
            "partial" => Ok(RunStatus::Partial),
            "failed" => Ok(RunStatus::Failed),
            _ => Err(Error::Other(format!("Unknown run status: {}", s))),
        }
    }
}

/// An ingestion run record
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct IngestionRun {
    pub id: String,
    pub file_name: Option<String>,
    pub started_at: String,
    pub completed_at: Option<String>,
    pub status: String,
    pub total_rows: i64,
    pub processed_rows: i64,
    pub stores_created: i64,
    pub authors_created: i64,
    pub books_created: i64,
    pub store_books_created: i64,
    pub store_books_updated: i64,
    pub errors_json: Option<String>,
}

impl IngestionRun {
    pub fn new(file_name: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            file_name,
            started_at: Utc::now().to_rfc3339(),
            completed_at: None,
            status: RunStatus::Running.to_string(),
            total_rows: 0,
            processed_rows: 0,
            stores_created: 0,
            authors_created: 0,
            books_created: 0,
            store_books_created: 0,
            store_books_updated: 0,
            errors_json: None,
        }
    }

    pub fn get_status(&self) -> Result<RunStatus> {
        self.status.parse()
    }
}

/// Inventory database handle
#[derive(Clone)]
pub struct Db {
    pool: SqlitePool,
}

impl Db {
    /// Connect to the database configured in `config`
    pub async fn connect(config: &Config) -> Result<Self> {
        Self::open(&config.paths.db_file).await
    }

    /// Open the database at `db_path`, creating it and its schema if needed
    pub async fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5))
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);

        debug!("Connecting to SQLite database at {:?}", db_path);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let db = Self { pool };

        if !db.is_initialized().await? {
            db.init_schema().await?;
        }

        Ok(db)
    }

    /// Initialize the database schema
    pub async fn init_schema(&self) -> Result<()> {
        info!("Initializing database schema");
        sqlx::query(SCHEMA_SQL).execute(&self.pool).await?;
        Ok(())
    }

    /// Check if database is initialized
    pub async fn is_initialized(&self) -> Result<bool> {
        let result: Option<(i32,)> =
            sqlx::query_as("SELECT 1 FROM sqlite_master WHERE type='table' AND name='store_books'")
                .fetch_optional(&self.pool)
                .await?;
        Ok(result.is_some())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Begin a transaction. The caller decides whether to commit or roll back.
    pub async fn begin(&self) -> Result<Transaction<'static, Sqlite>> {
        Ok(self.pool.begin().await?)
    }

    // ===== Ingestion Run Operations =====

    /// Start a new ingestion run
    pub async fn start_ingestion_run(&self, file_name: Option<&str>) -> Result<IngestionRun> {
        let run = IngestionRun::new(file_name.map(str::to_string));
        sqlx::query(
            r#"
            INSERT INTO ingestion_runs (id, file_name, started_at, status)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&run.id)
        .bind(&run.file_name)
        .bind(&run.started_at)
        .bind(&run.status)
        .execute(&self.pool)
        .await?;
        Ok(run)
    }

    /// Complete an ingestion run with the final result
    pub async fn complete_ingestion_run(&self, id: &str, result: &ProcessingResult) -> Result<()> {
        let errors_json = if result.errors.is_empty() {
            None
        } else {
            Some(serde_json::to_string(&result.errors)?)
        };
        sqlx::query(
            r#"
            UPDATE ingestion_runs SET
                completed_at = ?,
                status = ?,
                total_rows = ?,
                processed_rows = ?,
                stores_created = ?,
                authors_created = ?,
                books_created = ?,
                store_books_created = ?,
                store_books_updated = ?,
                errors_json = ?
            WHERE id = ?
            "#,
        )
        .bind(Utc::now().to_rfc3339())
        .bind(RunStatus::of(result).to_string())
        .bind(result.total_rows as i64)
        .bind(result.processed_rows as i64)
        .bind(result.created.stores as i64)
        .bind(result.created.authors as i64)
        .bind(result.created.books as i64)
        .bind(result.created.store_books as i64)
        .bind(result.updated.store_books as i64)
        .bind(errors_json)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Mark an ingestion run as failed before it produced a result
    pub async fn fail_ingestion_run(&self, id: &str, message: &str) -> Result<()> {
        let errors_json = serde_json::to_string(&[message])?;
        sqlx::query(
            "UPDATE ingestion_runs SET completed_at = ?, status = ?, errors_json = ? WHERE id = ?",
        )
        .bind(Utc::now().to_rfc3339())
        .bind(RunStatus::Failed.to_string())
        .bind(errors_json)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// List the most recent ingestion runs, newest first
    pub async fn list_ingestion_runs(&self, limit: usize) -> Result<Vec<IngestionRun>> {
        let runs = sqlx::query_as::<_, IngestionRun>(
            "SELECT * FROM ingestion_runs ORDER BY started_at DESC LIMIT ?",
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        Ok(runs)
    }
}
