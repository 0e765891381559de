//! # Warehouse Database
//!
//! One SQLite file per installation, opened once per nightly run.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  nightly-sync run                                                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Database::new(DbConfig)   open warehouse.db, apply ledger migrations  │
//! │       │                                                                 │
//! │       ├──► facts()      report rows, one table per job                 │
//! │       └──► job_runs()   etl_job_runs ledger                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  close()                   after the last job                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Jobs run one after another, so the pool stays small. A job's bulk write
//! holds one connection for its whole transaction; the ledger update that
//! follows takes another.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::fact::FactRepository;
use crate::repository::job_run::JobRunRepository;

const IN_MEMORY: &str = ":memory:";

/// Where the database lives and how many connections a run may hold.
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub database_path: PathBuf,
    /// Default: 4
    pub max_connections: u32,
    /// How long a write waits for a connection before failing the job.
    pub acquire_timeout: Duration,
    /// Apply `migrations/sqlite` on open. Default: true
    pub run_migrations: bool,
}

impl DbConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 4,
            acquire_timeout: Duration::from_secs(30),
            run_migrations: true,
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    /// Private in-memory database, used by tests.
    ///
    /// The contents live as long as the single pooled connection does.
    pub fn in_memory() -> Self {
        DbConfig {
            database_path: PathBuf::from(IN_MEMORY),
            max_connections: 1,
            acquire_timeout: Duration::from_secs(5),
            run_migrations: true,
        }
    }

    fn is_in_memory(&self) -> bool {
        self.database_path == Path::new(IN_MEMORY)
    }
}

/// Handle shared by every job of a run.
///
/// ```rust,ignore
/// let db = Database::new(DbConfig::new("warehouse.db")).await?;
/// let run = db.job_runs().start("shipments").await?;
/// let written = db.facts().insert_many("shipments", &records).await?;
/// db.job_runs().finish(&run.id, written).await?;
/// ```
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens (creating if needed) the database and applies migrations.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(path = %config.database_path.display(), "Opening warehouse database");

        let options = if config.is_in_memory() {
            SqliteConnectOptions::new().in_memory(true)
        } else {
            SqliteConnectOptions::new()
                .filename(&config.database_path)
                .create_if_missing(true)
                // Fact tables are rewritten nightly; NORMAL is durable enough under WAL.
                .journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Normal)
        };

        // An in-memory database disappears with its last connection.
        let idle_timeout = (!config.is_in_memory()).then(|| Duration::from_secs(600));
        let min_connections = u32::from(config.is_in_memory());

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(min_connections)
            .acquire_timeout(config.acquire_timeout)
            .idle_timeout(idle_timeout)
            .connect_with(options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        let db = Database { pool };
        if config.run_migrations {
            migrations::run_migrations(&db.pool).await?;
        }
        Ok(db)
    }

    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Report-sourced fact tables.
    pub fn facts(&self) -> FactRepository {
        FactRepository::new(self.pool.clone())
    }

    /// The `etl_job_runs` ledger.
    pub fn job_runs(&self) -> JobRunRepository {
        JobRunRepository::new(self.pool.clone())
    }

    /// Waits for in-flight statements, then closes every connection.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
