//! # Job Run Repository
//!
//! Ledger of table-job executions in `etl_job_runs`.
//!
//! ## Run Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  start(job)  ──► status = 'running',   started_at = now                │
//! │      │                                                                  │
//! │      ├── finish(id, rows) ──► status = 'succeeded', rows_written       │
//! │      └── fail(id, error)  ──► status = 'failed',    error              │
//! │                                                                         │
//! │  A run left in 'running' means the process died mid-job.               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};

/// State of a job run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Running,
    Succeeded,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Running => "running",
            JobStatus::Succeeded => "succeeded",
            JobStatus::Failed => "failed",
        }
    }

    fn parse(value: &str) -> DbResult<Self> {
        match value {
            "running" => Ok(JobStatus::Running),
            "succeeded" => Ok(JobStatus::Succeeded),
            "failed" => Ok(JobStatus::Failed),
            other => Err(DbError::Internal(format!("unknown job status '{other}'"))),
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the ledger.
#[derive(Debug, Clone, Serialize)]
pub struct JobRun {
    pub id: String,
    pub job: String,
    pub status: JobStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub rows_written: i64,
    pub error: Option<String>,
}

impl JobRun {
    fn from_row(row: &SqliteRow) -> DbResult<Self> {
        let status: String = row.try_get("status")?;
        Ok(JobRun {
            id: row.try_get("id")?,
            job: row.try_get("job")?,
            status: JobStatus::parse(&status)?,
            started_at: row.try_get("started_at")?,
            finished_at: row.try_get("finished_at")?,
            rows_written: row.try_get("rows_written")?,
            error: row.try_get("error")?,
        })
    }
}

/// Repository for the job run ledger.
#[derive(Debug, Clone)]
pub struct JobRunRepository {
    pool: SqlitePool,
}

impl JobRunRepository {
    /// Creates a new JobRunRepository.
    pub fn new(pool: SqlitePool) -> Self {
        JobRunRepository { pool }
    }

    /// Records the start of a run.
    pub async fn start(&self, job: &str) -> DbResult<JobRun> {
        let run = JobRun {
            id: Uuid::new_v4().to_string(),
            job: job.to_string(),
            status: JobStatus::Running,
            started_at: Utc::now(),
            finished_at: None,
            rows_written: 0,
            error: None,
        };

        sqlx::query(
            r#"
            INSERT INTO etl_job_runs (id, job, status, started_at, rows_written)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&run.id)
        .bind(&run.job)
        .bind(run.status.as_str())
        .bind(run.started_at)
        .bind(run.rows_written)
        .execute(&self.pool)
        .await?;

        debug!(job, run_id = %run.id, "Job run started");
        Ok(run)
    }

    /// Marks a run as succeeded.
    pub async fn finish(&self, id: &str, rows_written: u64) -> DbResult<()> {
        let rows_written = i64::try_from(rows_written).unwrap_or(i64::MAX);
        self.close(id, JobStatus::Succeeded, rows_written, None).await
    }

    /// Marks a run as failed.
    pub async fn fail(&self, id: &str, error: &str) -> DbResult<()> {
        self.close(id, JobStatus::Failed, 0, Some(error)).await
    }

    async fn close(
        &self,
        id: &str,
        status: JobStatus,
        rows_written: i64,
        error: Option<&str>,
    ) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE etl_job_runs
            SET status = ?1, finished_at = ?2, rows_written = ?3, error = ?4
            WHERE id = ?5
            "#,
        )
        .bind(status.as_str())
        .bind(Utc::now())
        .bind(rows_written)
        .bind(error)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Job run", id));
        }
        Ok(())
    }

    /// Fetches one run by ID.
    pub async fn get(&self, id: &str) -> DbResult<JobRun> {
        let row = sqlx::query("SELECT * FROM etl_job_runs WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Job run", id))?;
        JobRun::from_row(&row)
    }

    /// Most recent runs first.
    pub async fn recent(&self, limit: u32) -> DbResult<Vec<JobRun>> {
        let rows = sqlx::query(
            "SELECT * FROM etl_job_runs ORDER BY started_at DESC, rowid DESC LIMIT ?1",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(JobRun::from_row).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    async fn setup() -> JobRunRepository {
        Database::new(DbConfig::in_memory()).await.unwrap().job_runs()
    }

    #[tokio::test]
    async fn test_run_lifecycle() {
        let runs = setup().await;

        let run = runs.start("shipments").await.unwrap();
        assert_eq!(run.status, JobStatus::Running);

        runs.finish(&run.id, 42).await.unwrap();
        let stored = runs.get(&run.id).await.unwrap();
        assert_eq!(stored.status, JobStatus::Succeeded);
        assert_eq!(stored.rows_written, 42);
        assert!(stored.finished_at.is_some());
        assert!(stored.error.is_none());
    }

    #[tokio::test]
    async fn test_failed_run_keeps_error() {
        let runs = setup().await;
        let run = runs.start("labor").await.unwrap();
        runs.fail(&run.id, "Item W has no known conversions").await.unwrap();

        let stored = runs.get(&run.id).await.unwrap();
        assert_eq!(stored.status, JobStatus::Failed);
        assert_eq!(stored.error.as_deref(), Some("Item W has no known conversions"));
    }

    #[tokio::test]
    async fn test_recent_orders_newest_first() {
        let runs = setup().await;
        let first = runs.start("receipts").await.unwrap();
        let second = runs.start("moves").await.unwrap();

        let recent = runs.recent(10).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].id, second.id);
        assert_eq!(recent[1].id, first.id);

        assert_eq!(runs.recent(1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_run() {
        let runs = setup().await;
        assert!(matches!(runs.finish("nope", 1).await, Err(DbError::NotFound { .. })));
        assert!(matches!(runs.get("nope").await, Err(DbError::NotFound { .. })));
    }
}
