//! Ledger schema.
//!
//! Only tables the ETL itself owns are migrated here, today just
//! `etl_job_runs`. Fact tables follow the job config and are created on
//! demand by [`FactRepository::ensure_table`](crate::FactRepository::ensure_table),
//! so adding a report column never needs a migration.
//!
//! New files go in `migrations/sqlite/` as `NNN_description.sql`. Applied
//! files must not change; sqlx checks their checksums on every open.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Applies pending migrations. A no-op once the ledger is current.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    MIGRATOR.run(pool).await?;
    debug!(migrations = MIGRATOR.migrations.len(), "Ledger schema current");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    async fn applied(pool: &SqlitePool) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = 1")
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_migrations_apply_once() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let total = MIGRATOR.migrations.len() as i64;
        assert!(total >= 1);
        assert_eq!(applied(db.pool()).await, total);

        run_migrations(db.pool()).await.unwrap();
        assert_eq!(applied(db.pool()).await, total);
    }

    #[tokio::test]
    async fn test_open_without_migrations_has_no_ledger() {
        let db = Database::new(DbConfig::in_memory().run_migrations(false))
            .await
            .unwrap();
        assert!(db.job_runs().recent(1).await.is_err());
    }
}
