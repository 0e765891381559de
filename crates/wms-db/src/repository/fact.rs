//! # Fact Repository
//!
//! Writes report rows into tables whose names and columns come from job
//! configuration.
//!
//! ## Write Modes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    How Jobs Use This Repository                         │
//! │                                                                         │
//! │  UPSERT (whole batch, one transaction)                                 │
//! │  ─────────────────────────────────────                                 │
//! │  UPDATE "t" SET "a" = ?, "b" = ? WHERE "key" IS ?                      │
//! │       │                                                                 │
//! │       ├── rows_affected > 0 → Updated                                  │
//! │       └── rows_affected = 0 → INSERT INTO "t" (...) VALUES (...)       │
//! │                                                                         │
//! │  REPLACE WINDOW (one transaction)                                      │
//! │  ────────────────────────────────                                      │
//! │  DELETE FROM "t" WHERE "col" BETWEEN ? AND ?                           │
//! │  INSERT ... (every row)                                                │
//! │                                                                         │
//! │  SNAPSHOT (one transaction)                                            │
//! │  ──────────────────────────                                            │
//! │  DELETE FROM "t"                                                       │
//! │  INSERT ... (every row)                                                │
//! │                                                                         │
//! │  Identifiers are always quoted. Values are always bound.               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::sqlite::{Sqlite, SqliteArguments};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use wms_core::{FieldValue, Record};

use crate::error::{DbError, DbResult};

type SqliteQuery<'q> = sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>;

/// What an upsert did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    /// Number of existing rows that matched the key.
    Updated(u64),
}

/// Row counts from [`FactRepository::upsert_many`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertSummary {
    pub inserted: u64,
    pub updated: u64,
}

impl UpsertSummary {
    pub fn total(&self) -> u64 {
        self.inserted + self.updated
    }
}

/// Repository for report-sourced fact tables.
#[derive(Debug, Clone)]
pub struct FactRepository {
    pool: SqlitePool,
}

impl FactRepository {
    /// Creates a new FactRepository.
    pub fn new(pool: SqlitePool) -> Self {
        FactRepository { pool }
    }

    /// Creates `table` with untyped `columns` if it does not exist yet.
    pub async fn ensure_table<S: AsRef<str>>(&self, table: &str, columns: &[S]) -> DbResult<()> {
        if columns.is_empty() {
            return Err(DbError::invalid_write(table, "table needs at least one column"));
        }
        let columns = columns
            .iter()
            .map(|c| quote_ident(c.as_ref()))
            .collect::<DbResult<Vec<_>>>()?;
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            quote_ident(table)?,
            columns.join(", ")
        );
        sqlx::query(&sql).execute(&self.pool).await?;
        Ok(())
    }

    /// Inserts one record.
    pub async fn insert(&self, table: &str, record: &Record) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        insert_on(&mut *conn, table, record).await
    }

    /// Inserts every record in a single transaction. Returns the row count.
    pub async fn insert_many(&self, table: &str, records: &[Record]) -> DbResult<u64> {
        let mut tx = self.pool.begin().await?;
        for record in records {
            insert_on(&mut *tx, table, record).await?;
        }
        tx.commit().await?;

        debug!(table, rows = records.len(), "Inserted rows");
        Ok(records.len() as u64)
    }

    /// Updates the rows matching `keys`, or inserts the record when none
    /// match.
    ///
    /// Key comparison is null-safe (`IS`), so a blank key cell matches an
    /// existing NULL.
    pub async fn upsert<S: AsRef<str>>(
        &self,
        table: &str,
        keys: &[S],
        record: &Record,
    ) -> DbResult<UpsertOutcome> {
        let mut tx = self.pool.begin().await?;
        let outcome = upsert_on(&mut *tx, table, keys, record).await?;
        tx.commit().await?;
        Ok(outcome)
    }

    /// Upserts every record in a single transaction.
    ///
    /// Either the whole batch lands or none of it does.
    pub async fn upsert_many<S: AsRef<str>>(
        &self,
        table: &str,
        keys: &[S],
        records: &[Record],
    ) -> DbResult<UpsertSummary> {
        let mut summary = UpsertSummary::default();
        let mut tx = self.pool.begin().await?;
        for record in records {
            match upsert_on(&mut *tx, table, keys, record).await? {
                UpsertOutcome::Inserted => summary.inserted += 1,
                UpsertOutcome::Updated(_) => summary.updated += 1,
            }
        }
        tx.commit().await?;

        debug!(table, inserted = summary.inserted, updated = summary.updated, "Upserted rows");
        Ok(summary)
    }

    /// Deletes rows whose `column` lies in `[from, to]`.
    pub async fn delete_between(
        &self,
        table: &str,
        column: &str,
        from: &str,
        to: &str,
    ) -> DbResult<u64> {
        let mut conn = self.pool.acquire().await?;
        delete_between_on(&mut *conn, table, column, from, to).await
    }

    /// Deletes every row of `table`.
    pub async fn delete_all(&self, table: &str) -> DbResult<u64> {
        let mut conn = self.pool.acquire().await?;
        delete_all_on(&mut *conn, table).await
    }

    /// Replaces the rows in a window with `records`, atomically.
    pub async fn replace_between(
        &self,
        table: &str,
        column: &str,
        from: &str,
        to: &str,
        records: &[Record],
    ) -> DbResult<(u64, u64)> {
        let mut tx = self.pool.begin().await?;
        let deleted = delete_between_on(&mut *tx, table, column, from, to).await?;
        for record in records {
            insert_on(&mut *tx, table, record).await?;
        }
        tx.commit().await?;

        debug!(table, deleted, inserted = records.len(), "Replaced window");
        Ok((deleted, records.len() as u64))
    }

    /// Replaces the whole table with `records`, atomically.
    pub async fn replace_all(&self, table: &str, records: &[Record]) -> DbResult<(u64, u64)> {
        let mut tx = self.pool.begin().await?;
        let deleted = delete_all_on(&mut *tx, table).await?;
        for record in records {
            insert_on(&mut *tx, table, record).await?;
        }
        tx.commit().await?;

        debug!(table, deleted, inserted = records.len(), "Replaced snapshot");
        Ok((deleted, records.len() as u64))
    }

    /// Counts rows in `table`.
    pub async fn count(&self, table: &str) -> DbResult<i64> {
        let sql = format!("SELECT COUNT(*) FROM {}", quote_ident(table)?);
        let count: i64 = sqlx::query_scalar(&sql).fetch_one(&self.pool).await?;
        Ok(count)
    }
}

// =============================================================================
// Statement Helpers
// =============================================================================

/// Double-quotes an identifier, rejecting names that cannot be quoted safely.
pub fn quote_ident(name: &str) -> DbResult<String> {
    if name.is_empty() || name.contains('"') || name.chars().any(char::is_control) {
        return Err(DbError::InvalidIdentifier(name.to_string()));
    }
    Ok(format!("\"{name}\""))
}

fn bind_value<'q>(query: SqliteQuery<'q>, value: &FieldValue) -> SqliteQuery<'q> {
    match value {
        FieldValue::Null => query.bind(None::<String>),
        FieldValue::Text(text) => query.bind(text.clone()),
        FieldValue::Real(number) => query.bind(*number),
    }
}

async fn upsert_on<S: AsRef<str>>(
    conn: &mut SqliteConnection,
    table: &str,
    keys: &[S],
    record: &Record,
) -> DbResult<UpsertOutcome> {
    if keys.is_empty() {
        return Err(DbError::invalid_write(table, "upsert needs at least one key column"));
    }

    let mut key_values = Vec::with_capacity(keys.len());
    for key in keys {
        let value = record.get(key.as_ref()).ok_or_else(|| {
            DbError::invalid_write(table, format!("key column '{}' missing from row", key.as_ref()))
        })?;
        key_values.push((key.as_ref(), value));
    }
    let where_clause = key_values
        .iter()
        .map(|(column, _)| Ok(format!("{} IS ?", quote_ident(column)?)))
        .collect::<DbResult<Vec<_>>>()?
        .join(" AND ");

    let updates: Vec<(&str, &FieldValue)> = record
        .iter()
        .filter(|(column, _)| !key_values.iter().any(|(k, _)| k == column))
        .collect();

    let table_sql = quote_ident(table)?;
    let matched = if updates.is_empty() {
        let sql = format!("SELECT COUNT(*) FROM {table_sql} WHERE {where_clause}");
        let mut query = sqlx::query_scalar::<_, i64>(&sql);
        for (_, value) in &key_values {
            query = match value {
                FieldValue::Null => query.bind(None::<String>),
                FieldValue::Text(text) => query.bind(text.clone()),
                FieldValue::Real(number) => query.bind(*number),
            };
        }
        query.fetch_one(&mut *conn).await? as u64
    } else {
        let set_clause = updates
            .iter()
            .map(|(column, _)| Ok(format!("{} = ?", quote_ident(column)?)))
            .collect::<DbResult<Vec<_>>>()?
            .join(", ");
        let sql = format!("UPDATE {table_sql} SET {set_clause} WHERE {where_clause}");
        let mut query = sqlx::query(&sql);
        for (_, value) in updates.iter().chain(key_values.iter()) {
            query = bind_value(query, value);
        }
        query.execute(&mut *conn).await?.rows_affected()
    };

    if matched == 0 {
        insert_on(conn, table, record).await?;
        Ok(UpsertOutcome::Inserted)
    } else {
        Ok(UpsertOutcome::Updated(matched))
    }
}

async fn insert_on(conn: &mut SqliteConnection, table: &str, record: &Record) -> DbResult<()> {
    if record.is_empty() {
        return Err(DbError::invalid_write(table, "record has no columns"));
    }

    let columns = record
        .columns()
        .iter()
        .map(|c| quote_ident(c))
        .collect::<DbResult<Vec<_>>>()?;
    let placeholders = vec!["?"; columns.len()].join(", ");
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(table)?,
        columns.join(", "),
        placeholders
    );

    let mut query = sqlx::query(&sql);
    for value in record.values() {
        query = bind_value(query, value);
    }
    query.execute(&mut *conn).await?;
    Ok(())
}

async fn delete_between_on(
    conn: &mut SqliteConnection,
    table: &str,
    column: &str,
    from: &str,
    to: &str,
) -> DbResult<u64> {
    let sql = format!(
        "DELETE FROM {} WHERE {} BETWEEN ? AND ?",
        quote_ident(table)?,
        quote_ident(column)?
    );
    let result = sqlx::query(&sql)
        .bind(from.to_string())
        .bind(to.to_string())
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected())
}

async fn delete_all_on(conn: &mut SqliteConnection, table: &str) -> DbResult<u64> {
    let sql = format!("DELETE FROM {}", quote_ident(table)?);
    let result = sqlx::query(&sql).execute(&mut *conn).await?;
    Ok(result.rows_affected())
}

// =============================================================================
// Unit Tests
// =============================================================================
