//! # wms-db: Database Layer for the Nightly ETL
//!
//! This crate writes report rows into SQLite and keeps the job run ledger.
//! It uses sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Nightly ETL Data Flow                            │
//! │                                                                         │
//! │  Table job (shipments, receipts, labor ...)                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     wms-db (THIS CRATE)                         │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ FactRepo      │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ JobRunRepo    │    │ 001_job_runs │  │   │
//! │  │   │ Connection    │    │               │    │              │  │   │
//! │  │   │ Management    │    │               │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database                             │   │
//! │  │   <data dir>/nightly-sync/warehouse.db                          │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Fact tables and the job run ledger
//!
//! ## Usage
//!
//! ```rust,ignore
//! use wms_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("warehouse.db")).await?;
//!
//! let run = db.job_runs().start("item_master").await?;
//! let (_, written) = db.facts().replace_all("item_master", &records).await?;
//! db.job_runs().finish(&run.id, written).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::fact::{quote_ident, FactRepository, UpsertOutcome, UpsertSummary};
pub use repository::job_run::{JobRun, JobRunRepository, JobStatus};
