//! # Nightly Sync
//!
//! Scheduled jobs that copy warehouse reports into SQLite and dashboards.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Nightly Sync Run                                │
//! │                                                                         │
//! │  nightly-sync.toml ──► EtlConfig                                       │
//! │                           │                                             │
//! │         ┌─────────────────┼──────────────────────┐                     │
//! │         ▼                 ▼                      ▼                      │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────┐   │
//! │  │  ReportClient  │  │   UomCache     │  │  Database              │   │
//! │  │  (wms-report)  │  │  built once    │  │  (wms-db)              │   │
//! │  └───────┬────────┘  └───────┬────────┘  └───────────┬────────────┘   │
//! │          │                   │                       │                 │
//! │          └───────────────────┼───────────────────────┘                 │
//! │                              ▼                                          │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  [[jobs]]        table jobs, in configured order                 │  │
//! │  │  [[dashboards]]  dashboard pushes, after the table jobs          │  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration
//! Environment variables override the file:
//! - `WMS_API_BASE_URL` - Reporting API base URL
//! - `WMS_API_SECRET_KEY` - Basic credential for the API
//! - `WMS_DATABASE_PATH` - SQLite file
//! - `WMS_TIMEZONE` - IANA zone for windows (default: US/Eastern)
//! - `WMS_UOM_PARTIAL_POLICY` - `reject` or `allow_partial`

pub mod config;
pub mod dashboards;
pub mod error;
pub mod jobs;

#[cfg(test)]
mod testing;

// Re-exports
pub use config::EtlConfig;
pub use error::{ConfigError, JobError};
