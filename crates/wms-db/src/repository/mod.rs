//! # Repository Module
//!
//! Database repository implementations for the nightly ETL.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern Explained                         │
//! │                                                                         │
//! │  The Repository pattern abstracts database access behind a clean API.  │
//! │                                                                         │
//! │  Table job                                                             │
//! │       │                                                                 │
//! │       │  db.facts().upsert("shipments", &keys, &record)                │
//! │       │  ↓                                                              │
//! │       ▼                                                                 │
//! │  FactRepository                                                        │
//! │  ├── insert / insert_many(&self, table, records)                       │
//! │  ├── upsert(&self, table, keys, record)                                │
//! │  ├── delete_between / delete_all(&self, table, ...)                    │
//! │  └── count(&self, table)                                               │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  Benefits:                                                              │
//! │  • Clean separation of concerns                                        │
//! │  • Easy to test (mock the repository)                                  │
//! │  • SQL is isolated in one place                                        │
//! │  • Dynamic identifiers quoted in one place                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`fact::FactRepository`] - Report rows in configured tables
//! - [`job_run::JobRunRepository`] - Job run ledger

pub mod fact;
pub mod job_run;
