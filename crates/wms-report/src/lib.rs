//! # wms-report: Reporting API Client
//!
//! This crate runs reports against the warehouse reporting API and turns the
//! downloaded CSV into rows. It also owns loading of the unit-of-measure
//! conversion table, since both of its sources are reports.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Report Fetch Architecture                        │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                  ReportSource (async trait)                      │  │
//! │  │                                                                  │  │
//! │  │  fetch(request, header_mode) → ReportRows                       │  │
//! │  └────────────────────────────┬─────────────────────────────────────┘  │
//! │                               │ implemented by                          │
//! │                               ▼                                         │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────┐    │
//! │  │ ReportClient   │  │  ReportRows    │  │  UomCache              │    │
//! │  │                │  │                │  │                        │    │
//! │  │ submit + retry │─►│ lazy CSV rows  │─►│ uom_ratios +           │    │
//! │  │ poll status    │  │ header labels  │  │ item_master → table    │    │
//! │  │ download CSV   │  │                │  │ built once, shared     │    │
//! │  └────────────────┘  └────────────────┘  └────────────────────────┘    │
//! │                                                                         │
//! │  ┌────────────────┐                                                    │
//! │  │DashboardClient │  POST JSON row batches to push URLs                │
//! │  └────────────────┘                                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//! - [`client`] - `ReportClient`: submit, poll, download
//! - [`rows`] - Lazy CSV row iterator
//! - [`source`] - `ReportSource` trait
//! - [`uom_loader`] - Conversion table loading and process-wide cache
//! - [`dashboard`] - Dashboard push client
//! - [`error`] - Report error types

pub mod client;
pub mod dashboard;
pub mod error;
pub mod rows;
pub mod source;
pub mod uom_loader;

pub use client::{ClientConfig, PollStatus, ReportClient, ReportHandle};
pub use dashboard::DashboardClient;
pub use error::{ReportError, ReportResult, Stage};
pub use rows::ReportRows;
pub use source::ReportSource;
pub use uom_loader::{item_master_request, load_uom_table, uom_ratio_request, UomCache};
