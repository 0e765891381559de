//! # wms-core: Pure Logic for the Nightly ETL
//!
//! This crate is the **heart** of the warehouse ETL. It contains the
//! unit-of-measure engine and the plain data types shared by the I/O crates,
//! as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Nightly ETL Architecture                         │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 nightly-sync (scheduled jobs)                   │   │
//! │  │   shipments, receipts, moves, labor, invoices, item master ...  │   │
//! │  └───────────────┬─────────────────────────────────┬───────────────┘   │
//! │                  │                                 │                    │
//! │  ┌───────────────▼───────────────┐  ┌──────────────▼────────────────┐  │
//! │  │ wms-report                    │  │ wms-db                        │  │
//! │  │ submit / poll / download CSV  │  │ insert / upsert / delete      │  │
//! │  └───────────────┬───────────────┘  └──────────────┬────────────────┘  │
//! │                  │                                 │                    │
//! │  ┌───────────────▼─────────────────────────────────▼───────────────┐   │
//! │  │               ★ wms-core (THIS CRATE) ★                         │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │    uom    │  │  report   │  │  record   │  │  window   │  │   │
//! │  │   │  builder  │  │ requests  │  │  values   │  │  ranges   │  │   │
//! │  │   │  table    │  │  filters  │  │           │  │           │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`uom`] - Conversion table builder and unit converter
//! - [`quantity`] - Numeric parsing at the report boundary
//! - [`report`] - Report request types (filters, sorting, header mode)
//! - [`record`] - Column/value rows handed to the store
//! - [`window`] - Trailing date windows
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use wms_core::uom::UomTableBuilder;
//!
//! let mut builder = UomTableBuilder::new();
//! builder.add_ratio("WIDGET1", "cases", "24", "eaches").unwrap();
//! builder.add_base_unit("WIDGET1", "eaches");
//! let table = builder.build();
//!
//! // "cs" is an alias of "cases"
//! assert_eq!(table.convert_to_base_units("WIDGET1", "cs", 3).unwrap(), 72.0);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod quantity;
pub mod record;
pub mod report;
pub mod uom;
pub mod window;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult};
pub use record::{FieldValue, Record};
pub use report::{HeaderMode, ReportFilter, ReportRequest, SortBy};
pub use uom::{ItemConversionTable, PartialBuildPolicy, UnitAliases, UomTableBuilder};
pub use window::{ReportWindow, WindowAlignment};
