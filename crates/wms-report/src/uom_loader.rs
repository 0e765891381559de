//! # UOM Table Loading
//!
//! Fetches the two source reports and builds the conversion table once per
//! process.
//!
//! ## Load Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  UomCache::get_or_load                                                  │
//! │        │                                                                │
//! │        ▼  (first caller only; others wait on the same cell)             │
//! │  load_uom_table                                                         │
//! │        │                                                                │
//! │        ├─► fetch uom_ratios   ──► builder.add_ratio_row   (per row)     │
//! │        ├─► fetch item_master  ──► builder.add_item_master_row           │
//! │        └─► builder.build()    ──► Arc<ItemConversionTable>              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::{error, info, warn};
use wms_core::uom::{ITEM_MASTER_REPORT, UOM_RATIO_REPORT};
use wms_core::{
    HeaderMode, ItemConversionTable, PartialBuildPolicy, ReportFilter, ReportRequest,
    UnitAliases, UomTableBuilder,
};

use crate::error::{ReportError, ReportResult};
use crate::source::ReportSource;

/// Ratio report: one row per conversion edge.
pub fn uom_ratio_request() -> ReportRequest {
    ReportRequest::new(
        UOM_RATIO_REPORT,
        ["code", "unit_of_measure", "ratio", "conversion_unit_of_measure"],
    )
}

/// Item master report: one row per active item with its base unit.
pub fn item_master_request() -> ReportRequest {
    ReportRequest::new(ITEM_MASTER_REPORT, ["code", "base_unit_of_measure"])
        .filter(ReportFilter::equals("inactive", "False"))
}

/// Fetches both source reports and builds a validated table.
///
/// Under [`PartialBuildPolicy::Reject`] any fetch failure is returned as is.
/// Under [`PartialBuildPolicy::AllowPartial`] rows read before a failure are
/// kept and loading continues with the next report. Invalid factors and
/// malformed rows fail the load under either policy.
pub async fn load_uom_table<S>(
    source: &S,
    policy: PartialBuildPolicy,
    aliases: UnitAliases,
) -> ReportResult<ItemConversionTable>
where
    S: ReportSource + ?Sized,
{
    let mut builder = UomTableBuilder::new().with_aliases(aliases);

    let ratios = uom_ratio_request();
    let consumed = feed(source, &ratios, policy, |row| builder.add_ratio_row(row)).await?;
    info!(report = %ratios.report, rows = consumed, "Loaded conversion ratios");

    let master = item_master_request();
    let consumed = feed(source, &master, policy, |row| builder.add_item_master_row(row)).await?;
    info!(report = %master.report, rows = consumed, "Loaded item master");

    let table = builder.build();

    for (item, reason) in table.rejected() {
        error!(%item, %reason, "Item rejected from conversion table");
    }
    for issue in table.issues() {
        warn!(%issue, "Conversion table issue");
    }
    info!(
        items = table.len(),
        rejected = table.rejected().len(),
        issues = table.issues().len(),
        "Conversion table built"
    );

    Ok(table)
}

/// Streams one report into `apply`, honoring the partial policy.
async fn feed<S, F>(
    source: &S,
    request: &ReportRequest,
    policy: PartialBuildPolicy,
    mut apply: F,
) -> ReportResult<usize>
where
    S: ReportSource + ?Sized,
    F: FnMut(&[String]) -> wms_core::CoreResult<()>,
{
    let rows = match source.fetch(request, HeaderMode::Labels).await {
        Ok(rows) => rows,
        Err(err) => return tolerate(request, policy, err, 0),
    };

    let mut consumed = 0usize;
    for row in rows {
        match row {
            Ok(cells) => {
                apply(&cells)?;
                consumed += 1;
            }
            Err(err) => return tolerate(request, policy, err, consumed),
        }
    }
    Ok(consumed)
}

fn tolerate(
    request: &ReportRequest,
    policy: PartialBuildPolicy,
    err: ReportError,
    consumed: usize,
) -> ReportResult<usize> {
    match policy {
        PartialBuildPolicy::Reject => Err(err),
        PartialBuildPolicy::AllowPartial => {
            warn!(
                report = %request.report,
                rows = consumed,
                error = %err,
                "Report failed part-way, continuing with partial data"
            );
            Ok(consumed)
        }
    }
}

// =============================================================================
// Process-wide Table
// =============================================================================

/// Builds the conversion table on first use and shares it afterwards.
///
/// Concurrent first callers wait on a single load. A failed load leaves the
/// cache empty so the next caller tries again.
#[derive(Debug, Default)]
pub struct UomCache {
    cell: OnceCell<Arc<ItemConversionTable>>,
    policy: PartialBuildPolicy,
    aliases: UnitAliases,
}

impl UomCache {
    pub fn new(policy: PartialBuildPolicy, aliases: UnitAliases) -> Self {
        UomCache {
            cell: OnceCell::new(),
            policy,
            aliases,
        }
    }

    /// Returns the table, loading it from `source` on first use.
    pub async fn get_or_load<S>(&self, source: &S) -> ReportResult<Arc<ItemConversionTable>>
    where
        S: ReportSource + ?Sized,
    {
        let table = self
            .cell
            .get_or_try_init(|| async {
                load_uom_table(source, self.policy, self.aliases.clone())
                    .await
                    .map(Arc::new)
            })
            .await?;
        Ok(Arc::clone(table))
    }

    /// Returns the table if it has already been loaded.
    pub fn get(&self) -> Option<Arc<ItemConversionTable>> {
        self.cell.get().cloned()
    }

    pub fn policy(&self) -> PartialBuildPolicy {
        self.policy
    }
}
