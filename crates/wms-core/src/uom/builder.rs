//! # UOM Table Builder
//!
//! Assembles an [`ItemConversionTable`] from the two source reports.
//!
//! ## Build Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. uom_ratios rows        (item, from, factor, to)                     │
//! │       │  grouped per item, source order kept                            │
//! │       ▼                                                                 │
//! │  2. item_master rows       (item, base_unit)                            │
//! │       │  item has edges?  → attach base unit to that entry              │
//! │       │  otherwise        → new entry { base, [base ─1─► base] }        │
//! │       ▼                                                                 │
//! │  3. validate every item                                                 │
//! │       │  walk from each source unit, bounded by the edge count          │
//! │       │  loop without base → item rejected                              │
//! │       │  stops at unit w/o edge → DeadEnd issue (item kept)             │
//! │       ▼                                                                 │
//! │  ItemConversionTable (immutable)                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Rows may be added in any order; `build()` always applies ratios before
//! base units.

use std::collections::HashMap;

use super::alias::UnitAliases;
use super::table::{
    ChainOutcome, ConversionEdge, ItemConversionTable, ItemConversions, RejectReason, TableIssue,
};
use crate::error::{CoreError, CoreResult};
use crate::quantity::parse_factor;

/// Report code of the ratio report, used in row errors.
pub const UOM_RATIO_REPORT: &str = "uom_ratios";

/// Report code of the item master report, used in row errors.
pub const ITEM_MASTER_REPORT: &str = "item_master";

/// Collects source rows and produces a validated table.
#[derive(Debug, Default)]
pub struct UomTableBuilder {
    /// Item codes in first-seen order, with their edges.
    conversions: Vec<(String, Vec<ConversionEdge>)>,
    conversion_index: HashMap<String, usize>,
    base_units: Vec<(String, String)>,
    aliases: UnitAliases,
}

impl UomTableBuilder {
    /// Builder using the default alias table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the alias table handed to the built table.
    pub fn with_aliases(mut self, aliases: UnitAliases) -> Self {
        self.aliases = aliases;
        self
    }

    /// Adds one conversion edge. The factor is parsed and must be positive.
    pub fn add_ratio(
        &mut self,
        item: impl Into<String>,
        from_unit: impl Into<String>,
        factor: &str,
        to_unit: impl Into<String>,
    ) -> CoreResult<()> {
        let factor = parse_factor(factor)?;
        self.push_edge(item.into(), ConversionEdge::new(from_unit, factor, to_unit));
        Ok(())
    }

    /// Adds one `(item, from, factor, to)` row of the ratio report.
    pub fn add_ratio_row<S: AsRef<str>>(&mut self, row: &[S]) -> CoreResult<()> {
        check_width(UOM_RATIO_REPORT, row.len(), 4)?;
        self.add_ratio(
            row[0].as_ref(),
            row[1].as_ref(),
            row[2].as_ref(),
            row[3].as_ref(),
        )
    }

    /// Records the base unit of an item. A later call for the same item wins.
    pub fn add_base_unit(&mut self, item: impl Into<String>, base_unit: impl Into<String>) {
        self.base_units.push((item.into(), base_unit.into()));
    }

    /// Adds one `(item, base_unit)` row of the item master report.
    pub fn add_item_master_row<S: AsRef<str>>(&mut self, row: &[S]) -> CoreResult<()> {
        check_width(ITEM_MASTER_REPORT, row.len(), 2)?;
        self.add_base_unit(row[0].as_ref(), row[1].as_ref());
        Ok(())
    }

    /// Number of edges collected so far.
    pub fn ratio_count(&self) -> usize {
        self.conversions.iter().map(|(_, edges)| edges.len()).sum()
    }

    /// Number of base-unit rows collected so far.
    pub fn base_unit_count(&self) -> usize {
        self.base_units.len()
    }

    fn push_edge(&mut self, item: String, edge: ConversionEdge) {
        match self.conversion_index.get(&item) {
            Some(&idx) => self.conversions[idx].1.push(edge),
            None => {
                self.conversion_index.insert(item.clone(), self.conversions.len());
                self.conversions.push((item, vec![edge]));
            }
        }
    }

    /// Merges, validates and freezes the table.
    pub fn build(self) -> ItemConversionTable {
        let mut items: HashMap<String, ItemConversions> = HashMap::new();

        // Ratios first.
        for (item, conversions) in self.conversions {
            items.insert(
                item,
                ItemConversions {
                    base_unit: None,
                    conversions,
                },
            );
        }

        // Then base units, last row per item wins.
        let mut latest: HashMap<String, String> = HashMap::new();
        for (item, base_unit) in self.base_units {
            latest.insert(item, base_unit);
        }
        for (item, base_unit) in latest {
            match items.get_mut(&item) {
                Some(entry) => entry.base_unit = Some(base_unit),
                None => {
                    items.insert(item, ItemConversions::trivial(base_unit));
                }
            }
        }

        let mut rejected = HashMap::new();
        let mut issues = Vec::new();
        let mut codes: Vec<String> = items.keys().cloned().collect();
        codes.sort();

        for code in codes {
            let Some(entry) = items.get(&code) else {
                continue;
            };
            match validate_item(&code, entry) {
                Validation::Ok(found) => issues.extend(found),
                Validation::Rejected(reason) => {
                    items.remove(&code);
                    rejected.insert(code, reason);
                }
            }
        }

        ItemConversionTable::from_parts(items, rejected, issues, self.aliases)
    }
}

fn check_width(report: &str, actual: usize, expected: usize) -> CoreResult<()> {
    if actual < expected {
        return Err(CoreError::MalformedRow {
            report: report.to_string(),
            expected,
            actual,
        });
    }
    Ok(())
}

enum Validation {
    Ok(Vec<TableIssue>),
    Rejected(RejectReason),
}

fn validate_item(code: &str, entry: &ItemConversions) -> Validation {
    if entry.base_unit.is_none() {
        return Validation::Ok(vec![TableIssue::MissingBaseUnit {
            item: code.to_string(),
        }]);
    }

    let mut issues = Vec::new();
    for start in entry.source_units() {
        match entry.trace(start) {
            Some(ChainOutcome::Reached { .. }) | None => {}
            Some(ChainOutcome::DeadEnd { unit }) => issues.push(TableIssue::DeadEnd {
                item: code.to_string(),
                from_unit: start.to_string(),
                stuck_at: unit,
            }),
            Some(ChainOutcome::Cycle { unit }) => {
                return Validation::Rejected(RejectReason::Cycle {
                    start: start.to_string(),
                    unit,
                })
            }
        }
    }
    Validation::Ok(issues)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_into_single_entry() {
        let mut builder = UomTableBuilder::new();
        builder.add_ratio("WIDGET1", "cases", "24", "eaches").unwrap();
        builder.add_ratio("WIDGET1", "pallets", "40", "cases").unwrap();
        builder.add_base_unit("WIDGET1", "eaches");
        let table = builder.build();

        assert_eq!(table.len(), 1);
        let entry = table.get("WIDGET1").unwrap();
        assert_eq!(entry.base_unit.as_deref(), Some("eaches"));
        assert_eq!(entry.conversions.len(), 2);
        assert_eq!(entry.conversions[0].from_unit, "cases");
        assert_eq!(entry.conversions[1].from_unit, "pallets");
    }

    #[test]
    fn test_master_only_item_gets_trivial_edge() {
        let mut builder = UomTableBuilder::new();
        builder.add_base_unit("TAPE", "rolls");
        let table = builder.build();

        let entry = table.get("TAPE").unwrap();
        assert_eq!(entry.conversions, vec![ConversionEdge::identity("rolls")]);
        assert_eq!(table.convert_to_base_units("TAPE", "rl", 4).unwrap(), 4.0);
        assert!(table.issues().is_empty());
    }

    #[test]
    fn test_base_units_applied_after_ratios_regardless_of_call_order() {
        let mut builder = UomTableBuilder::new();
        builder.add_base_unit("WIDGET1", "eaches");
        builder.add_ratio("WIDGET1", "cases", "24", "eaches").unwrap();
        let table = builder.build();

        let entry = table.get("WIDGET1").unwrap();
        assert_eq!(entry.conversions.len(), 1);
        assert_eq!(entry.conversions[0].from_unit, "cases");
        assert_eq!(table.convert_to_base_units("WIDGET1", "cs", 3).unwrap(), 72.0);
    }

    #[test]
    fn test_row_adapters() {
        let mut builder = UomTableBuilder::new();
        builder
            .add_ratio_row(&["WIDGET1", "cases", "24", "eaches"])
            .unwrap();
        builder.add_item_master_row(&["WIDGET1", "eaches"]).unwrap();
        assert_eq!(builder.ratio_count(), 1);
        assert_eq!(builder.base_unit_count(), 1);

        assert!(matches!(
            builder.add_ratio_row(&["WIDGET1", "cases"]),
            Err(CoreError::MalformedRow { expected: 4, actual: 2, .. })
        ));
        assert!(matches!(
            builder.add_item_master_row(&["WIDGET1"]),
            Err(CoreError::MalformedRow { expected: 2, actual: 1, .. })
        ));
    }

    #[test]
    fn test_invalid_factor_fails_fast() {
        let mut builder = UomTableBuilder::new();
        assert!(builder.add_ratio("X", "cases", "abc", "eaches").is_err());
        assert!(builder.add_ratio("X", "cases", "0", "eaches").is_err());
        assert_eq!(builder.ratio_count(), 0);
    }

    #[test]
    fn test_cyclic_item_is_rejected() {
        let mut builder = UomTableBuilder::new();
        builder.add_ratio("LOOP", "cases", "2", "boxes").unwrap();
        builder.add_ratio("LOOP", "boxes", "0.5", "cases").unwrap();
        builder.add_base_unit("LOOP", "eaches");
        builder.add_base_unit("OK", "eaches");
        let table = builder.build();

        assert!(!table.contains("LOOP"));
        assert!(table.contains("OK"));
        assert!(table.rejected().contains_key("LOOP"));
        assert!(matches!(
            table.convert_to_base_units("LOOP", "eaches", 1),
            Err(CoreError::RejectedItem { .. })
        ));
    }

    #[test]
    fn test_dead_end_and_missing_base_are_flagged() {
        let mut builder = UomTableBuilder::new();
        builder.add_ratio("ROPE", "rolls", "50", "feet").unwrap();
        builder.add_ratio("ROPE", "cases", "10", "eaches").unwrap();
        builder.add_base_unit("ROPE", "eaches");
        builder.add_ratio("INACTIVE", "cases", "12", "eaches").unwrap();
        let table = builder.build();

        assert!(table.contains("ROPE"));
        assert!(table.issues().contains(&TableIssue::DeadEnd {
            item: "ROPE".into(),
            from_unit: "rolls".into(),
            stuck_at: "feet".into(),
        }));
        assert!(table.issues().contains(&TableIssue::MissingBaseUnit {
            item: "INACTIVE".into(),
        }));
        assert_eq!(table.convert_to_base_units("ROPE", "cs", 2).unwrap(), 20.0);
        assert!(matches!(
            table.convert_to_base_units("ROPE", "rl", 1),
            Err(CoreError::NoConversionPath { ref unit, .. }) if unit == "feet"
        ));
    }

    #[test]
    fn test_later_base_unit_wins() {
        let mut builder = UomTableBuilder::new();
        builder.add_base_unit("GLUE", "liters");
        builder.add_base_unit("GLUE", "gallons");
        let table = builder.build();
        assert_eq!(
            table.get("GLUE").unwrap().base_unit.as_deref(),
            Some("gallons")
        );
    }

    #[test]
    fn test_custom_aliases_travel_with_table() {
        let mut builder =
            UomTableBuilder::new().with_aliases(UnitAliases::with_overrides([("dz", "dozens")]));
        builder.add_ratio("EGG", "dozens", "12", "eaches").unwrap();
        builder.add_base_unit("EGG", "eaches");
        let table = builder.build();
        assert_eq!(table.convert_to_base_units("EGG", "dz", 2).unwrap(), 24.0);
    }
}
