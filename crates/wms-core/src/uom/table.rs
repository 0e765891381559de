//! # Item Conversion Table
//!
//! The per-item conversion graph and the converter that walks it.
//!
//! ## Conversion Walk
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  WIDGET1  base = eaches                                                 │
//! │  edges    [pallets ─40─► cases] [cases ─24─► eaches]                    │
//! │                                                                         │
//! │  convert("WIDGET1", "pl", 2)                                            │
//! │     "pl" ──alias──► "pallets"                                           │
//! │     pallets != base → first edge from pallets:  2 × 40 = 80 cases       │
//! │     cases   != base → first edge from cases:   80 × 24 = 1920 eaches    │
//! │     eaches  == base → 1920.0                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The walk takes at most one hop per listed edge. Anything longer means the
//! edges revisit a unit, which the builder already rejects; the converter
//! still refuses to loop.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use super::alias::UnitAliases;
use crate::error::{CoreError, CoreResult};
use crate::quantity::ToQuantity;

// =============================================================================
// Conversion Edge
// =============================================================================

/// `1 from_unit = factor to_unit`. The inverse is never assumed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionEdge {
    pub from_unit: String,
    pub factor: f64,
    pub to_unit: String,
}

impl ConversionEdge {
    pub fn new(from_unit: impl Into<String>, factor: f64, to_unit: impl Into<String>) -> Self {
        ConversionEdge {
            from_unit: from_unit.into(),
            factor,
            to_unit: to_unit.into(),
        }
    }

    /// The `{base, 1.0, base}` edge given to items without explicit ratios.
    pub fn identity(unit: impl Into<String>) -> Self {
        let unit = unit.into();
        ConversionEdge {
            from_unit: unit.clone(),
            factor: 1.0,
            to_unit: unit,
        }
    }
}

// =============================================================================
// Item Conversions
// =============================================================================

/// Base unit plus ordered edges for one item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemConversions {
    /// `None` when the item was only seen in the ratio report.
    pub base_unit: Option<String>,
    pub conversions: Vec<ConversionEdge>,
}

/// Where a first-match walk from some unit ends up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainOutcome {
    /// The walk arrived at the base unit after `hops` edges.
    Reached { hops: usize },
    /// No edge leaves `unit`.
    DeadEnd { unit: String },
    /// The walk came back to `unit` without passing through the base.
    Cycle { unit: String },
}

impl ItemConversions {
    /// An item known only from the item master.
    pub fn trivial(base_unit: impl Into<String>) -> Self {
        let base_unit = base_unit.into();
        ItemConversions {
            conversions: vec![ConversionEdge::identity(base_unit.clone())],
            base_unit: Some(base_unit),
        }
    }

    /// First edge leaving `unit`, in source order.
    pub fn edge_from(&self, unit: &str) -> Option<&ConversionEdge> {
        self.conversions.iter().find(|edge| edge.from_unit == unit)
    }

    /// Walks the first-match chain from `start` without touching quantities.
    ///
    /// Returns `None` when the item has no base unit to walk towards.
    pub fn trace(&self, start: &str) -> Option<ChainOutcome> {
        let base = self.base_unit.as_deref()?;
        let mut visited: Vec<&str> = Vec::new();
        let mut unit = start;

        loop {
            if unit == base {
                return Some(ChainOutcome::Reached {
                    hops: visited.len(),
                });
            }
            if visited.contains(&unit) {
                return Some(ChainOutcome::Cycle {
                    unit: unit.to_string(),
                });
            }
            visited.push(unit);

            match self.edge_from(unit) {
                Some(edge) => unit = &edge.to_unit,
                None => {
                    return Some(ChainOutcome::DeadEnd {
                        unit: unit.to_string(),
                    })
                }
            }
        }
    }

    /// Distinct `from_unit` values in first-seen order.
    pub fn source_units(&self) -> Vec<&str> {
        let mut units: Vec<&str> = Vec::new();
        for edge in &self.conversions {
            if !units.contains(&edge.from_unit.as_str()) {
                units.push(&edge.from_unit);
            }
        }
        units
    }
}

// =============================================================================
// Build Findings
// =============================================================================

/// Why an item was quarantined at build time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// Walking from `start` revisits `unit` without reaching the base.
    Cycle { start: String, unit: String },
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::Cycle { start, unit } => {
                write!(f, "conversions from {} loop back to {}", start, unit)
            }
        }
    }
}

/// Non-fatal findings. The item stays usable for the units that do resolve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableIssue {
    /// Seen in the ratio report, absent from the active item master.
    MissingBaseUnit { item: String },
    /// Walking from `from_unit` stops at `stuck_at`, which has no edge.
    DeadEnd {
        item: String,
        from_unit: String,
        stuck_at: String,
    },
}

impl fmt::Display for TableIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableIssue::MissingBaseUnit { item } => {
                write!(f, "{}: no base unit of measure", item)
            }
            TableIssue::DeadEnd {
                item,
                from_unit,
                stuck_at,
            } => write!(
                f,
                "{}: conversions from {} stop at {} before reaching the base unit",
                item, from_unit, stuck_at
            ),
        }
    }
}

// =============================================================================
// Item Conversion Table
// =============================================================================

/// Immutable conversion table. Build it with
/// [`UomTableBuilder`](super::builder::UomTableBuilder) and share it by
/// reference or `Arc`.
#[derive(Debug, Clone)]
pub struct ItemConversionTable {
    items: HashMap<String, ItemConversions>,
    rejected: HashMap<String, RejectReason>,
    issues: Vec<TableIssue>,
    aliases: UnitAliases,
}

impl ItemConversionTable {
    pub(crate) fn from_parts(
        items: HashMap<String, ItemConversions>,
        rejected: HashMap<String, RejectReason>,
        issues: Vec<TableIssue>,
        aliases: UnitAliases,
    ) -> Self {
        ItemConversionTable {
            items,
            rejected,
            issues,
            aliases,
        }
    }

    /// Converts `quantity` of `item` expressed in `unit` into base units.
    ///
    /// ## Example
    /// ```rust
    /// use wms_core::uom::UomTableBuilder;
    ///
    /// let mut builder = UomTableBuilder::new();
    /// builder.add_ratio("WIDGET1", "cases", "24", "eaches").unwrap();
    /// builder.add_base_unit("WIDGET1", "eaches");
    /// let table = builder.build();
    ///
    /// assert_eq!(table.convert_to_base_units("WIDGET1", "cs", 3).unwrap(), 72.0);
    /// ```
    ///
    /// ## Errors
    /// - [`CoreError::InvalidNumber`] - quantity is not a finite number
    /// - [`CoreError::UnknownItem`] - item never seen
    /// - [`CoreError::RejectedItem`] - item quarantined at build time
    /// - [`CoreError::MissingBaseUnit`] - item has edges but no base unit
    /// - [`CoreError::NoConversionPath`] - the walk reaches a unit with no edge
    /// - [`CoreError::ConversionCycle`] - the walk needs more hops than edges
    pub fn convert_to_base_units<Q: ToQuantity>(
        &self,
        item: &str,
        unit: &str,
        quantity: Q,
    ) -> CoreResult<f64> {
        let mut quantity = quantity.to_quantity()?;
        let start = self.aliases.normalize(unit);

        let entry = self.lookup(item)?;
        let base = entry
            .base_unit
            .as_deref()
            .ok_or_else(|| CoreError::MissingBaseUnit {
                item: item.to_string(),
            })?;

        let max_hops = entry.conversions.len();
        let mut hops = 0;
        let mut current = start;

        while current != base {
            let edge = entry
                .edge_from(current)
                .ok_or_else(|| CoreError::NoConversionPath {
                    item: item.to_string(),
                    unit: current.to_string(),
                })?;

            if hops == max_hops {
                return Err(CoreError::ConversionCycle {
                    item: item.to_string(),
                    unit: start.to_string(),
                    hops,
                });
            }

            quantity *= edge.factor;
            current = &edge.to_unit;
            hops += 1;
        }

        Ok(quantity)
    }

    fn lookup(&self, item: &str) -> CoreResult<&ItemConversions> {
        if let Some(entry) = self.items.get(item) {
            return Ok(entry);
        }
        match self.rejected.get(item) {
            Some(reason) => Err(CoreError::RejectedItem {
                item: item.to_string(),
                reason: reason.to_string(),
            }),
            None => Err(CoreError::UnknownItem {
                item: item.to_string(),
            }),
        }
    }

    /// Usable entry for `item`.
    pub fn get(&self, item: &str) -> Option<&ItemConversions> {
        self.items.get(item)
    }

    pub fn contains(&self, item: &str) -> bool {
        self.items.contains_key(item)
    }

    /// Number of usable items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> impl Iterator<Item = (&str, &ItemConversions)> {
        self.items.iter().map(|(code, entry)| (code.as_str(), entry))
    }

    /// Items quarantined by build-time validation.
    pub fn rejected(&self) -> &HashMap<String, RejectReason> {
        &self.rejected
    }

    pub fn issues(&self) -> &[TableIssue] {
        &self.issues
    }

    pub fn aliases(&self) -> &UnitAliases {
        &self.aliases
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn table_with(items: Vec<(&str, ItemConversions)>) -> ItemConversionTable {
        ItemConversionTable::from_parts(
            items
                .into_iter()
                .map(|(code, entry)| (code.to_string(), entry))
                .collect(),
            HashMap::new(),
            Vec::new(),
            UnitAliases::default(),
        )
    }

    fn widget() -> ItemConversions {
        ItemConversions {
            base_unit: Some("eaches".into()),
            conversions: vec![ConversionEdge::new("cases", 24.0, "eaches")],
        }
    }

    #[test]
    fn test_identity_for_base_unit() {
        let table = table_with(vec![("WIDGET1", widget())]);
        for q in [0.0, 1.0, -5.5, 1234.25] {
            assert_eq!(table.convert_to_base_units("WIDGET1", "eaches", q).unwrap(), q);
        }
        assert_eq!(table.convert_to_base_units("WIDGET1", "ea", -2).unwrap(), -2.0);
    }

    #[test]
    fn test_single_hop() {
        let table = table_with(vec![("WIDGET1", widget())]);
        assert_eq!(table.convert_to_base_units("WIDGET1", "cases", 2.5).unwrap(), 60.0);
    }

    #[test]
    fn test_chain_prefers_first_listed_edge() {
        let entry = ItemConversions {
            base_unit: Some("eaches".into()),
            conversions: vec![
                ConversionEdge::new("pallets", 40.0, "cases"),
                ConversionEdge::new("cases", 12.0, "eaches"),
                ConversionEdge::new("cases", 99.0, "eaches"),
            ],
        };
        let table = table_with(vec![("BOLT", entry)]);
        assert_eq!(table.convert_to_base_units("BOLT", "pallets", 2).unwrap(), 960.0);
    }

    #[test]
    fn test_widget_example() {
        let table = table_with(vec![("WIDGET1", widget())]);
        assert_eq!(table.convert_to_base_units("WIDGET1", "cs", 3).unwrap(), 72.0);
        assert_eq!(
            table.convert_to_base_units("WIDGET1", "cs", 3).unwrap(),
            table.convert_to_base_units("WIDGET1", "cases", 3).unwrap()
        );
    }

    #[test]
    fn test_unknown_item_and_unit() {
        let table = table_with(vec![("WIDGET1", widget())]);
        assert!(matches!(
            table.convert_to_base_units("NOPE", "cases", 1),
            Err(CoreError::UnknownItem { .. })
        ));
        assert!(matches!(
            table.convert_to_base_units("WIDGET1", "pallets", 1),
            Err(CoreError::NoConversionPath { ref unit, .. }) if unit == "pallets"
        ));
    }

    #[test]
    fn test_missing_base_unit() {
        let entry = ItemConversions {
            base_unit: None,
            conversions: vec![ConversionEdge::new("cases", 6.0, "eaches")],
        };
        let table = table_with(vec![("ORPHAN", entry)]);
        assert!(matches!(
            table.convert_to_base_units("ORPHAN", "cases", 1),
            Err(CoreError::MissingBaseUnit { .. })
        ));
    }

    #[test]
    fn test_hop_guard_stops_cycles() {
        // Hand-built table bypasses the builder's validation.
        let entry = ItemConversions {
            base_unit: Some("eaches".into()),
            conversions: vec![
                ConversionEdge::new("cases", 2.0, "boxes"),
                ConversionEdge::new("boxes", 0.5, "cases"),
            ],
        };
        let table = table_with(vec![("LOOP", entry)]);
        assert!(matches!(
            table.convert_to_base_units("LOOP", "cases", 1),
            Err(CoreError::ConversionCycle { hops: 2, .. })
        ));
    }

    #[test]
    fn test_string_quantity() {
        let table = table_with(vec![("WIDGET1", widget())]);
        assert_eq!(table.convert_to_base_units("WIDGET1", "cs", "2").unwrap(), 48.0);
        assert!(matches!(
            table.convert_to_base_units("WIDGET1", "cs", "two"),
            Err(CoreError::InvalidNumber { .. })
        ));
    }

    #[test]
    fn test_trace_outcomes() {
        let entry = ItemConversions {
            base_unit: Some("eaches".into()),
            conversions: vec![
                ConversionEdge::new("pallets", 40.0, "cases"),
                ConversionEdge::new("cases", 24.0, "eaches"),
                ConversionEdge::new("rolls", 3.0, "feet"),
            ],
        };
        assert_eq!(entry.trace("pallets"), Some(ChainOutcome::Reached { hops: 2 }));
        assert_eq!(entry.trace("eaches"), Some(ChainOutcome::Reached { hops: 0 }));
        assert_eq!(
            entry.trace("rolls"),
            Some(ChainOutcome::DeadEnd { unit: "feet".into() })
        );
        assert_eq!(entry.source_units(), vec!["pallets", "cases", "rolls"]);
    }
}
