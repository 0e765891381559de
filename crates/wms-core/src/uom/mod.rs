//! # Unit of Measure Engine
//!
//! Converts item quantities from any listed unit into the item's base unit.
//!
//! ## Pieces
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  alias.rs    UnitAliases          "cs" → "cases"                        │
//! │  builder.rs  UomTableBuilder      report rows → validated table         │
//! │  table.rs    ItemConversionTable  convert_to_base_units()               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The table is built once, then passed by reference (or `Arc`) to every
//! caller. Nothing in this module is global.

pub mod alias;
pub mod builder;
pub mod table;

pub use alias::{UnitAliases, DEFAULT_ALIASES};
pub use builder::{UomTableBuilder, ITEM_MASTER_REPORT, UOM_RATIO_REPORT};
pub use table::{
    ChainOutcome, ConversionEdge, ItemConversionTable, ItemConversions, RejectReason, TableIssue,
};

use serde::{Deserialize, Serialize};

/// What to do when one of the source reports fails part-way through.
///
/// ## Policies
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  REJECT (default)                 │  ALLOW_PARTIAL                      │
/// │  ────────────────                 │  ──────────────                     │
/// │  • Any fetch failure aborts       │  • Rows read before the failure     │
/// │    the load                       │    are kept                         │
/// │  • No table is produced           │  • Items never reached fail later   │
/// │                                   │    with UnknownItem                 │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartialBuildPolicy {
    #[default]
    Reject,
    AllowPartial,
}

impl std::fmt::Display for PartialBuildPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PartialBuildPolicy::Reject => write!(f, "reject"),
            PartialBuildPolicy::AllowPartial => write!(f, "allow_partial"),
        }
    }
}

impl std::str::FromStr for PartialBuildPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "reject" => Ok(PartialBuildPolicy::Reject),
            "allow_partial" | "partial" => Ok(PartialBuildPolicy::AllowPartial),
            _ => Err(format!("Unknown partial build policy: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_parsing() {
        assert_eq!("reject".parse::<PartialBuildPolicy>().unwrap(), PartialBuildPolicy::Reject);
        assert_eq!(
            "allow_partial".parse::<PartialBuildPolicy>().unwrap(),
            PartialBuildPolicy::AllowPartial
        );
        assert_eq!(
            "Partial".parse::<PartialBuildPolicy>().unwrap(),
            PartialBuildPolicy::AllowPartial
        );
        assert!("maybe".parse::<PartialBuildPolicy>().is_err());
        assert_eq!(PartialBuildPolicy::default(), PartialBuildPolicy::Reject);
    }
}
