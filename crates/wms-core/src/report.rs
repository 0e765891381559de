//! # Report Request Types
//!
//! Wire shapes for requesting a report run from the reporting API.
//!
//! ## Request Body
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  {                                                                      │
//! │    "report":  "shipment_item",                                          │
//! │    "columns": ["actual_ship_at", "item_code", ...],                     │
//! │    "filters": [                                                         │
//! │      { "column": "actual_ship_at", "operator": "between",               │
//! │        "from_threshold": "2024-03-01 06:00",                            │
//! │        "to_threshold":   "2024-03-08 06:00" },                          │
//! │      { "column": "shipment_invoiced", "operator": "=",                  │
//! │        "threshold": "No" }                                              │
//! │    ],                                                                   │
//! │    "sort_by": [ { "column": "line_name", "direction": "asc" } ]         │
//! │  }                                                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};

// =============================================================================
// Filters
// =============================================================================

/// Comparison applied server-side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterOperator {
    #[serde(rename = "between")]
    Between,
    #[serde(rename = "=")]
    Equals,
    #[serde(rename = "starts with")]
    StartsWith,
    /// Restricts a timestamp column to the current day; takes no threshold.
    #[serde(rename = "today")]
    Today,
}

/// One report filter. Thresholds that don't apply are left out of the JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportFilter {
    pub column: String,
    pub operator: FilterOperator,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_threshold: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_threshold: Option<String>,
}

impl ReportFilter {
    fn bare(column: impl Into<String>, operator: FilterOperator) -> Self {
        ReportFilter {
            column: column.into(),
            operator,
            threshold: None,
            from_threshold: None,
            to_threshold: None,
        }
    }

    pub fn between(
        column: impl Into<String>,
        from: impl Into<String>,
        to: impl Into<String>,
    ) -> Self {
        ReportFilter {
            from_threshold: Some(from.into()),
            to_threshold: Some(to.into()),
            ..Self::bare(column, FilterOperator::Between)
        }
    }

    pub fn equals(column: impl Into<String>, value: impl Into<String>) -> Self {
        ReportFilter {
            threshold: Some(value.into()),
            ..Self::bare(column, FilterOperator::Equals)
        }
    }

    pub fn starts_with(column: impl Into<String>, prefix: impl Into<String>) -> Self {
        ReportFilter {
            threshold: Some(prefix.into()),
            ..Self::bare(column, FilterOperator::StartsWith)
        }
    }

    pub fn today(column: impl Into<String>) -> Self {
        Self::bare(column, FilterOperator::Today)
    }
}

// =============================================================================
// Sorting
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortBy {
    pub column: String,
    #[serde(default)]
    pub direction: SortDirection,
}

impl SortBy {
    pub fn asc(column: impl Into<String>) -> Self {
        SortBy {
            column: column.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(column: impl Into<String>) -> Self {
        SortBy {
            column: column.into(),
            direction: SortDirection::Desc,
        }
    }
}

// =============================================================================
// Report Request
// =============================================================================

/// Everything needed to submit one report run.
///
/// ## Example
/// ```rust
/// use wms_core::report::{ReportFilter, ReportRequest};
///
/// let request = ReportRequest::new("item_master", ["code", "base_unit_of_measure"])
///     .filter(ReportFilter::equals("inactive", "False"));
///
/// assert_eq!(request.columns.len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRequest {
    /// Report code, e.g. `uom_ratios`.
    pub report: String,
    pub columns: Vec<String>,
    #[serde(default)]
    pub filters: Vec<ReportFilter>,
    #[serde(default)]
    pub sort_by: Vec<SortBy>,
}

impl ReportRequest {
    pub fn new<I, S>(report: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ReportRequest {
            report: report.into(),
            columns: columns.into_iter().map(Into::into).collect(),
            filters: Vec::new(),
            sort_by: Vec::new(),
        }
    }

    pub fn filter(mut self, filter: ReportFilter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn filters(mut self, filters: impl IntoIterator<Item = ReportFilter>) -> Self {
        self.filters.extend(filters);
        self
    }

    pub fn sort(mut self, sort: SortBy) -> Self {
        self.sort_by.push(sort);
        self
    }
}

// =============================================================================
// Header Handling
// =============================================================================

/// How the first CSV record of a downloaded report is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeaderMode {
    /// First record holds column labels and is not yielded as data.
    #[default]
    Labels,
    /// First record is yielded like any other row.
    Raw,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_wire_shape() {
        let request = ReportRequest::new("shipment_item", ["actual_ship_at", "item_code"])
            .filter(ReportFilter::between(
                "actual_ship_at",
                "2024-03-01 06:00",
                "2024-03-08 06:00",
            ))
            .filter(ReportFilter::equals("shipment_invoiced", "No"))
            .sort(SortBy::asc("item_code"));

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({
                "report": "shipment_item",
                "columns": ["actual_ship_at", "item_code"],
                "filters": [
                    {
                        "column": "actual_ship_at",
                        "operator": "between",
                        "from_threshold": "2024-03-01 06:00",
                        "to_threshold": "2024-03-08 06:00"
                    },
                    { "column": "shipment_invoiced", "operator": "=", "threshold": "No" }
                ],
                "sort_by": [ { "column": "item_code", "direction": "asc" } ]
            })
        );
    }

    #[test]
    fn test_operator_names() {
        let today = serde_json::to_value(ReportFilter::today("actual_job_start_at")).unwrap();
        assert_eq!(today, json!({ "column": "actual_job_start_at", "operator": "today" }));

        let prefix = serde_json::to_value(ReportFilter::starts_with("location", "Line")).unwrap();
        assert_eq!(prefix["operator"], "starts with");
    }

    #[test]
    fn test_filter_from_toml_like_json() {
        let filter: ReportFilter =
            serde_json::from_value(json!({ "column": "invoiced", "operator": "=", "threshold": "false" }))
                .unwrap();
        assert_eq!(filter, ReportFilter::equals("invoiced", "false"));
    }
}
