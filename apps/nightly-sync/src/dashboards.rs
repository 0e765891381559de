//! # Dashboard Jobs
//!
//! Pull a small report and push it to a dashboard dataset as JSON.
//!
//! ```toml
//! [[dashboards]]
//! name = "picks_today"
//! report = "pick_summary"
//! columns = ["user", "picks", "accuracy"]
//! filters = [{ column = "picked_at", operator = "today" }]
//! url = "https://dashboards.example.com/push/abc123"
//! fields = [
//!     { name = "Picker", kind = "text" },
//!     { name = "Picks", kind = "number" },
//!     { name = "Accuracy", kind = "percent" },
//! ]
//! ```
//!
//! Each row becomes `{"Picker": "amy", "Picks": 120.0, "Accuracy": 99.5,
//! "timestamp": "03/08/2024 06:00:00"}`.
//!
//! An empty report still pushes one placeholder row (`""` for text, `0` for
//! numbers) so the dataset stops showing the previous run. Set
//! `on_empty = "skip"` to push nothing instead.

use chrono::{DateTime, TimeZone};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt::Display;
use tracing::{debug, info};
use wms_core::{HeaderMode, ReportFilter, ReportRequest, SortBy};
use wms_report::{DashboardClient, ReportSource};

use crate::error::JobError;

/// Timestamp format dashboards expect.
pub const DASHBOARD_TIMESTAMP_FORMAT: &str = "%m/%d/%Y %H:%M:%S";

/// How a report cell is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    #[default]
    Text,
    Number,
    /// Number with an optional trailing `%`.
    Percent,
}

/// What to push when the report has no rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyReport {
    /// One blank row carrying only the timestamp.
    #[default]
    Placeholder,
    Skip,
}

/// Output name and kind for one report column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardField {
    pub name: String,
    #[serde(default)]
    pub kind: FieldKind,
}

/// A report-to-dashboard job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardJob {
    pub name: String,
    pub report: String,
    pub columns: Vec<String>,
    #[serde(default)]
    pub filters: Vec<ReportFilter>,
    #[serde(default)]
    pub sort_by: Vec<SortBy>,
    pub url: String,
    /// One entry per column, in column order.
    pub fields: Vec<DashboardField>,
    #[serde(default)]
    pub on_empty: EmptyReport,
}

impl DashboardJob {
    pub fn request(&self) -> ReportRequest {
        let mut request = ReportRequest::new(self.report.clone(), self.columns.iter().cloned())
            .filters(self.filters.iter().cloned());
        for sort in &self.sort_by {
            request = request.sort(sort.clone());
        }
        request
    }

    /// Maps one report row to a dashboard object.
    pub fn map_row(&self, row: &[String], timestamp: &str, row_number: usize) -> Result<Value, JobError> {
        let mut object = Map::with_capacity(self.fields.len() + 1);
        for (index, field) in self.fields.iter().enumerate() {
            let cell = row.get(index).map(String::as_str).unwrap_or("");
            object.insert(field.name.clone(), field_value(field, cell, row_number)?);
        }
        object.insert("timestamp".to_string(), Value::String(timestamp.to_string()));
        Ok(Value::Object(object))
    }

    /// Blank row pushed in place of an empty report.
    pub fn placeholder_row(&self, timestamp: &str) -> Value {
        let mut object = Map::with_capacity(self.fields.len() + 1);
        for field in &self.fields {
            let blank = match field.kind {
                FieldKind::Text => Value::String(String::new()),
                FieldKind::Number | FieldKind::Percent => Value::from(0),
            };
            object.insert(field.name.clone(), blank);
        }
        object.insert("timestamp".to_string(), Value::String(timestamp.to_string()));
        Value::Object(object)
    }

    /// Maps every row, applying the empty-report policy.
    pub fn payload<I>(&self, rows: I, timestamp: &str) -> Result<Vec<Value>, JobError>
    where
        I: IntoIterator<Item = wms_report::ReportResult<Vec<String>>>,
    {
        let mut objects = Vec::new();
        for (index, row) in rows.into_iter().enumerate() {
            objects.push(self.map_row(&row?, timestamp, index + 1)?);
        }
        if objects.is_empty() && self.on_empty == EmptyReport::Placeholder {
            debug!(dashboard = %self.name, "Report returned no rows, pushing placeholder");
            objects.push(self.placeholder_row(timestamp));
        }
        Ok(objects)
    }
}

fn field_value(field: &DashboardField, cell: &str, row: usize) -> Result<Value, JobError> {
    let cell = cell.trim();
    let numeric = match field.kind {
        FieldKind::Text => return Ok(Value::String(cell.to_string())),
        FieldKind::Number => cell,
        FieldKind::Percent => cell.trim_end_matches('%').trim_end(),
    };
    if numeric.is_empty() {
        return Ok(Value::Null);
    }

    let invalid = || JobError::InvalidCell {
        row,
        column: field.name.clone(),
        value: cell.to_string(),
    };
    let number: f64 = numeric.replace(',', "").parse().map_err(|_| invalid())?;
    serde_json::Number::from_f64(number)
        .map(Value::Number)
        .ok_or_else(invalid)
}

/// Runs one dashboard job. Returns the number of rows pushed.
pub async fn run_dashboard<S, Tz>(
    job: &DashboardJob,
    source: &S,
    client: &DashboardClient,
    now: &DateTime<Tz>,
) -> Result<usize, JobError>
where
    S: ReportSource + ?Sized,
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let rows = source.fetch(&job.request(), HeaderMode::Labels).await?;
    let timestamp = now.format(DASHBOARD_TIMESTAMP_FORMAT).to_string();

    let objects = job.payload(rows, &timestamp)?;
    if objects.is_empty() {
        debug!(dashboard = %job.name, "Report returned no rows, nothing to push");
        return Ok(0);
    }

    let pushed = client.push_rows(&job.url, &objects).await?;
    info!(dashboard = %job.name, rows = pushed, "Dashboard updated");
    Ok(pushed)
}
