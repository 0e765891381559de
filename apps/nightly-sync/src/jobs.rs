//! # Table Jobs
//!
//! One job pulls one report and writes its rows into one SQLite table.
//!
//! ## Job Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Table Job Execution                              │
//! │                                                                         │
//! │  now (configured zone)                                                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ReportWindow ──► ReportRequest (columns + window + filters + sort)    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ReportSource::fetch ──► ReportRows (header consumed)                  │
//! │       │                                                                 │
//! │       ▼  per row                                                        │
//! │  Record (job columns) ──► UOM column ──► stamp column                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  WriteMode                                                             │
//! │  ├── upsert         → FactRepository::upsert_many                      │
//! │  ├── replace_window → FactRepository::replace_between                  │
//! │  └── snapshot       → FactRepository::replace_all                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  etl_job_runs: succeeded(rows) / failed(error)                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Config Example
//! ```toml
//! [[jobs]]
//! name = "shipments"
//! report = "shipments"
//! columns = ["shipment_id", "item_code", "unit", "quantity", "time_completed_at"]
//! window_column = "time_completed_at"
//! window_days = 2
//! table = "shipments"
//! write = { mode = "upsert", keys = ["shipment_id"] }
//! stamp_column = "loaded_at"
//!
//! [jobs.uom]
//! item_column = "item_code"
//! unit_column = "unit"
//! quantity_column = "quantity"
//! target_column = "base_quantity"
//! on_error = "skip_row"
//! ```
//!
//! ## Key Scoping
//! A job can take its window and its row set from a second report. The
//! production records job only keeps jobs that are not invoiced yet:
//!
//! ```toml
//! [[jobs]]
//! name = "production_records"
//! report = "job_productivity"
//! columns = ["job_id", "line_name", "actual_job_start_at", "units_produced"]
//! window_column = "actual_job_start_at"
//! table = "production_records"
//! write = { mode = "upsert", keys = ["job_id"] }
//!
//! [jobs.key_source]
//! report = "job_profitability"
//! key_column = "job_id"
//! date_column = "actual_job_start_at"
//! date_format = "%Y-%b-%d %I:%M %p"
//! filters = [{ column = "invoiced", operator = "=", threshold = "false" }]
//! match_column = "job_id"
//! ```
//!
//! The window then runs from the earliest to the latest key date, and rows
//! whose `match_column` is not a key are dropped before writing.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt::Display;
use tracing::{error, info, warn};
use wms_core::window::WINDOW_FORMAT;
use wms_core::{
    HeaderMode, ItemConversionTable, Record, ReportFilter, ReportRequest, ReportWindow, SortBy,
    WindowAlignment,
};
use wms_db::Database;
use wms_report::{ReportSource, UomCache};

use crate::error::JobError;

// =============================================================================
// Job Definitions
// =============================================================================

/// How fetched rows replace what is already stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum WriteMode {
    /// Update rows matching `keys`, insert the rest.
    Upsert { keys: Vec<String> },
    /// Delete rows whose `column` falls in the report window, then insert.
    ReplaceWindow { column: String },
    /// Delete everything, then insert.
    Snapshot,
}

/// What to do with a row whose quantity cannot be converted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnConversionError {
    /// Fail the job.
    #[default]
    Abort,
    /// Log the row and leave it out.
    SkipRow,
}

/// Columns feeding the base-unit quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UomColumns {
    pub item_column: String,
    pub unit_column: String,
    pub quantity_column: String,
    pub target_column: String,
    #[serde(default)]
    pub on_error: OnConversionError,
}

fn default_date_format() -> String {
    "%Y-%m-%d %H:%M".to_string()
}

/// Second report that scopes a job to a set of keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySource {
    pub report: String,
    pub key_column: String,
    /// Dated column whose min and max bound the job's window.
    pub date_column: String,
    /// chrono format of `date_column` cells.
    #[serde(default = "default_date_format")]
    pub date_format: String,
    #[serde(default)]
    pub filters: Vec<ReportFilter>,
    /// Job column compared against the keys.
    pub match_column: String,
}

impl KeySource {
    pub fn request(&self) -> ReportRequest {
        ReportRequest::new(
            self.report.clone(),
            [self.key_column.clone(), self.date_column.clone()],
        )
        .filters(self.filters.iter().cloned())
    }

    fn parse_date(&self, cell: &str, row: usize) -> Result<NaiveDate, JobError> {
        NaiveDateTime::parse_from_str(cell, &self.date_format)
            .map(|dt| dt.date())
            .or_else(|_| NaiveDate::parse_from_str(cell, &self.date_format))
            .map_err(|_| JobError::InvalidCell {
                row,
                column: self.date_column.clone(),
                value: cell.to_string(),
            })
    }
}

/// Keys and window read from a [`KeySource`].
#[derive(Debug, Clone)]
pub struct KeyScope {
    pub keys: HashSet<String>,
    pub window: ReportWindow,
    pub match_column: String,
}

impl KeyScope {
    /// Builds the scope from key report rows. Rows without a date are
    /// ignored. `None` when no row qualifies.
    pub fn from_rows<I>(source: &KeySource, rows: I) -> Result<Option<Self>, JobError>
    where
        I: IntoIterator<Item = wms_report::ReportResult<Vec<String>>>,
    {
        let mut keys = HashSet::new();
        let mut dates = Vec::new();
        for (index, row) in rows.into_iter().enumerate() {
            let row = row?;
            let key = row.first().map(|c| c.trim()).unwrap_or("");
            let date = row.get(1).map(|c| c.trim()).unwrap_or("");
            if key.is_empty() || date.is_empty() {
                continue;
            }
            dates.push(source.parse_date(date, index + 1)?);
            keys.insert(key.to_string());
        }

        Ok(ReportWindow::covering_dates(dates).map(|window| KeyScope {
            keys,
            window,
            match_column: source.match_column.clone(),
        }))
    }

    pub async fn load<S>(source: &KeySource, reports: &S) -> Result<Option<Self>, JobError>
    where
        S: ReportSource + ?Sized,
    {
        let rows = reports.fetch(&source.request(), HeaderMode::Labels).await?;
        Self::from_rows(source, rows)
    }

    /// Whether `record` belongs to the scope.
    pub fn admits(&self, record: &Record) -> bool {
        record
            .text(&self.match_column)
            .is_some_and(|value| self.keys.contains(value.trim()))
    }
}

fn default_window_days() -> u32 {
    1
}

/// A report-to-table job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableJob {
    pub name: String,
    pub report: String,
    /// Report columns, in order. Also the table's column names.
    pub columns: Vec<String>,

    /// Column the trailing window filters on. No window when absent.
    #[serde(default)]
    pub window_column: Option<String>,
    #[serde(default = "default_window_days")]
    pub window_days: u32,
    #[serde(default)]
    pub window_alignment: WindowAlignment,

    #[serde(default)]
    pub filters: Vec<ReportFilter>,
    #[serde(default)]
    pub sort_by: Vec<SortBy>,

    pub table: String,
    pub write: WriteMode,

    /// Extra column holding the run time.
    #[serde(default)]
    pub stamp_column: Option<String>,

    #[serde(default)]
    pub uom: Option<UomColumns>,

    /// Takes the window and row set from another report.
    #[serde(default)]
    pub key_source: Option<KeySource>,
}

impl TableJob {
    /// Report window for a run at `now`.
    pub fn window<Tz>(&self, now: &DateTime<Tz>) -> Option<ReportWindow>
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        self.window_column
            .as_ref()
            .map(|_| ReportWindow::trailing_days(now, self.window_days, self.window_alignment))
    }

    /// Report request for a run with `window`.
    pub fn request(&self, window: Option<&ReportWindow>) -> ReportRequest {
        let mut filters = Vec::with_capacity(self.filters.len() + 1);
        if let (Some(column), Some(window)) = (&self.window_column, window) {
            filters.push(window.to_filter(column.clone()));
        }
        filters.extend(self.filters.iter().cloned());

        let mut request =
            ReportRequest::new(self.report.clone(), self.columns.iter().cloned()).filters(filters);
        for sort in &self.sort_by {
            request = request.sort(sort.clone());
        }
        request
    }

    /// Every column the target table needs.
    pub fn table_columns(&self) -> Vec<String> {
        let mut columns = self.columns.clone();
        let extra = self
            .uom
            .as_ref()
            .map(|uom| uom.target_column.clone())
            .into_iter()
            .chain(self.stamp_column.clone());
        for column in extra {
            if !columns.contains(&column) {
                columns.push(column);
            }
        }
        columns
    }

    /// Whether a run needs the conversion table.
    pub fn needs_uom(&self) -> bool {
        self.uom.is_some()
    }
}

// =============================================================================
// Row Transformation
// =============================================================================

/// Adds the base-unit quantity to `record`.
pub fn apply_uom(
    table: &ItemConversionTable,
    uom: &UomColumns,
    record: &mut Record,
    row: usize,
) -> Result<(), JobError> {
    let cell = |column: &str| {
        record.text(column).ok_or_else(|| JobError::MissingCell {
            row,
            column: column.to_string(),
        })
    };
    let item = cell(&uom.item_column)?;
    let unit = cell(&uom.unit_column)?;
    let quantity = cell(&uom.quantity_column)?;

    let converted = table
        .convert_to_base_units(item, unit, quantity)
        .map_err(|source| JobError::Conversion { row, source })?;

    record.push(uom.target_column.clone(), converted);
    Ok(())
}

/// Rows ready to write, plus how many were dropped.
#[derive(Debug, Default)]
pub struct PreparedRows {
    pub records: Vec<Record>,
    /// Rows whose conversion failed under `skip_row`.
    pub skipped: usize,
    /// Rows outside the key scope.
    pub out_of_scope: usize,
}

/// Turns raw report rows into records for `job`.
pub fn prepare_rows<I>(
    job: &TableJob,
    rows: I,
    uom_table: Option<&ItemConversionTable>,
    scope: Option<&KeyScope>,
    stamp: &str,
) -> Result<PreparedRows, JobError>
where
    I: IntoIterator<Item = wms_report::ReportResult<Vec<String>>>,
{
    let mut prepared = PreparedRows::default();

    for (index, row) in rows.into_iter().enumerate() {
        let row_number = index + 1;
        let mut record = Record::from_row(&job.columns, row?);

        if scope.is_some_and(|scope| !scope.admits(&record)) {
            prepared.out_of_scope += 1;
            continue;
        }

        if let (Some(uom), Some(table)) = (&job.uom, uom_table) {
            if let Err(err) = apply_uom(table, uom, &mut record, row_number) {
                match uom.on_error {
                    OnConversionError::Abort => return Err(err),
                    OnConversionError::SkipRow => {
                        warn!(job = %job.name, error = %err, "Skipping row");
                        prepared.skipped += 1;
                        continue;
                    }
                }
            }
        }

        if let Some(column) = &job.stamp_column {
            record.push(column.clone(), stamp);
        }
        prepared.records.push(record);
    }

    Ok(prepared)
}

// =============================================================================
// Job Runner
// =============================================================================

/// Summary of one successful table job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobOutcome {
    pub job: String,
    pub fetched: usize,
    pub skipped: usize,
    pub out_of_scope: usize,
    pub written: u64,
}

impl JobOutcome {
    fn empty(job: &TableJob) -> Self {
        JobOutcome {
            job: job.name.clone(),
            fetched: 0,
            skipped: 0,
            out_of_scope: 0,
            written: 0,
        }
    }
}

/// Shared handles for a run of jobs.
pub struct JobContext<'a, S: ?Sized, Tz: TimeZone> {
    pub source: &'a S,
    pub db: &'a Database,
    pub uom: &'a UomCache,
    pub now: DateTime<Tz>,
}

/// Runs one table job without touching the ledger.
pub async fn run_table_job<S, Tz>(
    job: &TableJob,
    ctx: &JobContext<'_, S, Tz>,
) -> Result<JobOutcome, JobError>
where
    S: ReportSource + ?Sized,
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let uom_table = if job.needs_uom() {
        Some(ctx.uom.get_or_load(ctx.source).await?)
    } else {
        None
    };

    let scope = match &job.key_source {
        Some(source) => match KeyScope::load(source, ctx.source).await? {
            Some(scope) => Some(scope),
            None => {
                info!(job = %job.name, report = %source.report, "Key report is empty, nothing to do");
                return Ok(JobOutcome::empty(job));
            }
        },
        None => None,
    };

    let window = match &scope {
        Some(scope) => Some(scope.window.clone()),
        None => job.window(&ctx.now),
    };
    let request = job.request(window.as_ref());
    let rows = ctx.source.fetch(&request, HeaderMode::Labels).await?;

    let stamp = ctx.now.format(WINDOW_FORMAT).to_string();
    let prepared = prepare_rows(job, rows, uom_table.as_deref(), scope.as_ref(), &stamp)?;
    let fetched = prepared.records.len() + prepared.skipped + prepared.out_of_scope;

    let facts = ctx.db.facts();
    facts.ensure_table(&job.table, &job.table_columns()).await?;

    let written = match &job.write {
        WriteMode::Upsert { keys } => {
            let summary = facts.upsert_many(&job.table, keys, &prepared.records).await?;
            info!(job = %job.name, updated = summary.updated, "Upserted rows");
            summary.total()
        }
        WriteMode::ReplaceWindow { column } => {
            let window = window.ok_or_else(|| JobError::MissingWindow(job.name.clone()))?;
            let (deleted, inserted) = facts
                .replace_between(&job.table, column, &window.from, &window.to, &prepared.records)
                .await?;
            info!(job = %job.name, deleted, "Replaced window rows");
            inserted
        }
        WriteMode::Snapshot => {
            let (deleted, inserted) = facts.replace_all(&job.table, &prepared.records).await?;
            info!(job = %job.name, deleted, "Replaced snapshot");
            inserted
        }
    };

    Ok(JobOutcome {
        job: job.name.clone(),
        fetched,
        skipped: prepared.skipped,
        out_of_scope: prepared.out_of_scope,
        written,
    })
}

/// Runs one table job and records it in the job run ledger.
pub async fn run_recorded<S, Tz>(
    job: &TableJob,
    ctx: &JobContext<'_, S, Tz>,
) -> Result<JobOutcome, JobError>
where
    S: ReportSource + ?Sized,
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let runs = ctx.db.job_runs();
    let run = runs.start(&job.name).await?;
    info!(job = %job.name, report = %job.report, "Job started");

    match run_table_job(job, ctx).await {
        Ok(outcome) => {
            runs.finish(&run.id, outcome.written).await?;
            info!(
                job = %job.name,
                fetched = outcome.fetched,
                skipped = outcome.skipped,
                out_of_scope = outcome.out_of_scope,
                rows = outcome.written,
                "Job finished"
            );
            Ok(outcome)
        }
        Err(err) => {
            error!(job = %job.name, error = %err, "Job failed");
            runs.fail(&run.id, &err.to_string()).await?;
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::US::Eastern;
    use wms_core::{PartialBuildPolicy, UnitAliases, UomTableBuilder};
    use wms_db::{DbConfig, JobStatus};

    use crate::testing::FakeSource;

    fn shipments_job(write: WriteMode) -> TableJob {
        TableJob {
            name: "shipments".into(),
            report: "shipments".into(),
            columns: vec![
                "shipment_id".into(),
                "item_code".into(),
                "unit".into(),
                "quantity".into(),
                "completed_at".into(),
            ],
            window_column: Some("completed_at".into()),
            window_days: 7,
            window_alignment: WindowAlignment::WholeDays,
            filters: vec![ReportFilter::equals("status", "shipped")],
            sort_by: vec![SortBy::asc("completed_at")],
            table: "shipments".into(),
            write,
            stamp_column: Some("loaded_at".into()),
            uom: Some(UomColumns {
                item_column: "item_code".into(),
                unit_column: "unit".into(),
                quantity_column: "quantity".into(),
                target_column: "base_quantity".into(),
                on_error: OnConversionError::Abort,
            }),
            key_source: None,
        }
    }

    const SHIPMENTS: &str = "\
Shipment,Item,Unit,Qty,Completed
S1,WIDGET1,cs,3,2024-03-07 10:00
S2,WIDGET1,eaches,5,2024-03-08 09:00
";

    fn uom_table() -> ItemConversionTable {
        let mut builder = UomTableBuilder::new();
        builder.add_ratio("WIDGET1", "cases", "24", "eaches").unwrap();
        builder.add_base_unit("WIDGET1", "eaches");
        builder.build()
    }

    #[test]
    fn test_request_includes_window_first() {
        let job = shipments_job(WriteMode::Snapshot);
        let now = Eastern.with_ymd_and_hms(2024, 3, 8, 6, 0, 0).unwrap();
        let window = job.window(&now).unwrap();
        assert_eq!(window.from, "2024-03-01 00:00");
        assert_eq!(window.to, "2024-03-08 23:59");

        let request = job.request(Some(&window));
        assert_eq!(request.filters.len(), 2);
        assert_eq!(request.filters[0].column, "completed_at");
        assert_eq!(request.filters[1].column, "status");
        assert_eq!(request.sort_by.len(), 1);
    }

    #[test]
    fn test_table_columns_append_extras_once() {
        let mut job = shipments_job(WriteMode::Snapshot);
        let columns = job.table_columns();
        assert_eq!(columns.len(), 7);
        assert_eq!(columns[5], "base_quantity");
        assert_eq!(columns[6], "loaded_at");

        job.stamp_column = Some("completed_at".into());
        assert_eq!(job.table_columns().len(), 6);
    }

    #[test]
    fn test_prepare_rows_converts_and_stamps() {
        let job = shipments_job(WriteMode::Snapshot);
        let rows = vec![
            Ok(vec!["S1".into(), "WIDGET1".into(), "cs".into(), "3".into(), "x".into()]),
            Ok(vec!["S2".into(), "WIDGET1".into(), "eaches".into(), "5".into(), "y".into()]),
        ];
        let table = uom_table();
        let prepared = prepare_rows(&job, rows, Some(&table), None, "2024-03-08 06:00").unwrap();

        assert_eq!(prepared.records.len(), 2);
        assert_eq!(
            prepared.records[0].get("base_quantity"),
            Some(&wms_core::FieldValue::Real(72.0))
        );
        assert_eq!(prepared.records[1].text("loaded_at"), Some("2024-03-08 06:00"));
    }

    #[test]
    fn test_conversion_failure_policies() {
        let mut job = shipments_job(WriteMode::Snapshot);
        let rows = || {
            vec![
                Ok(vec!["S1".into(), "GADGET".into(), "cs".into(), "3".into(), "x".into()]),
                Ok(vec!["S2".into(), "WIDGET1".into(), "cs".into(), "1".into(), "y".into()]),
            ]
        };
        let table = uom_table();

        let err = prepare_rows(&job, rows(), Some(&table), None, "now").unwrap_err();
        assert!(matches!(err, JobError::Conversion { row: 1, .. }));

        if let Some(uom) = job.uom.as_mut() {
            uom.on_error = OnConversionError::SkipRow;
        }
        let prepared = prepare_rows(&job, rows(), Some(&table), None, "now").unwrap();
        assert_eq!(prepared.skipped, 1);
        assert_eq!(prepared.records.len(), 1);
        assert_eq!(prepared.records[0].text("shipment_id"), Some("S2"));
    }

    #[test]
    fn test_blank_quantity_is_missing_cell() {
        let job = shipments_job(WriteMode::Snapshot);
        let rows = vec![Ok(vec![
            "S1".into(),
            "WIDGET1".into(),
            "cs".into(),
            " ".into(),
            "x".into(),
        ])];
        let err = prepare_rows(&job, rows, Some(&uom_table()), None, "now").unwrap_err();
        assert!(matches!(err, JobError::MissingCell { row: 1, ref column } if column == "quantity"));
    }

    #[test]
    fn test_write_mode_from_toml() {
        #[derive(Deserialize)]
        struct Wrapper {
            write: WriteMode,
        }
        let parsed: Wrapper =
            toml::from_str(r#"write = { mode = "upsert", keys = ["id", "line"] }"#).unwrap();
        assert_eq!(
            parsed.write,
            WriteMode::Upsert {
                keys: vec!["id".into(), "line".into()]
            }
        );
        let parsed: Wrapper = toml::from_str(r#"write = { mode = "snapshot" }"#).unwrap();
        assert_eq!(parsed.write, WriteMode::Snapshot);
    }

    #[tokio::test]
    async fn test_upsert_job_end_to_end() {
        let source = FakeSource::with_uom().report("shipments", SHIPMENTS);
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let cache = UomCache::new(PartialBuildPolicy::Reject, UnitAliases::default());
        let ctx = JobContext {
            source: &source,
            db: &db,
            uom: &cache,
            now: Eastern.with_ymd_and_hms(2024, 3, 8, 6, 0, 0).unwrap(),
        };
        let job = shipments_job(WriteMode::Upsert {
            keys: vec!["shipment_id".into()],
        });

        let outcome = run_recorded(&job, &ctx).await.unwrap();
        assert_eq!(outcome.written, 2);
        // Second run updates instead of duplicating.
        run_recorded(&job, &ctx).await.unwrap();
        assert_eq!(db.facts().count("shipments").await.unwrap(), 2);

        let runs = db.job_runs().recent(5).await.unwrap();
        assert_eq!(runs.len(), 2);
        assert!(runs.iter().all(|r| r.status == JobStatus::Succeeded));

        let sent = source.requests();
        let shipment_request = sent.iter().find(|r| r.report == "shipments").unwrap();
        assert_eq!(
            shipment_request.filters[0].from_threshold.as_deref(),
            Some("2024-03-01 00:00")
        );
    }

    #[tokio::test]
    async fn test_failed_job_is_recorded() {
        let source = FakeSource::with_uom();
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let cache = UomCache::new(PartialBuildPolicy::Reject, UnitAliases::default());
        let ctx = JobContext {
            source: &source,
            db: &db,
            uom: &cache,
            now: Eastern.with_ymd_and_hms(2024, 3, 8, 6, 0, 0).unwrap(),
        };

        let job = shipments_job(WriteMode::Snapshot);
        assert!(run_recorded(&job, &ctx).await.is_err());

        let runs = db.job_runs().recent(1).await.unwrap();
        assert_eq!(runs[0].status, JobStatus::Failed);
        assert!(runs[0].error.is_some());
    }

    #[tokio::test]
    async fn test_replace_window_job() {
        let source = FakeSource::with_uom().report("shipments", SHIPMENTS);
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let cache = UomCache::new(PartialBuildPolicy::Reject, UnitAliases::default());
        let ctx = JobContext {
            source: &source,
            db: &db,
            uom: &cache,
            now: Eastern.with_ymd_and_hms(2024, 3, 8, 6, 0, 0).unwrap(),
        };
        let job = shipments_job(WriteMode::ReplaceWindow {
            column: "completed_at".into(),
        });

        run_table_job(&job, &ctx).await.unwrap();
        let outcome = run_table_job(&job, &ctx).await.unwrap();
        assert_eq!(outcome.written, 2);
        assert_eq!(db.facts().count("shipments").await.unwrap(), 2);
    }

    const NOT_INVOICED: &str = "\
Job,Actual Start
J1,2024-Mar-04 07:15 AM
J2,
J3,2024-Mar-06 02:30 PM
";

    const PRODUCTIVITY: &str = "\
Job,Line,Start,Produced
J1,Line 1,2024-Mar-04 07:15 AM,500
J2,Line 2,2024-Mar-05 08:00 AM,120
J3,Line 1,2024-Mar-06 02:30 PM,80
J4,Line 3,2024-Mar-06 03:00 PM,10
";

    fn not_invoiced_source() -> KeySource {
        KeySource {
            report: "job_profitability".into(),
            key_column: "job_id".into(),
            date_column: "actual_job_start_at".into(),
            date_format: "%Y-%b-%d %I:%M %p".into(),
            filters: vec![ReportFilter::equals("invoiced", "false")],
            match_column: "job_id".into(),
        }
    }

    fn production_records_job() -> TableJob {
        TableJob {
            name: "production_records".into(),
            report: "job_productivity".into(),
            columns: vec![
                "job_id".into(),
                "line_name".into(),
                "actual_job_start_at".into(),
                "units_produced".into(),
            ],
            window_column: Some("actual_job_start_at".into()),
            window_days: 1,
            window_alignment: WindowAlignment::Exact,
            filters: Vec::new(),
            sort_by: vec![SortBy::asc("line_name")],
            table: "production_records".into(),
            write: WriteMode::Upsert {
                keys: vec!["job_id".into()],
            },
            stamp_column: None,
            uom: None,
            key_source: Some(not_invoiced_source()),
        }
    }

    #[test]
    fn test_key_scope_from_rows() {
        let source = not_invoiced_source();
        let rows = vec![
            Ok(vec!["J1".into(), "2024-Mar-04 07:15 AM".into()]),
            Ok(vec!["J2".into(), "".into()]),
            Ok(vec!["J3".into(), "2024-Mar-06 02:30 PM".into()]),
        ];
        let scope = KeyScope::from_rows(&source, rows).unwrap().unwrap();
        assert_eq!(scope.keys.len(), 2);
        assert!(scope.keys.contains("J1") && scope.keys.contains("J3"));
        assert_eq!(scope.window.from, "2024-03-04 00:00");
        assert_eq!(scope.window.to, "2024-03-06 23:59");

        let bad = vec![Ok(vec!["J1".into(), "yesterday".into()])];
        let err = KeyScope::from_rows(&source, bad).unwrap_err();
        assert!(matches!(err, JobError::InvalidCell { row: 1, ref value, .. } if value == "yesterday"));

        let undated = vec![Ok(vec!["J2".into(), " ".into()])];
        assert!(KeyScope::from_rows(&source, undated).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_key_scoped_job() {
        let source = FakeSource::default()
            .report("job_profitability", NOT_INVOICED)
            .report("job_productivity", PRODUCTIVITY);
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let cache = UomCache::new(PartialBuildPolicy::Reject, UnitAliases::default());
        let ctx = JobContext {
            source: &source,
            db: &db,
            uom: &cache,
            now: Eastern.with_ymd_and_hms(2024, 3, 8, 6, 0, 0).unwrap(),
        };

        let outcome = run_recorded(&production_records_job(), &ctx).await.unwrap();
        assert_eq!(outcome.fetched, 4);
        assert_eq!(outcome.out_of_scope, 2);
        assert_eq!(outcome.written, 2);
        assert_eq!(db.facts().count("production_records").await.unwrap(), 2);

        let sent = source.requests();
        assert_eq!(sent[0].report, "job_profitability");
        assert_eq!(sent[0].filters[0].column, "invoiced");

        let window = &sent[1].filters[0];
        assert_eq!(window.column, "actual_job_start_at");
        assert_eq!(window.from_threshold.as_deref(), Some("2024-03-04 00:00"));
        assert_eq!(window.to_threshold.as_deref(), Some("2024-03-06 23:59"));
    }

    #[tokio::test]
    async fn test_empty_key_report_writes_nothing() {
        let source = FakeSource::default().report("job_profitability", "Job,Actual Start\n");
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let cache = UomCache::new(PartialBuildPolicy::Reject, UnitAliases::default());
        let ctx = JobContext {
            source: &source,
            db: &db,
            uom: &cache,
            now: Eastern.with_ymd_and_hms(2024, 3, 8, 6, 0, 0).unwrap(),
        };

        let outcome = run_table_job(&production_records_job(), &ctx).await.unwrap();
        assert_eq!(outcome.written, 0);
        // The productivity report is never requested.
        assert_eq!(source.requests().len(), 1);
    }
}
