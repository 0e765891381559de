//! # Report Rows
//!
//! Lazy iterator over a downloaded CSV report.
//!
//! ## Header Handling
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Downloaded body                  HeaderMode::Labels   HeaderMode::Raw  │
//! │  ───────────────                  ──────────────────   ───────────────  │
//! │  Item code,Base unit       ──►    headers()            row 1            │
//! │  WIDGET1,eaches            ──►    row 1                row 2            │
//! │  (blank line)              ──►    dropped              dropped          │
//! │  TAPE,rolls                ──►    row 2                row 3            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Records are parsed one at a time as the iterator is advanced, so a CSV
//! error surfaces at the row where it occurs and every earlier row has
//! already been handed out.

use std::io::Cursor;

use wms_core::{HeaderMode, Record};

use crate::error::{ReportError, ReportResult};

type RecordIter = csv::StringRecordsIntoIter<Cursor<Vec<u8>>>;

/// Rows of one report run.
pub struct ReportRows {
    report: String,
    headers: Option<Vec<String>>,
    records: RecordIter,
}

impl std::fmt::Debug for ReportRows {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportRows")
            .field("report", &self.report)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

impl ReportRows {
    /// Wraps a downloaded body.
    pub fn from_bytes(
        report: impl Into<String>,
        body: Vec<u8>,
        mode: HeaderMode,
    ) -> ReportResult<Self> {
        let reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(b',')
            .quote(b'"')
            .from_reader(Cursor::new(body));

        let mut rows = ReportRows {
            report: report.into(),
            headers: None,
            records: reader.into_records(),
        };

        if mode == HeaderMode::Labels {
            let labels = match rows.next_record() {
                Some(result) => result?,
                None => Vec::new(),
            };
            rows.headers = Some(labels);
        }

        Ok(rows)
    }

    /// Convenience for CSV text already in memory.
    pub fn from_csv(
        report: impl Into<String>,
        text: impl Into<String>,
        mode: HeaderMode,
    ) -> ReportResult<Self> {
        Self::from_bytes(report, text.into().into_bytes(), mode)
    }

    /// Report code the rows came from.
    pub fn report(&self) -> &str {
        &self.report
    }

    /// Column labels, when read with [`HeaderMode::Labels`].
    pub fn headers(&self) -> Option<&[String]> {
        self.headers.as_deref()
    }

    /// Pairs each remaining row with the header labels.
    ///
    /// Rows read in [`HeaderMode::Raw`] have no labels and produce empty
    /// records.
    pub fn into_records(self) -> impl Iterator<Item = ReportResult<Record>> {
        let labels = self.headers.clone().unwrap_or_default();
        self.map(move |row| row.map(|cells| Record::from_row(&labels, cells)))
    }

    fn next_record(&mut self) -> Option<ReportResult<Vec<String>>> {
        for result in self.records.by_ref() {
            match result {
                Ok(record) => {
                    if record.len() == 1 && record[0].is_empty() {
                        continue;
                    }
                    return Some(Ok(record.iter().map(str::to_string).collect()));
                }
                Err(err) => return Some(Err(ReportError::from(err))),
            }
        }
        None
    }
}

impl Iterator for ReportRows {
    type Item = ReportResult<Vec<String>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record()
    }
}
