//! In-memory report source for job tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use wms_core::{HeaderMode, ReportRequest};
use wms_report::{ReportError, ReportResult, ReportRows, ReportSource, Stage};

const UOM_RATIOS: &str = "\
Code,Unit of measure,Ratio,Conversion unit of measure
WIDGET1,cases,24,eaches
";

const ITEM_MASTER: &str = "\
Code,Base unit of measure
WIDGET1,eaches
";

/// Serves fixed CSV per report code and records every request.
#[derive(Default)]
pub struct FakeSource {
    bodies: HashMap<String, String>,
    requests: Mutex<Vec<ReportRequest>>,
}

impl FakeSource {
    /// Source that already serves the two conversion reports.
    pub fn with_uom() -> Self {
        FakeSource::default()
            .report("uom_ratios", UOM_RATIOS)
            .report("item_master", ITEM_MASTER)
    }

    pub fn report(mut self, report: &str, csv: &str) -> Self {
        self.bodies.insert(report.to_string(), csv.to_string());
        self
    }

    pub fn requests(&self) -> Vec<ReportRequest> {
        self.requests
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ReportSource for FakeSource {
    async fn fetch(&self, request: &ReportRequest, mode: HeaderMode) -> ReportResult<ReportRows> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        match self.bodies.get(&request.report) {
            Some(body) => ReportRows::from_csv(request.report.clone(), body.clone(), mode),
            None => Err(ReportError::UnexpectedStatus {
                stage: Stage::Submit,
                status: 404,
                body: format!("no report {}", request.report),
            }),
        }
    }
}
