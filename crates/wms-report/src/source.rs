//! Seam between report consumers and the reporting API.

use async_trait::async_trait;
use wms_core::{HeaderMode, ReportRequest};

use crate::error::ReportResult;
use crate::rows::ReportRows;

/// Anything that can run a report and hand back its rows.
///
/// [`ReportClient`](crate::ReportClient) talks to the live API; tests use
/// in-memory sources serving fixed CSV text.
#[async_trait]
pub trait ReportSource: Send + Sync {
    /// Runs `request` to completion and returns its rows.
    async fn fetch(&self, request: &ReportRequest, mode: HeaderMode) -> ReportResult<ReportRows>;
}
