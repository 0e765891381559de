//! Push client for dashboard datasets.
//!
//! Dashboards accept a JSON array of flat objects at a per-dataset push URL.
//! No auth header is sent; the URL itself carries the dataset key.

use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{ReportError, ReportResult, Stage};

/// Posts row batches to dashboard push URLs.
#[derive(Debug, Clone)]
pub struct DashboardClient {
    http: reqwest::Client,
}

impl DashboardClient {
    pub fn new(timeout: Duration) -> ReportResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ReportError::InvalidConfig(e.to_string()))?;
        Ok(DashboardClient { http })
    }

    /// Posts `rows` to `url`. Returns the number of rows sent.
    ///
    /// An empty batch is not sent.
    pub async fn push_rows(&self, url: &str, rows: &[Value]) -> ReportResult<usize> {
        if rows.is_empty() {
            debug!(url, "No dashboard rows to push");
            return Ok(0);
        }

        let url = url::Url::parse(url)?;
        let body = serde_json::to_vec(rows).map_err(|e| ReportError::InvalidResponse {
            stage: Stage::Dashboard,
            message: e.to_string(),
        })?;

        let response = self
            .http
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| ReportError::http(Stage::Dashboard, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ReportError::UnexpectedStatus {
                stage: Stage::Dashboard,
                status: status.as_u16(),
                body,
            });
        }

        info!(rows = rows.len(), "Dashboard rows pushed");
        Ok(rows.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_batch_is_not_sent() {
        let client = DashboardClient::new(Duration::from_secs(5)).unwrap();
        // Unroutable URL: would fail if a request were attempted.
        let sent = client.push_rows("http://127.0.0.1:9/push", &[]).await.unwrap();
        assert_eq!(sent, 0);
    }

    #[tokio::test]
    async fn test_invalid_url() {
        let client = DashboardClient::new(Duration::from_secs(5)).unwrap();
        let rows = vec![serde_json::json!({"a": 1})];
        let err = client.push_rows("not a url", &rows).await.unwrap_err();
        assert!(err.is_config_error());
    }
}
