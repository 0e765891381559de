//! # Report Client
//!
//! Asynchronous report runs against the warehouse reporting API.
//!
//! ## Report Run Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Report Run States                               │
//! │                                                                         │
//! │  ┌────────────┐  POST report_runs  ┌────────────┐                      │
//! │  │  Request   │ ─────────────────► │ Submitted  │                      │
//! │  └────────────┘                    └─────┬──────┘                      │
//! │        ▲                                 │                              │
//! │        │ non-201 / transport error       │ 201 + status_url             │
//! │        │                                 ▼                              │
//! │  ┌────────────┐                    ┌────────────┐  other status        │
//! │  │  Backoff   │                    │  Polling   │ ◄──────────┐         │
//! │  └────────────┘                    └─────┬──────┘ ───────────┘         │
//! │                                          │                              │
//! │                          COMPLETED       │       FAILED                 │
//! │                         ┌────────────────┴──────────────┐              │
//! │                         ▼                               ▼              │
//! │                   ┌────────────┐                  ┌────────────┐       │
//! │                   │ Download   │                  │  Error     │       │
//! │                   │ CSV (200)  │                  │            │       │
//! │                   └────────────┘                  └────────────┘       │
//! │                                                                         │
//! │  SUBMIT BACKOFF (Exponential with Jitter)                              │
//! │  ─────────────────────────────────────────                             │
//! │  Attempt 1: ~60s                                                        │
//! │  Attempt 2+: ~120s (capped)                                             │
//! │  Gives up after max_submit_attempts                                     │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::time::Duration;

use async_trait::async_trait;
use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, info, warn};
use url::Url;
use wms_core::{HeaderMode, ReportRequest};

use crate::error::{ReportError, ReportResult, Stage};
use crate::rows::ReportRows;
use crate::source::ReportSource;

/// Path of the report-run endpoint, relative to the API base URL.
const REPORT_RUNS_PATH: &str = "api/reports/report_runs";

// =============================================================================
// Client Configuration
// =============================================================================

/// Configuration for the report client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API base URL, e.g. `https://wms.example.com`.
    pub base_url: String,

    /// Pre-encoded credential sent as `Authorization: Basic <secret>`.
    pub secret_key: String,

    /// Wait between submission and the first poll.
    pub initial_poll_delay: Duration,

    /// Wait between polls.
    pub poll_interval: Duration,

    /// Maximum polls per run (0 = unlimited).
    pub max_polls: u32,

    /// First submit retry delay.
    pub initial_backoff: Duration,

    /// Cap on the submit retry delay.
    pub max_backoff: Duration,

    /// Total submit attempts before giving up.
    pub max_submit_attempts: u32,

    /// Per-request timeout.
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            base_url: String::new(),
            secret_key: String::new(),
            initial_poll_delay: Duration::from_secs(15),
            poll_interval: Duration::from_secs(10),
            max_polls: 0, // Unlimited
            initial_backoff: Duration::from_secs(60),
            max_backoff: Duration::from_secs(120),
            max_submit_attempts: 5,
            request_timeout: Duration::from_secs(60),
        }
    }
}

impl ClientConfig {
    /// Full URL of the report-run endpoint.
    pub fn report_runs_url(&self) -> ReportResult<Url> {
        let mut base = Url::parse(self.base_url.trim())?;
        if base.scheme() != "http" && base.scheme() != "https" {
            return Err(ReportError::InvalidUrl(format!(
                "{} (expected http or https)",
                self.base_url
            )));
        }
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(base.join(REPORT_RUNS_PATH)?)
    }

    fn create_backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            current_interval: self.initial_backoff,
            initial_interval: self.initial_backoff,
            max_interval: self.max_backoff,
            max_elapsed_time: None,
            ..ExponentialBackoff::default()
        }
    }
}

// =============================================================================
// Run Handles
// =============================================================================

/// A submitted report run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportHandle {
    pub report: String,
    pub status_url: String,
}

/// Result of one status poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollStatus {
    /// Still running; carries the server's status string.
    Pending(String),
    /// Finished; carries the download URL.
    Ready(String),
    /// The server gave up on the run.
    Failed,
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    status_url: String,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    #[serde(default)]
    status: String,
    #[serde(default)]
    url: Option<String>,
}

impl PollStatus {
    fn from_response(response: StatusResponse) -> ReportResult<Self> {
        match response.status.as_str() {
            "COMPLETED" => match response.url {
                Some(url) if !url.is_empty() => Ok(PollStatus::Ready(url)),
                _ => Err(ReportError::InvalidResponse {
                    stage: Stage::Poll,
                    message: "COMPLETED status without a download url".into(),
                }),
            },
            "FAILED" => Ok(PollStatus::Failed),
            other => Ok(PollStatus::Pending(other.to_string())),
        }
    }
}

// =============================================================================
// Report Client
// =============================================================================

/// HTTP client for report runs.
#[derive(Debug, Clone)]
pub struct ReportClient {
    config: ClientConfig,
    http: reqwest::Client,
    submit_url: Url,
}

impl ReportClient {
    /// Validates the configuration and builds the HTTP client.
    pub fn new(config: ClientConfig) -> ReportResult<Self> {
        if config.secret_key.trim().is_empty() {
            return Err(ReportError::MissingSecret);
        }
        if config.max_submit_attempts == 0 {
            return Err(ReportError::InvalidConfig(
                "max_submit_attempts must be at least 1".into(),
            ));
        }
        let submit_url = config.report_runs_url()?;

        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&format!("Basic {}", config.secret_key.trim()))
            .map_err(|e| ReportError::InvalidConfig(format!("secret key: {e}")))?;
        headers.insert(AUTHORIZATION, auth);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ReportError::InvalidConfig(e.to_string()))?;

        Ok(ReportClient {
            config,
            http,
            submit_url,
        })
    }

    /// Returns the client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Submits a report run, retrying with backoff until it is accepted.
    pub async fn submit(&self, request: &ReportRequest) -> ReportResult<ReportHandle> {
        let mut backoff = self.config.create_backoff();
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            let err = match self.submit_once(request).await {
                Ok(handle) => {
                    info!(report = %request.report, attempt, "Report submitted");
                    return Ok(handle);
                }
                Err(err) if err.is_config_error() => return Err(err),
                Err(err) => err,
            };

            if attempt >= self.config.max_submit_attempts {
                return Err(ReportError::SubmitAttemptsExhausted {
                    report: request.report.clone(),
                    attempts: attempt,
                    last_error: err.to_string(),
                });
            }

            let delay = backoff.next_backoff().unwrap_or(self.config.max_backoff);
            warn!(
                report = %request.report,
                attempt,
                ?delay,
                error = %err,
                "Report submission failed, retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }

    async fn submit_once(&self, request: &ReportRequest) -> ReportResult<ReportHandle> {
        let body = serde_json::to_vec(request).map_err(|e| ReportError::InvalidResponse {
            stage: Stage::Submit,
            message: e.to_string(),
        })?;

        let response = self
            .http
            .post(self.submit_url.clone())
            .header(CONTENT_TYPE, "application/json; charset=utf-8")
            .body(body)
            .send()
            .await
            .map_err(|e| ReportError::http(Stage::Submit, e))?;

        if response.status() != StatusCode::CREATED {
            return Err(unexpected_status(Stage::Submit, response).await);
        }

        let parsed: SubmitResponse = response.json().await.map_err(|e| ReportError::InvalidResponse {
            stage: Stage::Submit,
            message: e.to_string(),
        })?;

        Ok(ReportHandle {
            report: request.report.clone(),
            status_url: parsed.status_url,
        })
    }

    /// Checks the status of a submitted run once.
    pub async fn poll(&self, handle: &ReportHandle) -> ReportResult<PollStatus> {
        let response = self
            .http
            .get(&handle.status_url)
            .send()
            .await
            .map_err(|e| ReportError::http(Stage::Poll, e))?;

        if response.status() != StatusCode::OK {
            return Err(unexpected_status(Stage::Poll, response).await);
        }

        let parsed: StatusResponse = response.json().await.map_err(|e| ReportError::InvalidResponse {
            stage: Stage::Poll,
            message: e.to_string(),
        })?;

        PollStatus::from_response(parsed)
    }

    /// Polls until the run completes and returns the download URL.
    pub async fn wait_until_ready(&self, handle: &ReportHandle) -> ReportResult<String> {
        tokio::time::sleep(self.config.initial_poll_delay).await;

        let mut polls = 0u32;
        loop {
            polls += 1;
            match self.poll(handle).await? {
                PollStatus::Ready(url) => {
                    debug!(report = %handle.report, polls, "Report ready");
                    return Ok(url);
                }
                PollStatus::Failed => {
                    return Err(ReportError::ReportFailed {
                        report: handle.report.clone(),
                    })
                }
                PollStatus::Pending(status) => {
                    debug!(report = %handle.report, %status, polls, "Report pending");
                    if self.config.max_polls > 0 && polls >= self.config.max_polls {
                        return Err(ReportError::PollLimitExceeded {
                            report: handle.report.clone(),
                            status,
                            polls,
                        });
                    }
                }
            }
            tokio::time::sleep(self.config.poll_interval).await;
        }
    }

    /// Downloads a finished report body.
    pub async fn download(&self, url: &str) -> ReportResult<Vec<u8>> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| ReportError::http(Stage::Download, e))?;

        if response.status() != StatusCode::OK {
            return Err(unexpected_status(Stage::Download, response).await);
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ReportError::http(Stage::Download, e))?;
        let text = String::from_utf8(bytes.to_vec())?;
        Ok(text.into_bytes())
    }
}

#[async_trait]
impl ReportSource for ReportClient {
    async fn fetch(&self, request: &ReportRequest, mode: HeaderMode) -> ReportResult<ReportRows> {
        let handle = self.submit(request).await?;
        let url = self.wait_until_ready(&handle).await?;
        let body = self.download(&url).await?;
        info!(report = %request.report, bytes = body.len(), "Report downloaded");
        ReportRows::from_bytes(request.report.clone(), body, mode)
    }
}

async fn unexpected_status(stage: Stage, response: reqwest::Response) -> ReportError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    ReportError::UnexpectedStatus {
        stage,
        status,
        body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ClientConfig {
        ClientConfig {
            base_url: "https://wms.example.com".into(),
            secret_key: "c2VjcmV0".into(),
            ..ClientConfig::default()
        }
    }

    #[test]
    fn test_default_timings() {
        let config = ClientConfig::default();
        assert_eq!(config.initial_poll_delay, Duration::from_secs(15));
        assert_eq!(config.poll_interval, Duration::from_secs(10));
        assert_eq!(config.initial_backoff, Duration::from_secs(60));
        assert_eq!(config.max_backoff, Duration::from_secs(120));
        assert_eq!(config.max_submit_attempts, 5);
        assert_eq!(config.max_polls, 0);
    }

    #[test]
    fn test_report_runs_url() {
        let url = config().report_runs_url().unwrap();
        assert_eq!(url.as_str(), "https://wms.example.com/api/reports/report_runs");

        let nested = ClientConfig {
            base_url: "https://example.com/tenant".into(),
            ..config()
        };
        assert_eq!(
            nested.report_runs_url().unwrap().as_str(),
            "https://example.com/tenant/api/reports/report_runs"
        );
    }

    #[test]
    fn test_rejects_bad_config() {
        let ftp = ClientConfig {
            base_url: "ftp://wms.example.com".into(),
            ..config()
        };
        assert!(matches!(ReportClient::new(ftp), Err(ReportError::InvalidUrl(_))));

        let no_secret = ClientConfig {
            secret_key: "  ".into(),
            ..config()
        };
        assert!(matches!(ReportClient::new(no_secret), Err(ReportError::MissingSecret)));

        let no_attempts = ClientConfig {
            max_submit_attempts: 0,
            ..config()
        };
        assert!(matches!(
            ReportClient::new(no_attempts),
            Err(ReportError::InvalidConfig(_))
        ));

        assert!(ReportClient::new(config()).is_ok());
    }

    #[test]
    fn test_poll_status_mapping() {
        let parse = |json: &str| {
            let response: StatusResponse = serde_json::from_str(json).unwrap();
            PollStatus::from_response(response)
        };

        assert_eq!(
            parse(r#"{"status":"COMPLETED","url":"https://dl/1.csv"}"#).unwrap(),
            PollStatus::Ready("https://dl/1.csv".into())
        );
        assert_eq!(parse(r#"{"status":"FAILED"}"#).unwrap(), PollStatus::Failed);
        assert_eq!(
            parse(r#"{"status":"RUNNING"}"#).unwrap(),
            PollStatus::Pending("RUNNING".into())
        );
        assert!(matches!(
            parse(r#"{"status":"COMPLETED"}"#),
            Err(ReportError::InvalidResponse { stage: Stage::Poll, .. })
        ));
    }

    #[test]
    fn test_backoff_starts_at_initial_interval() {
        let config = ClientConfig {
            initial_backoff: Duration::from_secs(60),
            max_backoff: Duration::from_secs(120),
            ..config()
        };
        let mut backoff = config.create_backoff();
        for _ in 0..5 {
            let delay = backoff.next_backoff().unwrap();
            // Randomization factor of 0.5 on a capped interval.
            assert!(delay <= Duration::from_secs(180));
            assert!(delay >= Duration::from_secs(30));
        }
    }
}
