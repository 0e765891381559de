//! # Report Error Types
//!
//! Error types for reporting API operations.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Report Error Categories                           │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │   Transport     │  │     Protocol            │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidConfig  │  │  Http           │  │  UnexpectedStatus       │ │
//! │  │  InvalidUrl     │  │  SubmitAttempts │  │  InvalidResponse        │ │
//! │  │  MissingSecret  │  │  PollLimit      │  │  ReportFailed           │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐                              │
//! │  │    Payload      │  │     Core        │                              │
//! │  │                 │  │                 │                              │
//! │  │  Csv            │  │  CoreError      │                              │
//! │  │  Encoding       │  │  (bad factor)   │                              │
//! │  └─────────────────┘  └─────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;
use wms_core::CoreError;

/// Result type alias for report operations.
pub type ReportResult<T> = Result<T, ReportError>;

/// Which request of the report protocol failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Submit,
    Poll,
    Download,
    Dashboard,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Submit => write!(f, "submit"),
            Stage::Poll => write!(f, "poll"),
            Stage::Download => write!(f, "download"),
            Stage::Dashboard => write!(f, "dashboard push"),
        }
    }
}

/// Report error type covering all upstream fetch failures.
#[derive(Debug, Error)]
pub enum ReportError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid client configuration.
    #[error("Invalid report client configuration: {0}")]
    InvalidConfig(String),

    /// Invalid API or download URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// No API secret configured.
    #[error("Reporting API secret key not configured")]
    MissingSecret,

    // =========================================================================
    // Transport Errors
    // =========================================================================
    /// Request could not be sent or the response body could not be read.
    #[error("HTTP error during {stage}: {message}")]
    Http { stage: Stage, message: String },

    /// Submission kept failing.
    #[error("Report {report} could not be submitted after {attempts} attempts: {last_error}")]
    SubmitAttemptsExhausted {
        report: String,
        attempts: u32,
        last_error: String,
    },

    /// The report never completed within the configured number of polls.
    #[error("Report {report} still {status} after {polls} polls")]
    PollLimitExceeded {
        report: String,
        status: String,
        polls: u32,
    },

    // =========================================================================
    // Protocol Errors
    // =========================================================================
    /// Server answered with an unexpected status code.
    #[error("Unexpected HTTP {status} during {stage}: {body}")]
    UnexpectedStatus {
        stage: Stage,
        status: u16,
        body: String,
    },

    /// Response JSON did not have the expected shape.
    #[error("Invalid response during {stage}: {message}")]
    InvalidResponse { stage: Stage, message: String },

    /// The report run ended in FAILED.
    #[error("Report {report} failed on the server")]
    ReportFailed { report: String },

    // =========================================================================
    // Payload Errors
    // =========================================================================
    /// CSV could not be parsed.
    #[error("CSV error: {0}")]
    Csv(String),

    /// Download was not valid UTF-8.
    #[error("Report body is not valid UTF-8: {0}")]
    Encoding(String),

    // =========================================================================
    // Core Errors
    // =========================================================================
    #[error(transparent)]
    Core(#[from] CoreError),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<csv::Error> for ReportError {
    fn from(err: csv::Error) -> Self {
        ReportError::Csv(err.to_string())
    }
}

impl From<url::ParseError> for ReportError {
    fn from(err: url::ParseError) -> Self {
        ReportError::InvalidUrl(err.to_string())
    }
}

impl From<std::string::FromUtf8Error> for ReportError {
    fn from(err: std::string::FromUtf8Error) -> Self {
        ReportError::Encoding(err.to_string())
    }
}

impl ReportError {
    pub(crate) fn http(stage: Stage, err: reqwest::Error) -> Self {
        ReportError::Http {
            stage,
            message: err.to_string(),
        }
    }

    /// Returns true if retrying the same request may succeed.
    ///
    /// ## Retryable Errors
    /// - Transport failures
    /// - 5xx and 429 responses
    ///
    /// ## Non-Retryable Errors
    /// - Configuration errors
    /// - Server-side report failures
    /// - Malformed payloads
    pub fn is_retryable(&self) -> bool {
        match self {
            ReportError::Http { .. } => true,
            ReportError::UnexpectedStatus { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            ReportError::InvalidConfig(_) | ReportError::InvalidUrl(_) | ReportError::MissingSecret
        )
    }
}
