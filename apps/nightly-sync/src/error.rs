//! Error types for the nightly sync jobs.

use wms_core::CoreError;
use wms_db::DbError;
use wms_report::ReportError;

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Invalid URL for {field}: {url}")]
    InvalidUrl { field: String, url: String },

    #[error("Unknown time zone: {0}")]
    UnknownTimezone(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Invalid job {job}: {message}")]
    InvalidJob { job: String, message: String },
}

impl ConfigError {
    pub(crate) fn job(job: &str, message: impl Into<String>) -> Self {
        ConfigError::InvalidJob {
            job: job.to_string(),
            message: message.into(),
        }
    }
}

/// Errors that fail a single job.
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error(transparent)]
    Report(#[from] ReportError),

    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Row {row}: {source}")]
    Conversion {
        row: usize,
        #[source]
        source: CoreError,
    },

    #[error("Row {row}: column {column} is empty")]
    MissingCell { row: usize, column: String },

    #[error("Row {row}: column {column} has non-numeric value '{value}'")]
    InvalidCell {
        row: usize,
        column: String,
        value: String,
    },

    #[error("Job {0} needs a report window but none is configured")]
    MissingWindow(String),
}
