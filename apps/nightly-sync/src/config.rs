//! # Nightly Sync Configuration
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     WMS_API_BASE_URL=https://wms.example.com                           │
//! │     WMS_API_SECRET_KEY=...                                             │
//! │     WMS_DATABASE_PATH=/var/lib/wms/warehouse.db                        │
//! │     WMS_TIMEZONE=US/Eastern                                            │
//! │     WMS_UOM_PARTIAL_POLICY=allow_partial                               │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     --config PATH, or                                                  │
//! │     ~/.config/nightly-sync/nightly-sync.toml (Linux)                   │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! timezone = "US/Eastern"
//!
//! [api]
//! base_url = "https://wms.example.com"
//! secret_key = "dXNlcjpwYXNz"
//! poll_interval_secs = 10
//!
//! [database]
//! path = "/var/lib/wms/warehouse.db"
//!
//! [uom]
//! partial_policy = "reject"
//! aliases = { ctn = "cartons" }
//!
//! [[jobs]]
//! # see jobs.rs
//!
//! [[dashboards]]
//! # see dashboards.rs
//! ```

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};
use wms_core::{PartialBuildPolicy, UnitAliases};
use wms_db::DbConfig;
use wms_report::ClientConfig;

use crate::dashboards::DashboardJob;
use crate::error::ConfigError;
use crate::jobs::{TableJob, WriteMode};

const CONFIG_FILE_NAME: &str = "nightly-sync.toml";
const DATABASE_FILE_NAME: &str = "warehouse.db";

// =============================================================================
// Sections
// =============================================================================

/// Reporting API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSettings {
    #[serde(default)]
    pub base_url: String,

    /// Pre-encoded Basic credential.
    #[serde(default)]
    pub secret_key: String,

    #[serde(default = "default_initial_poll_delay")]
    pub initial_poll_delay_secs: u64,

    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// 0 = poll until the report finishes.
    #[serde(default)]
    pub max_polls: u32,

    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_secs: u64,

    #[serde(default = "default_max_backoff")]
    pub max_backoff_secs: u64,

    #[serde(default = "default_max_submit_attempts")]
    pub max_submit_attempts: u32,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_initial_poll_delay() -> u64 {
    15
}
fn default_poll_interval() -> u64 {
    10
}
fn default_initial_backoff() -> u64 {
    60
}
fn default_max_backoff() -> u64 {
    120
}
fn default_max_submit_attempts() -> u32 {
    5
}
fn default_request_timeout() -> u64 {
    60
}

impl Default for ApiSettings {
    fn default() -> Self {
        ApiSettings {
            base_url: String::new(),
            secret_key: String::new(),
            initial_poll_delay_secs: default_initial_poll_delay(),
            poll_interval_secs: default_poll_interval(),
            max_polls: 0,
            initial_backoff_secs: default_initial_backoff(),
            max_backoff_secs: default_max_backoff(),
            max_submit_attempts: default_max_submit_attempts(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// SQLite settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// Database file. Defaults to the platform data directory.
    #[serde(default)]
    pub path: Option<PathBuf>,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: None,
            max_connections: default_max_connections(),
        }
    }
}

/// Conversion table settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UomSettings {
    #[serde(default)]
    pub partial_policy: PartialBuildPolicy,

    /// Extra or overriding unit aliases.
    #[serde(default)]
    pub aliases: BTreeMap<String, String>,
}

fn default_timezone() -> String {
    "US/Eastern".to_string()
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete nightly sync configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EtlConfig {
    /// IANA zone for report windows and timestamps.
    #[serde(default = "default_timezone")]
    pub timezone: String,

    #[serde(default)]
    pub api: ApiSettings,

    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub uom: UomSettings,

    #[serde(default)]
    pub jobs: Vec<TableJob>,

    #[serde(default)]
    pub dashboards: Vec<DashboardJob>,
}

impl Default for EtlConfig {
    fn default() -> Self {
        EtlConfig {
            timezone: default_timezone(),
            api: ApiSettings::default(),
            database: DatabaseSettings::default(),
            uom: UomSettings::default(),
            jobs: Vec::new(),
            dashboards: Vec::new(),
        }
    }
}

impl EtlConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (nightly-sync.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let explicit = config_path.is_some();
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading config from file");
                config = Self::from_file(&path)?;
            } else if explicit {
                return Err(ConfigError::MissingRequired(format!(
                    "config file {}",
                    path.display()
                )));
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    /// Parses a config file without applying overrides.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Validates everything that does not need the network.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.tz()?;

        if !self.api.base_url.is_empty() {
            check_http_url("api.base_url", &self.api.base_url)?;
        }
        if self.api.max_submit_attempts == 0 {
            return Err(ConfigError::InvalidValue("api.max_submit_attempts".into()));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::InvalidValue("database.max_connections".into()));
        }

        let mut names = HashSet::new();
        for job in &self.jobs {
            if !names.insert(job.name.as_str()) {
                return Err(ConfigError::job(&job.name, "duplicate job name"));
            }
            validate_table_job(job)?;
        }
        for dashboard in &self.dashboards {
            if !names.insert(dashboard.name.as_str()) {
                return Err(ConfigError::job(&dashboard.name, "duplicate job name"));
            }
            check_http_url(&format!("dashboards.{}.url", dashboard.name), &dashboard.url)?;
            if dashboard.fields.len() != dashboard.columns.len() {
                return Err(ConfigError::job(
                    &dashboard.name,
                    "fields must list one entry per column",
                ));
            }
        }

        Ok(())
    }

    /// Jobs named in `names`, in configured order. All jobs when empty.
    pub fn select(
        &self,
        names: &[String],
    ) -> Result<(Vec<&TableJob>, Vec<&DashboardJob>), ConfigError> {
        if let Some(unknown) = names.iter().find(|name| {
            !self.jobs.iter().any(|j| &j.name == *name)
                && !self.dashboards.iter().any(|d| &d.name == *name)
        }) {
            return Err(ConfigError::job(unknown, "no such job"));
        }

        let wanted = |name: &String| names.is_empty() || names.contains(name);
        Ok((
            self.jobs.iter().filter(|j| wanted(&j.name)).collect(),
            self.dashboards.iter().filter(|d| wanted(&d.name)).collect(),
        ))
    }

    /// Checks the settings only network commands need.
    pub fn require_api(&self) -> Result<(), ConfigError> {
        if self.api.base_url.trim().is_empty() {
            return Err(ConfigError::MissingRequired("api.base_url".into()));
        }
        if self.api.secret_key.trim().is_empty() {
            return Err(ConfigError::MissingRequired("api.secret_key".into()));
        }
        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(url) = std::env::var("WMS_API_BASE_URL") {
            debug!(url = %url, "Overriding API base URL from environment");
            self.api.base_url = url;
        }

        if let Ok(secret) = std::env::var("WMS_API_SECRET_KEY") {
            self.api.secret_key = secret;
        }

        if let Ok(path) = std::env::var("WMS_DATABASE_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = Some(PathBuf::from(path));
        }

        if let Ok(zone) = std::env::var("WMS_TIMEZONE") {
            self.timezone = zone;
        }

        if let Ok(policy) = std::env::var("WMS_UOM_PARTIAL_POLICY") {
            match policy.parse() {
                Ok(parsed) => self.uom.partial_policy = parsed,
                Err(_) => {
                    warn!(policy = %policy, "Unknown partial policy in environment");
                    return Err(ConfigError::InvalidValue("WMS_UOM_PARTIAL_POLICY".into()));
                }
            }
        }

        Ok(())
    }

    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "wms", "nightly-sync")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    // =========================================================================
    // Derived Settings
    // =========================================================================

    /// Parsed time zone.
    pub fn tz(&self) -> Result<Tz, ConfigError> {
        self.timezone
            .parse::<Tz>()
            .map_err(|_| ConfigError::UnknownTimezone(self.timezone.clone()))
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.api.base_url.clone(),
            secret_key: self.api.secret_key.clone(),
            initial_poll_delay: Duration::from_secs(self.api.initial_poll_delay_secs),
            poll_interval: Duration::from_secs(self.api.poll_interval_secs),
            max_polls: self.api.max_polls,
            initial_backoff: Duration::from_secs(self.api.initial_backoff_secs),
            max_backoff: Duration::from_secs(self.api.max_backoff_secs),
            max_submit_attempts: self.api.max_submit_attempts,
            request_timeout: Duration::from_secs(self.api.request_timeout_secs),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.api.request_timeout_secs)
    }

    pub fn unit_aliases(&self) -> UnitAliases {
        UnitAliases::with_overrides(
            self.uom
                .aliases
                .iter()
                .map(|(alias, canonical)| (alias.clone(), canonical.clone())),
        )
    }

    /// Database configuration, falling back to the platform data directory.
    pub fn db_config(&self) -> Result<DbConfig, ConfigError> {
        let path = match &self.database.path {
            Some(path) => path.clone(),
            None => directories::ProjectDirs::from("com", "wms", "nightly-sync")
                .map(|dirs| dirs.data_dir().join(DATABASE_FILE_NAME))
                .ok_or_else(|| ConfigError::MissingRequired("database.path".into()))?,
        };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Ok(DbConfig::new(path).max_connections(self.database.max_connections))
    }
}

fn check_http_url(field: &str, value: &str) -> Result<(), ConfigError> {
    let invalid = || ConfigError::InvalidUrl {
        field: field.to_string(),
        url: value.to_string(),
    };
    let parsed = url::Url::parse(value).map_err(|_| invalid())?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(invalid());
    }
    Ok(())
}

fn validate_table_job(job: &TableJob) -> Result<(), ConfigError> {
    if job.columns.is_empty() {
        return Err(ConfigError::job(&job.name, "columns must not be empty"));
    }
    let has_column = |column: &str| job.columns.iter().any(|c| c == column);

    match &job.write {
        WriteMode::Upsert { keys } => {
            if keys.is_empty() {
                return Err(ConfigError::job(&job.name, "upsert needs at least one key"));
            }
            if let Some(key) = keys.iter().find(|k| !has_column(k)) {
                return Err(ConfigError::job(
                    &job.name,
                    format!("upsert key '{key}' is not a report column"),
                ));
            }
        }
        WriteMode::ReplaceWindow { column } => {
            if job.window_column.is_none() {
                return Err(ConfigError::job(
                    &job.name,
                    "replace_window needs window_column",
                ));
            }
            if !has_column(column) {
                return Err(ConfigError::job(
                    &job.name,
                    format!("replace_window column '{column}' is not a report column"),
                ));
            }
        }
        WriteMode::Snapshot => {}
    }

    if let Some(source) = &job.key_source {
        if job.window_column.is_none() {
            return Err(ConfigError::job(&job.name, "key_source needs window_column"));
        }
        if !has_column(&source.match_column) {
            return Err(ConfigError::job(
                &job.name,
                format!("key_source match column '{}' is not a report column", source.match_column),
            ));
        }
    }

    if let Some(uom) = &job.uom {
        for column in [&uom.item_column, &uom.unit_column, &uom.quantity_column] {
            if !has_column(column) {
                return Err(ConfigError::job(
                    &job.name,
                    format!("uom column '{column}' is not a report column"),
                ));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
timezone = "America/Chicago"

[api]
base_url = "https://wms.example.com"
secret_key = "c2VjcmV0"
poll_interval_secs = 5

[uom]
partial_policy = "allow_partial"
aliases = { ctn = "cartons", cs = "case" }

[[jobs]]
name = "shipments"
report = "shipments"
columns = ["shipment_id", "item_code", "unit", "quantity", "completed_at"]
window_column = "completed_at"
window_days = 2
table = "shipments"
write = { mode = "upsert", keys = ["shipment_id"] }
stamp_column = "loaded_at"
filters = [{ column = "status", operator = "=", threshold = "shipped" }]

[jobs.uom]
item_column = "item_code"
unit_column = "unit"
quantity_column = "quantity"
target_column = "base_quantity"
on_error = "skip_row"

[[jobs]]
name = "item_master"
report = "item_master"
columns = ["code", "base_unit_of_measure"]
table = "item_master"
write = { mode = "snapshot" }

[[dashboards]]
name = "picks_today"
report = "pick_summary"
columns = ["user", "picks"]
url = "https://dashboards.example.com/push/abc"
fields = [{ name = "Picker" }, { name = "Picks", kind = "number" }]
"#;

    fn sample() -> EtlConfig {
        toml::from_str(SAMPLE).unwrap()
    }

    #[test]
    fn test_default_config() {
        let config = EtlConfig::default();
        assert_eq!(config.timezone, "US/Eastern");
        assert_eq!(config.api.initial_poll_delay_secs, 15);
        assert_eq!(config.api.max_submit_attempts, 5);
        assert_eq!(config.uom.partial_policy, PartialBuildPolicy::Reject);
        assert!(config.validate().is_ok());
        assert!(config.require_api().is_err());
    }

    #[test]
    fn test_sample_parses() {
        let config = sample();
        assert!(config.validate().is_ok());
        assert!(config.require_api().is_ok());
        assert_eq!(config.jobs.len(), 2);
        assert_eq!(config.dashboards.len(), 1);
        assert_eq!(config.api.poll_interval_secs, 5);
        assert_eq!(config.api.initial_backoff_secs, 60);
        assert_eq!(config.uom.partial_policy, PartialBuildPolicy::AllowPartial);
        assert_eq!(config.tz().unwrap(), chrono_tz::America::Chicago);

        let client = config.client_config();
        assert_eq!(client.poll_interval, Duration::from_secs(5));
        assert_eq!(client.max_backoff, Duration::from_secs(120));

        let aliases = config.unit_aliases();
        assert_eq!(aliases.normalize("ctn"), "cartons");
        assert_eq!(aliases.normalize("cs"), "case");
        assert_eq!(aliases.normalize("ea"), "eaches");
    }

    #[test]
    fn test_validation_failures() {
        let mut config = sample();
        config.timezone = "Mars/Olympus".into();
        assert!(matches!(config.validate(), Err(ConfigError::UnknownTimezone(_))));

        let mut config = sample();
        config.api.base_url = "ftp://wms".into();
        assert!(matches!(config.validate(), Err(ConfigError::InvalidUrl { .. })));

        let mut config = sample();
        let duplicate = config.jobs[0].clone();
        config.jobs.push(duplicate);
        assert!(matches!(config.validate(), Err(ConfigError::InvalidJob { .. })));

        let mut config = sample();
        config.jobs[0].write = WriteMode::Upsert { keys: vec![] };
        assert!(config.validate().is_err());

        let mut config = sample();
        config.jobs[0].write = WriteMode::Upsert {
            keys: vec!["order_id".into()],
        };
        assert!(config.validate().is_err());

        let mut config = sample();
        config.jobs[1].write = WriteMode::ReplaceWindow {
            column: "code".into(),
        };
        assert!(config.validate().is_err());

        let mut config = sample();
        config.dashboards[0].fields.pop();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_key_source_validation() {
        let mut job: TableJob = toml::from_str(
            r#"
name = "production_records"
report = "job_productivity"
columns = ["job_id", "line_name", "actual_job_start_at"]
window_column = "actual_job_start_at"
table = "production_records"
write = { mode = "upsert", keys = ["job_id"] }

[key_source]
report = "job_profitability"
key_column = "job_id"
date_column = "actual_job_start_at"
date_format = "%Y-%b-%d %I:%M %p"
filters = [{ column = "invoiced", operator = "=", threshold = "false" }]
match_column = "job_id"
"#,
        )
        .unwrap();
        assert!(validate_table_job(&job).is_ok());

        job.window_column = None;
        assert!(validate_table_job(&job).is_err());

        job.window_column = Some("actual_job_start_at".into());
        if let Some(source) = job.key_source.as_mut() {
            source.match_column = "work_order".into();
        }
        assert!(matches!(validate_table_job(&job), Err(ConfigError::InvalidJob { .. })));
    }

    #[test]
    fn test_select_jobs() {
        let config = sample();

        let (tables, dashboards) = config.select(&[]).unwrap();
        assert_eq!(tables.len(), 2);
        assert_eq!(dashboards.len(), 1);

        let (tables, dashboards) = config
            .select(&["item_master".to_string(), "picks_today".to_string()])
            .unwrap();
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].name, "item_master");
        assert_eq!(dashboards.len(), 1);

        assert!(matches!(
            config.select(&["nope".to_string()]),
            Err(ConfigError::InvalidJob { .. })
        ));
    }

    #[test]
    fn test_load_explicit_missing_file() {
        let result = EtlConfig::load(Some(PathBuf::from("/nonexistent/nightly-sync.toml")));
        assert!(matches!(result, Err(ConfigError::MissingRequired(_))));
    }
}
