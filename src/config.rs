//! Operator configuration
//!
//! Configuration is read from an optional YAML file named by
//! `VOLSYNC_OPERATOR_CONFIG`; a handful of environment variables override
//! individual fields afterwards.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// Environment variable naming the YAML configuration file
pub const CONFIG_PATH_ENV: &str = "VOLSYNC_OPERATOR_CONFIG";
/// Environment override for [`OperatorConfig::state_dir`]
pub const STATE_DIR_ENV: &str = "VOLSYNC_OPERATOR_STATE_DIR";
/// Environment override for [`OperatorConfig::metrics_port`]
pub const METRICS_PORT_ENV: &str = "METRICS_PORT";

/// Top-level operator configuration
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperatorConfig {
    /// Root directory of the change-detection store
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,

    /// Port for the metrics and health endpoints
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,

    /// Name of the centrally provisioned restic credentials Secret
    #[serde(default = "default_source_secret_name")]
    pub source_secret_name: String,

    /// Settings copied into every generated ReplicationSource
    #[serde(default)]
    pub replication: ReplicationDefaults,
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            state_dir: default_state_dir(),
            metrics_port: default_metrics_port(),
            source_secret_name: default_source_secret_name(),
            replication: ReplicationDefaults::default(),
        }
    }
}

fn default_state_dir() -> PathBuf {
    PathBuf::from("/var/lib/volsync-restic-operator")
}

fn default_metrics_port() -> u16 {
    8080
}

fn default_source_secret_name() -> String {
    "volsync-restic-secrets".to_string()
}

/// ReplicationSource settings shared by all claims
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplicationDefaults {
    /// Cron schedule for backups
    #[serde(default = "default_schedule")]
    pub schedule: String,

    /// VolSync copy method (Snapshot, Clone, Direct)
    #[serde(default = "default_copy_method")]
    pub copy_method: String,

    /// Days between restic prune runs
    #[serde(default = "default_prune_interval_days")]
    pub prune_interval_days: i32,

    /// Snapshot retention policy
    #[serde(default)]
    pub retain: RetainPolicy,
}

impl Default for ReplicationDefaults {
    fn default() -> Self {
        Self {
            schedule: default_schedule(),
            copy_method: default_copy_method(),
            prune_interval_days: default_prune_interval_days(),
            retain: RetainPolicy::default(),
        }
    }
}

fn default_schedule() -> String {
    "0 * * * *".to_string()
}

fn default_copy_method() -> String {
    "Snapshot".to_string()
}

fn default_prune_interval_days() -> i32 {
    14
}

/// Number of snapshots kept per period
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetainPolicy {
    #[serde(default = "default_hourly")]
    pub hourly: i32,
    #[serde(default = "default_daily")]
    pub daily: i32,
    #[serde(default = "default_weekly")]
    pub weekly: i32,
    #[serde(default = "default_monthly")]
    pub monthly: i32,
    #[serde(default = "default_yearly")]
    pub yearly: i32,
}

impl Default for RetainPolicy {
    fn default() -> Self {
        Self {
            hourly: default_hourly(),
            daily: default_daily(),
            weekly: default_weekly(),
            monthly: default_monthly(),
            yearly: default_yearly(),
        }
    }
}

fn default_hourly() -> i32 {
    6
}

fn default_daily() -> i32 {
    5
}

fn default_weekly() -> i32 {
    4
}

fn default_monthly() -> i32 {
    2
}

fn default_yearly() -> i32 {
    1
}

impl OperatorConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::load(|key| std::env::var(key).ok())
    }

    /// Load configuration using `lookup` to read environment variables
    pub fn load<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match lookup(CONFIG_PATH_ENV) {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => Self::default(),
        };

        if let Some(dir) = lookup(STATE_DIR_ENV) {
            config.state_dir = PathBuf::from(dir);
        }

        if let Some(port) = lookup(METRICS_PORT_ENV) {
            config.metrics_port = port.parse().map_err(|e| {
                Error::ConfigError(format!("{} must be a port number: {}", METRICS_PORT_ENV, e))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Parse a YAML configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::ConfigError(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&raw)
    }

    /// Parse YAML configuration text
    pub fn from_yaml(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(raw)
            .map_err(|e| Error::ConfigError(format!("Invalid configuration: {}", e)))
    }

    fn validate(&self) -> Result<()> {
        if self.source_secret_name.is_empty() {
            return Err(Error::ConfigError(
                "sourceSecretName cannot be empty".to_string(),
            ));
        }

        if self.replication.schedule.split_whitespace().count() != 5 {
            return Err(Error::ConfigError(format!(
                "replication.schedule '{}' is not a five-field cron expression",
                self.replication.schedule
            )));
        }

        let valid_copy_methods = ["Snapshot", "Clone", "Direct"];
        if !valid_copy_methods.contains(&self.replication.copy_method.as_str()) {
            return Err(Error::ConfigError(format!(
                "replication.copyMethod must be one of: {:?}",
                valid_copy_methods
            )));
        }

        if self.replication.prune_interval_days < 1 {
            return Err(Error::ConfigError(
                "replication.pruneIntervalDays must be >= 1".to_string(),
            ));
        }

        Ok(())
    }
}
