//! Stats reporter configuration.
//!
//! Configuration is loaded from environment variables. The shared
//! application secret is redacted in Debug output.

use crate::credentials::CredentialConfig;
use common::secret::SecretString;
use common::types::ApplicationId;
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Default reporting period in milliseconds.
pub const DEFAULT_REPORTING_INTERVAL_MS: u64 = 5_000;

/// Default fleet status period in milliseconds.
pub const DEFAULT_FLEET_STATUS_INTERVAL_MS: u64 = 30_000;

/// Default initiator id prefix.
pub const DEFAULT_INITIATOR_ID_PREFIX: &str = "stats";

/// Default conference name used by the dry-run binary.
pub const DEFAULT_CONFERENCE_NAME: &str = "dry-run";

/// Stats reporter configuration.
#[derive(Clone)]
pub struct Config {
    /// Monitoring backend application id.
    pub app_id: ApplicationId,

    /// Shared application secret, used when no key pair is configured.
    pub app_secret: Option<SecretString>,

    /// Key id for key-pair authentication.
    pub key_id: Option<String>,

    /// Private key path for key-pair authentication.
    pub key_path: Option<PathBuf>,

    /// Local user / initiator id announced to the backend.
    pub initiator_id: String,

    /// Prefix prepended to conference names.
    pub conference_id_prefix: Option<String>,

    /// Period between reporting cycles.
    pub reporting_interval: Duration,

    /// Period between fleet status updates.
    pub fleet_status_interval: Duration,

    /// Report as a client endpoint instead of a middlebox.
    pub is_client: bool,

    /// Explicit SDK config file. Skips discovery when set.
    pub sdk_config_file: Option<PathBuf>,

    /// Home location searched during SDK config discovery.
    pub home_location: Option<PathBuf>,

    /// Directory name under `home_location` searched during discovery.
    pub home_name: Option<String>,

    /// Snapshot JSON served by the dry-run stats source.
    pub snapshot_file: Option<PathBuf>,

    /// Conference name used by the dry-run binary.
    pub conference_name: String,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("app_id", &self.app_id)
            .field(
                "app_secret",
                &self.app_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .field("key_id", &self.key_id)
            .field("key_path", &self.key_path)
            .field("initiator_id", &self.initiator_id)
            .field("conference_id_prefix", &self.conference_id_prefix)
            .field("reporting_interval", &self.reporting_interval)
            .field("fleet_status_interval", &self.fleet_status_interval)
            .field("is_client", &self.is_client)
            .field("sdk_config_file", &self.sdk_config_file)
            .field("home_location", &self.home_location)
            .field("home_name", &self.home_name)
            .field("snapshot_file", &self.snapshot_file)
            .field("conference_name", &self.conference_name)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// See [`Config::from_vars`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a `HashMap` (for testing).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingEnvVar` when `STATS_APP_ID` is absent and
    /// `ConfigError::InvalidValue` when a numeric or boolean value does not
    /// parse or an interval is zero.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let raw_app_id = vars
            .get("STATS_APP_ID")
            .ok_or_else(|| ConfigError::MissingEnvVar("STATS_APP_ID".to_string()))?;
        let app_id = raw_app_id.trim().parse::<u32>().map(ApplicationId).map_err(|e| {
            ConfigError::InvalidValue(format!("STATS_APP_ID must be a u32, got '{raw_app_id}': {e}"))
        })?;

        let app_secret = non_empty(vars, "STATS_APP_SECRET").map(SecretString::from);
        let key_id = non_empty(vars, "STATS_KEY_ID");
        let key_path = non_empty(vars, "STATS_KEY_PATH").map(PathBuf::from);

        let initiator_id = non_empty(vars, "STATS_INITIATOR_ID").unwrap_or_else(|| {
            let hostname = vars.get("HOSTNAME").map_or("unknown", String::as_str);
            let uuid_suffix = uuid::Uuid::new_v4().to_string();
            let short_suffix = uuid_suffix.get(..8).unwrap_or("00000000");
            format!("{DEFAULT_INITIATOR_ID_PREFIX}-{hostname}-{short_suffix}")
        });

        let conference_id_prefix = non_empty(vars, "STATS_CONFERENCE_ID_PREFIX");

        let reporting_interval = parse_interval(
            vars,
            "STATS_REPORTING_INTERVAL_MS",
            DEFAULT_REPORTING_INTERVAL_MS,
        )?;
        let fleet_status_interval = parse_interval(
            vars,
            "STATS_FLEET_STATUS_INTERVAL_MS",
            DEFAULT_FLEET_STATUS_INTERVAL_MS,
        )?;

        let is_client = match vars.get("STATS_IS_CLIENT") {
            Some(value) => value.trim().parse::<bool>().map_err(|_| {
                ConfigError::InvalidValue(format!(
                    "STATS_IS_CLIENT must be 'true' or 'false', got '{value}'"
                ))
            })?,
            None => false,
        };

        let sdk_config_file = non_empty(vars, "STATS_SDK_CONFIG_FILE").map(PathBuf::from);
        let home_location = non_empty(vars, "STATS_HOME_LOCATION").map(PathBuf::from);
        let home_name = non_empty(vars, "STATS_HOME_NAME");
        let snapshot_file = non_empty(vars, "STATS_SNAPSHOT_FILE").map(PathBuf::from);
        let conference_name = non_empty(vars, "STATS_CONFERENCE_NAME")
            .unwrap_or_else(|| DEFAULT_CONFERENCE_NAME.to_string());

        Ok(Config {
            app_id,
            app_secret,
            key_id,
            key_path,
            initiator_id,
            conference_id_prefix,
            reporting_interval,
            fleet_status_interval,
            is_client,
            sdk_config_file,
            home_location,
            home_name,
            snapshot_file,
            conference_name,
        })
    }

    /// Credential material for backend session creation.
    #[must_use]
    pub fn credentials(&self) -> CredentialConfig {
        CredentialConfig {
            key_id: self.key_id.clone(),
            private_key_path: self.key_path.clone(),
            app_secret: self.app_secret.clone(),
        }
    }
}

fn non_empty(vars: &HashMap<String, String>, key: &str) -> Option<String> {
    vars.get(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_interval(
    vars: &HashMap<String, String>,
    key: &str,
    default_ms: u64,
) -> Result<Duration, ConfigError> {
    let millis = match vars.get(key) {
        Some(value) => value.trim().parse::<u64>().map_err(|e| {
            ConfigError::InvalidValue(format!("{key} must be a number of milliseconds: {e}"))
        })?,
        None => default_ms,
    };

    if millis == 0 {
        return Err(ConfigError::InvalidValue(format!(
            "{key} must be greater than zero"
        )));
    }

    Ok(Duration::from_millis(millis))
}
