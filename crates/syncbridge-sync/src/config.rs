//! # Sync Configuration
//!
//! Configuration loading for one connector run.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     SYNCBRIDGE_SOURCE_URL=sqlite://./source.db                         │
//! │     SYNCBRIDGE_TARGET_PASSWORD=...                                     │
//! │                                                                         │
//! │  2. Config File (JSON or TOML, by extension)                           │
//! │     $SYNCBRIDGE_CONFIG, else Config/AppSettings.json,                  │
//! │     else the platform config dir:                                      │
//! │     ~/.config/syncbridge/appsettings.toml (Linux)                      │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     30 / 7 lookback days, tag SAGE, 10 s connect, 30 s per call        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```json
//! {
//!   "ConnectionStrings": { "Source": "sqlite://./data/source.db" },
//!   "Target": {
//!     "endpointId": "wss://sage-bridge.local:9443/session",
//!     "companyName": "ACME",
//!     "username": "sync",
//!     "password": "secret"
//!   },
//!   "Filters": {
//!     "ImportPurchaseInvoices": { "lookbackDays": 30 },
//!     "ImportPayments": { "lookbackDays": 7 }
//!   },
//!   "Run": { "strictExitCode": false }
//! }
//! ```
//!
//! The loaded value is wrapped in an `Arc` once and handed to every
//! component; nothing reads configuration from a global.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use syncbridge_core::mapper::FALLBACK_PARTY_CODE;
use syncbridge_core::{MappingDefaults, DEFAULT_SOURCE_TAG};

use crate::error::{SyncError, SyncResult};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "SYNCBRIDGE_CONFIG";

/// Config file looked up relative to the working directory.
pub const LOCAL_CONFIG_PATH: &str = "Config/AppSettings.json";

/// Upper bound for lookback windows (about ten years).
pub const MAX_LOOKBACK_DAYS: u32 = 3650;

// =============================================================================
// Connection Strings
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ConnectionStrings {
    /// Source store: a sqlx SQLite URL or a database file path.
    #[serde(default)]
    pub source: String,
}

// =============================================================================
// Target Settings
// =============================================================================

/// Target session settings.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetSettings {
    /// WebSocket URL of the Target session endpoint.
    #[serde(default)]
    pub endpoint_id: Option<String>,

    #[serde(default)]
    pub company_name: String,

    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub password: String,

    /// Tag embedded in imported chrono references.
    #[serde(default = "default_source_tag")]
    pub source_tag: String,

    /// Party code used when a Source invoice carries no customer code.
    #[serde(default = "default_party_code")]
    pub default_party_code: String,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_call_timeout")]
    pub call_timeout_secs: u64,
}

fn default_source_tag() -> String {
    DEFAULT_SOURCE_TAG.to_string()
}

fn default_party_code() -> String {
    FALLBACK_PARTY_CODE.to_string()
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_call_timeout() -> u64 {
    30
}

impl Default for TargetSettings {
    fn default() -> Self {
        TargetSettings {
            endpoint_id: None,
            company_name: String::new(),
            username: String::new(),
            password: String::new(),
            source_tag: default_source_tag(),
            default_party_code: default_party_code(),
            connect_timeout_secs: default_connect_timeout(),
            call_timeout_secs: default_call_timeout(),
        }
    }
}

// Hand-written so the password never reaches a log line.
impl fmt::Debug for TargetSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TargetSettings")
            .field("endpoint_id", &self.endpoint_id)
            .field("company_name", &self.company_name)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("source_tag", &self.source_tag)
            .field("default_party_code", &self.default_party_code)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("call_timeout_secs", &self.call_timeout_secs)
            .finish()
    }
}

// =============================================================================
// Filters
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LookbackFilter {
    pub lookback_days: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Filters {
    #[serde(default = "default_purchase_filter")]
    pub import_purchase_invoices: LookbackFilter,

    #[serde(default = "default_payment_filter")]
    pub import_payments: LookbackFilter,
}

fn default_purchase_filter() -> LookbackFilter {
    LookbackFilter { lookback_days: 30 }
}

fn default_payment_filter() -> LookbackFilter {
    LookbackFilter { lookback_days: 7 }
}

impl Default for Filters {
    fn default() -> Self {
        Filters {
            import_purchase_invoices: default_purchase_filter(),
            import_payments: default_payment_filter(),
        }
    }
}

// =============================================================================
// Run Settings
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSettings {
    /// Exit with a non-zero code when a run fails fatally.
    /// Default: false (the scheduler reads the log, not the exit code)
    #[serde(default)]
    pub strict_exit_code: bool,
}

// =============================================================================
// Main Sync Configuration
// =============================================================================

/// Complete connector configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SyncConfig {
    #[serde(default)]
    pub connection_strings: ConnectionStrings,

    #[serde(default)]
    pub target: TargetSettings,

    #[serde(default)]
    pub filters: Filters,

    #[serde(default)]
    pub run: RunSettings,
}

impl SyncConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> SyncResult<Self> {
        Self::load_with_env(config_path, |key| std::env::var(key).ok())
    }

    /// Same as [`SyncConfig::load`] with an injectable environment lookup.
    ///
    /// An explicit path (argument or `SYNCBRIDGE_CONFIG`) must exist; the
    /// default locations are optional.
    pub fn load_with_env<F>(config_path: Option<PathBuf>, env: F) -> SyncResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let explicit = config_path.or_else(|| env(CONFIG_ENV).map(PathBuf::from));

        let mut config = match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(SyncError::ConfigLoadFailed(format!(
                        "config file not found: {}",
                        path.display()
                    )));
                }
                Self::from_file(&path)?
            }
            None => match Self::default_config_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                Some(path) => {
                    debug!(?path, "Config file not found, using defaults");
                    Self::default()
                }
                None => Self::default(),
            },
        };

        config.apply_env_overrides(&env);
        config.validate()?;

        Ok(config)
    }

    /// Parses one file; `.toml` is read as TOML, anything else as JSON.
    pub fn from_file(path: &Path) -> SyncResult<Self> {
        info!(?path, "Loading connector config from file");
        let contents = std::fs::read_to_string(path)?;

        let is_toml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));

        if is_toml {
            Ok(toml::from_str(&contents)?)
        } else {
            Ok(serde_json::from_str(&contents)?)
        }
    }

    /// Validates the configuration.
    pub fn validate(&self) -> SyncResult<()> {
        if self.connection_strings.source.trim().is_empty() {
            return Err(SyncError::MissingSourceConnection);
        }

        if let Some(ref endpoint) = self.target.endpoint_id {
            let url = Url::parse(endpoint)?;
            if url.scheme() != "ws" && url.scheme() != "wss" {
                return Err(SyncError::InvalidUrl(format!(
                    "Target endpoint must start with ws:// or wss://, got: {}",
                    endpoint
                )));
            }
        }

        for (name, filter) in [
            ("ImportPurchaseInvoices", self.filters.import_purchase_invoices),
            ("ImportPayments", self.filters.import_payments),
        ] {
            if filter.lookback_days == 0 || filter.lookback_days > MAX_LOOKBACK_DAYS {
                return Err(SyncError::InvalidConfig(format!(
                    "Filters.{}.lookbackDays must be between 1 and {}, got {}",
                    name, MAX_LOOKBACK_DAYS, filter.lookback_days
                )));
            }
        }

        if self.target.source_tag.trim().is_empty() {
            return Err(SyncError::InvalidConfig(
                "Target.sourceTag must not be empty".into(),
            ));
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides<F>(&mut self, env: &F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(source) = env("SYNCBRIDGE_SOURCE_URL") {
            debug!("Overriding Source connection string from environment");
            self.connection_strings.source = source;
        }

        if let Some(endpoint) = env("SYNCBRIDGE_TARGET_ENDPOINT") {
            debug!(endpoint = %endpoint, "Overriding Target endpoint from environment");
            self.target.endpoint_id = Some(endpoint);
        }

        if let Some(company) = env("SYNCBRIDGE_TARGET_COMPANY") {
            self.target.company_name = company;
        }

        if let Some(username) = env("SYNCBRIDGE_TARGET_USERNAME") {
            self.target.username = username;
        }

        if let Some(password) = env("SYNCBRIDGE_TARGET_PASSWORD") {
            self.target.password = password;
        }

        for (key, filter) in [
            ("SYNCBRIDGE_PURCHASE_LOOKBACK_DAYS", &mut self.filters.import_purchase_invoices),
            ("SYNCBRIDGE_PAYMENT_LOOKBACK_DAYS", &mut self.filters.import_payments),
        ] {
            if let Some(raw) = env(key) {
                match raw.trim().parse::<u32>() {
                    Ok(days) => {
                        debug!(key, days, "Overriding lookback window from environment");
                        filter.lookback_days = days;
                    }
                    Err(_) => warn!(key, value = %raw, "Ignoring non-numeric lookback override"),
                }
            }
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        let local = PathBuf::from(LOCAL_CONFIG_PATH);
        if local.exists() {
            return Some(local);
        }

        directories::ProjectDirs::from("com", "syncbridge", "syncbridge")
            .map(|dirs| dirs.config_dir().join("appsettings.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    pub fn source_connection(&self) -> &str {
        self.connection_strings.source.trim()
    }

    pub fn purchase_lookback_days(&self) -> u32 {
        self.filters.import_purchase_invoices.lookback_days
    }

    pub fn payment_lookback_days(&self) -> u32 {
        self.filters.import_payments.lookback_days
    }

    pub fn source_tag(&self) -> &str {
        self.target.source_tag.trim()
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.target.connect_timeout_secs)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.target.call_timeout_secs)
    }

    /// Export mapping inputs derived from the Target settings.
    pub fn mapping_defaults(&self) -> MappingDefaults {
        MappingDefaults {
            party_code: self.target.default_party_code.clone(),
        }
    }
}
