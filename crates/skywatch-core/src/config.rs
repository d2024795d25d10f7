use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Add an error
    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Add a warning
    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a user-friendly message summarizing all errors
    pub fn error_summary(&self) -> String {
        if self.errors.is_empty() {
            return String::new();
        }
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Remote weather backend settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Snapshot cache and freshness settings
    #[serde(default)]
    pub cache: CacheConfig,

    /// Background polling settings
    #[serde(default)]
    pub polling: PollingConfig,

    /// Refresh trigger settings (focus debounce, GPS filters)
    #[serde(default)]
    pub triggers: TriggerConfig,

    /// Forecast horizon settings
    #[serde(default)]
    pub forecast: ForecastConfig,

    /// City fetched on first start, before any search or GPS fix
    #[serde(default = "default_city")]
    pub default_city: String,
}

fn default_city() -> String {
    "Hanoi".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            cache: CacheConfig::default(),
            polling: PollingConfig::default(),
            triggers: TriggerConfig::default(),
            forecast: ForecastConfig::default(),
            default_city: default_city(),
        }
    }
}

/// Remote weather backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the weather backend, e.g. `https://host/api`
    pub base_url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_request_timeout_secs() -> u64 {
    10
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://weather-backend-vo7o.onrender.com/api".to_string(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// Snapshot cache sizing and freshness bands.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Age below which a cached snapshot is served without any network call
    #[serde(default = "default_stale_secs")]
    pub stale_secs: u64,

    /// Age at which a cached snapshot stops being servable to visible requests
    #[serde(default = "default_expire_secs")]
    pub expire_secs: u64,

    /// Maximum number of locations kept in the cache
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,

    /// How often the periodic sweep runs
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    /// Age beyond which the sweep drops an entry outright
    #[serde(default = "default_sweep_max_age_secs")]
    pub sweep_max_age_secs: u64,
}

fn default_stale_secs() -> u64 {
    10 * 60
}

fn default_expire_secs() -> u64 {
    2 * 60 * 60
}

fn default_max_entries() -> usize {
    5
}

fn default_sweep_interval_secs() -> u64 {
    10 * 60
}

fn default_sweep_max_age_secs() -> u64 {
    60 * 60
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            stale_secs: default_stale_secs(),
            expire_secs: default_expire_secs(),
            max_entries: default_max_entries(),
            sweep_interval_secs: default_sweep_interval_secs(),
            sweep_max_age_secs: default_sweep_max_age_secs(),
        }
    }
}

/// Background polling intervals by environment condition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Interval while the user has interacted recently
    #[serde(default = "default_active_secs")]
    pub active_secs: u64,

    /// Interval while the user has been idle
    #[serde(default = "default_idle_secs")]
    pub idle_secs: u64,

    /// Interval on a 2G-class connection
    #[serde(default = "default_slow_connection_secs")]
    pub slow_connection_secs: u64,

    /// Interval when the connection declares a data-saver preference
    #[serde(default = "default_save_data_secs")]
    pub save_data_secs: u64,

    /// How long after the last interaction the user counts as idle
    #[serde(default = "default_inactivity_threshold_secs")]
    pub inactivity_threshold_secs: u64,

    /// How often the scheduler re-reads visibility/activity/connection
    #[serde(default = "default_recheck_secs")]
    pub recheck_secs: u64,
}

fn default_active_secs() -> u64 {
    10 * 60
}

fn default_idle_secs() -> u64 {
    30 * 60
}

fn default_slow_connection_secs() -> u64 {
    30 * 60
}

fn default_save_data_secs() -> u64 {
    60 * 60
}

fn default_inactivity_threshold_secs() -> u64 {
    5 * 60
}

fn default_recheck_secs() -> u64 {
    2 * 60
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            active_secs: default_active_secs(),
            idle_secs: default_idle_secs(),
            slow_connection_secs: default_slow_connection_secs(),
            save_data_secs: default_save_data_secs(),
            inactivity_threshold_secs: default_inactivity_threshold_secs(),
            recheck_secs: default_recheck_secs(),
        }
    }
}

/// Per-trigger policy knobs.
///
/// The GPS thresholds are tuning choices, not correctness requirements;
/// they are configurable rather than hard-coded for that reason.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerConfig {
    /// Minimum spacing between focus-driven refreshes
    #[serde(default = "default_min_focus_refresh_secs")]
    pub min_focus_refresh_secs: u64,

    /// How long a GPS fix must stand unreplaced before it triggers a fetch
    #[serde(default = "default_gps_settle_ms")]
    pub gps_settle_ms: u64,

    /// Minimum movement before a GPS fix counts as a new location
    #[serde(default = "default_gps_min_displacement_meters")]
    pub gps_min_displacement_meters: f64,
}

fn default_min_focus_refresh_secs() -> u64 {
    30
}

fn default_gps_settle_ms() -> u64 {
    2000
}

fn default_gps_min_displacement_meters() -> f64 {
    100.0
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            min_focus_refresh_secs: default_min_focus_refresh_secs(),
            gps_settle_ms: default_gps_settle_ms(),
            gps_min_displacement_meters: default_gps_min_displacement_meters(),
        }
    }
}

/// How much forecast data to request and how to label it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastConfig {
    /// Days of daily forecast requested upstream
    #[serde(default = "default_daily_days")]
    pub daily_days: u32,

    /// Hours of hourly forecast requested and kept
    #[serde(default = "default_hourly_hours")]
    pub hourly_hours: usize,

    /// Half-width of the window in which an hourly entry counts as "now"
    #[serde(default = "default_now_window_secs")]
    pub now_window_secs: u64,
}

fn default_daily_days() -> u32 {
    16
}

fn default_hourly_hours() -> usize {
    8
}

fn default_now_window_secs() -> u64 {
    30 * 60
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            daily_days: default_daily_days(),
            hourly_hours: default_hourly_hours(),
            now_window_secs: default_now_window_secs(),
        }
    }
}

impl Config {
    /// Default location of the config file.
    pub fn config_path() -> Result<PathBuf> {
        let dir = dirs::config_dir().context("Could not determine the user config directory")?;
        Ok(dir.join("skywatch").join("config.toml"))
    }

    /// Load configuration from the default path, creating it with
    /// defaults if it doesn't exist.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from an explicit path, creating it with
    /// defaults if it doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            let config = Self::default();
            config.save_to(path)?;
            return Ok(config);
        }

        let contents = std::fs::read_to_string(path).context("Failed to read config file")?;

        let config: Config = toml::from_str(&contents).context("Failed to parse config file")?;

        Ok(config)
    }

    /// Load configuration and validate it.
    ///
    /// Returns the config along with any validation warnings.
    /// Returns an error if validation fails with critical errors.
    pub fn load_validated() -> Result<(Self, ValidationResult)> {
        let config = Self::load()?;
        let validation = config.validate();

        if !validation.is_valid() {
            anyhow::bail!(
                "Configuration validation failed: {}",
                validation.error_summary()
            );
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((config, validation))
    }

    /// Validate the configuration.
    ///
    /// Returns a ValidationResult containing any errors or warnings.
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        self.validate_url(&self.api.base_url, "api.base_url", &mut result);

        if self.api.request_timeout_secs == 0 {
            result.add_error("api.request_timeout_secs", "Request timeout must be non-zero");
        }

        if self.cache.max_entries == 0 {
            result.add_error("cache.max_entries", "Cache must hold at least one entry");
        }

        if self.cache.stale_secs >= self.cache.expire_secs {
            result.add_error(
                "cache.stale_secs",
                "Stale threshold must be below the expiry threshold",
            );
        }

        if self.polling.active_secs == 0 || self.polling.idle_secs == 0 {
            result.add_warning("polling", "Zero polling interval; polling effectively disabled");
        }

        if self.polling.inactivity_threshold_secs == 0 {
            result.add_warning(
                "polling.inactivity_threshold_secs",
                "Users will always count as idle",
            );
        }

        if self.forecast.daily_days > 16 {
            result.add_warning(
                "forecast.daily_days",
                "The backend caps daily forecasts at 16 days",
            );
        }

        if self.forecast.hourly_hours == 0 {
            result.add_warning("forecast.hourly_hours", "Hourly forecast disabled (0 hours)");
        }

        if self.triggers.gps_min_displacement_meters < 0.0 {
            result.add_error(
                "triggers.gps_min_displacement_meters",
                "Displacement threshold cannot be negative",
            );
        }

        if self.default_city.trim().is_empty() {
            result.add_error("default_city", "A default city is required for first start");
        }

        result
    }

    /// Validate a URL field
    fn validate_url(&self, url_str: &str, field_name: &str, result: &mut ValidationResult) {
        match Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    result.add_error(
                        field_name,
                        format!("URL must use http or https scheme, got: {}", url.scheme()),
                    );
                }

                if url.host().is_none() {
                    result.add_error(field_name, "URL must have a host");
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    /// Save configuration to the default path.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Save configuration to an explicit path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(path, contents).context("Failed to write config file")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        let validation = config.validate();
        assert!(validation.is_valid(), "{}", validation.error_summary());
        assert_eq!(config.cache.stale_secs, 600);
        assert_eq!(config.cache.expire_secs, 7200);
        assert_eq!(config.cache.max_entries, 5);
        assert_eq!(config.default_city, "Hanoi");
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let mut config = Config::default();
        config.api.base_url = "not a url".to_string();
        assert!(!config.validate().is_valid());

        config.api.base_url = "ftp://example.com".to_string();
        assert!(!config.validate().is_valid());
    }

    #[test]
    fn test_stale_must_precede_expiry() {
        let mut config = Config::default();
        config.cache.stale_secs = config.cache.expire_secs;
        let validation = config.validate();
        assert!(!validation.is_valid());
        assert!(validation.error_summary().contains("Stale threshold"));
    }

    #[test]
    fn test_zero_polling_only_warns() {
        let mut config = Config::default();
        config.polling.active_secs = 0;
        let validation = config.validate();
        assert!(validation.is_valid());
        assert!(!validation.warnings.is_empty());
    }

    #[test]
    fn test_toml_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.default_city = "Da Nang".to_string();
        config.cache.max_entries = 8;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.default_city, "Da Nang");
        assert_eq!(loaded.cache.max_entries, 8);
        assert_eq!(loaded.api.request_timeout_secs, 10);
    }

    #[test]
    fn test_load_creates_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.default_city, "Hanoi");
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "default_city = \"Hue\"\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.default_city, "Hue");
        assert_eq!(config.cache.max_entries, 5);
        assert_eq!(config.polling.active_secs, 600);
    }
}
