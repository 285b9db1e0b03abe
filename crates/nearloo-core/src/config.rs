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
    /// Application configuration directory
    pub config_dir: PathBuf,

    /// Remote (Overpass) search settings
    #[serde(default)]
    pub search: SearchConfig,

    /// User-submitted places directory
    #[serde(default)]
    pub directory: DirectoryConfig,

    /// Offline cache settings
    #[serde(default)]
    pub offline: OfflineConfig,

    /// Geolocation settings
    #[serde(default)]
    pub geo: GeoConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Mirror endpoints of the same Overpass API, tried in order
    #[serde(default = "default_endpoints")]
    pub endpoints: Vec<String>,

    /// Maximum number of places returned by one search (clamped to 50..=800)
    #[serde(default = "default_max_results")]
    pub max_results: u32,

    /// Client-side timeout for a single endpoint call, independent of the query timeout
    #[serde(default = "default_hard_timeout_secs")]
    pub hard_timeout_secs: u64,

    /// Server-declared query timeout for each attempt, in order
    #[serde(default = "default_attempt_timeouts")]
    pub attempt_timeouts_secs: Vec<u32>,

    /// Pause before every attempt after the first
    #[serde(default = "default_retry_pause_ms")]
    pub retry_pause_ms: u64,

    /// Radius used when the caller does not pick one
    #[serde(default = "default_radius_meters")]
    pub default_radius_meters: u32,

    /// Also look for bars, cafés, stations and similar "likely" places
    #[serde(default)]
    pub include_likely: bool,
}

fn default_endpoints() -> Vec<String> {
    vec![
        "https://overpass-api.de/api/interpreter".to_string(),
        "https://overpass.kumi.systems/api/interpreter".to_string(),
        "https://overpass.nchc.org.tw/api/interpreter".to_string(),
    ]
}

fn default_max_results() -> u32 {
    300
}

fn default_hard_timeout_secs() -> u64 {
    55
}

fn default_attempt_timeouts() -> Vec<u32> {
    vec![35, 45]
}

fn default_retry_pause_ms() -> u64 {
    650
}

fn default_radius_meters() -> u32 {
    800
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoints: default_endpoints(),
            max_results: default_max_results(),
            hard_timeout_secs: default_hard_timeout_secs(),
            attempt_timeouts_secs: default_attempt_timeouts(),
            retry_pause_ms: default_retry_pause_ms(),
            default_radius_meters: default_radius_meters(),
            include_likely: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryConfig {
    /// Base URL of the places/reviews API (e.g. https://example.org/api)
    #[serde(default = "default_directory_url")]
    pub base_url: String,

    /// Use the local SQLite store instead of the HTTP API
    #[serde(default)]
    pub local: bool,

    /// SQLite database file; defaults to `<config_dir>/directory.db`
    #[serde(default)]
    pub store_path: Option<PathBuf>,

    /// Maximum number of stored places (oldest evicted first)
    #[serde(default = "default_max_places")]
    pub max_places: usize,

    /// Maximum number of reviews kept per place (most recent)
    #[serde(default = "default_max_reviews")]
    pub max_reviews_per_place: usize,
}

fn default_directory_url() -> String {
    "http://localhost:8888/api".to_string()
}

fn default_max_places() -> usize {
    300
}

fn default_max_reviews() -> usize {
    200
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            base_url: default_directory_url(),
            local: false,
            store_path: None,
            max_places: default_max_places(),
            max_reviews_per_place: default_max_reviews(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfflineConfig {
    /// Route search and directory calls through the offline cache
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Cache version; activating a new one deletes every other version
    #[serde(default = "default_cache_version")]
    pub cache_version: String,

    /// Origin the app is served from (same-origin assets and /api/ calls)
    #[serde(default = "default_app_origin")]
    pub app_origin: String,

    /// App shell refreshed on every successful navigation
    #[serde(default = "default_shell_path")]
    pub shell_path: String,

    /// Page served when a navigation fails offline
    #[serde(default = "default_offline_page")]
    pub offline_page: String,

    /// Asset served when both cache and network miss
    #[serde(default = "default_fallback_asset")]
    pub fallback_asset: String,

    /// Paths precached on install
    #[serde(default = "default_precache")]
    pub precache: Vec<String>,

    /// Hosts whose responses use stale-while-revalidate
    #[serde(default = "default_runtime_hosts")]
    pub runtime_hosts: Vec<String>,

    /// SQLite database file; defaults to `<config_dir>/offline.db`
    #[serde(default)]
    pub db_path: Option<PathBuf>,
}

fn default_true() -> bool {
    true
}

fn default_cache_version() -> String {
    "nearloo-v1".to_string()
}

fn default_app_origin() -> String {
    "http://localhost:8888".to_string()
}

fn default_shell_path() -> String {
    "/app/".to_string()
}

fn default_offline_page() -> String {
    "/app/offline.html".to_string()
}

fn default_fallback_asset() -> String {
    "/app/assets/icon.png".to_string()
}

fn default_precache() -> Vec<String> {
    vec![
        default_shell_path(),
        default_offline_page(),
        "/app/manifest.webmanifest".to_string(),
        default_fallback_asset(),
    ]
}

fn default_runtime_hosts() -> Vec<String> {
    vec![
        "overpass-api.de".to_string(),
        "overpass.kumi.systems".to_string(),
        "lz4.overpass-api.de".to_string(),
    ]
}

impl Default for OfflineConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            cache_version: default_cache_version(),
            app_origin: default_app_origin(),
            shell_path: default_shell_path(),
            offline_page: default_offline_page(),
            fallback_asset: default_fallback_asset(),
            precache: default_precache(),
            runtime_hosts: default_runtime_hosts(),
            db_path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoConfig {
    /// How long to wait for a position fix
    pub timeout_ms: u64,

    /// Ask for a GPS-grade fix
    pub high_accuracy: bool,

    /// Origin the position request is made from; must be a secure context
    pub origin: String,
}

impl Default for GeoConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 12_000,
            high_accuracy: true,
            origin: default_app_origin(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("nearloo");

        Self {
            config_dir,
            search: SearchConfig::default(),
            directory: DirectoryConfig::default(),
            offline: OfflineConfig::default(),
            geo: GeoConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file, creating default if it doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path, creating default if it doesn't exist
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            let config = Self::default();
            config.save_to(config_path)?;
            return Ok(config);
        }

        let contents =
            std::fs::read_to_string(config_path).context("Failed to read config file")?;

        let config: Config = toml::from_str(&contents).context("Failed to parse config file")?;

        Ok(config)
    }

    /// Load configuration and validate it
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

    /// Validate the configuration
    ///
    /// Returns a ValidationResult containing any errors or warnings.
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        // Mirrors: at least two, all http(s)
        if self.search.endpoints.len() < 2 {
            result.add_error(
                "search.endpoints",
                "At least two mirror endpoints are required",
            );
        }
        for (i, endpoint) in self.search.endpoints.iter().enumerate() {
            self.validate_url(endpoint, &format!("search.endpoints[{}]", i), &mut result);
        }

        if !(50..=800).contains(&self.search.max_results) {
            result.add_warning(
                "search.max_results",
                "Outside 50..=800, will be clamped",
            );
        }

        if self.search.attempt_timeouts_secs.is_empty() {
            result.add_error(
                "search.attempt_timeouts_secs",
                "At least one attempt is required",
            );
        } else if self.search.attempt_timeouts_secs.contains(&0) {
            result.add_error(
                "search.attempt_timeouts_secs",
                "Query timeouts must be greater than 0",
            );
        }

        if self.search.hard_timeout_secs == 0 {
            result.add_error(
                "search.hard_timeout_secs",
                "Hard timeout must be greater than 0",
            );
        } else if self
            .search
            .attempt_timeouts_secs
            .iter()
            .any(|t| u64::from(*t) >= self.search.hard_timeout_secs)
        {
            result.add_warning(
                "search.hard_timeout_secs",
                "Hard timeout is not longer than every query timeout",
            );
        }

        if !(50..=5000).contains(&self.search.default_radius_meters) {
            result.add_warning(
                "search.default_radius_meters",
                "Outside 50..=5000, will be clamped",
            );
        }

        if !self.directory.local {
            self.validate_url(&self.directory.base_url, "directory.base_url", &mut result);
        }

        if self.directory.max_places == 0 {
            result.add_error("directory.max_places", "Must be greater than 0");
        }
        if self.directory.max_reviews_per_place == 0 {
            result.add_error("directory.max_reviews_per_place", "Must be greater than 0");
        }

        if self.offline.cache_version.trim().is_empty() {
            result.add_error("offline.cache_version", "Cache version cannot be empty");
        }
        self.validate_url(&self.offline.app_origin, "offline.app_origin", &mut result);

        if self.geo.timeout_ms == 0 {
            result.add_warning("geo.timeout_ms", "Position requests will time out immediately");
        }
        self.validate_url(&self.geo.origin, "geo.origin", &mut result);

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

                if let Some(port) = url.port() {
                    if port == 0 {
                        result.add_error(field_name, "Port cannot be 0");
                    }
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    /// Path of the directory SQLite store
    pub fn directory_store_path(&self) -> PathBuf {
        self.directory
            .store_path
            .clone()
            .unwrap_or_else(|| self.config_dir.join("directory.db"))
    }

    /// Path of the offline cache SQLite store
    pub fn offline_db_path(&self) -> PathBuf {
        self.offline
            .db_path
            .clone()
            .unwrap_or_else(|| self.config_dir.join("offline.db"))
    }

    /// Save configuration to the default file
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;
        self.save_to(&config_path)
    }

    /// Save configuration to a specific file
    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(config_path, contents).context("Failed to write config file")?;

        Ok(())
    }

    /// Get the path to the configuration file
    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("nearloo");

        Ok(config_dir.join("config.toml"))
    }
}
