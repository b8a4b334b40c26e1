//! Configuration file management.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use atmotube_core::session::DEFAULT_POLL_CHARACTERISTICS;
use atmotube_core::sync::{
    CHECK_INTERVAL, DEFAULT_CHECK_BASE_URL, DEFAULT_UPLOAD_BASE_URL, UPLOAD_INTERVAL,
};
use atmotube_core::{CharacteristicKind, Geolocation, SessionOptions, SyncSettings};

/// Configuration file structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// PlanetWatch synchronisation.
    pub planetwatch: PlanetWatchConfig,
    /// Where the sensors are. Required when PlanetWatch is enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<LocationConfig>,
    /// Active polling.
    pub polling: PollingConfig,
    /// Known devices.
    pub devices: Vec<DeviceConfig>,
}

impl Config {
    /// Load configuration from the default path, or defaults if absent.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = default_config_path();
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Read {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.as_ref().to_path_buf(),
            source: e,
        })
    }

    /// Save configuration to a file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self).map_err(ConfigError::Serialize)?;

        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        std::fs::write(path.as_ref(), content).map_err(|e| ConfigError::Write {
            path: path.as_ref().to_path_buf(),
            source: e,
        })
    }

    /// Validate the configuration and return every problem found.
    ///
    /// This checks:
    /// - PlanetWatch URLs use http or https
    /// - Intervals and the timeout are non-zero, and checks are no more
    ///   frequent than uploads
    /// - A location is present when PlanetWatch is enabled, and is in range
    /// - Polling lists at least one characteristic
    /// - Device addresses are non-empty and unique
    ///
    /// # Example
    ///
    /// ```
    /// use atmotube_cli::config::Config;
    ///
    /// Config::default().validate().expect("default config is valid");
    /// ```
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        errors.extend(self.planetwatch.validate());

        match &self.location {
            Some(location) => errors.extend(location.validate()),
            None if self.planetwatch.enabled => errors.push(ValidationError {
                field: "location".to_string(),
                message: "a location is required when planetwatch.enabled is true".to_string(),
            }),
            None => {}
        }

        errors.extend(self.polling.validate());

        let mut seen_addresses = HashSet::new();
        for (i, device) in self.devices.iter().enumerate() {
            let prefix = format!("devices[{}]", i);
            errors.extend(device.validate(&prefix));

            let addr_lower = device.address.to_lowercase();
            if !device.address.is_empty() && !seen_addresses.insert(addr_lower) {
                errors.push(ValidationError {
                    field: format!("{}.address", prefix),
                    message: format!("duplicate device address '{}'", device.address),
                });
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// PlanetWatch settings for a device session.
    pub fn sync_settings(&self) -> SyncSettings {
        let pw = &self.planetwatch;
        SyncSettings {
            enabled: pw.enabled,
            geolocation: self.location.as_ref().map(LocationConfig::geolocation),
            ..SyncSettings::default()
        }
        .check_base_url(pw.check_base_url.as_str())
        .upload_base_url(pw.upload_base_url.as_str())
        .check_interval(Duration::from_secs(pw.check_interval_secs))
        .upload_interval(Duration::from_secs(pw.upload_interval_secs))
    }

    /// Options for a device session.
    pub fn session_options(&self) -> SessionOptions {
        SessionOptions::new().poll_characteristics(self.polling.characteristics.iter().copied())
    }

    /// Timeout for PlanetWatch requests.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.planetwatch.timeout_secs)
    }

    /// Resolve an alias to its device address, or return the input unchanged.
    pub fn resolve_alias(&self, device: &str) -> String {
        self.devices
            .iter()
            .find(|d| d.alias.as_deref() == Some(device))
            .map(|d| d.address.clone())
            .unwrap_or_else(|| device.to_string())
    }

    /// Resolve the device to use: explicit argument (alias-aware) first, then
    /// the first configured device.
    pub fn resolve_device(&self, device: Option<&str>) -> Option<String> {
        device
            .map(|d| self.resolve_alias(d))
            .or_else(|| self.devices.first().map(|d| d.address.clone()))
    }
}

/// PlanetWatch configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanetWatchConfig {
    /// Opt in to registration checks and uploads.
    pub enabled: bool,
    /// Base URL for `checkSensor` requests.
    pub check_base_url: String,
    /// Base URL for uploads.
    pub upload_base_url: String,
    /// Seconds between registration checks.
    pub check_interval_secs: u64,
    /// Minimum seconds between uploads.
    pub upload_interval_secs: u64,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for PlanetWatchConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            check_base_url: DEFAULT_CHECK_BASE_URL.to_string(),
            upload_base_url: DEFAULT_UPLOAD_BASE_URL.to_string(),
            check_interval_secs: CHECK_INTERVAL.as_secs(),
            upload_interval_secs: UPLOAD_INTERVAL.as_secs(),
            timeout_secs: 10,
        }
    }
}

impl PlanetWatchConfig {
    /// Validate PlanetWatch configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        for (field, url) in [
            ("planetwatch.check_base_url", &self.check_base_url),
            ("planetwatch.upload_base_url", &self.upload_base_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                errors.push(ValidationError {
                    field: field.to_string(),
                    message: format!("URL must start with http:// or https://, got: {}", url),
                });
            }
        }

        for (field, value) in [
            ("planetwatch.check_interval_secs", self.check_interval_secs),
            ("planetwatch.upload_interval_secs", self.upload_interval_secs),
            ("planetwatch.timeout_secs", self.timeout_secs),
        ] {
            if value == 0 {
                errors.push(ValidationError {
                    field: field.to_string(),
                    message: "must be greater than 0".to_string(),
                });
            }
        }

        if self.check_interval_secs < self.upload_interval_secs {
            errors.push(ValidationError {
                field: "planetwatch.check_interval_secs".to_string(),
                message: format!(
                    "check interval {} is shorter than upload interval {}",
                    self.check_interval_secs, self.upload_interval_secs
                ),
            });
        }

        errors
    }
}

/// Sensor location reported with every upload.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationConfig {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Altitude in metres.
    #[serde(default)]
    pub altitude: f64,
}

impl LocationConfig {
    /// Validate location configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if !(-90.0..=90.0).contains(&self.latitude) {
            errors.push(ValidationError {
                field: "location.latitude".to_string(),
                message: format!("latitude {} is outside [-90, 90]", self.latitude),
            });
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            errors.push(ValidationError {
                field: "location.longitude".to_string(),
                message: format!("longitude {} is outside [-180, 180]", self.longitude),
            });
        }
        if !self.altitude.is_finite() {
            errors.push(ValidationError {
                field: "location.altitude".to_string(),
                message: "altitude must be a finite number".to_string(),
            });
        }

        errors
    }

    fn geolocation(&self) -> Geolocation {
        Geolocation::new(self.latitude, self.longitude, self.altitude)
    }
}

/// Characteristics read when a session polls a connected device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    /// Characteristics read by each poll, in order.
    pub characteristics: Vec<CharacteristicKind>,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            characteristics: DEFAULT_POLL_CHARACTERISTICS.to_vec(),
        }
    }
}

impl PollingConfig {
    /// Validate polling configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        if self.characteristics.is_empty() {
            errors.push(ValidationError {
                field: "polling.characteristics".to_string(),
                message: "at least one characteristic is required".to_string(),
            });
        }
        errors
    }
}

/// A known device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Bluetooth address.
    pub address: String,
    /// Friendly alias for the device.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

impl DeviceConfig {
    /// Validate device configuration.
    pub fn validate(&self, prefix: &str) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.address.trim().is_empty() {
            errors.push(ValidationError {
                field: format!("{}.address", prefix),
                message: "device address cannot be empty".to_string(),
            });
        }

        if let Some(alias) = &self.alias
            && alias.is_empty()
        {
            errors.push(ValidationError {
                field: format!("{}.alias", prefix),
                message: "alias cannot be empty string (omit it instead)".to_string(),
            });
        }

        errors
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Failed to serialize config: {0}")]
    Serialize(toml::ser::Error),
    #[error("Failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Configuration validation failed:\n{}", format_validation_errors(.0))]
    Validation(Vec<ValidationError>),
}

/// A single validation error with context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// The field path (e.g., `location.latitude` or `devices[0].address`).
    pub field: String,
    /// Description of the validation failure.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Default configuration file path.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("atmotube")
        .join("config.toml")
}
