//! Guard configuration.
//!
//! Read from a TOML file; every table and key is optional and falls back to
//! the built-in defaults.
//!
//! ```toml
//! enabled = true
//!
//! [radii]
//! critical_km = 60.0
//!
//! [watch]
//! timeout = 10
//!
//! [escalation]
//! response_countdown_secs = 30
//!
//! [notification]
//! title = "Danger Zone Alert"
//! ```

use std::path::Path;

use sarthi_escalation::EscalationTimings;
use sarthi_geofence::{DangerRadii, GeofenceConfig, WatchOptions};
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Environment variable naming the config file.
pub const CONFIG_PATH_ENV: &str = "SARTHI_CONFIG";

/// Environment variable overriding [`GuardConfig::enabled`].
pub const TRACKING_ENABLED_ENV: &str = "SARTHI_TRACKING_ENABLED";

/// Text of the danger-zone notification.
///
/// `{state}`, `{level}` and `{distance}` in either field are replaced with
/// the zone's state, its risk level and the distance in kilometers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// Notification title.
    pub title: String,
    /// Notification body.
    pub body: String,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            title: "Danger Zone Alert".to_string(),
            body: "You are {distance} km from a {level} risk area in {state}. Are you safe?"
                .to_string(),
        }
    }
}

/// Everything the guard needs to run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    /// Track automatically once zones are loaded.
    pub enabled: bool,
    /// Danger radius per risk level.
    pub radii: DangerRadii,
    /// Position watch options.
    pub watch: WatchOptions,
    /// Escalation countdowns.
    pub escalation: EscalationTimings,
    /// Danger-zone notification text.
    pub notification: NotificationConfig,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            radii: DangerRadii::default(),
            watch: WatchOptions::default(),
            escalation: EscalationTimings::default(),
            notification: NotificationConfig::default(),
        }
    }
}

impl GuardConfig {
    /// Parses a TOML document and validates it.
    ///
    /// # Errors
    ///
    /// * [`ConfigError::Parse`] if the document is not valid TOML for this
    ///   shape
    /// * [`ConfigError::InvalidRadius`] if a danger radius is not a positive
    ///   number
    /// * [`ConfigError::InvalidTiming`] if the tick period is zero
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::de::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses the config file at `path`.
    ///
    /// # Errors
    ///
    /// * [`ConfigError::Read`] if the file cannot be read
    /// * anything [`from_toml_str`](Self::from_toml_str) returns
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        log::info!("Loaded configuration from {}", path.display());
        Self::from_toml_str(&content)
    }

    /// Loads the file named by `SARTHI_CONFIG` (defaults when unset) and
    /// applies `SARTHI_TRACKING_ENABLED`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the named file cannot be loaded or the
    /// override is not a boolean.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// [`from_env`](Self::from_env) over an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Same as [`from_env`](Self::from_env).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = match lookup(CONFIG_PATH_ENV) {
            Some(path) if !path.trim().is_empty() => Self::load(Path::new(path.trim()))?,
            _ => Self::default(),
        };

        if let Some(value) = lookup(TRACKING_ENABLED_ENV) {
            config.enabled = parse_bool(&value).ok_or_else(|| ConfigError::InvalidFlag {
                name: TRACKING_ENABLED_ENV.to_string(),
                value: value.clone(),
            })?;
        }

        Ok(config)
    }

    /// Checks values serde cannot.
    ///
    /// # Errors
    ///
    /// See [`from_toml_str`](Self::from_toml_str).
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.radii
            .validate()
            .map_err(|(level, radius_km)| ConfigError::InvalidRadius { level, radius_km })?;

        if self.escalation.tick_millis == 0 {
            return Err(ConfigError::InvalidTiming {
                field: "tick_millis".to_string(),
            });
        }

        Ok(())
    }

    /// The monitor's share of the configuration.
    #[must_use]
    pub const fn geofence(&self) -> GeofenceConfig {
        GeofenceConfig {
            radii: self.radii,
            watch: self.watch,
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
