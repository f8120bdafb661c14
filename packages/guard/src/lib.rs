#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Safety guard.
//!
//! Connects the geofence monitor to emergency escalation: entering a high or
//! critical risk zone shows a notification (when permitted) and opens an
//! alert session. Also loads the [`GuardConfig`] that configures both.

pub mod config;
pub mod guard;
pub mod notify;
pub mod permission;

pub use config::{GuardConfig, NotificationConfig};
pub use guard::{Collaborators, SafetyGuard};
pub use notify::{LogNotifier, Notifier};
pub use permission::{PermissionProbe, Permissions};

use sarthi_zone_models::RiskLevel;
use thiserror::Error;

/// Errors loading a [`GuardConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("Failed to read config file {path}: {source}")]
    Read {
        /// Path that was read.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The config file is not valid TOML for the expected shape.
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A danger radius is not a positive, finite number.
    #[error("Invalid {level} danger radius: {radius_km} km")]
    InvalidRadius {
        /// Level with the bad radius.
        level: RiskLevel,
        /// Configured radius.
        radius_km: f64,
    },

    /// A timing value is out of range.
    #[error("Invalid escalation timing: {field}")]
    InvalidTiming {
        /// Offending field.
        field: String,
    },

    /// An environment flag is not a boolean.
    #[error("Invalid value for {name}: {value:?}")]
    InvalidFlag {
        /// Variable name.
        name: String,
        /// Value found.
        value: String,
    },
}

/// Errors from a [`Notifier`].
#[derive(Debug, Error)]
pub enum NotifyError {
    /// The platform refused to show the notification.
    #[error("Notification rejected: {message}")]
    Rejected {
        /// Platform detail.
        message: String,
    },
}
