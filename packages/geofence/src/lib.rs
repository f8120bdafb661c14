#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Geofence monitor for danger-zone detection.
//!
//! Compares a live stream of position fixes against a fixed set of risk
//! zones. Each zone is a circle around its center whose radius depends on
//! the zone's risk level ([`DangerRadii`]); distances are great-circle
//! distances from the haversine formula. The monitor publishes a
//! [`SafetyStatus`](sarthi_safety_models::SafetyStatus) for every fix and
//! broadcasts [`GeofenceEvent`]s when the subject enters or leaves an
//! alarming zone.

pub mod channel;
pub mod distance;
pub mod evaluate;
pub mod monitor;
pub mod radii;
pub mod source;

pub use channel::ChannelSource;
pub use distance::haversine_km;
pub use evaluate::evaluate;
pub use monitor::{GeofenceConfig, GeofenceEvent, GeofenceMonitor};
pub use radii::DangerRadii;
pub use source::{PositionSource, PositionUpdate, PositionWatch, RawFix, WatchId, WatchOptions};

use sarthi_safety_models::TrackingState;
use thiserror::Error;

/// Errors reported by a [`PositionSource`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocationError {
    /// The user denied the location permission.
    #[error("Location permission denied")]
    PermissionDenied,

    /// The platform could not determine a position right now.
    #[error("Position unavailable: {message}")]
    Unavailable {
        /// Platform-provided detail.
        message: String,
    },

    /// No fix arrived within the configured timeout.
    #[error("Timed out waiting for a position fix")]
    Timeout,

    /// The platform has no location capability.
    #[error("Geolocation not supported")]
    Unsupported,
}

impl LocationError {
    /// Whether the watch should keep listening after this error.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout | Self::Unavailable { .. })
    }

    /// Tracking state to report when this error ends a watch.
    #[must_use]
    pub const fn tracking_state(&self) -> TrackingState {
        match self {
            Self::PermissionDenied => TrackingState::PermissionDenied,
            Self::Unsupported => TrackingState::Unsupported,
            Self::Unavailable { .. } | Self::Timeout => TrackingState::Failed,
        }
    }
}
