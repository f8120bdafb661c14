//! Position source contract.
//!
//! Host platforms deliver fixes through callbacks; here a watch is a
//! channel of [`PositionUpdate`]s plus an id that releases it again. The
//! monitor never trusts a raw fix: it goes through [`RawFix::into_position`]
//! before anything else sees it.

use std::time::Duration;

use chrono::{DateTime, Utc};
use sarthi_zone_models::{InvalidPositionError, Position};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::LocationError;

/// Options passed to [`PositionSource::watch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchOptions {
    /// Ask the platform for its most accurate fix (GPS over network).
    pub high_accuracy: bool,
    /// How long to wait for a fix before reporting [`LocationError::Timeout`].
    #[serde(with = "secs")]
    pub timeout: Duration,
    /// Maximum age of a cached fix the platform may return.
    #[serde(with = "secs")]
    pub maximum_age: Duration,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            timeout: Duration::from_secs(10),
            maximum_age: Duration::from_secs(5),
        }
    }
}

mod secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

/// A fix as reported by the platform, before validation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawFix {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Accuracy radius in meters.
    pub accuracy: Option<f64>,
    /// When the fix was taken.
    pub timestamp: Option<DateTime<Utc>>,
}

impl RawFix {
    /// Builds a fix with coordinates only.
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            accuracy: None,
            timestamp: None,
        }
    }

    /// Validates the fix into a [`Position`].
    ///
    /// # Errors
    ///
    /// Returns [`InvalidPositionError`] if a coordinate or the accuracy is
    /// out of range.
    pub fn into_position(self) -> Result<Position, InvalidPositionError> {
        let mut position = Position::new(self.latitude, self.longitude)?;
        if let Some(accuracy) = self.accuracy {
            position = position.with_accuracy(accuracy)?;
        }
        if let Some(timestamp) = self.timestamp {
            position = position.with_timestamp(timestamp);
        }
        Ok(position)
    }
}

/// One delivery from a watch: a fix or an error.
pub type PositionUpdate = Result<RawFix, LocationError>;

/// Identifies a watch for [`PositionSource::clear_watch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WatchId(pub u64);

/// A live subscription returned by [`PositionSource::watch`].
#[derive(Debug)]
pub struct PositionWatch {
    /// Id to pass to [`PositionSource::clear_watch`].
    pub id: WatchId,
    /// Fixes and errors, in delivery order.
    pub updates: mpsc::UnboundedReceiver<PositionUpdate>,
}

/// A continuous source of position fixes.
pub trait PositionSource: Send + Sync {
    /// Whether the platform has any location capability at all.
    fn is_supported(&self) -> bool;

    /// Starts delivering fixes. May prompt the user for permission.
    ///
    /// # Errors
    ///
    /// Returns [`LocationError`] if the watch cannot be started.
    fn watch(&self, options: &WatchOptions) -> Result<PositionWatch, LocationError>;

    /// Stops delivering fixes for `id`. Unknown ids are ignored.
    fn clear_watch(&self, id: WatchId);
}
