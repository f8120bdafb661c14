#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Position, risk level, and risk zone types.
//!
//! These types are shared by the zone catalog, the geofence monitor, and the
//! escalation layer. A [`Position`] can only be built through validation, so
//! everything downstream of the location source may assume finite,
//! in-range coordinates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use thiserror::Error;

/// Error returned when a raw fix does not describe a point on Earth.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum InvalidPositionError {
    /// Latitude was NaN, infinite, or outside -90..=90.
    #[error("invalid latitude {0}: expected a finite value in -90..=90")]
    Latitude(f64),
    /// Longitude was NaN, infinite, or outside -180..=180.
    #[error("invalid longitude {0}: expected a finite value in -180..=180")]
    Longitude(f64),
    /// Accuracy radius was negative or not finite.
    #[error("invalid accuracy {0}: expected a finite, non-negative value in meters")]
    Accuracy(f64),
}

/// A validated geographic position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawPosition")]
pub struct Position {
    /// Latitude in degrees.
    lat: f64,
    /// Longitude in degrees.
    lng: f64,
    /// Reported accuracy radius in meters, if the source provided one.
    #[serde(skip_serializing_if = "Option::is_none")]
    accuracy_m: Option<f64>,
    /// When the source took the fix.
    #[serde(skip_serializing_if = "Option::is_none")]
    timestamp: Option<DateTime<Utc>>,
}

/// Unvalidated wire shape of a [`Position`].
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPosition {
    lat: f64,
    lng: f64,
    #[serde(default)]
    accuracy_m: Option<f64>,
    #[serde(default)]
    timestamp: Option<DateTime<Utc>>,
}

impl TryFrom<RawPosition> for Position {
    type Error = InvalidPositionError;

    fn try_from(raw: RawPosition) -> Result<Self, Self::Error> {
        let mut position = Self::new(raw.lat, raw.lng)?;
        if let Some(accuracy) = raw.accuracy_m {
            position = position.with_accuracy(accuracy)?;
        }
        if let Some(timestamp) = raw.timestamp {
            position = position.with_timestamp(timestamp);
        }
        Ok(position)
    }
}

impl Position {
    /// Creates a position from latitude and longitude in degrees.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidPositionError`] if either coordinate is not finite
    /// or lies outside its valid range.
    pub fn new(lat: f64, lng: f64) -> Result<Self, InvalidPositionError> {
        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(InvalidPositionError::Latitude(lat));
        }
        if !lng.is_finite() || !(-180.0..=180.0).contains(&lng) {
            return Err(InvalidPositionError::Longitude(lng));
        }
        Ok(Self {
            lat,
            lng,
            accuracy_m: None,
            timestamp: None,
        })
    }

    /// Attaches the source-reported accuracy radius in meters.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidPositionError::Accuracy`] if the value is negative
    /// or not finite.
    pub fn with_accuracy(mut self, accuracy_m: f64) -> Result<Self, InvalidPositionError> {
        if !accuracy_m.is_finite() || accuracy_m < 0.0 {
            return Err(InvalidPositionError::Accuracy(accuracy_m));
        }
        self.accuracy_m = Some(accuracy_m);
        Ok(self)
    }

    /// Attaches the time the fix was taken.
    #[must_use]
    pub const fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Latitude in degrees.
    #[must_use]
    pub const fn lat(&self) -> f64 {
        self.lat
    }

    /// Longitude in degrees.
    #[must_use]
    pub const fn lng(&self) -> f64 {
        self.lng
    }

    /// Source-reported accuracy radius in meters.
    #[must_use]
    pub const fn accuracy_m(&self) -> Option<f64> {
        self.accuracy_m
    }

    /// Time the fix was taken, if known.
    #[must_use]
    pub const fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamp
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.4}, {:.4}", self.lat, self.lng)
    }
}

/// Risk level of a zone, ordered from least to most dangerous.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum RiskLevel {
    /// Fewer than 2,000 recorded crimes per year.
    Low,
    /// 2,000 to 4,999 recorded crimes per year.
    Medium,
    /// 5,000 to 9,999 recorded crimes per year.
    High,
    /// 10,000 or more recorded crimes per year.
    Critical,
}

impl RiskLevel {
    /// Whether entering a zone of this level raises an emergency alert.
    ///
    /// Low and medium zones are still reported as the current zone but never
    /// alarm.
    #[must_use]
    pub const fn is_alarming(self) -> bool {
        matches!(self, Self::High | Self::Critical)
    }

    /// Classifies a yearly total of recorded crimes against women.
    #[must_use]
    pub const fn from_total_crimes(total_crimes: u32) -> Self {
        match total_crimes {
            0..2_000 => Self::Low,
            2_000..5_000 => Self::Medium,
            5_000..10_000 => Self::High,
            _ => Self::Critical,
        }
    }

    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Low, Self::Medium, Self::High, Self::Critical]
    }
}

/// A geographic risk zone: a center point whose danger radius is derived
/// from its [`RiskLevel`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskZone {
    /// Stable identifier.
    pub id: String,
    /// State or city name shown to the user (e.g. "Delhi").
    pub state: String,
    /// Reporting year the crime totals belong to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<u16>,
    /// Zone center.
    pub center: Position,
    /// Risk classification.
    pub risk_level: RiskLevel,
    /// Recorded crimes against women in the reporting year.
    pub total_crimes: u32,
    /// Most frequent crime type, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highest_crime_type: Option<String>,
}
