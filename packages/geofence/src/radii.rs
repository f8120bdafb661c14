//! Danger radius per risk level.

use sarthi_zone_models::RiskLevel;
use serde::{Deserialize, Serialize};

/// Danger radius in kilometers for each [`RiskLevel`].
///
/// Deployment configuration; [`Default`] is the canonical table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DangerRadii {
    /// Radius for [`RiskLevel::Critical`] zones.
    pub critical_km: f64,
    /// Radius for [`RiskLevel::High`] zones.
    pub high_km: f64,
    /// Radius for [`RiskLevel::Medium`] zones.
    pub medium_km: f64,
    /// Radius for [`RiskLevel::Low`] zones.
    pub low_km: f64,
}

impl Default for DangerRadii {
    fn default() -> Self {
        Self {
            critical_km: 60.0,
            high_km: 40.0,
            medium_km: 25.0,
            low_km: 15.0,
        }
    }
}

impl DangerRadii {
    /// Radius for a zone of the given risk level.
    #[must_use]
    pub const fn radius_km(&self, level: RiskLevel) -> f64 {
        match level {
            RiskLevel::Critical => self.critical_km,
            RiskLevel::High => self.high_km,
            RiskLevel::Medium => self.medium_km,
            RiskLevel::Low => self.low_km,
        }
    }

    /// Checks that every radius is finite and positive.
    ///
    /// # Errors
    ///
    /// Returns the first offending risk level and its radius.
    pub fn validate(&self) -> Result<(), (RiskLevel, f64)> {
        for &level in RiskLevel::all() {
            let radius = self.radius_km(level);
            if !radius.is_finite() || radius <= 0.0 {
                return Err((level, radius));
            }
        }
        Ok(())
    }
}
