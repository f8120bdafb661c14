//! Per-fix danger-zone evaluation.

use sarthi_safety_models::SafetyStatus;
use sarthi_zone_models::{Position, RiskZone};

use crate::distance::haversine_km;
use crate::radii::DangerRadii;

/// Evaluates one position against the zone list.
///
/// The current zone is the closest zone whose center lies strictly within
/// its own danger radius. The danger flag is set only when that zone is
/// high or critical risk; a closer low-risk zone therefore masks a farther
/// alarming one. Equal distances keep the zone listed first.
#[must_use]
pub fn evaluate(position: Position, zones: &[RiskZone], radii: &DangerRadii) -> SafetyStatus {
    let closest = zones
        .iter()
        .filter_map(|zone| {
            let distance = haversine_km(&position, &zone.center);
            (distance < radii.radius_km(zone.risk_level)).then_some((zone, distance))
        })
        .fold(None::<(&RiskZone, f64)>, |best, (zone, distance)| match best {
            Some((_, best_distance)) if best_distance <= distance => best,
            _ => Some((zone, distance)),
        });

    match closest {
        Some((zone, distance)) => SafetyStatus {
            is_in_danger_zone: zone.risk_level.is_alarming(),
            current_zone: Some(zone.clone()),
            user_location: Some(position),
            distance_km: Some(distance),
        },
        None => SafetyStatus {
            is_in_danger_zone: false,
            current_zone: None,
            user_location: Some(position),
            distance_km: None,
        },
    }
}
