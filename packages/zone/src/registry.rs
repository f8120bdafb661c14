//! Compile-time registry of fallback risk zones.
//!
//! The zone list is embedded via `include_str!` and served whenever the
//! crime-zone provider has nothing parsed yet, so the geofence always has
//! a baseline to evaluate against.

use sarthi_zone_models::{Position, RiskLevel, RiskZone};
use serde::Deserialize;

use crate::catalog::find_by_state;
use crate::coordinates::{is_known_state, state_coordinates};

/// Number of embedded fallback zones. Enforced by a test.
#[cfg(test)]
const EXPECTED_ZONE_COUNT: usize = 5;

/// Embedded TOML zone definitions.
const FALLBACK_TOML: &str = include_str!("../zones/fallback.toml");

#[derive(Debug, Deserialize)]
struct FallbackFile {
    zones: Vec<ZoneEntry>,
}

/// One `[[zones]]` table in the embedded TOML.
///
/// Report rows usually carry only a state name and totals, so the center
/// and the risk level may be left out and are derived instead.
#[derive(Debug, Deserialize)]
struct ZoneEntry {
    id: String,
    state: String,
    year: Option<u16>,
    center: Option<Position>,
    risk_level: Option<RiskLevel>,
    total_crimes: u32,
    highest_crime_type: Option<String>,
}

impl From<ZoneEntry> for RiskZone {
    fn from(entry: ZoneEntry) -> Self {
        let center = entry.center.unwrap_or_else(|| {
            if !is_known_state(&entry.state) {
                log::warn!(
                    "No center known for {}, placing zone {} at the centre of India",
                    entry.state,
                    entry.id
                );
            }
            state_coordinates(&entry.state)
        });

        Self {
            risk_level: entry
                .risk_level
                .unwrap_or_else(|| RiskLevel::from_total_crimes(entry.total_crimes)),
            id: entry.id,
            state: entry.state,
            year: entry.year,
            center,
            total_crimes: entry.total_crimes,
            highest_crime_type: entry.highest_crime_type,
        }
    }
}

/// Keeps the most recent reporting year for each state.
fn latest_per_state(zones: impl IntoIterator<Item = RiskZone>) -> Vec<RiskZone> {
    let mut latest: Vec<RiskZone> = Vec::new();

    for zone in zones {
        let superseded = find_by_state(&latest, &zone.state).map(|kept| kept.year < zone.year);
        match superseded {
            None => latest.push(zone),
            Some(true) => {
                latest.retain(|kept| !kept.state.trim().eq_ignore_ascii_case(zone.state.trim()));
                latest.push(zone);
            }
            Some(false) => log::debug!("Skipping older row {} for {}", zone.id, zone.state),
        }
    }

    latest
}

/// Parses a zone list in the fallback TOML layout.
///
/// Missing centers come from [`state_coordinates`], missing risk levels from
/// [`RiskLevel::from_total_crimes`], and only the latest year of each state
/// is kept.
///
/// # Errors
///
/// Returns [`crate::ZoneError::Parse`] if the document is not valid TOML or
/// a zone has an invalid center.
pub fn parse_zones(toml_str: &str) -> Result<Vec<RiskZone>, crate::ZoneError> {
    let file: FallbackFile = toml::de::from_str(toml_str)?;
    Ok(latest_per_state(file.zones.into_iter().map(RiskZone::from)))
}

/// Returns all embedded fallback zones.
///
/// # Panics
///
/// Panics if the embedded TOML fails to parse. Since it is a compile-time
/// constant, a parse failure is a development error and is caught by the
/// tests below.
#[must_use]
pub fn all_fallback_zones() -> Vec<RiskZone> {
    parse_zones(FALLBACK_TOML)
        .unwrap_or_else(|e| panic!("Failed to parse embedded fallback zones: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn loads_all_zones() {
        let zones = all_fallback_zones();
        assert_eq!(
            zones.len(),
            EXPECTED_ZONE_COUNT,
            "Expected {EXPECTED_ZONE_COUNT} fallback zones, found {}. \
             Update EXPECTED_ZONE_COUNT after adding/removing zones.",
            zones.len()
        );
    }

    #[test]
    fn zone_ids_are_unique() {
        let mut seen = BTreeSet::new();
        for zone in &all_fallback_zones() {
            assert!(seen.insert(zone.id.clone()), "Duplicate zone ID: {}", zone.id);
        }
    }

    #[test]
    fn zones_have_required_fields() {
        for zone in &all_fallback_zones() {
            assert!(!zone.state.is_empty(), "Zone {} has empty state", zone.id);
            assert!(zone.total_crimes > 0, "Zone {} has no crimes", zone.id);
        }
    }

    #[test]
    fn rejects_invalid_center() {
        let toml_str = r#"
            [[zones]]
            id = "bad"
            state = "NOWHERE"
            center = { lat = 200.0, lng = 0.0 }
            risk_level = "low"
            total_crimes = 1
        "#;
        assert!(parse_zones(toml_str).is_err());
    }

    #[test]
    fn derives_missing_center_and_risk_level() {
        let toml_str = r#"
            [[zones]]
            id = "bihar-2021"
            state = "Bihar"
            year = 2021
            total_crimes = 6200

            [[zones]]
            id = "goa-2021"
            state = "GOA"
            year = 2021
            total_crimes = 150
        "#;
        let zones = parse_zones(toml_str).unwrap();

        assert_eq!(zones[0].center, state_coordinates("BIHAR"));
        assert_eq!(zones[0].risk_level, RiskLevel::High);
        assert_eq!(zones[1].center, state_coordinates("nowhere"));
        assert_eq!(zones[1].risk_level, RiskLevel::Low);
    }

    #[test]
    fn keeps_latest_year_per_state() {
        let toml_str = r#"
            [[zones]]
            id = "delhi-2021"
            state = "DELHI"
            year = 2021
            total_crimes = 4800

            [[zones]]
            id = "delhi-2020"
            state = "Delhi"
            year = 2020
            total_crimes = 4500

            [[zones]]
            id = "punjab-2020"
            state = "PUNJAB"
            year = 2020
            total_crimes = 900

            [[zones]]
            id = "punjab-2022"
            state = "PUNJAB"
            year = 2022
            total_crimes = 1100
        "#;
        let zones = parse_zones(toml_str).unwrap();
        let ids: Vec<&str> = zones.iter().map(|z| z.id.as_str()).collect();

        assert_eq!(ids, vec!["delhi-2021", "punjab-2022"]);
    }
}
