//! Zone listing filters.
//!
//! Crime report rows come out of a line-splitting PDF parser, so the list
//! served to the map and to the geofence is cleaned first: rows with parser
//! artefacts in the state name, empty totals, or years outside the reporting
//! window are dropped, and the remainder is ordered worst first.

use std::ops::RangeInclusive;

use sarthi_zone_models::{RiskLevel, RiskZone};

/// Reporting years accepted for display.
pub const REPORTING_YEARS: RangeInclusive<u16> = 2020..=2025;

/// Optional criteria for narrowing a zone list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ZoneFilter {
    /// Exact state name, compared case-insensitively.
    pub state: Option<String>,
    /// Substring of the state name, compared case-insensitively.
    pub search: Option<String>,
    /// Exact risk level.
    pub risk_level: Option<RiskLevel>,
}

impl ZoneFilter {
    /// Whether a zone satisfies every criterion that is set.
    #[must_use]
    pub fn matches(&self, zone: &RiskZone) -> bool {
        if let Some(state) = &self.state
            && !zone.state.eq_ignore_ascii_case(state)
        {
            return false;
        }
        if let Some(search) = &self.search
            && !zone
                .state
                .to_lowercase()
                .contains(&search.to_lowercase())
        {
            return false;
        }
        self.risk_level.is_none_or(|level| zone.risk_level == level)
    }
}

/// Whether a zone row is clean enough to show and to geofence against.
#[must_use]
pub fn is_displayable(zone: &RiskZone) -> bool {
    !zone.state.trim().is_empty()
        && !zone.state.contains("<<")
        && !zone.state.contains("TYPE")
        && zone.total_crimes > 0
        && zone.year.is_none_or(|year| REPORTING_YEARS.contains(&year))
}

/// Applies `filter` and the display rules, sorted by total crimes
/// descending.
#[must_use]
pub fn filter_zones(zones: &[RiskZone], filter: &ZoneFilter) -> Vec<RiskZone> {
    let mut filtered: Vec<RiskZone> = zones
        .iter()
        .filter(|zone| filter.matches(zone) && is_displayable(zone))
        .cloned()
        .collect();

    filtered.sort_by(|a, b| b.total_crimes.cmp(&a.total_crimes));
    filtered
}

/// Finds the zone for a state, ignoring case and surrounding whitespace.
#[must_use]
pub fn find_by_state<'a>(zones: &'a [RiskZone], state: &str) -> Option<&'a RiskZone> {
    let wanted = state.trim();
    zones
        .iter()
        .find(|zone| zone.state.trim().eq_ignore_ascii_case(wanted))
}
