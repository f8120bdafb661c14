//! Approximate state centers used to place crime report rows on the map.

use sarthi_zone_models::Position;

/// Center of India, used for states without a known center.
pub const INDIA_CENTER: (f64, f64) = (20.5937, 78.9629);

/// Known state centers, keyed by upper-case state name.
const STATE_CENTERS: &[(&str, f64, f64)] = &[
    ("DELHI", 28.7041, 77.1025),
    ("MAHARASHTRA", 19.7515, 75.7139),
    ("UTTAR PRADESH", 26.8467, 80.9462),
    ("WEST BENGAL", 22.9868, 87.8550),
    ("KARNATAKA", 15.3173, 75.7139),
    ("TAMIL NADU", 11.1271, 78.6569),
    ("BIHAR", 25.0961, 85.3131),
    ("GUJARAT", 22.2587, 71.1924),
    ("PUNJAB", 31.1471, 75.3412),
    ("RAJASTHAN", 27.0238, 74.2179),
];

/// Returns the approximate center of a state.
///
/// Matching ignores case and surrounding whitespace. Unknown states fall
/// back to [`INDIA_CENTER`].
///
/// # Panics
///
/// Panics if the built-in center table holds an out-of-range coordinate.
/// The table is a compile-time constant checked by the tests below.
#[must_use]
pub fn state_coordinates(state: &str) -> Position {
    let wanted = state.trim().to_uppercase();
    let (lat, lng) = STATE_CENTERS
        .iter()
        .find(|(name, _, _)| *name == wanted)
        .map_or(INDIA_CENTER, |&(_, lat, lng)| (lat, lng));

    Position::new(lat, lng)
        .unwrap_or_else(|e| panic!("State center table entry for {wanted} is invalid: {e}"))
}

/// Whether the state has a known center (rather than the India fallback).
#[must_use]
pub fn is_known_state(state: &str) -> bool {
    let wanted = state.trim().to_uppercase();
    STATE_CENTERS.iter().any(|(name, _, _)| *name == wanted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_case_and_whitespace_insensitively() {
        let delhi = state_coordinates("  delhi ");
        assert!((delhi.lat() - 28.7041).abs() < 1e-9);
        assert!((delhi.lng() - 77.1025).abs() < 1e-9);

        let tn = state_coordinates("Tamil Nadu");
        assert!((tn.lat() - 11.1271).abs() < 1e-9);
    }

    #[test]
    fn every_table_entry_is_a_valid_position() {
        for (name, _, _) in STATE_CENTERS {
            assert!(is_known_state(name));
            let _ = state_coordinates(name);
        }
    }

    #[test]
    fn unknown_state_falls_back_to_india_center() {
        let position = state_coordinates("ATLANTIS");
        assert!((position.lat() - INDIA_CENTER.0).abs() < 1e-9);
        assert!((position.lng() - INDIA_CENTER.1).abs() < 1e-9);
        assert!(!is_known_state("ATLANTIS"));
    }
}
