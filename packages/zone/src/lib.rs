#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Risk zone catalog.
//!
//! Holds the compile-time fallback zones, the filters used when listing
//! zones, the state-center table used to place report rows on the map, and
//! [`ZoneSet`], the snapshot list the geofence monitor reads from.

pub mod catalog;
pub mod coordinates;
pub mod registry;
pub mod set;

pub use catalog::{ZoneFilter, filter_zones, find_by_state, is_displayable};
pub use coordinates::{is_known_state, state_coordinates};
pub use registry::{all_fallback_zones, parse_zones};
pub use set::ZoneSet;

use thiserror::Error;

/// Errors that can occur while loading zone lists.
#[derive(Debug, Error)]
pub enum ZoneError {
    /// The zone document was not valid TOML or had invalid values.
    #[error("Zone parse error: {0}")]
    Parse(#[from] toml::de::Error),
}
