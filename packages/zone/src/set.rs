//! Shared, atomically replaceable zone list.

use std::sync::{Arc, PoisonError, RwLock};

use sarthi_zone_models::RiskZone;

/// The zone list shared between the data-loading layer and the geofence.
///
/// Readers take a [`snapshot`](Self::snapshot), an `Arc` to an immutable
/// slice, and evaluate against it without holding any lock. Replacement
/// swaps in a brand-new slice, so a reader mid-evaluation keeps seeing the
/// list it started with and never a half-updated one.
#[derive(Debug, Clone, Default)]
pub struct ZoneSet {
    current: Arc<RwLock<Arc<[RiskZone]>>>,
}

impl ZoneSet {
    /// Creates a set holding `zones`.
    #[must_use]
    pub fn new(zones: Vec<RiskZone>) -> Self {
        Self {
            current: Arc::new(RwLock::new(zones.into())),
        }
    }

    /// Returns the current zone list.
    #[must_use]
    pub fn snapshot(&self) -> Arc<[RiskZone]> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Replaces the whole list. Existing snapshots are unaffected.
    pub fn replace(&self, zones: Vec<RiskZone>) {
        let next: Arc<[RiskZone]> = zones.into();
        log::debug!("Replacing zone set with {} zones", next.len());
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = next;
    }

    /// Number of zones in the current list.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    /// Whether the current list is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::all_fallback_zones;

    #[test]
    fn replace_does_not_touch_existing_snapshots() {
        let set = ZoneSet::new(all_fallback_zones());
        let before = set.snapshot();

        set.replace(Vec::new());

        assert_eq!(before.len(), 5);
        assert!(set.is_empty());
    }

    #[test]
    fn clones_share_the_same_list() {
        let set = ZoneSet::default();
        let shared = set.clone();
        set.replace(all_fallback_zones());
        assert_eq!(shared.len(), 5);
    }
}
