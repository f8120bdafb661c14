//! The geofence monitor.
//!
//! Subscribes to a [`PositionSource`], evaluates every fix against the
//! current [`ZoneSet`] snapshot, and publishes the resulting
//! [`SafetyStatus`] on a `watch` channel. Danger-zone entry and exit edges
//! are additionally broadcast as [`GeofenceEvent`]s.
//!
//! Each watch task holds a liveness gate. `stop_tracking` closes the gate
//! under the same lock the task holds while publishing, so once it returns
//! no fix from the cancelled watch can be observed, even if the task has not
//! been torn down by the runtime yet.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use sarthi_safety_models::{PermissionState, SafetyStatus, TrackingState};
use sarthi_zone::ZoneSet;
use sarthi_zone_models::{Position, RiskZone};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;

use crate::evaluate::evaluate;
use crate::radii::DangerRadii;
use crate::source::{PositionSource, PositionUpdate, PositionWatch, WatchId, WatchOptions};
use crate::LocationError;

/// Capacity of the geofence event channel.
const EVENT_CAPACITY: usize = 32;

/// Monitor configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeofenceConfig {
    /// Danger radius per risk level.
    pub radii: DangerRadii,
    /// Options for the position watch.
    pub watch: WatchOptions,
}

/// Edge events derived from consecutive statuses.
#[derive(Debug, Clone, PartialEq)]
pub enum GeofenceEvent {
    /// The subject moved from outside into an alarming zone.
    EnteredDangerZone {
        /// Closest alarming zone.
        zone: RiskZone,
        /// Distance to its center in kilometers.
        distance_km: f64,
        /// Fix that crossed the boundary.
        location: Position,
    },
    /// The subject is no longer inside any alarming zone.
    LeftDangerZone {
        /// Fix that crossed the boundary.
        location: Position,
    },
}

/// Gate shared between a watch task and `stop_tracking`.
#[derive(Debug, Clone)]
struct Liveness(Arc<Mutex<bool>>);

impl Liveness {
    fn new() -> Self {
        Self(Arc::new(Mutex::new(true)))
    }

    fn lock(&self) -> MutexGuard<'_, bool> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_live(&self) -> bool {
        *self.lock()
    }

    /// Runs `f` only while live, holding the gate for its duration.
    fn run_if_live(&self, f: impl FnOnce()) -> bool {
        let guard = self.lock();
        if *guard {
            f();
        }
        *guard
    }

    /// Closes the gate. Returns whether it was open.
    fn close(&self) -> bool {
        std::mem::replace(&mut *self.lock(), false)
    }
}

struct ActiveWatch {
    id: WatchId,
    liveness: Liveness,
    task: JoinHandle<()>,
}

/// State reachable from watch tasks.
struct Shared {
    zones: ZoneSet,
    radii: DangerRadii,
    /// Whether the previous fix of the current watch was in danger. Entry
    /// and exit edges are measured against this, not the published status,
    /// which outlives the watch.
    in_danger: Mutex<bool>,
    status: watch::Sender<SafetyStatus>,
    tracking: watch::Sender<TrackingState>,
    events: broadcast::Sender<GeofenceEvent>,
}

impl Shared {
    fn on_position_update(&self, position: Position) {
        let zones = self.zones.snapshot();
        let status = evaluate(position, &zones, &self.radii);
        let was_in_danger = std::mem::replace(
            &mut *self.in_danger.lock().unwrap_or_else(PoisonError::into_inner),
            status.is_in_danger_zone,
        );

        let edge = match (&status.current_zone, was_in_danger, status.is_in_danger_zone) {
            (Some(zone), false, true) => {
                log::warn!(
                    "Entered danger zone {} ({}) at {position}, {:.1} km from center",
                    zone.state,
                    zone.risk_level,
                    status.distance_km.unwrap_or_default()
                );
                Some(GeofenceEvent::EnteredDangerZone {
                    zone: zone.clone(),
                    distance_km: status.distance_km.unwrap_or_default(),
                    location: position,
                })
            }
            (_, true, false) => {
                log::info!("Left danger zone at {position}");
                Some(GeofenceEvent::LeftDangerZone { location: position })
            }
            _ => None,
        };

        self.status.send_replace(status);
        if let Some(event) = edge {
            // No subscribers is fine; the status channel still has the value.
            let _ = self.events.send(event);
        }
    }

    fn reset_edge(&self) {
        *self.in_danger.lock().unwrap_or_else(PoisonError::into_inner) = false;
    }

    fn mark_stopped(&self) {
        self.tracking.send_if_modified(|state| {
            if state.is_active() {
                *state = TrackingState::Inactive;
                true
            } else {
                false
            }
        });
    }
}

/// Watches a position source and publishes a [`SafetyStatus`] per fix.
pub struct GeofenceMonitor {
    shared: Arc<Shared>,
    source: Arc<dyn PositionSource>,
    options: WatchOptions,
    location_permission: PermissionState,
    enabled: AtomicBool,
    active: Mutex<Option<ActiveWatch>>,
}

impl GeofenceMonitor {
    /// Creates an idle monitor over `zones`.
    #[must_use]
    pub fn new(source: Arc<dyn PositionSource>, zones: ZoneSet, config: GeofenceConfig) -> Self {
        let (status, _) = watch::channel(SafetyStatus::default());
        let (tracking, _) = watch::channel(TrackingState::Inactive);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            shared: Arc::new(Shared {
                zones,
                radii: config.radii,
                in_danger: Mutex::new(false),
                status,
                tracking,
                events,
            }),
            source,
            options: config.watch,
            location_permission: PermissionState::Prompt,
            enabled: AtomicBool::new(false),
            active: Mutex::new(None),
        }
    }

    /// Records the location permission state checked once at startup.
    ///
    /// With [`PermissionState::Denied`] the monitor never subscribes and
    /// reports [`TrackingState::PermissionDenied`] instead.
    #[must_use]
    pub fn with_location_permission(mut self, permission: PermissionState) -> Self {
        self.location_permission = permission;
        self
    }

    fn active(&self) -> MutexGuard<'_, Option<ActiveWatch>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Starts watching the position source.
    ///
    /// Does nothing when a watch is already live. Failures are logged and
    /// reported through [`tracking_state`](Self::tracking_state) rather
    /// than returned. Must be called from within a Tokio runtime; outside
    /// one the monitor reports [`TrackingState::Failed`].
    pub fn start_tracking(&self) -> TrackingState {
        let mut active = self.active();

        if let Some(current) = active.as_ref() {
            if current.liveness.is_live() {
                return TrackingState::Active;
            }
            // The previous watch ended on its own (error or closed source).
            if let Some(stale) = active.take() {
                stale.task.abort();
            }
        }

        if !self.source.is_supported() {
            log::error!("Geolocation not supported");
            return self.report(TrackingState::Unsupported);
        }

        if self.location_permission == PermissionState::Denied {
            log::warn!("Location permission denied, danger zone alerts are manual-only");
            return self.report(TrackingState::PermissionDenied);
        }

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            log::error!("Cannot start location tracking outside a Tokio runtime");
            return self.report(TrackingState::Failed);
        };

        let PositionWatch { id, updates } = match self.source.watch(&self.options) {
            Ok(watch) => watch,
            Err(e) => {
                log::error!("Failed to start location tracking: {e}");
                return self.report(e.tracking_state());
            }
        };

        self.shared.reset_edge();
        let liveness = Liveness::new();
        let task = runtime.spawn(run_watch(
            Arc::clone(&self.shared),
            Arc::clone(&self.source),
            id,
            updates,
            liveness.clone(),
        ));

        log::info!(
            "Location tracking started (watch {}, {} zones)",
            id.0,
            self.shared.zones.len()
        );
        *active = Some(ActiveWatch { id, liveness, task });
        self.report(TrackingState::Active)
    }

    /// Stops watching. Idempotent.
    ///
    /// Once this returns, no fix from the cancelled watch is evaluated or
    /// published.
    pub fn stop_tracking(&self) {
        let Some(watch) = self.active().take() else {
            return;
        };

        watch.liveness.close();
        watch.task.abort();
        self.source.clear_watch(watch.id);
        self.shared.reset_edge();
        self.shared.mark_stopped();
        log::info!("Location tracking stopped (watch {})", watch.id.0);
    }

    /// Enables or disables automatic tracking.
    ///
    /// Tracking runs while enabled and at least one zone is loaded.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
        self.sync_tracking();
    }

    fn sync_tracking(&self) {
        if self.enabled.load(Ordering::Acquire) && !self.shared.zones.is_empty() {
            self.start_tracking();
        } else {
            self.stop_tracking();
        }
    }

    /// Swaps in a new zone list and re-applies the enabled gate.
    pub fn replace_zones(&self, zones: Vec<RiskZone>) {
        self.shared.zones.replace(zones);
        self.sync_tracking();
    }

    /// Evaluates `position` and publishes the result.
    ///
    /// Watch tasks call this for every accepted fix; hosts that receive
    /// fixes some other way may call it directly.
    pub fn on_position_update(&self, position: Position) {
        self.shared.on_position_update(position);
    }

    /// Latest published status.
    #[must_use]
    pub fn status(&self) -> SafetyStatus {
        self.shared.status.borrow().clone()
    }

    /// Subscribes to status updates. Every fix marks the value changed,
    /// even when the status is identical.
    #[must_use]
    pub fn subscribe_status(&self) -> watch::Receiver<SafetyStatus> {
        self.shared.status.subscribe()
    }

    /// Subscribes to danger-zone entry and exit events.
    #[must_use]
    pub fn subscribe_events(&self) -> broadcast::Receiver<GeofenceEvent> {
        self.shared.events.subscribe()
    }

    /// Current tracking state.
    #[must_use]
    pub fn tracking_state(&self) -> TrackingState {
        *self.shared.tracking.borrow()
    }

    /// Subscribes to tracking state changes.
    #[must_use]
    pub fn subscribe_tracking(&self) -> watch::Receiver<TrackingState> {
        self.shared.tracking.subscribe()
    }

    /// The shared zone list.
    #[must_use]
    pub fn zones(&self) -> &ZoneSet {
        &self.shared.zones
    }

    fn report(&self, state: TrackingState) -> TrackingState {
        self.shared.tracking.send_replace(state);
        state
    }
}

impl Drop for GeofenceMonitor {
    fn drop(&mut self) {
        self.stop_tracking();
    }
}

async fn run_watch(
    shared: Arc<Shared>,
    source: Arc<dyn PositionSource>,
    id: WatchId,
    mut updates: mpsc::UnboundedReceiver<PositionUpdate>,
    liveness: Liveness,
) {
    while let Some(update) = updates.recv().await {
        match update {
            Ok(fix) => match fix.into_position() {
                Ok(position) => {
                    if !liveness.run_if_live(|| shared.on_position_update(position)) {
                        return;
                    }
                }
                Err(e) => log::warn!("Ignoring invalid position fix: {e}"),
            },
            Err(e) if e.is_transient() => {
                log::debug!("Transient location error, keeping last status: {e}");
            }
            Err(e) => {
                log::error!("Location tracking error: {e}");
                if liveness.close() {
                    shared.tracking.send_replace(e.tracking_state());
                    source.clear_watch(id);
                }
                return;
            }
        }
    }

    if liveness.close() {
        log::warn!("Position source closed watch {}", id.0);
        shared.mark_stopped();
    }
}
