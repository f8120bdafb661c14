//! The safety guard: geofence monitor, escalation and notifications wired
//! together.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use sarthi_escalation::{AudioPlayer, EscalationController, SosDispatcher};
use sarthi_geofence::{GeofenceEvent, GeofenceMonitor, PositionSource};
use sarthi_safety_models::{TrackingState, Trigger};
use sarthi_zone::ZoneSet;
use sarthi_zone_models::Position;
use tokio::{
    sync::broadcast::{self, error::RecvError},
    task::JoinHandle,
};
use uuid::Uuid;

use crate::{
    config::{GuardConfig, NotificationConfig},
    notify::{Notifier, render},
    permission::{PermissionProbe, Permissions},
};

/// Host-provided collaborators.
pub struct Collaborators {
    /// Position fixes.
    pub source: Arc<dyn PositionSource>,
    /// Alarm sound.
    pub audio: Arc<dyn AudioPlayer>,
    /// Emergency services.
    pub sos: Arc<dyn SosDispatcher>,
    /// System notifications.
    pub notifier: Arc<dyn Notifier>,
    /// Permission states, queried once.
    pub permissions: Arc<dyn PermissionProbe>,
}

/// Reacts to geofence events.
struct Responder {
    escalation: Arc<EscalationController>,
    notifier: Arc<dyn Notifier>,
    permissions: Permissions,
    notification: NotificationConfig,
}

impl Responder {
    fn handle(&self, event: GeofenceEvent) {
        match event {
            GeofenceEvent::EnteredDangerZone {
                zone,
                distance_km,
                location,
            } => {
                log::debug!("Escalating entry into {} ({})", zone.state, zone.risk_level);

                if self.permissions.may_notify() {
                    let (title, body) = render(&self.notification, &zone, distance_km);
                    if let Err(e) = self.notifier.notify(&title, &body) {
                        log::warn!("Failed to show danger zone notification: {e}");
                    }
                } else {
                    log::debug!("Notification permission not granted, skipping notification");
                }

                self.escalation.open(Trigger::DangerZone {
                    zone,
                    distance_km,
                    location,
                });
            }
            GeofenceEvent::LeftDangerZone { location } => {
                log::debug!("Subject left the danger zone at {location}, open session stays open");
            }
        }
    }
}

/// Watches the subject's position and escalates on danger-zone entry.
pub struct SafetyGuard {
    monitor: GeofenceMonitor,
    escalation: Arc<EscalationController>,
    responder: Arc<Responder>,
    enabled: bool,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl SafetyGuard {
    /// Builds an idle guard. Permissions are queried here, once.
    #[must_use]
    pub fn new(config: &GuardConfig, zones: ZoneSet, collaborators: Collaborators) -> Self {
        let Collaborators {
            source,
            audio,
            sos,
            notifier,
            permissions,
        } = collaborators;

        let permissions = Permissions::probe(permissions.as_ref());
        let monitor = GeofenceMonitor::new(source, zones, config.geofence())
            .with_location_permission(permissions.location);
        let escalation = Arc::new(EscalationController::new(config.escalation, audio, sos));

        Self {
            monitor,
            responder: Arc::new(Responder {
                escalation: Arc::clone(&escalation),
                notifier,
                permissions,
                notification: config.notification.clone(),
            }),
            escalation,
            enabled: config.enabled,
            listener: Mutex::new(None),
        }
    }

    fn listener(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.listener.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Starts listening for danger-zone entries and, when enabled, tracking.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&self) -> TrackingState {
        {
            let mut listener = self.listener();
            if listener.is_none() {
                match tokio::runtime::Handle::try_current() {
                    Ok(runtime) => {
                        let events = self.monitor.subscribe_events();
                        *listener = Some(runtime.spawn(listen(events, Arc::clone(&self.responder))));
                    }
                    Err(e) => {
                        log::error!("Cannot start safety guard outside a Tokio runtime: {e}");
                        return TrackingState::Failed;
                    }
                }
            }
        }

        self.monitor.set_enabled(self.enabled);
        let state = self.monitor.tracking_state();
        log::info!("Safety guard started (tracking {state})");
        state
    }

    /// Opens a manual alert session, as the "test alert" button does.
    pub fn test_alert(&self, location: Option<Position>) -> Uuid {
        let location = location.or_else(|| self.monitor.status().user_location);
        self.escalation.open(Trigger::Manual { location })
    }

    /// Stops tracking, closes any open session and stops listening.
    pub fn shutdown(&self) {
        self.monitor.set_enabled(false);
        self.escalation.close();
        if let Some(listener) = self.listener().take() {
            listener.abort();
        }
        log::info!("Safety guard stopped");
    }

    /// The geofence monitor.
    #[must_use]
    pub const fn monitor(&self) -> &GeofenceMonitor {
        &self.monitor
    }

    /// The escalation controller.
    #[must_use]
    pub fn escalation(&self) -> &EscalationController {
        &self.escalation
    }

    /// Permission states captured at construction.
    #[must_use]
    pub fn permissions(&self) -> Permissions {
        self.responder.permissions
    }
}

impl Drop for SafetyGuard {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn listen(mut events: broadcast::Receiver<GeofenceEvent>, responder: Arc<Responder>) {
    loop {
        match events.recv().await {
            Ok(event) => responder.handle(event),
            Err(RecvError::Lagged(skipped)) => {
                log::warn!("Safety guard lagged, skipped {skipped} geofence events");
            }
            Err(RecvError::Closed) => {
                log::debug!("Geofence event stream closed");
                break;
            }
        }
    }
}
