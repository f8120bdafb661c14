//! One open alert session: the machine plus the resources it drives.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sarthi_safety_models::{EscalationSnapshot, SessionReport, Trigger};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    audio::{AlarmSlot, AudioPlayer},
    machine::{Effect, EscalationMachine, EscalationTimings, UserAction},
    sos::{SosAcknowledgment, SosDispatcher, SosRequest},
};

/// Something observers of an escalation should know about.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EscalationEvent {
    /// A session opened in the pending phase.
    Opened(EscalationSnapshot),
    /// The alarm started sounding.
    #[serde(rename_all = "camelCase")]
    AlarmStarted {
        /// Session whose alarm started.
        session_id: Uuid,
    },
    /// An SOS went out.
    #[serde(rename_all = "camelCase")]
    SosDispatched {
        /// Session that raised it.
        session_id: Uuid,
        /// Fired by the auto-SOS countdown.
        automatic: bool,
        /// Acknowledgment to show.
        acknowledgment: SosAcknowledgment,
    },
    /// The session ended.
    Closed(SessionReport),
}

/// An open session and the resources it owns.
pub struct EscalationSession {
    id: Uuid,
    trigger: Trigger,
    opened_at: DateTime<Utc>,
    machine: EscalationMachine,
    alarm: AlarmSlot,
    sos: Arc<dyn SosDispatcher>,
}

impl EscalationSession {
    /// Opens a session for `trigger`.
    #[must_use]
    pub fn open(
        trigger: Trigger,
        timings: EscalationTimings,
        audio: Arc<dyn AudioPlayer>,
        sos: Arc<dyn SosDispatcher>,
    ) -> Self {
        let id = Uuid::new_v4();
        log::info!(
            "Opening alert session {id} ({})",
            trigger
                .zone_risk_level()
                .map_or_else(|| "manual".to_string(), |level| format!("{level} zone"))
        );

        Self {
            id,
            trigger,
            opened_at: Utc::now(),
            machine: EscalationMachine::new(timings),
            alarm: AlarmSlot::new(audio),
            sos,
        }
    }

    /// Session id.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// What opened the session.
    #[must_use]
    pub const fn trigger(&self) -> &Trigger {
        &self.trigger
    }

    /// Whether the session has ended.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.machine.is_closed()
    }

    /// Whether the alarm sound is playing.
    #[must_use]
    pub const fn is_alarm_playing(&self) -> bool {
        self.alarm.is_playing()
    }

    /// Display state of the session.
    #[must_use]
    pub const fn snapshot(&self) -> EscalationSnapshot {
        EscalationSnapshot {
            session_id: self.id,
            phase: self.machine.phase(),
            response_countdown_secs: self.machine.response_remaining(),
            auto_sos_countdown_secs: self.machine.auto_sos_remaining(),
            auto_sos_dispatched: self.machine.auto_sos_dispatched(),
        }
    }

    /// Advances one tick.
    pub fn tick(&mut self) -> Vec<EscalationEvent> {
        let effects = self.machine.tick();
        self.apply(effects)
    }

    /// Applies a user answer.
    pub fn act(&mut self, action: UserAction) -> Vec<EscalationEvent> {
        let effects = self.machine.handle(action);
        self.apply(effects)
    }

    /// Closes the session from outside.
    pub fn dismiss(&mut self) -> Vec<EscalationEvent> {
        let effects = self.machine.dismiss();
        self.apply(effects)
    }

    fn apply(&mut self, effects: Vec<Effect>) -> Vec<EscalationEvent> {
        let mut events = Vec::new();

        for effect in effects {
            match effect {
                Effect::StartAlarm => {
                    self.alarm.start();
                    events.push(EscalationEvent::AlarmStarted {
                        session_id: self.id,
                    });
                }
                Effect::StopAlarm => self.alarm.stop(),
                Effect::DispatchSos { automatic } => {
                    let request = SosRequest {
                        session_id: self.id,
                        location: self.trigger.location().copied(),
                        zone_risk_level: self.trigger.zone_risk_level(),
                        automatic,
                        requested_at: Utc::now(),
                    };
                    let acknowledgment = self.sos.trigger(&request);
                    log::info!("SOS acknowledged: {}", acknowledgment.message);
                    events.push(EscalationEvent::SosDispatched {
                        session_id: self.id,
                        automatic,
                        acknowledgment,
                    });
                }
                Effect::Close(outcome) => {
                    log::info!("Alert session {} closed: {outcome}", self.id);
                    events.push(EscalationEvent::Closed(SessionReport {
                        session_id: self.id,
                        trigger: self.trigger.clone(),
                        outcome,
                        user_declared_emergency: self.machine.user_declared(),
                        auto_sos_dispatched: self.machine.auto_sos_dispatched(),
                        opened_at: self.opened_at,
                        closed_at: Utc::now(),
                    }));
                }
            }
        }

        events
    }
}
