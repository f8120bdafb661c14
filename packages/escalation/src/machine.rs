//! Pure escalation state machine.
//!
//! [`EscalationMachine`] knows nothing about clocks, audio or dispatch. It is
//! driven by [`EscalationMachine::tick`] once per second and by
//! [`EscalationMachine::handle`] for user input, and answers each with the
//! [`Effect`]s the caller must carry out.

use std::time::Duration;

use sarthi_safety_models::{AlarmCause, EscalationPhase, SessionOutcome};
use serde::{Deserialize, Serialize};

/// Countdown lengths and tick period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EscalationTimings {
    /// Seconds to answer "are you safe?" before the alarm starts.
    pub response_countdown_secs: u32,
    /// Seconds of alarm before the SOS is dispatched automatically.
    pub auto_sos_countdown_secs: u32,
    /// Seconds between "I'm Safe" and the session closing.
    pub safe_close_delay_secs: u32,
    /// Tick period in milliseconds.
    pub tick_millis: u64,
}

impl Default for EscalationTimings {
    fn default() -> Self {
        Self {
            response_countdown_secs: 30,
            auto_sos_countdown_secs: 20,
            safe_close_delay_secs: 1,
            tick_millis: 1000,
        }
    }
}

impl EscalationTimings {
    /// Tick period, never shorter than one millisecond.
    #[must_use]
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_millis.max(1))
    }
}

/// A user answer on the alert screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserAction {
    /// "I'm Safe" while the response countdown runs.
    MarkSafe,
    /// "I Need Help" while the response countdown runs.
    NeedHelp,
    /// "Stop Alarm" while the alarm sounds.
    StopAlarm,
    /// "Trigger SOS Now" while the alarm sounds.
    TriggerSos,
}

/// Work the machine asks its driver to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Start the looping alarm sound.
    StartAlarm,
    /// Stop the alarm sound, if playing.
    StopAlarm,
    /// Notify emergency services.
    DispatchSos {
        /// Fired by the auto-SOS countdown rather than the user.
        automatic: bool,
    },
    /// The session is over.
    Close(SessionOutcome),
}

/// State of one alert session.
#[derive(Debug, Clone)]
pub struct EscalationMachine {
    timings: EscalationTimings,
    phase: EscalationPhase,
    response_remaining: u32,
    auto_sos_remaining: u32,
    safe_close_remaining: u32,
    auto_sos_dispatched: bool,
    user_declared: bool,
    outcome: Option<SessionOutcome>,
}

impl EscalationMachine {
    /// Opens a session in the pending phase.
    #[must_use]
    pub const fn new(timings: EscalationTimings) -> Self {
        Self {
            timings,
            phase: EscalationPhase::Pending,
            response_remaining: timings.response_countdown_secs,
            auto_sos_remaining: timings.auto_sos_countdown_secs,
            safe_close_remaining: timings.safe_close_delay_secs,
            auto_sos_dispatched: false,
            user_declared: false,
            outcome: None,
        }
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> EscalationPhase {
        self.phase
    }

    /// Seconds left on the response countdown.
    #[must_use]
    pub const fn response_remaining(&self) -> u32 {
        self.response_remaining
    }

    /// Seconds left on the auto-SOS countdown.
    #[must_use]
    pub const fn auto_sos_remaining(&self) -> u32 {
        self.auto_sos_remaining
    }

    /// Whether the automatic SOS fired.
    #[must_use]
    pub const fn auto_sos_dispatched(&self) -> bool {
        self.auto_sos_dispatched
    }

    /// Whether the alarm was raised by "I Need Help".
    #[must_use]
    pub const fn user_declared(&self) -> bool {
        self.user_declared
    }

    /// How the session ended, once it has.
    #[must_use]
    pub const fn outcome(&self) -> Option<SessionOutcome> {
        self.outcome
    }

    /// Whether the session has ended.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.outcome.is_some()
    }

    /// Advances the countdown of the current phase by one second.
    pub fn tick(&mut self) -> Vec<Effect> {
        if self.is_closed() {
            return vec![];
        }

        match self.phase {
            EscalationPhase::Pending => {
                self.response_remaining = self.response_remaining.saturating_sub(1);
                if self.response_remaining == 0 {
                    log::info!("No response to safety check, raising alarm");
                    return self.raise_alarm(AlarmCause::Unanswered);
                }
                vec![]
            }
            EscalationPhase::AlarmActive { .. } => {
                if self.auto_sos_dispatched {
                    return vec![];
                }
                self.auto_sos_remaining = self.auto_sos_remaining.saturating_sub(1);
                if self.auto_sos_remaining == 0 {
                    self.auto_sos_dispatched = true;
                    return vec![Effect::DispatchSos { automatic: true }];
                }
                vec![]
            }
            EscalationPhase::Safe => {
                self.safe_close_remaining = self.safe_close_remaining.saturating_sub(1);
                if self.safe_close_remaining == 0 {
                    return self.close(SessionOutcome::MarkedSafe);
                }
                vec![]
            }
            EscalationPhase::Emergency => vec![],
        }
    }

    /// Applies a user answer. Answers that do not fit the current phase are
    /// ignored.
    pub fn handle(&mut self, action: UserAction) -> Vec<Effect> {
        if self.is_closed() {
            log::debug!("Ignoring {action:?} on a closed session");
            return vec![];
        }

        match (self.phase, action) {
            (EscalationPhase::Pending, UserAction::MarkSafe) => {
                self.phase = EscalationPhase::Safe;
                if self.safe_close_remaining == 0 {
                    return self.close(SessionOutcome::MarkedSafe);
                }
                vec![]
            }
            (EscalationPhase::Pending, UserAction::NeedHelp) => {
                log::info!("User declared an emergency");
                self.raise_alarm(AlarmCause::UserDeclared)
            }
            (EscalationPhase::AlarmActive { .. }, UserAction::StopAlarm) => {
                self.close(SessionOutcome::AlarmStopped)
            }
            (EscalationPhase::AlarmActive { .. }, UserAction::TriggerSos) => {
                self.phase = EscalationPhase::Emergency;
                let mut effects = vec![Effect::DispatchSos { automatic: false }];
                effects.extend(self.close(SessionOutcome::SosDispatched));
                effects
            }
            (phase, action) => {
                log::debug!("Ignoring {action:?} in phase {phase}");
                vec![]
            }
        }
    }

    /// Closes the session from outside, whatever its phase.
    pub fn dismiss(&mut self) -> Vec<Effect> {
        if self.is_closed() {
            return vec![];
        }
        self.close(SessionOutcome::Dismissed)
    }

    fn raise_alarm(&mut self, cause: AlarmCause) -> Vec<Effect> {
        self.phase = EscalationPhase::AlarmActive { cause };
        self.user_declared = matches!(cause, AlarmCause::UserDeclared);
        self.auto_sos_remaining = self.timings.auto_sos_countdown_secs;
        vec![Effect::StartAlarm]
    }

    fn close(&mut self, outcome: SessionOutcome) -> Vec<Effect> {
        self.outcome = Some(outcome);
        vec![Effect::StopAlarm, Effect::Close(outcome)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ticks(machine: &mut EscalationMachine, n: u32) -> Vec<Effect> {
        (0..n).flat_map(|_| machine.tick()).collect()
    }

    #[test]
    fn new_session_is_pending_with_full_countdowns() {
        let machine = EscalationMachine::new(EscalationTimings::default());
        assert_eq!(machine.phase(), EscalationPhase::Pending);
        assert_eq!(machine.response_remaining(), 30);
        assert_eq!(machine.auto_sos_remaining(), 20);
        assert!(!machine.is_closed());
    }

    #[test]
    fn unanswered_check_raises_alarm_then_one_auto_sos() {
        let mut machine = EscalationMachine::new(EscalationTimings::default());

        assert!(ticks(&mut machine, 29).is_empty());
        assert_eq!(machine.response_remaining(), 1);
        assert_eq!(machine.auto_sos_remaining(), 20);

        assert_eq!(machine.tick(), vec![Effect::StartAlarm]);
        assert_eq!(
            machine.phase(),
            EscalationPhase::AlarmActive {
                cause: AlarmCause::Unanswered
            }
        );

        assert!(ticks(&mut machine, 19).is_empty());
        assert_eq!(machine.auto_sos_remaining(), 1);
        assert_eq!(
            machine.tick(),
            vec![Effect::DispatchSos { automatic: true }]
        );
        assert!(machine.auto_sos_dispatched());

        assert!(ticks(&mut machine, 100).is_empty());
        assert!(machine.phase().is_alarm_active());
        assert!(!machine.is_closed());
    }

    #[test]
    fn need_help_starts_alarm_once() {
        let mut machine = EscalationMachine::new(EscalationTimings::default());
        ticks(&mut machine, 29);

        assert_eq!(machine.handle(UserAction::NeedHelp), vec![Effect::StartAlarm]);
        assert!(machine.user_declared());

        let later = ticks(&mut machine, 5);
        assert!(!later.contains(&Effect::StartAlarm));
        assert!(machine.handle(UserAction::NeedHelp).is_empty());
        assert_eq!(machine.auto_sos_remaining(), 15);
    }

    #[test]
    fn mark_safe_closes_after_delay() {
        let mut machine = EscalationMachine::new(EscalationTimings::default());
        ticks(&mut machine, 3);

        assert!(machine.handle(UserAction::MarkSafe).is_empty());
        assert_eq!(machine.phase(), EscalationPhase::Safe);
        assert_eq!(machine.response_remaining(), 27);

        assert_eq!(
            machine.tick(),
            vec![
                Effect::StopAlarm,
                Effect::Close(SessionOutcome::MarkedSafe)
            ]
        );
        assert_eq!(machine.outcome(), Some(SessionOutcome::MarkedSafe));
        assert!(machine.tick().is_empty());
    }

    #[test]
    fn mark_safe_without_delay_closes_immediately() {
        let mut machine = EscalationMachine::new(EscalationTimings {
            safe_close_delay_secs: 0,
            ..EscalationTimings::default()
        });
        assert_eq!(
            machine.handle(UserAction::MarkSafe),
            vec![
                Effect::StopAlarm,
                Effect::Close(SessionOutcome::MarkedSafe)
            ]
        );
    }

    #[test]
    fn stop_alarm_closes() {
        let mut machine = EscalationMachine::new(EscalationTimings::default());
        machine.handle(UserAction::NeedHelp);

        assert_eq!(
            machine.handle(UserAction::StopAlarm),
            vec![
                Effect::StopAlarm,
                Effect::Close(SessionOutcome::AlarmStopped)
            ]
        );
        assert!(machine.is_closed());
        assert!(machine.handle(UserAction::TriggerSos).is_empty());
    }

    #[test]
    fn manual_sos_dispatches_and_closes() {
        let mut machine = EscalationMachine::new(EscalationTimings::default());
        machine.handle(UserAction::NeedHelp);

        assert_eq!(
            machine.handle(UserAction::TriggerSos),
            vec![
                Effect::DispatchSos { automatic: false },
                Effect::StopAlarm,
                Effect::Close(SessionOutcome::SosDispatched)
            ]
        );
        assert_eq!(machine.phase(), EscalationPhase::Emergency);
    }

    #[test]
    fn manual_sos_after_auto_sos_is_allowed() {
        let mut machine = EscalationMachine::new(EscalationTimings::default());
        machine.handle(UserAction::NeedHelp);
        ticks(&mut machine, 20);
        assert!(machine.auto_sos_dispatched());

        let effects = machine.handle(UserAction::TriggerSos);
        assert!(effects.contains(&Effect::DispatchSos { automatic: false }));
    }

    #[test]
    fn answers_out_of_phase_are_ignored() {
        let mut machine = EscalationMachine::new(EscalationTimings::default());
        assert!(machine.handle(UserAction::StopAlarm).is_empty());
        assert!(machine.handle(UserAction::TriggerSos).is_empty());
        assert_eq!(machine.phase(), EscalationPhase::Pending);

        machine.handle(UserAction::NeedHelp);
        assert!(machine.handle(UserAction::MarkSafe).is_empty());
        assert!(machine.phase().is_alarm_active());
    }

    #[test]
    fn dismiss_from_any_phase() {
        let mut pending = EscalationMachine::new(EscalationTimings::default());
        assert_eq!(
            pending.dismiss(),
            vec![Effect::StopAlarm, Effect::Close(SessionOutcome::Dismissed)]
        );
        assert!(pending.dismiss().is_empty());

        let mut alarm = EscalationMachine::new(EscalationTimings::default());
        alarm.handle(UserAction::NeedHelp);
        assert!(alarm.dismiss().contains(&Effect::StopAlarm));
    }

    #[test]
    fn timings_read_from_toml() {
        let timings: EscalationTimings =
            toml::from_str("response_countdown_secs = 10\ntick_millis = 500").unwrap();
        assert_eq!(timings.response_countdown_secs, 10);
        assert_eq!(timings.auto_sos_countdown_secs, 20);
        assert_eq!(timings.tick(), Duration::from_millis(500));
    }

    #[test]
    fn zero_tick_period_is_clamped() {
        let timings = EscalationTimings {
            tick_millis: 0,
            ..EscalationTimings::default()
        };
        assert_eq!(timings.tick(), Duration::from_millis(1));
    }
}
