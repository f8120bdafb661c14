//! Runtime driver for escalation sessions.
//!
//! [`EscalationController`] holds at most one open [`EscalationSession`] and
//! ticks it from a tokio interval. Every session gets a generation number;
//! the ticker only touches the session it was spawned for, so a tick that
//! races with a close is dropped.
//!
//! Sessions run their [`AudioPlayer`] and [`SosDispatcher`] while the
//! controller state is locked. Collaborators must not call back into the
//! controller.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use sarthi_safety_models::{EscalationSnapshot, Trigger};
use tokio::{
    runtime::Handle,
    sync::broadcast,
    task::JoinHandle,
    time::{Instant, MissedTickBehavior},
};
use uuid::Uuid;

use crate::{
    audio::AudioPlayer,
    machine::{EscalationTimings, UserAction},
    session::{EscalationEvent, EscalationSession},
    sos::SosDispatcher,
};

const EVENT_CAPACITY: usize = 64;

struct ActiveSession {
    session: EscalationSession,
    generation: u64,
    ticker: Option<JoinHandle<()>>,
}

impl ActiveSession {
    fn cancel_ticker(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
    }
}

#[derive(Default)]
struct State {
    active: Option<ActiveSession>,
    generation: u64,
}

/// Opens, ticks and closes alert sessions.
pub struct EscalationController {
    state: Arc<Mutex<State>>,
    timings: EscalationTimings,
    audio: Arc<dyn AudioPlayer>,
    sos: Arc<dyn SosDispatcher>,
    events: broadcast::Sender<EscalationEvent>,
}

impl EscalationController {
    /// Creates a controller with no open session.
    #[must_use]
    pub fn new(
        timings: EscalationTimings,
        audio: Arc<dyn AudioPlayer>,
        sos: Arc<dyn SosDispatcher>,
    ) -> Self {
        if timings.tick_millis == 0 {
            log::warn!("Escalation tick period is 0 ms, using {:?}", timings.tick());
        }
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            state: Arc::new(Mutex::new(State::default())),
            timings,
            audio,
            sos,
            events,
        }
    }

    /// Opens a session for `trigger` and starts its countdown.
    ///
    /// When a session is already open it is left alone and its id returned.
    pub fn open(&self, trigger: Trigger) -> Uuid {
        let snapshot = {
            let mut state = lock(&self.state);
            if let Some(active) = &state.active {
                log::debug!(
                    "Alert session {} already open, ignoring trigger",
                    active.session.id()
                );
                return active.session.id();
            }

            state.generation += 1;
            let generation = state.generation;
            let session = EscalationSession::open(
                trigger,
                self.timings,
                Arc::clone(&self.audio),
                Arc::clone(&self.sos),
            );
            let snapshot = session.snapshot();

            let ticker = match Handle::try_current() {
                Ok(runtime) => Some(runtime.spawn(run_ticker(
                    Arc::clone(&self.state),
                    generation,
                    self.timings,
                    self.events.clone(),
                ))),
                Err(e) => {
                    log::error!("No async runtime, countdown will not advance: {e}");
                    None
                }
            };

            state.active = Some(ActiveSession {
                session,
                generation,
                ticker,
            });
            snapshot
        };

        let id = snapshot.session_id;
        publish(&self.events, vec![EscalationEvent::Opened(snapshot)]);
        id
    }

    /// "I'm Safe".
    pub fn mark_safe(&self) -> bool {
        self.act(UserAction::MarkSafe)
    }

    /// "I Need Help".
    pub fn need_help(&self) -> bool {
        self.act(UserAction::NeedHelp)
    }

    /// "Stop Alarm".
    pub fn stop_alarm(&self) -> bool {
        self.act(UserAction::StopAlarm)
    }

    /// "Trigger SOS Now".
    pub fn trigger_sos(&self) -> bool {
        self.act(UserAction::TriggerSos)
    }

    /// Applies a user answer to the open session. Returns `false` when no
    /// session is open.
    pub fn act(&self, action: UserAction) -> bool {
        self.with_session(|session| session.act(action))
    }

    /// Closes the open session from outside, stopping any alarm.
    pub fn close(&self) -> bool {
        self.with_session(EscalationSession::dismiss)
    }

    /// Display state of the open session.
    #[must_use]
    pub fn snapshot(&self) -> Option<EscalationSnapshot> {
        lock(&self.state)
            .active
            .as_ref()
            .map(|active| active.session.snapshot())
    }

    /// Whether a session is open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        lock(&self.state).active.is_some()
    }

    /// Whether the alarm sound is playing.
    #[must_use]
    pub fn is_alarm_playing(&self) -> bool {
        lock(&self.state)
            .active
            .as_ref()
            .is_some_and(|active| active.session.is_alarm_playing())
    }

    /// Subscribes to session events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<EscalationEvent> {
        self.events.subscribe()
    }

    fn with_session(
        &self,
        f: impl FnOnce(&mut EscalationSession) -> Vec<EscalationEvent>,
    ) -> bool {
        let events = {
            let mut state = lock(&self.state);
            let Some(active) = state.active.as_mut() else {
                log::debug!("No open alert session");
                return false;
            };

            let events = f(&mut active.session);
            if active.session.is_closed() {
                active.cancel_ticker();
                state.active = None;
            }
            events
        };

        publish(&self.events, events);
        true
    }
}

impl Drop for EscalationController {
    fn drop(&mut self) {
        let mut state = lock(&self.state);
        if let Some(mut active) = state.active.take() {
            active.cancel_ticker();
            active.session.dismiss();
        }
    }
}

async fn run_ticker(
    state: Arc<Mutex<State>>,
    generation: u64,
    timings: EscalationTimings,
    events: broadcast::Sender<EscalationEvent>,
) {
    let period = timings.tick();
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        interval.tick().await;

        let (emitted, closed) = {
            let mut state = lock(&state);
            let Some(active) = state
                .active
                .as_mut()
                .filter(|active| active.generation == generation)
            else {
                log::debug!("Dropping stale tick for session generation {generation}");
                return;
            };

            let emitted = active.session.tick();
            let closed = active.session.is_closed();
            if closed {
                // Ending inside our own task: the handle is ours, nothing to abort.
                active.ticker = None;
                state.active = None;
            }
            (emitted, closed)
        };

        publish(&events, emitted);
        if closed {
            return;
        }
    }
}

fn publish(sender: &broadcast::Sender<EscalationEvent>, events: Vec<EscalationEvent>) {
    for event in events {
        // No subscribers is fine.
        let _ = sender.send(event);
    }
}

fn lock(state: &Mutex<State>) -> MutexGuard<'_, State> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use sarthi_safety_models::{AlarmCause, EscalationPhase, SessionOutcome, SessionReport};
    use sarthi_zone_models::Position;
    use tokio::time::sleep;

    use super::*;
    use crate::{audio::testing::CountingPlayer, sos::testing::RecordingDispatcher};

    struct Fixture {
        player: Arc<CountingPlayer>,
        sos: Arc<RecordingDispatcher>,
        controller: EscalationController,
    }

    fn fixture() -> Fixture {
        let player = Arc::new(CountingPlayer::default());
        let sos = Arc::new(RecordingDispatcher::default());
        let controller = EscalationController::new(
            EscalationTimings::default(),
            Arc::clone(&player) as Arc<dyn AudioPlayer>,
            Arc::clone(&sos) as Arc<dyn SosDispatcher>,
        );
        Fixture {
            player,
            sos,
            controller,
        }
    }

    fn manual() -> Trigger {
        Trigger::Manual {
            location: Some(Position::new(28.7041, 77.1025).unwrap()),
        }
    }

    fn closed_report(rx: &mut broadcast::Receiver<EscalationEvent>) -> Option<SessionReport> {
        let mut found = None;
        while let Ok(event) = rx.try_recv() {
            if let EscalationEvent::Closed(report) = event {
                found = Some(report);
            }
        }
        found
    }

    #[tokio::test(start_paused = true)]
    async fn zero_tick_period_still_counts_down() {
        let player = Arc::new(CountingPlayer::default());
        let sos = Arc::new(RecordingDispatcher::default());
        let controller = EscalationController::new(
            EscalationTimings {
                tick_millis: 0,
                ..EscalationTimings::default()
            },
            Arc::clone(&player) as Arc<dyn AudioPlayer>,
            Arc::clone(&sos) as Arc<dyn SosDispatcher>,
        );

        controller.open(manual());
        sleep(Duration::from_millis(35)).await;

        assert!(controller.snapshot().unwrap().phase.is_alarm_active());
        assert_eq!(player.plays(), 1);
        assert_eq!(sos.count(), 0);

        sleep(Duration::from_millis(20)).await;
        assert_eq!(sos.automatic_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn countdowns_follow_the_clock() {
        let Fixture {
            player,
            sos,
            controller,
        } = fixture();

        controller.open(manual());
        sleep(Duration::from_millis(29_500)).await;
        let snapshot = controller.snapshot().unwrap();
        assert_eq!(snapshot.phase, EscalationPhase::Pending);
        assert_eq!(snapshot.response_countdown_secs, 1);

        sleep(Duration::from_secs(1)).await;
        assert_eq!(
            controller.snapshot().unwrap().phase,
            EscalationPhase::AlarmActive {
                cause: AlarmCause::Unanswered
            }
        );
        assert_eq!(player.playing(), 1);

        sleep(Duration::from_secs(19)).await;
        assert_eq!(sos.count(), 0);
        sleep(Duration::from_secs(1)).await;
        assert_eq!(sos.automatic_count(), 1);

        sleep(Duration::from_secs(120)).await;
        assert_eq!(sos.count(), 1);
        assert_eq!(player.plays(), 1);
        assert!(controller.is_alarm_playing());
    }

    #[tokio::test(start_paused = true)]
    async fn stop_alarm_then_reopen_starts_fresh() {
        let Fixture {
            player,
            controller,
            ..
        } = fixture();
        let mut rx = controller.subscribe();

        let first = controller.open(manual());
        sleep(Duration::from_millis(30_500)).await;
        assert!(controller.is_alarm_playing());

        assert!(controller.stop_alarm());
        assert!(!controller.is_open());
        assert_eq!(player.playing(), 0);
        assert_eq!(
            closed_report(&mut rx).unwrap().outcome,
            SessionOutcome::AlarmStopped
        );

        sleep(Duration::from_secs(5)).await;
        assert_eq!(player.plays(), 1);

        let second = controller.open(manual());
        assert_ne!(first, second);
        let snapshot = controller.snapshot().unwrap();
        assert_eq!(snapshot.phase, EscalationPhase::Pending);
        assert_eq!(snapshot.response_countdown_secs, 30);
        assert_eq!(snapshot.auto_sos_countdown_secs, 20);
        assert!(!snapshot.auto_sos_dispatched);
    }

    #[tokio::test(start_paused = true)]
    async fn second_trigger_keeps_the_open_session() {
        let Fixture { controller, .. } = fixture();

        let first = controller.open(manual());
        sleep(Duration::from_millis(5_500)).await;
        let again = controller.open(manual());

        assert_eq!(first, again);
        assert_eq!(controller.snapshot().unwrap().response_countdown_secs, 25);
    }

    #[tokio::test(start_paused = true)]
    async fn mark_safe_closes_after_one_tick() {
        let Fixture { controller, .. } = fixture();
        let mut rx = controller.subscribe();

        controller.open(manual());
        sleep(Duration::from_millis(2_500)).await;
        assert!(controller.mark_safe());
        assert_eq!(controller.snapshot().unwrap().phase, EscalationPhase::Safe);

        sleep(Duration::from_secs(1)).await;
        assert!(!controller.is_open());
        let report = closed_report(&mut rx).unwrap();
        assert_eq!(report.outcome, SessionOutcome::MarkedSafe);
        assert!(!report.emergency_contacted());
    }

    #[tokio::test(start_paused = true)]
    async fn close_cancels_countdown() {
        let Fixture {
            player,
            sos,
            controller,
        } = fixture();

        controller.open(manual());
        sleep(Duration::from_millis(10_500)).await;
        assert!(controller.close());
        assert!(!controller.close());

        sleep(Duration::from_secs(120)).await;
        assert_eq!(player.plays(), 0);
        assert_eq!(sos.count(), 0);
        assert!(!controller.is_open());
    }

    #[tokio::test(start_paused = true)]
    async fn manual_sos_is_dispatched_once() {
        let Fixture {
            player,
            sos,
            controller,
        } = fixture();
        let mut rx = controller.subscribe();

        controller.open(manual());
        assert!(controller.need_help());
        assert!(controller.trigger_sos());
        assert!(!controller.trigger_sos());

        assert_eq!(sos.count(), 1);
        assert_eq!(player.playing(), 0);
        assert!(closed_report(&mut rx).unwrap().emergency_contacted());
    }

    #[test]
    fn answers_without_session_are_rejected() {
        let Fixture { controller, .. } = fixture();
        assert!(!controller.mark_safe());
        assert!(!controller.stop_alarm());
        assert!(controller.snapshot().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn drop_releases_audio() {
        let Fixture {
            player, controller, ..
        } = fixture();

        controller.open(manual());
        controller.need_help();
        assert_eq!(player.playing(), 1);

        drop(controller);
        assert_eq!(player.playing(), 0);
    }
}
