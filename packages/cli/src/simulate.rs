//! `sarthi simulate`: replays a walk through the guard.

use std::sync::Arc;
use std::time::Duration;

use clap::ValueEnum;
use sarthi_escalation::{EscalationController, EscalationEvent, LocalAcknowledgment};
use sarthi_geofence::{ChannelSource, PositionSource};
use sarthi_guard::{Collaborators, GuardConfig, LogNotifier, Permissions, SafetyGuard};
use sarthi_safety_models::{SafetyStatus, SessionReport};
use sarthi_zone::ZoneSet;
use sarthi_zone_models::{InvalidPositionError, Position, RiskZone};
use thiserror::Error;
use tokio::sync::broadcast::error::RecvError;
use tokio::time::{Instant, sleep, sleep_until};

use crate::console::ConsoleAlarm;

/// How the simulated user answers an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Respond {
    /// Never answer; the alarm and the automatic SOS run their course.
    None,
    /// "I'm Safe" during the response countdown.
    Safe,
    /// "I Need Help" during the response countdown.
    Help,
    /// "Stop Alarm" once the alarm sounds.
    Stop,
    /// "Trigger SOS Now" once the alarm sounds.
    Sos,
}

impl Respond {
    /// Whether the answer is given while the alarm sounds rather than
    /// during the response countdown.
    const fn waits_for_alarm(self) -> bool {
        matches!(self, Self::Stop | Self::Sos)
    }

    fn apply(self, escalation: &EscalationController) {
        println!("[user] answers: {self:?}");
        match self {
            Self::None => {}
            Self::Safe => {
                escalation.mark_safe();
            }
            Self::Help => {
                escalation.need_help();
            }
            Self::Stop => {
                escalation.stop_alarm();
            }
            Self::Sos => {
                escalation.trigger_sos();
            }
        }
    }
}

/// Errors parsing `--waypoints`.
#[derive(Debug, Error, PartialEq)]
pub enum WaypointError {
    /// A waypoint is not `lat,lng`.
    #[error("Waypoint {index} is not \"lat,lng\": {text:?}")]
    Malformed {
        /// 1-based position in the list.
        index: usize,
        /// Offending text.
        text: String,
    },

    /// A waypoint is off the globe.
    #[error("Waypoint {index} is out of range: {source}")]
    OutOfRange {
        /// 1-based position in the list.
        index: usize,
        /// What was wrong with it.
        source: InvalidPositionError,
    },

    /// No waypoints were given.
    #[error("No waypoints given")]
    Empty,
}

/// Parses `"lat,lng;lat,lng;..."`. Empty segments are skipped.
///
/// # Errors
///
/// Returns [`WaypointError`] if a segment is not a valid coordinate pair or
/// the list is empty.
pub fn parse_waypoints(text: &str) -> Result<Vec<Position>, WaypointError> {
    let waypoints = text
        .split(';')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .enumerate()
        .map(|(i, segment)| {
            let malformed = || WaypointError::Malformed {
                index: i + 1,
                text: segment.to_string(),
            };
            let (lat, lng) = segment.split_once(',').ok_or_else(malformed)?;
            let lat = lat.trim().parse::<f64>().map_err(|_| malformed())?;
            let lng = lng.trim().parse::<f64>().map_err(|_| malformed())?;
            Position::new(lat, lng).map_err(|source| WaypointError::OutOfRange {
                index: i + 1,
                source,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    if waypoints.is_empty() {
        return Err(WaypointError::Empty);
    }
    Ok(waypoints)
}

/// Options for one simulation run.
pub struct Simulation {
    /// Points to walk through, in order.
    pub waypoints: Vec<Position>,
    /// Pause after each waypoint.
    pub interval: Duration,
    /// How the user answers.
    pub respond: Respond,
    /// Delay before answering.
    pub respond_after: Duration,
}

/// Walks the waypoints through a [`SafetyGuard`] and follows the alert
/// session, if one opens, until it closes.
pub async fn run(
    simulation: Simulation,
    config: &GuardConfig,
    zones: Vec<RiskZone>,
) -> Option<SessionReport> {
    let source = Arc::new(ChannelSource::new());
    let guard = SafetyGuard::new(
        config,
        ZoneSet::new(zones),
        Collaborators {
            source: Arc::clone(&source) as Arc<dyn PositionSource>,
            audio: Arc::new(ConsoleAlarm),
            sos: Arc::new(LocalAcknowledgment),
            notifier: Arc::new(LogNotifier),
            permissions: Arc::new(Permissions::granted()),
        },
    );
    let mut events = guard.escalation().subscribe();
    let mut statuses = guard.monitor().subscribe_status();

    let tracking = guard.start();
    if !tracking.is_active() {
        println!("Tracking is {tracking}; only zone entries can raise alerts, nothing to simulate");
        return None;
    }

    for waypoint in &simulation.waypoints {
        source.push_fix(waypoint.lat(), waypoint.lng());
        if statuses.changed().await.is_ok() {
            print_status(&statuses.borrow_and_update());
        }
        sleep(simulation.interval).await;
    }

    if !guard.escalation().is_open() {
        println!("No alert raised");
        guard.shutdown();
        return None;
    }

    let report = follow(&guard, &mut events, simulation.respond, simulation.respond_after).await;
    guard.shutdown();
    report
}

async fn follow(
    guard: &SafetyGuard,
    events: &mut tokio::sync::broadcast::Receiver<EscalationEvent>,
    respond: Respond,
    respond_after: Duration,
) -> Option<SessionReport> {
    let escalation = guard.escalation();
    let mut respond_at = (respond != Respond::None && !respond.waits_for_alarm())
        .then(|| Instant::now() + respond_after);

    loop {
        let wake = respond_at.unwrap_or_else(Instant::now);
        tokio::select! {
            event = events.recv() => match event {
                Ok(EscalationEvent::Opened(snapshot)) => {
                    println!(
                        "[alert] session {} opened, {} s to answer",
                        snapshot.session_id, snapshot.response_countdown_secs
                    );
                }
                Ok(EscalationEvent::AlarmStarted { .. }) => {
                    if respond.waits_for_alarm() {
                        respond_at = Some(Instant::now() + respond_after);
                    }
                }
                Ok(EscalationEvent::SosDispatched { automatic, acknowledgment, .. }) => {
                    println!(
                        "[sos] {} SOS: {}",
                        if automatic { "automatic" } else { "manual" },
                        acknowledgment.message
                    );
                    if automatic && respond_at.is_none() {
                        // Nobody will answer; the alarm would sound forever.
                        escalation.close();
                    }
                }
                Ok(EscalationEvent::Closed(report)) => return Some(report),
                Err(RecvError::Lagged(skipped)) => {
                    log::warn!("Missed {skipped} escalation events");
                }
                Err(RecvError::Closed) => return None,
            },
            () = sleep_until(wake), if respond_at.is_some() => {
                respond_at = None;
                respond.apply(escalation);
            }
        }
    }
}

fn print_status(status: &SafetyStatus) {
    let location = status
        .user_location
        .map_or_else(|| "unknown".to_string(), |p| p.to_string());

    match (&status.current_zone, status.distance_km) {
        (Some(zone), Some(distance_km)) => println!(
            "[{location}] {} zone {} at {distance_km:.1} km{}",
            zone.risk_level,
            zone.state,
            if status.is_in_danger_zone {
                " - DANGER"
            } else {
                ""
            }
        ),
        _ => println!("[{location}] outside all zones"),
    }
}

#[cfg(test)]
mod tests {
    use sarthi_escalation::EscalationTimings;
    use sarthi_safety_models::{CheckInStatus, SessionOutcome};

    use super::*;

    #[test]
    fn parses_waypoints() {
        let waypoints = parse_waypoints(" 28.6,77.2 ; 25, 80;").unwrap();
        assert_eq!(waypoints.len(), 2);
        assert!((waypoints[1].lat() - 25.0).abs() < f64::EPSILON);
        assert!((waypoints[1].lng() - 80.0).abs() < f64::EPSILON);
        assert_eq!(parse_waypoints(" ; "), Err(WaypointError::Empty));
        assert_eq!(
            parse_waypoints("28.6,77.2;oops"),
            Err(WaypointError::Malformed {
                index: 2,
                text: "oops".to_string()
            })
        );
        assert!(parse_waypoints("28.6,north").is_err());
        assert!(matches!(
            parse_waypoints("95,77"),
            Err(WaypointError::OutOfRange { index: 1, .. })
        ));
    }

    fn fast_config() -> GuardConfig {
        GuardConfig {
            escalation: EscalationTimings {
                response_countdown_secs: 3,
                auto_sos_countdown_secs: 2,
                ..EscalationTimings::default()
            },
            ..GuardConfig::default()
        }
    }

    fn walk(respond: Respond) -> Simulation {
        Simulation {
            waypoints: parse_waypoints("25,80;28.6,77.2").unwrap(),
            interval: Duration::from_secs(1),
            respond,
            respond_after: Duration::from_secs(1),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn unanswered_walk_ends_in_emergency() {
        let report = run(walk(Respond::None), &fast_config(), sarthi_zone::all_fallback_zones())
            .await
            .unwrap();

        assert!(report.auto_sos_dispatched);
        assert_eq!(report.outcome, SessionOutcome::Dismissed);
        assert_eq!(report.check_in_status(), CheckInStatus::Emergency);
    }

    #[tokio::test(start_paused = true)]
    async fn safe_answer_closes_quietly() {
        let report = run(walk(Respond::Safe), &fast_config(), sarthi_zone::all_fallback_zones())
            .await
            .unwrap();

        assert_eq!(report.outcome, SessionOutcome::MarkedSafe);
        assert_eq!(report.check_in_status(), CheckInStatus::Safe);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_answer_waits_for_alarm() {
        let report = run(walk(Respond::Stop), &fast_config(), sarthi_zone::all_fallback_zones())
            .await
            .unwrap();

        assert_eq!(report.outcome, SessionOutcome::AlarmStopped);
        assert!(!report.emergency_contacted());
    }

    #[tokio::test(start_paused = true)]
    async fn walk_outside_zones_raises_nothing() {
        let simulation = Simulation {
            waypoints: parse_waypoints("10,10").unwrap(),
            ..walk(Respond::None)
        };
        assert!(
            run(simulation, &fast_config(), sarthi_zone::all_fallback_zones())
                .await
                .is_none()
        );
    }
}
