#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Safety status and escalation session types.
//!
//! [`SafetyStatus`] is what the geofence monitor publishes on every position
//! fix. The escalation types describe one emergency alert session from the
//! moment it opens until a [`SessionReport`] is produced on close.

use chrono::{DateTime, Utc};
use sarthi_zone_models::{Position, RiskLevel, RiskZone};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use uuid::Uuid;

/// Result of evaluating one position against the zone list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafetyStatus {
    /// True only if the closest qualifying zone is high or critical risk.
    pub is_in_danger_zone: bool,
    /// Closest zone whose danger radius contains the position, whatever its
    /// risk level.
    pub current_zone: Option<RiskZone>,
    /// Last accepted position fix.
    pub user_location: Option<Position>,
    /// Great-circle distance in kilometers to `current_zone`.
    pub distance_km: Option<f64>,
}

impl SafetyStatus {
    /// Whether the danger flag agrees with the current zone.
    ///
    /// A danger flag without a zone, or with a zone that does not alarm, is
    /// never produced by the evaluator.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        let zone_alarms = self
            .current_zone
            .as_ref()
            .is_some_and(|zone| zone.risk_level.is_alarming());
        (!self.is_in_danger_zone || zone_alarms)
            && self.current_zone.is_some() == self.distance_km.is_some()
    }
}

/// Whether the location subscription is live, and if not, why.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TrackingState {
    /// Not tracking; nothing went wrong.
    #[default]
    Inactive,
    /// Subscribed and receiving fixes.
    Active,
    /// The user denied the location permission.
    PermissionDenied,
    /// The platform has no location capability.
    Unsupported,
    /// The source reported an unrecoverable error.
    Failed,
}

impl TrackingState {
    /// Whether fixes are currently being evaluated.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Active)
    }
}

/// Platform permission state for location or notifications.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PermissionState {
    /// The user granted access.
    Granted,
    /// The user denied access.
    Denied,
    /// The platform will ask on first use.
    #[default]
    Prompt,
}

/// Why an alert session was opened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Trigger {
    /// The geofence reported entry into a high or critical zone.
    #[serde(rename_all = "camelCase")]
    DangerZone {
        /// Zone that was entered.
        zone: RiskZone,
        /// Distance to the zone center in kilometers.
        distance_km: f64,
        /// Position that triggered the entry.
        location: Position,
    },
    /// The user opened the alert by hand (test button).
    Manual {
        /// Position to show in the alert, if known.
        location: Option<Position>,
    },
}

impl Trigger {
    /// Position associated with the trigger, if any.
    #[must_use]
    pub const fn location(&self) -> Option<&Position> {
        match self {
            Self::DangerZone { location, .. } => Some(location),
            Self::Manual { location } => location.as_ref(),
        }
    }

    /// Risk level of the zone that triggered the session, if any.
    #[must_use]
    pub const fn zone_risk_level(&self) -> Option<RiskLevel> {
        match self {
            Self::DangerZone { zone, .. } => Some(zone.risk_level),
            Self::Manual { .. } => None,
        }
    }
}

/// Why the alarm is sounding.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AlarmCause {
    /// The response countdown ran out.
    Unanswered,
    /// The user pressed "I Need Help".
    UserDeclared,
}

/// Phase of an open alert session.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr,
)]
#[serde(tag = "phase", rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EscalationPhase {
    /// Waiting for the user to answer "are you safe?".
    Pending,
    /// Alarm sounding; auto-SOS countdown running.
    AlarmActive {
        /// What raised the alarm.
        cause: AlarmCause,
    },
    /// The user answered "I'm Safe"; the session closes shortly.
    Safe,
    /// The user dispatched an SOS by hand; the session is closing.
    Emergency,
}

impl EscalationPhase {
    /// Whether the alarm is sounding in this phase.
    #[must_use]
    pub const fn is_alarm_active(self) -> bool {
        matches!(self, Self::AlarmActive { .. })
    }
}

/// Point-in-time view of an open session, for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EscalationSnapshot {
    /// Session identifier.
    pub session_id: Uuid,
    /// Current phase.
    pub phase: EscalationPhase,
    /// Seconds left to answer before the alarm starts.
    pub response_countdown_secs: u32,
    /// Seconds left before the SOS is dispatched automatically.
    pub auto_sos_countdown_secs: u32,
    /// Whether the automatic SOS already fired.
    pub auto_sos_dispatched: bool,
}

/// How a session ended.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SessionOutcome {
    /// The user answered "I'm Safe" before the alarm.
    MarkedSafe,
    /// The user stopped the alarm.
    AlarmStopped,
    /// The user dispatched an SOS from the alarm screen.
    SosDispatched,
    /// The alert was closed from outside (dismissed, shut down).
    Dismissed,
}

/// Check-in status recorded for a finished session.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CheckInStatus {
    /// The user confirmed they were safe and no help was requested.
    Safe,
    /// The user asked for help but no SOS was dispatched.
    Unsafe,
    /// An SOS was dispatched, automatically or by hand.
    Emergency,
}

/// Summary of a finished session, published to observers on close.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionReport {
    /// Session identifier.
    pub session_id: Uuid,
    /// What opened the session.
    pub trigger: Trigger,
    /// How it ended.
    pub outcome: SessionOutcome,
    /// Whether the alarm was raised by "I Need Help".
    pub user_declared_emergency: bool,
    /// Whether the automatic SOS fired before the session ended.
    pub auto_sos_dispatched: bool,
    /// When the session opened.
    pub opened_at: DateTime<Utc>,
    /// When the session closed.
    pub closed_at: DateTime<Utc>,
}

impl SessionReport {
    /// Whether emergency services were contacted during the session.
    #[must_use]
    pub const fn emergency_contacted(&self) -> bool {
        self.auto_sos_dispatched || matches!(self.outcome, SessionOutcome::SosDispatched)
    }

    /// Check-in status to record for this session.
    #[must_use]
    pub const fn check_in_status(&self) -> CheckInStatus {
        if self.emergency_contacted() {
            CheckInStatus::Emergency
        } else if self.user_declared_emergency {
            CheckInStatus::Unsafe
        } else {
            CheckInStatus::Safe
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(outcome: SessionOutcome, declared: bool, auto_sos: bool) -> SessionReport {
        SessionReport {
            session_id: Uuid::nil(),
            trigger: Trigger::Manual { location: None },
            outcome,
            user_declared_emergency: declared,
            auto_sos_dispatched: auto_sos,
            opened_at: DateTime::<Utc>::UNIX_EPOCH,
            closed_at: DateTime::<Utc>::UNIX_EPOCH,
        }
    }

    #[test]
    fn default_status_is_consistent_and_safe() {
        let status = SafetyStatus::default();
        assert!(!status.is_in_danger_zone);
        assert!(status.is_consistent());
    }

    #[test]
    fn danger_without_zone_is_inconsistent() {
        let status = SafetyStatus {
            is_in_danger_zone: true,
            ..SafetyStatus::default()
        };
        assert!(!status.is_consistent());
    }

    #[test]
    fn check_in_status_follows_outcome() {
        assert_eq!(
            report(SessionOutcome::MarkedSafe, false, false).check_in_status(),
            CheckInStatus::Safe
        );
        assert_eq!(
            report(SessionOutcome::AlarmStopped, true, false).check_in_status(),
            CheckInStatus::Unsafe
        );
        assert_eq!(
            report(SessionOutcome::AlarmStopped, false, true).check_in_status(),
            CheckInStatus::Emergency
        );
        assert_eq!(
            report(SessionOutcome::SosDispatched, false, false).check_in_status(),
            CheckInStatus::Emergency
        );
    }

    #[test]
    fn phase_serializes_with_tag() {
        let json = serde_json::to_string(&EscalationPhase::AlarmActive {
            cause: AlarmCause::UserDeclared,
        })
        .unwrap();
        assert_eq!(json, r#"{"phase":"alarm_active","cause":"user_declared"}"#);
    }
}
