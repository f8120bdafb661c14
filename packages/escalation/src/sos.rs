//! SOS dispatch contract.

use chrono::{DateTime, Utc};
use sarthi_zone_models::{Position, RiskLevel};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What is known when an SOS goes out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SosRequest {
    /// Session that raised the SOS.
    pub session_id: Uuid,
    /// Last known position, if any.
    pub location: Option<Position>,
    /// Risk level of the zone that opened the session, if any.
    pub zone_risk_level: Option<RiskLevel>,
    /// Whether the auto-SOS countdown fired it (vs. the user).
    pub automatic: bool,
    /// When it was requested.
    pub requested_at: DateTime<Utc>,
}

/// Confirmation shown to the user once an SOS went out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SosAcknowledgment {
    /// Message to display.
    pub message: String,
    /// When the dispatcher accepted the request.
    pub acknowledged_at: DateTime<Utc>,
}

/// Notifies emergency services.
///
/// Called with the [`EscalationController`](crate::EscalationController)
/// state locked, from the ticker task for automatic dispatches.
/// Implementations must not call back into the controller, and slow
/// transports should hand the request off (e.g. to a spawned task) and
/// acknowledge right away.
pub trait SosDispatcher: Send + Sync {
    /// Dispatches the SOS and returns the acknowledgment to show.
    fn trigger(&self, request: &SosRequest) -> SosAcknowledgment;
}

/// Dispatcher that acknowledges locally without contacting anyone.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalAcknowledgment;

impl SosDispatcher for LocalAcknowledgment {
    fn trigger(&self, request: &SosRequest) -> SosAcknowledgment {
        let location = request
            .location
            .map_or_else(|| "unknown location".to_string(), |p| p.to_string());
        log::warn!(
            "SOS TRIGGERED ({}) for session {} at {location}",
            if request.automatic { "automatic" } else { "manual" },
            request.session_id
        );

        SosAcknowledgment {
            message: "Emergency services have been notified. Help is on the way!".to_string(),
            acknowledged_at: Utc::now(),
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use super::*;

    /// Dispatcher that records every request.
    #[derive(Default)]
    pub struct RecordingDispatcher {
        pub requests: Mutex<Vec<SosRequest>>,
    }

    impl RecordingDispatcher {
        pub fn count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }

        pub fn automatic_count(&self) -> usize {
            self.requests
                .lock()
                .unwrap()
                .iter()
                .filter(|r| r.automatic)
                .count()
        }
    }

    impl SosDispatcher for RecordingDispatcher {
        fn trigger(&self, request: &SosRequest) -> SosAcknowledgment {
            self.requests.lock().unwrap().push(request.clone());
            SosAcknowledgment {
                message: "recorded".to_string(),
                acknowledged_at: request.requested_at,
            }
        }
    }
}
