#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Emergency escalation for alert sessions.
//!
//! A session opens when the subject enters a dangerous zone (or on a manual
//! test). The user has a response countdown to answer "I'm Safe" or "I Need
//! Help"; silence raises a looping alarm, and an unanswered alarm dispatches
//! an SOS exactly once. The transition logic lives in the pure
//! [`EscalationMachine`]; [`EscalationSession`] executes its effects against
//! an [`AudioPlayer`] and an [`SosDispatcher`], and [`EscalationController`]
//! drives sessions from a tokio interval.

pub mod audio;
pub mod controller;
pub mod machine;
pub mod session;
pub mod sos;

pub use audio::{AlarmSlot, AudioHandle, AudioPlayer, SilentPlayer};
pub use controller::EscalationController;
pub use machine::{Effect, EscalationMachine, EscalationTimings, UserAction};
pub use session::{EscalationEvent, EscalationSession};
pub use sos::{LocalAcknowledgment, SosAcknowledgment, SosDispatcher, SosRequest};

use thiserror::Error;

/// Errors from an [`AudioPlayer`].
#[derive(Debug, Error)]
pub enum AudioError {
    /// The sound could not be loaded.
    #[error("Failed to load alert sound: {message}")]
    Load {
        /// Loader detail.
        message: String,
    },

    /// The host cannot play sound right now.
    #[error("Audio unavailable: {message}")]
    Unavailable {
        /// Platform detail.
        message: String,
    },
}
