//! Alarm audio.
//!
//! The alarm sound is an owned resource of the session: [`AlarmSlot`] holds
//! at most one playing [`AudioHandle`] and releases it on every exit path,
//! including drop.

use std::sync::Arc;

use crate::AudioError;

/// A sound that is currently playing.
///
/// Same calling rules as [`AudioPlayer`].
pub trait AudioHandle: Send {
    /// Stops playback and releases the sound. Called at most once.
    fn stop(&mut self);
}

/// Plays the alert sound.
///
/// Called with the [`EscalationController`](crate::EscalationController)
/// state locked, possibly from a runtime worker. Implementations must return
/// promptly and must not call back into the controller.
pub trait AudioPlayer: Send + Sync {
    /// Starts the alert sound, looping until stopped when `looping` is set.
    ///
    /// # Errors
    ///
    /// Returns [`AudioError`] if the sound cannot be loaded or played.
    fn play(&self, looping: bool) -> Result<Box<dyn AudioHandle>, AudioError>;
}

/// Player for hosts without audio output.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentPlayer;

impl AudioPlayer for SilentPlayer {
    fn play(&self, _looping: bool) -> Result<Box<dyn AudioHandle>, AudioError> {
        Err(AudioError::Unavailable {
            message: "no audio output configured".to_string(),
        })
    }
}

/// The single alarm sound slot of a session.
pub struct AlarmSlot {
    player: Arc<dyn AudioPlayer>,
    handle: Option<Box<dyn AudioHandle>>,
    started: bool,
}

impl AlarmSlot {
    /// Creates an empty slot.
    #[must_use]
    pub fn new(player: Arc<dyn AudioPlayer>) -> Self {
        Self {
            player,
            handle: None,
            started: false,
        }
    }

    /// Starts the looping alarm unless this activation already started it.
    ///
    /// A failed start still counts as started: the alarm proceeds silently
    /// and is not retried.
    pub fn start(&mut self) {
        if self.started {
            log::debug!("Alarm audio already started");
            return;
        }
        self.started = true;

        match self.player.play(true) {
            Ok(handle) => self.handle = Some(handle),
            Err(e) => log::warn!("Alarm audio unavailable, continuing silently: {e}"),
        }
    }

    /// Stops and releases the alarm. Idempotent.
    pub fn stop(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            handle.stop();
        }
        self.started = false;
    }

    /// Whether a sound is playing.
    #[must_use]
    pub const fn is_playing(&self) -> bool {
        self.handle.is_some()
    }
}

impl Drop for AlarmSlot {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use super::*;

    /// Player that counts plays and currently playing handles.
    #[derive(Default)]
    pub struct CountingPlayer {
        pub plays: Arc<AtomicUsize>,
        pub playing: Arc<AtomicUsize>,
        pub fail: AtomicBool,
    }

    struct CountingHandle {
        playing: Arc<AtomicUsize>,
    }

    impl AudioHandle for CountingHandle {
        fn stop(&mut self) {
            self.playing.fetch_sub(1, Ordering::SeqCst);
        }
    }

    impl CountingPlayer {
        pub fn plays(&self) -> usize {
            self.plays.load(Ordering::SeqCst)
        }

        pub fn playing(&self) -> usize {
            self.playing.load(Ordering::SeqCst)
        }
    }

    impl AudioPlayer for CountingPlayer {
        fn play(&self, looping: bool) -> Result<Box<dyn AudioHandle>, AudioError> {
            assert!(looping, "alarm must loop");
            self.plays.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                return Err(AudioError::Unavailable {
                    message: "test".to_string(),
                });
            }
            self.playing.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(CountingHandle {
                playing: Arc::clone(&self.playing),
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::testing::CountingPlayer;
    use super::*;

    #[test]
    fn start_is_idempotent() {
        let player = Arc::new(CountingPlayer::default());
        let mut slot = AlarmSlot::new(Arc::clone(&player) as Arc<dyn AudioPlayer>);

        slot.start();
        slot.start();

        assert_eq!(player.plays(), 1);
        assert_eq!(player.playing(), 1);
        assert!(slot.is_playing());
    }

    #[test]
    fn stop_and_drop_release_the_sound() {
        let player = Arc::new(CountingPlayer::default());
        let mut slot = AlarmSlot::new(Arc::clone(&player) as Arc<dyn AudioPlayer>);

        slot.start();
        slot.stop();
        slot.stop();
        assert_eq!(player.playing(), 0);

        slot.start();
        drop(slot);
        assert_eq!(player.playing(), 0);
        assert_eq!(player.plays(), 2);
    }

    #[test]
    fn failed_start_is_not_retried() {
        let player = Arc::new(CountingPlayer::default());
        player.fail.store(true, Ordering::SeqCst);
        let mut slot = AlarmSlot::new(Arc::clone(&player) as Arc<dyn AudioPlayer>);

        slot.start();
        slot.start();

        assert_eq!(player.plays(), 1);
        assert!(!slot.is_playing());
    }
}
