//! A position source fed by the host.
//!
//! For hosts that receive fixes through their own callbacks (or replay them
//! from a file): every [`ChannelSource::push`] is delivered to all live
//! watches.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;

use crate::LocationError;
use crate::source::{PositionSource, PositionUpdate, PositionWatch, RawFix, WatchId, WatchOptions};

/// Position source whose fixes are pushed by hand.
#[derive(Debug, Default)]
pub struct ChannelSource {
    next_id: Mutex<u64>,
    senders: Mutex<BTreeMap<WatchId, mpsc::UnboundedSender<PositionUpdate>>>,
}

impl ChannelSource {
    /// Creates a source with no watches.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn senders(&self) -> MutexGuard<'_, BTreeMap<WatchId, mpsc::UnboundedSender<PositionUpdate>>> {
        self.senders.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Delivers `update` to every live watch. Returns how many received it.
    pub fn push(&self, update: &PositionUpdate) -> usize {
        let mut senders = self.senders();
        senders.retain(|_, sender| !sender.is_closed());
        senders
            .values()
            .filter(|sender| sender.send(update.clone()).is_ok())
            .count()
    }

    /// Delivers a bare fix.
    pub fn push_fix(&self, latitude: f64, longitude: f64) -> usize {
        self.push(&Ok(RawFix::new(latitude, longitude)))
    }

    /// Ends every watch, as if the platform stopped delivering.
    pub fn close_all(&self) {
        self.senders().clear();
    }

    /// Number of live watches.
    #[must_use]
    pub fn watch_count(&self) -> usize {
        self.senders().len()
    }
}

impl PositionSource for ChannelSource {
    fn is_supported(&self) -> bool {
        true
    }

    fn watch(&self, _options: &WatchOptions) -> Result<PositionWatch, LocationError> {
        let id = {
            let mut next_id = self.next_id.lock().unwrap_or_else(PoisonError::into_inner);
            *next_id += 1;
            WatchId(*next_id)
        };
        let (tx, updates) = mpsc::unbounded_channel();
        self.senders().insert(id, tx);
        Ok(PositionWatch { id, updates })
    }

    fn clear_watch(&self, id: WatchId) {
        self.senders().remove(&id);
    }
}
