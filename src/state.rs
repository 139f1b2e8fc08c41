//! Published capture state
//!
//! The engine emits a value-type snapshot on every hardware block and on
//! lifecycle transitions. Consumers either poll [`SharedState::get`] or
//! subscribe to an unbounded update channel; sending is fire-and-forget so
//! a slow consumer can never back-pressure the capture callback.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use jiff::Timestamp;
use serde::Serialize;
use tokio::sync::mpsc;

/// Snapshot of everything UI collaborators consume.
#[derive(Debug, Clone, Serialize, Default)]
pub struct CaptureSnapshot {
    /// Whether a recording session is active.
    pub is_recording: bool,
    /// Instantaneous input level in [0, 1].
    pub audio_level: f32,
    /// Normalized frequency-band energies, each in [0, 1].
    pub frequency_bands: Vec<f32>,
    /// Downsampled waveform points (at most the configured target count).
    pub waveform: Vec<f32>,
    /// Wall-clock start of the active session, if any.
    pub session_start: Option<Timestamp>,
    /// Duration of the most recently completed session.
    pub last_duration: Option<Duration>,
}

/// Receiver half of the update stream.
pub type UpdateReceiver = mpsc::UnboundedReceiver<CaptureSnapshot>;
pub(crate) type UpdateSender = mpsc::UnboundedSender<CaptureSnapshot>;

/// Shared, lock-guarded copy of the latest snapshot plus its subscribers.
///
/// Cloning is cheap; the engine and the capture callback hold clones of
/// the same underlying state.
#[derive(Clone, Default)]
pub struct SharedState {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    snapshot: CaptureSnapshot,
    subscribers: Vec<UpdateSender>,
}

impl SharedState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest published snapshot.
    pub fn get(&self) -> CaptureSnapshot {
        self.inner
            .lock()
            .map(|inner| inner.snapshot.clone())
            .unwrap_or_default()
    }

    /// Register a new subscriber; every subsequent publish is delivered.
    pub fn subscribe(&self) -> UpdateReceiver {
        let (tx, rx) = mpsc::unbounded_channel();
        if let Ok(mut inner) = self.inner.lock() {
            inner.subscribers.push(tx);
        }
        rx
    }

    /// Apply `update` to the snapshot and fan it out to subscribers.
    ///
    /// Never blocks: sends go through unbounded channels and closed
    /// subscribers are dropped on the way.
    pub(crate) fn publish(&self, update: impl FnOnce(&mut CaptureSnapshot)) {
        let Ok(mut inner) = self.inner.lock() else {
            return;
        };
        update(&mut inner.snapshot);
        let snapshot = inner.snapshot.clone();
        inner.subscribers.retain(|tx| tx.send(snapshot.clone()).is_ok());
    }
}
