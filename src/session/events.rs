// Session events published by the trial controller
//
// Consumers (operator UI, progress display, loggers) subscribe to a tokio
// broadcast channel. Sending without subscribers is not an error.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::session::presenter::Interval;
use crate::session::record::TrialRecord;

/// Buffer size of the session event channel
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Lifecycle and per-trial events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum SessionEvent {
    FrequencyStarted {
        frequency: f64,
        progress: SessionProgress,
    },
    /// Interval indicator changed; `None` clears it
    IntervalCue { interval: Option<Interval> },
    /// Both intervals played; a response may be submitted
    AwaitingResponse { trial: u32 },
    TrialCompleted(TrialRecord),
    FrequencyCompleted { frequency: f64, reversals: Vec<f64> },
    /// Recoverable presenter fault; the trial can be presented again
    PresentationFailed { code: i32, message: String },
    SessionCompleted { trials: u32 },
}

/// Completed and total test frequencies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionProgress {
    pub completed: usize,
    pub total: usize,
}

impl SessionProgress {
    /// Completion percentage (0-100)
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            self.completed as f64 * 100.0 / self.total as f64
        }
    }
}

/// Owner of the broadcast sender
#[derive(Debug, Clone)]
pub struct EventChannel {
    tx: broadcast::Sender<SessionEvent>,
}

impl EventChannel {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Subscribe to session events
    ///
    /// Receivers only see events sent after subscribing. Slow receivers lag
    /// and lose the oldest events.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }

    pub fn publish(&self, event: SessionEvent) {
        // Err only means there are no receivers right now
        let _ = self.tx.send(event);
    }
}

impl Default for EventChannel {
    fn default() -> Self {
        Self::new()
    }
}
