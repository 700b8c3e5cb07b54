// Session module - trial sequencing and its collaborators
//
// The controller owns the per-frequency staircase and stimulus; audio
// playback, persistence and listener input sit behind traits.

pub mod config;
pub mod controller;
pub mod events;
pub mod listener;
pub mod presenter;
pub mod record;
pub mod recorder;

pub use config::{SessionConfig, StimulusSettings, TimingConfig};
pub use controller::{ControllerState, FrequencyResult, TrialController, TrialCue, TrialOutcome};
pub use events::{EventChannel, SessionEvent, SessionProgress};
pub use listener::{Listener, SimulatedListener};
pub use presenter::{Interval, PresentationRequest, Presenter, SilentPresenter};
pub use record::TrialRecord;
pub use recorder::{CsvRecorder, MemoryRecorder, TrialRecorder};
