//! voxcap: microphone capture with live visualization
//!
//! Captures the default input device to a session-scoped WAV file while
//! computing an instantaneous level, eight voice-tuned frequency bands,
//! and a downsampled waveform inside the capture callback. Consumers poll
//! the published snapshot or subscribe to a non-blocking update channel.
//!
//! ```no_run
//! use voxcap::AudioCaptureEngine;
//!
//! let mut engine = AudioCaptureEngine::new();
//! engine.start().expect("start capture");
//! // ... UI renders engine.snapshot() while recording ...
//! let recorded = engine.stop();
//! println!("recorded to {recorded:?}");
//! ```

pub mod audio;
pub mod permission;
pub mod state;
pub mod volume;

pub use audio::engine::list_input_devices;
pub use audio::{AudioCaptureEngine, CaptureError, EngineConfig};
pub use permission::{AssumeGranted, PermissionOracle};
pub use state::{CaptureSnapshot, SharedState, UpdateReceiver};
pub use volume::VolumeBoost;
