//! Audio capture core
//!
//! Everything that runs on or feeds the real-time capture path lives here:
//! the rolling sample buffer, spectrum analysis, waveform downsampling,
//! session file writing, and the engine that ties them together inside the
//! hardware callback.

use thiserror::Error;

pub mod engine;
pub mod ring;
pub mod session;
pub mod spectrum;
pub mod waveform;
pub mod writer;

pub use engine::{AudioCaptureEngine, AudioDeviceInfo, EngineConfig};
pub use ring::RingBuffer;
pub use spectrum::SpectrumAnalyzer;
pub use waveform::downsample;
pub use writer::{BlockWriter, WavBlockWriter};

/// Capture error taxonomy.
///
/// `start` surfaces the first four synchronously; `Write` is per-block,
/// counted, and only ever reported as a post-session warning. Cleanup
/// failures are logged and never propagated.
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("microphone permission denied")]
    PermissionDenied,

    #[error("a recording session is already active")]
    AlreadyRecording,

    #[error("no audio input device available")]
    NoInputDevice,

    #[error("audio engine setup failed: {0}")]
    EngineSetup(String),

    #[error("output file setup failed: {0}")]
    FileSetup(String),

    #[error("audio write failed: {0}")]
    Write(String),

    #[error("FFT size {0} is not a power of two")]
    InvalidFftSize(usize),

    #[error("requested {requested} bands but only {available} are configured")]
    TooManyBands { requested: usize, available: usize },
}
