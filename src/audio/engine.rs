//! Capture engine and per-block pipeline
//!
//! The engine owns the cpal input stream and the session lifecycle. Work
//! that must happen on every hardware block is isolated in
//! [`BlockPipeline`]: downmix to mono, best-effort file write, ring-buffer
//! update, level/spectrum/waveform computation, and a fire-and-forget
//! publish to consumers. The pipeline reuses preallocated scratch buffers
//! so the steady-state callback does not allocate.
//!
//! Lifecycle calls (`start`/`stop`/`cancel`/`cleanup`) are expected on the
//! controlling thread only; the engine deliberately holds the
//! `cpal::Stream` and is therefore not `Send`.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, StreamConfig};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::ring::RingBuffer;
use super::session::{self, RecordingSession};
use super::spectrum::{self, SpectrumAnalyzer};
use super::waveform::{self, downsample};
use super::writer::{BlockWriter, WavBlockWriter};
use super::CaptureError;
use crate::permission::{AssumeGranted, PermissionHandle};
use crate::state::{CaptureSnapshot, SharedState, UpdateReceiver};
use crate::volume::VolumeBoostHandle;

/// Writer slot shared between the callback and the controlling thread;
/// `stop` takes the writer out to finalize it after the stream is gone.
type SharedWriter = Arc<Mutex<Option<Box<dyn BlockWriter>>>>;

/// Tunables for the capture pipeline.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Ring buffer capacity in mono samples.
    pub ring_capacity: usize,
    /// FFT frame size for spectrum analysis (power of two).
    pub fft_size: usize,
    /// Number of published frequency bands.
    pub num_bands: usize,
    /// Number of published waveform points.
    pub waveform_points: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ring_capacity: spectrum::DEFAULT_FFT_SIZE,
            fft_size: spectrum::DEFAULT_FFT_SIZE,
            num_bands: spectrum::DEFAULT_NUM_BANDS,
            waveform_points: waveform::DEFAULT_WAVEFORM_POINTS,
        }
    }
}

/// Information about an available input device.
#[derive(Debug, Serialize)]
pub struct AudioDeviceInfo {
    pub name: String,
    pub is_default: bool,
    pub sample_rates: Vec<u32>,
    pub formats: Vec<String>,
}

/// List input devices on the default host.
pub fn list_input_devices() -> Result<Vec<AudioDeviceInfo>, CaptureError> {
    let host = cpal::default_host();
    let default_name = host
        .default_input_device()
        .and_then(|d| d.name().ok());

    let devices = host
        .input_devices()
        .map_err(|e| CaptureError::EngineSetup(e.to_string()))?;

    let mut infos = Vec::new();
    for device in devices {
        let name = device.name().unwrap_or_else(|_| "Unknown Device".into());
        let configs: Vec<_> = match device.supported_input_configs() {
            Ok(configs) => configs.collect(),
            Err(_) => Vec::new(),
        };

        infos.push(AudioDeviceInfo {
            is_default: default_name.as_deref() == Some(name.as_str()),
            sample_rates: configs.iter().map(|c| c.max_sample_rate().0).collect(),
            formats: configs
                .iter()
                .map(|c| format!("{:?}", c.sample_format()))
                .collect(),
            name,
        });
    }

    Ok(infos)
}

/// Microphone capture engine: one active session at a time, visualization
/// published on every hardware block.
pub struct AudioCaptureEngine {
    config: EngineConfig,
    permission: PermissionHandle,
    boost: Option<VolumeBoostHandle>,
    state: SharedState,
    active: Option<ActiveSession>,
    /// Output path of the current or most recent session; cleared when
    /// `cancel`/`cleanup` deletes the file.
    tracked_file: Option<PathBuf>,
}

struct ActiveSession {
    /// None only in stream-less test sessions.
    stream: Option<cpal::Stream>,
    writer: SharedWriter,
    write_errors: Arc<AtomicU32>,
    session: RecordingSession,
}

impl Default for AudioCaptureEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioCaptureEngine {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            config,
            permission: Arc::new(AssumeGranted),
            boost: None,
            state: SharedState::new(),
            active: None,
            tracked_file: None,
        }
    }

    /// Replace the permission oracle consulted before each start.
    pub fn with_permission(mut self, oracle: PermissionHandle) -> Self {
        self.permission = oracle;
        self
    }

    /// Attach an optional input volume boost service.
    pub fn with_volume_boost(mut self, boost: VolumeBoostHandle) -> Self {
        self.boost = Some(boost);
        self
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> CaptureSnapshot {
        self.state.get()
    }

    /// Subscribe to per-block state updates.
    pub fn subscribe(&self) -> UpdateReceiver {
        self.state.subscribe()
    }

    pub fn is_recording(&self) -> bool {
        self.active.is_some()
    }

    /// Start a new recording session.
    ///
    /// Rejects re-entry while a session is active, checks permission before
    /// touching hardware, and rolls back fully on any setup failure (no
    /// orphaned file, no public state change). Every failed attempt
    /// triggers a permission recheck.
    pub fn start(&mut self) -> Result<(), CaptureError> {
        if self.active.is_some() {
            warn!("start requested while a session is already active");
            return Err(CaptureError::AlreadyRecording);
        }
        if !self.permission.is_granted() {
            warn!("start rejected: microphone permission denied");
            self.permission.recheck();
            return Err(CaptureError::PermissionDenied);
        }

        match self.start_stream() {
            Ok(()) => Ok(()),
            Err(e) => {
                self.permission.recheck();
                Err(e)
            }
        }
    }

    fn start_stream(&mut self) -> Result<(), CaptureError> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or(CaptureError::NoInputDevice)?;
        let supported = device
            .default_input_config()
            .map_err(|e| CaptureError::EngineSetup(e.to_string()))?;
        let sample_format = supported.sample_format();
        let stream_config: StreamConfig = supported.into();
        let sample_rate = stream_config.sample_rate.0;
        let channels = stream_config.channels as usize;

        let path = session::allocate_output_path()?;
        let writer: SharedWriter = match WavBlockWriter::create(&path, sample_rate) {
            Ok(w) => Arc::new(Mutex::new(Some(Box::new(w) as Box<dyn BlockWriter>))),
            Err(e) => {
                session::remove_output_file(&path);
                return Err(e);
            }
        };

        // Analyzer construction uses the live hardware rate so the band
        // table never skews against the actual bin spacing. Failure here
        // is degraded mode, not a start failure.
        let analyzer =
            match SpectrumAnalyzer::new(sample_rate, self.config.fft_size, self.config.num_bands) {
                Ok(a) => Some(a),
                Err(e) => {
                    warn!(error = %e, "spectrum analyzer unavailable, recording without visualization");
                    None
                }
            };

        let write_errors = Arc::new(AtomicU32::new(0));
        let pipeline = BlockPipeline::new(
            channels,
            &self.config,
            analyzer,
            writer.clone(),
            write_errors.clone(),
            self.state.clone(),
        );

        let built = match sample_format {
            SampleFormat::F32 => build_input_stream::<f32>(&device, &stream_config, pipeline),
            SampleFormat::I16 => build_input_stream::<i16>(&device, &stream_config, pipeline),
            SampleFormat::U16 => build_input_stream::<u16>(&device, &stream_config, pipeline),
            other => Err(CaptureError::EngineSetup(format!(
                "unsupported sample format {other:?}"
            ))),
        };

        let stream = match built.and_then(|s| {
            s.play()
                .map_err(|e| CaptureError::EngineSetup(e.to_string()))
                .map(|()| s)
        }) {
            Ok(s) => s,
            Err(e) => {
                // Release the handle before deleting the file.
                if let Ok(mut guard) = writer.lock() {
                    guard.take();
                }
                session::remove_output_file(&path);
                return Err(e);
            }
        };

        if let Some(boost) = &self.boost {
            if let Err(e) = boost.boost() {
                debug!(error = %e, "volume boost failed");
            }
        }

        let session = RecordingSession::begin(path.clone());
        let started_at = session.started_at;
        info!(
            path = %path.display(),
            sample_rate,
            channels,
            format = ?sample_format,
            "recording started"
        );

        self.tracked_file = Some(path);
        self.active = Some(ActiveSession {
            stream: Some(stream),
            writer,
            write_errors,
            session,
        });
        let num_bands = self.config.num_bands;
        self.state.publish(move |s| {
            s.is_recording = true;
            s.session_start = Some(started_at);
            s.audio_level = 0.0;
            s.frequency_bands = vec![0.0; num_bands];
            s.waveform = Vec::new();
        });

        Ok(())
    }

    /// Stop the active session and return the recorded file's location.
    ///
    /// Buffered audio is flushed before this returns, so the caller may
    /// read the file immediately. Returns None when no session is active.
    pub fn stop(&mut self) -> Option<PathBuf> {
        let active = self.active.take()?;
        let duration = active.session.started.elapsed();
        let path = active.session.path.clone();

        self.teardown(active);

        let num_bands = self.config.num_bands;
        self.state.publish(move |s| {
            s.is_recording = false;
            s.audio_level = 0.0;
            s.frequency_bands = vec![0.0; num_bands];
            s.waveform = Vec::new();
            s.session_start = None;
            s.last_duration = Some(duration);
        });

        info!(path = %path.display(), ?duration, "recording stopped");
        Some(path)
    }

    /// Stop the active session and delete its output file.
    pub fn cancel(&mut self) {
        let Some(active) = self.active.take() else {
            return;
        };
        let path = active.session.path.clone();

        self.teardown(active);
        session::remove_output_file(&path);
        self.tracked_file = None;

        let num_bands = self.config.num_bands;
        self.state.publish(move |s| {
            s.is_recording = false;
            s.audio_level = 0.0;
            s.frequency_bands = vec![0.0; num_bands];
            s.waveform = Vec::new();
            s.session_start = None;
        });

        info!(path = %path.display(), "recording cancelled");
    }

    /// Delete any tracked output file, tearing down an active session
    /// first. Idempotent.
    pub fn cleanup(&mut self) {
        if let Some(active) = self.active.take() {
            let num_bands = self.config.num_bands;
            self.teardown(active);
            self.state.publish(move |s| {
                s.is_recording = false;
                s.audio_level = 0.0;
                s.frequency_bands = vec![0.0; num_bands];
                s.waveform = Vec::new();
                s.session_start = None;
            });
        }
        if let Some(path) = self.tracked_file.take() {
            session::remove_output_file(&path);
        }
    }

    /// Common teardown: remove the callback, restore volume, flush and
    /// release the file handle, and surface the per-session write-error
    /// tally as a single warning.
    fn teardown(&mut self, active: ActiveSession) {
        drop(active.stream);

        if let Some(boost) = &self.boost {
            if let Err(e) = boost.restore() {
                debug!(error = %e, "volume restore failed");
            }
        }

        if let Ok(mut guard) = active.writer.lock() {
            if let Some(writer) = guard.take() {
                if let Err(e) = writer.finalize() {
                    warn!(error = %e, "failed to finalize session file");
                }
            }
        }

        let dropped = active.write_errors.load(Ordering::Relaxed);
        if dropped > 0 {
            warn!(
                dropped_blocks = dropped,
                "recording may be incomplete: some audio blocks failed to write"
            );
        }
    }

    #[cfg(test)]
    fn install_test_session(
        &mut self,
        path: PathBuf,
        writer: SharedWriter,
        write_errors: Arc<AtomicU32>,
    ) {
        self.tracked_file = Some(path.clone());
        self.active = Some(ActiveSession {
            stream: None,
            writer,
            write_errors,
            session: RecordingSession::begin(path),
        });
    }
}

fn build_input_stream<T>(
    device: &Device,
    config: &StreamConfig,
    mut pipeline: BlockPipeline,
) -> Result<cpal::Stream, CaptureError>
where
    T: cpal::SizedSample + Send + 'static,
    f32: cpal::FromSample<T>,
{
    let mut converted: Vec<f32> = Vec::new();
    device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                converted.clear();
                converted.extend(data.iter().map(|&s| {
                    let sample: f32 = cpal::Sample::from_sample(s);
                    sample
                }));
                pipeline.process_block(&converted);
            },
            |err| warn!(error = %err, "input stream error"),
            None,
        )
        .map_err(|e| CaptureError::EngineSetup(e.to_string()))
}

/// Everything the capture callback touches per hardware block.
struct BlockPipeline {
    channels: usize,
    ring: RingBuffer,
    analyzer: Option<SpectrumAnalyzer>,
    writer: SharedWriter,
    write_errors: Arc<AtomicU32>,
    write_failure_logged: bool,
    num_bands: usize,
    waveform_points: usize,
    state: SharedState,
    // Scratch reused across blocks.
    mono: Vec<f32>,
    ring_snapshot: Vec<f32>,
}

impl BlockPipeline {
    fn new(
        channels: usize,
        config: &EngineConfig,
        analyzer: Option<SpectrumAnalyzer>,
        writer: SharedWriter,
        write_errors: Arc<AtomicU32>,
        state: SharedState,
    ) -> Self {
        Self {
            channels: channels.max(1),
            ring: RingBuffer::new(config.ring_capacity),
            analyzer,
            writer,
            write_errors,
            write_failure_logged: false,
            num_bands: config.num_bands,
            waveform_points: config.waveform_points,
            state,
            mono: Vec::with_capacity(config.ring_capacity),
            ring_snapshot: Vec::with_capacity(config.ring_capacity),
        }
    }

    fn process_block(&mut self, interleaved: &[f32]) {
        downmix_into(interleaved, self.channels, &mut self.mono);

        // Best-effort file append; failures are counted, not escalated,
        // and only the first is logged per session.
        if let Ok(mut guard) = self.writer.lock() {
            if let Some(writer) = guard.as_mut() {
                if let Err(e) = writer.write_block(&self.mono) {
                    self.write_errors.fetch_add(1, Ordering::Relaxed);
                    if !self.write_failure_logged {
                        self.write_failure_logged = true;
                        warn!(error = %e, "audio block write failed, recording continues");
                    }
                }
            }
        }

        self.ring.append(&self.mono);
        self.ring.snapshot_into(&mut self.ring_snapshot);

        // Level comes from the raw block; bands from the ring snapshot.
        // No analyzer means degraded visuals, never a stopped recording.
        let (level, bands) = match self.analyzer.as_mut() {
            Some(analyzer) => (
                analyzer.calculate_level(&self.mono),
                analyzer.process(&self.ring_snapshot),
            ),
            None => (0.0, vec![0.0; self.num_bands]),
        };
        let waveform = downsample(&self.ring_snapshot, self.waveform_points);

        self.state.publish(move |s| {
            s.audio_level = level;
            s.frequency_bands = bands;
            s.waveform = waveform;
        });
    }
}

/// Average interleaved frames across channels into `out`. Single-channel
/// input is passed through unchanged; a trailing partial frame is ignored.
fn downmix_into(interleaved: &[f32], channels: usize, out: &mut Vec<f32>) {
    out.clear();
    if channels <= 1 {
        out.extend_from_slice(interleaved);
        return;
    }
    for frame in interleaved.chunks_exact(channels) {
        out.push(frame.iter().sum::<f32>() / channels as f32);
    }
}
