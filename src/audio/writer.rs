//! Session file writing
//!
//! The capture callback hands each mono block to a [`BlockWriter`]. Writes
//! are best-effort on that path: a failed block is counted by the engine
//! and recording continues. `finalize` flushes buffered audio and releases
//! the handle, so the file is complete before the caller reads it.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use hound::{WavSpec, WavWriter};

use super::CaptureError;

/// Destination for successive audio blocks of one recording session.
pub trait BlockWriter: Send {
    /// Append a block of mono samples in [-1.0, 1.0].
    fn write_block(&mut self, samples: &[f32]) -> Result<(), CaptureError>;

    /// Flush buffered audio and release the file handle.
    fn finalize(self: Box<Self>) -> Result<(), CaptureError>;
}

/// Mono 16-bit PCM WAV writer backed by buffered file I/O.
pub struct WavBlockWriter {
    writer: WavWriter<BufWriter<File>>,
}

impl WavBlockWriter {
    /// Create the session file at `path` for the given sample rate.
    pub fn create(path: &Path, sample_rate: u32) -> Result<Self, CaptureError> {
        let spec = WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let writer = WavWriter::create(path, spec)
            .map_err(|e| CaptureError::FileSetup(e.to_string()))?;
        Ok(Self { writer })
    }
}

impl BlockWriter for WavBlockWriter {
    fn write_block(&mut self, samples: &[f32]) -> Result<(), CaptureError> {
        for &sample in samples {
            let value = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
            self.writer
                .write_sample(value)
                .map_err(|e| CaptureError::Write(e.to_string()))?;
        }
        Ok(())
    }

    fn finalize(self: Box<Self>) -> Result<(), CaptureError> {
        self.writer
            .finalize()
            .map_err(|e| CaptureError::Write(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_mono_wav_at_requested_rate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.wav");

        let mut writer = Box::new(WavBlockWriter::create(&path, 48000).unwrap());
        writer.write_block(&[0.0, 0.5, -0.5]).unwrap();
        writer.write_block(&[1.0, -1.0]).unwrap();
        writer.finalize().unwrap();

        let reader = hound::WavReader::open(&path).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, 48000);
        assert_eq!(spec.bits_per_sample, 16);
        assert_eq!(reader.len(), 5);
    }

    #[test]
    fn out_of_range_samples_are_clamped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clipped.wav");

        let mut writer = Box::new(WavBlockWriter::create(&path, 16000).unwrap());
        writer.write_block(&[2.0, -2.0]).unwrap();
        writer.finalize().unwrap();

        let mut reader = hound::WavReader::open(&path).unwrap();
        let samples: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(samples, vec![i16::MAX, i16::MIN + 1]);
    }

    #[test]
    fn create_fails_for_missing_directory() {
        let Err(err) = WavBlockWriter::create(Path::new("/nonexistent/dir/out.wav"), 44100) else {
            panic!("create succeeded in a missing directory");
        };
        assert!(matches!(err, CaptureError::FileSetup(_)));
    }
}
