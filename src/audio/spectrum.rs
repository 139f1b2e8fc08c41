//! FFT-based spectrum analysis for voice visualization
//!
//! Turns a windowed block of mono samples into a fixed set of normalized
//! frequency-band energies plus an instantaneous RMS level. Bands are tuned
//! to the fundamental and formant ranges of speech rather than full-range
//! music, so the display responds to a voice instead of room rumble.
//!
//! The analyzer is deterministic: the same input block always produces the
//! same bands. It keeps only scratch buffers across calls, never signal
//! state, and the FFT is planned exactly once at construction.

use std::sync::Arc;

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

use super::CaptureError;

/// Default FFT frame size in samples.
pub const DEFAULT_FFT_SIZE: usize = 2048;
/// Default number of output bands.
pub const DEFAULT_NUM_BANDS: usize = 8;
/// Nominal sample rate used when no live hardware rate is available.
pub const DEFAULT_SAMPLE_RATE: u32 = 44100;

/// Fixed gain applied to the RMS level before clamping.
const LEVEL_GAIN: f32 = 8.0;
/// Strength of the logarithmic band compression curve.
const LOG_COMPRESSION: f32 = 50.0;

/// Ascending, contiguous Hz ranges covering speech fundamentals and the
/// first formant region. Band `i` aggregates FFT bins whose center
/// frequency falls in `[lo, hi)`.
pub const VOICE_BAND_EDGES_HZ: [(f32, f32); 8] = [
    (80.0, 120.0),
    (120.0, 180.0),
    (180.0, 260.0),
    (260.0, 380.0),
    (380.0, 550.0),
    (550.0, 750.0),
    (750.0, 950.0),
    (950.0, 1200.0),
];

/// Spectrum analyzer producing normalized per-band energies in [0, 1].
pub struct SpectrumAnalyzer {
    fft: Arc<dyn Fft<f32>>,
    fft_size: usize,
    num_bands: usize,
    sample_rate: u32,
    window: Vec<f32>,
    frame: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
}

impl SpectrumAnalyzer {
    /// Create an analyzer for the given sample rate, FFT size, and band
    /// count.
    ///
    /// Fails if `fft_size` is not a power of two or `num_bands` exceeds the
    /// configured band table. There is no partially-usable analyzer: a
    /// returned instance is fully ready to process blocks.
    pub fn new(sample_rate: u32, fft_size: usize, num_bands: usize) -> Result<Self, CaptureError> {
        if fft_size == 0 || !fft_size.is_power_of_two() {
            return Err(CaptureError::InvalidFftSize(fft_size));
        }
        if num_bands > VOICE_BAND_EDGES_HZ.len() {
            return Err(CaptureError::TooManyBands {
                requested: num_bands,
                available: VOICE_BAND_EDGES_HZ.len(),
            });
        }

        // Hann window, computed once.
        let window: Vec<f32> = (0..fft_size)
            .map(|i| {
                0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / fft_size as f32).cos())
            })
            .collect();

        let fft = FftPlanner::new().plan_fft_forward(fft_size);
        let scratch = vec![Complex::new(0.0, 0.0); fft.get_inplace_scratch_len()];

        Ok(Self {
            fft,
            fft_size,
            num_bands,
            sample_rate,
            window,
            frame: vec![Complex::new(0.0, 0.0); fft_size],
            scratch,
        })
    }

    /// Analyzer with default frame size and band count for `sample_rate`.
    pub fn for_rate(sample_rate: u32) -> Result<Self, CaptureError> {
        Self::new(sample_rate, DEFAULT_FFT_SIZE, DEFAULT_NUM_BANDS)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn num_bands(&self) -> usize {
        self.num_bands
    }

    /// Compute normalized band energies for a block of mono samples.
    ///
    /// Fewer than `fft_size` samples are zero-padded; more than `fft_size`
    /// uses the most recent frame's worth.
    pub fn process(&mut self, samples: &[f32]) -> Vec<f32> {
        let take = samples.len().min(self.fft_size);
        let start = samples.len() - take;

        for (i, slot) in self.frame.iter_mut().enumerate() {
            let value = if i < take {
                samples[start + i] * self.window[i]
            } else {
                0.0
            };
            *slot = Complex::new(value, 0.0);
        }

        self.fft
            .process_with_scratch(&mut self.frame, &mut self.scratch);

        self.group_into_bands()
    }

    /// Instantaneous level: RMS of the block, scaled by a fixed gain and
    /// clamped to [0, 1]. Empty input yields 0.
    pub fn calculate_level(&self, samples: &[f32]) -> f32 {
        (rms(samples) * LEVEL_GAIN).clamp(0.0, 1.0)
    }

    fn group_into_bands(&self) -> Vec<f32> {
        let half = self.fft_size / 2;
        let bin_hz = self.sample_rate as f32 / self.fft_size as f32;
        let scale = 2.0 / self.fft_size as f32;
        let norm = (1.0 + LOG_COMPRESSION).log10();

        let mut bands = vec![0.0; self.num_bands];
        for (band, &(lo, hi)) in bands.iter_mut().zip(VOICE_BAND_EDGES_HZ.iter()) {
            // Bins whose center frequency (index * rate / fft_size) falls
            // in [lo, hi). A range beyond the available bins stays at 0.
            let lo_bin = (lo / bin_hz).ceil() as usize;
            let hi_bin = ((hi / bin_hz).ceil() as usize).min(half);
            if lo_bin >= hi_bin {
                continue;
            }

            let mut sum = 0.0;
            for bin in lo_bin..hi_bin {
                sum += self.frame[bin].norm() * scale;
            }
            let avg = sum / (hi_bin - lo_bin) as f32;

            // Logarithmic compression for perceptual scaling.
            let compressed = (1.0 + avg * LOG_COMPRESSION).log10() / norm;
            *band = compressed.clamp(0.0, 1.0);
        }

        bands
    }
}

/// Root-mean-square of a sample block.
fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f32 = samples.iter().map(|s| s * s).sum();
    (sum_sq / samples.len() as f32).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, rate: u32, len: usize, amplitude: f32) -> Vec<f32> {
        (0..len)
            .map(|i| {
                amplitude * (2.0 * std::f32::consts::PI * freq * i as f32 / rate as f32).sin()
            })
            .collect()
    }

    #[test]
    fn rejects_non_power_of_two_fft_size() {
        let Err(err) = SpectrumAnalyzer::new(44100, 2000, 8) else {
            panic!("non-power-of-two FFT size was accepted");
        };
        assert!(matches!(err, CaptureError::InvalidFftSize(2000)));
    }

    #[test]
    fn rejects_zero_fft_size() {
        assert!(SpectrumAnalyzer::new(44100, 0, 8).is_err());
    }

    #[test]
    fn rejects_band_count_beyond_table() {
        let Err(err) = SpectrumAnalyzer::new(44100, 2048, 9) else {
            panic!("band count beyond the table was accepted");
        };
        assert!(matches!(
            err,
            CaptureError::TooManyBands { requested: 9, .. }
        ));
    }

    #[test]
    fn silence_yields_zero_level_and_bands() {
        let mut analyzer = SpectrumAnalyzer::for_rate(44100).unwrap();
        let block = vec![0.0; 2048];

        assert_eq!(analyzer.calculate_level(&block), 0.0);
        let bands = analyzer.process(&block);
        assert_eq!(bands.len(), 8);
        for band in bands {
            assert_eq!(band, 0.0);
        }
    }

    #[test]
    fn bands_stay_normalized_for_clipping_input() {
        let mut analyzer = SpectrumAnalyzer::for_rate(44100).unwrap();
        let block = vec![1.0; 2048];

        let bands = analyzer.process(&block);
        for band in bands {
            assert!((0.0..=1.0).contains(&band));
        }
        assert_eq!(analyzer.calculate_level(&block), 1.0);
    }

    #[test]
    fn level_is_gained_rms() {
        let analyzer = SpectrumAnalyzer::for_rate(44100).unwrap();

        // Constant 0.05 signal: RMS 0.05, gained 8x to 0.4.
        let block = vec![0.05; 1024];
        let level = analyzer.calculate_level(&block);
        assert!((level - 0.4).abs() < 1e-5);

        assert_eq!(analyzer.calculate_level(&[]), 0.0);
    }

    #[test]
    fn voice_band_brackets_one_kilohertz_tone() {
        let mut analyzer = SpectrumAnalyzer::for_rate(44100).unwrap();
        let low = sine(50.0, 44100, 2048, 0.5);
        let tone = sine(1000.0, 44100, 2048, 0.5);
        let block: Vec<f32> = low.iter().zip(&tone).map(|(a, b)| a + b).collect();

        let bands = analyzer.process(&block);
        // 1000 Hz sits in the 950-1200 band; 50 Hz falls below every
        // configured range.
        assert!(bands[7] > 0.0);
        assert!(bands[7] > bands[0]);
        assert!(bands[7] > bands[1]);
    }

    #[test]
    fn process_is_deterministic() {
        let mut analyzer = SpectrumAnalyzer::for_rate(44100).unwrap();
        let block = sine(440.0, 44100, 2048, 0.8);

        let first = analyzer.process(&block);
        let second = analyzer.process(&block);
        assert_eq!(first, second);
    }

    #[test]
    fn short_input_is_zero_padded() {
        let mut analyzer = SpectrumAnalyzer::for_rate(44100).unwrap();
        let block = sine(1000.0, 44100, 512, 0.5);

        let bands = analyzer.process(&block);
        assert!(bands[7] > 0.0);
    }

    #[test]
    fn band_beyond_available_bins_is_zero() {
        // At a 1600 Hz sample rate the 950-1200 band lies past every bin.
        let mut analyzer = SpectrumAnalyzer::new(1600, 2048, 8).unwrap();
        let block = vec![0.9; 2048];

        let bands = analyzer.process(&block);
        assert_eq!(bands[7], 0.0);
    }
}
