//! Waveform downsampling for display
//!
//! Reduces an arbitrary-length sample buffer to a small fixed number of
//! representative points, one RMS value per contiguous bucket. Display
//! only; the recorded file always carries the full-rate audio.

/// Default number of waveform points published to consumers.
pub const DEFAULT_WAVEFORM_POINTS: usize = 128;

/// Downsample `samples` to at most `target_count` points.
///
/// Buffers no longer than `target_count` are returned unchanged (no
/// padding). Longer buffers are split into `target_count` contiguous
/// chunks of `len / target_count` samples, the last chunk absorbing any
/// remainder, and each chunk is reduced to its RMS. Deterministic and
/// order-preserving.
pub fn downsample(samples: &[f32], target_count: usize) -> Vec<f32> {
    if target_count == 0 || samples.len() <= target_count {
        return samples.to_vec();
    }

    let chunk = samples.len() / target_count;
    let mut points = Vec::with_capacity(target_count);

    for i in 0..target_count {
        let start = i * chunk;
        let end = if i == target_count - 1 {
            samples.len()
        } else {
            start + chunk
        };

        let sum_sq: f32 = samples[start..end].iter().map(|s| s * s).sum();
        points.push((sum_sq / (end - start) as f32).sqrt());
    }

    points
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_input_is_returned_unchanged() {
        let samples: Vec<f32> = (0..100).map(|i| i as f32 / 100.0).collect();
        assert_eq!(downsample(&samples, 128), samples);

        let exact: Vec<f32> = (0..128).map(|i| i as f32).collect();
        assert_eq!(downsample(&exact, 128), exact);
    }

    #[test]
    fn long_input_yields_exactly_target_count_points() {
        for len in [129, 300, 2048, 48000] {
            let samples = vec![0.25; len];
            let points = downsample(&samples, 128);
            assert_eq!(points.len(), 128, "len {len}");
        }
    }

    #[test]
    fn buckets_are_rms() {
        // Two buckets: [0.0, 0.0] and [1.0, 1.0].
        let samples = [0.0, 0.0, 1.0, 1.0];
        let points = downsample(&samples, 2);
        assert_eq!(points, vec![0.0, 1.0]);

        // Constant signal keeps its magnitude regardless of sign.
        let samples = [-0.5f32; 256];
        for point in downsample(&samples, 128) {
            assert!((point - 0.5).abs() < 1e-6);
        }
    }

    #[test]
    fn last_bucket_absorbs_remainder() {
        // 300 samples into 128 buckets: chunk = 2, last bucket covers the
        // final 46 samples.
        let mut samples = vec![0.0; 300];
        for s in samples.iter_mut().skip(254) {
            *s = 1.0;
        }

        let points = downsample(&samples, 128);
        assert_eq!(points.len(), 128);
        assert_eq!(points[126], 0.0);
        assert_eq!(points[127], 1.0);
    }

    #[test]
    fn deterministic_and_order_preserving() {
        let samples: Vec<f32> = (0..1000).map(|i| (i as f32 * 0.01).sin()).collect();
        assert_eq!(downsample(&samples, 64), downsample(&samples, 64));

        // Quiet half then loud half shows up in the same order.
        let mut ramp = vec![0.01; 500];
        ramp.extend(vec![0.9; 500]);
        let points = downsample(&ramp, 10);
        assert!(points[0] < points[9]);
    }
}
