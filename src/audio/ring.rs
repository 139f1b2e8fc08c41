//! Rolling buffer of recent mono samples shared with the capture callback
//!
//! The capture callback appends each mono block and immediately snapshots
//! the contents for spectrum and waveform analysis. Both operations happen
//! under the same short-held lock so a concurrent reader never observes a
//! partially-mutated buffer.

use std::collections::VecDeque;
use std::sync::Mutex;

/// Fixed-capacity FIFO of the most recent mono float samples.
///
/// On overflow the oldest samples are discarded first. Room is made before
/// extending, so the preallocated backing store never grows while the lock
/// is held.
pub struct RingBuffer {
    inner: Mutex<VecDeque<f32>>,
    capacity: usize,
}

impl RingBuffer {
    /// Create a ring buffer holding at most `capacity` samples.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append samples, trimming the oldest entries so length never exceeds
    /// capacity.
    pub fn append(&self, samples: &[f32]) {
        let Ok(mut buf) = self.inner.lock() else {
            return;
        };

        // Incoming block alone exceeds capacity: keep only its tail.
        if samples.len() >= self.capacity {
            buf.clear();
            buf.extend(&samples[samples.len() - self.capacity..]);
            return;
        }

        let overflow = (buf.len() + samples.len()).saturating_sub(self.capacity);
        if overflow > 0 {
            buf.drain(..overflow);
        }
        buf.extend(samples);
    }

    /// Copy the current contents in chronological order into `out`.
    ///
    /// `out` is cleared first; reusing one buffer across calls keeps the
    /// steady-state capture path free of allocation.
    pub fn snapshot_into(&self, out: &mut Vec<f32>) {
        out.clear();
        let Ok(buf) = self.inner.lock() else {
            return;
        };
        let (front, back) = buf.as_slices();
        out.extend_from_slice(front);
        out.extend_from_slice(back);
    }

    /// Copy the current contents into a fresh vector.
    pub fn snapshot(&self) -> Vec<f32> {
        let mut out = Vec::new();
        self.snapshot_into(&mut out);
        out
    }

    pub fn len(&self) -> usize {
        self.inner.lock().map(|buf| buf.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        if let Ok(mut buf) = self.inner.lock() {
            buf.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn append_and_snapshot_preserve_order() {
        let ring = RingBuffer::new(8);
        ring.append(&[1.0, 2.0, 3.0]);
        assert_eq!(ring.snapshot(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn length_never_exceeds_capacity() {
        let ring = RingBuffer::new(16);
        for i in 0..50 {
            ring.append(&[i as f32; 7]);
            assert!(ring.len() <= 16);
        }
    }

    #[test]
    fn overflow_discards_oldest_first() {
        let ring = RingBuffer::new(4);
        ring.append(&[0.0, 1.0, 2.0, 3.0]);
        ring.append(&[4.0, 5.0]);
        assert_eq!(ring.snapshot(), vec![2.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn oversized_block_keeps_tail() {
        let ring = RingBuffer::new(3);
        ring.append(&[0.0, 1.0, 2.0, 3.0, 4.0]);
        assert_eq!(ring.snapshot(), vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn snapshot_into_reuses_buffer() {
        let ring = RingBuffer::new(4);
        ring.append(&[1.0, 2.0]);

        let mut out = vec![9.0; 32];
        ring.snapshot_into(&mut out);
        assert_eq!(out, vec![1.0, 2.0]);
    }

    #[test]
    fn concurrent_append_stays_bounded() {
        let ring = Arc::new(RingBuffer::new(128));
        let producer = {
            let ring = ring.clone();
            std::thread::spawn(move || {
                for i in 0..1000 {
                    ring.append(&[i as f32; 13]);
                }
            })
        };

        for _ in 0..200 {
            let snap = ring.snapshot();
            assert!(snap.len() <= 128);
        }
        producer.join().unwrap();
        assert_eq!(ring.len(), 128);
    }
}
