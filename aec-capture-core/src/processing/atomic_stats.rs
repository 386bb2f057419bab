//! Lock-free capture statistics.
//!
//! Everything here is written from the real-time callback and read from the
//! control thread. Updates are plain atomic adds or a compare-and-swap retry
//! loop; nothing blocks or allocates.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

/// A running maximum of `f32` values stored as raw bits in an `AtomicU32`.
#[derive(Debug)]
pub struct AtomicF32Max {
    bits: AtomicU32,
}

impl AtomicF32Max {
    pub fn new(initial: f32) -> Self {
        Self {
            bits: AtomicU32::new(initial.to_bits()),
        }
    }

    pub fn load(&self) -> f32 {
        f32::from_bits(self.bits.load(Ordering::Acquire))
    }

    /// Raise the stored maximum to `candidate` if it is larger.
    ///
    /// Returns `true` if this call changed the value. NaN never wins.
    pub fn merge(&self, candidate: f32) -> bool {
        let mut current = self.bits.load(Ordering::Relaxed);
        loop {
            if !(candidate > f32::from_bits(current)) {
                return false;
            }
            match self.bits.compare_exchange_weak(
                current,
                candidate.to_bits(),
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }
}

impl Default for AtomicF32Max {
    fn default() -> Self {
        Self::new(0.0)
    }
}

/// Point-in-time copy of `CaptureStatistics`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StatisticsSnapshot {
    /// Callback invocations observed, including those outside the active window.
    pub callback_count: u64,
    /// Frames delivered by the engine, including those outside the active window.
    pub total_frames: u64,
    /// Frames pushed into the hand-off queue during the active window.
    pub appended_frames: u64,
    /// Frames discarded because the hand-off queue was full.
    pub dropped_frames: u64,
    pub max_amplitude: f32,
    pub max_rms: f32,
}

/// Running statistics shared between the callback and the control thread.
#[derive(Debug, Default)]
pub struct CaptureStatistics {
    callback_count: AtomicU64,
    total_frames: AtomicU64,
    appended_frames: AtomicU64,
    dropped_frames: AtomicU64,
    max_amplitude: AtomicF32Max,
    max_rms: AtomicF32Max,
}

impl CaptureStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one callback invocation carrying `frames` frames.
    pub fn record_callback(&self, frames: usize) -> u64 {
        self.total_frames.fetch_add(frames as u64, Ordering::Relaxed);
        self.callback_count.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn record_levels(&self, peak: f32, rms: f32) {
        self.max_amplitude.merge(peak);
        self.max_rms.merge(rms);
    }

    pub fn record_appended(&self, frames: usize) {
        self.appended_frames.fetch_add(frames as u64, Ordering::Relaxed);
    }

    pub fn record_dropped(&self, frames: usize) {
        self.dropped_frames.fetch_add(frames as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatisticsSnapshot {
        StatisticsSnapshot {
            callback_count: self.callback_count.load(Ordering::Relaxed),
            total_frames: self.total_frames.load(Ordering::Relaxed),
            appended_frames: self.appended_frames.load(Ordering::Relaxed),
            dropped_frames: self.dropped_frames.load(Ordering::Relaxed),
            max_amplitude: self.max_amplitude.load(),
            max_rms: self.max_rms.load(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn merge_keeps_maximum() {
        let max = AtomicF32Max::default();
        assert!(max.merge(0.25));
        assert!(!max.merge(0.1));
        assert!(max.merge(0.75));
        assert_eq!(max.load(), 0.75);
    }

    #[test]
    fn merge_ignores_nan() {
        let max = AtomicF32Max::new(0.5);
        assert!(!max.merge(f32::NAN));
        assert_eq!(max.load(), 0.5);
    }

    #[test]
    fn merge_is_order_independent() {
        let values = [0.3f32, 0.9, 0.1, 0.45, 0.89];
        let forward = AtomicF32Max::default();
        let backward = AtomicF32Max::default();
        for v in values {
            forward.merge(v);
        }
        for v in values.iter().rev() {
            backward.merge(*v);
        }
        assert_eq!(forward.load(), 0.9);
        assert_eq!(backward.load(), 0.9);
    }

    #[test]
    fn concurrent_merges_find_true_maximum() {
        let max = Arc::new(AtomicF32Max::default());
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let max = Arc::clone(&max);
                thread::spawn(move || {
                    for i in 0..10_000u32 {
                        max.merge((i * 4 + t) as f32 / 40_000.0);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(max.load(), 39_999.0 / 40_000.0);
    }

    #[test]
    fn statistics_snapshot() {
        let stats = CaptureStatistics::new();
        assert_eq!(stats.snapshot(), StatisticsSnapshot::default());

        assert_eq!(stats.record_callback(480), 1);
        assert_eq!(stats.record_callback(480), 2);
        stats.record_levels(0.5, 0.2);
        stats.record_levels(0.4, 0.3);
        stats.record_appended(960);
        stats.record_dropped(10);

        let snap = stats.snapshot();
        assert_eq!(snap.callback_count, 2);
        assert_eq!(snap.total_frames, 960);
        assert_eq!(snap.appended_frames, 960);
        assert_eq!(snap.dropped_frames, 10);
        assert_eq!(snap.max_amplitude, 0.5);
        assert_eq!(snap.max_rms, 0.3);
    }
}
