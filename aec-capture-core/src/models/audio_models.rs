use crate::processing::atomic_stats::StatisticsSnapshot;

/// A borrowed batch of captured mono samples.
///
/// Only valid for the duration of one callback invocation; the engine owns
/// the underlying storage and overwrites it on the next cycle. Copy what
/// you need to keep.
#[derive(Debug, Clone, Copy)]
pub struct AudioFrameBatch<'a> {
    pub samples: &'a [f32],
    pub frame_count: usize,
}

impl<'a> AudioFrameBatch<'a> {
    /// Wrap a mono sample slice. One sample per frame.
    pub fn mono(samples: &'a [f32]) -> Self {
        Self {
            samples,
            frame_count: samples.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.frame_count == 0
    }
}

/// The input device backing an engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioSource {
    pub id: String,
    pub name: String,
    pub is_default: bool,
}

/// Periodic progress report emitted by the control thread.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptureProgress {
    pub elapsed_secs: f64,
    pub target_secs: f64,
    pub statistics: StatisticsSnapshot,
}

impl CaptureProgress {
    /// Percent of the capture window elapsed, capped at 100.
    pub fn percent(&self) -> f64 {
        if self.target_secs <= 0.0 {
            return 100.0;
        }
        (self.elapsed_secs / self.target_secs * 100.0).min(100.0)
    }
}
