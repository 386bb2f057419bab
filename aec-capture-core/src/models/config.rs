use std::time::Duration;

use crate::processing::wav_format::MAX_DATA_SIZE;

/// Upper bound on the collector's up-front buffer reservation, in seconds of audio.
const COLLECTOR_RESERVE_SECS: f64 = 30.0;

/// Configuration for a capture session.
///
/// The pipeline runs a single fixed format: mono, 48 kHz, 16-bit output.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// Capture sample rate in Hz (default: 48000).
    pub sample_rate: f64,

    /// Number of channels. Only mono is supported.
    pub channels: u16,

    /// Bit depth of the serialized PCM (default: 16).
    pub bit_depth: u16,

    /// Length of the capture window.
    pub duration: Duration,

    /// How often the control thread checks elapsed time and reports progress.
    pub poll_interval: Duration,

    /// Grace period between the end of the window and `stop`.
    pub drain_window: Duration,

    /// Peak amplitude a self-test must exceed to count as "signal present".
    pub signal_threshold: f32,

    /// Samples with an absolute value at or below this are treated as silence.
    pub silence_epsilon: f32,

    /// Hand-off queue capacity, in seconds of audio.
    pub queue_capacity_secs: f64,
}

impl SessionConfig {
    /// Short capture used to check that the microphone delivers signal.
    pub fn self_test() -> Self {
        Self {
            duration: Duration::from_secs(3),
            ..Default::default()
        }
    }

    /// Full recording run.
    pub fn recording() -> Self {
        Self::default()
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.sample_rate <= 0.0 {
            return Err("sample rate must be positive".into());
        }
        if self.channels != 1 {
            return Err(format!("unsupported channel count: {}", self.channels));
        }
        if self.bit_depth != 16 {
            return Err(format!("unsupported bit depth: {}", self.bit_depth));
        }
        if self.duration.is_zero() {
            return Err("capture duration must be non-zero".into());
        }
        if self.duration > self.max_duration() {
            return Err(format!(
                "capture duration {:.0}s exceeds the {:.0}s a WAV file can hold",
                self.duration.as_secs_f64(),
                self.max_duration().as_secs_f64()
            ));
        }
        if self.poll_interval.is_zero() {
            return Err("poll interval must be non-zero".into());
        }
        if self.queue_capacity_samples() == 0 {
            return Err("hand-off queue capacity must be non-zero".into());
        }
        Ok(())
    }

    /// Number of samples the hand-off queue can hold.
    pub fn queue_capacity_samples(&self) -> usize {
        (self.sample_rate * self.queue_capacity_secs * self.channels as f64) as usize
    }

    /// Number of samples a full capture window is expected to produce.
    pub fn expected_samples(&self) -> usize {
        (self.sample_rate * self.duration.as_secs_f64() * self.channels as f64).ceil() as usize
    }

    /// Samples the collector reserves before capture starts.
    ///
    /// Longer windows grow the buffer on the collector thread instead.
    pub fn collector_reserve_samples(&self) -> usize {
        let cap = (self.sample_rate * COLLECTOR_RESERVE_SECS * self.channels as f64) as usize;
        self.expected_samples().min(cap)
    }

    /// Longest window whose serialized PCM fits in one WAV data chunk.
    ///
    /// One frame short of the exact limit so `expected_samples` cannot round
    /// past it.
    pub fn max_duration(&self) -> Duration {
        let frame_bytes = self.channels as u64 * (self.bit_depth / 8) as u64;
        if frame_bytes == 0 || !(self.sample_rate > 0.0) {
            return Duration::ZERO;
        }
        let frames = MAX_DATA_SIZE as u64 / frame_bytes - 1;
        Duration::try_from_secs_f64(frames as f64 / self.sample_rate).unwrap_or(Duration::MAX)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000.0,
            channels: 1,
            bit_depth: 16,
            duration: Duration::from_secs(10),
            poll_interval: Duration::from_millis(100),
            drain_window: Duration::from_millis(500),
            signal_threshold: 0.001,
            silence_epsilon: 1e-6,
            queue_capacity_secs: 2.0,
        }
    }
}
