//! Hardware-free engine that plays a generated signal into the callback.
//!
//! Used by the test suite and by the CLI on hosts without a voice-processing
//! backend. Batches are delivered from a dedicated thread on a fixed
//! schedule derived from the sample rate, like a real audio device would.

use std::f64::consts::TAU;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::models::audio_models::{AudioFrameBatch, AudioSource};
use crate::models::error::CaptureError;
use crate::models::state::EngineState;
use crate::traits::audio_engine::{EchoCancellingEngine, EngineFault, FrameCallback};

/// Signal produced by a `SyntheticEngine`.
#[derive(Debug, Clone, PartialEq)]
pub enum Waveform {
    Sine { frequency: f64, amplitude: f32 },
    Silence,
    /// Repeats the given samples forever.
    Looped(Arc<[f32]>),
}

/// Engine stub that delivers a known waveform in fixed-size batches.
pub struct SyntheticEngine {
    waveform: Waveform,
    sample_rate: f64,
    batch_frames: usize,
    batch_limit: Option<u64>,
    start_failure: Option<CaptureError>,
    fault: Option<EngineFault>,
    state: EngineState,
    running: Arc<AtomicBool>,
    delivered: Arc<AtomicU64>,
    start_attempts: u64,
    handle: Option<thread::JoinHandle<()>>,
}

impl SyntheticEngine {
    pub fn new(waveform: Waveform) -> Self {
        Self {
            waveform,
            sample_rate: 48000.0,
            batch_frames: 480,
            batch_limit: None,
            start_failure: None,
            fault: None,
            state: EngineState::Uninitialized,
            running: Arc::new(AtomicBool::new(false)),
            delivered: Arc::new(AtomicU64::new(0)),
            start_attempts: 0,
            handle: None,
        }
    }

    pub fn sine(frequency: f64, amplitude: f32) -> Self {
        Self::new(Waveform::Sine { frequency, amplitude })
    }

    pub fn silence() -> Self {
        Self::new(Waveform::Silence)
    }

    /// An engine whose `start` always fails with `error`.
    pub fn failing(error: CaptureError) -> Self {
        let mut engine = Self::silence();
        engine.start_failure = Some(error);
        engine
    }

    pub fn with_sample_rate(mut self, sample_rate: f64) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    pub fn with_batch_frames(mut self, frames: usize) -> Self {
        self.batch_frames = frames;
        self
    }

    /// Stop delivering after `batches` callbacks per run.
    pub fn with_batch_limit(mut self, batches: u64) -> Self {
        self.batch_limit = Some(batches);
        self
    }

    /// Report `count` render failures with `status` from `fault()`.
    pub fn with_fault(mut self, status: i32, count: u64) -> Self {
        self.fault = Some(EngineFault { status, count });
        self
    }

    pub fn batch_frames(&self) -> usize {
        self.batch_frames
    }

    /// Callbacks delivered across all runs.
    pub fn delivered_batches(&self) -> u64 {
        self.delivered.load(Ordering::SeqCst)
    }

    pub fn start_attempts(&self) -> u64 {
        self.start_attempts
    }

    fn batch_period(&self) -> Duration {
        Duration::from_secs_f64(self.batch_frames as f64 / self.sample_rate)
    }
}

impl EchoCancellingEngine for SyntheticEngine {
    fn is_available(&self) -> bool {
        self.start_failure.is_none()
    }

    fn start(&mut self, mut callback: FrameCallback) -> Result<(), CaptureError> {
        self.start_attempts += 1;
        if !self.state.can_start() {
            return Err(CaptureError::AlreadyRunning);
        }
        if let Some(ref error) = self.start_failure {
            return Err(error.clone());
        }
        if self.batch_frames == 0 || self.sample_rate <= 0.0 {
            return Err(CaptureError::ConfigurationFailed(
                "synthetic engine needs a positive rate and batch size".into(),
            ));
        }

        let previous = self.state;
        self.state = EngineState::Configured;
        self.running.store(true, Ordering::SeqCst);

        let running = Arc::clone(&self.running);
        let delivered = Arc::clone(&self.delivered);
        let mut generator = Generator::new(self.waveform.clone(), self.sample_rate);
        let mut batch = vec![0.0f32; self.batch_frames];
        let period = self.batch_period();
        let limit = self.batch_limit;

        let spawned = thread::Builder::new()
            .name("synthetic-audio".into())
            .spawn(move || {
                let mut next_deadline = Instant::now();
                let mut sent = 0u64;
                while running.load(Ordering::SeqCst) {
                    if limit.map_or(true, |l| sent < l) {
                        generator.fill(&mut batch);
                        callback(AudioFrameBatch::mono(&batch));
                        delivered.fetch_add(1, Ordering::SeqCst);
                        sent += 1;
                    }

                    next_deadline += period;
                    let now = Instant::now();
                    if next_deadline > now {
                        thread::sleep(next_deadline - now);
                    }
                }
            });

        match spawned {
            Ok(handle) => {
                self.handle = Some(handle);
                self.state = EngineState::Running;
                Ok(())
            }
            Err(e) => {
                self.running.store(false, Ordering::SeqCst);
                self.state = previous;
                Err(CaptureError::Unknown(format!("failed to spawn synthetic audio thread: {}", e)))
            }
        }
    }

    fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
        if self.state.is_running() {
            self.state = EngineState::Stopped;
        }
    }

    fn state(&self) -> EngineState {
        self.state
    }

    fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    fn fault(&self) -> Option<EngineFault> {
        self.fault
    }

    fn device_info(&self) -> AudioSource {
        let name = match self.waveform {
            Waveform::Sine { frequency, .. } => format!("Synthetic Sine {} Hz", frequency),
            Waveform::Silence => "Synthetic Silence".into(),
            Waveform::Looped(_) => "Synthetic Loop".into(),
        };
        AudioSource {
            id: "synthetic".into(),
            name,
            is_default: false,
        }
    }
}

impl Drop for SyntheticEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Sample source that keeps phase across batches.
struct Generator {
    waveform: Waveform,
    sample_rate: f64,
    phase: f64,
    position: usize,
}

impl Generator {
    fn new(waveform: Waveform, sample_rate: f64) -> Self {
        Self {
            waveform,
            sample_rate,
            phase: 0.0,
            position: 0,
        }
    }

    fn fill(&mut self, out: &mut [f32]) {
        match &self.waveform {
            Waveform::Sine { frequency, amplitude } => {
                let step = TAU * frequency / self.sample_rate;
                for sample in out.iter_mut() {
                    *sample = (*amplitude as f64 * self.phase.sin()) as f32;
                    self.phase = (self.phase + step) % TAU;
                }
            }
            Waveform::Silence => out.fill(0.0),
            Waveform::Looped(samples) => {
                if samples.is_empty() {
                    out.fill(0.0);
                    return;
                }
                for sample in out.iter_mut() {
                    *sample = samples[self.position];
                    self.position = (self.position + 1) % samples.len();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use parking_lot::Mutex;

    #[test]
    fn generator_sine_peaks_at_amplitude() {
        let mut generator = Generator::new(
            Waveform::Sine {
                frequency: 1000.0,
                amplitude: 0.5,
            },
            48000.0,
        );
        let mut buf = vec![0.0f32; 480];
        generator.fill(&mut buf);
        let peak = buf.iter().fold(0.0f32, |m, s| m.max(s.abs()));
        assert_abs_diff_eq!(peak, 0.5, epsilon = 1e-5);
        assert_eq!(buf[0], 0.0);
    }

    #[test]
    fn generator_loop_wraps() {
        let mut generator = Generator::new(Waveform::Looped(Arc::from(vec![1.0f32, 2.0, 3.0])), 48000.0);
        let mut buf = vec![0.0f32; 5];
        generator.fill(&mut buf);
        assert_eq!(buf, vec![1.0, 2.0, 3.0, 1.0, 2.0]);
    }

    #[test]
    fn delivers_batches_until_stopped() {
        let received = Arc::new(Mutex::new(0usize));
        let sink = Arc::clone(&received);
        let mut engine = SyntheticEngine::sine(440.0, 0.3).with_batch_frames(48);

        engine
            .start(Box::new(move |batch| {
                assert_eq!(batch.frame_count, 48);
                *sink.lock() += batch.frame_count;
            }))
            .unwrap();
        thread::sleep(Duration::from_millis(50));
        engine.stop();

        let frames = *received.lock();
        assert!(frames > 0);
        assert_eq!(frames as u64, engine.delivered_batches() * 48);

        // Nothing arrives once stop has returned.
        thread::sleep(Duration::from_millis(20));
        assert_eq!(*received.lock(), frames);
    }

    #[test]
    fn stop_is_idempotent_and_restart_allowed() {
        let mut engine = SyntheticEngine::silence();
        engine.stop();
        assert_eq!(engine.state(), EngineState::Uninitialized);

        engine.start(Box::new(|_| {})).unwrap();
        engine.stop();
        engine.stop();
        assert_eq!(engine.state(), EngineState::Stopped);

        engine.start(Box::new(|_| {})).unwrap();
        assert!(engine.state().is_running());
    }

    #[test]
    fn start_while_running_is_rejected() {
        let mut engine = SyntheticEngine::silence();
        engine.start(Box::new(|_| {})).unwrap();
        let err = engine.start(Box::new(|_| {})).unwrap_err();
        assert_eq!(err, CaptureError::AlreadyRunning);
        assert!(engine.state().is_running());
    }

    #[test]
    fn failing_engine_never_runs() {
        let mut engine = SyntheticEngine::failing(CaptureError::PermissionDenied);
        let err = engine.start(Box::new(|_| {})).unwrap_err();
        assert_eq!(err, CaptureError::PermissionDenied);
        assert_eq!(engine.state(), EngineState::Uninitialized);
        assert_eq!(engine.delivered_batches(), 0);
        assert!(!engine.is_available());
    }

    #[test]
    fn batch_limit_caps_delivery() {
        let mut engine = SyntheticEngine::silence().with_batch_frames(48).with_batch_limit(3);
        engine.start(Box::new(|_| {})).unwrap();
        thread::sleep(Duration::from_millis(30));
        engine.stop();
        assert_eq!(engine.delivered_batches(), 3);
    }
}
