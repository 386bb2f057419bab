use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::engine::facade::AecEngine;
use crate::models::audio_models::{AudioFrameBatch, CaptureProgress};
use crate::models::config::SessionConfig;
use crate::models::error::{CaptureError, CaptureWarning};
use crate::models::state::SessionPhase;
use crate::processing::atomic_stats::{CaptureStatistics, StatisticsSnapshot};
use crate::processing::frame_queue::{frame_queue, FrameProducer};
use crate::processing::levels;
use crate::session::collector::Collector;
use crate::traits::audio_engine::EchoCancellingEngine;
use crate::traits::capture_delegate::CaptureDelegate;

/// Callbacks between control-thread diagnostic lines.
const DIAGNOSTIC_EVERY_CALLBACKS: u64 = 100;

/// State shared between the real-time callback and the control thread.
///
/// Only atomics live here; the callback never takes a lock.
struct ActiveCapture {
    statistics: CaptureStatistics,
    window_open: AtomicBool,
    started_at: Instant,
    target: Duration,
    /// Last `callback_count / DIAGNOSTIC_EVERY_CALLBACKS` that was logged.
    diagnostics_logged: AtomicU64,
}

impl ActiveCapture {
    fn new(target: Duration) -> Self {
        Self {
            statistics: CaptureStatistics::new(),
            window_open: AtomicBool::new(true),
            started_at: Instant::now(),
            target,
            diagnostics_logged: AtomicU64::new(0),
        }
    }

    /// True once per `DIAGNOSTIC_EVERY_CALLBACKS` callbacks. Control thread only.
    fn diagnostic_due(&self, callback_count: u64) -> bool {
        let bucket = callback_count / DIAGNOSTIC_EVERY_CALLBACKS;
        bucket > self.diagnostics_logged.load(Ordering::Relaxed) && {
            self.diagnostics_logged.store(bucket, Ordering::Relaxed);
            true
        }
    }

    /// Body of the engine callback.
    ///
    /// Counts the batch, and while the window is open merges its levels into
    /// the running maxima and pushes the samples onto the hand-off queue.
    fn on_batch(&self, batch: AudioFrameBatch<'_>, queue: &mut FrameProducer) {
        self.statistics.record_callback(batch.frame_count);

        if !self.window_open.load(Ordering::Acquire) {
            return;
        }
        if self.started_at.elapsed() >= self.target {
            self.window_open.store(false, Ordering::Release);
            return;
        }

        let (peak, rms) = levels::peak_and_rms(batch.samples);
        self.statistics.record_levels(peak, rms);

        if queue.push_batch(batch.samples) {
            self.statistics.record_appended(batch.frame_count);
        } else {
            self.statistics.record_dropped(batch.frame_count);
        }
    }
}

/// Everything a finished capture window produced.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureReport {
    /// Captured samples in capture order.
    pub samples: Vec<f32>,
    pub statistics: StatisticsSnapshot,
    pub elapsed: Duration,
    pub warnings: Vec<CaptureWarning>,
}

/// Outcome of a microphone self-test.
#[derive(Debug, Clone, PartialEq)]
pub struct SelfTestReport {
    /// Whether the peak amplitude exceeded the signal threshold.
    pub passed: bool,
    pub threshold: f32,
    pub samples_captured: usize,
    pub statistics: StatisticsSnapshot,
}

/// A complete recording ready for serialization.
///
/// The caller keeps ownership of the samples, so a failed write can be
/// retried elsewhere.
#[derive(Debug, Clone, PartialEq)]
pub struct Recording {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub statistics: StatisticsSnapshot,
    pub warnings: Vec<CaptureWarning>,
}

impl Recording {
    pub fn is_silent(&self) -> bool {
        self.warnings.contains(&CaptureWarning::SilentCapture)
    }

    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Drives timed captures through an `AecEngine`.
///
/// Each call to `capture`, `self_test` or `record` is one session: the
/// statistics are reset, the engine is started, the control thread polls the
/// clock until the window closes, waits out the drain window and stops the
/// engine.
///
/// ```text
/// [engine RT thread] → callback → [SPSC queue] → [collector thread] → Vec<f32>
///                          ↓
///                  [atomic statistics] ← polled by control thread
/// ```
pub struct CaptureOrchestrator<E: EchoCancellingEngine> {
    engine: AecEngine<E>,
    delegate: Option<Arc<dyn CaptureDelegate>>,
    phase: Mutex<SessionPhase>,
}

impl<E: EchoCancellingEngine> CaptureOrchestrator<E> {
    pub fn new(engine: AecEngine<E>) -> Self {
        Self {
            engine,
            delegate: None,
            phase: Mutex::new(SessionPhase::Idle),
        }
    }

    pub fn set_delegate(&mut self, delegate: Arc<dyn CaptureDelegate>) {
        self.delegate = Some(delegate);
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase.lock().clone()
    }

    pub fn engine(&self) -> &AecEngine<E> {
        &self.engine
    }

    /// Run a short capture and check that some signal came through.
    pub fn self_test(&mut self, config: &SessionConfig) -> Result<SelfTestReport, CaptureError> {
        log::info!("microphone self-test for {:.1}s", config.duration.as_secs_f64());
        let report = self.capture(config)?;
        let passed = report.statistics.max_amplitude > config.signal_threshold;

        if passed {
            log::info!(
                "self-test passed: peak amplitude {:.4}",
                report.statistics.max_amplitude
            );
        } else {
            log::warn!(
                "self-test failed: peak amplitude {:.4} not above {}",
                report.statistics.max_amplitude,
                config.signal_threshold
            );
        }

        Ok(SelfTestReport {
            passed,
            threshold: config.signal_threshold,
            samples_captured: report.samples.len(),
            statistics: report.statistics,
        })
    }

    /// Run a full capture and validate the buffer for serialization.
    ///
    /// An empty buffer is an error (`EmptyCapture`); an all-silent buffer is
    /// only a warning and is still returned.
    pub fn record(&mut self, config: &SessionConfig) -> Result<Recording, CaptureError> {
        log::info!("recording for {:.1}s", config.duration.as_secs_f64());
        let mut report = self.capture(config)?;

        if report.samples.is_empty() {
            log::error!(
                "no audio captured ({} callbacks); check microphone permission and device",
                report.statistics.callback_count
            );
            self.set_phase(SessionPhase::Failed(CaptureError::EmptyCapture));
            return Err(CaptureError::EmptyCapture);
        }

        if levels::is_silent(&report.samples, config.silence_epsilon) {
            self.warn(CaptureWarning::SilentCapture);
            report.warnings.push(CaptureWarning::SilentCapture);
        }

        Ok(Recording {
            samples: report.samples,
            sample_rate: self.engine.sample_rate() as u32,
            statistics: report.statistics,
            warnings: report.warnings,
        })
    }

    /// Run one timed capture window and return what it produced.
    pub fn capture(&mut self, config: &SessionConfig) -> Result<CaptureReport, CaptureError> {
        let checked = config.validate().and_then(|()| {
            let engine_rate = self.engine.sample_rate();
            if (engine_rate - config.sample_rate).abs() > f64::EPSILON {
                Err(format!(
                    "engine runs at {} Hz but the session expects {} Hz",
                    engine_rate, config.sample_rate
                ))
            } else {
                Ok(())
            }
        });
        if let Err(e) = checked {
            let error = CaptureError::ConfigurationFailed(e);
            self.set_phase(SessionPhase::Failed(error.clone()));
            return Err(error);
        }

        self.set_phase(SessionPhase::Starting);

        let active = Arc::new(ActiveCapture::new(config.duration));
        let (mut producer, consumer) = frame_queue(config.queue_capacity_samples());

        let callback_state = Arc::clone(&active);
        let started = self.engine.start(move |batch| {
            callback_state.on_batch(batch, &mut producer);
        });
        if let Err(e) = started {
            self.set_phase(SessionPhase::Failed(e.clone()));
            return Err(e);
        }

        let collector = match Collector::spawn(consumer, config.collector_reserve_samples()) {
            Ok(c) => c,
            Err(e) => {
                self.engine.stop();
                self.set_phase(SessionPhase::Failed(e.clone()));
                return Err(e);
            }
        };

        self.set_phase(SessionPhase::Capturing { elapsed_secs: 0.0 });
        self.wait_for_window(&active, config);

        active.window_open.store(false, Ordering::Release);
        self.report_progress(&active, config.duration);

        self.set_phase(SessionPhase::Draining);
        thread::sleep(config.drain_window);
        self.engine.stop();

        let samples = match collector.finish() {
            Ok(s) => s,
            Err(e) => {
                self.set_phase(SessionPhase::Failed(e.clone()));
                return Err(e);
            }
        };
        let statistics = active.statistics.snapshot();
        let elapsed = active.started_at.elapsed();

        let mut warnings = Vec::new();
        if statistics.dropped_frames > 0 {
            warnings.push(CaptureWarning::DroppedFrames(statistics.dropped_frames));
        }
        if let Some(fault) = self.engine.fault() {
            warnings.push(CaptureWarning::EngineFault {
                status: fault.status,
                count: fault.count,
            });
        }
        for warning in &warnings {
            self.warn(warning.clone());
        }

        log::info!(
            "capture finished: {} callbacks, {} frames delivered, {} samples kept, peak {:.4}, rms {:.4}",
            statistics.callback_count,
            statistics.total_frames,
            samples.len(),
            statistics.max_amplitude,
            statistics.max_rms
        );

        self.set_phase(SessionPhase::Completed);

        Ok(CaptureReport {
            samples,
            statistics,
            elapsed,
            warnings,
        })
    }

    // --- Internal helpers ---

    /// Poll the clock until the capture window has elapsed.
    fn wait_for_window(&self, active: &ActiveCapture, config: &SessionConfig) {
        loop {
            let elapsed = active.started_at.elapsed();
            if elapsed >= config.duration {
                break;
            }
            self.report_progress(active, elapsed);
            thread::sleep(config.poll_interval.min(config.duration - elapsed));
        }
    }

    fn report_progress(&self, active: &ActiveCapture, elapsed: Duration) {
        let elapsed_secs = elapsed.min(active.target).as_secs_f64();
        *self.phase.lock() = SessionPhase::Capturing { elapsed_secs };
        let statistics = active.statistics.snapshot();

        if active.diagnostic_due(statistics.callback_count) {
            log::trace!(
                "{} callbacks, {} frames, {} frames/callback, {} appended, {} dropped, peak {:.4}",
                statistics.callback_count,
                statistics.total_frames,
                statistics.total_frames / statistics.callback_count.max(1),
                statistics.appended_frames,
                statistics.dropped_frames,
                statistics.max_amplitude
            );
        }

        if let Some(ref delegate) = self.delegate {
            delegate.on_progress(&CaptureProgress {
                elapsed_secs,
                target_secs: active.target.as_secs_f64(),
                statistics,
            });
        }
    }

    fn set_phase(&self, phase: SessionPhase) {
        *self.phase.lock() = phase.clone();
        if let Some(ref delegate) = self.delegate {
            delegate.on_phase_changed(&phase);
        }
    }

    fn warn(&self, warning: CaptureWarning) {
        log::warn!("{}", warning);
        if let Some(ref delegate) = self.delegate {
            delegate.on_warning(&warning);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    use crate::engine::synthetic::{SyntheticEngine, Waveform};

    fn quick_config(duration_ms: u64) -> SessionConfig {
        SessionConfig {
            duration: Duration::from_millis(duration_ms),
            poll_interval: Duration::from_millis(20),
            drain_window: Duration::from_millis(50),
            ..Default::default()
        }
    }

    fn orchestrator(engine: SyntheticEngine) -> CaptureOrchestrator<SyntheticEngine> {
        CaptureOrchestrator::new(AecEngine::new(engine))
    }

    #[derive(Default)]
    struct RecordingDelegate {
        phases: Mutex<Vec<SessionPhase>>,
        progress: Mutex<Vec<CaptureProgress>>,
        warnings: Mutex<Vec<CaptureWarning>>,
    }

    impl CaptureDelegate for RecordingDelegate {
        fn on_phase_changed(&self, phase: &SessionPhase) {
            self.phases.lock().push(phase.clone());
        }

        fn on_progress(&self, progress: &CaptureProgress) {
            self.progress.lock().push(*progress);
        }

        fn on_warning(&self, warning: &CaptureWarning) {
            self.warnings.lock().push(warning.clone());
        }
    }

    #[test]
    fn one_second_sine_fills_buffer() {
        let engine = SyntheticEngine::sine(1000.0, 0.5);
        let batch = engine.batch_frames();
        let mut orch = orchestrator(engine);

        let report = orch.capture(&quick_config(1000)).unwrap();

        let len = report.samples.len() as i64;
        assert!((len - 48000).abs() <= batch as i64, "captured {} samples", len);
        assert_abs_diff_eq!(report.statistics.max_amplitude, 0.5, epsilon = 1e-4);
        assert_abs_diff_eq!(report.statistics.max_rms, 0.5 / 2f32.sqrt(), epsilon = 1e-3);
        assert_eq!(orch.phase(), SessionPhase::Completed);
    }

    #[test]
    fn appended_frames_match_buffer_length() {
        let mut orch = orchestrator(SyntheticEngine::sine(440.0, 0.2).with_batch_frames(256));
        let report = orch.capture(&quick_config(300)).unwrap();

        assert_eq!(report.statistics.dropped_frames, 0);
        assert_eq!(report.statistics.appended_frames, report.samples.len() as u64);
        assert!(report.statistics.total_frames >= report.statistics.appended_frames);
        assert_eq!(report.statistics.total_frames % 256, 0);
    }

    #[test]
    fn peak_equals_true_maximum_of_delivered_samples() {
        let pattern: Vec<f32> = vec![0.1, -0.2, 0.05, -0.73, 0.4, 0.0, 0.2, -0.1];
        let engine = SyntheticEngine::new(Waveform::Looped(Arc::from(pattern))).with_batch_frames(100);
        let mut orch = orchestrator(engine);

        let report = orch.capture(&quick_config(200)).unwrap();

        let true_peak = report.samples.iter().fold(0.0f32, |m, s| m.max(s.abs()));
        assert_eq!(report.statistics.max_amplitude, true_peak);
        assert_abs_diff_eq!(true_peak, 0.73, epsilon = 1e-6);
    }

    #[test]
    fn samples_arrive_in_capture_order() {
        let ramp: Vec<f32> = (0..1000).map(|i| i as f32 / 1000.0).collect();
        let engine = SyntheticEngine::new(Waveform::Looped(Arc::from(ramp))).with_batch_frames(64);
        let mut orch = orchestrator(engine);

        let report = orch.capture(&quick_config(200)).unwrap();

        assert!(!report.samples.is_empty());
        for (i, sample) in report.samples.iter().enumerate() {
            assert_eq!(*sample, (i % 1000) as f32 / 1000.0);
        }
    }

    #[test]
    fn silent_self_test_fails() {
        let mut orch = orchestrator(SyntheticEngine::silence());
        let report = orch.self_test(&quick_config(200)).unwrap();

        assert!(!report.passed);
        assert!(report.samples_captured > 0);
        assert_eq!(report.statistics.max_amplitude, 0.0);
    }

    #[test]
    fn self_test_passes_with_signal() {
        let mut orch = orchestrator(SyntheticEngine::sine(440.0, 0.1));
        let report = orch.self_test(&quick_config(200)).unwrap();
        assert!(report.passed);
    }

    #[test]
    fn silent_recording_warns_but_keeps_buffer() {
        let delegate = Arc::new(RecordingDelegate::default());
        let mut orch = orchestrator(SyntheticEngine::silence());
        orch.set_delegate(delegate.clone());

        let recording = orch.record(&quick_config(200)).unwrap();

        assert!(recording.is_silent());
        assert!(!recording.samples.is_empty());
        assert!(delegate.warnings.lock().contains(&CaptureWarning::SilentCapture));
    }

    #[test]
    fn recording_with_signal_has_no_warnings() {
        let mut orch = orchestrator(SyntheticEngine::sine(1000.0, 0.5));
        let recording = orch.record(&quick_config(200)).unwrap();
        assert!(recording.warnings.is_empty());
        assert_eq!(recording.sample_rate, 48000);
        assert!(recording.duration_secs() > 0.1);
    }

    #[test]
    fn empty_capture_is_distinct_from_silence() {
        let mut orch = orchestrator(SyntheticEngine::silence().with_batch_limit(0));
        let err = orch.record(&quick_config(100)).unwrap_err();
        assert_eq!(err, CaptureError::EmptyCapture);
        assert_eq!(orch.phase(), SessionPhase::Failed(CaptureError::EmptyCapture));
    }

    #[test]
    fn start_failure_aborts_without_callbacks() {
        let delegate = Arc::new(RecordingDelegate::default());
        let mut orch = orchestrator(SyntheticEngine::failing(CaptureError::PermissionDenied));
        orch.set_delegate(delegate.clone());

        let err = orch.record(&quick_config(100)).unwrap_err();

        assert_eq!(err, CaptureError::PermissionDenied);
        assert!(err.is_start_failure());
        assert_eq!(orch.engine().backend().delivered_batches(), 0);
        assert_eq!(orch.engine().backend().start_attempts(), 1);
        assert!(delegate.progress.lock().is_empty());
        assert_eq!(
            delegate.phases.lock().last(),
            Some(&SessionPhase::Failed(CaptureError::PermissionDenied))
        );
    }

    #[test]
    fn engine_is_stopped_after_each_session_and_reusable() {
        let mut orch = orchestrator(SyntheticEngine::sine(440.0, 0.3));

        orch.self_test(&quick_config(100)).unwrap();
        assert!(!orch.engine().is_running());

        orch.record(&quick_config(100)).unwrap();
        assert!(!orch.engine().is_running());
        assert_eq!(orch.engine().backend().start_attempts(), 2);
    }

    #[test]
    fn no_batches_are_appended_after_the_window() {
        let mut orch = orchestrator(SyntheticEngine::sine(440.0, 0.3));
        let config = SessionConfig {
            drain_window: Duration::from_millis(200),
            ..quick_config(100)
        };

        let report = orch.capture(&config).unwrap();

        // The drain window keeps the engine running, so more frames are
        // delivered than kept.
        assert!(report.statistics.total_frames > report.statistics.appended_frames);
        assert_eq!(report.statistics.appended_frames, report.samples.len() as u64);
    }

    #[test]
    fn tiny_queue_reports_dropped_frames() {
        let delegate = Arc::new(RecordingDelegate::default());
        let mut orch = orchestrator(SyntheticEngine::sine(440.0, 0.3).with_batch_frames(480));
        orch.set_delegate(delegate.clone());
        // Room for less than one batch: every push is rejected.
        let config = SessionConfig {
            queue_capacity_secs: 0.005,
            ..quick_config(100)
        };

        let report = orch.capture(&config).unwrap();

        assert!(report.samples.is_empty());
        assert!(report.statistics.dropped_frames > 0);
        assert!(matches!(report.warnings[0], CaptureWarning::DroppedFrames(_)));
        assert_eq!(delegate.warnings.lock().len(), 1);
    }

    #[test]
    fn progress_is_reported_and_capped() {
        let delegate = Arc::new(RecordingDelegate::default());
        let mut orch = orchestrator(SyntheticEngine::sine(440.0, 0.3));
        orch.set_delegate(delegate.clone());

        orch.capture(&quick_config(200)).unwrap();

        let progress = delegate.progress.lock();
        assert!(progress.len() >= 2);
        assert!(progress.iter().all(|p| p.percent() <= 100.0));
        assert_eq!(progress.last().map(|p| p.percent()), Some(100.0));

        let phases = delegate.phases.lock();
        assert_eq!(phases.first(), Some(&SessionPhase::Starting));
        assert!(phases.contains(&SessionPhase::Draining));
        assert_eq!(phases.last(), Some(&SessionPhase::Completed));
    }

    #[test]
    fn diagnostics_are_due_once_per_hundred_callbacks() {
        let active = ActiveCapture::new(Duration::from_secs(1));

        assert!(!active.diagnostic_due(0));
        assert!(!active.diagnostic_due(99));
        assert!(active.diagnostic_due(100));
        assert!(!active.diagnostic_due(150));
        // A slow poll can skip a bucket; it still logs once.
        assert!(active.diagnostic_due(320));
        assert!(!active.diagnostic_due(399));
        assert!(active.diagnostic_due(400));
    }

    #[test]
    fn engine_fault_is_reported_as_warning() {
        let delegate = Arc::new(RecordingDelegate::default());
        let mut orch = orchestrator(SyntheticEngine::sine(440.0, 0.3).with_fault(-10863, 4));
        orch.set_delegate(delegate.clone());

        let report = orch.capture(&quick_config(100)).unwrap();

        let expected = CaptureWarning::EngineFault { status: -10863, count: 4 };
        assert_eq!(report.warnings, vec![expected.clone()]);
        assert_eq!(*delegate.warnings.lock(), vec![expected]);
        assert_eq!(orch.phase(), SessionPhase::Completed);
    }

    #[test]
    fn mismatched_engine_rate_is_rejected_before_start() {
        let mut orch = orchestrator(SyntheticEngine::sine(440.0, 0.3).with_sample_rate(16000.0));

        let err = orch.capture(&quick_config(100)).unwrap_err();

        assert!(matches!(err, CaptureError::ConfigurationFailed(ref msg) if msg.contains("16000")));
        assert_eq!(orch.engine().backend().start_attempts(), 0);

        let config = SessionConfig {
            sample_rate: 16000.0,
            ..quick_config(100)
        };
        let report = orch.capture(&config).unwrap();
        assert!(!report.samples.is_empty());
    }

    #[test]
    fn invalid_config_is_rejected_before_start() {
        let mut orch = orchestrator(SyntheticEngine::sine(440.0, 0.3));
        let config = SessionConfig {
            channels: 2,
            ..quick_config(100)
        };

        let err = orch.capture(&config).unwrap_err();

        assert!(matches!(err, CaptureError::ConfigurationFailed(_)));
        assert_eq!(orch.engine().backend().start_attempts(), 0);
    }
}
