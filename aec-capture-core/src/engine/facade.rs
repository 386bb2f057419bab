use crate::models::audio_models::{AudioFrameBatch, AudioSource};
use crate::models::error::CaptureError;
use crate::models::state::EngineState;
use crate::traits::audio_engine::{EchoCancellingEngine, EngineFault};

/// Owning handle around exactly one echo-cancelling engine.
///
/// Exposes only the start/stop capability so callers do not depend on the
/// backend's internals. The backend is chosen at build time through `E`.
/// Dropping the handle stops the engine and releases its resources.
pub struct AecEngine<E: EchoCancellingEngine> {
    engine: E,
}

impl<E: EchoCancellingEngine> AecEngine<E> {
    pub fn new(engine: E) -> Self {
        Self { engine }
    }

    /// Start delivering frames to `callback` on the real-time thread.
    pub fn start<F>(&mut self, callback: F) -> Result<(), CaptureError>
    where
        F: FnMut(AudioFrameBatch<'_>) + Send + 'static,
    {
        match self.engine.start(Box::new(callback)) {
            Ok(()) => {
                log::debug!("engine started");
                Ok(())
            }
            Err(e) => {
                log::error!("engine start failed: {}", e);
                Err(e)
            }
        }
    }

    /// Stop the engine. Safe to call repeatedly.
    pub fn stop(&mut self) {
        if self.engine.state().is_running() {
            log::debug!("stopping engine");
        }
        self.engine.stop();
    }

    pub fn state(&self) -> EngineState {
        self.engine.state()
    }

    pub fn is_running(&self) -> bool {
        self.engine.state().is_running()
    }

    pub fn sample_rate(&self) -> f64 {
        self.engine.sample_rate()
    }

    pub fn is_available(&self) -> bool {
        self.engine.is_available()
    }

    pub fn device_info(&self) -> AudioSource {
        self.engine.device_info()
    }

    pub fn fault(&self) -> Option<EngineFault> {
        self.engine.fault()
    }

    /// Borrow the backend, e.g. to inspect a synthetic engine in tests.
    pub fn backend(&self) -> &E {
        &self.engine
    }
}

impl<E: EchoCancellingEngine> Drop for AecEngine<E> {
    fn drop(&mut self) {
        self.engine.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use crate::traits::audio_engine::FrameCallback;

    /// Records lifecycle calls without touching any audio thread.
    struct CountingEngine {
        state: EngineState,
        stops: Arc<AtomicUsize>,
        callback: Option<FrameCallback>,
    }

    impl CountingEngine {
        fn new(stops: Arc<AtomicUsize>) -> Self {
            Self {
                state: EngineState::Uninitialized,
                stops,
                callback: None,
            }
        }
    }

    impl EchoCancellingEngine for CountingEngine {
        fn is_available(&self) -> bool {
            true
        }

        fn start(&mut self, callback: FrameCallback) -> Result<(), CaptureError> {
            if !self.state.can_start() {
                return Err(CaptureError::AlreadyRunning);
            }
            self.callback = Some(callback);
            self.state = EngineState::Running;
            Ok(())
        }

        fn stop(&mut self) {
            if self.state.is_running() {
                self.stops.fetch_add(1, Ordering::SeqCst);
                self.callback = None;
                self.state = EngineState::Stopped;
            }
        }

        fn state(&self) -> EngineState {
            self.state
        }

        fn sample_rate(&self) -> f64 {
            48000.0
        }

        fn device_info(&self) -> AudioSource {
            AudioSource {
                id: "counting".into(),
                name: "Counting Engine".into(),
                is_default: true,
            }
        }
    }

    #[test]
    fn delegates_start_and_stop() {
        let stops = Arc::new(AtomicUsize::new(0));
        let mut handle = AecEngine::new(CountingEngine::new(Arc::clone(&stops)));

        handle.start(|_batch| {}).unwrap();
        assert!(handle.is_running());

        handle.stop();
        handle.stop();
        assert_eq!(handle.state(), EngineState::Stopped);
        assert_eq!(stops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn second_start_is_rejected() {
        let stops = Arc::new(AtomicUsize::new(0));
        let mut handle = AecEngine::new(CountingEngine::new(stops));

        handle.start(|_batch| {}).unwrap();
        assert_eq!(handle.start(|_batch| {}), Err(CaptureError::AlreadyRunning));
        assert!(handle.is_running());
    }

    #[test]
    fn drop_stops_running_engine() {
        let stops = Arc::new(AtomicUsize::new(0));
        {
            let mut handle = AecEngine::new(CountingEngine::new(Arc::clone(&stops)));
            handle.start(|_batch| {}).unwrap();
        }
        assert_eq!(stops.load(Ordering::SeqCst), 1);
    }
}
