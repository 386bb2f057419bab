use crate::models::audio_models::{AudioFrameBatch, AudioSource};
use crate::models::error::CaptureError;
use crate::models::state::EngineState;

/// Consumer of captured, echo-cancelled frames.
///
/// Invoked on the engine's real-time thread, one batch at a time and in
/// capture order. Implementations must not block, lock, allocate without
/// bound, or perform I/O, and must not keep the borrowed samples.
pub type FrameCallback = Box<dyn FnMut(AudioFrameBatch<'_>) + Send + 'static>;

/// Failures the backend observed on its real-time thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineFault {
    /// Last platform status code reported.
    pub status: i32,
    /// Number of failed pulls since the engine was started.
    pub count: u64,
}

/// A duplex audio element with echo cancellation enabled.
///
/// Implemented by:
/// - `VoiceProcessingEngine` (macOS, Voice-Processing I/O unit)
/// - `SyntheticEngine` (generated signal, no hardware)
pub trait EchoCancellingEngine: Send {
    /// Whether an input device is present for this backend.
    fn is_available(&self) -> bool;

    /// Configure and activate the element, delivering frames to `callback`.
    ///
    /// Only valid from `Uninitialized` or `Stopped`; otherwise returns
    /// `CaptureError::AlreadyRunning` and leaves the running element alone.
    /// On any failure the engine keeps no partially started state.
    fn start(&mut self, callback: FrameCallback) -> Result<(), CaptureError>;

    /// Deactivate and release the element.
    ///
    /// Idempotent. Once this returns the callback is never invoked again.
    fn stop(&mut self);

    fn state(&self) -> EngineState;

    /// Rate, in Hz, of the frames delivered to the callback.
    fn sample_rate(&self) -> f64;

    /// Information about the device backing this engine.
    fn device_info(&self) -> AudioSource;

    /// Real-time failures recorded during the current or last run.
    fn fault(&self) -> Option<EngineFault> {
        None
    }
}
