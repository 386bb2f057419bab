use super::error::CaptureError;

/// Engine lifecycle.
///
/// State transitions:
/// ```text
/// uninitialized → configured → running → stopped
///                     ↓                     ↓
///               (start failed)       configured → running ...
/// ```
///
/// `Configured` is only held while the platform element is being set up.
/// A failed configuration falls back to the previous resting state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Uninitialized,
    Configured,
    Running,
    Stopped,
}

impl EngineState {
    /// `start` is only accepted from a resting state.
    pub fn can_start(&self) -> bool {
        matches!(self, Self::Uninitialized | Self::Stopped)
    }

    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }
}

/// Capture session phase, as reported to a `CaptureDelegate`.
///
/// ```text
/// idle → starting → capturing → draining → completed
///            ↓
///          failed
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum SessionPhase {
    Idle,
    Starting,
    Capturing { elapsed_secs: f64 },
    Draining,
    Completed,
    Failed(CaptureError),
}
