use crate::models::audio_models::CaptureProgress;
use crate::models::error::CaptureWarning;
use crate::models::state::SessionPhase;

/// Observer for capture session notifications.
///
/// All methods are called from the control thread, never from the
/// real-time audio thread, so implementations may print or log freely.
pub trait CaptureDelegate: Send + Sync {
    /// Called when the session moves to a new phase.
    fn on_phase_changed(&self, phase: &SessionPhase);

    /// Called once per poll interval while capturing, and once at the end.
    fn on_progress(&self, progress: &CaptureProgress);

    /// Called for each non-fatal condition found after the capture.
    fn on_warning(&self, warning: &CaptureWarning);
}
