use thiserror::Error;

/// Errors that can occur while configuring, running or persisting a capture.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("permission denied")]
    PermissionDenied,

    #[error("device not available")]
    DeviceNotAvailable,

    #[error("configuration failed: {0}")]
    ConfigurationFailed(String),

    #[error("engine already running")]
    AlreadyRunning,

    #[error("no audio frames were captured")]
    EmptyCapture,

    #[error("storage error: {0}")]
    StorageError(String),

    #[error("unknown error: {0}")]
    Unknown(String),
}

impl CaptureError {
    /// Whether this error can be produced by an engine `start` call.
    ///
    /// Start failures are fatal to the session that requested them; no
    /// session buffer exists when one is returned.
    pub fn is_start_failure(&self) -> bool {
        matches!(
            self,
            Self::PermissionDenied
                | Self::DeviceNotAvailable
                | Self::ConfigurationFailed(_)
                | Self::AlreadyRunning
                | Self::Unknown(_)
        )
    }
}

/// Non-fatal conditions detected during a capture.
///
/// Warnings never abort a recording; the buffer is still handed off.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureWarning {
    /// Frames were delivered but every sample was within the silence epsilon.
    SilentCapture,

    /// The hand-off queue was full and this many frames were discarded.
    DroppedFrames(u64),

    /// The backend reported failures while pulling input frames.
    EngineFault { status: i32, count: u64 },
}

impl std::fmt::Display for CaptureWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SilentCapture => write!(f, "all captured samples are silent"),
            Self::DroppedFrames(n) => write!(f, "{} frames dropped on hand-off", n),
            Self::EngineFault { status, count } => {
                write!(f, "engine reported {} render failures (last status {})", count, status)
            }
        }
    }
}
