//! # aec-capture-macos
//!
//! macOS backend for aec-capture.
//!
//! Provides:
//! - `VoiceProcessingEngine`: echo-cancelled microphone capture via the
//!   Voice-Processing I/O audio unit
//! - `os_status`: mapping of Core Audio status codes onto `CaptureError`
//!
//! ## Usage
//! ```ignore
//! use aec_capture_core::{AecEngine, CaptureOrchestrator, SessionConfig};
//! use aec_capture_macos::VoiceProcessingEngine;
//!
//! let engine = AecEngine::new(VoiceProcessingEngine::default());
//! let mut session = CaptureOrchestrator::new(engine);
//! let recording = session.record(&SessionConfig::recording())?;
//! ```

pub mod os_status;
#[cfg(target_os = "macos")]
pub mod voice_processing;

#[cfg(target_os = "macos")]
pub use voice_processing::VoiceProcessingEngine;
