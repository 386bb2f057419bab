//! # aec-capture-core
//!
//! Platform-agnostic core for echo-cancelled microphone capture.
//!
//! Provides the engine abstraction, timed capture sessions, lock-free
//! capture statistics, 16-bit PCM conversion and WAV output. Platform
//! backends (macOS Voice-Processing I/O) implement `EchoCancellingEngine`
//! and plug into the generic `CaptureOrchestrator`.
//!
//! ## Architecture
//!
//! ```text
//! aec-capture-core (this crate)
//! ├── traits/       ← EchoCancellingEngine, CaptureDelegate
//! ├── engine/       ← AecEngine façade, SyntheticEngine
//! ├── models/       ← CaptureError, SessionPhase, SessionConfig, RecordingMetadata
//! ├── processing/   ← atomic statistics, frame queue, levels, PCM, WAV header
//! ├── session/      ← CaptureOrchestrator (timed capture, self-test, record)
//! └── storage/      ← WavFileWriter, metadata sidecar
//! ```

pub mod engine;
pub mod models;
pub mod processing;
pub mod session;
pub mod storage;
pub mod traits;

pub use engine::facade::AecEngine;
pub use engine::synthetic::{SyntheticEngine, Waveform};
pub use models::audio_models::{AudioFrameBatch, AudioSource, CaptureProgress};
pub use models::config::SessionConfig;
pub use models::error::{CaptureError, CaptureWarning};
pub use models::recording_result::{RecordingMetadata, RecordingResult};
pub use models::state::{EngineState, SessionPhase};
pub use processing::atomic_stats::{CaptureStatistics, StatisticsSnapshot};
pub use session::orchestrator::{CaptureOrchestrator, CaptureReport, Recording, SelfTestReport};
pub use storage::metadata::{read_metadata, write_metadata};
pub use storage::wav_writer::{write_recording, WavFileWriter};
pub use traits::audio_engine::{EchoCancellingEngine, EngineFault, FrameCallback};
pub use traits::capture_delegate::CaptureDelegate;
