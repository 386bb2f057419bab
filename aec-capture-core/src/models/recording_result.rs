use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::processing::atomic_stats::StatisticsSnapshot;

/// Result returned once a recording has been written to disk.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingResult {
    pub file_path: PathBuf,
    pub duration_secs: f64,
    pub metadata: RecordingMetadata,
    pub checksum: String,
}

/// Metadata stored alongside a recording as a JSON sidecar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingMetadata {
    pub id: String,
    pub created_at: String,
    pub file_path: String,
    pub checksum: String,
    pub duration_secs: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub bit_depth: u16,
    pub echo_cancellation: bool,
    pub peak_amplitude: f32,
    pub peak_rms: f32,
    pub callback_count: u64,
    pub total_frames: u64,
    pub dropped_frames: u64,
    pub is_silent: bool,
}

impl RecordingMetadata {
    /// Creates metadata for a mono echo-cancelled recording.
    pub fn new_mono(
        file_path: &str,
        checksum: &str,
        sample_rate: u32,
        bit_depth: u16,
        samples: usize,
        statistics: &StatisticsSnapshot,
        is_silent: bool,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
            file_path: file_path.to_string(),
            checksum: checksum.to_string(),
            duration_secs: samples as f64 / sample_rate as f64,
            sample_rate,
            channels: 1,
            bit_depth,
            echo_cancellation: true,
            peak_amplitude: statistics.max_amplitude,
            peak_rms: statistics.max_rms,
            callback_count: statistics.callback_count,
            total_frames: statistics.total_frames,
            dropped_frames: statistics.dropped_frames,
            is_silent,
        }
    }
}
