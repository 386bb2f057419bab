use std::fs;
use std::path::{Path, PathBuf};

use crate::models::error::CaptureError;
use crate::models::recording_result::RecordingMetadata;

/// Sidecar location for a recording: `recorded.wav` -> `recorded.metadata.json`.
pub fn metadata_path(recording_path: &Path) -> PathBuf {
    recording_path.with_extension("metadata.json")
}

/// Write recording metadata as a pretty-printed JSON sidecar.
pub fn write_metadata(metadata: &RecordingMetadata, recording_path: &Path) -> Result<PathBuf, CaptureError> {
    let path = metadata_path(recording_path);
    let json = serde_json::to_string_pretty(metadata)
        .map_err(|e| CaptureError::StorageError(format!("failed to serialize metadata: {}", e)))?;
    fs::write(&path, json)
        .map_err(|e| CaptureError::StorageError(format!("failed to write {}: {}", path.display(), e)))?;
    log::debug!("metadata written to {}", path.display());
    Ok(path)
}

pub fn read_metadata(recording_path: &Path) -> Result<RecordingMetadata, CaptureError> {
    let path = metadata_path(recording_path);
    let json = fs::read_to_string(&path)
        .map_err(|e| CaptureError::StorageError(format!("failed to read {}: {}", path.display(), e)))?;
    serde_json::from_str(&json).map_err(|e| CaptureError::StorageError(format!("failed to parse metadata: {}", e)))
}
