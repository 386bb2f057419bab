use std::fs::{self, File};
use std::io::{BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::models::error::CaptureError;
use crate::models::recording_result::{RecordingMetadata, RecordingResult};
use crate::processing::pcm;
use crate::processing::wav_format::{self, WavSpec, WAV_HEADER_SIZE};
use crate::session::orchestrator::Recording;

/// Samples converted per write call.
const WRITE_CHUNK_SAMPLES: usize = 4800;

/// Streaming 16-bit PCM WAV writer.
///
/// ## File Format
/// ```text
/// [44-byte WAV header]
/// [raw little-endian 16-bit PCM data...]
/// ```
///
/// The header is written with a zero data size on `open` and patched on
/// `close`, so an interrupted write leaves a file that readers treat as empty
/// rather than truncated.
pub struct WavFileWriter {
    file_path: PathBuf,
    spec: WavSpec,
    file: Option<BufWriter<File>>,
    data_bytes_written: u64,
}

impl WavFileWriter {
    pub fn new(file_path: PathBuf, spec: WavSpec) -> Self {
        Self {
            file_path,
            spec,
            file: None,
            data_bytes_written: 0,
        }
    }

    /// Create the file and write the placeholder header.
    pub fn open(&mut self) -> Result<(), CaptureError> {
        if self.file.is_some() {
            return Ok(());
        }

        if let Some(parent) = self.file_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|e| CaptureError::StorageError(format!("failed to create directory: {}", e)))?;
            }
        }

        let file = File::create(&self.file_path)
            .map_err(|e| CaptureError::StorageError(format!("failed to create {}: {}", self.file_path.display(), e)))?;
        let mut writer = BufWriter::new(file);
        writer
            .write_all(&self.spec.header(0))
            .map_err(|e| CaptureError::StorageError(format!("failed to write header: {}", e)))?;

        self.file = Some(writer);
        self.data_bytes_written = 0;
        Ok(())
    }

    /// Quantize and append normalized samples.
    pub fn write_samples(&mut self, samples: &[f32]) -> Result<(), CaptureError> {
        for chunk in samples.chunks(WRITE_CHUNK_SAMPLES) {
            self.write_pcm(&pcm::convert_to_int16_pcm(chunk))?;
        }
        Ok(())
    }

    /// Append raw little-endian PCM bytes.
    pub fn write_pcm(&mut self, data: &[u8]) -> Result<(), CaptureError> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| CaptureError::StorageError("file is not open for writing".into()))?;
        file.write_all(data)
            .map_err(|e| CaptureError::StorageError(format!("write failed: {}", e)))?;
        self.data_bytes_written += data.len() as u64;
        Ok(())
    }

    /// Patch the header sizes, flush, and return the SHA-256 of the file.
    pub fn close(&mut self) -> Result<String, CaptureError> {
        let mut file = self
            .file
            .take()
            .ok_or_else(|| CaptureError::StorageError("file is not open".into()))?;

        let data_size = u32::try_from(self.data_bytes_written)
            .ok()
            .filter(|size| *size <= wav_format::MAX_DATA_SIZE)
            .ok_or_else(|| CaptureError::StorageError("recording exceeds WAV size limit".into()))?;

        let io = |e: std::io::Error| CaptureError::StorageError(e.to_string());
        file.seek(SeekFrom::Start(wav_format::RIFF_SIZE_OFFSET)).map_err(io)?;
        file.write_all(&wav_format::riff_chunk_size(data_size).to_le_bytes())
            .map_err(io)?;
        file.seek(SeekFrom::Start(wav_format::DATA_SIZE_OFFSET)).map_err(io)?;
        file.write_all(&data_size.to_le_bytes()).map_err(io)?;
        file.flush().map_err(io)?;
        drop(file);

        sha256_file(&self.file_path)
    }

    /// Bytes written so far, including the header.
    pub fn bytes_written(&self) -> u64 {
        self.data_bytes_written + WAV_HEADER_SIZE as u64
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }
}

/// Serialize a finished recording to `path` as mono 16-bit PCM.
///
/// On failure the recording is untouched and can be written elsewhere.
pub fn write_recording(recording: &Recording, path: &Path) -> Result<RecordingResult, CaptureError> {
    let mut writer = WavFileWriter::new(path.to_path_buf(), WavSpec::mono_pcm16(recording.sample_rate));
    writer.open()?;
    writer.write_samples(&recording.samples)?;
    let checksum = writer.close()?;

    let metadata = RecordingMetadata::new_mono(
        &path.to_string_lossy(),
        &checksum,
        recording.sample_rate,
        16,
        recording.samples.len(),
        &recording.statistics,
        recording.is_silent(),
    );

    log::info!(
        "wrote {} samples ({:.2}s) to {}",
        recording.samples.len(),
        recording.duration_secs(),
        path.display()
    );

    Ok(RecordingResult {
        file_path: path.to_path_buf(),
        duration_secs: recording.duration_secs(),
        metadata,
        checksum,
    })
}

/// Read a canonical 16-bit PCM WAV file back into its format and samples.
pub fn read_pcm16_file(path: &Path) -> Result<(WavSpec, Vec<i16>), CaptureError> {
    let mut bytes = Vec::new();
    File::open(path)
        .and_then(|mut f| f.read_to_end(&mut bytes))
        .map_err(|e| CaptureError::StorageError(format!("failed to read {}: {}", path.display(), e)))?;

    let (spec, data_size) = wav_format::parse_header(&bytes)?;
    if spec.bit_depth != 16 {
        return Err(CaptureError::StorageError(format!(
            "expected 16-bit PCM, found {}-bit",
            spec.bit_depth
        )));
    }
    let end = (WAV_HEADER_SIZE + data_size as usize).min(bytes.len());
    Ok((spec, pcm::int16_pcm_from_bytes(&bytes[WAV_HEADER_SIZE..end])))
}

/// Compute SHA-256 hex digest of a file.
fn sha256_file(path: &Path) -> Result<String, CaptureError> {
    let data =
        fs::read(path).map_err(|e| CaptureError::StorageError(format!("failed to read file for checksum: {}", e)))?;
    let digest = Sha256::digest(&data);
    Ok(digest.iter().map(|b| format!("{:02x}", b)).collect())
}
