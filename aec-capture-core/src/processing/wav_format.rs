//! Canonical 44-byte RIFF/WAVE header for integer PCM data.
//!
//! Layout:
//! ```text
//! [0-3]    "RIFF"
//! [4-7]    chunk size = 36 + data_size
//! [8-11]   "WAVE"
//! [12-15]  "fmt "
//! [16-19]  16 (PCM format chunk size)
//! [20-21]  1 (PCM format code)
//! [22-23]  channels
//! [24-27]  sample_rate
//! [28-31]  byte_rate = sample_rate * channels * bit_depth / 8
//! [32-33]  block_align = channels * bit_depth / 8
//! [34-35]  bit_depth
//! [36-39]  "data"
//! [40-43]  data_size
//! ```

use crate::models::error::CaptureError;

/// Size of the canonical WAV header in bytes.
pub const WAV_HEADER_SIZE: usize = 44;

/// Offset of the RIFF chunk size field.
pub const RIFF_SIZE_OFFSET: u64 = 4;

/// Offset of the data chunk size field.
pub const DATA_SIZE_OFFSET: u64 = 40;

/// Largest data chunk whose RIFF size still fits in a `u32`.
pub const MAX_DATA_SIZE: u32 = u32::MAX - 36;

/// Sample layout described by a WAV header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavSpec {
    pub sample_rate: u32,
    pub channels: u16,
    pub bit_depth: u16,
}

impl WavSpec {
    pub fn mono_pcm16(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            channels: 1,
            bit_depth: 16,
        }
    }

    pub fn block_align(&self) -> u16 {
        self.channels * self.bit_depth / 8
    }

    pub fn byte_rate(&self) -> u32 {
        self.sample_rate * self.block_align() as u32
    }

    /// Serialize the header for `data_size` bytes of sample data.
    pub fn header(&self, data_size: u32) -> [u8; WAV_HEADER_SIZE] {
        let mut header = [0u8; WAV_HEADER_SIZE];

        header[0..4].copy_from_slice(b"RIFF");
        header[4..8].copy_from_slice(&riff_chunk_size(data_size).to_le_bytes());
        header[8..12].copy_from_slice(b"WAVE");

        header[12..16].copy_from_slice(b"fmt ");
        header[16..20].copy_from_slice(&16u32.to_le_bytes());
        header[20..22].copy_from_slice(&1u16.to_le_bytes());
        header[22..24].copy_from_slice(&self.channels.to_le_bytes());
        header[24..28].copy_from_slice(&self.sample_rate.to_le_bytes());
        header[28..32].copy_from_slice(&self.byte_rate().to_le_bytes());
        header[32..34].copy_from_slice(&self.block_align().to_le_bytes());
        header[34..36].copy_from_slice(&self.bit_depth.to_le_bytes());

        header[36..40].copy_from_slice(b"data");
        header[40..44].copy_from_slice(&data_size.to_le_bytes());

        header
    }
}

/// RIFF chunk size for a canonical file carrying `data_size` bytes.
pub fn riff_chunk_size(data_size: u32) -> u32 {
    36 + data_size
}

/// Parse a canonical header, returning its format and data chunk size.
pub fn parse_header(bytes: &[u8]) -> Result<(WavSpec, u32), CaptureError> {
    if bytes.len() < WAV_HEADER_SIZE {
        return Err(CaptureError::StorageError(format!(
            "WAV header too short: {} bytes",
            bytes.len()
        )));
    }
    if &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WAVE" {
        return Err(CaptureError::StorageError("not a RIFF/WAVE file".into()));
    }
    if &bytes[12..16] != b"fmt " || &bytes[36..40] != b"data" {
        return Err(CaptureError::StorageError("non-canonical WAV layout".into()));
    }
    let format = u16::from_le_bytes([bytes[20], bytes[21]]);
    if format != 1 {
        return Err(CaptureError::StorageError(format!(
            "unsupported WAV format code: {}",
            format
        )));
    }

    let spec = WavSpec {
        channels: u16::from_le_bytes([bytes[22], bytes[23]]),
        sample_rate: u32::from_le_bytes([bytes[24], bytes[25], bytes[26], bytes[27]]),
        bit_depth: u16::from_le_bytes([bytes[34], bytes[35]]),
    };
    let data_size = u32::from_le_bytes([bytes[40], bytes[41], bytes[42], bytes[43]]);
    Ok((spec, data_size))
}
