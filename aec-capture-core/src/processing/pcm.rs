/// Scale factor between normalized floats and 16-bit PCM.
pub const INT16_SCALE: f32 = i16::MAX as f32;

/// Quantize a normalized sample to 16-bit PCM.
///
/// Clamps to `[-1.0, 1.0]` and rounds to nearest, so full scale maps to
/// `±32767` and the reconstruction error stays under half a step.
pub fn quantize_sample(sample: f32) -> i16 {
    let clamped = if sample.is_nan() { 0.0 } else { sample.clamp(-1.0, 1.0) };
    (clamped * INT16_SCALE).round() as i16
}

/// Inverse of `quantize_sample`.
pub fn dequantize_sample(value: i16) -> f32 {
    (value as f32 / INT16_SCALE).max(-1.0)
}

pub fn dequantize_int16(values: &[i16]) -> Vec<f32> {
    values.iter().map(|&v| dequantize_sample(v)).collect()
}

/// Convert f32 samples `[-1.0, 1.0]` to 16-bit PCM (little-endian bytes).
///
/// Output length = `samples.len() * 2` bytes.
pub fn convert_to_int16_pcm(samples: &[f32]) -> Vec<u8> {
    let mut data = Vec::with_capacity(samples.len() * 2);
    for &sample in samples {
        data.extend_from_slice(&quantize_sample(sample).to_le_bytes());
    }
    data
}

/// Decode little-endian 16-bit PCM bytes. A trailing odd byte is ignored.
pub fn int16_pcm_from_bytes(bytes: &[u8]) -> Vec<i16> {
    bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect()
}
