/// Peak absolute level and root-mean-square level in a single pass.
///
/// Both are 0.0 for an empty slice. Used on the real-time thread.
pub fn peak_and_rms(samples: &[f32]) -> (f32, f32) {
    if samples.is_empty() {
        return (0.0, 0.0);
    }
    let mut peak = 0.0f32;
    let mut sum_sq = 0.0f32;
    for &s in samples {
        peak = peak.max(s.abs());
        sum_sq += s * s;
    }
    (peak, (sum_sq / samples.len() as f32).sqrt())
}

/// Whether every sample is within `epsilon` of zero.
pub fn is_silent(samples: &[f32], epsilon: f32) -> bool {
    samples.iter().all(|s| s.abs() <= epsilon)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn silence_and_empty_are_zero() {
        assert_eq!(peak_and_rms(&[0.0, 0.0, 0.0]), (0.0, 0.0));
        assert_eq!(peak_and_rms(&[]), (0.0, 0.0));
    }

    #[test]
    fn full_scale_square_wave() {
        let (peak, rms) = peak_and_rms(&[1.0, -1.0, 1.0]);
        assert_abs_diff_eq!(peak, 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(rms, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn peak_uses_absolute_value() {
        let (peak, rms) = peak_and_rms(&[0.1, -0.5, 0.3]);
        assert_abs_diff_eq!(peak, 0.5, epsilon = 1e-6);
        assert_abs_diff_eq!(rms, (0.35f32 / 3.0).sqrt(), epsilon = 1e-6);
    }

    #[test]
    fn sine_levels() {
        // 48 kHz, 1 kHz: 48 samples per period, so 480 is a whole number of periods.
        let samples: Vec<f32> = (0..480)
            .map(|i| (std::f32::consts::TAU * i as f32 / 48.0).sin() * 0.7)
            .collect();
        let (peak, rms) = peak_and_rms(&samples);
        assert_abs_diff_eq!(peak, 0.7, epsilon = 1e-5);
        assert_abs_diff_eq!(rms, 0.7 / 2f32.sqrt(), epsilon = 1e-4);
    }

    #[test]
    fn silence_uses_epsilon() {
        assert!(is_silent(&[0.0, 1e-7, -1e-7], 1e-6));
        assert!(!is_silent(&[0.0, 2e-6], 1e-6));
        assert!(is_silent(&[], 1e-6));
    }
}
