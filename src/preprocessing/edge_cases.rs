//! Silence and clipping detection
//!
//! Both checks are advisory: they feed warnings into the overall metrics and
//! never stop a run.

/// Level reported for digital silence
pub const DB_FLOOR: f64 = -120.0;

/// Numerical stability epsilon
const EPSILON: f64 = 1e-10;

/// RMS of the whole signal in dBFS, unclamped (`-inf` for all-zero input)
pub fn rms_dbfs_raw(samples: &[f32]) -> f64 {
    if samples.is_empty() {
        return f64::NEG_INFINITY;
    }
    let mean_sq = samples.iter().map(|&x| (x as f64) * (x as f64)).sum::<f64>() / samples.len() as f64;
    if mean_sq <= 0.0 {
        return f64::NEG_INFINITY;
    }
    10.0 * mean_sq.log10()
}

/// True when whole-file RMS is below `threshold_dbfs`
///
/// Empty input counts as silent.
pub fn is_silent(samples: &[f32], threshold_dbfs: f64) -> bool {
    rms_dbfs_raw(samples) < threshold_dbfs
}

/// True when `peak_dbfs` exceeds `threshold_dbfs`
pub fn is_clipping(peak_dbfs: Option<f64>, threshold_dbfs: f64) -> bool {
    peak_dbfs.map(|p| p > threshold_dbfs).unwrap_or(false)
}

/// Linear amplitude to dBFS with the -120 dB floor
pub fn amplitude_to_dbfs(amplitude: f64) -> f64 {
    if amplitude < EPSILON {
        return DB_FLOOR;
    }
    (20.0 * amplitude.log10()).max(DB_FLOOR)
}
