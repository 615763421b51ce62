//! 128-dimension feature vectors from analysis results
//!
//! Layout (all values in their natural units, nulls mapped to 0):
//!
//! | Range   | Dims | Content |
//! |---------|------|---------|
//! | 0..40   | 40   | centroid, roll-off, flatness, energy per band; mean/std/min/max/range of each |
//! | 40..60  | 20   | LUFS, LRA, true peak, DR, crest; mean/std/min/max/range of band DR, crest, RMS |
//! | 60..65  | 5    | per-band linear energy share (sums to 1) |
//! | 65..75  | 10   | overall width and correlation; mean/std/min/max of band width and correlation |
//! | 75..83  | 8    | mean/std of band THD, harmonic ratio, transient preservation, attack time |
//! | 83..128 | 45   | reserved, zero |
//!
//! Vectors are not scaled to unit length. Cosine similarity ignores the
//! magnitude, so rankings are unchanged, but a stored vector is not
//! comparable element by element with a corpus built from L2-normalized
//! vectors. Normalize both sides before comparing against such a corpus.

use crate::analysis::result::{BandMetrics, OverallMetrics};
use crate::error::{AnalysisError, Result};
use crate::metrics::stats;

/// Feature vector length
pub const FEATURE_DIM: usize = 128;

/// Serialized vector length in bytes
pub const SERIALIZED_LEN: usize = FEATURE_DIM * 4;

/// Start of the zero-filled reserved block
pub const RESERVED_START: usize = 83;

/// Extract the feature vector for one analysis
///
/// Deterministic: the same metrics always produce the same bits.
pub fn extract_features(bands: &[BandMetrics; 5], overall: &OverallMetrics) -> [f32; FEATURE_DIM] {
    let mut features: Vec<f64> = Vec::with_capacity(FEATURE_DIM);

    // Spectral
    let centroid = per_band(bands, |b| b.spectral.centroid_hz);
    let rolloff = per_band(bands, |b| b.spectral.rolloff_hz);
    let flatness = per_band(bands, |b| b.spectral.flatness);
    let energy = per_band(bands, |b| b.spectral.energy_db);
    for i in 0..bands.len() {
        features.extend([centroid[i], rolloff[i], flatness[i], energy[i]]);
    }
    for values in [&centroid, &rolloff, &flatness, &energy] {
        push_summary(&mut features, values, true);
    }

    // Dynamics
    features.extend([
        or_zero(overall.integrated_lufs),
        or_zero(overall.loudness_range_lu),
        or_zero(overall.true_peak_dbfs),
        or_zero(overall.dynamic_range_db),
        or_zero(overall.crest_factor_db),
    ]);
    for values in [
        per_band(bands, |b| b.dynamics.dynamic_range_db),
        per_band(bands, |b| b.dynamics.crest_factor_db),
        per_band(bands, |b| b.dynamics.rms_db),
    ] {
        push_summary(&mut features, &values, true);
    }

    // Energy distribution
    features.extend(energy_distribution(bands));

    // Stereo
    features.push(or_zero(overall.avg_stereo_width_percent));
    features.push(or_zero(overall.avg_phase_correlation));
    for values in [
        per_band(bands, |b| b.stereo.width_percent),
        per_band(bands, |b| b.stereo.phase_correlation),
    ] {
        push_summary(&mut features, &values, false);
    }

    // Harmonic / transient
    for values in [
        per_band(bands, |b| b.harmonics.thd_percent),
        per_band(bands, |b| b.harmonics.harmonic_ratio),
        per_band(bands, |b| b.transients.transient_preservation),
        per_band(bands, |b| b.transients.attack_time_ms),
    ] {
        features.push(stats::mean(&values).unwrap_or(0.0));
        features.push(stats::std_dev(&values).unwrap_or(0.0));
    }

    debug_assert_eq!(features.len(), RESERVED_START);

    let mut vector = [0.0f32; FEATURE_DIM];
    for (slot, value) in vector.iter_mut().zip(features) {
        let value = value as f32;
        *slot = if value.is_finite() { value } else { 0.0 };
    }
    vector
}

/// Linear energy share per band
///
/// Null or empty bands contribute nothing; with no energy anywhere the
/// share is uniform.
pub fn energy_distribution(bands: &[BandMetrics; 5]) -> [f64; 5] {
    let linear: Vec<f64> = bands
        .iter()
        .map(|b| b.spectral.energy_db.map(|db| 10.0_f64.powf(db / 10.0)).unwrap_or(0.0))
        .collect();
    let total: f64 = linear.iter().sum();
    if !(total > 0.0 && total.is_finite()) {
        return [0.2; 5];
    }
    std::array::from_fn(|i| linear[i] / total)
}

/// Encode as 128 little-endian `f32` values
///
/// # Errors
///
/// Returns `AnalysisError::InvalidInput` unless `vector` has exactly 128 values.
pub fn serialize_vector(vector: &[f32]) -> Result<Vec<u8>> {
    if vector.len() != FEATURE_DIM {
        return Err(AnalysisError::InvalidInput(format!(
            "Feature vector must have {} values, got {}",
            FEATURE_DIM,
            vector.len()
        )));
    }
    Ok(vector.iter().flat_map(|v| v.to_le_bytes()).collect())
}

/// Decode a vector written by [`serialize_vector`]
///
/// # Errors
///
/// Returns `AnalysisError::InvalidInput` unless `bytes` is exactly 512 bytes.
pub fn deserialize_vector(bytes: &[u8]) -> Result<[f32; FEATURE_DIM]> {
    if bytes.len() != SERIALIZED_LEN {
        return Err(AnalysisError::InvalidInput(format!(
            "Serialized feature vector must be {} bytes, got {}",
            SERIALIZED_LEN,
            bytes.len()
        )));
    }
    let mut vector = [0.0f32; FEATURE_DIM];
    for (slot, chunk) in vector.iter_mut().zip(bytes.chunks_exact(4)) {
        *slot = f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }
    Ok(vector)
}

fn or_zero(value: Option<f64>) -> f64 {
    value.unwrap_or(0.0)
}

fn per_band(bands: &[BandMetrics; 5], metric: impl Fn(&BandMetrics) -> Option<f64>) -> Vec<f64> {
    bands.iter().map(|b| or_zero(metric(b))).collect()
}

/// Mean, std, min, max and optionally range
fn push_summary(features: &mut Vec<f64>, values: &[f64], with_range: bool) {
    let min = stats::min(values).unwrap_or(0.0);
    let max = stats::max(values).unwrap_or(0.0);
    features.push(stats::mean(values).unwrap_or(0.0));
    features.push(stats::std_dev(values).unwrap_or(0.0));
    features.push(min);
    features.push(max);
    if with_range {
        features.push(max - min);
    }
}
