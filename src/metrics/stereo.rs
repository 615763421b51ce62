//! Stereo image metrics from a left/right pair
//!
//! Mid/side decomposition: `mid = (L + R) / 2`, `side = (L - R) / 2`.
//!
//! - Width: `100 · E_side / (E_mid + E_side)`; 0% for identical channels,
//!   100% for polarity-inverted channels
//! - Phase correlation: Pearson correlation of L and R in [-1, 1]
//! - Mid/side energy: `10·log10(Σ signal²)`, floored at -120 dB
//!
//! Every metric is null for mono input.

use serde::{Deserialize, Serialize};

use crate::preprocessing::edge_cases::DB_FLOOR;

/// Numerical stability epsilon
const EPSILON: f64 = 1e-10;

/// Stereo family output for one band
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StereoMetrics {
    /// Side share of total energy (%)
    pub width_percent: Option<f64>,
    /// Pearson correlation of left and right
    pub phase_correlation: Option<f64>,
    /// Mid energy (dB)
    pub mid_energy_db: Option<f64>,
    /// Side energy (dB)
    pub side_energy_db: Option<f64>,
}

impl StereoMetrics {
    /// Compute the stereo family; `None` input (mono) gives all-null metrics
    pub fn compute(pair: Option<(&[f32], &[f32])>) -> Self {
        let Some((left, right)) = pair else {
            return Self::default();
        };
        if left.is_empty() || left.len() != right.len() {
            return Self::default();
        }

        let (mid_energy, side_energy) = mid_side_energy(left, right);
        Self {
            width_percent: Some(width_percent(mid_energy, side_energy)),
            phase_correlation: phase_correlation(left, right),
            mid_energy_db: Some(energy_to_db(mid_energy)),
            side_energy_db: Some(energy_to_db(side_energy)),
        }
    }
}

/// `(Σ mid², Σ side²)`
pub fn mid_side_energy(left: &[f32], right: &[f32]) -> (f64, f64) {
    left.iter().zip(right.iter()).fold((0.0, 0.0), |(mid, side), (&l, &r)| {
        let m = (l as f64 + r as f64) * 0.5;
        let s = (l as f64 - r as f64) * 0.5;
        (mid + m * m, side + s * s)
    })
}

/// Side share of total energy in percent; 0 when both are silent
pub fn width_percent(mid_energy: f64, side_energy: f64) -> f64 {
    let total = mid_energy + side_energy;
    if total < EPSILON {
        return 0.0;
    }
    100.0 * side_energy / total
}

/// Pearson correlation of `left` and `right`
///
/// Null when either channel is constant (zero variance).
pub fn phase_correlation(left: &[f32], right: &[f32]) -> Option<f64> {
    let n = left.len().min(right.len());
    if n == 0 {
        return None;
    }
    let mean_l = left[..n].iter().map(|&x| x as f64).sum::<f64>() / n as f64;
    let mean_r = right[..n].iter().map(|&x| x as f64).sum::<f64>() / n as f64;

    let (mut cov, mut var_l, mut var_r) = (0.0, 0.0, 0.0);
    for (&l, &r) in left[..n].iter().zip(right[..n].iter()) {
        let dl = l as f64 - mean_l;
        let dr = r as f64 - mean_r;
        cov += dl * dr;
        var_l += dl * dl;
        var_r += dr * dr;
    }

    let std_l = (var_l / n as f64).sqrt();
    let std_r = (var_r / n as f64).sqrt();
    if std_l < EPSILON || std_r < EPSILON {
        return None;
    }
    let corr = cov / (var_l.sqrt() * var_r.sqrt());
    corr.is_finite().then(|| corr.clamp(-1.0, 1.0))
}

fn energy_to_db(energy: f64) -> f64 {
    if energy < EPSILON {
        return DB_FLOOR;
    }
    (10.0 * energy.log10()).max(DB_FLOOR)
}
