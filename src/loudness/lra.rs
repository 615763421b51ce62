//! Loudness range (EBU Tech 3342)
//!
//! Short-term loudness over 3 s windows every 100 ms, gated in two stages
//! (absolute -70 LUFS, then -20 LU below the loudness of the absolute-gated
//! mean power). LRA is the spread between the 10th and 95th percentiles of the
//! surviving values.

use crate::loudness::bs1770::{lufs_to_power, power_to_lufs, PowerIntegrator, ABSOLUTE_GATE_LUFS};
use crate::metrics::stats::percentile_sorted;

/// Short-term window (seconds)
pub const SHORT_TERM_SECONDS: f64 = 3.0;

/// Short-term window step (seconds)
pub const SHORT_TERM_STEP_SECONDS: f64 = 0.1;

/// Relative gate below the absolute-gated loudness (LU)
pub const RELATIVE_GATE_LU: f64 = -20.0;

/// Lower percentile of the distribution
pub const LOW_PERCENTILE: f64 = 10.0;

/// Upper percentile of the distribution
pub const HIGH_PERCENTILE: f64 = 95.0;

/// Loudness range in LU from an integrator
///
/// `None` for audio shorter than one short-term window or when every window
/// falls below the absolute gate.
pub fn loudness_range(integrator: &PowerIntegrator) -> Option<f64> {
    let powers = integrator.window_powers(SHORT_TERM_SECONDS, SHORT_TERM_STEP_SECONDS);
    let lra = range_from_powers(&powers);
    log::debug!("LRA: {} short-term windows, range {:?} LU", powers.len(), lra);
    lra
}

/// Gate short-term powers and take the P95 - P10 spread
pub fn range_from_powers(powers: &[f64]) -> Option<f64> {
    let absolute_power = lufs_to_power(ABSOLUTE_GATE_LUFS);
    let gated: Vec<f64> = powers.iter().copied().filter(|&p| p > absolute_power).collect();
    if gated.is_empty() {
        return None;
    }

    let mean_power = gated.iter().sum::<f64>() / gated.len() as f64;
    let relative_gate = power_to_lufs(mean_power) + RELATIVE_GATE_LU;

    let mut loudness: Vec<f64> = gated
        .iter()
        .map(|&p| power_to_lufs(p))
        .filter(|&l| l > relative_gate)
        .collect();
    if loudness.is_empty() {
        return None;
    }
    loudness.sort_by(|a, b| a.total_cmp(b));

    let low = percentile_sorted(&loudness, LOW_PERCENTILE)?;
    let high = percentile_sorted(&loudness, HIGH_PERCENTILE)?;
    let range = (high - low).max(0.0);
    range.is_finite().then_some(range)
}
