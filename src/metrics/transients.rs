//! Transient metrics: transient preservation and attack time
//!
//! Transient preservation is the percussive share of the band's energy from
//! the harmonic/percussive separation. Attack time is the mean delay from each
//! detected onset to the following peak of the RMS envelope, searched over a
//! short window after the onset.

use serde::{Deserialize, Serialize};

use crate::config::AnalysisConfig;
use crate::error::Result;
use crate::features::hpss::HpssEnergies;
use crate::features::onset::detect_energy_flux_onsets;
use crate::features::onset::energy_flux::frame_rms;
use crate::metrics::level::rms;

/// Numerical stability epsilon
const EPSILON: f64 = 1e-10;

/// Band RMS below which transient metrics are not computed
const ENERGY_FLOOR: f64 = 1e-6;

/// Envelope and onset frame length (samples)
pub const ENVELOPE_FRAME: usize = 2048;

/// Envelope and onset hop (samples)
pub const ENVELOPE_HOP: usize = 512;

/// Transient family output for one band
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TransientMetrics {
    /// Percussive share of total energy [0, 1]
    pub transient_preservation: Option<f64>,
    /// Mean onset-to-peak time (ms)
    pub attack_time_ms: Option<f64>,
}

impl TransientMetrics {
    /// Compute the transient family
    ///
    /// # Errors
    ///
    /// Propagates onset detection failures; the orchestrator records them as a
    /// failed band.
    pub fn compute(
        samples: &[f32],
        sample_rate: u32,
        hpss: &HpssEnergies,
        config: &AnalysisConfig,
    ) -> Result<Self> {
        if samples.is_empty() || rms(samples) < ENERGY_FLOOR {
            return Ok(Self::default());
        }
        Ok(Self {
            transient_preservation: transient_preservation(hpss),
            attack_time_ms: attack_time_ms(samples, sample_rate, config)?,
        })
    }
}

/// `min(E_percussive / E_total, 1)`
pub fn transient_preservation(hpss: &HpssEnergies) -> Option<f64> {
    if hpss.total < EPSILON {
        return None;
    }
    let ratio = hpss.percussive / hpss.total;
    ratio.is_finite().then(|| ratio.clamp(0.0, 1.0))
}

/// Mean onset-to-peak time in milliseconds, `None` without onsets
pub fn attack_time_ms(samples: &[f32], sample_rate: u32, config: &AnalysisConfig) -> Result<Option<f64>> {
    let onsets = detect_energy_flux_onsets(samples, ENVELOPE_FRAME, ENVELOPE_HOP, config.onset_threshold_db)?;
    if onsets.is_empty() {
        return Ok(None);
    }

    let envelope = centered_envelope(samples);
    let search_frames =
        ((config.attack_search_ms / 1000.0 * sample_rate as f64) as usize / ENVELOPE_HOP).max(1);

    let attacks: Vec<f64> = onsets
        .iter()
        .filter_map(|&onset| {
            let start = onset / ENVELOPE_HOP;
            let end = (start + search_frames).min(envelope.len());
            if start >= end {
                return None;
            }
            let offset = envelope[start..end]
                .iter()
                .enumerate()
                .max_by(|a, b| a.1.total_cmp(b.1))
                .map(|(i, _)| i)?;
            Some(1000.0 * (offset * ENVELOPE_HOP) as f64 / sample_rate as f64)
        })
        .collect();

    log::debug!(
        "Attack time: {} onsets, {} measured, search {} frames",
        onsets.len(),
        attacks.len(),
        search_frames
    );

    if attacks.is_empty() {
        return Ok(None);
    }
    Ok(Some(attacks.iter().sum::<f64>() / attacks.len() as f64))
}

/// RMS envelope with frames centered on multiples of the hop
fn centered_envelope(samples: &[f32]) -> Vec<f32> {
    let pad = ENVELOPE_FRAME / 2;
    let mut padded = vec![0.0f32; samples.len() + 2 * pad];
    padded[pad..pad + samples.len()].copy_from_slice(samples);
    frame_rms(&padded, ENVELOPE_FRAME, ENVELOPE_HOP)
}
