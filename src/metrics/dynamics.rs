//! Dynamics metrics: dynamic range, crest factor and RMS level

use serde::{Deserialize, Serialize};

use crate::metrics::level::{peak, rms};
use crate::preprocessing::edge_cases::amplitude_to_dbfs;

/// RMS below which peak-to-RMS ratios are undefined
const RMS_EPSILON: f64 = 1e-10;

/// Dynamics family output for one signal
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DynamicsMetrics {
    /// Peak-to-RMS ratio (dB)
    pub dynamic_range_db: Option<f64>,
    /// Peak-to-RMS ratio (dB)
    pub crest_factor_db: Option<f64>,
    /// RMS level (dB), floored at -120
    pub rms_db: Option<f64>,
}

impl DynamicsMetrics {
    /// Compute the dynamics family for `samples`
    pub fn compute(samples: &[f32]) -> Self {
        let ratio = peak_to_rms_db(samples);
        Self {
            dynamic_range_db: ratio,
            crest_factor_db: ratio,
            rms_db: (!samples.is_empty()).then(|| amplitude_to_dbfs(rms(samples))),
        }
    }
}

/// `20·log10(peak / rms)`, null when the RMS is zero
///
/// A sine reads ~3.01 dB, a square wave 0 dB.
pub fn peak_to_rms_db(samples: &[f32]) -> Option<f64> {
    let rms = rms(samples);
    if rms < RMS_EPSILON {
        return None;
    }
    let ratio = 20.0 * (peak(samples) / rms).log10();
    ratio.is_finite().then_some(ratio)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sine_crest_factor() {
        let samples: Vec<f32> = (0..48000)
            .map(|i| 0.5 * (2.0 * std::f32::consts::PI * 1000.0 * i as f32 / 48000.0).sin())
            .collect();
        let dynamics = DynamicsMetrics::compute(&samples);
        let crest = dynamics.crest_factor_db.unwrap();
        assert!((crest - 3.0103).abs() < 0.01, "Sine crest factor should be ~3.01 dB, got {:.3}", crest);
        assert_eq!(dynamics.dynamic_range_db, dynamics.crest_factor_db);
        assert!((dynamics.rms_db.unwrap() + 9.03).abs() < 0.02);
    }

    #[test]
    fn test_square_wave_crest_is_zero() {
        let samples: Vec<f32> = (0..4800).map(|i| if (i / 24) % 2 == 0 { 0.7 } else { -0.7 }).collect();
        let crest = peak_to_rms_db(&samples).unwrap();
        assert!(crest.abs() < 1e-6, "Square wave crest should be 0 dB, got {}", crest);
    }

    #[test]
    fn test_silence_is_null() {
        let dynamics = DynamicsMetrics::compute(&vec![0.0; 4800]);
        assert_eq!(dynamics.crest_factor_db, None);
        assert_eq!(dynamics.dynamic_range_db, None);
        assert_eq!(dynamics.rms_db, Some(-120.0));
        assert_eq!(DynamicsMetrics::compute(&[]), DynamicsMetrics::default());
    }
}
