//! Level metrics: band RMS, sample peak and short-term level range
//!
//! All levels are dBFS relative to a full-scale amplitude of 1.0. Silent
//! input reports the -120 dB floor rather than `-inf`; only empty input is
//! null.

use serde::{Deserialize, Serialize};

use crate::metrics::stats;
use crate::preprocessing::edge_cases::amplitude_to_dbfs;

/// Level family output for one signal
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LevelMetrics {
    /// RMS level (dBFS)
    pub rms_dbfs: Option<f64>,
    /// Largest absolute sample (dBFS)
    pub true_peak_dbfs: Option<f64>,
    /// 90th minus 10th percentile of short-frame RMS levels (dB)
    pub level_range_db: Option<f64>,
}

impl LevelMetrics {
    /// Compute the level family
    ///
    /// # Arguments
    ///
    /// * `samples` - Time-domain signal (one band, or the full mix)
    /// * `sample_rate` - Sample rate in Hz
    /// * `frame_ms` - Frame length for the level-range analysis
    pub fn compute(samples: &[f32], sample_rate: u32, frame_ms: f64) -> Self {
        Self {
            rms_dbfs: rms_dbfs(samples),
            true_peak_dbfs: peak_dbfs(samples),
            level_range_db: level_range_db(samples, sample_rate, frame_ms),
        }
    }
}

/// Root mean square, accumulated in f64
pub fn rms(samples: &[f32]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = samples.iter().map(|&x| (x as f64) * (x as f64)).sum();
    (sum_sq / samples.len() as f64).sqrt()
}

/// Largest absolute sample
pub fn peak(samples: &[f32]) -> f64 {
    samples.iter().fold(0.0f32, |acc, &x| acc.max(x.abs())) as f64
}

/// `20·log10(rms)`, floored at -120 dBFS
pub fn rms_dbfs(samples: &[f32]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    Some(amplitude_to_dbfs(rms(samples)))
}

/// `20·log10(max|x|)`, floored at -120 dBFS
pub fn peak_dbfs(samples: &[f32]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    Some(amplitude_to_dbfs(peak(samples)))
}

/// Spread of short-term level: P90 - P10 of per-frame RMS dB
///
/// Frames are non-overlapping and `frame_ms` long; a trailing partial frame
/// is ignored. Silent frames sit at the floor, so an all-silent signal has a
/// range of 0 dB. Null when fewer than two whole frames fit.
pub fn level_range_db(samples: &[f32], sample_rate: u32, frame_ms: f64) -> Option<f64> {
    let frame_len = ((sample_rate as f64 * frame_ms / 1000.0) as usize).max(1);
    let num_frames = samples.len() / frame_len;
    if num_frames < 2 {
        return None;
    }

    let mut frame_db: Vec<f64> = samples
        .chunks_exact(frame_len)
        .map(|frame| amplitude_to_dbfs(rms(frame)))
        .collect();
    frame_db.sort_by(|a, b| a.total_cmp(b));

    let low = stats::percentile_sorted(&frame_db, 10.0)?;
    let high = stats::percentile_sorted(&frame_db, 90.0)?;
    Some((high - low).max(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, amplitude: f32, sample_rate: u32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| amplitude * (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate as f32).sin())
            .collect()
    }

    #[test]
    fn test_full_scale_sine_levels() {
        let samples = sine(1000.0, 1.0, 48000, 48000);
        let level = LevelMetrics::compute(&samples, 48000, 50.0);

        let rms = level.rms_dbfs.unwrap();
        assert!((rms + 3.0103).abs() < 0.01, "Sine RMS should be -3.01 dBFS, got {:.3}", rms);
        let peak = level.true_peak_dbfs.unwrap();
        assert!(peak.abs() < 0.01, "Sine peak should be 0 dBFS, got {:.3}", peak);
        let range = level.level_range_db.unwrap();
        assert!(range < 0.1, "Steady sine should have ~0 dB range, got {:.3}", range);
    }

    #[test]
    fn test_silence_hits_floor() {
        let level = LevelMetrics::compute(&vec![0.0; 48000], 48000, 50.0);
        assert_eq!(level.rms_dbfs, Some(-120.0));
        assert_eq!(level.true_peak_dbfs, Some(-120.0));
        assert_eq!(level.level_range_db, Some(0.0));
    }

    #[test]
    fn test_empty_and_short_input() {
        let level = LevelMetrics::compute(&[], 48000, 50.0);
        assert_eq!(level, LevelMetrics::default());

        // One 50 ms frame only
        assert_eq!(level_range_db(&vec![0.5; 3000], 48000, 50.0), None);
    }

    #[test]
    fn test_level_range_two_levels() {
        // Half the frames at -6 dBFS, half at -26 dBFS
        let mut samples = vec![0.5f32; 48000];
        samples.extend(vec![0.05f32; 48000]);
        let range = level_range_db(&samples, 48000, 50.0).unwrap();
        assert!((range - 20.0).abs() < 0.01, "Expected 20 dB range, got {:.3}", range);
    }
}
