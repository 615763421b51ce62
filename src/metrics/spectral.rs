//! Spectral shape metrics
//!
//! Computed per frame from the magnitude spectrum and averaged over frames
//! that carry signal; frames whose total magnitude is zero are skipped. With
//! no such frame the shape metrics are null. Energy is defined for any
//! non-empty view and floors at -120 dB.
//!
//! - Centroid: magnitude-weighted mean frequency
//! - Bandwidth: magnitude-weighted standard deviation around the centroid
//! - Roll-off: lowest frequency below which 85% of the frame's energy lies
//! - Flatness: geometric over arithmetic mean of the magnitudes (0 = tonal, 1 = flat)
//! - Energy: `10·log10(Σ|X|² / frames)`

use serde::{Deserialize, Serialize};

use crate::features::stft::SpectralView;
use crate::preprocessing::edge_cases::DB_FLOOR;

/// Numerical stability epsilon
const EPSILON: f64 = 1e-10;

/// Magnitude floor inside the geometric mean
const FLATNESS_AMIN: f64 = 1e-10;

/// Cumulative energy fraction that defines the roll-off frequency
pub const ROLLOFF_FRACTION: f64 = 0.85;

/// Spectral family output for one band
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SpectralMetrics {
    /// Mean spectral centroid (Hz)
    pub centroid_hz: Option<f64>,
    /// Mean 85% roll-off frequency (Hz)
    pub rolloff_hz: Option<f64>,
    /// Mean spectral flatness [0, 1]
    pub flatness: Option<f64>,
    /// Mean per-frame energy (dB)
    pub energy_db: Option<f64>,
}

impl SpectralMetrics {
    /// Compute the spectral family over `view`
    pub fn compute(view: &SpectralView<'_>) -> Self {
        if view.is_empty() {
            return Self::default();
        }
        Self {
            centroid_hz: centroid_hz(view),
            rolloff_hz: rolloff_hz(view, ROLLOFF_FRACTION),
            flatness: flatness(view),
            energy_db: energy_db(view),
        }
    }
}

/// Mean of a per-frame statistic over frames with signal
fn mean_over_frames<F>(view: &SpectralView<'_>, mut per_frame: F) -> Option<f64>
where
    F: FnMut(&[f64]) -> Option<f64>,
{
    let mut sum = 0.0;
    let mut count = 0usize;
    let mut magnitudes = Vec::with_capacity(view.num_bins());
    for f in 0..view.num_frames() {
        magnitudes.clear();
        magnitudes.extend(view.frame(f).iter().map(|c| c.norm() as f64));
        if let Some(value) = per_frame(&magnitudes) {
            sum += value;
            count += 1;
        }
    }
    (count > 0).then(|| sum / count as f64)
}

/// Mean spectral centroid in Hz
pub fn centroid_hz(view: &SpectralView<'_>) -> Option<f64> {
    mean_over_frames(view, |mags| frame_centroid(view, mags))
}

fn frame_centroid(view: &SpectralView<'_>, mags: &[f64]) -> Option<f64> {
    let total: f64 = mags.iter().sum();
    if total < EPSILON {
        return None;
    }
    let weighted: f64 = mags.iter().enumerate().map(|(k, &m)| view.frequency(k) * m).sum();
    Some(weighted / total)
}

/// Mean centroid and bandwidth over the same frames
///
/// Used for the whole-file summary, where both come from the full spectrum.
pub fn centroid_and_bandwidth(view: &SpectralView<'_>) -> (Option<f64>, Option<f64>) {
    let mut centroid_sum = 0.0;
    let mut bandwidth_sum = 0.0;
    let mut count = 0usize;
    let mut mags = Vec::with_capacity(view.num_bins());

    for f in 0..view.num_frames() {
        mags.clear();
        mags.extend(view.frame(f).iter().map(|c| c.norm() as f64));
        let Some(centroid) = frame_centroid(view, &mags) else {
            continue;
        };
        let total: f64 = mags.iter().sum();
        let spread: f64 = mags
            .iter()
            .enumerate()
            .map(|(k, &m)| {
                let d = view.frequency(k) - centroid;
                m * d * d
            })
            .sum();
        centroid_sum += centroid;
        bandwidth_sum += (spread / total).sqrt();
        count += 1;
    }

    if count == 0 {
        return (None, None);
    }
    (
        Some(centroid_sum / count as f64),
        Some(bandwidth_sum / count as f64),
    )
}

/// Mean roll-off frequency in Hz for cumulative energy `fraction`
pub fn rolloff_hz(view: &SpectralView<'_>, fraction: f64) -> Option<f64> {
    mean_over_frames(view, |mags| {
        let total: f64 = mags.iter().map(|m| m * m).sum();
        if total < EPSILON {
            return None;
        }
        let target = fraction * total;
        let mut cumulative = 0.0;
        for (k, m) in mags.iter().enumerate() {
            cumulative += m * m;
            if cumulative >= target {
                return Some(view.frequency(k));
            }
        }
        Some(view.frequency(mags.len() - 1))
    })
}

/// Mean spectral flatness (Wiener entropy) in [0, 1]
pub fn flatness(view: &SpectralView<'_>) -> Option<f64> {
    mean_over_frames(view, |mags| {
        let arithmetic = mags.iter().sum::<f64>() / mags.len() as f64;
        if arithmetic < EPSILON {
            return None;
        }
        let log_mean = mags.iter().map(|&m| m.max(FLATNESS_AMIN).ln()).sum::<f64>() / mags.len() as f64;
        Some((log_mean.exp() / arithmetic).clamp(0.0, 1.0))
    })
}

/// Mean per-frame energy `10·log10(Σ|X|² / frames)`, floored at -120 dB
pub fn energy_db(view: &SpectralView<'_>) -> Option<f64> {
    if view.is_empty() {
        return None;
    }
    let per_frame = view.total_energy() / view.num_frames() as f64;
    if per_frame < EPSILON {
        return Some(DB_FLOOR);
    }
    Some((10.0 * per_frame.log10()).max(DB_FLOOR))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::bands::{band_bins, BandId};
    use crate::features::stft::compute_transform;

    fn sine(freq: f32, sample_rate: u32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate as f32).sin())
            .collect()
    }

    fn white_noise(len: usize) -> Vec<f32> {
        let mut state = 0x2545F4914F6CDD1Du64;
        (0..len)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 7;
                state ^= state << 17;
                (state >> 40) as f32 / (1u64 << 23) as f32 - 1.0
            })
            .collect()
    }

    #[test]
    fn test_sine_centroid_in_band() {
        let spectrogram = compute_transform(&sine(440.0, 48000, 48000 * 3), 48000);
        let bins = band_bins(BandId::LowMid.definition(), 48000);
        let band = spectrogram.extract_bins(bins);
        let metrics = SpectralMetrics::compute(&band.view());

        let centroid = metrics.centroid_hz.unwrap();
        assert!(
            (centroid - 440.0).abs() < 11.72,
            "Centroid should be ~440 Hz, got {:.2}",
            centroid
        );
        let flatness = metrics.flatness.unwrap();
        assert!(flatness < 0.1, "Sine flatness should be near 0, got {:.4}", flatness);
        let rolloff = metrics.rolloff_hz.unwrap();
        assert!((rolloff - 440.0).abs() < 25.0, "Roll-off should sit at the tone, got {:.1}", rolloff);
    }

    #[test]
    fn test_white_noise_is_flat() {
        let spectrogram = compute_transform(&white_noise(48000 * 3), 48000);
        let flatness = flatness(&spectrogram.view()).unwrap();
        assert!(flatness > 0.5, "White noise flatness should be > 0.5, got {:.3}", flatness);
    }

    #[test]
    fn test_full_band_centroid_and_bandwidth() {
        let spectrogram = compute_transform(&sine(1000.0, 48000, 48000), 48000);
        let (centroid, bandwidth) = centroid_and_bandwidth(&spectrogram.view());
        let centroid = centroid.unwrap();
        assert!((centroid - 1000.0).abs() < 30.0, "Centroid should be ~1000 Hz, got {:.1}", centroid);
        assert!(bandwidth.unwrap() < 1000.0, "Pure tone should be narrow, got {:.1}", bandwidth.unwrap());
    }

    #[test]
    fn test_silence_shape_is_null() {
        let spectrogram = compute_transform(&vec![0.0; 48000], 48000);
        let metrics = SpectralMetrics::compute(&spectrogram.view());
        assert_eq!(metrics.centroid_hz, None);
        assert_eq!(metrics.rolloff_hz, None);
        assert_eq!(metrics.flatness, None);
        assert_eq!(metrics.energy_db, Some(-120.0));
        assert_eq!(centroid_and_bandwidth(&spectrogram.view()), (None, None));
    }

    #[test]
    fn test_empty_view_is_null() {
        let spectrogram = compute_transform(&vec![0.1; 48000], 48000);
        let band = spectrogram.extract_bins(100..100);
        assert_eq!(SpectralMetrics::compute(&band.view()), SpectralMetrics::default());
    }

    #[test]
    fn test_energy_scales_with_amplitude() {
        let loud = compute_transform(&sine(1000.0, 48000, 48000), 48000);
        let quiet: Vec<f32> = sine(1000.0, 48000, 48000).iter().map(|x| x * 0.1).collect();
        let quiet = compute_transform(&quiet, 48000);
        let diff = energy_db(&loud.view()).unwrap() - energy_db(&quiet.view()).unwrap();
        assert!((diff - 20.0).abs() < 0.01, "Energy should drop 20 dB, got {:.3}", diff);
    }
}
