//! Harmonic content metrics
//!
//! THD and harmonic ratio are energy ratios over the band's harmonic/percussive
//! separation ([`crate::features::hpss`]):
//!
//! - THD (%) = `100 · sqrt(E_residual / E_total)`, where the residual is
//!   everything outside the harmonic component
//! - Harmonic ratio = `E_harmonic / (E_harmonic + E_residual)`
//!
//! Inharmonicity is measured in the time domain on up to six evenly spaced
//! one-second windows of the band signal:
//! 1. Estimate the fundamental from the first autocorrelation lobe above the
//!    voicing threshold (after the first zero crossing), refined by parabolic
//!    interpolation
//! 2. Take a Hann-windowed 4096-point spectrum and keep bins above 10% of its
//!    maximum
//! 3. Score each kept bin at or above half the fundamental by its relative
//!    distance to the nearest integer multiple of the fundamental
//! 4. Average per window, then over windows, clamped to [0, 1]
//!
//! Windows without a clear pitch are skipped; if none has one, the metric is
//! null.

use rustfft::num_complex::Complex;
use rustfft::FftPlanner;
use serde::{Deserialize, Serialize};

use crate::features::hpss::HpssEnergies;
use crate::features::stft::hann_window;
use crate::metrics::level::rms;

/// Numerical stability epsilon
const EPSILON: f64 = 1e-10;

/// Band RMS below which harmonic metrics are not computed
const ENERGY_FLOOR: f64 = 1e-6;

/// Inharmonicity analysis window (samples)
const WINDOW_SAMPLES: usize = 48000;

/// Maximum number of inharmonicity windows per band
const MAX_WINDOWS: usize = 6;

/// Shortest window worth analysing
const MIN_WINDOW_SAMPLES: usize = 2048;

/// Peak-picking FFT length
const PEAK_FFT_SIZE: usize = 4096;

/// Spectral bins above this fraction of the maximum count as peaks
const PEAK_THRESHOLD: f64 = 0.1;

/// Normalized autocorrelation a pitch lobe must exceed
const VOICING_THRESHOLD: f64 = 0.5;

/// Pitch search limits (Hz)
const MIN_F0_HZ: f64 = 20.0;
const MAX_F0_HZ: f64 = 8000.0;

/// Harmonic family output for one band
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HarmonicMetrics {
    /// Total harmonic distortion (%)
    pub thd_percent: Option<f64>,
    /// Harmonic share of harmonic plus residual energy [0, 1]
    pub harmonic_ratio: Option<f64>,
    /// Mean partial deviation from the harmonic series [0, 1]
    pub inharmonicity: Option<f64>,
}

impl HarmonicMetrics {
    /// Compute the harmonic family
    ///
    /// # Arguments
    ///
    /// * `samples` - Band-limited mono signal
    /// * `sample_rate` - Sample rate in Hz
    /// * `hpss` - Separation energies of the same band
    pub fn compute(samples: &[f32], sample_rate: u32, hpss: &HpssEnergies) -> Self {
        if samples.is_empty() || rms(samples) < ENERGY_FLOOR {
            return Self::default();
        }
        Self {
            thd_percent: thd_percent(hpss),
            harmonic_ratio: harmonic_ratio(hpss),
            inharmonicity: inharmonicity(samples, sample_rate),
        }
    }
}

/// `100 · sqrt(E_residual / E_total)`
pub fn thd_percent(hpss: &HpssEnergies) -> Option<f64> {
    if hpss.total < EPSILON {
        return None;
    }
    let thd = 100.0 * (hpss.residual / hpss.total).sqrt();
    thd.is_finite().then_some(thd)
}

/// `E_harmonic / (E_harmonic + E_residual)`
///
/// The residual (signal minus harmonic component) stands in for the percussive
/// term. With a soft-mask margin above 1 the two masks no longer sum to one,
/// and energy claimed by neither component would otherwise vanish from the
/// denominator, so noise would read as mostly harmonic.
pub fn harmonic_ratio(hpss: &HpssEnergies) -> Option<f64> {
    let denom = hpss.harmonic + hpss.residual;
    if denom < EPSILON {
        return None;
    }
    Some((hpss.harmonic / denom).clamp(0.0, 1.0))
}

/// Mean deviation of spectral peaks from integer multiples of the fundamental
pub fn inharmonicity(samples: &[f32], sample_rate: u32) -> Option<f64> {
    let possible = (samples.len() / WINDOW_SAMPLES).max(1);
    let count = possible.min(MAX_WINDOWS);
    let starts: Vec<usize> = if possible <= count {
        (0..possible).map(|i| i * WINDOW_SAMPLES).collect()
    } else {
        let step = (samples.len() - WINDOW_SAMPLES) as f64 / (count - 1).max(1) as f64;
        (0..count).map(|i| (i as f64 * step).round() as usize).collect()
    };

    let mut planner = FftPlanner::<f64>::new();
    let scores: Vec<f64> = starts
        .iter()
        .filter_map(|&start| {
            let end = (start + WINDOW_SAMPLES).min(samples.len());
            let chunk = &samples[start..end];
            if chunk.len() < MIN_WINDOW_SAMPLES {
                return None;
            }
            window_score(chunk, sample_rate, &mut planner)
        })
        .collect();

    log::debug!(
        "Inharmonicity: {} of {} windows pitched",
        scores.len(),
        starts.len()
    );

    if scores.is_empty() {
        return None;
    }
    let mean = scores.iter().sum::<f64>() / scores.len() as f64;
    mean.is_finite().then(|| mean.min(1.0))
}

fn window_score(chunk: &[f32], sample_rate: u32, planner: &mut FftPlanner<f64>) -> Option<f64> {
    let f0 = estimate_f0(chunk, sample_rate, planner)?;

    let n_fft = PEAK_FFT_SIZE.min(chunk.len());
    let window = hann_window(n_fft);
    let mut buffer: Vec<Complex<f64>> = chunk[..n_fft]
        .iter()
        .zip(window.iter())
        .map(|(&x, &w)| Complex::new(x as f64 * w as f64, 0.0))
        .collect();
    planner.plan_fft_forward(n_fft).process(&mut buffer);

    let spectrum: Vec<f64> = buffer[..n_fft / 2 + 1].iter().map(|c| c.norm()).collect();
    let max = spectrum.iter().copied().fold(0.0, f64::max);
    if max < EPSILON {
        return None;
    }
    let threshold = max * PEAK_THRESHOLD;
    let bin_hz = sample_rate as f64 / n_fft as f64;

    let deviations: Vec<f64> = spectrum
        .iter()
        .enumerate()
        .filter(|(_, &m)| m > threshold)
        .map(|(k, _)| k as f64 * bin_hz)
        .filter(|&pf| pf >= 0.5 * f0)
        .filter_map(|pf| {
            let nearest = (pf / f0).round() * f0;
            (nearest >= EPSILON).then(|| (pf - nearest).abs() / nearest)
        })
        .collect();

    if deviations.is_empty() {
        return None;
    }
    let score = deviations.iter().sum::<f64>() / deviations.len() as f64;
    score.is_finite().then(|| score.min(1.0))
}

/// Fundamental frequency from the autocorrelation, `None` when unvoiced
pub fn estimate_f0(chunk: &[f32], sample_rate: u32, planner: &mut FftPlanner<f64>) -> Option<f64> {
    let n = chunk.len();
    let sr = sample_rate as f64;
    let min_lag = (sr / MAX_F0_HZ.min(sr / 2.0)).ceil() as usize;
    let max_lag = ((sr / MIN_F0_HZ).floor() as usize).min(n / 2);
    if min_lag + 2 >= max_lag {
        return None;
    }

    let r = autocorrelation(chunk, planner);
    let r0 = r[0];
    if r0 < EPSILON {
        return None;
    }

    // Skip the zero-lag lobe
    let first_negative = (1..max_lag).find(|&tau| r[tau] < 0.0)?;
    let search_start = first_negative.max(min_lag);

    // First lobe above the voicing threshold, and its maximum
    let threshold = VOICING_THRESHOLD * r0;
    let lobe_start = (search_start..max_lag).find(|&tau| r[tau] > threshold)?;
    let lobe_end = (lobe_start..max_lag).find(|&tau| r[tau] <= threshold).unwrap_or(max_lag);
    let best = (lobe_start..lobe_end).max_by(|&a, &b| r[a].total_cmp(&r[b]))?;

    let refined = if best > 0 && best + 1 < r.len() {
        let (a, b, c) = (r[best - 1], r[best], r[best + 1]);
        let denom = a - 2.0 * b + c;
        if denom.abs() > EPSILON {
            best as f64 + 0.5 * (a - c) / denom
        } else {
            best as f64
        }
    } else {
        best as f64
    };

    let f0 = sr / refined;
    log::debug!("Pitch estimate: lag {:.2} -> {:.2} Hz", refined, f0);
    (f0.is_finite() && f0 > 0.0).then_some(f0)
}

/// Biased autocorrelation of the mean-removed signal via FFT
fn autocorrelation(chunk: &[f32], planner: &mut FftPlanner<f64>) -> Vec<f64> {
    let n = chunk.len();
    let size = (2 * n).next_power_of_two();
    let mean = chunk.iter().map(|&x| x as f64).sum::<f64>() / n as f64;

    let mut buffer = vec![Complex::new(0.0f64, 0.0); size];
    for (slot, &x) in buffer.iter_mut().zip(chunk.iter()) {
        *slot = Complex::new(x as f64 - mean, 0.0);
    }
    planner.plan_fft_forward(size).process(&mut buffer);
    for value in buffer.iter_mut() {
        *value = Complex::new(value.norm_sqr(), 0.0);
    }
    planner.plan_fft_inverse(size).process(&mut buffer);

    let scale = 1.0 / size as f64;
    buffer[..n].iter().map(|c| c.re * scale).collect()
}
