//! Oversampled true peak (ITU-R BS.1770-4 Annex 2)
//!
//! Each channel is upsampled by an integer factor (at least 4) with a
//! polyphase windowed-sinc interpolator and the largest absolute value over
//! original and interpolated samples is reported. Interpolated points catch
//! inter-sample overs that the sample peak misses.

use crate::io::AudioBuffer;
use crate::preprocessing::edge_cases::amplitude_to_dbfs;

/// Minimum oversampling factor
pub const MIN_OVERSAMPLING: usize = 4;

/// Interpolator half-length in input samples (taps per phase = 2 × this)
const HALF_TAPS: usize = 12;

/// Polyphase interpolation filter bank
///
/// Phase `p` (1..factor) evaluates the signal at `n + p / factor`.
#[derive(Debug, Clone)]
pub struct Interpolator {
    factor: usize,
    phases: Vec<[f64; 2 * HALF_TAPS]>,
}

impl Interpolator {
    /// Build the filter bank; factors below 4 are raised to 4
    pub fn new(factor: usize) -> Self {
        let factor = factor.max(MIN_OVERSAMPLING);
        let h = HALF_TAPS as f64;
        let phases = (1..factor)
            .map(|p| {
                let t = p as f64 / factor as f64;
                let mut taps = [0.0f64; 2 * HALF_TAPS];
                // taps[j] multiplies x[n + j + 1 - HALF_TAPS]
                for (j, tap) in taps.iter_mut().enumerate() {
                    let u = (j as f64 + 1.0 - h) - t;
                    let window = 0.5 + 0.5 * (std::f64::consts::PI * u / h).cos();
                    *tap = sinc(u) * window;
                }
                let sum: f64 = taps.iter().sum();
                if sum.abs() > f64::EPSILON {
                    taps.iter_mut().for_each(|tap| *tap /= sum);
                }
                taps
            })
            .collect();
        Self { factor, phases }
    }

    /// Oversampling factor in use
    pub fn factor(&self) -> usize {
        self.factor
    }

    /// Largest absolute value over original and interpolated samples
    pub fn peak(&self, samples: &[f32]) -> f64 {
        let n = samples.len();
        let mut peak = samples.iter().fold(0.0f64, |acc, &x| acc.max((x as f64).abs()));
        for i in 0..n {
            let first = i as isize + 1 - HALF_TAPS as isize;
            for taps in &self.phases {
                let mut acc = 0.0f64;
                for (j, &tap) in taps.iter().enumerate() {
                    let idx = first + j as isize;
                    if idx >= 0 && (idx as usize) < n {
                        acc += tap * samples[idx as usize] as f64;
                    }
                }
                peak = peak.max(acc.abs());
            }
        }
        peak
    }
}

fn sinc(x: f64) -> f64 {
    if x.abs() < 1e-12 {
        1.0
    } else {
        let px = std::f64::consts::PI * x;
        px.sin() / px
    }
}

/// Largest absolute sample over all channels (no interpolation)
pub fn sample_peak(buffer: &AudioBuffer) -> f64 {
    buffer
        .channels()
        .iter()
        .flat_map(|c| c.iter())
        .fold(0.0f64, |acc, &x| acc.max((x as f64).abs()))
}

/// True peak over all channels in dBFS, floored at -120 dB for silence
pub fn true_peak_dbfs(buffer: &AudioBuffer, factor: usize) -> f64 {
    let interpolator = Interpolator::new(factor);
    let peak = buffer
        .channels()
        .iter()
        .map(|c| interpolator.peak(c))
        .fold(0.0f64, f64::max);
    log::debug!(
        "True peak: {:.6} linear at {}x oversampling",
        peak,
        interpolator.factor()
    );
    amplitude_to_dbfs(peak)
}
