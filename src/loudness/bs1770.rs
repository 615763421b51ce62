//! Gated integrated loudness (ITU-R BS.1770-4)
//!
//! Algorithm:
//! 1. K-weight every channel and sum the squared output with channel weights
//!    (1.0 for left, right and mono)
//! 2. Mean power over 400 ms blocks with 75% overlap (100 ms step)
//! 3. Absolute gate: drop blocks at or below -70 LUFS
//! 4. Relative gate: drop blocks at or below (loudness of the remaining mean - 10 LU)
//! 5. `L = -0.691 + 10·log10(mean power of surviving blocks)`

use crate::io::AudioBuffer;
use crate::loudness::k_weighting::weighted_power;

/// Gating block length (seconds)
pub const BLOCK_SECONDS: f64 = 0.4;

/// Gating block step (seconds)
pub const BLOCK_STEP_SECONDS: f64 = 0.1;

/// Absolute gate (LUFS)
pub const ABSOLUTE_GATE_LUFS: f64 = -70.0;

/// Relative gate below the absolute-gated loudness (LU)
pub const RELATIVE_GATE_LU: f64 = -10.0;

/// Offset that makes a 997 Hz sine read its RMS level after K-weighting
const LOUDNESS_OFFSET: f64 = -0.691;

/// Loudness of a channel-summed mean-square power; `-inf` for zero power
pub fn power_to_lufs(power: f64) -> f64 {
    LOUDNESS_OFFSET + 10.0 * power.log10()
}

/// Inverse of [`power_to_lufs`]
pub fn lufs_to_power(lufs: f64) -> f64 {
    10.0_f64.powf((lufs - LOUDNESS_OFFSET) / 10.0)
}

/// Running sum of channel-weighted K-filtered power
///
/// Window powers for gating blocks (400 ms) and short-term windows (3 s) are
/// differences of this prefix sum, so each costs O(1) regardless of length.
#[derive(Debug, Clone)]
pub struct PowerIntegrator {
    prefix: Vec<f64>,
    sample_rate: u32,
}

impl PowerIntegrator {
    /// K-weight `buffer` and accumulate its channel-summed power
    pub fn new(buffer: &AudioBuffer) -> Self {
        let sample_rate = buffer.sample_rate();
        let mut summed = vec![0.0f64; buffer.len()];
        for channel in buffer.channels() {
            for (acc, p) in summed.iter_mut().zip(weighted_power(channel, sample_rate)) {
                *acc += p;
            }
        }

        let mut prefix = Vec::with_capacity(summed.len() + 1);
        let mut running = 0.0f64;
        prefix.push(running);
        for p in summed {
            running += p;
            prefix.push(running);
        }

        Self { prefix, sample_rate }
    }

    /// Samples per channel
    pub fn len(&self) -> usize {
        self.prefix.len() - 1
    }

    /// True when no samples were integrated
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Mean power of each full window of `window_seconds`, stepped by `step_seconds`
    ///
    /// Empty when the signal is shorter than one window.
    pub fn window_powers(&self, window_seconds: f64, step_seconds: f64) -> Vec<f64> {
        let window = (window_seconds * self.sample_rate as f64).round() as usize;
        let step = ((step_seconds * self.sample_rate as f64).round() as usize).max(1);
        if window == 0 || self.len() < window {
            return Vec::new();
        }
        let count = (self.len() - window) / step + 1;
        (0..count)
            .map(|i| {
                let start = i * step;
                ((self.prefix[start + window] - self.prefix[start]) / window as f64).max(0.0)
            })
            .collect()
    }

    /// Mean power of the 400 ms gating blocks
    pub fn gating_blocks(&self) -> Vec<f64> {
        self.window_powers(BLOCK_SECONDS, BLOCK_STEP_SECONDS)
    }
}

/// Two-stage gated loudness over block powers
///
/// Returns `None` when every block falls below the absolute gate.
pub fn gated_loudness(block_powers: &[f64]) -> Option<f64> {
    let absolute_power = lufs_to_power(ABSOLUTE_GATE_LUFS);
    let above_absolute: Vec<f64> = block_powers.iter().copied().filter(|&p| p > absolute_power).collect();
    if above_absolute.is_empty() {
        return None;
    }

    let ungated_mean = above_absolute.iter().sum::<f64>() / above_absolute.len() as f64;
    let relative_power = lufs_to_power(power_to_lufs(ungated_mean) + RELATIVE_GATE_LU);
    let gate = relative_power.max(absolute_power);

    let (sum, count) = above_absolute
        .iter()
        .filter(|&&p| p > gate)
        .fold((0.0, 0usize), |(sum, count), &p| (sum + p, count + 1));
    if count == 0 {
        return None;
    }

    let lufs = power_to_lufs(sum / count as f64);
    lufs.is_finite().then_some(lufs)
}

/// Integrated loudness of `buffer` in LUFS
///
/// `None` for audio shorter than one gating block or entirely below the
/// absolute gate.
pub fn integrated_loudness(buffer: &AudioBuffer) -> Option<f64> {
    integrated_from(&PowerIntegrator::new(buffer))
}

/// Integrated loudness from an existing integrator
pub fn integrated_from(integrator: &PowerIntegrator) -> Option<f64> {
    let blocks = integrator.gating_blocks();
    log::debug!("BS.1770 gating: {} blocks of {} s", blocks.len(), BLOCK_SECONDS);
    gated_loudness(&blocks)
}
