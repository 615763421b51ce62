//! Energy flux onset detection
//!
//! Finds note and hit starts as peaks in the positive frame-to-frame change
//! of RMS energy.
//!
//! Algorithm:
//! 1. Divide audio into overlapping frames (frame_size, hop_size)
//! 2. Compute RMS energy per frame
//! 3. Compute energy flux: `E_flux[n] = max(0, E[n] - E[n-1])`
//! 4. Keep local maxima above `max_flux · 10^(threshold_db / 20)`, ignoring
//!    flux below 5% of the loudest frame (steady-state ripple)
//! 5. Report each onset at the first sample that entered the window, and
//!    merge detections closer than half a hop
//!
//! # Example
//!
//! ```no_run
//! use mastering_dsp::features::onset::energy_flux::detect_energy_flux_onsets;
//!
//! let samples = vec![0.0f32; 48000 * 30];
//! let onsets = detect_energy_flux_onsets(&samples, 2048, 512, -20.0)?;
//! println!("Found {} onsets", onsets.len());
//! # Ok::<(), mastering_dsp::AnalysisError>(())
//! ```

use crate::error::AnalysisError;

/// Numerical stability epsilon
const EPSILON: f32 = 1e-10;

/// Flux below this fraction of the loudest frame RMS is not an onset
const MIN_RELATIVE_FLUX: f32 = 0.05;

/// Detect onsets using energy flux
///
/// # Reference
///
/// Bello, J. P., Daudet, L., Abdallah, S., Duxbury, C., Davies, M., & Sandler, M. B. (2005).
/// A Tutorial on Onset Detection in Music Signals.
/// *IEEE Transactions on Speech and Audio Processing*, 13(5), 1035-1047.
///
/// # Arguments
///
/// * `samples` - Mono samples in [-1.0, 1.0] (a full mix or one band)
/// * `frame_size` - RMS frame length (typically 2048)
/// * `hop_size` - Hop between frames (typically 512)
/// * `threshold_db` - Threshold relative to the strongest flux peak (typically -20 dB)
///
/// # Returns
///
/// Onset positions in samples, ascending
///
/// # Errors
///
/// `InvalidInput` when `frame_size` or `hop_size` is zero
pub fn detect_energy_flux_onsets(
    samples: &[f32],
    frame_size: usize,
    hop_size: usize,
    threshold_db: f32,
) -> Result<Vec<usize>, AnalysisError> {
    if frame_size == 0 {
        return Err(AnalysisError::InvalidInput("Frame size must be > 0".to_string()));
    }
    if hop_size == 0 {
        return Err(AnalysisError::InvalidInput("Hop size must be > 0".to_string()));
    }
    if samples.len() < frame_size {
        log::debug!(
            "Signal ({} samples) shorter than one onset frame ({}), no onsets",
            samples.len(),
            frame_size
        );
        return Ok(Vec::new());
    }

    let energies = frame_rms(samples, frame_size, hop_size);
    if energies.len() < 2 {
        return Ok(Vec::new());
    }

    let flux: Vec<f32> = energies.windows(2).map(|w| (w[1] - w[0]).max(0.0)).collect();
    let max_flux = flux.iter().copied().fold(0.0f32, f32::max);
    let max_energy = energies.iter().copied().fold(0.0f32, f32::max);
    let flux_floor = max_energy * MIN_RELATIVE_FLUX;
    if max_flux <= EPSILON || max_flux <= flux_floor {
        log::debug!("Energy flux is flat, no onsets detected");
        return Ok(Vec::new());
    }

    let threshold = (max_flux * 10.0_f32.powf(threshold_db / 20.0)).max(flux_floor);
    log::debug!(
        "Energy flux: {} frames, max={:.6}, threshold={:.6} ({:.1} dB)",
        energies.len(),
        max_flux,
        threshold,
        threshold_db
    );

    // flux[i] compares frames i and i+1; the new energy entered at the end of frame i
    let mut onsets: Vec<usize> = (0..flux.len())
        .filter(|&i| is_peak(&flux, i, threshold))
        .map(|i| i * hop_size + frame_size)
        .filter(|&position| position < samples.len())
        .collect();

    let min_gap = (hop_size / 2).max(1);
    let mut last_kept: Option<usize> = None;
    onsets.retain(|&position| match last_kept {
        Some(previous) if position < previous + min_gap => false,
        _ => {
            last_kept = Some(position);
            true
        }
    });

    log::debug!("Energy flux detected {} onsets", onsets.len());
    Ok(onsets)
}

/// RMS of each full frame
pub fn frame_rms(samples: &[f32], frame_size: usize, hop_size: usize) -> Vec<f32> {
    if frame_size == 0 || hop_size == 0 || samples.len() < frame_size {
        return Vec::new();
    }
    let num_frames = (samples.len() - frame_size) / hop_size + 1;
    (0..num_frames)
        .map(|i| {
            let frame = &samples[i * hop_size..i * hop_size + frame_size];
            let sum_sq: f32 = frame.iter().map(|&x| x * x).sum();
            (sum_sq / frame_size as f32).sqrt()
        })
        .collect()
}

/// Local maximum above threshold; plateaus report their first frame
fn is_peak(flux: &[f32], i: usize, threshold: f32) -> bool {
    let value = flux[i];
    if value <= threshold {
        return false;
    }
    let rises = i == 0 || value > flux[i - 1];
    let holds = i + 1 == flux.len() || value >= flux[i + 1];
    rises && holds
}
