//! Channel mixing utilities (stereo to mono conversion)

use crate::error::AnalysisError;

/// Convert stereo to mono with a simple average: (L + R) / 2
///
/// # Arguments
///
/// * `left` - Left channel samples
/// * `right` - Right channel samples
///
/// # Returns
///
/// Mono samples
///
/// # Errors
///
/// Returns `AnalysisError::InvalidInput` if the channels differ in length
pub fn downmix_to_mono(left: &[f32], right: &[f32]) -> Result<Vec<f32>, AnalysisError> {
    if left.len() != right.len() {
        return Err(AnalysisError::InvalidInput(format!(
            "Channel length mismatch: left={}, right={}",
            left.len(),
            right.len()
        )));
    }

    log::debug!("Downmixing {} stereo frames to mono", left.len());

    Ok(left
        .iter()
        .zip(right.iter())
        .map(|(&l, &r)| 0.5 * (l + r))
        .collect())
}

/// Split interleaved frames into per-channel vectors
pub fn deinterleave(interleaved: &[f32], channels: usize) -> Vec<Vec<f32>> {
    if channels == 0 {
        return Vec::new();
    }
    let frames = interleaved.len() / channels;
    let mut out = vec![Vec::with_capacity(frames); channels];
    for frame in interleaved.chunks_exact(channels) {
        for (ch, &sample) in frame.iter().enumerate() {
            out[ch].push(sample);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_downmix_average() {
        let mono = downmix_to_mono(&[1.0, -1.0, 0.5], &[1.0, 1.0, 0.0]).unwrap();
        assert_eq!(mono, vec![1.0, 0.0, 0.25]);
    }

    #[test]
    fn test_downmix_length_mismatch() {
        assert!(downmix_to_mono(&[0.0; 4], &[0.0; 3]).is_err());
    }

    #[test]
    fn test_deinterleave_drops_partial_frame() {
        let channels = deinterleave(&[1.0, 2.0, 3.0, 4.0, 5.0], 2);
        assert_eq!(channels, vec![vec![1.0, 3.0], vec![2.0, 4.0]]);
    }
}
