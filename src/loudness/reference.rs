//! Secondary integrated loudness via the `ebur128` crate
//!
//! An independent port of libebur128 used only to cross-check the in-crate
//! BS.1770 meter. Nothing here shares code with [`crate::loudness::bs1770`].

use ebur128::{EbuR128, Mode};

use crate::error::Result;
use crate::io::AudioBuffer;

/// Secondary meter output
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReferenceLoudness {
    /// Integrated loudness (LUFS), `None` for silence or too-short input
    pub integrated_lufs: Option<f64>,
}

/// Measure `buffer` with libebur128's algorithm
///
/// # Errors
///
/// Returns `AnalysisError::ProcessingError` if the meter rejects the channel
/// count or sample rate.
pub fn measure(buffer: &AudioBuffer) -> Result<ReferenceLoudness> {
    let channels = buffer.channel_count() as u32;
    let mut meter = EbuR128::new(channels, buffer.sample_rate(), Mode::I)?;

    if !buffer.is_empty() {
        let planar: Vec<&[f32]> = buffer.channels().iter().map(Vec::as_slice).collect();
        meter.add_frames_planar_f32(&planar)?;
    }

    // -inf for silence; input shorter than one block may also be an error
    let integrated_lufs = match meter.loudness_global() {
        Ok(lufs) if lufs.is_finite() => Some(lufs),
        Ok(_) => None,
        Err(err) => {
            log::debug!("ebur128 reported no integrated loudness: {:?}", err);
            None
        }
    };

    log::debug!("ebur128 reference: {:?} LUFS", integrated_lufs);

    Ok(ReferenceLoudness { integrated_lufs })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loudness::bs1770::integrated_loudness;

    fn stereo_sine(amplitude_dbfs: f64, freq: f64, seconds: f64) -> AudioBuffer {
        let amplitude = 10.0_f64.powf(amplitude_dbfs / 20.0);
        let samples: Vec<f32> = (0..(seconds * 48000.0) as usize)
            .map(|i| (amplitude * (2.0 * std::f64::consts::PI * freq * i as f64 / 48000.0).sin()) as f32)
            .collect();
        AudioBuffer::new(vec![samples.clone(), samples], 48000, 24).unwrap()
    }

    #[test]
    fn test_reference_tone() {
        let reference = measure(&stereo_sine(-23.0, 997.0, 10.0)).unwrap();
        let lufs = reference.integrated_lufs.unwrap();
        assert!((lufs + 23.0).abs() < 0.1, "Expected -23 LUFS, got {:.3}", lufs);
    }

    #[test]
    fn test_agrees_with_primary_meter() {
        for &(level, freq) in &[(-18.0, 100.0), (-30.0, 3000.0), (-12.0, 8000.0)] {
            let buffer = stereo_sine(level, freq, 5.0);
            let primary = integrated_loudness(&buffer).unwrap();
            let secondary = measure(&buffer).unwrap().integrated_lufs.unwrap();
            assert!(
                (primary - secondary).abs() < 0.1,
                "{} Hz at {} dBFS: primary {:.3} vs ebur128 {:.3}",
                freq,
                level,
                primary,
                secondary
            );
        }
    }

    #[test]
    fn test_silence_is_null() {
        let buffer = AudioBuffer::new(vec![vec![0.0; 48000]], 48000, 16).unwrap();
        let reference = measure(&buffer).unwrap();
        assert_eq!(reference.integrated_lufs, None);
    }
}
