//! Five-band frequency decomposition
//!
//! Bins are assigned to bands by center frequency over half-open intervals
//! `[freq_min, freq_max)`; a bin lying exactly on an edge starts the upper
//! band. The top band is closed at `min(20 kHz, Nyquist)`. Bins below 20 Hz
//! belong to no band.
//!
//! Each band keeps a copy of its bins from the mono transform and a
//! band-limited time-domain reconstruction (mono, and left/right for stereo).
//! Bands whose lower edge lies above Nyquist have no bins; their
//! reconstruction is all zeros and every metric on them is null.
//!
//! | Band | Range (Hz) |
//! |------|------------|
//! | low | 20-200 |
//! | low_mid | 200-500 |
//! | mid | 500-2000 |
//! | high_mid | 2000-6000 |
//! | high | 6000-20000 |

use std::fmt;
use std::ops::Range;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::features::stft::{
    inverse_transform, BandSpectrum, SpectralView, TransformSet, FFT_SIZE, NUM_BINS,
};

/// Band identifier, ordered low to high
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BandId {
    /// 20-200 Hz
    Low,
    /// 200-500 Hz
    LowMid,
    /// 500-2000 Hz
    Mid,
    /// 2000-6000 Hz
    HighMid,
    /// 6000-20000 Hz
    High,
}

impl BandId {
    /// All bands in processing order
    pub const ALL: [BandId; 5] = [
        BandId::Low,
        BandId::LowMid,
        BandId::Mid,
        BandId::HighMid,
        BandId::High,
    ];

    /// Position in [`BandId::ALL`]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Stable identifier used in results and progress callbacks
    pub fn name(self) -> &'static str {
        BAND_TABLE[self.index()].name
    }

    /// Frequency limits of this band
    pub fn definition(self) -> &'static BandDefinition {
        &BAND_TABLE[self.index()]
    }

    /// Look a band up by its identifier
    pub fn from_name(name: &str) -> Option<Self> {
        BAND_TABLE.iter().find(|d| d.name == name).map(|d| d.id)
    }
}

impl fmt::Display for BandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

/// Fixed band limits
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandDefinition {
    /// Band identifier
    pub id: BandId,
    /// Identifier string
    pub name: &'static str,
    /// Lower edge in Hz (inclusive)
    pub freq_min: f64,
    /// Upper edge in Hz (exclusive, except for the top band)
    pub freq_max: f64,
}

/// The shared band table
pub const BAND_TABLE: [BandDefinition; 5] = [
    BandDefinition { id: BandId::Low, name: "low", freq_min: 20.0, freq_max: 200.0 },
    BandDefinition { id: BandId::LowMid, name: "low_mid", freq_min: 200.0, freq_max: 500.0 },
    BandDefinition { id: BandId::Mid, name: "mid", freq_min: 500.0, freq_max: 2000.0 },
    BandDefinition { id: BandId::HighMid, name: "high_mid", freq_min: 2000.0, freq_max: 6000.0 },
    BandDefinition { id: BandId::High, name: "high", freq_min: 6000.0, freq_max: 20000.0 },
];

/// Transform bins belonging to `band` at `sample_rate`
///
/// Returns an empty range when the band lies above Nyquist.
pub fn band_bins(band: &BandDefinition, sample_rate: u32) -> Range<usize> {
    let bins_per_hz = FFT_SIZE as f64 / sample_rate as f64;
    let nyquist = sample_rate as f64 / 2.0;

    let start = (band.freq_min * bins_per_hz).ceil() as usize;
    let end = if band.id == BandId::High {
        let upper = band.freq_max.min(nyquist);
        if upper < band.freq_min {
            return start.min(NUM_BINS)..start.min(NUM_BINS);
        }
        (upper * bins_per_hz).floor() as usize + 1
    } else {
        (band.freq_max * bins_per_hz).ceil() as usize
    };

    let start = start.min(NUM_BINS);
    let end = end.min(NUM_BINS);
    if start >= end {
        start..start
    } else {
        start..end
    }
}

/// Band-limited time-domain signals
#[derive(Debug, Clone, Default)]
pub struct BandSignals {
    /// Mono reconstruction
    pub mono: Vec<f32>,
    /// `(left, right)` reconstructions for stereo input
    pub stereo: Option<(Vec<f32>, Vec<f32>)>,
}

/// One band of one analysis run
#[derive(Debug, Clone)]
pub struct BandSlice {
    /// Band limits
    pub definition: BandDefinition,
    /// Transform bins assigned to the band
    pub bins: Range<usize>,
    /// The band's bins from the mono transform, every frame
    pub spectrum: BandSpectrum,
    /// Reconstructed band-limited signals
    pub signals: BandSignals,
    /// Sample rate of the source audio
    pub sample_rate: u32,
}

impl BandSlice {
    /// Band identifier
    pub fn id(&self) -> BandId {
        self.definition.id
    }

    /// True when the band has no transform bins or the input produced no frames
    ///
    /// Input shorter than one window has no spectra, so nothing about the
    /// band can be measured even though the audio may not be silent.
    pub fn is_empty(&self) -> bool {
        self.bins.is_empty() || self.spectrum.view().num_frames() == 0
    }

    /// Spectral view for metric code
    pub fn view(&self) -> SpectralView<'_> {
        self.spectrum.view()
    }

    /// `(left, right)` band signals for stereo input
    pub fn stereo_pair(&self) -> Option<(&[f32], &[f32])> {
        self.signals
            .stereo
            .as_ref()
            .map(|(l, r)| (l.as_slice(), r.as_slice()))
    }
}

/// Split a run's transforms into the five bands
///
/// Reconstruction of the five bands runs on the rayon pool; the result is
/// identical to a sequential run and always ordered low to high.
pub fn decompose(transforms: &TransformSet) -> [BandSlice; 5] {
    let sample_rate = transforms.mono.sample_rate();
    let len = transforms.mono.signal_len();

    log::debug!(
        "Decomposing {} frames into {} bands at {} Hz",
        transforms.mono.num_frames(),
        BAND_TABLE.len(),
        sample_rate
    );

    let mut signals: Vec<BandSignals> = BAND_TABLE
        .par_iter()
        .map(|band| reconstruct_band(transforms, band_bins(band, sample_rate), len))
        .collect();

    std::array::from_fn(|i| {
        let definition = BAND_TABLE[i];
        let bins = band_bins(&definition, sample_rate);
        let spectrum = if bins.is_empty() {
            BandSpectrum::empty(
                transforms.mono.num_frames(),
                sample_rate as f64 / FFT_SIZE as f64,
            )
        } else {
            transforms.mono.extract_bins(bins.clone())
        };
        if bins.is_empty() {
            log::debug!("Band '{}' has no bins at {} Hz", definition.name, sample_rate);
        }
        BandSlice {
            definition,
            bins,
            spectrum,
            signals: std::mem::take(&mut signals[i]),
            sample_rate,
        }
    })
}

fn reconstruct_band(transforms: &TransformSet, bins: Range<usize>, len: usize) -> BandSignals {
    if bins.is_empty() {
        return BandSignals {
            mono: vec![0.0; len],
            stereo: transforms
                .stereo
                .as_ref()
                .map(|_| (vec![0.0; len], vec![0.0; len])),
        };
    }

    match &transforms.stereo {
        None => BandSignals {
            mono: inverse_transform(&transforms.mono, bins),
            stereo: None,
        },
        Some((left_spec, right_spec)) => {
            let left = inverse_transform(left_spec, bins.clone());
            let right = inverse_transform(right_spec, bins);
            // The transform is linear, so the mono band is the channel average
            let mono = left
                .iter()
                .zip(right.iter())
                .map(|(&l, &r)| 0.5 * (l + r))
                .collect();
            BandSignals {
                mono,
                stereo: Some((left, right)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::stft::compute_transforms;
    use crate::io::audio_buffer::AudioBuffer;

    fn sine(freq: f32, sample_rate: u32, len: usize, amplitude: f32) -> Vec<f32> {
        (0..len)
            .map(|i| {
                amplitude * (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate as f32).sin()
            })
            .collect()
    }

    #[test]
    fn test_band_names_round_trip() {
        for id in BandId::ALL {
            assert_eq!(BandId::from_name(id.name()), Some(id));
        }
        assert_eq!(BandId::HighMid.to_string(), "high_mid");
        assert_eq!(BandId::from_name("sub"), None);
    }

    #[test]
    fn test_bins_partition_without_overlap() {
        for &sample_rate in &[44100u32, 48000] {
            let ranges: Vec<Range<usize>> =
                BAND_TABLE.iter().map(|b| band_bins(b, sample_rate)).collect();
            for pair in ranges.windows(2) {
                assert_eq!(
                    pair[0].end, pair[1].start,
                    "Adjacent bands must share an edge at {} Hz",
                    sample_rate
                );
            }
            // Every assigned bin's center frequency is inside its band
            for (band, range) in BAND_TABLE.iter().zip(ranges.iter()) {
                for k in range.clone() {
                    let f = k as f64 * sample_rate as f64 / FFT_SIZE as f64;
                    assert!(f >= band.freq_min, "bin {} below {}", k, band.name);
                    assert!(f <= band.freq_max, "bin {} above {}", k, band.name);
                }
            }
        }
    }

    #[test]
    fn test_edge_bin_goes_to_upper_band() {
        // 6000 Hz is exactly bin 512 at 48 kHz
        assert_eq!(band_bins(&BAND_TABLE[3], 48000).end, 512);
        assert_eq!(band_bins(&BAND_TABLE[4], 48000).start, 512);
        // 20 kHz is not a bin center at 48 kHz, so the last bin is 1706
        assert_eq!(band_bins(&BAND_TABLE[4], 48000).end, 1707);
    }

    #[test]
    fn test_band_above_nyquist_is_empty() {
        assert!(band_bins(&BAND_TABLE[4], 8000).is_empty());
        let high_mid = band_bins(&BAND_TABLE[3], 8000);
        assert!(!high_mid.is_empty());
        assert_eq!(high_mid.end, NUM_BINS);
    }

    #[test]
    fn test_decompose_isolates_tones() {
        let sample_rate = 48000;
        let low = sine(100.0, sample_rate, 48000, 0.4);
        let mid = sine(1000.0, sample_rate, 48000, 0.4);
        let mixed: Vec<f32> = low.iter().zip(mid.iter()).map(|(a, b)| a + b).collect();
        let buffer = AudioBuffer::new(vec![mixed], sample_rate, 16).unwrap();

        let slices = decompose(&compute_transforms(&buffer));
        let rms = |x: &[f32]| {
            (x[8192..40000].iter().map(|&v| (v as f64).powi(2)).sum::<f64>() / 31808.0).sqrt()
        };

        let expected = 0.4 / 2f64.sqrt();
        assert!((rms(&slices[0].signals.mono) - expected).abs() < 0.01);
        assert!((rms(&slices[2].signals.mono) - expected).abs() < 0.01);
        assert!(rms(&slices[1].signals.mono) < 0.01);
        assert!(rms(&slices[4].signals.mono) < 1e-3);
        assert!(slices.iter().all(|s| s.signals.stereo.is_none()));
    }

    #[test]
    fn test_decompose_stereo_channels() {
        let sample_rate = 44100;
        let left = sine(440.0, sample_rate, 30000, 0.5);
        let right = sine(880.0, sample_rate, 30000, 0.5);
        let buffer = AudioBuffer::new(vec![left, right], sample_rate, 16).unwrap();

        let slices = decompose(&compute_transforms(&buffer));
        let low_mid = &slices[BandId::LowMid.index()];
        let (l, r) = low_mid.stereo_pair().unwrap();
        let energy = |x: &[f32]| x.iter().map(|&v| (v as f64).powi(2)).sum::<f64>();
        assert!(energy(l) > 100.0 * energy(r));
        for i in 0..l.len() {
            assert!((low_mid.signals.mono[i] - 0.5 * (l[i] + r[i])).abs() < 1e-6);
        }
    }

    #[test]
    fn test_decompose_deterministic() {
        let samples: Vec<f32> = (0..20000).map(|i| ((i * 7919) % 1000) as f32 / 1000.0 - 0.5).collect();
        let buffer = AudioBuffer::new(vec![samples], 48000, 24).unwrap();
        let a = decompose(&compute_transforms(&buffer));
        let b = decompose(&compute_transforms(&buffer));
        for (x, y) in a.iter().zip(b.iter()) {
            assert_eq!(x.signals.mono, y.signals.mono);
        }
    }

    #[test]
    fn test_empty_band_reconstruction_is_zero() {
        let samples = sine(1000.0, 8000, 16000, 0.5);
        let buffer = AudioBuffer::new(vec![samples], 8000, 16).unwrap();
        let slices = decompose(&compute_transforms(&buffer));
        let high = &slices[BandId::High.index()];
        assert!(high.is_empty());
        assert_eq!(high.signals.mono.len(), 16000);
        assert!(high.signals.mono.iter().all(|&x| x == 0.0));
        assert!(high.view().is_empty());
    }

    #[test]
    fn test_input_shorter_than_window_has_empty_bands() {
        let samples = sine(440.0, 48000, 2400, 0.5);
        let buffer = AudioBuffer::new(vec![samples], 48000, 16).unwrap();
        let slices = decompose(&compute_transforms(&buffer));
        for slice in &slices {
            assert!(slice.is_empty(), "{} should be empty without frames", slice.id());
        }
        assert!(!slices[BandId::LowMid.index()].bins.is_empty());
    }
}
