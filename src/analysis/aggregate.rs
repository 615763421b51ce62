//! Whole-file aggregation and edge-case detection
//!
//! Runs once per analysis after every band slot is filled. Band failures
//! never reach this stage as errors, only as null values.

use crate::analysis::result::{
    AnalysisWarning, BandMetrics, BandReport, BandStatus, OverallMetrics, WarningKind,
};
use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, Result};
use crate::features::bands::BandId;
use crate::io::AudioBuffer;
use crate::loudness::{LoudnessReport, LoudnessWarning};
use crate::metrics::dynamics::peak_to_rms_db;
use crate::metrics::stats;
use crate::preprocessing::edge_cases::{is_clipping, is_silent, rms_dbfs_raw, DB_FLOOR};

/// Fixed arena of five band slots, filled in any order
#[derive(Debug, Default)]
pub struct BandAccumulator {
    slots: [Option<(BandMetrics, BandStatus)>; 5],
}

impl BandAccumulator {
    /// Empty accumulator
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a computed band
    pub fn record_ok(&mut self, metrics: BandMetrics) {
        let index = metrics.band.index();
        self.slots[index] = Some((metrics, BandStatus::Ok));
    }

    /// Store a band with no transform bins
    pub fn record_empty(&mut self, band: BandId) {
        self.slots[band.index()] = Some((BandMetrics::empty(band.definition()), BandStatus::Empty));
    }

    /// Store a failed band as all-null metrics carrying `note`
    pub fn record_failure(&mut self, band: BandId, note: impl Into<String>) {
        let note = note.into();
        self.slots[band.index()] = Some((
            BandMetrics::failed(band.definition(), note.clone()),
            BandStatus::Failed { note },
        ));
    }

    /// Number of filled slots
    pub fn filled(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Take the five records in band order
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::ProcessingError` if any slot was never filled.
    pub fn finish(self) -> Result<([BandMetrics; 5], Vec<BandReport>)> {
        let mut metrics = Vec::with_capacity(5);
        let mut reports = Vec::with_capacity(5);
        for (band, slot) in BandId::ALL.iter().zip(self.slots) {
            let (m, status) = slot.ok_or_else(|| {
                AnalysisError::ProcessingError(format!("band '{}' was never computed", band))
            })?;
            metrics.push(m);
            reports.push(BandReport { band: *band, status });
        }
        let metrics: [BandMetrics; 5] = metrics
            .try_into()
            .map_err(|_| AnalysisError::ProcessingError("band slot count mismatch".to_string()))?;
        Ok((metrics, reports))
    }
}

/// Spectral summary of the full mix, taken before the transforms are dropped
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FullSpectrum {
    /// Energy-weighted mean frequency (Hz)
    pub centroid_hz: Option<f64>,
    /// Magnitude-weighted spread around the centroid (Hz)
    pub bandwidth_hz: Option<f64>,
}

/// Build the overall record from band results and the loudness report
pub fn overall_metrics(
    buffer: &AudioBuffer,
    bands: &[BandMetrics; 5],
    spectrum: FullSpectrum,
    loudness: &LoudnessReport,
    config: &AnalysisConfig,
) -> OverallMetrics {
    let crest = peak_to_rms_db(buffer.mono());

    let widths: Vec<f64> = bands.iter().filter_map(|b| b.stereo.width_percent).collect();
    let correlations: Vec<f64> = bands
        .iter()
        .filter_map(|b| b.stereo.phase_correlation)
        .collect();

    let warnings = detect_warnings(buffer, loudness, config);

    OverallMetrics {
        integrated_lufs: loudness.integrated_lufs,
        loudness_range_lu: loudness.loudness_range_lu,
        true_peak_dbfs: loudness.true_peak_dbfs,
        dynamic_range_db: crest,
        crest_factor_db: crest,
        avg_stereo_width_percent: stats::mean(&widths),
        avg_phase_correlation: stats::mean(&correlations),
        spectral_centroid_hz: spectrum.centroid_hz,
        spectral_bandwidth_hz: spectrum.bandwidth_hz,
        sample_peak_dbfs: loudness.sample_peak_dbfs,
        secondary_lufs: loudness.secondary_lufs,
        lufs_delta: loudness.lufs_delta,
        loudness_cross_validated: loudness.cross_validated,
        warnings: (!warnings.is_empty()).then_some(warnings),
    }
}

/// Silence, clipping and DC offset checks plus the meter's own warnings
pub fn detect_warnings(
    buffer: &AudioBuffer,
    loudness: &LoudnessReport,
    config: &AnalysisConfig,
) -> Vec<AnalysisWarning> {
    let mut warnings = Vec::new();

    let silent = buffer
        .channels()
        .iter()
        .all(|c| is_silent(c, config.silence_threshold_dbfs));
    if silent {
        let level = buffer
            .channels()
            .iter()
            .map(|c| rms_dbfs_raw(c))
            .fold(f64::NEG_INFINITY, f64::max)
            .max(DB_FLOOR);
        log::warn!("Silence detected (RMS below {} dBFS)", config.silence_threshold_dbfs);
        warnings.push(AnalysisWarning::new(
            WarningKind::Silence,
            format!(
                "Silence detected: RMS below {:.1} dBFS",
                config.silence_threshold_dbfs
            ),
            Some(level),
        ));
    }

    if is_clipping(loudness.true_peak_dbfs, config.clipping_threshold_dbfs) {
        let peak = loudness.true_peak_dbfs.unwrap_or(DB_FLOOR);
        log::warn!("Clipping detected: true peak {:.2} dBFS", peak);
        warnings.push(AnalysisWarning::new(
            WarningKind::Clipping,
            format!(
                "Clipping detected: true peak {:.2} dBFS exceeds {:.1} dBFS",
                peak, config.clipping_threshold_dbfs
            ),
            Some(peak),
        ));
    }

    let dc = buffer.dc_offset();
    if dc.detected {
        let worst = dc.channel_means.iter().fold(0.0f64, |acc, m| acc.max(m.abs()));
        log::warn!("DC offset removed (max channel mean {:.5})", worst);
        warnings.push(AnalysisWarning::new(
            WarningKind::DcOffset,
            format!("DC offset detected and removed (mean {:.5})", worst),
            Some(worst),
        ));
    }

    for warning in &loudness.warnings {
        let converted = match warning {
            // already covered by the whole-file RMS check
            LoudnessWarning::SilenceDetected if silent => continue,
            LoudnessWarning::SilenceDetected => {
                AnalysisWarning::new(WarningKind::Silence, warning.message(), None)
            }
            LoudnessWarning::TooShort { duration_seconds } => AnalysisWarning::new(
                WarningKind::LoudnessTooShort,
                warning.message(),
                Some(*duration_seconds),
            ),
            LoudnessWarning::CrossValidationDivergence { delta_lu, .. } => AnalysisWarning::new(
                WarningKind::LoudnessDivergence,
                warning.message(),
                Some(*delta_lu),
            ),
            LoudnessWarning::SecondaryUnavailable { .. } => AnalysisWarning::new(
                WarningKind::LoudnessSecondaryUnavailable,
                warning.message(),
                None,
            ),
        };
        warnings.push(converted);
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::bands::BAND_TABLE;
    use crate::io::DcOffsetReport;

    fn sine(freq: f64, amplitude: f64, seconds: f64) -> Vec<f32> {
        (0..(seconds * 48000.0) as usize)
            .map(|i| (amplitude * (2.0 * std::f64::consts::PI * freq * i as f64 / 48000.0).sin()) as f32)
            .collect()
    }

    #[test]
    fn test_accumulator_fills_out_of_order() {
        let mut acc = BandAccumulator::new();
        acc.record_empty(BandId::High);
        acc.record_failure(BandId::Low, "boom");
        for band in [BandId::Mid, BandId::LowMid, BandId::HighMid] {
            acc.record_ok(BandMetrics::empty(band.definition()));
        }
        assert_eq!(acc.filled(), 5);

        let (metrics, reports) = acc.finish().unwrap();
        for (i, band) in BandId::ALL.iter().enumerate() {
            assert_eq!(metrics[i].band, *band);
            assert_eq!(reports[i].band, *band);
        }
        assert_eq!(metrics[0].error.as_deref(), Some("boom"));
        assert_eq!(reports[0].status, BandStatus::Failed { note: "boom".to_string() });
        assert_eq!(reports[4].status, BandStatus::Empty);
        assert_eq!(reports[2].status, BandStatus::Ok);
    }

    #[test]
    fn test_accumulator_missing_slot_is_error() {
        let mut acc = BandAccumulator::new();
        acc.record_empty(BandId::Low);
        assert!(matches!(acc.finish(), Err(AnalysisError::ProcessingError(_))));
    }

    #[test]
    fn test_silence_warning() {
        let buffer = AudioBuffer::new(vec![vec![0.0; 48000]], 48000, 16).unwrap();
        let loudness = LoudnessReport {
            true_peak_dbfs: Some(DB_FLOOR),
            warnings: vec![LoudnessWarning::SilenceDetected],
            ..LoudnessReport::default()
        };
        let warnings = detect_warnings(&buffer, &loudness, &AnalysisConfig::default());
        let silence: Vec<_> = warnings.iter().filter(|w| w.kind == WarningKind::Silence).collect();
        assert_eq!(silence.len(), 1, "Silence should be reported once: {:?}", warnings);
        assert_eq!(silence[0].value, Some(DB_FLOOR));
    }

    #[test]
    fn test_clipping_and_dc_warnings() {
        let buffer = AudioBuffer::new(vec![sine(1000.0, 0.9, 1.0)], 48000, 16)
            .unwrap()
            .with_dc_offset(DcOffsetReport {
                detected: true,
                channel_means: vec![0.01],
            });
        let loudness = LoudnessReport {
            true_peak_dbfs: Some(0.3),
            ..LoudnessReport::default()
        };
        let warnings = detect_warnings(&buffer, &loudness, &AnalysisConfig::default());
        let kinds: Vec<WarningKind> = warnings.iter().map(|w| w.kind).collect();
        assert_eq!(kinds, vec![WarningKind::Clipping, WarningKind::DcOffset]);
    }

    #[test]
    fn test_overall_aggregates() {
        let left = sine(440.0, 0.5, 1.0);
        let buffer = AudioBuffer::new(vec![left.clone(), left], 48000, 24).unwrap();

        let mut bands: [BandMetrics; 5] = std::array::from_fn(|i| BandMetrics::empty(&BAND_TABLE[i]));
        bands[1].stereo.width_percent = Some(20.0);
        bands[2].stereo.width_percent = Some(40.0);
        bands[1].stereo.phase_correlation = Some(0.5);

        let loudness = LoudnessReport {
            integrated_lufs: Some(-9.0),
            true_peak_dbfs: Some(-6.0),
            ..LoudnessReport::default()
        };
        let spectrum = FullSpectrum {
            centroid_hz: Some(440.0),
            bandwidth_hz: Some(10.0),
        };
        let overall = overall_metrics(&buffer, &bands, spectrum, &loudness, &AnalysisConfig::default());

        assert_eq!(overall.avg_stereo_width_percent, Some(30.0));
        assert_eq!(overall.avg_phase_correlation, Some(0.5));
        assert_eq!(overall.integrated_lufs, Some(-9.0));
        assert_eq!(overall.spectral_centroid_hz, Some(440.0));
        let crest = overall.crest_factor_db.unwrap();
        assert!((crest - 3.01).abs() < 0.02, "Sine crest should be ~3.01 dB, got {:.3}", crest);
        assert_eq!(overall.dynamic_range_db, overall.crest_factor_db);
        assert_eq!(overall.warnings, None);
    }
}
