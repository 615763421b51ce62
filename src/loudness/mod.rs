//! Standards loudness metering
//!
//! The primary meter is implemented here (K-weighting, BS.1770-4 gating,
//! EBU Tech 3342 loudness range, oversampled true peak). A second, independent
//! implementation (`ebur128`) measures integrated loudness over the same
//! buffer and the two are compared. Divergence beyond the configured threshold
//! is a warning; the primary value is always the one reported.
//!
//! # Example
//!
//! ```no_run
//! use mastering_dsp::{load_wav, AnalysisConfig};
//! use mastering_dsp::loudness::LoudnessMeter;
//!
//! let config = AnalysisConfig::default();
//! let buffer = load_wav("mix.wav", &config)?;
//! let report = LoudnessMeter::new(&config).measure(&buffer);
//! println!("{:?} LUFS, {:?} LU LRA", report.integrated_lufs, report.loudness_range_lu);
//! # Ok::<(), mastering_dsp::AnalysisError>(())
//! ```

pub mod bs1770;
pub mod k_weighting;
pub mod lra;
pub mod reference;
pub mod true_peak;
pub mod validator;

use serde::{Deserialize, Serialize};

use crate::config::AnalysisConfig;
use crate::io::AudioBuffer;
use crate::preprocessing::edge_cases::{amplitude_to_dbfs, is_silent};

/// Advisory conditions raised while metering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LoudnessWarning {
    /// No block passed the absolute gate
    SilenceDetected,
    /// Shorter than one 400 ms gating block
    TooShort {
        /// Buffer duration (seconds)
        duration_seconds: f64,
    },
    /// Primary and secondary integrated loudness disagree
    CrossValidationDivergence {
        /// In-crate BS.1770 value (LUFS)
        primary_lufs: f64,
        /// `ebur128` value (LUFS)
        secondary_lufs: f64,
        /// Absolute difference (LU)
        delta_lu: f64,
    },
    /// The secondary meter could not run
    SecondaryUnavailable {
        /// Error reported by the secondary meter
        message: String,
    },
}

impl LoudnessWarning {
    /// Human-readable description
    pub fn message(&self) -> String {
        match self {
            LoudnessWarning::SilenceDetected => {
                "Silence detected: integrated loudness is undefined".to_string()
            }
            LoudnessWarning::TooShort { duration_seconds } => format!(
                "Audio too short for gated loudness ({:.3} s < {} s)",
                duration_seconds,
                bs1770::BLOCK_SECONDS
            ),
            LoudnessWarning::CrossValidationDivergence {
                primary_lufs,
                secondary_lufs,
                delta_lu,
            } => format!(
                "Loudness cross-validation diverged by {:.3} LU (primary {:.2}, ebur128 {:.2})",
                delta_lu, primary_lufs, secondary_lufs
            ),
            LoudnessWarning::SecondaryUnavailable { message } => {
                format!("Secondary loudness meter unavailable: {}", message)
            }
        }
    }
}

/// Loudness measurements for one buffer
///
/// All levels are rounded to two decimals. Undefined values are `None`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LoudnessReport {
    /// Integrated loudness (LUFS), primary implementation
    pub integrated_lufs: Option<f64>,
    /// Loudness range (LU)
    pub loudness_range_lu: Option<f64>,
    /// Oversampled true peak (dBFS), -120 for silence
    pub true_peak_dbfs: Option<f64>,
    /// Sample peak (dBFS), -120 for silence
    pub sample_peak_dbfs: Option<f64>,
    /// Integrated loudness from the secondary implementation (LUFS)
    pub secondary_lufs: Option<f64>,
    /// `|primary - secondary|` (LU) when both are defined
    pub lufs_delta: Option<f64>,
    /// True when both implementations agree within the threshold
    pub cross_validated: bool,
    /// Advisory conditions
    pub warnings: Vec<LoudnessWarning>,
}

/// Round to two decimals
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Dual-implementation loudness meter
#[derive(Debug, Clone)]
pub struct LoudnessMeter {
    oversampling: usize,
    cross_validate: bool,
    threshold_lu: f64,
    silence_threshold_dbfs: f64,
}

/// Primary meter output before rounding
struct PrimaryMeasurement {
    integrated_lufs: Option<f64>,
    loudness_range_lu: Option<f64>,
    true_peak_dbfs: f64,
}

impl LoudnessMeter {
    /// Create a meter from the loudness settings in `config`
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            oversampling: config.true_peak_oversampling.max(true_peak::MIN_OVERSAMPLING),
            cross_validate: config.cross_validate_loudness,
            threshold_lu: config.cross_validation_threshold_lu,
            silence_threshold_dbfs: config.silence_threshold_dbfs,
        }
    }

    /// Measure `buffer`; never fails
    ///
    /// The two implementations run concurrently on the rayon pool. Errors
    /// from the secondary meter become a warning.
    pub fn measure(&self, buffer: &AudioBuffer) -> LoudnessReport {
        let (primary, secondary) = rayon::join(
            || self.measure_primary(buffer),
            || self.cross_validate.then(|| reference::measure(buffer)),
        );

        let mut warnings = Vec::new();
        let duration_seconds = buffer.duration_seconds();
        if duration_seconds < bs1770::BLOCK_SECONDS {
            log::warn!("Audio is {:.3} s, shorter than one gating block", duration_seconds);
            warnings.push(LoudnessWarning::TooShort { duration_seconds });
        } else if primary.integrated_lufs.is_none()
            || buffer.channels().iter().all(|c| is_silent(c, self.silence_threshold_dbfs))
        {
            log::warn!("Silence detected, integrated loudness undefined");
            warnings.push(LoudnessWarning::SilenceDetected);
        }

        let mut report = LoudnessReport {
            integrated_lufs: primary.integrated_lufs.map(round2),
            loudness_range_lu: primary.loudness_range_lu.map(round2),
            true_peak_dbfs: Some(round2(primary.true_peak_dbfs)),
            sample_peak_dbfs: Some(round2(amplitude_to_dbfs(true_peak::sample_peak(buffer)))),
            ..LoudnessReport::default()
        };

        match secondary {
            None => log::debug!("Loudness cross-validation disabled"),
            Some(Err(err)) => {
                log::warn!("Secondary loudness meter failed: {}", err);
                warnings.push(LoudnessWarning::SecondaryUnavailable {
                    message: err.to_string(),
                });
            }
            Some(Ok(reference)) => {
                report.secondary_lufs = reference.integrated_lufs.map(round2);
                match (primary.integrated_lufs, reference.integrated_lufs) {
                    (Some(p), Some(s)) => {
                        let delta = (p - s).abs();
                        report.lufs_delta = Some((delta * 1000.0).round() / 1000.0);
                        report.cross_validated = delta <= self.threshold_lu;
                        log::info!(
                            "LUFS cross-validation: primary {:.2}, ebur128 {:.2}, diff {:.3} LU",
                            p,
                            s,
                            delta
                        );
                        if !report.cross_validated {
                            log::warn!(
                                "LUFS cross-validation difference {:.3} LU exceeds {:.1} LU",
                                delta,
                                self.threshold_lu
                            );
                            warnings.push(LoudnessWarning::CrossValidationDivergence {
                                primary_lufs: round2(p),
                                secondary_lufs: round2(s),
                                delta_lu: delta,
                            });
                        }
                    }
                    (p, s) => log::info!(
                        "LUFS cross-validation skipped (undefined value): primary {:?}, ebur128 {:?}",
                        p,
                        s
                    ),
                }
            }
        }

        log::info!(
            "Loudness: {:?} LUFS, LRA {:?} LU, true peak {:?} dBFS",
            report.integrated_lufs,
            report.loudness_range_lu,
            report.true_peak_dbfs
        );
        report.warnings = warnings;
        report
    }

    fn measure_primary(&self, buffer: &AudioBuffer) -> PrimaryMeasurement {
        let integrator = bs1770::PowerIntegrator::new(buffer);
        PrimaryMeasurement {
            integrated_lufs: bs1770::integrated_from(&integrator),
            loudness_range_lu: lra::loudness_range(&integrator),
            true_peak_dbfs: true_peak::true_peak_dbfs(buffer, self.oversampling),
        }
    }
}

/// Measure `buffer` with a meter built from `config`
pub fn measure(buffer: &AudioBuffer, config: &AnalysisConfig) -> LoudnessReport {
    LoudnessMeter::new(config).measure(buffer)
}
