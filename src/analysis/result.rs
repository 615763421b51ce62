//! Analysis result types

use serde::{Deserialize, Serialize};

use crate::config::AnalysisSettings;
use crate::features::bands::{BandDefinition, BandId};
use crate::metrics::{
    DynamicsMetrics, HarmonicMetrics, LevelMetrics, SpectralMetrics, StereoMetrics, TransientMetrics,
};

/// Metrics for one band of one analysis
///
/// Each family is flattened into the record, so the serialized form is a
/// single object with up to 19 nullable numeric fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandMetrics {
    /// Band identifier
    pub band: BandId,
    /// Lower band edge (Hz)
    pub freq_min: f64,
    /// Upper band edge (Hz)
    pub freq_max: f64,

    /// RMS, peak and level range
    #[serde(flatten)]
    pub level: LevelMetrics,

    /// Dynamic range, crest factor, RMS
    #[serde(flatten)]
    pub dynamics: DynamicsMetrics,

    /// Centroid, roll-off, flatness, energy
    #[serde(flatten)]
    pub spectral: SpectralMetrics,

    /// Width, phase correlation, mid/side energy (null for mono)
    #[serde(flatten)]
    pub stereo: StereoMetrics,

    /// THD, harmonic ratio, inharmonicity
    #[serde(flatten)]
    pub harmonics: HarmonicMetrics,

    /// Transient preservation, attack time
    #[serde(flatten)]
    pub transients: TransientMetrics,

    /// Why the metrics are null, when the band failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BandMetrics {
    /// All-null record for `band`
    pub fn empty(band: &BandDefinition) -> Self {
        Self {
            band: band.id,
            freq_min: band.freq_min,
            freq_max: band.freq_max,
            level: LevelMetrics::default(),
            dynamics: DynamicsMetrics::default(),
            spectral: SpectralMetrics::default(),
            stereo: StereoMetrics::default(),
            harmonics: HarmonicMetrics::default(),
            transients: TransientMetrics::default(),
            error: None,
        }
    }

    /// All-null record annotated with the failure
    pub fn failed(band: &BandDefinition, note: impl Into<String>) -> Self {
        Self {
            error: Some(note.into()),
            ..Self::empty(band)
        }
    }

    /// Every metric with its field name, in serialization order
    pub fn values(&self) -> [(&'static str, Option<f64>); 19] {
        [
            ("rms_dbfs", self.level.rms_dbfs),
            ("true_peak_dbfs", self.level.true_peak_dbfs),
            ("level_range_db", self.level.level_range_db),
            ("dynamic_range_db", self.dynamics.dynamic_range_db),
            ("crest_factor_db", self.dynamics.crest_factor_db),
            ("rms_db", self.dynamics.rms_db),
            ("centroid_hz", self.spectral.centroid_hz),
            ("rolloff_hz", self.spectral.rolloff_hz),
            ("flatness", self.spectral.flatness),
            ("energy_db", self.spectral.energy_db),
            ("width_percent", self.stereo.width_percent),
            ("phase_correlation", self.stereo.phase_correlation),
            ("mid_energy_db", self.stereo.mid_energy_db),
            ("side_energy_db", self.stereo.side_energy_db),
            ("thd_percent", self.harmonics.thd_percent),
            ("harmonic_ratio", self.harmonics.harmonic_ratio),
            ("inharmonicity", self.harmonics.inharmonicity),
            ("transient_preservation", self.transients.transient_preservation),
            ("attack_time_ms", self.transients.attack_time_ms),
        ]
    }

    /// True when no metric has a value
    pub fn is_all_null(&self) -> bool {
        self.values().iter().all(|(_, v)| v.is_none())
    }

    /// First metric holding NaN or infinity, if any
    pub fn first_non_finite(&self) -> Option<&'static str> {
        self.values()
            .iter()
            .find(|(_, v)| v.map(|x| !x.is_finite()).unwrap_or(false))
            .map(|(name, _)| *name)
    }
}

/// Category of an advisory warning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// Whole-file RMS below the silence threshold
    Silence,
    /// True peak above the clipping threshold
    Clipping,
    /// The loader removed a DC offset
    DcOffset,
    /// Shorter than one loudness gating block
    LoudnessTooShort,
    /// The two loudness implementations disagree
    LoudnessDivergence,
    /// The secondary loudness implementation could not run
    LoudnessSecondaryUnavailable,
}

/// Advisory condition attached to the overall metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisWarning {
    /// Category
    pub kind: WarningKind,
    /// Human-readable description
    pub message: String,
    /// Measured value behind the warning (dBFS, LU or linear mean)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
}

impl AnalysisWarning {
    /// Create a warning
    pub fn new(kind: WarningKind, message: impl Into<String>, value: Option<f64>) -> Self {
        Self {
            kind,
            message: message.into(),
            value,
        }
    }
}

/// Whole-file aggregates
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OverallMetrics {
    /// Integrated loudness (LUFS)
    pub integrated_lufs: Option<f64>,
    /// Loudness range (LU)
    pub loudness_range_lu: Option<f64>,
    /// Oversampled true peak (dBFS)
    pub true_peak_dbfs: Option<f64>,
    /// Peak-to-RMS ratio of the full mix (dB)
    pub dynamic_range_db: Option<f64>,
    /// Peak-to-RMS ratio of the full mix (dB)
    pub crest_factor_db: Option<f64>,
    /// Mean band stereo width (%)
    pub avg_stereo_width_percent: Option<f64>,
    /// Mean band phase correlation
    pub avg_phase_correlation: Option<f64>,
    /// Spectral centroid of the full mix (Hz)
    pub spectral_centroid_hz: Option<f64>,
    /// Spectral bandwidth of the full mix (Hz)
    pub spectral_bandwidth_hz: Option<f64>,
    /// Sample peak (dBFS)
    pub sample_peak_dbfs: Option<f64>,
    /// Integrated loudness from the secondary implementation (LUFS)
    pub secondary_lufs: Option<f64>,
    /// Disagreement between the loudness implementations (LU)
    pub lufs_delta: Option<f64>,
    /// Both loudness implementations agree within tolerance
    pub loudness_cross_validated: bool,
    /// Advisory warnings, `None` when there are none
    pub warnings: Option<Vec<AnalysisWarning>>,
}

impl OverallMetrics {
    /// Warnings as a slice (empty when none)
    pub fn warnings(&self) -> &[AnalysisWarning] {
        self.warnings.as_deref().unwrap_or(&[])
    }

    /// True when a warning of `kind` is attached
    pub fn has_warning(&self, kind: WarningKind) -> bool {
        self.warnings().iter().any(|w| w.kind == kind)
    }
}

/// Outcome of one band's metric computation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BandStatus {
    /// Metrics computed
    Ok,
    /// The band has no transform bins or the input has no frames; metrics are null
    Empty,
    /// Computation failed; metrics are null
    Failed {
        /// Failure description
        note: String,
    },
}

/// Per-band status entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandReport {
    /// Band identifier
    pub band: BandId,
    /// Outcome
    #[serde(flatten)]
    pub status: BandStatus,
}

/// Analysis metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisMetadata {
    /// Audio duration in seconds
    pub duration_seconds: f64,

    /// Sample rate in Hz
    pub sample_rate: u32,

    /// Source bit depth
    pub bit_depth: u16,

    /// Channel count (1 or 2)
    pub channels: usize,

    /// Processing time in milliseconds
    pub processing_time_ms: f64,

    /// Algorithm version
    pub algorithm_version: String,

    /// Settings the run was started with
    pub settings: AnalysisSettings,

    /// Per-band outcome, low to high
    pub band_status: Vec<BandReport>,
}

/// Complete analysis result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Caller-supplied analysis identifier
    pub analysis_id: String,

    /// Per-band metrics, low to high
    pub band_metrics: [BandMetrics; 5],

    /// Whole-file aggregates
    pub overall_metrics: OverallMetrics,

    /// Run metadata
    pub metadata: AnalysisMetadata,
}

impl AnalysisResult {
    /// Metrics for `band`
    pub fn band(&self, band: BandId) -> &BandMetrics {
        &self.band_metrics[band.index()]
    }

    /// Bands whose computation failed
    pub fn failed_bands(&self) -> Vec<BandId> {
        self.metadata
            .band_status
            .iter()
            .filter(|r| matches!(r.status, BandStatus::Failed { .. }))
            .map(|r| r.band)
            .collect()
    }
}
