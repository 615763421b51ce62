//! # Mastering DSP
//!
//! An audio analysis engine for mastering feedback: per-band level, dynamics,
//! spectral, stereo, harmonic and transient metrics, standards loudness
//! (BS.1770-4 / EBU R128) with independent cross-validation, and
//! reference-track similarity.
//!
//! ## Features
//!
//! - **WAV loading**: 16/24-bit PCM at 44.1/48 kHz, mono or stereo, DC offset removal
//! - **Band analysis**: 4096/1024 Hann STFT split into five fixed bands, 19 metrics per band
//! - **Loudness**: integrated LUFS, loudness range, 4x true peak, checked against `ebur128`
//! - **Similarity**: 128-value feature vectors ranked by cosine similarity
//!
//! ## Quick Start
//!
//! ```no_run
//! use mastering_dsp::{analyze_file, AnalysisConfig, AnalysisSettings};
//!
//! let result = analyze_file(
//!     "mix.wav",
//!     "analysis-1",
//!     &AnalysisSettings::default(),
//!     AnalysisConfig::default(),
//!     |band, percent| println!("{} done ({}%)", band, percent),
//! )?;
//!
//! println!("Integrated: {:?} LUFS", result.overall_metrics.integrated_lufs);
//! for band in &result.band_metrics {
//!     println!("{}: {:?} dBFS", band.band, band.level.rms_dbfs);
//! }
//! # Ok::<(), mastering_dsp::AnalysisError>(())
//! ```
//!
//! ## Architecture
//!
//! ```text
//! WAV → AudioBuffer → STFT → 5 BandSlices → metrics per band ─┐
//!                 └──────→ LoudnessMeter ─────────────────────┴→ AnalysisResult → feature vector
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod analysis;
pub mod config;
pub mod error;
pub mod features;
pub mod io;
pub mod loudness;
pub mod metrics;
pub mod preprocessing;
pub mod similarity;

// Re-export main types
pub use analysis::{
    AnalysisMetadata, AnalysisResult, AnalysisState, AnalysisWarning, Analyzer, BandMetrics,
    BandStatus, CancellationToken, OverallMetrics, WarningKind,
};
pub use config::{AnalysisConfig, AnalysisSettings, RecommendationLevel};
pub use error::AnalysisError;
pub use features::bands::BandId;
pub use io::{load_wav, load_wav_from_reader, AudioBuffer};
pub use loudness::{LoudnessMeter, LoudnessReport};

use std::path::Path;

/// Main analysis function
///
/// Loads a WAV file and runs the full pipeline: transform, band
/// decomposition, per-band metrics, loudness and aggregation.
///
/// # Arguments
///
/// * `path` - WAV file (16/24-bit PCM, 44.1/48 kHz, mono or stereo)
/// * `analysis_id` - Identifier copied into the result
/// * `settings` - Genre and recommendation level for this run
/// * `config` - Analysis configuration parameters
/// * `on_progress` - Called once per band with `(band, percent)`
///
/// # Returns
///
/// `AnalysisResult` with five band records, overall metrics and metadata
///
/// # Errors
///
/// Returns `AnalysisError` if the file cannot be loaded. Failures inside a
/// single band are recorded on that band instead.
///
/// # Example
///
/// ```no_run
/// use mastering_dsp::{analyze_file, AnalysisConfig, AnalysisSettings};
///
/// let result = analyze_file("mix.wav", "a1", &AnalysisSettings::default(), AnalysisConfig::default(), |_, _| {})?;
/// # Ok::<(), mastering_dsp::AnalysisError>(())
/// ```
pub fn analyze_file<P, F>(
    path: P,
    analysis_id: &str,
    settings: &AnalysisSettings,
    config: AnalysisConfig,
    on_progress: F,
) -> Result<AnalysisResult, AnalysisError>
where
    P: AsRef<Path>,
    F: FnMut(BandId, u8),
{
    log::debug!("Starting analysis {} of {}", analysis_id, path.as_ref().display());
    Analyzer::new(config).analyze(path, analysis_id, settings, on_progress)
}
