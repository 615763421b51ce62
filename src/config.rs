//! Configuration parameters for audio analysis
//!
//! Transform parameters and the band table are fixed constants (see
//! [`crate::features::stft`] and [`crate::features::bands`]). Everything here
//! is a tunable threshold with a documented default.

use serde::{Deserialize, Serialize};

/// Genre identifiers accepted in [`AnalysisSettings::genre`]
pub const GENRES: [&str; 20] = [
    "rock",
    "pop",
    "hip_hop",
    "electronic",
    "jazz",
    "classical",
    "r_and_b",
    "country",
    "metal",
    "folk",
    "blues",
    "reggae",
    "latin",
    "ambient",
    "indie",
    "punk",
    "soul",
    "funk",
    "world",
    "other",
];

/// Returns true when `genre` is one of [`GENRES`]
pub fn is_known_genre(genre: &str) -> bool {
    GENRES.contains(&genre)
}

/// How prescriptive downstream mastering advice should be
///
/// Only the recommendation generator reads this; metric values never depend on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationLevel {
    /// Report measurements only
    #[default]
    Analytical,
    /// Suggest directions
    Suggestive,
    /// Give concrete settings
    Prescriptive,
}

/// Per-run analysis settings supplied by the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSettings {
    /// Target genre (one of [`GENRES`] for the bundled reference corpus)
    pub genre: String,
    /// Recommendation verbosity
    pub recommendation_level: RecommendationLevel,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            genre: "pop".to_string(),
            recommendation_level: RecommendationLevel::Analytical,
        }
    }
}

/// Analysis configuration parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    // Edge-case detection
    /// Whole-file RMS below this level raises a silence warning (default: -120.0 dBFS)
    pub silence_threshold_dbfs: f64,

    /// True peak above this level raises a clipping warning (default: -0.1 dBFS)
    pub clipping_threshold_dbfs: f64,

    /// Absolute per-channel mean above which DC offset is removed and flagged (default: 0.001)
    pub dc_offset_threshold: f64,

    // Level
    /// Frame length for the level-range percentile analysis (default: 50.0 ms)
    pub level_range_frame_ms: f64,

    // Harmonic/percussive separation
    /// Median filter length in frames and bins (default: 17, forced odd)
    pub hpss_kernel: usize,

    /// Soft-mask separation margin (default: 2.0)
    /// Larger values leave more energy in neither component
    pub hpss_margin: f64,

    // Transients
    /// Window after each onset searched for the envelope peak (default: 50.0 ms)
    pub attack_search_ms: f64,

    /// Onset threshold relative to the maximum energy flux (default: -20.0 dB)
    pub onset_threshold_db: f32,

    // Loudness
    /// Oversampling factor for true peak (default: 4, minimum 4)
    pub true_peak_oversampling: usize,

    /// Run the secondary EBU R128 implementation and compare (default: true)
    pub cross_validate_loudness: bool,

    /// Maximum integrated-loudness disagreement before a warning (default: 0.1 LU)
    pub cross_validation_threshold_lu: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            silence_threshold_dbfs: -120.0,
            clipping_threshold_dbfs: -0.1,
            dc_offset_threshold: 0.001,
            level_range_frame_ms: 50.0,
            hpss_kernel: 17,
            hpss_margin: 2.0,
            attack_search_ms: 50.0,
            onset_threshold_db: -20.0,
            true_peak_oversampling: 4,
            cross_validate_loudness: true,
            cross_validation_threshold_lu: 0.1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recommendation_level_serde_names() {
        let json = serde_json::to_string(&RecommendationLevel::Prescriptive).unwrap();
        assert_eq!(json, "\"prescriptive\"");
        let level: RecommendationLevel = serde_json::from_str("\"suggestive\"").unwrap();
        assert_eq!(level, RecommendationLevel::Suggestive);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: AnalysisConfig =
            serde_json::from_str(r#"{"clipping_threshold_dbfs": -1.0}"#).unwrap();
        assert_eq!(config.clipping_threshold_dbfs, -1.0);
        assert_eq!(config.silence_threshold_dbfs, -120.0);
        assert_eq!(config.hpss_kernel, 17);
    }

    #[test]
    fn test_genre_list() {
        assert_eq!(GENRES.len(), 20);
        assert!(is_known_genre("hip_hop"));
        assert!(!is_known_genre("polka"));
    }
}
