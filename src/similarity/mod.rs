//! Reference-track similarity
//!
//! A completed analysis is reduced to a fixed 128-value feature vector and
//! ranked against caller-supplied reference vectors by cosine similarity.

pub mod features;
pub mod matcher;

pub use features::{deserialize_vector, extract_features, serialize_vector, FEATURE_DIM};
pub use matcher::{cosine_similarity, find_similar, ReferenceTrack, SimilarityMatch};

use crate::analysis::result::AnalysisResult;

/// Feature vector of a completed analysis
pub fn features_for(result: &AnalysisResult) -> [f32; FEATURE_DIM] {
    extract_features(&result.band_metrics, &result.overall_metrics)
}
