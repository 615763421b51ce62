//! Cosine-similarity ranking against a reference corpus

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::similarity::features::FEATURE_DIM;

/// One reference track supplied by the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceTrack {
    /// Caller-side identifier
    pub reference_id: String,
    /// Genre label, compared exactly by the genre filter
    pub genre: String,
    /// Feature vector (128 values)
    pub vector: Vec<f32>,
}

/// One ranked match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityMatch {
    /// Reference identifier
    pub reference_id: String,
    /// Reference genre
    pub genre: String,
    /// Cosine similarity in [-1, 1]
    pub score: f64,
    /// `max(score, 0) × 100`
    pub percentage: f64,
}

/// Cosine of the angle between `a` and `b`
///
/// 0.0 when either vector has zero norm or the lengths differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() {
        return 0.0;
    }
    let (mut dot, mut norm_a, mut norm_b) = (0.0f64, 0.0f64, 0.0f64);
    for (&x, &y) in a.iter().zip(b) {
        let (x, y) = (x as f64, y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0)
}

/// Score shown to users
pub fn display_percentage(score: f64) -> f64 {
    score.max(0.0) * 100.0
}

/// Rank `references` by similarity to `query`
///
/// The genre filter is applied first. Ties keep reference order. A zero
/// query yields no matches; malformed references are skipped.
pub fn find_similar(
    query: &[f32],
    references: &[ReferenceTrack],
    top_k: usize,
    genre: Option<&str>,
) -> Vec<SimilarityMatch> {
    if query.len() != FEATURE_DIM {
        log::warn!("Query vector has {} values, expected {}", query.len(), FEATURE_DIM);
        return Vec::new();
    }
    if query.iter().all(|&x| x == 0.0) {
        log::debug!("Zero query vector; no similarity ranking");
        return Vec::new();
    }

    let candidates: Vec<&ReferenceTrack> = references
        .iter()
        .filter(|r| genre.map_or(true, |g| r.genre == g))
        .filter(|r| {
            let ok = r.vector.len() == FEATURE_DIM;
            if !ok {
                log::warn!(
                    "Skipping reference '{}': vector has {} values",
                    r.reference_id,
                    r.vector.len()
                );
            }
            ok
        })
        .collect();

    let mut matches: Vec<SimilarityMatch> = candidates
        .par_iter()
        .map(|r| {
            let score = cosine_similarity(query, &r.vector);
            SimilarityMatch {
                reference_id: r.reference_id.clone(),
                genre: r.genre.clone(),
                score,
                percentage: display_percentage(score),
            }
        })
        .collect();

    matches.sort_by(|a, b| b.score.total_cmp(&a.score));
    matches.truncate(top_k);

    log::debug!(
        "Ranked {} of {} references (genre filter {:?})",
        matches.len(),
        references.len(),
        genre
    );
    matches
}
