//! Reference similarity over real analysis results

mod common;

use common::{sine, white_noise};
use mastering_dsp::similarity::{
    cosine_similarity, deserialize_vector, features_for, find_similar, serialize_vector, ReferenceTrack,
    FEATURE_DIM,
};
use mastering_dsp::{AnalysisResult, AnalysisSettings, Analyzer, AudioBuffer};

fn analyze(channels: Vec<Vec<f64>>) -> AnalysisResult {
    let channels: Vec<Vec<f32>> = channels
        .into_iter()
        .map(|c| c.into_iter().map(|x| x as f32).collect())
        .collect();
    let buffer = AudioBuffer::new(channels, 48000, 24).unwrap();
    Analyzer::default()
        .analyze_buffer(&buffer, "similarity", &AnalysisSettings::default(), |_, _| {})
        .unwrap()
}

fn reference(id: &str, genre: &str, result: &AnalysisResult) -> ReferenceTrack {
    ReferenceTrack {
        reference_id: id.to_string(),
        genre: genre.to_string(),
        vector: features_for(result).to_vec(),
    }
}

#[test]
fn test_vector_from_analysis_is_stable() {
    let result = analyze(vec![sine(440.0, 0.5, 48000, 2.0), sine(660.0, 0.4, 48000, 2.0)]);
    let first = features_for(&result);
    let second = features_for(&result);

    assert_eq!(first.len(), FEATURE_DIM);
    assert!(first.iter().all(|x| x.is_finite()));
    assert_eq!(serialize_vector(&first).unwrap(), serialize_vector(&second).unwrap());
    assert!((cosine_similarity(&first, &second) - 1.0).abs() < 1e-9);

    let energy_share: f32 = first[60..65].iter().sum();
    assert!((energy_share - 1.0).abs() < 1e-4, "Energy shares sum to {}", energy_share);

    let restored = deserialize_vector(&serialize_vector(&first).unwrap()).unwrap();
    assert_eq!(restored, first);
}

#[test]
fn test_closest_reference_ranks_first() {
    let query = analyze(vec![sine(440.0, 0.5, 48000, 2.0)]);
    let tone = analyze(vec![sine(445.0, 0.5, 48000, 2.0)]);
    let noise = analyze(vec![white_noise(96000, 0.5, 3)]);

    let refs = vec![
        reference("noise", "rock", &noise),
        reference("tone", "rock", &tone),
        reference("tone-pop", "pop", &tone),
    ];
    let query_vector = features_for(&query);

    let ranked = find_similar(&query_vector, &refs, 10, None);
    assert_eq!(ranked.len(), 3);
    assert_eq!(ranked[0].reference_id, "tone");
    assert_eq!(ranked[1].reference_id, "tone-pop");
    assert!(ranked[0].score >= ranked[2].score);
    assert!(ranked.iter().all(|m| (0.0..=100.0).contains(&m.percentage)));

    let rock_only = find_similar(&query_vector, &refs, 1, Some("rock"));
    assert_eq!(rock_only.len(), 1);
    assert_eq!(rock_only[0].reference_id, "tone");
    assert_eq!(rock_only[0].genre, "rock");
}
