//! Golden-corpus loudness validation
//!
//! Each corpus signal is synthesized, written as 16-bit / 48 kHz PCM, loaded
//! through the public loader and measured. Tone levels are set analytically
//! from the K-weighting response so a tone lands on its nominal loudness.

mod common;

use common::{sine, wav_in};
use mastering_dsp::loudness::k_weighting::KWeightingFilter;
use mastering_dsp::loudness::validator::{generate_report, validate, ExpectedLoudness, ValidationResult, GOLDEN_CORPUS};
use mastering_dsp::{load_wav, AnalysisConfig, LoudnessMeter};

const SAMPLE_RATE: u32 = 48000;

/// Peak amplitude of a steady sine measuring `lufs` over `channels` identical channels
fn amplitude_for_lufs(lufs: f64, freq: f64, channels: usize) -> f64 {
    let gain_db = KWeightingFilter::new(SAMPLE_RATE).gain_db(freq);
    let channel_db = 10.0 * (channels as f64 / 2.0).log10();
    10.0_f64.powf((lufs + 0.691 - gain_db - channel_db) / 20.0)
}

fn tone_at(lufs: f64, freq: f64, channels: usize, seconds: f64) -> Vec<f64> {
    sine(freq, amplitude_for_lufs(lufs, freq, channels), SAMPLE_RATE, seconds)
}

fn silence(seconds: f64) -> Vec<f64> {
    vec![0.0; (seconds * SAMPLE_RATE as f64) as usize]
}

fn concat(parts: &[Vec<f64>]) -> Vec<f64> {
    parts.iter().flatten().copied().collect()
}

fn stereo(signal: Vec<f64>) -> Vec<Vec<f64>> {
    vec![signal.clone(), signal]
}

/// Channels for a corpus file
fn synthesize(file_name: &str) -> Vec<Vec<f64>> {
    match file_name {
        "sine_440hz.wav" => vec![sine(440.0, 1.0, SAMPLE_RATE, 3.0)],
        "sine_1khz_stereo.wav" => stereo(sine(1000.0, 1.0, SAMPLE_RATE, 3.0)),
        "silence.wav" => vec![silence(2.0)],
        "ebu_r128_stereo_997hz_23lufs.wav" => stereo(tone_at(-23.0, 997.0, 2, 20.0)),
        "ebu_r128_stereo_997hz_33lufs.wav" => stereo(tone_at(-33.0, 997.0, 2, 20.0)),
        "ebu_r128_mono_997hz_23lufs.wav" => vec![tone_at(-23.0, 997.0, 1, 20.0)],
        "ebu_r128_gate_test.wav" => {
            stereo(concat(&[silence(10.0), tone_at(-23.0, 997.0, 2, 10.0)]))
        }
        "ebu_r128_lra_test.wav" => {
            let mut parts = Vec::new();
            for _ in 0..6 {
                parts.push(tone_at(-20.0, 997.0, 2, 5.0));
                parts.push(tone_at(-30.0, 997.0, 2, 5.0));
            }
            stereo(concat(&parts))
        }
        "ebu_r128_tone_stereo_23lufs.wav" => stereo(tone_at(-23.0, 1000.0, 2, 10.0)),
        "ebu_r128_tone_stereo_33lufs.wav" => stereo(tone_at(-33.0, 1000.0, 2, 10.0)),
        "ebu_r128_tone_mono_23lufs.wav" => vec![tone_at(-23.0, 1000.0, 1, 10.0)],
        "ebu_r128_tone_with_silence.wav" => {
            stereo(concat(&[tone_at(-23.0, 1000.0, 2, 10.0), silence(10.0)]))
        }
        "ebu_r128_two_tones.wav" => stereo(concat(&[
            tone_at(-36.0, 1000.0, 2, 10.0),
            tone_at(-23.0, 1000.0, 2, 10.0),
        ])),
        other => panic!("No synthesizer for corpus file {}", other),
    }
}

#[test]
fn test_golden_corpus_within_tolerance() {
    common::init_logging();
    let dir = tempfile::tempdir().unwrap();
    let config = AnalysisConfig::default();
    let meter = LoudnessMeter::new(&config);

    let mut rows: Vec<(&str, ExpectedLoudness, ValidationResult)> = Vec::new();
    for vector in GOLDEN_CORPUS.iter() {
        let path = wav_in(dir.path(), vector.file_name, &synthesize(vector.file_name), SAMPLE_RATE, 16);
        let buffer = load_wav(&path, &config).unwrap();
        let report = meter.measure(&buffer);
        rows.push((vector.file_name, vector.expected, validate(&report, &vector.expected)));
    }

    let markdown = generate_report(&rows);
    let failures: Vec<&str> = rows
        .iter()
        .filter(|(_, _, r)| !r.overall_pass)
        .map(|(name, _, _)| *name)
        .collect();
    assert!(failures.is_empty(), "Vectors out of tolerance: {:?}\n\n{}", failures, markdown);
    assert!(markdown.contains("**PASS**"));
}

#[test]
fn test_reference_tone_cross_validates() {
    let dir = tempfile::tempdir().unwrap();
    let config = AnalysisConfig::default();
    let path = wav_in(
        dir.path(),
        "tone.wav",
        &stereo(tone_at(-23.0, 997.0, 2, 10.0)),
        SAMPLE_RATE,
        24,
    );
    let report = LoudnessMeter::new(&config).measure(&load_wav(&path, &config).unwrap());

    assert!(report.cross_validated, "Implementations disagree: {:?}", report);
    let primary = report.integrated_lufs.unwrap();
    let secondary = report.secondary_lufs.unwrap();
    assert!((primary - secondary).abs() <= 0.1, "primary {:.2} vs ebur128 {:.2}", primary, secondary);
    assert!(report.warnings.is_empty());
}

#[test]
fn test_gating_excludes_silence_and_quiet_segments() {
    let dir = tempfile::tempdir().unwrap();
    let config = AnalysisConfig::default();
    let meter = LoudnessMeter::new(&config);

    let plain = wav_in(dir.path(), "plain.wav", &stereo(tone_at(-23.0, 997.0, 2, 10.0)), SAMPLE_RATE, 16);
    let gated = wav_in(
        dir.path(),
        "gated.wav",
        &stereo(concat(&[silence(10.0), tone_at(-23.0, 997.0, 2, 10.0)])),
        SAMPLE_RATE,
        16,
    );
    let plain = meter.measure(&load_wav(&plain, &config).unwrap());
    let gated = meter.measure(&load_wav(&gated, &config).unwrap());

    let difference = (plain.integrated_lufs.unwrap() - gated.integrated_lufs.unwrap()).abs();
    assert!(difference < 0.1, "Absolute gate should ignore silence, moved by {:.3} LU", difference);
    assert!(gated.loudness_range_lu.unwrap() > plain.loudness_range_lu.unwrap());
}
