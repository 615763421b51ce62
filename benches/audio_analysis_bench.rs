//! Performance benchmarks for audio analysis

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use mastering_dsp::features::bands::decompose;
use mastering_dsp::features::stft::compute_transforms;
use mastering_dsp::{AnalysisConfig, AnalysisSettings, Analyzer, AudioBuffer, LoudnessMeter};

/// 30 seconds of stereo audio at 48 kHz: a tone on the left, a detuned tone on the right
fn stereo_buffer() -> AudioBuffer {
    let len = 48000 * 30;
    let left: Vec<f32> = (0..len)
        .map(|i| (i as f32 * 440.0 * 2.0 * std::f32::consts::PI / 48000.0).sin() * 0.5)
        .collect();
    let right: Vec<f32> = (0..len)
        .map(|i| (i as f32 * 443.0 * 2.0 * std::f32::consts::PI / 48000.0).sin() * 0.5)
        .collect();
    AudioBuffer::new(vec![left, right], 48000, 24).unwrap()
}

fn bench_transform_and_decompose(c: &mut Criterion) {
    let buffer = stereo_buffer();
    c.bench_function("transform_decompose_30s", |b| {
        b.iter(|| decompose(&compute_transforms(black_box(&buffer))));
    });
}

fn bench_loudness(c: &mut Criterion) {
    let buffer = stereo_buffer();
    let meter = LoudnessMeter::new(&AnalysisConfig::default());
    c.bench_function("loudness_30s", |b| {
        b.iter(|| meter.measure(black_box(&buffer)));
    });
}

fn bench_full_analysis(c: &mut Criterion) {
    let buffer = stereo_buffer();
    let settings = AnalysisSettings::default();
    let mut group = c.benchmark_group("analysis");
    group.sample_size(10);
    group.bench_function("analyze_buffer_30s", |b| {
        b.iter(|| {
            let _ = Analyzer::default().analyze_buffer(black_box(&buffer), "bench", &settings, |_, _| {});
        });
    });
    group.finish();
}

criterion_group!(benches, bench_transform_and_decompose, bench_loudness, bench_full_analysis);
criterion_main!(benches);
