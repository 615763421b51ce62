//! Shared helpers for integration tests: synthetic signals and WAV writing

#![allow(dead_code)]

use std::f64::consts::PI;
use std::path::{Path, PathBuf};

/// Sine at `amplitude` (linear), starting at phase 0
pub fn sine(freq: f64, amplitude: f64, sample_rate: u32, seconds: f64) -> Vec<f64> {
    let n = (seconds * sample_rate as f64).round() as usize;
    (0..n)
        .map(|i| amplitude * (2.0 * PI * freq * i as f64 / sample_rate as f64).sin())
        .collect()
}

/// Deterministic uniform white noise in [-amplitude, amplitude]
pub fn white_noise(len: usize, amplitude: f64, seed: u64) -> Vec<f64> {
    let mut state = seed;
    (0..len)
        .map(|_| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            let unit = (state >> 11) as f64 / (1u64 << 53) as f64;
            amplitude * (unit * 2.0 - 1.0)
        })
        .collect()
}

/// Write integer PCM; samples are clamped to [-1, 1] and scaled by full scale - 1
pub fn write_wav(path: &Path, channels: &[Vec<f64>], sample_rate: u32, bits: u16) {
    let spec = hound::WavSpec {
        channels: channels.len() as u16,
        sample_rate,
        bits_per_sample: bits,
        sample_format: hound::SampleFormat::Int,
    };
    let scale = ((1i64 << (bits - 1)) - 1) as f64;
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for i in 0..channels[0].len() {
        for channel in channels {
            let value = (channel[i].clamp(-1.0, 1.0) * scale).round() as i32;
            writer.write_sample(value).unwrap();
        }
    }
    writer.finalize().unwrap();
}

/// Write into `dir` and return the path
pub fn wav_in(dir: &Path, name: &str, channels: &[Vec<f64>], sample_rate: u32, bits: u16) -> PathBuf {
    let path = dir.join(name);
    write_wav(&path, channels, sample_rate, bits);
    path
}

/// Install a test logger once; repeated calls are harmless
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
