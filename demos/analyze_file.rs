//! Example: Analyze a single WAV file
//!
//! Prints per-band metrics and loudness, then the full result as JSON.
//!
//! ```text
//! cargo run --example analyze_file -- mix.wav [genre]
//! ```

use mastering_dsp::similarity::features_for;
use mastering_dsp::{analyze_file, AnalysisConfig, AnalysisSettings};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let path = args.next().ok_or("usage: analyze_file <file.wav> [genre]")?;
    let settings = AnalysisSettings {
        genre: args.next().unwrap_or_else(|| "pop".to_string()),
        ..AnalysisSettings::default()
    };

    let result = analyze_file(&path, "demo", &settings, AnalysisConfig::default(), |band, percent| {
        eprintln!("  {:>8} {:>3}%", band, percent);
    })?;

    println!("Analysis Results:");
    for band in &result.band_metrics {
        println!(
            "  {:>8}: rms {:>8} dBFS  centroid {:>8} Hz  width {:>6} %",
            band.band,
            fmt(band.level.rms_dbfs),
            fmt(band.spectral.centroid_hz),
            fmt(band.stereo.width_percent)
        );
    }

    let overall = &result.overall_metrics;
    println!("  Integrated: {} LUFS", fmt(overall.integrated_lufs));
    println!("  LRA: {} LU", fmt(overall.loudness_range_lu));
    println!("  True peak: {} dBTP", fmt(overall.true_peak_dbfs));
    println!("  Cross-validated: {}", overall.loudness_cross_validated);
    for warning in overall.warnings() {
        println!("  Warning: {}", warning.message);
    }
    println!("  Processing time: {:.2} ms", result.metadata.processing_time_ms);

    let vector = features_for(&result);
    println!("  Feature vector: {} values", vector.len());

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn fmt(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{:.2}", v))
}
