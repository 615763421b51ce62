//! Precision validation of loudness measurements against golden values
//!
//! Tolerances follow professional metering practice: ±0.1 LU integrated
//! loudness, ±0.2 dB true peak, ±0.2 LU loudness range. A metric that is
//! undefined in both the measurement and the expectation (silence) passes.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::loudness::LoudnessReport;

/// Integrated loudness tolerance (LU)
pub const LUFS_TOLERANCE: f64 = 0.1;

/// True peak tolerance (dB)
pub const TRUE_PEAK_TOLERANCE: f64 = 0.2;

/// Loudness range tolerance (LU)
pub const LRA_TOLERANCE: f64 = 0.2;

/// Expected values for one test vector; `None` means undefined
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ExpectedLoudness {
    /// Integrated loudness (LUFS)
    pub integrated_lufs: Option<f64>,
    /// True peak (dBFS)
    pub true_peak_dbfs: Option<f64>,
    /// Loudness range (LU)
    pub loudness_range_lu: Option<f64>,
}

/// A named reference signal and its expected measurements
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GoldenVector {
    /// WAV file name in the corpus
    pub file_name: &'static str,
    /// What the signal is
    pub description: &'static str,
    /// Expected measurements
    pub expected: ExpectedLoudness,
}

const fn golden(
    file_name: &'static str,
    description: &'static str,
    integrated_lufs: Option<f64>,
    true_peak_dbfs: Option<f64>,
    loudness_range_lu: Option<f64>,
) -> GoldenVector {
    GoldenVector {
        file_name,
        description,
        expected: ExpectedLoudness {
            integrated_lufs,
            true_peak_dbfs,
            loudness_range_lu,
        },
    }
}

/// Reference corpus (48 kHz, 16-bit)
///
/// Values follow from the signal definitions under BS.1770-4 / EBU Tech 3341
/// and 3342. The 1 kHz vectors were calibrated to the loudness target, so
/// their peak sits 0.05 dB above the 997 Hz equivalents.
pub const GOLDEN_CORPUS: [GoldenVector; 13] = [
    golden("sine_440hz.wav", "Full-scale 440 Hz sine, 3 s, mono", Some(-3.69), Some(0.0), Some(0.0)),
    golden(
        "sine_1khz_stereo.wav",
        "Full-scale 1 kHz sine, 3 s, stereo",
        Some(0.01),
        Some(0.0),
        Some(0.0),
    ),
    golden("silence.wav", "Digital silence, 2 s, mono", None, Some(-120.0), None),
    golden(
        "ebu_r128_stereo_997hz_23lufs.wav",
        "Stereo 997 Hz at -23 LUFS, 20 s",
        Some(-23.0),
        Some(-23.0),
        Some(0.0),
    ),
    golden(
        "ebu_r128_stereo_997hz_33lufs.wav",
        "Stereo 997 Hz at -33 LUFS, 20 s",
        Some(-33.0),
        Some(-33.0),
        Some(0.0),
    ),
    golden(
        "ebu_r128_mono_997hz_23lufs.wav",
        "Mono 997 Hz at -23 LUFS, 20 s",
        Some(-23.0),
        Some(-19.99),
        Some(0.0),
    ),
    golden(
        "ebu_r128_gate_test.wav",
        "10 s silence then 10 s stereo 997 Hz at -23 LUFS",
        Some(-23.0),
        Some(-23.0),
        Some(4.4),
    ),
    golden(
        "ebu_r128_lra_test.wav",
        "Stereo 997 Hz alternating -20 / -30 LUFS in 5 s segments, 60 s",
        Some(-22.6),
        Some(-20.0),
        Some(10.0),
    ),
    golden(
        "ebu_r128_tone_stereo_23lufs.wav",
        "Stereo 1 kHz at -23 LUFS, 10 s",
        Some(-23.0),
        Some(-22.95),
        Some(0.0),
    ),
    golden(
        "ebu_r128_tone_stereo_33lufs.wav",
        "Stereo 1 kHz at -33 LUFS, 10 s",
        Some(-33.0),
        Some(-32.95),
        Some(0.0),
    ),
    golden(
        "ebu_r128_tone_mono_23lufs.wav",
        "Mono 1 kHz at -23 LUFS, 10 s",
        Some(-23.0),
        Some(-19.95),
        Some(0.0),
    ),
    golden(
        "ebu_r128_tone_with_silence.wav",
        "10 s stereo 1 kHz at -23 LUFS then 10 s silence",
        Some(-23.0),
        Some(-22.95),
        Some(4.4),
    ),
    golden(
        "ebu_r128_two_tones.wav",
        "10 s stereo 1 kHz at -36 LUFS then 10 s at -23 LUFS",
        Some(-23.0),
        Some(-22.95),
        Some(13.0),
    ),
];

/// Look up a corpus entry by file name
pub fn golden_vector(file_name: &str) -> Option<&'static GoldenVector> {
    GOLDEN_CORPUS.iter().find(|v| v.file_name == file_name)
}

/// Outcome of validating one measurement
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// Integrated loudness within tolerance
    pub lufs_pass: bool,
    /// True peak within tolerance
    pub true_peak_pass: bool,
    /// Loudness range within tolerance
    pub lra_pass: bool,
    /// `|computed - expected|` LUFS (infinite when only one side is defined)
    pub lufs_diff: f64,
    /// `|computed - expected|` true peak
    pub true_peak_diff: f64,
    /// `|computed - expected|` LRA
    pub lra_diff: f64,
    /// Measured integrated loudness
    pub lufs_computed: Option<f64>,
    /// Measured true peak
    pub true_peak_computed: Option<f64>,
    /// Measured loudness range
    pub lra_computed: Option<f64>,
    /// All three metrics pass
    pub overall_pass: bool,
}

/// Compare one value against its expectation
///
/// Returns `(passed, absolute difference)`. Both undefined passes with a
/// difference of 0; exactly one undefined, or a non-finite value, fails with
/// an infinite difference.
pub fn check_metric(computed: Option<f64>, expected: Option<f64>, tolerance: f64) -> (bool, f64) {
    match (computed, expected) {
        (None, None) => (true, 0.0),
        (Some(c), Some(e)) if c.is_finite() && e.is_finite() => {
            let diff = (c - e).abs();
            // Guard against representation error at exactly the tolerance
            (diff <= tolerance + 1e-9, diff)
        }
        _ => (false, f64::INFINITY),
    }
}

/// Validate a loudness report against expected values
pub fn validate(report: &LoudnessReport, expected: &ExpectedLoudness) -> ValidationResult {
    let (lufs_pass, lufs_diff) = check_metric(report.integrated_lufs, expected.integrated_lufs, LUFS_TOLERANCE);
    let (true_peak_pass, true_peak_diff) =
        check_metric(report.true_peak_dbfs, expected.true_peak_dbfs, TRUE_PEAK_TOLERANCE);
    let (lra_pass, lra_diff) = check_metric(report.loudness_range_lu, expected.loudness_range_lu, LRA_TOLERANCE);

    let result = ValidationResult {
        lufs_pass,
        true_peak_pass,
        lra_pass,
        lufs_diff,
        true_peak_diff,
        lra_diff,
        lufs_computed: report.integrated_lufs,
        true_peak_computed: report.true_peak_dbfs,
        lra_computed: report.loudness_range_lu,
        overall_pass: lufs_pass && true_peak_pass && lra_pass,
    };

    log::info!(
        "Validation: LUFS {} (diff={:.3}), TP {} (diff={:.3}), LRA {} (diff={:.3}) => {}",
        status(lufs_pass),
        lufs_diff,
        status(true_peak_pass),
        true_peak_diff,
        status(lra_pass),
        lra_diff,
        status(result.overall_pass)
    );
    result
}

fn status(pass: bool) -> &'static str {
    if pass {
        "PASS"
    } else {
        "FAIL"
    }
}

fn fmt_value(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.2}", v),
        None => "N/A".to_string(),
    }
}

/// Markdown report over `(file name, expected, result)` rows, in the given order
pub fn generate_report(rows: &[(&str, ExpectedLoudness, ValidationResult)]) -> String {
    let total = rows.len();
    let passed = rows.iter().filter(|(_, _, r)| r.overall_pass).count();

    let mut out = String::new();
    out.push_str("# Loudness Metering Precision Validation Report\n\n");
    out.push_str("## Summary\n\n");
    let _ = writeln!(out, "- **Total test vectors:** {}", total);
    let _ = writeln!(out, "- **Passed:** {}", passed);
    let _ = writeln!(out, "- **Failed:** {}", total - passed);
    if total > 0 {
        let _ = writeln!(out, "- **Pass rate:** {:.0}%", passed as f64 / total as f64 * 100.0);
    } else {
        out.push_str("- N/A\n");
    }
    out.push('\n');

    out.push_str("## Tolerances\n\n");
    out.push_str("| Metric | Tolerance |\n");
    out.push_str("|--------|-----------|\n");
    let _ = writeln!(out, "| Integrated LUFS | +/- {} LU |", LUFS_TOLERANCE);
    let _ = writeln!(out, "| True Peak | +/- {} dB |", TRUE_PEAK_TOLERANCE);
    let _ = writeln!(out, "| Loudness Range | +/- {} LU |", LRA_TOLERANCE);
    out.push('\n');

    out.push_str("## Detailed Results\n\n");
    out.push_str("| Test File | Metric | Expected | Computed | Delta | Status |\n");
    out.push_str("|-----------|--------|----------|----------|-------|--------|\n");
    for (file_name, expected, result) in rows {
        let _ = writeln!(
            out,
            "| {} | LUFS | {} | {} | {:.3} | {} |",
            file_name,
            fmt_value(expected.integrated_lufs),
            fmt_value(result.lufs_computed),
            result.lufs_diff,
            status(result.lufs_pass)
        );
        let _ = writeln!(
            out,
            "| | True Peak | {} | {} | {:.3} | {} |",
            fmt_value(expected.true_peak_dbfs),
            fmt_value(result.true_peak_computed),
            result.true_peak_diff,
            status(result.true_peak_pass)
        );
        let _ = writeln!(
            out,
            "| | LRA | {} | {} | {:.3} | {} |",
            fmt_value(expected.loudness_range_lu),
            fmt_value(result.lra_computed),
            result.lra_diff,
            status(result.lra_pass)
        );
    }
    out.push('\n');

    let all_pass = rows.iter().all(|(_, _, r)| r.overall_pass);
    out.push_str("## Overall Verdict\n\n");
    let _ = writeln!(
        out,
        "**{}** - {} test vectors are within professional-grade tolerances.",
        status(all_pass),
        if all_pass { "All" } else { "Not all" }
    );
    out
}
