//! Analysis run state machine
//!
//! One run goes `Loading → Transforming → Band(low) … Band(high) → Aggregating
//! → Done`, with `Failed` reachable from every state. Loading and
//! transforming failures abort the run. A failure inside one band is recorded
//! in that band's slot and the remaining bands still run.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::analysis::aggregate::{overall_metrics, BandAccumulator, FullSpectrum};
use crate::analysis::result::{AnalysisMetadata, AnalysisResult, BandMetrics};
use crate::config::{is_known_genre, AnalysisConfig, AnalysisSettings};
use crate::error::{AnalysisError, Result};
use crate::features::bands::{decompose, BandId, BandSlice};
use crate::features::hpss::{self, HpssEnergies};
use crate::features::stft::compute_transforms;
use crate::io::{load_wav, AudioBuffer};
use crate::loudness::LoudnessMeter;
use crate::metrics::spectral::centroid_and_bandwidth;
use crate::metrics::{
    DynamicsMetrics, HarmonicMetrics, LevelMetrics, SpectralMetrics, StereoMetrics, TransientMetrics,
};

/// Where a run currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisState {
    /// Not started
    Idle,
    /// Decoding the input
    Loading,
    /// Computing the shared transforms and band reconstructions
    Transforming,
    /// Computing one band's metrics
    Band(BandId),
    /// Computing overall metrics and loudness
    Aggregating,
    /// Finished with a result
    Done,
    /// Aborted with an error
    Failed,
}

/// Cooperative cancellation flag shared between a run and its controller
///
/// Cloning is cheap; every clone observes the same flag. The orchestrator
/// checks it before each band and before aggregation.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    /// Fresh, not cancelled
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// True once [`cancel`](Self::cancel) has been called on any clone
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Runs analyses with one configuration
#[derive(Debug, Clone)]
pub struct Analyzer {
    config: AnalysisConfig,
    cancellation: CancellationToken,
    state: AnalysisState,
}

impl Analyzer {
    /// Create an analyzer
    pub fn new(config: AnalysisConfig) -> Self {
        Self {
            config,
            cancellation: CancellationToken::new(),
            state: AnalysisState::Idle,
        }
    }

    /// Use `token` to cancel runs from another thread
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Configuration in use
    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Token observed by this analyzer
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    /// State of the current or last run
    pub fn state(&self) -> AnalysisState {
        self.state
    }

    /// Load `path` and analyze it
    ///
    /// `on_progress(band, percent)` fires once per band in low-to-high order
    /// with percent 20, 40, 60, 80, 100.
    ///
    /// # Errors
    ///
    /// Loader errors, `AnalysisError::Cancelled`, or a `ProcessingError` if
    /// aggregation cannot complete. Errors inside a single band are not
    /// returned; they are recorded on that band.
    pub fn analyze<P, F>(
        &mut self,
        path: P,
        analysis_id: &str,
        settings: &AnalysisSettings,
        on_progress: F,
    ) -> Result<AnalysisResult>
    where
        P: AsRef<Path>,
        F: FnMut(BandId, u8),
    {
        let start = Instant::now();
        self.state = AnalysisState::Loading;
        log::debug!("Analysis {}: loading {}", analysis_id, path.as_ref().display());

        let buffer = match load_wav(path, &self.config) {
            Ok(buffer) => buffer,
            Err(err) => {
                self.state = AnalysisState::Failed;
                log::warn!("Analysis {} failed while loading: {}", analysis_id, err);
                return Err(err);
            }
        };

        self.run(&buffer, analysis_id, settings, on_progress, start, compute_band_metrics)
    }

    /// Analyze an already-decoded buffer
    ///
    /// # Errors
    ///
    /// Same as [`analyze`](Self::analyze) minus loader errors.
    pub fn analyze_buffer<F>(
        &mut self,
        buffer: &AudioBuffer,
        analysis_id: &str,
        settings: &AnalysisSettings,
        on_progress: F,
    ) -> Result<AnalysisResult>
    where
        F: FnMut(BandId, u8),
    {
        self.run(buffer, analysis_id, settings, on_progress, Instant::now(), compute_band_metrics)
    }

    fn run<F, M>(
        &mut self,
        buffer: &AudioBuffer,
        analysis_id: &str,
        settings: &AnalysisSettings,
        on_progress: F,
        start: Instant,
        metrics_for_band: M,
    ) -> Result<AnalysisResult>
    where
        F: FnMut(BandId, u8),
        M: Fn(&BandSlice, &HpssEnergies, &AnalysisConfig) -> Result<BandMetrics>,
    {
        let outcome = self.run_stages(buffer, analysis_id, settings, on_progress, start, metrics_for_band);
        self.state = match &outcome {
            Ok(_) => AnalysisState::Done,
            Err(err) => {
                log::warn!("Analysis {} failed: {}", analysis_id, err);
                AnalysisState::Failed
            }
        };
        outcome
    }

    fn run_stages<F, M>(
        &mut self,
        buffer: &AudioBuffer,
        analysis_id: &str,
        settings: &AnalysisSettings,
        mut on_progress: F,
        start: Instant,
        metrics_for_band: M,
    ) -> Result<AnalysisResult>
    where
        F: FnMut(BandId, u8),
        M: Fn(&BandSlice, &HpssEnergies, &AnalysisConfig) -> Result<BandMetrics>,
    {
        if !is_known_genre(&settings.genre) {
            log::warn!("Unknown genre '{}'; similarity ranking may be empty", settings.genre);
        }

        self.state = AnalysisState::Transforming;
        let transform_start = Instant::now();
        let transforms = compute_transforms(buffer);
        let (centroid_hz, bandwidth_hz) = centroid_and_bandwidth(&transforms.mono.view());
        let spectrum = FullSpectrum {
            centroid_hz,
            bandwidth_hz,
        };
        let separation = hpss::separate_bins(
            &transforms.mono.view(),
            self.config.hpss_kernel,
            self.config.hpss_margin,
        );
        let slices = decompose(&transforms);
        drop(transforms);
        log::debug!(
            "Transform and decomposition took {:.2} ms",
            transform_start.elapsed().as_secs_f64() * 1000.0
        );

        let mut accumulator = BandAccumulator::new();
        let total = slices.len();
        for (i, slice) in slices.iter().enumerate() {
            self.check_cancelled()?;
            let band = slice.id();
            self.state = AnalysisState::Band(band);

            if slice.is_empty() {
                log::info!("Band '{}' has no bins or frames; metrics are null", band);
                accumulator.record_empty(band);
            } else {
                let separated = separation.sum(slice.bins.clone());
                match metrics_for_band(slice, &separated, &self.config) {
                    Ok(metrics) => {
                        log::info!(
                            "Band '{}': rms {:?} dBFS, centroid {:?} Hz",
                            band,
                            metrics.level.rms_dbfs,
                            metrics.spectral.centroid_hz
                        );
                        accumulator.record_ok(metrics);
                    }
                    Err(err) => {
                        log::warn!("Band '{}' failed: {}", band, err);
                        accumulator.record_failure(band, err.to_string());
                    }
                }
            }

            let percent = (((i + 1) * 100) / total) as u8;
            on_progress(band, percent);
        }
        drop(slices);
        drop(separation);

        self.check_cancelled()?;
        self.state = AnalysisState::Aggregating;
        let (band_metrics, band_status) = accumulator.finish()?;
        let loudness = LoudnessMeter::new(&self.config).measure(buffer);
        let overall = overall_metrics(buffer, &band_metrics, spectrum, &loudness, &self.config);

        let processing_time_ms = start.elapsed().as_secs_f64() * 1000.0;
        log::info!(
            "Analysis {} complete in {:.2} ms ({} warnings)",
            analysis_id,
            processing_time_ms,
            overall.warnings().len()
        );

        Ok(AnalysisResult {
            analysis_id: analysis_id.to_string(),
            band_metrics,
            overall_metrics: overall,
            metadata: AnalysisMetadata {
                duration_seconds: buffer.duration_seconds(),
                sample_rate: buffer.sample_rate(),
                bit_depth: buffer.bit_depth(),
                channels: buffer.channel_count(),
                processing_time_ms,
                algorithm_version: env!("CARGO_PKG_VERSION").to_string(),
                settings: settings.clone(),
                band_status,
            },
        })
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.cancellation.is_cancelled() {
            log::info!("Analysis cancelled in state {:?}", self.state);
            return Err(AnalysisError::Cancelled);
        }
        Ok(())
    }
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new(AnalysisConfig::default())
    }
}

/// All six metric families for one non-empty band
///
/// `separated` holds the band's share of the full-spectrum harmonic/percussive
/// separation (see [`hpss::BinEnergies::sum`]).
///
/// # Errors
///
/// Propagates metric failures, and returns `AnalysisError::NumericalError`
/// when any value comes out non-finite.
pub fn compute_band_metrics(
    slice: &BandSlice,
    separated: &HpssEnergies,
    config: &AnalysisConfig,
) -> Result<BandMetrics> {
    let samples = slice.signals.mono.as_slice();
    let sample_rate = slice.sample_rate;
    let view = slice.view();

    let metrics = BandMetrics {
        level: LevelMetrics::compute(samples, sample_rate, config.level_range_frame_ms),
        dynamics: DynamicsMetrics::compute(samples),
        spectral: SpectralMetrics::compute(&view),
        stereo: StereoMetrics::compute(slice.stereo_pair()),
        harmonics: HarmonicMetrics::compute(samples, sample_rate, separated),
        transients: TransientMetrics::compute(samples, sample_rate, separated, config)?,
        ..BandMetrics::empty(&slice.definition)
    };

    if let Some(field) = metrics.first_non_finite() {
        return Err(AnalysisError::NumericalError(format!(
            "{} produced a non-finite {}",
            slice.id(),
            field
        )));
    }
    Ok(metrics)
}
