//! Analysis orchestration and result aggregation
//!
//! Drives one run through the pipeline and assembles:
//! - Per-band metric records with partial-failure markers
//! - Whole-file aggregates and advisory warnings
//! - Run metadata

pub mod aggregate;
pub mod orchestrator;
pub mod result;

pub use orchestrator::{Analyzer, AnalysisState, CancellationToken};
pub use result::{
    AnalysisMetadata, AnalysisResult, AnalysisWarning, BandMetrics, BandReport, BandStatus,
    OverallMetrics, WarningKind,
};
