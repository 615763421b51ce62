//! Per-band metric families
//!
//! Six independent families, each a set of pure functions over one band's
//! time-domain signal or spectral slice:
//! - Level (RMS, peak, level range)
//! - Dynamics (dynamic range, crest factor, RMS)
//! - Spectral shape (centroid, roll-off, flatness, energy)
//! - Stereo image (width, phase correlation, mid/side energy)
//! - Harmonic content (THD, harmonic ratio, inharmonicity)
//! - Transients (transient preservation, attack time)
//!
//! Undefined quantities are `None`, never NaN or infinity.

pub mod dynamics;
pub mod harmonics;
pub mod level;
pub mod spectral;
pub mod stats;
pub mod stereo;
pub mod transients;

pub use dynamics::DynamicsMetrics;
pub use harmonics::HarmonicMetrics;
pub use level::LevelMetrics;
pub use spectral::SpectralMetrics;
pub use stereo::StereoMetrics;
pub use transients::TransientMetrics;
