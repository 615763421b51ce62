//! Signal feature extraction
//!
//! Building blocks shared by the metric families:
//! - Short-time Fourier transform and band-limited inverse
//! - Five-band decomposition
//! - Harmonic-percussive separation
//! - Onset detection

pub mod bands;
pub mod hpss;
pub mod onset;
pub mod stft;
