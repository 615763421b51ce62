//! Onset detection
//!
//! Energy flux peak picking, used to locate attacks for transient timing.

pub mod energy_flux;

pub use energy_flux::detect_energy_flux_onsets;
