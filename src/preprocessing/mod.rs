//! Audio preprocessing modules
//!
//! Utilities applied to decoded audio before and alongside analysis:
//! - DC offset measurement and removal
//! - Channel mixing (stereo to mono)
//! - Silence and clipping detection

pub mod channel_mixer;
pub mod dc_offset;
pub mod edge_cases;
