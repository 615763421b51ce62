//! Audio I/O modules
//!
//! WAV decoding using hound and the immutable decoded buffer.

pub mod audio_buffer;
pub mod decoder;

pub use audio_buffer::{AudioBuffer, ChannelLayout, DcOffsetReport};
pub use decoder::{load_wav, load_wav_from_reader};
