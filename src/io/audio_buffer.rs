//! Decoded, immutable audio
//!
//! An [`AudioBuffer`] is created once by the loader and read by every later
//! stage. All channels have identical length. For stereo input a mono
//! downmix is kept alongside the channels because the transform and the
//! full-band metrics run on it.

use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};
use crate::preprocessing::channel_mixer::downmix_to_mono;

/// Channel layout of the decoded file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelLayout {
    /// One channel
    Mono,
    /// Two channels (left, right)
    Stereo,
}

impl ChannelLayout {
    /// Number of channels in this layout
    pub fn channel_count(self) -> usize {
        match self {
            ChannelLayout::Mono => 1,
            ChannelLayout::Stereo => 2,
        }
    }
}

/// What the loader found and corrected regarding DC offset
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DcOffsetReport {
    /// True when at least one channel exceeded the threshold and was corrected
    pub detected: bool,
    /// Mean of each channel before correction
    pub channel_means: Vec<f64>,
}

/// Normalized float samples plus format metadata
#[derive(Debug, Clone)]
pub struct AudioBuffer {
    sample_rate: u32,
    bit_depth: u16,
    layout: ChannelLayout,
    channels: Vec<Vec<f32>>,
    downmix: Option<Vec<f32>>,
    dc_offset: DcOffsetReport,
}

impl AudioBuffer {
    /// Build a buffer from per-channel samples
    ///
    /// # Arguments
    ///
    /// * `channels` - One (mono) or two (stereo) equal-length channels in [-1.0, 1.0]
    /// * `sample_rate` - Sample rate in Hz
    /// * `bit_depth` - Source bit depth (informational once decoded)
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidInput` if the channel count is not 1 or 2,
    /// the channels differ in length, or the sample rate is zero.
    pub fn new(channels: Vec<Vec<f32>>, sample_rate: u32, bit_depth: u16) -> Result<Self> {
        let layout = match channels.len() {
            1 => ChannelLayout::Mono,
            2 => ChannelLayout::Stereo,
            n => {
                return Err(AnalysisError::InvalidInput(format!(
                    "Expected 1 or 2 channels, got {}",
                    n
                )))
            }
        };

        if sample_rate == 0 {
            return Err(AnalysisError::InvalidInput(
                "Sample rate must be > 0".to_string(),
            ));
        }

        if channels.iter().any(|c| c.len() != channels[0].len()) {
            return Err(AnalysisError::InvalidInput(
                "All channels must have the same length".to_string(),
            ));
        }

        let downmix = match layout {
            ChannelLayout::Mono => None,
            ChannelLayout::Stereo => Some(downmix_to_mono(&channels[0], &channels[1])?),
        };

        Ok(Self {
            sample_rate,
            bit_depth,
            layout,
            channels,
            downmix,
            dc_offset: DcOffsetReport::default(),
        })
    }

    /// Attach the loader's DC offset findings
    pub(crate) fn with_dc_offset(mut self, report: DcOffsetReport) -> Self {
        self.dc_offset = report;
        self
    }

    /// Sample rate in Hz
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Source bit depth
    pub fn bit_depth(&self) -> u16 {
        self.bit_depth
    }

    /// Channel layout
    pub fn layout(&self) -> ChannelLayout {
        self.layout
    }

    /// Number of channels (1 or 2)
    pub fn channel_count(&self) -> usize {
        self.layout.channel_count()
    }

    /// Samples per channel
    pub fn len(&self) -> usize {
        self.channels[0].len()
    }

    /// True when the buffer holds no samples
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Duration in seconds
    pub fn duration_seconds(&self) -> f64 {
        self.len() as f64 / self.sample_rate as f64
    }

    /// All channels
    pub fn channels(&self) -> &[Vec<f32>] {
        &self.channels
    }

    /// Single channel by index
    pub fn channel(&self, index: usize) -> Option<&[f32]> {
        self.channels.get(index).map(Vec::as_slice)
    }

    /// `(left, right)` for stereo buffers, `None` for mono
    pub fn stereo_pair(&self) -> Option<(&[f32], &[f32])> {
        match self.layout {
            ChannelLayout::Stereo => Some((&self.channels[0], &self.channels[1])),
            ChannelLayout::Mono => None,
        }
    }

    /// Mono view: the only channel, or the (L + R) / 2 downmix
    pub fn mono(&self) -> &[f32] {
        self.downmix.as_deref().unwrap_or(&self.channels[0])
    }

    /// DC offset findings from the loader
    pub fn dc_offset(&self) -> &DcOffsetReport {
        &self.dc_offset
    }

    /// Interleaved frames (L R L R ...) as expected by frame-based meters
    pub fn interleaved(&self) -> Vec<f32> {
        match self.stereo_pair() {
            None => self.channels[0].clone(),
            Some((left, right)) => left
                .iter()
                .zip(right.iter())
                .flat_map(|(&l, &r)| [l, r])
                .collect(),
        }
    }
}
