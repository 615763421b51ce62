//! DC offset measurement and removal
//!
//! The mean of each channel is measured in f64. Channels whose absolute mean
//! exceeds the threshold have it subtracted; the report records every mean
//! and whether any correction happened.

use crate::io::audio_buffer::DcOffsetReport;

/// Mean of a channel, accumulated in f64
pub fn channel_mean(samples: &[f32]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().map(|&x| x as f64).sum::<f64>() / samples.len() as f64
}

/// Remove DC offset in place from every channel above `threshold`
///
/// # Arguments
///
/// * `channels` - Channel sample vectors, modified in place
/// * `threshold` - Absolute mean (linear) above which a channel is corrected
///
/// # Returns
///
/// Report with the pre-correction mean of every channel
pub fn remove_dc_offset(channels: &mut [Vec<f32>], threshold: f64) -> DcOffsetReport {
    let mut report = DcOffsetReport {
        detected: false,
        channel_means: Vec::with_capacity(channels.len()),
    };

    for (index, channel) in channels.iter_mut().enumerate() {
        let mean = channel_mean(channel);
        report.channel_means.push(mean);

        if mean.abs() > threshold {
            log::debug!("Channel {} DC offset {:.6}, removing", index, mean);
            let offset = mean as f32;
            for sample in channel.iter_mut() {
                *sample -= offset;
            }
            report.detected = true;
        }
    }

    report
}
