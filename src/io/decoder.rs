//! WAV decoding using hound
//!
//! Accepts RIFF/WAVE containers holding integer PCM at 16 or 24 bits,
//! 44.1 or 48 kHz, mono or stereo. Samples are normalized by the full-scale
//! value of the bit depth, DC offset is measured and removed per channel, and
//! the result is returned as an immutable [`AudioBuffer`].
//!
//! # Example
//!
//! ```no_run
//! use mastering_dsp::io::decoder::load_wav;
//! use mastering_dsp::AnalysisConfig;
//!
//! let buffer = load_wav("mix.wav", &AnalysisConfig::default())?;
//! println!("{} Hz, {:.1} s", buffer.sample_rate(), buffer.duration_seconds());
//! # Ok::<(), mastering_dsp::AnalysisError>(())
//! ```

use std::fs::File;
use std::io::{BufReader, Cursor, Read};
use std::path::Path;

use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, Result};
use crate::io::audio_buffer::AudioBuffer;
use crate::preprocessing::dc_offset::remove_dc_offset;

/// Sample rates the analysis pipeline accepts
pub const SUPPORTED_SAMPLE_RATES: [u32; 2] = [44100, 48000];

/// PCM bit depths the analysis pipeline accepts
pub const SUPPORTED_BIT_DEPTHS: [u16; 2] = [16, 24];

/// Decode a WAV file from disk
///
/// # Arguments
///
/// * `path` - Path to the WAV file
/// * `config` - Analysis configuration (DC offset threshold)
///
/// # Errors
///
/// - `UnsupportedFormat` when the container is not RIFF/WAVE integer PCM
/// - `UnsupportedSampleRate` / `UnsupportedBitDepth` / `UnsupportedChannelCount`
/// - `CorruptFile` on malformed headers or truncated sample data
/// - `Io` when the file cannot be opened
pub fn load_wav<P: AsRef<Path>>(path: P, config: &AnalysisConfig) -> Result<AudioBuffer> {
    let path = path.as_ref();
    log::debug!("Decoding audio file: {}", path.display());

    let file = File::open(path)?;
    let buffer = load_wav_from_reader(BufReader::new(file), config)?;

    log::info!(
        "Loaded {}: {} Hz, {}-bit, {} ch, {:.2} s",
        path.display(),
        buffer.sample_rate(),
        buffer.bit_depth(),
        buffer.channel_count(),
        buffer.duration_seconds()
    );

    Ok(buffer)
}

/// Decode a WAV byte stream
///
/// Same contract as [`load_wav`] for callers that hold the bytes in memory
/// or receive them over a stream.
pub fn load_wav_from_reader<R: Read>(mut reader: R, config: &AnalysisConfig) -> Result<AudioBuffer> {
    let header = read_header(&mut reader)?;
    check_magic(&header)?;

    let wav = hound::WavReader::new(Cursor::new(header).chain(reader))?;
    let spec = wav.spec();

    if spec.sample_format != hound::SampleFormat::Int {
        return Err(AnalysisError::UnsupportedFormat(
            "floating-point WAV is not supported, expected integer PCM".to_string(),
        ));
    }
    if !SUPPORTED_SAMPLE_RATES.contains(&spec.sample_rate) {
        return Err(AnalysisError::UnsupportedSampleRate(spec.sample_rate));
    }
    if !SUPPORTED_BIT_DEPTHS.contains(&spec.bits_per_sample) {
        return Err(AnalysisError::UnsupportedBitDepth(spec.bits_per_sample));
    }
    if !(1..=2).contains(&spec.channels) {
        return Err(AnalysisError::UnsupportedChannelCount(spec.channels));
    }

    let channel_count = spec.channels as usize;
    let full_scale = (1u32 << (spec.bits_per_sample - 1)) as f32;
    let frames = wav.duration() as usize;

    let mut channels = vec![Vec::with_capacity(frames); channel_count];
    for (index, sample) in wav.into_samples::<i32>().enumerate() {
        // hound reports a short data chunk as a generic I/O error
        let sample = sample.map_err(|err| match err {
            hound::Error::IoError(io) => {
                AnalysisError::CorruptFile(format!("sample data ends early at sample {}: {}", index, io))
            }
            other => AnalysisError::from(other),
        })?;
        let value = sample as f32 / full_scale;
        channels[index % channel_count].push(value);
    }

    // A trailing partial frame means the data chunk was cut mid-frame
    if channels.iter().any(|c| c.len() != channels[0].len()) {
        return Err(AnalysisError::CorruptFile(
            "data chunk ends inside a sample frame".to_string(),
        ));
    }

    let dc_report = remove_dc_offset(&mut channels, config.dc_offset_threshold);
    if dc_report.detected {
        log::warn!(
            "DC offset detected and removed (channel means: {:?})",
            dc_report.channel_means
        );
    }

    Ok(AudioBuffer::new(channels, spec.sample_rate, spec.bits_per_sample)?.with_dc_offset(dc_report))
}

/// Read the 12-byte RIFF header, tolerating short reads
fn read_header<R: Read>(reader: &mut R) -> Result<Vec<u8>> {
    let mut header = Vec::with_capacity(12);
    reader.by_ref().take(12).read_to_end(&mut header)?;
    Ok(header)
}

fn check_magic(header: &[u8]) -> Result<()> {
    if header.len() < 4 || &header[0..4] != b"RIFF" {
        return Err(AnalysisError::UnsupportedFormat(
            "not a RIFF/WAVE container".to_string(),
        ));
    }
    if header.len() < 12 {
        return Err(AnalysisError::CorruptFile("truncated RIFF header".to_string()));
    }
    if &header[8..12] != b"WAVE" {
        return Err(AnalysisError::UnsupportedFormat(
            "RIFF container is not WAVE".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wav_bytes(spec: hound::WavSpec, samples: &[i32]) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for &s in samples {
                writer.write_sample(s).unwrap();
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    fn spec(channels: u16, sample_rate: u32, bits: u16) -> hound::WavSpec {
        hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: bits,
            sample_format: hound::SampleFormat::Int,
        }
    }

    #[test]
    fn test_decode_16bit_stereo_normalization() {
        let bytes = wav_bytes(spec(2, 48000, 16), &[16384, -16384, -32768, 32767]);
        let buffer = load_wav_from_reader(Cursor::new(bytes), &AnalysisConfig {
            dc_offset_threshold: 1.0,
            ..AnalysisConfig::default()
        })
        .unwrap();

        assert_eq!(buffer.channel_count(), 2);
        assert_eq!(buffer.len(), 2);
        let left = buffer.channel(0).unwrap();
        let right = buffer.channel(1).unwrap();
        assert!((left[0] - 0.5).abs() < 1e-6);
        assert!((right[0] + 0.5).abs() < 1e-6);
        assert!((left[1] + 1.0).abs() < 1e-6);
        assert!(right[1] < 1.0);
    }

    #[test]
    fn test_decode_24bit_full_scale() {
        let bytes = wav_bytes(spec(1, 44100, 24), &[4_194_304, -4_194_304]);
        let buffer = load_wav_from_reader(Cursor::new(bytes), &AnalysisConfig::default()).unwrap();
        assert_eq!(buffer.bit_depth(), 24);
        let mono = buffer.channel(0).unwrap();
        assert!((mono[0] - 0.5).abs() < 1e-6);
        assert!((mono[1] + 0.5).abs() < 1e-6);
        assert!(!buffer.dc_offset().detected);
    }

    #[test]
    fn test_rejects_unsupported_sample_rate() {
        let bytes = wav_bytes(spec(1, 22050, 16), &[0; 16]);
        let err = load_wav_from_reader(Cursor::new(bytes), &AnalysisConfig::default()).unwrap_err();
        assert!(matches!(err, AnalysisError::UnsupportedSampleRate(22050)));
    }

    #[test]
    fn test_rejects_unsupported_bit_depth() {
        let bytes = wav_bytes(spec(1, 48000, 8), &[0; 16]);
        let err = load_wav_from_reader(Cursor::new(bytes), &AnalysisConfig::default()).unwrap_err();
        assert!(matches!(err, AnalysisError::UnsupportedBitDepth(8)));
    }

    #[test]
    fn test_rejects_non_wav_bytes() {
        let err = load_wav_from_reader(Cursor::new(b"ID3\x03 not a wav".to_vec()), &AnalysisConfig::default())
            .unwrap_err();
        assert!(matches!(err, AnalysisError::UnsupportedFormat(_)));

        let err = load_wav_from_reader(Cursor::new(Vec::new()), &AnalysisConfig::default()).unwrap_err();
        assert!(matches!(err, AnalysisError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_rejects_float_wav() {
        let float_spec = hound::WavSpec {
            channels: 1,
            sample_rate: 48000,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, float_spec).unwrap();
            for _ in 0..16 {
                writer.write_sample(0.25f32).unwrap();
            }
            writer.finalize().unwrap();
        }
        let err = load_wav_from_reader(Cursor::new(cursor.into_inner()), &AnalysisConfig::default())
            .unwrap_err();
        assert!(matches!(err, AnalysisError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_truncated_data_is_corrupt() {
        let mut bytes = wav_bytes(spec(1, 48000, 16), &[1000; 4800]);
        bytes.truncate(bytes.len() - 4001);
        let err = load_wav_from_reader(Cursor::new(bytes), &AnalysisConfig::default()).unwrap_err();
        assert!(
            matches!(err, AnalysisError::CorruptFile(_)),
            "Expected CorruptFile, got {:?}",
            err
        );
        assert_eq!(err.category(), "corrupt_file");

        // Cut on a whole-sample boundary: the header still promises more data
        let mut bytes = wav_bytes(spec(2, 48000, 16), &[1000; 4800]);
        bytes.truncate(bytes.len() - 4000);
        let err = load_wav_from_reader(Cursor::new(bytes), &AnalysisConfig::default()).unwrap_err();
        assert!(
            matches!(err, AnalysisError::CorruptFile(_)),
            "Expected CorruptFile, got {:?}",
            err
        );
    }

    #[test]
    fn test_dc_offset_removed_and_flagged() {
        let samples: Vec<i32> = (0..4800)
            .map(|i| 3277 + ((i as f32 * 0.3).sin() * 8000.0) as i32)
            .collect();
        let bytes = wav_bytes(spec(1, 48000, 16), &samples);
        let buffer = load_wav_from_reader(Cursor::new(bytes), &AnalysisConfig::default()).unwrap();

        assert!(buffer.dc_offset().detected);
        assert!((buffer.dc_offset().channel_means[0] - 0.1).abs() < 0.01);
        let mean: f64 = buffer.mono().iter().map(|&x| x as f64).sum::<f64>() / buffer.len() as f64;
        assert!(mean.abs() < 1e-6, "Mean after DC removal should be ~0, got {}", mean);
    }
}
