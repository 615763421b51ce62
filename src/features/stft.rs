//! Short-time Fourier transform and its inverse
//!
//! Fixed parameters: 4096-sample periodic Hann window, hop 1024 (75% overlap),
//! FFT size 4096. No padding is applied, so a signal of `N` samples yields
//! `floor((N - 4096) / 1024) + 1` frames (zero frames when `N < 4096`), each
//! with 2049 bins spanning DC to Nyquist.
//!
//! The inverse uses weighted overlap-add with the same window, normalized by
//! the summed squared window, which reconstructs the input exactly wherever at
//! least one frame covers a sample with non-zero window weight.
//!
//! # Example
//!
//! ```
//! use mastering_dsp::features::stft::{compute_transform, inverse_transform, NUM_BINS};
//!
//! let samples: Vec<f32> = (0..48000).map(|i| (i as f32 * 0.05).sin()).collect();
//! let spectrogram = compute_transform(&samples, 48000);
//! assert_eq!(spectrogram.num_bins(), NUM_BINS);
//!
//! let rebuilt = inverse_transform(&spectrogram, 0..NUM_BINS);
//! assert_eq!(rebuilt.len(), samples.len());
//! ```

use std::ops::Range;
use std::sync::Arc;

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

use crate::io::audio_buffer::AudioBuffer;

/// Analysis window length in samples
pub const WINDOW_SIZE: usize = 4096;

/// Hop between consecutive frames in samples
pub const HOP_SIZE: usize = 1024;

/// FFT length (equal to the window, no zero padding)
pub const FFT_SIZE: usize = 4096;

/// Bins per frame, DC through Nyquist
pub const NUM_BINS: usize = FFT_SIZE / 2 + 1;

/// Minimum summed squared window for a sample to be reconstructed
const WINDOW_SUM_FLOOR: f32 = 1e-8;

/// Periodic Hann window of `size` samples
pub fn hann_window(size: usize) -> Vec<f32> {
    (0..size)
        .map(|n| {
            let phase = 2.0 * std::f64::consts::PI * n as f64 / size as f64;
            (0.5 - 0.5 * phase.cos()) as f32
        })
        .collect()
}

/// Number of frames the transform yields for `len` samples
pub fn frame_count(len: usize) -> usize {
    if len < WINDOW_SIZE {
        0
    } else {
        (len - WINDOW_SIZE) / HOP_SIZE + 1
    }
}

/// Complex spectrogram of one channel
///
/// Frames are stored contiguously, `NUM_BINS` values per frame.
#[derive(Debug, Clone)]
pub struct Spectrogram {
    sample_rate: u32,
    signal_len: usize,
    num_frames: usize,
    data: Vec<Complex<f32>>,
}

impl Spectrogram {
    /// Sample rate of the transformed signal
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Length of the transformed signal in samples
    pub fn signal_len(&self) -> usize {
        self.signal_len
    }

    /// Number of time frames
    pub fn num_frames(&self) -> usize {
        self.num_frames
    }

    /// Number of bins per frame
    pub fn num_bins(&self) -> usize {
        NUM_BINS
    }

    /// Spectrum of frame `index`
    pub fn frame(&self, index: usize) -> &[Complex<f32>] {
        &self.data[index * NUM_BINS..(index + 1) * NUM_BINS]
    }

    /// Center frequency of bin `k` in Hz
    pub fn bin_frequency(&self, k: usize) -> f64 {
        bin_frequency(k, self.sample_rate)
    }

    /// Start time of frame `index` in seconds
    pub fn frame_time(&self, index: usize) -> f64 {
        (index * HOP_SIZE) as f64 / self.sample_rate as f64
    }

    /// Copy a contiguous bin range out of every frame
    ///
    /// Band slices keep their copy after the transform is dropped.
    pub fn extract_bins(&self, bins: Range<usize>) -> BandSpectrum {
        let width = bins.len();
        let mut values = Vec::with_capacity(width * self.num_frames);
        for frame in 0..self.num_frames {
            values.extend_from_slice(&self.frame(frame)[bins.clone()]);
        }
        BandSpectrum {
            first_bin: bins.start,
            num_bins: width,
            num_frames: self.num_frames,
            bin_hz: self.sample_rate as f64 / FFT_SIZE as f64,
            values,
        }
    }

    /// View over every bin
    pub fn view(&self) -> SpectralView<'_> {
        SpectralView {
            values: &self.data,
            num_frames: self.num_frames,
            num_bins: NUM_BINS,
            first_bin: 0,
            bin_hz: self.sample_rate as f64 / FFT_SIZE as f64,
        }
    }
}

/// Center frequency of bin `k` at `sample_rate`
pub fn bin_frequency(k: usize, sample_rate: u32) -> f64 {
    k as f64 * sample_rate as f64 / FFT_SIZE as f64
}

/// Owned copy of a bin range across all frames
#[derive(Debug, Clone)]
pub struct BandSpectrum {
    first_bin: usize,
    num_bins: usize,
    num_frames: usize,
    bin_hz: f64,
    values: Vec<Complex<f32>>,
}

impl BandSpectrum {
    /// Spectrum with no bins (for bands above Nyquist)
    pub fn empty(num_frames: usize, bin_hz: f64) -> Self {
        Self {
            first_bin: 0,
            num_bins: 0,
            num_frames,
            bin_hz,
            values: Vec::new(),
        }
    }

    /// Borrowed view for metric code
    pub fn view(&self) -> SpectralView<'_> {
        SpectralView {
            values: &self.values,
            num_frames: self.num_frames,
            num_bins: self.num_bins,
            first_bin: self.first_bin,
            bin_hz: self.bin_hz,
        }
    }
}

/// Borrowed frames x bins window onto complex spectra
///
/// Metric code consumes this instead of a concrete spectrogram so the same
/// functions serve full-band and per-band data.
#[derive(Debug, Clone, Copy)]
pub struct SpectralView<'a> {
    values: &'a [Complex<f32>],
    num_frames: usize,
    num_bins: usize,
    first_bin: usize,
    bin_hz: f64,
}

impl<'a> SpectralView<'a> {
    /// Build a view over frame-major values
    ///
    /// `values.len()` must equal `num_frames * num_bins`.
    pub fn new(
        values: &'a [Complex<f32>],
        num_frames: usize,
        num_bins: usize,
        first_bin: usize,
        bin_hz: f64,
    ) -> Self {
        debug_assert_eq!(values.len(), num_frames * num_bins);
        Self {
            values,
            num_frames,
            num_bins,
            first_bin,
            bin_hz,
        }
    }

    /// Number of frames
    pub fn num_frames(&self) -> usize {
        self.num_frames
    }

    /// Number of bins per frame
    pub fn num_bins(&self) -> usize {
        self.num_bins
    }

    /// Absolute transform bin of the view's first column
    pub fn first_bin(&self) -> usize {
        self.first_bin
    }

    /// True when the view holds no values
    pub fn is_empty(&self) -> bool {
        self.num_frames == 0 || self.num_bins == 0
    }

    /// Frame `index` restricted to this view's bins
    pub fn frame(&self, index: usize) -> &'a [Complex<f32>] {
        &self.values[index * self.num_bins..(index + 1) * self.num_bins]
    }

    /// Center frequency in Hz of the view's `local` bin
    pub fn frequency(&self, local: usize) -> f64 {
        (self.first_bin + local) as f64 * self.bin_hz
    }

    /// Σ |X|² over every frame and bin
    pub fn total_energy(&self) -> f64 {
        self.values.iter().map(|c| c.norm_sqr() as f64).sum()
    }
}

/// Transforms shared by every band of one run
///
/// `mono` is the transform of the mono view of the buffer. Stereo buffers
/// also carry one transform per channel for band-limited stereo analysis.
#[derive(Debug, Clone)]
pub struct TransformSet {
    /// Transform of the mono signal (the only channel, or the downmix)
    pub mono: Spectrogram,
    /// `(left, right)` transforms for stereo input
    pub stereo: Option<(Spectrogram, Spectrogram)>,
}

/// Transform every channel of `buffer` (plus the mono view for stereo)
pub fn compute_transforms(buffer: &AudioBuffer) -> TransformSet {
    let sample_rate = buffer.sample_rate();
    let mono = compute_transform(buffer.mono(), sample_rate);
    let stereo = buffer.stereo_pair().map(|(left, right)| {
        (
            compute_transform(left, sample_rate),
            compute_transform(right, sample_rate),
        )
    });
    TransformSet { mono, stereo }
}

/// Forward transform of one channel
///
/// Deterministic: identical input yields bit-identical output. An input
/// shorter than one window yields zero frames.
pub fn compute_transform(samples: &[f32], sample_rate: u32) -> Spectrogram {
    let num_frames = frame_count(samples.len());
    log::debug!(
        "Computing STFT: {} samples at {} Hz -> {} frames x {} bins",
        samples.len(),
        sample_rate,
        num_frames,
        NUM_BINS
    );

    let window = hann_window(WINDOW_SIZE);
    let fft = FftPlanner::<f32>::new().plan_fft_forward(FFT_SIZE);
    let mut buffer = vec![Complex::new(0.0f32, 0.0); FFT_SIZE];
    let mut scratch = vec![Complex::new(0.0f32, 0.0); fft.get_inplace_scratch_len()];
    let mut data = Vec::with_capacity(num_frames * NUM_BINS);

    for frame in 0..num_frames {
        let start = frame * HOP_SIZE;
        for (i, slot) in buffer.iter_mut().enumerate() {
            *slot = Complex::new(samples[start + i] * window[i], 0.0);
        }
        fft.process_with_scratch(&mut buffer, &mut scratch);
        data.extend_from_slice(&buffer[..NUM_BINS]);
    }

    Spectrogram {
        sample_rate,
        signal_len: samples.len(),
        num_frames,
        data,
    }
}

/// Reconstruct a time-domain signal from the bins in `bins` only
///
/// Bins outside the range are treated as zero. The output has the original
/// signal length; samples not covered by any frame are zero. An empty range
/// returns an all-zero signal without running any FFTs.
pub fn inverse_transform(spectrogram: &Spectrogram, bins: Range<usize>) -> Vec<f32> {
    let len = spectrogram.signal_len;
    let mut output = vec![0.0f32; len];
    let bins = bins.start.min(NUM_BINS)..bins.end.min(NUM_BINS);
    if bins.is_empty() || spectrogram.num_frames == 0 {
        return output;
    }

    let window = hann_window(WINDOW_SIZE);
    let ifft: Arc<dyn Fft<f32>> = FftPlanner::<f32>::new().plan_fft_inverse(FFT_SIZE);
    let mut buffer = vec![Complex::new(0.0f32, 0.0); FFT_SIZE];
    let mut scratch = vec![Complex::new(0.0f32, 0.0); ifft.get_inplace_scratch_len()];
    let mut window_sum = vec![0.0f32; len];
    let scale = 1.0 / FFT_SIZE as f32;

    for frame_index in 0..spectrogram.num_frames {
        let frame = spectrogram.frame(frame_index);
        buffer.fill(Complex::new(0.0, 0.0));
        for k in bins.clone() {
            buffer[k] = frame[k];
            // Hermitian mirror keeps the inverse real
            if k != 0 && k != FFT_SIZE / 2 {
                buffer[FFT_SIZE - k] = frame[k].conj();
            }
        }
        ifft.process_with_scratch(&mut buffer, &mut scratch);

        let start = frame_index * HOP_SIZE;
        for i in 0..WINDOW_SIZE {
            let w = window[i];
            output[start + i] += buffer[i].re * scale * w;
            window_sum[start + i] += w * w;
        }
    }

    for (sample, &norm) in output.iter_mut().zip(window_sum.iter()) {
        if norm > WINDOW_SUM_FLOOR {
            *sample /= norm;
        } else {
            *sample = 0.0;
        }
    }

    output
}
