//! K-weighting pre-filter (ITU-R BS.1770-4 Annex 1)
//!
//! Two cascaded biquads: a high-shelf of about +4 dB above 1.5 kHz modelling
//! the acoustic effect of the head, followed by the RLB high-pass at about
//! 38 Hz. Coefficients are derived for the actual sample rate with the bilinear
//! transform, so 44.1 kHz and 48 kHz both match the tabulated 48 kHz response.

/// Second-order IIR section, Direct Form II transposed
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Biquad {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
    // Direct Form II transposed only needs two state registers
    z1: f64,
    z2: f64,
}

impl Biquad {
    /// Build a section from coefficients already normalized by `a0`
    pub fn new(b0: f64, b1: f64, b2: f64, a1: f64, a2: f64) -> Self {
        Self {
            b0,
            b1,
            b2,
            a1,
            a2,
            z1: 0.0,
            z2: 0.0,
        }
    }

    /// Stage 1: high-shelf
    pub fn shelf(sample_rate: u32) -> Self {
        const F0: f64 = 1681.974450955533;
        const GAIN_DB: f64 = 3.999843853973347;
        const Q: f64 = 0.7071752369554196;

        let k = (std::f64::consts::PI * F0 / sample_rate as f64).tan();
        let vh = 10.0_f64.powf(GAIN_DB / 20.0);
        let vb = vh.powf(0.4996667741545416);
        let a0 = 1.0 + k / Q + k * k;

        Self::new(
            (vh + vb * k / Q + k * k) / a0,
            2.0 * (k * k - vh) / a0,
            (vh - vb * k / Q + k * k) / a0,
            2.0 * (k * k - 1.0) / a0,
            (1.0 - k / Q + k * k) / a0,
        )
    }

    /// Stage 2: RLB high-pass
    pub fn high_pass(sample_rate: u32) -> Self {
        const F0: f64 = 38.13547087602444;
        const Q: f64 = 0.5003270373238773;

        let k = (std::f64::consts::PI * F0 / sample_rate as f64).tan();
        let a0 = 1.0 + k / Q + k * k;

        Self::new(
            1.0,
            -2.0,
            1.0,
            2.0 * (k * k - 1.0) / a0,
            (1.0 - k / Q + k * k) / a0,
        )
    }

    /// Process a single sample
    #[inline]
    pub fn process(&mut self, sample: f64) -> f64 {
        let output = self.b0 * sample + self.z1;
        self.z1 = self.b1 * sample + self.z2 - self.a1 * output;
        self.z2 = self.b2 * sample - self.a2 * output;
        output
    }

    /// Magnitude response at `freq` Hz
    pub fn magnitude(&self, freq: f64, sample_rate: u32) -> f64 {
        let w = 2.0 * std::f64::consts::PI * freq / sample_rate as f64;
        let (c1, s1) = (w.cos(), w.sin());
        let (c2, s2) = ((2.0 * w).cos(), (2.0 * w).sin());
        let num_re = self.b0 + self.b1 * c1 + self.b2 * c2;
        let num_im = -(self.b1 * s1 + self.b2 * s2);
        let den_re = 1.0 + self.a1 * c1 + self.a2 * c2;
        let den_im = -(self.a1 * s1 + self.a2 * s2);
        ((num_re * num_re + num_im * num_im) / (den_re * den_re + den_im * den_im)).sqrt()
    }

    /// Clear the state registers
    pub fn reset(&mut self) {
        self.z1 = 0.0;
        self.z2 = 0.0;
    }
}

/// Cascaded shelf + high-pass K-weighting filter for one channel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KWeightingFilter {
    shelf: Biquad,
    high_pass: Biquad,
    sample_rate: u32,
}

impl KWeightingFilter {
    /// Create a filter for `sample_rate`
    pub fn new(sample_rate: u32) -> Self {
        Self {
            shelf: Biquad::shelf(sample_rate),
            high_pass: Biquad::high_pass(sample_rate),
            sample_rate,
        }
    }

    /// Process a single sample through both stages
    #[inline]
    pub fn process(&mut self, sample: f64) -> f64 {
        self.high_pass.process(self.shelf.process(sample))
    }

    /// Combined gain in dB at `freq` Hz
    pub fn gain_db(&self, freq: f64) -> f64 {
        let magnitude =
            self.shelf.magnitude(freq, self.sample_rate) * self.high_pass.magnitude(freq, self.sample_rate);
        20.0 * magnitude.log10()
    }

    /// Reset filter state
    pub fn reset(&mut self) {
        self.shelf.reset();
        self.high_pass.reset();
    }
}

/// Square of every K-weighted sample of one channel
///
/// A fresh filter is used per call, so channels never share state.
pub fn weighted_power(samples: &[f32], sample_rate: u32) -> Vec<f64> {
    let mut filter = KWeightingFilter::new(sample_rate);
    samples
        .iter()
        .map(|&s| {
            let y = filter.process(s as f64);
            y * y
        })
        .collect()
}
