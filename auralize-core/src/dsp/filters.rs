//! IIR filter primitives for the post-processing chain.
//!
//! Biquads follow the Audio EQ Cookbook with Direct Form II Transposed
//! state; coefficients and state are f64 to keep the recursions stable on
//! long tails.

use crate::spectrum::{BAND_CENTRES, BAND_COUNT};
use std::f64::consts::{FRAC_1_SQRT_2, PI};

/// General-purpose second-order IIR section.
#[derive(Debug, Clone)]
pub struct Biquad {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
    s1: f64,
    s2: f64,
}

impl Biquad {
    /// Bandpass filter (constant skirt gain).
    pub fn bandpass(centre_hz: f64, q: f64, sample_rate: f64) -> Self {
        let w0 = 2.0 * PI * centre_hz / sample_rate;
        let alpha = w0.sin() / (2.0 * q);
        let cos_w0 = w0.cos();

        let b0 = alpha;
        let b1 = 0.0;
        let b2 = -alpha;
        let a0 = 1.0 + alpha;
        let a1 = -2.0 * cos_w0;
        let a2 = 1.0 - alpha;

        Self::from_coefficients(b0, b1, b2, a0, a1, a2)
    }

    /// Low-pass filter.
    pub fn lowpass(cutoff_hz: f64, q: f64, sample_rate: f64) -> Self {
        let w0 = 2.0 * PI * cutoff_hz / sample_rate;
        let alpha = w0.sin() / (2.0 * q);
        let cos_w0 = w0.cos();

        let b1 = 1.0 - cos_w0;
        let b0 = b1 / 2.0;
        let b2 = b0;
        let a0 = 1.0 + alpha;
        let a1 = -2.0 * cos_w0;
        let a2 = 1.0 - alpha;

        Self::from_coefficients(b0, b1, b2, a0, a1, a2)
    }

    /// High-pass filter.
    pub fn highpass(cutoff_hz: f64, q: f64, sample_rate: f64) -> Self {
        let w0 = 2.0 * PI * cutoff_hz / sample_rate;
        let alpha = w0.sin() / (2.0 * q);
        let cos_w0 = w0.cos();

        let b1 = -(1.0 + cos_w0);
        let b0 = -b1 / 2.0;
        let b2 = b0;
        let a0 = 1.0 + alpha;
        let a1 = -2.0 * cos_w0;
        let a2 = 1.0 - alpha;

        Self::from_coefficients(b0, b1, b2, a0, a1, a2)
    }

    fn from_coefficients(b0: f64, b1: f64, b2: f64, a0: f64, a1: f64, a2: f64) -> Self {
        Self {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
            s1: 0.0,
            s2: 0.0,
        }
    }

    /// Process one sample (Direct Form II Transposed).
    pub fn process(&mut self, x: f64) -> f64 {
        let y = self.b0 * x + self.s1;
        self.s1 = self.b1 * x - self.a1 * y + self.s2;
        self.s2 = self.b2 * x - self.a2 * y;
        y
    }

    pub fn reset(&mut self) {
        self.s1 = 0.0;
        self.s2 = 0.0;
    }

    /// Run the section across a signal in place, single pass.
    pub fn filter(&mut self, signal: &mut [f32]) {
        for sample in signal {
            *sample = self.process(*sample as f64) as f32;
        }
    }
}

/// 4th-order Linkwitz–Riley band edge pair: a high-pass at `lo_cutoff` and
/// a low-pass at `hi_cutoff`, each built from two cascaded Butterworth
/// sections.
#[derive(Debug, Clone)]
pub struct LinkwitzRiley {
    sections: [Biquad; 4],
}

impl LinkwitzRiley {
    pub fn new(lo_cutoff: f64, hi_cutoff: f64, sample_rate: f64) -> Self {
        Self {
            sections: [
                Biquad::highpass(lo_cutoff, FRAC_1_SQRT_2, sample_rate),
                Biquad::highpass(lo_cutoff, FRAC_1_SQRT_2, sample_rate),
                Biquad::lowpass(hi_cutoff, FRAC_1_SQRT_2, sample_rate),
                Biquad::lowpass(hi_cutoff, FRAC_1_SQRT_2, sample_rate),
            ],
        }
    }

    pub fn filter(&mut self, signal: &mut [f32]) {
        for section in &mut self.sections {
            section.filter(signal);
        }
    }

    pub fn reset(&mut self) {
        for section in &mut self.sections {
            section.reset();
        }
    }
}

/// Bandpass each of the eight band signals around its nominal centre with a
/// single biquad pass. `lo_cutoff` raises the lower edge of any band that
/// would otherwise reach below it (in practice only the lowest band).
pub fn filter_bands(bands: &mut [Vec<f32>], sample_rate: f64, lo_cutoff: f64) {
    debug_assert_eq!(bands.len(), BAND_COUNT);
    for (index, band) in bands.iter_mut().enumerate() {
        let centre = BAND_CENTRES[index] as f64;
        let hi = (centre * 2f64.sqrt()).min(0.45 * sample_rate);
        // bands that crowd Nyquist collapse toward the upper limit
        let lo = (centre / 2f64.sqrt()).max(lo_cutoff).min(hi * 0.9);
        let effective_centre = (lo * hi).sqrt();
        let q = effective_centre / (hi - lo);
        Biquad::bandpass(effective_centre, q, sample_rate).filter(band);
    }
}
