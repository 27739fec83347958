//! Eight-band energy spectra used throughout the ray tracer.
//!
//! Every per-surface and per-impulse quantity carries one linear gain per
//! band, so attenuation along a path is plain elementwise multiplication.

use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Index, Mul, MulAssign};

/// Number of frequency bands carried by every spectrum.
pub const BAND_COUNT: usize = 8;

/// Nominal band centres in Hz. Log-spaced, covering roughly 60 Hz to 16 kHz.
pub const BAND_CENTRES: [f32; BAND_COUNT] = [
    63.0, 125.0, 250.0, 500.0, 1000.0, 2000.0, 4000.0, 8000.0,
];

/// Default air absorption: per-metre linear gain for each band.
pub const DEFAULT_AIR_ABSORPTION: VolumeSpectrum = VolumeSpectrum([
    1.0 - 0.001 * 0.1,
    1.0 - 0.001 * 0.2,
    1.0 - 0.001 * 0.5,
    1.0 - 0.001 * 1.1,
    1.0 - 0.001 * 2.7,
    1.0 - 0.001 * 9.4,
    1.0 - 0.001 * 29.0,
    1.0 - 0.001 * 60.0,
]);

/// An eight-band energy (or gain) vector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VolumeSpectrum(pub [f32; BAND_COUNT]);

impl VolumeSpectrum {
    pub const ZERO: Self = Self([0.0; BAND_COUNT]);
    pub const ONE: Self = Self([1.0; BAND_COUNT]);

    pub fn splat(value: f32) -> Self {
        Self([value; BAND_COUNT])
    }

    pub fn bands(&self) -> &[f32; BAND_COUNT] {
        &self.0
    }

    /// Raise every band to the given power. Used to apply a per-metre gain
    /// over a travelled distance: `air.pow(distance)`.
    pub fn pow(self, exponent: f32) -> Self {
        let mut out = self.0;
        for band in &mut out {
            *band = band.powf(exponent);
        }
        Self(out)
    }

    /// Multiply every band by a scalar.
    pub fn scale(self, factor: f32) -> Self {
        let mut out = self.0;
        for band in &mut out {
            *band *= factor;
        }
        Self(out)
    }

    pub fn max_band(&self) -> f32 {
        self.0.iter().fold(f32::MIN, |a, &b| a.max(b))
    }

    /// True when every band has decayed below `threshold`.
    pub fn all_below(&self, threshold: f32) -> bool {
        self.0.iter().all(|&band| band < threshold)
    }

    /// True when every band lies in `[0, 1]`.
    pub fn is_gain(&self) -> bool {
        self.0.iter().all(|&band| (0.0..=1.0).contains(&band))
    }
}

impl Mul for VolumeSpectrum {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        let mut out = self.0;
        for (band, other) in out.iter_mut().zip(rhs.0.iter()) {
            *band *= other;
        }
        Self(out)
    }
}

impl MulAssign for VolumeSpectrum {
    fn mul_assign(&mut self, rhs: Self) {
        *self = *self * rhs;
    }
}

impl Add for VolumeSpectrum {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        let mut out = self.0;
        for (band, other) in out.iter_mut().zip(rhs.0.iter()) {
            *band += other;
        }
        Self(out)
    }
}

impl AddAssign for VolumeSpectrum {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Index<usize> for VolumeSpectrum {
    type Output = f32;

    fn index(&self, band: usize) -> &f32 {
        &self.0[band]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elementwise_mul() {
        let a = VolumeSpectrum([1.0, 0.5, 0.25, 1.0, 1.0, 1.0, 1.0, 0.0]);
        let b = VolumeSpectrum::splat(0.5);
        let product = a * b;
        assert_eq!(product[0], 0.5);
        assert_eq!(product[1], 0.25);
        assert_eq!(product[7], 0.0);
    }

    #[test]
    fn test_pow_applies_per_band() {
        let air = DEFAULT_AIR_ABSORPTION;
        let over_two_metres = air.pow(2.0);
        for band in 0..BAND_COUNT {
            assert!((over_two_metres[band] - air[band] * air[band]).abs() < 1e-6);
        }
    }

    #[test]
    fn test_all_below() {
        assert!(VolumeSpectrum::splat(1e-7).all_below(1e-6));
        let mut spectrum = VolumeSpectrum::splat(1e-7);
        spectrum.0[3] = 0.5;
        assert!(!spectrum.all_below(1e-6));
    }

    #[test]
    fn test_default_air_is_a_gain() {
        assert!(DEFAULT_AIR_ABSORPTION.is_gain());
        assert!(DEFAULT_AIR_ABSORPTION.max_band() < 1.0);
    }
}
