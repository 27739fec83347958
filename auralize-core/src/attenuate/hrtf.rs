//! Head-related transfer function table.
//!
//! A fixed 2×360×180 table of eight-band gains, indexed by integer azimuth
//! and elevation degrees in the listener frame. The table is generated once
//! on first use from a spherical-head shadowing model: low bands are close
//! to omnidirectional, high bands shadow strongly on the far side of the
//! head. Lookup semantics (nearest-degree snap, clamped elevation) match
//! consumers that ship a measured data set.

use crate::spectrum::{VolumeSpectrum, BAND_COUNT};
use std::sync::LazyLock;

pub const AZIMUTH_DEGREES: usize = 360;
pub const ELEVATION_DEGREES: usize = 180;
pub const CHANNELS: usize = 2;

static TABLE: LazyLock<HrtfTable> = LazyLock::new(HrtfTable::generate);

pub struct HrtfTable {
    // channel-major: [channel][azimuth][elevation]
    data: Vec<VolumeSpectrum>,
}

impl HrtfTable {
    /// The shared table, generated on first access.
    pub fn get() -> &'static HrtfTable {
        &TABLE
    }

    fn generate() -> Self {
        let mut data =
            Vec::with_capacity(CHANNELS * AZIMUTH_DEGREES * ELEVATION_DEGREES);
        for channel in 0..CHANNELS {
            // listener frame: azimuth 0 is straight ahead, positive toward
            // the right ear; elevation index 90 is the horizon
            let ear_azimuth: f32 = if channel == 0 { -90.0 } else { 90.0 };
            for azimuth in 0..AZIMUTH_DEGREES {
                for elevation in 0..ELEVATION_DEGREES {
                    let az = (azimuth as f32).to_radians();
                    let el = (elevation as f32 - 90.0).to_radians();
                    let ear = ear_azimuth.to_radians();

                    // cosine of the angle between the arrival direction and
                    // the ear axis
                    let cos_incidence = el.cos() * (az - ear).cos();
                    data.push(Self::shadowed_gain(cos_incidence));
                }
            }
        }
        Self { data }
    }

    /// Per-band gain for a given incidence cosine: unity toward the ear,
    /// progressively darker behind the head as frequency rises.
    fn shadowed_gain(cos_incidence: f32) -> VolumeSpectrum {
        let mut bands = [0.0f32; BAND_COUNT];
        for (index, band) in bands.iter_mut().enumerate() {
            let depth = 0.1 + 0.8 * index as f32 / (BAND_COUNT - 1) as f32;
            *band = (1.0 - depth) + depth * 0.5 * (1.0 + cos_incidence);
        }
        VolumeSpectrum(bands)
    }

    /// Gain spectrum for a channel at integer azimuth/elevation indices.
    pub fn lookup(&self, channel: usize, azimuth: usize, elevation: usize) -> VolumeSpectrum {
        debug_assert!(channel < CHANNELS);
        debug_assert!(azimuth < AZIMUTH_DEGREES);
        debug_assert!(elevation < ELEVATION_DEGREES);
        self.data[(channel * AZIMUTH_DEGREES + azimuth) * ELEVATION_DEGREES + elevation]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_dimensions() {
        let table = HrtfTable::get();
        assert_eq!(
            table.data.len(),
            CHANNELS * AZIMUTH_DEGREES * ELEVATION_DEGREES
        );
    }

    #[test]
    fn test_gains_are_gains() {
        let table = HrtfTable::get();
        for &spectrum in &table.data {
            assert!(spectrum.is_gain());
        }
    }

    #[test]
    fn test_near_ear_is_louder_than_far_ear() {
        let table = HrtfTable::get();
        // arrival from the right (azimuth 90, horizon)
        let right_ear = table.lookup(1, 90, 90);
        let left_ear = table.lookup(0, 90, 90);
        for band in 1..BAND_COUNT {
            assert!(right_ear[band] > left_ear[band]);
        }
    }

    #[test]
    fn test_low_bands_shadow_less_than_high_bands() {
        let table = HrtfTable::get();
        let far = table.lookup(0, 90, 90);
        assert!(far[0] > far[BAND_COUNT - 1]);
    }
}
