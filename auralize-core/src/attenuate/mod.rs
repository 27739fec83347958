//! Direction-dependent attenuation of traced impulses.
//!
//! A receiver model maps each impulse's arrival direction to a per-band
//! gain and collapses the direction away. Two models exist: a virtual
//! speaker with adjustable directivity, and a binaural HRTF lookup.

pub mod hrtf;

use crate::math::Vec3;
use crate::raytrace::{AttenuatedImpulse, Impulse, RaytracerResults};
use hrtf::{HrtfTable, ELEVATION_DEGREES};

/// A virtual microphone capsule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Speaker {
    /// Facing direction, unit length for a calibrated response.
    pub direction: Vec3,
    /// Directivity: 0 is omnidirectional, 1 is cardioid-like.
    pub shape: f32,
}

impl Speaker {
    pub fn omnidirectional() -> Self {
        Self {
            direction: Vec3::ZERO,
            shape: 0.0,
        }
    }

    fn gain(&self, to_impulse: Vec3) -> f32 {
        (1.0 - self.shape) + self.shape * self.direction.dot(to_impulse).max(0.0)
    }
}

/// Listener frame for binaural attenuation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HrtfConfig {
    pub facing: Vec3,
    pub up: Vec3,
}

/// Tagged receiver model: each variant maps an impulse direction to a
/// per-band gain.
#[derive(Debug, Clone, PartialEq)]
pub enum Receiver {
    Speakers(Vec<Speaker>),
    Hrtf(HrtfConfig),
}

impl Receiver {
    /// Attenuate every impulse, producing one channel per speaker, or two
    /// channels (left, right) for the HRTF model.
    pub fn attenuate(&self, results: &RaytracerResults) -> Vec<Vec<AttenuatedImpulse>> {
        match self {
            Receiver::Speakers(speakers) => attenuate_speakers(results, speakers),
            Receiver::Hrtf(config) => attenuate_hrtf(results, config),
        }
    }
}

/// One output channel per speaker.
pub fn attenuate_speakers(
    results: &RaytracerResults,
    speakers: &[Speaker],
) -> Vec<Vec<AttenuatedImpulse>> {
    speakers
        .iter()
        .map(|speaker| {
            results
                .impulses
                .iter()
                .map(|impulse| {
                    let gain = speaker.gain(direction_to(results.mic, impulse));
                    AttenuatedImpulse {
                        volume: impulse.volume.scale(gain),
                        time: impulse.time,
                    }
                })
                .collect()
        })
        .collect()
}

/// Two output channels, left then right.
pub fn attenuate_hrtf(
    results: &RaytracerResults,
    config: &HrtfConfig,
) -> Vec<Vec<AttenuatedImpulse>> {
    let facing = config.facing.normalize();
    let up = config.up.normalize();
    let right = facing.cross(up).normalize();
    let table = HrtfTable::get();

    (0..hrtf::CHANNELS)
        .map(|channel| {
            results
                .impulses
                .iter()
                .map(|impulse| {
                    let direction = direction_to(results.mic, impulse);
                    let (azimuth, elevation) = angles_in_frame(direction, facing, up, right);
                    AttenuatedImpulse {
                        volume: impulse.volume * table.lookup(channel, azimuth, elevation),
                        time: impulse.time,
                    }
                })
                .collect()
        })
        .collect()
}

fn direction_to(mic: Vec3, impulse: &Impulse) -> Vec3 {
    (impulse.position - mic).normalize_or_zero()
}

/// Arrival angles snapped to whole degrees: azimuth wraps into [0, 360),
/// elevation is clamped into the table's [0, 180) rows.
fn angles_in_frame(direction: Vec3, facing: Vec3, up: Vec3, right: Vec3) -> (usize, usize) {
    let azimuth = direction.dot(right).atan2(direction.dot(facing)).to_degrees();
    let azimuth = (azimuth.round() as i32).rem_euclid(360) as usize;

    let elevation = direction.dot(up).clamp(-1.0, 1.0).asin().to_degrees();
    let elevation = (elevation.round() as i32 + 90).clamp(0, ELEVATION_DEGREES as i32 - 1) as usize;

    (azimuth, elevation)
}
