//! Stochastic acoustic ray tracer.
//!
//! Rays leave the source in uniformly distributed directions and reflect
//! specularly around the mesh, accumulating eight-band energy. Each hit
//! yields a diffuse (Lambertian) contribution toward the microphone, and a
//! specular image-source candidate identified by the ordered sequence of
//! surfaces the path has struck. Image sources with identical surface
//! sequences describe the same physical reflection and are deduplicated.

mod kernel;

use crate::boundary::{Boundary, MeshBoundary};
use crate::error::{AuralizeError, Result};
use crate::math::Vec3;
use crate::spectrum::{VolumeSpectrum, DEFAULT_AIR_ABSORPTION};
use kernel::Kernel;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::f32::consts::PI;

/// Rays are dispatched to workers in groups of this size.
pub const RAY_GROUP_SIZE: usize = 4096;

/// Reserved image-source tag for the unreflected source-to-mic path.
/// Reflected surfaces are tagged `triangle index + 1`.
pub const DIRECT_PATH_TAG: u32 = 0;

/// Default speed of sound in metres per second.
pub const DEFAULT_SPEED_OF_SOUND: f32 = 340.0;

/// The ordered surface tags an image-source path has traversed.
pub type ImageSourceKey = Vec<u32>;

/// A timestamped eight-band contribution arriving at the microphone.
/// `position` is the last reflection point, kept for directional attenuation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Impulse {
    pub volume: VolumeSpectrum,
    pub position: Vec3,
    pub time: f32,
}

/// An impulse whose direction has been collapsed into its volume.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttenuatedImpulse {
    pub volume: VolumeSpectrum,
    pub time: f32,
}

/// A flat impulse list plus the microphone it was collected at.
#[derive(Debug, Clone)]
pub struct RaytracerResults {
    pub impulses: Vec<Impulse>,
    pub mic: Vec3,
}

/// Everything one tracing run produced.
#[derive(Debug, Clone)]
pub struct TraceOutput {
    diffuse: Vec<Impulse>,
    images: BTreeMap<ImageSourceKey, Impulse>,
    mic: Vec3,
}

impl TraceOutput {
    pub fn diffuse(&self) -> &[Impulse] {
        &self.diffuse
    }

    pub fn images(&self) -> &BTreeMap<ImageSourceKey, Impulse> {
        &self.images
    }

    /// Diffuse contributions only.
    pub fn raw_diffuse(&self) -> RaytracerResults {
        RaytracerResults {
            impulses: self.diffuse.clone(),
            mic: self.mic,
        }
    }

    /// Deduplicated image-source contributions, optionally without the
    /// direct path.
    pub fn raw_images(&self, remove_direct: bool) -> RaytracerResults {
        let mut images = self.images.clone();
        if remove_direct {
            images.remove(&vec![DIRECT_PATH_TAG]);
        }
        RaytracerResults {
            impulses: images.into_values().collect(),
            mic: self.mic,
        }
    }

    /// Diffuse and image-source contributions together.
    pub fn all_raw(&self, remove_direct: bool) -> RaytracerResults {
        let mut impulses = self.diffuse.clone();
        impulses.extend(self.raw_images(remove_direct).impulses);
        RaytracerResults {
            impulses,
            mic: self.mic,
        }
    }
}

/// Stochastic ray tracer over a mesh boundary.
pub struct Raytracer<'a> {
    boundary: &'a MeshBoundary,
    reflections: usize,
    air: VolumeSpectrum,
    speed_of_sound: f32,
}

impl<'a> Raytracer<'a> {
    pub fn new(boundary: &'a MeshBoundary, reflections: usize) -> Self {
        Self {
            boundary,
            reflections,
            air: DEFAULT_AIR_ABSORPTION,
            speed_of_sound: DEFAULT_SPEED_OF_SOUND,
        }
    }

    pub fn with_air_absorption(mut self, air: VolumeSpectrum) -> Self {
        self.air = air;
        self
    }

    pub fn with_speed_of_sound(mut self, speed_of_sound: f32) -> Self {
        self.speed_of_sound = speed_of_sound;
        self
    }

    /// Trace every direction and merge the per-batch results.
    ///
    /// Batches run in parallel but merge in batch order, and rays within a
    /// batch are serial, so results for a fixed direction set are
    /// reproducible: diffuse lists concatenate, image maps merge
    /// first-writer-wins.
    ///
    /// Both endpoints outside the closed mesh is fatal; one outside is
    /// reported as a warning and the run continues.
    pub fn trace(&self, source: Vec3, mic: Vec3, directions: &[Vec3]) -> Result<TraceOutput> {
        let source_inside = self.boundary.inside(source);
        let mic_inside = self.boundary.inside(mic);
        if !source_inside && !mic_inside {
            return Err(AuralizeError::Geometry(format!(
                "source {:?} and mic {:?} both lie outside the model",
                source, mic
            )));
        }
        if !source_inside || !mic_inside {
            let aabb = self.boundary.aabb();
            log::warn!("model bounds: [{:?}, {:?}]", aabb.min, aabb.max);
            if !mic_inside {
                log::warn!("microphone position may be outside model: {:?}", mic);
            }
            if !source_inside {
                log::warn!("source position may be outside model: {:?}", source);
            }
        }

        let kernel = Kernel::new(
            self.boundary,
            source,
            mic,
            self.reflections,
            self.air,
            self.speed_of_sound,
        );

        let batches: Vec<_> = directions
            .par_chunks(RAY_GROUP_SIZE)
            .map(|group| kernel.trace_batch(group))
            .collect();

        let mut diffuse = Vec::new();
        let mut images = BTreeMap::new();
        for batch in batches {
            diffuse.extend(batch.diffuse);
            for (key, impulse) in batch.images {
                images.entry(key).or_insert(impulse);
            }
        }

        log::info!(
            "traced {} rays: {} diffuse impulses, {} image sources",
            directions.len(),
            diffuse.len(),
            images.len()
        );

        Ok(TraceOutput {
            diffuse,
            images,
            mic,
        })
    }
}

/// Point on the unit sphere from cylindrical coordinates.
pub fn sphere_point(z: f32, theta: f32) -> Vec3 {
    let radius = (1.0 - z * z).sqrt();
    Vec3::new(radius * theta.cos(), radius * theta.sin(), z)
}

/// Uniformly distributed unit directions. A fixed seed makes the direction
/// set, and with it the whole trace, reproducible.
pub fn random_directions(count: usize, seed: Option<u64>) -> Vec<Vec3> {
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    (0..count)
        .map(|_| {
            let z = rng.gen_range(-1.0f32..=1.0);
            let theta = rng.gen_range(-PI..=PI);
            sphere_point(z, theta)
        })
        .collect()
}
