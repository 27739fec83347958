//! Per-ray tracing kernel.
//!
//! Each ray walks the mesh specularly, and at every hit contributes one
//! image-source candidate (validated by back-projection through the
//! recorded reflection planes) and one diffuse candidate (validated by a
//! single visibility ray to the microphone).

use crate::boundary::MeshBoundary;
use crate::math::{reflect_direction, reflect_point, Ray, Vec3, EPSILON};
use crate::raytrace::{Impulse, ImageSourceKey, DIRECT_PATH_TAG};
use crate::spectrum::VolumeSpectrum;
use std::collections::BTreeMap;

/// A ray dies once every band of its volume falls below this level.
const NOISE_FLOOR: f32 = 1e-6;

/// Accumulators private to one batch of rays.
#[derive(Debug, Default)]
pub struct BatchOutput {
    pub diffuse: Vec<Impulse>,
    pub images: BTreeMap<ImageSourceKey, Impulse>,
}

pub struct Kernel<'a> {
    boundary: &'a MeshBoundary,
    source: Vec3,
    mic: Vec3,
    reflections: usize,
    air: VolumeSpectrum,
    speed_of_sound: f32,
}

impl<'a> Kernel<'a> {
    pub fn new(
        boundary: &'a MeshBoundary,
        source: Vec3,
        mic: Vec3,
        reflections: usize,
        air: VolumeSpectrum,
        speed_of_sound: f32,
    ) -> Self {
        Self {
            boundary,
            source,
            mic,
            reflections,
            air,
            speed_of_sound,
        }
    }

    /// Trace one batch of rays serially, in order.
    pub fn trace_batch(&self, directions: &[Vec3]) -> BatchOutput {
        let mut output = BatchOutput::default();
        for &direction in directions {
            self.trace_ray(direction, &mut output);
        }
        output
    }

    fn trace_ray(&self, direction: Vec3, output: &mut BatchOutput) {
        // The unreflected path shares the image-source bookkeeping under
        // the reserved "no surface" tag.
        let direct_key: ImageSourceKey = vec![DIRECT_PATH_TAG];
        if !output.images.contains_key(&direct_key) && self.visible(self.source, self.mic) {
            let distance = (self.mic - self.source).length();
            output.images.insert(
                direct_key,
                Impulse {
                    volume: self.air.pow(distance),
                    position: self.source,
                    time: distance / self.speed_of_sound,
                },
            );
        }

        let mut position = self.source;
        let mut heading = direction;
        let mut travelled = 0.0f32;
        let mut volume = VolumeSpectrum::ONE;
        let mut specular_gain = VolumeSpectrum::ONE;
        let mut key = ImageSourceKey::new();
        // triangles struck so far, and the source image after each strike
        let mut path: Vec<u32> = Vec::new();
        let mut images: Vec<Vec3> = Vec::new();
        let mut image = self.source;

        for _ in 0..self.reflections {
            let Some(hit) = self.boundary.intersect(&Ray::new(position, heading)) else {
                break;
            };
            let triangle = &self.boundary.scene().triangles()[hit.triangle as usize];
            let surface = *self.boundary.scene().surface_for(triangle);
            let normal = self.boundary.scene().triangle_normal(triangle);
            let point = position + heading * hit.t;

            travelled += hit.t;
            volume *= self.air.pow(hit.t);

            image = reflect_point(image, point, normal);
            key.push(hit.triangle + 1);
            path.push(hit.triangle);
            images.push(image);

            if !output.images.contains_key(&key) && self.image_path_is_valid(&path, &images) {
                let unfolded = (self.mic - image).length();
                output.images.insert(
                    key.clone(),
                    Impulse {
                        volume: self.air.pow(unfolded) * specular_gain * surface.specular,
                        position: point,
                        time: unfolded / self.speed_of_sound,
                    },
                );
            }

            let to_mic = self.mic - point;
            let mic_distance = to_mic.length();
            if mic_distance > EPSILON && self.visible(point, self.mic) {
                let lambert = normal.dot(to_mic / mic_distance).abs();
                output.diffuse.push(Impulse {
                    volume: volume * surface.diffuse * VolumeSpectrum::splat(lambert),
                    position: point,
                    time: (travelled + mic_distance) / self.speed_of_sound,
                });
            }

            volume *= surface.specular;
            specular_gain *= surface.specular;
            heading = reflect_direction(heading, normal);
            let outward = if normal.dot(heading) >= 0.0 { normal } else { -normal };
            position = point + outward * EPSILON;

            if volume.all_below(NOISE_FLOOR) {
                break;
            }
        }
    }

    /// Back-project the candidate from the microphone through the recorded
    /// reflection planes in reverse order. Valid only when every segment's
    /// first obstruction is the expected triangle, each struck closer than
    /// the corresponding source image, and the final segment reaches the
    /// true source unoccluded.
    fn image_path_is_valid(&self, path: &[u32], images: &[Vec3]) -> bool {
        let mut origin = self.mic;

        for depth in (0..path.len()).rev() {
            let target = images[depth];
            let to_target = target - origin;
            let distance = to_target.length();
            if distance <= EPSILON {
                return false;
            }
            let direction = to_target / distance;
            let probe = Ray::new(origin + direction * EPSILON, direction);

            let Some(hit) = self.boundary.intersect(&probe) else {
                return false;
            };
            if hit.triangle != path[depth] {
                return false;
            }
            if hit.t >= distance {
                return false;
            }
            origin = probe.origin + direction * hit.t;
        }

        self.visible(origin, self.source)
    }

    /// One visibility ray from `from` to `to`: clear when the first
    /// obstruction lies at or beyond the target.
    fn visible(&self, from: Vec3, to: Vec3) -> bool {
        let delta = to - from;
        let distance = delta.length();
        if distance <= EPSILON {
            return true;
        }
        let direction = delta / distance;
        match self
            .boundary
            .intersect(&Ray::new(from + direction * EPSILON, direction))
        {
            None => true,
            Some(hit) => hit.t >= distance - 2.0 * EPSILON,
        }
    }
}
