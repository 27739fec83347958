//! End-to-end render pipeline.
//!
//! Fuses the two simulation branches: the ray tracer covers the upper
//! frequency range, the waveguide mesh the lower. The waveguide tail is
//! envelope-matched to the RT60 measured on the high-passed ray signal,
//! then the branches are cross-faded and summed.

use crate::attenuate::{Receiver, Speaker};
use crate::audio;
use crate::boundary::MeshBoundary;
use crate::config::{OutputMode, RenderConfig};
use crate::dsp;
use crate::dsp::filters::LinkwitzRiley;
use crate::error::{AuralizeError, Result};
use crate::raytrace::{random_directions, Raytracer, DEFAULT_SPEED_OF_SOUND};
use crate::scene::Scene;
use crate::waveguide::{self, TetrahedralMesh};

/// Physical and numerical parameters of a render, with the conventional
/// defaults.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderParams {
    /// Speed of sound in metres per second.
    pub speed_of_sound: f32,
    /// Upper frequency limit of the waveguide branch in Hz.
    pub max_frequency: f32,
    /// Number of waveguide update steps.
    pub waveguide_steps: usize,
    /// Crossfade weight of the ray-traced branch in the summed output.
    pub ray_amp: f32,
    /// Crossfade weight of the waveguide branch in the summed output.
    pub waveguide_amp: f32,
}

impl Default for RenderParams {
    fn default() -> Self {
        Self {
            speed_of_sound: DEFAULT_SPEED_OF_SOUND,
            max_frequency: 1000.0,
            waveguide_steps: 1 << 13,
            ray_amp: 0.95,
            waveguide_amp: 0.05,
        }
    }
}

impl RenderParams {
    /// Crossover frequency between the two branches.
    pub fn filter_frequency(&self) -> f32 {
        self.max_frequency * 0.5
    }

    /// Waveguide update rate: oversampled fourfold above `max_frequency`.
    pub fn mesh_sample_rate(&self) -> f32 {
        self.max_frequency * 4.0
    }

    /// Waveguide node spacing derived from the update rate.
    pub fn cube_side(&self) -> f32 {
        self.speed_of_sound * 3f32.sqrt() / self.mesh_sample_rate()
    }
}

/// The five output signals of one render, all at `sample_rate`.
#[derive(Debug, Clone)]
pub struct RenderOutput {
    pub raytrace_full: Vec<f32>,
    pub raytrace_hipass: Vec<f32>,
    pub waveguide_full: Vec<f32>,
    pub waveguide_lopass: Vec<f32>,
    pub summed: Vec<f32>,
    pub sample_rate: u32,
}

/// Render a room impulse response for the scene.
pub fn render(scene: Scene, config: &RenderConfig, params: &RenderParams) -> Result<RenderOutput> {
    let sample_rate = config.sample_rate;
    let source = config.source();
    let mic = config.mic();

    let boundary = MeshBoundary::new(scene);
    let mesh = TetrahedralMesh::new(&boundary, params.cube_side())?;

    // Waveguide taps snap to lattice nodes. Both endpoints outside the
    // meshed region is fatal; one outside degrades to the nearest node
    // with a warning.
    let source_snap = mesh.index_for_coord(source);
    let mic_snap = mesh.index_for_coord(mic);
    if source_snap.is_err() && mic_snap.is_err() {
        return Err(AuralizeError::Geometry(format!(
            "source {:?} and mic {:?} both lie outside the model",
            source, mic
        )));
    }
    let source_index = source_snap.unwrap_or_else(|_| {
        log::warn!(
            "source {:?} lies outside the meshed region, using the nearest lattice node",
            source
        );
        mesh.nearest_index(source)
    });
    let mic_index = mic_snap.unwrap_or_else(|_| {
        log::warn!(
            "microphone {:?} lies outside the meshed region, using the nearest lattice node",
            mic
        );
        mesh.nearest_index(mic)
    });

    // High-frequency branch: trace, attenuate omnidirectionally, flatten,
    // band-filter and mix down.
    let directions = random_directions(config.rays, config.seed);
    let tracer =
        Raytracer::new(&boundary, config.reflections).with_speed_of_sound(params.speed_of_sound);
    let output = tracer.trace(source, mic, &directions)?;

    let results = match config.output_mode {
        OutputMode::All => output.all_raw(config.remove_direct),
        OutputMode::ImageOnly => output.raw_images(config.remove_direct),
        OutputMode::DiffuseOnly => output.raw_diffuse(),
    };

    let receiver = Receiver::Speakers(vec![Speaker::omnidirectional()]);
    let attenuated = receiver.attenuate(&results);
    let flattened = dsp::flatten_channels(&attenuated, sample_rate as f32);
    let mut channels = dsp::process(
        flattened,
        sample_rate as f32,
        config.normalize,
        config.hipass,
        config.trim_tail,
        config.volume_scale,
    );
    let raytrace_full = channels.swap_remove(0);

    let filter_frequency = params.filter_frequency() as f64;
    let mut raytrace_hipass = raytrace_full.clone();
    LinkwitzRiley::new(filter_frequency, 0.45 * sample_rate as f64, sample_rate as f64)
        .filter(&mut raytrace_hipass);
    if config.normalize {
        dsp::normalize(&mut raytrace_hipass);
    }

    let decay_frames = dsp::rt60_frames(&raytrace_hipass).max(1);
    let attenuation_factor = dsp::db2a(-60.0).powf(1.0 / decay_frames as f64).sqrt() as f32;
    log::info!(
        "rt60: {} frames, waveguide attenuation factor: {}",
        decay_frames,
        attenuation_factor
    );

    // Low-frequency branch: run the waveguide at the mesh rate, bring it
    // to the output rate, and shape its tail to the measured decay.
    let mut mesh_signal = waveguide::run(&mesh, source_index, mic_index, params.waveguide_steps)?;
    dsp::normalize(&mut mesh_signal);

    let mut waveguide_full = audio::resample(
        &mesh_signal,
        params.mesh_sample_rate() as u32,
        sample_rate,
    )?;
    let envelope = dsp::exponential_decay_envelope(waveguide_full.len(), attenuation_factor);
    dsp::elementwise_multiply(&mut waveguide_full, &envelope);

    let mut waveguide_lopass = waveguide_full.clone();
    LinkwitzRiley::new(1.0, filter_frequency, sample_rate as f64).filter(&mut waveguide_lopass);
    if config.normalize {
        dsp::normalize(&mut waveguide_lopass);
    }

    // Crossfade and sum over the longer of the two branches.
    let len = raytrace_hipass.len().max(waveguide_lopass.len());
    let mut summed = vec![0.0f32; len];
    for (index, sample) in summed.iter_mut().enumerate() {
        if let Some(&ray) = raytrace_hipass.get(index) {
            *sample += params.ray_amp * ray;
        }
        if let Some(&low) = waveguide_lopass.get(index) {
            *sample += params.waveguide_amp * low;
        }
    }
    if config.normalize {
        dsp::normalize(&mut summed);
    }

    Ok(RenderOutput {
        raytrace_full,
        raytrace_hipass,
        waveguide_full,
        waveguide_lopass,
        summed,
        sample_rate,
    })
}
