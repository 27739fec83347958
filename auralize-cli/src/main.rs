use anyhow::Result;
use auralize_core::audio::write_wav;
use auralize_core::scene::loader::load_scene;
use auralize_core::scene::material::load_materials;
use auralize_core::{render, RenderConfig, RenderParams};
use clap::Parser;
use std::path::PathBuf;

/// Render a room impulse response for a 3D model.
#[derive(Parser, Debug)]
#[command(name = "auralize", version, about)]
struct Args {
    /// JSON render configuration
    config: PathBuf,
    /// 3D model of the room (OBJ)
    model: PathBuf,
    /// JSON material definitions
    materials: PathBuf,
    /// Prefix for the output WAV files
    output: String,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    if let Err(e) = run(&args) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<()> {
    let config = RenderConfig::from_file(&args.config)?;
    let materials = load_materials(&args.materials)?;
    let scene = load_scene(&args.model, &materials)?;

    let output = render(scene, &config, &RenderParams::default())?;

    let sample_rate = output.sample_rate;
    let depth = config.bit_depth;
    let prefix = &args.output;
    write_wav(
        format!("{prefix}.raytrace.full.wav"),
        &output.raytrace_full,
        sample_rate,
        depth,
    )?;
    write_wav(
        format!("{prefix}.raytrace.hipass.wav"),
        &output.raytrace_hipass,
        sample_rate,
        depth,
    )?;
    write_wav(
        format!("{prefix}.waveguide.full.wav"),
        &output.waveguide_full,
        sample_rate,
        depth,
    )?;
    write_wav(
        format!("{prefix}.waveguide.lopass.wav"),
        &output.waveguide_lopass,
        sample_rate,
        depth,
    )?;
    write_wav(
        format!("{prefix}.summed.wav"),
        &output.summed,
        sample_rate,
        depth,
    )?;

    Ok(())
}
