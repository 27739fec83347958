//! Audio file output and offline resampling.

pub mod resample;

pub use resample::resample;

use crate::error::{AuralizeError, Result};
use std::path::Path;

/// Write a mono signal as a 16- or 24-bit integer WAV file.
pub fn write_wav<P: AsRef<Path>>(
    path: P,
    signal: &[f32],
    sample_rate: u32,
    bit_depth: u16,
) -> Result<()> {
    if bit_depth != 16 && bit_depth != 24 {
        return Err(AuralizeError::Config(format!(
            "unsupported bit depth {}, expected 16 or 24",
            bit_depth
        )));
    }

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: bit_depth,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path.as_ref(), spec).map_err(|e| {
        AuralizeError::Processing(format!(
            "failed to create {}: {}",
            path.as_ref().display(),
            e
        ))
    })?;

    let amplitude = ((1i32 << (bit_depth - 1)) - 1) as f32;
    for &sample in signal {
        let value = (sample.clamp(-1.0, 1.0) * amplitude) as i32;
        let written = if bit_depth == 16 {
            writer.write_sample(value as i16)
        } else {
            writer.write_sample(value)
        };
        written.map_err(|e| AuralizeError::Processing(format!("failed to write sample: {}", e)))?;
    }

    writer
        .finalize()
        .map_err(|e| AuralizeError::Processing(format!("failed to finalise wav: {}", e)))?;

    log::info!(
        "wrote {} ({} samples, {} Hz, {}-bit)",
        path.as_ref().display(),
        signal.len(),
        sample_rate,
        bit_depth
    );

    Ok(())
}
