//! Offline sinc resampling for the waveguide output.

use crate::error::{AuralizeError, Result};
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};

const CHUNK_SIZE: usize = 1024;

/// Resample a mono signal with high-quality sinc interpolation. The output
/// is trimmed to the expected converted length.
pub fn resample(input: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>> {
    if from_rate == 0 || to_rate == 0 {
        return Err(AuralizeError::Processing(
            "sample rates must be greater than 0".to_string(),
        ));
    }
    if from_rate == to_rate || input.is_empty() {
        return Ok(input.to_vec());
    }

    let ratio = to_rate as f64 / from_rate as f64;
    let parameters = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let mut resampler = SincFixedIn::<f32>::new(ratio, 1.0, parameters, CHUNK_SIZE, 1)
        .map_err(|e| AuralizeError::Processing(format!("failed to create resampler: {}", e)))?;

    let mut output = Vec::new();
    for chunk in input.chunks(CHUNK_SIZE) {
        let mut padded = vec![0.0f32; CHUNK_SIZE];
        padded[..chunk.len()].copy_from_slice(chunk);

        let waves = resampler
            .process(&[padded], None)
            .map_err(|e| AuralizeError::Processing(format!("resampling error: {}", e)))?;
        if let Some(channel) = waves.into_iter().next() {
            output.extend(channel);
        }
    }

    let expected = (input.len() as f64 * ratio).round() as usize;
    output.truncate(expected);
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_when_rates_match() {
        let signal = vec![0.1f32, 0.2, 0.3];
        assert_eq!(resample(&signal, 4000, 4000).unwrap(), signal);
    }

    #[test]
    fn test_output_length_scales_with_ratio() {
        let signal = vec![0.0f32; 4000];
        let out = resample(&signal, 4000, 44100).unwrap();
        assert_eq!(out.len(), 44100);
    }

    #[test]
    fn test_tone_survives_upsampling() {
        let from = 4000.0f32;
        let freq = 200.0f32;
        let signal: Vec<f32> = (0..8000)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / from).sin())
            .collect();

        let out = resample(&signal, 4000, 16000).unwrap();
        // ignore the filter's warm-up, then the tone should still peak near 1
        let peak = out[out.len() / 2..].iter().fold(0.0f32, |a, &b| a.max(b.abs()));
        assert!(peak > 0.9, "peak after resampling: {peak}");
    }

    #[test]
    fn test_rejects_zero_rate() {
        assert!(resample(&[0.0], 0, 44100).is_err());
    }
}
