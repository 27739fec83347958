//! Render configuration parsing.
//!
//! The configuration is a JSON object. Unknown keys are ignored; missing
//! required keys and malformed values fail with a `Config` error.

use crate::error::{AuralizeError, Result};
use crate::math::Vec3;
use serde::Deserialize;
use std::path::Path;

/// Which impulse population feeds the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    #[default]
    All,
    ImageOnly,
    DiffuseOnly,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RenderConfig {
    /// Number of rays to trace.
    pub rays: usize,
    /// Maximum reflection depth per ray.
    pub reflections: usize,
    /// Output sample rate in Hz.
    pub sample_rate: u32,
    /// Output WAV bit depth, 16 or 24.
    pub bit_depth: u16,
    /// Source position in metres.
    pub source_position: [f32; 3],
    /// Microphone position in metres.
    pub mic_position: [f32; 3],

    /// Lower frequency limit of the ray-traced output in Hz.
    #[serde(default = "default_hipass")]
    pub hipass: f32,
    #[serde(default = "default_true")]
    pub normalize: bool,
    #[serde(default = "default_volume_scale")]
    pub volume_scale: f32,
    /// Accepted but currently without effect.
    #[serde(default)]
    pub trim_predelay: bool,
    /// Drop the unreflected source-to-mic arrival.
    #[serde(default)]
    pub remove_direct: bool,
    #[serde(default)]
    pub trim_tail: bool,
    #[serde(default)]
    pub output_mode: OutputMode,
    /// Fixed RNG seed for reproducible ray directions.
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_hipass() -> f32 {
    45.0
}

fn default_true() -> bool {
    true
}

fn default_volume_scale() -> f32 {
    1.0
}

impl RenderConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        let config: RenderConfig = serde_json::from_str(text)
            .map_err(|e| AuralizeError::Config(format!("failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            AuralizeError::Config(format!(
                "failed to read config {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_json(&text)
    }

    fn validate(&self) -> Result<()> {
        if self.rays == 0 {
            return Err(AuralizeError::Config("rays must be at least 1".to_string()));
        }
        if self.reflections == 0 {
            return Err(AuralizeError::Config(
                "reflections must be at least 1".to_string(),
            ));
        }
        if self.sample_rate == 0 {
            return Err(AuralizeError::Config(
                "sample_rate must be at least 1".to_string(),
            ));
        }
        if self.bit_depth != 16 && self.bit_depth != 24 {
            return Err(AuralizeError::Config(format!(
                "bit_depth must be 16 or 24, got {}",
                self.bit_depth
            )));
        }
        if !self.hipass.is_finite() || self.hipass < 0.0 {
            return Err(AuralizeError::Config(format!(
                "hipass must be a non-negative frequency, got {}",
                self.hipass
            )));
        }
        if !self.volume_scale.is_finite() || self.volume_scale <= 0.0 {
            return Err(AuralizeError::Config(format!(
                "volume_scale must be positive, got {}",
                self.volume_scale
            )));
        }
        let positions = self
            .source_position
            .iter()
            .chain(self.mic_position.iter());
        for component in positions {
            if !component.is_finite() {
                return Err(AuralizeError::Config(
                    "positions must be finite".to_string(),
                ));
            }
        }
        Ok(())
    }

    pub fn source(&self) -> Vec3 {
        Vec3::from_array(self.source_position)
    }

    pub fn mic(&self) -> Vec3 {
        Vec3::from_array(self.mic_position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"{
        "rays": 1024,
        "reflections": 16,
        "sample_rate": 44100,
        "bit_depth": 16,
        "source_position": [2.0, 2.0, 1.0],
        "mic_position": [2.0, 2.0, 3.0]
    }"#;

    #[test]
    fn test_minimal_config_with_defaults() {
        let config = RenderConfig::from_json(MINIMAL).unwrap();
        assert_eq!(config.rays, 1024);
        assert_eq!(config.hipass, 45.0);
        assert!(config.normalize);
        assert_eq!(config.volume_scale, 1.0);
        assert!(!config.remove_direct);
        assert!(!config.trim_tail);
        assert_eq!(config.output_mode, OutputMode::All);
        assert_eq!(config.seed, None);
        assert_eq!(config.source(), Vec3::new(2.0, 2.0, 1.0));
    }

    #[test]
    fn test_missing_required_key_fails() {
        let text = r#"{ "rays": 1024 }"#;
        assert!(matches!(
            RenderConfig::from_json(text),
            Err(AuralizeError::Config(_))
        ));
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let text = MINIMAL.trim_end().trim_end_matches('}').to_string()
            + r#", "someday_maybe": true }"#;
        assert!(RenderConfig::from_json(&text).is_ok());
    }

    #[test]
    fn test_rejects_bad_bit_depth() {
        let text = MINIMAL.replace("\"bit_depth\": 16", "\"bit_depth\": 12");
        assert!(RenderConfig::from_json(&text).is_err());
    }

    #[test]
    fn test_rejects_type_mismatch() {
        let text = MINIMAL.replace("\"rays\": 1024", "\"rays\": \"lots\"");
        assert!(RenderConfig::from_json(&text).is_err());
    }

    #[test]
    fn test_rejects_short_position() {
        let text = MINIMAL.replace("[2.0, 2.0, 1.0]", "[2.0, 2.0]");
        assert!(RenderConfig::from_json(&text).is_err());
    }

    #[test]
    fn test_output_mode_parsing() {
        let text = MINIMAL.trim_end().trim_end_matches('}').to_string()
            + r#", "output_mode": "image_only", "seed": 7 }"#;
        let config = RenderConfig::from_json(&text).unwrap();
        assert_eq!(config.output_mode, OutputMode::ImageOnly);
        assert_eq!(config.seed, Some(7));
    }
}
