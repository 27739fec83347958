//! Acoustic surface materials.
//!
//! A surface carries two eight-band gain spectra: one applied on specular
//! reflection, one on diffuse scattering. Material files map material names
//! to surfaces as a JSON object:
//!
//! ```json
//! {
//!     "concrete": {
//!         "specular": [0.99, 0.99, 0.98, 0.98, 0.97, 0.96, 0.95, 0.95],
//!         "diffuse":  [0.95, 0.9, 0.9, 0.85, 0.85, 0.8, 0.8, 0.75]
//!     }
//! }
//! ```

use crate::error::{AuralizeError, Result};
use crate::spectrum::VolumeSpectrum;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Material name used for triangles whose mesh carries no material binding.
pub const DEFAULT_MATERIAL_NAME: &str = "default";

/// Per-surface acoustic response, one gain spectrum per reflection kind.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Surface {
    /// Gain applied when a ray reflects specularly off this surface.
    pub specular: VolumeSpectrum,
    /// Gain applied when energy scatters diffusely off this surface.
    pub diffuse: VolumeSpectrum,
}

impl Surface {
    /// A perfectly reflective surface. Handy in tests.
    pub const RIGID: Self = Self {
        specular: VolumeSpectrum::ONE,
        diffuse: VolumeSpectrum::ONE,
    };

    pub fn validate(&self) -> Result<()> {
        if !self.specular.is_gain() {
            return Err(AuralizeError::Input(
                "specular spectrum values must be between 0.0 and 1.0".to_string(),
            ));
        }
        if !self.diffuse.is_gain() {
            return Err(AuralizeError::Input(
                "diffuse spectrum values must be between 0.0 and 1.0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Named material library parsed from a material file.
pub type MaterialMap = BTreeMap<String, Surface>;

/// Parse a JSON material file into a name-to-surface map.
pub fn parse_materials(text: &str) -> Result<MaterialMap> {
    let materials: MaterialMap = serde_json::from_str(text)
        .map_err(|e| AuralizeError::Input(format!("failed to parse material file: {}", e)))?;

    for (name, surface) in &materials {
        surface
            .validate()
            .map_err(|e| AuralizeError::Input(format!("material '{}': {}", name, e)))?;
    }

    Ok(materials)
}

/// Read and parse a material file from disk.
pub fn load_materials<P: AsRef<Path>>(path: P) -> Result<MaterialMap> {
    let text = std::fs::read_to_string(path.as_ref()).map_err(|e| {
        AuralizeError::Input(format!(
            "failed to read material file {}: {}",
            path.as_ref().display(),
            e
        ))
    })?;
    parse_materials(&text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_materials() {
        let text = r#"{
            "concrete": {
                "specular": [0.99, 0.99, 0.98, 0.98, 0.97, 0.96, 0.95, 0.95],
                "diffuse":  [0.95, 0.9, 0.9, 0.85, 0.85, 0.8, 0.8, 0.75]
            },
            "carpet": {
                "specular": [0.9, 0.8, 0.7, 0.6, 0.5, 0.4, 0.3, 0.2],
                "diffuse":  [0.9, 0.8, 0.7, 0.6, 0.5, 0.4, 0.3, 0.2]
            }
        }"#;

        let materials = parse_materials(text).unwrap();
        assert_eq!(materials.len(), 2);
        assert!((materials["concrete"].specular[0] - 0.99).abs() < 1e-6);
        assert!((materials["carpet"].diffuse[7] - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_rejects_out_of_range_gain() {
        let text = r#"{
            "bad": {
                "specular": [1.5, 0.9, 0.9, 0.9, 0.9, 0.9, 0.9, 0.9],
                "diffuse":  [0.9, 0.9, 0.9, 0.9, 0.9, 0.9, 0.9, 0.9]
            }
        }"#;

        assert!(parse_materials(text).is_err());
    }

    #[test]
    fn test_rejects_wrong_band_count() {
        let text = r#"{
            "short": {
                "specular": [0.9, 0.9],
                "diffuse":  [0.9, 0.9]
            }
        }"#;

        assert!(parse_materials(text).is_err());
    }
}
