//! Wavefront OBJ loading.
//!
//! Meshes are triangulated on load. Each OBJ mesh resolves its MTL material
//! name against the material file; meshes without a material binding fall
//! back to the `"default"` entry.

use crate::error::{AuralizeError, Result};
use crate::math::Vec3;
use crate::scene::material::{MaterialMap, DEFAULT_MATERIAL_NAME};
use crate::scene::{Scene, Triangle};
use std::collections::BTreeMap;
use std::path::Path;

/// Load an OBJ model and bind each triangle to a surface from `materials`.
pub fn load_scene<P: AsRef<Path>>(model_path: P, materials: &MaterialMap) -> Result<Scene> {
    let load_options = tobj::LoadOptions {
        triangulate: true,
        ..Default::default()
    };

    let (models, obj_materials) = tobj::load_obj(model_path.as_ref(), &load_options)
        .map_err(|e| {
            AuralizeError::Input(format!(
                "failed to read model {}: {}",
                model_path.as_ref().display(),
                e
            ))
        })?;

    let obj_materials = match obj_materials {
        Ok(list) => list,
        Err(e) => {
            log::warn!("no usable MTL data ({}), falling back to default material", e);
            Vec::new()
        }
    };

    let mut vertices = Vec::new();
    let mut triangles = Vec::new();
    let mut surfaces = Vec::new();
    let mut surface_indices: BTreeMap<String, u32> = BTreeMap::new();

    for model in &models {
        let mesh = &model.mesh;

        let material_name = mesh
            .material_id
            .and_then(|id| obj_materials.get(id))
            .map(|m| m.name.as_str())
            .unwrap_or(DEFAULT_MATERIAL_NAME);

        let surface_index = match surface_indices.get(material_name) {
            Some(&index) => index,
            None => {
                let surface = materials.get(material_name).ok_or_else(|| {
                    AuralizeError::Input(format!(
                        "mesh '{}' references material '{}' which is missing from the material file",
                        model.name, material_name
                    ))
                })?;
                let index = surfaces.len() as u32;
                surfaces.push(*surface);
                surface_indices.insert(material_name.to_string(), index);
                index
            }
        };

        let base = vertices.len() as u32;
        for position in mesh.positions.chunks_exact(3) {
            vertices.push(Vec3::new(position[0], position[1], position[2]));
        }

        for face in mesh.indices.chunks_exact(3) {
            triangles.push(Triangle::new(
                base + face[0],
                base + face[1],
                base + face[2],
                surface_index,
            ));
        }
    }

    log::info!(
        "loaded model: {} vertices, {} triangles, {} surfaces",
        vertices.len(),
        triangles.len(),
        surfaces.len()
    );

    Scene::new(vertices, triangles, surfaces)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::material::parse_materials;
    use std::io::Write;

    const CUBE_OBJ: &str = "\
v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nv 0 0 1\nv 1 0 1\nv 1 1 1\nv 0 1 1\n\
f 1 2 3 4\nf 5 8 7 6\nf 1 5 6 2\nf 2 6 7 3\nf 3 7 8 4\nf 5 1 4 8\n";

    const MATERIALS: &str = r#"{
        "default": {
            "specular": [0.9, 0.9, 0.9, 0.9, 0.9, 0.9, 0.9, 0.9],
            "diffuse":  [0.9, 0.9, 0.9, 0.9, 0.9, 0.9, 0.9, 0.9]
        }
    }"#;

    #[test]
    fn test_load_cube_obj() {
        let dir = std::env::temp_dir();
        let path = dir.join("auralize_loader_test_cube.obj");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(CUBE_OBJ.as_bytes()).unwrap();

        let materials = parse_materials(MATERIALS).unwrap();
        let scene = load_scene(&path, &materials).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(scene.vertices().len(), 8);
        // six quad faces triangulated
        assert_eq!(scene.triangles().len(), 12);
        assert_eq!(scene.surfaces().len(), 1);
    }

    #[test]
    fn test_missing_material_is_an_error() {
        let dir = std::env::temp_dir();
        let path = dir.join("auralize_loader_test_missing.obj");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(CUBE_OBJ.as_bytes()).unwrap();

        let materials = MaterialMap::new();
        let result = load_scene(&path, &materials);
        std::fs::remove_file(&path).ok();

        assert!(result.is_err());
    }
}
