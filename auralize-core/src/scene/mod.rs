//! Immutable scene model: vertices, triangles, and per-triangle surfaces.

pub mod loader;
pub mod material;

pub use material::{MaterialMap, Surface, DEFAULT_MATERIAL_NAME};

use crate::error::{AuralizeError, Result};
use crate::math::Vec3;

/// Three vertex indices plus one surface index. Winding is irrelevant;
/// all triangles are treated as two-sided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Triangle {
    pub v0: u32,
    pub v1: u32,
    pub v2: u32,
    pub surface: u32,
}

impl Triangle {
    pub fn new(v0: u32, v1: u32, v2: u32, surface: u32) -> Self {
        Self {
            v0,
            v1,
            v2,
            surface,
        }
    }
}

/// A validated bundle of geometry and materials, immutable after construction.
#[derive(Debug, Clone)]
pub struct Scene {
    vertices: Vec<Vec3>,
    triangles: Vec<Triangle>,
    surfaces: Vec<Surface>,
}

impl Scene {
    /// Build a scene, checking that the mesh is non-empty and that every
    /// vertex and surface index is in range.
    pub fn new(vertices: Vec<Vec3>, triangles: Vec<Triangle>, surfaces: Vec<Surface>) -> Result<Self> {
        if vertices.is_empty() {
            return Err(AuralizeError::Input("mesh has no vertices".to_string()));
        }
        if triangles.is_empty() {
            return Err(AuralizeError::Input("mesh has no triangles".to_string()));
        }

        let vertex_count = vertices.len() as u32;
        let surface_count = surfaces.len() as u32;
        for (index, triangle) in triangles.iter().enumerate() {
            if triangle.v0 >= vertex_count
                || triangle.v1 >= vertex_count
                || triangle.v2 >= vertex_count
            {
                return Err(AuralizeError::Input(format!(
                    "triangle {} references a vertex out of range",
                    index
                )));
            }
            if triangle.surface >= surface_count {
                return Err(AuralizeError::Input(format!(
                    "triangle {} references surface {} but only {} surfaces exist",
                    index, triangle.surface, surface_count
                )));
            }
        }

        Ok(Self {
            vertices,
            triangles,
            surfaces,
        })
    }

    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }

    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    pub fn surfaces(&self) -> &[Surface] {
        &self.surfaces
    }

    /// The three vertex positions of a triangle.
    pub fn triangle_vertices(&self, triangle: &Triangle) -> [Vec3; 3] {
        [
            self.vertices[triangle.v0 as usize],
            self.vertices[triangle.v1 as usize],
            self.vertices[triangle.v2 as usize],
        ]
    }

    /// Unit normal of a triangle. Orientation follows the stored winding;
    /// callers that care about side must orient it themselves.
    pub fn triangle_normal(&self, triangle: &Triangle) -> Vec3 {
        let [v0, v1, v2] = self.triangle_vertices(triangle);
        (v1 - v0).cross(v2 - v0).normalize()
    }

    pub fn surface_for(&self, triangle: &Triangle) -> &Surface {
        &self.surfaces[triangle.surface as usize]
    }
}
