//! Spatial boundaries: regions of space a simulation can fill.
//!
//! The waveguide mesh builder only needs an axis-aligned bounding box and
//! a point-inclusion test, so both sit behind the [`Boundary`] trait. The
//! triangle-mesh implementation lives in [`mesh::MeshBoundary`].

pub mod mesh;

pub use mesh::{Hit, MeshBoundary, DIVISIONS};

use crate::math::Vec3;

/// A bounded region of space.
pub trait Boundary {
    /// Does the point lie strictly inside the region?
    fn inside(&self, point: Vec3) -> bool;

    /// Tight axis-aligned bounding box of the region.
    fn aabb(&self) -> CuboidBoundary;
}

/// An axis-aligned box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CuboidBoundary {
    pub min: Vec3,
    pub max: Vec3,
}

impl CuboidBoundary {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Bounding box of a point set. `None` when the set is empty.
    pub fn from_points<I: IntoIterator<Item = Vec3>>(points: I) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let (min, max) = iter.fold((first, first), |(min, max), p| (min.min(p), max.max(p)));
        Some(Self { min, max })
    }

    pub fn dimensions(&self) -> Vec3 {
        self.max - self.min
    }
}

impl Boundary for CuboidBoundary {
    fn inside(&self, point: Vec3) -> bool {
        self.min.x < point.x
            && point.x < self.max.x
            && self.min.y < point.y
            && point.y < self.max.y
            && self.min.z < point.z
            && point.z < self.max.z
    }

    fn aabb(&self) -> CuboidBoundary {
        *self
    }
}

/// A sphere.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SphereBoundary {
    pub centre: Vec3,
    pub radius: f32,
}

impl SphereBoundary {
    pub fn new(centre: Vec3, radius: f32) -> Self {
        Self { centre, radius }
    }
}

impl Boundary for SphereBoundary {
    fn inside(&self, point: Vec3) -> bool {
        (point - self.centre).length() < self.radius
    }

    fn aabb(&self) -> CuboidBoundary {
        let extent = Vec3::splat(self.radius);
        CuboidBoundary::new(self.centre - extent, self.centre + extent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cuboid_from_points() {
        let aabb = CuboidBoundary::from_points([
            Vec3::new(1.0, -2.0, 0.5),
            Vec3::new(-1.0, 3.0, 0.0),
            Vec3::new(0.0, 0.0, 2.0),
        ])
        .unwrap();
        assert_eq!(aabb.min, Vec3::new(-1.0, -2.0, 0.0));
        assert_eq!(aabb.max, Vec3::new(1.0, 3.0, 2.0));
        assert!(CuboidBoundary::from_points([]).is_none());
    }

    #[test]
    fn test_cuboid_inside_is_strict() {
        let aabb = CuboidBoundary::new(Vec3::ZERO, Vec3::splat(1.0));
        assert!(aabb.inside(Vec3::splat(0.5)));
        assert!(!aabb.inside(Vec3::splat(1.0)));
        assert!(!aabb.inside(Vec3::new(0.5, 0.5, 1.5)));
    }

    #[test]
    fn test_sphere_inside() {
        let sphere = SphereBoundary::new(Vec3::splat(1.0), 0.5);
        assert!(sphere.inside(Vec3::new(1.2, 1.0, 1.0)));
        assert!(!sphere.inside(Vec3::ZERO));
        let aabb = sphere.aabb();
        assert_eq!(aabb.min, Vec3::splat(0.5));
        assert_eq!(aabb.max, Vec3::splat(1.5));
    }
}
