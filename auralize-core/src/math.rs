//! Math types for Auralize

pub use glam::Vec3;

/// Tolerance shared by the intersection and visibility tests.
pub const EPSILON: f32 = 1e-4;

/// A ray with an origin and a unit-length direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self { origin, direction }
    }
}

/// Möller–Trumbore ray/triangle intersection.
///
/// The test is two-sided (winding does not matter) and returns the ray
/// parameter `t` of the hit, or `None` on a miss or a negative-`t` hit.
pub fn triangle_intersection(v0: Vec3, v1: Vec3, v2: Vec3, ray: &Ray) -> Option<f32> {
    let e0 = v1 - v0;
    let e1 = v2 - v0;

    let pvec = ray.direction.cross(e1);
    let det = e0.dot(pvec);

    if det.abs() < EPSILON {
        return None;
    }

    let invdet = 1.0 / det;
    let tvec = ray.origin - v0;
    let u = invdet * tvec.dot(pvec);

    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let qvec = tvec.cross(e0);
    let v = invdet * ray.direction.dot(qvec);

    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = invdet * e1.dot(qvec);
    if t < 0.0 {
        return None;
    }

    Some(t)
}

/// Mirror a direction about a plane normal.
pub fn reflect_direction(direction: Vec3, normal: Vec3) -> Vec3 {
    direction - 2.0 * direction.dot(normal) * normal
}

/// Mirror a point across the plane through `on_plane` with unit normal `normal`.
pub fn reflect_point(point: Vec3, on_plane: Vec3, normal: Vec3) -> Vec3 {
    point - 2.0 * (point - on_plane).dot(normal) * normal
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_triangle_hit() {
        let v0 = Vec3::new(-1.0, -1.0, 5.0);
        let v1 = Vec3::new(1.0, -1.0, 5.0);
        let v2 = Vec3::new(0.0, 1.0, 5.0);
        let ray = Ray::new(Vec3::ZERO, Vec3::Z);

        let t = triangle_intersection(v0, v1, v2, &ray).expect("should hit");
        assert!((t - 5.0).abs() < 1e-5);
    }

    #[test]
    fn test_triangle_hit_is_two_sided() {
        let v0 = Vec3::new(-1.0, -1.0, 5.0);
        let v1 = Vec3::new(1.0, -1.0, 5.0);
        let v2 = Vec3::new(0.0, 1.0, 5.0);
        let ray = Ray::new(Vec3::ZERO, Vec3::Z);

        let flipped = triangle_intersection(v0, v2, v1, &ray).expect("should hit");
        assert!((flipped - 5.0).abs() < 1e-5);
    }

    #[test]
    fn test_triangle_miss_behind_origin() {
        let v0 = Vec3::new(-1.0, -1.0, -5.0);
        let v1 = Vec3::new(1.0, -1.0, -5.0);
        let v2 = Vec3::new(0.0, 1.0, -5.0);
        let ray = Ray::new(Vec3::ZERO, Vec3::Z);

        assert!(triangle_intersection(v0, v1, v2, &ray).is_none());
    }

    #[test]
    fn test_triangle_miss_outside() {
        let v0 = Vec3::new(-1.0, -1.0, 5.0);
        let v1 = Vec3::new(1.0, -1.0, 5.0);
        let v2 = Vec3::new(0.0, 1.0, 5.0);
        let ray = Ray::new(Vec3::new(4.0, 4.0, 0.0), Vec3::Z);

        assert!(triangle_intersection(v0, v1, v2, &ray).is_none());
    }

    #[test]
    fn test_triangle_miss_parallel() {
        let v0 = Vec3::new(-1.0, -1.0, 5.0);
        let v1 = Vec3::new(1.0, -1.0, 5.0);
        let v2 = Vec3::new(0.0, 1.0, 5.0);
        let ray = Ray::new(Vec3::ZERO, Vec3::X);

        assert!(triangle_intersection(v0, v1, v2, &ray).is_none());
    }

    #[test]
    fn test_reflect_direction() {
        let reflected = reflect_direction(Vec3::new(1.0, -1.0, 0.0).normalize(), Vec3::Y);
        let expected = Vec3::new(1.0, 1.0, 0.0).normalize();
        assert!((reflected - expected).length() < 1e-6);
    }

    #[test]
    fn test_reflect_point_across_plane() {
        let mirrored = reflect_point(Vec3::new(2.0, 3.0, 0.0), Vec3::ZERO, Vec3::Y);
        assert!((mirrored - Vec3::new(2.0, -3.0, 0.0)).length() < 1e-6);
    }
}
