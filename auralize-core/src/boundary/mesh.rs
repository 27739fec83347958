//! Triangle-mesh boundary with a 2D spatial hash.
//!
//! Triangles are bucketed into a `DIVISIONS`×`DIVISIONS` grid over the
//! xy-projection of the scene's bounding box. The grid serves two queries:
//!
//! - `inside`: parity of axis-aligned +z ray crossings, which only ever
//!   needs the one cell containing the query point's xy.
//! - `intersect`: a 2D DDA walk over the cells crossed by the ray's xy
//!   projection, testing each cell's triangles and accepting a hit only
//!   once its `t` falls within the current cell.

use crate::boundary::{Boundary, CuboidBoundary};
use crate::math::{triangle_intersection, Ray, Vec3, EPSILON};
use crate::scene::Scene;

/// Grid resolution of the spatial hash, per axis.
pub const DIVISIONS: usize = 1024;

/// Closest intersection between a ray and the mesh.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    pub t: f32,
    pub triangle: u32,
}

/// A closed triangle mesh with an acceleration grid over its xy-projection.
#[derive(Debug, Clone)]
pub struct MeshBoundary {
    scene: Scene,
    aabb: CuboidBoundary,
    cell_size: Vec3,
    refs: Vec<Vec<u32>>,
}

impl MeshBoundary {
    pub fn new(scene: Scene) -> Self {
        let aabb = CuboidBoundary::from_points(scene.vertices().iter().copied())
            .expect("scene construction guarantees at least one vertex");
        let cell_size = (aabb.dimensions() / DIVISIONS as f32).max(Vec3::splat(f32::EPSILON));

        let mut boundary = Self {
            scene,
            aabb,
            cell_size,
            refs: vec![Vec::new(); DIVISIONS * DIVISIONS],
        };
        boundary.build_triangle_references();
        boundary
    }

    fn build_triangle_references(&mut self) {
        let limit = DIVISIONS as i64 - 1;
        for (index, triangle) in self.scene.triangles().iter().enumerate() {
            let [v0, v1, v2] = self.scene.triangle_vertices(triangle);
            let bounds = CuboidBoundary::from_points([v0, v1, v2]).unwrap();
            let (min_x, min_y) = self.hash_point(bounds.min);
            let (max_x, max_y) = self.hash_point(bounds.max);

            let min_x = min_x.clamp(0, limit);
            let min_y = min_y.clamp(0, limit);
            let max_x = max_x.clamp(0, limit);
            let max_y = max_y.clamp(0, limit);

            for x in min_x..=max_x {
                for y in min_y..=max_y {
                    self.refs[x as usize * DIVISIONS + y as usize].push(index as u32);
                }
            }
        }
    }

    fn hash_point(&self, point: Vec3) -> (i64, i64) {
        let relative = (point - self.aabb.min) / self.cell_size;
        (relative.x.floor() as i64, relative.y.floor() as i64)
    }

    fn cell_refs(&self, x: i64, y: i64) -> &[u32] {
        if (0..DIVISIONS as i64).contains(&x) && (0..DIVISIONS as i64).contains(&y) {
            &self.refs[x as usize * DIVISIONS + y as usize]
        } else {
            &[]
        }
    }

    /// Best hit among one cell's triangles: minimum positive `t`, ties
    /// within `EPSILON` resolved toward the lower triangle index.
    fn best_in_cell(&self, x: i64, y: i64, ray: &Ray) -> Option<Hit> {
        let mut best: Option<Hit> = None;
        for &index in self.cell_refs(x, y) {
            let triangle = &self.scene.triangles()[index as usize];
            let [v0, v1, v2] = self.scene.triangle_vertices(triangle);
            let Some(t) = triangle_intersection(v0, v1, v2, ray) else {
                continue;
            };
            if t <= 0.0 {
                continue;
            }
            best = match best {
                None => Some(Hit { t, triangle: index }),
                Some(current) => {
                    if t < current.t - EPSILON
                        || ((t - current.t).abs() <= EPSILON && index < current.triangle)
                    {
                        Some(Hit {
                            t: t.min(current.t),
                            triangle: index,
                        })
                    } else {
                        Some(current)
                    }
                }
            };
        }
        best
    }

    /// `t` range over which the ray's xy-projection stays within the grid.
    fn grid_clip(&self, ray: &Ray) -> Option<(f32, f32)> {
        let mut t_entry = 0.0f32;
        let mut t_exit = f32::INFINITY;

        for (origin, direction, min, max) in [
            (ray.origin.x, ray.direction.x, self.aabb.min.x, self.aabb.max.x),
            (ray.origin.y, ray.direction.y, self.aabb.min.y, self.aabb.max.y),
        ] {
            if direction.abs() < f32::EPSILON {
                if origin < min || origin > max {
                    return None;
                }
                continue;
            }
            let t0 = (min - origin) / direction;
            let t1 = (max - origin) / direction;
            let (near, far) = if t0 < t1 { (t0, t1) } else { (t1, t0) };
            t_entry = t_entry.max(near);
            t_exit = t_exit.min(far);
        }

        (t_entry <= t_exit).then_some((t_entry, t_exit))
    }

    /// Closest positive-`t` intersection of the ray with the mesh.
    ///
    /// Walks the cells under the ray's xy-projection front to back. A
    /// candidate hit whose `t` lies beyond the current cell's exit is
    /// deferred; the owning cell re-discovers it when reached.
    pub fn intersect(&self, ray: &Ray) -> Option<Hit> {
        let (t_entry, t_exit) = self.grid_clip(ray)?;

        let start = ray.origin + ray.direction * t_entry;
        let limit = DIVISIONS as i64 - 1;
        let (mut x, mut y) = self.hash_point(start);
        x = x.clamp(0, limit);
        y = y.clamp(0, limit);

        let step_x: i64 = if ray.direction.x > 0.0 {
            1
        } else if ray.direction.x < 0.0 {
            -1
        } else {
            0
        };
        let step_y: i64 = if ray.direction.y > 0.0 {
            1
        } else if ray.direction.y < 0.0 {
            -1
        } else {
            0
        };

        let t_delta_x = if step_x == 0 {
            f32::INFINITY
        } else {
            self.cell_size.x / ray.direction.x.abs()
        };
        let t_delta_y = if step_y == 0 {
            f32::INFINITY
        } else {
            self.cell_size.y / ray.direction.y.abs()
        };

        let mut t_max_x = if step_x == 0 {
            f32::INFINITY
        } else {
            let edge = self.aabb.min.x + (x + i64::from(step_x > 0)) as f32 * self.cell_size.x;
            (edge - ray.origin.x) / ray.direction.x
        };
        let mut t_max_y = if step_y == 0 {
            f32::INFINITY
        } else {
            let edge = self.aabb.min.y + (y + i64::from(step_y > 0)) as f32 * self.cell_size.y;
            (edge - ray.origin.y) / ray.direction.y
        };

        loop {
            let cell_exit = t_max_x.min(t_max_y).min(t_exit);

            if let Some(hit) = self.best_in_cell(x, y, ray) {
                if hit.t <= cell_exit + EPSILON {
                    return Some(hit);
                }
            }

            if t_max_x.min(t_max_y) >= t_exit {
                return None;
            }

            if t_max_x <= t_max_y {
                if step_x == 0 {
                    return None;
                }
                x += step_x;
                t_max_x += t_delta_x;
            } else {
                if step_y == 0 {
                    return None;
                }
                y += step_y;
                t_max_y += t_delta_y;
            }

            if !(0..DIVISIONS as i64).contains(&x) || !(0..DIVISIONS as i64).contains(&y) {
                return None;
            }
        }
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn cell_size(&self) -> Vec3 {
        self.cell_size
    }
}

impl Boundary for MeshBoundary {
    /// Cast a +z ray from the point and count crossings among the triangles
    /// referenced by the point's own cell; odd means inside. Only that cell
    /// can contribute because the ray is axis-aligned in z.
    fn inside(&self, point: Vec3) -> bool {
        let (x, y) = self.hash_point(point);
        let ray = Ray::new(point, Vec3::Z);
        let crossings = self
            .cell_refs(x, y)
            .iter()
            .filter(|&&index| {
                let triangle = &self.scene.triangles()[index as usize];
                let [v0, v1, v2] = self.scene.triangle_vertices(triangle);
                triangle_intersection(v0, v1, v2, &ray).is_some()
            })
            .count();
        crossings % 2 == 1
    }

    fn aabb(&self) -> CuboidBoundary {
        self.aabb
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{Surface, Triangle};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn cube_scene(side: f32) -> Scene {
        let s = side;
        let vertices = vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(s, 0.0, 0.0),
            Vec3::new(s, s, 0.0),
            Vec3::new(0.0, s, 0.0),
            Vec3::new(0.0, 0.0, s),
            Vec3::new(s, 0.0, s),
            Vec3::new(s, s, s),
            Vec3::new(0.0, s, s),
        ];
        let quads = [
            [0u32, 1, 2, 3], // floor
            [4, 5, 6, 7],    // ceiling
            [0, 1, 5, 4],    // y = 0
            [3, 2, 6, 7],    // y = s
            [0, 3, 7, 4],    // x = 0
            [1, 2, 6, 5],    // x = s
        ];
        let triangles = quads
            .iter()
            .flat_map(|q| {
                [
                    Triangle::new(q[0], q[1], q[2], 0),
                    Triangle::new(q[0], q[2], q[3], 0),
                ]
            })
            .collect();
        Scene::new(vertices, triangles, vec![Surface::RIGID]).unwrap()
    }

    #[test]
    fn test_inside_cube() {
        let boundary = MeshBoundary::new(cube_scene(4.0));
        let offset = boundary.cell_size().x / 8.0;

        assert!(boundary.inside(Vec3::new(2.0, 2.0, 2.0)));
        assert!(boundary.inside(Vec3::new(offset, offset, offset)));
        assert!(boundary.inside(Vec3::new(4.0 - offset, 4.0 - offset, 4.0 - offset)));

        assert!(!boundary.inside(Vec3::new(2.0, 2.0, 4.0 + offset)));
        assert!(!boundary.inside(Vec3::new(-offset, 2.0, 2.0)));
        assert!(!boundary.inside(Vec3::new(2.0, 5.0, 2.0)));
    }

    #[test]
    fn test_single_triangle_parity_is_consistent() {
        // An open manifold: the parity test cannot call both sides the same.
        let vertices = vec![
            Vec3::new(0.0, 0.0, 1.0),
            Vec3::new(2.0, 0.0, 1.0),
            Vec3::new(1.0, 2.0, 1.0),
        ];
        let triangles = vec![Triangle::new(0, 1, 2, 0)];
        let scene = Scene::new(vertices, triangles, vec![Surface::RIGID]).unwrap();
        let boundary = MeshBoundary::new(scene);

        let below = boundary.inside(Vec3::new(1.0, 0.5, 0.5));
        let above = boundary.inside(Vec3::new(1.0, 0.5, 1.5));
        assert!(below ^ above);
    }

    #[test]
    fn test_intersect_hits_each_wall() {
        let boundary = MeshBoundary::new(cube_scene(4.0));
        let centre = Vec3::splat(2.0);
        for direction in [
            Vec3::X,
            -Vec3::X,
            Vec3::Y,
            -Vec3::Y,
            Vec3::Z,
            -Vec3::Z,
            Vec3::new(1.0, 1.0, 0.3).normalize(),
        ] {
            let hit = boundary
                .intersect(&Ray::new(centre, direction))
                .expect("ray from the centre must hit a wall");
            assert!(hit.t > 0.0 && hit.t <= 4.0 * 3f32.sqrt());
        }
        // axis-aligned rays exit at distance 2
        let hit = boundary.intersect(&Ray::new(centre, Vec3::X)).unwrap();
        assert!((hit.t - 2.0).abs() < 1e-3);
    }

    #[test]
    fn test_intersect_from_outside_grid() {
        let boundary = MeshBoundary::new(cube_scene(4.0));
        let ray = Ray::new(Vec3::new(-3.0, 2.0, 2.0), Vec3::X);
        let hit = boundary.intersect(&ray).expect("should enter and hit x=0 wall");
        assert!((hit.t - 3.0).abs() < 1e-3);

        let miss = Ray::new(Vec3::new(-3.0, 2.0, 2.0), -Vec3::X);
        assert!(boundary.intersect(&miss).is_none());
    }

    #[test]
    fn test_intersect_matches_brute_force() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        let mut vertices = Vec::new();
        let mut triangles = Vec::new();
        for i in 0..40u32 {
            for _ in 0..3 {
                vertices.push(Vec3::new(
                    rng.gen_range(0.0..10.0),
                    rng.gen_range(0.0..10.0),
                    rng.gen_range(0.0..10.0),
                ));
            }
            triangles.push(Triangle::new(i * 3, i * 3 + 1, i * 3 + 2, 0));
        }
        let scene = Scene::new(vertices, triangles, vec![Surface::RIGID]).unwrap();
        let boundary = MeshBoundary::new(scene);

        for _ in 0..200 {
            let origin = Vec3::new(
                rng.gen_range(-2.0..12.0),
                rng.gen_range(-2.0..12.0),
                rng.gen_range(-2.0..12.0),
            );
            let direction = Vec3::new(
                rng.gen_range(-1.0..1.0f32),
                rng.gen_range(-1.0..1.0f32),
                rng.gen_range(-1.0..1.0f32),
            );
            if direction.length() < 1e-3 {
                continue;
            }
            let ray = Ray::new(origin, direction.normalize());

            let mut expected: Option<Hit> = None;
            for (index, triangle) in boundary.scene().triangles().iter().enumerate() {
                let [v0, v1, v2] = boundary.scene().triangle_vertices(triangle);
                if let Some(t) = triangle_intersection(v0, v1, v2, &ray) {
                    if t <= 0.0 {
                        continue;
                    }
                    expected = match expected {
                        None => Some(Hit {
                            t,
                            triangle: index as u32,
                        }),
                        Some(current)
                            if t < current.t - EPSILON
                                || ((t - current.t).abs() <= EPSILON
                                    && (index as u32) < current.triangle) =>
                        {
                            Some(Hit {
                                t: t.min(current.t),
                                triangle: index as u32,
                            })
                        }
                        other => other,
                    };
                }
            }

            let actual = boundary.intersect(&ray);
            match (expected, actual) {
                (None, None) => {}
                (Some(e), Some(a)) => {
                    assert_eq!(e.triangle, a.triangle, "ray {:?}", ray);
                    assert!((e.t - a.t).abs() < 1e-4);
                }
                (e, a) => panic!("mismatch for ray {:?}: expected {:?}, got {:?}", ray, e, a),
            }
        }
    }
}
