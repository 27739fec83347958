//! Explicit two-buffer waveguide update.

use crate::error::{AuralizeError, Result};
use crate::waveguide::mesh::TetrahedralMesh;
use rayon::prelude::*;

/// Run the waveguide for `steps` steps with a unit excitation at
/// `source_index` and the output tap at `read_index`.
///
/// Each step sweeps every inside node with
/// `next = Σ current[ports] / 2 − previous[node]`, reading only the
/// current buffer and writing only the node's own slot in the previous
/// buffer, so the sweep is parallel over nodes with a barrier between
/// steps. The buffers then swap roles by pointer, and the tap reads the
/// post-swap previous buffer: the first output sample is the excitation
/// itself.
///
/// Outside nodes are never written and contribute nothing through ports,
/// acting as rigid pressure-zero boundaries.
pub fn run(
    mesh: &TetrahedralMesh,
    source_index: usize,
    read_index: usize,
    steps: usize,
) -> Result<Vec<f32>> {
    let node_count = mesh.len();
    if source_index >= node_count || read_index >= node_count {
        return Err(AuralizeError::Internal(format!(
            "waveguide tap out of range: source {}, read {}, {} nodes",
            source_index, read_index, node_count
        )));
    }

    let nodes = mesh.nodes();
    let mut previous = vec![0.0f32; node_count];
    let mut current = vec![0.0f32; node_count];
    current[source_index] = 1.0;

    let mut output = Vec::with_capacity(steps);
    for _ in 0..steps {
        let read_buffer = &current;
        previous.par_iter_mut().enumerate().for_each(|(index, slot)| {
            let node = &nodes[index];
            if !node.inside {
                return;
            }
            let mut sum = 0.0f32;
            for &port in &node.ports {
                if port >= 0 && nodes[port as usize].inside {
                    sum += read_buffer[port as usize];
                }
            }
            *slot = sum * 0.5 - *slot;
        });

        std::mem::swap(&mut previous, &mut current);
        output.push(previous[read_index]);
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary::CuboidBoundary;
    use crate::math::Vec3;

    fn test_mesh() -> TetrahedralMesh {
        let boundary = CuboidBoundary::new(Vec3::ZERO, Vec3::splat(2.0));
        TetrahedralMesh::new(&boundary, 0.4).unwrap()
    }

    #[test]
    fn test_initial_samples_at_coincident_taps() {
        let mesh = test_mesh();
        let source = mesh.index_for_coord(Vec3::splat(1.0)).unwrap();

        let output = run(&mesh, source, source, 3).unwrap();

        let node = &mesh.nodes()[source];
        let inside_neighbours = node
            .ports
            .iter()
            .filter(|&&p| p >= 0 && mesh.nodes()[p as usize].inside)
            .count() as f32;

        assert_eq!(output[0], 1.0);
        assert_eq!(output[1], 0.0);
        // each neighbour holds 1/2 after the first sweep
        let expected = (inside_neighbours * 0.5) * 0.5 - 1.0;
        assert!((output[2] - expected).abs() < 1e-6);
    }

    #[test]
    fn test_output_length_matches_steps() {
        let mesh = test_mesh();
        let source = mesh.index_for_coord(Vec3::splat(1.0)).unwrap();
        let output = run(&mesh, source, source, 64).unwrap();
        assert_eq!(output.len(), 64);
    }

    #[test]
    fn test_reciprocity() {
        let mesh = test_mesh();
        let a = mesh.index_for_coord(Vec3::new(0.7, 1.0, 1.0)).unwrap();
        let b = mesh.index_for_coord(Vec3::new(1.3, 1.1, 0.9)).unwrap();
        assert_ne!(a, b);

        let forward = run(&mesh, a, b, 128).unwrap();
        let backward = run(&mesh, b, a, 128).unwrap();
        for (x, y) in forward.iter().zip(backward.iter()) {
            assert!((x - y).abs() < 1e-4);
        }
    }

    #[test]
    fn test_energy_stays_bounded() {
        let mesh = test_mesh();
        let source = mesh.index_for_coord(Vec3::splat(1.0)).unwrap();
        let output = run(&mesh, source, source, 2048).unwrap();
        assert!(output.iter().all(|sample| sample.abs() <= 4.0));
    }

    #[test]
    fn test_outside_nodes_stay_silent() {
        let mesh = test_mesh();
        let source = mesh.index_for_coord(Vec3::splat(1.0)).unwrap();
        let outside = mesh
            .nodes()
            .iter()
            .position(|node| !node.inside)
            .expect("lattice must overhang the box");

        let output = run(&mesh, source, outside, 256).unwrap();
        assert!(output.iter().all(|&sample| sample == 0.0));
    }

    #[test]
    fn test_out_of_range_tap_is_an_error() {
        let mesh = test_mesh();
        assert!(run(&mesh, mesh.len(), 0, 8).is_err());
    }
}
