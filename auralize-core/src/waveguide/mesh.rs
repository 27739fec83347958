//! Tetrahedrally linked node mesh.
//!
//! The lattice is the union of two cubic sublattices offset by half the
//! cell spacing along every axis. Every node has four neighbours at
//! tetrahedral angles: parity-0 nodes link through
//! `(+,+,+), (-,-,+), (-,+,-), (+,-,-)` scaled by half the spacing, and
//! parity-1 nodes through the negated set in the same port order, which
//! makes the linkage symmetric port-for-port.

use crate::boundary::Boundary;
use crate::error::{AuralizeError, Result};
use crate::math::Vec3;
use rayon::prelude::*;

/// Ports per node.
pub const PORTS: usize = 4;

/// Port value marking "no neighbour".
pub const NO_NEIGHBOUR: i32 = -1;

/// Neighbour cell offsets, indexed `[parity][port] -> (di, dj, dk)`.
/// A parity-0 node's neighbours are all parity-1 and vice versa.
const NEIGHBOUR_CELLS: [[(i64, i64, i64); PORTS]; 2] = [
    [(0, 0, 0), (-1, -1, 0), (-1, 0, -1), (0, -1, -1)],
    [(0, 0, 0), (1, 1, 0), (1, 0, 1), (0, 1, 1)],
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Node {
    pub ports: [i32; PORTS],
    pub position: Vec3,
    pub inside: bool,
}

/// An immutable tetrahedral node mesh filling a bounded region.
#[derive(Debug, Clone)]
pub struct TetrahedralMesh {
    nodes: Vec<Node>,
    origin: Vec3,
    cube_side: f32,
    cells: [usize; 3],
}

impl TetrahedralMesh {
    /// Build the mesh covering the boundary's bounding box at the given
    /// spacing, marking each node inside or outside the boundary.
    pub fn new<B: Boundary + Sync + ?Sized>(boundary: &B, cube_side: f32) -> Result<Self> {
        if !(cube_side > 0.0) {
            return Err(AuralizeError::Config(format!(
                "waveguide spacing must be positive, got {}",
                cube_side
            )));
        }

        let aabb = boundary.aabb();
        let extent = aabb.dimensions();
        let cells = [
            (extent.x / cube_side).ceil() as usize + 1,
            (extent.y / cube_side).ceil() as usize + 1,
            (extent.z / cube_side).ceil() as usize + 1,
        ];

        let mesh = Self {
            nodes: Vec::new(),
            origin: aabb.min,
            cube_side,
            cells,
        };

        let count = cells[0] * cells[1] * cells[2] * 2;
        let nodes: Vec<Node> = (0..count)
            .into_par_iter()
            .map(|index| mesh.build_node(index, boundary))
            .collect();

        let mesh = Self { nodes, ..mesh };
        mesh.check_port_symmetry()?;

        log::info!(
            "waveguide mesh: {} nodes ({} inside), spacing {:.4}",
            mesh.nodes.len(),
            mesh.nodes.iter().filter(|n| n.inside).count(),
            cube_side
        );

        Ok(mesh)
    }

    fn build_node<B: Boundary + ?Sized>(&self, index: usize, boundary: &B) -> Node {
        let (cell, parity) = self.split_index(index);
        let position = self.node_position(cell, parity);

        let mut ports = [NO_NEIGHBOUR; PORTS];
        for (port, &(di, dj, dk)) in NEIGHBOUR_CELLS[parity].iter().enumerate() {
            let neighbour = [cell[0] + di, cell[1] + dj, cell[2] + dk];
            if let Some(neighbour_index) = self.node_index(neighbour, 1 - parity) {
                ports[port] = neighbour_index as i32;
            }
        }

        Node {
            ports,
            position,
            inside: boundary.inside(position),
        }
    }

    fn split_index(&self, index: usize) -> ([i64; 3], usize) {
        let parity = index % 2;
        let cell = index / 2;
        let k = cell % self.cells[2];
        let j = (cell / self.cells[2]) % self.cells[1];
        let i = cell / (self.cells[2] * self.cells[1]);
        ([i as i64, j as i64, k as i64], parity)
    }

    fn node_index(&self, cell: [i64; 3], parity: usize) -> Option<usize> {
        let [i, j, k] = cell;
        if i < 0
            || j < 0
            || k < 0
            || i >= self.cells[0] as i64
            || j >= self.cells[1] as i64
            || k >= self.cells[2] as i64
        {
            return None;
        }
        let cell = (i as usize * self.cells[1] + j as usize) * self.cells[2] + k as usize;
        Some(cell * 2 + parity)
    }

    fn node_position(&self, cell: [i64; 3], parity: usize) -> Vec3 {
        let offset = if parity == 0 { 0.0 } else { 0.5 };
        self.origin
            + Vec3::new(
                (cell[0] as f32 + offset) * self.cube_side,
                (cell[1] as f32 + offset) * self.cube_side,
                (cell[2] as f32 + offset) * self.cube_side,
            )
    }

    fn check_port_symmetry(&self) -> Result<()> {
        for (index, node) in self.nodes.iter().enumerate() {
            for (port, &neighbour) in node.ports.iter().enumerate() {
                if neighbour < 0 {
                    continue;
                }
                let back = self
                    .nodes
                    .get(neighbour as usize)
                    .ok_or_else(|| {
                        AuralizeError::Internal(format!(
                            "node {} port {} references missing node {}",
                            index, port, neighbour
                        ))
                    })?
                    .ports[port];
                if back != index as i32 {
                    return Err(AuralizeError::Internal(format!(
                        "asymmetric linkage: node {} port {} -> {} but reverse port -> {}",
                        index, port, neighbour, back
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn cube_side(&self) -> f32 {
        self.cube_side
    }

    /// Index of the lattice node nearest to `position`, regardless of
    /// whether it lies inside the meshed region.
    pub fn nearest_index(&self, position: Vec3) -> usize {
        let relative = (position - self.origin) / self.cube_side;
        let clamp = |value: f32, cells: usize| {
            (value.round() as i64).clamp(0, cells as i64 - 1)
        };

        let even = [
            clamp(relative.x, self.cells[0]),
            clamp(relative.y, self.cells[1]),
            clamp(relative.z, self.cells[2]),
        ];
        let odd = [
            clamp(relative.x - 0.5, self.cells[0]),
            clamp(relative.y - 0.5, self.cells[1]),
            clamp(relative.z - 0.5, self.cells[2]),
        ];

        let even_index = self.node_index(even, 0).expect("clamped cell is in range");
        let odd_index = self.node_index(odd, 1).expect("clamped cell is in range");

        let even_distance = (self.nodes[even_index].position - position).length();
        let odd_distance = (self.nodes[odd_index].position - position).length();
        if even_distance <= odd_distance {
            even_index
        } else {
            odd_index
        }
    }

    /// Index of the nearest node, required to lie inside the meshed region.
    pub fn index_for_coord(&self, position: Vec3) -> Result<usize> {
        let index = self.nearest_index(position);
        if self.nodes[index].inside {
            Ok(index)
        } else {
            Err(AuralizeError::Geometry(format!(
                "position {:?} snaps to a node outside the meshed region",
                position
            )))
        }
    }

    pub fn coord_for_index(&self, index: usize) -> Vec3 {
        self.nodes[index].position
    }
}
