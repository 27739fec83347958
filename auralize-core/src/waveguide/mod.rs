//! Tetrahedral digital waveguide mesh.
//!
//! Low-frequency wave propagation on a tetrahedrally linked node lattice
//! filling the room volume: [`mesh`] builds the lattice, [`sim`] runs the
//! explicit two-buffer update.

pub mod mesh;
pub mod sim;

pub use mesh::{Node, TetrahedralMesh, NO_NEIGHBOUR, PORTS};
pub use sim::run;
