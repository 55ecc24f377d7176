//! Mesh topology consumed by the decomposition.
//!
//! - [`mesh::MeshTopology`]: read-only view of cells, faces, points and patches
//! - [`poly_mesh::PolyMesh`]: in-memory implementation

pub mod mesh;
pub mod poly_mesh;

pub use mesh::{Coupling, FaceZone, MeshTopology, Patch};
pub use poly_mesh::PolyMesh;
