#![cfg_attr(docsrs, feature(doc_cfg))]
//! # mesh-decompose
//!
//! mesh-decompose assigns every cell of a distributed polyhedral mesh to a
//! partition while honouring topological constraints: cells that must stay
//! together across baffles, coupled patches, face zones or explicitly
//! connected faces. The partitioning heuristic itself is pluggable.
//!
//! ## Features
//! - Globally numbered cell→cell graphs (optionally agglomerated into regions)
//! - Per-cell multi-component weights with bounded integer scaling
//! - Pluggable strategies (`linear`, `hierarchical`, `metis`) and constraint
//!   providers (`preserveBaffles`, `preservePatches`, `preserveFaceZones`,
//!   `singleProcessorFaceSets`), selected by name from a [`registry::Registry`]
//! - A face/cell wave that makes assignments agree across processor and
//!   periodic boundaries
//! - Pluggable communication backends (serial, in-process threads, MPI)
//!
//! ## SPMD
//!
//! Every public operation taking a communicator is collective: all ranks call
//! it in the same order with their own part of the mesh. Strategies are
//! deterministic for a given input so all ranks agree without extra
//! communication.
//!
//! ## Usage
//!
//! ```toml
//! [dependencies]
//! mesh-decompose = "0.1"
//! # Optional features:
//! # features = ["mpi-support","rayon","metis-support"]
//! ```
//!
//! ```
//! use mesh_decompose::prelude::*;
//! use mesh_decompose::algs::meshgen::{BlockMesh, block_mesh};
//!
//! let mesh = block_mesh(&BlockMesh::line(4).with_baffle_at(2), 0, 1)?;
//! let cfg = DecompositionConfig::from_json_str(
//!     r#"{ "numberOfSubdomains": 2, "decomposer": "linear",
//!          "constraints": [ { "type": "preserveBaffles" } ] }"#,
//! )?;
//! let parts = Decomposer::from_config(&cfg, Registry::global())?.decompose(&mesh, &NoComm, &[])?;
//! assert_eq!(parts[1], parts[2]);
//! # Ok::<(), mesh_decompose::decomp_error::DecompositionError>(())
//! ```

pub mod algs;
pub mod config;
pub mod constraints;
pub mod data;
pub mod debug_invariants;
pub mod decomp_error;
pub mod decompose;
pub mod partitioning;
pub mod registry;
pub mod topology;

pub use debug_invariants::DebugInvariants;

/// A convenient prelude to import the most-used traits & types:
pub mod prelude {
    pub use crate::algs::communicator::{Communicator, NoComm, ThreadComm};
    #[cfg(feature = "mpi-support")]
    pub use crate::algs::communicator::MpiComm;
    pub use crate::algs::reduction::Collectives;
    pub use crate::config::{ConstraintConfig, DecompositionConfig};
    pub use crate::constraints::{ConstraintSet, DecompositionConstraint};
    pub use crate::decomp_error::{CommError, DecompositionError};
    pub use crate::decompose::Decomposer;
    pub use crate::partitioning::{DecompositionStrategy, StrategyInput};
    pub use crate::registry::Registry;
    pub use crate::topology::mesh::{Coupling, FaceZone, MeshTopology, Patch};
    pub use crate::topology::poly_mesh::PolyMesh;
}
