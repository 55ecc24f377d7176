//! Decomposition constraints.
//!
//! A [`ConstraintSet`] starts with every face blocked ("no guarantee the two
//! cells of this face stay together"). Providers implementing
//! [`DecompositionConstraint`] run in registration order and may only
//! tighten it: unblock faces, add explicit face pairs, add face sets that
//! must land on one partition. After the decomposition each provider gets a
//! chance to adjust the assignment through [`DecompositionConstraint::apply`].

pub mod preserve_baffles;
pub mod preserve_face_zones;
pub mod preserve_patches;
pub mod single_processor_face_sets;

use std::fmt::Debug;

use crate::decomp_error::DecompositionError;
use crate::topology::mesh::MeshTopology;

pub use preserve_baffles::PreserveBaffles;
pub use preserve_face_zones::PreserveFaceZones;
pub use preserve_patches::PreservePatches;
pub use single_processor_face_sets::{FaceSetTarget, SingleProcessorFaceSets};

/// Topological constraints collected from all providers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstraintSet {
    /// `true`: the two cells of the face may end up on different partitions.
    pub blocked_face: Vec<bool>,
    /// Face pairs whose owners must share a partition.
    pub explicit_connections: Vec<(usize, usize)>,
    /// Face sets whose point-connected cells must share a partition.
    pub specified_processor_faces: Vec<Vec<usize>>,
    /// Target partition of every face set (`None`: owner of the first face).
    pub specified_processor: Vec<Option<usize>>,
}

impl ConstraintSet {
    /// Unconstrained set for a mesh with `n_faces` faces.
    pub fn new(n_faces: usize) -> Self {
        Self {
            blocked_face: vec![true; n_faces],
            explicit_connections: Vec::new(),
            specified_processor_faces: Vec::new(),
            specified_processor: Vec::new(),
        }
    }

    pub fn n_faces(&self) -> usize {
        self.blocked_face.len()
    }

    #[inline]
    pub fn unblock(&mut self, face: usize) {
        self.blocked_face[face] = false;
    }

    pub fn unblock_all(&mut self, faces: impl IntoIterator<Item = usize>) {
        for f in faces {
            self.unblock(f);
        }
    }

    pub fn add_connection(&mut self, f0: usize, f1: usize) {
        self.explicit_connections.push((f0, f1));
    }

    pub fn add_face_set(&mut self, faces: Vec<usize>, target: Option<usize>) {
        self.specified_processor_faces.push(faces);
        self.specified_processor.push(target);
    }

    pub fn n_unblocked(&self) -> usize {
        self.blocked_face.iter().filter(|&&b| !b).count()
    }

    /// Number of faces over all specified sets.
    pub fn n_set_faces(&self) -> usize {
        self.specified_processor_faces.iter().map(Vec::len).sum()
    }

    /// Check face indices against the mesh.
    pub fn validate<M: MeshTopology + ?Sized>(&self, mesh: &M) -> Result<(), DecompositionError> {
        let n = mesh.n_faces();
        if self.blocked_face.len() != n {
            return Err(DecompositionError::SizeMismatch {
                what: "blocked faces",
                expected: n,
                found: self.blocked_face.len(),
            });
        }
        if self.specified_processor.len() != self.specified_processor_faces.len() {
            return Err(DecompositionError::SizeMismatch {
                what: "face set targets",
                expected: self.specified_processor_faces.len(),
                found: self.specified_processor.len(),
            });
        }
        let connected = self.explicit_connections.iter().flat_map(|&(a, b)| [a, b]);
        let in_sets = self.specified_processor_faces.iter().flatten().copied();
        if let Some(f) = connected.chain(in_sets).find(|&f| f >= n) {
            return Err(DecompositionError::InvalidConfig(format!(
                "constraint refers to face {f} outside 0..{n}"
            )));
        }
        Ok(())
    }
}

/// A pluggable constraint provider.
pub trait DecompositionConstraint: Debug + Send + Sync {
    /// Registered type name.
    fn type_name(&self) -> &'static str;

    /// Contribute to the constraint set.
    fn add(&self, mesh: &dyn MeshTopology, set: &mut ConstraintSet)
    -> Result<(), DecompositionError>;

    /// Adjust the final assignment; no-op by default.
    fn apply(
        &self,
        _mesh: &dyn MeshTopology,
        _set: &ConstraintSet,
        _decomposition: &mut [usize],
    ) -> Result<(), DecompositionError> {
        Ok(())
    }
}

/// Run every provider in order on a fresh set.
pub fn collect_constraints(
    mesh: &dyn MeshTopology,
    providers: &[Box<dyn DecompositionConstraint>],
) -> Result<ConstraintSet, DecompositionError> {
    let mut set = ConstraintSet::new(mesh.n_faces());
    for p in providers {
        p.add(mesh, &mut set)?;
    }
    set.validate(mesh)?;
    Ok(set)
}

/// Run every provider's `apply` hook in order.
pub fn apply_constraints(
    mesh: &dyn MeshTopology,
    providers: &[Box<dyn DecompositionConstraint>],
    set: &ConstraintSet,
    decomposition: &mut [usize],
) -> Result<(), DecompositionError> {
    for p in providers {
        p.apply(mesh, set, decomposition)?;
    }
    Ok(())
}

pub(crate) fn patch_names(mesh: &dyn MeshTopology) -> Vec<String> {
    mesh.patches().iter().map(|p| p.name.clone()).collect()
}

pub(crate) fn zone_names(mesh: &dyn MeshTopology) -> Vec<String> {
    mesh.face_zones().iter().map(|z| z.name.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algs::meshgen::{BlockMesh, block_mesh};

    #[test]
    fn providers_run_in_order() {
        let mesh = block_mesh(&BlockMesh::line(4).with_baffle_at(2), 0, 1).unwrap();
        let providers: Vec<Box<dyn DecompositionConstraint>> = vec![
            Box::new(PreservePatches::new(["xmin"])),
            Box::new(PreserveBaffles),
        ];
        let set = collect_constraints(&mesh, &providers).unwrap();
        assert_eq!(set.explicit_connections.len(), 1);
        // xmin face plus both baffle sides
        assert_eq!(set.n_unblocked(), 3);
    }

    #[test]
    fn later_providers_keep_earlier_unblocks() {
        let mesh = block_mesh(&BlockMesh::line(4).with_baffle_at(2), 0, 1).unwrap();
        let baffles: Vec<Box<dyn DecompositionConstraint>> = vec![Box::new(PreserveBaffles)];
        let xmin: Vec<Box<dyn DecompositionConstraint>> =
            vec![Box::new(PreservePatches::new(["xmin"]))];
        let both: Vec<Box<dyn DecompositionConstraint>> = vec![
            Box::new(PreserveBaffles),
            Box::new(PreservePatches::new(["xmin"])),
        ];
        let baffles = collect_constraints(&mesh, &baffles).unwrap();
        let xmin = collect_constraints(&mesh, &xmin).unwrap();
        let merged = collect_constraints(&mesh, &both).unwrap();
        for f in 0..mesh.n_faces() {
            let kept = !baffles.blocked_face[f] || !xmin.blocked_face[f];
            assert_eq!(!merged.blocked_face[f], kept, "face {f}");
        }
    }

    #[test]
    fn validate_rejects_out_of_range_faces() {
        let mesh = block_mesh(&BlockMesh::line(2), 0, 1).unwrap();
        let mut set = ConstraintSet::new(mesh.n_faces());
        set.add_connection(0, mesh.n_faces());
        assert!(set.validate(&mesh).is_err());
    }
}
