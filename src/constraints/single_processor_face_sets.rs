//! Keep every cell touching a named face set on one partition.
//!
//! Each named face zone becomes a specified face set with an optional target
//! partition. Every face sharing a point with the set is unblocked so the set
//! is agglomerated into as few regions as possible; the final assignment is
//! forced afterwards since walls may still split the set.

use log::debug;

use super::{ConstraintSet, DecompositionConstraint, zone_names};
use crate::decomp_error::DecompositionError;
use crate::decompose::reconcile::{force_face_set, resolve_target};
use crate::topology::mesh::MeshTopology;

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaceSetTarget {
    /// Face zone name.
    pub name: String,
    /// Target partition; owner of the first face when absent.
    #[serde(default)]
    pub processor: Option<usize>,
}

impl FaceSetTarget {
    pub fn new(name: impl Into<String>, processor: Option<usize>) -> Self {
        Self {
            name: name.into(),
            processor,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SingleProcessorFaceSets {
    pub sets: Vec<FaceSetTarget>,
}

impl SingleProcessorFaceSets {
    pub fn new(sets: Vec<FaceSetTarget>) -> Self {
        Self { sets }
    }
}

impl DecompositionConstraint for SingleProcessorFaceSets {
    fn type_name(&self) -> &'static str {
        "singleProcessorFaceSets"
    }

    fn add(
        &self,
        mesh: &dyn MeshTopology,
        set: &mut ConstraintSet,
    ) -> Result<(), DecompositionError> {
        let mut on_set = vec![false; mesh.n_points()];
        for target in &self.sets {
            let zone = mesh
                .find_face_zone(&target.name)
                .ok_or_else(|| DecompositionError::MissingFaceZone {
                    name: target.name.clone(),
                    valid: zone_names(mesh),
                })?;
            for &f in &zone.faces {
                for &p in mesh.faces().row(f) {
                    on_set[p] = true;
                }
            }
            set.add_face_set(zone.faces.clone(), target.processor);
        }

        let point_faces = mesh.point_faces();
        let before = set.n_unblocked();
        for p in (0..mesh.n_points()).filter(|&p| on_set[p]) {
            set.unblock_all(point_faces.row(p).iter().copied());
        }
        debug!(
            "singleProcessorFaceSets: unblocked {} face(s) around {} set(s)",
            set.n_unblocked() - before,
            self.sets.len()
        );
        Ok(())
    }

    fn apply(
        &self,
        mesh: &dyn MeshTopology,
        set: &ConstraintSet,
        decomposition: &mut [usize],
    ) -> Result<(), DecompositionError> {
        for (faces, &target) in set
            .specified_processor_faces
            .iter()
            .zip(&set.specified_processor)
        {
            if let Some(proc) = resolve_target(mesh, faces, target, decomposition) {
                force_face_set(mesh, faces, proc, decomposition);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algs::meshgen::{BlockMesh, block_mesh};
    use crate::topology::mesh::FaceZone;

    #[test]
    fn point_neighbours_are_unblocked() {
        // face 0 joins cells 0 and 1 of a 4-cell line
        let mesh = block_mesh(&BlockMesh::line(4), 0, 1)
            .unwrap()
            .with_face_zones(vec![FaceZone::new("fs", vec![0])])
            .unwrap();
        let mut set = ConstraintSet::new(mesh.n_faces());
        let c = SingleProcessorFaceSets::new(vec![FaceSetTarget::new("fs", Some(1))]);
        c.add(&mesh, &mut set).unwrap();
        assert_eq!(set.specified_processor_faces, vec![vec![0]]);
        assert_eq!(set.specified_processor, vec![Some(1)]);
        // the face itself and every side face of cells 0 and 1 touching x = 1
        assert!(!set.blocked_face[0]);
        assert!(set.blocked_face[1]);

        let mut decomp = vec![0, 0, 0, 0];
        c.apply(&mesh, &set, &mut decomp).unwrap();
        assert_eq!(decomp, vec![1, 1, 0, 0]);
    }

    #[test]
    fn parses_optional_processor() {
        let c: SingleProcessorFaceSets =
            serde_json::from_str(r#"{ "sets": [ { "name": "a" }, { "name": "b", "processor": 2 } ] }"#)
                .unwrap();
        assert_eq!(c.sets[0].processor, None);
        assert_eq!(c.sets[1].processor, Some(2));
    }
}
