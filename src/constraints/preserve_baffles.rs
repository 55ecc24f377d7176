//! Keep both sides of every baffle on one partition.
//!
//! A baffle is a pair of uncoupled boundary faces built on the same points.
//! Each pair becomes an explicit connection and both faces are unblocked.

use hashbrown::HashMap;
use log::debug;

use super::{ConstraintSet, DecompositionConstraint};
use crate::decomp_error::DecompositionError;
use crate::topology::mesh::MeshTopology;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PreserveBaffles;

/// Pairs of uncoupled boundary faces sharing the same point set, in face order.
pub fn find_baffles(mesh: &dyn MeshTopology) -> Vec<(usize, usize)> {
    let mut first: HashMap<Vec<usize>, usize> = HashMap::new();
    let mut pairs = Vec::new();
    for p in mesh.patches().iter().filter(|p| !p.coupled()) {
        for f in p.faces() {
            let mut key = mesh.faces().row(f).to_vec();
            key.sort_unstable();
            match first.get(&key) {
                Some(&f0) => pairs.push((f0, f)),
                None => {
                    first.insert(key, f);
                }
            }
        }
    }
    pairs
}

impl DecompositionConstraint for PreserveBaffles {
    fn type_name(&self) -> &'static str {
        "preserveBaffles"
    }

    fn add(
        &self,
        mesh: &dyn MeshTopology,
        set: &mut ConstraintSet,
    ) -> Result<(), DecompositionError> {
        let baffles = find_baffles(mesh);
        debug!("preserveBaffles: {} baffle pair(s)", baffles.len());
        for (f0, f1) in baffles {
            set.unblock(f0);
            set.unblock(f1);
            set.add_connection(f0, f1);
        }
        Ok(())
    }

    fn apply(
        &self,
        mesh: &dyn MeshTopology,
        _set: &ConstraintSet,
        decomposition: &mut [usize],
    ) -> Result<(), DecompositionError> {
        let owner = mesh.face_owner();
        let mut n_changed = 0usize;
        for (f0, f1) in find_baffles(mesh) {
            let target = decomposition[owner[f0]];
            if decomposition[owner[f1]] != target {
                decomposition[owner[f1]] = target;
                n_changed += 1;
            }
        }
        if n_changed > 0 {
            debug!("preserveBaffles: moved {n_changed} cell(s) next to their baffle partner");
        }
        Ok(())
    }
}
