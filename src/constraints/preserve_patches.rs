//! Keep the cells on both sides of named patches together.
//!
//! Only meaningful for coupled patches: the consistency wave carries the
//! owner's partition to the other side. Naming one side of a cyclic pair
//! unblocks its partner too.

use log::warn;

use super::{ConstraintSet, DecompositionConstraint, patch_names};
use crate::decomp_error::DecompositionError;
use crate::topology::mesh::{Coupling, MeshTopology};

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreservePatches {
    pub patches: Vec<String>,
}

impl PreservePatches {
    pub fn new<S: Into<String>>(patches: impl IntoIterator<Item = S>) -> Self {
        Self {
            patches: patches.into_iter().map(Into::into).collect(),
        }
    }
}

impl DecompositionConstraint for PreservePatches {
    fn type_name(&self) -> &'static str {
        "preservePatches"
    }

    fn add(
        &self,
        mesh: &dyn MeshTopology,
        set: &mut ConstraintSet,
    ) -> Result<(), DecompositionError> {
        for name in &self.patches {
            let patch = mesh
                .find_patch(name)
                .map(|i| &mesh.patches()[i])
                .ok_or_else(|| DecompositionError::MissingPatch {
                    name: name.clone(),
                    valid: patch_names(mesh),
                })?;
            if !patch.coupled() {
                warn!("preservePatches: patch `{name}` is not coupled; unblocking it has no effect");
            }
            set.unblock_all(patch.faces());
            if let Coupling::Cyclic { neighbour_patch } = patch.coupling {
                set.unblock_all(mesh.patches()[neighbour_patch].faces());
            }
        }
        Ok(())
    }
}
