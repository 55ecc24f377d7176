//! Keep the cells on both sides of every face of named face zones together.

use super::{ConstraintSet, DecompositionConstraint, zone_names};
use crate::decomp_error::DecompositionError;
use crate::topology::mesh::MeshTopology;

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreserveFaceZones {
    pub zones: Vec<String>,
}

impl PreserveFaceZones {
    pub fn new<S: Into<String>>(zones: impl IntoIterator<Item = S>) -> Self {
        Self {
            zones: zones.into_iter().map(Into::into).collect(),
        }
    }
}

impl DecompositionConstraint for PreserveFaceZones {
    fn type_name(&self) -> &'static str {
        "preserveFaceZones"
    }

    fn add(
        &self,
        mesh: &dyn MeshTopology,
        set: &mut ConstraintSet,
    ) -> Result<(), DecompositionError> {
        for name in &self.zones {
            let zone = mesh
                .find_face_zone(name)
                .ok_or_else(|| DecompositionError::MissingFaceZone {
                    name: name.clone(),
                    valid: zone_names(mesh),
                })?;
            set.unblock_all(zone.faces.iter().copied());
        }
        Ok(())
    }
}
