//! Enforce explicit connections and specified face sets on an assignment.
//!
//! Both passes are direct writes into the local assignment. Regions were
//! already consistent across unblocked faces, so no flood over cells is
//! needed for connections; face sets are expanded over shared points.

use log::{debug, warn};

use crate::constraints::ConstraintSet;
use crate::decomp_error::DecompositionError;
use crate::topology::mesh::MeshTopology;

/// Give the cells of `f1` the partition of the owner of `f0`, for every
/// unblocked connection in list order.
///
/// A connection with one blocked and one unblocked face is an error.
pub fn apply_explicit_connections(
    mesh: &dyn MeshTopology,
    set: &ConstraintSet,
    decomposition: &mut [usize],
) -> Result<(), DecompositionError> {
    let owner = mesh.face_owner();
    let neighbour = mesh.face_neighbour();
    let blocked = &set.blocked_face;
    for &(f0, f1) in &set.explicit_connections {
        match (blocked[f0], blocked[f1]) {
            (false, false) => {
                let proc = decomposition[owner[f0]];
                decomposition[owner[f1]] = proc;
                if mesh.is_internal_face(f1) {
                    decomposition[neighbour[f1]] = proc;
                }
            }
            (true, true) => {}
            (blocked0, blocked1) => {
                let centres = mesh.face_centres();
                return Err(DecompositionError::InconsistentConnection {
                    f0,
                    f1,
                    blocked0,
                    blocked1,
                    at0: centres[f0],
                    at1: centres[f1],
                });
            }
        }
    }
    Ok(())
}

/// Target of a face set: the explicit partition, or the current partition
/// of the owner of its first face. `None` for a set with no local faces.
pub fn resolve_target(
    mesh: &dyn MeshTopology,
    faces: &[usize],
    target: Option<usize>,
    decomposition: &[usize],
) -> Option<usize> {
    target.or_else(|| faces.first().map(|&f| decomposition[mesh.face_owner()[f]]))
}

/// Every cell sharing at least one point with a face of `faces`, ascending.
pub fn point_connected_cells(mesh: &dyn MeshTopology, faces: &[usize]) -> Vec<usize> {
    let mesh_faces = mesh.faces();
    let point_faces = mesh.point_faces();
    let owner = mesh.face_owner();
    let neighbour = mesh.face_neighbour();

    let mut point_seen = vec![false; mesh.n_points()];
    let mut frontier = Vec::new();
    for &f in faces {
        for &p in mesh_faces.row(f) {
            if !point_seen[p] {
                point_seen[p] = true;
                frontier.push(p);
            }
        }
    }

    let mut cell_seen = vec![false; mesh.n_cells()];
    for p in frontier {
        for &f in point_faces.row(p) {
            cell_seen[owner[f]] = true;
            if mesh.is_internal_face(f) {
                cell_seen[neighbour[f]] = true;
            }
        }
    }
    (0..mesh.n_cells()).filter(|&c| cell_seen[c]).collect()
}

/// Assign `proc` to every cell point-connected to `faces`. Returns the
/// number of cells whose partition changed.
pub fn force_face_set(
    mesh: &dyn MeshTopology,
    faces: &[usize],
    proc: usize,
    decomposition: &mut [usize],
) -> usize {
    let mut n_changed = 0;
    for c in point_connected_cells(mesh, faces) {
        if decomposition[c] != proc {
            decomposition[c] = proc;
            n_changed += 1;
        }
    }
    n_changed
}

/// Force every specified face set onto its target, in list order. A cell
/// touched by several sets ends up with the target of the last one.
pub fn apply_specified_face_sets(
    mesh: &dyn MeshTopology,
    set: &ConstraintSet,
    decomposition: &mut [usize],
    n_parts: usize,
) -> Result<(), DecompositionError> {
    let mut claimed = vec![false; mesh.n_cells()];
    for (set_i, (faces, &target)) in set
        .specified_processor_faces
        .iter()
        .zip(&set.specified_processor)
        .enumerate()
    {
        let Some(proc) = resolve_target(mesh, faces, target, decomposition) else {
            continue;
        };
        if proc >= n_parts {
            return Err(DecompositionError::InvalidConfig(format!(
                "face set {set_i} targets partition {proc}, only {n_parts} partitions exist"
            )));
        }
        let cells = point_connected_cells(mesh, faces);
        let mut n_overwritten = 0usize;
        for &c in &cells {
            if claimed[c] && decomposition[c] != proc {
                n_overwritten += 1;
            }
            claimed[c] = true;
            decomposition[c] = proc;
        }
        if n_overwritten > 0 {
            warn!(
                "face set {set_i}: {n_overwritten} cell(s) already forced by an earlier set moved to partition {proc}"
            );
        }
        debug!("face set {set_i}: {} cell(s) on partition {proc}", cells.len());
    }
    Ok(())
}
