//! Make assignments agree across unblocked coupled faces.
//!
//! Regions never span ranks, so two halves of a region cut by a processor
//! boundary may have been assigned independently. A min-label wave over the
//! unblocked faces (walls at blocked faces) gives every connected set of
//! cells the smallest assignment found in it.

use log::debug;

use crate::algs::communicator::Communicator;
use crate::algs::face_cell_wave::{FaceCellWave, MinLabel};
use crate::algs::reduction::{agree_on_failure, sum_u64};
use crate::algs::region_split::face_links;
use crate::algs::sync::{CouplingScope, swap_boundary_cell_list};
use crate::constraints::ConstraintSet;
use crate::decomp_error::DecompositionError;
use crate::topology::mesh::{Coupling, MeshTopology};

/// Collective: propagate the minimum assignment over unblocked faces and
/// explicit connections. Returns the number of local cells that changed.
pub fn enforce_consistency<M, C>(
    mesh: &M,
    comm: &C,
    set: &ConstraintSet,
    decomposition: &mut [usize],
) -> Result<usize, DecompositionError>
where
    M: MeshTopology + ?Sized,
    C: Communicator,
{
    let owner = mesh.face_owner();
    let blocked = &set.blocked_face;

    let face_data: Vec<MinLabel> = blocked
        .iter()
        .map(|&b| if b { MinLabel::BLOCKED } else { MinLabel::UNSET })
        .collect();
    let seed_faces: Vec<usize> = (0..mesh.n_faces()).filter(|&f| !blocked[f]).collect();
    let seed_data: Vec<MinLabel> = seed_faces
        .iter()
        .map(|&f| MinLabel::new(decomposition[owner[f]]))
        .collect();
    let links = face_links(mesh.n_faces(), blocked, &set.explicit_connections)?;

    let n_total = sum_u64(comm, mesh.n_cells() as u64)? as usize;
    let wave = FaceCellWave::run(
        mesh,
        comm,
        &links,
        &seed_faces,
        &seed_data,
        face_data,
        n_total + 1,
    )?;

    let mut n_changed = 0;
    for (c, v) in wave.cell_data().iter().enumerate() {
        if let Some(p) = v.get() {
            if decomposition[c] != p {
                decomposition[c] = p;
                n_changed += 1;
            }
        }
    }
    debug!(
        "consistency wave: {} round(s), {} local cell(s) reassigned",
        wave.rounds(),
        n_changed
    );
    Ok(n_changed)
}

/// Collective: true when any rank has an unblocked coupled face.
pub fn has_unblocked_coupling<M, C>(
    mesh: &M,
    comm: &C,
    blocked_face: &[bool],
) -> Result<bool, DecompositionError>
where
    M: MeshTopology + ?Sized,
    C: Communicator,
{
    let local = mesh
        .patches()
        .iter()
        .filter(|p| p.coupled())
        .flat_map(|p| p.faces())
        .filter(|&f| !blocked_face[f])
        .count();
    Ok(sum_u64(comm, local as u64)? > 0)
}

/// Collective: fail on the first unblocked coupled face whose two sides
/// carry different assignments. Ranks without such a face return
/// [`DecompositionError::PeerFailure`] when another rank has one.
pub fn check_consistency<M, C>(
    mesh: &M,
    comm: &C,
    blocked_face: &[bool],
    decomposition: &[usize],
) -> Result<(), DecompositionError>
where
    M: MeshTopology + ?Sized,
    C: Communicator,
{
    let as_wire: Vec<u64> = decomposition.iter().map(|&p| p as u64).collect();
    let nbr = swap_boundary_cell_list(mesh, comm, &as_wire, CouplingScope::All)?;
    agree_on_failure(comm, first_divergence(mesh, blocked_face, decomposition, &nbr))
}

fn first_divergence<M: MeshTopology + ?Sized>(
    mesh: &M,
    blocked_face: &[bool],
    decomposition: &[usize],
    nbr: &[u64],
) -> Result<(), DecompositionError> {
    let owner = mesh.face_owner();
    let n_internal = mesh.n_internal_faces();

    for p in mesh.patches() {
        if p.coupling == Coupling::None {
            continue;
        }
        for f in p.faces() {
            if blocked_face[f] {
                continue;
            }
            let own = decomposition[owner[f]];
            let other = nbr[f - n_internal] as usize;
            if own != other {
                return Err(DecompositionError::CrossPartitionDivergence {
                    patch: p.name.clone(),
                    face: f,
                    at: mesh.face_centres()[f],
                    own,
                    nbr: other,
                });
            }
        }
    }
    Ok(())
}
