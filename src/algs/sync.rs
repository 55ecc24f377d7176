//! Swap per-face values across coupled boundaries.
//!
//! Boundary-face arrays are indexed by `face - n_internal_faces`. After a swap
//! every coupled face holds the value its counterpart had before the swap;
//! uncoupled faces are left untouched. One message is exchanged per
//! processor patch, sized exactly to the patch.

use bytemuck::Pod;

use crate::algs::communicator::{Communicator, SWAP_BOUNDARY_TAG, Wait};
use crate::algs::wire::{cast_slice, decode_vec};
use crate::decomp_error::{CommError, DecompositionError};
use crate::topology::mesh::{Coupling, MeshTopology};

/// Which couplings take part in a swap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CouplingScope {
    /// Processor and cyclic patches.
    All,
    /// Same-rank couplings only.
    LocalOnly,
}

impl CouplingScope {
    pub fn includes(self, coupling: Coupling) -> bool {
        match coupling {
            Coupling::None => false,
            Coupling::Processor { .. } => self == CouplingScope::All,
            Coupling::Cyclic { .. } => true,
        }
    }
}

/// Collective: swap `values` (one per boundary face) across coupled patches.
pub fn swap_boundary_face_list<T, M, C>(
    mesh: &M,
    comm: &C,
    values: &mut [T],
    scope: CouplingScope,
) -> Result<(), DecompositionError>
where
    T: Pod,
    M: MeshTopology + ?Sized,
    C: Communicator,
{
    let n_internal = mesh.n_internal_faces();
    if values.len() != mesh.n_boundary_faces() {
        return Err(DecompositionError::SizeMismatch {
            what: "boundary face values",
            expected: mesh.n_boundary_faces(),
            found: values.len(),
        });
    }
    let patches = mesh.patches();
    let width = std::mem::size_of::<T>();

    let mut sends = Vec::new();
    if scope == CouplingScope::All {
        for p in patches {
            if let Coupling::Processor { neighb_rank, tag } = p.coupling {
                let b = p.start - n_internal;
                let tag = SWAP_BOUNDARY_TAG.offset(tag).as_u16();
                sends.push(comm.isend(neighb_rank, tag, cast_slice(&values[b..b + p.size]))?);
            }
        }
    }

    // cyclic partners read from a snapshot so both directions see old values
    let snapshot = values.to_vec();
    for p in patches {
        if let Coupling::Cyclic { neighbour_patch } = p.coupling {
            let nbr = &patches[neighbour_patch];
            let b = p.start - n_internal;
            let nb = nbr.start - n_internal;
            values[b..b + p.size].copy_from_slice(&snapshot[nb..nb + nbr.size]);
        }
    }

    if scope == CouplingScope::All {
        for p in patches {
            if let Coupling::Processor { neighb_rank, tag } = p.coupling {
                let tag = SWAP_BOUNDARY_TAG.offset(tag).as_u16();
                let raw = comm
                    .irecv(neighb_rank, tag, p.size * width)?
                    .wait()?
                    .ok_or(CommError::MissingMessage {
                        peer: neighb_rank,
                        tag,
                    })?;
                let remote: Vec<T> = decode_vec(neighb_rank, &raw)?;
                let b = p.start - n_internal;
                values[b..b + p.size].copy_from_slice(&remote);
            }
        }
        for s in sends {
            s.wait()?;
        }
    }
    Ok(())
}

/// Collective: for every boundary face, the value of `cell_values` at the
/// cell on the other side (the local owner for uncoupled faces).
pub fn swap_boundary_cell_list<T, M, C>(
    mesh: &M,
    comm: &C,
    cell_values: &[T],
    scope: CouplingScope,
) -> Result<Vec<T>, DecompositionError>
where
    T: Pod,
    M: MeshTopology + ?Sized,
    C: Communicator,
{
    let owner = mesh.face_owner();
    let mut out: Vec<T> = (mesh.n_internal_faces()..mesh.n_faces())
        .map(|f| cell_values[owner[f]])
        .collect();
    swap_boundary_face_list(mesh, comm, &mut out, scope)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algs::communicator::{NoComm, ThreadComm};
    use crate::algs::meshgen::{BlockMesh, block_mesh};

    #[test]
    fn cyclic_swap_on_single_rank() {
        let mesh = block_mesh(&BlockMesh::line(4).with_cyclic_x(), 0, 1).unwrap();
        let cells: Vec<u32> = (0..4).map(|c| c as u32 * 10).collect();
        let nbr = swap_boundary_cell_list(&mesh, &NoComm, &cells, CouplingScope::All).unwrap();
        let n_int = mesh.n_internal_faces();
        for p in mesh.patches() {
            if let Coupling::Cyclic { .. } = p.coupling {
                let own = mesh.face_owner()[p.start];
                let got = nbr[p.start - n_int];
                // the periodic partner of cell 0 is cell 3 and vice versa
                assert_eq!(got, if own == 0 { 30 } else { 0 });
            }
        }
    }

    #[test]
    fn processor_swap_two_ranks() {
        let world = ThreadComm::world(2);
        let spec = BlockMesh::line(4);
        let out: Vec<Vec<u32>> = std::thread::scope(|s| {
            let hs: Vec<_> = world
                .iter()
                .map(|c| {
                    let spec = &spec;
                    s.spawn(move || {
                        let mesh = block_mesh(spec, c.rank(), 2).unwrap();
                        let cells: Vec<u32> =
                            (0..mesh.n_cells()).map(|i| (c.rank() * 100 + i) as u32).collect();
                        let nbr =
                            swap_boundary_cell_list(&mesh, c, &cells, CouplingScope::All).unwrap();
                        let p = mesh.patches().iter().find(|p| p.is_processor()).unwrap();
                        nbr[p.start - mesh.n_internal_faces()..][..p.size].to_vec()
                    })
                })
                .collect();
            hs.into_iter().map(|h| h.join().unwrap()).collect()
        });
        // rank 0 sees rank 1's first cell, rank 1 sees rank 0's last cell
        assert_eq!(out[0], vec![100]);
        assert_eq!(out[1], vec![1]);
    }

    #[test]
    fn local_scope_skips_processor_patches() {
        let mesh = block_mesh(&BlockMesh::line(4), 0, 2).unwrap();
        let mut vals = vec![7u32; mesh.n_boundary_faces()];
        swap_boundary_face_list(&mesh, &NoComm, &mut vals, CouplingScope::LocalOnly).unwrap();
        assert!(vals.iter().all(|&v| v == 7));
    }
}
