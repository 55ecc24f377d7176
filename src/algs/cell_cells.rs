//! Globally numbered cell→cell (or region→region) adjacency graph.
//!
//! Rows are local regions (the identity agglomeration gives one row per cell),
//! values are *global* region ids. Coupled faces contribute an edge to the
//! remote region whose global id arrives through one boundary swap.
//!
//! The graph is built in two passes (count, then fill into exactly sized
//! storage) and deduplicated in place:
//!
//! * no row contains the same neighbour twice
//! * no row contains its own global id

use hashbrown::HashSet;

use crate::algs::communicator::Communicator;
use crate::algs::sync::{CouplingScope, swap_boundary_cell_list};
use crate::data::compact_list::CompactListList;
use crate::data::global_index::GlobalIndex;
use crate::debug_invariants::DebugInvariants;
use crate::decomp_error::DecompositionError;
use crate::topology::mesh::MeshTopology;

/// Adjacency of the local regions plus the numbering that produced it.
#[derive(Debug, Clone)]
pub struct CellGraph {
    /// Global numbering of the regions (serial when built without coupling).
    pub global: GlobalIndex,
    /// One row per local region, global neighbour ids.
    pub cell_cells: CompactListList<usize>,
    /// Edge weights (shared face area), same layout as `cell_cells`.
    pub weights: Option<CompactListList<f64>>,
}

impl CellGraph {
    /// Number of local rows.
    pub fn n_rows(&self) -> usize {
        self.cell_cells.len()
    }

    /// Total number of directed edges stored locally.
    pub fn n_edges(&self) -> usize {
        self.cell_cells.total_len()
    }
}

/// Build the region adjacency graph.
///
/// `agglom[cell]` is the local region of every cell (`0..n_local_coarse`).
/// With `parallel` all coupled patches contribute edges and regions are
/// numbered globally; otherwise only same-rank couplings are used and the
/// numbering is local.
pub fn calc_cell_cells<M, C>(
    mesh: &M,
    comm: &C,
    agglom: &[usize],
    n_local_coarse: usize,
    parallel: bool,
) -> Result<CellGraph, DecompositionError>
where
    M: MeshTopology + ?Sized,
    C: Communicator,
{
    build(mesh, comm, agglom, n_local_coarse, parallel, false)
}

/// [`calc_cell_cells`] that also records the shared face area of each edge.
///
/// When several faces join the same pair of regions only the first face's
/// area is kept.
pub fn calc_cell_cells_weighted<M, C>(
    mesh: &M,
    comm: &C,
    agglom: &[usize],
    n_local_coarse: usize,
    parallel: bool,
) -> Result<CellGraph, DecompositionError>
where
    M: MeshTopology + ?Sized,
    C: Communicator,
{
    build(mesh, comm, agglom, n_local_coarse, parallel, true)
}

/// Identity agglomeration: every cell is its own region.
pub fn identity_agglomeration(n_cells: usize) -> Vec<usize> {
    (0..n_cells).collect()
}

fn build<M, C>(
    mesh: &M,
    comm: &C,
    agglom: &[usize],
    n_local_coarse: usize,
    parallel: bool,
    weighted: bool,
) -> Result<CellGraph, DecompositionError>
where
    M: MeshTopology + ?Sized,
    C: Communicator,
{
    if agglom.len() != mesh.n_cells() {
        return Err(DecompositionError::SizeMismatch {
            what: "agglomeration",
            expected: mesh.n_cells(),
            found: agglom.len(),
        });
    }
    if let Some(&r) = agglom.iter().find(|&&r| r >= n_local_coarse) {
        return Err(DecompositionError::InvalidConfig(format!(
            "agglomeration refers to region {r} but only {n_local_coarse} regions exist"
        )));
    }

    let global = if parallel {
        GlobalIndex::new(n_local_coarse, comm)?
    } else {
        GlobalIndex::serial(n_local_coarse)
    };
    let scope = if parallel {
        CouplingScope::All
    } else {
        CouplingScope::LocalOnly
    };

    let owner = mesh.face_owner();
    let neighbour = mesh.face_neighbour();
    let n_internal = mesh.n_internal_faces();
    let areas = mesh.face_area_mags();

    // 1. global region id on the far side of every coupled face
    let global_agglom: Vec<u64> = agglom
        .iter()
        .map(|&r| global.to_global(r) as u64)
        .collect();
    let nbr_global = swap_boundary_cell_list(mesh, comm, &global_agglom, scope)?;

    // coupled faces that produce an edge, with the remote global id
    let mut coupled = Vec::new();
    for p in mesh.patches().iter().filter(|p| scope.includes(p.coupling)) {
        for f in p.faces() {
            let own = agglom[owner[f]];
            let g = nbr_global[f - n_internal] as usize;
            if g != global.to_global(own) {
                coupled.push((f, own, g));
            }
        }
    }

    // 2. count
    let mut sizes = vec![0usize; n_local_coarse];
    for f in 0..n_internal {
        sizes[agglom[owner[f]]] += 1;
        sizes[agglom[neighbour[f]]] += 1;
    }
    for &(_, own, _) in &coupled {
        sizes[own] += 1;
    }

    // 3. fill
    let mut cell_cells = CompactListList::<usize>::with_row_sizes(&sizes);
    let mut edge_w = if weighted {
        vec![0.0; cell_cells.total_len()]
    } else {
        Vec::new()
    };
    let mut cursor: Vec<usize> = cell_cells.offsets()[..n_local_coarse].to_vec();
    {
        let (_, values) = cell_cells.parts_mut();
        let mut push = |row: usize, g: usize, w: f64| {
            let at = cursor[row];
            values[at] = g;
            if weighted {
                edge_w[at] = w;
            }
            cursor[row] += 1;
        };
        for f in 0..n_internal {
            let (o, n) = (agglom[owner[f]], agglom[neighbour[f]]);
            push(o, global.to_global(n), areas[f]);
            push(n, global.to_global(o), areas[f]);
        }
        for &(f, own, g) in &coupled {
            push(own, g, areas[f]);
        }
    }

    // 4. dedup in place, rejecting self edges
    let mut seen: HashSet<usize> = HashSet::new();
    {
        let (offsets, values) = cell_cells.parts_mut();
        let mut write = 0usize;
        let mut start = 0usize;
        for row in 0..n_local_coarse {
            let end = offsets[row + 1];
            seen.clear();
            seen.insert(global.to_global(row));
            for i in start..end {
                let g = values[i];
                if seen.insert(g) {
                    values[write] = g;
                    if weighted {
                        edge_w[write] = edge_w[i];
                    }
                    write += 1;
                }
            }
            offsets[row + 1] = write;
            start = end;
        }
        values.truncate(write);
        values.shrink_to_fit();
        edge_w.truncate(write);
    }

    let weights = if weighted {
        Some(CompactListList::from_parts(
            cell_cells.offsets().to_vec(),
            edge_w,
        )?)
    } else {
        None
    };

    let graph = CellGraph {
        global,
        cell_cells,
        weights,
    };
    graph.debug_assert_invariants();
    Ok(graph)
}

impl DebugInvariants for CellGraph {
    fn debug_assert_invariants(&self) {
        crate::debug_invariants!(self.validate_invariants(), "CellGraph");
    }

    fn validate_invariants(&self) -> Result<(), DecompositionError> {
        if self.cell_cells.len() != self.global.local_size() {
            return Err(DecompositionError::SizeMismatch {
                what: "cell graph rows",
                expected: self.global.local_size(),
                found: self.cell_cells.len(),
            });
        }
        let mut seen = HashSet::new();
        for (row, nbrs) in self.cell_cells.rows().enumerate() {
            seen.clear();
            let me = self.global.to_global(row);
            for &g in nbrs {
                if g == me || !seen.insert(g) || g >= self.global.size() {
                    return Err(DecompositionError::InvalidConfig(format!(
                        "row {row} has a duplicate, self or out-of-range neighbour {g}"
                    )));
                }
            }
        }
        if let Some(w) = &self.weights {
            if w.offsets() != self.cell_cells.offsets() {
                return Err(DecompositionError::InvalidConfig(
                    "edge weights do not match the graph layout".into(),
                ));
            }
        }
        Ok(())
    }
}
