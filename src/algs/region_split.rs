//! Local region splitting.
//!
//! A region is a maximal set of local cells joined through unblocked faces
//! (internal faces, or explicit face pairs). Coupled faces are not followed
//! here: regions that continue on another rank are joined later through the
//! coarse graph and the consistency wave.

use std::collections::VecDeque;

use crate::data::compact_list::CompactListList;
use crate::decomp_error::DecompositionError;
use crate::topology::mesh::MeshTopology;

/// Region of every local cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Regions {
    /// `cell_region[cell]` in `0..n_regions()`.
    pub cell_region: Vec<usize>,
    /// First (lowest-numbered) cell of every region.
    pub first_cell: Vec<usize>,
}

impl Regions {
    pub fn n_regions(&self) -> usize {
        self.first_cell.len()
    }

    /// Cells of every region, ascending.
    pub fn region_cells(&self) -> CompactListList<usize> {
        let mut sizes = vec![0usize; self.n_regions()];
        for &r in &self.cell_region {
            sizes[r] += 1;
        }
        let mut out = CompactListList::<usize>::with_row_sizes(&sizes);
        sizes.iter_mut().for_each(|s| *s = 0);
        for (cell, &r) in self.cell_region.iter().enumerate() {
            out.row_mut(r)[sizes[r]] = cell;
            sizes[r] += 1;
        }
        out
    }
}

/// Faces of every cell, built from owner/neighbour addressing.
pub fn cell_faces<M: MeshTopology + ?Sized>(mesh: &M) -> CompactListList<usize> {
    let owner = mesh.face_owner();
    let neighbour = mesh.face_neighbour();
    let mut sizes = vec![0usize; mesh.n_cells()];
    for &c in owner.iter().chain(neighbour) {
        sizes[c] += 1;
    }
    let mut out = CompactListList::<usize>::with_row_sizes(&sizes);
    sizes.iter_mut().for_each(|s| *s = 0);
    let mut put = |c: usize, f: usize| {
        out.row_mut(c)[sizes[c]] = f;
        sizes[c] += 1;
    };
    for (f, &c) in owner.iter().enumerate() {
        put(c, f);
    }
    for (f, &c) in neighbour.iter().enumerate() {
        put(c, f);
    }
    out
}

/// Partner faces of every face through the unblocked explicit connections.
pub fn face_links(
    n_faces: usize,
    blocked_face: &[bool],
    connections: &[(usize, usize)],
) -> Result<CompactListList<usize>, DecompositionError> {
    let mut sizes = vec![0usize; n_faces];
    for &(a, b) in connections {
        if a >= n_faces || b >= n_faces {
            return Err(DecompositionError::InvalidConfig(format!(
                "explicit connection ({a}, {b}) refers to a face outside 0..{n_faces}"
            )));
        }
        if !blocked_face[a] && !blocked_face[b] {
            sizes[a] += 1;
            sizes[b] += 1;
        }
    }
    let mut out = CompactListList::<usize>::with_row_sizes(&sizes);
    sizes.iter_mut().for_each(|s| *s = 0);
    for &(a, b) in connections {
        if !blocked_face[a] && !blocked_face[b] {
            out.row_mut(a)[sizes[a]] = b;
            sizes[a] += 1;
            out.row_mut(b)[sizes[b]] = a;
            sizes[b] += 1;
        }
    }
    Ok(out)
}

/// Split the local cells into regions.
pub fn split_regions<M: MeshTopology + ?Sized>(
    mesh: &M,
    blocked_face: &[bool],
    connections: &[(usize, usize)],
) -> Result<Regions, DecompositionError> {
    if blocked_face.len() != mesh.n_faces() {
        return Err(DecompositionError::SizeMismatch {
            what: "blocked faces",
            expected: mesh.n_faces(),
            found: blocked_face.len(),
        });
    }
    let n_cells = mesh.n_cells();
    let owner = mesh.face_owner();
    let neighbour = mesh.face_neighbour();
    let c_faces = cell_faces(mesh);
    let links = face_links(mesh.n_faces(), blocked_face, connections)?;

    const UNSET: usize = usize::MAX;
    let mut cell_region = vec![UNSET; n_cells];
    let mut first_cell = Vec::new();
    let mut queue = VecDeque::new();

    let cells_of = |f: usize| {
        let nbr = mesh.is_internal_face(f).then(|| neighbour[f]);
        std::iter::once(owner[f]).chain(nbr)
    };

    for seed in 0..n_cells {
        if cell_region[seed] != UNSET {
            continue;
        }
        let region = first_cell.len();
        first_cell.push(seed);
        cell_region[seed] = region;
        queue.push_back(seed);

        while let Some(cell) = queue.pop_front() {
            for &f in c_faces.row(cell) {
                if blocked_face[f] {
                    continue;
                }
                let linked = links.row(f).iter().copied();
                for g in std::iter::once(f).chain(linked) {
                    for c in cells_of(g) {
                        if cell_region[c] == UNSET {
                            cell_region[c] = region;
                            queue.push_back(c);
                        }
                    }
                }
            }
        }
    }

    Ok(Regions {
        cell_region,
        first_cell,
    })
}
