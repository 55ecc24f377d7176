//! Structured hexahedral block generator.
//!
//! [`block_mesh`] builds the slice of an `nx × ny × nz` block owned by one
//! rank when the block is cut into `n_ranks` slabs along x. Slab interfaces
//! become processor patches; an optional periodic coupling in x and an
//! optional baffle (a plane of duplicated boundary faces) are supported.
//!
//! Patch order: `xmin`, `xmax`, `ymin`, `ymax`, `zmin`, `zmax`, then the two
//! baffle sides when the baffle plane lies inside the slab.

use crate::data::compact_list::CompactListList;
use crate::decomp_error::DecompositionError;
use crate::topology::mesh::{Coupling, Patch};
use crate::topology::poly_mesh::PolyMesh;

/// Tag of the periodic processor interface (ordinary slab interfaces use 0).
const PERIODIC_TAG: u16 = 1;

#[derive(Debug, Clone, PartialEq)]
pub struct BlockMesh {
    pub n: [usize; 3],
    pub lengths: [f64; 3],
    pub cyclic_x: bool,
    /// x-plane index replaced by a baffle.
    pub baffle_at: Option<usize>,
}

impl BlockMesh {
    pub fn new(nx: usize, ny: usize, nz: usize) -> Self {
        Self {
            n: [nx, ny, nz],
            lengths: [nx as f64, ny as f64, nz as f64],
            cyclic_x: false,
            baffle_at: None,
        }
    }

    /// A single row of `nx` unit cubes.
    pub fn line(nx: usize) -> Self {
        Self::new(nx, 1, 1)
    }

    pub fn with_cyclic_x(mut self) -> Self {
        self.cyclic_x = true;
        self
    }

    pub fn with_baffle_at(mut self, plane: usize) -> Self {
        self.baffle_at = Some(plane);
        self
    }

    /// First and one-past-last x cell index of `rank`'s slab.
    pub fn slab(&self, rank: usize, n_ranks: usize) -> (usize, usize) {
        let nx = self.n[0];
        (rank * nx / n_ranks, (rank + 1) * nx / n_ranks)
    }
}

struct Builder {
    faces: Vec<Vec<usize>>,
    owner: Vec<usize>,
    neighbour: Vec<usize>,
    patches: Vec<Patch>,
}

impl Builder {
    fn begin_patch(&self) -> usize {
        self.faces.len()
    }

    fn end_patch(&mut self, name: String, start: usize, coupling: Coupling) {
        let size = self.faces.len() - start;
        self.patches.push(Patch::new(name, start, size, coupling));
    }
}

/// Generate the local mesh of `rank` out of `n_ranks` slabs.
pub fn block_mesh(spec: &BlockMesh, rank: usize, n_ranks: usize) -> Result<PolyMesh, DecompositionError> {
    let [nx, ny, nz] = spec.n;
    if nx == 0 || ny == 0 || nz == 0 {
        return Err(DecompositionError::InvalidConfig(
            "block dimensions must be non-zero".into(),
        ));
    }
    if n_ranks == 0 || n_ranks > nx || rank >= n_ranks {
        return Err(DecompositionError::InvalidConfig(format!(
            "cannot cut {nx} cells into {n_ranks} slabs for rank {rank}"
        )));
    }
    if let Some(b) = spec.baffle_at {
        if b == 0 || b >= nx {
            return Err(DecompositionError::InvalidConfig(format!(
                "baffle plane {b} must be interior to 0..{nx}"
            )));
        }
    }

    let (i0, i1) = spec.slab(rank, n_ranks);
    let nxl = i1 - i0;
    let pid = |i: usize, j: usize, k: usize| (i - i0) + (nxl + 1) * (j + (ny + 1) * k);
    let cid = |i: usize, j: usize, k: usize| (i - i0) + nxl * (j + ny * k);

    let mut points = Vec::with_capacity((nxl + 1) * (ny + 1) * (nz + 1));
    for k in 0..=nz {
        for j in 0..=ny {
            for i in i0..=i1 {
                points.push([
                    spec.lengths[0] * i as f64 / nx as f64,
                    spec.lengths[1] * j as f64 / ny as f64,
                    spec.lengths[2] * k as f64 / nz as f64,
                ]);
            }
        }
    }

    let xface = |i: usize, j: usize, k: usize| {
        vec![pid(i, j, k), pid(i, j + 1, k), pid(i, j + 1, k + 1), pid(i, j, k + 1)]
    };
    let yface = |i: usize, j: usize, k: usize| {
        vec![pid(i, j, k), pid(i, j, k + 1), pid(i + 1, j, k + 1), pid(i + 1, j, k)]
    };
    let zface = |i: usize, j: usize, k: usize| {
        vec![pid(i, j, k), pid(i + 1, j, k), pid(i + 1, j + 1, k), pid(i, j + 1, k)]
    };

    let mut b = Builder {
        faces: Vec::new(),
        owner: Vec::new(),
        neighbour: Vec::new(),
        patches: Vec::new(),
    };

    // internal faces
    for i in (i0 + 1)..i1 {
        if spec.baffle_at == Some(i) {
            continue;
        }
        for k in 0..nz {
            for j in 0..ny {
                b.faces.push(xface(i, j, k));
                b.owner.push(cid(i - 1, j, k));
                b.neighbour.push(cid(i, j, k));
            }
        }
    }
    for j in 1..ny {
        for k in 0..nz {
            for i in i0..i1 {
                b.faces.push(yface(i, j, k));
                b.owner.push(cid(i, j - 1, k));
                b.neighbour.push(cid(i, j, k));
            }
        }
    }
    for k in 1..nz {
        for j in 0..ny {
            for i in i0..i1 {
                b.faces.push(zface(i, j, k));
                b.owner.push(cid(i, j, k - 1));
                b.neighbour.push(cid(i, j, k));
            }
        }
    }

    let last = n_ranks - 1;
    let xmin_patch = 0usize;
    let xmax_patch = 1usize;

    // xmin
    let start = b.begin_patch();
    for k in 0..nz {
        for j in 0..ny {
            b.faces.push(xface(i0, j, k));
            b.owner.push(cid(i0, j, k));
        }
    }
    let (name, coupling) = if rank > 0 {
        (
            format!("procBoundary{rank}to{}", rank - 1),
            Coupling::Processor { neighb_rank: rank - 1, tag: 0 },
        )
    } else if spec.cyclic_x && n_ranks == 1 {
        ("cyclic_xmin".to_string(), Coupling::Cyclic { neighbour_patch: xmax_patch })
    } else if spec.cyclic_x {
        (
            format!("procBoundary{rank}to{last}throughperiodic"),
            Coupling::Processor { neighb_rank: last, tag: PERIODIC_TAG },
        )
    } else {
        ("xmin".to_string(), Coupling::None)
    };
    b.end_patch(name, start, coupling);

    // xmax
    let start = b.begin_patch();
    for k in 0..nz {
        for j in 0..ny {
            b.faces.push(xface(i1, j, k));
            b.owner.push(cid(i1 - 1, j, k));
        }
    }
    let (name, coupling) = if rank < last {
        (
            format!("procBoundary{rank}to{}", rank + 1),
            Coupling::Processor { neighb_rank: rank + 1, tag: 0 },
        )
    } else if spec.cyclic_x && n_ranks == 1 {
        ("cyclic_xmax".to_string(), Coupling::Cyclic { neighbour_patch: xmin_patch })
    } else if spec.cyclic_x {
        (
            format!("procBoundary{rank}to0throughperiodic"),
            Coupling::Processor { neighb_rank: 0, tag: PERIODIC_TAG },
        )
    } else {
        ("xmax".to_string(), Coupling::None)
    };
    b.end_patch(name, start, coupling);

    for (name, jplane, jcell) in [("ymin", 0, 0), ("ymax", ny, ny - 1)] {
        let start = b.begin_patch();
        for k in 0..nz {
            for i in i0..i1 {
                b.faces.push(yface(i, jplane, k));
                b.owner.push(cid(i, jcell, k));
            }
        }
        b.end_patch(name.to_string(), start, Coupling::None);
    }
    for (name, kplane, kcell) in [("zmin", 0, 0), ("zmax", nz, nz - 1)] {
        let start = b.begin_patch();
        for j in 0..ny {
            for i in i0..i1 {
                b.faces.push(zface(i, j, kplane));
                b.owner.push(cid(i, j, kcell));
            }
        }
        b.end_patch(name.to_string(), start, Coupling::None);
    }

    if let Some(plane) = spec.baffle_at.filter(|&p| p > i0 && p < i1) {
        for (name, cell_i) in [("baffle0", plane - 1), ("baffle1", plane)] {
            let start = b.begin_patch();
            for k in 0..nz {
                for j in 0..ny {
                    b.faces.push(xface(plane, j, k));
                    b.owner.push(cid(cell_i, j, k));
                }
            }
            b.end_patch(name.to_string(), start, Coupling::None);
        }
    }

    PolyMesh::new(
        points,
        CompactListList::from_rows(b.faces),
        b.owner,
        b.neighbour,
        b.patches,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::mesh::MeshTopology;

    #[test]
    fn line_mesh_counts() {
        let m = block_mesh(&BlockMesh::line(4), 0, 1).unwrap();
        assert_eq!(m.n_cells(), 4);
        assert_eq!(m.n_internal_faces(), 3);
        // 2 x-ends + 4 faces on each of the 4 side patches
        assert_eq!(m.n_boundary_faces(), 2 + 4 * 4);
        assert_eq!(m.cell_centres()[2], [2.5, 0.5, 0.5]);
    }

    #[test]
    fn slabs_get_processor_patches() {
        let m = block_mesh(&BlockMesh::new(4, 2, 1), 1, 2).unwrap();
        assert_eq!(m.n_cells(), 4);
        let xmin = &m.patches()[0];
        assert_eq!(xmin.coupling, Coupling::Processor { neighb_rank: 0, tag: 0 });
        assert_eq!(xmin.size, 2);
        assert_eq!(m.patches()[1].coupling, Coupling::None);
        assert_eq!(m.cell_centres()[0][0], 2.5);
    }

    #[test]
    fn baffle_splits_internal_plane() {
        let m = block_mesh(&BlockMesh::line(4).with_baffle_at(2), 0, 1).unwrap();
        assert_eq!(m.n_internal_faces(), 2);
        let b0 = m.find_patch("baffle0").unwrap();
        let b1 = m.find_patch("baffle1").unwrap();
        let (f0, f1) = (m.patches()[b0].start, m.patches()[b1].start);
        assert_eq!(m.face_owner()[f0], 1);
        assert_eq!(m.face_owner()[f1], 2);
        assert_eq!(m.faces().row(f0), m.faces().row(f1));
    }

    #[test]
    fn rejects_too_many_ranks() {
        assert!(block_mesh(&BlockMesh::line(2), 0, 3).is_err());
    }
}
