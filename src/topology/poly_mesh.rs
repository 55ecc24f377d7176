//! In-memory polyhedral mesh implementing [`MeshTopology`].
//!
//! Geometry (face centres, face areas, cell centres) is computed once at
//! construction; point→face addressing is built lazily on first use.

use once_cell::sync::OnceCell;

use crate::data::compact_list::CompactListList;
use crate::decomp_error::DecompositionError;
use crate::debug_invariants::DebugInvariants;
use crate::topology::mesh::{Coupling, FaceZone, MeshTopology, Patch};

#[derive(Debug, Clone)]
pub struct PolyMesh {
    points: Vec<[f64; 3]>,
    faces: CompactListList<usize>,
    owner: Vec<usize>,
    neighbour: Vec<usize>,
    patches: Vec<Patch>,
    zones: Vec<FaceZone>,
    n_cells: usize,
    face_centres: Vec<[f64; 3]>,
    face_areas: Vec<f64>,
    cell_centres: Vec<[f64; 3]>,
    point_faces: OnceCell<CompactListList<usize>>,
}

fn invalid(msg: impl Into<String>) -> DecompositionError {
    DecompositionError::InvalidConfig(msg.into())
}

impl PolyMesh {
    /// Build a mesh from points, face point-lists and face→cell addressing.
    ///
    /// `neighbour.len()` is the number of internal faces; the remaining faces
    /// must be covered, in order, by `patches`.
    pub fn new(
        points: Vec<[f64; 3]>,
        faces: CompactListList<usize>,
        owner: Vec<usize>,
        neighbour: Vec<usize>,
        patches: Vec<Patch>,
    ) -> Result<Self, DecompositionError> {
        if owner.len() != faces.len() {
            return Err(DecompositionError::SizeMismatch {
                what: "face owner",
                expected: faces.len(),
                found: owner.len(),
            });
        }
        if neighbour.len() > faces.len() {
            return Err(invalid("more neighbours than faces"));
        }
        if let Some(&p) = faces.values().iter().find(|&&p| p >= points.len()) {
            return Err(invalid(format!("face references missing point {p}")));
        }
        let n_cells = owner
            .iter()
            .chain(neighbour.iter())
            .max()
            .map_or(0, |&c| c + 1);

        let (face_centres, face_areas) = face_geometry(&points, &faces);
        let cell_centres = cell_geometry(n_cells, &owner, &neighbour, &face_centres);

        let mesh = Self {
            points,
            faces,
            owner,
            neighbour,
            patches,
            zones: Vec::new(),
            n_cells,
            face_centres,
            face_areas,
            cell_centres,
            point_faces: OnceCell::new(),
        };
        mesh.validate_invariants()?;
        Ok(mesh)
    }

    /// Attach named face zones.
    pub fn with_face_zones(mut self, zones: Vec<FaceZone>) -> Result<Self, DecompositionError> {
        for z in &zones {
            if let Some(&f) = z.faces.iter().find(|&&f| f >= self.faces.len()) {
                return Err(invalid(format!("face zone `{}` references missing face {f}", z.name)));
            }
        }
        self.zones = zones;
        Ok(self)
    }

    pub fn points(&self) -> &[[f64; 3]] {
        &self.points
    }
}

fn sub(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

fn cross(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

fn single_face_geometry(points: &[[f64; 3]], face: &[usize]) -> ([f64; 3], f64) {
    if face.is_empty() {
        return ([0.0; 3], 0.0);
    }
    let mut c = [0.0; 3];
    for &p in face {
        for d in 0..3 {
            c[d] += points[p][d];
        }
    }
    let n = face.len() as f64;
    c.iter_mut().for_each(|x| *x /= n);

    let mut area = [0.0; 3];
    for (i, &p) in face.iter().enumerate() {
        let q = face[(i + 1) % face.len()];
        let t = cross(sub(points[p], c), sub(points[q], c));
        for d in 0..3 {
            area[d] += 0.5 * t[d];
        }
    }
    let mag = (area[0] * area[0] + area[1] * area[1] + area[2] * area[2]).sqrt();
    (c, mag)
}

#[cfg(feature = "rayon")]
fn face_geometry(points: &[[f64; 3]], faces: &CompactListList<usize>) -> (Vec<[f64; 3]>, Vec<f64>) {
    use rayon::prelude::*;
    (0..faces.len())
        .into_par_iter()
        .map(|f| single_face_geometry(points, faces.row(f)))
        .unzip()
}

#[cfg(not(feature = "rayon"))]
fn face_geometry(points: &[[f64; 3]], faces: &CompactListList<usize>) -> (Vec<[f64; 3]>, Vec<f64>) {
    faces
        .rows()
        .map(|face| single_face_geometry(points, face))
        .unzip()
}

fn cell_geometry(
    n_cells: usize,
    owner: &[usize],
    neighbour: &[usize],
    face_centres: &[[f64; 3]],
) -> Vec<[f64; 3]> {
    let mut sum = vec![[0.0; 3]; n_cells];
    let mut count = vec![0usize; n_cells];
    let mut add = |cell: usize, fc: [f64; 3]| {
        for d in 0..3 {
            sum[cell][d] += fc[d];
        }
        count[cell] += 1;
    };
    for (f, &own) in owner.iter().enumerate() {
        add(own, face_centres[f]);
    }
    for (f, &nei) in neighbour.iter().enumerate() {
        add(nei, face_centres[f]);
    }
    sum.iter_mut().zip(&count).for_each(|(s, &n)| {
        if n > 0 {
            s.iter_mut().for_each(|x| *x /= n as f64);
        }
    });
    sum
}

impl MeshTopology for PolyMesh {
    fn n_cells(&self) -> usize {
        self.n_cells
    }
    fn n_points(&self) -> usize {
        self.points.len()
    }
    fn n_faces(&self) -> usize {
        self.faces.len()
    }
    fn n_internal_faces(&self) -> usize {
        self.neighbour.len()
    }
    fn face_owner(&self) -> &[usize] {
        &self.owner
    }
    fn face_neighbour(&self) -> &[usize] {
        &self.neighbour
    }
    fn faces(&self) -> &CompactListList<usize> {
        &self.faces
    }

    fn point_faces(&self) -> &CompactListList<usize> {
        self.point_faces.get_or_init(|| {
            let mut sizes = vec![0usize; self.points.len()];
            for &p in self.faces.values() {
                sizes[p] += 1;
            }
            let mut pf = CompactListList::<usize>::with_row_sizes(&sizes);
            sizes.iter_mut().for_each(|s| *s = 0);
            for (f, face) in self.faces.rows().enumerate() {
                for &p in face {
                    pf.row_mut(p)[sizes[p]] = f;
                    sizes[p] += 1;
                }
            }
            pf
        })
    }

    fn cell_centres(&self) -> &[[f64; 3]] {
        &self.cell_centres
    }
    fn face_centres(&self) -> &[[f64; 3]] {
        &self.face_centres
    }
    fn face_area_mags(&self) -> &[f64] {
        &self.face_areas
    }
    fn patches(&self) -> &[Patch] {
        &self.patches
    }
    fn face_zones(&self) -> &[FaceZone] {
        &self.zones
    }
}

impl DebugInvariants for PolyMesh {
    fn debug_assert_invariants(&self) {
        crate::debug_invariants!(self.validate_invariants(), "PolyMesh");
    }

    fn validate_invariants(&self) -> Result<(), DecompositionError> {
        let mut next = self.n_internal_faces();
        for (i, p) in self.patches.iter().enumerate() {
            if p.start != next {
                return Err(invalid(format!(
                    "patch `{}` starts at face {} but face {next} was expected",
                    p.name, p.start
                )));
            }
            next += p.size;
            if let Coupling::Cyclic { neighbour_patch } = p.coupling {
                let partner = self.patches.get(neighbour_patch).ok_or_else(|| {
                    invalid(format!("patch `{}` couples to missing patch {neighbour_patch}", p.name))
                })?;
                if partner.size != p.size || neighbour_patch == i {
                    return Err(invalid(format!(
                        "cyclic patches `{}` and `{}` do not match",
                        p.name, partner.name
                    )));
                }
            }
        }
        if next != self.n_faces() {
            return Err(invalid(format!(
                "patches cover faces up to {next}, mesh has {}",
                self.n_faces()
            )));
        }
        Ok(())
    }
}
