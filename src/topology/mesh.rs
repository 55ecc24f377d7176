//! Read-only mesh topology consumed by the decomposition.
//!
//! Faces are numbered internal faces first (`0..n_internal_faces`), then
//! boundary faces grouped into patches. A patch covers the contiguous face
//! range `start..start + size`. Coupled patches have an "other side": a
//! patch on another rank ([`Coupling::Processor`]) or a partner patch on the
//! same rank ([`Coupling::Cyclic`]). In both cases face `i` of the patch
//! matches face `i` of the other side.

use crate::data::compact_list::CompactListList;

/// How a boundary patch connects to the rest of the domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coupling {
    /// Physical boundary.
    None,
    /// Inter-rank boundary. `tag` separates several interfaces shared with
    /// the same neighbour rank and must match on both sides.
    Processor { neighb_rank: usize, tag: u16 },
    /// Same-rank periodic coupling with patch `neighbour_patch`.
    Cyclic { neighbour_patch: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Patch {
    pub name: String,
    /// First face of the patch (mesh face index).
    pub start: usize,
    pub size: usize,
    pub coupling: Coupling,
}

impl Patch {
    pub fn new(name: impl Into<String>, start: usize, size: usize, coupling: Coupling) -> Self {
        Self {
            name: name.into(),
            start,
            size,
            coupling,
        }
    }

    #[inline]
    pub fn coupled(&self) -> bool {
        !matches!(self.coupling, Coupling::None)
    }

    #[inline]
    pub fn is_processor(&self) -> bool {
        matches!(self.coupling, Coupling::Processor { .. })
    }

    pub fn faces(&self) -> std::ops::Range<usize> {
        self.start..self.start + self.size
    }
}

/// A named group of faces (face zone / face set).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaceZone {
    pub name: String,
    pub faces: Vec<usize>,
}

impl FaceZone {
    pub fn new(name: impl Into<String>, faces: Vec<usize>) -> Self {
        Self {
            name: name.into(),
            faces,
        }
    }
}

/// Mesh topology provider.
pub trait MeshTopology {
    fn n_cells(&self) -> usize;
    fn n_points(&self) -> usize;
    fn n_faces(&self) -> usize;
    fn n_internal_faces(&self) -> usize;

    /// Owner cell of every face.
    fn face_owner(&self) -> &[usize];
    /// Neighbour cell of every internal face.
    fn face_neighbour(&self) -> &[usize];
    /// Point lists of every face.
    fn faces(&self) -> &CompactListList<usize>;
    /// Faces using every point.
    fn point_faces(&self) -> &CompactListList<usize>;

    fn cell_centres(&self) -> &[[f64; 3]];
    fn face_centres(&self) -> &[[f64; 3]];
    fn face_area_mags(&self) -> &[f64];

    fn patches(&self) -> &[Patch];
    fn face_zones(&self) -> &[FaceZone] {
        &[]
    }

    #[inline]
    fn n_boundary_faces(&self) -> usize {
        self.n_faces() - self.n_internal_faces()
    }

    #[inline]
    fn is_internal_face(&self, face: usize) -> bool {
        face < self.n_internal_faces()
    }

    fn find_patch(&self, name: &str) -> Option<usize> {
        self.patches().iter().position(|p| p.name == name)
    }

    fn find_face_zone(&self, name: &str) -> Option<&FaceZone> {
        self.face_zones().iter().find(|z| z.name == name)
    }

    /// Patch index of a boundary face.
    fn which_patch(&self, face: usize) -> Option<usize> {
        self.patches().iter().position(|p| p.faces().contains(&face))
    }
}
