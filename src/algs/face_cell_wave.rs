//! Synchronous face/cell wave over the local mesh and its coupled patches.
//!
//! Values start on a set of seed faces and spread face → cell → face in
//! rounds. After every round the coupled faces are swapped with their other
//! side, so a wave started on one rank continues on its neighbours. The loop
//! stops when no rank changed anything in a round (global sum), or after
//! `max_rounds`.
//!
//! A face whose initial value is not [`WaveInfo::valid`] and that is not a
//! seed acts as a wall: it never accepts or forwards a value.

use bytemuck::{Pod, Zeroable};
use log::{debug, warn};

use crate::algs::communicator::Communicator;
use crate::algs::reduction::sum_u64;
use crate::algs::region_split::cell_faces;
use crate::algs::sync::{CouplingScope, swap_boundary_face_list};
use crate::data::compact_list::CompactListList;
use crate::decomp_error::DecompositionError;
use crate::topology::mesh::MeshTopology;

/// Value transported by a [`FaceCellWave`].
pub trait WaveInfo: Pod {
    /// Carries information (as opposed to unset or a wall marker).
    fn valid(&self) -> bool;
    /// Merge `other` into `self`; true when `self` changed.
    fn update_from(&mut self, other: &Self) -> bool;
}

/// Smallest label seen so far.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Pod, Zeroable)]
pub struct MinLabel(i64);

impl MinLabel {
    /// Marker for blocked faces; sorts below every valid label.
    pub const BLOCKED: MinLabel = MinLabel(-1);
    /// Nothing reached yet.
    pub const UNSET: MinLabel = MinLabel(i64::MAX);

    pub fn new(label: usize) -> Self {
        MinLabel(label as i64)
    }

    /// The label, if valid.
    pub fn get(self) -> Option<usize> {
        self.valid().then_some(self.0 as usize)
    }
}

impl Default for MinLabel {
    fn default() -> Self {
        Self::UNSET
    }
}

impl WaveInfo for MinLabel {
    fn valid(&self) -> bool {
        self.0 >= 0 && self.0 != i64::MAX
    }

    fn update_from(&mut self, other: &Self) -> bool {
        if other.valid() && self.0 != Self::BLOCKED.0 && other.0 < self.0 {
            self.0 = other.0;
            true
        } else {
            false
        }
    }
}

/// State and result of a wave.
pub struct FaceCellWave<'m, M: MeshTopology + ?Sized, T: WaveInfo> {
    mesh: &'m M,
    cell_faces: CompactListList<usize>,
    links: &'m CompactListList<usize>,
    face_data: Vec<T>,
    cell_data: Vec<T>,
    changed_faces: Vec<usize>,
    face_changed: Vec<bool>,
    changed_cells: Vec<usize>,
    cell_changed: Vec<bool>,
    rounds: usize,
}

impl<'m, M, T> FaceCellWave<'m, M, T>
where
    M: MeshTopology + ?Sized,
    T: WaveInfo + Default,
{
    /// Collective: run a wave to completion.
    ///
    /// `face_data` holds the initial value of every face (walls included),
    /// `links` pairs faces that exchange values directly (explicit
    /// connections, one row per face).
    pub fn run<C: Communicator>(
        mesh: &'m M,
        comm: &C,
        links: &'m CompactListList<usize>,
        seed_faces: &[usize],
        seed_data: &[T],
        face_data: Vec<T>,
        max_rounds: usize,
    ) -> Result<Self, DecompositionError> {
        if face_data.len() != mesh.n_faces() {
            return Err(DecompositionError::SizeMismatch {
                what: "wave face data",
                expected: mesh.n_faces(),
                found: face_data.len(),
            });
        }
        if seed_faces.len() != seed_data.len() {
            return Err(DecompositionError::SizeMismatch {
                what: "wave seed data",
                expected: seed_faces.len(),
                found: seed_data.len(),
            });
        }
        let mut wave = Self {
            mesh,
            cell_faces: cell_faces(mesh),
            links,
            face_data,
            cell_data: vec![T::default(); mesh.n_cells()],
            changed_faces: Vec::new(),
            face_changed: vec![false; mesh.n_faces()],
            changed_cells: Vec::new(),
            cell_changed: vec![false; mesh.n_cells()],
            rounds: 0,
        };
        for (&f, v) in seed_faces.iter().zip(seed_data) {
            wave.face_data[f] = *v;
            wave.mark_face(f);
        }
        wave.handle_coupled(comm)?;

        loop {
            wave.face_to_cell();
            let local = wave.cell_to_face(comm)?;
            let total = sum_u64(comm, local as u64)?;
            wave.rounds += 1;
            debug!("face/cell wave round {}: {} changed face(s)", wave.rounds, total);
            if total == 0 {
                break;
            }
            if wave.rounds >= max_rounds {
                warn!(
                    "face/cell wave stopped after {} rounds with {} face(s) still changing",
                    wave.rounds, total
                );
                break;
            }
        }
        Ok(wave)
    }

    pub fn cell_data(&self) -> &[T] {
        &self.cell_data
    }

    pub fn face_data(&self) -> &[T] {
        &self.face_data
    }

    /// Number of completed rounds.
    pub fn rounds(&self) -> usize {
        self.rounds
    }

    fn mark_face(&mut self, f: usize) {
        if !self.face_changed[f] {
            self.face_changed[f] = true;
            self.changed_faces.push(f);
        }
    }

    /// Changed faces update their cells and their linked faces.
    fn face_to_cell(&mut self) {
        let mesh = self.mesh;
        let owner = mesh.face_owner();
        let neighbour = mesh.face_neighbour();
        let links = self.links;
        let faces = std::mem::take(&mut self.changed_faces);
        for f in faces {
            self.face_changed[f] = false;
            let v = self.face_data[f];
            for &g in links.row(f) {
                if self.face_data[g].update_from(&v) {
                    self.mark_face(g);
                }
            }
            let nbr = mesh.is_internal_face(f).then(|| neighbour[f]);
            for c in std::iter::once(owner[f]).chain(nbr) {
                if self.cell_data[c].update_from(&v) && !self.cell_changed[c] {
                    self.cell_changed[c] = true;
                    self.changed_cells.push(c);
                }
            }
        }
    }

    /// Returns the number of faces changed by this step on this rank.
    fn cell_to_face<C: Communicator>(&mut self, comm: &C) -> Result<usize, DecompositionError> {
        let cells = std::mem::take(&mut self.changed_cells);
        for c in cells {
            self.cell_changed[c] = false;
            let v = self.cell_data[c];
            for i in 0..self.cell_faces.row(c).len() {
                let f = self.cell_faces.row(c)[i];
                if self.face_data[f].update_from(&v) {
                    self.mark_face(f);
                }
            }
        }
        self.handle_coupled(comm)?;
        Ok(self.changed_faces.len())
    }

    /// Swap coupled faces; a better remote value marks the local face changed.
    fn handle_coupled<C: Communicator>(&mut self, comm: &C) -> Result<(), DecompositionError> {
        let mesh = self.mesh;
        let n_internal = mesh.n_internal_faces();
        let mut remote = self.face_data[n_internal..].to_vec();
        swap_boundary_face_list(mesh, comm, &mut remote, CouplingScope::All)?;
        for p in mesh.patches().iter().filter(|p| p.coupled()) {
            for f in p.faces() {
                if self.face_data[f].update_from(&remote[f - n_internal]) {
                    self.mark_face(f);
                }
            }
        }
        Ok(())
    }
}
