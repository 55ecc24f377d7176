//! Dense global numbering of per-rank entities.
//!
//! `GlobalIndex` all-gathers the local entity count of every rank and keeps
//! the prefix sums: rank `r` owns the global range
//! `offsets[r]..offsets[r + 1]`. The table is read-only once built and valid
//! for one decomposition call.

use crate::algs::reduction::{Collectives, all_gather};
use crate::decomp_error::{CommError, DecompositionError};
use crate::debug_invariants::DebugInvariants;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalIndex {
    offsets: Vec<usize>,
    my_rank: usize,
}

impl GlobalIndex {
    /// Collective: gather every rank's `local_size` and prefix-sum.
    pub fn new<C: Collectives + ?Sized>(local_size: usize, comm: &C) -> Result<Self, CommError> {
        let sizes = all_gather(comm, local_size as u64)?;
        let mut offsets = Vec::with_capacity(sizes.len() + 1);
        offsets.push(0usize);
        let mut total = 0usize;
        for s in sizes {
            total += s as usize;
            offsets.push(total);
        }
        Ok(Self {
            offsets,
            my_rank: comm.my_rank(),
        })
    }

    /// Local-only numbering (no communication).
    pub fn serial(local_size: usize) -> Self {
        Self {
            offsets: vec![0, local_size],
            my_rank: 0,
        }
    }

    /// Build from explicit per-rank sizes.
    pub fn from_sizes(sizes: &[usize], my_rank: usize) -> Self {
        let mut offsets = Vec::with_capacity(sizes.len() + 1);
        offsets.push(0);
        for s in sizes {
            let next = offsets[offsets.len() - 1] + s;
            offsets.push(next);
        }
        Self { offsets, my_rank }
    }

    /// Total number of entities over all ranks.
    #[inline]
    pub fn size(&self) -> usize {
        self.offsets[self.offsets.len() - 1]
    }

    #[inline]
    pub fn n_procs(&self) -> usize {
        self.offsets.len() - 1
    }

    #[inline]
    pub fn local_start(&self) -> usize {
        self.offsets[self.my_rank]
    }

    #[inline]
    pub fn local_size(&self) -> usize {
        self.offsets[self.my_rank + 1] - self.offsets[self.my_rank]
    }

    pub fn local_range(&self) -> std::ops::Range<usize> {
        self.offsets[self.my_rank]..self.offsets[self.my_rank + 1]
    }

    #[inline]
    pub fn to_global(&self, i: usize) -> usize {
        self.offsets[self.my_rank] + i
    }

    #[inline]
    pub fn is_local(&self, g: usize) -> bool {
        self.local_range().contains(&g)
    }

    /// Local index of `g`, or `None` when another rank owns it.
    #[inline]
    pub fn to_local(&self, g: usize) -> Option<usize> {
        self.is_local(g).then(|| g - self.local_start())
    }

    /// Rank owning global id `g`.
    pub fn which_proc(&self, g: usize) -> Option<usize> {
        if g >= self.size() {
            return None;
        }
        // last offset <= g; empty ranks share offsets so take the upper bound
        let pos = self.offsets.partition_point(|&o| o <= g);
        Some(pos - 1)
    }
}

impl DebugInvariants for GlobalIndex {
    fn debug_assert_invariants(&self) {
        crate::debug_invariants!(self.validate_invariants(), "GlobalIndex");
    }

    fn validate_invariants(&self) -> Result<(), DecompositionError> {
        if self.offsets.first() != Some(&0) || self.offsets.windows(2).any(|w| w[0] > w[1]) {
            return Err(DecompositionError::InvalidConfig(format!(
                "global offsets not monotone: {:?}",
                self.offsets
            )));
        }
        if self.my_rank >= self.n_procs() {
            return Err(DecompositionError::InvalidConfig(format!(
                "rank {} outside {} ranks",
                self.my_rank,
                self.n_procs()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algs::communicator::{NoComm, ThreadComm};

    #[test]
    fn serial_is_identity() {
        let g = GlobalIndex::new(4, &NoComm).unwrap();
        assert_eq!(g, GlobalIndex::serial(4));
        assert_eq!(g.to_global(3), 3);
        assert_eq!(g.to_local(2), Some(2));
        assert_eq!(g.to_local(4), None);
    }

    #[test]
    fn which_proc_skips_empty_ranks() {
        let g = GlobalIndex::from_sizes(&[2, 0, 3], 2);
        assert_eq!(g.size(), 5);
        assert_eq!(g.which_proc(0), Some(0));
        assert_eq!(g.which_proc(1), Some(0));
        assert_eq!(g.which_proc(2), Some(2));
        assert_eq!(g.which_proc(4), Some(2));
        assert_eq!(g.which_proc(5), None);
        assert_eq!(g.to_global(1), 3);
        assert!(g.is_local(2));
        assert!(!g.is_local(1));
        g.validate_invariants().unwrap();
    }

    #[test]
    fn prefix_sum_over_ranks() {
        let world = ThreadComm::world(3);
        let out: Vec<GlobalIndex> = std::thread::scope(|s| {
            let hs: Vec<_> = world
                .iter()
                .enumerate()
                .map(|(r, c)| s.spawn(move || GlobalIndex::new(r + 1, c).unwrap()))
                .collect();
            hs.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert_eq!(out[0].local_range(), 0..1);
        assert_eq!(out[1].local_range(), 1..3);
        assert_eq!(out[2].local_range(), 3..6);
        assert!(out.iter().all(|g| g.size() == 6));
        assert_eq!(out[2].to_local(4), Some(1));
    }
}
