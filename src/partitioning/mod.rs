//! Pluggable partitioning strategies.
//!
//! A strategy maps the local rows of a (possibly coarsened) graph onto
//! `0..n_parts`. It sees the global numbering of the rows, one point per
//! row and the interleaved float weights, and may communicate through the
//! object-safe [`Collectives`] view. Every rank calls [`partition`] together.
//!
//! [`partition`]: DecompositionStrategy::partition

pub mod hierarchical;
pub mod linear;
#[cfg(feature = "metis-support")]
pub mod metis;

use std::fmt::Debug;

use crate::algs::reduction::{Collectives, all_gather_vec};
use crate::data::compact_list::CompactListList;
use crate::data::global_index::GlobalIndex;
use crate::decomp_error::DecompositionError;

pub use hierarchical::Hierarchical;
pub use linear::Linear;
#[cfg(feature = "metis-support")]
pub use metis::Metis;

/// Everything a strategy gets to see.
#[derive(Debug, Clone, Copy)]
pub struct StrategyInput<'a> {
    /// Local rows, global neighbour ids.
    pub graph: &'a CompactListList<usize>,
    /// Global numbering of the rows.
    pub global: &'a GlobalIndex,
    /// One representative point per row.
    pub points: &'a [[f64; 3]],
    /// `n_weights` values per row, interleaved; empty when unweighted.
    pub weights: &'a [f64],
    pub n_weights: usize,
    pub n_parts: usize,
}

impl StrategyInput<'_> {
    pub fn n_rows(&self) -> usize {
        self.graph.len()
    }

    /// First weight component of `row`, or 1 when unweighted.
    pub fn primary_weight(&self, row: usize) -> f64 {
        if self.n_weights == 0 || self.weights.is_empty() {
            1.0
        } else {
            self.weights[row * self.n_weights]
        }
    }

    /// Check that the arrays agree with the number of rows.
    pub fn validate(&self) -> Result<(), DecompositionError> {
        let n = self.n_rows();
        if self.points.len() != n {
            return Err(DecompositionError::SizeMismatch {
                what: "strategy points",
                expected: n,
                found: self.points.len(),
            });
        }
        if !self.weights.is_empty() && self.weights.len() != n * self.n_weights {
            return Err(DecompositionError::SizeMismatch {
                what: "strategy weights",
                expected: n * self.n_weights,
                found: self.weights.len(),
            });
        }
        if self.global.local_size() != n {
            return Err(DecompositionError::SizeMismatch {
                what: "strategy numbering",
                expected: n,
                found: self.global.local_size(),
            });
        }
        if self.n_parts == 0 {
            return Err(DecompositionError::InvalidConfig(
                "number of partitions must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// A partitioning heuristic.
pub trait DecompositionStrategy: Debug + Send + Sync {
    /// Registered name.
    fn name(&self) -> &'static str;

    /// Whether more than one weight component per row is accepted.
    fn supports_multiple_weights(&self) -> bool {
        false
    }

    /// Collective: partition id of every local row.
    fn partition(
        &self,
        input: &StrategyInput<'_>,
        comm: &dyn Collectives,
    ) -> Result<Vec<usize>, DecompositionError>;
}

/// Fail unless `strategy` accepts `n_weights` components.
pub fn check_weight_support(
    strategy: &dyn DecompositionStrategy,
    n_weights: usize,
) -> Result<(), DecompositionError> {
    if n_weights > 1 && !strategy.supports_multiple_weights() {
        return Err(DecompositionError::MultipleWeightsUnsupported {
            strategy: strategy.name().to_string(),
            n_weights,
        });
    }
    Ok(())
}

/// Check every id of `parts` against `n_parts`.
pub fn check_partition(parts: &[usize], n_parts: usize) -> Result<(), DecompositionError> {
    match parts.iter().enumerate().find(|&(_, &p)| p >= n_parts) {
        Some((cell, &part)) => Err(DecompositionError::InvalidPartition {
            cell,
            part,
            n_parts,
        }),
        None => Ok(()),
    }
}

/// Collective: concatenate a per-row array over all ranks (rank-major, the
/// same order as the global numbering).
pub(crate) fn gather_rows<T: bytemuck::Pod>(
    comm: &dyn Collectives,
    local: &[T],
) -> Result<Vec<T>, DecompositionError> {
    Ok(all_gather_vec(comm, local)?.into_iter().flatten().collect())
}

/// Bin of a row whose weighted midpoint lies at `mid` in `0..=total`.
pub(crate) fn weighted_bin(mid: f64, total: f64, n_bins: usize) -> usize {
    if total <= 0.0 || n_bins == 0 {
        return 0;
    }
    (((mid / total) * n_bins as f64).floor() as usize).min(n_bins - 1)
}
