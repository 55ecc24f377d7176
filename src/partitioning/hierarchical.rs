//! Hierarchical geometric split.
//!
//! Points are sorted along the first direction of `order` and cut into
//! `n[d]` bins of equal weight; each bin is then sorted and cut along the
//! second direction, and so on. Partition of a point in bins `(b0, b1, b2)`
//! (taken in `order`) is `(b0 * n1 + b1) * n2 + b2`.
//!
//! Points and weights of every rank are gathered so each rank sorts the same
//! global set and keeps its own slice of the answer.

use super::{DecompositionStrategy, StrategyInput, gather_rows, weighted_bin};
use crate::algs::reduction::Collectives;
use crate::decomp_error::DecompositionError;

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Hierarchical {
    /// Number of bins per direction; `[n_parts, 1, 1]` when absent.
    #[serde(default)]
    pub n: Option<[usize; 3]>,
    /// Permutation of "xyz".
    #[serde(default = "default_order")]
    pub order: String,
}

fn default_order() -> String {
    "xyz".to_string()
}

impl Default for Hierarchical {
    fn default() -> Self {
        Self {
            n: None,
            order: default_order(),
        }
    }
}

impl Hierarchical {
    pub fn new(n: [usize; 3]) -> Self {
        Self {
            n: Some(n),
            ..Self::default()
        }
    }

    fn directions(&self) -> Result<[usize; 3], DecompositionError> {
        let mut out = [0usize; 3];
        let mut seen = [false; 3];
        let chars: Vec<char> = self.order.chars().collect();
        if chars.len() != 3 {
            return Err(bad_order(&self.order));
        }
        for (slot, c) in out.iter_mut().zip(chars) {
            let d = match c {
                'x' => 0,
                'y' => 1,
                'z' => 2,
                _ => return Err(bad_order(&self.order)),
            };
            if std::mem::replace(&mut seen[d], true) {
                return Err(bad_order(&self.order));
            }
            *slot = d;
        }
        Ok(out)
    }
}

fn bad_order(order: &str) -> DecompositionError {
    DecompositionError::InvalidConfig(format!(
        "hierarchical order `{order}` is not a permutation of \"xyz\""
    ))
}

#[cfg(feature = "rayon")]
fn sort_slice(slice: &mut [usize], points: &[[f64; 3]], dir: usize) {
    use rayon::prelude::*;
    slice.par_sort_by(|&a, &b| points[a][dir].total_cmp(&points[b][dir]).then(a.cmp(&b)));
}

#[cfg(not(feature = "rayon"))]
fn sort_slice(slice: &mut [usize], points: &[[f64; 3]], dir: usize) {
    slice.sort_by(|&a, &b| points[a][dir].total_cmp(&points[b][dir]).then(a.cmp(&b)));
}

/// Recursively bin `slice` (global row ids) along `dirs[level..]`.
#[allow(clippy::too_many_arguments)]
fn split(
    slice: &mut [usize],
    points: &[[f64; 3]],
    weights: &[f64],
    dirs: &[usize; 3],
    n: &[usize; 3],
    level: usize,
    base: usize,
    parts: &mut [usize],
) {
    let dir = dirs[level];
    let n_bins = n[dir];
    sort_slice(slice, points, dir);

    let total: f64 = slice.iter().map(|&g| weights[g]).sum();
    let mut acc = 0.0;
    let mut bins = Vec::with_capacity(slice.len());
    for &g in slice.iter() {
        bins.push(weighted_bin(acc + 0.5 * weights[g], total, n_bins));
        acc += weights[g];
    }

    // bins are non-decreasing along the sorted slice
    let mut start = 0;
    while start < slice.len() {
        let bin = bins[start];
        let mut end = start + 1;
        while end < slice.len() && bins[end] == bin {
            end += 1;
        }
        let part = base * n_bins + bin;
        if level == 2 {
            for &g in &slice[start..end] {
                parts[g] = part;
            }
        } else {
            split(&mut slice[start..end], points, weights, dirs, n, level + 1, part, parts);
        }
        start = end;
    }
}

impl DecompositionStrategy for Hierarchical {
    fn name(&self) -> &'static str {
        "hierarchical"
    }

    fn partition(
        &self,
        input: &StrategyInput<'_>,
        comm: &dyn Collectives,
    ) -> Result<Vec<usize>, DecompositionError> {
        input.validate()?;
        let n = self.n.unwrap_or([input.n_parts, 1, 1]);
        if n.iter().product::<usize>() != input.n_parts {
            return Err(DecompositionError::InvalidConfig(format!(
                "hierarchical bins {n:?} do not multiply to {} partitions",
                input.n_parts
            )));
        }
        let dirs = self.directions()?;

        let local_w: Vec<f64> = (0..input.n_rows()).map(|r| input.primary_weight(r)).collect();
        let points = gather_rows(comm, input.points)?;
        let weights = gather_rows(comm, &local_w)?;

        let mut order: Vec<usize> = (0..points.len()).collect();
        let mut parts = vec![0usize; points.len()];
        split(&mut order, &points, &weights, &dirs, &n, 0, 0, &mut parts);

        Ok(input.global.local_range().map(|g| parts[g]).collect())
    }
}
