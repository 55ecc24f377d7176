//! Per-cell load weights: component counting, validation and integer scaling.
//!
//! Weights are stored interleaved, `n_weights` consecutive values per cell.
//! Some strategies only accept bounded integers, so [`scale_weights`] maps
//! the floating values onto `0..=i32::MAX / 2 + 1` with a single global
//! factor and drops components that are zero everywhere.
//! [`prune_zero_components`] does the same pruning without scaling.

use std::borrow::Cow;

use log::debug;

use crate::algs::reduction::{Collectives, agree_on_failure, all_gather, sum_f64s, sum_i64s};
use crate::decomp_error::DecompositionError;

/// Upper bound of every scaled weight.
pub const SCALED_WEIGHT_MAX: i64 = (i32::MAX / 2) as i64 + 1;

/// Collective: number of weight components per cell, agreed over all ranks.
///
/// Ranks without cells accept any count. A rank with cells whose weight
/// array does not hold `global * n_points` values fails the call on every
/// rank with the same [`WeightCountMismatch`](DecompositionError::WeightCountMismatch),
/// reported for the lowest such rank.
pub fn n_weights<C: Collectives + ?Sized>(
    n_points: usize,
    weights: &[f64],
    comm: &C,
) -> Result<usize, DecompositionError> {
    let local = if n_points > 0 {
        weights.len() / n_points
    } else {
        0
    };
    let layouts = all_gather(comm, [n_points as u64, local as u64, weights.len() as u64])?;
    let global = layouts.iter().map(|l| l[1]).max().unwrap_or(0);
    match layouts
        .iter()
        .find(|&&[n, _, len]| n > 0 && len != global * n)
    {
        Some(&[_, bad, _]) => Err(DecompositionError::WeightCountMismatch {
            local: bad as usize,
            global: global as usize,
        }),
        None => Ok(global as usize),
    }
}

/// Collective: validate weight values and return the agreed component count.
pub fn check_weights<C: Collectives + ?Sized>(
    n_points: usize,
    weights: &[f64],
    comm: &C,
) -> Result<usize, DecompositionError> {
    let valid = match weights
        .iter()
        .enumerate()
        .find(|(_, w)| !w.is_finite() || **w < 0.0)
    {
        Some((index, &value)) => Err(DecompositionError::InvalidWeight { index, value }),
        None => Ok(()),
    };
    agree_on_failure(comm, valid)?;
    n_weights(n_points, weights, comm)
}

/// Collective: drop the components whose sum over all ranks is zero.
///
/// `n_weights` must already be agreed (see [`check_weights`]) and is updated.
/// When nothing survives the result is empty and `n_weights` is 0, which
/// callers treat as unweighted.
pub fn prune_zero_components<'a, C: Collectives + ?Sized>(
    weights: &'a [f64],
    n_weights: &mut usize,
    comm: &C,
) -> Result<Cow<'a, [f64]>, DecompositionError> {
    let nw = *n_weights;
    if nw == 0 {
        return Ok(Cow::Borrowed(weights));
    }
    let mut local = vec![0.0; nw];
    for row in weights.chunks_exact(nw) {
        for (s, w) in local.iter_mut().zip(row) {
            *s += w;
        }
    }
    let global = sum_f64s(comm, &local)?;
    let keep: Vec<usize> = (0..nw).filter(|&k| global[k] > 0.0).collect();
    if keep.len() == nw {
        return Ok(Cow::Borrowed(weights));
    }
    debug!("{} of {nw} weight component(s) are zero everywhere", nw - keep.len());
    *n_weights = keep.len();
    if keep.is_empty() {
        return Ok(Cow::Owned(Vec::new()));
    }
    Ok(Cow::Owned(
        weights
            .chunks_exact(nw)
            .flat_map(|row| keep.iter().map(move |&k| row[k]))
            .collect(),
    ))
}

/// Collective when `distributed`: scale `weights` to integers.
///
/// `scale = i32::MAX / (2 * sum)` over every value on every rank, each entry
/// becomes `ceil(scale * w)`. Components whose integer sum is zero are
/// removed and `n_weights` is updated. When every component is removed the
/// result is empty and `n_weights` is 0.
pub fn scale_weights<C: Collectives + ?Sized>(
    weights: &[f64],
    n_weights: &mut usize,
    comm: &C,
    distributed: bool,
) -> Result<Vec<i32>, DecompositionError> {
    let nw = *n_weights;
    if nw == 0 {
        return Ok(Vec::new());
    }
    let valid = if weights.len() % nw != 0 {
        Err(DecompositionError::SizeMismatch {
            what: "interleaved weights",
            expected: (weights.len() / nw) * nw,
            found: weights.len(),
        })
    } else {
        match weights
            .iter()
            .enumerate()
            .find(|(_, w)| !w.is_finite() || **w < 0.0)
        {
            Some((index, &value)) => Err(DecompositionError::InvalidWeight { index, value }),
            None => Ok(()),
        }
    };
    if distributed {
        agree_on_failure(comm, valid)?;
    } else {
        valid?;
    }

    let local_sum: f64 = weights.iter().sum();
    let sum = if distributed {
        sum_f64s(comm, &[local_sum])?[0]
    } else {
        local_sum
    };

    let mut scaled: Vec<i32> = if sum > 0.0 {
        let scale = f64::from(i32::MAX) / (2.0 * sum);
        weights
            .iter()
            .map(|&w| ((scale * w).ceil() as i64).min(SCALED_WEIGHT_MAX) as i32)
            .collect()
    } else {
        vec![0; weights.len()]
    };

    let mut comp_sums = vec![0i64; nw];
    for cell in scaled.chunks_exact(nw) {
        for (s, &w) in comp_sums.iter_mut().zip(cell) {
            *s += i64::from(w);
        }
    }
    if distributed {
        comp_sums = sum_i64s(comm, &comp_sums)?;
    }

    let keep: Vec<usize> = (0..nw).filter(|&c| comp_sums[c] != 0).collect();
    if keep.len() != nw {
        debug!(
            "scale_weights: pruning {} zero-sum weight component(s) of {nw}",
            nw - keep.len()
        );
        scaled = if keep.is_empty() {
            Vec::new()
        } else {
            scaled
                .chunks_exact(nw)
                .flat_map(|cell| keep.iter().map(move |&c| cell[c]))
                .collect()
        };
        *n_weights = keep.len();
    }
    Ok(scaled)
}
