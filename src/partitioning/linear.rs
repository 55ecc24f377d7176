//! Contiguous weighted split of the global row order.
//!
//! Rows keep their global numbering order; partition `p` receives the rows
//! whose weighted midpoint falls in the `p`-th equal share of the total
//! weight. Only one small gather is needed.

use super::{DecompositionStrategy, StrategyInput, weighted_bin};
use crate::algs::reduction::{Collectives, all_gather};
use crate::decomp_error::DecompositionError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Linear;

impl DecompositionStrategy for Linear {
    fn name(&self) -> &'static str {
        "linear"
    }

    fn partition(
        &self,
        input: &StrategyInput<'_>,
        comm: &dyn Collectives,
    ) -> Result<Vec<usize>, DecompositionError> {
        input.validate()?;
        let n = input.n_rows();
        let local: f64 = (0..n).map(|r| input.primary_weight(r)).sum();
        let totals = all_gather(comm, local)?;
        let offset: f64 = totals[..comm.my_rank()].iter().sum();
        let total: f64 = totals.iter().sum();

        let mut acc = offset;
        let mut parts = Vec::with_capacity(n);
        for r in 0..n {
            let w = input.primary_weight(r);
            parts.push(weighted_bin(acc + 0.5 * w, total, input.n_parts));
            acc += w;
        }
        Ok(parts)
    }
}
