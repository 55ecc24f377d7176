//! Multilevel k-way graph partitioning through METIS.
//!
//! The distributed graph is gathered on every rank (rows in global order),
//! weights are scaled to bounded integers and `METIS_PartGraphKway` runs on
//! the full graph. METIS is deterministic for a fixed input, so every rank
//! computes the same answer and keeps its own slice.

use log::debug;

use super::{DecompositionStrategy, StrategyInput, gather_rows};
use crate::algs::reduction::Collectives;
use crate::algs::weights::scale_weights;
use crate::decomp_error::DecompositionError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metis {
    /// Use recursive bisection instead of k-way.
    #[serde(default)]
    pub recursive: bool,
}

fn idx(v: usize) -> Result<metis::Idx, DecompositionError> {
    metis::Idx::try_from(v)
        .map_err(|_| DecompositionError::Strategy(format!("{v} does not fit a METIS index")))
}

impl DecompositionStrategy for Metis {
    fn name(&self) -> &'static str {
        "metis"
    }

    fn supports_multiple_weights(&self) -> bool {
        true
    }

    fn partition(
        &self,
        input: &StrategyInput<'_>,
        comm: &dyn Collectives,
    ) -> Result<Vec<usize>, DecompositionError> {
        input.validate()?;
        let graph = input.graph;

        let degrees: Vec<u64> = graph.rows().map(|r| r.len() as u64).collect();
        let adjncy_local: Vec<u64> = graph.values().iter().map(|&g| g as u64).collect();
        let degrees = gather_rows(comm, &degrees)?;
        let adjncy_all = gather_rows(comm, &adjncy_local)?;

        let mut n_weights = input.n_weights;
        let scaled = scale_weights(input.weights, &mut n_weights, comm, true)?;
        let vwgt_all: Vec<i32> = gather_rows(comm, &scaled)?;

        let n_total = degrees.len();
        if input.n_parts == 1 || n_total == 0 {
            return Ok(vec![0; input.n_rows()]);
        }

        let mut xadj = Vec::with_capacity(n_total + 1);
        xadj.push(0);
        let mut acc = 0usize;
        for d in &degrees {
            acc += *d as usize;
            xadj.push(idx(acc)?);
        }
        let adjncy = adjncy_all
            .iter()
            .map(|&g| idx(g as usize))
            .collect::<Result<Vec<_>, _>>()?;
        let vwgt: Vec<metis::Idx> = vwgt_all.iter().map(|&w| w as metis::Idx).collect();

        let ncon = n_weights.max(1);
        debug!(
            "metis: {n_total} vertices, {} edges, {ncon} constraint(s), {} parts",
            adjncy.len() / 2,
            input.n_parts
        );

        let mut part = vec![0 as metis::Idx; n_total];
        let mut g = metis::Graph::new(idx(ncon)?, idx(input.n_parts)?, &xadj, &adjncy)
            .map_err(|e| DecompositionError::Strategy(e.to_string()))?;
        if n_weights > 0 {
            g = g.set_vwgt(&vwgt);
        }
        let result = if self.recursive {
            g.part_recursive(&mut part)
        } else {
            g.part_kway(&mut part)
        };
        result.map_err(|e| DecompositionError::Strategy(e.to_string()))?;

        Ok(input
            .global
            .local_range()
            .map(|gid| part[gid] as usize)
            .collect())
    }
}
