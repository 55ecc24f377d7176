//! Constrained decomposition driver.
//!
//! [`Decomposer::decompose`] runs, on every rank together:
//!
//! 1. the constraint providers, producing a [`ConstraintSet`];
//! 2. the base partition: the strategy on the per-cell graph when nothing is
//!    constrained anywhere, otherwise on the graph of regions (cells joined
//!    through unblocked faces and explicit connections);
//! 3. explicit connections, the cross-rank consistency wave and the
//!    specified face sets;
//! 4. the optional consistency check and each provider's `apply` hook.
//!
//! Every check that can fail on a single rank is agreed over the
//! communicator before returning, so a fatal error stops all ranks at the
//! same stage.

pub mod consistency;
pub mod reconcile;

use itertools::Itertools;
use log::{debug, info};

use crate::algs::cell_cells::{CellGraph, calc_cell_cells, identity_agglomeration};
use crate::algs::communicator::Communicator;
use crate::algs::reduction::{agree_on_failure, sum_i64s};
use crate::algs::region_split::{Regions, split_regions};
use crate::algs::weights::{check_weights, prune_zero_components};
use crate::config::DecompositionConfig;
use crate::constraints::{
    ConstraintSet, DecompositionConstraint, apply_constraints, collect_constraints,
};
use crate::debug_invariants::invariants_enabled;
use crate::decomp_error::DecompositionError;
use crate::partitioning::{
    DecompositionStrategy, StrategyInput, check_partition, check_weight_support,
};
use crate::registry::Registry;
use crate::topology::mesh::MeshTopology;

pub use consistency::{check_consistency, enforce_consistency};
pub use reconcile::{apply_explicit_connections, apply_specified_face_sets};

#[derive(Debug)]
pub struct Decomposer {
    n_parts: usize,
    strategy: Box<dyn DecompositionStrategy>,
    constraints: Vec<Box<dyn DecompositionConstraint>>,
    debug: bool,
}

impl Decomposer {
    pub fn new(n_parts: usize, strategy: Box<dyn DecompositionStrategy>) -> Self {
        Self {
            n_parts,
            strategy,
            constraints: Vec::new(),
            debug: false,
        }
    }

    /// Append a constraint provider; providers run in insertion order.
    pub fn with_constraint(mut self, constraint: Box<dyn DecompositionConstraint>) -> Self {
        self.constraints.push(constraint);
        self
    }

    /// Always run the cross-partition check, also in release builds.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn from_config(
        cfg: &DecompositionConfig,
        registry: &Registry,
    ) -> Result<Self, DecompositionError> {
        cfg.validate()?;
        let strategy = registry.strategy(&cfg.decomposer, &cfg.coeffs)?;
        let constraints = cfg
            .constraints
            .iter()
            .map(|c| registry.constraint(&c.kind, &c.options_value()))
            .collect::<Result<Vec<_>, _>>()?;
        info!(
            "decomposer `{}` into {} subdomain(s), constraints [{}]",
            strategy.name(),
            cfg.number_of_subdomains,
            constraints.iter().map(|c| c.type_name()).join(", ")
        );
        Ok(Self {
            n_parts: cfg.number_of_subdomains,
            strategy,
            constraints,
            debug: cfg.debug,
        })
    }

    pub fn n_parts(&self) -> usize {
        self.n_parts
    }

    pub fn strategy(&self) -> &dyn DecompositionStrategy {
        self.strategy.as_ref()
    }

    pub fn constraints(&self) -> &[Box<dyn DecompositionConstraint>] {
        &self.constraints
    }

    fn check_enabled(&self) -> bool {
        self.debug || invariants_enabled()
    }

    /// Collective: partition id of every local cell.
    ///
    /// `weights` holds `n_weights` values per cell (interleaved) or is empty.
    pub fn decompose<M, C>(
        &self,
        mesh: &M,
        comm: &C,
        weights: &[f64],
    ) -> Result<Vec<usize>, DecompositionError>
    where
        M: MeshTopology,
        C: Communicator,
    {
        let set = agree_on_failure(comm, collect_constraints(mesh, &self.constraints))?;
        let mut decomposition = self.decompose_with_constraints(mesh, comm, weights, &set)?;
        let applied = apply_constraints(mesh, &self.constraints, &set, &mut decomposition)
            .and_then(|()| check_partition(&decomposition, self.n_parts));
        agree_on_failure(comm, applied)?;
        Ok(decomposition)
    }

    /// Collective: decompose honouring an already collected constraint set.
    /// Provider `apply` hooks are not run.
    ///
    /// Weight components that are zero on every rank are dropped; when none
    /// is left the decomposition is unweighted.
    pub fn decompose_with_constraints<M, C>(
        &self,
        mesh: &M,
        comm: &C,
        weights: &[f64],
        set: &ConstraintSet,
    ) -> Result<Vec<usize>, DecompositionError>
    where
        M: MeshTopology,
        C: Communicator,
    {
        let setup = if self.n_parts == 0 {
            Err(DecompositionError::InvalidConfig(
                "number of subdomains must be at least 1".into(),
            ))
        } else {
            set.validate(mesh)
        };
        agree_on_failure(comm, setup)?;
        let mut n_weights = check_weights(mesh.n_cells(), weights, comm)?;
        let weights = prune_zero_components(weights, &mut n_weights, comm)?;
        check_weight_support(self.strategy.as_ref(), n_weights)?;

        let local = [
            set.n_set_faces() as i64,
            set.explicit_connections.len() as i64,
            set.n_unblocked() as i64,
        ];
        let global = sum_i64s(comm, &local)?;
        let (n_set_faces, n_connections, n_unblocked) = (global[0], global[1], global[2]);

        if n_set_faces == 0 && n_connections == 0 && n_unblocked == 0 {
            let graph = calc_cell_cells(
                mesh,
                comm,
                &identity_agglomeration(mesh.n_cells()),
                mesh.n_cells(),
                true,
            )?;
            return self.run_strategy(comm, &graph, mesh.cell_centres(), &weights, n_weights);
        }

        let regions = agree_on_failure(
            comm,
            split_regions(mesh, &set.blocked_face, &set.explicit_connections),
        )?;
        let n_regions = sum_i64s(comm, &[regions.n_regions() as i64])?[0];
        info!(
            "constrained decomposition: {n_unblocked} unblocked face(s), \
             {n_connections} explicit connection(s), {n_set_faces} face(s) in specified sets, \
             {n_regions} region(s)"
        );

        let mut decomposition =
            self.decompose_regions(mesh, comm, &regions, &weights, n_weights)?;

        agree_on_failure(comm, apply_explicit_connections(mesh, set, &mut decomposition))?;

        if comm.size() > 1
            || consistency::has_unblocked_coupling(mesh, comm, &set.blocked_face)?
        {
            enforce_consistency(mesh, comm, set, &mut decomposition)?;
        }

        agree_on_failure(
            comm,
            apply_specified_face_sets(mesh, set, &mut decomposition, self.n_parts),
        )?;

        if self.check_enabled() {
            check_consistency(mesh, comm, &set.blocked_face, &decomposition)?;
        }
        Ok(decomposition)
    }

    /// Partition the region graph and give every cell its region's part.
    fn decompose_regions<M, C>(
        &self,
        mesh: &M,
        comm: &C,
        regions: &Regions,
        weights: &[f64],
        n_weights: usize,
    ) -> Result<Vec<usize>, DecompositionError>
    where
        M: MeshTopology,
        C: Communicator,
    {
        let n_regions = regions.n_regions();
        let centres = mesh.cell_centres();
        let points: Vec<[f64; 3]> = regions.first_cell.iter().map(|&c| centres[c]).collect();

        let (region_weights, region_n_weights) = if n_weights > 0 {
            let mut w = vec![0.0; n_regions * n_weights];
            for (c, &r) in regions.cell_region.iter().enumerate() {
                for k in 0..n_weights {
                    w[r * n_weights + k] += weights[c * n_weights + k];
                }
            }
            (w, n_weights)
        } else {
            let mut w = vec![0.0; n_regions];
            for &r in &regions.cell_region {
                w[r] += 1.0;
            }
            (w, 1)
        };

        let graph = calc_cell_cells(mesh, comm, &regions.cell_region, n_regions, true)?;
        let region_parts =
            self.run_strategy(comm, &graph, &points, &region_weights, region_n_weights)?;
        debug!(
            "{} local region(s) partitioned, expanding to {} cell(s)",
            n_regions,
            mesh.n_cells()
        );
        Ok(regions
            .cell_region
            .iter()
            .map(|&r| region_parts[r])
            .collect())
    }

    fn run_strategy<C: Communicator>(
        &self,
        comm: &C,
        graph: &CellGraph,
        points: &[[f64; 3]],
        weights: &[f64],
        n_weights: usize,
    ) -> Result<Vec<usize>, DecompositionError> {
        let input = StrategyInput {
            graph: &graph.cell_cells,
            global: &graph.global,
            points,
            weights,
            n_weights,
            n_parts: self.n_parts,
        };
        let parts = self.strategy.partition(&input, comm).and_then(|parts| {
            if parts.len() != input.n_rows() {
                return Err(DecompositionError::SizeMismatch {
                    what: "strategy result",
                    expected: input.n_rows(),
                    found: parts.len(),
                });
            }
            check_partition(&parts, self.n_parts)?;
            Ok(parts)
        });
        agree_on_failure(comm, parts)
    }
}
