use mesh_decompose::algs::communicator::NoComm;
use mesh_decompose::algs::meshgen::{BlockMesh, block_mesh};
use mesh_decompose::algs::reduction::Collectives;
use mesh_decompose::config::DecompositionConfig;
use mesh_decompose::decomp_error::DecompositionError;
use mesh_decompose::decompose::Decomposer;
use mesh_decompose::partitioning::{DecompositionStrategy, StrategyInput};
use mesh_decompose::registry::Registry;

/// Round-robin over the rows handed to the strategy.
#[derive(Debug)]
struct RoundRobin;

impl DecompositionStrategy for RoundRobin {
    fn name(&self) -> &'static str {
        "roundRobin"
    }

    fn partition(
        &self,
        input: &StrategyInput<'_>,
        _comm: &dyn Collectives,
    ) -> Result<Vec<usize>, DecompositionError> {
        Ok(input
            .global
            .local_range()
            .map(|g| g % input.n_parts)
            .collect())
    }
}

/// Returns an id one past the last partition.
#[derive(Debug)]
struct OffByOne;

impl DecompositionStrategy for OffByOne {
    fn name(&self) -> &'static str {
        "offByOne"
    }

    fn partition(
        &self,
        input: &StrategyInput<'_>,
        _comm: &dyn Collectives,
    ) -> Result<Vec<usize>, DecompositionError> {
        Ok(vec![input.n_parts; input.n_rows()])
    }
}

fn registry() -> Registry {
    let mut r = Registry::with_builtins();
    r.register_strategy("roundRobin", |_| Ok(Box::new(RoundRobin)));
    r.register_strategy("offByOne", |_| Ok(Box::new(OffByOne)));
    r
}

#[test]
fn registered_strategy_is_selected_by_name() {
    let cfg = DecompositionConfig::from_json_str(
        r#"{ "numberOfSubdomains": 2, "decomposer": "roundRobin" }"#,
    )
    .unwrap();
    let d = Decomposer::from_config(&cfg, &registry()).unwrap();
    let mesh = block_mesh(&BlockMesh::line(4), 0, 1).unwrap();
    assert_eq!(d.decompose(&mesh, &NoComm, &[]).unwrap(), vec![0, 1, 0, 1]);
}

#[test]
fn regions_are_handed_to_the_strategy() {
    // cells 1 and 2 form one region, so rows are {0}, {1, 2}, {3}
    let cfg = DecompositionConfig::from_json_str(
        r#"{ "numberOfSubdomains": 2, "decomposer": "roundRobin",
             "constraints": [ { "type": "preserveBaffles" } ] }"#,
    )
    .unwrap();
    let d = Decomposer::from_config(&cfg, &registry()).unwrap();
    let mesh = block_mesh(&BlockMesh::line(4).with_baffle_at(2), 0, 1).unwrap();
    assert_eq!(d.decompose(&mesh, &NoComm, &[]).unwrap(), vec![0, 1, 1, 0]);
}

#[test]
fn out_of_range_result_is_rejected() {
    let cfg = DecompositionConfig::from_json_str(
        r#"{ "numberOfSubdomains": 2, "decomposer": "offByOne" }"#,
    )
    .unwrap();
    let d = Decomposer::from_config(&cfg, &registry()).unwrap();
    let mesh = block_mesh(&BlockMesh::line(2), 0, 1).unwrap();
    assert_eq!(
        d.decompose(&mesh, &NoComm, &[]),
        Err(DecompositionError::InvalidPartition {
            cell: 0,
            part: 2,
            n_parts: 2
        })
    );
}

#[test]
fn custom_registry_keeps_builtins() {
    let r = registry();
    let names = r.strategy_names();
    for n in ["hierarchical", "linear", "offByOne", "roundRobin"] {
        assert!(names.iter().any(|s| s == n), "{n} missing");
    }
}
