use mesh_decompose::algs::communicator::NoComm;
use mesh_decompose::algs::meshgen::{BlockMesh, block_mesh};
use mesh_decompose::config::DecompositionConfig;
use mesh_decompose::constraints::{FaceSetTarget, PreservePatches, SingleProcessorFaceSets};
use mesh_decompose::decomp_error::DecompositionError;
use mesh_decompose::decompose::{Decomposer, check_consistency};
use mesh_decompose::decompose::reconcile::point_connected_cells;
use mesh_decompose::partitioning::{Hierarchical, Linear};
use mesh_decompose::registry::Registry;
use mesh_decompose::topology::mesh::{FaceZone, MeshTopology};

fn decomposer(json: &str) -> Decomposer {
    let cfg = DecompositionConfig::from_json_str(json).unwrap();
    Decomposer::from_config(&cfg, Registry::global()).unwrap()
}

#[test]
fn every_cell_gets_a_partition_in_range() {
    let mesh = block_mesh(&BlockMesh::new(4, 4, 2), 0, 1).unwrap();
    let d = decomposer(
        r#"{ "numberOfSubdomains": 4, "decomposer": "hierarchical",
             "coeffs": { "n": [2, 2, 1] } }"#,
    );
    let parts = d.decompose(&mesh, &NoComm, &[]).unwrap();
    assert_eq!(parts.len(), mesh.n_cells());
    let mut counts = [0usize; 4];
    for &p in &parts {
        counts[p] += 1;
    }
    assert_eq!(counts, [8, 8, 8, 8]);
}

#[test]
fn baffle_between_middle_cells_is_not_cut() {
    let mesh = block_mesh(&BlockMesh::line(4).with_baffle_at(2), 0, 1).unwrap();
    let d = decomposer(
        r#"{ "numberOfSubdomains": 2, "method": "linear",
             "constraints": [ { "type": "preserveBaffles" } ] }"#,
    );
    let parts = d.decompose(&mesh, &NoComm, &[]).unwrap();
    assert_eq!(parts.len(), 4);
    assert_eq!(parts[1], parts[2]);
}

#[test]
fn face_set_without_target_follows_first_owner() {
    // x-faces 5 and 6 lie on plane x = 2 and share an edge
    let mesh = block_mesh(&BlockMesh::new(4, 4, 1), 0, 1)
        .unwrap()
        .with_face_zones(vec![FaceZone::new("heater", vec![5, 6])])
        .unwrap();
    let d = Decomposer::new(4, Box::new(Hierarchical::new([4, 1, 1]))).with_constraint(
        Box::new(SingleProcessorFaceSets::new(vec![FaceSetTarget::new("heater", None)])),
    );
    let parts = d.decompose(&mesh, &NoComm, &[]).unwrap();

    let owner = mesh.face_owner()[5];
    let touched = point_connected_cells(&mesh, &[5, 6]);
    // columns i = 1 and i = 2, all four rows
    assert_eq!(touched.len(), 8);
    assert!(touched.iter().all(|&c| parts[c] == parts[owner]));
}

#[test]
fn face_set_with_target_lands_on_it() {
    let mesh = block_mesh(&BlockMesh::new(4, 4, 1), 0, 1)
        .unwrap()
        .with_face_zones(vec![FaceZone::new("heater", vec![5, 6])])
        .unwrap();
    let d = decomposer(
        r#"{ "numberOfSubdomains": 4, "decomposer": "hierarchical",
             "constraints": [ { "type": "singleProcessorFaceSets",
                                "sets": [ { "name": "heater", "processor": 3 } ] } ] }"#,
    );
    let parts = d.decompose(&mesh, &NoComm, &[]).unwrap();
    for c in point_connected_cells(&mesh, &[5, 6]) {
        assert_eq!(parts[c], 3, "cell {c}");
    }
}

#[test]
fn face_set_target_out_of_range_is_rejected() {
    let mesh = block_mesh(&BlockMesh::line(4), 0, 1)
        .unwrap()
        .with_face_zones(vec![FaceZone::new("fs", vec![1])])
        .unwrap();
    let d = Decomposer::new(2, Box::new(Linear)).with_constraint(Box::new(
        SingleProcessorFaceSets::new(vec![FaceSetTarget::new("fs", Some(5))]),
    ));
    assert!(matches!(
        d.decompose(&mesh, &NoComm, &[]),
        Err(DecompositionError::InvalidConfig(_))
    ));
}

#[test]
fn cyclic_partners_share_a_partition() {
    let mesh = block_mesh(&BlockMesh::new(4, 2, 1).with_cyclic_x(), 0, 1).unwrap();
    let d = Decomposer::new(2, Box::new(Hierarchical::new([2, 1, 1])))
        .with_constraint(Box::new(PreservePatches::new(["cyclic_xmin"])))
        .with_debug(true);
    let parts = d.decompose(&mesh, &NoComm, &[]).unwrap();
    // cell (i, j) is i + 4 j
    for j in 0..2 {
        assert_eq!(parts[4 * j], parts[4 * j + 3]);
    }
    let mut blocked = vec![true; mesh.n_faces()];
    for p in mesh.patches().iter().filter(|p| p.coupled()) {
        p.faces().for_each(|f| blocked[f] = false);
    }
    check_consistency(&mesh, &NoComm, &blocked, &parts).unwrap();
}

#[test]
fn weights_shift_the_split() {
    let mesh = block_mesh(&BlockMesh::line(4), 0, 1).unwrap();
    let d = Decomposer::new(2, Box::new(Linear));
    let parts = d.decompose(&mesh, &NoComm, &[6.0, 1.0, 1.0, 1.0]).unwrap();
    assert_eq!(parts, vec![0, 1, 1, 1]);
}

#[test]
fn invalid_weights_are_rejected() {
    let mesh = block_mesh(&BlockMesh::line(2), 0, 1).unwrap();
    let d = Decomposer::new(2, Box::new(Linear));
    assert!(matches!(
        d.decompose(&mesh, &NoComm, &[1.0, f64::NAN]),
        Err(DecompositionError::InvalidWeight { index: 1, .. })
    ));
    assert!(matches!(
        d.decompose(&mesh, &NoComm, &[1.0, 1.0, 1.0]),
        Err(DecompositionError::WeightCountMismatch { local: 1, global: 1 })
    ));
}

#[test]
fn configuration_errors_name_the_alternatives() {
    let cfg = DecompositionConfig::from_json_str(
        r#"{ "numberOfSubdomains": 2, "decomposer": "scotch" }"#,
    )
    .unwrap();
    match Decomposer::from_config(&cfg, Registry::global()) {
        Err(DecompositionError::UnknownStrategy { name, valid }) => {
            assert_eq!(name, "scotch");
            assert!(valid.iter().any(|v| v == "linear"));
        }
        other => panic!("unexpected {other:?}"),
    }

    let mesh = block_mesh(&BlockMesh::line(2), 0, 1).unwrap();
    let d = decomposer(
        r#"{ "numberOfSubdomains": 2, "decomposer": "linear",
             "constraints": [ { "type": "preserveFaceZones", "zones": ["missing"] } ] }"#,
    );
    assert!(matches!(
        d.decompose(&mesh, &NoComm, &[]),
        Err(DecompositionError::MissingFaceZone { .. })
    ));
}
