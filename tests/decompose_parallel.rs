mod common;

use common::{HalfUnblockedConnection, KeepProcessorFaces, PinFirstFace, run_ranks};
use mesh_decompose::algs::cell_cells::{calc_cell_cells, identity_agglomeration};
use mesh_decompose::algs::communicator::Communicator;
use mesh_decompose::algs::meshgen::{BlockMesh, block_mesh};
use mesh_decompose::algs::sync::{CouplingScope, swap_boundary_cell_list};
use mesh_decompose::constraints::PreserveBaffles;
use mesh_decompose::decomp_error::DecompositionError;
use mesh_decompose::decompose::Decomposer;
use mesh_decompose::partitioning::{Hierarchical, Linear};
use mesh_decompose::topology::mesh::MeshTopology;

#[test]
fn unblocked_processor_face_agrees_on_both_sides() {
    let spec = BlockMesh::line(4);
    let out = run_ranks(2, |c| {
        let mesh = block_mesh(&spec, c.rank(), 2).unwrap();
        let d = Decomposer::new(2, Box::new(Linear))
            .with_constraint(Box::new(KeepProcessorFaces))
            .with_debug(true);
        let parts = d.decompose(&mesh, c, &[]).unwrap();

        // the remote side of every processor face
        let wire: Vec<u64> = parts.iter().map(|&p| p as u64).collect();
        let nbr = swap_boundary_cell_list(&mesh, c, &wire, CouplingScope::All).unwrap();
        let n_int = mesh.n_internal_faces();
        for p in mesh.patches().iter().filter(|p| p.is_processor()) {
            for f in p.faces() {
                assert_eq!(parts[mesh.face_owner()[f]] as u64, nbr[f - n_int]);
            }
        }
        parts
    });
    // linear gives [0, 0 | 1, 1]; the wave pulls cell 2 onto partition 0
    assert_eq!(out[0], vec![0, 0]);
    assert_eq!(out[1], vec![0, 1]);
}

#[test]
fn baffle_on_one_rank_is_respected() {
    // rank 0 owns cells 0..3 of 6 and the baffle at plane 2
    let spec = BlockMesh::line(6).with_baffle_at(2);
    let out = run_ranks(2, |c| {
        let mesh = block_mesh(&spec, c.rank(), 2).unwrap();
        let d = Decomposer::new(3, Box::new(Linear)).with_constraint(Box::new(PreserveBaffles));
        d.decompose(&mesh, c, &[]).unwrap()
    });
    assert_eq!(out[0].len(), 3);
    assert_eq!(out[1].len(), 3);
    assert_eq!(out[0][1], out[0][2]);
    assert!(out.iter().flatten().all(|&p| p < 3));
}

#[test]
fn hierarchical_balances_across_ranks() {
    let spec = BlockMesh::new(4, 2, 2);
    let out = run_ranks(2, |c| {
        let mesh = block_mesh(&spec, c.rank(), 2).unwrap();
        Decomposer::new(4, Box::new(Hierarchical::new([2, 2, 1])))
            .decompose(&mesh, c, &[])
            .unwrap()
    });
    let mut counts = [0usize; 4];
    for &p in out.iter().flatten() {
        counts[p] += 1;
    }
    assert_eq!(counts, [4, 4, 4, 4]);
    // the x split coincides with the slab cut
    assert!(out[0].iter().all(|&p| p < 2));
    assert!(out[1].iter().all(|&p| p >= 2));
}

#[test]
fn distributed_graph_rows_are_clean() {
    let spec = BlockMesh::new(6, 2, 1);
    let out = run_ranks(3, |c| {
        let mesh = block_mesh(&spec, c.rank(), 3).unwrap();
        let n = mesh.n_cells();
        let g = calc_cell_cells(&mesh, c, &identity_agglomeration(n), n, true).unwrap();
        let start = g.global.local_start();
        let mut degrees = Vec::new();
        for (row, nbrs) in g.cell_cells.rows().enumerate() {
            let mut sorted = nbrs.to_vec();
            sorted.sort_unstable();
            sorted.dedup();
            assert_eq!(sorted.len(), nbrs.len(), "duplicate neighbour");
            assert!(!nbrs.contains(&(start + row)), "self loop");
            degrees.push(nbrs.len());
        }
        (start, degrees)
    });
    // global cell (i, j) sits on rank i / 2 as local (i % 2) + 2 j
    for (rank, (start, degrees)) in out.iter().enumerate() {
        assert_eq!(*start, rank * 4);
        for (local, &d) in degrees.iter().enumerate() {
            let i = 2 * rank + local % 2;
            let expected = 1 + usize::from(i > 0) + usize::from(i < 5);
            assert_eq!(d, expected, "rank {rank} cell {local}");
        }
    }
}

#[test]
fn invalid_weight_on_one_rank_stops_every_rank() {
    let spec = BlockMesh::line(4);
    let out = run_ranks(2, |c| {
        let mesh = block_mesh(&spec, c.rank(), 2).unwrap();
        let w = if c.rank() == 0 { [1.0, -1.0] } else { [1.0, 1.0] };
        Decomposer::new(2, Box::new(Linear)).decompose(&mesh, c, &w)
    });
    assert!(matches!(
        out[0],
        Err(DecompositionError::InvalidWeight { index: 1, .. })
    ));
    assert_eq!(out[1], Err(DecompositionError::PeerFailure { ranks: vec![0] }));
}

#[test]
fn weight_components_must_agree_across_ranks() {
    let spec = BlockMesh::line(4);
    let out = run_ranks(2, |c| {
        let mesh = block_mesh(&spec, c.rank(), 2).unwrap();
        let w = vec![1.0; 2 * (c.rank() + 1)];
        Decomposer::new(2, Box::new(Linear)).decompose(&mesh, c, &w)
    });
    for r in out {
        assert_eq!(
            r,
            Err(DecompositionError::WeightCountMismatch { local: 1, global: 2 })
        );
    }
}

#[test]
fn inconsistent_connection_on_one_rank_stops_every_rank() {
    let spec = BlockMesh::line(4);
    let out = run_ranks(2, |c| {
        let mesh = block_mesh(&spec, c.rank(), 2).unwrap();
        let mut d = Decomposer::new(2, Box::new(Linear));
        if c.rank() == 1 {
            d = d.with_constraint(Box::new(HalfUnblockedConnection));
        }
        d.decompose(&mesh, c, &[])
    });
    assert_eq!(out[0], Err(DecompositionError::PeerFailure { ranks: vec![1] }));
    assert!(matches!(
        out[1],
        Err(DecompositionError::InconsistentConnection { f0: 0, f1: 1, .. })
    ));
}

#[test]
fn out_of_range_target_on_one_rank_stops_every_rank() {
    let spec = BlockMesh::line(4);
    let out = run_ranks(2, |c| {
        let mesh = block_mesh(&spec, c.rank(), 2).unwrap();
        let target = if c.rank() == 0 { 7 } else { 1 };
        Decomposer::new(2, Box::new(Linear))
            .with_constraint(Box::new(PinFirstFace(target)))
            .decompose(&mesh, c, &[])
    });
    assert!(matches!(out[0], Err(DecompositionError::InvalidConfig(_))));
    assert_eq!(out[1], Err(DecompositionError::PeerFailure { ranks: vec![0] }));
}

#[test]
fn zero_weights_split_like_no_weights_across_ranks() {
    let spec = BlockMesh::line(8);
    let out = run_ranks(2, |c| {
        let mesh = block_mesh(&spec, c.rank(), 2).unwrap();
        let d = Decomposer::new(4, Box::new(Linear));
        let unweighted = d.decompose(&mesh, c, &[]).unwrap();
        let zeros = d.decompose(&mesh, c, &vec![0.0; mesh.n_cells()]).unwrap();
        (unweighted, zeros)
    });
    for (unweighted, zeros) in &out {
        assert_eq!(zeros, unweighted);
    }
    assert_eq!(out[0].1, vec![0, 0, 1, 1]);
    assert_eq!(out[1].1, vec![2, 2, 3, 3]);
}
