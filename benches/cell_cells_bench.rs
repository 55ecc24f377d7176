use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use mesh_decompose::algs::cell_cells::{calc_cell_cells, identity_agglomeration};
use mesh_decompose::algs::communicator::NoComm;
use mesh_decompose::algs::meshgen::{BlockMesh, block_mesh};
use mesh_decompose::algs::weights::scale_weights;
use mesh_decompose::topology::mesh::MeshTopology;

fn bench_cell_cells(c: &mut Criterion) {
    let mut group = c.benchmark_group("calc_cell_cells");
    for &n in &[8usize, 16, 32] {
        let mesh = block_mesh(&BlockMesh::new(n, n, n).with_cyclic_x(), 0, 1).unwrap();
        let agglom = identity_agglomeration(mesh.n_cells());
        group.bench_with_input(BenchmarkId::new("cells", mesh.n_cells()), &mesh, |b, mesh| {
            b.iter(|| calc_cell_cells(mesh, &NoComm, &agglom, mesh.n_cells(), true).unwrap())
        });
    }
    group.finish();
}

fn bench_scale_weights(c: &mut Criterion) {
    let mut rng = SmallRng::seed_from_u64(42);
    let weights: Vec<f64> = (0..3 * 100_000).map(|_| rng.r#gen::<f64>()).collect();
    c.bench_function("scale_weights_3x100k", |b| {
        b.iter(|| {
            let mut n_weights = 3;
            scale_weights(&weights, &mut n_weights, &NoComm, false).unwrap()
        })
    });
}

criterion_group!(benches, bench_cell_cells, bench_scale_weights);
criterion_main!(benches);
