#![allow(dead_code)]

use mesh_decompose::algs::communicator::ThreadComm;
use mesh_decompose::constraints::{ConstraintSet, DecompositionConstraint};
use mesh_decompose::decomp_error::DecompositionError;
use mesh_decompose::topology::mesh::MeshTopology;

/// Run `f` once per simulated rank, each on its own thread; results in rank order.
pub fn run_ranks<R, F>(n: usize, f: F) -> Vec<R>
where
    R: Send,
    F: Fn(&ThreadComm) -> R + Sync,
{
    let world = ThreadComm::world(n);
    std::thread::scope(|s| {
        let f = &f;
        let handles: Vec<_> = world.iter().map(|c| s.spawn(move || f(c))).collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    })
}

/// Test provider: keep both sides of every processor patch together.
#[derive(Debug)]
pub struct KeepProcessorFaces;

impl DecompositionConstraint for KeepProcessorFaces {
    fn type_name(&self) -> &'static str {
        "keepProcessorFaces"
    }

    fn add(
        &self,
        mesh: &dyn MeshTopology,
        set: &mut ConstraintSet,
    ) -> Result<(), DecompositionError> {
        for p in mesh.patches().iter().filter(|p| p.is_processor()) {
            set.unblock_all(p.faces());
        }
        Ok(())
    }
}

/// Test provider: connect faces 0 and 1 but unblock only face 0.
#[derive(Debug)]
pub struct HalfUnblockedConnection;

impl DecompositionConstraint for HalfUnblockedConnection {
    fn type_name(&self) -> &'static str {
        "halfUnblockedConnection"
    }

    fn add(
        &self,
        _mesh: &dyn MeshTopology,
        set: &mut ConstraintSet,
    ) -> Result<(), DecompositionError> {
        set.unblock(0);
        set.add_connection(0, 1);
        Ok(())
    }
}

/// Test provider: pin the cells around face 0 to `target`.
#[derive(Debug)]
pub struct PinFirstFace(pub usize);

impl DecompositionConstraint for PinFirstFace {
    fn type_name(&self) -> &'static str {
        "pinFirstFace"
    }

    fn add(
        &self,
        _mesh: &dyn MeshTopology,
        set: &mut ConstraintSet,
    ) -> Result<(), DecompositionError> {
        set.add_face_set(vec![0], Some(self.0));
        Ok(())
    }
}
