//! Re-export public algorithms.

pub mod cell_cells;
pub mod communicator;
pub mod face_cell_wave;
pub mod meshgen;
pub mod reduction;
pub mod region_split;
pub mod sync;
pub mod weights;
pub mod wire;

pub use cell_cells::{CellGraph, calc_cell_cells, calc_cell_cells_weighted};
pub use weights::{check_weights, n_weights, scale_weights};
