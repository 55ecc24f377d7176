//! DecompositionError: unified error type for mesh-decompose public APIs.
//!
//! Every fatal condition of a decomposition is reported through this type so
//! callers can abort the whole distributed run instead of leaving ranks in
//! different states. Transport failures are wrapped unchanged.

use thiserror::Error;

/// Errors raised by the communication layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommError {
    /// A receive completed without delivering any payload.
    #[error("no message from rank {peer} (tag {tag:#06x})")]
    MissingMessage { peer: usize, tag: u16 },
    /// A received payload did not have the expected byte length.
    #[error("message from rank {peer} has {found} bytes, expected {expected}")]
    SizeMismatch {
        peer: usize,
        expected: usize,
        found: usize,
    },
    /// A peer rank outside `0..size` was addressed.
    #[error("rank {peer} is outside the communicator (size {size})")]
    InvalidRank { peer: usize, size: usize },
    /// Backend-specific failure (e.g. MPI initialisation).
    #[error("transport failure: {0}")]
    Backend(String),
}

/// Unified error type for decomposition operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DecompositionError {
    /// No strategy registered under this name.
    #[error("unknown decomposer `{name}`; valid decomposers are: {valid:?}")]
    UnknownStrategy { name: String, valid: Vec<String> },
    /// No constraint provider registered under this name.
    #[error("unknown constraint type `{name}`; valid constraint types are: {valid:?}")]
    UnknownConstraint { name: String, valid: Vec<String> },
    /// The selected strategy only accepts a single weight per cell.
    #[error("decomposer `{strategy}` does not support multiple constraints ({n_weights} weights per cell)")]
    MultipleWeightsUnsupported { strategy: String, n_weights: usize },
    /// Malformed or incomplete configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// A constraint referenced a patch that does not exist.
    #[error("patch `{name}` not found; available patches: {valid:?}")]
    MissingPatch { name: String, valid: Vec<String> },
    /// A constraint referenced a face zone that does not exist.
    #[error("face zone `{name}` not found; available zones: {valid:?}")]
    MissingFaceZone { name: String, valid: Vec<String> },
    /// The two faces of an explicit connection disagree on blocked status.
    #[error(
        "on explicit connection between faces {f0} (at {at0:?}) and {f1} (at {at1:?}) \
         the blocked status differs: {blocked0} and {blocked1}"
    )]
    InconsistentConnection {
        f0: usize,
        f1: usize,
        blocked0: bool,
        blocked1: bool,
        at0: [f64; 3],
        at1: [f64; 3],
    },
    /// An unblocked coupled face carries different assignments on its two sides.
    #[error("patch `{patch}` face {face} at {at:?}: owner partition {own} but neighbour partition {nbr}")]
    CrossPartitionDivergence {
        patch: String,
        face: usize,
        at: [f64; 3],
        own: usize,
        nbr: usize,
    },
    /// Ranks disagree on the number of weight components per cell.
    #[error("number of weights per cell ({local}) does not equal the maximum over all ranks ({global})")]
    WeightCountMismatch { local: usize, global: usize },
    /// A weight was negative, NaN or infinite.
    #[error("weight {index} has invalid value {value}")]
    InvalidWeight { index: usize, value: f64 },
    /// An input array had the wrong length.
    #[error("{what}: expected length {expected}, found {found}")]
    SizeMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },
    /// A strategy returned an id outside `0..n_parts`.
    #[error("cell {cell} assigned to partition {part}, outside 0..{n_parts}")]
    InvalidPartition {
        cell: usize,
        part: usize,
        n_parts: usize,
    },
    /// Another rank hit a fatal error at the same stage; this rank stops too.
    #[error("decomposition aborted: rank(s) {ranks:?} failed")]
    PeerFailure { ranks: Vec<usize> },
    /// Failure inside a strategy (e.g. the METIS library).
    #[error("decomposer failure: {0}")]
    Strategy(String),
    /// Communication failure, propagated unchanged.
    #[error(transparent)]
    Comm(#[from] CommError),
}
