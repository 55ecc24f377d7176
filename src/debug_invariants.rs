//! Self-checks of the decomposition data structures.
//!
//! Structures with internal consistency rules (global numbering, meshes,
//! adjacency graphs) implement [`DebugInvariants`]. The checks are cheap
//! enough to run after every construction in debug builds; release builds
//! enable them with the `check-invariants` feature. The cross-partition
//! check of [`Decomposer`](crate::decompose::Decomposer) follows the same
//! switch.

use crate::decomp_error::DecompositionError;

pub trait DebugInvariants {
    /// Panic on a violated invariant when checks are enabled; no-op otherwise.
    fn debug_assert_invariants(&self);
    /// First violated invariant, if any.
    fn validate_invariants(&self) -> Result<(), DecompositionError>;
}

/// Panic with `$what` as context if `$check` returns an error, when
/// invariant checks are compiled in.
#[macro_export]
macro_rules! debug_invariants {
    ($check:expr, $what:literal) => {
        if $crate::debug_invariants::invariants_enabled() {
            if let Err(e) = $check {
                panic!("[invariants] {}: {}", $what, e);
            }
        }
    };
}

/// Debug build or `check-invariants` feature.
pub const fn invariants_enabled() -> bool {
    cfg!(any(debug_assertions, feature = "check-invariants"))
}
