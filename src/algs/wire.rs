//! Fixed little-endian wire helpers for exchange paths.
//!
//! Payloads are plain-old-data slices cast to bytes with `bytemuck`. Receive
//! buffers are copied into freshly allocated, correctly aligned vectors so a
//! byte buffer from any backend can be decoded.

use bytemuck::{Pod, Zeroable};

use crate::decomp_error::CommError;

pub fn cast_slice<T: Pod>(v: &[T]) -> &[u8] {
    bytemuck::cast_slice(v)
}

pub fn cast_slice_mut<T: Pod>(v: &mut [T]) -> &mut [u8] {
    bytemuck::cast_slice_mut(v)
}

/// Decode `bytes` into an aligned vector of `T`.
pub fn decode_vec<T: Pod>(peer: usize, bytes: &[u8]) -> Result<Vec<T>, CommError> {
    let width = std::mem::size_of::<T>();
    if width == 0 || bytes.len() % width != 0 {
        return Err(CommError::SizeMismatch {
            peer,
            expected: bytes.len().next_multiple_of(width.max(1)),
            found: bytes.len(),
        });
    }
    let mut out = vec![T::zeroed(); bytes.len() / width];
    cast_slice_mut(&mut out).copy_from_slice(bytes);
    Ok(out)
}

/// A count carried on the wire.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct WireCount {
    pub n_le: u64,
}

impl WireCount {
    pub fn new(n: usize) -> Self {
        Self {
            n_le: (n as u64).to_le(),
        }
    }
    pub fn get(&self) -> usize {
        u64::from_le(self.n_le) as usize
    }
}

static_assertions::const_assert_eq!(std::mem::size_of::<WireCount>(), 8);
