//! Global reductions and gathers over a [`Communicator`].
//!
//! [`Collectives`] is the object-safe subset of the transport used by
//! partitioning strategies (which are stored as trait objects). Every
//! function here is collective: all ranks must call it in the same order.

use bytemuck::Pod;

use crate::algs::communicator::{Communicator, GATHERV_TAG, Wait};
use crate::algs::wire::{WireCount, cast_slice, decode_vec};
use crate::decomp_error::{CommError, DecompositionError};

/// Object-safe collective operations.
pub trait Collectives {
    fn my_rank(&self) -> usize;
    fn n_ranks(&self) -> usize;
    /// Equal-size all-gather of raw bytes.
    fn all_gather_bytes(&self, send: &[u8]) -> Result<Vec<u8>, CommError>;
    /// Variable-size all-gather; returns one buffer per rank.
    fn all_gather_var_bytes(&self, send: &[u8]) -> Result<Vec<Vec<u8>>, CommError>;
}

impl<C: Communicator> Collectives for C {
    fn my_rank(&self) -> usize {
        self.rank()
    }

    fn n_ranks(&self) -> usize {
        self.size()
    }

    fn all_gather_bytes(&self, send: &[u8]) -> Result<Vec<u8>, CommError> {
        let mut recv = vec![0u8; send.len() * self.size()];
        self.allgather(send, &mut recv)?;
        Ok(recv)
    }

    fn all_gather_var_bytes(&self, send: &[u8]) -> Result<Vec<Vec<u8>>, CommError> {
        let size = self.size();
        let me = self.rank();
        let counts_raw = self.all_gather_bytes(cast_slice(&[WireCount::new(send.len())]))?;
        let counts: Vec<usize> = decode_vec::<WireCount>(me, &counts_raw)?
            .iter()
            .map(WireCount::get)
            .collect();

        let tag = GATHERV_TAG.as_u16();
        let mut sends = Vec::new();
        for peer in (0..size).filter(|&p| p != me) {
            sends.push(self.isend(peer, tag, send)?);
        }
        let mut out = vec![Vec::new(); size];
        for peer in (0..size).filter(|&p| p != me) {
            let data = self
                .irecv(peer, tag, counts[peer])?
                .wait()?
                .ok_or(CommError::MissingMessage { peer, tag })?;
            out[peer] = data;
        }
        out[me] = send.to_vec();
        for s in sends {
            s.wait()?;
        }
        Ok(out)
    }
}

/// One value per rank, rank-major.
pub fn all_gather<T: Pod, C: Collectives + ?Sized>(comm: &C, value: T) -> Result<Vec<T>, CommError> {
    let raw = comm.all_gather_bytes(cast_slice(std::slice::from_ref(&value)))?;
    decode_vec(comm.my_rank(), &raw)
}

/// Concatenation of every rank's slice, rank-major.
pub fn all_gather_vec<T: Pod, C: Collectives + ?Sized>(
    comm: &C,
    values: &[T],
) -> Result<Vec<Vec<T>>, CommError> {
    let me = comm.my_rank();
    comm.all_gather_var_bytes(cast_slice(values))?
        .iter()
        .map(|raw| decode_vec(me, raw))
        .collect()
}

pub fn sum_u64<C: Collectives + ?Sized>(comm: &C, value: u64) -> Result<u64, CommError> {
    Ok(all_gather(comm, value)?.into_iter().sum())
}

pub fn max_u64<C: Collectives + ?Sized>(comm: &C, value: u64) -> Result<u64, CommError> {
    Ok(all_gather(comm, value)?.into_iter().max().unwrap_or(0))
}

/// Element-wise global sum. Summation runs in rank order so every rank
/// obtains bit-identical results.
pub fn sum_f64s<C: Collectives + ?Sized>(comm: &C, values: &[f64]) -> Result<Vec<f64>, CommError> {
    let n = values.len();
    let raw = comm.all_gather_bytes(cast_slice(values))?;
    let all: Vec<f64> = decode_vec(comm.my_rank(), &raw)?;
    let mut out = vec![0.0; n];
    if n > 0 {
        for chunk in all.chunks_exact(n) {
            for (o, v) in out.iter_mut().zip(chunk) {
                *o += v;
            }
        }
    }
    Ok(out)
}

/// Element-wise global sum of integers.
pub fn sum_i64s<C: Collectives + ?Sized>(comm: &C, values: &[i64]) -> Result<Vec<i64>, CommError> {
    let n = values.len();
    let raw = comm.all_gather_bytes(cast_slice(values))?;
    let all: Vec<i64> = decode_vec(comm.my_rank(), &raw)?;
    let mut out = vec![0i64; n];
    if n > 0 {
        for chunk in all.chunks_exact(n) {
            for (o, v) in out.iter_mut().zip(chunk) {
                *o += v;
            }
        }
    }
    Ok(out)
}

/// Turn a rank-local outcome into a collective one.
///
/// A failing rank keeps its own error. Every other rank gets
/// [`DecompositionError::PeerFailure`] naming the failed ranks, so all ranks
/// leave together and none waits in a later collective.
pub fn agree_on_failure<T, C: Collectives + ?Sized>(
    comm: &C,
    local: Result<T, DecompositionError>,
) -> Result<T, DecompositionError> {
    let failed = all_gather(comm, u8::from(local.is_err()))?;
    let ranks: Vec<usize> = failed
        .iter()
        .enumerate()
        .filter(|&(_, &f)| f != 0)
        .map(|(r, _)| r)
        .collect();
    match local {
        Ok(_) if !ranks.is_empty() => Err(DecompositionError::PeerFailure { ranks }),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algs::communicator::{NoComm, ThreadComm};

    #[test]
    fn serial_reductions_are_identity() {
        assert_eq!(sum_u64(&NoComm, 7).unwrap(), 7);
        assert_eq!(max_u64(&NoComm, 3).unwrap(), 3);
        assert_eq!(sum_f64s(&NoComm, &[1.5, 2.0]).unwrap(), vec![1.5, 2.0]);
        assert!(sum_f64s(&NoComm, &[]).unwrap().is_empty());
    }

    #[test]
    fn reductions_over_three_ranks() {
        let world = ThreadComm::world(3);
        let results: Vec<_> = std::thread::scope(|s| {
            let hs: Vec<_> = world
                .iter()
                .map(|c| {
                    s.spawn(move || {
                        let r = c.rank();
                        let total = sum_u64(c, r as u64 + 1).unwrap();
                        let max = max_u64(c, r as u64 * 5).unwrap();
                        let sums = sum_i64s(c, &[r as i64, 1]).unwrap();
                        let gathered = all_gather_vec(c, &vec![r as u32; r]).unwrap();
                        (total, max, sums, gathered)
                    })
                })
                .collect();
            hs.into_iter().map(|h| h.join().unwrap()).collect()
        });
        for (total, max, sums, gathered) in results {
            assert_eq!(total, 6);
            assert_eq!(max, 10);
            assert_eq!(sums, vec![3, 3]);
            assert_eq!(gathered, vec![vec![], vec![1], vec![2, 2]]);
        }
    }

    #[test]
    fn failure_on_one_rank_reaches_all() {
        let world = ThreadComm::world(3);
        let results: Vec<_> = std::thread::scope(|s| {
            let hs: Vec<_> = world
                .iter()
                .map(|c| {
                    s.spawn(move || {
                        let local = if c.rank() == 1 {
                            Err(DecompositionError::InvalidConfig("bad".into()))
                        } else {
                            Ok(c.rank())
                        };
                        let first = agree_on_failure(c, local);
                        // everyone is still in step for the next collective
                        let next = agree_on_failure(c, Ok(c.rank())).unwrap();
                        (first, next)
                    })
                })
                .collect();
            hs.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert_eq!(
            results[0].0,
            Err(DecompositionError::PeerFailure { ranks: vec![1] })
        );
        assert_eq!(
            results[1].0,
            Err(DecompositionError::InvalidConfig("bad".into()))
        );
        assert_eq!(
            results[2].0,
            Err(DecompositionError::PeerFailure { ranks: vec![1] })
        );
        assert_eq!(
            results.iter().map(|r| r.1).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
    }

    #[test]
    fn serial_agreement_passes_through() {
        assert_eq!(agree_on_failure(&NoComm, Ok(3)), Ok(3));
        assert!(matches!(
            agree_on_failure::<(), _>(&NoComm, Err(DecompositionError::Strategy("x".into()))),
            Err(DecompositionError::Strategy(_))
        ));
    }
}
