//! Thin façade over serial, intra-process (threads) or inter-process (MPI)
//! message passing.
//!
//! Messages are *contiguous byte slices*. Sends are buffered and return at
//! once; receives are completed by calling [`Wait::wait`]. Messages between
//! the same `(src, dst, tag)` triple are delivered in send order, so SPMD code
//! may reuse a tag across synchronous rounds.

use std::collections::VecDeque;
use std::sync::Arc;

use bytes::Bytes;
use dashmap::DashMap;

use crate::decomp_error::CommError;

/// Reserved tags for the collectives built into this crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CommTag(u16);

impl CommTag {
    pub const fn new(tag: u16) -> Self {
        Self(tag)
    }
    pub const fn as_u16(self) -> u16 {
        self.0
    }
    /// Tag offset by a per-channel value (e.g. a processor patch tag).
    pub const fn offset(self, by: u16) -> Self {
        Self(self.0.wrapping_add(by))
    }
}

pub const ALLGATHER_TAG: CommTag = CommTag::new(0xA110);
pub const GATHERV_TAG: CommTag = CommTag::new(0x6A00);
pub const SWAP_BOUNDARY_TAG: CommTag = CommTag::new(0x5A00);

/// Message-passing interface (minimal by design).
pub trait Communicator {
    /// Handle returned by `isend`.
    type SendHandle: Wait;
    /// Handle returned by `irecv`.
    type RecvHandle<'a>: Wait
    where
        Self: 'a;

    /// Rank of this process in the communicator.
    fn rank(&self) -> usize;
    /// Number of ranks.
    fn size(&self) -> usize;

    fn isend(&self, peer: usize, tag: u16, buf: &[u8]) -> Result<Self::SendHandle, CommError>;
    /// Post a receive of exactly `len` bytes.
    fn irecv(&self, peer: usize, tag: u16, len: usize)
    -> Result<Self::RecvHandle<'_>, CommError>;

    /// Gather `send` from every rank into `recv` (rank-major, equal sizes).
    fn allgather(&self, send: &[u8], recv: &mut [u8]) -> Result<(), CommError> {
        let n = send.len();
        let size = self.size();
        if recv.len() != n * size {
            return Err(CommError::SizeMismatch {
                peer: self.rank(),
                expected: n * size,
                found: recv.len(),
            });
        }
        let me = self.rank();
        let tag = ALLGATHER_TAG.as_u16();
        let mut sends = Vec::with_capacity(size.saturating_sub(1));
        for peer in (0..size).filter(|&p| p != me) {
            sends.push(self.isend(peer, tag, send)?);
        }
        let mut recvs = Vec::with_capacity(size.saturating_sub(1));
        for peer in (0..size).filter(|&p| p != me) {
            recvs.push((peer, self.irecv(peer, tag, n)?));
        }
        recv[me * n..(me + 1) * n].copy_from_slice(send);
        for (peer, h) in recvs {
            let data = h.wait()?.ok_or(CommError::MissingMessage { peer, tag })?;
            recv[peer * n..(peer + 1) * n].copy_from_slice(&data);
        }
        for s in sends {
            s.wait()?;
        }
        Ok(())
    }
}

/// Anything that can be waited on.
pub trait Wait {
    /// Wait for completion and return the received data (if any).
    fn wait(self) -> Result<Option<Vec<u8>>, CommError>;
}

impl Wait for () {
    fn wait(self) -> Result<Option<Vec<u8>>, CommError> {
        Ok(None)
    }
}

/// Single-rank communicator for serial runs and unit tests.
#[derive(Clone, Debug, Default)]
pub struct NoComm;

impl Communicator for NoComm {
    type SendHandle = ();
    type RecvHandle<'a> = ();

    fn rank(&self) -> usize {
        0
    }
    fn size(&self) -> usize {
        1
    }
    fn isend(&self, peer: usize, _tag: u16, _buf: &[u8]) -> Result<(), CommError> {
        Err(CommError::InvalidRank { peer, size: 1 })
    }
    fn irecv(&self, peer: usize, _tag: u16, _len: usize) -> Result<(), CommError> {
        Err(CommError::InvalidRank { peer, size: 1 })
    }
    fn allgather(&self, send: &[u8], recv: &mut [u8]) -> Result<(), CommError> {
        if recv.len() != send.len() {
            return Err(CommError::SizeMismatch {
                peer: 0,
                expected: send.len(),
                found: recv.len(),
            });
        }
        recv.copy_from_slice(send);
        Ok(())
    }
}

// --- ThreadComm: intra-process / one thread per simulated rank ---
type Key = (usize, usize, u16); // (src, dst, tag)

#[derive(Debug, Default)]
struct Mailbox {
    slots: DashMap<Key, VecDeque<Bytes>>,
}

/// In-process communicator: every rank of a "world" is driven by its own
/// thread and messages travel through a shared mailbox.
#[derive(Clone, Debug)]
pub struct ThreadComm {
    rank: usize,
    size: usize,
    mailbox: Arc<Mailbox>,
}

impl ThreadComm {
    /// Create the `size` communicators of a fresh world.
    pub fn world(size: usize) -> Vec<ThreadComm> {
        let mailbox = Arc::new(Mailbox::default());
        (0..size)
            .map(|rank| ThreadComm {
                rank,
                size,
                mailbox: Arc::clone(&mailbox),
            })
            .collect()
    }

    fn check_peer(&self, peer: usize) -> Result<(), CommError> {
        if peer < self.size {
            Ok(())
        } else {
            Err(CommError::InvalidRank {
                peer,
                size: self.size,
            })
        }
    }
}

pub struct LocalHandle {
    mailbox: Arc<Mailbox>,
    key: Key,
    len: usize,
}

impl Wait for LocalHandle {
    fn wait(self) -> Result<Option<Vec<u8>>, CommError> {
        loop {
            let popped = self
                .mailbox
                .slots
                .get_mut(&self.key)
                .and_then(|mut queue| queue.pop_front());
            if let Some(bytes) = popped {
                if bytes.len() != self.len {
                    return Err(CommError::SizeMismatch {
                        peer: self.key.0,
                        expected: self.len,
                        found: bytes.len(),
                    });
                }
                return Ok(Some(bytes.to_vec()));
            }
            std::thread::yield_now();
        }
    }
}

impl Communicator for ThreadComm {
    type SendHandle = ();
    type RecvHandle<'a> = LocalHandle;

    fn rank(&self) -> usize {
        self.rank
    }
    fn size(&self) -> usize {
        self.size
    }

    fn isend(&self, peer: usize, tag: u16, buf: &[u8]) -> Result<(), CommError> {
        self.check_peer(peer)?;
        self.mailbox
            .slots
            .entry((self.rank, peer, tag))
            .or_default()
            .push_back(Bytes::copy_from_slice(buf));
        Ok(())
    }

    fn irecv(&self, peer: usize, tag: u16, len: usize) -> Result<LocalHandle, CommError> {
        self.check_peer(peer)?;
        Ok(LocalHandle {
            mailbox: Arc::clone(&self.mailbox),
            key: (peer, self.rank, tag),
            len,
        })
    }
}

// --- MPI backend (feature = "mpi-support") ---
#[cfg(feature = "mpi-support")]
mod mpi_backend {
    use super::*;
    use mpi::environment::Universe;
    use mpi::request::{Request, StaticScope};
    use mpi::topology::SimpleCommunicator;
    use mpi::traits::*;

    pub struct MpiComm {
        _universe: Arc<Universe>,
        pub world: SimpleCommunicator,
        pub rank: usize,
    }

    impl MpiComm {
        pub fn new() -> Result<Self, CommError> {
            let universe = mpi::initialize()
                .ok_or_else(|| CommError::Backend("MPI already initialised".into()))?;
            let world = universe.world();
            let rank = world.rank() as usize;
            Ok(Self {
                _universe: Arc::new(universe),
                world,
                rank,
            })
        }
    }

    /// In-flight send; owns its buffer until the request completes.
    pub struct MpiSendHandle {
        req: Request<'static, [u8], StaticScope>,
        buf: *mut [u8],
    }

    impl Wait for MpiSendHandle {
        fn wait(self) -> Result<Option<Vec<u8>>, CommError> {
            self.req.wait();
            // SAFETY: `buf` came from `Box::leak` in `isend` and the request
            // using it has completed.
            drop(unsafe { Box::from_raw(self.buf) });
            Ok(None)
        }
    }

    /// Deferred receive, matched when waited on.
    pub struct MpiRecvHandle<'a> {
        world: &'a SimpleCommunicator,
        peer: usize,
        tag: u16,
        len: usize,
    }

    impl Wait for MpiRecvHandle<'_> {
        fn wait(self) -> Result<Option<Vec<u8>>, CommError> {
            let (data, _status) = self
                .world
                .process_at_rank(self.peer as i32)
                .receive_vec_with_tag::<u8>(self.tag as i32);
            if data.len() != self.len {
                return Err(CommError::SizeMismatch {
                    peer: self.peer,
                    expected: self.len,
                    found: data.len(),
                });
            }
            Ok(Some(data))
        }
    }

    impl Communicator for MpiComm {
        type SendHandle = MpiSendHandle;
        type RecvHandle<'a> = MpiRecvHandle<'a>;

        fn rank(&self) -> usize {
            self.rank
        }
        fn size(&self) -> usize {
            self.world.size() as usize
        }

        fn isend(&self, peer: usize, tag: u16, buf: &[u8]) -> Result<MpiSendHandle, CommError> {
            let owned: &'static mut [u8] = Box::leak(buf.to_vec().into_boxed_slice());
            let ptr: *mut [u8] = owned;
            // SAFETY: the leaked buffer outlives the request; it is reclaimed in `wait`.
            let data: &'static [u8] = unsafe { &*ptr };
            let req = self
                .world
                .process_at_rank(peer as i32)
                .immediate_send_with_tag(StaticScope, data, tag as i32);
            Ok(MpiSendHandle { req, buf: ptr })
        }

        fn irecv(&self, peer: usize, tag: u16, len: usize) -> Result<MpiRecvHandle<'_>, CommError> {
            Ok(MpiRecvHandle {
                world: &self.world,
                peer,
                tag,
                len,
            })
        }

        fn allgather(&self, send: &[u8], recv: &mut [u8]) -> Result<(), CommError> {
            self.world.all_gather_into(send, recv);
            Ok(())
        }
    }
}

#[cfg(feature = "mpi-support")]
pub use mpi_backend::MpiComm;
