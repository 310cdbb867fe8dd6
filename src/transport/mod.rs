//! Neighbour transport (§4.1): tagged point-to-point send/receive with
//! non-blocking variants. The abstract `Transport` trait is deliberately
//! narrow so that the in-process `fabric` implementation could later be
//! swapped for a real multi-process transport without touching the
//! protocol layers built on top of it.

pub mod fabric;

use parking_lot::{Condvar, Mutex};
use std::sync::Arc;

use crate::direction::{Direction, Rank};
use crate::error::DenoiserError;

/// The small, fixed tag enumeration from §4.1. `ImageRow`/`FinalImageRow`
/// carry the row index the same way the source's `IMAGE_ROW+i` tag offset
/// does, just expressed as an enum payload instead of integer arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    Rows,
    Columns,
    Direction(Direction),
    Question,
    Answer,
    Finished,
    ImageRow(usize),
    FinalImageRow(usize),
}

/// The in-memory stand-in for a wire payload (§6).
#[derive(Debug, Clone)]
pub enum Payload {
    Int(i32),
    Row(Vec<i8>),
    Empty,
}

impl Payload {
    pub fn into_int(self) -> Result<i32, DenoiserError> {
        match self {
            Payload::Int(v) => Ok(v),
            other => Err(DenoiserError::Transport(format!(
                "expected an Int payload, got {other:?}"
            ))),
        }
    }

    pub fn into_row(self) -> Result<Vec<i8>, DenoiserError> {
        match self {
            Payload::Row(v) => Ok(v),
            other => Err(DenoiserError::Transport(format!(
                "expected a Row payload, got {other:?}"
            ))),
        }
    }
}

/// A single-use completion cell shared between a handle and whoever
/// eventually fulfils it. Kept separate from the public handle types so
/// both send and receive handles can share one completion mechanism.
#[derive(Clone)]
pub(crate) struct Slot(Arc<(Mutex<Option<Payload>>, Condvar)>);

impl Slot {
    pub(crate) fn empty() -> Self {
        Slot(Arc::new((Mutex::new(None), Condvar::new())))
    }

    pub(crate) fn ready(payload: Payload) -> Self {
        Slot(Arc::new((Mutex::new(Some(payload)), Condvar::new())))
    }

    pub(crate) fn fulfill(&self, payload: Payload) {
        let (lock, cvar) = &*self.0;
        let mut guard = lock.lock();
        *guard = Some(payload);
        cvar.notify_all();
    }

    fn test(&self) -> bool {
        self.0 .0.lock().is_some()
    }

    fn wait(&self) -> Payload {
        let (lock, cvar) = &*self.0;
        let mut guard = lock.lock();
        while guard.is_none() {
            cvar.wait(&mut guard);
        }
        guard.take().expect("slot was signalled as ready")
    }
}

/// Something that can be probed for completion without consuming it, the
/// way `test`/`test_all` do in §4.1.
pub trait Completable {
    fn is_complete(&self) -> bool;
}

/// True iff every handle in `handles` is complete.
pub fn test_all<T: Completable>(handles: &[T]) -> bool {
    handles.iter().all(Completable::is_complete)
}

/// Handle to a non-blocking receive (`post_recv`).
pub struct RecvHandle {
    slot: Slot,
}

impl RecvHandle {
    /// Non-destructive completion probe.
    pub fn test(&self) -> bool {
        self.slot.test()
    }

    /// Blocks until complete, consuming the handle.
    pub fn wait(self) -> Payload {
        self.slot.wait()
    }
}

impl Completable for RecvHandle {
    fn is_complete(&self) -> bool {
        self.test()
    }
}

/// Handle to a non-blocking send (`post_send`). The in-process fabric
/// delivers eagerly, so these are born complete, but the type is kept
/// distinct from `RecvHandle` to mirror the two-sided protocol in §4.1.
pub struct SendHandle {
    slot: Slot,
}

impl SendHandle {
    pub fn test(&self) -> bool {
        self.slot.test()
    }

    pub fn wait(self) {
        let _ = self.slot.wait();
    }
}

impl Completable for SendHandle {
    fn is_complete(&self) -> bool {
        self.test()
    }
}

pub(crate) fn ready_send_handle() -> SendHandle {
    SendHandle {
        slot: Slot::ready(Payload::Empty),
    }
}

pub(crate) fn recv_handle(slot: Slot) -> RecvHandle {
    RecvHandle { slot }
}

/// Tagged point-to-point transport, as specified in §4.1.
pub trait Transport {
    /// Blocking send of a small fixed-size payload.
    fn send(&self, dest: Rank, tag: Tag, payload: Payload);
    /// Non-blocking receive; completes when a matching message arrives.
    fn post_recv(&self, src: Rank, tag: Tag) -> RecvHandle;
    /// Non-blocking send.
    fn post_send(&self, dest: Rank, tag: Tag, payload: Payload) -> SendHandle;
}
