//! In-process fabric: a collection of tagged mailboxes that stands in for
//! the wire transport (§4.1, implementation note). Every logical rank
//! (coordinator or worker) gets a cheap [`Fabric`] handle that shares the
//! same mailbox registry; mailboxes are created lazily, keyed by
//! `(src, dest, tag)`, which gives FIFO-per-`(source, tag)` delivery for
//! free since each triple owns its own queue.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use super::{ready_send_handle, recv_handle, Payload, RecvHandle, SendHandle, Slot, Tag, Transport};
use crate::direction::Rank;

struct Mailbox {
    /// Payloads sent but not yet claimed by a matching receive.
    queue: Mutex<VecDeque<Payload>>,
    /// Receive slots registered before a matching payload arrived.
    waiters: Mutex<VecDeque<Slot>>,
}

impl Mailbox {
    fn new() -> Self {
        Mailbox {
            queue: Mutex::new(VecDeque::new()),
            waiters: Mutex::new(VecDeque::new()),
        }
    }
}

type Registry = Mutex<FxHashMap<(Rank, Rank, Tag), Arc<Mailbox>>>;

/// Owns the mailbox registry shared by every rank in a run.
pub struct Network {
    registry: Arc<Registry>,
}

impl Network {
    pub fn new() -> Self {
        Network {
            registry: Arc::new(Mutex::new(FxHashMap::default())),
        }
    }

    /// Returns a fabric handle scoped to `rank`, sharing this network's
    /// mailboxes.
    pub fn handle(&self, rank: Rank) -> Fabric {
        Fabric {
            rank,
            registry: self.registry.clone(),
        }
    }
}

impl Default for Network {
    fn default() -> Self {
        Self::new()
    }
}

/// A rank-scoped view over a [`Network`]; this is what the rest of the
/// codebase programs against via the [`Transport`] trait.
#[derive(Clone)]
pub struct Fabric {
    rank: Rank,
    registry: Arc<Registry>,
}

impl Fabric {
    pub fn rank(&self) -> Rank {
        self.rank
    }

    fn mailbox(&self, src: Rank, dest: Rank, tag: Tag) -> Arc<Mailbox> {
        self.registry
            .lock()
            .entry((src, dest, tag))
            .or_insert_with(|| Arc::new(Mailbox::new()))
            .clone()
    }

    fn deliver(&self, dest: Rank, tag: Tag, payload: Payload) {
        let mailbox = self.mailbox(self.rank, dest, tag);
        let waiting = mailbox.waiters.lock().pop_front();
        match waiting {
            Some(slot) => slot.fulfill(payload),
            None => mailbox.queue.lock().push_back(payload),
        }
    }
}

impl Transport for Fabric {
    fn send(&self, dest: Rank, tag: Tag, payload: Payload) {
        self.deliver(dest, tag, payload);
    }

    fn post_send(&self, dest: Rank, tag: Tag, payload: Payload) -> SendHandle {
        self.deliver(dest, tag, payload);
        ready_send_handle()
    }

    fn post_recv(&self, src: Rank, tag: Tag) -> RecvHandle {
        let mailbox = self.mailbox(src, self.rank, tag);
        let queued = mailbox.queue.lock().pop_front();
        match queued {
            Some(payload) => recv_handle(Slot::ready(payload)),
            None => {
                let slot = Slot::empty();
                mailbox.waiters.lock().push_back(slot.clone());
                recv_handle(slot)
            }
        }
    }
}
