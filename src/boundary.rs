//! Boundary query engine (§4.3) — the heart of the system. Manages, per
//! neighbour, the three concurrent conversations described in the spec:
//! outgoing questions, standing question-receptors, and outgoing answers.

use crate::direction::Direction;
use crate::error::{DenoiserError, Result};
use crate::tile::Tile;
use crate::transport::{Payload, RecvHandle, SendHandle, Tag, Transport};

/// A question we sent a neighbour, awaiting its answer (§3 "pending
/// boundary request").
struct PendingQuestion {
    send: SendHandle,
    recv: RecvHandle,
}

/// A standing receive for an incoming question, plus the reply we last
/// sent in response to one (§3 "standing answer slot").
struct StandingReceptor {
    recv: RecvHandle,
    reply_in_flight: Option<SendHandle>,
}

/// The virtual (possibly off-tile) pixel center a neighbour's question is
/// asking about, per the table in §4.3.
fn virtual_center(direction: Direction, position: i32, rows: usize, cols: usize) -> (isize, isize) {
    let rows = rows as isize;
    let cols = cols as isize;
    let position = position as isize;
    match direction {
        Direction::Top => (-1, position),
        Direction::Bottom => (rows, position),
        Direction::Left => (position, -1),
        Direction::Right => (position, cols),
        Direction::TopLeft => (-1, -1),
        Direction::TopRight => (-1, cols),
        Direction::BottomLeft => (rows, -1),
        Direction::BottomRight => (rows, cols),
    }
}

/// Runs the three-way ask/answer/service protocol against one tile's
/// neighbours.
pub struct BoundaryEngine<'a, T: Transport> {
    transport: &'a T,
    neighbours: crate::tile::NeighbourTable,
    rows: usize,
    cols: usize,
    receptors: [Option<StandingReceptor>; 8],
    outstanding: Vec<(Direction, PendingQuestion)>,
}

impl<'a, T: Transport> BoundaryEngine<'a, T> {
    /// Posts the standing question-receptors for every existing neighbour
    /// (§4.3(b)) and returns the ready-to-use engine.
    pub fn new(transport: &'a T, neighbours: crate::tile::NeighbourTable, rows: usize, cols: usize) -> Self {
        let mut receptors: [Option<StandingReceptor>; 8] = Default::default();
        for (direction, dest) in neighbours.existing() {
            let recv = transport.post_recv(dest, Tag::Question);
            receptors[direction.index()] = Some(StandingReceptor {
                recv,
                reply_in_flight: None,
            });
        }
        BoundaryEngine {
            transport,
            neighbours,
            rows,
            cols,
            receptors,
            outstanding: Vec::new(),
        }
    }

    /// §4.3(a). No-op if `direction` has no neighbour.
    pub fn ask(&mut self, direction: Direction, position: i32) {
        let Some(dest) = self.neighbours.get(direction) else {
            return;
        };
        let send = self.transport.post_send(dest, Tag::Question, Payload::Int(position));
        let recv = self.transport.post_recv(dest, Tag::Answer);
        self.outstanding.push((direction, PendingQuestion { send, recv }));
    }

    /// True iff every outgoing question asked since the last
    /// [`BoundaryEngine::collect_answers`] has been answered.
    pub fn all_outstanding_complete(&self) -> bool {
        self.outstanding
            .iter()
            .all(|(_, pq)| pq.send.test() && pq.recv.test())
    }

    /// §4.3(c): probes every standing receptor once, answering any that
    /// have a question waiting. Never blocks.
    pub fn service_once(&mut self, tile: &Tile) -> Result<()> {
        for direction in Direction::ALL {
            let Some(dest) = self.neighbours.get(direction) else {
                continue;
            };
            let receptor = self.receptors[direction.index()]
                .as_mut()
                .expect("standing receptor exists for every real neighbour");

            if !receptor.recv.test() {
                continue;
            }

            // (i) repost a fresh receptor before consuming this one, so the
            // next question is already awaited.
            let fresh = self.transport.post_recv(dest, Tag::Question);
            let completed = std::mem::replace(&mut receptor.recv, fresh);
            let position = completed.wait().into_int()?;

            // (ii) reclaim the previous reply handle, if still in flight.
            if let Some(previous_reply) = receptor.reply_in_flight.take() {
                previous_reply.wait();
            }

            // (iii) compute this tile's contribution to the neighbour's
            // virtual boundary pixel.
            let (center_row, center_col) = virtual_center(direction, position, self.rows, self.cols);
            let sum = tile.window_sum(center_row, center_col);

            // (iv) answer.
            let reply = self.transport.post_send(dest, Tag::Answer, Payload::Int(sum));
            receptor.reply_in_flight = Some(reply);
        }
        Ok(())
    }

    /// §4.3 completion draining: sums the answers to every outstanding
    /// question, frees the handles, and resets the outgoing-query count to
    /// zero. Callers must have already established
    /// [`BoundaryEngine::all_outstanding_complete`].
    pub fn collect_answers(&mut self) -> Result<i32> {
        let mut sum = 0_i32;
        for (direction, pending) in self.outstanding.drain(..) {
            pending.send.wait();
            let answer = pending.recv.wait().into_int().map_err(|e| {
                DenoiserError::Transport(format!("answer from direction {direction:?}: {e}"))
            })?;
            sum += answer;
        }
        Ok(sum)
    }

    /// Waits out every neighbour's standing receptor and any in-flight
    /// reply, used when a worker is finally shutting down (§4.5 frees
    /// resources after the FINISHED handshake completes).
    pub fn drain(mut self) {
        for slot in self.receptors.iter_mut() {
            if let Some(receptor) = slot.take() {
                if let Some(reply) = receptor.reply_in_flight {
                    reply.wait();
                }
                // The final standing receptor is intentionally left
                // unconsumed: nothing will ever answer it once every
                // neighbour has also finished.
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile::NeighbourTable;
    use crate::transport::fabric::Network;

    fn linked(rank_a: i32, rank_b: i32) -> (crate::transport::fabric::Fabric, crate::transport::fabric::Fabric) {
        let net = Network::new();
        (net.handle(rank_a), net.handle(rank_b))
    }

    #[test]
    fn ask_and_collect_round_trip() {
        let (worker, neighbour) = linked(1, 2);

        let mut neighbours = NeighbourTable::new();
        neighbours.set(Direction::Right, Some(2));
        let mut engine = BoundaryEngine::new(&worker, neighbours, 2, 2);

        engine.ask(Direction::Right, 0);
        assert!(!engine.all_outstanding_complete());

        // the neighbour side: receive the question, answer with a fixed sum.
        let question = neighbour.post_recv(1, Tag::Question).wait();
        assert_eq!(0, question.into_int().unwrap());
        neighbour.post_send(1, Tag::Answer, Payload::Int(5));

        assert!(engine.all_outstanding_complete());
        assert_eq!(5, engine.collect_answers().unwrap());
        assert!(engine.outstanding.is_empty());
    }

    #[test]
    fn service_once_answers_and_reposts() {
        let (worker, neighbour) = linked(1, 2);

        let mut neighbours = NeighbourTable::new();
        neighbours.set(Direction::Top, Some(2));
        let mut engine = BoundaryEngine::new(&worker, neighbours, 3, 3);

        let tile = Tile::new(3, 3, crate::matrix::Matrix::new_default(3, 3, 1), NeighbourTable::new());

        // neighbour asks about column 1, as if probing our top edge.
        neighbour.post_send(2, Tag::Question, Payload::Int(1));
        engine.service_once(&tile).unwrap();

        let answer = neighbour.post_recv(1, Tag::Answer).wait().into_int().unwrap();
        // virtual center for Top is (-1, 1); in-bounds neighbours are
        // (0,0), (0,1), (0,2) => sum of three +1 pixels.
        assert_eq!(3, answer);

        // a second question on the same standing receptor must also be
        // served, proving the repost happened.
        neighbour.post_send(2, Tag::Question, Payload::Int(0));
        engine.service_once(&tile).unwrap();
        let answer2 = neighbour.post_recv(1, Tag::Answer).wait().into_int().unwrap();
        assert_eq!(2, answer2);
    }
}
