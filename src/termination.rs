//! Termination coordinator (§4.5): the per-neighbour "I am done" handshake
//! that keeps a worker serving answers until every neighbour is also done,
//! then ships the final tile back to the coordinator.

use crate::boundary::BoundaryEngine;
use crate::direction::COORDINATOR;
use crate::error::Result;
use crate::tile::Tile;
use crate::transport::{test_all, Payload, RecvHandle, SendHandle, Tag, Transport};

/// Runs the FINISHED handshake against every existing neighbour, servicing
/// `boundary` while waiting, then sends the final tile rows back to the
/// coordinator.
pub fn finish<T: Transport>(transport: &T, tile: &Tile, boundary: &mut BoundaryEngine<T>) -> Result<()> {
    let mut sends: Vec<SendHandle> = Vec::new();
    let mut recvs: Vec<RecvHandle> = Vec::new();

    for (_direction, dest) in tile.neighbours().existing() {
        sends.push(transport.post_send(dest, Tag::Finished, Payload::Empty));
        recvs.push(transport.post_recv(dest, Tag::Finished));
    }

    while !(test_all(&sends) && test_all(&recvs)) {
        boundary.service_once(tile)?;
    }
    for recv in recvs {
        recv.wait();
    }
    for send in sends {
        send.wait();
    }

    send_final_tile(transport, tile)
}

fn send_final_tile<T: Transport>(transport: &T, tile: &Tile) -> Result<()> {
    for r in 0..tile.rows() {
        let row: Vec<i8> = tile.current().row(r).to_vec();
        transport.send(COORDINATOR, Tag::FinalImageRow(r), Payload::Row(row));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::direction::Direction;
    use crate::matrix::Matrix;
    use crate::tile::NeighbourTable;
    use crate::transport::fabric::Network;

    #[test]
    fn handshake_completes_both_sides_and_ships_final_rows() {
        let net = Network::new();
        let worker = net.handle(1);
        let neighbour = net.handle(2);
        let coordinator = net.handle(COORDINATOR);

        let mut neighbours = NeighbourTable::new();
        neighbours.set(Direction::Right, Some(2));
        let tile = Tile::new(2, 2, Matrix::new_default(2, 2, 1), neighbours);
        let mut boundary = BoundaryEngine::new(&worker, neighbours, 2, 2);

        // Simulate the neighbour completing its own handshake concurrently.
        neighbour.post_send(1, Tag::Finished, Payload::Empty);
        let neighbour_recv = neighbour.post_recv(1, Tag::Finished);

        finish(&worker, &tile, &mut boundary).unwrap();
        assert!(neighbour_recv.test());

        for r in 0..2 {
            let row = coordinator
                .post_recv(1, Tag::FinalImageRow(r))
                .wait()
                .into_row()
                .unwrap();
            assert_eq!(vec![1, 1], row);
        }
    }
}
