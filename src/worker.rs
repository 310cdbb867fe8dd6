//! Worker runtime: receives a tile's dimensions, neighbour table and pixels
//! from the coordinator, runs the sampler, then runs the termination
//! handshake (§4.4, §4.5).

use rand::rngs::StdRng;
use tracing::{debug, info};

use crate::boundary::BoundaryEngine;
use crate::direction::{Direction, Rank, COORDINATOR};
use crate::error::Result;
use crate::matrix::Matrix;
use crate::sampler::Sampler;
use crate::termination;
use crate::tile::{NeighbourTable, Tile};
use crate::transport::{Tag, Transport};

/// Runs one worker to completion: receive tile, sample, terminate.
pub fn run<T: Transport>(
    transport: &T,
    rank: Rank,
    beta: f64,
    gamma: f64,
    iterations: usize,
    rng: StdRng,
) -> Result<()> {
    info!(rank, "worker starting");

    let mut tile = receive_tile(transport)?;
    let mut boundary = BoundaryEngine::new(transport, *tile.neighbours(), tile.rows(), tile.cols());
    let mut sampler = Sampler::new(beta, gamma, rng);

    let accepted = sampler.run(&mut tile, &mut boundary, iterations)?;
    debug!(rank, iterations, accepted, "sampling complete");

    termination::finish(transport, &tile, &mut boundary)?;
    boundary.drain();

    info!(rank, "worker finished");
    Ok(())
}

fn receive_tile<T: Transport>(transport: &T) -> Result<Tile> {
    let rows = transport.post_recv(COORDINATOR, Tag::Rows).wait().into_int()? as usize;
    let cols = transport.post_recv(COORDINATOR, Tag::Columns).wait().into_int()? as usize;

    let mut neighbours = NeighbourTable::new();
    for d in Direction::ALL {
        let value = transport
            .post_recv(COORDINATOR, Tag::Direction(d))
            .wait()
            .into_int()?;
        neighbours.set(d, NeighbourTable::from_wire(d, value));
    }

    let mut observed = Matrix::new_default(rows, cols, 0_i8);
    for i in 0..rows {
        let row = transport
            .post_recv(COORDINATOR, Tag::ImageRow(i))
            .wait()
            .into_row()?;
        for (c, value) in row.into_iter().enumerate() {
            observed[(i, c)] = value;
        }
    }

    Ok(Tile::new(rows, cols, observed, neighbours))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator;
    use crate::transport::fabric::Network;
    use rand::SeedableRng;
    use std::thread;

    #[test]
    fn worker_runs_to_completion_against_a_single_neighbour() {
        let net = Network::new();
        let grid = crate::cli::GridShape { rows: 1, cols: 2 };
        let mut image = Matrix::new_default(2, 4, 1_i8);
        image[(0, 2)] = -1;

        let coordinator = net.handle(0);
        coordinator::dispatch(&coordinator, &image, grid).unwrap();

        let fabric_a = net.handle(coordinator::worker_rank(0, 0, 2));
        let fabric_b = net.handle(coordinator::worker_rank(0, 1, 2));

        thread::scope(|s| {
            s.spawn(|| {
                run(
                    &fabric_a,
                    fabric_a.rank(),
                    0.5,
                    0.3,
                    50,
                    StdRng::seed_from_u64(1),
                )
                .unwrap();
            });
            s.spawn(|| {
                run(
                    &fabric_b,
                    fabric_b.rank(),
                    0.5,
                    0.3,
                    50,
                    StdRng::seed_from_u64(2),
                )
                .unwrap();
            });
        });

        let assembled = coordinator::collect(&coordinator, 2, 4, grid).unwrap();
        for r in 0..2 {
            for c in 0..4 {
                let v = assembled[(r, c)];
                assert!(v == 1 || v == -1);
            }
        }
    }
}
