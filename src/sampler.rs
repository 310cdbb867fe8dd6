//! Sampler loop (§4.4): per-iteration pixel selection, local-plus-remote
//! neighbour sum, and Metropolis acceptance, interleaved with servicing
//! incoming questions.

use rand::rngs::StdRng;
use rand::Rng;

use crate::boundary::BoundaryEngine;
use crate::direction::Direction;
use crate::error::Result;
use crate::tile::Tile;
use crate::transport::Transport;

/// Runs the sampler for `iterations` proposals against `tile`, servicing
/// `boundary` while waiting on any outstanding queries.
pub struct Sampler {
    beta: f64,
    gamma: f64,
    rng: StdRng,
}

impl Sampler {
    pub fn new(beta: f64, gamma: f64, rng: StdRng) -> Self {
        Sampler { beta, gamma, rng }
    }

    /// Runs one Metropolis–Hastings proposal (§4.4, steps 1-7). Returns
    /// `true` if the proposed flip was accepted.
    pub fn step<T: Transport>(&mut self, tile: &mut Tile, boundary: &mut BoundaryEngine<T>) -> Result<bool> {
        let rows = tile.rows();
        let cols = tile.cols();

        let r = self.rng.random_range(0..rows);
        let c = self.rng.random_range(0..cols);

        let local_sum = tile.window_sum(r as isize, c as isize);

        self.ask_boundary_queries(boundary, rows, cols, r, c);

        while !boundary.all_outstanding_complete() {
            boundary.service_once(tile)?;
        }
        let remote_sum = boundary.collect_answers()?;

        let sum = local_sum + remote_sum;

        let observed = tile.observed()[(r, c)] as f64;
        let current = tile.current()[(r, c)] as f64;
        let delta_e = -2.0 * self.gamma * observed * current - 2.0 * self.beta * current * sum as f64;

        let u: f64 = 1.0 - self.rng.random::<f64>();
        let accept = u.ln() <= delta_e;
        if accept {
            tile.flip(r, c);
        }
        Ok(accept)
    }

    /// Runs `iterations` proposals, servicing the boundary engine between
    /// each one (the per-iteration servicing is part of `step` itself; this
    /// is just the outer loop).
    pub fn run<T: Transport>(
        &mut self,
        tile: &mut Tile,
        boundary: &mut BoundaryEngine<T>,
        iterations: usize,
    ) -> Result<usize> {
        let mut accepted = 0;
        for _ in 0..iterations {
            if self.step(tile, boundary)? {
                accepted += 1;
            }
        }
        Ok(accepted)
    }

    fn ask_boundary_queries<T: Transport>(
        &self,
        boundary: &mut BoundaryEngine<T>,
        rows: usize,
        cols: usize,
        r: usize,
        c: usize,
    ) {
        if r == 0 {
            boundary.ask(Direction::Top, c as i32);
            if c == 0 {
                boundary.ask(Direction::TopLeft, 0);
            }
            if c == cols - 1 {
                boundary.ask(Direction::TopRight, 0);
            }
        }
        if r == rows - 1 {
            boundary.ask(Direction::Bottom, c as i32);
            if c == 0 {
                boundary.ask(Direction::BottomLeft, 0);
            }
            if c == cols - 1 {
                boundary.ask(Direction::BottomRight, 0);
            }
        }
        if c == 0 {
            boundary.ask(Direction::Left, r as i32);
        }
        if c == cols - 1 {
            boundary.ask(Direction::Right, r as i32);
        }
    }
}

/// gamma = ln((1 - pi) / pi) / 2, the log-odds weight derived from the
/// per-pixel noise probability (§6 Derived parameters).
pub fn gamma_from_pi(pi: f64) -> f64 {
    ((1.0 - pi) / pi).ln() / 2.0
}
