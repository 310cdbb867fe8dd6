//! Command-line surface (§6 Invocation surface, expanded with the flags
//! needed to resolve §9's open questions).

use std::str::FromStr;

use structopt::StructOpt;

use crate::error::{DenoiserError, Result};

#[derive(Debug, StructOpt)]
#[structopt(name = "ising-denoiser", about = "Distributed binary-image denoiser")]
pub struct Args {
    /// Path to the noisy input image.
    pub input: String,

    /// Path the denoised image is written to.
    pub output: String,

    /// Neighbour-coupling strength.
    pub beta: f64,

    /// Per-pixel noise probability, in (0, 1).
    pub pi: f64,

    /// Number of worker ranks to run. Defaults to the number of logical CPUs.
    #[structopt(short, long)]
    pub workers: Option<usize>,

    /// Explicit worker grid shape, e.g. "2x3". Defaults to a near-square factoring of `workers`.
    #[structopt(short, long)]
    pub grid: Option<GridShape>,

    /// Total proposal budget across all workers.
    #[structopt(short = "T", long, default_value = "5000000")]
    pub iterations: u64,

    /// Base RNG seed.
    #[structopt(short, long, default_value = "1627845975")]
    pub seed: u64,
}

impl Args {
    pub fn worker_count(&self) -> usize {
        self.workers.unwrap_or_else(num_cpus::get)
    }

    pub fn grid_shape(&self) -> Result<GridShape> {
        match self.grid {
            Some(shape) => {
                if shape.rows * shape.cols != self.worker_count() {
                    return Err(DenoiserError::Config(format!(
                        "grid {}x{} does not hold {} workers",
                        shape.rows,
                        shape.cols,
                        self.worker_count()
                    )));
                }
                Ok(shape)
            }
            None => Ok(GridShape::near_square(self.worker_count())),
        }
    }
}

/// A worker grid's shape (§3.1). `rows * cols` must equal the worker count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridShape {
    pub rows: usize,
    pub cols: usize,
}

impl GridShape {
    /// The smallest `rows` with `rows * cols == n` and `rows >= sqrt(n)`
    /// (§6 CLI expansion).
    pub fn near_square(n: usize) -> Self {
        let mut rows = (n as f64).sqrt().ceil() as usize;
        if rows == 0 {
            rows = 1;
        }
        while rows <= n && n % rows != 0 {
            rows += 1;
        }
        GridShape { rows, cols: n / rows }
    }
}

impl FromStr for GridShape {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (rows, cols) = s
            .split_once(['x', 'X'])
            .ok_or_else(|| format!("expected RxC grid shape, got '{s}'"))?;
        let rows: usize = rows.parse().map_err(|_| format!("invalid row count in '{s}'"))?;
        let cols: usize = cols.parse().map_err(|_| format!("invalid column count in '{s}'"))?;
        if rows == 0 || cols == 0 {
            return Err(format!("grid shape '{s}' must have positive dimensions"));
        }
        Ok(GridShape { rows, cols })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn near_square_prefers_balanced_factors() {
        assert_eq!(GridShape { rows: 3, cols: 3 }, GridShape::near_square(9));
        assert_eq!(GridShape { rows: 3, cols: 2 }, GridShape::near_square(6));
    }

    #[test]
    fn near_square_falls_back_to_n_by_one_for_primes() {
        assert_eq!(GridShape { rows: 7, cols: 1 }, GridShape::near_square(7));
    }

    #[test]
    fn parses_rxc_grid_shape() {
        assert_eq!(GridShape { rows: 2, cols: 4 }, "2x4".parse().unwrap());
        assert_eq!(GridShape { rows: 2, cols: 4 }, "2X4".parse().unwrap());
    }

    #[test]
    fn rejects_malformed_grid_shape() {
        assert!("2-4".parse::<GridShape>().is_err());
        assert!("0x4".parse::<GridShape>().is_err());
    }

    #[test]
    fn parses_full_argument_list() {
        let args = Args::from_iter(&[
            "ising-denoiser",
            "in.txt",
            "out.txt",
            "1.0",
            "0.1",
            "--workers",
            "4",
            "--grid",
            "2x2",
            "--iterations",
            "1000",
            "--seed",
            "9",
        ]);
        assert_eq!(4, args.worker_count());
        assert_eq!(GridShape { rows: 2, cols: 2 }, args.grid_shape().unwrap());
        assert_eq!(1000, args.iterations);
        assert_eq!(9, args.seed);
    }
}
