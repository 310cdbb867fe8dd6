use std::path::Path;
use std::process::ExitCode;
use std::thread;

use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use structopt::StructOpt;
use tracing_subscriber::EnvFilter;

use ising_denoiser::cli::Args;
use ising_denoiser::direction::COORDINATOR;
use ising_denoiser::error::DenoiserError;
use ising_denoiser::sampler::gamma_from_pi;
use ising_denoiser::transport::fabric::Network;
use ising_denoiser::{coordinator, image_io, worker};

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    match run(Args::from_args()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            match err.downcast_ref::<DenoiserError>() {
                Some(DenoiserError::Transport(_)) => ExitCode::from(2),
                _ => ExitCode::from(1),
            }
        }
    }
}

fn run(args: Args) -> Result<()> {
    if !(args.pi > 0.0 && args.pi < 1.0) {
        return Err(DenoiserError::Config(format!("pi must lie in (0, 1), got {}", args.pi)).into());
    }

    let grid = args.grid_shape()?;
    let worker_count = grid.rows * grid.cols;
    let gamma = gamma_from_pi(args.pi);
    let iterations_per_worker = (args.iterations / worker_count as u64) as usize;

    let image = image_io::read_image(Path::new(&args.input)).context("reading input image")?;

    let net = Network::new();
    let coordinator_fabric = net.handle(COORDINATOR);

    let assembled = thread::scope(|scope| -> Result<_> {
        let mut handles = Vec::with_capacity(worker_count);
        for gr in 0..grid.rows {
            for gc in 0..grid.cols {
                let rank = coordinator::worker_rank(gr, gc, grid.cols);
                let fabric = net.handle(rank);
                let seed = args.seed ^ rank as u64;
                let beta = args.beta;
                handles.push(scope.spawn(move || {
                    worker::run(&fabric, rank, beta, gamma, iterations_per_worker, StdRng::seed_from_u64(seed))
                }));
            }
        }

        coordinator::dispatch(&coordinator_fabric, &image, grid).context("dispatching tiles")?;
        let assembled = coordinator::collect(&coordinator_fabric, image.rows, image.cols, grid)
            .context("collecting tiles")?;

        for handle in handles {
            handle.join().expect("worker thread panicked").context("worker failed")?;
        }

        Ok(assembled)
    })?;

    image_io::write_image(Path::new(&args.output), &assembled).context("writing output image")?;
    Ok(())
}
