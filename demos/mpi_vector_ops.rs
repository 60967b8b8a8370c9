//! Block-distributed dot product and scalar multiplication.
//!
//! Runs as a group of local threads by default:
//!
//! ```bash
//! cargo run --bin mpi_vector_ops -- --workers 4 --order 20
//! ```
//!
//! or, built with `--features mpi`, one worker per MPI rank:
//!
//! ```bash
//! mpiexec -n 4 ./target/debug/mpi_vector_ops --order 20
//! ```
use clap::Parser;
use futures::executor;
use std::io;
use std::process;
use vecops::{run_worker, RunConfig, DEFAULT_PARALLEL_ORDER, DEFAULT_SCALAR};

#[derive(Parser, Debug)]
#[command(about = "Distributed dot product and scalar multiplication")]
struct Args {
    /// Global order of the vectors, divisible by the number of workers
    #[arg(short, long, default_value_t = DEFAULT_PARALLEL_ORDER)]
    order: usize,
    /// Number of local worker threads (ignored under MPI)
    #[arg(short, long, default_value_t = 4)]
    workers: u32,
    /// Factor both vectors are multiplied by
    #[arg(short, long, default_value_t = DEFAULT_SCALAR)]
    scalar: f64,
}

#[cfg(not(feature = "mpi"))]
fn run(args: &Args) -> anyhow::Result<()> {
    use log::info;

    let config = RunConfig::new(args.order, args.workers as usize).with_scalar(args.scalar);
    info!("running {} local workers", args.workers);
    let results = async_comm::run_local(args.workers, |cg| {
        let mut out = io::stdout();
        executor::block_on(run_worker(cg, &config, &mut out))
    })?;
    vecops::first_failure(results)?;
    Ok(())
}

#[cfg(feature = "mpi")]
fn run(args: &Args) -> anyhow::Result<()> {
    use async_comm::CommGroup;

    let cg = async_comm::init_standard_mpi()?;
    let config = RunConfig::new(args.order, cg.size() as usize).with_scalar(args.scalar);
    let mut out = io::stdout();
    executor::block_on(run_worker(&cg, &config, &mut out))?;
    Ok(())
}

fn main() {
    env_logger::init();
    let args = Args::parse();
    if let Err(e) = run(&args) {
        eprintln!("{e}");
        process::exit(-1);
    }
}
