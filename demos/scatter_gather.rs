//! Scatter a vector from rank 0, scale each block locally and gather the
//! result back.
use async_comm::{gather_to, scatter_from, CommError, CommGroup, COORDINATOR};
use clap::Parser;
use futures::executor;
use std::process;

#[derive(Parser, Debug)]
struct Args {
    /// Elements handed to each worker
    #[arg(short, long, default_value_t = 8)]
    block: usize,
    /// Number of local worker threads (ignored under MPI)
    #[arg(short, long, default_value_t = 4)]
    workers: u32,
}

async fn scatter_scale_gather<G: CommGroup>(cg: &G, block: usize) -> Result<(), CommError> {
    let buffer: Vec<f64> = if cg.is_coordinator() {
        (0..cg.size() as usize * block).map(|i| i as f64).collect()
    } else {
        Vec::new()
    };
    let mut data = scatter_from(cg, COORDINATOR, &buffer).await?;
    for elm in &mut data {
        *elm *= 4.0;
    }
    if let Some(result) = gather_to(cg, COORDINATOR, &data).await? {
        println!("Gather result of {:?}", result);
    }
    Ok(())
}

#[cfg(not(feature = "mpi"))]
fn run(args: &Args) -> anyhow::Result<()> {
    let results = async_comm::run_local(args.workers, |cg| {
        executor::block_on(scatter_scale_gather(cg, args.block))
    })?;
    for result in results {
        result?;
    }
    Ok(())
}

#[cfg(feature = "mpi")]
fn run(args: &Args) -> anyhow::Result<()> {
    let cg = async_comm::init_standard_mpi()?;
    executor::block_on(scatter_scale_gather(&cg, args.block))?;
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
