//! Serial vector addition.
//!
//! By default generates two random vectors of the given order. With
//! `--interactive` the order and both vectors are read from stdin.
use clap::Parser;
use std::io;
use std::process;
use vecops::{run_serial, SerialConfig, DEFAULT_SERIAL_ORDER};

#[derive(Parser, Debug)]
#[command(about = "Add two vectors on a single process")]
struct Args {
    /// Order of the vectors
    #[arg(short, long, default_value_t = DEFAULT_SERIAL_ORDER)]
    order: usize,
    /// Read the order and the vectors from stdin
    #[arg(short, long)]
    interactive: bool,
}

fn run(args: &Args) -> anyhow::Result<()> {
    let config = SerialConfig {
        order: args.order,
        interactive: args.interactive,
    };
    let stdin = io::stdin();
    let mut stdout = io::stdout().lock();
    run_serial(&config, stdin.lock(), &mut stdout)?;
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
