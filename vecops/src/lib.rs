//! Block-distributed vector operations over a worker group, plus the
//! serial vector addition they are measured against.
//!
//! The parallel driver runs unchanged on any `async_comm::CommGroup`:
//! threads in one process with `run_local`, or MPI ranks with the `mpi`
//! feature.

mod config;
mod error;
pub mod parallel;
pub mod serial;
pub mod vector;

pub use config::{
    RunConfig, SerialConfig, DEFAULT_PARALLEL_ORDER, DEFAULT_SCALAR, DEFAULT_SERIAL_ORDER,
};
pub use error::VecError;
pub use parallel::{first_failure, run_worker, Report};
pub use serial::run_serial;
pub use vector::LocalVectors;
