use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use std::pin::Pin;

pub trait DataType: Serialize + DeserializeOwned + Default + Clone {}

impl<T> DataType for T where T: Serialize + DeserializeOwned + Default + Clone {}

/// Future returned by the point-to-point operations of a group.
pub type CommFuture<T> = Pin<Box<dyn Future<Output = Result<T, CommError>>>>;

/// Rank that receives reductions and gathers and owns all program output.
pub const COORDINATOR: u32 = 0;

/// Exit code used when a worker detects an unrecoverable local failure.
pub const ABORT_CODE: i32 = -1;

pub trait CommGroup {
    /// Get the rank of the process in the group.
    fn rank(&self) -> u32;
    /// Get the size of this communication group.
    fn size(&self) -> u32;
    /// Send data to a destination process.
    fn send<T: Serialize + ?Sized>(&self, data: &T, dest: u32, tag: u32) -> CommFuture<()>;
    /// Receive some data from a source process.
    fn recv<T: DataType>(&self, source: u32, tag: u32) -> CommFuture<T>;
    /// Terminate every worker of the group.
    ///
    /// Workers blocked in (or later entering) a receive observe
    /// `CommError::Aborted`. The returned error is the one this worker
    /// should propagate.
    fn abort(&self, code: i32) -> CommError;
    /// Whether this process is the group's coordinator (rank 0).
    fn is_coordinator(&self) -> bool {
        self.rank() == COORDINATOR
    }
}

mod collective;
mod error;
mod local;
#[cfg(feature = "mpi")]
mod mpi;
mod wire;

pub use collective::{barrier, gather_to, reduce_sum, scatter_from};
pub use error::CommError;
pub use local::{run_local, LocalGroup};
#[cfg(feature = "mpi")]
pub use mpi::{init_standard_mpi, MPICommGroup};
