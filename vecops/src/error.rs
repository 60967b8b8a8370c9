use async_comm::CommError;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VecError {
    #[error("Order should be positive")]
    InvalidOrder,
    #[error("order {order} is not evenly divisible by {workers} workers")]
    NotDivisible { order: usize, workers: usize },
    #[error("configured for {configured} workers but the group has {actual}")]
    WorkerCountMismatch { configured: usize, actual: usize },
    #[error("Can't allocate vectors of {len} elements")]
    Allocation { len: usize },
    #[error("vectors have different lengths ({left} and {right})")]
    LengthMismatch { left: usize, right: usize },
    #[error("invalid number {token:?} while reading {what}")]
    Parse { token: String, what: String },
    #[error("unexpected end of input while reading {0}")]
    UnexpectedEof(String),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Comm(#[from] CommError),
}
