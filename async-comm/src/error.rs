use thiserror::Error;

#[derive(Debug, Error)]
pub enum CommError {
    #[error("worker group aborted by rank {rank} with code {code}")]
    Aborted { rank: u32, code: i32 },
    #[error("rank {rank} is outside a group of {size} workers")]
    InvalidRank { rank: u32, size: u32 },
    #[error("a worker group needs at least one worker")]
    EmptyGroup,
    #[error("rank {rank} contributed {actual} elements, expected {expected}")]
    BlockLength {
        rank: u32,
        expected: usize,
        actual: usize,
    },
    #[error("cannot scatter {len} elements evenly over {size} workers")]
    UnevenScatter { len: usize, size: u32 },
    #[error("worker {rank} panicked")]
    WorkerPanicked { rank: u32 },
    #[error("message of {len} bytes exceeds the MPI count limit")]
    MessageTooLarge { len: usize },
    #[error("MPI reported an invalid message size ({count})")]
    InvalidCount { count: i32 },
    #[error("tag {tag} does not fit an MPI tag")]
    InvalidTag { tag: u32 },
    #[error("attempted to initialize multiple MPI instances")]
    AlreadyInitialized,
    #[error("peer disconnected")]
    Disconnected,
    #[error("failed to encode or decode a message: {0}")]
    Codec(#[from] bincode::Error),
}
