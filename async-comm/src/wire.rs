//! Conversions between Rust lengths and the C `int` counts, ranks and tags
//! of the MPI layer.
#![cfg_attr(not(feature = "mpi"), allow(dead_code))]

use crate::CommError;
use std::os::raw::c_int;

/// Byte count for a message of `len` bytes.
pub(crate) fn send_count(len: usize) -> Result<c_int, CommError> {
    c_int::try_from(len).map_err(|_| CommError::MessageTooLarge { len })
}

/// Buffer length for a matched incoming message. MPI reports failure as
/// a negative count (`MPI_UNDEFINED`).
pub(crate) fn recv_len(count: c_int) -> Result<usize, CommError> {
    usize::try_from(count).map_err(|_| CommError::InvalidCount { count })
}

pub(crate) fn tag(tag: u32) -> Result<c_int, CommError> {
    c_int::try_from(tag).map_err(|_| CommError::InvalidTag { tag })
}

/// Ranks below the group size always fit.
pub(crate) fn rank(rank: u32, size: u32) -> Result<c_int, CommError> {
    if rank >= size {
        return Err(CommError::InvalidRank { rank, size });
    }
    c_int::try_from(rank).map_err(|_| CommError::InvalidRank { rank, size })
}
