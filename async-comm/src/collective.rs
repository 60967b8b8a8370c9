//! Collective operations built on the point-to-point primitives of a group.
//!
//! Every worker of the group must enter the same collectives in the same
//! order. Barrier, reduce and gather are synchronization points: no worker
//! returns before every worker has contributed. A failure detected by the
//! root turns into a group abort so no peer stays blocked.
use crate::{CommError, CommGroup, DataType, ABORT_CODE};
use log::debug;

const BARRIER_TAG: u32 = 1;
const REDUCE_TAG: u32 = 2;
const GATHER_TAG: u32 = 3;
const SCATTER_TAG: u32 = 4;
const RELEASE_TAG: u32 = 5;

fn check_root<G: CommGroup>(cg: &G, root: u32) -> Result<(), CommError> {
    if root >= cg.size() {
        return Err(CommError::InvalidRank {
            rank: root,
            size: cg.size(),
        });
    }
    Ok(())
}

/// Unblock every non-root worker once the root has all contributions.
async fn release<G: CommGroup>(cg: &G, root: u32) -> Result<(), CommError> {
    for dest in (0..cg.size()).filter(|&dest| dest != root) {
        cg.send(&(), dest, RELEASE_TAG).await?;
    }
    Ok(())
}

async fn wait_release<G: CommGroup>(cg: &G, root: u32) -> Result<(), CommError> {
    cg.recv::<()>(root, RELEASE_TAG).await
}

/// Block until every worker of the group has entered the barrier.
pub async fn barrier<G: CommGroup>(cg: &G) -> Result<(), CommError> {
    let root = crate::COORDINATOR;
    if cg.rank() == root {
        for source in (0..cg.size()).filter(|&source| source != root) {
            cg.recv::<()>(source, BARRIER_TAG).await?;
        }
        release(cg, root).await
    } else {
        cg.send(&(), root, BARRIER_TAG).await?;
        wait_release(cg, root).await
    }
}

/// Sum one value from every worker into `root`.
///
/// The root gets `Some(total)`, summed in ascending rank order; every
/// other worker gets `None`.
pub async fn reduce_sum<G: CommGroup>(
    cg: &G,
    value: f64,
    root: u32,
) -> Result<Option<f64>, CommError> {
    check_root(cg, root)?;
    if cg.rank() != root {
        cg.send(&value, root, REDUCE_TAG).await?;
        wait_release(cg, root).await?;
        return Ok(None);
    }

    let mut total = 0.0;
    for source in 0..cg.size() {
        total += if source == root {
            value
        } else {
            cg.recv::<f64>(source, REDUCE_TAG).await?
        };
    }
    release(cg, root).await?;
    debug!("reduced {} contributions into {}", cg.size(), total);
    Ok(Some(total))
}

/// Concatenate the local blocks of every worker, in rank order, at `root`.
///
/// Every worker must contribute a block of the same length. Only the root
/// allocates the full buffer.
pub async fn gather_to<G: CommGroup, T: DataType>(
    cg: &G,
    root: u32,
    local: &[T],
) -> Result<Option<Vec<T>>, CommError> {
    check_root(cg, root)?;
    if cg.rank() != root {
        cg.send(local, root, GATHER_TAG).await?;
        wait_release(cg, root).await?;
        return Ok(None);
    }

    let mut result = Vec::with_capacity(local.len() * cg.size() as usize);
    for source in 0..cg.size() {
        if source == root {
            result.extend_from_slice(local);
            continue;
        }
        let block: Vec<T> = cg.recv(source, GATHER_TAG).await?;
        if block.len() != local.len() {
            cg.abort(ABORT_CODE);
            return Err(CommError::BlockLength {
                rank: source,
                expected: local.len(),
                actual: block.len(),
            });
        }
        result.extend(block);
    }
    release(cg, root).await?;
    debug!("gathered {} elements at rank {}", result.len(), root);
    Ok(Some(result))
}

/// Split `data` held by `root` into equal contiguous blocks, one per rank.
///
/// `data` is only read on the root; other workers may pass an empty slice.
/// The root does not wait for the blocks to be received.
pub async fn scatter_from<G: CommGroup, T: DataType>(
    cg: &G,
    root: u32,
    data: &[T],
) -> Result<Vec<T>, CommError> {
    check_root(cg, root)?;
    if cg.rank() != root {
        return cg.recv(root, SCATTER_TAG).await;
    }

    let size = cg.size();
    if data.len() % size as usize != 0 {
        cg.abort(ABORT_CODE);
        return Err(CommError::UnevenScatter {
            len: data.len(),
            size,
        });
    }
    let subsize = data.len() / size as usize;

    let mut own = Vec::new();
    for dest in 0..size {
        let start = dest as usize * subsize;
        let block = &data[start..start + subsize];
        if dest == root {
            own = block.to_vec();
        } else {
            cg.send(block, dest, SCATTER_TAG).await?;
        }
    }
    Ok(own)
}
