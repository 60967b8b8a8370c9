//! Thread-backed implementation of CommGroup.
//!
//! Every worker runs on its own OS thread and owns an inbox. Payloads are
//! serialized with bincode, so a worker sees exactly the bytes an MPI
//! process would. Messages between a (source, tag) pair are delivered in
//! the order they were sent.
use crate::{CommError, CommFuture, CommGroup, DataType, ABORT_CODE};
use futures::channel::mpsc::{self, UnboundedReceiver, UnboundedSender};
use futures::lock::Mutex;
use futures::{future, StreamExt};
use log::{debug, trace, warn};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::{Arc, OnceLock};
use std::thread;

enum Envelope {
    Data {
        source: u32,
        tag: u32,
        payload: Vec<u8>,
    },
    Abort {
        rank: u32,
        code: i32,
    },
}

struct Pending {
    source: u32,
    tag: u32,
    payload: Vec<u8>,
}

struct Inbox {
    rx: UnboundedReceiver<Envelope>,
    // Arrived but not yet matched by a recv.
    pending: VecDeque<Pending>,
}

#[derive(Clone, Copy, Debug)]
struct AbortInfo {
    rank: u32,
    code: i32,
}

impl From<AbortInfo> for CommError {
    fn from(info: AbortInfo) -> Self {
        CommError::Aborted {
            rank: info.rank,
            code: info.code,
        }
    }
}

/// One worker's handle on an in-process group.
pub struct LocalGroup {
    rank: u32,
    peers: Arc<Vec<UnboundedSender<Envelope>>>,
    inbox: Arc<Mutex<Inbox>>,
    aborted: Arc<OnceLock<AbortInfo>>,
}

impl LocalGroup {
    /// Create the handles of a group of `size` workers, indexed by rank.
    pub fn create(size: u32) -> Result<Vec<LocalGroup>, CommError> {
        if size == 0 {
            return Err(CommError::EmptyGroup);
        }
        let (senders, receivers): (Vec<_>, Vec<_>) = (0..size).map(|_| mpsc::unbounded()).unzip();
        let peers = Arc::new(senders);
        let aborted = Arc::new(OnceLock::new());

        Ok(receivers
            .into_iter()
            .zip(0..size)
            .map(|(rx, rank)| LocalGroup {
                rank,
                peers: Arc::clone(&peers),
                inbox: Arc::new(Mutex::new(Inbox {
                    rx,
                    pending: VecDeque::new(),
                })),
                aborted: Arc::clone(&aborted),
            })
            .collect())
    }

    fn post<T: Serialize + ?Sized>(&self, data: &T, dest: u32, tag: u32) -> Result<(), CommError> {
        if let Some(info) = self.aborted.get() {
            return Err((*info).into());
        }
        let peer = self.peers.get(dest as usize).ok_or(CommError::InvalidRank {
            rank: dest,
            size: self.size(),
        })?;
        let payload = bincode::serialize(data)?;
        trace!(
            "rank {} -> {} tag {} ({} bytes)",
            self.rank,
            dest,
            tag,
            payload.len()
        );
        peer.unbounded_send(Envelope::Data {
            source: self.rank,
            tag,
            payload,
        })
        .map_err(|_| CommError::Disconnected)
    }
}

impl CommGroup for LocalGroup {
    fn rank(&self) -> u32 {
        self.rank
    }

    fn size(&self) -> u32 {
        self.peers.len() as u32
    }

    fn send<T: Serialize + ?Sized>(&self, data: &T, dest: u32, tag: u32) -> CommFuture<()> {
        Box::pin(future::ready(self.post(data, dest, tag)))
    }

    fn recv<T: DataType>(&self, source: u32, tag: u32) -> CommFuture<T> {
        let inbox = Arc::clone(&self.inbox);
        let aborted = Arc::clone(&self.aborted);
        let size = self.size();
        Box::pin(async move {
            if source >= size {
                return Err(CommError::InvalidRank { rank: source, size });
            }
            let payload = internal_recv(&inbox, &aborted, source, tag).await?;
            Ok(bincode::deserialize(&payload)?)
        })
    }

    fn abort(&self, code: i32) -> CommError {
        let info = *self.aborted.get_or_init(|| AbortInfo {
            rank: self.rank,
            code,
        });
        warn!("rank {} aborting worker group (code {})", self.rank, code);
        for peer in self.peers.iter() {
            // Peers that already finished have dropped their inbox.
            let _ = peer.unbounded_send(Envelope::Abort {
                rank: info.rank,
                code: info.code,
            });
        }
        info.into()
    }
}

impl Drop for LocalGroup {
    fn drop(&mut self) {
        if thread::panicking() {
            self.abort(ABORT_CODE);
        }
    }
}

async fn internal_recv(
    inbox: &Mutex<Inbox>,
    aborted: &OnceLock<AbortInfo>,
    source: u32,
    tag: u32,
) -> Result<Vec<u8>, CommError> {
    let mut inbox = inbox.lock().await;
    if let Some(info) = aborted.get() {
        return Err((*info).into());
    }
    let matched = inbox
        .pending
        .iter()
        .position(|p| p.source == source && p.tag == tag);
    if let Some(pos) = matched {
        if let Some(p) = inbox.pending.remove(pos) {
            return Ok(p.payload);
        }
    }

    loop {
        let envelope = inbox.rx.next().await;
        match envelope {
            Some(Envelope::Data {
                source: s,
                tag: t,
                payload,
            }) => {
                if let Some(info) = aborted.get() {
                    return Err((*info).into());
                }
                if s == source && t == tag {
                    return Ok(payload);
                }
                inbox.pending.push_back(Pending {
                    source: s,
                    tag: t,
                    payload,
                });
            }
            Some(Envelope::Abort { rank, code }) => return Err(CommError::Aborted { rank, code }),
            None => return Err(CommError::Disconnected),
        }
    }
}

/// Run `f` once per worker of a fresh group of `size` threads.
///
/// Results are returned in rank order. A panicking worker aborts the
/// group, so its peers are never left blocked in a collective.
pub fn run_local<T, F>(size: u32, f: F) -> Result<Vec<T>, CommError>
where
    F: Fn(&LocalGroup) -> T + Sync,
    T: Send,
{
    let groups = LocalGroup::create(size)?;
    debug!("spawning {} local workers", size);

    thread::scope(|scope| {
        let f = &f;
        let handles: Vec<_> = groups
            .into_iter()
            .map(|cg| scope.spawn(move || f(&cg)))
            .collect();

        let joined: Vec<_> = handles
            .into_iter()
            .zip(0..size)
            .map(|(handle, rank)| handle.join().map_err(|_| CommError::WorkerPanicked { rank }))
            .collect();
        joined.into_iter().collect()
    })
}
