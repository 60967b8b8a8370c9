//! MPI-based implementation of CommGroup.
use crate::{wire, CommError, CommFuture, CommGroup, DataType};
use lazy_static::lazy_static;
use log::warn;
use mpi_sys::{
    MPI_Abort, MPI_Comm, MPI_Comm_rank, MPI_Comm_size, MPI_Finalize, MPI_Get_count,
    MPI_Init_thread, MPI_Iprobe, MPI_Irecv, MPI_Isend, MPI_Request, MPI_Test, RSMPI_COMM_WORLD,
    RSMPI_STATUS_IGNORE, RSMPI_THREAD_MULTIPLE, RSMPI_UINT8_T,
};
use serde::Serialize;
use std::mem::MaybeUninit;
use std::os::raw::c_int;
use std::sync::{Mutex, PoisonError};

lazy_static! {
    static ref MPI_INIT_LOCK: Mutex<i32> = Mutex::new(0);
}

pub fn init_standard_mpi() -> Result<MPICommGroup, CommError> {
    let mut init_lock = MPI_INIT_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
    if *init_lock != 0 {
        return Err(CommError::AlreadyInitialized);
    }
    *init_lock = 1;
    unsafe {
        let mut provided: c_int = 0;
        MPI_Init_thread(
            std::ptr::null_mut(),
            std::ptr::null_mut(),
            RSMPI_THREAD_MULTIPLE,
            &mut provided,
        );
        if provided != RSMPI_THREAD_MULTIPLE {
            warn!("MPI provides thread level {provided}, requested THREAD_MULTIPLE");
        }
        Ok(MPICommGroup {
            comm: RSMPI_COMM_WORLD,
        })
    }
}

impl Drop for MPICommGroup {
    fn drop(&mut self) {
        unsafe {
            MPI_Finalize();
        }
        let mut init_lock = MPI_INIT_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
        *init_lock = 0;
    }
}

pub struct MPICommGroup {
    comm: MPI_Comm,
}

impl CommGroup for MPICommGroup {
    fn rank(&self) -> u32 {
        unsafe {
            let mut value = 0;
            MPI_Comm_rank(self.comm, &mut value);
            value as u32
        }
    }

    fn size(&self) -> u32 {
        unsafe {
            let mut value = 0;
            MPI_Comm_size(self.comm, &mut value);
            value as u32
        }
    }

    fn send<T: Serialize + ?Sized>(&self, data: &T, dest: u32, tag: u32) -> CommFuture<()> {
        let buffer = bincode::serialize(data);
        let comm = self.comm;
        let size = self.size();
        Box::pin(async move {
            let dest = wire::rank(dest, size)?;
            let tag = wire::tag(tag)?;
            let buffer = buffer?;
            let count = wire::send_count(buffer.len())?;
            internal_send(comm, &buffer, count, dest, tag).await;
            Ok(())
        })
    }

    fn recv<T: DataType>(&self, source: u32, tag: u32) -> CommFuture<T> {
        let comm = self.comm;
        let size = self.size();
        Box::pin(async move {
            let source = wire::rank(source, size)?;
            let tag = wire::tag(tag)?;
            let buffer = internal_recv(comm, source, tag).await?;
            Ok(bincode::deserialize(&buffer[..])?)
        })
    }

    /// Tear down every process of `MPI_COMM_WORLD`.
    ///
    /// MPI implementations do not return from `MPI_Abort`; the error is
    /// only produced if one does.
    fn abort(&self, code: i32) -> CommError {
        let rank = self.rank();
        warn!("rank {rank} aborting MPI job (code {code})");
        unsafe {
            MPI_Abort(self.comm, code);
        }
        CommError::Aborted { rank, code }
    }
}

// Counts, ranks and tags reach the C layer already converted by `wire`.

async fn internal_send(comm: MPI_Comm, buffer: &[u8], count: c_int, dest: c_int, tag: c_int) {
    unsafe {
        let mut req = MaybeUninit::uninit();
        MPI_Isend(
            buffer.as_ptr() as *const _,
            count,
            RSMPI_UINT8_T,
            dest,
            tag,
            comm,
            req.as_mut_ptr(),
        );
        let mut req = req.assume_init();

        while !test_request(&mut req).await {}
    }
}

async fn internal_recv(comm: MPI_Comm, source: c_int, tag: c_int) -> Result<Vec<u8>, CommError> {
    unsafe {
        let mut buffer = vec![];

        let count = loop {
            if let Some(count) = probe_recv(comm, source, tag).await {
                break count;
            }
        };
        buffer.resize(wire::recv_len(count)?, 0);

        let mut req = MaybeUninit::uninit();
        MPI_Irecv(
            buffer.as_mut_ptr() as *mut _,
            count,
            RSMPI_UINT8_T,
            source,
            tag,
            comm,
            req.as_mut_ptr(),
        );
        let mut req = req.assume_init();

        while !test_request(&mut req).await {}
        Ok(buffer)
    }
}

/// Probe for a receive message.
async unsafe fn probe_recv(comm: MPI_Comm, source: c_int, tag: c_int) -> Option<c_int> {
    let mut status = MaybeUninit::uninit();
    let mut flag = 0;
    MPI_Iprobe(source, tag, comm, &mut flag, status.as_mut_ptr());
    let status = status.assume_init();
    if flag != 0 {
        let mut count = 0;
        MPI_Get_count(&status, RSMPI_UINT8_T, &mut count);
        Some(count)
    } else {
        None
    }
}

/// Test if the request is complete.
async unsafe fn test_request(req: &mut MPI_Request) -> bool {
    let mut flag = 0;
    MPI_Test(req, &mut flag, RSMPI_STATUS_IGNORE);
    flag != 0
}
