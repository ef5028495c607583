//! The completion-based I/O backend, built on `io_uring`.
//!
//! A fixed-depth submission/completion queue pair, one submission per
//! [`crate::future::Future`] with the future's address round-tripped through
//! `user_data`, and a blocking wait for at least one completion when the
//! executor has nothing runnable left.

use crate::error::{Error, Result};
use crate::future::Future;
use io_uring::{IoUring, squeue, types};

/// Default submission/completion queue depth.
pub const DEFAULT_QUEUE_DEPTH: u32 = 256;

/// Owns the `io_uring` instance backing a single [`crate::executor::Executor`].
pub struct Engine {
    ring: IoUring,
}

impl Engine {
    pub fn new(queue_depth: u32) -> Result<Self> {
        let ring = IoUring::new(queue_depth).map_err(Error::EngineInit)?;
        Ok(Self { ring })
    }

    /// Submits a prepared entry tagged with `future`'s address as
    /// `user_data`. Fails synchronously if the submission queue is full or
    /// the kernel rejects the submission outright; per-I/O failures instead
    /// surface later through `future.result`.
    pub(crate) fn submit(&mut self, future: &Future, entry: squeue::Entry) -> Result<()> {
        let entry = entry.user_data(future as *const Future as u64);
        unsafe {
            self.ring
                .submission()
                .push(&entry)
                .map_err(|_| Error::QueueFull)?;
        }
        self.ring.submit().map_err(Error::Submit)?;
        Ok(())
    }

    /// Blocks until at least one completion is available, then resolves
    /// every future whose completion has arrived. Returns the number of
    /// completions processed.
    ///
    /// # Safety
    ///
    /// Every completion's `user_data` must be the address of a `Future`
    /// that is still alive (i.e. its owning fiber's stack has not been
    /// reclaimed) — this holds as long as callers only submit entries built
    /// from a live, unmoved `Future`.
    pub(crate) unsafe fn await_next(&mut self, mut on_complete: impl FnMut(*const Future, i32)) -> Result<usize> {
        self.ring.submit_and_wait(1).map_err(Error::CompletionWait)?;

        let mut n = 0;
        let mut completion = self.ring.completion();
        completion.sync();
        for cqe in &mut completion {
            let future = cqe.user_data() as *const Future;
            on_complete(future, cqe.result());
            n += 1;
        }
        Ok(n)
    }

    pub(crate) fn openat(dirfd: i32, path: *const libc::c_char, flags: i32, mode: u32) -> squeue::Entry {
        io_uring::opcode::OpenAt::new(types::Fd(dirfd), path)
            .flags(flags)
            .mode(mode)
            .build()
    }

    pub(crate) fn read(fd: i32, buf: *mut u8, len: u32, offset: u64) -> squeue::Entry {
        io_uring::opcode::Read::new(types::Fd(fd), buf, len)
            .offset(offset)
            .build()
    }

    pub(crate) fn write(fd: i32, buf: *const u8, len: u32, offset: u64) -> squeue::Entry {
        io_uring::opcode::Write::new(types::Fd(fd), buf, len)
            .offset(offset)
            .build()
    }

    pub(crate) fn close(fd: i32) -> squeue::Entry {
        io_uring::opcode::Close::new(types::Fd(fd)).build()
    }

    pub(crate) fn accept(
        fd: i32,
        addr: *mut libc::sockaddr,
        addrlen: *mut libc::socklen_t,
        flags: i32,
    ) -> squeue::Entry {
        io_uring::opcode::Accept::new(types::Fd(fd), addr, addrlen)
            .flags(flags)
            .build()
    }

    pub(crate) fn send(fd: i32, buf: *const u8, len: u32, flags: i32) -> squeue::Entry {
        io_uring::opcode::Send::new(types::Fd(fd), buf, len)
            .flags(flags)
            .build()
    }

    pub(crate) fn recv(fd: i32, buf: *mut u8, len: u32, flags: i32) -> squeue::Entry {
        io_uring::opcode::Recv::new(types::Fd(fd), buf, len)
            .flags(flags)
            .build()
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine").finish_non_exhaustive()
    }
}
