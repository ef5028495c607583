//! Async syscall wrappers: `openat`, `read`, `write`, `close`, `accept`,
//! `send`, `recv`.
//!
//! Each follows the same shape: build a stack-local [`Future`], prepare the
//! matching `io_uring` opcode tagged with the future's address, submit it to
//! the current thread's engine, and block the calling fiber until the
//! completion arrives. Submission failures (queue full, `io_uring_enter`
//! rejected) are reported synchronously as a negative return, exactly like
//! the per-I/O `-errno` a completion itself would carry — callers don't
//! need to distinguish the two.

use crate::engine::Engine;
use crate::executor::with_current_engine;
use crate::future::Future;
use std::ffi::CString;
use std::io::Result as IoResult;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

fn submit_and_await(entry: io_uring::squeue::Entry) -> i32 {
    let future = Future::new();
    let submitted = with_current_engine(|engine| engine.submit(&future, entry));
    match submitted {
        Ok(()) => {
            unsafe { future.await_() };
            future.result()
        }
        Err(_) => -libc::EIO,
    }
}

fn path_to_cstring(path: &Path) -> IoResult<CString> {
    CString::new(path.as_os_str().as_bytes())
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))
}

/// Opens `path` relative to `dirfd` (`libc::AT_FDCWD` for the process's
/// current directory). Returns a non-negative file descriptor, or a
/// negative `-errno`.
pub fn openat_await(dirfd: i32, path: &Path, flags: i32, mode: u32) -> IoResult<i32> {
    let path = path_to_cstring(path)?;
    Ok(submit_and_await(Engine::openat(
        dirfd,
        path.as_ptr(),
        flags,
        mode,
    )))
}

/// Reads into `buf` at `offset` from `fd`. Returns the number of bytes
/// read, `0` at end of file, or a negative `-errno`.
pub fn read_at_await(fd: i32, buf: &mut [u8], offset: u64) -> i32 {
    submit_and_await(Engine::read(fd, buf.as_mut_ptr(), buf.len() as u32, offset))
}

/// Writes `buf` at `offset` to `fd`. Returns the number of bytes written,
/// or a negative `-errno`.
pub fn write_at_await(fd: i32, buf: &[u8], offset: u64) -> i32 {
    submit_and_await(Engine::write(fd, buf.as_ptr(), buf.len() as u32, offset))
}

/// Closes `fd`. Returns `0` on success, or a negative `-errno`.
pub fn close_await(fd: i32) -> i32 {
    submit_and_await(Engine::close(fd))
}

/// Accepts a connection on the listening socket `fd`, writing the peer
/// address into `addr`/`addrlen` unless both are null. Returns a
/// non-negative connected file descriptor, or a negative `-errno`.
pub fn accept_await(
    fd: i32,
    addr: *mut libc::sockaddr,
    addrlen: *mut libc::socklen_t,
    flags: i32,
) -> i32 {
    submit_and_await(Engine::accept(fd, addr, addrlen, flags))
}

/// Sends `buf` on socket `fd`. Returns the number of bytes sent, or a
/// negative `-errno`.
pub fn send_await(fd: i32, buf: &[u8], flags: i32) -> i32 {
    submit_and_await(Engine::send(fd, buf.as_ptr(), buf.len() as u32, flags))
}

/// Receives into `buf` from socket `fd`. Returns the number of bytes
/// received, `0` on orderly shutdown, or a negative `-errno`.
pub fn recv_await(fd: i32, buf: &mut [u8], flags: i32) -> i32 {
    submit_and_await(Engine::recv(fd, buf.as_mut_ptr(), buf.len() as u32, flags))
}
