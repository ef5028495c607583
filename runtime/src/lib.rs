//! A single-threaded, stackful-fiber async I/O runtime for Linux, backed by
//! `io_uring`.
//!
//! Tasks run as [`Fiber`](fiber::Fiber)s — plain functions on their own
//! guard-paged stacks, written in ordinary synchronous-looking style — and
//! call the `*_await` functions in this crate to perform file and socket
//! I/O. Underneath, each call submits one `io_uring` operation and blocks
//! the calling fiber until its completion arrives; the [`Executor`] drives
//! everything from a single thread, alternating between resuming runnable
//! fibers and waiting on the engine when none are left.
//!
//! This is a cooperative, single-threaded design: fibers never migrate
//! between threads, and there is no preemption, timeout, or cancellation —
//! a fiber that never calls one of the `*_await` functions or
//! [`fiber_yield`] runs until it returns.
//!
//! ```no_run
//! use rocket_io::Executor;
//!
//! let mut executor = Executor::new(256)?;
//! executor
//!     .submit(|| {
//!         let fd = rocket_io::openat_await(
//!             libc::AT_FDCWD,
//!             std::path::Path::new("/tmp/x"),
//!             libc::O_RDONLY,
//!             0,
//!         )
//!         .expect("path is not representable as a C string");
//!         assert!(fd >= 0, "open failed: {fd}");
//!         rocket_io::close_await(fd);
//!     })
//!     .expect("failed to allocate fiber stack");
//! executor.execute()?;
//! # Ok::<(), rocket_io::Error>(())
//! ```

mod current;
mod engine;
mod error;
mod executor;
mod fiber;
mod future;
mod io;
mod list;

pub use error::{Error, Result};
pub use engine::DEFAULT_QUEUE_DEPTH;
pub use executor::{Executor, DEFAULT_FIBER_STACK_SIZE};
pub use io::{
    accept_await, close_await, openat_await, read_at_await, recv_await, send_await,
    write_at_await,
};

/// Schedules `task` on a new fiber from within an already-running fiber,
/// e.g. to hand a freshly accepted connection off to its own fiber while an
/// accept loop keeps running. Equivalent to [`Executor::submit`] called on
/// the executor currently driving this thread.
///
/// # Panics
///
/// Panics if called outside of [`Executor::execute`].
pub fn spawn(task: impl FnOnce() + 'static) -> std::io::Result<()> {
    executor::with_current_executor(|executor| executor.submit(task))
}

/// Voluntarily yields the running fiber back to the executor without
/// waiting on any I/O. The fiber is placed back on the runnable list and
/// resumes on a later scheduling pass.
///
/// # Panics
///
/// Panics if called outside of a running fiber.
pub fn fiber_yield() {
    let fiber = current::current();
    unsafe {
        fiber.as_ref().suspend();
    }
}
