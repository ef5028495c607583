//! Error taxonomy for the runtime's own operations.
//!
//! I/O results are *not* represented with this type: per the kernel-backend
//! convention the async syscalls return raw `-errno` integers through
//! [`crate::future::Future::result`], exactly like their synchronous
//! counterparts. This type only covers failures in the runtime's own
//! machinery — engine/backend construction and submission-queue exhaustion —
//! the two places section 7 of the design calls out as surfacing
//! synchronously rather than through a future.

use std::io;

/// Failures that can occur while standing up or driving the runtime itself,
/// as opposed to failures of an individual I/O operation (which are
/// conveyed as `-errno` through [`crate::future::Future`]).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// `io_uring_queue_init` (or the equivalent backend setup call) failed.
    #[error("failed to initialize io_uring backend: {0}")]
    EngineInit(#[source] io::Error),

    /// No submission-queue entries were available. The queue depth is fixed
    /// at engine creation; this surfaces as soon as it is exhausted rather
    /// than blocking or retrying.
    #[error("io_uring submission queue is full")]
    QueueFull,

    /// `io_uring_submit` (or equivalent) failed after a request was
    /// populated.
    #[error("failed to submit request to io_uring: {0}")]
    Submit(#[source] io::Error),

    /// The backend's completion wait failed. Per the design, this is
    /// treated as process-fatal: `Executor::execute` returns immediately and
    /// any blocked fibers are leaked.
    #[error("io_uring completion wait failed: {0}")]
    CompletionWait(#[source] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
