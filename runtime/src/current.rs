//! The thread-local "current fiber" pointer.
//!
//! The only place this pointer is ever written is the callback
//! `switch_run_context` invokes once control has actually landed on the
//! destination stack, so there is no window where it could point at a fiber
//! that isn't really running on this thread. Everywhere else in the runtime
//! only reads it.

use crate::fiber::Fiber;
use std::cell::Cell;
use std::ptr::{self, NonNull};

thread_local! {
    static CURRENT: Cell<*mut Fiber> = const { Cell::new(ptr::null_mut()) };
}

/// Passed to `fiber::switch_run_context` as the resume callback. Runs on the
/// destination stack immediately after the switch, before anything else does.
pub(crate) unsafe extern "C" fn set_current(fiber: *mut ()) {
    CURRENT.with(|c| c.set(fiber as *mut Fiber));
}

/// The fiber currently running on this thread, if any.
///
/// `None` when called from the executor's own loop context, which is not
/// itself a fiber.
pub fn try_current() -> Option<NonNull<Fiber>> {
    CURRENT.with(|c| NonNull::new(c.get()))
}

/// The fiber currently running on this thread.
///
/// # Panics
///
/// Panics if called outside of a running fiber, e.g. from the executor's
/// loop context.
pub fn current() -> NonNull<Fiber> {
    try_current().expect("rocket-io: not running on a fiber")
}
