//! One-shot completion futures: the handoff between an I/O engine
//! completion and the fiber blocked waiting on it.
//!
//! A [`Future`] is stack-allocated by the async syscall wrapper that creates
//! it (see [`crate::io`]), never heap-allocated and never moved: its address
//! is handed to the I/O engine as the completion's `user_data` and must stay
//! valid until the completion arrives, which is exactly as long as the
//! blocked fiber's stack frame that owns it is alive. While unresolved, it
//! sits on the executor's blocked list via its own intrusive link, exactly
//! like a runnable fiber sits on the runnable list via its.

use crate::current;
use crate::executor;
use crate::fiber::{Fiber, FiberState};
use crate::list::{self, Link};
use std::cell::Cell;
use std::ptr::NonNull;

/// A single pending (or already resolved) asynchronous result.
///
/// `result` carries the raw kernel return value once `completed` is set:
/// negative values are `-errno` exactly as the underlying syscall would
/// return them synchronously. `error` is reserved for failures in the
/// future machinery itself (timeouts, cancellation) that this design does
/// not yet implement; a completed future always has `error == 0`.
pub struct Future {
    link: Link,
    completed: Cell<bool>,
    result: Cell<i32>,
    error: Cell<i32>,
    fiber: Cell<Option<NonNull<Fiber>>>,
}

unsafe impl list::Linked for Future {
    unsafe fn link(ptr: NonNull<Self>) -> NonNull<Link> {
        unsafe { NonNull::new_unchecked(std::ptr::addr_of_mut!((*ptr.as_ptr()).link)) }
    }

    unsafe fn from_link(link: NonNull<Link>) -> NonNull<Self> {
        unsafe {
            let offset = std::mem::offset_of!(Future, link);
            let future_ptr = (link.as_ptr() as *mut u8).sub(offset) as *mut Future;
            NonNull::new_unchecked(future_ptr)
        }
    }
}

impl Future {
    /// Creates a fresh, unresolved future bound to the currently running
    /// fiber. Must be created on the stack of the fiber that will await it.
    pub fn new() -> Self {
        Self {
            link: Link::new(),
            completed: Cell::new(false),
            result: Cell::new(-1),
            error: Cell::new(-1),
            fiber: Cell::new(current::try_current()),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.completed.get()
    }

    pub fn result(&self) -> i32 {
        self.result.get()
    }

    /// The fiber that is (or was) awaiting this future.
    pub(crate) fn fiber(&self) -> Option<NonNull<Fiber>> {
        self.fiber.get()
    }

    /// Called by the I/O engine when the kernel completion for this future
    /// arrives. Only populates the future's own fields; unlinking it from
    /// the blocked list and re-enqueuing its fiber is the executor's job,
    /// per the design's division of responsibility between the two.
    pub(crate) fn complete(&self, result: i32) {
        debug_assert!(
            !self.completed.get(),
            "rocket-io: [BUG] future completed twice"
        );
        self.result.set(result);
        self.error.set(0);
        self.completed.set(true);
    }

    /// Blocks the currently running fiber until this future completes.
    ///
    /// If the completion has already arrived (the backend resolved the
    /// request synchronously, before the caller got around to awaiting it),
    /// returns immediately without suspending.
    ///
    /// # Safety
    ///
    /// Must be called from within a running fiber (never the executor's own
    /// loop context), exactly once, and only while `self` remains at a
    /// stable address.
    pub unsafe fn await_(&self) -> i32 {
        let fiber = self
            .fiber
            .get()
            .expect("rocket-io: future awaited outside of a fiber");

        if !self.completed.get() {
            unsafe {
                fiber.as_ref().set_state(FiberState::Blocked);
                executor::with_current_executor(|ex| ex.push_blocked(NonNull::from(self)));
                fiber.as_ref().suspend();
            }
            debug_assert!(self.completed.get(), "rocket-io: [BUG] resumed fiber whose future is still pending");
        }
        self.error.get()
    }
}

impl Default for Future {
    fn default() -> Self {
        Self::new()
    }
}
