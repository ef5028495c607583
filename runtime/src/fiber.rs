//! The [`Fiber`] lifecycle: a task running on its own guard-paged stack,
//! tracked by the executor as RUNNABLE, BLOCKED, or COMPLETED.
//!
//! Fiber creation builds a run context over a task closure via
//! [`fiber::init_run_context`]; `resume`/`suspend` are the two directions of
//! the same `switch_run_context` call (into the fiber from the executor's
//! loop, and back out of it); a fiber's intrusive [`list::Link`] is how the
//! executor threads it onto its runnable list without a separate
//! allocation. A blocked fiber itself stays off both lists; it's the
//! [`crate::future::Future`] it's waiting on that sits on the executor's
//! blocked list.

use crate::current;
use crate::list;
use fiber::StackPointer;
use std::cell::Cell;
use std::io;
use std::ptr::{self, NonNull};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FiberState {
    Runnable,
    Blocked,
    Completed,
}

/// A single-threaded, cooperatively scheduled task with its own stack.
///
/// Always lives behind a stable address (`Box<Fiber>`, later converted to a
/// raw pointer the executor owns): the address is handed to the stack
/// switch as the resume-callback argument, and to the intrusive lists as the
/// link target, so the fiber must never move once created.
pub struct Fiber {
    link: list::Link,
    state: Cell<FiberState>,
    stack: fiber::Stack,
    sp: Cell<Option<StackPointer>>,
    loop_sp: Cell<*mut Option<StackPointer>>,
    task: Cell<Option<Box<dyn FnOnce()>>>,
}

unsafe impl list::Linked for Fiber {
    unsafe fn link(ptr: NonNull<Self>) -> NonNull<list::Link> {
        unsafe {
            let field = std::ptr::addr_of_mut!((*ptr.as_ptr()).link);
            NonNull::new_unchecked(field)
        }
    }

    unsafe fn from_link(link: NonNull<list::Link>) -> NonNull<Self> {
        unsafe {
            let offset = std::mem::offset_of!(Fiber, link);
            let fiber_ptr = (link.as_ptr() as *mut u8).sub(offset) as *mut Fiber;
            NonNull::new_unchecked(fiber_ptr)
        }
    }
}

impl Fiber {
    /// Allocates a guard-paged stack and lays down a fresh run context for
    /// `task`. The task does not start running until the executor first
    /// resumes it.
    pub fn new(stack_size: usize, task: impl FnOnce() + 'static) -> io::Result<Box<Fiber>> {
        let stack = fiber::Stack::new(stack_size)?;
        let fiber = Box::new(Fiber {
            link: list::Link::new(),
            state: Cell::new(FiberState::Runnable),
            stack,
            sp: Cell::new(None),
            loop_sp: Cell::new(ptr::null_mut()),
            task: Cell::new(Some(Box::new(task))),
        });

        let ctx = &*fiber as *const Fiber as *mut ();
        let sp = unsafe { fiber::init_run_context(&fiber.stack, fiber_entry, ctx, fiber_exit) };
        fiber.sp.set(Some(sp));
        Ok(fiber)
    }

    pub fn state(&self) -> FiberState {
        self.state.get()
    }

    pub fn set_state(&self, state: FiberState) {
        self.state.set(state);
    }

    pub fn is_completed(&self) -> bool {
        self.state() == FiberState::Completed
    }

    /// Switches control from the executor's loop context into this fiber.
    /// Returns once the fiber has blocked or completed and switched back.
    ///
    /// # Safety
    ///
    /// `fiber` must point at a live `Fiber` not already running, and
    /// `loop_sp` must be the executor's own loop stack-pointer slot, stable
    /// for as long as this fiber exists (the executor must not move after
    /// fibers are created).
    pub(crate) unsafe fn resume(fiber: NonNull<Fiber>, loop_sp: &mut Option<StackPointer>) {
        unsafe {
            let dst = fiber
                .as_ref()
                .sp
                .get()
                .expect("rocket-io: [BUG] fiber has no saved context");
            fiber.as_ref().loop_sp.set(loop_sp as *mut Option<StackPointer>);
            fiber::switch_run_context(
                loop_sp as *mut Option<StackPointer>,
                dst,
                fiber.as_ptr() as *mut (),
                current::set_current,
            );
        }
    }

    /// Switches control from this fiber, which must currently be running,
    /// back to the executor's loop context. Returns once the executor
    /// resumes this fiber again.
    ///
    /// # Safety
    ///
    /// Must be called from code running on this fiber's own stack.
    pub(crate) unsafe fn suspend(&self) {
        unsafe {
            let loop_sp = self.loop_sp.get();
            debug_assert!(!loop_sp.is_null(), "rocket-io: [BUG] fiber has no loop context");
            let dst = (*loop_sp).expect("rocket-io: [BUG] loop context has no saved stack pointer");
            fiber::switch_run_context(self.sp.as_ptr(), dst, ptr::null_mut(), current::set_current);
        }
    }
}

unsafe extern "C" fn fiber_entry(ctx: *mut ()) {
    unsafe {
        let fiber = &*(ctx as *const Fiber);
        if let Some(task) = fiber.task.take() {
            task();
        }
        fiber.set_state(FiberState::Completed);
    }
}

unsafe extern "C" fn fiber_exit() -> ! {
    unsafe {
        let fiber = current::current();
        fiber.as_ref().suspend();
    }
    unreachable!("rocket-io: [BUG] a completed fiber was resumed again");
}
