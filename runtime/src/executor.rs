//! The single-threaded scheduler: a runnable queue of fibers, a blocked
//! queue of futures, and an [`Engine`] to wait on when nothing is runnable.
//!
//! The main loop resumes fibers round-robin off the runnable list until it
//! is empty, then blocks on the engine for at least one completion, moving
//! each newly-resolved future's fiber onto the runnable list before
//! resuming the loop. A future sits on the blocked list via its own
//! intrusive link for exactly as long as its fiber is BLOCKED; a fiber sits
//! on the runnable list via a different link of its own. The two lists
//! never hold the same kind of node.

use crate::engine::Engine;
use crate::error::Result;
use crate::fiber::{Fiber, FiberState};
use crate::future::Future;
use crate::list::List;
use fiber::StackPointer;
use std::cell::Cell;
use std::io;
use std::ptr::{self, NonNull};

/// Stack size given to fibers submitted without an explicit override.
pub const DEFAULT_FIBER_STACK_SIZE: usize = 256 * 1024;

thread_local! {
    static CURRENT_EXECUTOR: Cell<*mut Executor> = const { Cell::new(ptr::null_mut()) };
}

/// Gives the currently running fiber access to the executor driving it,
/// without threading an `&mut Executor` through every async syscall
/// wrapper or through [`spawn`](crate::spawn). Valid only while inside
/// [`Executor::execute`]; per the single-threaded design, there is at most
/// one executor running per thread, and this is the only thing that reaches
/// across fiber stacks to touch it.
pub(crate) fn with_current_executor<R>(f: impl FnOnce(&mut Executor) -> R) -> R {
    CURRENT_EXECUTOR.with(|c| {
        let ptr = c.get();
        assert!(
            !ptr.is_null(),
            "rocket-io: no executor is running on this thread"
        );
        unsafe { f(&mut *ptr) }
    })
}

pub(crate) fn with_current_engine<R>(f: impl FnOnce(&mut Engine) -> R) -> R {
    with_current_executor(|executor| f(&mut executor.engine))
}

pub struct Executor {
    engine: Engine,
    runnable: List<Fiber>,
    blocked: List<Future>,
    loop_sp: Option<StackPointer>,
    default_stack_size: usize,
}

impl Executor {
    pub fn new(queue_depth: u32) -> Result<Self> {
        Ok(Self {
            engine: Engine::new(queue_depth)?,
            runnable: List::new(),
            blocked: List::new(),
            loop_sp: None,
            default_stack_size: DEFAULT_FIBER_STACK_SIZE,
        })
    }

    /// Schedules `task` to run on its own fiber, stack size taken from
    /// [`DEFAULT_FIBER_STACK_SIZE`]. The fiber does not run until the next
    /// call to [`Executor::execute`].
    pub fn submit(&mut self, task: impl FnOnce() + 'static) -> io::Result<()> {
        self.submit_with_stack_size(self.default_stack_size, task)
    }

    pub fn submit_with_stack_size(
        &mut self,
        stack_size: usize,
        task: impl FnOnce() + 'static,
    ) -> io::Result<()> {
        let fiber = Fiber::new(stack_size, task)?;
        let ptr = NonNull::from(Box::leak(fiber));
        unsafe {
            self.runnable.push_tail(ptr);
        }
        Ok(())
    }

    /// Appends `future` to the blocked list. Called by
    /// [`crate::future::Future::await_`] on behalf of the fiber that owns
    /// it, right before that fiber switches back to this loop.
    ///
    /// # Safety
    ///
    /// `future` must not already be linked into a list, and must remain at
    /// a stable address until it is removed (i.e. its completion arrives).
    pub(crate) unsafe fn push_blocked(&mut self, future: NonNull<Future>) {
        unsafe { self.blocked.push_tail(future) };
    }

    /// Runs fibers to completion: resumes runnable fibers round-robin,
    /// blocking on the I/O engine only when there is nothing left to run.
    /// Returns once both the runnable and blocked lists are empty.
    ///
    /// Per the design, a fatal engine wait failure aborts the loop
    /// immediately; any fibers still on the blocked list at that point are
    /// leaked rather than forcibly unwound.
    pub fn execute(&mut self) -> Result<()> {
        CURRENT_EXECUTOR.with(|c| c.set(self as *mut Executor));
        let result = self.run();
        CURRENT_EXECUTOR.with(|c| c.set(ptr::null_mut()));
        result
    }

    fn run(&mut self) -> Result<()> {
        loop {
            if let Some(fiber_ptr) = self.runnable.pop_head() {
                unsafe {
                    Fiber::resume(fiber_ptr, &mut self.loop_sp);
                }
                match unsafe { fiber_ptr.as_ref().state() } {
                    // Yielded voluntarily: go to the tail, per the
                    // round-robin fairness rule.
                    FiberState::Runnable => unsafe { self.runnable.push_tail(fiber_ptr) },
                    // Its future is already on the blocked list (pushed by
                    // `Future::await_` itself); nothing more to do here.
                    FiberState::Blocked => {}
                    FiberState::Completed => unsafe {
                        drop(Box::from_raw(fiber_ptr.as_ptr()));
                    },
                }
                continue;
            }

            if self.blocked.is_empty() {
                return Ok(());
            }

            log::trace!(
                "nothing runnable, waiting on engine ({} future(s) blocked)",
                self.blocked.len()
            );

            let Self {
                engine,
                blocked,
                runnable,
                ..
            } = self;
            let n = unsafe {
                engine.await_next(|future_ptr, result| {
                    let future = &*future_ptr;
                    future.complete(result);
                    blocked.remove(NonNull::new_unchecked(future_ptr as *mut Future));
                    if let Some(fiber_ptr) = future.fiber() {
                        fiber_ptr.as_ref().set_state(FiberState::Runnable);
                        runnable.push_tail(fiber_ptr);
                    }
                })?
            };
            log::trace!("{n} completion(s) processed");
        }
    }
}

impl Drop for Executor {
    fn drop(&mut self) {
        // Invariant violation if either list is non-empty: `execute` only
        // returns once both are drained, and completed fibers are freed as
        // they're reaped. Anything left here would be a leaked `Box<Fiber>`
        // or a dangling blocked `Future`.
        debug_assert!(self.runnable.is_empty());
        debug_assert!(self.blocked.is_empty());
    }
}
