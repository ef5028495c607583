//! Guard-paged stacks and the raw stack-switching primitive stackful fibers
//! are built on.
//!
//! This crate is the stack-switching core of a cooperative fiber runtime; see
//! the `runtime` crate for the scheduler, fiber lifecycle, and I/O engine
//! built on top of it. Callers never need to thread a value through a
//! switch, only to transfer control and publish which fiber is now running.
#![feature(naked_functions)]

mod arch;
pub mod stack;

pub use arch::{init_run_context, switch_run_context};
pub use stack::{Stack, StackPointer};

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    thread_local! {
        static CURRENT: Cell<*mut ()> = const { Cell::new(std::ptr::null_mut()) };
    }

    unsafe extern "C" fn set_current(arg: *mut ()) {
        CURRENT.with(|c| c.set(arg));
    }

    struct EntryCtx {
        loop_sp: *mut Option<StackPointer>,
        ran: Cell<bool>,
    }

    unsafe extern "C" fn entry(ctx: *mut ()) {
        unsafe {
            let ctx = &*(ctx as *const EntryCtx);
            ctx.ran.set(true);
            let mut dummy = None;
            switch_run_context(&mut dummy, (*ctx.loop_sp).unwrap(), std::ptr::null_mut(), set_current);
        }
    }

    unsafe extern "C" fn exit() -> ! {
        panic!("fiber entry must not return");
    }

    #[test]
    fn switches_into_a_fresh_stack_and_back() {
        let stack = Stack::new(64 * 1024).unwrap();
        let mut loop_sp: Option<StackPointer> = None;
        let ctx = EntryCtx {
            loop_sp: &mut loop_sp,
            ran: Cell::new(false),
        };

        unsafe {
            let fiber_sp = init_run_context(&stack, entry, &ctx as *const _ as *mut (), exit);
            // `entry` switches back to `loop_sp` (filled in by this very call)
            // once it has run, so this returns only after `ctx.ran` is set.
            switch_run_context(&mut loop_sp, fiber_sp, std::ptr::null_mut(), set_current);
        }

        assert!(ctx.ran.get());
    }
}
