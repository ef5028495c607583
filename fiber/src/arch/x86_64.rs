// SysV x86-64 context-switch trampoline. Each switch saves/restores only the
// callee-saved registers and the stack pointer, then runs a callback on the
// destination stack before falling through — the callback is how "current
// fiber" thread-local state gets published before any higher-level code runs
// there.

use crate::stack::{Stack, StackPointer};
use core::arch::naked_asm;

pub const STACK_ALIGNMENT: usize = 16;

/// Lays out `stack` so that the first `switch_run_context` into it starts
/// executing `entry(entry_ctx)`, and so that `entry` returning normally
/// (which should never happen — the entry wrapper calls `fiber_yield`
/// instead of returning) invokes `exit`.
pub unsafe fn init_run_context(
    stack: &Stack,
    entry: unsafe extern "C" fn(*mut ()),
    entry_ctx: *mut (),
    exit: unsafe extern "C" fn() -> !,
) -> StackPointer {
    unsafe {
        let mut sp = stack.top().get();

        // Arguments read by `trampoline` once it starts executing on this
        // stack, above the saved-register area restored by the first
        // switch into this stack.
        push(&mut sp, exit as usize);
        push(&mut sp, entry_ctx as usize);
        push(&mut sp, entry as usize);

        // Return address for the `ret` at the end of `switch_run_context`:
        // the first switch into this stack must land in `trampoline`, so
        // this has to sit exactly where the `pop rbp` right before `ret`
        // leaves the stack pointer, not where the first `pop` reads.
        push(&mut sp, trampoline as usize);

        // Zeroed callee-saved registers restored by the first switch into
        // this stack. Their values don't matter since `trampoline` never
        // reads them — they only need to be present so `switch_run_context`'s
        // pop sequence stays balanced.
        push(&mut sp, 0); // rbp
        push(&mut sp, 0); // rbx
        push(&mut sp, 0); // r12
        push(&mut sp, 0); // r13
        push(&mut sp, 0); // r14
        push(&mut sp, 0); // r15

        debug_assert_eq!(sp % STACK_ALIGNMENT, 0);
        StackPointer::new_unchecked(sp)
    }
}

#[inline]
unsafe fn push(sp: &mut usize, val: usize) {
    *sp -= size_of::<usize>();
    unsafe {
        *(*sp as *mut usize) = val;
    }
}

/// Entered by the first `switch_run_context` into a freshly initialized
/// stack. Reads the (entry, entry_ctx, exit) triple `init_run_context` left
/// just above the saved-register area and calls into `entry`.
#[naked]
unsafe extern "C" fn trampoline() -> ! {
    unsafe {
        naked_asm! {
            "mov rax, [rsp]",      // entry
            "mov rdi, [rsp + 8]",  // entry_ctx
            "mov rbx, [rsp + 16]", // exit (kept in a callee-saved reg across the call)
            "call rax",
            "mov rax, rbx",
            "call rax",
            "ud2",
        }
    }
}

/// Saves the caller's callee-saved registers and stack pointer into
/// `*src_slot`, switches to `dst_sp`, runs `callback(callback_arg)` on the
/// new stack, then falls through into whatever was suspended there.
///
/// This is symmetric: resuming a fiber and a fiber yielding back to the
/// scheduler loop both go through this same function, so the prologue on
/// one side is the epilogue on the other.
#[naked]
pub unsafe extern "C" fn switch_run_context(
    src_slot: *mut Option<StackPointer>,
    dst_sp: StackPointer,
    callback_arg: *mut (),
    callback: unsafe extern "C" fn(*mut ()),
) {
    unsafe {
        naked_asm! {
            "push rbp",
            "push rbx",
            "push r12",
            "push r13",
            "push r14",
            "push r15",
            "mov [rdi], rsp",
            "mov rsp, rsi",
            "mov rdi, rdx",
            "call rcx",
            "pop r15",
            "pop r14",
            "pop r13",
            "pop r12",
            "pop rbx",
            "pop rbp",
            "ret",
        }
    }
}
