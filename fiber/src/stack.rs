// Guard pages sit on both ends of the mapping since fiber stacks here are
// never relinked or resized after creation.

use std::io;
use std::num::NonZeroUsize;
use std::ptr;

pub type StackPointer = NonZeroUsize;

/// Minimum size of a stack, excluding guard pages.
pub const MIN_STACK_SIZE: usize = 4096;

/// A guard-paged, page-aligned stack region for a single fiber.
///
/// The mapping looks like:
///
/// ```text
/// +--------------+  <- top (high address), initial stack pointer
/// | usable stack |
/// | (PROT_READ |  |
/// |  PROT_WRITE)  |
/// +--------------+
/// | guard page   |  PROT_NONE
/// +--------------+  <- bottom (low address)
/// ```
///
/// plus a second guard page above the usable region, so both stack overflow
/// (writing past the bottom) and the less common overflow-from-above case
/// fault instead of corrupting adjacent memory.
pub struct Stack {
    base: *mut libc::c_void,
    mmap_len: usize,
    top: StackPointer,
}

unsafe impl Send for Stack {}

impl Stack {
    /// Creates a new stack with at least `min_size` usable bytes.
    pub fn new(min_size: usize) -> io::Result<Self> {
        let size = min_size.max(MIN_STACK_SIZE);
        let page_size = page_size();
        let usable_len = round_up(size, page_size);
        let mmap_len = usable_len
            .checked_add(2 * page_size)
            .expect("integer overflow while calculating stack size");

        cfg_if::cfg_if! {
            if #[cfg(target_os = "openbsd")] {
                let map_flags = libc::MAP_ANONYMOUS | libc::MAP_PRIVATE | libc::MAP_STACK;
            } else {
                let map_flags = libc::MAP_ANONYMOUS | libc::MAP_PRIVATE;
            }
        }

        unsafe {
            let base = libc::mmap(
                ptr::null_mut(),
                mmap_len,
                libc::PROT_NONE,
                map_flags,
                -1,
                0,
            );
            if base == libc::MAP_FAILED {
                return Err(io::Error::last_os_error());
            }

            // Everything except the two guard pages is readable/writable.
            if libc::mprotect(
                base.cast::<u8>().add(page_size).cast(),
                usable_len,
                libc::PROT_READ | libc::PROT_WRITE,
            ) != 0
            {
                let err = io::Error::last_os_error();
                libc::munmap(base, mmap_len);
                return Err(err);
            }

            let top = base as usize + page_size + usable_len;
            Ok(Self {
                base,
                mmap_len,
                top: StackPointer::new(top).unwrap(),
            })
        }
    }

    /// Highest address of the usable region; the initial stack pointer.
    pub fn top(&self) -> StackPointer {
        self.top
    }

    /// Lowest address of the usable region, i.e. the address just above the
    /// bottom guard page.
    pub fn bottom(&self) -> StackPointer {
        StackPointer::new(self.base as usize + page_size()).unwrap()
    }
}

impl Drop for Stack {
    fn drop(&mut self) {
        unsafe {
            let ret = libc::munmap(self.base, self.mmap_len);
            debug_assert_eq!(ret, 0);
        }
    }
}

fn round_up(size: usize, page_size: usize) -> usize {
    (size + page_size - 1) & !(page_size - 1)
}

fn page_size() -> usize {
    let pagesize = unsafe { libc::sysconf(libc::_SC_PAGESIZE) } as usize;
    assert!(pagesize.is_power_of_two());
    pagesize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocates_guard_paged_stack() {
        let stack = Stack::new(64 * 1024).unwrap();
        assert!(stack.top().get() > stack.bottom().get());
        assert!(stack.top().get() - stack.bottom().get() >= 64 * 1024);
    }
}
