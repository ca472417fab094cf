//! Thin wrappers over the primitive memory syscalls the arena consumes.
//!
//! The arena never talks to `libc` directly; everything it needs from the
//! kernel goes through the four functions in this module:
//!
//! - [`heap_extend`] - move the program break forward (`sbrk`)
//! - [`mmap_anon`]   - create an anonymous private read/write mapping
//! - [`munmap`]      - drop such a mapping
//! - [`page_size`]   - the kernel's page size, used as the `zero_allocate`
//!   threshold
//!
//! A failure of any of the first three is fatal: the allocator has no
//! allocation-free way to report the condition to its caller, so the wrapper
//! prints the failing syscall to stderr and aborts the process.

use std::{io, process, ptr};

use libc::{c_void, intptr_t};

fn die(syscall: &str) -> ! {
  eprintln!("brkalloc: {} failed: {}", syscall, io::Error::last_os_error());
  process::abort()
}

/// Extends the program break by `delta` bytes and returns the old break,
/// which is the start of the freshly granted region.
pub unsafe fn heap_extend(delta: usize) -> *mut u8 {
  let old_break = unsafe { libc::sbrk(delta as intptr_t) };
  if old_break == usize::MAX as *mut c_void {
    die("sbrk");
  }

  old_break as *mut u8
}

/// Requests an anonymous, private, read/write mapping of `len` bytes.
pub unsafe fn mmap_anon(len: usize) -> *mut u8 {
  let addr = unsafe {
    libc::mmap(
      ptr::null_mut(),
      len,
      libc::PROT_READ | libc::PROT_WRITE,
      libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
      -1,
      0,
    )
  };
  if addr == libc::MAP_FAILED {
    die("mmap");
  }

  addr as *mut u8
}

/// Unmaps `len` bytes starting at `addr`.
pub unsafe fn munmap(
  addr: *mut u8,
  len: usize,
) {
  if unsafe { libc::munmap(addr as *mut c_void, len) } != 0 {
    die("munmap");
  }
}

/// Returns the OS page size.
pub fn page_size() -> usize {
  unsafe { libc::sysconf(libc::_SC_PAGESIZE) as usize }
}
