//! # brkalloc - A Free-List Memory Allocator Library
//!
//! This crate provides a user-space **general-purpose allocator** that
//! replaces the system allocation routines for a single-threaded process,
//! managing memory through the `sbrk` and `mmap` system calls.
//!
//! ## Overview
//!
//! Small requests are carved out of a contiguous heap grown with `sbrk` and
//! tracked in a free list; large requests get their own anonymous mapping:
//!
//! ```text
//!   Request routing:
//!
//!                      align8(n) + header < threshold ?
//!                           │                  │
//!                          yes                 no
//!                           │                  │
//!                           ▼                  ▼
//!   ┌────────────────────────────────┐   ┌──────────────────┐
//!   │        CONTIGUOUS HEAP         │   │ ANONYMOUS MAPPING│
//!   │                                │   │                  │
//!   │  ┌─────┬─────┬─────┬───────┐  │   │  ┌────────────┐  │
//!   │  │ A1  │free │ A2  │ free  │  │   │  │     M1     │  │
//!   │  └─────┴─────┴─────┴───────┘  │   │  └────────────┘  │
//!   │        ▲              ▲       │   │   lives alone,   │
//!   │     reused on      program    │   │   unmapped on    │
//!   │     best fit        break     │   │   release        │
//!   └────────────────────────────────┘   └──────────────────┘
//! ```
//!
//! Released heap blocks stay in the list and are reused: the search merges
//! adjacent free blocks, picks the best fit and splits off any surplus. The
//! heap itself is never shrunk back to the OS.
//!
//! ## Crate Structure
//!
//! ```text
//!   brkalloc
//!   ├── align      - align8! macro (8-byte grain)
//!   ├── block      - Block header and payload arithmetic (internal)
//!   ├── sys        - sbrk / mmap / munmap wrappers (internal)
//!   └── arena      - Arena: allocate, zero_allocate, resize, release
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use brkalloc::Arena;
//!
//! fn main() {
//!     let mut arena = Arena::new();
//!
//!     unsafe {
//!         // Allocate memory for a u64
//!         let ptr = arena.allocate(size_of::<u64>()) as *mut u64;
//!
//!         // Use the memory
//!         *ptr = 42;
//!         println!("Value: {}", *ptr);
//!
//!         // Grow it, then free it
//!         let ptr = arena.resize(ptr as *mut u8, 64);
//!         arena.release(ptr);
//!     }
//! }
//! ```
//!
//! ## Limitations
//!
//! - **Single-threaded only**: No synchronization primitives
//! - **Exclusive heap ownership**: The arena must be the only user of `sbrk`
//!   while it runs
//! - **Fixed 8-byte alignment**: No support for wider alignment requests
//! - **Unix-only**: Requires `libc`, `sbrk` and `mmap` (POSIX systems)
//!
//! ## Safety
//!
//! This crate is inherently unsafe as it deals with raw memory management.
//! All allocation and deallocation operations require `unsafe` blocks.

pub mod align;
mod arena;
mod block;
mod sys;

pub use arena::{Arena, MMAP_THRESHOLD, print_alloc};
