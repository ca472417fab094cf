//! # Heap Arena
//!
//! The arena manages two kinds of memory behind a single malloc-style
//! interface:
//!
//! - **Heap blocks**, carved out of the contiguous region grown with `sbrk`.
//!   They live in a singly-linked list, are reused after release, and are
//!   never returned to the kernel.
//! - **Mapped blocks**, each backed by its own anonymous `mmap`. They are
//!   never linked into the list and are unmapped on release.
//!
//! Which kind serves a request is decided by comparing the aligned request
//! against a threshold: [`MMAP_THRESHOLD`] for [`Arena::allocate`] and
//! [`Arena::resize`], the OS page size for [`Arena::zero_allocate`].
//!
//! ## The heap list
//!
//! Heap blocks are contiguous in memory and in list order; the byte after a
//! block's payload is its successor's header:
//!
//! ```text
//!   Arena
//!   ┌─────────┐
//!   │ head ───┼──┐
//!   │ tail ───┼──┼──────────────────────────────────────────┐
//!   └─────────┘  │                                          │
//!                ▼                                          ▼
//!   ┌──────┬─────────┬──────┬─────────┬──────┬───────────────────────┐
//!   │ hdr  │ payload │ hdr  │ payload │ hdr  │ payload               │
//!   │ 104  │         │ 64   │         │ ...  │                       │
//!   │ Alloc│         │ Free │         │ Alloc│                       │
//!   └──────┴─────────┴──────┴─────────┴──────┴───────────────────────┘
//!   ◄──────────────── heap grows this direction (sbrk) ─────────────►
//! ```
//!
//! The very first heap-bound request preallocates a single block whose total
//! footprint is exactly `MMAP_THRESHOLD`, and carves the request out of it.
//! Every later small request is served from this pool until it runs dry, so
//! the program break moves rarely.
//!
//! ## Reuse
//!
//! `release` only flips a heap block to `Free`; merging of neighbouring free
//! blocks is deferred until the next search walks the list:
//!
//! ```text
//!   before coalescing        after coalescing         after best-fit split
//!   [A][F 64][F 64][A]  ──►  [A][F 64+H+64][A]   ──►  [A][Alloc n][F][A]
//! ```
//!
//! When no free block fits but the list ends in a free block, that block is
//! grown in place by moving the break just far enough - the only operation
//! that enlarges a heap block without relocating it.
//!
//! ## Safety
//!
//! All of the raw-pointer arithmetic of the allocator lives in this module
//! and [`crate::block`]. The public operations are unsafe: callers must only
//! pass payload pointers previously returned by the same arena, must not use
//! a payload after releasing it, and must serialize calls externally if the
//! arena is shared across threads (the program break is process-global).

use std::ptr;

use libc::sbrk;

use crate::{
  align8,
  block::{Block, HEADER_STRIDE, Status},
  sys,
};

/// Requests whose total footprint (payload plus header stride) meets or
/// exceeds this value are served by an independent anonymous mapping instead
/// of the contiguous heap.
pub const MMAP_THRESHOLD: usize = 131072;

/// Debug helper function that prints allocation information.
///
/// Outputs the request size, the returned address, and the current program
/// break position for debugging purposes.
///
/// # Safety
///
/// This function calls `sbrk(0)` which is always safe, but the function is
/// marked unsafe to match the allocator's API conventions.
pub unsafe fn print_alloc(
  size: usize,
  addr: *mut u8,
) {
  println!(
    "Allocated {} bytes, address = {:?}, program break = {:?}",
    size,
    addr,
    unsafe { sbrk(0) }
  );
}

/// A best-fit free-list allocator over `sbrk` and anonymous mappings.
///
/// The arena tracks only the heap list; mapped blocks are self-contained and
/// vanish on release.
///
/// ```text
///   ┌───────────────────────────────────────────────────────────┐
///   │                         Arena                             │
///   │                                                           │
///   │   head ─────────►┌─────────┐                              │
///   │                  │ Block 1 │──────►┌─────────┐            │
///   │                  └─────────┘       │ Block 2 │──► null    │
///   │   tail ──────────────────────────► └─────────┘            │
///   │                                                           │
///   └───────────────────────────────────────────────────────────┘
/// ```
///
/// Both pointers are null until the first heap-bound allocation preallocates
/// the pool; afterwards they are both non-null for the rest of the process.
///
/// # Thread Safety
///
/// This allocator is **NOT** thread-safe. For multi-threaded usage, external
/// synchronization (e.g., a `Mutex`) is required.
pub struct Arena {
  /// First (lowest-addressed) block of the heap list.
  head: *mut Block,

  /// Last block of the heap list. Its payload ends at the program break, so
  /// it is the only block that can be grown in place.
  tail: *mut Block,
}

impl Arena {
  /// Creates a new, empty arena. No memory is reserved until the first
  /// allocation.
  pub fn new() -> Self {
    Self {
      head: ptr::null_mut(),
      tail: ptr::null_mut(),
    }
  }

  /// Merges every run of adjacent free blocks into a single free block.
  ///
  /// Walks the list once from `head`. Whenever the current block and its
  /// successor are both free, the successor is spliced out and its footprint
  /// (header included) is folded into the current block's size; the scan
  /// stays on the current block so runs of three or more fuse in one pass.
  ///
  /// ```text
  ///   [F 64]──►[F 64]──►[F 32]──►[A]      [F 64+24+64+24+32]──►[A]
  ///      └────────┴───────┘          ──►
  ///        one fused block
  /// ```
  ///
  /// The walk ends on the last reachable block, which becomes `tail`.
  unsafe fn coalesce(&mut self) {
    unsafe {
      if self.head.is_null() {
        return;
      }

      let mut current = self.head;
      loop {
        let next = (*current).next;
        if next.is_null() {
          break;
        }

        if (*current).status == Status::Free && (*next).status == Status::Free {
          // The successor's header becomes reclaimed payload.
          (*current).size += HEADER_STRIDE + (*next).size;
          (*current).next = (*next).next;
        } else {
          current = next;
        }
      }

      self.tail = current;
    }
  }

  /// Finds the free block whose size is the smallest value that still fits
  /// `size` bytes, ties broken by earlier list position.
  ///
  /// Adjacent free blocks are coalesced first, so the search sees the
  /// largest contiguous regions the list can offer. When the winner leaves
  /// room for a non-degenerate remainder (a trailing header plus at least
  /// one aligned payload byte), it is split before being returned.
  ///
  /// `size` must already be aligned to the 8-byte grain. Returns null when
  /// no free block is large enough.
  unsafe fn find_best(
    &mut self,
    size: usize,
  ) -> *mut Block {
    unsafe {
      self.coalesce();

      let mut best: *mut Block = ptr::null_mut();
      let mut current = self.head;
      while !current.is_null() {
        if (*current).status == Status::Free
          && (*current).size >= size
          && (best.is_null() || (*current).size < (*best).size)
        {
          best = current;
        }
        current = (*current).next;
      }

      if !best.is_null() && (*best).size > size + HEADER_STRIDE {
        self.split(best, size);
      }

      best
    }
  }

  /// Carves `block` in two: the first part keeps `size` payload bytes, the
  /// remainder becomes a free block linked right after it.
  ///
  /// ```text
  ///   before:  [ hdr │ size_old ..................... ]──► next
  ///   after:   [ hdr │ size ][ hdr │ size_old-size-H ]──► next
  ///                            Free
  /// ```
  ///
  /// `size` must be aligned and `block.size` must exceed `size` by more than
  /// one header stride, so the remainder's payload is non-empty.
  unsafe fn split(
    &mut self,
    block: *mut Block,
    size: usize,
  ) {
    unsafe {
      let slot = size + HEADER_STRIDE;

      let rest = (block as *mut u8).add(slot) as *mut Block;
      (*rest).size = align8!((*block).size - slot);
      (*rest).status = Status::Free;
      (*rest).next = (*block).next;

      (*block).size = size;
      (*block).next = rest;

      if self.tail == block {
        self.tail = rest;
      }
    }
  }

  /// Grows the free tail block in place to `size` payload bytes by moving
  /// the program break forward, and hands it out as allocated.
  ///
  /// The tail's payload ends at the break, so only the missing bytes are
  /// requested. `size` must be aligned and strictly larger than the tail's
  /// current size.
  unsafe fn expand_tail(
    &mut self,
    size: usize,
  ) {
    unsafe {
      let tail = self.tail;

      sys::heap_extend(align8!(size - (*tail).size));

      (*tail).size = size;
      (*tail).status = Status::Alloc;
    }
  }

  /// Obtains a fresh block of `align8(size)` payload bytes from the OS.
  ///
  /// Requests below `threshold` extend the program break; the block becomes
  /// a heap block (status `Alloc`) that the caller is expected to link into
  /// the list. Anything else gets its own anonymous mapping (status
  /// `Mapped`) and stays out of the list. Either way the block's `next` is
  /// null and a syscall failure aborts the process.
  unsafe fn create_block(
    size: usize,
    threshold: usize,
  ) -> *mut Block {
    unsafe {
      let size = align8!(size);

      let block = if size < threshold {
        let block = sys::heap_extend(size + HEADER_STRIDE) as *mut Block;
        (*block).status = Status::Alloc;
        block
      } else {
        let block = sys::mmap_anon(size + HEADER_STRIDE) as *mut Block;
        (*block).status = Status::Mapped;
        block
      };

      (*block).size = size;
      (*block).next = ptr::null_mut();

      block
    }
  }

  /// Reserves the initial heap pool: a single block whose total footprint is
  /// exactly [`MMAP_THRESHOLD`], becoming both `head` and `tail`.
  ///
  /// Runs once, on the first heap-bound allocation. Later small requests are
  /// carved out of this block instead of moving the break again.
  unsafe fn prealloc(&mut self) -> *mut Block {
    unsafe {
      let block = Self::create_block(MMAP_THRESHOLD - HEADER_STRIDE, MMAP_THRESHOLD);

      self.head = block;
      self.tail = block;

      block
    }
  }

  /// Threshold-parameterized allocation path shared by [`Arena::allocate`]
  /// and [`Arena::zero_allocate`].
  ///
  /// In order, falling through on failure:
  ///
  /// 1. zero-size requests get a null payload;
  /// 2. heap-bound requests search the free list (best fit);
  /// 3. a free but too-small tail is expanded in place;
  /// 4. an empty arena preallocates the pool and carves the request from it;
  /// 5. everything else gets a fresh block - from the break (linked as the
  ///    new tail) or from a mapping (left out of the list).
  unsafe fn allocate_with(
    &mut self,
    size: usize,
    threshold: usize,
  ) -> *mut u8 {
    if size == 0 {
      return ptr::null_mut();
    }

    unsafe {
      let size = align8!(size);

      if !self.head.is_null() && size < threshold {
        let found = self.find_best(size);
        if !found.is_null() {
          (*found).status = Status::Alloc;
          return Block::payload(found);
        }
      }

      if !self.tail.is_null()
        && (*self.tail).status == Status::Free
        && (*self.tail).size < size
        && size < threshold - HEADER_STRIDE
      {
        self.expand_tail(size);
        return Block::payload(self.tail);
      }

      if self.head.is_null() && size < threshold - HEADER_STRIDE {
        let block = self.prealloc();
        if (*block).size > size + HEADER_STRIDE {
          self.split(block, size);
        }
        return Block::payload(block);
      }

      let block = Self::create_block(size, threshold - HEADER_STRIDE);
      if (*block).status == Status::Alloc {
        if self.head.is_null() {
          self.head = block;
          self.tail = block;
        } else {
          (*self.tail).next = block;
          self.tail = block;
        }
      }

      Block::payload(block)
    }
  }

  /// Allocates at least `size` bytes and returns a pointer to the payload,
  /// or null when `size` is zero.
  ///
  /// The payload is 8-byte aligned and its contents are indeterminate.
  /// Requests whose footprint reaches [`MMAP_THRESHOLD`] are served by an
  /// anonymous mapping, everything smaller by the heap list.
  ///
  /// # Safety
  ///
  /// The returned pointer is valid until passed to [`Arena::release`] or
  /// grown through [`Arena::resize`]. The arena must not be entered from
  /// multiple threads concurrently.
  pub unsafe fn allocate(
    &mut self,
    size: usize,
  ) -> *mut u8 {
    unsafe { self.allocate_with(size, MMAP_THRESHOLD) }
  }

  /// Allocates zeroed storage for `count` elements of `size` bytes each.
  ///
  /// Returns null when the product is zero or does not fit in `usize`.
  /// Unlike [`Arena::allocate`], the heap-vs-mapping decision uses the OS
  /// page size as the threshold, so anything from about a page up gets its
  /// own mapping.
  ///
  /// # Safety
  ///
  /// Same contract as [`Arena::allocate`].
  pub unsafe fn zero_allocate(
    &mut self,
    count: usize,
    size: usize,
  ) -> *mut u8 {
    let total = match count.checked_mul(size) {
      Some(total) => total,
      None => return ptr::null_mut(),
    };

    unsafe {
      let payload = self.allocate_with(total, sys::page_size());
      if !payload.is_null() {
        ptr::write_bytes(payload, 0, total);
      }

      payload
    }
  }

  /// Resizes the allocation behind `payload` to at least `size` bytes,
  /// returning `payload` itself when the block could be adjusted in place
  /// and a relocated pointer otherwise.
  ///
  /// A null `payload` behaves like [`Arena::allocate`]; `size == 0` behaves
  /// like [`Arena::release`] and returns null. Resizing an already released
  /// block returns null.
  ///
  /// The in-place paths, tried in order:
  ///
  /// ```text
  ///   grow at tail     [..........][ tail ]│break   ──► break moves right
  ///   absorb forward   [ b ][ Free ][ A ]          ──► [ b + Free ][ A ]
  ///   shrink w/ split  [ b oversized        ]      ──► [ b ][ Free ]
  ///   small surplus    [ b slightly oversized ]    ──► unchanged
  /// ```
  ///
  /// Only when none applies is a fresh block allocated, the data copied and
  /// the old block released. Growing past [`MMAP_THRESHOLD`] always
  /// relocates: a footprint that large belongs to the mapped regime and
  /// cannot be reached by the list operations.
  ///
  /// # Safety
  ///
  /// `payload` must be null or a pointer previously returned by this arena
  /// and not yet released. After a call that returns a different pointer,
  /// the old pointer must no longer be used.
  pub unsafe fn resize(
    &mut self,
    payload: *mut u8,
    size: usize,
  ) -> *mut u8 {
    unsafe {
      if payload.is_null() {
        return self.allocate(size);
      }
      if size == 0 {
        self.release(payload);
        return ptr::null_mut();
      }

      let block = Block::from_payload(payload);
      if (*block).status == Status::Free {
        return ptr::null_mut();
      }

      let size = align8!(size);
      let new_total = size + HEADER_STRIDE;
      let old_size = (*block).size;
      let mut old_total = Block::total(block);

      // Grow in place at the tail.
      if block == self.tail && old_total < new_total && size < MMAP_THRESHOLD - HEADER_STRIDE {
        self.expand_tail(size);
        return payload;
      }

      // Absorb following free blocks while growing, as long as the merged
      // footprint stays within the heap regime.
      if old_total < new_total && new_total < MMAP_THRESHOLD {
        loop {
          let next = (*block).next;
          if next.is_null() || (*next).status != Status::Free {
            break;
          }

          let merged = old_total + HEADER_STRIDE + (*next).size;
          if merged > MMAP_THRESHOLD {
            break;
          }

          (*block).size += HEADER_STRIDE + (*next).size;
          (*block).next = (*next).next;
          if self.tail == next {
            self.tail = block;
          }

          old_total = merged;
          if old_total >= new_total {
            break;
          }
        }
      }

      if old_total == new_total {
        return payload;
      }

      // Shrink with room for a remainder block.
      if old_total > new_total + HEADER_STRIDE {
        if (*block).status == Status::Mapped {
          // Mapped blocks cannot be split in place. The shrink guard
          // guarantees the copy stays within the old mapping.
          debug_assert!(new_total < old_total);

          let moved = self.allocate(size);
          ptr::copy_nonoverlapping(payload, moved, size);
          self.release(payload);
          return moved;
        }

        self.split(block, size);
        return payload;
      }

      // Shrink whose surplus is too small to split off; waste it internally.
      if old_total > new_total {
        return payload;
      }

      // Relocate. Only the pre-resize payload holds caller data, and it is
      // always shorter than the new block (relocation is a growth path).
      let moved = self.allocate(size);
      ptr::copy_nonoverlapping(payload, moved, old_size);
      if moved != payload {
        self.release(payload);
      }

      moved
    }
  }

  /// Releases the allocation behind `payload`. A null input is a no-op.
  ///
  /// Heap blocks are only flipped to `Free` and stay in the list for reuse;
  /// merging with free neighbours happens lazily, on the next search.
  /// Mapped blocks are unmapped immediately and cease to exist. Releasing a
  /// heap block twice leaves it `Free`.
  ///
  /// # Safety
  ///
  /// `payload` must be null or a pointer previously returned by this arena.
  /// The payload must not be read or written afterwards.
  pub unsafe fn release(
    &mut self,
    payload: *mut u8,
  ) {
    if payload.is_null() {
      return;
    }

    unsafe {
      let block = Block::from_payload(payload);
      match (*block).status {
        Status::Alloc => (*block).status = Status::Free,
        Status::Mapped => sys::munmap(block as *mut u8, Block::total(block)),
        Status::Free => {}
      }
    }
  }
}
