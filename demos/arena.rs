use std::{io::Read, ptr};

use brkalloc::{Arena, MMAP_THRESHOLD, print_alloc};
use libc::sbrk;

/// Waits until the user presses ENTER.
/// Useful when you want to inspect memory state with tools like `pmap`,
/// `htop`, `gdb`, or just visually track how allocations change the program
/// break.
fn block_until_enter_pressed() {
  println!("\n>>> Press ENTER to continue...");
  let _ = std::io::stdin().bytes().next();
}

/// Prints the current program break using `sbrk(0)`.
/// The program break is the upper boundary of the heap managed via brk/sbrk.
unsafe fn print_program_break(label: &str) {
  println!(
    "[{}] PID = {}, program break (sbrk(0)) = {:?}",
    label,
    std::process::id(),
    unsafe { sbrk(0) },
  );
}

fn main() {
  let mut arena = Arena::new();

  unsafe {
    // Initial heap state
    print_program_break("start");
    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 1) First allocation. This preallocates the whole 128 KiB pool in one
    //    sbrk call and carves the request out of it.
    // --------------------------------------------------------------------
    print_program_break("before first alloc");

    let first = arena.allocate(100);
    println!("\n[1] Allocate 100 bytes (preallocates the pool)");
    print_alloc(100, first);

    let first_ptr = first as *mut u32;
    first_ptr.write(0xDEADBEEF);
    println!("[1] Value written to first = 0x{:X}", first_ptr.read());

    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 2) More small allocations. The program break does not move: they all
    //    come from the pool.
    // --------------------------------------------------------------------
    let second = arena.allocate(64);
    let third = arena.allocate(64);
    println!("\n[2] Allocate 64 + 64 bytes from the pool");
    print_alloc(64, second);
    print_alloc(64, third);

    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 3) Release and reuse. Freeing `second` and allocating again returns
    //    the same address.
    // --------------------------------------------------------------------
    arena.release(second);
    println!("\n[3] Released second block at {:?}", second);

    let reused = arena.allocate(48);
    print_alloc(48, reused);
    println!(
      "[3] reused == second? {}",
      if reused == second {
        "Yes, it reused the freed block"
      } else {
        "No, it allocated somewhere else"
      }
    );

    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 4) Resize in place. Shrinking splits the surplus off; the pointer
    //    does not change.
    // --------------------------------------------------------------------
    let big = arena.allocate(1000);
    println!("\n[4] Allocate 1000 bytes, then resize to 100");
    print_alloc(1000, big);

    let shrunk = arena.resize(big, 100);
    println!(
      "[4] shrunk == big? {} (resize split the block in place)",
      shrunk == big
    );

    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 5) Zeroed allocation. Page-sized requests get their own mapping.
    // --------------------------------------------------------------------
    let zeroed = arena.zero_allocate(1024, 4);
    println!("\n[5] zero_allocate(1024, 4)");
    print_alloc(4096, zeroed);

    let all_zero = (0..4096).all(|i| *zeroed.add(i) == 0);
    println!("[5] all 4096 bytes zero? {}", all_zero);
    arena.release(zeroed);

    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 6) A mapped block. Requests at the threshold bypass the heap
    //    entirely; note that the program break does not move.
    // --------------------------------------------------------------------
    print_program_break("before mapped alloc");

    let mapped = arena.allocate(MMAP_THRESHOLD);
    println!("\n[6] Allocate {} bytes (anonymous mapping)", MMAP_THRESHOLD);
    print_alloc(MMAP_THRESHOLD, mapped);

    ptr::write_bytes(mapped, 0xAB, MMAP_THRESHOLD);
    println!("[6] Initialized the mapping with 0xAB");

    print_program_break("after mapped alloc");

    arena.release(mapped);
    println!("[6] Released (unmapped) the block at {:?}", mapped);

    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 7) End of demo. Heap blocks are never returned to the OS; the kernel
    //    reclaims everything when the process exits.
    // --------------------------------------------------------------------
    println!("\n[7] End of example. Process will exit and the OS will reclaim all memory.");
  }
}
