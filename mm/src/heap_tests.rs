use core::alloc::{GlobalAlloc, Layout};
use core::ffi::c_int;

use crate::kernel_heap::KernelHeap;

const ARENA_SIZE: usize = 8192;

#[repr(align(16))]
struct Arena([u8; ARENA_SIZE]);

static mut TEST_ARENA: Arena = Arena([0; ARENA_SIZE]);

fn fresh_heap() -> KernelHeap {
    let heap = KernelHeap::new();
    unsafe {
        let base = &raw mut TEST_ARENA.0 as *mut u8 as usize;
        heap.init(base, ARENA_SIZE);
    }
    heap
}

pub fn test_heap_alloc_free_restores_space() -> c_int {
    let heap = fresh_heap();
    let before = heap.free_bytes();

    let layout = Layout::from_size_align(256, 8).unwrap();
    let a = unsafe { heap.alloc(layout) };
    if a.is_null() {
        return -1;
    }
    if heap.free_bytes() >= before {
        return -1;
    }

    unsafe { heap.dealloc(a, layout) };
    if heap.free_bytes() != before {
        return -1;
    }
    0
}

pub fn test_heap_coalesces_neighbours() -> c_int {
    let heap = fresh_heap();
    let before = heap.free_bytes();
    let layout = Layout::from_size_align(128, 8).unwrap();

    let a = unsafe { heap.alloc(layout) };
    let b = unsafe { heap.alloc(layout) };
    let c = unsafe { heap.alloc(layout) };
    if a.is_null() || b.is_null() || c.is_null() {
        return -1;
    }

    // Free out of order; the free list must merge back to one region.
    unsafe {
        heap.dealloc(a, layout);
        heap.dealloc(c, layout);
        heap.dealloc(b, layout);
    }
    if heap.free_bytes() != before {
        return -1;
    }

    // A single allocation close to the arena size must succeed again.
    let big = Layout::from_size_align(before - 64, 8).unwrap();
    let p = unsafe { heap.alloc(big) };
    if p.is_null() {
        return -1;
    }
    unsafe { heap.dealloc(p, big) };
    0
}

pub fn test_heap_respects_alignment() -> c_int {
    let heap = fresh_heap();
    let layout = Layout::from_size_align(48, 64).unwrap();

    let p = unsafe { heap.alloc(layout) };
    if p.is_null() {
        return -1;
    }
    if (p as usize) % 64 != 0 {
        return -1;
    }
    unsafe { heap.dealloc(p, layout) };
    0
}

pub fn test_heap_exhaustion_returns_null() -> c_int {
    let heap = fresh_heap();
    let layout = Layout::from_size_align(ARENA_SIZE * 2, 8).unwrap();
    let p = unsafe { heap.alloc(layout) };
    if !p.is_null() {
        return -1;
    }
    0
}

orion_lib::define_test_suite!(
    kernel_heap,
    [
        test_heap_alloc_free_restores_space,
        test_heap_coalesces_neighbours,
        test_heap_respects_alignment,
        test_heap_exhaustion_returns_null,
    ]
);
