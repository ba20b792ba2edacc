//! Kernel heap: first-fit free-list allocator.
//!
//! The kernel binary installs one instance as `#[global_allocator]`, fed a
//! fixed region above the image at boot. Frees coalesce with address-ordered
//! insertion, so the long-lived pattern of the process layer (stacks and
//! user images allocated and released across exec/reap cycles) does not
//! fragment the arena permanently.

use core::alloc::{GlobalAlloc, Layout};
use core::ptr;

use orion_lib::IrqMutex;

const MIN_BLOCK: usize = core::mem::size_of::<FreeBlock>();

/// Free-list node stored in the free block itself.
#[repr(C)]
struct FreeBlock {
    size: usize,
    next: *mut FreeBlock,
}

struct HeapInner {
    head: *mut FreeBlock,
    start: usize,
    end: usize,
}

// SAFETY: the free list only references memory inside the arena handed to
// `init`, and every access happens under the IrqMutex.
unsafe impl Send for HeapInner {}

pub struct KernelHeap {
    inner: IrqMutex<HeapInner>,
}

impl KernelHeap {
    pub const fn new() -> Self {
        Self {
            inner: IrqMutex::new(HeapInner {
                head: ptr::null_mut(),
                start: 0,
                end: 0,
            }),
        }
    }

    /// Hand the allocator its arena. Called once, before the first
    /// allocation.
    ///
    /// # Safety
    ///
    /// `start..start+size` must be unused, writable, identity-mapped
    /// memory that stays reserved for the heap forever.
    pub unsafe fn init(&self, start: usize, size: usize) {
        let aligned = (start + MIN_BLOCK - 1) & !(MIN_BLOCK - 1);
        let size = size.saturating_sub(aligned - start) & !(MIN_BLOCK - 1);
        if size < MIN_BLOCK {
            return;
        }

        let block = aligned as *mut FreeBlock;
        (*block).size = size;
        (*block).next = ptr::null_mut();

        let mut inner = self.inner.lock();
        inner.head = block;
        inner.start = aligned;
        inner.end = aligned + size;
    }

    /// Bytes currently on the free list. Diagnostics only.
    pub fn free_bytes(&self) -> usize {
        let inner = self.inner.lock();
        let mut total = 0;
        let mut cur = inner.head;
        while !cur.is_null() {
            unsafe {
                total += (*cur).size;
                cur = (*cur).next;
            }
        }
        total
    }
}

fn effective_size(layout: Layout) -> usize {
    let size = layout.size().max(MIN_BLOCK);
    (size + MIN_BLOCK - 1) & !(MIN_BLOCK - 1)
}

unsafe impl GlobalAlloc for KernelHeap {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let want = effective_size(layout);
        let align = layout.align().max(MIN_BLOCK);

        let mut inner = self.inner.lock();
        let mut prev: *mut FreeBlock = ptr::null_mut();
        let mut cur = inner.head;

        while !cur.is_null() {
            let addr = cur as usize;
            let aligned = (addr + align - 1) & !(align - 1);
            let pad = aligned - addr;
            let total = (*cur).size;

            // Take a block only when the alignment padding is zero or big
            // enough to stay a free block of its own. Sub-MIN_BLOCK tail
            // slivers are left unrecorded rather than tracked.
            let fits = total >= pad + want && (pad == 0 || pad >= MIN_BLOCK);
            if !fits {
                prev = cur;
                cur = (*cur).next;
                continue;
            }

            let next = (*cur).next;
            let remain = total - pad - want;

            if pad >= MIN_BLOCK {
                (*cur).size = pad;
                if remain >= MIN_BLOCK {
                    let tail = (aligned + want) as *mut FreeBlock;
                    (*tail).size = remain;
                    (*tail).next = next;
                    (*cur).next = tail;
                } else {
                    (*cur).next = next;
                }
            } else if remain >= MIN_BLOCK {
                let tail = (aligned + want) as *mut FreeBlock;
                (*tail).size = remain;
                (*tail).next = next;
                if prev.is_null() {
                    inner.head = tail;
                } else {
                    (*prev).next = tail;
                }
            } else if prev.is_null() {
                inner.head = next;
            } else {
                (*prev).next = next;
            }

            return aligned as *mut u8;
        }

        ptr::null_mut()
    }

    unsafe fn dealloc(&self, ptr_in: *mut u8, layout: Layout) {
        if ptr_in.is_null() {
            return;
        }
        let size = effective_size(layout);
        let addr = ptr_in as usize;

        let mut inner = self.inner.lock();
        debug_assert!(addr >= inner.start && addr + size <= inner.end);

        // Insert address-ordered, then merge with both neighbours.
        let mut prev: *mut FreeBlock = ptr::null_mut();
        let mut cur = inner.head;
        while !cur.is_null() && (cur as usize) < addr {
            prev = cur;
            cur = (*cur).next;
        }

        let block = addr as *mut FreeBlock;
        (*block).size = size;
        (*block).next = cur;

        if !cur.is_null() && addr + size == cur as usize {
            (*block).size += (*cur).size;
            (*block).next = (*cur).next;
        }

        if prev.is_null() {
            inner.head = block;
        } else if (prev as usize) + (*prev).size == addr {
            (*prev).size += (*block).size;
            (*prev).next = (*block).next;
        } else {
            (*prev).next = block;
        }
    }
}
