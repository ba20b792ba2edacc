//! Bounded deferred-work queue.
//!
//! IRQ handlers push `(fn, ctx)` pairs; the main loop drains them with
//! interrupts enabled. Both ends take the interrupts-disabled critical
//! section, so producer and consumer may live in any context. Producers
//! never block: a full queue fails the enqueue and the caller decides
//! whether to coalesce or drop.

use core::ffi::c_void;
use core::ptr;

use crate::ring_buffer::RingBuffer;
use crate::spinlock::IrqMutex;

/// Closures own their `ctx`; the queue never touches it.
pub type WorkFn = fn(ctx: *mut c_void);

pub const WORKQUEUE_SIZE: usize = 64;

#[derive(Clone, Copy)]
struct WorkItem {
    func: Option<WorkFn>,
    ctx: *mut c_void,
}

impl WorkItem {
    const fn empty() -> Self {
        Self {
            func: None,
            ctx: ptr::null_mut(),
        }
    }
}

// SAFETY: items only transit the queue; ownership of ctx stays with the
// closure that consumes it.
unsafe impl Send for WorkItem {}

static QUEUE: IrqMutex<RingBuffer<WorkItem, WORKQUEUE_SIZE>> =
    IrqMutex::new(RingBuffer::new_with(WorkItem::empty()));

pub fn workqueue_init() {
    QUEUE.lock().reset();
}

/// Queue `func(ctx)` for the next drain. Returns false when the queue is
/// full; IRQ callers must not busy-loop on that.
pub fn workqueue_enqueue(func: WorkFn, ctx: *mut c_void) -> bool {
    QUEUE.lock().try_push(WorkItem {
        func: Some(func),
        ctx,
    })
}

pub fn workqueue_pending() -> bool {
    !QUEUE.lock().is_empty()
}

/// Drain until empty, running each closure with interrupts enabled.
/// Re-entrant enqueues made by a running closure are picked up by the same
/// drain, in order.
pub fn workqueue_run() {
    loop {
        let item = QUEUE.lock().try_pop();
        let Some(item) = item else {
            break;
        };
        if let Some(func) = item.func {
            func(item.ctx);
        }
    }
}
