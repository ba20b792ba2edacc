use core::ffi::{c_int, c_void};
use core::ptr;
use core::sync::atomic::{AtomicU32, Ordering};

use crate::workqueue::{
    WORKQUEUE_SIZE, workqueue_enqueue, workqueue_init, workqueue_pending, workqueue_run,
};

static FIRE_COUNT: AtomicU32 = AtomicU32::new(0);
static ORDER_TRACE: AtomicU32 = AtomicU32::new(0);
static REENTER_FIRED: AtomicU32 = AtomicU32::new(0);

fn count_work(_ctx: *mut c_void) {
    FIRE_COUNT.fetch_add(1, Ordering::Relaxed);
}

fn order_work(ctx: *mut c_void) {
    // Shift the digit in: enqueue order 1,2,3 must read back as 0x123.
    let digit = ctx as usize as u32;
    let prev = ORDER_TRACE.load(Ordering::Relaxed);
    ORDER_TRACE.store((prev << 4) | digit, Ordering::Relaxed);
}

fn reenter_tail(_ctx: *mut c_void) {
    REENTER_FIRED.fetch_add(1, Ordering::Relaxed);
}

fn reenter_head(_ctx: *mut c_void) {
    // An enqueue made while the drain is running must fire in the same
    // drain, after the current closure returns.
    workqueue_enqueue(reenter_tail, ptr::null_mut());
}

pub fn test_workqueue_fires_exactly_once() -> c_int {
    workqueue_init();
    FIRE_COUNT.store(0, Ordering::Relaxed);

    if !workqueue_enqueue(count_work, ptr::null_mut()) {
        return -1;
    }
    if !workqueue_pending() {
        return -1;
    }

    workqueue_run();
    workqueue_run();

    if FIRE_COUNT.load(Ordering::Relaxed) != 1 {
        return -1;
    }
    if workqueue_pending() {
        return -1;
    }
    0
}

pub fn test_workqueue_preserves_order() -> c_int {
    workqueue_init();
    ORDER_TRACE.store(0, Ordering::Relaxed);

    for digit in 1..=3usize {
        if !workqueue_enqueue(order_work, digit as *mut c_void) {
            return -1;
        }
    }
    workqueue_run();

    if ORDER_TRACE.load(Ordering::Relaxed) != 0x123 {
        return -1;
    }
    0
}

pub fn test_workqueue_overflow_returns_false() -> c_int {
    workqueue_init();
    FIRE_COUNT.store(0, Ordering::Relaxed);

    for _ in 0..WORKQUEUE_SIZE {
        if !workqueue_enqueue(count_work, ptr::null_mut()) {
            return -1;
        }
    }
    // Queue is full; the producer must fail, not block or overwrite.
    if workqueue_enqueue(count_work, ptr::null_mut()) {
        return -1;
    }

    workqueue_run();
    if FIRE_COUNT.load(Ordering::Relaxed) != WORKQUEUE_SIZE as u32 {
        return -1;
    }
    0
}

pub fn test_workqueue_reentrant_enqueue() -> c_int {
    workqueue_init();
    REENTER_FIRED.store(0, Ordering::Relaxed);

    if !workqueue_enqueue(reenter_head, ptr::null_mut()) {
        return -1;
    }
    workqueue_run();

    if REENTER_FIRED.load(Ordering::Relaxed) != 1 {
        return -1;
    }
    0
}

crate::define_test_suite!(
    workqueue,
    [
        test_workqueue_fires_exactly_once,
        test_workqueue_preserves_order,
        test_workqueue_overflow_returns_false,
        test_workqueue_reentrant_enqueue,
    ]
);
