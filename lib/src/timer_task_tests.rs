use core::ffi::{c_int, c_void};
use core::ptr;
use core::sync::atomic::{AtomicU32, Ordering};

use crate::clock;
use crate::timer_task::{
    timer_task_active_count, timer_task_cancel, timer_task_due, timer_task_init,
    timer_task_run_due, timer_task_schedule_ms, timer_task_schedule_ticks,
};

static FIRED: AtomicU32 = AtomicU32::new(0);
static SEQUENCE: AtomicU32 = AtomicU32::new(0);

fn fire(_ctx: *mut c_void) {
    FIRED.fetch_add(1, Ordering::Relaxed);
}

fn fire_tagged(ctx: *mut c_void) {
    let tag = ctx as usize as u32;
    let prev = SEQUENCE.load(Ordering::Relaxed);
    SEQUENCE.store((prev << 4) | tag, Ordering::Relaxed);
}

fn advance_ticks(n: u32) {
    for _ in 0..n {
        clock::clock_tick();
    }
}

pub fn test_timer_one_shot_fires_once() -> c_int {
    timer_task_init();
    FIRED.store(0, Ordering::Relaxed);

    let id = timer_task_schedule_ticks(2, 0, fire, ptr::null_mut());
    if id == 0 {
        return -1;
    }
    if timer_task_due() {
        return -1;
    }

    advance_ticks(2);
    if !timer_task_due() {
        return -1;
    }
    timer_task_run_due();
    timer_task_run_due();

    if FIRED.load(Ordering::Relaxed) != 1 {
        return -1;
    }
    if timer_task_active_count() != 0 {
        return -1;
    }
    0
}

pub fn test_timer_periodic_reschedules() -> c_int {
    timer_task_init();
    FIRED.store(0, Ordering::Relaxed);

    let id = timer_task_schedule_ticks(1, 3, fire, ptr::null_mut());
    if id == 0 {
        return -1;
    }

    advance_ticks(1);
    timer_task_run_due();
    advance_ticks(3);
    timer_task_run_due();

    if FIRED.load(Ordering::Relaxed) != 2 {
        return -1;
    }
    if timer_task_active_count() != 1 {
        return -1;
    }
    if !timer_task_cancel(id) {
        return -1;
    }
    if timer_task_active_count() != 0 {
        return -1;
    }
    0
}

pub fn test_timer_due_order() -> c_int {
    timer_task_init();
    SEQUENCE.store(0, Ordering::Relaxed);

    // Scheduled out of order; the earlier due tick must fire first.
    if timer_task_schedule_ticks(5, 0, fire_tagged, 2 as *mut c_void) == 0 {
        return -1;
    }
    if timer_task_schedule_ticks(2, 0, fire_tagged, 1 as *mut c_void) == 0 {
        return -1;
    }

    advance_ticks(5);
    timer_task_run_due();

    if SEQUENCE.load(Ordering::Relaxed) != 0x12 {
        return -1;
    }
    0
}

pub fn test_timer_cancel_unknown_id() -> c_int {
    timer_task_init();
    if timer_task_cancel(0) {
        return -1;
    }
    if timer_task_cancel(0xDEAD) {
        return -1;
    }
    0
}

pub fn test_timer_ms_conversion_clamps() -> c_int {
    // Sub-tick delays round up to one tick at any frequency.
    if clock::ms_to_ticks(0) != 1 {
        return -1;
    }
    if clock::ms_to_ticks(1) != 1 {
        return -1;
    }

    // At the default 100 Hz, a second is exactly 100 ticks and 1005 ms
    // rounds up to 101.
    let hz = clock::tick_frequency();
    if hz == 100 {
        if clock::ms_to_ticks(1000) != 100 {
            return -1;
        }
        if clock::ms_to_ticks(1005) != 101 {
            return -1;
        }
    }
    0
}

pub fn test_timer_ms_schedule_allocates() -> c_int {
    timer_task_init();
    FIRED.store(0, Ordering::Relaxed);

    let id = timer_task_schedule_ms(10, 0, fire, ptr::null_mut());
    if id == 0 {
        return -1;
    }
    if timer_task_active_count() != 1 {
        return -1;
    }
    timer_task_cancel(id);
    0
}

crate::define_test_suite!(
    timer_task,
    [
        test_timer_one_shot_fires_once,
        test_timer_periodic_reschedules,
        test_timer_due_order,
        test_timer_cancel_unknown_id,
        test_timer_ms_conversion_clamps,
        test_timer_ms_schedule_allocates,
    ]
);
