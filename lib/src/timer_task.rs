//! One-shot and periodic timer tasks.
//!
//! A small fixed table of `(due_tick, interval, fn, ctx)` entries. The PIT
//! tail checks [`timer_task_due`] and the main loop fires due entries via
//! [`timer_task_run_due`], one at a time, with interrupts enabled during the
//! callback. Tick comparisons are wrap-safe.

use core::ffi::c_void;
use core::ptr;

use crate::clock::{self, ticks_elapsed};
use crate::spinlock::IrqMutex;

pub type TimerTaskFn = fn(ctx: *mut c_void);

pub const MAX_TIMER_TASKS: usize = 32;

#[derive(Clone, Copy)]
struct TimerTask {
    id: u32,
    due_tick: u32,
    interval_ticks: u32,
    func: Option<TimerTaskFn>,
    ctx: *mut c_void,
    active: bool,
}

impl TimerTask {
    const fn empty() -> Self {
        Self {
            id: 0,
            due_tick: 0,
            interval_ticks: 0,
            func: None,
            ctx: ptr::null_mut(),
            active: false,
        }
    }
}

unsafe impl Send for TimerTask {}

struct TimerTable {
    tasks: [TimerTask; MAX_TIMER_TASKS],
    /// Id generator. Skips zero and ids still active in the table.
    next_id: u32,
}

impl TimerTable {
    const fn new() -> Self {
        Self {
            tasks: [TimerTask::empty(); MAX_TIMER_TASKS],
            next_id: 1,
        }
    }

    fn issue_id(&mut self) -> u32 {
        loop {
            let id = self.next_id;
            self.next_id = self.next_id.wrapping_add(1);
            if self.next_id == 0 {
                self.next_id = 1;
            }
            if id != 0 && !self.tasks.iter().any(|t| t.active && t.id == id) {
                return id;
            }
        }
    }
}

static TABLE: IrqMutex<TimerTable> = IrqMutex::new(TimerTable::new());

pub fn timer_task_init() {
    let mut table = TABLE.lock();
    table.tasks = [TimerTask::empty(); MAX_TIMER_TASKS];
    table.next_id = 1;
}

/// Schedule `func(ctx)` after `delay_ticks`, repeating every
/// `interval_ticks` (0 = one-shot). Returns the task id, or 0 when the
/// table is full.
pub fn timer_task_schedule_ticks(
    delay_ticks: u32,
    interval_ticks: u32,
    func: TimerTaskFn,
    ctx: *mut c_void,
) -> u32 {
    let delay = if delay_ticks == 0 { 1 } else { delay_ticks };

    let mut table = TABLE.lock();
    let Some(slot) = table.tasks.iter().position(|t| !t.active) else {
        return 0;
    };
    let id = table.issue_id();
    table.tasks[slot] = TimerTask {
        id,
        due_tick: clock::ticks().wrapping_add(delay),
        interval_ticks,
        func: Some(func),
        ctx,
        active: true,
    };
    id
}

/// Millisecond flavour: converts with the live PIT frequency, rounding up
/// and clamping to at least one tick.
pub fn timer_task_schedule_ms(
    delay_ms: u32,
    interval_ms: u32,
    func: TimerTaskFn,
    ctx: *mut c_void,
) -> u32 {
    let delay_ticks = clock::ms_to_ticks(delay_ms);
    let interval_ticks = if interval_ms != 0 {
        clock::ms_to_ticks(interval_ms)
    } else {
        0
    };
    timer_task_schedule_ticks(delay_ticks, interval_ticks, func, ctx)
}

pub fn timer_task_cancel(id: u32) -> bool {
    if id == 0 {
        return false;
    }
    let mut table = TABLE.lock();
    for task in table.tasks.iter_mut() {
        if task.active && task.id == id {
            *task = TimerTask::empty();
            return true;
        }
    }
    false
}

/// True if any task's due tick has passed. Cheap enough for the IRQ tail.
pub fn timer_task_due() -> bool {
    let table = TABLE.lock();
    let now = clock::ticks();
    table
        .tasks
        .iter()
        .any(|t| t.active && ticks_elapsed(now, t.due_tick))
}

/// Fire every due task. Earlier due ticks fire first; ties break by slot
/// index. Each callback runs with the table unlocked and interrupts on.
pub fn timer_task_run_due() {
    loop {
        let mut fire: Option<(TimerTaskFn, *mut c_void)> = None;

        {
            let mut table = TABLE.lock();
            let now = clock::ticks();

            let mut pick: Option<usize> = None;
            for (i, task) in table.tasks.iter().enumerate() {
                if !task.active || !ticks_elapsed(now, task.due_tick) {
                    continue;
                }
                match pick {
                    None => pick = Some(i),
                    Some(p) => {
                        // Earlier due_tick wins, wrap-safe.
                        if (table.tasks[p].due_tick.wrapping_sub(task.due_tick) as i32) > 0 {
                            pick = Some(i);
                        }
                    }
                }
            }

            if let Some(i) = pick {
                let task = &mut table.tasks[i];
                if let Some(func) = task.func {
                    fire = Some((func, task.ctx));
                }
                if task.interval_ticks == 0 {
                    *task = TimerTask::empty();
                } else {
                    task.due_tick = now.wrapping_add(task.interval_ticks);
                }
            }
        }

        match fire {
            Some((func, ctx)) => func(ctx),
            None => break,
        }
    }
}

/// Number of active entries; used by diagnostics and tests.
pub fn timer_task_active_count() -> usize {
    TABLE.lock().tasks.iter().filter(|t| t.active).count()
}
