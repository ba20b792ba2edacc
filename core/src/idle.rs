//! Idle context and deferred-work drain.
//!
//! When no process is runnable the CPU runs here: drain the workqueue and
//! due timer tasks with interrupts enabled, then halt until the next IRQ.
//! The timer tail pulls execution back into a process as soon as one is
//! ready. The idle context is rebuilt from scratch on every entry, so it
//! never needs saving.

use orion_lib::workqueue::workqueue_run;
use orion_lib::{TrapFrame, timer_task::timer_task_run_due};

use crate::proc::FRAME_POP_SIZE;

const IDLE_STACK_SIZE: usize = 8 * 1024;

#[repr(align(16))]
struct IdleStack([u8; IDLE_STACK_SIZE]);

static mut IDLE_STACK: IdleStack = IdleStack([0; IDLE_STACK_SIZE]);

/// The between-process drain point: deferred closures
/// first, then due timer tasks, each with interrupts enabled.
pub fn drain_deferred_work() {
    workqueue_run();
    timer_task_run_due();
}

extern "C" fn idle_main() -> ! {
    loop {
        drain_deferred_work();
        orion_lib::cpu::sti_halt();
    }
}

/// Write a fresh idle frame at the top of the idle stack and return the
/// esp to pivot onto.
pub fn prime_idle_frame() -> u32 {
    let base = &raw mut IDLE_STACK as *mut u8 as u32;
    let top = base + IDLE_STACK_SIZE as u32;
    let resume_esp = top - FRAME_POP_SIZE;
    let frame = TrapFrame::kernel_context(idle_main as usize as u32, top);
    crate::proc::write_resume_frame(&frame, resume_esp);
    resume_esp
}
