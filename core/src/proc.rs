//! Process table and round-robin scheduler.
//!
//! Every process runs in ring 0 on its own kernel stack; a suspended
//! process is exactly its trap frame, saved by value and replayed at the
//! stack address where it was captured. Switching stacks cannot happen by
//! rewriting the live frame (the `iret` of a flat kernel does not restore
//! `esp`), so the scheduler posts the target frame address in
//! [`SCHED_NEXT_ESP`] and the ISR stub pivots onto it before popping.
//!
//! Context switches happen in exactly two places: the syscall dispatcher
//! and the timer-IRQ tail (which only rescues the CPU out of the idle loop
//! when something became ready). Kernel code never preempts itself.

use alloc::boxed::Box;
use alloc::vec;
use alloc::vec::Vec;
use core::sync::atomic::AtomicU32;

use orion_abi::task::{
    INVALID_PID, KillResult, MAX_PROCS, PROC_KERNEL_STACK_SIZE, PROC_NAME_MAX, ProcState,
};
use orion_lib::string::{bytes_as_str, copy_into_padded};
use orion_lib::{IrqMutex, TrapFrame, klog_debug, klog_info};

use crate::fd;
use crate::gui;
use crate::idle;

/// Bytes the ISR stub pops before `iret`: segments + pushad + vector pair
/// + eip/cs/eflags. No esp/ss without a privilege change.
pub const FRAME_POP_SIZE: u32 = 68;

/// Stack-pivot escape read by the ISR stub on its way out: when non-zero,
/// the stub reloads `esp` from here (and clears it) before popping the
/// frame, resuming whatever context was written at that address.
#[unsafe(no_mangle)]
pub static SCHED_NEXT_ESP: AtomicU32 = AtomicU32::new(0);

pub struct Process {
    pub pid: u32,
    pub name: [u8; PROC_NAME_MAX],
    pub state: ProcState,
    pub is_kernel: bool,
    pub entry: u32,
    pub foreground: bool,
    pub parent_pid: u32,
    pub exit_code: u32,
    /// Pid blocked in vfork until this process execs (0 = none).
    vfork_parent: u32,
    saved_frame: TrapFrame,
    /// Where `saved_frame` must be replayed: the frame's own address on
    /// this process's stack at suspension time.
    resume_esp: u32,
    kernel_stack: Option<Box<[u8]>>,
    image: Option<Box<[u8]>>,
    pub image_load_base: u32,
    argv: Vec<Box<[u8]>>,
}

impl Process {
    pub fn name_str(&self) -> &str {
        bytes_as_str(&self.name)
    }

    pub fn argv(&self) -> &[Box<[u8]>] {
        &self.argv
    }
}

struct ProcTable {
    slots: [Option<Process>; MAX_PROCS],
    current: Option<usize>,
    next_pid: u32,
    foreground_pid: u32,
}

impl ProcTable {
    const fn new() -> Self {
        Self {
            slots: [const { None }; MAX_PROCS],
            current: None,
            next_pid: 1,
            foreground_pid: INVALID_PID,
        }
    }

    fn slot_of_pid(&self, pid: u32) -> Option<usize> {
        if pid == INVALID_PID {
            return None;
        }
        self.slots
            .iter()
            .position(|p| p.as_ref().is_some_and(|p| p.pid == pid))
    }

    /// Monotonic pid issue with rollover, skipping 0 and live pids.
    fn issue_pid(&mut self) -> u32 {
        loop {
            let pid = self.next_pid;
            self.next_pid = self.next_pid.wrapping_add(1);
            if self.next_pid == 0 {
                self.next_pid = 1;
            }
            if pid != 0 && self.slot_of_pid(pid).is_none() {
                return pid;
            }
        }
    }
}

static TABLE: IrqMutex<ProcTable> = IrqMutex::new(ProcTable::new());

// ---------------------------------------------------------------------------
// Stack/frame construction
// ---------------------------------------------------------------------------

/// Entered when a process entry function plainly returns.
extern "C" fn entry_returned() -> ! {
    // Equivalent of the process calling exit(0) itself.
    crate::syscall::raw::sys_exit(0)
}

/// Build a fresh execution context on `stack`: the entry's return address
/// at the very top, the initial trap frame right below it.
fn prime_stack(stack: &mut [u8], entry: u32) -> (TrapFrame, u32) {
    let base = stack.as_mut_ptr() as u32;
    let top = base + stack.len() as u32;

    let ret_slot = top - 4;
    // SAFETY: ret_slot is inside the owned stack allocation.
    unsafe {
        core::ptr::write(ret_slot as *mut u32, entry_returned as usize as u32);
    }

    let resume_esp = ret_slot - FRAME_POP_SIZE;
    let frame = TrapFrame::kernel_context(entry, ret_slot);
    (frame, resume_esp)
}

/// Write the poppable part of `frame` at `esp`. Only the bytes the ISR
/// stub actually pops are written — the trailing useresp/ss fields exist
/// solely for privilege transitions and would overrun the stack top.
pub(crate) fn write_resume_frame(frame: &TrapFrame, esp: u32) {
    // SAFETY: esp points into the target's owned kernel stack (or the
    // idle stack) with FRAME_POP_SIZE bytes of headroom.
    unsafe {
        core::ptr::copy_nonoverlapping(
            frame as *const TrapFrame as *const u8,
            esp as *mut u8,
            FRAME_POP_SIZE as usize,
        );
    }
}

/// Replay `frame` at `resume_esp` and arm the stub's stack pivot.
fn install_resume(frame: &TrapFrame, resume_esp: u32) {
    write_resume_frame(frame, resume_esp);
    SCHED_NEXT_ESP.store(resume_esp, core::sync::atomic::Ordering::Release);
}

// ---------------------------------------------------------------------------
// Creation
// ---------------------------------------------------------------------------

fn create_inner(
    table: &mut ProcTable,
    name: &str,
    entry: u32,
    is_kernel: bool,
    image: Option<Box<[u8]>>,
    image_load_base: u32,
    argv: Vec<Box<[u8]>>,
) -> Option<u32> {
    let slot = table.slots.iter().position(|p| p.is_none())?;
    let mut stack = vec![0u8; PROC_KERNEL_STACK_SIZE].into_boxed_slice();
    let (frame, resume_esp) = prime_stack(&mut stack, entry);

    let pid = table.issue_pid();
    let mut proc = Process {
        pid,
        name: [0; PROC_NAME_MAX],
        state: ProcState::Ready,
        is_kernel,
        entry,
        foreground: false,
        parent_pid: INVALID_PID,
        exit_code: 0,
        vfork_parent: 0,
        saved_frame: frame,
        resume_esp,
        kernel_stack: Some(stack),
        image,
        image_load_base,
        argv,
    };
    copy_into_padded(&mut proc.name, name.as_bytes());
    table.slots[slot] = Some(proc);
    Some(pid)
}

/// Create a process around a bare entry point. Kernel-mode processes start
/// `READY` immediately.
pub fn proc_create(name: &str, entry: u32, is_kernel: bool) -> Option<u32> {
    let mut table = TABLE.lock();
    let pid = create_inner(&mut table, name, entry, is_kernel, None, 0, Vec::new());
    if let Some(pid) = pid {
        klog_debug!("PROC: created {} pid {}", name, pid);
    }
    pid
}

/// Create a process for a loaded user image, argv attached. Builtin
/// programs carry no image buffer.
pub fn proc_create_user(
    name: &str,
    entry: u32,
    image: Option<Box<[u8]>>,
    image_load_base: u32,
    argv: Vec<Box<[u8]>>,
    foreground: bool,
) -> Option<u32> {
    let mut table = TABLE.lock();
    let pid = create_inner(&mut table, name, entry, false, image, image_load_base, argv)?;
    if foreground && table.foreground_pid == INVALID_PID {
        table.foreground_pid = pid;
        if let Some(slot) = table.slot_of_pid(pid) {
            if let Some(p) = table.slots[slot].as_mut() {
                p.foreground = true;
            }
        }
    }
    Some(pid)
}

// ---------------------------------------------------------------------------
// Scheduling
// ---------------------------------------------------------------------------

/// Round-robin: save the outgoing context from `frame`, pick
/// the next `READY` slot after the current index (wrapping), install it.
/// With nothing ready, a non-yield call keeps the current process; a yield
/// from the last live process also keeps it. Returns false when no process
/// can run at all (caller falls back to the idle context).
pub fn proc_schedule(frame: &mut TrapFrame, yielded: bool) -> bool {
    let mut table = TABLE.lock();

    let current = table.current;
    if let Some(cur_slot) = current {
        if let Some(cur) = table.slots[cur_slot].as_mut() {
            cur.saved_frame = *frame;
            cur.resume_esp = frame as *const TrapFrame as u32;
            if cur.state == ProcState::Running {
                cur.state = ProcState::Ready;
            }
        }
    }

    let start = current.map_or(0, |s| s + 1);
    let mut pick = None;
    for i in 0..MAX_PROCS {
        let slot = (start + i) % MAX_PROCS;
        if table.slots[slot]
            .as_ref()
            .is_some_and(|p| p.state == ProcState::Ready)
        {
            pick = Some(slot);
            break;
        }
    }

    let Some(next_slot) = pick else {
        // Nothing else is ready. A still-live current process keeps the
        // CPU whether it yielded or not; a dead one leaves nothing to
        // resume and the caller falls back to idle.
        let _ = yielded;
        if let Some(cur_slot) = current {
            if let Some(cur) = table.slots[cur_slot].as_mut() {
                if cur.state == ProcState::Ready {
                    cur.state = ProcState::Running;
                    return true;
                }
            }
        }
        table.current = None;
        return false;
    };

    if Some(next_slot) == current {
        if let Some(cur) = table.slots[next_slot].as_mut() {
            cur.state = ProcState::Running;
        }
        return true;
    }

    let next = table.slots[next_slot].as_mut().expect("ready slot vanished");
    next.state = ProcState::Running;
    let resume_esp = next.resume_esp;
    let saved = next.saved_frame;
    table.current = Some(next_slot);
    drop(table);

    install_resume(&saved, resume_esp);
    true
}

/// Timer-IRQ tail: the only context-switch site besides the syscall path.
/// It exists to pull the CPU out of the idle loop once something becomes
/// ready; it never preempts a running process.
pub fn scheduler_on_timer_tail() {
    let mut table = TABLE.lock();
    if table.current.is_some() {
        return;
    }
    let Some(slot) = table
        .slots
        .iter()
        .position(|p| p.as_ref().is_some_and(|p| p.state == ProcState::Ready))
    else {
        return;
    };

    let proc = table.slots[slot].as_mut().expect("ready slot vanished");
    proc.state = ProcState::Running;
    let resume_esp = proc.resume_esp;
    let saved = proc.saved_frame;
    table.current = Some(slot);
    drop(table);

    install_resume(&saved, resume_esp);
}

/// Route execution to the idle loop when nothing is runnable. The idle
/// context is rebuilt fresh each time — it has no state worth saving.
pub fn enter_idle() {
    let resume_esp = idle::prime_idle_frame();
    SCHED_NEXT_ESP.store(resume_esp, core::sync::atomic::Ordering::Release);
}

pub fn proc_current_pid() -> u32 {
    let table = TABLE.lock();
    table
        .current
        .and_then(|s| table.slots[s].as_ref())
        .map_or(INVALID_PID, |p| p.pid)
}

pub fn proc_pid_alive(pid: u32) -> bool {
    let table = TABLE.lock();
    table.slot_of_pid(pid).is_some_and(|s| {
        table.slots[s]
            .as_ref()
            .is_some_and(|p| p.state != ProcState::Exited)
    })
}

/// Non-blocking exit query. `Some(code)` once the target has exited and
/// has not been reaped yet.
pub fn proc_pid_exited(pid: u32) -> Option<u32> {
    let table = TABLE.lock();
    let slot = table.slot_of_pid(pid)?;
    let proc = table.slots[slot].as_ref()?;
    if proc.state == ProcState::Exited {
        Some(proc.exit_code)
    } else {
        None
    }
}

// ---------------------------------------------------------------------------
// Foreground policy
// ---------------------------------------------------------------------------

pub fn proc_foreground_pid() -> u32 {
    TABLE.lock().foreground_pid
}

pub fn proc_is_foreground_pid(pid: u32) -> bool {
    pid != INVALID_PID && TABLE.lock().foreground_pid == pid
}

/// Claim the foreground seat; at most one process holds it.
pub fn proc_set_foreground(pid: u32) -> bool {
    let mut table = TABLE.lock();
    if table.foreground_pid != INVALID_PID && table.foreground_pid != pid {
        return false;
    }
    let Some(slot) = table.slot_of_pid(pid) else {
        return false;
    };
    table.foreground_pid = pid;
    if let Some(p) = table.slots[slot].as_mut() {
        p.foreground = true;
    }
    true
}

fn drop_foreground(table: &mut ProcTable, pid: u32) {
    if table.foreground_pid == pid {
        table.foreground_pid = INVALID_PID;
    }
}

// ---------------------------------------------------------------------------
// Exit / kill / reap
// ---------------------------------------------------------------------------

/// Terminate the current process. The caller (syscall path) must follow up
/// with a reschedule; if that fails it falls back to [`enter_idle`]. Owned
/// resources stay in the slot for the reaper — the stack being freed here
/// would pull the memory out from under the frame we are standing on.
pub fn proc_exit(code: u32) {
    let mut table = TABLE.lock();
    let Some(slot) = table.current else {
        return;
    };
    let Some(proc) = table.slots[slot].as_mut() else {
        return;
    };

    let pid = proc.pid;
    proc.state = ProcState::Exited;
    proc.exit_code = code;
    let waker = core::mem::replace(&mut proc.vfork_parent, 0);
    drop_foreground(&mut table, pid);

    // A vfork parent still waiting on an exec that never came.
    if waker != 0 {
        if let Some(pslot) = table.slot_of_pid(waker) {
            if let Some(parent) = table.slots[pslot].as_mut() {
                if parent.state == ProcState::Blocked {
                    parent.state = ProcState::Ready;
                }
            }
        }
    }

    table.current = None;
    drop(table);

    fd::release_pid(pid);
    gui::release_if_server(pid);
    klog_debug!("PROC: pid {} exited with {}", pid, code);
}

pub fn proc_kill(pid: u32, force: bool) -> KillResult {
    if pid == INVALID_PID {
        return KillResult::BadArg;
    }
    let mut table = TABLE.lock();
    if table
        .current
        .and_then(|s| table.slots[s].as_ref())
        .is_some_and(|p| p.pid == pid)
    {
        return KillResult::BadArg;
    }
    let Some(slot) = table.slot_of_pid(pid) else {
        return KillResult::NoSuch;
    };
    let proc = table.slots[slot].as_mut().expect("slot_of_pid lied");

    if proc.state == ProcState::Exited {
        return KillResult::AlreadyExited;
    }
    if proc.is_kernel && !force {
        return KillResult::KernelRequiresForce;
    }

    proc.state = ProcState::Exited;
    proc.exit_code = u32::MAX;
    drop_foreground(&mut table, pid);
    drop(table);

    fd::release_pid(pid);
    gui::release_if_server(pid);
    klog_info!("PROC: pid {} killed", pid);
    KillResult::Ok
}

/// Harvest one `EXITED` slot: drop its owned stack, image, and argv, and
/// release the pid. Returns the reaped pid.
pub fn proc_reap_one() -> Option<u32> {
    let mut table = TABLE.lock();
    let slot = table
        .slots
        .iter()
        .position(|p| p.as_ref().is_some_and(|p| p.state == ProcState::Exited))?;
    let proc = table.slots[slot].take()?;
    drop(table);

    let pid = proc.pid;
    drop(proc);
    klog_debug!("PROC: reaped pid {}", pid);
    Some(pid)
}

/// Snapshot for `ps`: (pid, name, state, kernel, foreground).
pub fn proc_list(out: &mut [(u32, [u8; PROC_NAME_MAX], ProcState, bool, bool)]) -> usize {
    let table = TABLE.lock();
    let mut n = 0;
    for proc in table.slots.iter().flatten() {
        if n >= out.len() {
            break;
        }
        out[n] = (
            proc.pid,
            proc.name,
            proc.state,
            proc.is_kernel,
            proc.pid == table.foreground_pid,
        );
        n += 1;
    }
    n
}

// ---------------------------------------------------------------------------
// Fork / exec (vfork semantics)
// ---------------------------------------------------------------------------

/// Classic fork result delivered by frame editing: the suspended parent's
/// frame reads back the child pid, the live frame (now the child) reads 0.
/// The parent blocks until the child execs or exits — both share one stack
/// until then.
pub fn proc_fork(frame: &mut TrapFrame) -> Option<u32> {
    let mut table = TABLE.lock();
    let cur_slot = table.current?;
    let parent_pid;
    let parent_name;
    let parent_fg;
    {
        let parent = table.slots[cur_slot].as_ref()?;
        parent_pid = parent.pid;
        parent_name = parent.name;
        parent_fg = parent.foreground;
    }

    let child_slot = table.slots.iter().position(|p| p.is_none())?;
    let stack = vec![0u8; PROC_KERNEL_STACK_SIZE].into_boxed_slice();
    let child_pid = table.issue_pid();

    let frame_addr = frame as *const TrapFrame as u32;
    let mut child_frame = *frame;
    child_frame.eax = 0;

    // Deep-copy the parent's argv so each side owns its vector.
    let argv = table.slots[cur_slot]
        .as_ref()?
        .argv
        .iter()
        .cloned()
        .collect();

    let mut child = Process {
        pid: child_pid,
        name: parent_name,
        state: ProcState::Running,
        is_kernel: false,
        entry: 0,
        foreground: parent_fg,
        parent_pid,
        exit_code: 0,
        vfork_parent: parent_pid,
        saved_frame: child_frame,
        resume_esp: frame_addr,
        kernel_stack: Some(stack),
        image: None,
        image_load_base: 0,
        argv,
    };
    copy_into_padded(&mut child.name, parent_name.as_slice());
    table.slots[child_slot] = Some(child);

    // Suspend the parent at this exact frame, pid in hand.
    {
        let parent = table.slots[cur_slot].as_mut()?;
        parent.saved_frame = *frame;
        parent.saved_frame.eax = child_pid;
        parent.resume_esp = frame_addr;
        parent.state = ProcState::Blocked;
    }

    // The live frame becomes the child: same stack, eax = 0.
    table.current = Some(child_slot);
    frame.eax = 0;

    klog_debug!("PROC: fork pid {} -> child {}", parent_pid, child_pid);
    Some(child_pid)
}

/// Replace the current process's image in place: free the
/// previous image, install the new one with a fresh kernel stack and frame,
/// deep-copy argv, and wake the vfork parent. The caller's return path is
/// redirected onto the new stack.
pub fn proc_exec(
    entry: u32,
    image: Option<Box<[u8]>>,
    image_load_base: u32,
    argv: Vec<Box<[u8]>>,
    name: &str,
) -> bool {
    let mut table = TABLE.lock();
    let Some(slot) = table.current else {
        return false;
    };
    let Some(proc) = table.slots[slot].as_mut() else {
        return false;
    };

    let mut stack = vec![0u8; PROC_KERNEL_STACK_SIZE].into_boxed_slice();
    let (frame, resume_esp) = prime_stack(&mut stack, entry);

    // The old image dies with the exec. The old stack may be the one this
    // very call chain is standing on, so it is parked rather than freed:
    // the parking slot holds it until the next exec, long after the pivot.
    let _old_image = proc.image.take();
    let old_stack = proc.kernel_stack.replace(stack);
    proc.image = image;
    proc.image_load_base = image_load_base;
    proc.entry = entry;
    proc.argv = argv;
    proc.saved_frame = frame;
    proc.resume_esp = resume_esp;
    proc.state = ProcState::Running;
    copy_into_padded(&mut proc.name, name.as_bytes());

    let waker = core::mem::replace(&mut proc.vfork_parent, 0);
    if waker != 0 {
        if let Some(pslot) = table.slot_of_pid(waker) {
            if let Some(parent) = table.slots[pslot].as_mut() {
                if parent.state == ProcState::Blocked {
                    parent.state = ProcState::Ready;
                }
            }
        }
    }
    drop(table);

    *RETIRED_STACK.lock() = old_stack;

    install_resume(&frame, resume_esp);
    true
}

/// Stack an exec retired while execution was still on it. Freed when the
/// next exec retires its own, by which point nothing references it.
static RETIRED_STACK: IrqMutex<Option<Box<[u8]>>> = IrqMutex::new(None);

/// Run `f` against the current process's argv (used by the binary loader
/// to hand argv into a fresh image).
pub fn with_current_argv<R>(f: impl FnOnce(&[Box<[u8]>]) -> R) -> Option<R> {
    let table = TABLE.lock();
    let slot = table.current?;
    let proc = table.slots[slot].as_ref()?;
    Some(f(&proc.argv))
}

pub fn current_is_kernel() -> Option<bool> {
    let table = TABLE.lock();
    let slot = table.current?;
    table.slots[slot].as_ref().map(|p| p.is_kernel)
}

// ---------------------------------------------------------------------------
// Reaper (orion-sysmgr)
// ---------------------------------------------------------------------------

extern "C" fn reaper_main() -> ! {
    loop {
        while proc_reap_one().is_some() {}
        crate::syscall::raw::sys_yield();
    }
}

/// Start the reaper kernel process (syscall 16). Idempotent-ish: a second
/// call simply spawns another reaper, so callers gate it.
pub fn proc_start_reaper() -> bool {
    proc_create("orion-sysmgr", reaper_main as usize as u32, true).is_some()
}
