use core::ffi::c_int;
use core::sync::atomic::Ordering;

use orion_abi::task::{KillResult, MAX_PROCS, PROC_NAME_MAX, ProcState};
use orion_lib::TrapFrame;

use crate::fd;
use crate::proc::{
    SCHED_NEXT_ESP, proc_create, proc_current_pid, proc_exit, proc_kill, proc_list,
    proc_pid_alive, proc_pid_exited, proc_reap_one, proc_schedule,
};

fn dummy_entry() -> ! {
    crate::syscall::raw::sys_exit(0)
}

fn entry_addr() -> u32 {
    dummy_entry as usize as u32
}

fn state_of(pid: u32) -> Option<ProcState> {
    let mut snap = [(0u32, [0u8; PROC_NAME_MAX], ProcState::Unused, false, false); MAX_PROCS];
    let n = proc_list(&mut snap);
    snap[..n].iter().find(|e| e.0 == pid).map(|e| e.2)
}

fn cleanup(pids: &[u32]) {
    for &pid in pids {
        let _ = proc_kill(pid, true);
    }
    while proc_reap_one().is_some() {}
    SCHED_NEXT_ESP.store(0, Ordering::Relaxed);
}

pub fn test_create_assigns_distinct_pids() -> c_int {
    let a = proc_create("t_alpha", entry_addr(), false);
    let b = proc_create("t_beta", entry_addr(), false);

    let (Some(a), Some(b)) = (a, b) else {
        cleanup(&[]);
        return -1;
    };
    let ok = a != 0 && b != 0 && a != b;
    cleanup(&[a, b]);
    if !ok { -1 } else { 0 }
}

pub fn test_wait_state_machine() -> c_int {
    let Some(pid) = proc_create("t_wait", entry_addr(), false) else {
        return -1;
    };

    // Live and not exited: the wait path reports RUNNING via these two.
    if !proc_pid_alive(pid) || proc_pid_exited(pid).is_some() {
        cleanup(&[pid]);
        return -1;
    }

    if proc_kill(pid, false) != KillResult::Ok {
        cleanup(&[pid]);
        return -1;
    }
    // Exited but unreaped: exit code still readable.
    if proc_pid_exited(pid).is_none() {
        cleanup(&[pid]);
        return -1;
    }

    while proc_reap_one().is_some() {}
    // Reaped: the pid no longer names anything.
    if proc_pid_alive(pid) || proc_pid_exited(pid).is_some() {
        return -1;
    }
    0
}

pub fn test_kill_requires_force_for_kernel() -> c_int {
    let Some(pid) = proc_create("t_kproc", entry_addr(), true) else {
        return -1;
    };

    if proc_kill(pid, false) != KillResult::KernelRequiresForce {
        cleanup(&[pid]);
        return -1;
    }
    // Unharmed by the refused kill.
    if state_of(pid) != Some(ProcState::Ready) {
        cleanup(&[pid]);
        return -1;
    }

    if proc_kill(pid, true) != KillResult::Ok {
        cleanup(&[pid]);
        return -1;
    }
    if state_of(pid) != Some(ProcState::Exited) {
        cleanup(&[pid]);
        return -1;
    }

    cleanup(&[]);
    0
}

pub fn test_kill_error_taxonomy() -> c_int {
    if proc_kill(0, false) != KillResult::BadArg {
        return -1;
    }
    if proc_kill(0xDEAD, false) != KillResult::NoSuch {
        return -1;
    }

    let Some(pid) = proc_create("t_dead", entry_addr(), false) else {
        return -1;
    };
    let _ = proc_kill(pid, false);
    if proc_kill(pid, false) != KillResult::AlreadyExited {
        cleanup(&[pid]);
        return -1;
    }
    cleanup(&[]);
    0
}

pub fn test_round_robin_rotation() -> c_int {
    let a = proc_create("t_rr_a", entry_addr(), false);
    let b = proc_create("t_rr_b", entry_addr(), false);
    let c = proc_create("t_rr_c", entry_addr(), false);
    let (Some(a), Some(b), Some(c)) = (a, b, c) else {
        cleanup(&[a.unwrap_or(0), b.unwrap_or(0), c.unwrap_or(0)]);
        return -1;
    };

    // Drive the scheduler with a scratch frame: within k yields every
    // ready process must have held the CPU once.
    let mut frame = TrapFrame::zeroed();
    let mut seen = [0u32; 3];
    for slot in seen.iter_mut() {
        proc_schedule(&mut frame, true);
        *slot = proc_current_pid();
    }

    let ok = seen.contains(&a) && seen.contains(&b) && seen.contains(&c);

    // The last scheduled process is current; retire it via exit, then the
    // other two by pid.
    proc_exit(0);
    cleanup(&[a, b, c]);
    if !ok { -1 } else { 0 }
}

pub fn test_fd_ownership_and_release() -> c_int {
    let base = fd::open_count();

    let f1 = fd::alloc_fd(41, "/tmp/a", 0);
    let f2 = fd::alloc_fd(41, "/tmp/b", 0);
    let f3 = fd::alloc_fd(42, "console", 0);
    if f1 < 0 || f2 < 0 || f3 < 0 {
        return -1;
    }

    // Descriptors belong to their opener.
    if fd::with_fd(f1 as u32, 42, |_| ()).is_some() {
        return -1;
    }
    if fd::with_fd(f1 as u32, 41, |_| ()).is_none() {
        return -1;
    }

    // Exit of pid 41 releases exactly its two descriptors.
    fd::release_pid(41);
    if fd::open_count() != base + 1 {
        return -1;
    }
    fd::release_pid(42);
    if fd::open_count() != base {
        return -1;
    }
    0
}

pub fn test_console_path_detection() -> c_int {
    if !fd::is_console_path("console") {
        return -1;
    }
    if !fd::is_console_path("/dev/console") {
        return -1;
    }
    if !fd::is_console_path("CONSOLE") {
        return -1;
    }
    if fd::is_console_path("/console.txt") {
        return -1;
    }
    0
}

orion_lib::define_test_suite!(
    scheduler,
    [
        test_create_assigns_distinct_pids,
        test_wait_state_machine,
        test_kill_requires_force_for_kernel,
        test_kill_error_taxonomy,
        test_round_robin_rotation,
        test_fd_ownership_and_release,
        test_console_path_detection,
    ]
);
