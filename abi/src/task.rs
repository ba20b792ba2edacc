//! Process-model constants shared between kernel and userland.

/// Process table capacity. Pid 0 is reserved, so live pids are 1..=MAX_PROCS.
pub const MAX_PROCS: usize = 32;
/// Pid value that never names a process.
pub const INVALID_PID: u32 = 0;
/// Process name capacity, NUL padding included.
pub const PROC_NAME_MAX: usize = 32;
/// Kernel stack handed to each process.
pub const PROC_KERNEL_STACK_SIZE: usize = 16 * 1024;

/// Process lifecycle.
///
/// ```text
/// Unused -> Ready -> Running -> Exited -> Unused (reaped)
///              ^        |
///              +--------+ yield / preempt
/// Running -> Blocked -> Ready (wake)
/// ```
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProcState {
    Unused = 0,
    Ready = 1,
    Running = 2,
    Blocked = 3,
    Exited = 4,
}

impl ProcState {
    pub fn as_str(self) -> &'static str {
        match self {
            ProcState::Unused => "unused",
            ProcState::Ready => "ready",
            ProcState::Running => "running",
            ProcState::Blocked => "blocked",
            ProcState::Exited => "exited",
        }
    }
}

/// Result of a kill request.
#[repr(i32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KillResult {
    Ok = 0,
    KernelRequiresForce = 1,
    AlreadyExited = 2,
    NoSuch = 3,
    BadArg = 4,
}
