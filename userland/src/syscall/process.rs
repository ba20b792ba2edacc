//! Process, console, and misc wrappers.

use orion_abi::syscall as nr;
use orion_abi::syscall::{MAX_ARGC, WAIT_RUNNING};

use super::raw::{sys_call0, sys_call1, sys_call2, sys_call3, sys_call_key};

/// NUL-terminated scratch copy of a `&str` for the kernel's string copy-in.
pub(crate) struct CStrBuf {
    buf: [u8; 256],
}

impl CStrBuf {
    pub(crate) fn new(s: &str) -> Self {
        let mut buf = [0u8; 256];
        let len = s.len().min(255);
        buf[..len].copy_from_slice(&s.as_bytes()[..len]);
        Self { buf }
    }

    pub(crate) fn ptr(&self) -> u32 {
        self.buf.as_ptr() as u32
    }
}

pub fn sys_start_shell() {
    sys_call0(nr::SYS_START_SHELL);
}

pub fn sys_kprint(s: &str) {
    let c = CStrBuf::new(s);
    sys_call1(nr::SYS_KPRINT, c.ptr());
}

pub fn sys_clear_screen() {
    sys_call0(nr::SYS_CLEAR_SCREEN);
}

pub fn sys_beep(hz: u32, ms: u32) {
    sys_call2(nr::SYS_BEEP, hz, ms);
}

pub fn sys_pause() {
    sys_call0(nr::SYS_PAUSE);
}

pub fn sys_getkey() -> u32 {
    sys_call_key(nr::SYS_GETKEY)
}

pub fn sys_getkey_nb() -> u32 {
    sys_call0(nr::SYS_GETKEY_NB)
}

pub fn sys_reboot() {
    sys_call0(nr::SYS_REBOOT);
}

pub fn sys_exit(code: u32) -> ! {
    sys_call1(nr::SYS_EXIT, code);
    // The exit path never resumes this context; spin in case it somehow
    // slips through before the reschedule lands.
    loop {
        orion_lib::cpu::halt();
    }
}

pub fn sys_yield() {
    sys_call0(nr::SYS_YIELD);
}

pub fn sys_spawn_thread(entry: u32, name: &str) -> u32 {
    let c = CStrBuf::new(name);
    sys_call2(nr::SYS_SPAWN_THREAD, entry, c.ptr())
}

pub fn sys_get_boot_flags() -> u32 {
    sys_call0(nr::SYS_GET_BOOT_FLAGS)
}

pub fn sys_start_sysmgr() -> bool {
    sys_call0(nr::SYS_START_SYSMGR) != 0
}

pub fn sys_print_motd(path: &str) -> bool {
    let c = CStrBuf::new(path);
    sys_call1(nr::SYS_PRINT_MOTD, c.ptr()) != 0
}

pub fn sys_sh_motd() {
    sys_call0(nr::SYS_SH_MOTD);
}

/// argv marshalling: NUL-terminated copies plus a pointer vector, both on
/// the caller's stack for the call's duration.
struct ArgvBuf {
    storage: [[u8; 64]; MAX_ARGC],
    pointers: [u32; MAX_ARGC],
    count: usize,
}

impl ArgvBuf {
    fn new(argv: &[&str]) -> Self {
        let mut buf = Self {
            storage: [[0; 64]; MAX_ARGC],
            pointers: [0; MAX_ARGC],
            count: argv.len().min(MAX_ARGC),
        };
        for i in 0..buf.count {
            let src = argv[i].as_bytes();
            let len = src.len().min(63);
            buf.storage[i][..len].copy_from_slice(&src[..len]);
            buf.pointers[i] = buf.storage[i].as_ptr() as u32;
        }
        buf
    }

    fn ptr(&self) -> u32 {
        if self.count == 0 {
            0
        } else {
            self.pointers.as_ptr() as u32
        }
    }
}

/// spawn(path, argv) -> pid, 0 on failure.
pub fn sys_spawn(path: &str, argv: &[&str]) -> u32 {
    let c = CStrBuf::new(path);
    let args = ArgvBuf::new(argv);
    sys_call3(nr::SYS_SPAWN, c.ptr(), args.ptr(), args.count as u32)
}

/// Non-blocking wait status.
pub enum WaitStatus {
    Running,
    NoSuch,
    Exited(u32),
}

pub fn sys_wait(pid: u32) -> WaitStatus {
    match sys_call1(nr::SYS_WAIT, pid) {
        v if v == WAIT_RUNNING => WaitStatus::Running,
        v if v == nr::WAIT_NO_SUCH => WaitStatus::NoSuch,
        code => WaitStatus::Exited(code),
    }
}

/// exec never returns on success; the error comes back otherwise.
pub fn sys_exec(path: &str, argv: &[&str]) -> i32 {
    let c = CStrBuf::new(path);
    let args = ArgvBuf::new(argv);
    sys_call3(nr::SYS_EXEC, c.ptr(), args.ptr(), args.count as u32) as i32
}

/// fork() -> child pid in the parent, 0 in the child, -1 on failure.
pub fn sys_fork() -> i32 {
    sys_call0(nr::SYS_FORK) as i32
}
