//! Per-pid open-file descriptors.
//!
//! One global table of small-integer slots; each belongs to exactly one
//! pid. The distinguished `console` path bypasses the filesystem — the
//! syscall layer checks [`is_console_path`] before touching fscmd. Process
//! exit releases everything the pid owned.

use orion_abi::syscall::{MAX_OPEN_FILES, MAX_PATH_LEN};
use orion_lib::IrqMutex;
use orion_lib::string::{bytes_as_str, copy_into_padded, eq_ignore_ascii_case};

#[derive(Clone, Copy)]
pub struct FdEntry {
    pub used: bool,
    pub owner_pid: u32,
    pub offset: u32,
    pub size: u32,
    path: [u8; MAX_PATH_LEN],
}

impl FdEntry {
    const fn empty() -> Self {
        Self {
            used: false,
            owner_pid: 0,
            offset: 0,
            size: 0,
            path: [0; MAX_PATH_LEN],
        }
    }

    pub fn path_str(&self) -> &str {
        bytes_as_str(&self.path)
    }
}

static TABLE: IrqMutex<[FdEntry; MAX_OPEN_FILES]> =
    IrqMutex::new([FdEntry::empty(); MAX_OPEN_FILES]);

pub fn is_console_path(path: &str) -> bool {
    eq_ignore_ascii_case(path.as_bytes(), b"console")
        || eq_ignore_ascii_case(path.as_bytes(), b"/dev/console")
}

/// Claim a slot for `owner_pid`. Returns the fd or -1 when the table is
/// full.
pub fn alloc_fd(owner_pid: u32, path: &str, size: u32) -> i32 {
    let mut table = TABLE.lock();
    for (i, entry) in table.iter_mut().enumerate() {
        if !entry.used {
            entry.used = true;
            entry.owner_pid = owner_pid;
            entry.offset = 0;
            entry.size = size;
            copy_into_padded(&mut entry.path, path.as_bytes());
            return i as i32;
        }
    }
    -1
}

/// Run `f` on the descriptor if it exists and belongs to `owner_pid`.
pub fn with_fd<R>(fd: u32, owner_pid: u32, f: impl FnOnce(&mut FdEntry) -> R) -> Option<R> {
    if fd as usize >= MAX_OPEN_FILES {
        return None;
    }
    let mut table = TABLE.lock();
    let entry = &mut table[fd as usize];
    if !entry.used || entry.owner_pid != owner_pid {
        return None;
    }
    Some(f(entry))
}

pub fn close_fd(fd: u32, owner_pid: u32) -> bool {
    with_fd(fd, owner_pid, |entry| {
        *entry = FdEntry::empty();
    })
    .is_some()
}

/// Drop every descriptor `pid` owns; called on exit and kill.
pub fn release_pid(pid: u32) {
    if pid == 0 {
        return;
    }
    let mut table = TABLE.lock();
    for entry in table.iter_mut() {
        if entry.used && entry.owner_pid == pid {
            *entry = FdEntry::empty();
        }
    }
}

/// Open descriptor count; diagnostics and tests.
pub fn open_count() -> usize {
    TABLE.lock().iter().filter(|e| e.used).count()
}
