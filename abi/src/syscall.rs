//! Syscall number definitions (kernel-userland ABI).
//!
//! This module is the **single source of truth** for all syscall numbers.
//! Both kernel and userland import from here to ensure ABI consistency.
//!
//! # ABI
//!
//! Software interrupt `0xA5`. The number travels in `eax`, arguments in
//! `ebx`/`ecx`/`edx`, the result in `eax` — except `GETKEY`, which returns
//! the key in `ecx` (a historical quirk user wrappers must preserve).
//!
//! Numbers are stable. New syscalls take the next highest number so existing
//! user binaries keep working.

/// IDT vector of the syscall software interrupt.
pub const SYSCALL_VECTOR: u8 = 0xA5;

// =============================================================================
// Core
// =============================================================================

pub const SYS_START_SHELL: u32 = 1;
pub const SYS_KPRINT: u32 = 2;
pub const SYS_CLEAR_SCREEN: u32 = 3;
pub const SYS_BEEP: u32 = 4;
pub const SYS_PAUSE: u32 = 5;
pub const SYS_GETKEY: u32 = 6;
pub const SYS_REBOOT: u32 = 7;
pub const SYS_EXIT: u32 = 8;
pub const SYS_YIELD: u32 = 9;
pub const SYS_SPAWN_THREAD: u32 = 10;
pub const SYS_GET_BOOT_FLAGS: u32 = 11;

// =============================================================================
// File descriptors
// =============================================================================

pub const SYS_OPEN: u32 = 12;
pub const SYS_READ: u32 = 13;
pub const SYS_WRITE: u32 = 14;
pub const SYS_CLOSE: u32 = 15;

// =============================================================================
// Processes
// =============================================================================

pub const SYS_START_SYSMGR: u32 = 16;
pub const SYS_PRINT_MOTD: u32 = 17;
pub const SYS_SPAWN: u32 = 18;
pub const SYS_WAIT: u32 = 19;
pub const SYS_EXEC: u32 = 20;

// =============================================================================
// Filesystem / console helpers
// =============================================================================

pub const SYS_LS: u32 = 21;
pub const SYS_CAT: u32 = 22;
pub const SYS_CHDIR: u32 = 23;
pub const SYS_NOTE: u32 = 24;
pub const SYS_FORK: u32 = 25;
pub const SYS_DISK: u32 = 26;
pub const SYS_SH_MOTD: u32 = 27;
pub const SYS_GET_CURSOR_OFFSET: u32 = 28;
pub const SYS_SET_CURSOR_OFFSET: u32 = 29;

// =============================================================================
// Framebuffer + raw input (GUI server only, typically)
// =============================================================================

pub const SYS_FB_INFO: u32 = 30;
pub const SYS_FB_FILL_RECT: u32 = 31;
pub const SYS_FB_DRAW_TEXT: u32 = 32;
pub const SYS_CURSOR_VISIBLE: u32 = 33;
pub const SYS_MOUSE_STATE: u32 = 34;
pub const SYS_MOUSE_DRAW: u32 = 35;
pub const SYS_GETKEY_NB: u32 = 36;

// =============================================================================
// GUI IPC
// =============================================================================

pub const SYS_GUI_BIND: u32 = 37;
pub const SYS_GUI_SEND: u32 = 38;
pub const SYS_GUI_RECV: u32 = 39;
pub const SYS_DIR_LIST: u32 = 40;

/// `SYS_FB_DRAW_TEXT` flag: skip the background fill behind glyphs.
pub const SYS_FB_TEXT_TRANSPARENT: u32 = 0x1;

// =============================================================================
// Result taxonomy
// =============================================================================

/// `SYS_WAIT`: target pid is still live.
pub const WAIT_RUNNING: u32 = -1i32 as u32;
/// `SYS_WAIT`: no such pid (never existed or already reaped).
pub const WAIT_NO_SUCH: u32 = -2i32 as u32;

pub const EXEC_ERR_FAULT: u32 = -1i32 as u32;
pub const EXEC_ERR_NOENT: u32 = -2i32 as u32;
pub const EXEC_ERR_NOEXEC: u32 = -3i32 as u32;
pub const EXEC_ERR_NOMEM: u32 = -4i32 as u32;
pub const EXEC_ERR_INVAL: u32 = -5i32 as u32;
pub const EXEC_ERR_PERM: u32 = -6i32 as u32;

/// Generic fault return for pointer-validation failures.
pub const SYS_ERR_FAULT: u32 = -1i32 as u32;

/// `SYS_GET_BOOT_FLAGS` bit 0: clear the screen when the shell starts.
pub const BOOT_FLAG_CLEAR: u32 = 0x1;

/// Upper bound on user path strings copied into the kernel.
pub const MAX_PATH_LEN: usize = 256;
/// Upper bound on argv vectors accepted by SPAWN/EXEC.
pub const MAX_ARGC: usize = 16;
/// Per-pid open file limit.
pub const MAX_OPEN_FILES: usize = 16;

// =============================================================================
// Syscall argument structs (passed by pointer, validated then copied)
// =============================================================================

#[repr(C)]
#[derive(Clone, Copy, Default)]
pub struct FbRect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
    pub color: u32,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct FbText {
    pub x: i32,
    pub y: i32,
    pub fg: u32,
    pub bg: u32,
    pub flags: u32,
    /// User pointer to a NUL-terminated string.
    pub text_ptr: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Default)]
pub struct FbInfo {
    pub width: u32,
    pub height: u32,
    pub pitch: u32,
    pub bpp: u32,
    pub bytes_per_pixel: u32,
    pub font_w: u32,
    pub font_h: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Default)]
pub struct MouseState {
    pub x: i32,
    pub y: i32,
    pub buttons: i32,
}

/// `SYS_DIR_LIST` request. `names_ptr` receives `max_entries` fixed-width
/// slots of `name_len` bytes each; `is_dir_ptr` one byte per entry.
#[repr(C)]
#[derive(Clone, Copy, Default)]
pub struct DirListRequest {
    pub path_ptr: u32,
    pub names_ptr: u32,
    pub is_dir_ptr: u32,
    pub max_entries: u32,
    pub name_len: u32,
}
