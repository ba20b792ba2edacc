//! Kernel service registries.
//!
//! The crate graph is `lib ← mm ← fs ← core ← drivers ← video`, but the
//! syscall layer in `core` needs the console, framebuffer, and input devices
//! that live above it. Each of those concerns is a struct of plain function
//! pointers registered here at init; lower crates call through the registry
//! and never link the provider.
//!
//! Registration is once-per-boot with a `&'static` provider; an unregistered
//! service yields `None` and callers degrade (log + error return).

use core::sync::atomic::{AtomicPtr, Ordering};

use orion_abi::syscall::{FbInfo, MouseState};

/// One registered provider, stored as a raw pointer to a `'static` struct.
pub struct ServiceCell<T: 'static> {
    provider: AtomicPtr<T>,
}

impl<T: 'static> ServiceCell<T> {
    pub const fn new() -> Self {
        Self {
            provider: AtomicPtr::new(core::ptr::null_mut()),
        }
    }

    pub fn register(&self, provider: &'static T) {
        self.provider
            .store(provider as *const T as *mut T, Ordering::Release);
    }

    pub fn get(&self) -> Option<&'static T> {
        let ptr = self.provider.load(Ordering::Acquire);
        // SAFETY: only `register` stores here, always with a &'static.
        unsafe { ptr.as_ref() }
    }
}

// ---------------------------------------------------------------------------
// Console (text screen)
// ---------------------------------------------------------------------------

pub struct ConsoleServices {
    pub write: fn(&[u8]),
    pub write_colored: fn(&[u8], u8, u8),
    /// Write at a fixed column/row without moving the cursor state the
    /// caller saved. Used by the write-progress redraw.
    pub write_at: fn(&[u8], i32, i32),
    pub clear: fn(),
    pub set_color: fn(u8, u8),
    pub get_cursor_offset: fn() -> i32,
    pub set_cursor_offset: fn(i32),
    pub get_cursor_row: fn() -> i32,
    pub get_cursor_col: fn() -> i32,
    pub rows: fn() -> i32,
    pub cols: fn() -> i32,
    pub set_cursor_visible: fn(bool),
}

pub static CONSOLE: ServiceCell<ConsoleServices> = ServiceCell::new();

// ---------------------------------------------------------------------------
// Framebuffer
// ---------------------------------------------------------------------------

pub struct FramebufferServices {
    pub info: fn() -> Option<FbInfo>,
    pub fill_rect: fn(i32, i32, i32, i32, u32),
    pub draw_text: fn(i32, i32, &[u8], u32, u32, bool),
}

pub static FRAMEBUFFER: ServiceCell<FramebufferServices> = ServiceCell::new();

// ---------------------------------------------------------------------------
// Input (keyboard + mouse)
// ---------------------------------------------------------------------------

pub struct InputServices {
    /// Blocking key read.
    pub getkey: fn() -> u32,
    /// Non-blocking key read; 0 when no key is buffered.
    pub getkey_nonblock: fn() -> u32,
    /// Wait for any key.
    pub pause: fn(),
    pub flush: fn(),
    pub mouse_state: fn() -> MouseState,
    pub mouse_set_draw: fn(bool),
}

pub static INPUT: ServiceCell<InputServices> = ServiceCell::new();

// ---------------------------------------------------------------------------
// Speaker, reset, editor collaborators
// ---------------------------------------------------------------------------

pub struct SpeakerServices {
    pub beep: fn(u32, u32),
}

pub static SPEAKER: ServiceCell<SpeakerServices> = ServiceCell::new();

pub struct PlatformServices {
    /// 8042 pulse or triple fault; never returns.
    pub reboot: fn() -> !,
}

pub static PLATFORM: ServiceCell<PlatformServices> = ServiceCell::new();

/// The notepad editor is an external collaborator reached through SYS_NOTE.
pub struct EditorServices {
    pub note: fn(&[u8]),
}

pub static EDITOR: ServiceCell<EditorServices> = ServiceCell::new();

// ---------------------------------------------------------------------------
// Boot glue hooks (config load, boot-command parse, motd)
// ---------------------------------------------------------------------------

pub struct BootServices {
    /// SYS_START_SHELL tail: load config, apply the boot command line,
    /// close out the boot log.
    pub start_shell: fn(),
    /// Configuration flags word (bit 0 = boot_clear).
    pub boot_flags: fn() -> u32,
    /// Render a motd file with per-line colour directives.
    pub print_motd: fn(&str),
}

pub static BOOT: ServiceCell<BootServices> = ServiceCell::new();
