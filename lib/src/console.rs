//! Console print helpers over the registered console service.
//!
//! The screen is the user-visible log: shell output, filesystem messages,
//! boot chatter. Everything funnels through [`kprint`]/[`cprintf!`] so the
//! boot-log mirror sees one stream. Before the console service registers,
//! output falls back to klog (serial) so early boot is never silent.

use core::fmt;

use crate::bootlog;
use crate::services::CONSOLE;

pub fn kprint_bytes(bytes: &[u8]) {
    bootlog::bootlog_add(bytes);
    match CONSOLE.get() {
        Some(console) => (console.write)(bytes),
        None => {
            if let Ok(s) = core::str::from_utf8(bytes) {
                crate::klog_info!("{}", s.trim_end_matches('\n'));
            }
        }
    }
}

pub fn kprint(s: &str) {
    kprint_bytes(s.as_bytes());
}

/// Print with an explicit VGA color pair; falls back to plain output when
/// the console has no color support registered.
pub fn kprint_color(s: &str, fg: u8, bg: u8) {
    bootlog::bootlog_add(s.as_bytes());
    match CONSOLE.get() {
        Some(console) => (console.write_colored)(s.as_bytes(), fg, bg),
        None => crate::klog_info!("{}", s),
    }
}

pub fn clear_screen() {
    if let Some(console) = CONSOLE.get() {
        (console.clear)();
    }
}

struct ConsoleWriter;

impl fmt::Write for ConsoleWriter {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        kprint_bytes(s.as_bytes());
        Ok(())
    }
}

pub fn print_args(args: fmt::Arguments<'_>) {
    let _ = fmt::write(&mut ConsoleWriter, args);
}

/// Formatted console print (the `kprintf` of the C side).
#[macro_export]
macro_rules! cprintf {
    ($($arg:tt)*) => {
        $crate::console::print_args(::core::format_args!($($arg)*))
    };
}
