#![no_std]
#![allow(unsafe_op_in_unsafe_fn)]

extern crate alloc;

pub mod explorer;
pub mod gui_server;
pub mod shell;
pub mod syscall;

use orion_core::bin::register_builtin;

/// Register every compiled-in program under its canonical path. Called
/// once from the kernel entry, before boot spawns the shell.
pub fn init() {
    register_builtin("/cmd/shell.sys", shell::shell_entry as usize as u32);
    register_builtin("/cmd/gui.sys", gui_server::gui_entry as usize as u32);
    register_builtin("/cmd/explorer.sys", explorer::explorer_entry as usize as u32);
}
