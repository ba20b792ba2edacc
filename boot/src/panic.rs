//! Kernel panic: print the diagnostic on both channels, then halt. There
//! is no recovery from a broken kernel invariant.

use core::panic::PanicInfo;

use orion_lib::{cprintf, klog_error};

pub fn panic_handler_impl(info: &PanicInfo) -> ! {
    orion_lib::cpu::disable_interrupts();

    klog_error!("KERNEL PANIC: {}", info.message());
    if let Some(location) = info.location() {
        klog_error!("  at {}:{}", location.file(), location.line());
    }

    cprintf!("\nKERNEL PANIC: {}\n", info.message());
    if let Some(location) = info.location() {
        cprintf!("  at {}:{}\n", location.file(), location.line());
    }
    cprintf!("System halted.\n");

    orion_lib::cpu::halt_loop();
}
