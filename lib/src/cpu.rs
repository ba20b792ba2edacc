//! Interrupt flag management: sti, cli, irqsave/irqrestore, halt.

use core::arch::asm;

/// EFLAGS interrupt-enable bit.
const EFLAGS_IF: u32 = 1 << 9;

/// Enable interrupts (STI).
#[inline(always)]
pub fn enable_interrupts() {
    unsafe {
        asm!("sti", options(nomem, nostack));
    }
}

/// Disable interrupts (CLI).
#[inline(always)]
pub fn disable_interrupts() {
    unsafe {
        asm!("cli", options(nomem, nostack));
    }
}

/// Save EFLAGS and disable interrupts (irqsave pattern).
/// Returns the saved EFLAGS value.
#[inline(always)]
pub fn save_flags_cli() -> u32 {
    let flags: u64;
    unsafe {
        asm!(
            "pushfq",
            "pop {}",
            "cli",
            out(reg) flags,
            options(nomem)
        );
    }
    flags as u32
}

/// Restore the interrupt flag from saved EFLAGS (irqrestore pattern).
/// Only re-enables interrupts if they were enabled in the saved flags.
#[inline(always)]
pub fn restore_flags(flags: u32) {
    if flags & EFLAGS_IF != 0 {
        enable_interrupts();
    }
}

/// Read EFLAGS without modifying interrupt state.
#[inline(always)]
pub fn read_eflags() -> u32 {
    let flags: u64;
    unsafe {
        asm!("pushfq; pop {}", out(reg) flags, options(nomem, preserves_flags));
    }
    flags as u32
}

/// Returns true if interrupts are currently enabled (IF bit set).
#[inline(always)]
pub fn are_interrupts_enabled() -> bool {
    read_eflags() & EFLAGS_IF != 0
}

/// Wait for the next interrupt.
#[inline(always)]
pub fn halt() {
    unsafe {
        asm!("hlt", options(nomem, nostack));
    }
}

/// Enable interrupts and wait for the next one, atomically enough for a
/// single-CPU idle loop.
#[inline(always)]
pub fn sti_halt() {
    unsafe {
        asm!("sti; hlt", options(nomem, nostack));
    }
}

/// Park the CPU forever. Used by panic paths and the exit trampoline when
/// nothing is runnable.
pub fn halt_loop() -> ! {
    loop {
        unsafe {
            asm!("cli; hlt", options(nomem, nostack));
        }
    }
}
