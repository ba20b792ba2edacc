//! PIT channel 0: the system tick.
//!
//! The IRQ0 handler advances the shared tick counter and leaves everything
//! slow to the main-loop drain; the scheduler's timer tail runs right after
//! us from the IRQ stub.

use orion_lib::clock;
use orion_lib::ports::{
    PIT_BASE_FREQUENCY_HZ, PIT_CHANNEL0, PIT_COMMAND, PIT_COMMAND_ACCESS_LOHI,
    PIT_COMMAND_CHANNEL0, PIT_COMMAND_MODE_SQUARE,
};

/// Program channel 0 to `hz` and publish the live frequency.
pub fn init(hz: u32) {
    let hz = hz.clamp(19, PIT_BASE_FREQUENCY_HZ);
    let divisor = (PIT_BASE_FREQUENCY_HZ / hz).clamp(1, 0xFFFF) as u16;

    unsafe {
        PIT_COMMAND.write(PIT_COMMAND_CHANNEL0 | PIT_COMMAND_ACCESS_LOHI | PIT_COMMAND_MODE_SQUARE);
        PIT_CHANNEL0.write((divisor & 0xFF) as u8);
        PIT_CHANNEL0.write((divisor >> 8) as u8);
    }
    clock::set_tick_frequency(hz);
}

/// IRQ0 body. Bookkeeping only — no scheduling decisions here.
pub fn irq_handler() {
    clock::clock_tick();
}
