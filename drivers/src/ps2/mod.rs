pub mod keyboard;
pub mod mouse;

use orion_lib::io::io_wait;
use orion_lib::ports::{PS2_COMMAND, PS2_STATUS};

/// Spin until the controller accepts another command byte.
pub(crate) fn wait_input_clear() {
    for _ in 0..10_000 {
        let status = unsafe { PS2_STATUS.read() };
        if status & 0x02 == 0 {
            return;
        }
        io_wait();
    }
}

/// Spin until output data is available.
pub(crate) fn wait_output_full() {
    for _ in 0..10_000 {
        let status = unsafe { PS2_STATUS.read() };
        if status & 0x01 != 0 {
            return;
        }
        io_wait();
    }
}

pub(crate) fn controller_command(cmd: u8) {
    wait_input_clear();
    unsafe { PS2_COMMAND.write(cmd) };
}
