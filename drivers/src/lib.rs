#![no_std]
#![allow(unsafe_op_in_unsafe_fn)]

extern crate alloc;

pub mod ata;
pub mod block;
pub mod pic;
pub mod pit;
pub mod ps2;
pub mod ramdisk;
pub mod reset;
pub mod serial;
pub mod spk;

/// Bring up the legacy device stack in dependency order and register every
/// service the lower layers call through.
pub fn init() {
    serial::init();
    pic::init();
    pit::init(orion_lib::ports::PIT_DEFAULT_FREQUENCY_HZ);
    ps2::keyboard::init();
    ps2::mouse::init();
    spk::register();
    reset::register();
    ata::init();
    block::init();
}
