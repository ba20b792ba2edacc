#![no_std]
#![allow(unsafe_op_in_unsafe_fn)]

pub mod console;
pub mod fb;
pub mod font;

/// Wire up the display stack: adopt whatever framebuffer boot discovered,
/// pick the console backend, and register the console/framebuffer services.
pub fn init() {
    console::init();
    fb::register_services();
}
