//! Userland syscall wrappers over `int 0xA5`.
//!
//! One raw module owns the register convention; everything else is typed
//! sugar grouped by area. Only the wrappers touch the vector — programs
//! never open-code the interrupt.

pub mod fs;
pub mod gui;
pub mod process;
pub mod raw;
pub mod video;

pub use fs::*;
pub use gui::*;
pub use process::*;
pub use video::*;
