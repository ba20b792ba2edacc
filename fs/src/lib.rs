#![no_std]

extern crate alloc;

pub mod blockdev;
pub mod disk;
pub mod fat;
pub mod fscmd;
pub mod fsdriver;
pub mod path;
pub mod progress;
pub mod quick;
pub mod xvfs;

pub mod tests;

pub use blockdev::{BlockDevice, BlockDeviceError, DriveDevice, MemoryBlockDevice};
pub use quick::fs_quick_probe;
