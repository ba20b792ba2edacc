#![no_std]
#![allow(unsafe_op_in_unsafe_fn)]

extern crate alloc;

pub mod bin;
pub mod fd;
pub mod gui;
pub mod idle;
pub mod proc;
pub mod syscall;

pub mod gui_tests;
pub mod sched_tests;

pub use proc::{SCHED_NEXT_ESP, scheduler_on_timer_tail};
pub use syscall::dispatch::syscall_handle;
