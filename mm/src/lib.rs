#![no_std]
#![allow(unsafe_op_in_unsafe_fn)]

extern crate alloc;

pub mod heap_tests;
pub mod kernel_heap;
pub mod paging;
pub mod user_copy;

pub use kernel_heap::KernelHeap;
pub use user_copy::{UserPtrError, copy_user_argv, copy_user_string, validate_user_buffer};
