//! Shared user-memory helpers for the syscall handlers.

use orion_abi::syscall::{MAX_PATH_LEN, SYS_ERR_FAULT};
use orion_lib::TrapFrame;
use orion_mm::user_copy::{copy_user_string, validate_user_buffer};

/// A path copied in from user space, NUL-stripped.
pub struct PathBuf {
    buf: [u8; MAX_PATH_LEN],
    len: usize,
}

impl PathBuf {
    pub fn as_str(&self) -> &str {
        core::str::from_utf8(&self.buf[..self.len]).unwrap_or("")
    }
}

/// Copy a bounded user path. `None` on fault or overlong input.
pub fn copy_path(user_ptr: u32) -> Option<PathBuf> {
    let mut buf = [0u8; MAX_PATH_LEN];
    copy_user_string(&mut buf, user_ptr).ok()?;
    let len = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    Some(PathBuf { buf, len })
}

/// Validate a user span and view it as a byte slice. The single address
/// space makes the slice directly usable once the walk passes.
pub fn user_slice<'a>(ptr: u32, len: u32) -> Option<&'a [u8]> {
    validate_user_buffer(ptr, len).ok()?;
    if len == 0 {
        return Some(&[]);
    }
    // SAFETY: every spanned page was just validated; identity-mapped.
    Some(unsafe { core::slice::from_raw_parts(ptr as *const u8, len as usize) })
}

pub fn user_slice_mut<'a>(ptr: u32, len: u32) -> Option<&'a mut [u8]> {
    validate_user_buffer(ptr, len).ok()?;
    if len == 0 {
        return Some(&mut []);
    }
    // SAFETY: as above, and syscall handlers run single-threaded.
    Some(unsafe { core::slice::from_raw_parts_mut(ptr as *mut u8, len as usize) })
}

/// Copy a `#[repr(C)]` value out of user memory after validating its span.
pub fn copy_struct_in<T: Copy>(ptr: u32) -> Option<T> {
    validate_user_buffer(ptr, core::mem::size_of::<T>() as u32).ok()?;
    // SAFETY: span validated; T is plain data by the Copy + repr(C) bound
    // convention of the ABI structs.
    Some(unsafe { core::ptr::read_unaligned(ptr as *const T) })
}

/// Copy a value into user memory after validating its span.
pub fn copy_struct_out<T: Copy>(ptr: u32, value: &T) -> bool {
    if validate_user_buffer(ptr, core::mem::size_of::<T>() as u32).is_err() {
        return false;
    }
    // SAFETY: span validated.
    unsafe { core::ptr::write_unaligned(ptr as *mut T, *value) };
    true
}

#[inline]
pub fn ret(frame: &mut TrapFrame, value: u32) {
    frame.eax = value;
}

#[inline]
pub fn ret_fault(frame: &mut TrapFrame) {
    frame.eax = SYS_ERR_FAULT;
}
