//! User-pointer validation and copy-in.
//!
//! Processes share the kernel's address space, so "user pointer" means an
//! address the page directory actually maps — nothing more. Every pointer a
//! syscall dereferences is walked page by page first; string copies
//! re-validate whenever they cross a page boundary. This is the only place
//! in the kernel allowed to scan user memory byte by byte.

use alloc::boxed::Box;
use alloc::vec::Vec;

use orion_abi::syscall::{MAX_ARGC, MAX_PATH_LEN};

use crate::paging::{PAGE_SIZE, virt_to_phys};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UserPtrError {
    Null,
    /// A page spanned by the buffer is not mapped.
    Unmapped,
    /// String exceeded the bounded maximum without a NUL.
    TooLong,
    /// Address arithmetic wrapped.
    Overflow,
    /// argc out of range or vector malformed.
    BadArgv,
}

const PAGE_MASK: u32 = !(PAGE_SIZE - 1);

/// Validate that every page spanned by `[addr, addr+size)` is mapped.
/// Zero-length buffers pass; a null pointer never does.
pub fn validate_user_buffer(addr: u32, size: u32) -> Result<(), UserPtrError> {
    if size == 0 {
        return Ok(());
    }
    if addr == 0 {
        return Err(UserPtrError::Null);
    }

    let end = addr.checked_add(size - 1).ok_or(UserPtrError::Overflow)?;

    let mut page = addr & PAGE_MASK;
    let end_page = end & PAGE_MASK;
    loop {
        if virt_to_phys(page).is_none() {
            return Err(UserPtrError::Unmapped);
        }
        if page == end_page {
            break;
        }
        page = page.checked_add(PAGE_SIZE).ok_or(UserPtrError::Overflow)?;
    }
    Ok(())
}

/// Copy a NUL-terminated user string into `dst`, re-validating the mapping
/// at every page crossing. `dst` always ends NUL-terminated; missing the
/// terminator within `dst.len() - 1` bytes is an error.
pub fn copy_user_string(dst: &mut [u8], src: u32) -> Result<(), UserPtrError> {
    if dst.is_empty() {
        return Err(UserPtrError::Null);
    }
    if src == 0 {
        return Err(UserPtrError::Null);
    }

    let mut page = src & PAGE_MASK;
    if virt_to_phys(page).is_none() {
        return Err(UserPtrError::Unmapped);
    }

    let cap = dst.len() - 1;
    for i in 0..cap {
        let addr = src.checked_add(i as u32).ok_or(UserPtrError::Overflow)?;
        let new_page = addr & PAGE_MASK;
        if new_page != page {
            page = new_page;
            if virt_to_phys(page).is_none() {
                return Err(UserPtrError::Unmapped);
            }
        }
        // SAFETY: the page covering `addr` was just validated and the
        // address space is identity-mapped.
        let byte = unsafe { core::ptr::read_volatile(addr as *const u8) };
        dst[i] = byte;
        if byte == 0 {
            return Ok(());
        }
    }

    dst[cap] = 0;
    Err(UserPtrError::TooLong)
}

/// Copy `len` raw bytes from user memory after validating the whole span.
pub fn copy_from_user(dst: &mut [u8], src: u32) -> Result<(), UserPtrError> {
    if dst.is_empty() {
        return Ok(());
    }
    validate_user_buffer(src, dst.len() as u32)?;
    // SAFETY: validated above; identity-mapped.
    unsafe {
        core::ptr::copy_nonoverlapping(src as *const u8, dst.as_mut_ptr(), dst.len());
    }
    Ok(())
}

/// Copy raw bytes out to user memory after validating the whole span.
pub fn copy_to_user(dst: u32, src: &[u8]) -> Result<(), UserPtrError> {
    if src.is_empty() {
        return Ok(());
    }
    validate_user_buffer(dst, src.len() as u32)?;
    // SAFETY: validated above; identity-mapped.
    unsafe {
        core::ptr::copy_nonoverlapping(src.as_ptr(), dst as *mut u8, src.len());
    }
    Ok(())
}

/// Deep-copy a user argv vector: bounded entry count, each element copied
/// into an owned NUL-stripped buffer. The returned vector owns everything;
/// dropping it frees all copies.
pub fn copy_user_argv(argv_ptr: u32, argc: i32) -> Result<Vec<Box<[u8]>>, UserPtrError> {
    if argc <= 0 {
        return if argc == 0 || argv_ptr == 0 {
            Ok(Vec::new())
        } else {
            Err(UserPtrError::BadArgv)
        };
    }
    if argv_ptr == 0 {
        return Err(UserPtrError::BadArgv);
    }
    let argc = argc as usize;
    if argc > MAX_ARGC {
        return Err(UserPtrError::BadArgv);
    }

    let bytes = (argc as u32)
        .checked_mul(core::mem::size_of::<u32>() as u32)
        .ok_or(UserPtrError::Overflow)?;
    validate_user_buffer(argv_ptr, bytes)?;

    let mut out = Vec::with_capacity(argc);
    for i in 0..argc {
        // SAFETY: the vector span was validated above.
        let user_str =
            unsafe { core::ptr::read_volatile((argv_ptr as usize + i * 4) as *const u32) };
        let mut buf = [0u8; MAX_PATH_LEN];
        copy_user_string(&mut buf, user_str)?;
        let len = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
        out.push(buf[..len].to_vec().into_boxed_slice());
    }
    Ok(out)
}
