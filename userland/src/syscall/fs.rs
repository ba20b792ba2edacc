//! Filesystem and descriptor wrappers.

use orion_abi::syscall as nr;
use orion_abi::syscall::DirListRequest;

use super::process::CStrBuf;
use super::raw::{sys_call1, sys_call3};

pub fn sys_open(path: &str) -> i32 {
    let c = CStrBuf::new(path);
    sys_call1(nr::SYS_OPEN, c.ptr()) as i32
}

pub fn sys_read(fd: i32, buf: &mut [u8]) -> i32 {
    sys_call3(
        nr::SYS_READ,
        fd as u32,
        buf.len() as u32,
        buf.as_mut_ptr() as u32,
    ) as i32
}

pub fn sys_write(fd: i32, buf: &[u8]) -> i32 {
    sys_call3(
        nr::SYS_WRITE,
        fd as u32,
        buf.len() as u32,
        buf.as_ptr() as u32,
    ) as i32
}

pub fn sys_close(fd: i32) -> i32 {
    sys_call1(nr::SYS_CLOSE, fd as u32) as i32
}

pub fn sys_ls(path: Option<&str>) {
    match path {
        Some(p) => {
            let c = CStrBuf::new(p);
            sys_call1(nr::SYS_LS, c.ptr());
        }
        None => {
            sys_call1(nr::SYS_LS, 0);
        }
    }
}

pub fn sys_cat(path: &str) -> bool {
    let c = CStrBuf::new(path);
    sys_call1(nr::SYS_CAT, c.ptr()) != 0
}

pub fn sys_chdir(path: &str) -> bool {
    let c = CStrBuf::new(path);
    sys_call1(nr::SYS_CHDIR, c.ptr()) != 0
}

pub fn sys_note(path: &str) -> bool {
    let c = CStrBuf::new(path);
    sys_call1(nr::SYS_NOTE, c.ptr()) != 0
}

pub fn sys_disk(cmd: &str) -> bool {
    let c = CStrBuf::new(cmd);
    sys_call1(nr::SYS_DISK, c.ptr()) != 0
}

/// Enumerate a directory into caller buffers; returns the entry count or
/// a negative error.
pub fn sys_dir_list(
    path: Option<&str>,
    names: &mut [u8],
    is_dir: &mut [u8],
    name_len: u32,
) -> i32 {
    let max_entries = is_dir.len() as u32;
    let c = path.map(CStrBuf::new);
    let req = DirListRequest {
        path_ptr: c.as_ref().map_or(0, |c| c.ptr()),
        names_ptr: names.as_mut_ptr() as u32,
        is_dir_ptr: is_dir.as_mut_ptr() as u32,
        max_entries,
        name_len,
    };
    sys_call1(nr::SYS_DIR_LIST, &req as *const _ as u32) as i32
}
