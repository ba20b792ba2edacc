//! Filesystem, descriptor, and console-file syscalls.

use orion_abi::syscall::DirListRequest;
use orion_lib::TrapFrame;
use orion_lib::cpu;
use orion_lib::services::EDITOR;

use orion_fs::fscmd;

use crate::fd;
use crate::proc::proc_current_pid;

use super::common::{copy_path, copy_struct_in, ret, ret_fault, user_slice, user_slice_mut};

/// open(path): console paths bypass the filesystem entirely; regular paths
/// are created empty when missing.
pub fn sys_open(frame: &mut TrapFrame, path_ptr: u32) {
    let Some(path) = copy_path(path_ptr) else {
        ret_fault(frame);
        return;
    };
    let path = path.as_str();
    let owner = proc_current_pid();

    if fd::is_console_path(path) {
        let fd = fd::alloc_fd(owner, path, 0);
        ret(frame, fd as u32);
        return;
    }

    if !fscmd::exists(path) && !fscmd::write_file(path, &[]) {
        ret_fault(frame);
        return;
    }

    let size = fscmd::get_file_size(path);
    let fd = fd::alloc_fd(owner, path, size);
    ret(frame, fd as u32);
}

pub fn sys_read(frame: &mut TrapFrame, fd: u32, len: u32, buf_ptr: u32) {
    let owner = proc_current_pid();
    let Some((path, offset, size)) = fd::with_fd(fd, owner, |entry| {
        let mut path = [0u8; orion_abi::syscall::MAX_PATH_LEN];
        orion_lib::string::copy_into_padded(&mut path, entry.path_str().as_bytes());
        (path, entry.offset, entry.size)
    }) else {
        ret(frame, 0);
        return;
    };
    if len == 0 || buf_ptr == 0 {
        ret(frame, 0);
        return;
    }
    let Some(buf) = user_slice_mut(buf_ptr, len) else {
        ret_fault(frame);
        return;
    };

    if offset >= size {
        ret(frame, 0);
        return;
    }
    let to_read = len.min(size - offset);
    let path_str = orion_lib::string::bytes_as_str(&path);
    let got = fscmd::read_file(path_str, &mut buf[..to_read as usize], offset);
    if got < 0 {
        ret_fault(frame);
        return;
    }
    fd::with_fd(fd, owner, |entry| entry.offset += got as u32);
    ret(frame, got as u32);
}

/// write(fd, buf, len): files are truncated and rewritten; the console
/// append takes the IRQ-disabled console lock.
pub fn sys_write(frame: &mut TrapFrame, fd: u32, len: u32, buf_ptr: u32) {
    let owner = proc_current_pid();
    let Some((path, console)) = fd::with_fd(fd, owner, |entry| {
        let mut path = [0u8; orion_abi::syscall::MAX_PATH_LEN];
        orion_lib::string::copy_into_padded(&mut path, entry.path_str().as_bytes());
        (path, fd::is_console_path(entry.path_str()))
    }) else {
        ret_fault(frame);
        return;
    };
    if len == 0 {
        ret(frame, 0);
        return;
    }
    if buf_ptr == 0 {
        ret_fault(frame);
        return;
    }
    let Some(buf) = user_slice(buf_ptr, len) else {
        ret_fault(frame);
        return;
    };

    if console {
        let flags = cpu::save_flags_cli();
        orion_lib::console::kprint_bytes(buf);
        cpu::restore_flags(flags);
        ret(frame, len);
        return;
    }

    let path_str = orion_lib::string::bytes_as_str(&path);
    if !fscmd::write_file(path_str, buf) {
        ret_fault(frame);
        return;
    }
    fd::with_fd(fd, owner, |entry| {
        entry.size = len;
        entry.offset = 0;
    });
    ret(frame, len);
}

pub fn sys_close(frame: &mut TrapFrame, fd: u32) {
    if fd::close_fd(fd, proc_current_pid()) {
        ret(frame, 0);
    } else {
        ret_fault(frame);
    }
}

pub fn sys_ls(frame: &mut TrapFrame, path_ptr: u32) {
    let path;
    let use_path = if path_ptr != 0 {
        match copy_path(path_ptr) {
            Some(p) => {
                path = p;
                let s = path.as_str();
                if s.is_empty() { None } else { Some(s) }
            }
            None => {
                ret(frame, 0);
                return;
            }
        }
    } else {
        None
    };
    fscmd::ls(use_path);
    ret(frame, 1);
}

pub fn sys_cat(frame: &mut TrapFrame, path_ptr: u32) {
    let Some(path) = (path_ptr != 0).then(|| copy_path(path_ptr)).flatten() else {
        ret(frame, 0);
        return;
    };
    fscmd::cat(path.as_str());
    ret(frame, 1);
}

pub fn sys_chdir(frame: &mut TrapFrame, path_ptr: u32) {
    let Some(path) = (path_ptr != 0).then(|| copy_path(path_ptr)).flatten() else {
        ret(frame, 0);
        return;
    };
    ret(frame, fscmd::cd(path.as_str()) as u32);
}

/// The notepad editor is a collaborator; keyboard state is restored after
/// it returns, whatever it did.
pub fn sys_note(frame: &mut TrapFrame, path_ptr: u32) {
    let Some(path) = (path_ptr != 0).then(|| copy_path(path_ptr)).flatten() else {
        ret(frame, 0);
        return;
    };
    match EDITOR.get() {
        Some(editor) => {
            (editor.note)(path.as_str().as_bytes());
            if let Some(input) = orion_lib::services::INPUT.get() {
                (input.flush)();
            }
            ret(frame, 1);
        }
        None => {
            orion_lib::console::kprint("note: editor unavailable\n");
            ret(frame, 0);
        }
    }
}

pub fn sys_disk(frame: &mut TrapFrame, cmd_ptr: u32) {
    let cmd;
    let cmd_str = if cmd_ptr != 0 {
        match copy_path(cmd_ptr) {
            Some(p) => {
                cmd = p;
                cmd.as_str()
            }
            None => {
                ret(frame, 0);
                return;
            }
        }
    } else {
        ""
    };
    fscmd::disk_command(cmd_str);
    ret(frame, 1);
}

/// dir_list(req): enumerate a directory into caller-owned fixed-width
/// name slots plus an is_dir byte per entry.
pub fn sys_dir_list(frame: &mut TrapFrame, req_ptr: u32) {
    let Some(req) = copy_struct_in::<DirListRequest>(req_ptr) else {
        ret_fault(frame);
        return;
    };
    if req.names_ptr == 0 || req.is_dir_ptr == 0 || req.max_entries == 0 || req.name_len == 0 {
        ret(frame, 0);
        return;
    }

    let max_entries = req.max_entries.min(256);
    let name_len = req.name_len.min(64);
    let names_size = max_entries * name_len;
    let (Some(names), Some(is_dir)) = (
        user_slice_mut(req.names_ptr, names_size),
        user_slice_mut(req.is_dir_ptr, max_entries),
    ) else {
        ret_fault(frame);
        return;
    };

    let path;
    let use_path = if req.path_ptr != 0 {
        match copy_path(req.path_ptr) {
            Some(p) => {
                path = p;
                let s = path.as_str();
                if s.is_empty() { None } else { Some(s) }
            }
            None => {
                ret_fault(frame);
                return;
            }
        }
    } else {
        None
    };

    let Some(entries) = fscmd::list_dir(use_path) else {
        ret_fault(frame);
        return;
    };

    let mut count = 0usize;
    for (name, dir) in entries.iter().take(max_entries as usize) {
        let slot = &mut names[count * name_len as usize..(count + 1) * name_len as usize];
        orion_lib::string::copy_into_padded(slot, name.as_bytes());
        is_dir[count] = *dir as u8;
        count += 1;
    }
    ret(frame, count as u32);
}
