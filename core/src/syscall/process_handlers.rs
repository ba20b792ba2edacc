//! Process-model syscalls: lifecycle, fork/exec/wait, boot glue entries.

use orion_abi::syscall::{
    EXEC_ERR_FAULT, EXEC_ERR_INVAL, EXEC_ERR_NOENT, EXEC_ERR_NOEXEC, EXEC_ERR_NOMEM,
    EXEC_ERR_PERM, WAIT_NO_SUCH, WAIT_RUNNING,
};
use orion_lib::services::BOOT;
use orion_lib::{TrapFrame, cprintf};
use orion_mm::user_copy::copy_user_argv;

use orion_fs::fscmd;

use crate::bin::{self, LoadError};
use crate::proc;

use super::common::{copy_path, ret, ret_fault};

/// SYS_START_SHELL: the boot crate finishes its job (config, boot command
/// line, boot-log close-out) through the registered hook.
pub fn sys_start_shell(frame: &mut TrapFrame) {
    if let Some(boot) = BOOT.get() {
        (boot.start_shell)();
    }
    orion_lib::bootlog::bootlog_finalize();
    orion_lib::console::kprint("\n");
    ret(frame, 1);
}

pub fn sys_get_boot_flags(frame: &mut TrapFrame) {
    let flags = BOOT.get().map_or(0, |boot| (boot.boot_flags)());
    ret(frame, flags);
}

/// SYS_EXIT: terminate, then reschedule. The frame either becomes the next
/// ready process or pivots to the idle loop — exit never returns to the
/// caller's code.
pub fn sys_exit(frame: &mut TrapFrame, code: u32) {
    proc::proc_exit(code);
    if !proc::proc_schedule(frame, false) {
        proc::enter_idle();
    }
}

pub fn sys_yield(frame: &mut TrapFrame) {
    // Deferred work runs between process steps, with interrupts enabled,
    // so a busy system still services the workqueue and due timers.
    orion_lib::cpu::enable_interrupts();
    crate::idle::drain_deferred_work();
    proc::proc_schedule(frame, true);
}

/// SYS_SPAWN_THREAD: kernel-mode process around a bare entry point.
pub fn sys_spawn_thread(frame: &mut TrapFrame, entry: u32, name_ptr: u32) {
    if entry == 0 {
        ret(frame, 0);
        return;
    }
    let name;
    let name_str = if name_ptr != 0 {
        match copy_path(name_ptr) {
            Some(p) => {
                name = p;
                name.as_str()
            }
            None => {
                ret(frame, 0);
                return;
            }
        }
    } else {
        "kthread"
    };
    let pid = proc::proc_create(name_str, entry, true).unwrap_or(0);
    ret(frame, pid);
}

pub fn sys_start_sysmgr(frame: &mut TrapFrame) {
    ret(frame, proc::proc_start_reaper() as u32);
}

pub fn sys_print_motd(frame: &mut TrapFrame, path_ptr: u32) {
    let path;
    let use_path = if path_ptr != 0 {
        match copy_path(path_ptr) {
            Some(p) => {
                path = p;
                path.as_str()
            }
            None => {
                ret(frame, 0);
                return;
            }
        }
    } else {
        "/system/config/motd.txt"
    };
    if let Some(boot) = BOOT.get() {
        (boot.print_motd)(use_path);
    }
    ret(frame, 1);
}

/// SYS_SPAWN: load an image and create a pid for it; 0 on any failure.
pub fn sys_spawn(frame: &mut TrapFrame, path_ptr: u32, argv_ptr: u32, argc: i32) {
    let Some(path) = copy_path(path_ptr) else {
        ret(frame, 0);
        return;
    };
    if argc < 0 {
        ret(frame, 0);
        return;
    }
    let Ok(argv) = copy_user_argv(argv_ptr, argc) else {
        ret(frame, 0);
        return;
    };

    let pid = bin::bin_create_process(path.as_str(), argv, false).unwrap_or(0);
    ret(frame, pid);
}

/// SYS_WAIT: non-blocking. Exit code once exited, RUNNING while live,
/// NO_SUCH otherwise. User code polls with yield in between.
pub fn sys_wait(frame: &mut TrapFrame, pid: u32) {
    if pid == 0 {
        ret(frame, WAIT_NO_SUCH);
        return;
    }
    if let Some(code) = proc::proc_pid_exited(pid) {
        ret(frame, code);
        return;
    }
    if !proc::proc_pid_alive(pid) {
        ret(frame, WAIT_NO_SUCH);
        return;
    }
    ret(frame, WAIT_RUNNING);
}

/// SYS_EXEC: replace the current image in place. Errors use the negative
/// taxonomy; success redirects the return path onto the fresh context.
pub fn sys_exec(frame: &mut TrapFrame, path_ptr: u32, argv_ptr: u32, argc: i32) {
    let Some(path) = copy_path(path_ptr) else {
        ret(frame, EXEC_ERR_FAULT);
        return;
    };
    if argc < 0 {
        ret(frame, EXEC_ERR_INVAL);
        return;
    }
    let Ok(argv) = copy_user_argv(argv_ptr, argc) else {
        ret(frame, EXEC_ERR_FAULT);
        return;
    };

    match proc::current_is_kernel() {
        Some(false) => {}
        _ => {
            ret(frame, EXEC_ERR_PERM);
            return;
        }
    }

    let loaded = match bin::bin_load_image(path.as_str()) {
        Ok(l) => l,
        Err(LoadError::NotFound) => {
            ret(frame, EXEC_ERR_NOENT);
            return;
        }
        Err(LoadError::NotExecutable) => {
            ret(frame, EXEC_ERR_NOEXEC);
            return;
        }
        Err(LoadError::NoMemory) => {
            ret(frame, EXEC_ERR_NOMEM);
            return;
        }
    };

    let name = orion_fs::path::file_name(path.as_str()).unwrap_or("exec");
    if !proc::proc_exec(loaded.entry, loaded.image, loaded.load_base, argv, name) {
        ret(frame, EXEC_ERR_NOMEM);
        return;
    }
    ret(frame, 0);
}

/// SYS_FORK: vfork semantics — the live frame continues as the child with
/// eax 0; the parent resumes with the child pid once the child execs.
pub fn sys_fork(frame: &mut TrapFrame) {
    if proc::proc_fork(frame).is_none() {
        ret_fault(frame);
    }
}

/// SH_MOTD: mount summary, ramdisk-fallback warning, drive list, then the
/// default working directory.
pub fn sys_shell_motd(frame: &mut TrapFrame) {
    cprintf!(
        "Currently mounted root disk info: Disk: {}#, FS: {}\n",
        fscmd::current_drive(),
        fscmd::fs_to_string(fscmd::current_fs_kind())
    );

    if fscmd::RAMDISK_AUTO_MOUNT.load(core::sync::atomic::Ordering::Relaxed) {
        orion_lib::console::kprint("[");
        orion_lib::console::kprint_color("warning", 14, 0);
        orion_lib::console::kprint(
            "] Disk auto-mount failed and was mounted as a ramdisk.(not persistent)\n",
        );
    }

    orion_fs::disk::cmd_disk_ls();
    fscmd::cd("/home");
    ret(frame, 1);
}
