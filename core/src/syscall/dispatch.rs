//! Single software-interrupt entry (vector 0xA5).
//!
//! The ISR stub hands over the full trap frame; handlers deliver results by
//! writing `eax` (or `ecx` for GETKEY) and may redirect control entirely by
//! arming the scheduler's stack pivot. Unknown numbers print a diagnostic
//! and return zero.

use orion_lib::TrapFrame;
use orion_lib::console::kprint;

use super::decode::Syscall;
use super::{fs_handlers as fsh, process_handlers as ph, ui_handlers as uih};

pub fn syscall_handle(frame: &mut TrapFrame) {
    let Some(call) = Syscall::decode(frame.eax, frame.ebx, frame.ecx, frame.edx) else {
        kprint("[syscall] unknown syscall\n");
        frame.eax = 0;
        return;
    };

    match call {
        Syscall::StartShell => ph::sys_start_shell(frame),
        Syscall::Kprint { text_ptr } => uih::sys_kprint(frame, text_ptr),
        Syscall::ClearScreen => uih::sys_clear_screen(frame),
        Syscall::Beep { hz, ms } => uih::sys_beep(frame, hz, ms),
        Syscall::Pause => uih::sys_pause(frame),
        Syscall::GetKey => uih::sys_getkey(frame),
        Syscall::Reboot => uih::sys_reboot(frame),
        Syscall::Exit { code } => ph::sys_exit(frame, code),
        Syscall::Yield => ph::sys_yield(frame),
        Syscall::SpawnThread { entry, name_ptr } => ph::sys_spawn_thread(frame, entry, name_ptr),
        Syscall::GetBootFlags => ph::sys_get_boot_flags(frame),
        Syscall::Open { path_ptr } => fsh::sys_open(frame, path_ptr),
        Syscall::Read { fd, len, buf_ptr } => fsh::sys_read(frame, fd, len, buf_ptr),
        Syscall::Write { fd, len, buf_ptr } => fsh::sys_write(frame, fd, len, buf_ptr),
        Syscall::Close { fd } => fsh::sys_close(frame, fd),
        Syscall::StartSysmgr => ph::sys_start_sysmgr(frame),
        Syscall::PrintMotd { path_ptr } => ph::sys_print_motd(frame, path_ptr),
        Syscall::Spawn {
            path_ptr,
            argv_ptr,
            argc,
        } => ph::sys_spawn(frame, path_ptr, argv_ptr, argc),
        Syscall::Wait { pid } => ph::sys_wait(frame, pid),
        Syscall::Exec {
            path_ptr,
            argv_ptr,
            argc,
        } => ph::sys_exec(frame, path_ptr, argv_ptr, argc),
        Syscall::Ls { path_ptr } => fsh::sys_ls(frame, path_ptr),
        Syscall::Cat { path_ptr } => fsh::sys_cat(frame, path_ptr),
        Syscall::Chdir { path_ptr } => fsh::sys_chdir(frame, path_ptr),
        Syscall::Note { path_ptr } => fsh::sys_note(frame, path_ptr),
        Syscall::Fork => ph::sys_fork(frame),
        Syscall::Disk { cmd_ptr } => fsh::sys_disk(frame, cmd_ptr),
        Syscall::ShellMotd => ph::sys_shell_motd(frame),
        Syscall::GetCursorOffset => uih::sys_get_cursor_offset(frame),
        Syscall::SetCursorOffset { offset } => uih::sys_set_cursor_offset(frame, offset),
        Syscall::FbInfo { out_ptr } => uih::sys_fb_info(frame, out_ptr),
        Syscall::FbFillRect { rect_ptr } => uih::sys_fb_fill_rect(frame, rect_ptr),
        Syscall::FbDrawText { text_ptr } => uih::sys_fb_draw_text(frame, text_ptr),
        Syscall::CursorVisible { visible } => uih::sys_cursor_visible(frame, visible),
        Syscall::MouseState { out_ptr } => uih::sys_mouse_state(frame, out_ptr),
        Syscall::MouseDraw { visible } => uih::sys_mouse_draw(frame, visible),
        Syscall::GetKeyNonblock => uih::sys_getkey_nonblock(frame),
        Syscall::GuiBind => uih::sys_gui_bind(frame),
        Syscall::GuiSend { msg_ptr } => uih::sys_gui_send(frame, msg_ptr),
        Syscall::GuiRecv { msg_ptr } => uih::sys_gui_recv(frame, msg_ptr),
        Syscall::DirList { req_ptr } => fsh::sys_dir_list(frame, req_ptr),
    }
}
