//! Syscall request decoding.
//!
//! The register convention (`eax` number, `ebx`/`ecx`/`edx` arguments) is
//! turned into one tagged union before dispatch, so every handler works on
//! named fields instead of register soup. Pointers stay raw here —
//! validation happens in the handlers, which know the shapes.

use orion_abi::syscall as nr;

#[derive(Clone, Copy, Debug)]
pub enum Syscall {
    StartShell,
    Kprint { text_ptr: u32 },
    ClearScreen,
    Beep { hz: u32, ms: u32 },
    Pause,
    GetKey,
    Reboot,
    Exit { code: u32 },
    Yield,
    SpawnThread { entry: u32, name_ptr: u32 },
    GetBootFlags,
    Open { path_ptr: u32 },
    Read { fd: u32, len: u32, buf_ptr: u32 },
    Write { fd: u32, len: u32, buf_ptr: u32 },
    Close { fd: u32 },
    StartSysmgr,
    PrintMotd { path_ptr: u32 },
    Spawn { path_ptr: u32, argv_ptr: u32, argc: i32 },
    Wait { pid: u32 },
    Exec { path_ptr: u32, argv_ptr: u32, argc: i32 },
    Ls { path_ptr: u32 },
    Cat { path_ptr: u32 },
    Chdir { path_ptr: u32 },
    Note { path_ptr: u32 },
    Fork,
    Disk { cmd_ptr: u32 },
    ShellMotd,
    GetCursorOffset,
    SetCursorOffset { offset: i32 },
    FbInfo { out_ptr: u32 },
    FbFillRect { rect_ptr: u32 },
    FbDrawText { text_ptr: u32 },
    CursorVisible { visible: bool },
    MouseState { out_ptr: u32 },
    MouseDraw { visible: bool },
    GetKeyNonblock,
    GuiBind,
    GuiSend { msg_ptr: u32 },
    GuiRecv { msg_ptr: u32 },
    DirList { req_ptr: u32 },
}

impl Syscall {
    pub fn decode(eax: u32, ebx: u32, ecx: u32, edx: u32) -> Option<Self> {
        Some(match eax {
            nr::SYS_START_SHELL => Syscall::StartShell,
            nr::SYS_KPRINT => Syscall::Kprint { text_ptr: ebx },
            nr::SYS_CLEAR_SCREEN => Syscall::ClearScreen,
            nr::SYS_BEEP => Syscall::Beep { hz: ebx, ms: ecx },
            nr::SYS_PAUSE => Syscall::Pause,
            nr::SYS_GETKEY => Syscall::GetKey,
            nr::SYS_REBOOT => Syscall::Reboot,
            nr::SYS_EXIT => Syscall::Exit { code: ebx },
            nr::SYS_YIELD => Syscall::Yield,
            nr::SYS_SPAWN_THREAD => Syscall::SpawnThread {
                entry: ebx,
                name_ptr: ecx,
            },
            nr::SYS_GET_BOOT_FLAGS => Syscall::GetBootFlags,
            nr::SYS_OPEN => Syscall::Open { path_ptr: ebx },
            nr::SYS_READ => Syscall::Read {
                fd: ebx,
                len: ecx,
                buf_ptr: edx,
            },
            nr::SYS_WRITE => Syscall::Write {
                fd: ebx,
                len: ecx,
                buf_ptr: edx,
            },
            nr::SYS_CLOSE => Syscall::Close { fd: ebx },
            nr::SYS_START_SYSMGR => Syscall::StartSysmgr,
            nr::SYS_PRINT_MOTD => Syscall::PrintMotd { path_ptr: ebx },
            nr::SYS_SPAWN => Syscall::Spawn {
                path_ptr: ebx,
                argv_ptr: ecx,
                argc: edx as i32,
            },
            nr::SYS_WAIT => Syscall::Wait { pid: ebx },
            nr::SYS_EXEC => Syscall::Exec {
                path_ptr: ebx,
                argv_ptr: ecx,
                argc: edx as i32,
            },
            nr::SYS_LS => Syscall::Ls { path_ptr: ebx },
            nr::SYS_CAT => Syscall::Cat { path_ptr: ebx },
            nr::SYS_CHDIR => Syscall::Chdir { path_ptr: ebx },
            nr::SYS_NOTE => Syscall::Note { path_ptr: ebx },
            nr::SYS_FORK => Syscall::Fork,
            nr::SYS_DISK => Syscall::Disk { cmd_ptr: ebx },
            nr::SYS_SH_MOTD => Syscall::ShellMotd,
            nr::SYS_GET_CURSOR_OFFSET => Syscall::GetCursorOffset,
            nr::SYS_SET_CURSOR_OFFSET => Syscall::SetCursorOffset {
                offset: ebx as i32,
            },
            nr::SYS_FB_INFO => Syscall::FbInfo { out_ptr: ebx },
            nr::SYS_FB_FILL_RECT => Syscall::FbFillRect { rect_ptr: ebx },
            nr::SYS_FB_DRAW_TEXT => Syscall::FbDrawText { text_ptr: ebx },
            nr::SYS_CURSOR_VISIBLE => Syscall::CursorVisible { visible: ebx != 0 },
            nr::SYS_MOUSE_STATE => Syscall::MouseState { out_ptr: ebx },
            nr::SYS_MOUSE_DRAW => Syscall::MouseDraw { visible: ebx != 0 },
            nr::SYS_GETKEY_NB => Syscall::GetKeyNonblock,
            nr::SYS_GUI_BIND => Syscall::GuiBind,
            nr::SYS_GUI_SEND => Syscall::GuiSend { msg_ptr: ebx },
            nr::SYS_GUI_RECV => Syscall::GuiRecv { msg_ptr: ebx },
            nr::SYS_DIR_LIST => Syscall::DirList { req_ptr: ebx },
            _ => return None,
        })
    }
}
