//! Framebuffer, cursor, and mouse wrappers (GUI server surface).

use orion_abi::syscall as nr;
use orion_abi::syscall::{FbInfo, FbRect, FbText, MouseState, SYS_FB_TEXT_TRANSPARENT};

use super::process::CStrBuf;
use super::raw::{sys_call0, sys_call1};

pub fn sys_fb_info() -> Option<FbInfo> {
    let mut info = FbInfo::default();
    if sys_call1(nr::SYS_FB_INFO, &mut info as *mut _ as u32) != 0 {
        Some(info)
    } else {
        None
    }
}

pub fn sys_fb_fill_rect(x: i32, y: i32, w: i32, h: i32, color: u32) {
    let rect = FbRect { x, y, w, h, color };
    sys_call1(nr::SYS_FB_FILL_RECT, &rect as *const _ as u32);
}

pub fn sys_fb_draw_text(x: i32, y: i32, text: &str, fg: u32, bg: u32, transparent: bool) {
    let c = CStrBuf::new(text);
    let req = FbText {
        x,
        y,
        fg,
        bg,
        flags: if transparent { SYS_FB_TEXT_TRANSPARENT } else { 0 },
        text_ptr: c.ptr(),
    };
    sys_call1(nr::SYS_FB_DRAW_TEXT, &req as *const _ as u32);
}

pub fn sys_cursor_visible(visible: bool) {
    sys_call1(nr::SYS_CURSOR_VISIBLE, visible as u32);
}

pub fn sys_get_cursor_offset() -> u32 {
    sys_call0(nr::SYS_GET_CURSOR_OFFSET)
}

pub fn sys_set_cursor_offset(offset: u32) {
    sys_call1(nr::SYS_SET_CURSOR_OFFSET, offset);
}

pub fn sys_mouse_state() -> Option<MouseState> {
    let mut state = MouseState::default();
    if sys_call1(nr::SYS_MOUSE_STATE, &mut state as *mut _ as u32) != 0 {
        Some(state)
    } else {
        None
    }
}

pub fn sys_mouse_draw(visible: bool) {
    sys_call1(nr::SYS_MOUSE_DRAW, visible as u32);
}
