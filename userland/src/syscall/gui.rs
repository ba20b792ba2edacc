//! GUI IPC wrappers and client-side message helpers.

use orion_abi::gui::{GUI_MSG_CLOSE, GUI_MSG_CREATE, GUI_MSG_SET_TEXT, GuiMessage, gui_pack_wh};
use orion_abi::syscall as nr;

use super::raw::sys_call1;

pub fn sys_gui_bind() -> bool {
    sys_call1(nr::SYS_GUI_BIND, 0) != 0
}

pub fn sys_gui_send(msg: &GuiMessage) -> bool {
    sys_call1(nr::SYS_GUI_SEND, msg as *const _ as u32) != 0
}

pub fn sys_gui_recv(msg: &mut GuiMessage) -> bool {
    sys_call1(nr::SYS_GUI_RECV, msg as *mut _ as u32) != 0
}

/// CREATE: negative coordinates cascade, zero sizes pick the default.
pub fn gui_create(x: i32, y: i32, w: i32, h: i32, title: &str) -> bool {
    let mut msg = GuiMessage::empty();
    msg.msg_type = GUI_MSG_CREATE;
    msg.a = x;
    msg.b = y;
    msg.c = if w > 0 && h > 0 {
        gui_pack_wh(w as u32, h as u32)
    } else {
        0
    };
    msg.set_text(title.as_bytes());
    sys_gui_send(&msg)
}

pub fn gui_set_text(text: &str) -> bool {
    let mut msg = GuiMessage::empty();
    msg.msg_type = GUI_MSG_SET_TEXT;
    msg.set_text(text.as_bytes());
    sys_gui_send(&msg)
}

pub fn gui_close() -> bool {
    let mut msg = GuiMessage::empty();
    msg.msg_type = GUI_MSG_CLOSE;
    sys_gui_send(&msg)
}
