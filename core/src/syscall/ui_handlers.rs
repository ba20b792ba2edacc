//! Console, framebuffer, input, and GUI IPC syscalls.

use orion_abi::gui::GuiMessage;
use orion_abi::syscall::{FbRect, FbText, MouseState, SYS_FB_TEXT_TRANSPARENT};
use orion_lib::TrapFrame;
use orion_lib::cpu;
use orion_lib::services::{CONSOLE, FRAMEBUFFER, INPUT, PLATFORM, SPEAKER};

use crate::gui;
use crate::proc::{proc_current_pid, proc_pid_alive};

use super::common::{copy_path, copy_struct_in, copy_struct_out, ret, ret_fault};

/// SYS_KPRINT: append to the console under the IRQ-safe lock.
pub fn sys_kprint(frame: &mut TrapFrame, text_ptr: u32) {
    if text_ptr == 0 {
        ret(frame, 0);
        return;
    }
    let Some(text) = copy_path(text_ptr) else {
        ret_fault(frame);
        return;
    };
    let flags = cpu::save_flags_cli();
    orion_lib::console::kprint(text.as_str());
    cpu::restore_flags(flags);
    ret(frame, 1);
}

pub fn sys_clear_screen(frame: &mut TrapFrame) {
    orion_lib::console::clear_screen();
    ret(frame, 1);
}

pub fn sys_beep(frame: &mut TrapFrame, hz: u32, ms: u32) {
    if let Some(speaker) = SPEAKER.get() {
        (speaker.beep)(hz, ms);
    }
    ret(frame, 1);
}

/// Restart the current syscall: back the saved eip over the two-byte
/// `int imm8`, hand the CPU to anyone ready, and let the caller re-trap.
/// This is how "blocking" key reads block the caller without starving the
/// rest of the table.
fn restart_and_yield(frame: &mut TrapFrame) {
    frame.eip = frame.eip.wrapping_sub(2);
    crate::proc::proc_schedule(frame, true);
    // Still the chosen context (no pivot armed): let an interrupt land
    // before re-trapping instead of spinning on the vector.
    if crate::proc::SCHED_NEXT_ESP.load(core::sync::atomic::Ordering::Relaxed) == 0 {
        orion_lib::cpu::sti_halt();
    }
}

pub fn sys_pause(frame: &mut TrapFrame) {
    let key = INPUT.get().map_or(0, |input| (input.getkey_nonblock)());
    if key == 0 {
        restart_and_yield(frame);
        return;
    }
    ret(frame, 1);
}

/// SYS_GETKEY: blocking; the key comes back in `ecx` (historical quirk).
pub fn sys_getkey(frame: &mut TrapFrame) {
    let key = INPUT.get().map_or(0, |input| (input.getkey_nonblock)());
    if key == 0 && INPUT.get().is_some() {
        restart_and_yield(frame);
        return;
    }
    frame.ecx = key;
}

pub fn sys_getkey_nonblock(frame: &mut TrapFrame) {
    let key = INPUT.get().map_or(0, |input| (input.getkey_nonblock)());
    ret(frame, key);
}

pub fn sys_reboot(frame: &mut TrapFrame) {
    if let Some(platform) = PLATFORM.get() {
        (platform.reboot)();
    }
    ret(frame, 0);
}

pub fn sys_get_cursor_offset(frame: &mut TrapFrame) {
    let offset = CONSOLE.get().map_or(0, |c| (c.get_cursor_offset)());
    ret(frame, offset as u32);
}

pub fn sys_set_cursor_offset(frame: &mut TrapFrame, offset: i32) {
    if let Some(console) = CONSOLE.get() {
        let max = (console.cols)() * (console.rows)() * 2;
        let clamped = if offset < 0 {
            0
        } else if offset >= max {
            if max > 1 { max - 2 } else { 0 }
        } else {
            offset
        };
        (console.set_cursor_offset)(clamped);
    }
    ret(frame, 0);
}

pub fn sys_cursor_visible(frame: &mut TrapFrame, visible: bool) {
    if let Some(console) = CONSOLE.get() {
        (console.set_cursor_visible)(visible);
    }
    ret(frame, 1);
}

// ---------------------------------------------------------------------------
// Framebuffer + mouse (GUI server surface)
// ---------------------------------------------------------------------------

pub fn sys_fb_info(frame: &mut TrapFrame, out_ptr: u32) {
    let Some(fb) = FRAMEBUFFER.get() else {
        ret(frame, 0);
        return;
    };
    let Some(info) = (fb.info)() else {
        ret(frame, 0);
        return;
    };
    if out_ptr == 0 || !copy_struct_out(out_ptr, &info) {
        ret(frame, 0);
        return;
    }
    ret(frame, 1);
}

pub fn sys_fb_fill_rect(frame: &mut TrapFrame, rect_ptr: u32) {
    let (Some(fb), Some(rect)) = (FRAMEBUFFER.get(), copy_struct_in::<FbRect>(rect_ptr)) else {
        ret(frame, 0);
        return;
    };
    (fb.fill_rect)(rect.x, rect.y, rect.w, rect.h, rect.color);
    ret(frame, 1);
}

pub fn sys_fb_draw_text(frame: &mut TrapFrame, text_ptr: u32) {
    let (Some(fb), Some(req)) = (FRAMEBUFFER.get(), copy_struct_in::<FbText>(text_ptr)) else {
        ret(frame, 0);
        return;
    };
    if req.text_ptr == 0 {
        ret(frame, 0);
        return;
    }
    let Some(text) = copy_path(req.text_ptr) else {
        ret(frame, 0);
        return;
    };
    let transparent = req.flags & SYS_FB_TEXT_TRANSPARENT != 0;
    (fb.draw_text)(
        req.x,
        req.y,
        text.as_str().as_bytes(),
        req.fg,
        req.bg,
        transparent,
    );
    ret(frame, 1);
}

pub fn sys_mouse_state(frame: &mut TrapFrame, out_ptr: u32) {
    let Some(input) = INPUT.get() else {
        ret(frame, 0);
        return;
    };
    let state: MouseState = (input.mouse_state)();
    if out_ptr == 0 || !copy_struct_out(out_ptr, &state) {
        ret(frame, 0);
        return;
    }
    ret(frame, 1);
}

pub fn sys_mouse_draw(frame: &mut TrapFrame, visible: bool) {
    if let Some(input) = INPUT.get() {
        (input.mouse_set_draw)(visible);
    }
    ret(frame, 1);
}

// ---------------------------------------------------------------------------
// GUI IPC
// ---------------------------------------------------------------------------

/// SYS_GUI_BIND: elect the caller as the single server, unless a live
/// server already holds the seat.
pub fn sys_gui_bind(frame: &mut TrapFrame) {
    let pid = proc_current_pid();
    ret(frame, gui::bind(pid, proc_pid_alive) as u32);
}

/// SYS_GUI_SEND: push a caller-owned copy; the kernel stamps the sender
/// pid. A full queue drops the message and returns 0.
pub fn sys_gui_send(frame: &mut TrapFrame, msg_ptr: u32) {
    if gui::server_pid() == 0 {
        ret(frame, 0);
        return;
    }
    let Some(msg) = copy_struct_in::<GuiMessage>(msg_ptr) else {
        ret(frame, 0);
        return;
    };
    ret(frame, gui::send(proc_current_pid(), msg) as u32);
}

/// SYS_GUI_RECV: server-only pop into a caller-owned buffer. The buffer is
/// validated before the pop so a bad pointer cannot lose a message.
pub fn sys_gui_recv(frame: &mut TrapFrame, msg_ptr: u32) {
    if msg_ptr == 0
        || orion_mm::user_copy::validate_user_buffer(
            msg_ptr,
            core::mem::size_of::<GuiMessage>() as u32,
        )
        .is_err()
    {
        ret(frame, 0);
        return;
    }
    let Some(mut msg) = gui::recv(proc_current_pid()) else {
        ret(frame, 0);
        return;
    };
    // Inline text always crosses back NUL-terminated.
    let last = msg.text.len() - 1;
    msg.text[last] = 0;
    if !copy_struct_out(msg_ptr, &msg) {
        ret(frame, 0);
        return;
    }
    ret(frame, 1);
}
