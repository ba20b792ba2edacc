//! The GUI server: single compositor process.
//!
//! Binds the seat, owns the window table and z-order, and repaints the
//! desktop. Logical state changes in the event loop; a dirty flag picks
//! between a full redraw and a taskbar-only one, and the software mouse
//! cursor is hidden around any painting so its saved pixels survive.

use alloc::format;
use alloc::string::String;

use orion_abi::gui::{
    GUI_MSG_CLOSE, GUI_MSG_CREATE, GUI_MSG_SET_TEXT, GUI_MSG_TEXT_MAX, GuiMessage, gui_unpack_h,
    gui_unpack_w,
};
use orion_abi::input::{KEY_DOWN, KEY_LEFT, KEY_RIGHT, KEY_UP, MOUSE_BUTTON_LEFT};
use orion_abi::syscall::{FbInfo, MouseState};

use crate::syscall::*;

const MAX_WINDOWS: usize = 8;
const LOG_LINES_MAX: usize = 32;
const LOG_LINE_MAX: usize = 96;

const fn rgb(r: u32, g: u32, b: u32) -> u32 {
    (r << 16) | (g << 8) | b
}

const COLOR_DESKTOP: u32 = rgb(0, 128, 128);
const COLOR_TASKBAR: u32 = rgb(192, 192, 192);
const COLOR_FACE: u32 = rgb(192, 192, 192);
const COLOR_LIGHT: u32 = rgb(255, 255, 255);
const COLOR_LIGHT2: u32 = rgb(223, 223, 223);
const COLOR_SHADOW: u32 = rgb(128, 128, 128);
const COLOR_DARK: u32 = rgb(64, 64, 64);
const COLOR_TITLE: u32 = rgb(0, 0, 128);
const COLOR_TITLE_LIGHT: u32 = rgb(0, 0, 160);
const COLOR_TITLE_TEXT: u32 = rgb(255, 255, 255);
const COLOR_TEXT: u32 = rgb(0, 0, 0);
const COLOR_LOG_BG: u32 = rgb(255, 255, 255);
const COLOR_ICON_TEXT: u32 = rgb(255, 255, 255);

// ---------------------------------------------------------------------------
// Layout
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Default)]
struct Layout {
    width: i32,
    height: i32,
    font_w: i32,
    font_h: i32,
    margin: i32,
    line_h: i32,
    taskbar_h: i32,
    desktop_h: i32,
    icon_size: i32,
    icon_gap_y: i32,
    icon_label_w: i32,
    work_x: i32,
    work_y: i32,
    work_w: i32,
    work_h: i32,
    win_frame: i32,
    win_pad: i32,
    win_title_h: i32,
    win_min_w: i32,
    win_min_h: i32,
    default_win_w: i32,
    default_win_h: i32,
    start_x: i32,
    start_y: i32,
    start_w: i32,
    start_h: i32,
    clock_x: i32,
    clock_y: i32,
    clock_w: i32,
    clock_h: i32,
}

impl Layout {
    /// Everything is derived from the screen's resolved metrics; windows
    /// are clamped to the work area (screen minus taskbar).
    fn compute(fb: &FbInfo) -> Self {
        let mut ui = Layout {
            width: fb.width as i32,
            height: fb.height as i32,
            font_w: if fb.font_w != 0 { fb.font_w as i32 } else { 8 },
            font_h: if fb.font_h != 0 { fb.font_h as i32 } else { 16 },
            margin: 12,
            ..Layout::default()
        };
        ui.line_h = ui.font_h + 2;
        ui.taskbar_h = (ui.font_h + 10).clamp(22, ui.height.max(22));
        ui.desktop_h = (ui.height - ui.taskbar_h).max(0);

        ui.work_x = 0;
        ui.work_y = 0;
        ui.work_w = ui.width;
        ui.work_h = ui.desktop_h;

        ui.icon_size = ui.font_h.max(16);
        ui.icon_gap_y = ui.icon_size + ui.font_h + 6;
        ui.icon_label_w = (ui.font_w * 12).max(ui.icon_size + 2);

        ui.win_frame = 2;
        ui.win_pad = 3;
        ui.win_title_h = (ui.font_h + 6).max(18);
        ui.win_min_w = ui.font_w * 16;
        ui.win_min_h = ui.font_h * 6 + ui.win_title_h + ui.win_frame * 2 + ui.win_pad * 2;

        let mut max_w = ui.work_w - ui.margin * 2 - ui.icon_label_w;
        if max_w < ui.win_min_w {
            max_w = (ui.work_w - ui.margin * 2).max(ui.win_min_w);
        }
        ui.default_win_w = (ui.font_w * 42).clamp(ui.win_min_w, max_w.max(ui.win_min_w));

        let max_h = (ui.work_h - ui.margin * 2).max(ui.win_min_h);
        ui.default_win_h = (ui.font_h * 12 + ui.win_title_h + 12).clamp(ui.win_min_h, max_h);

        ui.start_w = ui.font_w * 5 + 18;
        ui.start_h = (ui.taskbar_h - 8).clamp(16, ui.taskbar_h);
        ui.start_x = 6;
        ui.start_y = ui.height - ui.taskbar_h + (ui.taskbar_h - ui.start_h) / 2;

        ui.clock_w = ui.font_w * 8 + 12;
        ui.clock_h = ui.start_h;
        ui.clock_x = (ui.width - ui.clock_w - 6).max(ui.start_x + ui.start_w + 6);
        ui.clock_y = ui.start_y;
        ui
    }
}

// ---------------------------------------------------------------------------
// Window table + z-order
// ---------------------------------------------------------------------------

#[derive(Clone, Copy)]
struct Window {
    used: bool,
    system: bool,
    pid: u32,
    x: i32,
    y: i32,
    w: i32,
    h: i32,
    title: [u8; 32],
    body: [u8; GUI_MSG_TEXT_MAX],
}

impl Window {
    const fn empty() -> Self {
        Self {
            used: false,
            system: false,
            pid: 0,
            x: 0,
            y: 0,
            w: 0,
            h: 0,
            title: [0; 32],
            body: [0; GUI_MSG_TEXT_MAX],
        }
    }

    fn title_str(&self) -> &str {
        orion_lib::string::bytes_as_str(&self.title)
    }

    fn body_str(&self) -> &str {
        orion_lib::string::bytes_as_str(&self.body)
    }
}

struct Compositor {
    ui: Layout,
    windows: [Window; MAX_WINDOWS],
    /// Indices of used windows, back-to-front; the focused window is the
    /// last drawn.
    z_order: [i32; MAX_WINDOWS],
    z_count: usize,
    focused: i32,
    next_cascade: i32,
    log_lines: [[u8; LOG_LINE_MAX]; LOG_LINES_MAX],
    log_count: usize,
    log_capacity: usize,
    log_cols: usize,
}

impl Compositor {
    fn new(ui: Layout) -> Self {
        Self {
            ui,
            windows: [Window::empty(); MAX_WINDOWS],
            z_order: [-1; MAX_WINDOWS],
            z_count: 0,
            focused: -1,
            next_cascade: 0,
            log_lines: [[0; LOG_LINE_MAX]; LOG_LINES_MAX],
            log_count: 0,
            log_capacity: 0,
            log_cols: 0,
        }
    }

    fn find_by_pid(&self, pid: u32) -> Option<usize> {
        self.windows
            .iter()
            .position(|w| w.used && !w.system && w.pid == pid)
    }

    fn remove_from_z(&mut self, idx: usize) {
        for i in 0..self.z_count {
            if self.z_order[i] == idx as i32 {
                for j in i + 1..self.z_count {
                    self.z_order[j - 1] = self.z_order[j];
                }
                self.z_count -= 1;
                self.z_order[self.z_count] = -1;
                return;
            }
        }
    }

    fn focus(&mut self, idx: usize) {
        if !self.windows[idx].used {
            return;
        }
        self.remove_from_z(idx);
        if self.z_count < MAX_WINDOWS {
            self.z_order[self.z_count] = idx as i32;
            self.z_count += 1;
        }
        self.focused = idx as i32;
    }

    fn clamp_to_work(&self, win: &mut Window) {
        let ui = &self.ui;
        let min_w = ui.win_min_w.min(ui.work_w);
        let min_h = ui.win_min_h.min(ui.work_h);

        win.w = win.w.clamp(min_w, ui.work_w);
        win.h = win.h.clamp(min_h, ui.work_h);
        win.x = win.x.max(ui.work_x);
        win.y = win.y.max(ui.work_y);
        if win.x + win.w > ui.work_x + ui.work_w {
            win.x = ui.work_x + ui.work_w - win.w;
        }
        if win.y + win.h > ui.work_y + ui.work_h {
            win.y = ui.work_y + ui.work_h - win.h;
        }
        win.x = win.x.max(ui.work_x);
        win.y = win.y.max(ui.work_y);
    }

    /// Allocate a window. Negative position cascades; non-positive size
    /// uses the defaults.
    fn create(
        &mut self,
        pid: u32,
        x: i32,
        y: i32,
        w: i32,
        h: i32,
        title: &str,
        system: bool,
    ) -> Option<usize> {
        let slot = self.windows.iter().position(|w| !w.used)?;

        let mut win = Window::empty();
        win.used = true;
        win.system = system;
        win.pid = pid;
        win.w = if w > 0 { w } else { self.ui.default_win_w };
        win.h = if h > 0 { h } else { self.ui.default_win_h };

        if x < 0 || y < 0 {
            let mut base_x = self.ui.margin + self.ui.icon_label_w + 12;
            if base_x + win.w > self.ui.work_w - self.ui.margin {
                base_x = self.ui.margin;
            }
            win.x = base_x + self.next_cascade;
            win.y = self.ui.margin + self.next_cascade;
            self.next_cascade = (self.next_cascade + 20) % 120;
        } else {
            win.x = x;
            win.y = y;
        }
        self.clamp_to_work(&mut win);

        if title.is_empty() {
            orion_lib::string::copy_into_padded(&mut win.title, format!("App {}", pid).as_bytes());
        } else {
            orion_lib::string::copy_into_padded(&mut win.title, title.as_bytes());
        }

        self.windows[slot] = win;
        if self.z_count < MAX_WINDOWS {
            self.z_order[self.z_count] = slot as i32;
            self.z_count += 1;
        }
        self.focused = slot as i32;
        Some(slot)
    }

    /// Only client windows can be destroyed; the system log stays.
    fn destroy(&mut self, idx: usize) {
        if !self.windows[idx].used || self.windows[idx].system {
            return;
        }
        self.windows[idx].used = false;
        self.remove_from_z(idx);
        if self.focused == idx as i32 {
            self.focused = if self.z_count > 0 {
                self.z_order[self.z_count - 1]
            } else {
                -1
            };
        }
    }

    /// Front-to-back hit test: the first rectangle containing the pixel
    /// wins.
    fn window_at(&self, px: i32, py: i32) -> Option<usize> {
        for i in (0..self.z_count).rev() {
            let idx = self.z_order[i];
            if idx < 0 {
                continue;
            }
            let win = &self.windows[idx as usize];
            if !win.used {
                continue;
            }
            if px >= win.x && px < win.x + win.w && py >= win.y && py < win.y + win.h {
                return Some(idx as usize);
            }
        }
        None
    }

    /// Title-bar close button: a square at the title's right edge.
    fn hit_close(&self, win: &Window, px: i32, py: i32) -> bool {
        let ui = &self.ui;
        let title_x = win.x + ui.win_frame;
        let title_y = win.y + ui.win_frame;
        let title_w = win.w - ui.win_frame * 2;
        let title_h = ui.win_title_h.min(win.h - ui.win_frame * 2);
        if title_w <= 0 || title_h <= 0 {
            return false;
        }
        let btn = (title_h - 6).clamp(12, title_h);
        let close_x = title_x + title_w - btn - 4;
        let close_y = title_y + (title_h - btn) / 2;
        px >= close_x && px < close_x + btn && py >= close_y && py < close_y + btn
    }

    fn client_count(&self) -> usize {
        self.windows
            .iter()
            .filter(|w| w.used && !w.system)
            .count()
    }

    // -- log ---------------------------------------------------------------

    fn log_clear(&mut self) {
        self.log_count = 0;
    }

    fn log_push(&mut self, msg: &str) {
        if self.log_capacity == 0 {
            return;
        }
        let cols = self.log_cols.min(LOG_LINE_MAX - 1);
        if self.log_count < self.log_capacity {
            let line = &mut self.log_lines[self.log_count];
            orion_lib::string::copy_into_padded(line, &msg.as_bytes()[..msg.len().min(cols)]);
            self.log_count += 1;
            return;
        }
        for i in 1..self.log_capacity {
            self.log_lines[i - 1] = self.log_lines[i];
        }
        let line = &mut self.log_lines[self.log_capacity - 1];
        orion_lib::string::copy_into_padded(line, &msg.as_bytes()[..msg.len().min(cols)]);
    }

    fn update_log_metrics(&mut self, text_w: i32, text_h: i32) {
        if text_w <= 0 || text_h <= 0 {
            self.log_capacity = 0;
            self.log_cols = 0;
            return;
        }
        self.log_capacity = ((text_h / self.ui.line_h) as usize).min(LOG_LINES_MAX);
        self.log_cols = ((text_w / self.ui.font_w) as usize).min(LOG_LINE_MAX - 1);
        if self.log_count > self.log_capacity {
            self.log_count = self.log_capacity;
        }
    }

    fn text_area(&self, win: &Window) -> (i32, i32, i32, i32) {
        let ui = &self.ui;
        let x = win.x + ui.win_frame + ui.win_pad;
        let y = win.y + ui.win_frame + ui.win_title_h + ui.win_pad;
        let w = (win.w - ui.win_frame * 2 - ui.win_pad * 2).max(0);
        let h = (win.h - ui.win_frame * 2 - ui.win_title_h - ui.win_pad * 2).max(0);
        (x, y, w, h)
    }
}

// ---------------------------------------------------------------------------
// Drawing
// ---------------------------------------------------------------------------

fn draw_frame(x: i32, y: i32, w: i32, h: i32, top_left: u32, bottom_right: u32) {
    if w <= 0 || h <= 0 {
        return;
    }
    sys_fb_fill_rect(x, y, w, 1, top_left);
    sys_fb_fill_rect(x, y, 1, h, top_left);
    sys_fb_fill_rect(x, y + h - 1, w, 1, bottom_right);
    sys_fb_fill_rect(x + w - 1, y, 1, h, bottom_right);
}

fn draw_bevel(x: i32, y: i32, w: i32, h: i32, raised: bool) {
    if w <= 2 || h <= 2 {
        return;
    }
    if raised {
        draw_frame(x, y, w, h, COLOR_LIGHT, COLOR_DARK);
        draw_frame(x + 1, y + 1, w - 2, h - 2, COLOR_LIGHT2, COLOR_SHADOW);
    } else {
        draw_frame(x, y, w, h, COLOR_DARK, COLOR_LIGHT);
        draw_frame(x + 1, y + 1, w - 2, h - 2, COLOR_SHADOW, COLOR_LIGHT2);
    }
}

fn clamp_cols(text: &str, max_cols: usize) -> &str {
    if max_cols == 0 || text.len() <= max_cols {
        text
    } else {
        &text[..max_cols]
    }
}

fn draw_icon(ui: &Layout, x: i32, y: i32, label: &str, glyph: &str) {
    sys_fb_fill_rect(x, y, ui.icon_size, ui.icon_size, COLOR_FACE);
    draw_bevel(x, y, ui.icon_size, ui.icon_size, true);
    if !glyph.is_empty() {
        let gx = x + (ui.icon_size - ui.font_w) / 2;
        let gy = y + (ui.icon_size - ui.font_h) / 2;
        sys_fb_draw_text(gx, gy, glyph, COLOR_TEXT, COLOR_FACE, true);
    }
    if !label.is_empty() {
        let cols = (ui.icon_label_w / ui.font_w).max(0) as usize;
        sys_fb_draw_text(
            x,
            y + ui.icon_size + 2,
            clamp_cols(label, cols),
            COLOR_ICON_TEXT,
            COLOR_DESKTOP,
            true,
        );
    }
}

fn draw_desktop_icons(ui: &Layout) {
    if ui.margin + ui.icon_size + ui.font_h < ui.desktop_h - ui.margin {
        draw_icon(ui, ui.margin, ui.margin, "Explorer", "E");
    }
}

fn icon_hit_explorer(ui: &Layout, px: i32, py: i32) -> bool {
    let w = ui.icon_label_w.max(ui.icon_size);
    let h = ui.icon_size + ui.font_h + 4;
    px >= ui.margin && px < ui.margin + w && py >= ui.margin && py < ui.margin + h
}

fn draw_taskbar(ui: &Layout, status: &str) {
    let y = (ui.height - ui.taskbar_h).max(0);
    sys_fb_fill_rect(0, y, ui.width, ui.taskbar_h, COLOR_TASKBAR);
    draw_bevel(0, y, ui.width, ui.taskbar_h, true);

    if ui.start_w > 0 && ui.start_h > 0 {
        sys_fb_fill_rect(ui.start_x, ui.start_y, ui.start_w, ui.start_h, COLOR_TASKBAR);
        draw_bevel(ui.start_x, ui.start_y, ui.start_w, ui.start_h, true);
        sys_fb_draw_text(
            ui.start_x + 8,
            ui.start_y + (ui.start_h - ui.font_h) / 2,
            "Start",
            COLOR_TEXT,
            COLOR_TASKBAR,
            true,
        );
    }

    if ui.clock_w > 0 && ui.clock_h > 0 && ui.clock_x < ui.width {
        sys_fb_fill_rect(ui.clock_x, ui.clock_y, ui.clock_w, ui.clock_h, COLOR_TASKBAR);
        draw_bevel(ui.clock_x, ui.clock_y, ui.clock_w, ui.clock_h, false);
        let ms = orion_lib::clock::uptime_ms();
        let clock = format!("{:>2}:{:02}:{:02}", ms / 3_600_000, (ms / 60_000) % 60, (ms / 1000) % 60);
        sys_fb_draw_text(
            ui.clock_x + 6,
            ui.clock_y + (ui.clock_h - ui.font_h) / 2,
            &clock,
            COLOR_TEXT,
            COLOR_TASKBAR,
            true,
        );
    }

    let status_x = ui.start_x + ui.start_w + 10;
    let status_w = ui.clock_x - status_x - 8;
    if status_w > ui.font_w * 6 {
        let cols = (status_w / ui.font_w).max(0) as usize;
        let text = if status.is_empty() { "Ready" } else { status };
        sys_fb_draw_text(
            status_x,
            ui.start_y + (ui.start_h - ui.font_h) / 2,
            clamp_cols(text, cols),
            COLOR_TEXT,
            COLOR_TASKBAR,
            true,
        );
    }
}

fn draw_window_frame(ui: &Layout, win: &Window, focused: bool) {
    if win.w <= 0 || win.h <= 0 {
        return;
    }
    sys_fb_fill_rect(win.x, win.y, win.w, win.h, COLOR_FACE);
    draw_bevel(win.x, win.y, win.w, win.h, true);

    let title_x = win.x + ui.win_frame;
    let title_y = win.y + ui.win_frame;
    let title_w = (win.w - ui.win_frame * 2).max(0);
    let title_h = ui.win_title_h.clamp(0, (win.h - ui.win_frame * 2).max(0));
    if title_h == 0 || title_w == 0 {
        return;
    }

    let title_color = if focused { COLOR_TITLE } else { COLOR_LIGHT2 };
    let title_text = if focused { COLOR_TITLE_TEXT } else { COLOR_TEXT };
    sys_fb_fill_rect(title_x, title_y, title_w, title_h, title_color);
    if focused {
        sys_fb_fill_rect(title_x, title_y, title_w, 1, COLOR_TITLE_LIGHT);
    }

    let btn = (title_h - 6).clamp(12, title_h);
    let close_x = title_x + title_w - btn - 4;
    let close_y = title_y + (title_h - btn) / 2;
    let text_x = title_x + 6;
    let text_cols = (((close_x - text_x - 4).max(0)) / ui.font_w) as usize;
    sys_fb_draw_text(
        text_x,
        title_y + (title_h - ui.font_h) / 2,
        clamp_cols(win.title_str(), text_cols),
        title_text,
        title_color,
        true,
    );

    if btn > 0 && close_x >= title_x {
        sys_fb_fill_rect(close_x, close_y, btn, btn, COLOR_FACE);
        draw_bevel(close_x, close_y, btn, btn, true);
        sys_fb_draw_text(
            close_x + (btn - ui.font_w) / 2,
            close_y + (btn - ui.font_h) / 2,
            "X",
            COLOR_TEXT,
            COLOR_FACE,
            true,
        );
    }
}

fn draw_window_content(comp: &mut Compositor, idx: usize) {
    let win = comp.windows[idx];
    let (tx, ty, tw, th) = comp.text_area(&win);
    if tw <= 0 || th <= 0 {
        return;
    }
    sys_fb_fill_rect(tx, ty, tw, th, COLOR_LOG_BG);

    if win.system {
        comp.update_log_metrics(tw, th);
        for i in 0..comp.log_count {
            let y = ty + i as i32 * comp.ui.line_h;
            let line = orion_lib::string::bytes_as_str(&comp.log_lines[i]);
            sys_fb_draw_text(tx, y, line, COLOR_TEXT, COLOR_LOG_BG, true);
        }
        return;
    }

    let cols = ((tw / comp.ui.font_w).max(0)) as usize;
    sys_fb_draw_text(
        tx,
        ty,
        clamp_cols(win.body_str(), cols),
        COLOR_TEXT,
        COLOR_LOG_BG,
        true,
    );
}

fn draw_full_ui(comp: &mut Compositor, status: &str) {
    let ui = comp.ui;
    sys_fb_fill_rect(0, 0, ui.width, ui.height, COLOR_DESKTOP);
    draw_desktop_icons(&ui);
    for i in 0..comp.z_count {
        let idx = comp.z_order[i];
        if idx < 0 || !comp.windows[idx as usize].used {
            continue;
        }
        let focused = idx == comp.focused;
        draw_window_frame(&ui, &comp.windows[idx as usize], focused);
        draw_window_content(comp, idx as usize);
    }
    draw_taskbar(&ui, status);
}

// ---------------------------------------------------------------------------
// Status line
// ---------------------------------------------------------------------------

fn format_key(key: u32) -> String {
    match key {
        0 => String::from("-"),
        0x0D | 0x0A => String::from("ENTER"),
        0x08 => String::from("BS"),
        0x7F => String::from("DEL"),
        0x1B => String::from("ESC"),
        KEY_LEFT => String::from("LEFT"),
        KEY_RIGHT => String::from("RIGHT"),
        KEY_UP => String::from("UP"),
        KEY_DOWN => String::from("DOWN"),
        0x20..=0x7E => String::from(key as u8 as char),
        other => format!("{:#x}", other),
    }
}

fn format_buttons(buttons: i32) -> String {
    let mut out = String::new();
    if buttons & 0x1 != 0 {
        out.push('L');
    }
    if buttons & 0x2 != 0 {
        out.push('R');
    }
    if buttons & 0x4 != 0 {
        out.push('M');
    }
    if out.is_empty() {
        out.push('-');
    }
    out
}

fn build_status(comp: &Compositor, key_desc: &str, mouse: &MouseState) -> String {
    let px = mouse.x * comp.ui.font_w;
    let py = mouse.y * comp.ui.font_h;
    let focus_title = if comp.focused >= 0 && comp.windows[comp.focused as usize].used {
        comp.windows[comp.focused as usize].title_str()
    } else {
        "Desktop"
    };
    format!(
        "Key:{}  Mouse:{},{}  Win:{}  Active:{}  [{}]",
        key_desc,
        px,
        py,
        comp.client_count(),
        focus_title,
        format_buttons(mouse.buttons)
    )
}

// ---------------------------------------------------------------------------
// Message handling
// ---------------------------------------------------------------------------

fn handle_message(comp: &mut Compositor, msg: &GuiMessage) -> bool {
    let mut dirty = false;
    let existing = comp.find_by_pid(msg.sender_pid);
    let text = String::from(orion_lib::string::bytes_as_str(&msg.text));

    match msg.msg_type {
        GUI_MSG_CREATE => {
            let (mut w, mut h) = (-1, -1);
            if msg.c > 0 {
                w = gui_unpack_w(msg.c);
                h = gui_unpack_h(msg.c);
                if w <= 0 {
                    w = -1;
                }
                if h <= 0 {
                    h = -1;
                }
            }
            match existing {
                None => {
                    if comp
                        .create(msg.sender_pid, msg.a, msg.b, w, h, &text, false)
                        .is_some()
                    {
                        comp.log_push(&format!("pid {}: window created", msg.sender_pid));
                        dirty = true;
                    }
                }
                Some(idx) => {
                    if !text.is_empty() {
                        orion_lib::string::copy_into_padded(
                            &mut comp.windows[idx].title,
                            text.as_bytes(),
                        );
                    }
                    comp.focus(idx);
                    dirty = true;
                }
            }
        }
        GUI_MSG_SET_TEXT => {
            let idx = match existing {
                Some(idx) => Some(idx),
                None => {
                    let created = comp.create(msg.sender_pid, -1, -1, -1, -1, "", false);
                    if created.is_some() {
                        comp.log_push(&format!("pid {}: window created (text)", msg.sender_pid));
                    }
                    created
                }
            };
            if let Some(idx) = idx {
                orion_lib::string::copy_into_padded(&mut comp.windows[idx].body, text.as_bytes());
                dirty = true;
            }
        }
        GUI_MSG_CLOSE => {
            if let Some(idx) = existing {
                comp.log_push(&format!("pid {}: window closed", msg.sender_pid));
                comp.destroy(idx);
                dirty = true;
            }
        }
        other => {
            comp.log_push(&format!("pid {}: msg {}", msg.sender_pid, other));
        }
    }
    dirty
}

// ---------------------------------------------------------------------------
// Server entry
// ---------------------------------------------------------------------------

pub extern "C" fn gui_entry() {
    let Some(fb) = sys_fb_info() else {
        sys_kprint("gui: framebuffer unavailable\n");
        sys_exit(1);
    };
    if !sys_gui_bind() {
        sys_kprint("gui: already running\n");
        sys_exit(1);
    }

    sys_cursor_visible(false);
    sys_mouse_draw(false);

    let ui = Layout::compute(&fb);
    let mut comp = Compositor::new(ui);

    // The system log window exists from startup and cannot be closed.
    let sys_w = ui.default_win_w;
    let sys_h = ui.default_win_h + ui.font_h * 4;
    if let Some(idx) = comp.create(0, -1, -1, sys_w, sys_h, "System Log", true) {
        let win = comp.windows[idx];
        let (_, _, tw, th) = comp.text_area(&win);
        comp.update_log_metrics(tw, th);
    }
    comp.log_clear();
    comp.log_push("GUI server ready");
    comp.log_push("Waiting for messages...");

    let mut mouse = sys_mouse_state().unwrap_or_default();
    let mut last_mouse = mouse;
    let mut key_desc = format_key(0);

    let mut status = build_status(&comp, &key_desc, &mouse);
    draw_full_ui(&mut comp, &status);
    sys_mouse_draw(true);

    let mut running = true;
    while running {
        let mut windows_dirty = false;
        let mut status_dirty = false;

        let mut msg = GuiMessage::empty();
        while sys_gui_recv(&mut msg) {
            if handle_message(&mut comp, &msg) {
                windows_dirty = true;
            }
        }

        // With no client windows the keyboard drives the server itself.
        if comp.client_count() == 0 {
            let key = sys_getkey_nb();
            if key != 0 {
                key_desc = format_key(key);
                status_dirty = true;
                match key {
                    0x1B | 0x71 | 0x51 => running = false,
                    0x63 | 0x43 => {
                        comp.log_clear();
                        comp.log_push("log cleared");
                        windows_dirty = true;
                    }
                    _ => {}
                }
            }
        }

        if let Some(cur) = sys_mouse_state() {
            if cur.x != last_mouse.x || cur.y != last_mouse.y || cur.buttons != last_mouse.buttons
            {
                let px = cur.x * comp.ui.font_w;
                let py = cur.y * comp.ui.font_h;
                let clicked =
                    cur.buttons & MOUSE_BUTTON_LEFT != 0 && last_mouse.buttons & MOUSE_BUTTON_LEFT == 0;
                if clicked {
                    if let Some(hit) = comp.window_at(px, py) {
                        let win = comp.windows[hit];
                        if !win.system && comp.hit_close(&win, px, py) {
                            comp.destroy(hit);
                        } else {
                            comp.focus(hit);
                        }
                        windows_dirty = true;
                    } else if icon_hit_explorer(&comp.ui, px, py) {
                        if sys_spawn("/cmd/explorer.sys", &["/cmd/explorer.sys"]) == 0 {
                            comp.log_push("explorer: spawn failed");
                        } else {
                            comp.log_push("explorer: launched");
                        }
                        windows_dirty = true;
                    }
                }
                last_mouse = cur;
                mouse = cur;
                status_dirty = true;
            }
        }

        if windows_dirty || status_dirty {
            status = build_status(&comp, &key_desc, &mouse);
        }
        if windows_dirty {
            // Hide the software cursor around painting so its saved
            // pixels are not stale.
            sys_mouse_draw(false);
            draw_full_ui(&mut comp, &status);
            sys_mouse_draw(true);
        } else if status_dirty {
            let over_taskbar = mouse.y * comp.ui.font_h >= comp.ui.height - comp.ui.taskbar_h;
            if over_taskbar {
                sys_mouse_draw(false);
            }
            draw_taskbar(&comp.ui, &status);
            if over_taskbar {
                sys_mouse_draw(true);
            }
        }

        sys_yield();
    }

    sys_mouse_draw(false);
    sys_clear_screen();
    sys_cursor_visible(true);
    sys_exit(0);
}
