//! Text console over either backend: the VGA text buffer at 0xB8000, or a
//! cell grid rendered onto the boot framebuffer.
//!
//! The cursor "offset" follows the VGA convention of two bytes per cell so
//! the syscall surface stays stable whichever backend is live.

use orion_lib::IrqMutex;
use orion_lib::io::Port;
use orion_lib::ports::{VGA_CRTC_DATA, VGA_CRTC_INDEX};
use orion_lib::services::{CONSOLE, ConsoleServices};

use crate::fb;
use crate::font::{GLYPH_H, GLYPH_W};

const VGA_TEXT_BASE: u32 = 0xB8000;
const TEXT_COLS: i32 = 80;
const TEXT_ROWS: i32 = 25;

/// Classic 16-color VGA palette as RGB for the framebuffer backend.
const PALETTE: [u32; 16] = [
    0x000000, 0x0000AA, 0x00AA00, 0x00AAAA, 0xAA0000, 0xAA00AA, 0xAA5500, 0xAAAAAA, 0x555555,
    0x5555FF, 0x55FF55, 0x55FFFF, 0xFF5555, 0xFF55FF, 0xFFFF55, 0xFFFFFF,
];

#[derive(Clone, Copy, PartialEq, Eq)]
enum Backend {
    VgaText,
    Framebuffer,
}

struct Console {
    backend: Backend,
    cols: i32,
    rows: i32,
    col: i32,
    row: i32,
    fg: u8,
    bg: u8,
    cursor_visible: bool,
}

static STATE: IrqMutex<Console> = IrqMutex::new(Console {
    backend: Backend::VgaText,
    cols: TEXT_COLS,
    rows: TEXT_ROWS,
    col: 0,
    row: 0,
    fg: 15,
    bg: 0,
    cursor_visible: true,
});

fn render_cell(console: &Console, col: i32, row: i32, ch: u8, fg: u8, bg: u8) {
    match console.backend {
        Backend::VgaText => {
            let off = (row * TEXT_COLS + col) as u32 * 2;
            // SAFETY: col/row are clamped to the 80x25 text buffer.
            unsafe {
                let cell = (VGA_TEXT_BASE + off) as *mut u8;
                core::ptr::write_volatile(cell, ch);
                core::ptr::write_volatile(cell.add(1), (bg << 4) | (fg & 0x0F));
            }
        }
        Backend::Framebuffer => {
            fb::draw_char(
                col * GLYPH_W as i32,
                row * GLYPH_H as i32,
                ch,
                PALETTE[(fg & 0x0F) as usize],
                PALETTE[(bg & 0x0F) as usize],
                false,
            );
        }
    }
}

fn scroll(console: &mut Console) {
    match console.backend {
        Backend::VgaText => {
            let line = TEXT_COLS as usize * 2;
            let total = TEXT_ROWS as usize * line;
            // SAFETY: moves within the fixed text buffer.
            unsafe {
                core::ptr::copy(
                    (VGA_TEXT_BASE as usize + line) as *const u8,
                    VGA_TEXT_BASE as usize as *mut u8,
                    total - line,
                );
            }
            for col in 0..TEXT_COLS {
                render_cell(console, col, TEXT_ROWS - 1, b' ', console.fg, console.bg);
            }
        }
        Backend::Framebuffer => {
            fb::scroll_up(GLYPH_H as u32, PALETTE[(console.bg & 0x0F) as usize]);
        }
    }
    console.row = console.rows - 1;
}

fn update_hw_cursor(console: &Console) {
    if console.backend != Backend::VgaText {
        return;
    }
    let pos = if console.cursor_visible {
        (console.row * TEXT_COLS + console.col) as u16
    } else {
        (TEXT_COLS * TEXT_ROWS) as u16
    };
    unsafe {
        write_crtc(0x0F, (pos & 0xFF) as u8);
        write_crtc(0x0E, (pos >> 8) as u8);
    }
}

unsafe fn write_crtc(index: u8, value: u8) {
    let idx: Port<u8> = VGA_CRTC_INDEX;
    let data: Port<u8> = VGA_CRTC_DATA;
    idx.write(index);
    data.write(value);
}

fn put_char(console: &mut Console, ch: u8, fg: u8, bg: u8) {
    match ch {
        b'\n' => {
            console.col = 0;
            console.row += 1;
        }
        b'\r' => {
            console.col = 0;
        }
        0x08 => {
            if console.col > 0 {
                console.col -= 1;
                render_cell(console, console.col, console.row, b' ', fg, bg);
            }
        }
        b'\t' => {
            let next = (console.col + 8) & !7;
            while console.col < next.min(console.cols) {
                render_cell(console, console.col, console.row, b' ', fg, bg);
                console.col += 1;
            }
        }
        _ => {
            render_cell(console, console.col, console.row, ch, fg, bg);
            console.col += 1;
        }
    }

    if console.col >= console.cols {
        console.col = 0;
        console.row += 1;
    }
    if console.row >= console.rows {
        scroll(console);
    }
}

fn write_with_colors(bytes: &[u8], fg: u8, bg: u8) {
    let mut console = STATE.lock();
    for &b in bytes {
        put_char(&mut console, b, fg, bg);
    }
    update_hw_cursor(&console);
}

// ---------------------------------------------------------------------------
// Service implementation
// ---------------------------------------------------------------------------

fn svc_write(bytes: &[u8]) {
    let (fg, bg) = {
        let console = STATE.lock();
        (console.fg, console.bg)
    };
    write_with_colors(bytes, fg, bg);
}

fn svc_write_colored(bytes: &[u8], fg: u8, bg: u8) {
    write_with_colors(bytes, fg, bg);
}

fn svc_write_at(bytes: &[u8], col: i32, row: i32) {
    let mut console = STATE.lock();
    if row < 0 || row >= console.rows {
        return;
    }
    console.col = col.clamp(0, console.cols - 1);
    console.row = row;
    let (fg, bg) = (console.fg, console.bg);
    for &b in bytes {
        if console.row != row {
            break;
        }
        put_char(&mut console, b, fg, bg);
    }
}

fn svc_clear() {
    let mut console = STATE.lock();
    let (fg, bg) = (console.fg, console.bg);
    for row in 0..console.rows {
        for col in 0..console.cols {
            render_cell(&console, col, row, b' ', fg, bg);
        }
    }
    console.col = 0;
    console.row = 0;
    update_hw_cursor(&console);
}

fn svc_set_color(fg: u8, bg: u8) {
    let mut console = STATE.lock();
    console.fg = fg & 0x0F;
    console.bg = bg & 0x0F;
}

fn svc_get_cursor_offset() -> i32 {
    let console = STATE.lock();
    (console.row * console.cols + console.col) * 2
}

fn svc_set_cursor_offset(offset: i32) {
    let mut console = STATE.lock();
    let cell = (offset / 2).clamp(0, console.cols * console.rows - 1);
    console.col = cell % console.cols;
    console.row = cell / console.cols;
    update_hw_cursor(&console);
}

fn svc_get_cursor_row() -> i32 {
    STATE.lock().row
}

fn svc_get_cursor_col() -> i32 {
    STATE.lock().col
}

fn svc_rows() -> i32 {
    STATE.lock().rows
}

fn svc_cols() -> i32 {
    STATE.lock().cols
}

fn svc_set_cursor_visible(visible: bool) {
    let mut console = STATE.lock();
    console.cursor_visible = visible;
    update_hw_cursor(&console);
}

static CONSOLE_IMPL: ConsoleServices = ConsoleServices {
    write: svc_write,
    write_colored: svc_write_colored,
    write_at: svc_write_at,
    clear: svc_clear,
    set_color: svc_set_color,
    get_cursor_offset: svc_get_cursor_offset,
    set_cursor_offset: svc_set_cursor_offset,
    get_cursor_row: svc_get_cursor_row,
    get_cursor_col: svc_get_cursor_col,
    rows: svc_rows,
    cols: svc_cols,
    set_cursor_visible: svc_set_cursor_visible,
};

/// Pick the backend from what boot discovered and go live.
pub fn init() {
    {
        let mut console = STATE.lock();
        if let Some(fbuf) = fb::framebuffer() {
            console.backend = Backend::Framebuffer;
            console.cols = (fbuf.width as usize / GLYPH_W) as i32;
            console.rows = (fbuf.height as usize / GLYPH_H) as i32;
        }
    }
    CONSOLE.register(&CONSOLE_IMPL);
    svc_clear();
}
