//! Linear framebuffer: fills, glyph text, and the software mouse cursor.
//!
//! Boot hands over the Multiboot2 framebuffer (type 1, 24/32 bpp) after
//! mapping it; everything here draws through that one description. The
//! mouse cursor saves the pixels it covers so the compositor can disable
//! it around redraws without trails.

use orion_abi::syscall::FbInfo;
use orion_lib::IrqMutex;
use orion_lib::services::{FRAMEBUFFER, FramebufferServices};

use orion_drivers::ps2::mouse::{self, MouseRenderHooks};

use crate::font::{GLYPH_H, GLYPH_W, glyph};

#[derive(Clone, Copy)]
pub struct Framebuffer {
    pub addr: u32,
    pub width: u32,
    pub height: u32,
    pub pitch: u32,
    pub bpp: u32,
}

impl Framebuffer {
    fn bytes_per_pixel(&self) -> u32 {
        self.bpp / 8
    }
}

static FB: spin::Once<Framebuffer> = spin::Once::new();

/// Adopt the boot framebuffer. Called once by the boot crate after the
/// range is mapped.
pub fn set_framebuffer(addr: u64, width: u32, height: u32, pitch: u32, bpp: u32) -> bool {
    if addr == 0 || addr > u32::MAX as u64 || (bpp != 24 && bpp != 32) {
        return false;
    }
    FB.call_once(|| Framebuffer {
        addr: addr as u32,
        width,
        height,
        pitch,
        bpp,
    });
    mouse::set_bounds(
        (width as usize / GLYPH_W) as i32,
        (height as usize / GLYPH_H) as i32,
    );
    true
}

pub fn framebuffer() -> Option<Framebuffer> {
    FB.get().copied()
}

pub fn is_active() -> bool {
    FB.get().is_some()
}

#[inline]
fn put_pixel(fb: &Framebuffer, x: i32, y: i32, color: u32) {
    if x < 0 || y < 0 || x as u32 >= fb.width || y as u32 >= fb.height {
        return;
    }
    let off = fb.addr + y as u32 * fb.pitch + x as u32 * fb.bytes_per_pixel();
    // SAFETY: bounds checked against the mapped framebuffer geometry.
    unsafe {
        if fb.bpp == 32 {
            core::ptr::write_volatile(off as *mut u32, color);
        } else {
            let p = off as *mut u8;
            core::ptr::write_volatile(p, (color & 0xFF) as u8);
            core::ptr::write_volatile(p.add(1), ((color >> 8) & 0xFF) as u8);
            core::ptr::write_volatile(p.add(2), ((color >> 16) & 0xFF) as u8);
        }
    }
}

#[inline]
fn get_pixel(fb: &Framebuffer, x: i32, y: i32) -> u32 {
    if x < 0 || y < 0 || x as u32 >= fb.width || y as u32 >= fb.height {
        return 0;
    }
    let off = fb.addr + y as u32 * fb.pitch + x as u32 * fb.bytes_per_pixel();
    // SAFETY: bounds checked above.
    unsafe {
        if fb.bpp == 32 {
            core::ptr::read_volatile(off as *const u32)
        } else {
            let p = off as *const u8;
            (core::ptr::read_volatile(p) as u32)
                | ((core::ptr::read_volatile(p.add(1)) as u32) << 8)
                | ((core::ptr::read_volatile(p.add(2)) as u32) << 16)
        }
    }
}

pub fn fill_rect(x: i32, y: i32, w: i32, h: i32, color: u32) {
    let Some(fb) = framebuffer() else {
        return;
    };
    if w <= 0 || h <= 0 {
        return;
    }
    for py in y..y + h {
        for px in x..x + w {
            put_pixel(&fb, px, py, color);
        }
    }
}

pub fn draw_char(x: i32, y: i32, ch: u8, fg: u32, bg: u32, transparent: bool) {
    let Some(fb) = framebuffer() else {
        return;
    };
    let bitmap = glyph(ch);
    for (row, bits) in bitmap.iter().enumerate() {
        for col in 0..GLYPH_W {
            let lit = bits & (0x80 >> col) != 0;
            if lit {
                put_pixel(&fb, x + col as i32, y + row as i32, fg);
            } else if !transparent {
                put_pixel(&fb, x + col as i32, y + row as i32, bg);
            }
        }
    }
}

pub fn draw_text(x: i32, y: i32, text: &[u8], fg: u32, bg: u32, transparent: bool) {
    let mut cx = x;
    for &ch in text {
        draw_char(cx, y, ch, fg, bg, transparent);
        cx += GLYPH_W as i32;
    }
}

/// Scroll the whole framebuffer up by `lines` pixel rows, clearing the
/// exposed band. Used by the framebuffer console backend.
pub fn scroll_up(lines: u32, clear_color: u32) {
    let Some(fb) = framebuffer() else {
        return;
    };
    if lines == 0 || lines >= fb.height {
        return;
    }
    let row_bytes = fb.pitch as usize;
    let move_rows = (fb.height - lines) as usize;
    // SAFETY: source and destination stay inside the mapped framebuffer.
    unsafe {
        core::ptr::copy(
            (fb.addr as usize + lines as usize * row_bytes) as *const u8,
            fb.addr as usize as *mut u8,
            move_rows * row_bytes,
        );
    }
    fill_rect(
        0,
        move_rows as i32,
        fb.width as i32,
        lines as i32,
        clear_color,
    );
}

pub fn info() -> Option<FbInfo> {
    let fb = framebuffer()?;
    Some(FbInfo {
        width: fb.width,
        height: fb.height,
        pitch: fb.pitch,
        bpp: fb.bpp,
        bytes_per_pixel: fb.bytes_per_pixel(),
        font_w: GLYPH_W as u32,
        font_h: GLYPH_H as u32,
    })
}

// ---------------------------------------------------------------------------
// Software mouse cursor
// ---------------------------------------------------------------------------

const CURSOR_W: usize = GLYPH_W;
const CURSOR_H: usize = GLYPH_H;

struct CursorState {
    saved: [u32; CURSOR_W * CURSOR_H],
    px: i32,
    py: i32,
    drawn: bool,
}

static CURSOR: IrqMutex<CursorState> = IrqMutex::new(CursorState {
    saved: [0; CURSOR_W * CURSOR_H],
    px: 0,
    py: 0,
    drawn: false,
});

fn cursor_restore(fb: &Framebuffer, state: &mut CursorState) {
    if !state.drawn {
        return;
    }
    for row in 0..CURSOR_H {
        for col in 0..CURSOR_W {
            put_pixel(
                fb,
                state.px + col as i32,
                state.py + row as i32,
                state.saved[row * CURSOR_W + col],
            );
        }
    }
    state.drawn = false;
}

fn cursor_draw(fb: &Framebuffer, state: &mut CursorState, px: i32, py: i32) {
    for row in 0..CURSOR_H {
        for col in 0..CURSOR_W {
            state.saved[row * CURSOR_W + col] = get_pixel(fb, px + col as i32, py + row as i32);
        }
    }
    // A solid block with an outline reads fine at cell resolution.
    for row in 0..CURSOR_H {
        for col in 0..CURSOR_W {
            let edge = row == 0 || row == CURSOR_H - 1 || col == 0 || col == CURSOR_W - 1;
            let color = if edge { 0x0000_0000 } else { 0x00FF_FFFF };
            put_pixel(fb, px + col as i32, py + row as i32, color);
        }
    }
    state.px = px;
    state.py = py;
    state.drawn = true;
}

fn mouse_update(cell_x: i32, cell_y: i32, visible: bool) {
    let Some(fb) = framebuffer() else {
        return;
    };
    let mut state = CURSOR.lock();
    cursor_restore(&fb, &mut state);
    if visible {
        cursor_draw(
            &fb,
            &mut state,
            cell_x * GLYPH_W as i32,
            cell_y * GLYPH_H as i32,
        );
    }
}

static MOUSE_HOOKS: MouseRenderHooks = MouseRenderHooks {
    update: mouse_update,
};

static FB_SERVICES: FramebufferServices = FramebufferServices {
    info,
    fill_rect,
    draw_text,
};

pub fn register_services() {
    FRAMEBUFFER.register(&FB_SERVICES);
    mouse::register_renderer(&MOUSE_HOOKS);
}
