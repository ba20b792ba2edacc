//! Glyph store: 256 glyphs of 8x16, one byte per row.
//!
//! The real face ships as `/system/font/orion.fnt` and is loaded at boot
//! (raw bitmap, or PSF1 whose header is skipped — the full PSF parser is a
//! collaborator). Until then a hollow-box fallback keeps text legible
//! enough to read boot messages.

use orion_lib::IrqMutex;

pub const GLYPH_W: usize = 8;
pub const GLYPH_H: usize = 16;
const GLYPH_COUNT: usize = 256;
const FONT_BYTES: usize = GLYPH_COUNT * GLYPH_H;

const PSF1_MAGIC: [u8; 2] = [0x36, 0x04];

struct FontStore {
    data: [u8; FONT_BYTES],
    loaded: bool,
}

fn fallback_glyph(row: usize) -> u8 {
    match row {
        2 | 12 => 0x7E,
        3..=11 => 0x42,
        _ => 0,
    }
}

static FONT: IrqMutex<FontStore> = IrqMutex::new(FontStore {
    data: [0; FONT_BYTES],
    loaded: false,
});

fn ensure_fallback(store: &mut FontStore) {
    if store.loaded {
        return;
    }
    // Printable range gets the box; control glyphs stay blank.
    for glyph in 0x20..0x7F {
        for row in 0..GLYPH_H {
            store.data[glyph * GLYPH_H + row] = fallback_glyph(row);
        }
    }
    store.loaded = true;
}

/// Install a font image: raw 4096-byte bitmap or PSF1 (header skipped).
pub fn load_from_bytes(image: &[u8]) -> bool {
    let body = if image.len() >= 4 && image[..2] == PSF1_MAGIC {
        &image[4..]
    } else {
        image
    };
    if body.len() < FONT_BYTES {
        return false;
    }

    let mut store = FONT.lock();
    store.data.copy_from_slice(&body[..FONT_BYTES]);
    store.loaded = true;
    true
}

/// Row bitmap of one glyph row. Never fails — missing fonts fall back.
pub fn glyph_row(ch: u8, row: usize) -> u8 {
    let mut store = FONT.lock();
    ensure_fallback(&mut store);
    store.data[ch as usize * GLYPH_H + (row % GLYPH_H)]
}

/// Copy a whole glyph out (the renderer avoids 16 lock round-trips).
pub fn glyph(ch: u8) -> [u8; GLYPH_H] {
    let mut store = FONT.lock();
    ensure_fallback(&mut store);
    let mut out = [0u8; GLYPH_H];
    out.copy_from_slice(&store.data[ch as usize * GLYPH_H..ch as usize * GLYPH_H + GLYPH_H]);
    out
}
