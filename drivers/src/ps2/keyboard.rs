//! PS/2 keyboard: scancode set 1 to the key encoding of the HID layer.
//!
//! Printables arrive as ASCII; arrows use the reserved 0x90..0x93 range,
//! Del is 0x7F, the rest of the specials keep their ASCII control values.

use core::sync::atomic::{AtomicBool, Ordering};

use orion_abi::input::{KEY_DOWN, KEY_LEFT, KEY_RIGHT, KEY_UP};
use orion_abi::syscall::MouseState;
use orion_lib::ports::PS2_DATA;
use orion_lib::services::{INPUT, InputServices};
use orion_lib::{IrqMutex, RingBuffer};

const KEY_BUFFER: usize = 64;

static QUEUE: IrqMutex<RingBuffer<u32, KEY_BUFFER>> = IrqMutex::new(RingBuffer::new_with(0));
static SHIFT: AtomicBool = AtomicBool::new(false);
static CTRL: AtomicBool = AtomicBool::new(false);
static CAPS: AtomicBool = AtomicBool::new(false);
static EXTENDED: AtomicBool = AtomicBool::new(false);

/// Shell/editor toggle: while cleared, keystrokes are dropped instead of
/// queued (used around spawned foreground programs).
pub static INPUT_ENABLED: AtomicBool = AtomicBool::new(true);

const PLAIN: [u8; 58] = [
    0, 0x1B, b'1', b'2', b'3', b'4', b'5', b'6', b'7', b'8', b'9', b'0', b'-', b'=', 0x08, b'\t',
    b'q', b'w', b'e', b'r', b't', b'y', b'u', b'i', b'o', b'p', b'[', b']', 0x0D, 0, b'a', b's',
    b'd', b'f', b'g', b'h', b'j', b'k', b'l', b';', b'\'', b'`', 0, b'\\', b'z', b'x', b'c', b'v',
    b'b', b'n', b'm', b',', b'.', b'/', 0, b'*', 0, b' ',
];

const SHIFTED: [u8; 58] = [
    0, 0x1B, b'!', b'@', b'#', b'$', b'%', b'^', b'&', b'*', b'(', b')', b'_', b'+', 0x08, b'\t',
    b'Q', b'W', b'E', b'R', b'T', b'Y', b'U', b'I', b'O', b'P', b'{', b'}', 0x0D, 0, b'A', b'S',
    b'D', b'F', b'G', b'H', b'J', b'K', b'L', b':', b'"', b'~', 0, b'|', b'Z', b'X', b'C', b'V',
    b'B', b'N', b'M', b'<', b'>', b'?', 0, b'*', 0, b' ',
];

fn push_key(key: u32) {
    if key == 0 {
        return;
    }
    if !INPUT_ENABLED.load(Ordering::Relaxed) {
        return;
    }
    QUEUE.lock().try_push(key);
}

fn translate(scancode: u8) -> u32 {
    if EXTENDED.swap(false, Ordering::Relaxed) {
        return match scancode {
            0x4B => KEY_LEFT,
            0x4D => KEY_RIGHT,
            0x48 => KEY_UP,
            0x50 => KEY_DOWN,
            0x53 => 0x7F,
            _ => 0,
        };
    }

    let idx = scancode as usize;
    if idx >= PLAIN.len() {
        return 0;
    }

    let shift = SHIFT.load(Ordering::Relaxed);
    let mut byte = if shift { SHIFTED[idx] } else { PLAIN[idx] };
    if CAPS.load(Ordering::Relaxed) && byte.is_ascii_alphabetic() {
        byte = if shift {
            byte.to_ascii_lowercase()
        } else {
            byte.to_ascii_uppercase()
        };
    }
    if CTRL.load(Ordering::Relaxed) && byte.is_ascii_alphabetic() {
        return (byte.to_ascii_uppercase() - b'A' + 1) as u32;
    }
    byte as u32
}

/// IRQ1 body.
pub fn irq_handler() {
    let scancode = unsafe { PS2_DATA.read() };

    match scancode {
        0xE0 => {
            EXTENDED.store(true, Ordering::Relaxed);
            return;
        }
        0x2A | 0x36 => {
            SHIFT.store(true, Ordering::Relaxed);
            return;
        }
        0xAA | 0xB6 => {
            SHIFT.store(false, Ordering::Relaxed);
            return;
        }
        0x1D => {
            CTRL.store(true, Ordering::Relaxed);
            return;
        }
        0x9D => {
            CTRL.store(false, Ordering::Relaxed);
            return;
        }
        0x3A => {
            CAPS.fetch_xor(true, Ordering::Relaxed);
            return;
        }
        _ => {}
    }

    if scancode & 0x80 != 0 {
        // Break code; extended prefix (if any) was consumed above.
        EXTENDED.store(false, Ordering::Relaxed);
        return;
    }
    push_key(translate(scancode));
}

pub fn getkey_nonblock() -> u32 {
    QUEUE.lock().try_pop().unwrap_or(0)
}

pub fn getkey() -> u32 {
    loop {
        if let Some(key) = QUEUE.lock().try_pop() {
            return key;
        }
        orion_lib::cpu::sti_halt();
    }
}

pub fn pause() {
    let _ = getkey();
}

pub fn flush() {
    QUEUE.lock().reset();
}

fn mouse_state_stub() -> MouseState {
    super::mouse::state()
}

fn mouse_draw_stub(visible: bool) {
    super::mouse::set_draw(visible);
}

static INPUT_IMPL: InputServices = InputServices {
    getkey,
    getkey_nonblock,
    pause,
    flush,
    mouse_state: mouse_state_stub,
    mouse_set_draw: mouse_draw_stub,
};

pub fn init() {
    INPUT.register(&INPUT_IMPL);
}
