//! PS/2 mouse: 3-byte packets into a character-cell position.
//!
//! The compositor works in text cells (it multiplies by the font metrics),
//! so the driver keeps the position in cells and accumulates sub-cell
//! deltas. A renderer hook lets the video layer repaint the software cursor
//! on movement without this crate linking against it.

use core::sync::atomic::{AtomicBool, AtomicI32, AtomicPtr, AtomicU8, Ordering};

use orion_abi::syscall::MouseState;
use orion_lib::ports::{PS2_DATA, PS2_STATUS};

use super::{controller_command, wait_input_clear, wait_output_full};

/// Pixels of motion per cell step.
const CELL_DIV_X: i32 = 8;
const CELL_DIV_Y: i32 = 16;

static CELL_X: AtomicI32 = AtomicI32::new(0);
static CELL_Y: AtomicI32 = AtomicI32::new(0);
static ACC_X: AtomicI32 = AtomicI32::new(0);
static ACC_Y: AtomicI32 = AtomicI32::new(0);
static BUTTONS: AtomicI32 = AtomicI32::new(0);
static MAX_X: AtomicI32 = AtomicI32::new(79);
static MAX_Y: AtomicI32 = AtomicI32::new(24);

static PHASE: AtomicU8 = AtomicU8::new(0);
static PACKET0: AtomicU8 = AtomicU8::new(0);
static PACKET1: AtomicU8 = AtomicU8::new(0);

static DRAW: AtomicBool = AtomicBool::new(false);

/// Registered by the video layer; called with (x, y, visible) after every
/// state change and on draw toggles.
pub struct MouseRenderHooks {
    pub update: fn(i32, i32, bool),
}

static RENDER: AtomicPtr<MouseRenderHooks> = AtomicPtr::new(core::ptr::null_mut());

pub fn register_renderer(hooks: &'static MouseRenderHooks) {
    RENDER.store(hooks as *const _ as *mut _, Ordering::Release);
}

fn notify_renderer() {
    let ptr = RENDER.load(Ordering::Acquire);
    // SAFETY: only register_renderer stores here, with a &'static.
    if let Some(hooks) = unsafe { ptr.as_ref() } {
        (hooks.update)(
            CELL_X.load(Ordering::Relaxed),
            CELL_Y.load(Ordering::Relaxed),
            DRAW.load(Ordering::Relaxed),
        );
    }
}

fn device_command(byte: u8) {
    controller_command(0xD4);
    wait_input_clear();
    unsafe { PS2_DATA.write(byte) };
    wait_output_full();
    let _ack = unsafe { PS2_DATA.read() };
}

pub fn init() {
    // Enable the aux port and its IRQ in the controller config byte.
    controller_command(0xA8);
    controller_command(0x20);
    wait_output_full();
    let config = unsafe { PS2_DATA.read() } | 0x02;
    controller_command(0x60);
    wait_input_clear();
    unsafe { PS2_DATA.write(config) };

    device_command(0xF6);
    device_command(0xF4);
}

/// Clamp bounds, in cells. The video layer calls this once it knows the
/// screen geometry.
pub fn set_bounds(cols: i32, rows: i32) {
    MAX_X.store((cols - 1).max(0), Ordering::Relaxed);
    MAX_Y.store((rows - 1).max(0), Ordering::Relaxed);
}

/// IRQ12 body.
pub fn irq_handler() {
    let status = unsafe { PS2_STATUS.read() };
    // Only consume bytes that actually came from the aux device.
    if status & 0x20 == 0 {
        let _ = unsafe { PS2_DATA.read() };
        return;
    }
    let byte = unsafe { PS2_DATA.read() };

    match PHASE.load(Ordering::Relaxed) {
        0 => {
            // Resync on a malformed header byte.
            if byte & 0x08 == 0 {
                return;
            }
            PACKET0.store(byte, Ordering::Relaxed);
            PHASE.store(1, Ordering::Relaxed);
        }
        1 => {
            PACKET1.store(byte, Ordering::Relaxed);
            PHASE.store(2, Ordering::Relaxed);
        }
        _ => {
            PHASE.store(0, Ordering::Relaxed);
            let header = PACKET0.load(Ordering::Relaxed);
            let dx_raw = PACKET1.load(Ordering::Relaxed);
            let dy_raw = byte;

            // Overflowed packets are garbage; drop them.
            if header & 0xC0 != 0 {
                return;
            }

            let dx = sign_extend(dx_raw, header & 0x10 != 0);
            let dy = sign_extend(dy_raw, header & 0x20 != 0);
            BUTTONS.store((header & 0x07) as i32, Ordering::Relaxed);

            apply_motion(dx, -dy);
            notify_renderer();
        }
    }
}

fn sign_extend(value: u8, negative: bool) -> i32 {
    if negative {
        value as i32 - 256
    } else {
        value as i32
    }
}

fn apply_motion(dx: i32, dy: i32) {
    let ax = ACC_X.load(Ordering::Relaxed) + dx;
    let ay = ACC_Y.load(Ordering::Relaxed) + dy;

    let step_x = ax / CELL_DIV_X;
    let step_y = ay / CELL_DIV_Y;
    ACC_X.store(ax % CELL_DIV_X, Ordering::Relaxed);
    ACC_Y.store(ay % CELL_DIV_Y, Ordering::Relaxed);

    if step_x != 0 {
        let nx = (CELL_X.load(Ordering::Relaxed) + step_x)
            .clamp(0, MAX_X.load(Ordering::Relaxed));
        CELL_X.store(nx, Ordering::Relaxed);
    }
    if step_y != 0 {
        let ny = (CELL_Y.load(Ordering::Relaxed) + step_y)
            .clamp(0, MAX_Y.load(Ordering::Relaxed));
        CELL_Y.store(ny, Ordering::Relaxed);
    }
}

pub fn state() -> MouseState {
    MouseState {
        x: CELL_X.load(Ordering::Relaxed),
        y: CELL_Y.load(Ordering::Relaxed),
        buttons: BUTTONS.load(Ordering::Relaxed),
    }
}

pub fn set_draw(visible: bool) {
    DRAW.store(visible, Ordering::Relaxed);
    notify_renderer();
}
