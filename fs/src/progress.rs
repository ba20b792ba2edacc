//! Write-progress counter.
//!
//! Long writes publish `(label, total, written)` and the console row where
//! the counter started is redrawn in place at fixed steps: every 1% when
//! `total >= 100`, every unit otherwise. Redraws are idempotent — updating
//! with the same percentage twice paints nothing new.

use orion_lib::services::CONSOLE;
use orion_lib::{IrqMutex, cprintf};

struct ProgressState {
    active: bool,
    total: u32,
    last_percent: u32,
    step: u32,
    next: u32,
    small: bool,
    row: i32,
    col: i32,
    label: [u8; 32],
    label_len: usize,
}

static STATE: IrqMutex<ProgressState> = IrqMutex::new(ProgressState {
    active: false,
    total: 0,
    last_percent: 0,
    step: 0,
    next: 0,
    small: false,
    row: -1,
    col: -1,
    label: [0; 32],
    label_len: 0,
});

fn render(state: &ProgressState, percent: u32) {
    let Some(console) = CONSOLE.get() else {
        return;
    };

    let mut buf = [0u8; 48];
    let mut idx = 0;
    for &b in &state.label[..state.label_len] {
        buf[idx] = b;
        idx += 1;
    }
    buf[idx] = b':';
    buf[idx + 1] = b' ';
    idx += 2;

    let mut digits = [0u8; 3];
    let mut n = percent.min(100);
    let mut dlen = 0;
    loop {
        digits[dlen] = b'0' + (n % 10) as u8;
        dlen += 1;
        n /= 10;
        if n == 0 {
            break;
        }
    }
    for i in (0..dlen).rev() {
        buf[idx] = digits[i];
        idx += 1;
    }
    buf[idx] = b'%';
    idx += 1;

    // Pad to the widest rendering so shrinking text leaves no residue.
    let pad_to = state.label_len + 6;
    while idx < pad_to && idx < buf.len() {
        buf[idx] = b' ';
        idx += 1;
    }

    let saved = (console.get_cursor_offset)();
    (console.write_at)(&buf[..idx], state.col, state.row);
    (console.set_cursor_offset)(saved);
}

pub fn write_progress_begin(label: &str, total: u32) {
    let mut state = STATE.lock();
    state.active = true;
    state.total = total;
    state.last_percent = 0;
    state.small = false;
    state.step = 0;
    state.next = 0;

    let label = if label.is_empty() { "write" } else { label };
    let len = label.len().min(state.label.len());
    let label_bytes = &label.as_bytes()[..len];
    state.label[..len].copy_from_slice(label_bytes);
    state.label_len = len;

    if let Some(console) = CONSOLE.get() {
        state.row = (console.get_cursor_row)();
        state.col = (console.get_cursor_col)();
    }

    if total == 0 {
        state.last_percent = 100;
        drop(state);
        cprintf!("{}: 100%\n", label);
        return;
    }

    if total < 100 {
        state.small = true;
        state.next = 1;
    } else {
        state.step = (total / 100).max(1);
        state.next = state.step;
    }
    drop(state);
    cprintf!("{}: 0%\n", label);
}

pub fn write_progress_update(written: u32) {
    let mut state = STATE.lock();
    if !state.active || state.total == 0 {
        return;
    }
    let written = written.min(state.total);

    if written < state.next && written < state.total {
        return;
    }

    let percent = if state.small {
        (written as u64 * 100 / state.total as u64) as u32
    } else {
        let mut p = written / state.step;
        // Hold 100% until the final byte actually lands.
        if written < state.total && p >= 100 {
            p = 99;
        }
        p.min(100)
    };

    if state.small {
        state.next = written + 1;
    } else if percent >= 99 && written < state.total {
        state.next = state.total;
    } else {
        state.next = (percent + 1) * state.step;
    }

    if percent == state.last_percent {
        return;
    }
    state.last_percent = percent;
    render(&state, percent);
}

pub fn write_progress_finish(success: bool) {
    let total = {
        let state = STATE.lock();
        if !state.active {
            return;
        }
        state.total
    };
    if success {
        write_progress_update(total);
    }

    let mut state = STATE.lock();
    state.active = false;
    state.total = 0;
    state.last_percent = 0;
    state.step = 0;
    state.next = 0;
    state.small = false;
    state.row = -1;
    state.col = -1;
    state.label_len = 0;
}
