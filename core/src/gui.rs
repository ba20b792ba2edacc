//! GUI server seat and message queue.
//!
//! One process binds as the server; everyone else pushes [`GuiMessage`]
//! values through a bounded ring the kernel owns. The sender pid is stamped
//! here — the payload's field is overwritten whatever the client put in it.
//! Overflow drops the message and returns failure to the sender.

use orion_abi::gui::{GUI_QUEUE_MAX, GuiMessage};
use orion_lib::{IrqMutex, RingBuffer};

struct GuiState {
    server_pid: u32,
    queue: RingBuffer<GuiMessage, GUI_QUEUE_MAX>,
}

static STATE: IrqMutex<GuiState> = IrqMutex::new(GuiState {
    server_pid: 0,
    queue: RingBuffer::new_with(GuiMessage::empty()),
});

/// Elect `pid` as the server. Fails while a different, still-live server
/// holds the seat; rebinding flushes the queue.
pub fn bind(pid: u32, server_alive: impl Fn(u32) -> bool) -> bool {
    let mut state = STATE.lock();
    if state.server_pid != 0 && state.server_pid != pid && server_alive(state.server_pid) {
        return false;
    }
    state.server_pid = pid;
    state.queue.reset();
    true
}

pub fn server_pid() -> u32 {
    STATE.lock().server_pid
}

/// Drop the seat if `pid` holds it (process exit/kill path).
pub fn release_if_server(pid: u32) {
    let mut state = STATE.lock();
    if state.server_pid == pid {
        state.server_pid = 0;
        state.queue.reset();
    }
}

/// Queue a message from `sender_pid`. Fails when no server is bound or the
/// queue is full — the sender may retry after yielding.
pub fn send(sender_pid: u32, mut msg: GuiMessage) -> bool {
    let mut state = STATE.lock();
    if state.server_pid == 0 {
        return false;
    }
    msg.sender_pid = sender_pid;
    state.queue.try_push(msg)
}

/// Pop the next message; only the bound server may drain.
pub fn recv(pid: u32) -> Option<GuiMessage> {
    let mut state = STATE.lock();
    if state.server_pid != pid {
        return None;
    }
    state.queue.try_pop()
}

pub fn queue_len() -> u32 {
    STATE.lock().queue.len()
}
