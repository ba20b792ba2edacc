use core::ffi::c_int;

use orion_abi::gui::{GUI_MSG_SET_TEXT, GUI_QUEUE_MAX, GuiMessage};

use crate::gui;

fn msg_with_tag(tag: i32) -> GuiMessage {
    let mut msg = GuiMessage::empty();
    msg.msg_type = GUI_MSG_SET_TEXT;
    msg.a = tag;
    // Whatever the client claims, the kernel stamps the real sender.
    msg.sender_pid = 0xBAD;
    msg
}

fn reset_seat() {
    gui::release_if_server(gui::server_pid());
}

pub fn test_bind_excludes_live_server() -> c_int {
    reset_seat();

    if !gui::bind(10, |_| true) {
        return -1;
    }
    // A different pid cannot take a live seat.
    if gui::bind(11, |pid| pid == 10) {
        reset_seat();
        return -1;
    }
    // A dead incumbent releases the seat implicitly.
    if !gui::bind(11, |_| false) {
        reset_seat();
        return -1;
    }
    reset_seat();
    0
}

pub fn test_send_requires_server() -> c_int {
    reset_seat();
    if gui::send(5, msg_with_tag(1)) {
        return -1;
    }
    0
}

pub fn test_queue_fifo_and_sender_stamp() -> c_int {
    reset_seat();
    if !gui::bind(20, |_| true) {
        return -1;
    }

    for tag in 1..=3 {
        if !gui::send(7, msg_with_tag(tag)) {
            reset_seat();
            return -1;
        }
    }

    for expected in 1..=3 {
        let Some(msg) = gui::recv(20) else {
            reset_seat();
            return -1;
        };
        if msg.a != expected || msg.sender_pid != 7 {
            reset_seat();
            return -1;
        }
    }

    reset_seat();
    0
}

pub fn test_queue_overflow_drops_send() -> c_int {
    reset_seat();
    if !gui::bind(30, |_| true) {
        return -1;
    }

    for tag in 0..GUI_QUEUE_MAX as i32 {
        if !gui::send(8, msg_with_tag(tag)) {
            reset_seat();
            return -1;
        }
    }
    if gui::send(8, msg_with_tag(999)) {
        reset_seat();
        return -1;
    }
    if gui::queue_len() != GUI_QUEUE_MAX as u32 {
        reset_seat();
        return -1;
    }

    reset_seat();
    0
}

pub fn test_recv_restricted_to_server() -> c_int {
    reset_seat();
    if !gui::bind(40, |_| true) {
        return -1;
    }
    if !gui::send(9, msg_with_tag(5)) {
        reset_seat();
        return -1;
    }

    // Not the server: nothing comes out, message stays queued.
    if gui::recv(41).is_some() {
        reset_seat();
        return -1;
    }
    if gui::queue_len() != 1 {
        reset_seat();
        return -1;
    }
    if gui::recv(40).is_none() {
        reset_seat();
        return -1;
    }

    reset_seat();
    0
}

pub fn test_server_death_releases_seat() -> c_int {
    reset_seat();
    if !gui::bind(50, |_| true) {
        return -1;
    }
    gui::release_if_server(50);
    if gui::server_pid() != 0 {
        return -1;
    }
    // Queue flushed with the seat.
    if gui::recv(50).is_some() {
        return -1;
    }
    0
}

orion_lib::define_test_suite!(
    gui_ipc,
    [
        test_bind_excludes_live_server,
        test_send_requires_server,
        test_queue_fifo_and_sender_stamp,
        test_queue_overflow_drops_send,
        test_recv_restricted_to_server,
        test_server_death_releases_seat,
    ]
);
