//! Boot log capture.
//!
//! Console output produced before the shell starts is mirrored into a
//! bounded buffer so the `START_SHELL` path can finalise and the shell can
//! replay it. Once disabled the mirror costs one atomic load per print.

use core::sync::atomic::{AtomicBool, Ordering};

use crate::spinlock::IrqMutex;

const BOOTLOG_SIZE: usize = 8192;

struct BootLog {
    buf: [u8; BOOTLOG_SIZE],
    len: usize,
}

static ENABLED: AtomicBool = AtomicBool::new(true);
static LOG: IrqMutex<BootLog> = IrqMutex::new(BootLog {
    buf: [0; BOOTLOG_SIZE],
    len: 0,
});

pub fn bootlog_add(bytes: &[u8]) {
    if !ENABLED.load(Ordering::Relaxed) {
        return;
    }
    let mut log = LOG.lock();
    let space = BOOTLOG_SIZE.saturating_sub(log.len);
    let take = bytes.len().min(space);
    let len = log.len;
    log.buf[len..len + take].copy_from_slice(&bytes[..take]);
    log.len += take;
}

/// Stop mirroring. Called when the shell takes over the console.
pub fn bootlog_finalize() {
    ENABLED.store(false, Ordering::Relaxed);
}

pub fn bootlog_enabled() -> bool {
    ENABLED.load(Ordering::Relaxed)
}

pub fn bootlog_clear() {
    let mut log = LOG.lock();
    log.len = 0;
}

/// Copy the captured log into `out`, returning the number of bytes written.
pub fn bootlog_copy(out: &mut [u8]) -> usize {
    let log = LOG.lock();
    let take = log.len.min(out.len());
    out[..take].copy_from_slice(&log.buf[..take]);
    take
}
