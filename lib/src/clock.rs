//! PIT tick clock.
//!
//! The PIT IRQ handler calls [`clock_tick`] once per interrupt; everything
//! else reads the monotonic counter. The live frequency is published here so
//! millisecond conversions track whatever rate the PIT was actually
//! programmed with.

use core::sync::atomic::{AtomicU32, Ordering};

use crate::ports::PIT_DEFAULT_FREQUENCY_HZ;

static TICKS: AtomicU32 = AtomicU32::new(0);
static PIT_HZ: AtomicU32 = AtomicU32::new(PIT_DEFAULT_FREQUENCY_HZ);

/// Advance the tick counter. IRQ context only.
#[inline]
pub fn clock_tick() {
    TICKS.fetch_add(1, Ordering::Relaxed);
}

/// Monotonic tick counter. Wraps; compare with [`ticks_elapsed`].
#[inline]
pub fn ticks() -> u32 {
    TICKS.load(Ordering::Relaxed)
}

/// Wrap-safe "has `when` passed" test: elapsed iff `(now - when)` is
/// non-negative as a signed 32-bit difference.
#[inline]
pub fn ticks_elapsed(now: u32, when: u32) -> bool {
    (now.wrapping_sub(when) as i32) >= 0
}

/// Publish the programmed PIT frequency. Called by the PIT driver.
pub fn set_tick_frequency(hz: u32) {
    PIT_HZ.store(if hz == 0 { PIT_DEFAULT_FREQUENCY_HZ } else { hz }, Ordering::Relaxed);
}

/// Live PIT frequency in Hz.
#[inline]
pub fn tick_frequency() -> u32 {
    PIT_HZ.load(Ordering::Relaxed)
}

/// Convert milliseconds to ticks at the live frequency, rounding up and
/// clamping to at least one tick.
pub fn ms_to_ticks(ms: u32) -> u32 {
    let hz = tick_frequency();
    let q = ms / 1000;
    let r = ms % 1000;

    if q > u32::MAX / hz {
        return u32::MAX;
    }
    let mut ticks = q * hz;

    if r != 0 {
        let rem = r.saturating_mul(hz);
        ticks = ticks.saturating_add(rem / 1000);
        if rem % 1000 != 0 {
            ticks = ticks.saturating_add(1);
        }
    }

    if ticks == 0 { 1 } else { ticks }
}

/// Uptime in whole milliseconds.
pub fn uptime_ms() -> u64 {
    let hz = tick_frequency() as u64;
    (ticks() as u64).saturating_mul(1000) / hz
}
