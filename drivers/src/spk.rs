//! PC speaker tone generation off PIT channel 2.

use orion_lib::clock;
use orion_lib::ports::{
    PIT_BASE_FREQUENCY_HZ, PIT_CHANNEL2, PIT_COMMAND, PIT_COMMAND_ACCESS_LOHI,
    PIT_COMMAND_CHANNEL2, PIT_COMMAND_MODE_SQUARE, SPEAKER_CONTROL,
};
use orion_lib::services::{SPEAKER, SpeakerServices};

fn tone_on(hz: u32) {
    let hz = hz.clamp(20, 20_000);
    let divisor = (PIT_BASE_FREQUENCY_HZ / hz).clamp(1, 0xFFFF) as u16;
    unsafe {
        PIT_COMMAND.write(PIT_COMMAND_CHANNEL2 | PIT_COMMAND_ACCESS_LOHI | PIT_COMMAND_MODE_SQUARE);
        PIT_CHANNEL2.write((divisor & 0xFF) as u8);
        PIT_CHANNEL2.write((divisor >> 8) as u8);
        let gate = SPEAKER_CONTROL.read();
        SPEAKER_CONTROL.write(gate | 0x03);
    }
}

fn tone_off() {
    unsafe {
        let gate = SPEAKER_CONTROL.read();
        SPEAKER_CONTROL.write(gate & !0x03);
    }
}

/// Beep at `hz` for `ms`, sleeping on the tick clock with interrupts on.
pub fn beep(hz: u32, ms: u32) {
    if hz == 0 || ms == 0 {
        return;
    }
    tone_on(hz);
    let until = clock::ticks().wrapping_add(clock::ms_to_ticks(ms));
    while !clock::ticks_elapsed(clock::ticks(), until) {
        orion_lib::cpu::sti_halt();
    }
    tone_off();
}

static SPEAKER_IMPL: SpeakerServices = SpeakerServices { beep };

pub fn register() {
    SPEAKER.register(&SPEAKER_IMPL);
}
