//! System reset: 8042 pulse, then a forced triple fault.

use orion_lib::cpu;
use orion_lib::io::io_wait;
use orion_lib::ports::PS2_COMMAND;
use orion_lib::services::{PLATFORM, PlatformServices};

fn reboot() -> ! {
    cpu::disable_interrupts();

    // Keyboard-controller reset line.
    for _ in 0..16 {
        unsafe { PS2_COMMAND.write(0xFE) };
        io_wait();
    }

    // Still here: load an empty IDT and fault through it.
    #[repr(C, packed)]
    struct Idtr {
        limit: u16,
        base: u32,
    }
    let idtr = Idtr { limit: 0, base: 0 };
    unsafe {
        core::arch::asm!(
            "lidt [{}]",
            "int3",
            in(reg) &idtr,
            options(noreturn),
        );
    }
}

static PLATFORM_IMPL: PlatformServices = PlatformServices { reboot };

pub fn register() {
    PLATFORM.register(&PLATFORM_IMPL);
}
