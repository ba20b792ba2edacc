//! Flat GDT: null, kernel code, kernel data. Everything runs in ring 0 on
//! 4 GiB flat segments; the selectors are fixed by the ABI the trap frames
//! assume.

use core::arch::asm;

#[repr(C, packed)]
#[derive(Clone, Copy)]
struct GdtEntry {
    limit_low: u16,
    base_low: u16,
    base_mid: u8,
    access: u8,
    granularity: u8,
    base_high: u8,
}

impl GdtEntry {
    const fn new(access: u8, granularity: u8) -> Self {
        Self {
            limit_low: 0xFFFF,
            base_low: 0,
            base_mid: 0,
            access,
            granularity,
            base_high: 0,
        }
    }

    const fn null() -> Self {
        Self {
            limit_low: 0,
            base_low: 0,
            base_mid: 0,
            access: 0,
            granularity: 0,
            base_high: 0,
        }
    }
}

#[repr(C, packed)]
struct GdtPointer {
    limit: u16,
    base: u32,
}

static GDT: [GdtEntry; 3] = [
    GdtEntry::null(),
    // Code: present, ring 0, executable, readable; 4 KiB granularity, 32-bit.
    GdtEntry::new(0x9A, 0xCF),
    // Data: present, ring 0, writable.
    GdtEntry::new(0x92, 0xCF),
];

/// Install the flat GDT and reload every segment register.
pub fn init() {
    let pointer = GdtPointer {
        limit: (core::mem::size_of_val(&GDT) - 1) as u16,
        base: GDT.as_ptr() as u32,
    };

    unsafe {
        asm!(
            "lgdt [{ptr}]",
            "mov ax, 0x10",
            "mov ds, ax",
            "mov es, ax",
            "mov fs, ax",
            "mov gs, ax",
            "mov ss, ax",
            // Far return reloads CS with the new code selector.
            "push 0x08",
            "lea eax, [2f]",
            "push eax",
            "retf",
            "2:",
            ptr = in(reg) &pointer,
            out("eax") _,
        );
    }
}
