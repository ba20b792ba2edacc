//! IDT, ISR stubs, and the interrupt dispatch hub.
//!
//! Every vector funnels through one common stub that builds the
//! [`TrapFrame`] layout, calls [`isr_dispatch`], and on the way out honours
//! the scheduler's `SCHED_NEXT_ESP` stack pivot — that single `mov esp` is
//! how processes change places.

use core::arch::{asm, global_asm};

use orion_lib::{TrapFrame, cprintf, klog_error};

use orion_drivers::{pic, pit, ps2};

const IDT_ENTRIES: usize = 256;
const SYSCALL_VECTOR: usize = orion_abi::syscall::SYSCALL_VECTOR as usize;

#[repr(C, packed)]
#[derive(Clone, Copy)]
struct IdtEntry {
    offset_low: u16,
    selector: u16,
    zero: u8,
    flags: u8,
    offset_high: u16,
}

impl IdtEntry {
    const fn missing() -> Self {
        Self {
            offset_low: 0,
            selector: 0,
            zero: 0,
            flags: 0,
            offset_high: 0,
        }
    }

    fn gate(handler: u32) -> Self {
        Self {
            offset_low: (handler & 0xFFFF) as u16,
            selector: 0x08,
            zero: 0,
            // Present, ring 0, 32-bit interrupt gate.
            flags: 0x8E,
            offset_high: (handler >> 16) as u16,
        }
    }
}

#[repr(C, packed)]
struct IdtPointer {
    limit: u16,
    base: u32,
}

static mut IDT: [IdtEntry; IDT_ENTRIES] = [IdtEntry::missing(); IDT_ENTRIES];

// ---------------------------------------------------------------------------
// Stubs
// ---------------------------------------------------------------------------

global_asm!(
    r#"
.section .text
.global isr_common
isr_common:
    pusha
    push gs
    push fs
    push es
    push ds
    mov ax, 0x10
    mov ds, ax
    mov es, ax
    mov fs, ax
    mov gs, ax
    push esp
    call isr_dispatch
    add esp, 4
    mov eax, [SCHED_NEXT_ESP]
    test eax, eax
    jz 1f
    mov dword ptr [SCHED_NEXT_ESP], 0
    mov esp, eax
1:
    pop ds
    pop es
    pop fs
    pop gs
    popa
    add esp, 8
    iretd
"#
);

macro_rules! isr_noerr {
    ($vector:literal, $name:ident) => {
        global_asm!(concat!(
            ".global ",
            stringify!($name),
            "\n",
            stringify!($name),
            ":\n",
            "    push 0\n",
            "    push ",
            stringify!($vector),
            "\n",
            "    jmp isr_common\n"
        ));
        unsafe extern "C" {
            fn $name();
        }
    };
}

macro_rules! isr_err {
    ($vector:literal, $name:ident) => {
        global_asm!(concat!(
            ".global ",
            stringify!($name),
            "\n",
            stringify!($name),
            ":\n",
            "    push ",
            stringify!($vector),
            "\n",
            "    jmp isr_common\n"
        ));
        unsafe extern "C" {
            fn $name();
        }
    };
}

isr_noerr!(0, isr0);
isr_noerr!(1, isr1);
isr_noerr!(2, isr2);
isr_noerr!(3, isr3);
isr_noerr!(4, isr4);
isr_noerr!(5, isr5);
isr_noerr!(6, isr6);
isr_noerr!(7, isr7);
isr_err!(8, isr8);
isr_noerr!(9, isr9);
isr_err!(10, isr10);
isr_err!(11, isr11);
isr_err!(12, isr12);
isr_err!(13, isr13);
isr_err!(14, isr14);
isr_noerr!(15, isr15);
isr_noerr!(16, isr16);
isr_err!(17, isr17);
isr_noerr!(18, isr18);
isr_noerr!(19, isr19);
isr_noerr!(32, irq0);
isr_noerr!(33, irq1);
isr_noerr!(34, irq2);
isr_noerr!(35, irq3);
isr_noerr!(36, irq4);
isr_noerr!(37, irq5);
isr_noerr!(38, irq6);
isr_noerr!(39, irq7);
isr_noerr!(40, irq8);
isr_noerr!(41, irq9);
isr_noerr!(42, irq10);
isr_noerr!(43, irq11);
isr_noerr!(44, irq12);
isr_noerr!(45, irq13);
isr_noerr!(46, irq14);
isr_noerr!(47, irq15);
isr_noerr!(165, isr_syscall);

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

const EXCEPTION_NAMES: [&str; 20] = [
    "divide error",
    "debug",
    "nmi",
    "breakpoint",
    "overflow",
    "bound range",
    "invalid opcode",
    "device not available",
    "double fault",
    "coprocessor overrun",
    "invalid tss",
    "segment not present",
    "stack fault",
    "general protection fault",
    "page fault",
    "reserved",
    "x87 fault",
    "alignment check",
    "machine check",
    "simd fault",
];

fn handle_exception(frame: &TrapFrame) -> ! {
    let name = EXCEPTION_NAMES
        .get(frame.int_no as usize)
        .copied()
        .unwrap_or("unknown");
    klog_error!(
        "EXCEPTION {} ({}) err={:#x} eip={:#010x}",
        frame.int_no,
        name,
        frame.err_code,
        frame.eip
    );
    if frame.int_no == 14 {
        let cr2: u32;
        unsafe { asm!("mov {}, cr2", out(reg) cr2) };
        klog_error!("  page fault address {:#010x}", cr2);
    }
    cprintf!(
        "\nKERNEL PANIC: {} at {:#010x} (err {:#x})\nSystem halted.\n",
        name,
        frame.eip,
        frame.err_code
    );
    orion_lib::cpu::halt_loop();
}

fn handle_irq(frame: &mut TrapFrame) {
    let irq = (frame.int_no - 32) as u8;
    match irq {
        0 => pit::irq_handler(),
        1 => ps2::keyboard::irq_handler(),
        12 => ps2::mouse::irq_handler(),
        _ => {}
    }
    pic::send_eoi(irq);

    // Timer tail: the second of the two legal context-switch sites. Only
    // rescues the CPU out of the idle loop; running processes are never
    // preempted here.
    if irq == 0 {
        orion_core::scheduler_on_timer_tail();
    }
}

/// Common entry from the asm stub.
#[unsafe(no_mangle)]
extern "C" fn isr_dispatch(frame: *mut TrapFrame) {
    // SAFETY: the stub passes the frame it just built on this stack.
    let frame = unsafe { &mut *frame };
    match frame.int_no as usize {
        0..=31 => handle_exception(frame),
        32..=47 => handle_irq(frame),
        SYSCALL_VECTOR => orion_core::syscall_handle(frame),
        other => {
            klog_error!("INT: stray vector {}", other);
        }
    }
}

fn set_gate(vector: usize, handler: unsafe extern "C" fn()) {
    // SAFETY: single-threaded boot path; writes go through a raw pointer
    // so no reference to the mutable static is formed.
    unsafe {
        let idt = &raw mut IDT;
        (*idt)[vector] = IdtEntry::gate(handler as usize as u32);
    }
}

/// Build and load the IDT.
pub fn init() {
    set_gate(0, isr0);
    set_gate(1, isr1);
    set_gate(2, isr2);
    set_gate(3, isr3);
    set_gate(4, isr4);
    set_gate(5, isr5);
    set_gate(6, isr6);
    set_gate(7, isr7);
    set_gate(8, isr8);
    set_gate(9, isr9);
    set_gate(10, isr10);
    set_gate(11, isr11);
    set_gate(12, isr12);
    set_gate(13, isr13);
    set_gate(14, isr14);
    set_gate(15, isr15);
    set_gate(16, isr16);
    set_gate(17, isr17);
    set_gate(18, isr18);
    set_gate(19, isr19);
    set_gate(32, irq0);
    set_gate(33, irq1);
    set_gate(34, irq2);
    set_gate(35, irq3);
    set_gate(36, irq4);
    set_gate(37, irq5);
    set_gate(38, irq6);
    set_gate(39, irq7);
    set_gate(40, irq8);
    set_gate(41, irq9);
    set_gate(42, irq10);
    set_gate(43, irq11);
    set_gate(44, irq12);
    set_gate(45, irq13);
    set_gate(46, irq14);
    set_gate(47, irq15);
    set_gate(SYSCALL_VECTOR, isr_syscall);

    let pointer = IdtPointer {
        limit: (core::mem::size_of::<[IdtEntry; IDT_ENTRIES]>() - 1) as u16,
        base: &raw const IDT as u32,
    };
    unsafe {
        asm!("lidt [{}]", in(reg) &pointer);
    }
}
