#![no_std]
#![no_main]

extern crate alloc;

use core::arch::global_asm;
use core::panic::PanicInfo;

use orion_mm::KernelHeap;

#[global_allocator]
static GLOBAL_ALLOCATOR: KernelHeap = KernelHeap::new();

// Multiboot2 header + entry: set up the boot stack and hand the magic/info
// pair to Rust. The framebuffer tag asks the loader for a 32 bpp mode.
global_asm!(
    r#"
.section .multiboot2, "a"
.align 8
mb2_header_start:
    .long 0xE85250D6
    .long 0
    .long mb2_header_end - mb2_header_start
    .long -(0xE85250D6 + (mb2_header_end - mb2_header_start))
.align 8
    .word 5
    .word 0
    .long 20
    .long 1024
    .long 768
    .long 32
.align 8
    .word 0
    .word 0
    .long 8
mb2_header_end:

.section .bss
.align 16
boot_stack_bottom:
    .skip 32768
boot_stack_top:

.section .text
.global _start
_start:
    cli
    mov esp, offset boot_stack_top
    push ebx
    push eax
    call kernel_entry
2:
    cli
    hlt
    jmp 2b
"#
);

#[unsafe(no_mangle)]
extern "C" fn kernel_entry(mb_magic: u32, mb_info: u32) -> ! {
    // Builtin programs register before boot spawns the first of them.
    orion_userland::init();
    // SAFETY: sole entry point, with the bootloader's register contract.
    unsafe { orion_boot::kernel_main(mb_magic, mb_info, &GLOBAL_ALLOCATOR) }
}

#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    orion_boot::panic_handler_impl(info)
}
