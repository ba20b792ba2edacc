#![no_std]
#![allow(unsafe_op_in_unsafe_fn)]

extern crate alloc;

pub mod bootcmd;
pub mod config;
pub mod gdt;
pub mod idt;
pub mod motd;
pub mod multiboot;
pub mod panic;

pub use panic::panic_handler_impl;

use orion_lib::services::{BOOT, BootServices};
use orion_lib::{cprintf, klog_info};

unsafe extern "C" {
    /// End of the kernel image; the heap starts above it. Provided by the
    /// linker script.
    static __kernel_end: u8;
}

const HEAP_MIN: usize = 4 * 1024 * 1024;
const HEAP_MAX: usize = 64 * 1024 * 1024;

/// SYS_START_SHELL tail, reached through the service registry.
fn svc_start_shell() {
    config::load();
    bootcmd::parse_bootcmd();
}

fn svc_boot_flags() -> u32 {
    config::boot_flags()
}

fn svc_print_motd(path: &str) {
    motd::print_motd_file(path);
}

static BOOT_IMPL: BootServices = BootServices {
    start_shell: svc_start_shell,
    boot_flags: svc_boot_flags,
    print_motd: svc_print_motd,
};

/// Bring the machine up. Called once from the kernel entry with the
/// Multiboot2 magic/info pair; never returns — the tail of this function
/// becomes the idle loop the scheduler escapes from.
///
/// # Safety
///
/// Must be the first and only kernel entry, with `mb_info` as delivered by
/// the bootloader.
pub unsafe fn kernel_main(mb_magic: u32, mb_info: u32, heap_allocator: &orion_mm::KernelHeap) -> ! {
    orion_lib::klog_init();
    klog_info!("orionOS booting");

    if mb_magic != 0x36D7_6289 {
        klog_info!("BOOT: bad multiboot2 magic {:#x}", mb_magic);
    }
    multiboot::parse(mb_info);

    gdt::init();
    idt::init();

    let facts = multiboot::boot_facts();
    orion_mm::paging::paging_init(facts.ram_bytes);

    // Heap: above the image and any bootloader module, capped.
    let mut heap_start = (&raw const __kernel_end) as usize;
    if let Some((_, module_end)) = facts.ramdisk_module {
        heap_start = heap_start.max(module_end as usize);
    }
    let heap_start = (heap_start + 4095) & !4095;
    let ram = facts.ram_bytes.min(u32::MAX as u64) as usize;
    let heap_size = ram
        .saturating_sub(heap_start)
        .clamp(HEAP_MIN, HEAP_MAX);
    heap_allocator.init(heap_start, heap_size);
    klog_info!(
        "HEAP: {:#010x} + {} MiB",
        heap_start,
        heap_size / (1024 * 1024)
    );

    orion_lib::workqueue::workqueue_init();
    orion_lib::timer_task::timer_task_init();

    orion_drivers::init();
    multiboot::adopt_framebuffer();
    orion_video::init();
    BOOT.register(&BOOT_IMPL);

    cprintf!("orionOS kernel loaded.\n");

    bootcmd::adopt_boot_module();
    orion_fs::disk::detect_disks_quick();

    #[cfg(feature = "builtin-tests")]
    {
        orion_tests::run_all();
    }

    orion_lib::cpu::enable_interrupts();

    // Userland must have registered its builtins by now (the kernel crate
    // links it in and calls its init before us via the registration hook).
    if orion_core::bin::bin_create_process("/cmd/shell.sys", alloc::vec::Vec::new(), true)
        .is_none()
    {
        cprintf!("[kernel] no shell available; staying in idle loop\n");
    }

    // Become the idle context: drain deferred work, halt, let the timer
    // tail hand the CPU to whatever is ready.
    loop {
        orion_core::idle::drain_deferred_work();
        orion_lib::cpu::sti_halt();
    }
}
