//! Identity-mapped paging for the single address space.
//!
//! The kernel owns one page directory. RAM is identity-mapped with 4 MiB
//! pages (PSE); the framebuffer is mapped on demand, write-combining when
//! the PAT is available and uncacheable otherwise. `virt_to_phys` is the
//! walk the syscall layer uses to validate user pointers, so it must agree
//! with exactly what was mapped — nothing is assumed mapped that the
//! directory does not say is mapped.

use core::arch::asm;
use core::sync::atomic::{AtomicBool, Ordering};

use orion_lib::IrqMutex;
use orion_lib::klog_info;

pub const PAGE_SIZE: u32 = 4096;
const PAGE_SIZE_4M: u32 = 4 * 1024 * 1024;
const ENTRIES: usize = 1024;

bitflags::bitflags! {
    #[derive(Clone, Copy)]
    pub struct PageFlags: u32 {
        const PRESENT = 1 << 0;
        const RW = 1 << 1;
        const USER = 1 << 2;
        const WRITE_THROUGH = 1 << 3;
        /// Cache disable; the UC fallback for the framebuffer.
        const PCD = 1 << 4;
        /// 4 MiB page (PDE only, requires PSE).
        const LARGE = 1 << 7;
        /// PAT bit of a 4 MiB PDE (bit 12); selects the WC entry we program.
        const PAT_LARGE = 1 << 12;
    }
}

#[repr(C, align(4096))]
struct PageDirectory {
    entries: [u32; ENTRIES],
}

impl PageDirectory {
    const fn zeroed() -> Self {
        Self {
            entries: [0; ENTRIES],
        }
    }
}

static DIRECTORY: IrqMutex<PageDirectory> = IrqMutex::new(PageDirectory::zeroed());
static PAT_WC: AtomicBool = AtomicBool::new(false);
static PAGING_ON: AtomicBool = AtomicBool::new(false);

fn cpu_has_pat() -> bool {
    let edx: u32;
    unsafe {
        // CPUID leaf 1. ebx is LLVM-reserved on x86, so shuffle through esi.
        asm!(
            "mov esi, ebx",
            "cpuid",
            "mov ebx, esi",
            inout("eax") 1u32 => _,
            out("ecx") _,
            out("edx") edx,
            out("esi") _,
        );
    }
    edx & (1 << 16) != 0
}

/// Program PAT entry 1 to write-combining so `PAT_LARGE` PDEs resolve to WC.
fn pat_enable_wc() {
    const IA32_PAT: u32 = 0x277;
    unsafe {
        let (mut lo, hi): (u32, u32);
        asm!("rdmsr", in("ecx") IA32_PAT, out("eax") lo, out("edx") hi);
        // Entry 1 (PCD=0, PWT=1): 0x01 = write-combining.
        lo = (lo & !0x0000_FF00) | 0x0000_0100;
        asm!("wrmsr", in("ecx") IA32_PAT, in("eax") lo, in("edx") hi);
    }
}

/// Build the identity map and turn paging on.
///
/// # Safety
///
/// Must run once, on the boot CPU, before any user process exists. The
/// kernel image, heap, and stack must all live below `ram_bytes`.
pub unsafe fn paging_init(ram_bytes: u64) {
    let wc = cpu_has_pat();
    if wc {
        pat_enable_wc();
    }
    PAT_WC.store(wc, Ordering::Relaxed);

    let dir_phys;
    {
        let mut dir = DIRECTORY.lock();
        let limit = ram_bytes.min(u32::MAX as u64 + 1) as u64;
        let mut addr: u64 = 0;
        while addr < limit {
            let index = (addr as u32 / PAGE_SIZE_4M) as usize;
            dir.entries[index] = (addr as u32)
                | (PageFlags::PRESENT | PageFlags::RW | PageFlags::USER | PageFlags::LARGE).bits();
            addr += PAGE_SIZE_4M as u64;
        }
        dir_phys = dir.entries.as_ptr() as u32;
    }

    // CR4.PSE on, CR3 = directory, CR0.PG on.
    asm!(
        "mov eax, cr4",
        "or eax, 0x10",
        "mov cr4, eax",
        "mov cr3, {dir:e}",
        "mov eax, cr0",
        "or eax, 0x80000000",
        "mov cr0, eax",
        dir = in(reg) dir_phys,
        out("eax") _,
    );
    PAGING_ON.store(true, Ordering::Release);

    klog_info!(
        "PAGING: identity map up to {} MiB, PAT WC {}",
        ram_bytes / (1024 * 1024),
        if wc { "on" } else { "off" }
    );
}

fn flush_tlb() {
    unsafe {
        asm!("mov eax, cr3", "mov cr3, eax", out("eax") _);
    }
}

/// Identity-map a physical range as device memory (framebuffer): WC when
/// the PAT is available, UC otherwise. Range is widened to 4 MiB bounds.
pub fn map_device_range(phys: u64, size: u64) -> bool {
    if phys == 0 || size == 0 || phys > u32::MAX as u64 {
        return false;
    }
    let end = phys + size;
    if end > u32::MAX as u64 + 1 {
        return false;
    }

    let mut flags = PageFlags::PRESENT | PageFlags::RW | PageFlags::USER | PageFlags::LARGE;
    if PAT_WC.load(Ordering::Relaxed) {
        flags |= PageFlags::WRITE_THROUGH | PageFlags::PAT_LARGE;
    } else {
        flags |= PageFlags::PCD;
    }

    {
        let mut dir = DIRECTORY.lock();
        let start = (phys as u32) & !(PAGE_SIZE_4M - 1);
        let mut addr = start as u64;
        while addr < end {
            let index = (addr as u32 / PAGE_SIZE_4M) as usize;
            dir.entries[index] = (addr as u32) | flags.bits();
            addr += PAGE_SIZE_4M as u64;
        }
    }

    if PAGING_ON.load(Ordering::Acquire) {
        flush_tlb();
    }
    true
}

/// Walk the directory. Returns the physical address backing `virt`, or
/// `None` when the covering entry is not present.
pub fn virt_to_phys(virt: u32) -> Option<u32> {
    let dir = DIRECTORY.lock();
    let pde = dir.entries[(virt / PAGE_SIZE_4M) as usize];
    if pde & PageFlags::PRESENT.bits() == 0 {
        return None;
    }
    if pde & PageFlags::LARGE.bits() != 0 {
        return Some((pde & !(PAGE_SIZE_4M - 1)) | (virt & (PAGE_SIZE_4M - 1)));
    }

    // Small-page path: the table itself is identity-mapped.
    let table = (pde & !(PAGE_SIZE - 1)) as *const u32;
    let pte = unsafe { *table.add(((virt / PAGE_SIZE) % ENTRIES as u32) as usize) };
    if pte & PageFlags::PRESENT.bits() == 0 {
        return None;
    }
    Some((pte & !(PAGE_SIZE - 1)) | (virt & (PAGE_SIZE - 1)))
}

pub fn pat_wc_enabled() -> bool {
    PAT_WC.load(Ordering::Relaxed)
}
