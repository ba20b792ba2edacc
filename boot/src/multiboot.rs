//! Multiboot2 boot-information consumption.
//!
//! Four tags matter: the command line, modules (candidate
//! ramdisk images), the memory map (RAM sizing for the heap), and the
//! framebuffer (type 1, 24/32 bpp).

use multiboot2::{BootInformation, BootInformationHeader};

use orion_lib::string::find;
use orion_lib::{IrqMutex, klog_info, klog_warn};
use orion_mm::paging;

const CMDLINE_MAX: usize = 256;

#[derive(Clone, Copy)]
pub struct BootFacts {
    pub cmdline: [u8; CMDLINE_MAX],
    pub cmdline_len: usize,
    pub ram_bytes: u64,
    pub ramdisk_module: Option<(u32, u32)>,
    pub framebuffer: Option<(u64, u32, u32, u32, u32)>,
}

impl BootFacts {
    const fn empty() -> Self {
        Self {
            cmdline: [0; CMDLINE_MAX],
            cmdline_len: 0,
            ram_bytes: 64 * 1024 * 1024,
            ramdisk_module: None,
            framebuffer: None,
        }
    }

    pub fn cmdline_str(&self) -> &str {
        core::str::from_utf8(&self.cmdline[..self.cmdline_len]).unwrap_or("")
    }
}

static FACTS: IrqMutex<BootFacts> = IrqMutex::new(BootFacts::empty());

pub fn boot_facts() -> BootFacts {
    *FACTS.lock()
}

/// A module is the ramdisk when its cmdline names one, or as the first
/// unnamed module otherwise.
fn module_is_ramdisk(cmdline: &str, already_found: bool) -> bool {
    if cmdline.is_empty() {
        return !already_found;
    }
    let bytes = cmdline.as_bytes();
    find(bytes, b"ramd").is_some()
        || find(bytes, b"ramdisk").is_some()
        || find(bytes, b"initrd").is_some()
        || find(bytes, b"initramfs").is_some()
}

/// Parse the tag list at `mb_ptr`. Must run before paging is switched so
/// the bootloader structures are still reachable where GRUB left them.
///
/// # Safety
///
/// `mb_ptr` must be the Multiboot2 information pointer handed over in
/// `ebx` at entry.
pub unsafe fn parse(mb_ptr: u32) {
    let info = match BootInformation::load(mb_ptr as *const BootInformationHeader) {
        Ok(info) => info,
        Err(_) => {
            klog_warn!("MB2: no multiboot info!");
            return;
        }
    };

    let mut facts = BootFacts::empty();

    if let Some(tag) = info.command_line_tag() {
        if let Ok(cmdline) = tag.cmdline() {
            let len = cmdline.len().min(CMDLINE_MAX);
            facts.cmdline[..len].copy_from_slice(&cmdline.as_bytes()[..len]);
            facts.cmdline_len = len;
            klog_info!("MB2: cmdline: {}", cmdline);
        }
    }

    if let Some(tag) = info.memory_map_tag() {
        let mut top: u64 = 0;
        for area in tag.memory_areas() {
            let end = area.start_address() + area.size();
            if end > top {
                top = end;
            }
        }
        if top > 0 {
            facts.ram_bytes = top;
        }
        klog_info!("MB2: {} MiB of RAM mapped", facts.ram_bytes / (1024 * 1024));
    }

    for module in info.module_tags() {
        let cmdline = module.cmdline().unwrap_or("");
        if module_is_ramdisk(cmdline, facts.ramdisk_module.is_some()) {
            facts.ramdisk_module = Some((module.start_address(), module.end_address()));
            klog_info!(
                "MB2: module: {} ({:#010x}-{:#010x})",
                cmdline,
                module.start_address(),
                module.end_address()
            );
        }
    }

    match info.framebuffer_tag() {
        Some(Ok(tag)) => {
            let bpp = tag.bpp() as u32;
            if bpp == 24 || bpp == 32 {
                facts.framebuffer = Some((
                    tag.address(),
                    tag.width(),
                    tag.height(),
                    tag.pitch(),
                    bpp,
                ));
                klog_info!("MB2: framebuffer {}x{} {} bpp", tag.width(), tag.height(), bpp);
            } else {
                klog_warn!("MB2: framebuffer bpp {} unsupported", bpp);
            }
        }
        _ => klog_warn!("MB2: no usable framebuffer tag"),
    }

    *FACTS.lock() = facts;
}

/// Map the discovered framebuffer (WC when the PAT allows) and hand it to
/// the video layer.
pub fn adopt_framebuffer() {
    let facts = boot_facts();
    let Some((addr, width, height, pitch, bpp)) = facts.framebuffer else {
        return;
    };
    let size = pitch as u64 * height as u64;
    if !paging::map_device_range(addr, size) {
        klog_warn!("MB2: framebuffer mapping failed");
        return;
    }
    orion_video::fb::set_framebuffer(addr, width, height, pitch, bpp);
}
