//! Memory-backed drives.
//!
//! Two sources: a Multiboot2 module adopted in place at boot, and images
//! loaded from a mounted filesystem into heap memory. Both look like plain
//! sector devices to the block map, which hands them the top drive ids.

use alloc::boxed::Box;
use alloc::vec;

use orion_lib::{IrqMutex, klog_info};

pub const RAMDISK_SLOTS: usize = 2;
const SECTOR: usize = 512;

enum Backing {
    None,
    /// Heap image, owned.
    Owned(Box<[u8]>),
    /// Bootloader module adopted in place.
    Borrowed { base: *mut u8, len: usize },
}

// SAFETY: the borrowed region is bootloader-reserved memory nothing else
// touches; access is serialised by the table lock.
unsafe impl Send for Backing {}

struct RamDisk {
    backing: Backing,
}

impl RamDisk {
    const fn empty() -> Self {
        Self {
            backing: Backing::None,
        }
    }

    fn bytes(&self) -> usize {
        match &self.backing {
            Backing::None => 0,
            Backing::Owned(data) => data.len(),
            Backing::Borrowed { len, .. } => *len,
        }
    }
}

static DISKS: IrqMutex<[RamDisk; RAMDISK_SLOTS]> =
    IrqMutex::new([RamDisk::empty(), RamDisk::empty()]);

fn install(backing: Backing) -> Option<usize> {
    let mut disks = DISKS.lock();
    let slot = disks
        .iter()
        .position(|d| matches!(d.backing, Backing::None))?;
    disks[slot].backing = backing;
    Some(slot)
}

/// Adopt a bootloader module as a read-write ramdisk.
///
/// # Safety
///
/// `base..base+len` must be a valid, unused physical region that stays
/// reserved for the ramdisk's lifetime.
pub unsafe fn adopt_region(base: u32, len: u32) -> Option<usize> {
    if base == 0 || len < SECTOR as u32 {
        return None;
    }
    let slot = install(Backing::Borrowed {
        base: base as *mut u8,
        len: len as usize,
    })?;
    klog_info!("RAMDISK: adopted module at {:#x} ({} KiB) as slot {}", base, len / 1024, slot);
    Some(slot)
}

/// Create a blank ramdisk of `sectors` sectors.
pub fn create_blank(sectors: u32) -> Option<usize> {
    let data = vec![0u8; sectors as usize * SECTOR].into_boxed_slice();
    let slot = install(Backing::Owned(data))?;
    klog_info!("RAMDISK: blank image of {} sectors as slot {}", sectors, slot);
    Some(slot)
}

/// Load an image buffer (read from a mounted filesystem) into a fresh slot.
pub fn load_image(image: &[u8]) -> Option<usize> {
    if image.len() < SECTOR {
        return None;
    }
    let padded = image.len().div_ceil(SECTOR) * SECTOR;
    let mut data = vec![0u8; padded].into_boxed_slice();
    data[..image.len()].copy_from_slice(image);
    let slot = install(Backing::Owned(data))?;
    klog_info!("RAMDISK: loaded {} byte image as slot {}", image.len(), slot);
    Some(slot)
}

pub fn present(slot: usize) -> bool {
    slot < RAMDISK_SLOTS && DISKS.lock()[slot].bytes() > 0
}

pub fn sector_count(slot: usize) -> u32 {
    if slot >= RAMDISK_SLOTS {
        return 0;
    }
    (DISKS.lock()[slot].bytes() / SECTOR) as u32
}

pub fn read(slot: usize, lba: u32, count: u32, buf: &mut [u8]) -> bool {
    let count = if count == 0 { 256 } else { count };
    let want = count as usize * SECTOR;
    if slot >= RAMDISK_SLOTS || buf.len() < want {
        return false;
    }

    let disks = DISKS.lock();
    let total = disks[slot].bytes();
    let off = lba as usize * SECTOR;
    if off + want > total {
        return false;
    }
    match &disks[slot].backing {
        Backing::None => false,
        Backing::Owned(data) => {
            buf[..want].copy_from_slice(&data[off..off + want]);
            true
        }
        Backing::Borrowed { base, .. } => {
            // SAFETY: bounds checked against the adopted region above.
            unsafe {
                core::ptr::copy_nonoverlapping(base.add(off), buf.as_mut_ptr(), want);
            }
            true
        }
    }
}

pub fn write(slot: usize, lba: u32, count: u32, buf: &[u8]) -> bool {
    let count = if count == 0 { 256 } else { count };
    let want = count as usize * SECTOR;
    if slot >= RAMDISK_SLOTS || buf.len() < want {
        return false;
    }

    let mut disks = DISKS.lock();
    let total = disks[slot].bytes();
    let off = lba as usize * SECTOR;
    if off + want > total {
        return false;
    }
    match &mut disks[slot].backing {
        Backing::None => false,
        Backing::Owned(data) => {
            data[off..off + want].copy_from_slice(&buf[..want]);
            true
        }
        Backing::Borrowed { base, .. } => {
            // SAFETY: bounds checked against the adopted region above.
            unsafe {
                core::ptr::copy_nonoverlapping(buf.as_ptr(), base.add(off), want);
            }
            true
        }
    }
}
