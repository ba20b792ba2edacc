//! Drive-id space: the hidden map from ids to backends.
//!
//! `refresh_drive_map` assigns ids in enumeration order — AHCI, PATA, USB —
//! while ramdisks claim the top ids so the boot fallback is always `disk 7`
//! on the 8-slot table. AHCI and USB silicon drivers are collaborators;
//! their kinds exist in the map but nothing enumerates into them here.

use orion_abi::fs::{BackendKind, MAX_DISKS};
use orion_lib::IrqMutex;

use orion_fs::blockdev::{BlockOps, register_block_ops};

use crate::{ata, ramdisk};

#[derive(Clone, Copy)]
struct MapEntry {
    kind: BackendKind,
    index: u8,
}

impl MapEntry {
    const fn empty() -> Self {
        Self {
            kind: BackendKind::None,
            index: 0,
        }
    }
}

static MAP: IrqMutex<[MapEntry; MAX_DISKS]> = IrqMutex::new([MapEntry::empty(); MAX_DISKS]);

/// Rebuild the id map from whatever the backends report right now.
pub fn refresh_drive_map() {
    let mut fresh = [MapEntry::empty(); MAX_DISKS];
    let mut next = 0usize;

    for slot in 0..ata::ATA_SLOTS {
        if next >= MAX_DISKS {
            break;
        }
        if ata::present(slot) {
            fresh[next] = MapEntry {
                kind: BackendKind::Pata,
                index: slot as u8,
            };
            next += 1;
        }
    }

    // Ramdisks anchor at the top of the id space, newest last.
    let mut top = MAX_DISKS;
    for slot in (0..ramdisk::RAMDISK_SLOTS).rev() {
        if ramdisk::present(slot) && top > next {
            top -= 1;
            fresh[top] = MapEntry {
                kind: BackendKind::Ramdisk,
                index: slot as u8,
            };
        }
    }

    *MAP.lock() = fresh;
}

fn resolve(drive: u8) -> Option<(BackendKind, u8)> {
    if drive as usize >= MAX_DISKS {
        return None;
    }
    let entry = MAP.lock()[drive as usize];
    if entry.kind == BackendKind::None {
        None
    } else {
        Some((entry.kind, entry.index))
    }
}

fn op_present(drive: u8) -> bool {
    match resolve(drive) {
        Some((BackendKind::Pata, idx)) => ata::present(idx as usize),
        Some((BackendKind::Ramdisk, idx)) => ramdisk::present(idx as usize),
        _ => false,
    }
}

fn op_sector_count(drive: u8) -> u32 {
    match resolve(drive) {
        Some((BackendKind::Pata, idx)) => ata::sector_count(idx as usize),
        Some((BackendKind::Ramdisk, idx)) => ramdisk::sector_count(idx as usize),
        _ => 0,
    }
}

fn bounds_ok(drive: u8, lba: u32, count: u32) -> bool {
    let count = if count == 0 { 256 } else { count };
    let total = op_sector_count(drive);
    lba.checked_add(count).is_some_and(|end| end <= total)
}

fn op_read(drive: u8, lba: u32, count: u32, buf: &mut [u8]) -> bool {
    if !bounds_ok(drive, lba, count) {
        return false;
    }
    match resolve(drive) {
        Some((BackendKind::Pata, idx)) => ata::read(idx as usize, lba, count, buf),
        Some((BackendKind::Ramdisk, idx)) => ramdisk::read(idx as usize, lba, count, buf),
        _ => false,
    }
}

fn op_write(drive: u8, lba: u32, count: u32, buf: &[u8]) -> bool {
    if !bounds_ok(drive, lba, count) {
        return false;
    }
    match resolve(drive) {
        Some((BackendKind::Pata, idx)) => ata::write(idx as usize, lba, count, buf),
        Some((BackendKind::Ramdisk, idx)) => ramdisk::write(idx as usize, lba, count, buf),
        _ => false,
    }
}

fn op_flush(drive: u8) -> bool {
    match resolve(drive) {
        Some((BackendKind::Pata, idx)) => ata::flush(idx as usize),
        // Ramdisks have nothing to flush; success by definition.
        Some((BackendKind::Ramdisk, _)) => true,
        _ => false,
    }
}

fn op_model(drive: u8, out: &mut [u8]) -> bool {
    match resolve(drive) {
        Some((BackendKind::Pata, idx)) => ata::model(idx as usize, out),
        Some((BackendKind::Ramdisk, _)) => {
            orion_lib::string::copy_into_padded(out, b"RAM image");
            true
        }
        _ => false,
    }
}

fn op_backend(drive: u8) -> (BackendKind, u8) {
    resolve(drive).unwrap_or((BackendKind::None, 0))
}

static BLOCK_OPS: BlockOps = BlockOps {
    present: op_present,
    read: op_read,
    write: op_write,
    sector_count: op_sector_count,
    flush: op_flush,
    refresh_drive_map,
    model: op_model,
    backend: op_backend,
};

pub fn init() {
    refresh_drive_map();
    register_block_ops(&BLOCK_OPS);
}
