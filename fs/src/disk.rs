//! Drive descriptor table, enumeration, and hotplug rescan.
//!
//! `detect_disks_quick` rebuilds the table from the backend map and the
//! quick-probe. Hotplug IRQs call [`disk_request_rescan`], which coalesces:
//! a rescan already pending just sets the "again" flag, and the workqueue
//! closure loops while that flag is set, so the last observed state wins
//! without growing the queue.

use core::ffi::c_void;

use orion_abi::fs::{BackendKind, DRIVE_MODEL_MAX, FS_TAG_MAX, FsKind, MAX_DISKS, SECTOR_SIZE};
use orion_lib::string::{bytes_as_str, copy_into_padded};
use orion_lib::workqueue::workqueue_enqueue;
use orion_lib::{IrqMutex, cprintf};

use crate::blockdev::{BlockDevice, DriveDevice, block_ops};
use crate::quick::fs_quick_probe;

#[derive(Clone, Copy)]
pub struct DiskInfo {
    pub present: bool,
    pub id: u8,
    pub base_lba: u32,
    pub fs_kind: FsKind,
    pub fs_tag: [u8; FS_TAG_MAX],
}

impl DiskInfo {
    const fn empty(id: u8) -> Self {
        Self {
            present: false,
            id,
            base_lba: 0,
            fs_kind: FsKind::None,
            fs_tag: [0; FS_TAG_MAX],
        }
    }

    pub fn tag(&self) -> &str {
        bytes_as_str(&self.fs_tag)
    }
}

struct DiskTable {
    disks: [DiskInfo; MAX_DISKS],
    count: usize,
}

static TABLE: IrqMutex<DiskTable> = IrqMutex::new(DiskTable {
    disks: [
        DiskInfo::empty(0),
        DiskInfo::empty(1),
        DiskInfo::empty(2),
        DiskInfo::empty(3),
        DiskInfo::empty(4),
        DiskInfo::empty(5),
        DiskInfo::empty(6),
        DiskInfo::empty(7),
    ],
    count: 0,
});

static RESCAN: IrqMutex<RescanState> = IrqMutex::new(RescanState {
    pending: false,
    again: false,
});

struct RescanState {
    pending: bool,
    again: bool,
}

pub fn disk_info(drive: u8) -> Option<DiskInfo> {
    if (drive as usize) >= MAX_DISKS {
        return None;
    }
    let table = TABLE.lock();
    let info = table.disks[drive as usize];
    if info.present { Some(info) } else { None }
}

pub fn disk_exists(drive: u8) -> bool {
    disk_info(drive).is_some()
}

pub fn disk_count() -> usize {
    TABLE.lock().count
}

fn set_slot(slot: &mut DiskInfo, id: u8, present: bool, base_lba: u32, kind: FsKind) {
    slot.present = present;
    slot.id = id;
    slot.base_lba = base_lba;
    slot.fs_kind = kind;
    copy_into_padded(&mut slot.fs_tag, kind.tag().as_bytes());
}

/// Demote volumes carrying an NTFS OEM/type string: readable, signed, but
/// nothing we can mount.
fn ntfs_filter(dev: &mut DriveDevice, base: u32, kind: FsKind) -> FsKind {
    if kind == FsKind::None {
        return kind;
    }
    let mut sec = [0u8; SECTOR_SIZE];
    if dev.read_sector(base, &mut sec).is_ok()
        && (&sec[0x03..0x07] == b"NTFS" || &sec[0x52..0x56] == b"NTFS")
    {
        cprintf!("[DISK] drive {} > NTFS detected, marking Unknown\n", dev.drive());
        return FsKind::Unknown;
    }
    kind
}

/// Rebuild the whole drive table: refresh the backend map, probe each id.
pub fn detect_disks_quick() {
    if let Some(ops) = block_ops() {
        (ops.refresh_drive_map)();
    }
    cprintf!("[DISK] Quick detection start\n");

    let mut fresh = [DiskInfo::empty(0); MAX_DISKS];
    let mut count = 0usize;

    for d in 0..MAX_DISKS as u8 {
        let mut dev = DriveDevice::new(d);
        let (kind, base) = fs_quick_probe(&mut dev);

        if kind == FsKind::None {
            cprintf!("[DISK] drive {} > no response\n", d);
            set_slot(&mut fresh[d as usize], d, false, 0, FsKind::None);
            continue;
        }

        let kind = ntfs_filter(&mut dev, base, kind);
        set_slot(&mut fresh[d as usize], d, true, base, kind);
        cprintf!(
            "[DISK] drive {} detected as {} (base LBA={})\n",
            d,
            kind.tag(),
            base
        );
        count += 1;
    }

    {
        let mut table = TABLE.lock();
        table.disks = fresh;
        table.count = count;
    }

    if count == 0 {
        cprintf!("[DISK] No drives found.\n");
    } else {
        cprintf!("[DISK] Total {} drive(s) detected.\n", count);
    }
}

// ---------------------------------------------------------------------------
// Volume label (FAT only; BPB label field)
// ---------------------------------------------------------------------------

fn read_volume_label(drive: u8, base_lba: u32, kind: FsKind, out: &mut [u8; 12]) {
    out[0] = 0;
    let off = match kind {
        FsKind::Fat16 => 0x2B,
        FsKind::Fat32 => 0x47,
        _ => return,
    };

    let mut dev = DriveDevice::new(drive);
    let mut sec = [0u8; SECTOR_SIZE];
    if dev.read_sector(base_lba, &mut sec).is_err() {
        return;
    }

    let mut label = [0u8; 12];
    label[..11].copy_from_slice(&sec[off..off + 11]);
    let trimmed = orion_lib::string::trim(&label[..11]);
    if trimmed.is_empty() || trimmed == b"NO NAME" {
        return;
    }
    copy_into_padded(out, trimmed);
}

/// `disk ls`: one block per present drive with model, label, backend, and
/// layout.
pub fn cmd_disk_ls() {
    cprintf!("Detected disks:\n");

    let snapshot = {
        let table = TABLE.lock();
        (table.disks, table.count)
    };
    let (disks, count) = snapshot;

    if count == 0 {
        cprintf!("  (no disks found)\n");
        return;
    }

    for info in disks.iter().filter(|d| d.present) {
        let mut model = [0u8; DRIVE_MODEL_MAX];
        let have_model = block_ops().is_some_and(|ops| (ops.model)(info.id, &mut model));
        let model_str = if have_model { bytes_as_str(&model) } else { "Unknown" };

        let mut label = [0u8; 12];
        read_volume_label(info.id, info.base_lba, info.fs_kind, &mut label);

        cprintf!("  {}#: {} on {}", info.id, info.tag(), model_str);
        if label[0] != 0 {
            cprintf!(" ({})", bytes_as_str(&label));
        }
        cprintf!("\n");

        let backend = block_ops().map_or(BackendKind::None, |ops| (ops.backend)(info.id).0);
        let layout = if info.base_lba == 0 { "superfloppy" } else { "partitioned" };
        cprintf!(
            "    {}{} . {} . LBA {}\n",
            backend.name(),
            info.id,
            layout,
            info.base_lba
        );
    }

    cprintf!("[DISK] Total {} drive(s) detected.\n", count);
}

// ---------------------------------------------------------------------------
// Hotplug rescan coalescing
// ---------------------------------------------------------------------------

fn rescan_work(_ctx: *mut c_void) {
    loop {
        detect_disks_quick();

        let repeat = {
            let mut state = RESCAN.lock();
            if state.again {
                state.again = false;
                true
            } else {
                state.pending = false;
                false
            }
        };

        if !repeat {
            break;
        }
    }
}

/// Safe from IRQ context. At most one rescan closure is ever queued.
pub fn disk_request_rescan() {
    let enqueue = {
        let mut state = RESCAN.lock();
        if state.pending {
            state.again = true;
            false
        } else {
            state.pending = true;
            true
        }
    };

    if enqueue && !workqueue_enqueue(rescan_work, core::ptr::null_mut()) {
        RESCAN.lock().pending = false;
    }
}

/// Test hook: observe the coalescing flags.
pub fn rescan_flags() -> (bool, bool) {
    let state = RESCAN.lock();
    (state.pending, state.again)
}
