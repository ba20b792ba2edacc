//! One-mount-at-a-time filesystem façade.
//!
//! Exactly one filesystem is mounted at any moment, recorded as
//! `(current fs, current drive, current path)`. Every filesystem syscall is
//! a thin forward through [`AnyFs`]; `cd` normalises against the current
//! path before the driver sees it. Mount state only mutates from syscall
//! context — the guard is for the IRQ-driven rescan path reading it.

use alloc::string::String;
use alloc::vec::Vec;
use core::sync::atomic::AtomicBool;

use orion_abi::fs::{FsKind, MAX_DISKS, SECTOR_SIZE};
use orion_lib::string::parse_u32;
use orion_lib::{IrqMutex, cprintf};

use crate::blockdev::DriveDevice;
use crate::disk;
use crate::fat::{Fat16Fs, Fat32Fs};
use crate::fsdriver::AnyFs;
use crate::path;
use crate::progress;
use crate::xvfs::XvfsFs;

struct Mount {
    fs: Option<AnyFs>,
    drive: i32,
    path: String,
}

static MOUNT: IrqMutex<Mount> = IrqMutex::new(Mount {
    fs: None,
    drive: -1,
    path: String::new(),
});

/// Set when the boot path fell back to a ramdisk because the requested root
/// disk was unusable. `SH_MOTD` warns about it.
pub static RAMDISK_AUTO_MOUNT: AtomicBool = AtomicBool::new(false);

pub fn fs_to_string(kind: FsKind) -> &'static str {
    match kind {
        FsKind::None => "NONE",
        FsKind::Fat16 => "FAT16",
        FsKind::Fat32 => "FAT32",
        FsKind::Xvfs => "XVFS",
        _ => "UNKNOWN",
    }
}

pub fn current_fs_kind() -> FsKind {
    MOUNT.lock().fs.as_ref().map_or(FsKind::None, |fs| fs.kind())
}

pub fn current_drive() -> i32 {
    MOUNT.lock().drive
}

pub fn current_path() -> String {
    let mount = MOUNT.lock();
    if mount.path.is_empty() {
        String::from("/")
    } else {
        mount.path.clone()
    }
}

pub fn is_mounted() -> bool {
    MOUNT.lock().fs.is_some()
}

fn no_fs() -> bool {
    if is_mounted() {
        false
    } else {
        cprintf!("No filesystem mounted.\n");
        true
    }
}

/// Run `f` with the mounted driver and its drive device.
fn with_fs<R>(f: impl FnOnce(&mut AnyFs, &mut DriveDevice) -> R) -> Option<R> {
    let mut mount = MOUNT.lock();
    let drive = mount.drive;
    let fs = mount.fs.as_mut()?;
    let mut dev = DriveDevice::new(drive as u8);
    Some(f(fs, &mut dev))
}

// ---------------------------------------------------------------------------
// Mounting
// ---------------------------------------------------------------------------

/// Mount `drive` according to its probed classification, replacing any
/// previous mount. Resets the current path to `/`.
pub fn mount_drive(drive: u8) -> bool {
    let Some(info) = disk::disk_info(drive) else {
        cprintf!("[disk] drive {} not present\n", drive);
        return false;
    };

    let mut dev = DriveDevice::new(drive);
    let Some(fs) = AnyFs::mount(&mut dev, info.fs_kind, info.base_lba) else {
        cprintf!(
            "[disk] drive {} ({}) is not mountable\n",
            drive,
            info.tag()
        );
        return false;
    };

    let kind = fs.kind();
    let mut mount = MOUNT.lock();
    mount.fs = Some(fs);
    mount.drive = drive as i32;
    mount.path = String::from("/");
    drop(mount);

    cprintf!("[disk] mounted drive {} as {}\n", drive, fs_to_string(kind));
    true
}

pub fn unmount() {
    let mut mount = MOUNT.lock();
    mount.fs = None;
    mount.drive = -1;
    mount.path = String::new();
}

pub fn reset_path() {
    let mut mount = MOUNT.lock();
    if let Some(fs) = mount.fs.as_mut() {
        fs.reset_dir();
    }
    mount.path = String::from("/");
    let kind = mount.fs.as_ref().map_or(FsKind::None, |f| f.kind());
    drop(mount);
    cprintf!("[RESET_PATH] current_path=/ (fs={})\n", fs_to_string(kind));
}

/// `disk` subcommand: `ls` lists drives, `N` or `N#` mounts drive N.
/// Both numeric forms are accepted.
pub fn disk_command(args: &str) -> bool {
    let args = args.trim();
    if args.is_empty() || args == "ls" {
        disk::cmd_disk_ls();
        return true;
    }

    let digits = args.strip_suffix('#').unwrap_or(args);
    match parse_u32(digits.as_bytes()) {
        Some(n) if (n as usize) < MAX_DISKS => mount_drive(n as u8),
        _ => {
            cprintf!("Usage: disk <ls | drive#>\n");
            false
        }
    }
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn ls(dir_path: Option<&str>) {
    if no_fs() {
        return;
    }
    with_fs(|fs, dev| fs.ls(dev, dir_path));
}

pub fn list_dir(dir_path: Option<&str>) -> Option<Vec<(String, bool)>> {
    with_fs(|fs, dev| fs.list_dir(dev, dir_path)).flatten()
}

pub fn cat(file_path: &str) {
    if no_fs() {
        return;
    }
    let size = get_file_size(file_path);
    if size == 0 && !exists(file_path) {
        cprintf!("cat: no such file: {}\n", file_path);
        return;
    }

    let mut offset = 0u32;
    let mut chunk = [0u8; SECTOR_SIZE];
    while offset < size {
        let want = (size - offset).min(SECTOR_SIZE as u32) as usize;
        let got = with_fs(|fs, dev| fs.read_file_partial(dev, file_path, offset, &mut chunk[..want]))
            .unwrap_or(-1);
        if got <= 0 {
            break;
        }
        for &b in &chunk[..got as usize] {
            if b == b'\n' || (0x20..0x7F).contains(&b) || b == b'\t' {
                let s = [b];
                orion_lib::console::kprint_bytes(&s);
            }
        }
        offset += got as u32;
    }
    orion_lib::console::kprint("\n");
}

pub fn exists(file_path: &str) -> bool {
    with_fs(|fs, dev| fs.exists(dev, file_path)).unwrap_or(false)
}

pub fn is_dir(file_path: &str) -> bool {
    with_fs(|fs, dev| fs.is_dir(dev, file_path)).unwrap_or(false)
}

pub fn get_file_size(file_path: &str) -> u32 {
    with_fs(|fs, dev| fs.get_file_size(dev, file_path)).unwrap_or(0)
}

/// Read the whole file from byte 0; returns bytes read or -1.
pub fn read_file_by_name(file_path: &str, buf: &mut [u8]) -> i32 {
    if !is_mounted() {
        cprintf!("No filesystem mounted.\n");
        return -1;
    }
    with_fs(|fs, dev| fs.read_file_by_name(dev, file_path, buf)).unwrap_or(-1)
}

/// Sized read at `offset`; returns bytes read or -1.
pub fn read_file(file_path: &str, buf: &mut [u8], offset: u32) -> i32 {
    with_fs(|fs, dev| fs.read_file_partial(dev, file_path, offset, buf)).unwrap_or(-1)
}

/// Whole-file write (truncate + rewrite). Writes of a block or more get the
/// progress counter.
pub fn write_file(file_path: &str, data: &[u8]) -> bool {
    if no_fs() {
        return false;
    }

    let show_progress = data.len() >= SECTOR_SIZE;
    if show_progress {
        let label = path::file_name(file_path).unwrap_or("write");
        progress::write_progress_begin(label, data.len() as u32);
    }
    let ok = with_fs(|fs, dev| fs.write_file(dev, file_path, data)).unwrap_or(false);
    if show_progress {
        progress::write_progress_finish(ok);
    }
    ok
}

pub fn rm(file_path: &str) -> bool {
    if no_fs() {
        return false;
    }
    with_fs(|fs, dev| fs.rm(dev, file_path)).unwrap_or(false)
}

pub fn mkdir(dir_path: &str) -> bool {
    if no_fs() {
        return false;
    }
    with_fs(|fs, dev| fs.mkdir(dev, dir_path)).unwrap_or(false)
}

pub fn rmdir(dir_path: &str) -> bool {
    if no_fs() {
        return false;
    }
    with_fs(|fs, dev| fs.rmdir(dev, dir_path)).unwrap_or(false)
}

pub fn cp(src: &str, dst: &str) -> bool {
    if no_fs() {
        return false;
    }
    with_fs(|fs, dev| fs.cp(dev, src, dst)).unwrap_or(false)
}

pub fn mv(src: &str, dst: &str) -> bool {
    if no_fs() {
        return false;
    }
    with_fs(|fs, dev| fs.mv(dev, src, dst)).unwrap_or(false)
}

/// Change directory. The input is normalised against the current path
/// (`.`, `..`, absolute/relative, repeated separators) before the driver
/// resolves it, so the shell-visible path and the driver state stay in
/// lockstep.
pub fn cd(dir_path: &str) -> bool {
    if no_fs() {
        return false;
    }

    let normalized = path::normalize(&current_path(), dir_path);
    let ok = with_fs(|fs, dev| fs.cd(dev, &normalized)).unwrap_or(false);
    if ok {
        MOUNT.lock().path = normalized;
    }
    ok
}

pub fn total_units() -> u32 {
    with_fs(|fs, _dev| fs.total_units()).unwrap_or(0)
}

pub fn free_units() -> u32 {
    with_fs(|fs, dev| fs.free_units(dev)).unwrap_or(0)
}

// ---------------------------------------------------------------------------
// Format
// ---------------------------------------------------------------------------

/// `format <drive># <fs>`: lay down a fresh volume, honouring a partitioned
/// layout (and updating the MBR type byte) when the drive has a base LBA.
pub fn format(drive: u8, fs_name: &str) -> bool {
    use orion_abi::fs::{MBR_TYPE_FAT16_B, MBR_TYPE_FAT32_LBA, MBR_TYPE_XVFS};

    let mut dev = DriveDevice::new(drive);
    let total = crate::blockdev::BlockDevice::sector_count(&dev);
    if total == 0 {
        cprintf!("[format] drive {} not detected.\n", drive);
        return false;
    }

    let base_lba = disk::disk_info(drive).map_or(0, |i| i.base_lba);
    let mut part_sectors = 0u32;
    let mut part_index: Option<usize> = None;

    if base_lba > 0 {
        let mut mbr = [0u8; SECTOR_SIZE];
        if crate::blockdev::BlockDevice::read_sector(&mut dev, 0, &mut mbr).is_ok()
            && crate::quick::has_boot_signature(&mbr)
        {
            let table = crate::quick::parse_mbr_table(&mbr);
            for (i, p) in table.iter().enumerate() {
                if p.part_type != 0 && p.lba_first == base_lba {
                    part_index = Some(i);
                    part_sectors = p.sectors;
                    break;
                }
            }
        }
        if part_sectors == 0 && total > base_lba {
            part_sectors = total - base_lba;
        }
    }

    let mut name = [0u8; 8];
    let len = fs_name.len().min(8);
    name[..len].copy_from_slice(&fs_name.as_bytes()[..len]);
    name[..len].make_ascii_lowercase();
    let fs_lower = core::str::from_utf8(&name[..len]).unwrap_or("");

    let (target_sectors, target_base) = if base_lba > 0 && part_sectors > 0 {
        (part_sectors, base_lba)
    } else {
        (total, 0)
    };

    let (ok, mbr_type) = match fs_lower {
        "fat16" => {
            cprintf!("[format] Formatting drive {} as FAT16...\n", drive);
            (
                Fat16Fs::format_at(&mut dev, target_base, target_sectors, "ORION16").is_ok(),
                MBR_TYPE_FAT16_B,
            )
        }
        "fat32" => {
            cprintf!("[format] Formatting drive {} as FAT32...\n", drive);
            (
                Fat32Fs::format_at(&mut dev, target_base, target_sectors, "ORION32").is_ok(),
                MBR_TYPE_FAT32_LBA,
            )
        }
        "xvfs" => {
            cprintf!("[format] Formatting drive {} as XVFS...\n", drive);
            (
                XvfsFs::format_at(&mut dev, target_base, target_sectors).is_ok(),
                MBR_TYPE_XVFS,
            )
        }
        other => {
            cprintf!("[format] Unsupported filesystem: {}\n", other);
            cprintf!("Supported types: fat16, fat32, xvfs\n");
            return false;
        }
    };

    if !ok {
        cprintf!("[format] Failed to format drive {} ({})\n", drive, fs_name);
        return false;
    }

    if let Some(idx) = part_index {
        let mut mbr = [0u8; SECTOR_SIZE];
        if crate::blockdev::BlockDevice::read_sector(&mut dev, 0, &mut mbr).is_ok()
            && crate::quick::has_boot_signature(&mbr)
        {
            mbr[crate::quick::MBR_TABLE_OFFSET + idx * crate::quick::MBR_ENTRY_SIZE + 4] = mbr_type;
            let _ = crate::blockdev::BlockDevice::write_sector(&mut dev, 0, &mbr);
        }
    }

    cprintf!("[format] Drive {} formatted successfully\n", drive);
    cprintf!("[format] Format completed. Please reboot the system.\n");
    true
}
