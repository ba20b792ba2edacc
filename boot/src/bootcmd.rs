//! Boot command line: `rd=<n>#`, `ramdisk=<path>`, `enable_font`, and the
//! root-mount policy built on them.
//!
//! The mount order is exactly the original's: a valid `rd=` mounts that
//! drive, an unusable or missing one falls back to a blank ramdisk on the
//! top drive id with the auto-mount warning latched for `SH_MOTD`.

use alloc::vec;
use core::sync::atomic::{AtomicBool, Ordering};

use orion_abi::fs::MAX_DISKS;
use orion_lib::string::{find, parse_u32};
use orion_lib::{cprintf, klog_info};

use orion_fs::{disk, fscmd};

use crate::multiboot;

const FALLBACK_RAMDISK_SECTORS: u32 = 4096;

static ENABLE_FONT: AtomicBool = AtomicBool::new(false);

pub fn font_forced() -> bool {
    ENABLE_FONT.load(Ordering::Relaxed)
}

/// `rd=<n>#`: requested root drive, validated against the drive table.
fn parse_rd(cmdline: &[u8]) -> Option<u8> {
    let at = find(cmdline, b"rd=")?;
    let rest = &cmdline[at + 3..];
    if rest.len() < 2 || !rest[0].is_ascii_digit() || rest[1] != b'#' {
        cprintf!("[bootcmd] invalid rd= syntax (expected n#)\n");
        return None;
    }
    let drive = rest[0] - b'0';
    if (drive as usize) < MAX_DISKS {
        Some(drive)
    } else {
        None
    }
}

/// `ramdisk=<path>`: image file to load from the mounted filesystem.
fn parse_ramdisk_path(cmdline: &[u8], out: &mut [u8; 256]) -> bool {
    let Some(at) = find(cmdline, b"ramdisk=") else {
        return false;
    };
    let rest = &cmdline[at + 8..];
    let end = rest
        .iter()
        .position(|&b| b == b' ')
        .unwrap_or(rest.len());
    let path = &rest[..end];
    let path = path.strip_prefix(b"\"").unwrap_or(path);
    let path = path.strip_suffix(b"\"").unwrap_or(path);
    if path.is_empty() {
        return false;
    }
    orion_lib::string::copy_into_padded(out, path);
    true
}

fn mount_ramdisk_fallback() {
    fscmd::RAMDISK_AUTO_MOUNT.store(true, Ordering::Relaxed);

    // Format a blank image so the fallback is usable immediately.
    if orion_drivers::ramdisk::create_blank(FALLBACK_RAMDISK_SECTORS).is_some() {
        orion_drivers::block::refresh_drive_map();

        let drive = (MAX_DISKS - 1) as u8;
        let mut dev = orion_fs::blockdev::DriveDevice::new(drive);
        if orion_fs::xvfs::XvfsFs::format(&mut dev).is_ok() {
            disk::detect_disks_quick();
            if fscmd::mount_drive(drive) {
                let _ = fscmd::mkdir("/home");
                let _ = fscmd::mkdir("/system");
                let _ = fscmd::mkdir("/system/config");
                return;
            }
        }
    }
    cprintf!("[kernel] ramdisk fallback failed; no filesystem mounted\n");
}

fn load_ramdisk_image(path: &str) {
    let size = fscmd::get_file_size(path);
    if size == 0 {
        cprintf!("[bootcmd] ramdisk image missing: {}\n", path);
        return;
    }
    let mut image = vec![0u8; size as usize];
    if fscmd::read_file_by_name(path, &mut image) <= 0 {
        cprintf!("[bootcmd] ramdisk image unreadable: {}\n", path);
        return;
    }
    if orion_drivers::ramdisk::load_image(&image).is_some() {
        orion_drivers::block::refresh_drive_map();
        disk::detect_disks_quick();
        cprintf!("[bootcmd] ramdisk image: {}\n", path);
    }
}

fn try_load_default_font(force: bool) {
    let path = "/system/font/orion.fnt";
    if !fscmd::is_mounted() {
        return;
    }
    if !force && !fscmd::exists(path) {
        return;
    }
    cprintf!("[kernel] loading font from file...\n");
    let size = fscmd::get_file_size(path);
    if size == 0 {
        cprintf!("font: cannot open {}\n", path);
        return;
    }
    let mut image = vec![0u8; size as usize];
    if fscmd::read_file_by_name(path, &mut image) > 0
        && orion_video::font::load_from_bytes(&image)
    {
        klog_info!("FONT: {} installed ({} bytes)", path, size);
    } else {
        cprintf!("font: {} is not a usable font file\n", path);
    }
}

/// Adopt a bootloader ramdisk module before any mount decisions.
pub fn adopt_boot_module() {
    let facts = multiboot::boot_facts();
    if let Some((start, end)) = facts.ramdisk_module {
        if end > start {
            // SAFETY: the module region was reserved by the bootloader and
            // is identity-mapped with the rest of RAM.
            unsafe {
                orion_drivers::ramdisk::adopt_region(start, end - start);
            }
            orion_drivers::block::refresh_drive_map();
        }
    }
}

/// Apply the command line: pick and mount the root disk (or fall back to a
/// ramdisk), load a secondary ramdisk image, then the console font.
pub fn parse_bootcmd() {
    let facts = multiboot::boot_facts();
    let cmdline = facts.cmdline_str();
    if cmdline.is_empty() {
        cprintf!("no cmdline found.\n");
    } else {
        cprintf!("cmdline parsed: {}\n", cmdline);
    }
    let bytes = cmdline.as_bytes();

    if find(bytes, b"enable_font").is_some() {
        ENABLE_FONT.store(true, Ordering::Relaxed);
    }

    let rootdisk = parse_rd(bytes).filter(|&d| {
        if disk::disk_exists(d) {
            cprintf!("[bootcmd] top drive set to {}# (valid)\n", d);
            true
        } else {
            cprintf!("[bootcmd] drive {}# does not exist, ignoring\n", d);
            false
        }
    });

    match rootdisk {
        Some(drive) => {
            cprintf!("[kernel] auto-mounting disk {}#...\n", drive);
            if !fscmd::mount_drive(drive) {
                cprintf!(
                    "[kernel] Since the disk type is unknown, it is mounted as a ramdisk.\n"
                );
                mount_ramdisk_fallback();
            }
        }
        None => {
            cprintf!("[kernel] no top drive specified\n");
            cprintf!("[kernel] Automatic disk mount failed, so mounting as ramdisk.\n");
            mount_ramdisk_fallback();
        }
    }

    let mut path = [0u8; 256];
    if parse_ramdisk_path(bytes, &mut path) {
        load_ramdisk_image(orion_lib::string::bytes_as_str(&path));
    }

    try_load_default_font(font_forced());
}

/// Consume a number argument as either `N` or `N#` (both forms accepted).
pub fn parse_drive_arg(arg: &str) -> Option<u8> {
    let digits = arg.trim().strip_suffix('#').unwrap_or(arg.trim());
    let n = parse_u32(digits.as_bytes())?;
    if (n as usize) < MAX_DISKS {
        Some(n as u8)
    } else {
        None
    }
}
