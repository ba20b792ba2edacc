use core::ffi::c_int;

use alloc::string::String;
use alloc::vec;

use orion_abi::fs::{FsKind, SECTOR_SIZE};
use orion_lib::workqueue::{workqueue_init, workqueue_run};

use crate::blockdev::MemoryBlockDevice;
use crate::disk::{disk_request_rescan, rescan_flags};
use crate::fat::{Fat16Fs, Fat32Fs};
use crate::path::normalize;
use crate::quick::fs_quick_probe;
use crate::xvfs::XvfsFs;

fn fresh_xvfs(sectors: u32) -> Option<(XvfsFs, MemoryBlockDevice)> {
    let mut dev = MemoryBlockDevice::allocate(sectors);
    XvfsFs::format(&mut dev).ok()?;
    let fs = XvfsFs::mount(&mut dev, 0).ok()?;
    Some((fs, dev))
}

fn fresh_fat16(sectors: u32) -> Option<(Fat16Fs, MemoryBlockDevice)> {
    let mut dev = MemoryBlockDevice::allocate(sectors);
    Fat16Fs::format(&mut dev, "TEST16").ok()?;
    let fs = Fat16Fs::mount(&mut dev, 0).ok()?;
    Some((fs, dev))
}

fn fresh_fat32(sectors: u32) -> Option<(Fat32Fs, MemoryBlockDevice)> {
    let mut dev = MemoryBlockDevice::allocate(sectors);
    Fat32Fs::format(&mut dev, "TEST32").ok()?;
    let fs = Fat32Fs::mount(&mut dev, 0).ok()?;
    Some((fs, dev))
}

// ---------------------------------------------------------------------------
// Quick-probe
// ---------------------------------------------------------------------------

pub fn test_probe_unreadable_is_none() -> c_int {
    let mut dev = MemoryBlockDevice::allocate(0);
    let (kind, _) = fs_quick_probe(&mut dev);
    if kind != FsKind::None {
        return -1;
    }
    0
}

pub fn test_probe_unsigned_is_unknown() -> c_int {
    let mut dev = MemoryBlockDevice::allocate(16);
    let (kind, _) = fs_quick_probe(&mut dev);
    if kind != FsKind::Unknown {
        return -1;
    }
    0
}

pub fn test_probe_classifies_xvfs() -> c_int {
    let Some((_, mut dev)) = fresh_xvfs(256) else {
        return -1;
    };
    let (kind, base) = fs_quick_probe(&mut dev);
    if kind != FsKind::Xvfs || base != 0 {
        return -1;
    }
    0
}

pub fn test_probe_classifies_fat16() -> c_int {
    let Some((_, mut dev)) = fresh_fat16(2048) else {
        return -1;
    };
    let (kind, base) = fs_quick_probe(&mut dev);
    if kind != FsKind::Fat16 || base != 0 {
        return -1;
    }
    0
}

pub fn test_probe_is_stable() -> c_int {
    let Some((_, mut dev)) = fresh_fat16(2048) else {
        return -1;
    };
    let first = fs_quick_probe(&mut dev);
    let second = fs_quick_probe(&mut dev);
    if first != second {
        return -1;
    }
    0
}

pub fn test_probe_follows_mbr_partition() -> c_int {
    let base: u32 = 64;
    let mut dev = MemoryBlockDevice::allocate(4096);
    if Fat16Fs::format_at(&mut dev, base, 4096 - base, "PART16").is_err() {
        return -1;
    }

    // Hand-build the MBR: one FAT16 partition at `base`.
    let mbr = dev.sector_mut(0);
    mbr.fill(0);
    let e = 0x1BE;
    mbr[e] = 0x80;
    mbr[e + 4] = 0x06;
    mbr[e + 8..e + 12].copy_from_slice(&base.to_le_bytes());
    mbr[e + 12..e + 16].copy_from_slice(&(4096 - base).to_le_bytes());
    mbr[510] = 0x55;
    mbr[511] = 0xAA;

    let (kind, found_base) = fs_quick_probe(&mut dev);
    if kind != FsKind::Fat16 || found_base != base {
        return -1;
    }
    0
}

// ---------------------------------------------------------------------------
// XVFS
// ---------------------------------------------------------------------------

pub fn test_xvfs_write_read_roundtrip() -> c_int {
    let Some((mut fs, mut dev)) = fresh_xvfs(256) else {
        return -1;
    };

    let payload = b"Hello, world!";
    if fs.write_file(&mut dev, "/tmp_x", payload).is_err() {
        return -1;
    }

    let mut buf = [0u8; 64];
    let got = match fs.read_file_by_name(&mut dev, "/tmp_x", &mut buf) {
        Ok(n) => n,
        Err(_) => return -1,
    };
    if got != payload.len() || &buf[..got] != payload {
        return -1;
    }
    0
}

pub fn test_xvfs_mkdir_rmdir_restores_free_count() -> c_int {
    let Some((mut fs, mut dev)) = fresh_xvfs(256) else {
        return -1;
    };
    let before = fs.free_blocks();

    if fs.mkdir(&mut dev, "/sub").is_err() {
        return -1;
    }
    if fs.free_blocks() != before - 1 {
        return -1;
    }
    if fs.rmdir(&mut dev, "/sub").is_err() {
        return -1;
    }
    if fs.free_blocks() != before {
        return -1;
    }
    0
}

pub fn test_xvfs_exact_fit_boundary() -> c_int {
    let Some((mut fs, mut dev)) = fresh_xvfs(64) else {
        return -1;
    };
    let free = fs.free_blocks();

    // Exactly the free space succeeds.
    let exact = vec![0xA5u8; (free * SECTOR_SIZE as u32) as usize];
    if fs.write_file(&mut dev, "/big", &exact).is_err() {
        return -1;
    }
    if fs.free_blocks() != 0 {
        return -1;
    }
    if fs.rm(&mut dev, "/big").is_err() {
        return -1;
    }
    if fs.free_blocks() != free {
        return -1;
    }

    // One more byte fails without committing anything.
    let over = vec![0x5Au8; (free * SECTOR_SIZE as u32 + 1) as usize];
    if fs.write_file(&mut dev, "/big", &over).is_ok() {
        return -1;
    }
    if fs.free_blocks() != free {
        return -1;
    }
    if fs.exists(&mut dev, "/big") {
        return -1;
    }
    0
}

pub fn test_xvfs_reuses_deleted_slot() -> c_int {
    let Some((mut fs, mut dev)) = fresh_xvfs(256) else {
        return -1;
    };

    if fs.write_file(&mut dev, "/first", b"one").is_err() {
        return -1;
    }
    if fs.write_file(&mut dev, "/second", b"two").is_err() {
        return -1;
    }
    if fs.rm(&mut dev, "/first").is_err() {
        return -1;
    }
    if fs.write_file(&mut dev, "/third", b"three").is_err() {
        return -1;
    }

    // The deleted slot must be reused: the listing shows third before
    // second, in slot order.
    let entries = match fs.list_dir(&mut dev, Some("/")) {
        Ok(e) => e,
        Err(_) => return -1,
    };
    if entries.len() != 2 {
        return -1;
    }
    if entries[0].0 != "third" || entries[1].0 != "second" {
        return -1;
    }
    0
}

pub fn test_xvfs_subdir_listing() -> c_int {
    let Some((mut fs, mut dev)) = fresh_xvfs(256) else {
        return -1;
    };

    if fs.mkdir(&mut dev, "/sub").is_err() {
        return -1;
    }
    if fs.write_file(&mut dev, "/sub/inner", b"payload").is_err() {
        return -1;
    }

    let entries = match fs.list_dir(&mut dev, Some("/sub")) {
        Ok(e) => e,
        Err(_) => return -1,
    };
    if entries.len() != 1 || entries[0].0 != "inner" || entries[0].1 {
        return -1;
    }

    if fs.cd(&mut dev, "/sub").is_err() {
        return -1;
    }
    if fs.get_file_size(&mut dev, "inner") != 7 {
        return -1;
    }
    0
}

// ---------------------------------------------------------------------------
// FAT16
// ---------------------------------------------------------------------------

pub fn test_fat16_write_read_roundtrip() -> c_int {
    let Some((mut fs, mut dev)) = fresh_fat16(2048) else {
        return -1;
    };

    let payload = b"The quick brown fox jumps over the lazy dog";
    if fs.write_file(&mut dev, "/readme.txt", payload).is_err() {
        return -1;
    }
    if fs.get_file_size(&mut dev, "/readme.txt") != payload.len() as u32 {
        return -1;
    }

    let mut buf = [0u8; 128];
    let got = match fs.read_file_by_name(&mut dev, "/readme.txt", &mut buf) {
        Ok(n) => n,
        Err(_) => return -1,
    };
    if got != payload.len() || &buf[..got] != payload {
        return -1;
    }
    0
}

pub fn test_fat16_multi_cluster_file() -> c_int {
    let Some((mut fs, mut dev)) = fresh_fat16(2048) else {
        return -1;
    };

    // Bigger than one cluster so the chain walk is exercised.
    let mut payload = vec![0u8; 3 * SECTOR_SIZE + 17];
    for (i, b) in payload.iter_mut().enumerate() {
        *b = (i % 251) as u8;
    }
    if fs.write_file(&mut dev, "/blob.bin", &payload).is_err() {
        return -1;
    }

    let mut buf = vec![0u8; payload.len()];
    let got = match fs.read_file_by_name(&mut dev, "/blob.bin", &mut buf) {
        Ok(n) => n,
        Err(_) => return -1,
    };
    if got != payload.len() || buf != payload {
        return -1;
    }

    // Offset read picks up mid-file.
    let mut tail = [0u8; 100];
    let got = match fs.read_file_partial(&mut dev, "/blob.bin", 600, &mut tail) {
        Ok(n) => n,
        Err(_) => return -1,
    };
    if got != 100 || tail[0] != payload[600] {
        return -1;
    }
    0
}

pub fn test_fat16_lfn_roundtrip() -> c_int {
    let Some((mut fs, mut dev)) = fresh_fat16(2048) else {
        return -1;
    };

    let name = "/a rather long file name.txt";
    if fs.write_file(&mut dev, name, b"lfn body").is_err() {
        return -1;
    }
    if !fs.exists(&mut dev, name) {
        return -1;
    }

    let entries = match fs.list_dir(&mut dev, Some("/")) {
        Ok(e) => e,
        Err(_) => return -1,
    };
    if !entries
        .iter()
        .any(|(n, is_dir)| n == "a rather long file name.txt" && !is_dir)
    {
        return -1;
    }

    // Lookup is case-insensitive.
    if !fs.exists(&mut dev, "/A Rather LONG File Name.TXT") {
        return -1;
    }
    0
}

pub fn test_fat16_mkdir_and_nested_file() -> c_int {
    let Some((mut fs, mut dev)) = fresh_fat16(2048) else {
        return -1;
    };

    if fs.mkdir(&mut dev, "/sub").is_err() {
        return -1;
    }
    if fs.write_file(&mut dev, "/sub/nested.txt", b"deep").is_err() {
        return -1;
    }

    if fs.cd(&mut dev, "/sub").is_err() {
        return -1;
    }
    if fs.get_file_size(&mut dev, "nested.txt") != 4 {
        return -1;
    }
    if fs.cd(&mut dev, "..").is_err() {
        return -1;
    }

    // rmdir refuses a non-empty directory.
    if fs.rmdir(&mut dev, "/sub").is_ok() {
        return -1;
    }
    if fs.rm(&mut dev, "/sub/nested.txt").is_err() {
        return -1;
    }
    if fs.rmdir(&mut dev, "/sub").is_err() {
        return -1;
    }
    0
}

pub fn test_fat16_free_count_restored_by_rm() -> c_int {
    let Some((mut fs, mut dev)) = fresh_fat16(2048) else {
        return -1;
    };
    let before = match fs.free_clusters(&mut dev) {
        Ok(n) => n,
        Err(_) => return -1,
    };

    let payload = vec![7u8; 2 * SECTOR_SIZE];
    if fs.write_file(&mut dev, "/junk.bin", &payload).is_err() {
        return -1;
    }
    if fs.rm(&mut dev, "/junk.bin").is_err() {
        return -1;
    }

    match fs.free_clusters(&mut dev) {
        Ok(after) if after == before => 0,
        _ => -1,
    }
}

pub fn test_fat16_rename_keeps_contents() -> c_int {
    let Some((mut fs, mut dev)) = fresh_fat16(2048) else {
        return -1;
    };

    if fs.write_file(&mut dev, "/old.txt", b"contents").is_err() {
        return -1;
    }
    if fs.mv(&mut dev, "/old.txt", "/new.txt").is_err() {
        return -1;
    }
    if fs.exists(&mut dev, "/old.txt") {
        return -1;
    }

    let mut buf = [0u8; 32];
    let got = match fs.read_file_by_name(&mut dev, "/new.txt", &mut buf) {
        Ok(n) => n,
        Err(_) => return -1,
    };
    if &buf[..got] != b"contents" {
        return -1;
    }
    0
}

// ---------------------------------------------------------------------------
// FAT32
// ---------------------------------------------------------------------------

pub fn test_fat32_write_read_roundtrip() -> c_int {
    let Some((mut fs, mut dev)) = fresh_fat32(6000) else {
        return -1;
    };

    let payload = b"fat32 payload bytes";
    if fs.write_file(&mut dev, "/data.txt", payload).is_err() {
        return -1;
    }

    let mut buf = [0u8; 64];
    let got = match fs.read_file_by_name(&mut dev, "/data.txt", &mut buf) {
        Ok(n) => n,
        Err(_) => return -1,
    };
    if got != payload.len() || &buf[..got] != payload {
        return -1;
    }
    0
}

pub fn test_fat32_subdirectories() -> c_int {
    let Some((mut fs, mut dev)) = fresh_fat32(6000) else {
        return -1;
    };

    if fs.mkdir(&mut dev, "/cmd").is_err() {
        return -1;
    }
    if fs.write_file(&mut dev, "/cmd/echo.sys", b"\x90\x90").is_err() {
        return -1;
    }

    let entries = match fs.list_dir(&mut dev, Some("/cmd")) {
        Ok(e) => e,
        Err(_) => return -1,
    };
    // Dot entries plus the file.
    if !entries.iter().any(|(n, d)| n == "echo.sys" && !d) {
        return -1;
    }
    0
}

// ---------------------------------------------------------------------------
// Path normalisation (chdir equivalence)
// ---------------------------------------------------------------------------

pub fn test_path_normalize_rules() -> c_int {
    if normalize("/", "home") != "/home" {
        return -1;
    }
    if normalize("/home", "..") != "/" {
        return -1;
    }
    if normalize("/home/user", "../other") != "/home/other" {
        return -1;
    }
    if normalize("/a/b", "/c") != "/c" {
        return -1;
    }
    if normalize("/", "a//b///c") != "/a/b/c" {
        return -1;
    }
    if normalize("/", "./x/./y") != "/x/y" {
        return -1;
    }
    if normalize("/", "../..") != "/" {
        return -1;
    }
    0
}

pub fn test_chdir_relative_equivalence() -> c_int {
    // chdir(a); chdir(b_rel) == chdir(normalize(a, b_rel))
    let a = "/home/user";
    let b = "../sys/./cfg";
    let via_two = normalize(a, b);
    let direct = normalize("/", "home/user/../sys/cfg");
    if via_two != direct {
        return -1;
    }
    0
}

// ---------------------------------------------------------------------------
// Rescan coalescing flags
// ---------------------------------------------------------------------------

pub fn test_rescan_requests_coalesce() -> c_int {
    workqueue_init();

    disk_request_rescan();
    let (pending, again) = rescan_flags();
    if !pending || again {
        return -1;
    }

    // Second request while pending only sets the "again" flag.
    disk_request_rescan();
    let (pending, again) = rescan_flags();
    if !pending || !again {
        return -1;
    }

    // Drain: the closure loops once more for the "again" pass, then clears.
    workqueue_run();
    let (pending, again) = rescan_flags();
    if pending || again {
        return -1;
    }
    0
}

// ---------------------------------------------------------------------------
// Cross-driver uniform listing
// ---------------------------------------------------------------------------

pub fn test_uniform_listing_shape() -> c_int {
    let Some((mut xfs, mut xdev)) = fresh_xvfs(256) else {
        return -1;
    };
    let Some((mut ffs, mut fdev)) = fresh_fat16(2048) else {
        return -1;
    };

    if xfs.mkdir(&mut xdev, "/d").is_err() || xfs.write_file(&mut xdev, "/f", b"x").is_err() {
        return -1;
    }
    if ffs.mkdir(&mut fdev, "/d").is_err() || ffs.write_file(&mut fdev, "/f", b"x").is_err() {
        return -1;
    }

    let xe = xfs.list_dir(&mut xdev, Some("/")).unwrap_or_default();
    let fe: alloc::vec::Vec<(String, bool)> = ffs
        .list_dir(&mut fdev, Some("/"))
        .unwrap_or_default()
        .into_iter()
        .filter(|(n, _)| n != "." && n != "..")
        .collect();

    // Both drivers produce the same (name, is_dir) view.
    let mut xs = xe;
    let mut fs_ = fe;
    xs.sort_by(|a, b| a.0.cmp(&b.0));
    fs_.sort_by(|a, b| a.0.cmp(&b.0));
    if xs != fs_ {
        return -1;
    }
    0
}

orion_lib::define_test_suite!(
    filesystem,
    [
        test_probe_unreadable_is_none,
        test_probe_unsigned_is_unknown,
        test_probe_classifies_xvfs,
        test_probe_classifies_fat16,
        test_probe_is_stable,
        test_probe_follows_mbr_partition,
        test_xvfs_write_read_roundtrip,
        test_xvfs_mkdir_rmdir_restores_free_count,
        test_xvfs_exact_fit_boundary,
        test_xvfs_reuses_deleted_slot,
        test_xvfs_subdir_listing,
        test_fat16_write_read_roundtrip,
        test_fat16_multi_cluster_file,
        test_fat16_lfn_roundtrip,
        test_fat16_mkdir_and_nested_file,
        test_fat16_free_count_restored_by_rm,
        test_fat16_rename_keeps_contents,
        test_fat32_write_read_roundtrip,
        test_fat32_subdirectories,
        test_path_normalize_rules,
        test_chdir_relative_equivalence,
        test_rescan_requests_coalesce,
        test_uniform_listing_shape,
    ]
);
