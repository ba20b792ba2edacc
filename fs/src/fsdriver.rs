//! Uniform driver dispatch.
//!
//! [`AnyFs`] wraps one mounted filesystem driver behind a single method
//! surface so the mount façade and the cross-disk copy helpers never match
//! on the filesystem kind themselves. Because a driver is just a value over
//! a [`BlockDevice`], a second instance can be stood up temporarily for the
//! far side of a disk-to-disk copy without disturbing the active mount.

use alloc::string::String;
use alloc::vec::Vec;

use orion_abi::fs::FsKind;
use orion_lib::cprintf;

use crate::blockdev::{BlockDevice, DriveDevice};
use crate::disk;
use crate::fat::{Fat16Fs, Fat32Fs};
use crate::xvfs::XvfsFs;

pub enum AnyFs {
    Fat16(Fat16Fs),
    Fat32(Fat32Fs),
    Xvfs(XvfsFs),
}

impl AnyFs {
    /// Mount the driver matching the drive table's classification.
    pub fn mount(dev: &mut dyn BlockDevice, kind: FsKind, base_lba: u32) -> Option<Self> {
        match kind {
            FsKind::Fat16 => Fat16Fs::mount(dev, base_lba).ok().map(AnyFs::Fat16),
            FsKind::Fat32 => Fat32Fs::mount(dev, base_lba).ok().map(AnyFs::Fat32),
            FsKind::Xvfs => XvfsFs::mount(dev, base_lba).ok().map(AnyFs::Xvfs),
            _ => None,
        }
    }

    pub fn kind(&self) -> FsKind {
        match self {
            AnyFs::Fat16(_) => FsKind::Fat16,
            AnyFs::Fat32(_) => FsKind::Fat32,
            AnyFs::Xvfs(_) => FsKind::Xvfs,
        }
    }

    pub fn ls(&self, dev: &mut dyn BlockDevice, path: Option<&str>) {
        match self {
            AnyFs::Fat16(fs) => fs.ls(dev, path),
            AnyFs::Fat32(fs) => fs.ls(dev, path),
            AnyFs::Xvfs(fs) => fs.ls(dev, path),
        }
    }

    /// The uniform `(name, is_dir)` listing shared by `fl`, `DIR_LIST`, and
    /// the explorer.
    pub fn list_dir(
        &self,
        dev: &mut dyn BlockDevice,
        path: Option<&str>,
    ) -> Option<Vec<(String, bool)>> {
        match self {
            AnyFs::Fat16(fs) => fs.list_dir(dev, path).ok(),
            AnyFs::Fat32(fs) => fs.list_dir(dev, path).ok(),
            AnyFs::Xvfs(fs) => fs.list_dir(dev, path).ok(),
        }
    }

    pub fn exists(&self, dev: &mut dyn BlockDevice, path: &str) -> bool {
        match self {
            AnyFs::Fat16(fs) => fs.exists(dev, path),
            AnyFs::Fat32(fs) => fs.exists(dev, path),
            AnyFs::Xvfs(fs) => fs.exists(dev, path),
        }
    }

    pub fn is_dir(&self, dev: &mut dyn BlockDevice, path: &str) -> bool {
        match self {
            AnyFs::Fat16(fs) => fs.is_dir(dev, path),
            AnyFs::Fat32(fs) => fs.is_dir(dev, path),
            AnyFs::Xvfs(fs) => fs.is_dir(dev, path),
        }
    }

    pub fn get_file_size(&self, dev: &mut dyn BlockDevice, path: &str) -> u32 {
        match self {
            AnyFs::Fat16(fs) => fs.get_file_size(dev, path),
            AnyFs::Fat32(fs) => fs.get_file_size(dev, path),
            AnyFs::Xvfs(fs) => fs.get_file_size(dev, path),
        }
    }

    /// Read from byte 0 into `buf`; returns bytes read or -1.
    pub fn read_file_by_name(&self, dev: &mut dyn BlockDevice, path: &str, buf: &mut [u8]) -> i32 {
        let got = match self {
            AnyFs::Fat16(fs) => fs.read_file_by_name(dev, path, buf).map_err(|_| ()),
            AnyFs::Fat32(fs) => fs.read_file_by_name(dev, path, buf).map_err(|_| ()),
            AnyFs::Xvfs(fs) => fs.read_file_by_name(dev, path, buf).map_err(|_| ()),
        };
        match got {
            Ok(n) => n as i32,
            Err(_) => -1,
        }
    }

    pub fn read_file_partial(
        &self,
        dev: &mut dyn BlockDevice,
        path: &str,
        offset: u32,
        buf: &mut [u8],
    ) -> i32 {
        let got = match self {
            AnyFs::Fat16(fs) => fs.read_file_partial(dev, path, offset, buf).map_err(|_| ()),
            AnyFs::Fat32(fs) => fs.read_file_partial(dev, path, offset, buf).map_err(|_| ()),
            AnyFs::Xvfs(fs) => fs.read_file_partial(dev, path, offset, buf).map_err(|_| ()),
        };
        match got {
            Ok(n) => n as i32,
            Err(_) => -1,
        }
    }

    pub fn write_file(&mut self, dev: &mut dyn BlockDevice, path: &str, data: &[u8]) -> bool {
        match self {
            AnyFs::Fat16(fs) => fs.write_file(dev, path, data).is_ok(),
            AnyFs::Fat32(fs) => fs.write_file(dev, path, data).is_ok(),
            AnyFs::Xvfs(fs) => fs.write_file(dev, path, data).is_ok(),
        }
    }

    pub fn rm(&mut self, dev: &mut dyn BlockDevice, path: &str) -> bool {
        match self {
            AnyFs::Fat16(fs) => fs.rm(dev, path).is_ok(),
            AnyFs::Fat32(fs) => fs.rm(dev, path).is_ok(),
            AnyFs::Xvfs(fs) => fs.rm(dev, path).is_ok(),
        }
    }

    pub fn mkdir(&mut self, dev: &mut dyn BlockDevice, path: &str) -> bool {
        match self {
            AnyFs::Fat16(fs) => fs.mkdir(dev, path).is_ok(),
            AnyFs::Fat32(fs) => fs.mkdir(dev, path).is_ok(),
            AnyFs::Xvfs(fs) => fs.mkdir(dev, path).is_ok(),
        }
    }

    pub fn rmdir(&mut self, dev: &mut dyn BlockDevice, path: &str) -> bool {
        match self {
            AnyFs::Fat16(fs) => fs.rmdir(dev, path).is_ok(),
            AnyFs::Fat32(fs) => fs.rmdir(dev, path).is_ok(),
            AnyFs::Xvfs(fs) => fs.rmdir(dev, path).is_ok(),
        }
    }

    pub fn cd(&mut self, dev: &mut dyn BlockDevice, path: &str) -> bool {
        match self {
            AnyFs::Fat16(fs) => fs.cd(dev, path).is_ok(),
            AnyFs::Fat32(fs) => fs.cd(dev, path).is_ok(),
            AnyFs::Xvfs(fs) => fs.cd(dev, path).is_ok(),
        }
    }

    pub fn reset_dir(&mut self) {
        match self {
            AnyFs::Fat16(fs) => fs.reset_dir(),
            AnyFs::Fat32(fs) => fs.reset_dir(),
            AnyFs::Xvfs(fs) => fs.reset_dir(),
        }
    }

    pub fn cp(&mut self, dev: &mut dyn BlockDevice, src: &str, dst: &str) -> bool {
        match self {
            AnyFs::Fat16(fs) => fs.cp(dev, src, dst).is_ok(),
            AnyFs::Fat32(fs) => fs.cp(dev, src, dst).is_ok(),
            AnyFs::Xvfs(fs) => fs.cp(dev, src, dst).is_ok(),
        }
    }

    pub fn mv(&mut self, dev: &mut dyn BlockDevice, src: &str, dst: &str) -> bool {
        match self {
            AnyFs::Fat16(fs) => fs.mv(dev, src, dst).is_ok(),
            AnyFs::Fat32(fs) => fs.mv(dev, src, dst).is_ok(),
            AnyFs::Xvfs(fs) => fs.mv(dev, src, dst).is_ok(),
        }
    }

    /// Allocation units total/free (clusters for FAT, blocks for XVFS).
    pub fn total_units(&self) -> u32 {
        match self {
            AnyFs::Fat16(fs) => fs.total_clusters(),
            AnyFs::Fat32(fs) => fs.total_clusters(),
            AnyFs::Xvfs(fs) => fs.total_blocks(),
        }
    }

    pub fn free_units(&self, dev: &mut dyn BlockDevice) -> u32 {
        match self {
            AnyFs::Fat16(fs) => fs.free_clusters(dev).unwrap_or(0),
            AnyFs::Fat32(fs) => fs.free_clusters(dev).unwrap_or(0),
            AnyFs::Xvfs(fs) => fs.free_blocks(),
        }
    }
}

// ---------------------------------------------------------------------------
// Cross-disk copy / move
// ---------------------------------------------------------------------------

fn open_drive(drive: u8) -> Option<(AnyFs, DriveDevice)> {
    let info = disk::disk_info(drive)?;
    let mut dev = DriveDevice::new(drive);
    let fs = AnyFs::mount(&mut dev, info.fs_kind, info.base_lba)?;
    Some((fs, dev))
}

/// Copy a file between two drives, whatever either side's filesystem is.
pub fn copy_between(src_drive: u8, src_path: &str, dst_drive: u8, dst_path: &str) -> bool {
    let Some((src_fs, mut src_dev)) = open_drive(src_drive) else {
        cprintf!("copy: source drive {} not mountable\n", src_drive);
        return false;
    };
    let Some((mut dst_fs, mut dst_dev)) = open_drive(dst_drive) else {
        cprintf!("copy: target drive {} not mountable\n", dst_drive);
        return false;
    };

    let size = src_fs.get_file_size(&mut src_dev, src_path);
    if size == 0 && !src_fs.exists(&mut src_dev, src_path) {
        cprintf!("copy: no such file: {}\n", src_path);
        return false;
    }

    let mut buf = alloc::vec![0u8; size as usize];
    let got = src_fs.read_file_by_name(&mut src_dev, src_path, &mut buf);
    if got < 0 {
        cprintf!("copy: read failed: {}\n", src_path);
        return false;
    }
    buf.truncate(got as usize);
    dst_fs.write_file(&mut dst_dev, dst_path, &buf)
}

/// Cross-disk move: copy, then remove the source on success.
pub fn move_between(src_drive: u8, src_path: &str, dst_drive: u8, dst_path: &str) -> bool {
    if !copy_between(src_drive, src_path, dst_drive, dst_path) {
        return false;
    }
    match open_drive(src_drive) {
        Some((mut fs, mut dev)) => fs.rm(&mut dev, src_path),
        None => false,
    }
}
