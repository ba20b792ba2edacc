//! Sector-addressed block devices.
//!
//! Filesystem drivers are written against [`BlockDevice`] so the same code
//! runs on live drives and on [`MemoryBlockDevice`] images in the test
//! suites. Live drives resolve through the block-ops registry the driver
//! layer fills in at init — the filesystem crate never links the drivers.

use alloc::vec;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicPtr, Ordering};

use orion_abi::fs::{BackendKind, SECTOR_SIZE};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockDeviceError {
    /// LBA or span beyond the device's sector count.
    OutOfRange,
    /// Backend reported a transfer failure.
    Io,
}

pub trait BlockDevice {
    fn read_sector(&mut self, lba: u32, buf: &mut [u8; SECTOR_SIZE]) -> Result<(), BlockDeviceError>;
    fn write_sector(&mut self, lba: u32, buf: &[u8; SECTOR_SIZE]) -> Result<(), BlockDeviceError>;
    fn sector_count(&self) -> u32;

    fn flush(&mut self) -> Result<(), BlockDeviceError> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Block-ops registry (drive id space)
// ---------------------------------------------------------------------------

/// The uniform five-operation contract over the drive id space, plus the
/// identification hooks the disk table needs. Registered once by the driver
/// layer; `count == 0` on read/write means 256 sectors (16-bit legacy).
pub struct BlockOps {
    pub present: fn(u8) -> bool,
    pub read: fn(u8, u32, u32, &mut [u8]) -> bool,
    pub write: fn(u8, u32, u32, &[u8]) -> bool,
    pub sector_count: fn(u8) -> u32,
    pub flush: fn(u8) -> bool,
    pub refresh_drive_map: fn(),
    pub model: fn(u8, &mut [u8]) -> bool,
    pub backend: fn(u8) -> (BackendKind, u8),
}

static BLOCK_OPS: AtomicPtr<BlockOps> = AtomicPtr::new(core::ptr::null_mut());

pub fn register_block_ops(ops: &'static BlockOps) {
    BLOCK_OPS.store(ops as *const BlockOps as *mut BlockOps, Ordering::Release);
}

pub fn block_ops() -> Option<&'static BlockOps> {
    // SAFETY: only `register_block_ops` stores here, always a &'static.
    unsafe { BLOCK_OPS.load(Ordering::Acquire).as_ref() }
}

/// One drive of the global id space viewed as a [`BlockDevice`].
#[derive(Clone, Copy)]
pub struct DriveDevice {
    drive: u8,
}

impl DriveDevice {
    pub const fn new(drive: u8) -> Self {
        Self { drive }
    }

    pub const fn drive(&self) -> u8 {
        self.drive
    }
}

impl BlockDevice for DriveDevice {
    fn read_sector(&mut self, lba: u32, buf: &mut [u8; SECTOR_SIZE]) -> Result<(), BlockDeviceError> {
        let ops = block_ops().ok_or(BlockDeviceError::Io)?;
        if (ops.read)(self.drive, lba, 1, buf) {
            Ok(())
        } else {
            Err(BlockDeviceError::Io)
        }
    }

    fn write_sector(&mut self, lba: u32, buf: &[u8; SECTOR_SIZE]) -> Result<(), BlockDeviceError> {
        let ops = block_ops().ok_or(BlockDeviceError::Io)?;
        if (ops.write)(self.drive, lba, 1, buf) {
            Ok(())
        } else {
            Err(BlockDeviceError::Io)
        }
    }

    fn sector_count(&self) -> u32 {
        block_ops().map_or(0, |ops| (ops.sector_count)(self.drive))
    }

    fn flush(&mut self) -> Result<(), BlockDeviceError> {
        let ops = block_ops().ok_or(BlockDeviceError::Io)?;
        if (ops.flush)(self.drive) {
            Ok(())
        } else {
            Err(BlockDeviceError::Io)
        }
    }
}

// ---------------------------------------------------------------------------
// Memory-backed device for the in-kernel test suites
// ---------------------------------------------------------------------------

pub struct MemoryBlockDevice {
    data: Vec<u8>,
}

impl MemoryBlockDevice {
    /// Zero-filled device of `sectors` sectors.
    pub fn allocate(sectors: u32) -> Self {
        Self {
            data: vec![0u8; sectors as usize * SECTOR_SIZE],
        }
    }

    pub fn sector_mut(&mut self, lba: u32) -> &mut [u8] {
        let off = lba as usize * SECTOR_SIZE;
        &mut self.data[off..off + SECTOR_SIZE]
    }
}

impl BlockDevice for MemoryBlockDevice {
    fn read_sector(&mut self, lba: u32, buf: &mut [u8; SECTOR_SIZE]) -> Result<(), BlockDeviceError> {
        let off = lba as usize * SECTOR_SIZE;
        if off + SECTOR_SIZE > self.data.len() {
            return Err(BlockDeviceError::OutOfRange);
        }
        buf.copy_from_slice(&self.data[off..off + SECTOR_SIZE]);
        Ok(())
    }

    fn write_sector(&mut self, lba: u32, buf: &[u8; SECTOR_SIZE]) -> Result<(), BlockDeviceError> {
        let off = lba as usize * SECTOR_SIZE;
        if off + SECTOR_SIZE > self.data.len() {
            return Err(BlockDeviceError::OutOfRange);
        }
        self.data[off..off + SECTOR_SIZE].copy_from_slice(buf);
        Ok(())
    }

    fn sector_count(&self) -> u32 {
        (self.data.len() / SECTOR_SIZE) as u32
    }
}
