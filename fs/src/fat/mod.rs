//! FAT16/FAT32 drivers.
//!
//! The two drivers share the BPB parser, the 8.3/VFAT name machinery, and
//! the LFN-assembling directory scanner; chain arithmetic and the root
//! directory layout differ enough that each keeps its own implementation.

pub mod dir;
pub mod fat16;
pub mod fat32;
pub mod name;

pub use fat16::Fat16Fs;
pub use fat32::Fat32Fs;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FatError {
    /// Sector transfer failed.
    Io,
    /// BPB missing or signature mismatch at mount.
    BadSuperblock,
    NotFound,
    NotADirectory,
    NotAFile,
    AlreadyExists,
    DirectoryFull,
    DirectoryNotEmpty,
    /// Cluster allocation ran dry. For writes the chain is terminated at
    /// the last allocated cluster and the entry size reflects what landed.
    NoSpace,
    BadName,
}

/// Shared BPB fields, parsed once at mount.
#[derive(Clone, Copy, Debug, Default)]
pub struct Bpb {
    pub bytes_per_sector: u16,
    pub sectors_per_cluster: u8,
    pub reserved_sectors: u16,
    pub num_fats: u8,
    pub root_entries: u16,
    pub total_sectors: u32,
    pub sectors_per_fat: u32,
    pub root_cluster: u32,
}

impl Bpb {
    pub fn parse(sector: &[u8]) -> Result<Self, FatError> {
        if sector.len() < 512 || sector[510] != 0x55 || sector[511] != 0xAA {
            return Err(FatError::BadSuperblock);
        }

        let bytes_per_sector = u16::from_le_bytes([sector[11], sector[12]]);
        let sectors_per_cluster = sector[13];
        if bytes_per_sector != 512 || sectors_per_cluster == 0 {
            return Err(FatError::BadSuperblock);
        }

        let total16 = u16::from_le_bytes([sector[19], sector[20]]) as u32;
        let total32 = u32::from_le_bytes([sector[32], sector[33], sector[34], sector[35]]);
        let spf16 = u16::from_le_bytes([sector[22], sector[23]]) as u32;
        let spf32 = u32::from_le_bytes([sector[36], sector[37], sector[38], sector[39]]);

        Ok(Self {
            bytes_per_sector,
            sectors_per_cluster,
            reserved_sectors: u16::from_le_bytes([sector[14], sector[15]]),
            num_fats: sector[16],
            root_entries: u16::from_le_bytes([sector[17], sector[18]]),
            total_sectors: if total16 != 0 { total16 } else { total32 },
            sectors_per_fat: if spf16 != 0 { spf16 } else { spf32 },
            root_cluster: u32::from_le_bytes([sector[44], sector[45], sector[46], sector[47]]),
        })
    }

    pub fn cluster_bytes(&self) -> u32 {
        self.bytes_per_sector as u32 * self.sectors_per_cluster as u32
    }
}
