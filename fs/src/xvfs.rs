//! XVFS — the native single-block-directory filesystem.
//!
//! Sector 0 carries the `"XVFS2"` signature plus the 0x55AA marker, sector 1
//! the superblock. Allocation is one bit per block in the bitmap region;
//! files occupy **contiguous** runs of blocks, so a write either finds a run
//! long enough up front or fails before committing anything. A directory is
//! exactly one block of packed entries, deleted slots marked `0xE5` and
//! reused before fresh ones.

use alloc::string::String;
use alloc::vec::Vec;

use orion_abi::fs::{
    FAT_DIR_DELETED, SECTOR_SIZE, XVFS_MAGIC, XVFS_NAME_MAX, XVFS_SIGNATURE,
};
use orion_lib::cprintf;

use crate::blockdev::BlockDevice;
use crate::path;
use crate::progress;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum XvfsError {
    Io,
    BadSuperblock,
    NotFound,
    NotADirectory,
    NotAFile,
    AlreadyExists,
    DirectoryFull,
    DirectoryNotEmpty,
    /// No contiguous run long enough for the requested size.
    NoSpace,
    BadName,
}

/// On-disk superblock, little-endian, at sector 1.
#[derive(Clone, Copy, Debug, Default)]
pub struct Superblock {
    pub magic: u32,
    pub block_size: u32,
    pub total_blocks: u32,
    pub bitmap_start: u32,
    pub data_start: u32,
    pub free_blocks: u32,
    pub root_dir_block: u32,
}

impl Superblock {
    fn parse(sector: &[u8; SECTOR_SIZE]) -> Result<Self, XvfsError> {
        let f = |off: usize| u32::from_le_bytes([sector[off], sector[off + 1], sector[off + 2], sector[off + 3]]);
        let sb = Self {
            magic: f(0),
            block_size: f(4),
            total_blocks: f(8),
            bitmap_start: f(12),
            data_start: f(16),
            free_blocks: f(20),
            root_dir_block: f(24),
        };
        if sb.magic != XVFS_MAGIC || sb.block_size != SECTOR_SIZE as u32 {
            return Err(XvfsError::BadSuperblock);
        }
        Ok(sb)
    }

    fn encode(&self, sector: &mut [u8; SECTOR_SIZE]) {
        sector.fill(0);
        sector[0..4].copy_from_slice(&self.magic.to_le_bytes());
        sector[4..8].copy_from_slice(&self.block_size.to_le_bytes());
        sector[8..12].copy_from_slice(&self.total_blocks.to_le_bytes());
        sector[12..16].copy_from_slice(&self.bitmap_start.to_le_bytes());
        sector[16..20].copy_from_slice(&self.data_start.to_le_bytes());
        sector[20..24].copy_from_slice(&self.free_blocks.to_le_bytes());
        sector[24..28].copy_from_slice(&self.root_dir_block.to_le_bytes());
    }
}

/// Packed directory record: name[16], start, size, attr.
pub const DIR_ENTRY_SIZE: usize = 25;
pub const ENTRIES_PER_DIR: usize = SECTOR_SIZE / DIR_ENTRY_SIZE;
const ATTR_DIR: u8 = 1;

#[derive(Clone, Copy)]
pub struct XvfsEntry {
    pub name: [u8; XVFS_NAME_MAX],
    pub start: u32,
    pub size: u32,
    pub attr: u8,
}

impl XvfsEntry {
    fn parse(raw: &[u8]) -> Self {
        let mut name = [0u8; XVFS_NAME_MAX];
        name.copy_from_slice(&raw[..XVFS_NAME_MAX]);
        Self {
            name,
            start: u32::from_le_bytes([raw[16], raw[17], raw[18], raw[19]]),
            size: u32::from_le_bytes([raw[20], raw[21], raw[22], raw[23]]),
            attr: raw[24],
        }
    }

    fn encode(&self, raw: &mut [u8]) {
        raw[..XVFS_NAME_MAX].copy_from_slice(&self.name);
        raw[16..20].copy_from_slice(&self.start.to_le_bytes());
        raw[20..24].copy_from_slice(&self.size.to_le_bytes());
        raw[24] = self.attr;
    }

    pub fn name_str(&self) -> &str {
        orion_lib::string::bytes_as_str(&self.name)
    }

    pub fn is_dir(&self) -> bool {
        self.attr & ATTR_DIR != 0
    }

    /// Blocks this entry's extent occupies (files always own at least one).
    fn block_span(&self) -> u32 {
        if self.is_dir() {
            1
        } else {
            (self.size.div_ceil(SECTOR_SIZE as u32)).max(1)
        }
    }
}

pub struct XvfsFs {
    base_lba: u32,
    sb: Superblock,
    current_dir: u32,
}

impl XvfsFs {
    pub fn mount(dev: &mut dyn BlockDevice, base_lba: u32) -> Result<Self, XvfsError> {
        let mut sec = [0u8; SECTOR_SIZE];
        dev.read_sector(base_lba, &mut sec).map_err(|_| XvfsError::Io)?;
        if &sec[..XVFS_SIGNATURE.len()] != XVFS_SIGNATURE {
            return Err(XvfsError::BadSuperblock);
        }
        dev.read_sector(base_lba + 1, &mut sec).map_err(|_| XvfsError::Io)?;
        let sb = Superblock::parse(&sec)?;
        Ok(Self {
            base_lba,
            current_dir: sb.root_dir_block,
            sb,
        })
    }

    pub fn total_blocks(&self) -> u32 {
        self.sb.total_blocks
    }

    pub fn free_blocks(&self) -> u32 {
        self.sb.free_blocks
    }

    // -- block I/O ---------------------------------------------------------

    fn read_block(
        &self,
        dev: &mut dyn BlockDevice,
        block: u32,
        buf: &mut [u8; SECTOR_SIZE],
    ) -> Result<(), XvfsError> {
        dev.read_sector(self.base_lba + block, buf).map_err(|_| XvfsError::Io)
    }

    fn write_block(
        &self,
        dev: &mut dyn BlockDevice,
        block: u32,
        buf: &[u8; SECTOR_SIZE],
    ) -> Result<(), XvfsError> {
        dev.write_sector(self.base_lba + block, buf).map_err(|_| XvfsError::Io)
    }

    fn write_superblock(&self, dev: &mut dyn BlockDevice) -> Result<(), XvfsError> {
        let mut sec = [0u8; SECTOR_SIZE];
        self.sb.encode(&mut sec);
        self.write_block(dev, 1, &sec)
    }

    // -- bitmap ------------------------------------------------------------

    fn bit_is_set(
        &self,
        dev: &mut dyn BlockDevice,
        block: u32,
        cache: &mut BitmapCache,
    ) -> Result<bool, XvfsError> {
        const BITS: u32 = SECTOR_SIZE as u32 * 8;
        let blk = self.sb.bitmap_start + block / BITS;
        let bit = block % BITS;
        cache.load(self, dev, blk)?;
        Ok(cache.buf[(bit / 8) as usize] & (1 << (bit % 8)) != 0)
    }

    fn mark_blocks(
        &mut self,
        dev: &mut dyn BlockDevice,
        start: u32,
        count: u32,
        used: bool,
    ) -> Result<(), XvfsError> {
        const BITS: u32 = SECTOR_SIZE as u32 * 8;
        let mut cache = BitmapCache::new();
        for b in start..start + count {
            let blk = self.sb.bitmap_start + b / BITS;
            let bit = b % BITS;
            cache.load(self, dev, blk)?;
            let byte = &mut cache.buf[(bit / 8) as usize];
            let mask = 1u8 << (bit % 8);
            if used && *byte & mask == 0 {
                *byte |= mask;
                cache.dirty = true;
                self.sb.free_blocks = self.sb.free_blocks.saturating_sub(1);
            } else if !used && *byte & mask != 0 {
                *byte &= !mask;
                cache.dirty = true;
                self.sb.free_blocks += 1;
            }
        }
        cache.flush(self, dev)?;
        self.write_superblock(dev)
    }

    /// First-fit contiguous run of `count` free data blocks.
    fn find_free_run(
        &self,
        dev: &mut dyn BlockDevice,
        count: u32,
    ) -> Result<u32, XvfsError> {
        if count == 0 || count > self.sb.free_blocks {
            return Err(XvfsError::NoSpace);
        }
        let mut cache = BitmapCache::new();
        let mut run_start = 0u32;
        let mut run_len = 0u32;

        for b in self.sb.data_start..self.sb.total_blocks {
            if self.bit_is_set(dev, b, &mut cache)? {
                run_len = 0;
            } else {
                if run_len == 0 {
                    run_start = b;
                }
                run_len += 1;
                if run_len == count {
                    return Ok(run_start);
                }
            }
        }
        Err(XvfsError::NoSpace)
    }

    // -- directory access --------------------------------------------------

    fn dir_entries(
        &self,
        dev: &mut dyn BlockDevice,
        dir_block: u32,
    ) -> Result<[u8; SECTOR_SIZE], XvfsError> {
        let mut buf = [0u8; SECTOR_SIZE];
        self.read_block(dev, dir_block, &mut buf)?;
        Ok(buf)
    }

    fn entry_at(buf: &[u8; SECTOR_SIZE], slot: usize) -> XvfsEntry {
        XvfsEntry::parse(&buf[slot * DIR_ENTRY_SIZE..slot * DIR_ENTRY_SIZE + DIR_ENTRY_SIZE])
    }

    fn slot_live(buf: &[u8; SECTOR_SIZE], slot: usize) -> bool {
        let first = buf[slot * DIR_ENTRY_SIZE];
        first != 0x00 && first != FAT_DIR_DELETED
    }

    fn find_slot(
        &self,
        dev: &mut dyn BlockDevice,
        dir_block: u32,
        name: &str,
    ) -> Result<Option<(usize, XvfsEntry)>, XvfsError> {
        let buf = self.dir_entries(dev, dir_block)?;
        for slot in 0..ENTRIES_PER_DIR {
            if !Self::slot_live(&buf, slot) {
                continue;
            }
            let entry = Self::entry_at(&buf, slot);
            if entry.name_str().eq_ignore_ascii_case(name) {
                return Ok(Some((slot, entry)));
            }
        }
        Ok(None)
    }

    /// First reusable slot: a deleted one wins over a never-used one.
    fn free_slot(buf: &[u8; SECTOR_SIZE]) -> Option<usize> {
        let mut fresh = None;
        for slot in 0..ENTRIES_PER_DIR {
            let first = buf[slot * DIR_ENTRY_SIZE];
            if first == FAT_DIR_DELETED {
                return Some(slot);
            }
            if first == 0x00 && fresh.is_none() {
                fresh = Some(slot);
            }
        }
        fresh
    }

    pub fn resolve_dir(&self, dev: &mut dyn BlockDevice, dir_path: &str) -> Result<u32, XvfsError> {
        let mut dir = if dir_path.starts_with('/') {
            self.sb.root_dir_block
        } else {
            self.current_dir
        };

        for comp in path::components(dir_path) {
            if comp == ".." {
                dir = self.parent_of(dev, dir)?;
                continue;
            }
            let (_, entry) = self
                .find_slot(dev, dir, comp)?
                .ok_or(XvfsError::NotFound)?;
            if !entry.is_dir() {
                return Err(XvfsError::NotADirectory);
            }
            dir = entry.start;
        }
        Ok(dir)
    }

    /// A directory block's parent is found by searching every directory for
    /// a dir entry pointing at it. Directories are single blocks and the
    /// tree is tiny, so the walk from the root is cheap.
    fn parent_of(&self, dev: &mut dyn BlockDevice, dir: u32) -> Result<u32, XvfsError> {
        if dir == self.sb.root_dir_block {
            return Ok(self.sb.root_dir_block);
        }
        self.parent_search(dev, self.sb.root_dir_block, dir)
            .map(|found| found.unwrap_or(self.sb.root_dir_block))
    }

    fn parent_search(
        &self,
        dev: &mut dyn BlockDevice,
        from: u32,
        target: u32,
    ) -> Result<Option<u32>, XvfsError> {
        let buf = self.dir_entries(dev, from)?;
        for slot in 0..ENTRIES_PER_DIR {
            if !Self::slot_live(&buf, slot) {
                continue;
            }
            let entry = Self::entry_at(&buf, slot);
            if !entry.is_dir() {
                continue;
            }
            if entry.start == target {
                return Ok(Some(from));
            }
            if let Some(found) = self.parent_search(dev, entry.start, target)? {
                return Ok(Some(found));
            }
        }
        Ok(None)
    }

    fn resolve_parent(
        &self,
        dev: &mut dyn BlockDevice,
        file_path: &str,
    ) -> Result<(u32, String), XvfsError> {
        let leaf = path::file_name(file_path).ok_or(XvfsError::BadName)?;
        if leaf.len() >= XVFS_NAME_MAX {
            return Err(XvfsError::BadName);
        }
        let dir = if file_path.contains('/') {
            self.resolve_dir(dev, path::parent(file_path))?
        } else {
            self.current_dir
        };
        Ok((dir, String::from(leaf)))
    }

    pub fn find_file(
        &self,
        dev: &mut dyn BlockDevice,
        file_path: &str,
    ) -> Result<Option<XvfsEntry>, XvfsError> {
        let (dir, leaf) = self.resolve_parent(dev, file_path)?;
        Ok(self.find_slot(dev, dir, &leaf)?.map(|(_, e)| e))
    }

    pub fn exists(&self, dev: &mut dyn BlockDevice, file_path: &str) -> bool {
        matches!(self.find_file(dev, file_path), Ok(Some(_)))
    }

    pub fn is_dir(&self, dev: &mut dyn BlockDevice, file_path: &str) -> bool {
        matches!(self.find_file(dev, file_path), Ok(Some(e)) if e.is_dir())
    }

    pub fn get_file_size(&self, dev: &mut dyn BlockDevice, file_path: &str) -> u32 {
        match self.find_file(dev, file_path) {
            Ok(Some(e)) => e.size,
            _ => 0,
        }
    }

    // -- reading -----------------------------------------------------------

    pub fn read_entry_range(
        &self,
        dev: &mut dyn BlockDevice,
        entry: &XvfsEntry,
        offset: u32,
        buf: &mut [u8],
    ) -> Result<usize, XvfsError> {
        if entry.is_dir() {
            return Err(XvfsError::NotAFile);
        }
        if offset >= entry.size {
            return Ok(0);
        }
        let want = (buf.len() as u32).min(entry.size - offset) as usize;

        let mut into = 0usize;
        let mut pos = offset;
        let mut sec = [0u8; SECTOR_SIZE];
        while into < want {
            let block = entry.start + pos / SECTOR_SIZE as u32;
            let in_block = (pos % SECTOR_SIZE as u32) as usize;
            self.read_block(dev, block, &mut sec)?;
            let take = (SECTOR_SIZE - in_block).min(want - into);
            buf[into..into + take].copy_from_slice(&sec[in_block..in_block + take]);
            into += take;
            pos += take as u32;
        }
        Ok(into)
    }

    pub fn read_file_by_name(
        &self,
        dev: &mut dyn BlockDevice,
        file_path: &str,
        buf: &mut [u8],
    ) -> Result<usize, XvfsError> {
        let entry = self
            .find_file(dev, file_path)?
            .ok_or(XvfsError::NotFound)?;
        self.read_entry_range(dev, &entry, 0, buf)
    }

    pub fn read_file_partial(
        &self,
        dev: &mut dyn BlockDevice,
        file_path: &str,
        offset: u32,
        buf: &mut [u8],
    ) -> Result<usize, XvfsError> {
        let entry = self
            .find_file(dev, file_path)?
            .ok_or(XvfsError::NotFound)?;
        self.read_entry_range(dev, &entry, offset, buf)
    }

    // -- writing -----------------------------------------------------------

    fn write_extent(
        &self,
        dev: &mut dyn BlockDevice,
        start: u32,
        data: &[u8],
    ) -> Result<(), XvfsError> {
        let mut sec = [0u8; SECTOR_SIZE];
        let mut written = 0usize;
        let mut block = start;
        while written < data.len() {
            let take = (data.len() - written).min(SECTOR_SIZE);
            sec[..take].copy_from_slice(&data[written..written + take]);
            sec[take..].fill(0);
            self.write_block(dev, block, &sec)?;
            written += take;
            block += 1;
            progress::write_progress_update(written as u32);
        }
        Ok(())
    }

    fn store_entry(
        &self,
        dev: &mut dyn BlockDevice,
        dir_block: u32,
        slot: usize,
        entry: &XvfsEntry,
    ) -> Result<(), XvfsError> {
        let mut buf = self.dir_entries(dev, dir_block)?;
        entry.encode(&mut buf[slot * DIR_ENTRY_SIZE..slot * DIR_ENTRY_SIZE + DIR_ENTRY_SIZE]);
        self.write_block(dev, dir_block, &buf)
    }

    /// Whole-file write. The contiguous run is reserved up front, so a file
    /// that does not fit fails without touching the old contents' blocks
    /// beyond freeing them for the attempt.
    pub fn write_file(
        &mut self,
        dev: &mut dyn BlockDevice,
        file_path: &str,
        data: &[u8],
    ) -> Result<(), XvfsError> {
        let (dir, leaf) = self.resolve_parent(dev, file_path)?;
        let existing = self.find_slot(dev, dir, &leaf)?;
        let needed = ((data.len() as u32).div_ceil(SECTOR_SIZE as u32)).max(1);

        match existing {
            Some((slot, old)) => {
                if old.is_dir() {
                    return Err(XvfsError::NotAFile);
                }
                // Release the old extent first so an in-place rewrite can
                // reuse it; restore on allocation failure.
                let old_span = old.block_span();
                self.mark_blocks(dev, old.start, old_span, false)?;
                let start = match self.find_free_run(dev, needed) {
                    Ok(s) => s,
                    Err(e) => {
                        self.mark_blocks(dev, old.start, old_span, true)?;
                        return Err(e);
                    }
                };
                self.mark_blocks(dev, start, needed, true)?;
                self.write_extent(dev, start, data)?;

                let mut entry = old;
                entry.start = start;
                entry.size = data.len() as u32;
                self.store_entry(dev, dir, slot, &entry)
            }
            None => {
                let buf = self.dir_entries(dev, dir)?;
                let slot = Self::free_slot(&buf).ok_or(XvfsError::DirectoryFull)?;
                let start = self.find_free_run(dev, needed)?;
                self.mark_blocks(dev, start, needed, true)?;
                self.write_extent(dev, start, data)?;

                let mut entry = XvfsEntry {
                    name: [0; XVFS_NAME_MAX],
                    start,
                    size: data.len() as u32,
                    attr: 0,
                };
                orion_lib::string::copy_into_padded(&mut entry.name, leaf.as_bytes());
                self.store_entry(dev, dir, slot, &entry)
            }
        }
    }

    pub fn rm(&mut self, dev: &mut dyn BlockDevice, file_path: &str) -> Result<(), XvfsError> {
        let (dir, leaf) = self.resolve_parent(dev, file_path)?;
        let (slot, entry) = self
            .find_slot(dev, dir, &leaf)?
            .ok_or(XvfsError::NotFound)?;
        if entry.is_dir() {
            return Err(XvfsError::NotAFile);
        }

        self.mark_blocks(dev, entry.start, entry.block_span(), false)?;
        let mut buf = self.dir_entries(dev, dir)?;
        buf[slot * DIR_ENTRY_SIZE] = FAT_DIR_DELETED;
        self.write_block(dev, dir, &buf)
    }

    pub fn mkdir(&mut self, dev: &mut dyn BlockDevice, dir_path: &str) -> Result<(), XvfsError> {
        let (parent, leaf) = self.resolve_parent(dev, dir_path)?;
        if self.find_slot(dev, parent, &leaf)?.is_some() {
            return Err(XvfsError::AlreadyExists);
        }

        let buf = self.dir_entries(dev, parent)?;
        let slot = Self::free_slot(&buf).ok_or(XvfsError::DirectoryFull)?;

        let block = self.find_free_run(dev, 1)?;
        self.mark_blocks(dev, block, 1, true)?;
        let zero = [0u8; SECTOR_SIZE];
        self.write_block(dev, block, &zero)?;

        let mut entry = XvfsEntry {
            name: [0; XVFS_NAME_MAX],
            start: block,
            size: 0,
            attr: ATTR_DIR,
        };
        orion_lib::string::copy_into_padded(&mut entry.name, leaf.as_bytes());
        self.store_entry(dev, parent, slot, &entry)
    }

    pub fn rmdir(&mut self, dev: &mut dyn BlockDevice, dir_path: &str) -> Result<(), XvfsError> {
        let (parent, leaf) = self.resolve_parent(dev, dir_path)?;
        let (slot, entry) = self
            .find_slot(dev, parent, &leaf)?
            .ok_or(XvfsError::NotFound)?;
        if !entry.is_dir() {
            return Err(XvfsError::NotADirectory);
        }

        let target = self.dir_entries(dev, entry.start)?;
        for s in 0..ENTRIES_PER_DIR {
            if Self::slot_live(&target, s) {
                return Err(XvfsError::DirectoryNotEmpty);
            }
        }

        if entry.start == self.current_dir {
            self.current_dir = self.sb.root_dir_block;
        }
        self.mark_blocks(dev, entry.start, 1, false)?;
        let mut buf = self.dir_entries(dev, parent)?;
        buf[slot * DIR_ENTRY_SIZE] = FAT_DIR_DELETED;
        self.write_block(dev, parent, &buf)
    }

    pub fn cd(&mut self, dev: &mut dyn BlockDevice, dir_path: &str) -> Result<(), XvfsError> {
        self.current_dir = self.resolve_dir(dev, dir_path)?;
        Ok(())
    }

    pub fn reset_dir(&mut self) {
        self.current_dir = self.sb.root_dir_block;
    }

    pub fn mv(
        &mut self,
        dev: &mut dyn BlockDevice,
        src_path: &str,
        dst_path: &str,
    ) -> Result<(), XvfsError> {
        let (src_dir, src_leaf) = self.resolve_parent(dev, src_path)?;
        let (src_slot, entry) = self
            .find_slot(dev, src_dir, &src_leaf)?
            .ok_or(XvfsError::NotFound)?;
        let (dst_dir, dst_leaf) = self.resolve_parent(dev, dst_path)?;
        if self.find_slot(dev, dst_dir, &dst_leaf)?.is_some() {
            return Err(XvfsError::AlreadyExists);
        }

        let dst_buf = self.dir_entries(dev, dst_dir)?;
        let dst_slot = Self::free_slot(&dst_buf).ok_or(XvfsError::DirectoryFull)?;

        let mut moved = entry;
        moved.name = [0; XVFS_NAME_MAX];
        orion_lib::string::copy_into_padded(&mut moved.name, dst_leaf.as_bytes());
        self.store_entry(dev, dst_dir, dst_slot, &moved)?;

        let mut src_buf = self.dir_entries(dev, src_dir)?;
        // Same-directory rename may have landed in this very slot.
        if src_dir == dst_dir && src_slot == dst_slot {
            return Ok(());
        }
        src_buf[src_slot * DIR_ENTRY_SIZE] = FAT_DIR_DELETED;
        self.write_block(dev, src_dir, &src_buf)
    }

    pub fn cp(
        &mut self,
        dev: &mut dyn BlockDevice,
        src_path: &str,
        dst_path: &str,
    ) -> Result<(), XvfsError> {
        let entry = self
            .find_file(dev, src_path)?
            .ok_or(XvfsError::NotFound)?;
        if entry.is_dir() {
            return Err(XvfsError::NotAFile);
        }
        let mut buf = alloc::vec![0u8; entry.size as usize];
        let got = self.read_entry_range(dev, &entry, 0, &mut buf)?;
        buf.truncate(got);
        self.write_file(dev, dst_path, &buf)
    }

    // -- listing -----------------------------------------------------------

    pub fn list_dir(
        &self,
        dev: &mut dyn BlockDevice,
        dir_path: Option<&str>,
    ) -> Result<Vec<(String, bool)>, XvfsError> {
        let dir = match dir_path {
            Some(p) if !p.is_empty() => self.resolve_dir(dev, p)?,
            _ => self.current_dir,
        };
        let buf = self.dir_entries(dev, dir)?;
        let mut out = Vec::new();
        for slot in 0..ENTRIES_PER_DIR {
            if !Self::slot_live(&buf, slot) {
                continue;
            }
            let entry = Self::entry_at(&buf, slot);
            out.push((String::from(entry.name_str()), entry.is_dir()));
        }
        Ok(out)
    }

    pub fn ls(&self, dev: &mut dyn BlockDevice, dir_path: Option<&str>) {
        let dir = match dir_path {
            Some(p) if !p.is_empty() => match self.resolve_dir(dev, p) {
                Ok(d) => d,
                Err(_) => {
                    cprintf!("ls: no such directory\n");
                    return;
                }
            },
            _ => self.current_dir,
        };

        let Ok(buf) = self.dir_entries(dev, dir) else {
            cprintf!("ls: read error\n");
            return;
        };
        let mut total = 0u32;
        for slot in 0..ENTRIES_PER_DIR {
            if !Self::slot_live(&buf, slot) {
                continue;
            }
            let entry = Self::entry_at(&buf, slot);
            if entry.is_dir() {
                cprintf!("  <DIR>   {}\n", entry.name_str());
            } else {
                cprintf!("  {:>7} {}\n", entry.size, entry.name_str());
            }
            total += 1;
        }
        cprintf!("  {} entry(s)\n", total);
    }

    // -- format ------------------------------------------------------------

    pub fn format_at(
        dev: &mut dyn BlockDevice,
        base_lba: u32,
        total_sectors: u32,
    ) -> Result<(), XvfsError> {
        if total_sectors < 16 {
            return Err(XvfsError::NoSpace);
        }

        // Fixed layout: 0 signature, 1 superblock, 2..10 bitmap, data after.
        let sb = Superblock {
            magic: XVFS_MAGIC,
            block_size: SECTOR_SIZE as u32,
            total_blocks: total_sectors,
            bitmap_start: 2,
            data_start: 10,
            free_blocks: total_sectors - 10 - 1,
            root_dir_block: 10,
        };

        let mut sec = [0u8; SECTOR_SIZE];
        sec[..XVFS_SIGNATURE.len()].copy_from_slice(XVFS_SIGNATURE);
        sec[510] = 0x55;
        sec[511] = 0xAA;
        dev.write_sector(base_lba, &sec).map_err(|_| XvfsError::Io)?;

        sb.encode(&mut sec);
        dev.write_sector(base_lba + 1, &sec).map_err(|_| XvfsError::Io)?;

        // Bitmap: reserved region plus the root directory block are used.
        let zero = [0u8; SECTOR_SIZE];
        for b in 0..(sb.data_start - sb.bitmap_start) {
            dev.write_sector(base_lba + sb.bitmap_start + b, &zero)
                .map_err(|_| XvfsError::Io)?;
        }
        let mut first = zero;
        for b in 0..=sb.data_start {
            first[(b / 8) as usize] |= 1 << (b % 8);
        }
        dev.write_sector(base_lba + sb.bitmap_start, &first)
            .map_err(|_| XvfsError::Io)?;

        dev.write_sector(base_lba + sb.root_dir_block, &zero)
            .map_err(|_| XvfsError::Io)
    }

    pub fn format(dev: &mut dyn BlockDevice) -> Result<(), XvfsError> {
        let total = dev.sector_count();
        Self::format_at(dev, 0, total)
    }
}

/// One-sector bitmap cache so run scans do not re-read per bit.
struct BitmapCache {
    block: u32,
    dirty: bool,
    loaded: bool,
    buf: [u8; SECTOR_SIZE],
}

impl BitmapCache {
    fn new() -> Self {
        Self {
            block: 0,
            dirty: false,
            loaded: false,
            buf: [0; SECTOR_SIZE],
        }
    }

    fn load(
        &mut self,
        fs: &XvfsFs,
        dev: &mut dyn BlockDevice,
        block: u32,
    ) -> Result<(), XvfsError> {
        if self.loaded && self.block == block {
            return Ok(());
        }
        self.flush(fs, dev)?;
        fs.read_block(dev, block, &mut self.buf)?;
        self.block = block;
        self.loaded = true;
        Ok(())
    }

    fn flush(&mut self, fs: &XvfsFs, dev: &mut dyn BlockDevice) -> Result<(), XvfsError> {
        if self.loaded && self.dirty {
            fs.write_block(dev, self.block, &self.buf)?;
            self.dirty = false;
        }
        Ok(())
    }
}
