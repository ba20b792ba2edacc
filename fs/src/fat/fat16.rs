//! FAT16 driver.
//!
//! The root directory is the fixed region between the FATs and the data
//! area; every other directory is a cluster chain. Cluster numbers start at
//! 2. The allocation hint is volatile — it only accelerates the free-slot
//! search and is reset at mount.

use alloc::string::String;
use alloc::vec::Vec;

use orion_abi::fs::{
    FAT_ATTR_DIRECTORY, FAT_DIR_DELETED, FAT_DIR_END, SECTOR_SIZE,
};
use orion_lib::cprintf;

use crate::blockdev::BlockDevice;
use crate::path;
use crate::progress;

use super::dir::{
    DIR_ENTRY_SIZE, DirEntryInfo, DirLocation, DirScanner, ENTRIES_PER_SECTOR, ScanOutcome,
    write_raw_entry,
};
use super::name::{
    apply_numeric_tail, lfn_checksum, lfn_entry_count, make_short_name, names_match,
    pack_lfn_entry, LFN_CHARS_PER_ENTRY, LFN_LAST_FLAG, LFN_NAME_MAX,
};
use super::{Bpb, FatError};

const FAT16_FREE: u16 = 0x0000;
const FAT16_EOC: u16 = 0xFFFF;
const FAT16_EOC_MIN: u16 = 0xFFF8;
/// Root directory pseudo-cluster id.
const ROOT_DIR: u16 = 0;

pub struct Fat16Fs {
    base_lba: u32,
    bpb: Bpb,
    current_dir: u16,
    alloc_hint: u16,
}

impl Fat16Fs {
    pub fn mount(dev: &mut dyn BlockDevice, base_lba: u32) -> Result<Self, FatError> {
        let mut sec = [0u8; SECTOR_SIZE];
        dev.read_sector(base_lba, &mut sec).map_err(|_| FatError::Io)?;
        let bpb = Bpb::parse(&sec)?;
        if bpb.root_entries == 0 {
            return Err(FatError::BadSuperblock);
        }
        Ok(Self {
            base_lba,
            bpb,
            current_dir: ROOT_DIR,
            alloc_hint: 2,
        })
    }

    // -- geometry ----------------------------------------------------------

    fn fat_start(&self) -> u32 {
        self.base_lba + self.bpb.reserved_sectors as u32
    }

    fn root_start(&self) -> u32 {
        self.fat_start() + self.bpb.num_fats as u32 * self.bpb.sectors_per_fat
    }

    fn root_sectors(&self) -> u32 {
        (self.bpb.root_entries as u32 * DIR_ENTRY_SIZE as u32).div_ceil(SECTOR_SIZE as u32)
    }

    fn data_start(&self) -> u32 {
        self.root_start() + self.root_sectors()
    }

    fn cluster_lba(&self, cluster: u16) -> u32 {
        self.data_start() + (cluster as u32 - 2) * self.bpb.sectors_per_cluster as u32
    }

    fn max_cluster(&self) -> u16 {
        let data_sectors = self
            .bpb
            .total_sectors
            .saturating_sub(self.data_start() - self.base_lba);
        let clusters = data_sectors / self.bpb.sectors_per_cluster as u32;
        (clusters.min(0xFFF6) as u16).saturating_add(1)
    }

    pub fn total_clusters(&self) -> u32 {
        self.max_cluster().saturating_sub(1) as u32
    }

    pub fn cluster_bytes(&self) -> u32 {
        self.bpb.cluster_bytes()
    }

    // -- FAT access --------------------------------------------------------

    fn fat_entry(&self, dev: &mut dyn BlockDevice, cluster: u16) -> Result<u16, FatError> {
        let byte = cluster as u32 * 2;
        let lba = self.fat_start() + byte / SECTOR_SIZE as u32;
        let off = (byte % SECTOR_SIZE as u32) as usize;
        let mut sec = [0u8; SECTOR_SIZE];
        dev.read_sector(lba, &mut sec).map_err(|_| FatError::Io)?;
        Ok(u16::from_le_bytes([sec[off], sec[off + 1]]))
    }

    fn set_fat_entry(
        &self,
        dev: &mut dyn BlockDevice,
        cluster: u16,
        value: u16,
    ) -> Result<(), FatError> {
        let byte = cluster as u32 * 2;
        let rel = byte / SECTOR_SIZE as u32;
        let off = (byte % SECTOR_SIZE as u32) as usize;

        for fat in 0..self.bpb.num_fats as u32 {
            let lba = self.fat_start() + fat * self.bpb.sectors_per_fat + rel;
            let mut sec = [0u8; SECTOR_SIZE];
            dev.read_sector(lba, &mut sec).map_err(|_| FatError::Io)?;
            sec[off..off + 2].copy_from_slice(&value.to_le_bytes());
            dev.write_sector(lba, &sec).map_err(|_| FatError::Io)?;
        }
        Ok(())
    }

    fn alloc_cluster(&mut self, dev: &mut dyn BlockDevice) -> Result<u16, FatError> {
        let max = self.max_cluster();
        let start = self.alloc_hint.clamp(2, max);

        let mut c = start;
        loop {
            if self.fat_entry(dev, c)? == FAT16_FREE {
                self.set_fat_entry(dev, c, FAT16_EOC)?;
                self.alloc_hint = if c < max { c + 1 } else { 2 };
                return Ok(c);
            }
            c = if c < max { c + 1 } else { 2 };
            if c == start {
                return Err(FatError::NoSpace);
            }
        }
    }

    fn free_chain(&self, dev: &mut dyn BlockDevice, start: u16) -> Result<(), FatError> {
        let mut c = start;
        while (2..FAT16_EOC_MIN).contains(&c) {
            let next = self.fat_entry(dev, c)?;
            self.set_fat_entry(dev, c, FAT16_FREE)?;
            c = next;
        }
        Ok(())
    }

    pub fn free_clusters(&self, dev: &mut dyn BlockDevice) -> Result<u32, FatError> {
        let mut free = 0;
        for c in 2..=self.max_cluster() {
            if self.fat_entry(dev, c)? == FAT16_FREE {
                free += 1;
            }
        }
        Ok(free)
    }

    // -- directory plumbing ------------------------------------------------

    /// Flattened sector list of a directory (root region or cluster chain).
    fn dir_sectors(&self, dev: &mut dyn BlockDevice, dir: u16) -> Result<Vec<u32>, FatError> {
        let mut out = Vec::new();
        if dir == ROOT_DIR {
            for s in 0..self.root_sectors() {
                out.push(self.root_start() + s);
            }
            return Ok(out);
        }

        let mut c = dir;
        while (2..FAT16_EOC_MIN).contains(&c) {
            let lba = self.cluster_lba(c);
            for s in 0..self.bpb.sectors_per_cluster as u32 {
                out.push(lba + s);
            }
            c = self.fat_entry(dev, c)?;
        }
        Ok(out)
    }

    fn scan_dir(
        &self,
        dev: &mut dyn BlockDevice,
        dir: u16,
        f: &mut dyn FnMut(DirEntryInfo) -> bool,
    ) -> Result<(), FatError> {
        let sectors = self.dir_sectors(dev, dir)?;
        let mut scanner = DirScanner::new();
        let mut sec = [0u8; SECTOR_SIZE];
        for lba in sectors {
            dev.read_sector(lba, &mut sec).map_err(|_| FatError::Io)?;
            match scanner.feed_sector(lba, &sec, f) {
                ScanOutcome::Continue => {}
                ScanOutcome::End | ScanOutcome::Stop => break,
            }
        }
        Ok(())
    }

    fn find_in_dir(
        &self,
        dev: &mut dyn BlockDevice,
        dir: u16,
        name: &str,
    ) -> Result<Option<DirEntryInfo>, FatError> {
        let mut found = None;
        self.scan_dir(dev, dir, &mut |info| {
            if names_match(&info.name, name) {
                found = Some(info);
                false
            } else {
                true
            }
        })?;
        Ok(found)
    }

    /// Resolve a path to a directory cluster. Relative paths start at the
    /// current directory; `..` follows the on-disk dot entries.
    pub fn resolve_dir(&self, dev: &mut dyn BlockDevice, dir_path: &str) -> Result<u16, FatError> {
        let mut dir = if dir_path.starts_with('/') {
            ROOT_DIR
        } else {
            self.current_dir
        };

        for comp in path::components(dir_path) {
            if comp == ".." {
                dir = self.parent_of(dev, dir)?;
                continue;
            }
            let entry = self
                .find_in_dir(dev, dir, comp)?
                .ok_or(FatError::NotFound)?;
            if entry.attr & FAT_ATTR_DIRECTORY == 0 {
                return Err(FatError::NotADirectory);
            }
            dir = entry.first_cluster as u16;
        }
        Ok(dir)
    }

    fn parent_of(&self, dev: &mut dyn BlockDevice, dir: u16) -> Result<u16, FatError> {
        if dir == ROOT_DIR {
            return Ok(ROOT_DIR);
        }
        let dotdot = self.find_in_dir(dev, dir, "..")?;
        Ok(dotdot.map_or(ROOT_DIR, |e| e.first_cluster as u16))
    }

    /// Split a path into its parent directory cluster and leaf name.
    fn resolve_parent(
        &self,
        dev: &mut dyn BlockDevice,
        file_path: &str,
    ) -> Result<(u16, String), FatError> {
        let leaf = path::file_name(file_path).ok_or(FatError::BadName)?;
        let parent_str = path::parent(file_path);
        let dir = if file_path.starts_with('/') {
            self.resolve_dir(dev, parent_str)?
        } else if file_path.contains('/') {
            self.resolve_dir(dev, parent_str)?
        } else {
            self.current_dir
        };
        Ok((dir, String::from(leaf)))
    }

    pub fn find_file(
        &self,
        dev: &mut dyn BlockDevice,
        file_path: &str,
    ) -> Result<Option<DirEntryInfo>, FatError> {
        let (dir, leaf) = self.resolve_parent(dev, file_path)?;
        self.find_in_dir(dev, dir, &leaf)
    }

    pub fn exists(&self, dev: &mut dyn BlockDevice, file_path: &str) -> bool {
        matches!(self.find_file(dev, file_path), Ok(Some(_)))
    }

    pub fn is_dir(&self, dev: &mut dyn BlockDevice, file_path: &str) -> bool {
        matches!(
            self.find_file(dev, file_path),
            Ok(Some(e)) if e.attr & FAT_ATTR_DIRECTORY != 0
        )
    }

    pub fn get_file_size(&self, dev: &mut dyn BlockDevice, file_path: &str) -> u32 {
        match self.find_file(dev, file_path) {
            Ok(Some(e)) => e.size,
            _ => 0,
        }
    }

    // -- reading -----------------------------------------------------------

    /// Read `buf.len()` bytes starting at `offset`, clamped to file size.
    /// Returns the byte count actually read.
    pub fn read_entry_range(
        &self,
        dev: &mut dyn BlockDevice,
        entry: &DirEntryInfo,
        offset: u32,
        buf: &mut [u8],
    ) -> Result<usize, FatError> {
        if entry.attr & FAT_ATTR_DIRECTORY != 0 {
            return Err(FatError::NotAFile);
        }
        if offset >= entry.size {
            return Ok(0);
        }
        let want = (buf.len() as u32).min(entry.size - offset) as usize;
        let cbytes = self.cluster_bytes();

        // Skip whole clusters up to the offset.
        let mut cluster = entry.first_cluster as u16;
        let mut skip = offset / cbytes;
        while skip > 0 {
            if !(2..FAT16_EOC_MIN).contains(&cluster) {
                return Ok(0);
            }
            cluster = self.fat_entry(dev, cluster)?;
            skip -= 1;
        }

        let mut into = 0usize;
        let mut cluster_off = offset % cbytes;
        let mut sec = [0u8; SECTOR_SIZE];
        while into < want && (2..FAT16_EOC_MIN).contains(&cluster) {
            let sector_in_cluster = cluster_off / SECTOR_SIZE as u32;
            let byte_in_sector = (cluster_off % SECTOR_SIZE as u32) as usize;
            let lba = self.cluster_lba(cluster) + sector_in_cluster;
            dev.read_sector(lba, &mut sec).map_err(|_| FatError::Io)?;

            let take = (SECTOR_SIZE - byte_in_sector).min(want - into);
            buf[into..into + take].copy_from_slice(&sec[byte_in_sector..byte_in_sector + take]);
            into += take;
            cluster_off += take as u32;
            if cluster_off >= cbytes {
                cluster_off = 0;
                cluster = self.fat_entry(dev, cluster)?;
            }
        }
        Ok(into)
    }

    pub fn read_file_by_name(
        &self,
        dev: &mut dyn BlockDevice,
        file_path: &str,
        buf: &mut [u8],
    ) -> Result<usize, FatError> {
        let entry = self
            .find_file(dev, file_path)?
            .ok_or(FatError::NotFound)?;
        self.read_entry_range(dev, &entry, 0, buf)
    }

    pub fn read_file_partial(
        &self,
        dev: &mut dyn BlockDevice,
        file_path: &str,
        offset: u32,
        buf: &mut [u8],
    ) -> Result<usize, FatError> {
        let entry = self
            .find_file(dev, file_path)?
            .ok_or(FatError::NotFound)?;
        self.read_entry_range(dev, &entry, offset, buf)
    }

    // -- directory entry creation -----------------------------------------

    fn patch_entry(
        dev: &mut dyn BlockDevice,
        loc: DirLocation,
        f: &mut dyn FnMut(&mut [u8]),
    ) -> Result<(), FatError> {
        let mut sec = [0u8; SECTOR_SIZE];
        dev.read_sector(loc.lba, &mut sec).map_err(|_| FatError::Io)?;
        f(&mut sec[loc.offset..loc.offset + DIR_ENTRY_SIZE]);
        dev.write_sector(loc.lba, &sec).map_err(|_| FatError::Io)
    }

    fn short_name_taken(
        &self,
        dev: &mut dyn BlockDevice,
        dir: u16,
        short: &[u8; 11],
    ) -> Result<bool, FatError> {
        let mut taken = false;
        self.scan_dir(dev, dir, &mut |info| {
            if info.short_name == *short {
                taken = true;
                false
            } else {
                true
            }
        })?;
        Ok(taken)
    }

    /// Find (or grow) a run of `needed` free slots in `dir`. Deleted slots
    /// are reused before the end-of-directory zone is consumed.
    fn find_free_run(
        &mut self,
        dev: &mut dyn BlockDevice,
        dir: u16,
        needed: usize,
    ) -> Result<Vec<DirLocation>, FatError> {
        let sectors = self.dir_sectors(dev, dir)?;
        let mut run: Vec<DirLocation> = Vec::new();
        let mut sec = [0u8; SECTOR_SIZE];
        let mut past_end = false;

        for &lba in sectors.iter() {
            dev.read_sector(lba, &mut sec).map_err(|_| FatError::Io)?;
            for i in 0..ENTRIES_PER_SECTOR {
                let off = i * DIR_ENTRY_SIZE;
                let first = sec[off];
                let usable = past_end || first == FAT_DIR_DELETED || first == FAT_DIR_END;
                if first == FAT_DIR_END {
                    past_end = true;
                }
                if usable {
                    run.push(DirLocation { lba, offset: off });
                    if run.len() == needed {
                        return Ok(run);
                    }
                } else {
                    run.clear();
                }
            }
        }

        // Directory exhausted. The root region cannot grow; chains can.
        if dir == ROOT_DIR {
            return Err(FatError::DirectoryFull);
        }
        let new_cluster = self.alloc_cluster(dev)?;
        let mut tail = dir;
        loop {
            let next = self.fat_entry(dev, tail)?;
            if !(2..FAT16_EOC_MIN).contains(&next) {
                break;
            }
            tail = next;
        }
        self.set_fat_entry(dev, tail, new_cluster)?;
        self.zero_cluster(dev, new_cluster)?;

        let lba = self.cluster_lba(new_cluster);
        for s in 0..self.bpb.sectors_per_cluster as u32 {
            for i in 0..ENTRIES_PER_SECTOR {
                run.push(DirLocation {
                    lba: lba + s,
                    offset: i * DIR_ENTRY_SIZE,
                });
                if run.len() == needed {
                    return Ok(run);
                }
            }
        }
        Err(FatError::DirectoryFull)
    }

    fn zero_cluster(&self, dev: &mut dyn BlockDevice, cluster: u16) -> Result<(), FatError> {
        let zero = [0u8; SECTOR_SIZE];
        let lba = self.cluster_lba(cluster);
        for s in 0..self.bpb.sectors_per_cluster as u32 {
            dev.write_sector(lba + s, &zero).map_err(|_| FatError::Io)?;
        }
        Ok(())
    }

    /// Write the LFN chain + SFN entry for `name`. Returns the SFN slot.
    fn create_entry(
        &mut self,
        dev: &mut dyn BlockDevice,
        dir: u16,
        name: &str,
        attr: u8,
        first_cluster: u16,
        size: u32,
    ) -> Result<DirLocation, FatError> {
        if name.is_empty() || name.len() > LFN_NAME_MAX {
            return Err(FatError::BadName);
        }

        let (mut short, lossy) = make_short_name(name);
        if lossy {
            let mut tail = 1;
            loop {
                let mut candidate = short;
                apply_numeric_tail(&mut candidate, tail);
                if !self.short_name_taken(dev, dir, &candidate)? {
                    short = candidate;
                    break;
                }
                tail += 1;
                if tail > 0xFFFF {
                    return Err(FatError::DirectoryFull);
                }
            }
        }

        let lfn_entries = if lossy { lfn_entry_count(name.len()) } else { 0 };
        let run = self.find_free_run(dev, dir, lfn_entries + 1)?;

        // LFN entries are stored highest-ordinal first, so entry k of the
        // run carries slice (lfn_entries - 1 - k).
        let checksum = lfn_checksum(&short);
        let units: Vec<u16> = name.chars().map(|c| c as u16).collect();
        for (k, loc) in run.iter().take(lfn_entries).enumerate() {
            let seq = lfn_entries - k;
            let start = (seq - 1) * LFN_CHARS_PER_ENTRY;
            let end = (start + LFN_CHARS_PER_ENTRY).min(units.len());
            let ordinal = seq as u8 | if k == 0 { LFN_LAST_FLAG } else { 0 };
            Self::patch_entry(dev, *loc, &mut |entry| {
                pack_lfn_entry(entry, ordinal, checksum, &units[start..end]);
            })?;
        }

        let sfn_loc = run[lfn_entries];
        Self::patch_entry(dev, sfn_loc, &mut |entry| {
            write_raw_entry(entry, &short, attr, first_cluster as u32, size);
        })?;
        Ok(sfn_loc)
    }

    fn delete_entry(dev: &mut dyn BlockDevice, entry: &DirEntryInfo) -> Result<(), FatError> {
        for loc in entry.locations.iter() {
            Self::patch_entry(dev, *loc, &mut |raw| {
                raw[0] = FAT_DIR_DELETED;
            })?;
        }
        Ok(())
    }

    // -- writing -----------------------------------------------------------

    /// Whole-file write: truncate and rewrite. Running out of clusters
    /// leaves the chain terminated at the last allocated cluster and the
    /// entry sized to what actually landed, then reports `NoSpace`.
    pub fn write_file(
        &mut self,
        dev: &mut dyn BlockDevice,
        file_path: &str,
        data: &[u8],
    ) -> Result<u32, FatError> {
        let (dir, leaf) = self.resolve_parent(dev, file_path)?;
        let existing = self.find_in_dir(dev, dir, &leaf)?;

        let sfn_loc = match existing {
            Some(entry) => {
                if entry.attr & FAT_ATTR_DIRECTORY != 0 {
                    return Err(FatError::NotAFile);
                }
                if entry.first_cluster != 0 {
                    self.free_chain(dev, entry.first_cluster as u16)?;
                }
                let loc = *entry.locations.last().ok_or(FatError::Io)?;
                Self::patch_entry(dev, loc, &mut |raw| {
                    write_raw_entry(raw, &entry.short_name, entry.attr, 0, 0);
                })?;
                loc
            }
            None => self.create_entry(dev, dir, &leaf, 0, 0, 0)?,
        };

        let cbytes = self.cluster_bytes() as usize;
        let mut first_cluster: u16 = 0;
        let mut prev: u16 = 0;
        let mut written = 0usize;
        let mut ran_out = false;

        let mut chunk_start = 0usize;
        while chunk_start < data.len() {
            let cluster = match self.alloc_cluster(dev) {
                Ok(c) => c,
                Err(FatError::NoSpace) => {
                    ran_out = true;
                    break;
                }
                Err(e) => return Err(e),
            };
            if first_cluster == 0 {
                first_cluster = cluster;
            } else {
                self.set_fat_entry(dev, prev, cluster)?;
            }
            prev = cluster;

            let chunk = &data[chunk_start..data.len().min(chunk_start + cbytes)];
            let lba = self.cluster_lba(cluster);
            let mut sec = [0u8; SECTOR_SIZE];
            for s in 0..self.bpb.sectors_per_cluster as usize {
                let from = s * SECTOR_SIZE;
                if from >= chunk.len() {
                    break;
                }
                let take = (chunk.len() - from).min(SECTOR_SIZE);
                sec[..take].copy_from_slice(&chunk[from..from + take]);
                sec[take..].fill(0);
                dev.write_sector(lba + s as u32, &sec).map_err(|_| FatError::Io)?;
            }

            written += chunk.len();
            chunk_start += chunk.len();
            progress::write_progress_update(written as u32);
        }

        Self::patch_entry(dev, sfn_loc, &mut |raw| {
            raw[26..28].copy_from_slice(&first_cluster.to_le_bytes());
            raw[20..22].copy_from_slice(&0u16.to_le_bytes());
            raw[28..32].copy_from_slice(&(written as u32).to_le_bytes());
        })?;

        if ran_out {
            Err(FatError::NoSpace)
        } else {
            Ok(written as u32)
        }
    }

    pub fn rm(&mut self, dev: &mut dyn BlockDevice, file_path: &str) -> Result<(), FatError> {
        let entry = self
            .find_file(dev, file_path)?
            .ok_or(FatError::NotFound)?;
        if entry.attr & FAT_ATTR_DIRECTORY != 0 {
            return Err(FatError::NotAFile);
        }
        if entry.first_cluster != 0 {
            self.free_chain(dev, entry.first_cluster as u16)?;
        }
        Self::delete_entry(dev, &entry)
    }

    pub fn mkdir(&mut self, dev: &mut dyn BlockDevice, dir_path: &str) -> Result<(), FatError> {
        let (parent, leaf) = self.resolve_parent(dev, dir_path)?;
        if self.find_in_dir(dev, parent, &leaf)?.is_some() {
            return Err(FatError::AlreadyExists);
        }

        let cluster = self.alloc_cluster(dev)?;
        self.zero_cluster(dev, cluster)?;

        // Dot entries live at the start of the fresh cluster.
        let lba = self.cluster_lba(cluster);
        let mut sec = [0u8; SECTOR_SIZE];
        dev.read_sector(lba, &mut sec).map_err(|_| FatError::Io)?;
        write_raw_entry(
            &mut sec[..DIR_ENTRY_SIZE],
            b".          ",
            FAT_ATTR_DIRECTORY,
            cluster as u32,
            0,
        );
        write_raw_entry(
            &mut sec[DIR_ENTRY_SIZE..2 * DIR_ENTRY_SIZE],
            b"..         ",
            FAT_ATTR_DIRECTORY,
            parent as u32,
            0,
        );
        dev.write_sector(lba, &sec).map_err(|_| FatError::Io)?;

        match self.create_entry(dev, parent, &leaf, FAT_ATTR_DIRECTORY, cluster, 0) {
            Ok(_) => Ok(()),
            Err(e) => {
                let _ = self.free_chain(dev, cluster);
                Err(e)
            }
        }
    }

    pub fn rmdir(&mut self, dev: &mut dyn BlockDevice, dir_path: &str) -> Result<(), FatError> {
        let entry = self
            .find_file(dev, dir_path)?
            .ok_or(FatError::NotFound)?;
        if entry.attr & FAT_ATTR_DIRECTORY == 0 {
            return Err(FatError::NotADirectory);
        }

        let dir = entry.first_cluster as u16;
        let mut empty = true;
        self.scan_dir(dev, dir, &mut |info| {
            if info.name != "." && info.name != ".." {
                empty = false;
                false
            } else {
                true
            }
        })?;
        if !empty {
            return Err(FatError::DirectoryNotEmpty);
        }

        if dir == self.current_dir {
            self.current_dir = ROOT_DIR;
        }
        self.free_chain(dev, dir)?;
        Self::delete_entry(dev, &entry)
    }

    pub fn cd(&mut self, dev: &mut dyn BlockDevice, dir_path: &str) -> Result<(), FatError> {
        self.current_dir = self.resolve_dir(dev, dir_path)?;
        Ok(())
    }

    pub fn reset_dir(&mut self) {
        self.current_dir = ROOT_DIR;
    }

    /// Rename without moving data: new entry in the target directory, old
    /// LFN+SFN run deleted.
    pub fn mv(
        &mut self,
        dev: &mut dyn BlockDevice,
        src_path: &str,
        dst_path: &str,
    ) -> Result<(), FatError> {
        let src = self
            .find_file(dev, src_path)?
            .ok_or(FatError::NotFound)?;
        let (dst_dir, dst_leaf) = self.resolve_parent(dev, dst_path)?;
        if self.find_in_dir(dev, dst_dir, &dst_leaf)?.is_some() {
            return Err(FatError::AlreadyExists);
        }

        self.create_entry(
            dev,
            dst_dir,
            &dst_leaf,
            src.attr,
            src.first_cluster as u16,
            src.size,
        )?;
        Self::delete_entry(dev, &src)
    }

    pub fn cp(
        &mut self,
        dev: &mut dyn BlockDevice,
        src_path: &str,
        dst_path: &str,
    ) -> Result<(), FatError> {
        let entry = self
            .find_file(dev, src_path)?
            .ok_or(FatError::NotFound)?;
        if entry.attr & FAT_ATTR_DIRECTORY != 0 {
            return Err(FatError::NotAFile);
        }

        let mut buf = alloc::vec![0u8; entry.size as usize];
        let got = self.read_entry_range(dev, &entry, 0, &mut buf)?;
        buf.truncate(got);
        self.write_file(dev, dst_path, &buf).map(|_| ())
    }

    // -- listing -----------------------------------------------------------

    /// Uniform `(name, is_dir)` collection used by `fl` and the explorer.
    pub fn list_dir(
        &self,
        dev: &mut dyn BlockDevice,
        dir_path: Option<&str>,
    ) -> Result<Vec<(String, bool)>, FatError> {
        let dir = match dir_path {
            Some(p) if !p.is_empty() => self.resolve_dir(dev, p)?,
            _ => self.current_dir,
        };
        let mut out = Vec::new();
        self.scan_dir(dev, dir, &mut |info| {
            out.push((info.name, info.attr & FAT_ATTR_DIRECTORY != 0));
            true
        })?;
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

        let mut total = 0u32;
        let _ = self.scan_dir(dev, dir, &mut |info| {
            if info.attr & FAT_ATTR_DIRECTORY != 0 {
                cprintf!("  <DIR>   {}\n", info.name);
            } else {
                cprintf!("  {:>7} {}\n", info.size, info.name);
            }
            total += 1;
            true
        });
        cprintf!("  {} entry(s)\n", total);
    }

    // -- format ------------------------------------------------------------

    /// Lay down a fresh FAT16 volume at `base_lba`.
    pub fn format_at(
        dev: &mut dyn BlockDevice,
        base_lba: u32,
        total_sectors: u32,
        label: &str,
    ) -> Result<(), FatError> {
        if total_sectors < 128 {
            return Err(FatError::NoSpace);
        }

        let sectors_per_cluster: u8 = if total_sectors <= 32_768 {
            1
        } else if total_sectors <= 262_144 {
            4
        } else {
            8
        };
        let reserved: u16 = 1;
        let root_entries: u16 = 512;
        let root_sectors = (root_entries as u32 * 32).div_ceil(SECTOR_SIZE as u32);

        // Two-pass estimate is the standard trick for sectors-per-FAT.
        let mut spf = 1u32;
        loop {
            let data = total_sectors - reserved as u32 - 2 * spf - root_sectors;
            let clusters = data / sectors_per_cluster as u32;
            let need = (clusters + 2) * 2;
            let need_sectors = need.div_ceil(SECTOR_SIZE as u32);
            if need_sectors <= spf {
                break;
            }
            spf = need_sectors;
        }

        let mut boot = [0u8; SECTOR_SIZE];
        boot[0] = 0xEB;
        boot[1] = 0x3C;
        boot[2] = 0x90;
        boot[3..11].copy_from_slice(b"ORIONOS ");
        boot[11..13].copy_from_slice(&512u16.to_le_bytes());
        boot[13] = sectors_per_cluster;
        boot[14..16].copy_from_slice(&reserved.to_le_bytes());
        boot[16] = 2;
        boot[17..19].copy_from_slice(&root_entries.to_le_bytes());
        if total_sectors <= 0xFFFF {
            boot[19..21].copy_from_slice(&(total_sectors as u16).to_le_bytes());
        } else {
            boot[32..36].copy_from_slice(&total_sectors.to_le_bytes());
        }
        boot[21] = 0xF8;
        boot[22..24].copy_from_slice(&(spf as u16).to_le_bytes());
        boot[24..26].copy_from_slice(&63u16.to_le_bytes());
        boot[26..28].copy_from_slice(&255u16.to_le_bytes());
        boot[38] = 0x29;
        let mut lab = [b' '; 11];
        for (i, b) in label.bytes().take(11).enumerate() {
            lab[i] = b.to_ascii_uppercase();
        }
        boot[43..54].copy_from_slice(&lab);
        boot[54..62].copy_from_slice(b"FAT16   ");
        boot[510] = 0x55;
        boot[511] = 0xAA;
        dev.write_sector(base_lba, &boot).map_err(|_| FatError::Io)?;

        let zero = [0u8; SECTOR_SIZE];
        progress::write_progress_begin("format", 2 * spf + root_sectors);
        let mut done = 0u32;
        for fat in 0..2u32 {
            for s in 0..spf {
                let mut sec = zero;
                if s == 0 {
                    // Media byte + EOC in the first two entries.
                    sec[0] = 0xF8;
                    sec[1] = 0xFF;
                    sec[2] = 0xFF;
                    sec[3] = 0xFF;
                }
                dev.write_sector(base_lba + reserved as u32 + fat * spf + s, &sec)
                    .map_err(|_| FatError::Io)?;
                done += 1;
                progress::write_progress_update(done);
            }
        }
        let root_start = base_lba + reserved as u32 + 2 * spf;
        for s in 0..root_sectors {
            dev.write_sector(root_start + s, &zero).map_err(|_| FatError::Io)?;
            done += 1;
            progress::write_progress_update(done);
        }
        progress::write_progress_finish(true);
        Ok(())
    }

    pub fn format(dev: &mut dyn BlockDevice, label: &str) -> Result<(), FatError> {
        let total = dev.sector_count();
        Self::format_at(dev, 0, total, label)
    }
}
