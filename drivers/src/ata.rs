//! PATA PIO backend: two channels, master/slave each.
//!
//! LBA28 only, polled status, bounded spins. The block map above resolves
//! drive ids to positions here; this module only knows its four slots.

use orion_abi::fs::DRIVE_MODEL_MAX;
use orion_lib::io::Port;
use orion_lib::ports::{ATA_PRIMARY_CTRL, ATA_PRIMARY_IO, ATA_SECONDARY_CTRL, ATA_SECONDARY_IO};
use orion_lib::{IrqMutex, klog_info};

pub const ATA_SLOTS: usize = 4;

const REG_DATA: u16 = 0;
const REG_SECCOUNT: u16 = 2;
const REG_LBA_LO: u16 = 3;
const REG_LBA_MID: u16 = 4;
const REG_LBA_HI: u16 = 5;
const REG_DRIVE: u16 = 6;
const REG_COMMAND: u16 = 7;
const REG_STATUS: u16 = 7;

const CMD_READ_SECTORS: u8 = 0x20;
const CMD_WRITE_SECTORS: u8 = 0x30;
const CMD_CACHE_FLUSH: u8 = 0xE7;
const CMD_IDENTIFY: u8 = 0xEC;

const STATUS_POLL_LIMIT: u32 = 1_000_000;

bitflags::bitflags! {
    #[derive(Clone, Copy, PartialEq, Eq)]
    pub struct AtaStatus: u8 {
        const ERR = 1 << 0;
        const DRQ = 1 << 3;
        const DF = 1 << 5;
        const RDY = 1 << 6;
        const BSY = 1 << 7;
    }
}

#[derive(Clone, Copy)]
struct AtaSlot {
    present: bool,
    sector_count: u32,
    model: [u8; DRIVE_MODEL_MAX],
}

impl AtaSlot {
    const fn empty() -> Self {
        Self {
            present: false,
            sector_count: 0,
            model: [0; DRIVE_MODEL_MAX],
        }
    }
}

static SLOTS: IrqMutex<[AtaSlot; ATA_SLOTS]> = IrqMutex::new([AtaSlot::empty(); ATA_SLOTS]);

fn channel_ports(slot: usize) -> (u16, u16) {
    if slot < 2 {
        (ATA_PRIMARY_IO, ATA_PRIMARY_CTRL)
    } else {
        (ATA_SECONDARY_IO, ATA_SECONDARY_CTRL)
    }
}

fn is_slave(slot: usize) -> bool {
    slot % 2 == 1
}

fn status(io: u16) -> AtaStatus {
    AtaStatus::from_bits_retain(unsafe { Port::<u8>::new(io + REG_STATUS).read() })
}

fn wait_not_busy(io: u16) -> bool {
    for _ in 0..STATUS_POLL_LIMIT {
        if !status(io).contains(AtaStatus::BSY) {
            return true;
        }
        core::hint::spin_loop();
    }
    false
}

fn wait_drq(io: u16) -> bool {
    for _ in 0..STATUS_POLL_LIMIT {
        let st = status(io);
        if st.contains(AtaStatus::ERR) || st.contains(AtaStatus::DF) {
            return false;
        }
        if !st.contains(AtaStatus::BSY) && st.contains(AtaStatus::DRQ) {
            return true;
        }
        core::hint::spin_loop();
    }
    false
}

fn select(io: u16, slot: usize, lba: u32) {
    let drive_bits = 0xE0 | ((is_slave(slot) as u8) << 4) | (((lba >> 24) & 0x0F) as u8);
    unsafe {
        Port::<u8>::new(io + REG_DRIVE).write(drive_bits);
    }
    // Settle delay: four status reads.
    for _ in 0..4 {
        let _ = status(io);
    }
}

fn identify(slot: usize, out: &mut AtaSlot) -> bool {
    let (io, _ctrl) = channel_ports(slot);

    select(io, slot, 0);
    unsafe {
        Port::<u8>::new(io + REG_SECCOUNT).write(0);
        Port::<u8>::new(io + REG_LBA_LO).write(0);
        Port::<u8>::new(io + REG_LBA_MID).write(0);
        Port::<u8>::new(io + REG_LBA_HI).write(0);
        Port::<u8>::new(io + REG_COMMAND).write(CMD_IDENTIFY);
    }

    let st = status(io);
    if st.bits() == 0 || st.bits() == 0xFF {
        return false;
    }
    if !wait_not_busy(io) {
        return false;
    }
    // ATAPI answers with a signature instead of DRQ data.
    let mid = unsafe { Port::<u8>::new(io + REG_LBA_MID).read() };
    let hi = unsafe { Port::<u8>::new(io + REG_LBA_HI).read() };
    if mid != 0 || hi != 0 {
        return false;
    }
    if !wait_drq(io) {
        return false;
    }

    let mut words = [0u16; 256];
    let data = Port::<u16>::new(io + REG_DATA);
    for word in words.iter_mut() {
        *word = unsafe { data.read() };
    }

    out.sector_count = ((words[61] as u32) << 16) | words[60] as u32;
    // Model string: words 27..46, bytes swapped within each word.
    let mut model = [0u8; DRIVE_MODEL_MAX];
    for i in 0..20 {
        let w = words[27 + i];
        model[i * 2] = (w >> 8) as u8;
        model[i * 2 + 1] = (w & 0xFF) as u8;
    }
    let trimmed = orion_lib::string::trim(&model);
    orion_lib::string::copy_into_padded(&mut out.model, trimmed);
    out.present = out.sector_count > 0;
    out.present
}

/// Probe all four positions once at boot.
pub fn init() {
    let mut found = 0;
    let mut slots = SLOTS.lock();
    for (i, slot) in slots.iter_mut().enumerate() {
        let mut probed = AtaSlot::empty();
        if identify(i, &mut probed) {
            *slot = probed;
            found += 1;
        }
    }
    drop(slots);
    klog_info!("ATA: {} drive(s) present", found);
}

pub fn present(slot: usize) -> bool {
    slot < ATA_SLOTS && SLOTS.lock()[slot].present
}

pub fn sector_count(slot: usize) -> u32 {
    if slot >= ATA_SLOTS {
        return 0;
    }
    SLOTS.lock()[slot].sector_count
}

pub fn model(slot: usize, out: &mut [u8]) -> bool {
    if slot >= ATA_SLOTS {
        return false;
    }
    let slots = SLOTS.lock();
    if !slots[slot].present {
        return false;
    }
    orion_lib::string::copy_into_padded(out, orion_lib::string::trim(&slots[slot].model));
    true
}

fn issue_command(slot: usize, lba: u32, count: u32, command: u8) -> Option<u16> {
    if slot >= ATA_SLOTS || count == 0 || count > 256 {
        return None;
    }
    let (io, _ctrl) = channel_ports(slot);

    if !wait_not_busy(io) {
        return None;
    }
    select(io, slot, lba);
    unsafe {
        // A register value of 0 means 256 sectors.
        Port::<u8>::new(io + REG_SECCOUNT).write((count & 0xFF) as u8);
        Port::<u8>::new(io + REG_LBA_LO).write((lba & 0xFF) as u8);
        Port::<u8>::new(io + REG_LBA_MID).write(((lba >> 8) & 0xFF) as u8);
        Port::<u8>::new(io + REG_LBA_HI).write(((lba >> 16) & 0xFF) as u8);
        Port::<u8>::new(io + REG_COMMAND).write(command);
    }
    Some(io)
}

fn transfer_read(slot: usize, lba: u32, count: u32, buf: &mut [u8]) -> bool {
    let Some(io) = issue_command(slot, lba, count, CMD_READ_SECTORS) else {
        return false;
    };
    let data = Port::<u16>::new(io + REG_DATA);
    for sector in 0..count as usize {
        if !wait_drq(io) {
            return false;
        }
        let dst = &mut buf[sector * 512..sector * 512 + 512];
        for pair in dst.chunks_exact_mut(2) {
            let word = unsafe { data.read() };
            pair.copy_from_slice(&word.to_le_bytes());
        }
    }
    true
}

fn transfer_write(slot: usize, lba: u32, count: u32, buf: &[u8]) -> bool {
    let Some(io) = issue_command(slot, lba, count, CMD_WRITE_SECTORS) else {
        return false;
    };
    let data = Port::<u16>::new(io + REG_DATA);
    for sector in 0..count as usize {
        if !wait_drq(io) {
            return false;
        }
        let src = &buf[sector * 512..sector * 512 + 512];
        for pair in src.chunks_exact(2) {
            let word = u16::from_le_bytes([pair[0], pair[1]]);
            unsafe { data.write(word) };
        }
    }
    unsafe { Port::<u8>::new(io + REG_COMMAND).write(CMD_CACHE_FLUSH) };
    wait_not_busy(io)
}

/// Absolute sector read. `count == 0` means 256.
pub fn read(slot: usize, lba: u32, count: u32, buf: &mut [u8]) -> bool {
    let count = if count == 0 { 256 } else { count };
    if buf.len() < count as usize * 512 {
        return false;
    }
    transfer_read(slot, lba, count, buf)
}

/// Absolute sector write. `count == 0` means 256.
pub fn write(slot: usize, lba: u32, count: u32, buf: &[u8]) -> bool {
    let count = if count == 0 { 256 } else { count };
    if buf.len() < count as usize * 512 {
        return false;
    }
    transfer_write(slot, lba, count, buf)
}

pub fn flush(slot: usize) -> bool {
    if slot >= ATA_SLOTS || !present(slot) {
        return false;
    }
    let (io, _ctrl) = channel_ports(slot);
    if !wait_not_busy(io) {
        return false;
    }
    select(io, slot, 0);
    unsafe { Port::<u8>::new(io + REG_COMMAND).write(CMD_CACHE_FLUSH) };
    wait_not_busy(io)
}
