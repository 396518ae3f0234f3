//! Cartridge loading: iNES header parsing and mapper dispatch.
mod mapper;
pub use mapper::Mapper;
pub mod mappers;

use std::{cell::RefCell, rc::Rc};

use log::*;
use thiserror::Error;

use crate::core::{Bus, Ppu};

/// Size of the iNES file header.
pub const INES_HEADER_SIZE: usize = 16;
const INES_TRAINER_SIZE: usize = 512;

/// Errors surfaced while loading a cartridge.
///
/// These are the only fallible paths in the core; runtime anomalies
/// (unmapped bus accesses, writes to ROM) are absorbed with the hardware's
/// observable behaviour instead.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CartridgeError {
    /// The file does not start with the iNES magic bytes.
    #[error("invalid iNES header")]
    InvalidHeader,
    /// No mapper with this ID is registered.
    #[error("unsupported mapper {0}")]
    UnsupportedMapper(u8),
    /// A mapper rejected the header's sizes or flags.
    #[error("invalid header value: {0}")]
    InvalidHeaderValue(&'static str),
}

/// How the two nametable RAMs are laid out over the four nametable windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mirroring {
    OneScreenLower,
    OneScreenUpper,
    Vertical,
    Horizontal,
}

/// The fixed 16-byte iNES header.
#[derive(Debug, Clone, Copy)]
pub struct InesHeader {
    /// PRG ROM size in 16 KiB units
    pub prg_rom_banks: u8,
    /// CHR ROM size in 8 KiB units; 0 means the cartridge carries CHR RAM
    pub chr_rom_banks: u8,
    pub flags_6: u8,
    pub flags_7: u8,
    /// PRG RAM size in 8 KiB units
    pub prg_ram_banks: u8,
}

impl InesHeader {
    /// Parse the header at the start of an iNES image.
    pub fn parse(bytes: &[u8]) -> Result<InesHeader, CartridgeError> {
        if bytes.len() < INES_HEADER_SIZE || bytes[0..4] != [b'N', b'E', b'S', 0x1A] {
            return Err(CartridgeError::InvalidHeader);
        }
        let header = InesHeader {
            prg_rom_banks: bytes[4],
            chr_rom_banks: bytes[5],
            flags_6: bytes[6],
            flags_7: bytes[7],
            prg_ram_banks: bytes[8],
        };
        debug!("Cartridge header: {:02X?}", &bytes[0..INES_HEADER_SIZE]);
        debug!(
            "{} KiB PRG ROM, {} KiB CHR ROM, mapper {}, {:?} mirroring",
            header.prg_rom_banks as u32 * 16,
            header.chr_rom_banks as u32 * 8,
            header.mapper_id(),
            header.mirroring()
        );
        if header.flags_6 & 0x08 != 0 {
            warn!("Four-screen nametable flag is set but not supported, using {:?}", header.mirroring());
        }
        Ok(header)
    }
    /// The mapper ID, assembled from the high nibbles of flags 6 and 7.
    pub fn mapper_id(&self) -> u8 {
        (self.flags_6 >> 4) | (self.flags_7 & 0xF0)
    }
    /// The fixed nametable mirroring requested by flags 6 bit 0.
    pub fn mirroring(&self) -> Mirroring {
        if self.flags_6 & 0x01 == 0 {
            Mirroring::Horizontal
        } else {
            Mirroring::Vertical
        }
    }
    /// Whether the cartridge claims battery-backed PRG RAM.
    pub fn has_battery_ram(&self) -> bool {
        self.flags_6 & 0x02 != 0
    }
    /// Whether a 512-byte trainer sits between the header and the PRG ROM.
    pub fn has_trainer(&self) -> bool {
        self.flags_6 & 0x04 != 0
    }
    /// PRG ROM size in bytes.
    pub fn prg_rom_len(&self) -> usize {
        self.prg_rom_banks as usize * 0x4000
    }
    /// CHR ROM size in bytes.
    pub fn chr_rom_len(&self) -> usize {
        self.chr_rom_banks as usize * 0x2000
    }
}

/// Load an iNES image, creating the mapper's devices and attaching them to
/// the CPU bus and the PPU.
///
/// Returns the installed mapper. Devices from a previously loaded cartridge
/// are replaced wherever the new mapper attaches over them.
pub fn load_cartridge(
    bytes: &[u8],
    cpu_bus: &mut Bus,
    ppu: &mut Ppu,
) -> Result<Rc<RefCell<dyn Mapper>>, CartridgeError> {
    let header = InesHeader::parse(bytes)?;
    let id = header.mapper_id();
    let entry = mapper::MAPPERS
        .iter()
        .find(|entry| entry.id == id)
        .ok_or(CartridgeError::UnsupportedMapper(id))?;
    (entry.probe)(&header)?;
    let mut body = &bytes[INES_HEADER_SIZE..];
    if header.has_trainer() {
        if body.len() < INES_TRAINER_SIZE {
            return Err(CartridgeError::InvalidHeaderValue("trainer truncated"));
        }
        body = &body[INES_TRAINER_SIZE..];
    }
    if body.len() < header.prg_rom_len() + header.chr_rom_len() {
        return Err(CartridgeError::InvalidHeaderValue(
            "file shorter than the header claims",
        ));
    }
    debug!("Installing mapper {} ({})", entry.id, entry.name);
    (entry.install)(&header, body, cpu_bus, ppu)
}
