use log::*;

use crate::core::BusDevice;

/// A linear RAM device.
///
/// The size is rounded up to a power of two so offsets can be masked instead
/// of taken modulo. Attaching a RAM over a window larger than itself mirrors
/// it for free: the 2 KiB internal RAM attached over 8 KiB appears four times.
/// Memory is initialised to `0xFF`, the undefined-DRAM convention.
/// ```
/// use famicore::core::Ram;
/// let ram = Ram::new(0x700);
/// assert_eq!(ram.size(), 0x800);
/// ```
pub struct Ram {
    data: Vec<u8>,
}

impl Ram {
    /// Create a RAM device of at least `size` bytes.
    pub fn new(size: usize) -> Ram {
        Ram {
            data: vec![0xFF; size.next_power_of_two()],
        }
    }
    /// The actual (rounded) size in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }
    /// Copy `bytes` into the device starting at `offset`, truncating at the
    /// device boundary. Returns the number of bytes written.
    ///
    /// Used by mappers to preload ROM images at cartridge-install time.
    pub fn write_buffer(&mut self, offset: usize, bytes: &[u8]) -> usize {
        if offset >= self.data.len() {
            return 0;
        }
        let count = bytes.len().min(self.data.len() - offset);
        self.data[offset..offset + count].copy_from_slice(&bytes[..count]);
        count
    }
    /// The raw contents, e.g. for persisting battery-backed PRG RAM.
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }
}

impl BusDevice for Ram {
    fn read8(&mut self, offset: u16) -> u8 {
        self.data[offset as usize & (self.data.len() - 1)]
    }
    fn write8(&mut self, offset: u16, value: u8) {
        let i = offset as usize & (self.data.len() - 1);
        self.data[i] = value;
    }
}

/// A read-only sibling of [Ram] for mapper PRG/CHR ROM windows.
///
/// Offsets mask the same way, so a 16 KiB ROM attached over a 32 KiB window
/// mirrors twice. Writes are discarded, as the cartridge hardware ignores
/// them.
pub struct Rom {
    data: Vec<u8>,
}

impl Rom {
    /// Create a ROM from an image, padded with `0xFF` up to a power of two.
    pub fn from_bytes(bytes: &[u8]) -> Rom {
        let mut data = bytes.to_vec();
        data.resize(bytes.len().next_power_of_two(), 0xFF);
        Rom { data }
    }
}

impl BusDevice for Rom {
    fn read8(&mut self, offset: u16) -> u8 {
        self.data[offset as usize & (self.data.len() - 1)]
    }
    fn write8(&mut self, offset: u16, value: u8) {
        trace!("Ignoring write of {:#04X} to ROM offset {:#06X}", value, offset);
    }
}
