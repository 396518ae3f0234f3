use std::{cell::RefCell, rc::Rc};

use log::*;

use crate::core::{
    cartridge::{mapper::attach_nametables, CartridgeError, InesHeader, Mapper, Mirroring},
    Bus, BusDevice, Ppu, Ram,
};

/// SxROM cartridge mapper (mapper 1, the MMC1 chip).
///
/// Four internal registers are programmed through a serial interface: each
/// write to $8000-$FFFF deposits one bit (the value's LSB) into a 5-bit load
/// register, LSB first, and the fifth write commits it to the register
/// selected by bits 13-14 of the address. A write with bit 7 set clears the
/// sequence and fixes the last PRG bank at $C000.
///
/// Supports up to 256 KiB of PRG ROM (16 banks of 16 KiB) and 128 KiB of
/// CHR (32 banks of 4 KiB), with runtime-selectable nametable mirroring.
pub struct SxRom {
    // Control register: mirroring, PRG mode, CHR mode
    control: u8,
    chr_bank_0: u8,
    chr_bank_1: u8,
    prg_bank: u8,
    // Serial load register and its write counter
    load: u8,
    load_count: u8,
    prg_rom: Vec<u8>,
    prg_banks: u8,
    chr: Vec<u8>,
    chr_is_ram: bool,
    prg_ram: Rc<RefCell<Ram>>,
    battery: bool,
    nametables: [Rc<RefCell<Ram>>; 2],
    // Control writes change mirroring; applied on the next sync
    mirroring_dirty: bool,
}

// The PRG window at CPU $8000-$FFFF
struct PrgWindow(Rc<RefCell<SxRom>>);

impl BusDevice for PrgWindow {
    fn read8(&mut self, offset: u16) -> u8 {
        self.0.borrow().prg_read(offset)
    }
    fn write8(&mut self, offset: u16, value: u8) {
        self.0.borrow_mut().prg_write(offset, value);
    }
}

// The CHR window at PPU $0000-$1FFF
struct ChrWindow(Rc<RefCell<SxRom>>);

impl BusDevice for ChrWindow {
    fn read8(&mut self, offset: u16) -> u8 {
        self.0.borrow().chr_read(offset)
    }
    fn write8(&mut self, offset: u16, value: u8) {
        self.0.borrow_mut().chr_write(offset, value);
    }
}

impl SxRom {
    pub(crate) fn probe(header: &InesHeader) -> Result<(), CartridgeError> {
        if header.prg_rom_banks == 0 {
            return Err(CartridgeError::InvalidHeaderValue("SxROM requires PRG ROM"));
        }
        if header.prg_rom_banks > 16 {
            return Err(CartridgeError::InvalidHeaderValue(
                "SxROM carries at most 256 KiB of PRG ROM",
            ));
        }
        if header.chr_rom_banks > 16 {
            return Err(CartridgeError::InvalidHeaderValue(
                "SxROM carries at most 128 KiB of CHR",
            ));
        }
        Ok(())
    }

    pub(crate) fn install(
        header: &InesHeader,
        body: &[u8],
        bus: &mut Bus,
        ppu: &mut Ppu,
    ) -> Result<Rc<RefCell<dyn Mapper>>, CartridgeError> {
        let prg_len = header.prg_rom_len();
        let chr_is_ram = header.chr_rom_banks == 0;
        let chr = if chr_is_ram {
            vec![0xFF; 0x2000]
        } else {
            body[prg_len..prg_len + header.chr_rom_len()].to_vec()
        };
        let prg_ram = Rc::new(RefCell::new(Ram::new(0x2000)));
        let nametables = [
            Rc::new(RefCell::new(Ram::new(0x400))),
            Rc::new(RefCell::new(Ram::new(0x400))),
        ];
        let state = Rc::new(RefCell::new(SxRom {
            // Power-on default: fix the last bank at $C000, switch at $8000
            control: 0x0C,
            chr_bank_0: 0,
            chr_bank_1: 0,
            prg_bank: 0,
            load: 0,
            load_count: 0,
            prg_rom: body[..prg_len].to_vec(),
            prg_banks: header.prg_rom_banks,
            chr,
            chr_is_ram,
            prg_ram: prg_ram.clone(),
            battery: header.has_battery_ram(),
            nametables: nametables.clone(),
            mirroring_dirty: false,
        }));
        bus.attach(prg_ram, 0x6000, 0x2000);
        bus.attach(Rc::new(RefCell::new(PrgWindow(state.clone()))), 0x8000, 0x8000);
        ppu.attach(Rc::new(RefCell::new(ChrWindow(state.clone()))), 0x0000, 0x2000);
        attach_nametables(ppu, &nametables, header.mirroring());
        Ok(state)
    }

    fn prg_read(&self, offset: u16) -> u8 {
        let banks = self.prg_banks as usize;
        let index = match (self.control >> 2) & 0x03 {
            // Switch 32 KiB at $8000, ignoring the low bit of the bank number
            0 | 1 => {
                let bank = (self.prg_bank & 0x0E) as usize % banks;
                bank * 0x4000 + offset as usize
            }
            // Fix the first bank at $8000, switch at $C000
            2 => {
                if offset < 0x4000 {
                    offset as usize
                } else {
                    (self.prg_bank as usize % banks) * 0x4000 + (offset as usize & 0x3FFF)
                }
            }
            // Fix the last bank at $C000, switch at $8000
            _ => {
                if offset < 0x4000 {
                    (self.prg_bank as usize % banks) * 0x4000 + offset as usize
                } else {
                    (banks - 1) * 0x4000 + (offset as usize & 0x3FFF)
                }
            }
        };
        self.prg_rom[index % self.prg_rom.len()]
    }

    fn prg_write(&mut self, offset: u16, value: u8) {
        if value & 0x80 != 0 {
            // Reset: clear the load sequence and fix the last bank at $C000
            self.load = 0;
            self.load_count = 0;
            self.control |= 0x0C;
            return;
        }
        // Bit i of the committed value is the i-th write's LSB
        self.load |= (value & 0x01) << self.load_count;
        self.load_count += 1;
        if self.load_count < 5 {
            return;
        }
        let committed = self.load & 0x1F;
        self.load = 0;
        self.load_count = 0;
        // Bits 13-14 of the fifth write's address select the register
        match (offset >> 13) & 0x03 {
            0 => {
                if (self.control ^ committed) & 0x03 != 0 {
                    self.mirroring_dirty = true;
                }
                self.control = committed;
                debug!("SxROM control = {:#07b}", committed);
            }
            1 => self.chr_bank_0 = committed,
            2 => self.chr_bank_1 = committed,
            _ => self.prg_bank = committed & 0x0F,
        }
    }

    fn chr_index(&self, offset: u16) -> usize {
        let index = if self.control & 0x10 == 0 {
            // 8 KiB mode ignores the low bit of the bank number
            (self.chr_bank_0 & 0x1E) as usize * 0x1000 + offset as usize
        } else if offset < 0x1000 {
            self.chr_bank_0 as usize * 0x1000 + offset as usize
        } else {
            self.chr_bank_1 as usize * 0x1000 + (offset as usize & 0x0FFF)
        };
        index % self.chr.len()
    }

    fn chr_read(&self, offset: u16) -> u8 {
        self.chr[self.chr_index(offset)]
    }

    fn chr_write(&mut self, offset: u16, value: u8) {
        if self.chr_is_ram {
            let index = self.chr_index(offset);
            self.chr[index] = value;
        } else {
            trace!("Ignoring write of {:#04X} to CHR ROM", value);
        }
    }

    fn mirroring(&self) -> Mirroring {
        match self.control & 0x03 {
            0 => Mirroring::OneScreenLower,
            1 => Mirroring::OneScreenUpper,
            2 => Mirroring::Vertical,
            _ => Mirroring::Horizontal,
        }
    }
}

impl Mapper for SxRom {
    fn mapper_num(&self) -> u8 {
        1
    }
    fn name(&self) -> &'static str {
        "SxROM"
    }
    fn sync(&mut self, ppu: &mut Ppu) {
        if self.mirroring_dirty {
            attach_nametables(ppu, &self.nametables, self.mirroring());
            self.mirroring_dirty = false;
        }
    }
    fn has_battery_ram(&self) -> bool {
        self.battery
    }
    fn save_ram(&self) -> Option<Vec<u8>> {
        self.battery.then(|| self.prg_ram.borrow().bytes().to_vec())
    }
    fn load_save_ram(&mut self, bytes: &[u8]) {
        self.prg_ram.borrow_mut().write_buffer(0, bytes);
    }
}
