use std::{cell::RefCell, rc::Rc};

use crate::core::{
    cartridge::{mapper::attach_nametables, CartridgeError, InesHeader, Mapper},
    Bus, Ppu, Ram, Rom,
};

/// NROM cartridge mapper (mapper 0).
///
/// No bank switching: 16 or 32 KiB of PRG ROM at $8000 (a 16 KiB image
/// mirrors into $C000-$FFFF), 8 KiB of PRG RAM at $6000, 8 KiB of CHR ROM
/// or RAM at PPU $0000 and fixed nametable mirroring from the header flag.
pub struct NRom {
    prg_ram: Rc<RefCell<Ram>>,
    battery: bool,
}

impl NRom {
    pub(crate) fn probe(header: &InesHeader) -> Result<(), CartridgeError> {
        if header.prg_rom_banks == 0 {
            return Err(CartridgeError::InvalidHeaderValue("NROM requires PRG ROM"));
        }
        if header.prg_rom_banks > 2 {
            return Err(CartridgeError::InvalidHeaderValue(
                "NROM carries at most 32 KiB of PRG ROM",
            ));
        }
        if header.chr_rom_banks > 1 {
            return Err(CartridgeError::InvalidHeaderValue(
                "NROM carries at most 8 KiB of CHR",
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
        // An NROM-128 image mirrors into $C000-$FFFF through the
        // power-of-two offset mask
        let prg_rom = Rc::new(RefCell::new(Rom::from_bytes(&body[..prg_len])));
        bus.attach(prg_rom, 0x8000, 0x8000);
        let prg_ram = Rc::new(RefCell::new(Ram::new(0x2000)));
        bus.attach(prg_ram.clone(), 0x6000, 0x2000);
        if header.chr_rom_banks > 0 {
            let chr = Rc::new(RefCell::new(Rom::from_bytes(
                &body[prg_len..prg_len + 0x2000],
            )));
            ppu.attach(chr, 0x0000, 0x2000);
        } else {
            ppu.attach(Rc::new(RefCell::new(Ram::new(0x2000))), 0x0000, 0x2000);
        }
        let nametables = [
            Rc::new(RefCell::new(Ram::new(0x400))),
            Rc::new(RefCell::new(Ram::new(0x400))),
        ];
        attach_nametables(ppu, &nametables, header.mirroring());
        Ok(Rc::new(RefCell::new(NRom {
            prg_ram,
            battery: header.has_battery_ram(),
        })))
    }
}

impl Mapper for NRom {
    fn mapper_num(&self) -> u8 {
        0
    }
    fn name(&self) -> &'static str {
        "NROM"
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
