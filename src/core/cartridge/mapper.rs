use std::{cell::RefCell, rc::Rc};

use crate::core::{
    cartridge::{mappers, CartridgeError, InesHeader, Mirroring},
    Bus, Ppu, Ram,
};

/// The cartridge-side logic behind a loaded iNES image.
///
/// A mapper creates its devices at install time and attaches them to the
/// CPU bus and the PPU's internal bus; bank switching happens inside those
/// devices as the program writes to them. The trait itself only carries the
/// operations the console needs between ticks.
pub trait Mapper {
    /// The iNES mapper ID this mapper implements.
    fn mapper_num(&self) -> u8;
    /// The conventional board name, for diagnostics.
    fn name(&self) -> &'static str;
    /// Reapply the nametable layout after CPU writes may have changed it.
    ///
    /// Called by the console once per CPU cycle; mappers with fixed
    /// mirroring leave the default no-op.
    fn sync(&mut self, ppu: &mut Ppu) {
        let _ = ppu;
    }
    /// Whether the cartridge claims battery-backed PRG RAM.
    fn has_battery_ram(&self) -> bool {
        false
    }
    /// A copy of the battery-backed PRG RAM, if the cartridge has any.
    fn save_ram(&self) -> Option<Vec<u8>> {
        None
    }
    /// Restore previously saved PRG RAM contents.
    fn load_save_ram(&mut self, bytes: &[u8]) {
        let _ = bytes;
    }
}

pub(crate) type ProbeFn = fn(&InesHeader) -> Result<(), CartridgeError>;
pub(crate) type InstallFn = fn(
    &InesHeader,
    &[u8],
    &mut Bus,
    &mut Ppu,
) -> Result<Rc<RefCell<dyn Mapper>>, CartridgeError>;

/// One registered mapper: probe validates the header for it, install creates
/// and attaches its devices.
pub(crate) struct MapperEntry {
    pub id: u8,
    pub name: &'static str,
    pub probe: ProbeFn,
    pub install: InstallFn,
}

/// The mapper registry, looked up by iNES mapper ID at load time.
pub(crate) const MAPPERS: &[MapperEntry] = &[
    MapperEntry {
        id: 0,
        name: "NROM",
        probe: mappers::NRom::probe,
        install: mappers::NRom::install,
    },
    MapperEntry {
        id: 1,
        name: "SxROM",
        probe: mappers::SxRom::probe,
        install: mappers::SxRom::install,
    },
];

/// Attach the two nametable RAMs over the four nametable windows according
/// to a mirroring policy. The PPU itself has no mirroring logic; the layout
/// is entirely in which RAM backs which window.
pub(crate) fn attach_nametables(
    ppu: &mut Ppu,
    nametables: &[Rc<RefCell<Ram>>; 2],
    mirroring: Mirroring,
) {
    let layout: [usize; 4] = match mirroring {
        Mirroring::OneScreenLower => [0, 0, 0, 0],
        Mirroring::OneScreenUpper => [1, 1, 1, 1],
        // Vertical mirroring: $2000=$2800, $2400=$2C00
        Mirroring::Vertical => [0, 1, 0, 1],
        // Horizontal mirroring: $2000=$2400, $2800=$2C00
        Mirroring::Horizontal => [0, 0, 1, 1],
    };
    for (window, nametable) in layout.iter().enumerate() {
        ppu.attach(
            nametables[*nametable].clone(),
            0x2000 + 0x400 * window as u16,
            0x400,
        );
    }
}
