use std::{
    cell::{Ref, RefCell},
    rc::Rc,
    time::{Duration, Instant},
};

use crate::core::{
    apu::{OAM_DMA_STALL_EVEN, OAM_DMA_STALL_ODD},
    cartridge, Apu, Bus, CartridgeError, Controller, Cpu, Frame, Mapper, Ppu, Ram,
    CPU_CLOCK_DIVIDER, MASTER_CLOCK_SPEED, PPU_CLOCK_DIVIDER,
};

/// The NES.
///
/// Owns the CPU, the PPU, the APU/IO window and the devices of the loaded
/// cartridge, and keeps them synchronized by driving the master clock: every
/// 4 master ticks the PPU advances one dot, every 12 the CPU advances one
/// cycle. When both land on the same master tick the PPU runs first, so the
/// CPU observes a vblank flag raised in the same tick. The orchestrator also
/// routes the PPU's NMI signal into the CPU and turns OAM-DMA requests into
/// CPU stall credit.
/// ```
/// use famicore::core::Nes;
/// # fn rom() -> Vec<u8> {
/// #     let mut r = vec![b'N', b'E', b'S', 0x1A, 1, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];
/// #     r.extend(vec![0; 0x4000 + 0x2000]);
/// #     r
/// # }
/// let rom: Vec<u8> = rom();
/// let mut nes = Nes::with_cartridge(&rom).unwrap();
/// // Advance by a single master-clock tick
/// nes.tick();
/// ```
pub struct Nes {
    /// CPU of the NES
    pub cpu: Cpu,
    cpu_bus: Bus,
    ppu: Rc<RefCell<Ppu>>,
    apu: Rc<RefCell<Apu>>,
    mapper: Rc<RefCell<dyn Mapper>>,
    master_ticks: u64,
}

impl Nes {
    /// Build a console around an iNES image and power it on.
    ///
    /// Creates the CPU bus (2 KiB internal RAM mirrored over $0000-$1FFF,
    /// PPU registers at $2000-$3FFF, the APU/IO window at $4000-$401F),
    /// installs the cartridge's mapper, and samples the reset vector into
    /// the CPU's PC.
    pub fn with_cartridge(rom: &[u8]) -> Result<Nes, CartridgeError> {
        let mut cpu_bus = Bus::new();
        cpu_bus.attach(Rc::new(RefCell::new(Ram::new(0x800))), 0x0000, 0x2000);
        let ppu = Rc::new(RefCell::new(Ppu::new()));
        cpu_bus.attach(ppu.clone(), 0x2000, 0x2000);
        let apu = Rc::new(RefCell::new(Apu::new()));
        cpu_bus.attach(apu.clone(), 0x4000, 0x20);
        let mapper = cartridge::load_cartridge(rom, &mut cpu_bus, &mut ppu.borrow_mut())?;
        let mut cpu = Cpu::new();
        cpu.power_on(&mut cpu_bus);
        Ok(Nes {
            cpu,
            cpu_bus,
            ppu,
            apu,
            mapper,
            master_ticks: 0,
        })
    }

    /// Advance the console by one master-clock tick.
    pub fn tick(&mut self) {
        if self.master_ticks % PPU_CLOCK_DIVIDER == 0 {
            let mut ppu = self.ppu.borrow_mut();
            ppu.tick();
            if ppu.take_nmi() {
                self.cpu.nmi();
            }
        }
        if self.master_ticks % CPU_CLOCK_DIVIDER == 0 {
            // Pump the DMA shim before the CPU cycle
            if self.apu.borrow_mut().take_dma_request() {
                let stall = if self.cpu.ticks() % 2 == 1 {
                    OAM_DMA_STALL_ODD
                } else {
                    OAM_DMA_STALL_EVEN
                };
                self.cpu.stall(stall);
            }
            let transfer = self.apu.borrow_mut().dma_transfer_addr();
            if let Some(source) = transfer {
                let value = self.cpu_bus.read8(source);
                self.cpu_bus.write8(0x2004, value);
            }
            self.cpu.tick(&mut self.cpu_bus);
            self.mapper.borrow_mut().sync(&mut self.ppu.borrow_mut());
        }
        self.master_ticks += 1;
    }

    /// Advance the console until the PPU completes the next frame.
    pub fn advance_frame(&mut self) {
        let frames = self.ppu.borrow().frames();
        while self.ppu.borrow().frames() == frames {
            self.tick();
        }
    }

    /// Run the console for `duration` of wall-clock time, pacing the master
    /// clock to real time with one monotonic clock sample per iteration.
    pub fn run(&mut self, duration: Duration) {
        let start = Instant::now();
        let base = self.master_ticks;
        loop {
            let elapsed = start.elapsed();
            let target =
                base + (elapsed.as_nanos() * MASTER_CLOCK_SPEED as u128 / 1_000_000_000) as u64;
            while self.master_ticks < target {
                self.tick();
            }
            if elapsed >= duration {
                break;
            }
            std::thread::yield_now();
        }
    }

    /// Update a controller's state.
    ///
    /// The snapshot is latched into the joypad shift registers when the
    /// program drops the strobe bit.
    /// * `num` is the controller number, `0` or `1`
    pub fn set_controller_state(&mut self, num: usize, state: Controller) {
        self.apu.borrow_mut().set_input(num, state);
    }

    /// Register the hook that receives each completed frame.
    pub fn set_frame_hook(&mut self, hook: impl FnMut(&Frame) + 'static) {
        self.ppu.borrow_mut().set_frame_hook(Box::new(hook));
    }

    /// Read a byte of memory given an address in CPU space.
    ///
    /// Not guaranteed to leave the console unchanged, since some reads have
    /// side effects (e.g. PPUSTATUS clears the vblank flag).
    pub fn read_byte(&mut self, addr: u16) -> u8 {
        self.cpu_bus.read8(addr)
    }
    /// Write a byte of memory given an address in CPU space.
    pub fn write_byte(&mut self, addr: u16, value: u8) {
        self.cpu_bus.write8(addr, value);
    }

    /// The console's PPU.
    pub fn ppu(&self) -> Ref<'_, Ppu> {
        self.ppu.borrow()
    }
    /// The installed cartridge mapper.
    pub fn mapper(&self) -> Ref<'_, dyn Mapper> {
        self.mapper.borrow()
    }
    /// Master-clock ticks since power-on.
    pub fn master_ticks(&self) -> u64 {
        self.master_ticks
    }
    /// The battery-backed save RAM of the cartridge, if it has any.
    ///
    /// "Savedata" on this console is just the cartridge's PRG RAM, so hosts
    /// persist these bytes and hand them back through [Nes::load_save_ram].
    pub fn save_ram(&self) -> Option<Vec<u8>> {
        self.mapper.borrow().save_ram()
    }
    /// Restore previously saved PRG RAM contents.
    pub fn load_save_ram(&mut self, bytes: &[u8]) {
        self.mapper.borrow_mut().load_save_ram(bytes);
    }
}
