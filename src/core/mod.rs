//! The actual emulation code, provided as an out-of-the-box library.
//!
//! Contains the entire state of the console and advances it one master-clock
//! tick at a time. The CPU runs at master / 12 and the PPU at master / 4, so
//! bus conflicts, DMA stalls and NMI timing fall out of the interleaving.
//! Completed frames are handed to the host through a frame hook.
//! ```
//! use famicore::core::{Controller, Nes};
//! # fn rom() -> Vec<u8> {
//! #     let mut r = vec![b'N', b'E', b'S', 0x1A, 1, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];
//! #     r.extend(vec![0; 0x4000 + 0x2000]);
//! #     r
//! # }
//! let rom: Vec<u8> = rom();
//! let mut nes = Nes::with_cartridge(&rom).unwrap();
//! // Press the A button on player 1's controller
//! nes.set_controller_state(0, Controller { a: true, ..Controller::default() });
//! // Advance the console by one full frame
//! nes.advance_frame();
//! ```
mod bus;
pub use bus::{Bus, BusDevice, SharedDevice, PAGE_SIZE};
mod ram;
pub use ram::{Ram, Rom};
mod status_register;
pub use status_register::StatusRegister;
pub mod opcodes;
mod cpu;
pub use cpu::Cpu;
mod palette;
pub use palette::{Rgb, SYSTEM_PALETTE};
mod ppu;
pub use ppu::{Frame, Ppu};
mod apu;
pub use apu::{Apu, OAM_DMA_STALL_EVEN, OAM_DMA_STALL_ODD};
mod controller;
pub use controller::Controller;
mod cartridge;
pub use cartridge::*;
mod nes;
pub use nes::Nes;

/// Master clock rate in Hz. The CPU divides this by 12, the PPU by 4.
pub const MASTER_CLOCK_SPEED: u32 = 21_441_960;
/// Master clock ticks per PPU dot.
pub const PPU_CLOCK_DIVIDER: u64 = 4;
/// Master clock ticks per CPU cycle.
pub const CPU_CLOCK_DIVIDER: u64 = 12;

/// Address of the NMI vector.
pub const NMI_VECTOR: u16 = 0xFFFA;
/// Address of the reset vector, sampled into the PC at power-on.
pub const RESET_VECTOR: u16 = 0xFFFC;
/// Address of the IRQ/BRK vector.
pub const IRQ_VECTOR: u16 = 0xFFFE;
