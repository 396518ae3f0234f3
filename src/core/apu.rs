use log::*;

use crate::core::{BusDevice, Controller};

/// CPU cycles an OAM-DMA transfer stalls the CPU for, by tick parity.
pub const OAM_DMA_STALL_ODD: u32 = 513;
pub const OAM_DMA_STALL_EVEN: u32 = 514;

const REG_OAMDMA: u16 = 0x14;
const REG_JOY1: u16 = 0x16;
const REG_JOY2: u16 = 0x17;

/// The APU/IO register window at CPU $4000-$401F.
///
/// Audio synthesis is not part of the core; this device carries the two
/// pieces of the window the rest of the machine depends on: the joypad
/// shift registers behind $4016/$4017 and the OAM-DMA trigger at $4014.
///
/// While the strobe bit is high, reads return the live state of the A
/// button; when it falls, the current input snapshot is latched and reads
/// shift it out one bit at a time, A first. $4014 writes schedule a 256-byte
/// transfer that the console pumps one byte per CPU cycle while the CPU is
/// stalled.
pub struct Apu {
    // Live host input, sampled while the strobe is high
    input: [Controller; 2],
    // Latched shift registers, shifted out MSB first
    shift: [u8; 2],
    strobe: bool,
    // $4014 write waiting for the console to schedule the stall
    dma_request: Option<u8>,
    // Source address of the in-flight transfer
    dma_addr: Option<u16>,
}

impl Default for Apu {
    fn default() -> Self {
        Self::new()
    }
}

impl Apu {
    /// Create the register window with no buttons pressed and no DMA pending.
    pub fn new() -> Apu {
        Apu {
            input: [Controller::new(); 2],
            shift: [0; 2],
            strobe: false,
            dma_request: None,
            dma_addr: None,
        }
    }
    /// Update the host-side input snapshot for one controller.
    pub fn set_input(&mut self, num: usize, state: Controller) {
        self.input[num] = state;
    }
    /// Take a freshly written OAM-DMA request, arming the transfer.
    ///
    /// Returns [true] once per $4014 write; the caller applies the CPU
    /// stall.
    pub fn take_dma_request(&mut self) -> bool {
        match self.dma_request.take() {
            Some(page) => {
                self.dma_addr = Some((page as u16) << 8);
                true
            }
            None => false,
        }
    }
    /// The source address of this cycle's DMA byte, advancing the transfer.
    ///
    /// Returns [None] once all 256 bytes have been copied; the pending
    /// address is cleared on the final byte.
    pub fn dma_transfer_addr(&mut self) -> Option<u16> {
        let addr = self.dma_addr?;
        self.dma_addr = if addr & 0xFF == 0xFF { None } else { Some(addr + 1) };
        Some(addr)
    }

    fn read_joypad(&mut self, num: usize) -> u8 {
        if self.strobe {
            return self.input[num].a as u8;
        }
        let bit = self.shift[num] >> 7;
        // Shift in 1s once the register is exhausted
        self.shift[num] = (self.shift[num] << 1) | 0x01;
        bit
    }
}

impl BusDevice for Apu {
    fn read8(&mut self, offset: u16) -> u8 {
        match offset & 0x1F {
            REG_JOY1 => self.read_joypad(0),
            REG_JOY2 => self.read_joypad(1),
            reg => {
                trace!("Read of unimplemented APU register {:#04X}", reg);
                0
            }
        }
    }

    fn write8(&mut self, offset: u16, value: u8) {
        match offset & 0x1F {
            REG_OAMDMA => self.dma_request = Some(value),
            REG_JOY1 => {
                let strobe = value & 0x01 != 0;
                if self.strobe && !strobe {
                    // Falling edge latches the snapshot
                    self.shift = [self.input[0].to_byte(), self.input[1].to_byte()];
                }
                self.strobe = strobe;
            }
            reg => trace!(
                "Write of {:#04X} to unimplemented APU register {:#04X}",
                value,
                reg
            ),
        }
    }
}
