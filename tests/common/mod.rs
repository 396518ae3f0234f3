#![allow(dead_code)]
use std::{cell::RefCell, rc::Rc};

use famicore::core::{Bus, Cpu, Nes, Ram};

/// Assemble an iNES image in memory.
pub fn ines(mapper: u8, prg_banks: u8, chr_banks: u8, flags_6_low: u8, prg: &[u8], chr: &[u8]) -> Vec<u8> {
    assert_eq!(prg.len(), prg_banks as usize * 0x4000);
    assert_eq!(chr.len(), chr_banks as usize * 0x2000);
    let mut image = vec![
        b'N',
        b'E',
        b'S',
        0x1A,
        prg_banks,
        chr_banks,
        ((mapper & 0x0F) << 4) | (flags_6_low & 0x0F),
        mapper & 0xF0,
        0,
        0,
        0,
        0,
        0,
        0,
        0,
        0,
    ];
    image.extend_from_slice(prg);
    image.extend_from_slice(chr);
    image
}

/// A 32 KiB NROM PRG image: `program` at $8000, a JMP loop at the NMI
/// handler ($8100) and the IRQ handler ($8200), vectors filled in.
pub fn nrom_prg(program: &[u8]) -> Vec<u8> {
    let mut prg = vec![0xEA; 0x8000];
    prg[..program.len()].copy_from_slice(program);
    // NMI handler: JMP $8100
    prg[0x100..0x103].copy_from_slice(&[0x4C, 0x00, 0x81]);
    // IRQ handler: JMP $8200
    prg[0x200..0x203].copy_from_slice(&[0x4C, 0x00, 0x82]);
    prg[0x7FFA..0x8000].copy_from_slice(&[
        0x00, 0x81, // NMI -> $8100
        0x00, 0x80, // reset -> $8000
        0x00, 0x82, // IRQ -> $8200
    ]);
    prg
}

/// A powered-on console running `program` from $8000 on an NROM cartridge.
pub fn nes_with_program(program: &[u8]) -> Nes {
    let rom = ines(0, 2, 1, 0, &nrom_prg(program), &[0; 0x2000]);
    Nes::with_cartridge(&rom).unwrap()
}

/// A bare CPU over 64 KiB of RAM, with `program` at $8000 and the reset
/// vector pointing at it. For exercising the CPU without the rest of the
/// console.
pub fn cpu_with_program(program: &[u8]) -> (Cpu, Bus) {
    let mut bus = Bus::new();
    bus.attach(Rc::new(RefCell::new(Ram::new(0x10000))), 0x0000, 0x10000);
    bus.write16(0xFFFC, 0x8000);
    for (i, byte) in program.iter().enumerate() {
        bus.write8(0x8000 + i as u16, *byte);
    }
    let mut cpu = Cpu::new();
    cpu.power_on(&mut bus);
    (cpu, bus)
}

/// Run one full instruction (or interrupt service), returning the cycles it
/// consumed.
pub fn step_instruction(cpu: &mut Cpu, bus: &mut Bus) -> u32 {
    cpu.tick(bus);
    let mut cycles = 1;
    while cpu.remaining_cycles() > 0 {
        cpu.tick(bus);
        cycles += 1;
    }
    cycles
}

/// Run master ticks until the PPU has just processed (`scanline`, `dot`).
pub fn run_to_dot(nes: &mut Nes, scanline: u32, dot: u32) {
    let (next_scanline, next_dot) = if dot == 340 {
        ((scanline + 1) % 262, 0)
    } else {
        (scanline, dot + 1)
    };
    while !(nes.ppu().scanline() == next_scanline && nes.ppu().dot() == next_dot) {
        nes.tick();
    }
}
