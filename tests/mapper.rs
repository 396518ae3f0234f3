mod common;

use assert_hex::assert_eq_hex;
use common::ines;
use famicore::core::{CartridgeError, Nes};

// A minimal SxROM (mapper 1) image: four 16 KiB PRG banks filled with their
// bank number, sixteen 4 KiB CHR banks likewise, and a spin loop in the
// fixed last bank
fn sxrom_image() -> Vec<u8> {
    let mut prg = vec![0u8; 4 * 0x4000];
    for bank in 0..4 {
        prg[bank * 0x4000..(bank + 1) * 0x4000].fill(bank as u8);
    }
    // Spin loop at $C100, in the bank fixed at $C000 by the reset default
    prg[3 * 0x4000 + 0x100..3 * 0x4000 + 0x103].copy_from_slice(&[0x4C, 0x00, 0xC1]);
    prg[4 * 0x4000 - 4] = 0x00; // reset vector -> $C100
    prg[4 * 0x4000 - 3] = 0xC1;
    let mut chr = vec![0u8; 8 * 0x2000];
    for bank in 0..16 {
        chr[bank * 0x1000..(bank + 1) * 0x1000].fill(bank as u8);
    }
    ines(1, 4, 8, 0, &prg, &chr)
}

// Shift one register value into the mapper, LSB first
fn serial_write(nes: &mut Nes, addr: u16, value: u8) {
    for bit in 0..5 {
        nes.write_byte(addr, (value >> bit) & 0x01);
    }
}

fn load_err(rom: &[u8]) -> CartridgeError {
    match Nes::with_cartridge(rom) {
        Ok(_) => panic!("cartridge unexpectedly loaded"),
        Err(error) => error,
    }
}

#[test]
fn test_invalid_magic() {
    let mut rom = ines(0, 1, 1, 0, &vec![0; 0x4000], &[0; 0x2000]);
    rom[2] = b'X';
    assert_eq!(load_err(&rom), CartridgeError::InvalidHeader);
    assert_eq!(load_err(&[]), CartridgeError::InvalidHeader);
}

#[test]
fn test_unsupported_mapper() {
    let rom = ines(7, 1, 1, 0, &vec![0; 0x4000], &[0; 0x2000]);
    assert_eq!(load_err(&rom), CartridgeError::UnsupportedMapper(7));
}

#[test]
fn test_invalid_header_values() {
    // NROM without PRG ROM
    let rom = ines(0, 0, 1, 0, &[], &[0; 0x2000]);
    assert!(matches!(load_err(&rom), CartridgeError::InvalidHeaderValue(_)));
    // NROM claiming more PRG than the board can carry
    let rom = ines(0, 4, 1, 0, &vec![0; 4 * 0x4000], &[0; 0x2000]);
    assert!(matches!(load_err(&rom), CartridgeError::InvalidHeaderValue(_)));
    // File shorter than the header claims
    let mut rom = ines(0, 2, 1, 0, &vec![0; 2 * 0x4000], &[0; 0x2000]);
    rom.truncate(0x5000);
    assert!(matches!(load_err(&rom), CartridgeError::InvalidHeaderValue(_)));
}

// A 16 KiB NROM image mirrors into $C000-$FFFF
#[test]
fn test_nrom_128_mirroring() {
    let mut prg = vec![0x11u8; 0x4000];
    prg[0x3FFC] = 0x00; // reset vector -> $8000
    prg[0x3FFD] = 0x80;
    prg[0x0123] = 0x77;
    let rom = ines(0, 1, 1, 0, &prg, &[0; 0x2000]);
    let mut nes = Nes::with_cartridge(&rom).unwrap();
    assert_eq_hex!(nes.cpu.pc, 0x8000);
    assert_eq_hex!(nes.read_byte(0x8123), 0x77);
    assert_eq_hex!(nes.read_byte(0xC123), 0x77);
}

// PRG ROM ignores writes
#[test]
fn test_prg_rom_is_read_only() {
    let mut prg = vec![0x11u8; 0x4000];
    prg[0x3FFC] = 0x00;
    prg[0x3FFD] = 0x80;
    let rom = ines(0, 1, 1, 0, &prg, &[0; 0x2000]);
    let mut nes = Nes::with_cartridge(&rom).unwrap();
    nes.write_byte(0x8000, 0x99);
    assert_eq_hex!(nes.read_byte(0x8000), 0x11);
}

// Five writes assemble their LSBs, LSB first, into the register selected by
// bits 13-14 of the last write's address
#[test]
fn test_sxrom_prg_bank_select() {
    let mut nes = Nes::with_cartridge(&sxrom_image()).unwrap();
    // Reset default: switchable bank at $8000, last bank fixed at $C000
    assert_eq_hex!(nes.read_byte(0x8000), 0x00);
    assert_eq_hex!(nes.read_byte(0xC000), 0x03);
    // Select PRG bank 1 (LSBs 1,0,0,0,0 -> 0b00001)
    serial_write(&mut nes, 0xE000, 0x01);
    assert_eq_hex!(nes.read_byte(0x8000), 0x01);
    assert_eq_hex!(nes.read_byte(0xC000), 0x03);
    serial_write(&mut nes, 0xE000, 0x02);
    assert_eq_hex!(nes.read_byte(0x8000), 0x02);
}

// A write with bit 7 set clears the load sequence
#[test]
fn test_sxrom_reset_bit() {
    let mut nes = Nes::with_cartridge(&sxrom_image()).unwrap();
    // Two stray bits, then a reset, then a full sequence
    nes.write_byte(0x8000, 0x01);
    nes.write_byte(0x8000, 0x01);
    nes.write_byte(0x8000, 0x80);
    serial_write(&mut nes, 0xE000, 0x02);
    assert_eq_hex!(nes.read_byte(0x8000), 0x02);
}

// 4 KiB CHR banking through the CHR0 register
#[test]
fn test_sxrom_chr_banking() {
    let mut nes = Nes::with_cartridge(&sxrom_image()).unwrap();
    // Control: 4 KiB CHR mode, PRG mode 3, vertical mirroring (0b11110)
    serial_write(&mut nes, 0x8000, 0x1E);
    // CHR0 = bank 9 (LSBs 1,0,0,1,0)
    serial_write(&mut nes, 0xA000, 0x09);
    nes.write_byte(0x2006, 0x00);
    nes.write_byte(0x2006, 0x00);
    nes.read_byte(0x2007); // prime the read buffer
    assert_eq_hex!(nes.read_byte(0x2007), 0x09);
}

// Committing a new mirroring mode re-attaches the nametables
#[test]
fn test_sxrom_mirroring_switch() {
    let mut nes = Nes::with_cartridge(&sxrom_image()).unwrap();
    // Vertical mirroring, 4 KiB CHR, PRG mode 3
    serial_write(&mut nes, 0x8000, 0x1E);
    // The layout is reapplied on the next CPU cycle
    for _ in 0..12 {
        nes.tick();
    }
    nes.write_byte(0x2006, 0x20);
    nes.write_byte(0x2006, 0x00);
    nes.write_byte(0x2007, 0xAB);
    // Vertical: $2000 and $2800 share a nametable, $2400 does not
    nes.write_byte(0x2006, 0x28);
    nes.write_byte(0x2006, 0x00);
    nes.read_byte(0x2007);
    assert_eq_hex!(nes.read_byte(0x2007), 0xAB);
    nes.write_byte(0x2006, 0x24);
    nes.write_byte(0x2006, 0x00);
    nes.read_byte(0x2007);
    assert_eq_hex!(nes.read_byte(0x2007), 0xFF);
}

// SxROM rejects oversized images
#[test]
fn test_sxrom_size_limits() {
    let rom = ines(1, 17, 0, 0, &vec![0; 17 * 0x4000], &[]);
    assert!(matches!(load_err(&rom), CartridgeError::InvalidHeaderValue(_)));
}
