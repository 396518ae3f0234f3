mod common;

use std::time::Duration;

use assert_hex::assert_eq_hex;
use common::{ines, nes_with_program, nrom_prg};
use famicore::core::{Controller, Nes};

const SPIN: [u8; 3] = [0x4C, 0x00, 0x80];

#[test]
fn test_power_on() {
    let nes = nes_with_program(&SPIN);
    assert_eq_hex!(nes.cpu.pc, 0x8000);
    assert_eq_hex!(nes.cpu.s, 0xFD);
    assert_eq_hex!(nes.cpu.p.bits(), 0x24);
}

// The 2 KiB internal RAM mirrors four times over $0000-$1FFF
#[test]
fn test_internal_ram_mirroring() {
    let mut nes = nes_with_program(&SPIN);
    nes.write_byte(0x0005, 0x12);
    assert_eq_hex!(nes.read_byte(0x0805), 0x12);
    assert_eq_hex!(nes.read_byte(0x1005), 0x12);
    assert_eq_hex!(nes.read_byte(0x1805), 0x12);
}

// Reads of unmapped pages return $FF; writes are discarded
#[test]
fn test_unmapped_access() {
    let mut nes = nes_with_program(&SPIN);
    assert_eq_hex!(nes.read_byte(0x5000), 0xFF);
    nes.write_byte(0x5000, 0x12);
    assert_eq_hex!(nes.read_byte(0x5000), 0xFF);
}

// A $4014 write stalls the CPU 513 cycles (odd tick count) and copies the
// page into OAM one byte per cycle
#[test]
fn test_oam_dma() {
    let mut nes = nes_with_program(&SPIN);
    for i in 0..=255u16 {
        nes.write_byte(0x0200 + i, i as u8);
    }
    nes.write_byte(0x2003, 0x00);
    // Land on an odd CPU tick so the stall is 513
    while nes.cpu.ticks() % 2 == 0 {
        nes.tick();
    }
    nes.write_byte(0x4014, 0x02);
    let ticks_before = nes.cpu.ticks();
    let remaining_before = nes.cpu.remaining_cycles();
    // The stall lands on the next CPU cycle
    while nes.cpu.ticks() == ticks_before {
        nes.tick();
    }
    assert_eq!(nes.cpu.remaining_cycles(), remaining_before + 513 - 1);
    // Let the transfer run to completion
    for _ in 0..256 * 12 {
        nes.tick();
    }
    let ppu = nes.ppu();
    for i in 0..=255usize {
        assert_eq_hex!(ppu.oam()[i], i as u8);
    }
}

// $4016 strobe then 8 reads shift the latched buttons out, A first
#[test]
fn test_controller_shift_register() {
    let mut nes = nes_with_program(&SPIN);
    nes.set_controller_state(
        0,
        Controller {
            a: true,
            right: true,
            ..Controller::default()
        },
    );
    nes.write_byte(0x4016, 0x01);
    // While strobing, reads return the live A button
    assert_eq!(nes.read_byte(0x4016) & 1, 1);
    nes.write_byte(0x4016, 0x00);
    let bits: Vec<u8> = (0..8).map(|_| nes.read_byte(0x4016) & 1).collect();
    // A, B, Select, Start, Up, Down, Left, Right
    assert_eq!(bits, vec![1, 0, 0, 0, 0, 0, 0, 1]);
    // An exhausted register shifts in 1s
    assert_eq!(nes.read_byte(0x4016) & 1, 1);

    // Controller 2 is idle
    nes.write_byte(0x4016, 0x01);
    nes.write_byte(0x4016, 0x00);
    assert_eq!((0..8).map(|_| nes.read_byte(0x4017) & 1).sum::<u8>(), 0);
}

// Battery-backed PRG RAM round-trips through save_ram/load_save_ram
#[test]
fn test_save_ram() {
    let rom = ines(0, 2, 1, 0x02, &nrom_prg(&SPIN), &[0; 0x2000]);
    let mut nes = Nes::with_cartridge(&rom).unwrap();
    assert!(nes.mapper().has_battery_ram());
    nes.write_byte(0x6000, 0xAB);
    nes.write_byte(0x7FFF, 0xCD);
    let save = nes.save_ram().unwrap();
    assert_eq!(save.len(), 0x2000);
    assert_eq_hex!(save[0], 0xAB);
    assert_eq_hex!(save[0x1FFF], 0xCD);

    let mut restored = Nes::with_cartridge(&rom).unwrap();
    restored.load_save_ram(&save);
    assert_eq_hex!(restored.read_byte(0x6000), 0xAB);
}

// Cartridges without the battery flag expose no save RAM
#[test]
fn test_no_save_ram_without_battery() {
    let nes = nes_with_program(&SPIN);
    assert!(nes.save_ram().is_none());
}

// Real-time pacing makes progress without running ahead of the master clock
#[test]
fn test_run_realtime() {
    let mut nes = nes_with_program(&SPIN);
    nes.run(Duration::from_millis(5));
    assert!(nes.master_ticks() > 0);
    // 5 ms of a 21.44 MHz clock, with generous slack for slow machines
    assert!(nes.master_ticks() < 21_441_960 / 10);
}
