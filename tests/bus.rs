use std::{cell::RefCell, rc::Rc};

use assert_hex::assert_eq_hex;
use famicore::core::{Bus, BusDevice, Ram, Rom};

// Reads return the last byte written to each address in the mapped range
#[test]
fn test_ram_last_write_wins() {
    let mut bus = Bus::new();
    bus.attach(Rc::new(RefCell::new(Ram::new(0x1000))), 0x0000, 0x1000);
    for addr in (0x0000..0x1000u16).step_by(0x41) {
        bus.write8(addr, addr as u8);
        bus.write8(addr, (addr as u8).wrapping_add(1));
    }
    for addr in (0x0000..0x1000u16).step_by(0x41) {
        assert_eq_hex!(bus.read8(addr), (addr as u8).wrapping_add(1));
    }
}

// A later attach over the same pages routes to the new device and leaves the
// old one untouched
#[test]
fn test_attach_replaces_pages() {
    let mut bus = Bus::new();
    let first = Rc::new(RefCell::new(Ram::new(0x1000)));
    bus.attach(first.clone(), 0x0000, 0x1000);
    bus.write8(0x0123, 0x12);
    let second = Rc::new(RefCell::new(Ram::new(0x1000)));
    bus.attach(second, 0x0000, 0x1000);
    assert_eq_hex!(bus.read8(0x0123), 0xFF);
    bus.write8(0x0123, 0x34);
    assert_eq_hex!(first.borrow_mut().read8(0x0123), 0x12);
}

// Unmapped reads return $FF and unmapped writes are discarded
#[test]
fn test_unmapped_pages() {
    let mut bus = Bus::new();
    assert_eq_hex!(bus.read8(0x1234), 0xFF);
    bus.write8(0x1234, 0x56);
    assert_eq_hex!(bus.read8(0x1234), 0xFF);
}

// 16-bit accesses are little-endian composites of two independent reads,
// including across a device boundary
#[test]
fn test_read16_little_endian() {
    let mut bus = Bus::new();
    bus.attach(Rc::new(RefCell::new(Ram::new(0x100))), 0x0000, 0x100);
    bus.write16(0x0010, 0x1234);
    assert_eq_hex!(bus.read8(0x0010), 0x34);
    assert_eq_hex!(bus.read8(0x0011), 0x12);
    assert_eq_hex!(bus.read16(0x0010), 0x1234);
    // High byte comes from the unmapped page past the device
    bus.write8(0x00FF, 0x42);
    assert_eq_hex!(bus.read16(0x00FF), 0xFF42);
}

// Attach rounds the base down and the size up to page granularity
#[test]
fn test_attach_page_rounding() {
    let mut bus = Bus::new();
    bus.attach(Rc::new(RefCell::new(Ram::new(0x100))), 0x1234, 0x10);
    bus.write8(0x1200, 0x99);
    assert_eq_hex!(bus.read8(0x1200), 0x99);
    bus.write8(0x12FF, 0x77);
    assert_eq_hex!(bus.read8(0x12FF), 0x77);
    assert_eq_hex!(bus.read8(0x1300), 0xFF);
}

// RAM sizes round up to a power of two; attaching over a larger window
// mirrors the device
#[test]
fn test_ram_rounding_and_mirroring() {
    let ram = Ram::new(0x700);
    assert_eq!(ram.size(), 0x800);
    let mut bus = Bus::new();
    bus.attach(Rc::new(RefCell::new(ram)), 0x0000, 0x2000);
    bus.write8(0x0012, 0x34);
    assert_eq_hex!(bus.read8(0x0812), 0x34);
    assert_eq_hex!(bus.read8(0x1812), 0x34);
}

// write_buffer truncates at the device boundary and reports the count
#[test]
fn test_write_buffer_truncation() {
    let mut ram = Ram::new(0x100);
    assert_eq!(ram.write_buffer(0x80, &[0x55; 0x100]), 0x80);
    assert_eq_hex!(ram.bytes()[0xFF], 0x55);
    assert_eq_hex!(ram.bytes()[0x7F], 0xFF);
    assert_eq!(ram.write_buffer(0x100, &[0x55; 4]), 0);
}

// ROM ignores writes and mirrors through its power-of-two mask
#[test]
fn test_rom_read_only_mirroring() {
    let mut image = vec![0u8; 0x4000];
    image[0x0123] = 0xAB;
    let mut bus = Bus::new();
    bus.attach(Rc::new(RefCell::new(Rom::from_bytes(&image))), 0x8000, 0x8000);
    assert_eq_hex!(bus.read8(0x8123), 0xAB);
    assert_eq_hex!(bus.read8(0xC123), 0xAB);
    bus.write8(0x8123, 0x00);
    assert_eq_hex!(bus.read8(0x8123), 0xAB);
}
