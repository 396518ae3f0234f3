mod common;

use std::{cell::Cell, rc::Rc};

use assert_hex::assert_eq_hex;
use common::{ines, nes_with_program, nrom_prg, run_to_dot};
use famicore::core::{Nes, SYSTEM_PALETTE};

// An infinite loop at the reset handler
const SPIN: [u8; 3] = [0x4C, 0x00, 0x80];

// Two $2006 writes assemble the 14-bit address in t, copy it to v on the
// second write, and leave w back at 0
#[test]
fn test_ppuaddr_writes() {
    let mut nes = nes_with_program(&SPIN);
    assert!(!nes.ppu().write_toggle());
    nes.write_byte(0x2006, 0x21);
    assert!(nes.ppu().write_toggle());
    assert_eq_hex!(nes.ppu().temp_address(), 0x2100);
    nes.write_byte(0x2006, 0x23);
    assert!(!nes.ppu().write_toggle());
    assert_eq_hex!(nes.ppu().temp_address(), 0x2123);
    assert_eq_hex!(nes.ppu().vram_address(), 0x2123);
}

// The top two bits of the first $2006 write are dropped
#[test]
fn test_ppuaddr_masks_to_14_bits() {
    let mut nes = nes_with_program(&SPIN);
    nes.write_byte(0x2006, 0xFF);
    nes.write_byte(0x2006, 0x00);
    assert_eq_hex!(nes.ppu().vram_address(), 0x3F00);
}

// $2005 routes fine X/coarse X into t on the first write and the Y fields
// on the second
#[test]
fn test_ppuscroll_writes() {
    let mut nes = nes_with_program(&SPIN);
    nes.write_byte(0x2005, 0x7D); // coarse X = 15, fine X = 5
    assert_eq!(nes.ppu().fine_x(), 5);
    assert_eq_hex!(nes.ppu().temp_address() & 0x1F, 15);
    assert!(nes.ppu().write_toggle());
    nes.write_byte(0x2005, 0x5E); // coarse Y = 11, fine Y = 6
    assert_eq_hex!((nes.ppu().temp_address() >> 5) & 0x1F, 11);
    assert_eq_hex!((nes.ppu().temp_address() >> 12) & 0x07, 6);
    assert!(!nes.ppu().write_toggle());
}

// Reading $2002 clears the vblank flag and resets the write toggle
#[test]
fn test_ppustatus_read_side_effects() {
    let mut nes = nes_with_program(&SPIN);
    nes.write_byte(0x2006, 0x21);
    assert!(nes.ppu().write_toggle());
    nes.read_byte(0x2002);
    assert!(!nes.ppu().write_toggle());

    run_to_dot(&mut nes, 241, 1);
    assert_eq!(nes.read_byte(0x2002) & 0x80, 0x80);
    assert_eq!(nes.read_byte(0x2002) & 0x80, 0x00);
}

// PPUDATA reads outside the palette are delayed through the read buffer;
// palette reads are direct
#[test]
fn test_ppudata_read_buffer() {
    let mut nes = nes_with_program(&SPIN);
    // Write $55 to $2000 in VRAM
    nes.write_byte(0x2006, 0x20);
    nes.write_byte(0x2006, 0x00);
    nes.write_byte(0x2007, 0x55);
    // Reads lag by one access
    nes.write_byte(0x2006, 0x20);
    nes.write_byte(0x2006, 0x00);
    nes.read_byte(0x2007);
    assert_eq_hex!(nes.read_byte(0x2007), 0x55);

    // Palette reads return immediately
    nes.write_byte(0x2006, 0x3F);
    nes.write_byte(0x2006, 0x00);
    nes.write_byte(0x2007, 0x21);
    nes.write_byte(0x2006, 0x3F);
    nes.write_byte(0x2006, 0x00);
    assert_eq_hex!(nes.read_byte(0x2007), 0x21);
}

// PPUCTRL bit 2 switches the post-access increment from 1 to 32
#[test]
fn test_ppudata_increment() {
    let mut nes = nes_with_program(&SPIN);
    nes.write_byte(0x2006, 0x20);
    nes.write_byte(0x2006, 0x00);
    nes.write_byte(0x2007, 0x00);
    assert_eq_hex!(nes.ppu().vram_address(), 0x2001);
    nes.write_byte(0x2000, 0x04);
    nes.write_byte(0x2007, 0x00);
    assert_eq_hex!(nes.ppu().vram_address(), 0x2021);
}

// $3F10/$3F14/$3F18/$3F1C alias their background counterparts
#[test]
fn test_palette_mirroring() {
    let mut nes = nes_with_program(&SPIN);
    nes.write_byte(0x2006, 0x3F);
    nes.write_byte(0x2006, 0x10);
    nes.write_byte(0x2007, 0x2A);
    nes.write_byte(0x2006, 0x3F);
    nes.write_byte(0x2006, 0x00);
    assert_eq_hex!(nes.read_byte(0x2007), 0x2A);
}

// OAM is written through $2003/$2004 with auto-increment
#[test]
fn test_oam_writes() {
    let mut nes = nes_with_program(&SPIN);
    nes.write_byte(0x2003, 0x10);
    nes.write_byte(0x2004, 0xAA);
    nes.write_byte(0x2004, 0xBB);
    assert_eq_hex!(nes.ppu().oam()[0x10], 0xAA);
    assert_eq_hex!(nes.ppu().oam()[0x11], 0xBB);
    // Reads do not increment the pointer
    nes.write_byte(0x2003, 0x10);
    assert_eq_hex!(nes.read_byte(0x2004), 0xAA);
    assert_eq_hex!(nes.read_byte(0x2004), 0xAA);
}

// Exactly one frame is delivered per 341x262 dots, and the NMI is latched
// into the CPU at (241, 1)
#[test]
fn test_vblank_nmi_and_frame_delivery() {
    let mut nes = nes_with_program(&SPIN);
    let frames = Rc::new(Cell::new(0u32));
    let counter = frames.clone();
    nes.set_frame_hook(move |_frame| counter.set(counter.get() + 1));
    nes.write_byte(0x2000, 0x80); // NMI on vblank
    nes.write_byte(0x2001, 0x08); // background rendering on

    // 341 * 262 dots, 4 master ticks per dot
    for _ in 0..341u32 * 262 * 4 {
        nes.tick();
    }
    assert_eq!(frames.get(), 1);

    // The CPU must have entered the NMI handler at $8100
    assert!((0x8100..0x8103).contains(&nes.cpu.pc), "PC = {:#06X}", nes.cpu.pc);
}

// The pushed status byte of the vblank NMI has B clear and U set
#[test]
fn test_vblank_nmi_pushed_status() {
    let mut nes = nes_with_program(&SPIN);
    nes.write_byte(0x2000, 0x80);
    run_to_dot(&mut nes, 241, 1);
    // Let the CPU reach the next instruction boundary and service the NMI
    while !(0x8100..0x8103).contains(&nes.cpu.pc) {
        nes.tick();
    }
    assert_eq_hex!(nes.cpu.s, 0xFA);
    let pushed = nes.read_byte(0x0100 + nes.cpu.s as u16 + 1);
    assert_eq!(pushed & 0x10, 0);
    assert_eq!(pushed & 0x20, 0x20);
    // Pushed return address points back into the spin loop
    let pcl = nes.read_byte(0x0100 + nes.cpu.s as u16 + 2) as u16;
    let pch = nes.read_byte(0x0100 + nes.cpu.s as u16 + 3) as u16;
    assert!((0x8000..0x8003).contains(&((pch << 8) | pcl)));
}

// Scanline 0 dot 0 is skipped on odd frames iff rendering is enabled
#[test]
fn test_odd_frame_dot_skip() {
    // Rendering enabled: the first frame after power-on is followed by an
    // odd frame that is one dot short
    let mut nes = nes_with_program(&SPIN);
    nes.write_byte(0x2001, 0x08);
    assert_eq!(dots_between_frames(&mut nes), (341 * 262 - 1, 341 * 262));

    // Rendering disabled: every frame is full length
    let mut nes = nes_with_program(&SPIN);
    assert_eq!(dots_between_frames(&mut nes), (341 * 262, 341 * 262));
}

// PPU dots between the first, second and third frame deliveries
fn dots_between_frames(nes: &mut Nes) -> (u64, u64) {
    let mut stamps = Vec::new();
    for target in 1..=3 {
        while nes.ppu().frames() < target {
            nes.tick();
        }
        stamps.push(nes.master_ticks() / 4);
    }
    (stamps[1] - stamps[0], stamps[2] - stamps[1])
}

// Background rendering: a solid tile through palette 0 produces the
// expected system colour in the frame buffer
#[test]
fn test_background_rendering() {
    // CHR: tile 1 has all pixels set to colour index 1
    let mut chr = vec![0u8; 0x2000];
    chr[16..24].fill(0xFF);
    let rom = ines(0, 2, 1, 0, &nrom_prg(&SPIN), &chr);
    let mut nes = Nes::with_cartridge(&rom).unwrap();

    // Fill nametable 0 with tile 1 and clear its attribute table
    nes.write_byte(0x2006, 0x20);
    nes.write_byte(0x2006, 0x00);
    for _ in 0..0x3C0 {
        nes.write_byte(0x2007, 0x01);
    }
    for _ in 0..0x40 {
        nes.write_byte(0x2007, 0x00);
    }
    // Palette: universal background black, palette 0 colour 1 = $21
    nes.write_byte(0x2006, 0x3F);
    nes.write_byte(0x2006, 0x00);
    nes.write_byte(0x2007, 0x0F);
    nes.write_byte(0x2007, 0x21);
    // Reset the scroll registers so t points at nametable 0 again
    nes.write_byte(0x2000, 0x00);
    nes.write_byte(0x2005, 0x00);
    nes.write_byte(0x2005, 0x00);
    // Enable the background, including the leftmost columns
    nes.write_byte(0x2001, 0x0A);

    // The first frame starts mid-state; the second renders from a clean
    // pre-render copy of t into v
    nes.advance_frame();
    nes.advance_frame();
    let ppu = nes.ppu();
    let frame = ppu.frame_buffer();
    assert_eq!(frame[100][100], SYSTEM_PALETTE[0x21]);
    assert_eq!(frame[239][255], SYSTEM_PALETTE[0x21]);
}

// An opaque sprite 0 over an opaque background sets the sprite-0-hit flag
#[test]
fn test_sprite_zero_hit() {
    let mut chr = vec![0u8; 0x2000];
    chr[16..24].fill(0xFF);
    let rom = ines(0, 2, 1, 0, &nrom_prg(&SPIN), &chr);
    let mut nes = Nes::with_cartridge(&rom).unwrap();

    nes.write_byte(0x2006, 0x20);
    nes.write_byte(0x2006, 0x00);
    for _ in 0..0x3C0 {
        nes.write_byte(0x2007, 0x01);
    }
    // Sprite 0: top-left corner at (50, 50), tile 1
    nes.write_byte(0x2003, 0x00);
    nes.write_byte(0x2004, 49); // Y is one less than the drawn line
    nes.write_byte(0x2004, 0x01);
    nes.write_byte(0x2004, 0x00);
    nes.write_byte(0x2004, 50);
    // Point t back at nametable 0, enable background and sprites
    nes.write_byte(0x2000, 0x00);
    nes.write_byte(0x2005, 0x00);
    nes.write_byte(0x2005, 0x00);
    nes.write_byte(0x2001, 0x1E);

    assert_eq!(nes.read_byte(0x2002) & 0x40, 0);
    nes.advance_frame();
    nes.advance_frame();
    assert_eq!(nes.read_byte(0x2002) & 0x40, 0x40);
}
