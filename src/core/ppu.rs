use bitflags::bitflags;
use log::*;

use crate::core::{Bus, BusDevice, Rgb, SharedDevice, SYSTEM_PALETTE};

/// Number of dots per scanline
const DOTS_PER_SCANLINE: u32 = 341;
/// Number of scanlines per frame
const SCANLINES_PER_FRAME: u32 = 262;
/// Index of the pre-render scanline
const PRERENDER_SCANLINE: u32 = SCANLINES_PER_FRAME - 1;
/// Number of visible scanlines
const RENDER_SCANLINES: u32 = 240;
/// First scanline of the vertical blanking interval
const VBLANK_SCANLINE: u32 = 241;

/// One frame of PPU output: 240 rows of 256 [Rgb] pixels.
pub type Frame = [[Rgb; 256]; 240];

bitflags! {
    /// PPUCTRL ($2000)
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct Ctrl: u8 {
        const NAMETABLE_X = 0x01;
        const NAMETABLE_Y = 0x02;
        /// 0: add 1 to v after PPUDATA access, 1: add 32
        const INCREMENT = 0x04;
        /// Pattern table used by 8x8 sprites
        const SPRITE_TABLE = 0x08;
        /// Pattern table used by the background
        const BACKGROUND_TABLE = 0x10;
        /// 0: 8x8 sprites, 1: 8x16
        const SPRITE_SIZE = 0x20;
        const MASTER_SLAVE = 0x40;
        /// Raise an NMI at the start of vblank
        const NMI = 0x80;
    }
}

bitflags! {
    /// PPUMASK ($2001)
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct Mask: u8 {
        const GRAYSCALE = 0x01;
        /// Show the background in the leftmost 8 pixels
        const BACKGROUND_LEFTMOST = 0x02;
        /// Show sprites in the leftmost 8 pixels
        const SPRITES_LEFTMOST = 0x04;
        const BACKGROUND = 0x08;
        const SPRITES = 0x10;
        const EMPHASIZE_RED = 0x20;
        const EMPHASIZE_GREEN = 0x40;
        const EMPHASIZE_BLUE = 0x80;
    }
}

bitflags! {
    /// PPUSTATUS ($2002)
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct Status: u8 {
        const SPRITE_OVERFLOW = 0x20;
        const SPRITE_ZERO_HIT = 0x40;
        const VBLANK = 0x80;
    }
}

/// The 15-bit VRAM address register, bitfielded as
/// `fine_y (3) | nametable (2) | coarse_y (5) | coarse_x (5)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct VramAddress(u16);

impl VramAddress {
    fn raw(self) -> u16 {
        self.0
    }
    fn set_raw(&mut self, value: u16) {
        self.0 = value & 0x7FFF;
    }
    fn coarse_x(self) -> u16 {
        self.0 & 0x1F
    }
    fn set_coarse_x(&mut self, value: u16) {
        self.0 = (self.0 & !0x001F) | (value & 0x1F);
    }
    fn coarse_y(self) -> u16 {
        (self.0 >> 5) & 0x1F
    }
    fn set_coarse_y(&mut self, value: u16) {
        self.0 = (self.0 & !0x03E0) | ((value & 0x1F) << 5);
    }
    fn fine_y(self) -> u16 {
        (self.0 >> 12) & 0x07
    }
    fn set_fine_y(&mut self, value: u16) {
        self.0 = (self.0 & !0x7000) | ((value & 0x07) << 12);
    }
    fn toggle_nametable_x(&mut self) {
        self.0 ^= 0x0400;
    }
    fn toggle_nametable_y(&mut self) {
        self.0 ^= 0x0800;
    }
}

// One opaque sprite pixel on the scanline being prepared
#[derive(Debug, Clone, Copy)]
struct SpritePixel {
    // Index of the sprite in OAM, for sprite 0 hit detection
    oam_index: u8,
    // Palette RAM index ($10..$1F)
    palette_index: u8,
    // Sprite renders behind an opaque background pixel
    behind: bool,
}

/// The picture processing unit of the NES.
///
/// A state machine over 262 scanlines of 341 dots each, advanced one dot per
/// [Ppu::tick]. Scanlines 0-239 produce pixels into the frame buffer, 240 is
/// the post-render line where the finished frame is handed to the host,
/// 241-260 are vblank and 261 is the pre-render line.
///
/// The PPU's CPU-visible register window ($2000-$2007, mirrored through
/// $3FFF) is its [BusDevice] implementation, attached to the CPU bus. Pattern
/// tables and nametables live on a separate internal bus that cartridge
/// mappers populate through [Ppu::attach]; palette RAM is internal to the
/// PPU.
pub struct Ppu {
    ctrl: Ctrl,
    mask: Mask,
    status: Status,
    /// Object attribute memory: 64 sprites of 4 bytes
    oam: [u8; 0x100],
    oam_addr: u8,
    /// Palette RAM, with $3F10/$14/$18/$1C aliased down
    palette: [u8; 0x20],
    // Current and temporary VRAM addresses
    v: VramAddress,
    t: VramAddress,
    fine_x: u8,
    // Shared write toggle of PPUSCROLL/PPUADDR
    w: bool,
    // PPUDATA reads outside the palette are delayed by one access
    read_buffer: u8,
    scanline: u32,
    dot: u32,
    frame_odd: bool,
    nmi_pending: bool,
    // Latches for the tile being fetched
    bg_next_tile_id: u8,
    bg_next_tile_attrib: u8,
    bg_next_tile_lsb: u8,
    bg_next_tile_msb: u8,
    // Background shift registers
    bg_shift_pat_lo: u16,
    bg_shift_pat_hi: u16,
    bg_shift_at_lo: u16,
    bg_shift_at_hi: u16,
    // Sprites evaluated for the scanline below the current one
    sprite_line: [Option<SpritePixel>; 256],
    frame: Box<Frame>,
    frames: u64,
    frame_hook: Option<Box<dyn FnMut(&Frame)>>,
    bus: Bus,
}

impl Default for Ppu {
    fn default() -> Self {
        Self::new()
    }
}

impl Ppu {
    /// Create a PPU at dot 0 of scanline 0 with an empty internal bus.
    pub fn new() -> Ppu {
        Ppu {
            ctrl: Ctrl::empty(),
            mask: Mask::empty(),
            status: Status::empty(),
            oam: [0; 0x100],
            oam_addr: 0,
            palette: [0; 0x20],
            v: VramAddress::default(),
            t: VramAddress::default(),
            fine_x: 0,
            w: false,
            read_buffer: 0,
            scanline: 0,
            dot: 0,
            frame_odd: false,
            nmi_pending: false,
            bg_next_tile_id: 0,
            bg_next_tile_attrib: 0,
            bg_next_tile_lsb: 0,
            bg_next_tile_msb: 0,
            bg_shift_pat_lo: 0,
            bg_shift_pat_hi: 0,
            bg_shift_at_lo: 0,
            bg_shift_at_hi: 0,
            sprite_line: [None; 256],
            frame: Box::new([[Rgb::default(); 256]; 240]),
            frames: 0,
            frame_hook: None,
            bus: Bus::new(),
        }
    }
    /// Attach a device to the PPU's internal bus.
    ///
    /// Used by mappers to install pattern tables and nametables. Mirroring
    /// policies are realised by attaching the same nametable RAM at more
    /// than one base.
    pub fn attach(&mut self, device: SharedDevice, base: u16, size: u32) {
        self.bus.attach(device, base, size);
    }
    /// Register the hook that receives each completed frame.
    ///
    /// Called once per frame at the start of the post-render scanline with a
    /// reference to the PPU's own buffer; copy it out to keep it.
    pub fn set_frame_hook(&mut self, hook: Box<dyn FnMut(&Frame)>) {
        self.frame_hook = Some(hook);
    }
    /// The most recently produced frame.
    pub fn frame_buffer(&self) -> &Frame {
        &self.frame
    }
    /// The number of frames completed since power-on.
    pub fn frames(&self) -> u64 {
        self.frames
    }
    /// Take the pending-NMI signal, clearing it.
    pub fn take_nmi(&mut self) -> bool {
        std::mem::take(&mut self.nmi_pending)
    }
    /// The scanline currently being processed, 0-261.
    pub fn scanline(&self) -> u32 {
        self.scanline
    }
    /// The dot currently being processed, 0-340.
    pub fn dot(&self) -> u32 {
        self.dot
    }
    /// Whether the PPU is inside the vertical blanking interval.
    pub fn in_vblank(&self) -> bool {
        (VBLANK_SCANLINE..PRERENDER_SCANLINE).contains(&self.scanline)
    }
    /// The current VRAM address register `v`.
    pub fn vram_address(&self) -> u16 {
        self.v.raw()
    }
    /// The temporary VRAM address register `t`.
    pub fn temp_address(&self) -> u16 {
        self.t.raw()
    }
    /// The fine X scroll, 0-7.
    pub fn fine_x(&self) -> u8 {
        self.fine_x
    }
    /// The shared write toggle of PPUSCROLL and PPUADDR.
    pub fn write_toggle(&self) -> bool {
        self.w
    }
    /// The object attribute memory.
    pub fn oam(&self) -> &[u8; 0x100] {
        &self.oam
    }
    /// Whether background or sprite rendering is enabled.
    pub fn rendering_enabled(&self) -> bool {
        self.mask.intersects(Mask::BACKGROUND | Mask::SPRITES)
    }

    /// Advance the PPU by one dot.
    pub fn tick(&mut self) {
        // Odd frames skip the idle dot of the first scanline while rendering
        if self.scanline == 0 && self.dot == 0 && self.frame_odd && self.rendering_enabled() {
            self.dot = 1;
        }
        // Dot 0 of every scanline is idle
        if self.dot != 0 {
            match self.scanline {
                0..=239 => {
                    self.render_pipeline_tick();
                    if self.dot <= 256 {
                        self.emit_pixel();
                    }
                }
                240 => {
                    if self.dot == 1 {
                        self.emit_frame();
                    }
                }
                241..=260 => {
                    if self.scanline == VBLANK_SCANLINE && self.dot == 1 {
                        self.status.insert(Status::VBLANK);
                        if self.ctrl.contains(Ctrl::NMI) {
                            self.nmi_pending = true;
                        }
                    }
                }
                _ => self.pre_render_tick(),
            }
        }
        if self.dot < DOTS_PER_SCANLINE - 1 {
            self.dot += 1;
        } else {
            self.dot = 0;
            self.scanline = (self.scanline + 1) % SCANLINES_PER_FRAME;
        }
    }

    fn pre_render_tick(&mut self) {
        if self.dot == 1 {
            self.status
                .remove(Status::VBLANK | Status::SPRITE_ZERO_HIT | Status::SPRITE_OVERFLOW);
        } else {
            self.render_pipeline_tick();
        }
        if (280..=304).contains(&self.dot) && self.rendering_enabled() {
            // Copy the vertical bits of t into v
            let vertical = self.t.raw() & 0x7BE0;
            self.v.set_raw((self.v.raw() & !0x7BE0) | vertical);
        }
        if self.dot == DOTS_PER_SCANLINE - 1 {
            self.frame_odd = !self.frame_odd;
        }
    }

    // The fetch/scroll pipeline shared by the visible and pre-render
    // scanlines. All v/t mutations stop when rendering is disabled.
    fn render_pipeline_tick(&mut self) {
        if !self.rendering_enabled() {
            return;
        }
        match self.dot {
            1..=256 | 321..=336 => {
                self.shift_background();
                self.fetch_tick();
            }
            257 => {
                // Copy the horizontal bits of t into v
                let horizontal = self.t.raw() & 0x041F;
                self.v.set_raw((self.v.raw() & !0x041F) | horizontal);
                self.evaluate_sprites();
            }
            _ => {}
        }
        // The sprite units own OAMADDR for the rest of the scanline
        if (257..=320).contains(&self.dot) {
            self.oam_addr = 0;
        }
    }

    // One dot of the 8-dot tile fetch sequence
    fn fetch_tick(&mut self) {
        match (self.dot - 1) & 7 {
            0 => {
                self.bg_next_tile_id = self.bus.read8(0x2000 | (self.v.raw() & 0x0FFF));
            }
            2 => {
                let addr = 0x23C0
                    | (self.v.raw() & 0x0C00)
                    | ((self.v.raw() >> 4) & 0x38)
                    | ((self.v.raw() >> 2) & 0x07);
                let mut attrib = self.bus.read8(addr);
                // Select the 2-bit quadrant
                if self.v.coarse_y() & 0x02 != 0 {
                    attrib >>= 4;
                }
                if self.v.coarse_x() & 0x02 != 0 {
                    attrib >>= 2;
                }
                self.bg_next_tile_attrib = attrib & 0x03;
            }
            4 => self.bg_next_tile_lsb = self.bus.read8(self.pattern_addr()),
            6 => self.bg_next_tile_msb = self.bus.read8(self.pattern_addr() + 8),
            7 => {
                self.reload_shift_registers();
                if self.dot <= 256 || self.dot == 328 || self.dot == 336 {
                    self.increment_horizontal();
                }
            }
            _ => {}
        }
        if self.dot == 256 {
            self.increment_vertical();
        }
    }

    fn pattern_addr(&self) -> u16 {
        let table = self.ctrl.contains(Ctrl::BACKGROUND_TABLE) as u16;
        (table << 12) | ((self.bg_next_tile_id as u16) << 4) | self.v.fine_y()
    }

    fn shift_background(&mut self) {
        if !self.mask.contains(Mask::BACKGROUND) {
            return;
        }
        self.bg_shift_pat_lo <<= 1;
        self.bg_shift_pat_hi <<= 1;
        self.bg_shift_at_lo <<= 1;
        self.bg_shift_at_hi <<= 1;
    }

    // Load the fetched tile into the low byte of the shift registers. The
    // attribute bits are widened to byte granularity.
    fn reload_shift_registers(&mut self) {
        self.bg_shift_pat_lo = (self.bg_shift_pat_lo & 0xFF00) | self.bg_next_tile_lsb as u16;
        self.bg_shift_pat_hi = (self.bg_shift_pat_hi & 0xFF00) | self.bg_next_tile_msb as u16;
        let at_lo = if self.bg_next_tile_attrib & 0x01 != 0 { 0xFF } else { 0x00 };
        let at_hi = if self.bg_next_tile_attrib & 0x02 != 0 { 0xFF } else { 0x00 };
        self.bg_shift_at_lo = (self.bg_shift_at_lo & 0xFF00) | at_lo;
        self.bg_shift_at_hi = (self.bg_shift_at_hi & 0xFF00) | at_hi;
    }

    fn increment_horizontal(&mut self) {
        if self.v.coarse_x() == 31 {
            self.v.set_coarse_x(0);
            self.v.toggle_nametable_x();
        } else {
            let x = self.v.coarse_x();
            self.v.set_coarse_x(x + 1);
        }
    }

    fn increment_vertical(&mut self) {
        if self.v.fine_y() < 7 {
            let y = self.v.fine_y();
            self.v.set_fine_y(y + 1);
        } else {
            self.v.set_fine_y(0);
            match self.v.coarse_y() {
                // Row 29 is the last row of tiles; rows 30-31 hold the
                // attribute tables and wrap without a nametable toggle
                29 => {
                    self.v.set_coarse_y(0);
                    self.v.toggle_nametable_y();
                }
                31 => self.v.set_coarse_y(0),
                y => self.v.set_coarse_y(y + 1),
            }
        }
    }

    // Produce the pixel at (scanline, dot - 1)
    fn emit_pixel(&mut self) {
        if !self.rendering_enabled() {
            return;
        }
        let x = (self.dot - 1) as usize;
        let mut bg_pixel = 0u8;
        let mut bg_palette = 0u8;
        if self.mask.contains(Mask::BACKGROUND)
            && (x >= 8 || self.mask.contains(Mask::BACKGROUND_LEFTMOST))
        {
            let mux = 0x8000u16 >> self.fine_x;
            bg_pixel = (((self.bg_shift_pat_hi & mux) != 0) as u8) << 1
                | ((self.bg_shift_pat_lo & mux) != 0) as u8;
            bg_palette = (((self.bg_shift_at_hi & mux) != 0) as u8) << 1
                | ((self.bg_shift_at_lo & mux) != 0) as u8;
        }
        // Palette RAM index of the winning pixel; zero is the universal
        // background colour
        let mut index = if bg_pixel == 0 { 0 } else { (bg_palette << 2) | bg_pixel };
        if self.mask.contains(Mask::SPRITES) && (x >= 8 || self.mask.contains(Mask::SPRITES_LEFTMOST))
        {
            if let Some(sprite) = self.sprite_line[x] {
                if sprite.oam_index == 0
                    && bg_pixel != 0
                    && x < 255
                    && !self.status.contains(Status::SPRITE_ZERO_HIT)
                {
                    self.status.insert(Status::SPRITE_ZERO_HIT);
                }
                if bg_pixel == 0 || !sprite.behind {
                    index = sprite.palette_index;
                }
            }
        }
        let color = self.palette[Self::palette_index(0x3F00 | index as u16)] & 0x3F;
        self.frame[self.scanline as usize][x] = SYSTEM_PALETTE[color as usize];
    }

    // Evaluate the sprites that fall on the scanline below this one.
    // Runs at dot 257; the hardware's secondary-OAM pass is collapsed into
    // one step with the same observable result.
    fn evaluate_sprites(&mut self) {
        self.sprite_line = [None; 256];
        if self.scanline >= RENDER_SCANLINES {
            // Evaluated on the pre-render line: no sprites reach scanline 0
            return;
        }
        let line = self.scanline as i32;
        let height: i32 = if self.ctrl.contains(Ctrl::SPRITE_SIZE) { 16 } else { 8 };
        let mut count = 0;
        for i in 0..64 {
            let y = self.oam[i * 4] as i32;
            let row = line - y;
            if row < 0 || row >= height {
                continue;
            }
            if count == 8 {
                self.status.insert(Status::SPRITE_OVERFLOW);
                break;
            }
            count += 1;
            let tile = self.oam[i * 4 + 1];
            let attributes = self.oam[i * 4 + 2];
            let sprite_x = self.oam[i * 4 + 3] as usize;
            let row = if attributes & 0x80 != 0 { height - 1 - row } else { row };
            let row = row as u16;
            let addr = if height == 16 {
                // Bit 0 of the tile index selects the pattern table
                let bank = ((tile & 0x01) as u16) << 12;
                let tile = (tile & 0xFE) as u16 + (row >= 8) as u16;
                bank | (tile << 4) | (row & 0x07)
            } else {
                let bank = (self.ctrl.contains(Ctrl::SPRITE_TABLE) as u16) << 12;
                bank | ((tile as u16) << 4) | row
            };
            let mut pattern_lo = self.bus.read8(addr);
            let mut pattern_hi = self.bus.read8(addr + 8);
            if attributes & 0x40 != 0 {
                pattern_lo = pattern_lo.reverse_bits();
                pattern_hi = pattern_hi.reverse_bits();
            }
            for column in 0..8 {
                let pixel =
                    (((pattern_hi >> (7 - column)) & 1) << 1) | ((pattern_lo >> (7 - column)) & 1);
                let x = sprite_x + column;
                if pixel == 0 || x >= 256 {
                    continue;
                }
                // First opaque sprite wins
                if self.sprite_line[x].is_none() {
                    self.sprite_line[x] = Some(SpritePixel {
                        oam_index: i as u8,
                        palette_index: 0x10 | ((attributes & 0x03) << 2) | pixel,
                        behind: attributes & 0x20 != 0,
                    });
                }
            }
        }
    }

    fn emit_frame(&mut self) {
        self.frames += 1;
        if let Some(hook) = self.frame_hook.as_mut() {
            hook(&self.frame);
        }
    }

    fn data_read(&mut self) -> u8 {
        let addr = self.v.raw() & 0x3FFF;
        let result = if addr >= 0x3F00 {
            // Palette reads are not buffered, but the buffer still refills
            // from the nametable underneath
            let value = self.palette[Self::palette_index(addr)] & 0x3F;
            self.read_buffer = self.bus.read8(addr & 0x2FFF);
            value
        } else {
            let buffered = self.read_buffer;
            self.read_buffer = self.bus.read8(Self::mirror_down(addr));
            buffered
        };
        self.increment_v();
        result
    }

    fn data_write(&mut self, value: u8) {
        let addr = self.v.raw() & 0x3FFF;
        if addr >= 0x3F00 {
            self.palette[Self::palette_index(addr)] = value;
        } else {
            self.bus.write8(Self::mirror_down(addr), value);
        }
        self.increment_v();
    }

    // $3000-$3EFF mirrors the nametables
    fn mirror_down(addr: u16) -> u16 {
        if (0x3000..0x3F00).contains(&addr) {
            addr - 0x1000
        } else {
            addr
        }
    }

    // $3F10/$3F14/$3F18/$3F1C alias their background counterparts
    fn palette_index(addr: u16) -> usize {
        let index = (addr & 0x1F) as usize;
        if index >= 0x10 && index % 4 == 0 {
            index - 0x10
        } else {
            index
        }
    }

    fn increment_v(&mut self) {
        let step = if self.ctrl.contains(Ctrl::INCREMENT) { 32 } else { 1 };
        self.v.set_raw(self.v.raw().wrapping_add(step));
    }
}

impl BusDevice for Ppu {
    // The register window at CPU $2000-$3FFF, mirrored every 8 bytes
    fn read8(&mut self, offset: u16) -> u8 {
        match offset & 0x07 {
            2 => {
                let status = self.status.bits() & 0xE0;
                self.status.remove(Status::VBLANK);
                self.w = false;
                status
            }
            4 => self.oam[self.oam_addr as usize],
            7 => self.data_read(),
            _ => 0,
        }
    }

    fn write8(&mut self, offset: u16, value: u8) {
        match offset & 0x07 {
            0 => {
                self.ctrl = Ctrl::from_bits_retain(value);
                // The base nametable select lands in t
                self.t
                    .set_raw((self.t.raw() & !0x0C00) | (((value & 0x03) as u16) << 10));
            }
            1 => self.mask = Mask::from_bits_retain(value),
            3 => self.oam_addr = value,
            4 => {
                self.oam[self.oam_addr as usize] = value;
                self.oam_addr = self.oam_addr.wrapping_add(1);
            }
            5 => {
                if !self.w {
                    // First write (X)
                    self.fine_x = value & 0x07;
                    self.t.set_coarse_x((value >> 3) as u16);
                } else {
                    // Second write (Y)
                    self.t.set_fine_y((value & 0x07) as u16);
                    self.t.set_coarse_y((value >> 3) as u16);
                }
                self.w = !self.w;
            }
            6 => {
                if !self.w {
                    // First write (high byte, top two bits dropped)
                    self.t
                        .set_raw((((value & 0x3F) as u16) << 8) | (self.t.raw() & 0x00FF));
                } else {
                    // Second write (low byte), then t is copied into v
                    self.t.set_raw((self.t.raw() & 0xFF00) | value as u16);
                    self.v = self.t;
                }
                self.w = !self.w;
            }
            7 => self.data_write(value),
            _ => trace!("Ignoring write of {:#04X} to PPUSTATUS", value),
        }
    }
}
