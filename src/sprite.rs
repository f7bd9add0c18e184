//! Sprite Renderers
//!
//! A single rectangular sprite drawn over a black background. The sprite
//! is either parked at a fixed position or bounces around the screen,
//! moving one pixel per axis on every rising edge of vertical sync.
//!
//! Visibility and addressing are combinational on the incoming coordinate:
//! inside `[x, x + w) x [y, y + h)` the ROM is read at
//! `(v - y) * w + (h - x)`; outside, the address is held at 0 and the
//! output is black.

use std::path::Path;

use log::info;
use rgb::RGB8;

use crate::asset;
use crate::common::{Address, Coord};
use crate::error::{AssetError, FormatError};
use crate::memory::PixelLookupTable;
use crate::stream::{ColorSample, Handshake, Pattern, TimingSample};
use crate::sync::RisingEdge;

/// Default solid sprite color
pub const SPRITE_RED: RGB8 = RGB8::new(0xff, 0x00, 0x00);

/// Direction of travel along one axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// Right or down
    #[default]
    Increasing,
    /// Left or up
    Decreasing,
}

impl Direction {
    fn flip(self) -> Self {
        match self {
            Direction::Increasing => Direction::Decreasing,
            Direction::Decreasing => Direction::Increasing,
        }
    }
}

/// Advance one axis by a single step, flipping at the edges
///
/// Moving forward stops one pixel short of the far edge: when
/// `pos + dim >= screen - 1` the direction flips and the position holds.
/// Moving back, reaching 0 flips the direction.
pub fn bounce(pos: Coord, dir: Direction, dim: u32, screen: u32) -> (Coord, Direction) {
    match dir {
        Direction::Increasing if pos + dim >= screen.saturating_sub(1) => (pos, dir.flip()),
        Direction::Increasing => (pos + 1, dir),
        Direction::Decreasing if pos == 0 => (pos, dir.flip()),
        Direction::Decreasing => (pos - 1, dir),
    }
}

/// Sprite position and direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SpriteState {
    pub x: Coord,
    pub y: Coord,
    pub dir_x: Direction,
    pub dir_y: Direction,
}

impl SpriteState {
    pub fn at(x: Coord, y: Coord) -> Self {
        Self {
            x,
            y,
            ..Self::default()
        }
    }

    /// One bounce step on both axes
    pub fn step(&mut self, width: u32, height: u32, screen_w: u32, screen_h: u32) {
        (self.x, self.dir_x) = bounce(self.x, self.dir_x, width, screen_w);
        (self.y, self.dir_y) = bounce(self.y, self.dir_y, height, screen_h);
    }
}

/// How the sprite moves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Motion {
    Fixed,
    Bounce { screen_w: u32, screen_h: u32 },
}

/// Single sprite over black
#[derive(Debug)]
pub struct SpriteRenderer {
    rom: PixelLookupTable,
    width: u32,
    height: u32,
    state: SpriteState,
    motion: Motion,
    vsync: RisingEdge,
    /// Loaded from an asset
    logo: bool,
}

fn check_fits(width: u32, height: u32, screen_w: u32, screen_h: u32) -> Result<(), FormatError> {
    if width > screen_w || height > screen_h {
        return Err(FormatError::InvalidGeometry(format!(
            "{}x{} sprite does not fit a {}x{} screen",
            width, height, screen_w, screen_h
        )));
    }
    Ok(())
}

impl SpriteRenderer {
    /// Sprite parked at `(x, y)` on a `screen_w` x `screen_h` screen
    ///
    /// The whole sprite must lie on screen.
    pub fn fixed(
        rom: PixelLookupTable,
        width: u32,
        height: u32,
        x: Coord,
        y: Coord,
        screen_w: u32,
        screen_h: u32,
    ) -> Result<Self, FormatError> {
        check_fits(width, height, screen_w, screen_h)?;
        if x > screen_w - width || y > screen_h - height {
            return Err(FormatError::InvalidGeometry(format!(
                "{}x{} sprite at ({}, {}) leaves the {}x{} screen",
                width, height, x, y, screen_w, screen_h
            )));
        }
        Self::build(rom, width, height, SpriteState::at(x, y), Motion::Fixed)
    }

    /// Sprite bouncing inside a `screen_w` x `screen_h` screen, starting at
    /// the top-left corner moving right and down
    pub fn bouncing(
        rom: PixelLookupTable,
        width: u32,
        height: u32,
        screen_w: u32,
        screen_h: u32,
    ) -> Result<Self, FormatError> {
        check_fits(width, height, screen_w, screen_h)?;
        Self::build(
            rom,
            width,
            height,
            SpriteState::default(),
            Motion::Bounce { screen_w, screen_h },
        )
    }

    /// Bouncing logo whose pixels come from a `.mem` asset
    ///
    /// With a `background` color, every pixel of that color loads as black.
    pub fn from_asset<P: AsRef<Path>>(
        path: P,
        width: u32,
        height: u32,
        screen_w: u32,
        screen_h: u32,
        background: Option<RGB8>,
    ) -> Result<Self, AssetError> {
        let len = (width * height) as usize;
        let mut rom = asset::load_mem(path, len)?;
        if let Some(background) = background {
            let mut pixels = rom.pixels().to_vec();
            asset::knock_out_background(&mut pixels, background);
            rom = PixelLookupTable::new(pixels, len)?;
        }
        let mut sprite = Self::bouncing(rom, width, height, screen_w, screen_h)?;
        sprite.logo = true;
        Ok(sprite)
    }

    /// 16x16 solid red square at (100, 50)
    pub fn default_fixed() -> Self {
        Self {
            rom: PixelLookupTable::solid(16 * 16, SPRITE_RED),
            width: 16,
            height: 16,
            state: SpriteState::at(100, 50),
            motion: Motion::Fixed,
            vsync: RisingEdge::new(),
            logo: false,
        }
    }

    fn build(
        rom: PixelLookupTable,
        width: u32,
        height: u32,
        state: SpriteState,
        motion: Motion,
    ) -> Result<Self, FormatError> {
        if width == 0 || height == 0 {
            return Err(FormatError::InvalidGeometry(format!(
                "{}x{} sprite",
                width, height
            )));
        }
        let expected = (width * height) as usize;
        if rom.len() != expected {
            return Err(FormatError::WrongLength {
                expected,
                found: rom.len(),
            });
        }
        info!(
            "sprite {}x{} at ({}, {}), {:?}",
            width, height, state.x, state.y, motion
        );
        Ok(Self {
            rom,
            width,
            height,
            state,
            motion,
            vsync: RisingEdge::new(),
            logo: false,
        })
    }

    pub fn state(&self) -> &SpriteState {
        &self.state
    }

    pub fn motion(&self) -> Motion {
        self.motion
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Whether `(hcount, vcount)` lies inside the sprite
    #[inline]
    pub fn visible(&self, hcount: Coord, vcount: Coord) -> bool {
        let SpriteState { x, y, .. } = self.state;
        hcount >= x && hcount - x < self.width && vcount >= y && vcount - y < self.height
    }

    /// ROM address for a coordinate, 0 when the sprite is not visible
    #[inline]
    pub fn address(&self, hcount: Coord, vcount: Coord) -> Address {
        if self.visible(hcount, vcount) {
            ((vcount - self.state.y) * self.width + (hcount - self.state.x)) as Address
        } else {
            0
        }
    }

    pub fn color_at(&self, hcount: Coord, vcount: Coord) -> RGB8 {
        if self.visible(hcount, vcount) {
            self.rom.read(self.address(hcount, vcount))
        } else {
            RGB8::default()
        }
    }
}

impl Pattern for SpriteRenderer {
    fn tick(&mut self, sink: &TimingSample, source_ready: bool, _enable: bool) -> Handshake {
        let color = self.color_at(sink.hcount, sink.vcount);
        let source = ColorSample::from_timing(sink, color, source_ready);

        if self.vsync.tick(sink.vsync) {
            if let Motion::Bounce { screen_w, screen_h } = self.motion {
                self.state.step(self.width, self.height, screen_w, screen_h);
            }
        }

        Handshake {
            sink_ready: source_ready,
            source,
        }
    }

    fn reset(&mut self) {
        self.vsync.clear();
    }

    fn name(&self) -> &'static str {
        match self.motion {
            _ if self.logo => "logo",
            Motion::Fixed => "sprite",
            Motion::Bounce { .. } => "bouncing-sprite",
        }
    }
}
