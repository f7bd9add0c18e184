//! Bars Renderers
//!
//! Vertical stripe patterns selected by comparing `hcount` against a set of
//! stripe boundaries:
//! - `BarsRenderer::fixed`: boundaries at `i * screen_w / stripe_count`
//! - `BarsRenderer::configurable`: the same defaults, held in writable
//!   32-bit registers
//! - `ColorBars`: eight fixed horizontal bands chosen from `vcount`
//!
//! Stripe selection is a fold over the boundaries in index order where every
//! satisfied `hcount >= boundary[i]` overwrites the result, so the last
//! satisfied boundary wins. With sorted boundaries that is the largest
//! boundary not right of the pixel.
//!
//! Register writes are visible on the very next pixel. A write landing
//! mid-frame moves the stripe edge for the rest of that frame.

use log::{debug, info};
use rgb::RGB8;

use crate::common::{Address, CellDecoder, Coord, Word};
use crate::error::FormatError;
use crate::memory::PixelLookupTable;
use crate::stream::{ColorSample, Handshake, Pattern, TimingSample};
use crate::tilemap::TileGeometry;

/// Stripe boundary registers, one 32-bit word per stripe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StripeRegisters {
    boundaries: Vec<Word>,
}

impl StripeRegisters {
    /// `count` registers holding `i * screen_w / count`
    pub fn new(count: usize, screen_w: u32) -> Self {
        let count = count.max(1);
        let boundaries = (0..count)
            .map(|i| (i as u64 * screen_w as u64 / count as u64) as Word)
            .collect();
        Self { boundaries }
    }

    /// Registers with explicit contents
    pub fn from_boundaries(boundaries: Vec<Word>) -> Self {
        if boundaries.is_empty() {
            return Self { boundaries: vec![0] };
        }
        Self { boundaries }
    }

    pub fn len(&self) -> usize {
        self.boundaries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boundaries.is_empty()
    }

    pub fn boundaries(&self) -> &[Word] {
        &self.boundaries
    }

    /// Read register `index`; unmapped indices read as zero
    pub fn read(&self, index: usize) -> Word {
        self.boundaries.get(index).copied().unwrap_or(0)
    }

    /// Write register `index`; unmapped indices are ignored
    pub fn write(&mut self, index: usize, value: Word) {
        match self.boundaries.get_mut(index) {
            Some(slot) => {
                debug!("stripe boundary {} = {}", index, value);
                *slot = value;
            }
            None => debug!("write to unmapped stripe boundary {}", index),
        }
    }

    /// Stripe index for `hcount`
    #[inline]
    pub fn select(&self, hcount: Coord) -> usize {
        self.boundaries
            .iter()
            .enumerate()
            .fold(0, |bar, (i, &boundary)| if hcount >= boundary { i } else { bar })
    }
}

/// Stripe renderer over a tileset ROM, one tile per stripe
#[derive(Debug)]
pub struct BarsRenderer {
    tiles: PixelLookupTable,
    tile_len: usize,
    tile_w: u32,
    cols: CellDecoder,
    rows: CellDecoder,
    registers: StripeRegisters,
    configurable: bool,
}

impl BarsRenderer {
    /// Stripes at fixed, evenly spaced boundaries
    pub fn fixed(geometry: TileGeometry, tiles: PixelLookupTable) -> Result<Self, FormatError> {
        Self::build(geometry, tiles, false)
    }

    /// Stripes whose boundaries are runtime-writable registers
    pub fn configurable(
        geometry: TileGeometry,
        tiles: PixelLookupTable,
    ) -> Result<Self, FormatError> {
        Self::build(geometry, tiles, true)
    }

    fn build(
        geometry: TileGeometry,
        tiles: PixelLookupTable,
        configurable: bool,
    ) -> Result<Self, FormatError> {
        if geometry.tile_w == 0 || geometry.tile_h == 0 || geometry.screen_w == 0 {
            return Err(FormatError::InvalidGeometry(format!(
                "bars over {}x{} tiles on a {} pixel line",
                geometry.tile_w, geometry.tile_h, geometry.screen_w
            )));
        }
        let tile_len = geometry.tile_len();
        if tiles.len() % tile_len != 0 {
            return Err(FormatError::WrongLength {
                expected: (tiles.len() / tile_len + 1) * tile_len,
                found: tiles.len(),
            });
        }
        let stripe_count = tiles.len() / tile_len;
        info!(
            "{} bars: {} stripes over {} pixels",
            if configurable { "configurable" } else { "fixed" },
            stripe_count,
            geometry.screen_w
        );
        Ok(Self {
            tiles,
            tile_len,
            tile_w: geometry.tile_w,
            cols: CellDecoder::new(geometry.tile_w),
            rows: CellDecoder::new(geometry.tile_h),
            registers: StripeRegisters::new(stripe_count, geometry.screen_w),
            configurable,
        })
    }

    pub fn stripe_count(&self) -> usize {
        self.registers.len()
    }

    pub fn boundaries(&self) -> &[Word] {
        self.registers.boundaries()
    }

    pub fn is_configurable(&self) -> bool {
        self.configurable
    }

    /// ROM address for a coordinate
    #[inline]
    pub fn rom_address(&self, hcount: Coord, vcount: Coord) -> Address {
        let bar = self.registers.select(hcount);
        let (_, pixel_col) = self.cols.split(hcount);
        let (_, pixel_row) = self.rows.split(vcount);
        bar * self.tile_len + (pixel_row * self.tile_w + pixel_col) as Address
    }

    /// Color at a coordinate
    pub fn color_at(&self, hcount: Coord, vcount: Coord) -> RGB8 {
        self.tiles.read(self.rom_address(hcount, vcount))
    }
}

impl Pattern for BarsRenderer {
    fn tick(&mut self, sink: &TimingSample, source_ready: bool, _enable: bool) -> Handshake {
        let color = self.color_at(sink.hcount, sink.vcount);
        Handshake {
            sink_ready: source_ready,
            source: ColorSample::from_timing(sink, color, source_ready),
        }
    }

    fn stripe_registers(&mut self) -> Option<&mut StripeRegisters> {
        if self.configurable {
            Some(&mut self.registers)
        } else {
            None
        }
    }

    fn name(&self) -> &'static str {
        if self.configurable {
            "configurable-bars"
        } else {
            "bars"
        }
    }
}

/// The eight classic bar colors, top to bottom
pub const COLOR_BARS: [RGB8; 8] = [
    RGB8::new(0xff, 0xff, 0xff),
    RGB8::new(0xff, 0xff, 0x00),
    RGB8::new(0x00, 0xff, 0xff),
    RGB8::new(0x00, 0xff, 0x00),
    RGB8::new(0xff, 0x00, 0xff),
    RGB8::new(0xff, 0x00, 0x00),
    RGB8::new(0x00, 0x00, 0xff),
    RGB8::new(0x00, 0x00, 0x00),
];

/// Horizontal bands of `COLOR_BARS`, eight lines each, repeating
///
/// The band is registered: on every transfer inside the active area the
/// register takes `(vcount >> 3) & 7`, and the color shown is the one
/// selected by the register's current value.
#[derive(Debug, Clone, Copy, Default)]
pub struct ColorBars {
    bar: u8,
}

impl ColorBars {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bar(&self) -> u8 {
        self.bar
    }
}

impl Pattern for ColorBars {
    fn tick(&mut self, sink: &TimingSample, source_ready: bool, _enable: bool) -> Handshake {
        let color = COLOR_BARS[self.bar as usize & 7];
        let source = ColorSample::from_timing(sink, color, source_ready);
        if source.transfers() && source.de {
            self.bar = ((sink.vcount >> 3) & 7) as u8;
        }
        Handshake {
            sink_ready: source_ready,
            source,
        }
    }

    fn reset(&mut self) {
        self.bar = 0;
    }

    fn name(&self) -> &'static str {
        "color-bars"
    }
}
