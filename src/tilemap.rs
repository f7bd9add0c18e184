//! Tilemap Renderer
//!
//! Renders a full-screen tiled background from a tile-index table and a
//! tileset ROM. Each pixel goes through two lookups:
//!
//! 1. `tilemap[tile_row * tiles_x + tile_col]` through a synchronous port,
//!    so the tile index arrives one clock after its coordinate.
//! 2. `tiles[tile_index * tile_w * tile_h + pixel_row * tile_w + pixel_col]`.
//!
//! The pixel row/column and the timing fields ride in a one-cycle pipeline
//! register alongside the tilemap read, so the second lookup combines a
//! tile index with the offsets of the same coordinate that produced it.

use log::{info, warn};
use rgb::RGB8;

use crate::common::{Address, CellDecoder, Coord};
use crate::error::FormatError;
use crate::memory::{PixelLookupTable, SyncReadPort, TileMap};
use crate::stream::{ColorSample, Handshake, Pattern, TimingSample};

/// Screen and tile dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileGeometry {
    pub screen_w: u32,
    pub screen_h: u32,
    pub tile_w: u32,
    pub tile_h: u32,
}

impl TileGeometry {
    pub fn new(screen_w: u32, screen_h: u32, tile_w: u32, tile_h: u32) -> Self {
        Self {
            screen_w,
            screen_h,
            tile_w,
            tile_h,
        }
    }

    pub fn tiles_x(&self) -> u32 {
        self.screen_w / self.tile_w
    }

    pub fn tiles_y(&self) -> u32 {
        self.screen_h / self.tile_h
    }

    /// Pixels per tile
    pub fn tile_len(&self) -> usize {
        (self.tile_w * self.tile_h) as usize
    }

    fn validate(&self) -> Result<(), FormatError> {
        if self.tile_w == 0 || self.tile_h == 0 {
            return Err(FormatError::InvalidGeometry(format!(
                "tile size {}x{}",
                self.tile_w, self.tile_h
            )));
        }
        if self.tiles_x() == 0 || self.tiles_y() == 0 {
            return Err(FormatError::InvalidGeometry(format!(
                "screen {}x{} smaller than one {}x{} tile",
                self.screen_w, self.screen_h, self.tile_w, self.tile_h
            )));
        }
        if self.screen_w % self.tile_w != 0 || self.screen_h % self.tile_h != 0 {
            warn!(
                "screen {}x{} is not a multiple of tile {}x{}; partial tiles render black",
                self.screen_w, self.screen_h, self.tile_w, self.tile_h
            );
        }
        Ok(())
    }
}

/// One-cycle pipeline register
#[derive(Debug, Clone, Copy)]
struct Stage {
    timing: TimingSample,
    pixel_col: u32,
    pixel_row: u32,
    in_map: bool,
}

/// Tiled background renderer
#[derive(Debug)]
pub struct TilemapRenderer {
    geometry: TileGeometry,
    tilemap: TileMap,
    tiles: PixelLookupTable,
    cols: CellDecoder,
    rows: CellDecoder,
    port: SyncReadPort,
    stage: Option<Stage>,
}

impl TilemapRenderer {
    /// Build from a tileset and an optional tilemap
    ///
    /// A missing or mis-sized tilemap is regenerated from `seed`.
    pub fn new(
        geometry: TileGeometry,
        tiles: PixelLookupTable,
        tilemap: Option<Vec<u16>>,
        seed: u64,
    ) -> Result<Self, FormatError> {
        geometry.validate()?;
        let tile_count = Self::tile_count(&geometry, &tiles)?;
        let map = TileMap::new(
            geometry.tiles_x(),
            geometry.tiles_y(),
            tile_count,
            tilemap,
            seed,
        )?;
        Self::from_map(geometry, tiles, map)
    }

    /// Build from an already constructed tilemap
    pub fn from_map(
        geometry: TileGeometry,
        tiles: PixelLookupTable,
        tilemap: TileMap,
    ) -> Result<Self, FormatError> {
        geometry.validate()?;
        let tile_count = Self::tile_count(&geometry, &tiles)?;

        if tilemap.tiles_x() != geometry.tiles_x() || tilemap.tiles_y() != geometry.tiles_y() {
            return Err(FormatError::InvalidGeometry(format!(
                "tilemap is {}x{} tiles, screen needs {}x{}",
                tilemap.tiles_x(),
                tilemap.tiles_y(),
                geometry.tiles_x(),
                geometry.tiles_y()
            )));
        }
        if let Some((position, &index)) = tilemap
            .indices()
            .iter()
            .enumerate()
            .find(|(_, &i)| i as usize >= tile_count)
        {
            return Err(FormatError::TileIndexOutOfRange {
                position,
                index,
                tile_count,
            });
        }

        info!(
            "tilemap renderer: {}x{} tiles of {}x{} over {} tileset entries",
            geometry.tiles_x(),
            geometry.tiles_y(),
            geometry.tile_w,
            geometry.tile_h,
            tile_count
        );

        Ok(Self {
            cols: CellDecoder::new(geometry.tile_w),
            rows: CellDecoder::new(geometry.tile_h),
            geometry,
            tilemap,
            tiles,
            port: SyncReadPort::new(),
            stage: None,
        })
    }

    fn tile_count(geometry: &TileGeometry, tiles: &PixelLookupTable) -> Result<usize, FormatError> {
        let tile_len = geometry.tile_len();
        if tiles.len() % tile_len != 0 {
            return Err(FormatError::WrongLength {
                expected: (tiles.len() / tile_len + 1) * tile_len,
                found: tiles.len(),
            });
        }
        Ok(tiles.len() / tile_len)
    }

    pub fn geometry(&self) -> &TileGeometry {
        &self.geometry
    }

    pub fn tilemap(&self) -> &TileMap {
        &self.tilemap
    }

    /// Tilemap address for a coordinate, `None` outside the tiled area
    pub fn tilemap_address(&self, hcount: Coord, vcount: Coord) -> Option<Address> {
        let (tile_col, _) = self.cols.split(hcount);
        let (tile_row, _) = self.rows.split(vcount);
        let tiles_x = self.geometry.tiles_x();
        if tile_col < tiles_x && tile_row < self.geometry.tiles_y() {
            Some((tile_row * tiles_x + tile_col) as Address)
        } else {
            None
        }
    }

    /// Tileset address for `tile_index` at an in-tile offset
    #[inline]
    pub fn rom_address(&self, tile_index: u16, pixel_row: u32, pixel_col: u32) -> Address {
        tile_index as Address * self.geometry.tile_len()
            + (pixel_row * self.geometry.tile_w + pixel_col) as Address
    }

    /// Registered stage output for this cycle
    fn output(&self, source_ready: bool) -> ColorSample {
        match &self.stage {
            Some(stage) => {
                let color = if stage.in_map {
                    self.tiles
                        .read(self.rom_address(self.port.dat_r(), stage.pixel_row, stage.pixel_col))
                } else {
                    RGB8::default()
                };
                ColorSample::from_timing(&stage.timing, color, source_ready)
            }
            None => ColorSample::idle(source_ready),
        }
    }
}

impl Pattern for TilemapRenderer {
    fn tick(&mut self, sink: &TimingSample, source_ready: bool, _enable: bool) -> Handshake {
        let source = self.output(source_ready);
        let sink_ready = self.stage.is_none() || source_ready;

        if sink.valid && sink_ready {
            let (_, pixel_col) = self.cols.split(sink.hcount);
            let (_, pixel_row) = self.rows.split(sink.vcount);
            let address = self.tilemap_address(sink.hcount, sink.vcount);
            if let Some(address) = address {
                self.port.clock(&self.tilemap, address);
            }
            self.stage = Some(Stage {
                timing: *sink,
                pixel_col,
                pixel_row,
                in_map: address.is_some(),
            });
        } else if source.transfers() {
            self.stage = None;
        }

        Handshake { sink_ready, source }
    }

    fn reset(&mut self) {
        self.stage = None;
        self.port.clear();
    }

    fn name(&self) -> &'static str {
        "tilemap"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{pack_rgb, unpack_rgb};
    use crate::timing::{TimingGenerator, VideoTimings};
    use proptest::prelude::*;

    /// Tileset where every entry's color is its own address
    fn address_rom(len: usize) -> PixelLookupTable {
        let pixels = (0..len as u32).map(unpack_rgb).collect();
        PixelLookupTable::new(pixels, len).unwrap()
    }

    fn sample(h: u32, v: u32) -> TimingSample {
        TimingSample {
            hcount: h,
            vcount: v,
            valid: true,
            de: true,
            ..Default::default()
        }
    }

    fn renderer(geometry: TileGeometry, tile_count: usize, seed: u64) -> TilemapRenderer {
        let rom = address_rom(geometry.tile_len() * tile_count);
        TilemapRenderer::new(geometry, rom, None, seed).unwrap()
    }

    /// Closed-form expected ROM address
    fn expected(r: &TilemapRenderer, h: u32, v: u32) -> usize {
        let g = r.geometry();
        let tile = r.tilemap().get((v / g.tile_h * g.tiles_x() + h / g.tile_w) as usize) as usize;
        tile * g.tile_len() + ((v % g.tile_h) * g.tile_w + (h % g.tile_w)) as usize
    }

    #[test]
    fn test_geometry() {
        let g = TileGeometry::new(640, 480, 16, 16);
        assert_eq!((g.tiles_x(), g.tiles_y()), (40, 30));
        assert_eq!(g.tile_len(), 256);
    }

    #[test]
    fn test_rejects_partial_tileset() {
        let g = TileGeometry::new(32, 32, 16, 16);
        let rom = PixelLookupTable::solid(300, RGB8::default());
        assert!(matches!(
            TilemapRenderer::new(g, rom, None, 0),
            Err(FormatError::WrongLength { .. })
        ));
    }

    #[test]
    fn test_rejects_zero_tile() {
        let g = TileGeometry::new(32, 32, 0, 16);
        let rom = PixelLookupTable::solid(256, RGB8::default());
        assert!(TilemapRenderer::new(g, rom, None, 0).is_err());
    }

    #[test]
    fn test_supplied_tilemap_is_used() {
        let g = TileGeometry::new(32, 16, 16, 16);
        let rom = address_rom(256 * 3);
        let r = TilemapRenderer::new(g, rom, Some(vec![2, 1]), 0).unwrap();
        assert_eq!(r.tilemap().indices(), &[2, 1]);
    }

    #[test]
    fn test_one_cycle_latency() {
        let mut r = renderer(TileGeometry::new(64, 32, 16, 16), 4, 3);

        let out = r.tick(&sample(17, 5), true, true);
        assert!(!out.source.valid, "pipeline empty on the first cycle");
        assert!(out.sink_ready);

        let out = r.tick(&sample(18, 5), true, true);
        assert!(out.source.valid);
        assert_eq!(pack_rgb(out.source.rgb()) as usize, expected(&r, 17, 5));
    }

    #[test]
    fn test_alignment_across_tile_boundary() {
        let mut r = renderer(TileGeometry::new(64, 32, 16, 16), 8, 11);
        let coords: Vec<(u32, u32)> = (12..22).map(|h| (h, 20)).collect();

        let mut prev: Option<(u32, u32)> = None;
        for &(h, v) in &coords {
            let out = r.tick(&sample(h, v), true, true);
            if let Some((ph, pv)) = prev {
                assert_eq!(
                    pack_rgb(out.source.rgb()) as usize,
                    expected(&r, ph, pv),
                    "pixel ({}, {}) misaligned",
                    ph,
                    pv
                );
            }
            prev = Some((h, v));
        }
    }

    #[test]
    fn test_non_power_of_two_tiles() {
        let g = TileGeometry::new(60, 24, 12, 8);
        let mut r = renderer(g, 3, 5);
        r.tick(&sample(37, 19), true, true);
        let out = r.tick(&sample(0, 0), true, true);
        assert_eq!(pack_rgb(out.source.rgb()) as usize, expected(&r, 37, 19));
    }

    #[test]
    fn test_blanking_renders_black() {
        let mut r = renderer(TileGeometry::new(32, 16, 16, 16), 2, 0);
        r.tick(&sample(40, 3), true, true);
        let out = r.tick(&sample(41, 3), true, true);
        assert!(out.source.valid);
        assert_eq!(out.source.rgb(), RGB8::default());
    }

    #[test]
    fn test_backpressure_holds_stage() {
        let mut r = renderer(TileGeometry::new(32, 16, 16, 16), 2, 9);
        r.tick(&sample(3, 4), true, true);

        // Downstream stalls: the held sample stays put and input is refused
        let stalled = r.tick(&sample(4, 4), false, true);
        assert!(!stalled.sink_ready);
        assert!(stalled.source.valid && !stalled.source.transfers());
        let again = r.tick(&sample(4, 4), false, true);
        assert_eq!(again.source.rgb(), stalled.source.rgb());

        let released = r.tick(&sample(4, 4), true, true);
        assert!(released.source.transfers());
        assert_eq!(pack_rgb(released.source.rgb()) as usize, expected(&r, 3, 4));
        let next = r.tick(&sample(5, 4), true, true);
        assert_eq!(pack_rgb(next.source.rgb()) as usize, expected(&r, 4, 4));
    }

    #[test]
    fn test_passes_timing_fields_through() {
        let t = VideoTimings::tiny(32, 16);
        let mut gen = TimingGenerator::new(t);
        let mut r = renderer(TileGeometry::new(32, 16, 16, 16), 2, 1);

        let mut prev: Option<TimingSample> = None;
        for _ in 0..t.frame_cycles() * 2 {
            let sink = gen.current();
            let out = r.tick(&sink, true, true);
            if let Some(p) = prev {
                assert_eq!(out.source.valid, p.valid);
                assert_eq!(out.source.de, p.de);
                assert_eq!(out.source.hsync, p.hsync);
                assert_eq!(out.source.vsync, p.vsync);
                assert_eq!(out.source.last, p.last);
            }
            prev = Some(sink);
            gen.tick(out.sink_ready);
        }
    }

    #[test]
    fn test_reset_discards_stage() {
        let mut r = renderer(TileGeometry::new(32, 16, 16, 16), 2, 1);
        r.tick(&sample(1, 1), true, true);
        r.reset();
        assert!(!r.tick(&sample(2, 1), true, true).source.valid);
    }

    proptest! {
        #[test]
        fn prop_rom_address_matches_formula(
            h in 0u32..64,
            v in 0u32..48,
            seed in any::<u64>(),
        ) {
            let mut r = renderer(TileGeometry::new(64, 48, 16, 16), 6, seed);
            r.tick(&sample(h, v), true, true);
            let out = r.tick(&sample(0, 0), true, true);
            prop_assert_eq!(pack_rgb(out.source.rgb()) as usize, expected(&r, h, v));
        }
    }
}
