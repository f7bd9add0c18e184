//! Pattern Memories
//!
//! This module implements the read-only memories the renderers address:
//! - `PixelLookupTable`: 24-bit RGB tile/sprite ROM, asynchronous read
//! - `TileMap`: tile-index table, read through a `SyncReadPort`
//!
//! Contents are fixed at construction. Address widths are sized from the
//! table depth, so every address the renderers generate lands inside the
//! table when the geometry was validated.

use log::{info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rgb::RGB8;

use crate::common::{bits_for, Address};
use crate::error::FormatError;

/// Pack an RGB triple into a 24-bit word (`0xRRGGBB`)
#[inline]
pub fn pack_rgb(color: RGB8) -> u32 {
    (color.r as u32) << 16 | (color.g as u32) << 8 | color.b as u32
}

/// Unpack a 24-bit word (`0xRRGGBB`); bits above 23 are ignored
#[inline]
pub fn unpack_rgb(word: u32) -> RGB8 {
    RGB8::new((word >> 16) as u8, (word >> 8) as u8, word as u8)
}

/// Immutable table of RGB triples acting as tile/sprite ROM
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelLookupTable {
    pixels: Vec<RGB8>,
}

impl PixelLookupTable {
    /// Build a table that must hold exactly `expected` entries
    pub fn new(pixels: Vec<RGB8>, expected: usize) -> Result<Self, FormatError> {
        if pixels.len() != expected {
            return Err(FormatError::WrongLength {
                expected,
                found: pixels.len(),
            });
        }
        if pixels.is_empty() {
            return Err(FormatError::InvalidGeometry("empty lookup table".into()));
        }
        Ok(Self { pixels })
    }

    /// A table of `len` entries all set to `color`
    pub fn solid(len: usize, color: RGB8) -> Self {
        Self {
            pixels: vec![color; len.max(1)],
        }
    }

    /// A tileset of solid tiles, one tile per color, in order
    pub fn solid_tiles(colors: &[RGB8], tile_w: u32, tile_h: u32) -> Self {
        let tile_len = (tile_w * tile_h).max(1) as usize;
        let mut pixels = Vec::with_capacity(colors.len() * tile_len);
        for &color in colors {
            pixels.extend(std::iter::repeat(color).take(tile_len));
        }
        if pixels.is_empty() {
            pixels.push(RGB8::default());
        }
        Self { pixels }
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// Address width in bits
    pub fn address_bits(&self) -> u32 {
        bits_for(self.pixels.len() as u64 - 1)
    }

    /// Asynchronous read
    #[inline]
    pub fn read(&self, address: Address) -> RGB8 {
        debug_assert!(address < self.pixels.len(), "ROM address {} out of range", address);
        self.pixels.get(address).copied().unwrap_or_default()
    }

    /// Raw contents, address order
    pub fn pixels(&self) -> &[RGB8] {
        &self.pixels
    }
}

/// Tile-index table: `tiles_x * tiles_y` entries in raster order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileMap {
    indices: Vec<u16>,
    tiles_x: u32,
    tiles_y: u32,
}

impl TileMap {
    /// Build a tilemap from `supplied`, or generate one from `seed`
    ///
    /// A missing or mis-sized table is replaced by a generated one. A
    /// correctly sized table naming a tile beyond `tile_count` is a
    /// `FormatError`.
    pub fn new(
        tiles_x: u32,
        tiles_y: u32,
        tile_count: usize,
        supplied: Option<Vec<u16>>,
        seed: u64,
    ) -> Result<Self, FormatError> {
        if tiles_x == 0 || tiles_y == 0 || tile_count == 0 {
            return Err(FormatError::InvalidGeometry(format!(
                "tilemap {}x{} over {} tiles",
                tiles_x, tiles_y, tile_count
            )));
        }
        let expected = (tiles_x * tiles_y) as usize;

        let indices = match supplied {
            Some(indices) if indices.len() == expected => indices,
            Some(indices) => {
                warn!(
                    "tilemap has {} entries, expected {}; generating one from seed {}",
                    indices.len(),
                    expected,
                    seed
                );
                return Ok(Self::generate(tiles_x, tiles_y, tile_count, seed));
            }
            None => {
                info!("no tilemap supplied; generating from seed {}", seed);
                return Ok(Self::generate(tiles_x, tiles_y, tile_count, seed));
            }
        };

        if let Some((position, &index)) = indices
            .iter()
            .enumerate()
            .find(|(_, &index)| index as usize >= tile_count)
        {
            return Err(FormatError::TileIndexOutOfRange {
                position,
                index,
                tile_count,
            });
        }

        Ok(Self {
            indices,
            tiles_x,
            tiles_y,
        })
    }

    /// Deterministic pseudo-random tilemap
    pub fn generate(tiles_x: u32, tiles_y: u32, tile_count: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let count = tile_count.clamp(1, u16::MAX as usize + 1);
        let indices = (0..tiles_x * tiles_y)
            .map(|_| rng.gen_range(0..count) as u16)
            .collect();
        Self {
            indices,
            tiles_x,
            tiles_y,
        }
    }

    pub fn tiles_x(&self) -> u32 {
        self.tiles_x
    }

    pub fn tiles_y(&self) -> u32 {
        self.tiles_y
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn indices(&self) -> &[u16] {
        &self.indices
    }

    /// Tile index at flat `address`
    #[inline]
    pub fn get(&self, address: Address) -> u16 {
        self.indices.get(address).copied().unwrap_or(0)
    }
}

/// Synchronous read port: data appears one clock after its address
#[derive(Debug, Clone, Default)]
pub struct SyncReadPort {
    dat_r: u16,
}

impl SyncReadPort {
    pub fn new() -> Self {
        Self::default()
    }

    /// Data registered at the previous edge
    pub fn dat_r(&self) -> u16 {
        self.dat_r
    }

    /// Clock edge: register `map[address]`
    pub fn clock(&mut self, map: &TileMap, address: Address) {
        self.dat_r = map.get(address);
    }

    pub fn clear(&mut self) {
        self.dat_r = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn test_pack_unpack() {
        let c = RGB8::new(0x12, 0x34, 0x56);
        assert_eq!(pack_rgb(c), 0x123456);
        assert_eq!(unpack_rgb(0x123456), c);
        assert_eq!(unpack_rgb(0xFF_123456), c);
    }

    #[test]
    fn test_lookup_table_length_checked() {
        let ok = PixelLookupTable::new(vec![RGB8::default(); 256], 256);
        assert!(ok.is_ok());

        let short = PixelLookupTable::new(vec![RGB8::default(); 255], 256);
        assert_eq!(
            short,
            Err(FormatError::WrongLength {
                expected: 256,
                found: 255
            })
        );
    }

    #[test]
    fn test_lookup_table_read() {
        let pixels: Vec<RGB8> = (0..16u8).map(|i| RGB8::new(i, 0, 0)).collect();
        let rom = PixelLookupTable::new(pixels, 16).unwrap();
        assert_eq!(rom.read(0), RGB8::new(0, 0, 0));
        assert_eq!(rom.read(15), RGB8::new(15, 0, 0));
        assert_eq!(rom.address_bits(), 4);
    }

    #[test]
    fn test_solid_tiles_layout() {
        let colors = [RGB8::new(1, 0, 0), RGB8::new(2, 0, 0)];
        let rom = PixelLookupTable::solid_tiles(&colors, 4, 4);
        assert_eq!(rom.len(), 32);
        assert_eq!(rom.read(15), colors[0]);
        assert_eq!(rom.read(16), colors[1]);
    }

    #[test]
    fn test_tilemap_supplied() {
        let map = TileMap::new(2, 2, 4, Some(vec![0, 1, 2, 3]), 0).unwrap();
        assert_eq!(map.indices(), &[0, 1, 2, 3]);
    }

    #[test]
    fn test_tilemap_regenerated_on_size_mismatch() {
        let map = TileMap::new(4, 3, 5, Some(vec![0, 1]), 42).unwrap();
        assert_eq!(map.len(), 12);
        assert_eq!(map, TileMap::generate(4, 3, 5, 42));
    }

    #[test]
    fn test_tilemap_generation_is_seeded() {
        let a = TileMap::generate(40, 30, 8, 7);
        let b = TileMap::generate(40, 30, 8, 7);
        let c = TileMap::generate(40, 30, 8, 8);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.indices().iter().all(|&i| i < 8));
    }

    #[test]
    fn test_tilemap_rejects_bad_index() {
        let err = TileMap::new(2, 1, 2, Some(vec![1, 2]), 0).unwrap_err();
        assert_eq!(
            err,
            FormatError::TileIndexOutOfRange {
                position: 1,
                index: 2,
                tile_count: 2
            }
        );
    }

    #[test]
    fn test_sync_read_port_latency() {
        let map = TileMap::new(2, 1, 8, Some(vec![5, 7]), 0).unwrap();
        let mut port = SyncReadPort::new();
        assert_eq!(port.dat_r(), 0);
        port.clock(&map, 1);
        assert_eq!(port.dat_r(), 7);
        port.clock(&map, 0);
        assert_eq!(port.dat_r(), 5);
    }
}
