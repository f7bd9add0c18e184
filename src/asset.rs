//! Memory-init assets
//!
//! Tile and sprite ROMs are initialized from `.mem` text: one 24-bit RGB
//! value per line, six lowercase hex digits, zero padded. Pixels are
//! row-major within a tile and tiles follow in raster order. Tilemaps use
//! the same line format with one tile index per line.

use std::fs;
use std::path::Path;

use log::info;
use rgb::RGB8;

use crate::error::{AssetError, FormatError};
use crate::memory::{pack_rgb, unpack_rgb, PixelLookupTable};

/// Encode one pixel as a `.mem` line (no newline)
pub fn encode_line(color: RGB8) -> String {
    format!("{:06x}", pack_rgb(color))
}

/// Decode one `.mem` line; `line` is the 1-based line number for errors
pub fn decode_line(text: &str, line: usize) -> Result<RGB8, FormatError> {
    let value = parse_hex(text, line)?;
    if value > 0xFF_FFFF {
        return Err(FormatError::ValueOutOfRange { line, value });
    }
    Ok(unpack_rgb(value as u32))
}

fn parse_hex(text: &str, line: usize) -> Result<u64, FormatError> {
    let digits = text.trim();
    let digits = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
        .unwrap_or(digits);
    u64::from_str_radix(digits, 16).map_err(|_| FormatError::InvalidLine {
        line,
        content: text.to_string(),
    })
}

/// Non-blank lines with their 1-based line numbers
fn content_lines(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l.trim()))
        .filter(|(_, l)| !l.is_empty())
}

/// Parse `.mem` text into a lookup table of exactly `expected` entries
pub fn parse_mem(text: &str, expected: usize) -> Result<PixelLookupTable, FormatError> {
    let pixels = content_lines(text)
        .map(|(line, l)| decode_line(l, line))
        .collect::<Result<Vec<_>, _>>()?;
    PixelLookupTable::new(pixels, expected)
}

/// Serialize a lookup table to `.mem` text
pub fn write_mem(rom: &PixelLookupTable) -> String {
    let mut out = String::with_capacity(rom.len() * 7);
    for &pixel in rom.pixels() {
        out.push_str(&encode_line(pixel));
        out.push('\n');
    }
    out
}

/// Load a `.mem` file into a lookup table of exactly `expected` entries
pub fn load_mem<P: AsRef<Path>>(path: P, expected: usize) -> Result<PixelLookupTable, AssetError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)?;
    let rom = parse_mem(&text, expected)?;
    info!("loaded {} pixels from {}", rom.len(), path.display());
    Ok(rom)
}

/// Write a lookup table to a `.mem` file
pub fn save_mem<P: AsRef<Path>>(path: P, rom: &PixelLookupTable) -> Result<(), AssetError> {
    fs::write(path, write_mem(rom))?;
    Ok(())
}

/// Parse a tilemap list: one hex tile index per line
pub fn parse_tilemap(text: &str) -> Result<Vec<u16>, FormatError> {
    content_lines(text)
        .map(|(line, l)| {
            let value = parse_hex(l, line)?;
            u16::try_from(value).map_err(|_| FormatError::ValueOutOfRange { line, value })
        })
        .collect()
}

/// Load a tilemap list file
pub fn load_tilemap<P: AsRef<Path>>(path: P) -> Result<Vec<u16>, AssetError> {
    let text = fs::read_to_string(path)?;
    Ok(parse_tilemap(&text)?)
}

/// Map every `background` pixel to black, the logo convention
pub fn knock_out_background(pixels: &mut [RGB8], background: RGB8) {
    for pixel in pixels.iter_mut().filter(|p| **p == background) {
        *pixel = RGB8::default();
    }
}
