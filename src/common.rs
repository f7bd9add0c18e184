//! Common types and utilities for the pattern engine
//!
//! This module defines the coordinate types used on the timing stream and
//! the small bit-arithmetic helpers the address generators share.

/// Pixel coordinate carried on the timing stream (`hcount`/`vcount`)
pub type Coord = u32;

/// Flat address into a lookup table
pub type Address = usize;

/// 32-bit bus / register word
pub type Word = u32;

/// Check if a specific bit is set in a word
#[inline]
pub fn bit(value: Word, n: u32) -> bool {
    (value & (1 << n)) != 0
}

/// Number of bits needed to represent every value in `0..=max`
///
/// This is `ceil(log2(max + 1))`, the width a signal declared with
/// `max + 1` states occupies. Zero still needs one bit.
#[inline]
pub fn bits_for(max: u64) -> u32 {
    (u64::BITS - max.leading_zeros()).max(1)
}

/// Exact base-2 logarithm, `None` when `n` is not a power of two
#[inline]
pub fn log2_exact(n: u32) -> Option<u32> {
    if n.is_power_of_two() {
        Some(n.trailing_zeros())
    } else {
        None
    }
}

/// Splits a coordinate into (cell index, offset within cell)
///
/// Power-of-two cell sizes decode with a shift and a mask, exactly as the
/// hardware does; other sizes fall back to division.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellDecoder {
    size: u32,
    shift: Option<u32>,
}

impl CellDecoder {
    /// Create a decoder for cells of `size` pixels (must be non-zero)
    pub fn new(size: u32) -> Self {
        Self {
            size,
            shift: log2_exact(size),
        }
    }

    /// Cell size in pixels
    pub fn size(&self) -> u32 {
        self.size
    }

    /// True when decoding uses shift/mask
    pub fn is_shift_mask(&self) -> bool {
        self.shift.is_some()
    }

    /// Decode `coord` into (cell, offset)
    #[inline]
    pub fn split(&self, coord: Coord) -> (u32, u32) {
        match self.shift {
            Some(shift) => (coord >> shift, coord & (self.size - 1)),
            None => (coord / self.size, coord % self.size),
        }
    }
}
