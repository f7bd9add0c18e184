//! Video Test-Pattern Engine
//!
//! A cycle-level model of a video test-pattern generator: bars, sprites and
//! tilemaps rendered one pixel per clock from a video timing stream, with
//! a CSR bank and a Wishbone single-word reader on the system side.

pub mod common;
pub mod error;
pub mod stream;
pub mod sync;
pub mod gate;
pub mod memory;
pub mod asset;
pub mod timing;
pub mod tilemap;
pub mod bars;
pub mod sprite;
pub mod wishbone;
pub mod csr;
pub mod sink;
pub mod system;
pub mod config;
#[cfg(feature = "ui")]
pub mod ui;
