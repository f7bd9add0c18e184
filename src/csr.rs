//! Control/Status Registers
//!
//! The pattern engine's register bank on the system bus. Byte addresses,
//! one 32-bit word each:
//! - 0x00 ENABLE (rw): bit 0 enables the pattern
//! - 0x04 STRIPES (ro): number of stripe boundary registers
//! - 0x08 FRAMES (ro): completed frames seen by the sink
//! - 0x40 + 4*i BOUNDARY\[i\] (rw): stripe boundary `i`
//!
//! Unmapped addresses read as zero and ignore writes.

use log::debug;

use crate::common::{bit, Word};
use crate::wishbone::{WishboneRequest, WishboneResponse, WishboneSlave};

pub const CSR_ENABLE: Word = 0x00;
pub const CSR_STRIPES: Word = 0x04;
pub const CSR_FRAMES: Word = 0x08;
pub const CSR_BOUNDARY_BASE: Word = 0x40;

/// Byte address of stripe boundary register `index`
pub fn boundary_address(index: usize) -> Word {
    CSR_BOUNDARY_BASE + 4 * index as Word
}

/// Pattern register bank
#[derive(Debug, Clone)]
pub struct CsrBank {
    /// ENABLE bit 0
    pub enable: bool,
    /// FRAMES
    pub frames: Word,
    boundaries: Vec<Word>,
    /// Set by boundary writes, cleared when the pixel side picks them up
    boundaries_dirty: bool,
}

impl CsrBank {
    /// Bank with enable high and the given boundary defaults
    pub fn new(boundaries: Vec<Word>) -> Self {
        Self {
            enable: true,
            frames: 0,
            boundaries,
            boundaries_dirty: false,
        }
    }

    pub fn boundaries(&self) -> &[Word] {
        &self.boundaries
    }

    /// Take pending boundary writes, if any
    pub fn take_boundaries(&mut self) -> Option<&[Word]> {
        if self.boundaries_dirty {
            self.boundaries_dirty = false;
            Some(&self.boundaries)
        } else {
            None
        }
    }

    fn boundary_index(address: Word) -> Option<usize> {
        if address >= CSR_BOUNDARY_BASE && address % 4 == 0 {
            Some(((address - CSR_BOUNDARY_BASE) / 4) as usize)
        } else {
            None
        }
    }

    /// Read register at byte `address`
    pub fn read(&self, address: Word) -> Word {
        match address {
            CSR_ENABLE => self.enable as Word,
            CSR_STRIPES => self.boundaries.len() as Word,
            CSR_FRAMES => self.frames,
            _ => Self::boundary_index(address)
                .and_then(|i| self.boundaries.get(i).copied())
                .unwrap_or(0),
        }
    }

    /// Write register at byte `address`
    pub fn write(&mut self, address: Word, value: Word) {
        match address {
            CSR_ENABLE => {
                debug!("csr enable = {}", bit(value, 0));
                self.enable = bit(value, 0);
            }
            CSR_STRIPES | CSR_FRAMES => {} // read-only
            _ => {
                if let Some(slot) =
                    Self::boundary_index(address).and_then(|i| self.boundaries.get_mut(i))
                {
                    *slot = value;
                    self.boundaries_dirty = true;
                }
            }
        }
    }
}

impl WishboneSlave for CsrBank {
    /// Acknowledges every strobe in the same cycle
    fn tick(&mut self, request: &WishboneRequest) -> WishboneResponse {
        if !request.active() {
            return WishboneResponse::default();
        }
        let address = request.adr << 2;
        let dat_r = self.read(address);
        if request.we {
            self.write(address, request.dat_w);
        }
        WishboneResponse { ack: true, dat_r }
    }
}
