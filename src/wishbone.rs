//! Wishbone Bus
//!
//! Classic single-word Wishbone signalling between a master and a slave:
//! the master holds `cyc`/`stb` with a word address until the slave raises
//! `ack`, and data is sampled on the ack cycle.
//!
//! - `WishboneSlave`: anything that answers a request each clock
//! - `WishboneReader`: IDLE/READ master fetching one word per `start`
//! - `WishboneSram`: word memory with configurable wait states

use log::debug;

use crate::common::{log2_exact, Address, Word};

/// Master-driven bus lines
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WishboneRequest {
    /// Word address
    pub adr: Word,
    pub dat_w: Word,
    /// Byte lane selects
    pub sel: u8,
    pub we: bool,
    pub cyc: bool,
    pub stb: bool,
}

impl WishboneRequest {
    /// Bus released
    pub fn idle() -> Self {
        Self::default()
    }

    /// True when a transaction is being presented this cycle
    pub fn active(&self) -> bool {
        self.cyc && self.stb
    }
}

/// Slave-driven bus lines
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WishboneResponse {
    pub ack: bool,
    pub dat_r: Word,
}

/// A bus slave clocked in the system domain
pub trait WishboneSlave {
    /// Respond to `request` for this cycle, then commit the clock edge
    fn tick(&mut self, request: &WishboneRequest) -> WishboneResponse;
}

impl<S: WishboneSlave + ?Sized> WishboneSlave for &mut S {
    fn tick(&mut self, request: &WishboneRequest) -> WishboneResponse {
        (**self).tick(request)
    }
}

/// Reader states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReaderState {
    #[default]
    Idle,
    Read,
}

/// Single-word read master
///
/// `start` in IDLE latches the byte address, drops `ready` and enters READ.
/// READ presents the word address with every byte lane selected until the
/// slave acknowledges, then captures `dat_r`, raises `ready` and returns to
/// IDLE. There is no timeout: a slave that never acknowledges keeps the
/// reader in READ forever.
#[derive(Debug, Clone)]
pub struct WishboneReader {
    state: ReaderState,
    /// Byte address latched on `start`
    addr: Word,
    /// Last captured word
    data: Word,
    /// Low from `start` until the acknowledging cycle
    ready: bool,
    /// log2 of the word size in bytes
    word_shift: u32,
    /// All byte lanes
    sel: u8,
}

impl Default for WishboneReader {
    fn default() -> Self {
        Self::new()
    }
}

impl WishboneReader {
    /// 32-bit data bus
    pub fn new() -> Self {
        Self {
            state: ReaderState::Idle,
            addr: 0,
            data: 0,
            ready: true,
            word_shift: 2,
            sel: 0x0f,
        }
    }

    /// Reader for an 8, 16 or 32 bit data bus
    pub fn with_data_width(bits: u32) -> Option<Self> {
        if bits % 8 != 0 || bits > Word::BITS {
            return None;
        }
        let bytes = bits / 8;
        let word_shift = log2_exact(bytes)?;
        Some(Self {
            word_shift,
            sel: ((1u32 << bytes) - 1) as u8,
            ..Self::new()
        })
    }

    pub fn state(&self) -> ReaderState {
        self.state
    }

    pub fn ready(&self) -> bool {
        self.ready
    }

    pub fn data(&self) -> Word {
        self.data
    }

    /// Lines driven onto the bus this cycle
    pub fn request(&self) -> WishboneRequest {
        match self.state {
            ReaderState::Idle => WishboneRequest::idle(),
            ReaderState::Read => WishboneRequest {
                adr: self.addr >> self.word_shift,
                dat_w: 0,
                sel: self.sel,
                we: false,
                cyc: true,
                stb: true,
            },
        }
    }

    /// Advance one system clock, driving `bus`
    ///
    /// Returns the request presented this cycle.
    pub fn tick<S: WishboneSlave + ?Sized>(
        &mut self,
        start: bool,
        addr: Word,
        bus: &mut S,
    ) -> WishboneRequest {
        let request = self.request();
        let response = bus.tick(&request);

        match self.state {
            ReaderState::Idle if start => {
                debug!("wishbone read 0x{:08x}", addr);
                self.addr = addr;
                self.ready = false;
                self.state = ReaderState::Read;
            }
            ReaderState::Read if response.ack => {
                debug!("wishbone ack 0x{:08x} = 0x{:08x}", self.addr, response.dat_r);
                self.data = response.dat_r;
                self.ready = true;
                self.state = ReaderState::Idle;
            }
            _ => {}
        }

        request
    }
}

/// Word-addressed memory with `latency` wait states before each ack
#[derive(Debug, Clone)]
pub struct WishboneSram {
    words: Vec<Word>,
    latency: u32,
    waited: u32,
}

impl WishboneSram {
    pub fn new(words: Vec<Word>, latency: u32) -> Self {
        Self {
            words,
            latency,
            waited: 0,
        }
    }

    pub fn words(&self) -> &[Word] {
        &self.words
    }
}

impl WishboneSlave for WishboneSram {
    fn tick(&mut self, request: &WishboneRequest) -> WishboneResponse {
        if !request.active() {
            self.waited = 0;
            return WishboneResponse::default();
        }
        if self.waited < self.latency {
            self.waited += 1;
            return WishboneResponse::default();
        }
        self.waited = 0;

        let index = request.adr as Address;
        let dat_r = self.words.get(index).copied().unwrap_or(0);
        if request.we {
            if let Some(word) = self.words.get_mut(index) {
                let mask = lane_mask(request.sel);
                *word = (*word & !mask) | (request.dat_w & mask);
            }
        }
        WishboneResponse { ack: true, dat_r }
    }
}

/// Expand byte selects into a bit mask
fn lane_mask(sel: u8) -> Word {
    (0..4u32)
        .filter(|&lane| sel & (1 << lane) != 0)
        .fold(0, |mask, lane| mask | (0xff << (lane * 8)))
}
