//! Video System
//!
//! Wires the whole engine together across its two clock domains:
//! - pixel domain: timing generator -> pattern -> display sink
//! - system domain: CSR bank, and a Wishbone reader for register reads
//!
//! The scheduler interleaves the two clocks by their frequencies. The only
//! signal crossing into the pixel domain bit by bit is ENABLE, which every
//! gated pattern synchronizes itself. Stripe boundary writes are handed
//! over whole on the next pixel edge.

use log::{debug, info};

use crate::common::Word;
use crate::csr::{CsrBank, CSR_FRAMES};
use crate::sink::FrameBuffer;
use crate::stream::Pattern;
use crate::timing::{TimingGenerator, VideoTimings};
use crate::wishbone::WishboneReader;

/// System-domain cycles a host read may wait before giving up
pub const READ_TIMEOUT_CYCLES: u64 = 1_000;

/// Which clock edges fire on a scheduler step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Sys,
    Pixel,
    Both,
}

impl Edge {
    pub fn sys(self) -> bool {
        matches!(self, Edge::Sys | Edge::Both)
    }

    pub fn pixel(self) -> bool {
        matches!(self, Edge::Pixel | Edge::Both)
    }
}

/// Two-clock edge scheduler
///
/// Edge `n` of a clock at `f` Hz happens at `n / f` seconds; the next edge
/// is found by cross-multiplying, so no rounding accumulates.
#[derive(Debug, Clone)]
pub struct ClockScheduler {
    sys_hz: u64,
    pix_hz: u64,
    /// System-domain edges so far
    pub sys_ticks: u64,
    /// Pixel-domain edges so far
    pub pix_ticks: u64,
}

impl ClockScheduler {
    pub fn new(sys_hz: u64, pix_hz: u64) -> Self {
        Self {
            sys_hz: sys_hz.max(1),
            pix_hz: pix_hz.max(1),
            sys_ticks: 0,
            pix_ticks: 0,
        }
    }

    /// Advance to the next edge
    pub fn next(&mut self) -> Edge {
        let sys_at = (self.sys_ticks as u128 + 1) * self.pix_hz as u128;
        let pix_at = (self.pix_ticks as u128 + 1) * self.sys_hz as u128;
        let edge = match sys_at.cmp(&pix_at) {
            std::cmp::Ordering::Less => Edge::Sys,
            std::cmp::Ordering::Greater => Edge::Pixel,
            std::cmp::Ordering::Equal => Edge::Both,
        };
        if edge.sys() {
            self.sys_ticks += 1;
        }
        if edge.pixel() {
            self.pix_ticks += 1;
        }
        edge
    }
}

/// Complete pattern engine: both clock domains and everything in them
pub struct VideoSystem {
    pub timing: TimingGenerator,
    pub pattern: Box<dyn Pattern>,
    pub sink: FrameBuffer,
    pub csr: CsrBank,
    pub reader: WishboneReader,
    pub clocks: ClockScheduler,
    /// Host read waiting to be started on the next system edge
    pending_read: Option<Word>,
}

impl VideoSystem {
    pub fn new(timings: VideoTimings, sys_clk_hz: u64, mut pattern: Box<dyn Pattern>) -> Self {
        let boundaries = pattern
            .stripe_registers()
            .map(|regs| regs.boundaries().to_vec())
            .unwrap_or_default();
        info!(
            "video system: {} on {}x{} ({} Hz pixel, {} Hz system)",
            pattern.name(),
            timings.h_active,
            timings.v_active,
            timings.pix_clk_hz,
            sys_clk_hz
        );
        Self {
            timing: TimingGenerator::new(timings),
            pattern,
            sink: FrameBuffer::new(timings.h_active, timings.v_active),
            csr: CsrBank::new(boundaries),
            reader: WishboneReader::new(),
            clocks: ClockScheduler::new(sys_clk_hz, timings.pix_clk_hz),
            pending_read: None,
        }
    }

    /// Replace the display sink (for stall patterns)
    pub fn with_sink(mut self, sink: FrameBuffer) -> Self {
        self.sink = sink;
        self
    }

    /// Advance to the next clock edge
    pub fn step(&mut self) -> Edge {
        let edge = self.clocks.next();
        if edge.sys() {
            self.tick_sys();
        }
        if edge.pixel() {
            self.tick_pixel();
        }
        edge
    }

    /// One system-domain clock
    pub fn tick_sys(&mut self) {
        self.csr.frames = self.sink.frames as Word;
        let start = self.pending_read.take();
        self.reader
            .tick(start.is_some(), start.unwrap_or(0), &mut self.csr);
    }

    /// One pixel-domain clock
    pub fn tick_pixel(&mut self) {
        if let Some(boundaries) = self.csr.take_boundaries() {
            if let Some(regs) = self.pattern.stripe_registers() {
                for (i, &value) in boundaries.iter().enumerate() {
                    regs.write(i, value);
                }
            }
        }

        let sample = self.timing.current();
        let ready = self.sink.ready();
        let out = self.pattern.tick(&sample, ready, self.csr.enable);
        self.sink.tick(&out.source);
        self.timing.tick(out.sink_ready);
    }

    /// Run until the sink completes a frame
    ///
    /// Gives up after three frame periods of pixel clocks, which only
    /// happens while the pattern is disabled. Returns whether a frame
    /// completed.
    pub fn run_frame(&mut self) -> bool {
        let frames = self.sink.frames;
        let limit = self.clocks.pix_ticks + 3 * self.timing.timings().frame_cycles();
        while self.sink.frames == frames {
            if self.clocks.pix_ticks >= limit {
                debug!("no frame completed within {} pixel clocks", limit);
                return false;
            }
            self.step();
        }
        true
    }

    /// Run `count` pixel clocks (and the system clocks between them)
    pub fn run_pixels(&mut self, count: u64) {
        let target = self.clocks.pix_ticks + count;
        while self.clocks.pix_ticks < target {
            self.step();
        }
    }

    /// Host write to a CSR, visible from the next system edge
    pub fn write_csr(&mut self, address: Word, value: Word) {
        self.csr.write(address, value);
    }

    /// Host read of a CSR through the Wishbone reader
    ///
    /// Blocks the host, not the simulation: both domains keep running while
    /// the read is outstanding. `None` if the reader is still busy after
    /// `READ_TIMEOUT_CYCLES` system clocks.
    pub fn read_csr(&mut self, address: Word) -> Option<Word> {
        self.pending_read = Some(address);
        let deadline = self.clocks.sys_ticks + READ_TIMEOUT_CYCLES;
        // Wait until the start has been taken
        while self.pending_read.is_some() || !self.reader.ready() {
            if self.clocks.sys_ticks >= deadline {
                self.pending_read = None;
                return None;
            }
            self.step();
        }
        Some(self.reader.data())
    }

    /// Frame counter as seen on the bus
    pub fn read_frames(&mut self) -> Option<Word> {
        self.read_csr(CSR_FRAMES)
    }

    pub fn set_enable(&mut self, enable: bool) {
        self.write_csr(crate::csr::CSR_ENABLE, enable as Word);
    }
}
