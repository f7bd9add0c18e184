//! Stream Contract
//!
//! This module defines the per-clock producer/consumer link every stage
//! shares: the timing sample flowing into a pattern, the color sample
//! flowing out of it, and the `valid`/`ready` handshake between them.
//!
//! A transfer happens only on a cycle where both `valid` and `ready` hold.
//! `ready` flows opposite to data: the sink of a stage reports it upstream,
//! the source of a stage receives it from downstream.

use rgb::RGB8;

use crate::common::Coord;

/// One sample from the video timing source
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimingSample {
    /// Horizontal counter (spans the full line, blanking included)
    pub hcount: Coord,
    /// Vertical counter (spans the full frame, blanking included)
    pub vcount: Coord,
    /// Horizontal sync pulse
    pub hsync: bool,
    /// Vertical sync pulse
    pub vsync: bool,
    /// Data enable (inside the active area)
    pub de: bool,
    /// Producer has a sample on offer
    pub valid: bool,
    /// Backpressure seen by the timing source on the previous cycle
    pub ready: bool,
    /// First sample of a frame (`hcount == 0 && vcount == 0`)
    pub first: bool,
    /// Last sample of a frame
    pub last: bool,
}

impl TimingSample {
    /// True when this sample opens a new frame
    pub fn is_frame_start(&self) -> bool {
        self.valid && self.first && self.hcount == 0 && self.vcount == 0
    }
}

/// One output pixel plus the timing fields propagated with it
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ColorSample {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub valid: bool,
    /// Downstream ready, echoed through the stage
    pub ready: bool,
    pub last: bool,
    pub de: bool,
    pub hsync: bool,
    pub vsync: bool,
}

impl ColorSample {
    /// Build a sample carrying `timing`'s propagated fields and `color`
    pub fn from_timing(timing: &TimingSample, color: RGB8, ready: bool) -> Self {
        Self {
            r: color.r,
            g: color.g,
            b: color.b,
            valid: timing.valid,
            ready,
            last: timing.last,
            de: timing.de,
            hsync: timing.hsync,
            vsync: timing.vsync,
        }
    }

    /// An idle output: nothing offered, black
    pub fn idle(ready: bool) -> Self {
        Self {
            ready,
            ..Self::default()
        }
    }

    /// Color channels as an RGB triple
    pub fn rgb(&self) -> RGB8 {
        RGB8::new(self.r, self.g, self.b)
    }

    /// True when this cycle transfers the sample downstream
    pub fn transfers(&self) -> bool {
        transfer(self.valid, self.ready)
    }
}

/// Handshake rule shared by every link
#[inline]
pub fn transfer(valid: bool, ready: bool) -> bool {
    valid && ready
}

/// Result of one clock cycle of a pattern stage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Handshake {
    /// `ready` reported back to the timing source
    pub sink_ready: bool,
    /// Sample offered to the downstream sink
    pub source: ColorSample,
}

impl Handshake {
    /// True when the stage consumed `sink` this cycle
    pub fn consumed(&self, sink: &TimingSample) -> bool {
        transfer(sink.valid, self.sink_ready)
    }
}

/// A pattern stage clocked in the pixel domain
///
/// `tick` evaluates the stage's combinational outputs for the current
/// cycle from its registers and inputs, then commits the next register
/// state as the clock edge would.
pub trait Pattern {
    /// Advance one pixel-clock cycle
    ///
    /// `source_ready` is the downstream sink's `ready`; `enable` is the raw
    /// system-domain enable flag (stages that honor it synchronize it).
    fn tick(&mut self, sink: &TimingSample, source_ready: bool, enable: bool) -> Handshake;

    /// Discard in-flight pipeline state
    fn reset(&mut self) {}

    /// Runtime-writable stripe boundaries, for stages that expose them
    fn stripe_registers(&mut self) -> Option<&mut crate::bars::StripeRegisters> {
        None
    }

    /// Short human-readable name
    fn name(&self) -> &'static str;
}

impl<P: Pattern + ?Sized> Pattern for Box<P> {
    fn tick(&mut self, sink: &TimingSample, source_ready: bool, enable: bool) -> Handshake {
        (**self).tick(sink, source_ready, enable)
    }

    fn reset(&mut self) {
        (**self).reset()
    }

    fn stripe_registers(&mut self) -> Option<&mut crate::bars::StripeRegisters> {
        (**self).stripe_registers()
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}
