//! Video Timing Generator
//!
//! Produces the timing stream the patterns consume: one `TimingSample` per
//! pixel clock, with counters spanning the full line/frame including
//! blanking. The generator holds its current sample until the consumer
//! accepts it.
//!
//! Per axis the layout is: active area, then blanking; the sync pulse sits
//! inside blanking, `sync_offset` pixels after the active area ends.

use serde::{Deserialize, Serialize};

use crate::common::{bits_for, Coord};
use crate::stream::TimingSample;

/// Timing parameters for one video mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoTimings {
    pub pix_clk_hz: u64,
    pub h_active: u32,
    pub h_blanking: u32,
    pub h_sync_offset: u32,
    pub h_sync_width: u32,
    pub v_active: u32,
    pub v_blanking: u32,
    pub v_sync_offset: u32,
    pub v_sync_width: u32,
}

impl VideoTimings {
    /// 640x480 @ 60Hz
    pub const VGA_60: Self = Self {
        pix_clk_hz: 25_175_000,
        h_active: 640,
        h_blanking: 160,
        h_sync_offset: 16,
        h_sync_width: 96,
        v_active: 480,
        v_blanking: 45,
        v_sync_offset: 10,
        v_sync_width: 2,
    };

    /// 640x480 @ 75Hz
    pub const VGA_75: Self = Self {
        pix_clk_hz: 31_500_000,
        h_active: 640,
        h_blanking: 200,
        h_sync_offset: 16,
        h_sync_width: 64,
        v_active: 480,
        v_blanking: 20,
        v_sync_offset: 1,
        v_sync_width: 3,
    };

    /// 800x600 @ 60Hz
    pub const SVGA_60: Self = Self {
        pix_clk_hz: 40_000_000,
        h_active: 800,
        h_blanking: 256,
        h_sync_offset: 40,
        h_sync_width: 128,
        v_active: 600,
        v_blanking: 28,
        v_sync_offset: 1,
        v_sync_width: 4,
    };

    /// Look up a preset by its conventional name (`"640x480@75Hz"`)
    pub fn preset(name: &str) -> Option<Self> {
        match name {
            "640x480@60Hz" => Some(Self::VGA_60),
            "640x480@75Hz" => Some(Self::VGA_75),
            "800x600@60Hz" => Some(Self::SVGA_60),
            _ => None,
        }
    }

    /// Names accepted by `preset`
    pub fn preset_names() -> &'static [&'static str] {
        &["640x480@60Hz", "640x480@75Hz", "800x600@60Hz"]
    }

    /// Compact timings for tests: small active area, short blanking
    pub fn tiny(h_active: u32, v_active: u32) -> Self {
        Self {
            pix_clk_hz: 1_000_000,
            h_active,
            h_blanking: 8,
            h_sync_offset: 2,
            h_sync_width: 3,
            v_active,
            v_blanking: 4,
            v_sync_offset: 1,
            v_sync_width: 2,
        }
    }

    pub fn h_total(&self) -> u32 {
        self.h_active + self.h_blanking
    }

    pub fn v_total(&self) -> u32 {
        self.v_active + self.v_blanking
    }

    /// Pixel clocks per frame
    pub fn frame_cycles(&self) -> u64 {
        self.h_total() as u64 * self.v_total() as u64
    }

    /// Width of the `hcount`/`vcount` fields in bits
    pub fn counter_bits(&self) -> (u32, u32) {
        (
            bits_for(self.h_total() as u64 - 1),
            bits_for(self.v_total() as u64 - 1),
        )
    }

    /// Check the sync pulses fit inside blanking
    pub fn is_consistent(&self) -> bool {
        self.h_active > 0
            && self.v_active > 0
            && self.h_sync_offset + self.h_sync_width <= self.h_blanking
            && self.v_sync_offset + self.v_sync_width <= self.v_blanking
    }
}

/// Timing source driving the pixel pipeline
#[derive(Debug, Clone)]
pub struct TimingGenerator {
    timings: VideoTimings,
    hcount: Coord,
    vcount: Coord,
    /// Consumer ready seen on the last cycle
    ready: bool,
    /// Completed frames
    pub frames: u64,
}

impl TimingGenerator {
    pub fn new(timings: VideoTimings) -> Self {
        Self {
            timings,
            hcount: 0,
            vcount: 0,
            ready: false,
            frames: 0,
        }
    }

    pub fn timings(&self) -> &VideoTimings {
        &self.timings
    }

    /// Sample offered this cycle
    pub fn current(&self) -> TimingSample {
        let t = &self.timings;
        let (h, v) = (self.hcount, self.vcount);
        let hsync_start = t.h_active + t.h_sync_offset;
        let vsync_start = t.v_active + t.v_sync_offset;
        TimingSample {
            hcount: h,
            vcount: v,
            hsync: h >= hsync_start && h < hsync_start + t.h_sync_width,
            vsync: v >= vsync_start && v < vsync_start + t.v_sync_width,
            de: h < t.h_active && v < t.v_active,
            valid: true,
            ready: self.ready,
            first: h == 0 && v == 0,
            last: h == t.h_total() - 1 && v == t.v_total() - 1,
        }
    }

    /// Clock edge: advance the counters if the sample transferred
    pub fn tick(&mut self, ready: bool) {
        self.ready = ready;
        if !ready {
            return;
        }
        self.hcount += 1;
        if self.hcount >= self.timings.h_total() {
            self.hcount = 0;
            self.vcount += 1;
            if self.vcount >= self.timings.v_total() {
                self.vcount = 0;
                self.frames += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        assert_eq!(VideoTimings::preset("640x480@75Hz"), Some(VideoTimings::VGA_75));
        assert_eq!(VideoTimings::preset("1x1@1Hz"), None);
        for name in VideoTimings::preset_names() {
            let t = VideoTimings::preset(name).unwrap();
            assert!(t.is_consistent(), "{} inconsistent", name);
        }
        assert_eq!(VideoTimings::VGA_60.frame_cycles(), 800 * 525);
        assert_eq!(VideoTimings::VGA_75.counter_bits(), (10, 9));
    }

    #[test]
    fn test_first_and_last() {
        let t = VideoTimings::tiny(4, 2);
        let mut gen = TimingGenerator::new(t);

        assert!(gen.current().first);
        assert!(gen.current().de);

        let total = t.frame_cycles();
        let mut firsts = 0;
        let mut lasts = 0;
        for i in 0..total {
            let s = gen.current();
            if s.first {
                firsts += 1;
                assert_eq!(i, 0);
            }
            if s.last {
                lasts += 1;
                assert_eq!(i, total - 1);
            }
            gen.tick(true);
        }
        assert_eq!((firsts, lasts), (1, 1));
        assert_eq!(gen.frames, 1);
        assert!(gen.current().first);
    }

    #[test]
    fn test_de_and_sync_regions() {
        let t = VideoTimings::tiny(4, 2);
        let mut gen = TimingGenerator::new(t);
        let mut de = 0;
        let mut hsync = 0;
        let mut vsync_lines = 0;
        for _ in 0..t.frame_cycles() {
            let s = gen.current();
            de += s.de as u32;
            hsync += s.hsync as u32;
            if s.vsync && s.hcount == 0 {
                vsync_lines += 1;
            }
            gen.tick(true);
        }
        assert_eq!(de, 4 * 2);
        assert_eq!(hsync, t.h_sync_width * t.v_total());
        assert_eq!(vsync_lines, t.v_sync_width);
    }

    #[test]
    fn test_holds_sample_without_ready() {
        let mut gen = TimingGenerator::new(VideoTimings::tiny(4, 2));
        gen.tick(true);
        let held = gen.current();
        gen.tick(false);
        gen.tick(false);
        let now = gen.current();
        assert_eq!(now.hcount, held.hcount);
        assert!(!now.ready);
        gen.tick(true);
        assert_eq!(gen.current().hcount, held.hcount + 1);
    }
}
