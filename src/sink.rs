//! Display Sink
//!
//! Stand-in for the display PHY at the end of the pixel pipeline. Every
//! transferred `de` sample is written to the next position of an ARGB32
//! framebuffer in raster order, and the sample flagged `last` completes the
//! frame. Completed frames are double buffered: `front` always holds the
//! most recent whole frame.
//!
//! A frame in progress that sees a cycle with nothing offered has lost its
//! place (the pattern was disabled or reset mid-frame). It is discarded, and
//! the next offered sample opens a fresh frame.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use log::{info, warn};
use rgb::RGB8;

use crate::error::AssetError;
use crate::memory::{pack_rgb, unpack_rgb};
use crate::stream::ColorSample;

/// Opaque ARGB32 word for a color
#[inline]
pub fn argb(color: RGB8) -> u32 {
    0xFF00_0000 | pack_rgb(color)
}

/// Raster framebuffer fed by the pixel stream
#[derive(Debug, Clone)]
pub struct FrameBuffer {
    width: u32,
    height: u32,
    /// Frame being drawn
    back: Vec<u32>,
    /// Last completed frame
    front: Vec<u32>,
    /// Active pixels received this frame
    index: usize,
    in_frame: bool,
    torn: bool,
    /// Withhold `ready` one cycle in every `stall_period` (0 never stalls)
    stall_period: u32,
    cycle: u64,
    /// Completed frames
    pub frames: u64,
    /// Discarded partial frames
    pub torn_frames: u64,
}

impl FrameBuffer {
    pub fn new(width: u32, height: u32) -> Self {
        let len = (width * height) as usize;
        Self {
            width,
            height,
            back: vec![0xFF00_0000; len],
            front: vec![0xFF00_0000; len],
            index: 0,
            in_frame: false,
            torn: false,
            stall_period: 0,
            cycle: 0,
            frames: 0,
            torn_frames: 0,
        }
    }

    /// Apply backpressure one cycle in every `period`
    pub fn with_stall_period(mut self, period: u32) -> Self {
        self.stall_period = period;
        self
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// `ready` driven back into the pipeline this cycle
    pub fn ready(&self) -> bool {
        let period = self.stall_period as u64;
        period == 0 || self.cycle % period != period - 1
    }

    /// Last completed frame, ARGB32 raster order
    pub fn front(&self) -> &[u32] {
        &self.front
    }

    /// Pixel of the last completed frame
    pub fn pixel(&self, x: u32, y: u32) -> RGB8 {
        self.front
            .get((y * self.width + x) as usize)
            .map(|&p| unpack_rgb(p))
            .unwrap_or_default()
    }

    fn frame_len(&self) -> usize {
        (self.width * self.height) as usize
    }

    /// Clock edge: take `sample` if it transfers
    pub fn tick(&mut self, sample: &ColorSample) {
        let ready = self.ready();
        self.cycle += 1;
        if !ready {
            return;
        }

        if !sample.valid {
            if self.in_frame {
                self.torn = true;
            }
            return;
        }

        if self.torn {
            warn!(
                "discarding partial frame after {} of {} pixels",
                self.index,
                self.frame_len()
            );
            self.torn_frames += 1;
            self.torn = false;
            self.index = 0;
        }
        self.in_frame = true;

        if sample.de {
            if let Some(slot) = self.back.get_mut(self.index) {
                *slot = argb(sample.rgb());
            }
            self.index += 1;
        }

        if sample.last {
            if self.index == self.frame_len() {
                std::mem::swap(&mut self.back, &mut self.front);
                self.frames += 1;
            } else {
                warn!(
                    "frame ended with {} of {} pixels",
                    self.index,
                    self.frame_len()
                );
                self.torn_frames += 1;
            }
            self.index = 0;
            self.in_frame = false;
        }
    }

    /// Write the last completed frame as an RGBA PNG
    pub fn save_png<P: AsRef<Path>>(&self, path: P) -> Result<(), AssetError> {
        let path = path.as_ref();
        let file = File::create(path)?;
        let w = BufWriter::new(file);
        let mut encoder = png::Encoder::new(w, self.width, self.height);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header()?;

        let mut rgba = Vec::with_capacity(self.front.len() * 4);
        for &pixel in &self.front {
            let c = unpack_rgb(pixel);
            rgba.extend_from_slice(&[c.r, c.g, c.b, 0xFF]);
        }
        writer.write_image_data(&rgba)?;
        info!("wrote {}x{} snapshot to {}", self.width, self.height, path.display());
        Ok(())
    }
}
