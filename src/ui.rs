//! SDL2 Viewer
//!
//! Presents the display sink's last completed frame in a window.
//! Escape quits, `E` toggles the ENABLE register.

use sdl2::event::Event;
use sdl2::keyboard::Keycode;
use sdl2::pixels::PixelFormatEnum;
use sdl2::render::{Canvas, TextureCreator};
use sdl2::video::{Window, WindowContext};
use sdl2::EventPump;
use std::time::{Duration, Instant};

use log::{info, warn};

use crate::csr::CSR_ENABLE;
use crate::system::VideoSystem;

/// Pixels per source pixel in each direction
pub const SCALE: u32 = 1;

/// SDL2 window wrapper
pub struct Ui {
    canvas: Canvas<Window>,
    event_pump: EventPump,
    texture_creator: TextureCreator<WindowContext>,
    width: u32,
    height: u32,
}

impl Ui {
    /// Open a window sized for a `width` x `height` frame
    pub fn new(width: u32, height: u32) -> Result<Self, String> {
        let sdl_context = sdl2::init()?;
        let video_subsystem = sdl_context.video()?;

        let window = video_subsystem
            .window("vidpat", width * SCALE, height * SCALE)
            .position_centered()
            .build()
            .map_err(|e| e.to_string())?;

        let canvas = window
            .into_canvas()
            .software()
            .build()
            .map_err(|e| e.to_string())?;

        let texture_creator = canvas.texture_creator();
        let event_pump = sdl_context.event_pump()?;

        Ok(Self {
            canvas,
            event_pump,
            texture_creator,
            width,
            height,
        })
    }

    /// Run the system, one frame per refresh, until the window closes
    pub fn run(&mut self, system: &mut VideoSystem) -> Result<(), String> {
        let mut texture = self
            .texture_creator
            .create_texture_streaming(PixelFormatEnum::ARGB8888, self.width, self.height)
            .map_err(|e| e.to_string())?;

        let timings = *system.timing.timings();
        let refresh_hz = timings.pix_clk_hz as f64 / timings.frame_cycles() as f64;
        let frame_duration = Duration::from_secs_f64(1.0 / refresh_hz);
        info!("viewer running at {:.2} Hz", refresh_hz);

        'running: loop {
            let frame_start = Instant::now();

            for event in self.event_pump.poll_iter() {
                match event {
                    Event::Quit { .. } => break 'running,
                    Event::KeyDown {
                        keycode: Some(Keycode::Escape),
                        ..
                    } => break 'running,
                    Event::KeyDown {
                        keycode: Some(Keycode::E),
                        repeat: false,
                        ..
                    } => {
                        let enable = system.read_csr(CSR_ENABLE).unwrap_or(0) == 0;
                        info!("enable = {}", enable);
                        system.set_enable(enable);
                    }
                    _ => {}
                }
            }

            if !system.run_frame() {
                warn!("no frame this refresh");
            }

            let bytes: Vec<u8> = system
                .sink
                .front()
                .iter()
                .flat_map(|p| p.to_ne_bytes())
                .collect();
            texture
                .update(None, &bytes, self.width as usize * 4)
                .map_err(|e| e.to_string())?;

            self.canvas.clear();
            self.canvas.copy(&texture, None, None)?;
            self.canvas.present();

            let elapsed = frame_start.elapsed();
            if elapsed < frame_duration {
                std::thread::sleep(frame_duration - elapsed);
            }
        }

        Ok(())
    }
}
