//! Configuration
//!
//! Everything needed to build a `VideoSystem`: which pattern to run, the
//! video mode, clock frequencies, geometry and optional asset files.
//! Deserialized from JSON; every field has a default, so `{}` is a valid
//! configuration.

use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};
use rgb::RGB8;
use serde::{Deserialize, Serialize};

use crate::asset;
use crate::bars::{BarsRenderer, ColorBars, COLOR_BARS};
use crate::error::{AssetError, ConfigError};
use crate::gate::Gated;
use crate::memory::PixelLookupTable;
use crate::sink::FrameBuffer;
use crate::sprite::{SpriteRenderer, SPRITE_RED};
use crate::stream::Pattern;
use crate::system::VideoSystem;
use crate::tilemap::{TileGeometry, TilemapRenderer};
use crate::timing::VideoTimings;

/// Default system clock, Hz
pub const SYS_CLK_HZ: u64 = 27_000_000;

/// Selectable patterns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum PatternKind {
    /// Evenly spaced stripes
    Bars,
    /// Stripes with CSR-writable boundaries
    #[default]
    ConfigurableBars,
    /// Eight horizontal color bands
    ColorBars,
    /// Tiled background
    Tilemap,
    /// Fixed sprite
    Sprite,
    /// Bouncing solid sprite
    BouncingSprite,
    /// Bouncing sprite loaded from a `.mem` asset
    Logo,
}

impl PatternKind {
    pub const ALL: [PatternKind; 7] = [
        PatternKind::Bars,
        PatternKind::ConfigurableBars,
        PatternKind::ColorBars,
        PatternKind::Tilemap,
        PatternKind::Sprite,
        PatternKind::BouncingSprite,
        PatternKind::Logo,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            PatternKind::Bars => "bars",
            PatternKind::ConfigurableBars => "configurable-bars",
            PatternKind::ColorBars => "color-bars",
            PatternKind::Tilemap => "tilemap",
            PatternKind::Sprite => "sprite",
            PatternKind::BouncingSprite => "bouncing-sprite",
            PatternKind::Logo => "logo",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub pattern: PatternKind,
    /// Video mode preset name
    pub timing: String,
    /// Explicit timings, overriding `timing`
    pub custom_timing: Option<VideoTimings>,
    pub sys_clk_hz: u64,
    pub tile_width: u32,
    pub tile_height: u32,
    /// Sprite size; 16x16 for solid sprites, 64x64 for the logo when unset
    pub sprite_width: Option<u32>,
    pub sprite_height: Option<u32>,
    /// Fixed sprite position
    pub sprite_x: u32,
    pub sprite_y: u32,
    /// Seed for generated tilemaps
    pub seed: u64,
    /// Tileset ROM, `.mem`
    pub tileset: Option<PathBuf>,
    /// Tile indices, one hex value per line
    pub tilemap: Option<PathBuf>,
    /// Sprite ROM, `.mem`
    pub sprite: Option<PathBuf>,
    /// Logo color loaded as black, six hex digits
    pub logo_background: Option<String>,
    /// Stripe colors as six hex digits, one stripe each
    pub stripe_colors: Vec<String>,
    pub sync_stages: usize,
    /// Wrap the configurable bars in an activation gate
    pub gated_bars: bool,
    /// Sink backpressure: one stalled cycle in every `stall_period` (0 = none)
    pub stall_period: u32,
    /// ENABLE after reset
    pub enable: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pattern: PatternKind::default(),
            timing: "640x480@75Hz".into(),
            custom_timing: None,
            sys_clk_hz: SYS_CLK_HZ,
            tile_width: 16,
            tile_height: 16,
            sprite_width: None,
            sprite_height: None,
            sprite_x: 100,
            sprite_y: 50,
            seed: 1,
            tileset: None,
            tilemap: None,
            sprite: None,
            logo_background: None,
            stripe_colors: ["ff0000", "00ff00", "0000ff", "ffffff"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            sync_stages: crate::sync::MIN_SYNC_STAGES,
            gated_bars: false,
            stall_period: 0,
            enable: true,
        }
    }
}

impl Config {
    /// Load and validate a JSON configuration file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&text)?;
        config.validate()?;
        info!("loaded config from {}", path.display());
        Ok(config)
    }

    /// Resolved video timings
    pub fn timings(&self) -> Result<VideoTimings, ConfigError> {
        match self.custom_timing {
            Some(t) => Ok(t),
            None => VideoTimings::preset(&self.timing).ok_or_else(|| {
                ConfigError::Invalid(format!(
                    "unknown timing {:?}, expected one of {}",
                    self.timing,
                    VideoTimings::preset_names().join(", ")
                ))
            }),
        }
    }

    pub fn geometry(&self) -> Result<TileGeometry, ConfigError> {
        let t = self.timings()?;
        Ok(TileGeometry::new(
            t.h_active,
            t.v_active,
            self.tile_width,
            self.tile_height,
        ))
    }

    /// Sprite size with the per-pattern default
    pub fn sprite_size(&self) -> (u32, u32) {
        let default = match self.pattern {
            PatternKind::Logo => 64,
            _ => 16,
        };
        (
            self.sprite_width.unwrap_or(default),
            self.sprite_height.unwrap_or(default),
        )
    }

    pub fn stripe_palette(&self) -> Result<Vec<RGB8>, ConfigError> {
        self.stripe_colors
            .iter()
            .enumerate()
            .map(|(i, c)| {
                asset::decode_line(c, i + 1)
                    .map_err(|e| ConfigError::Invalid(format!("stripe color: {}", e)))
            })
            .collect()
    }

    pub fn logo_background(&self) -> Result<Option<RGB8>, ConfigError> {
        self.logo_background
            .as_deref()
            .map(|c| {
                asset::decode_line(c, 1)
                    .map_err(|e| ConfigError::Invalid(format!("logo background: {}", e)))
            })
            .transpose()
    }

    /// Reject configurations no pattern can be built from
    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = self.timings()?;
        if !t.is_consistent() {
            return Err(ConfigError::Invalid(format!(
                "sync pulses do not fit blanking in {:?}",
                t
            )));
        }
        if t.pix_clk_hz == 0 || self.sys_clk_hz == 0 {
            return Err(ConfigError::Invalid("clock frequency of zero".into()));
        }
        if self.tile_width == 0 || self.tile_height == 0 {
            return Err(ConfigError::Invalid(format!(
                "tile size {}x{}",
                self.tile_width, self.tile_height
            )));
        }
        let (sw, sh) = self.sprite_size();
        if sw == 0 || sh == 0 || sw > t.h_active || sh > t.v_active {
            return Err(ConfigError::Invalid(format!(
                "sprite size {}x{} on a {}x{} screen",
                sw, sh, t.h_active, t.v_active
            )));
        }
        if self.pattern == PatternKind::Sprite
            && (self.sprite_x > t.h_active - sw || self.sprite_y > t.v_active - sh)
        {
            return Err(ConfigError::Invalid(format!(
                "{}x{} sprite at ({}, {}) leaves the {}x{} screen",
                sw, sh, self.sprite_x, self.sprite_y, t.h_active, t.v_active
            )));
        }
        if self.pattern == PatternKind::Tilemap
            && (t.h_active % self.tile_width != 0 || t.v_active % self.tile_height != 0)
        {
            return Err(ConfigError::Invalid(format!(
                "{}x{} screen is not a whole number of {}x{} tiles",
                t.h_active, t.v_active, self.tile_width, self.tile_height
            )));
        }
        if self.stripe_colors.is_empty() {
            return Err(ConfigError::Invalid("no stripe colors".into()));
        }
        self.stripe_palette()?;
        self.logo_background()?;
        if self.sync_stages < crate::sync::MIN_SYNC_STAGES {
            warn!(
                "sync_stages {} raised to {}",
                self.sync_stages,
                crate::sync::MIN_SYNC_STAGES
            );
        }
        Ok(())
    }

    /// Tileset from the configured file, or one solid tile per color
    fn tileset(&self, colors: &[RGB8]) -> Result<PixelLookupTable, ConfigError> {
        match &self.tileset {
            Some(path) => {
                let text = fs::read_to_string(path).map_err(AssetError::from)?;
                let tile_len = ((self.tile_width * self.tile_height) as usize).max(1);
                let lines = text.lines().filter(|l| !l.trim().is_empty()).count();
                // A partial trailing tile fails the length check
                Ok(asset::parse_mem(&text, lines - lines % tile_len)?)
            }
            None => Ok(PixelLookupTable::solid_tiles(
                colors,
                self.tile_width,
                self.tile_height,
            )),
        }
    }

    /// Build the configured pattern
    pub fn build_pattern(&self) -> Result<Box<dyn Pattern>, ConfigError> {
        let geometry = self.geometry()?;
        let stages = self.sync_stages;

        let pattern: Box<dyn Pattern> = match self.pattern {
            PatternKind::Bars => {
                let tiles = self.tileset(&self.stripe_palette()?)?;
                Box::new(BarsRenderer::fixed(geometry, tiles)?)
            }
            PatternKind::ConfigurableBars => {
                let tiles = self.tileset(&self.stripe_palette()?)?;
                let bars = BarsRenderer::configurable(geometry, tiles)?;
                if self.gated_bars {
                    Box::new(Gated::with_sync_stages(bars, stages))
                } else {
                    Box::new(bars)
                }
            }
            PatternKind::ColorBars => Box::new(Gated::with_sync_stages(ColorBars::new(), stages)),
            PatternKind::Tilemap => {
                let tiles = self.tileset(&COLOR_BARS)?;
                let map = match &self.tilemap {
                    Some(path) => Some(asset::load_tilemap(path)?),
                    None => None,
                };
                let renderer = TilemapRenderer::new(geometry, tiles, map, self.seed)?;
                Box::new(Gated::with_sync_stages(renderer, stages))
            }
            PatternKind::Sprite => {
                let (w, h) = self.sprite_size();
                let rom = self.sprite_rom(w, h)?;
                let sprite = SpriteRenderer::fixed(
                    rom,
                    w,
                    h,
                    self.sprite_x,
                    self.sprite_y,
                    geometry.screen_w,
                    geometry.screen_h,
                )?;
                Box::new(Gated::with_sync_stages(sprite, stages))
            }
            PatternKind::Logo => {
                let path = self.sprite.as_ref().ok_or_else(|| {
                    ConfigError::Invalid("logo pattern needs a sprite asset".into())
                })?;
                let (w, h) = self.sprite_size();
                let sprite = SpriteRenderer::from_asset(
                    path,
                    w,
                    h,
                    geometry.screen_w,
                    geometry.screen_h,
                    self.logo_background()?,
                )?;
                Box::new(Gated::with_sync_stages(sprite, stages))
            }
            PatternKind::BouncingSprite => {
                let (w, h) = self.sprite_size();
                let rom = self.sprite_rom(w, h)?;
                let sprite =
                    SpriteRenderer::bouncing(rom, w, h, geometry.screen_w, geometry.screen_h)?;
                Box::new(Gated::with_sync_stages(sprite, stages))
            }
        };
        Ok(pattern)
    }

    fn sprite_rom(&self, w: u32, h: u32) -> Result<PixelLookupTable, ConfigError> {
        let len = (w * h) as usize;
        match &self.sprite {
            Some(path) => Ok(asset::load_mem(path, len)?),
            None => Ok(PixelLookupTable::solid(len, SPRITE_RED)),
        }
    }

    /// Build the whole system
    pub fn build_system(&self) -> Result<VideoSystem, ConfigError> {
        let timings = self.timings()?;
        let pattern = self.build_pattern()?;
        let mut system = VideoSystem::new(timings, self.sys_clk_hz, pattern);
        if self.stall_period > 0 {
            system = system.with_sink(
                FrameBuffer::new(timings.h_active, timings.v_active)
                    .with_stall_period(self.stall_period),
            );
        }
        system.set_enable(self.enable);
        Ok(system)
    }
}
