//! Whole-system runs: timing generator, pattern, sink and CSR bus together

use rgb::RGB8;

use vidpat::asset::save_mem;
use vidpat::bars::{BarsRenderer, ColorBars, COLOR_BARS};
use vidpat::config::{Config, PatternKind};
use vidpat::csr::{boundary_address, CSR_ENABLE, CSR_FRAMES, CSR_STRIPES};
use vidpat::gate::Gated;
use vidpat::memory::{unpack_rgb, PixelLookupTable, TileMap};
use vidpat::sink::FrameBuffer;
use vidpat::sprite::{SpriteRenderer, SPRITE_RED};
use vidpat::stream::Pattern;
use vidpat::system::VideoSystem;
use vidpat::tilemap::{TileGeometry, TilemapRenderer};
use vidpat::timing::VideoTimings;

const RED: RGB8 = RGB8::new(0xff, 0, 0);
const GREEN: RGB8 = RGB8::new(0, 0xff, 0);
const BLUE: RGB8 = RGB8::new(0, 0, 0xff);
const WHITE: RGB8 = RGB8::new(0xff, 0xff, 0xff);
const BLACK: RGB8 = RGB8::new(0, 0, 0);

const SYS_CLK_HZ: u64 = 27_000_000;

fn rgbw_bars(width: u32, height: u32) -> BarsRenderer {
    let tiles = PixelLookupTable::solid_tiles(&[RED, GREEN, BLUE, WHITE], 16, 16);
    BarsRenderer::configurable(TileGeometry::new(width, height, 16, 16), tiles).unwrap()
}

#[test]
fn test_vga_bars_are_160_pixel_bands() {
    let mut sys = VideoSystem::new(VideoTimings::VGA_60, SYS_CLK_HZ, Box::new(rgbw_bars(640, 480)));
    assert!(sys.run_frame());

    for y in [0, 1, 239, 479] {
        for x in 0..640 {
            let expected = [RED, GREEN, BLUE, WHITE][(x / 160) as usize];
            assert_eq!(sys.sink.pixel(x, y), expected, "pixel ({}, {})", x, y);
        }
    }
    assert_eq!(sys.sink.torn_frames, 0);
}

#[test]
fn test_csr_reads_through_bus() {
    let timings = VideoTimings::tiny(64, 16);
    let mut sys = VideoSystem::new(timings, SYS_CLK_HZ, Box::new(rgbw_bars(64, 16)));

    assert_eq!(sys.read_csr(CSR_ENABLE), Some(1));
    assert_eq!(sys.read_csr(CSR_STRIPES), Some(4));
    for (i, expected) in [0, 16, 32, 48].into_iter().enumerate() {
        assert_eq!(sys.read_csr(boundary_address(i)), Some(expected));
    }

    sys.run_frame();
    sys.run_frame();
    let frames = sys.read_csr(CSR_FRAMES).unwrap();
    assert_eq!(frames as u64, sys.sink.frames);
}

#[test]
fn test_boundary_write_moves_stripe() {
    let timings = VideoTimings::tiny(64, 16);
    let mut sys = VideoSystem::new(timings, SYS_CLK_HZ, Box::new(rgbw_bars(64, 16)));
    sys.run_frame();

    // Stripe 2 (blue) now starts at 24 instead of 32
    sys.write_csr(boundary_address(2), 24);
    sys.run_frame();
    sys.run_frame();

    assert_eq!(sys.sink.pixel(15, 3), RED);
    assert_eq!(sys.sink.pixel(23, 3), GREEN);
    assert_eq!(sys.sink.pixel(24, 3), BLUE);
    assert_eq!(sys.sink.pixel(47, 3), BLUE);
    assert_eq!(sys.sink.pixel(48, 3), WHITE);
}

#[test]
fn test_gated_sprite_frame_aligned() {
    let timings = VideoTimings::tiny(64, 32);
    let rom = PixelLookupTable::solid(8 * 8, SPRITE_RED);
    let sprite = SpriteRenderer::fixed(rom, 8, 8, 10, 5, 64, 32).unwrap();
    let mut sys = VideoSystem::new(timings, SYS_CLK_HZ, Box::new(Gated::new(sprite)));

    assert!(sys.run_frame());
    assert_eq!(sys.sink.torn_frames, 0, "gate must not emit a partial first frame");

    for y in 0..32 {
        for x in 0..64 {
            let inside = (10..18).contains(&x) && (5..13).contains(&y);
            let expected = if inside { SPRITE_RED } else { BLACK };
            assert_eq!(sys.sink.pixel(x, y), expected, "pixel ({}, {})", x, y);
        }
    }
}

#[test]
fn test_bouncing_sprite_moves_each_frame() {
    let timings = VideoTimings::tiny(64, 32);
    let rom = PixelLookupTable::solid(4 * 4, SPRITE_RED);
    let sprite = SpriteRenderer::bouncing(rom, 4, 4, 64, 32).unwrap();
    let mut sys = VideoSystem::new(timings, SYS_CLK_HZ, Box::new(Gated::new(sprite)));

    let mut corners = Vec::new();
    for _ in 0..3 {
        assert!(sys.run_frame());
        let corner = (0..32)
            .flat_map(|y| (0..64).map(move |x| (x, y)))
            .find(|&(x, y)| sys.sink.pixel(x, y) == SPRITE_RED);
        corners.push(corner);
    }
    let corners: Vec<(u32, u32)> = corners.into_iter().map(|c| c.unwrap()).collect();
    for pair in corners.windows(2) {
        assert_eq!(pair[1].0, pair[0].0 + 1);
        assert_eq!(pair[1].1, pair[0].1 + 1);
    }
}

#[test]
fn test_disable_mid_frame_never_publishes_torn_frame() {
    let timings = VideoTimings::tiny(32, 32);
    let pattern = Gated::new(ColorBars::new());
    let mut sys = VideoSystem::new(timings, SYS_CLK_HZ, Box::new(pattern));

    assert!(sys.run_frame());
    let reference = sys.sink.front().to_vec();
    let frames = sys.sink.frames;

    // Half way into the next frame's active area
    sys.run_pixels(timings.h_total() as u64 * 10);
    sys.set_enable(false);
    assert!(!sys.run_frame(), "disabled pattern completes no frame");
    assert_eq!(sys.sink.frames, frames);

    sys.set_enable(true);
    assert!(sys.run_frame());
    assert_eq!(sys.sink.frames, frames + 1);
    assert_eq!(sys.sink.torn_frames, 1);
    assert_eq!(sys.sink.front(), &reference[..]);
}

#[test]
fn test_color_bars_bands() {
    let timings = VideoTimings::tiny(16, 64);
    let mut sys = VideoSystem::new(timings, SYS_CLK_HZ, Box::new(Gated::new(ColorBars::new())));
    assert!(sys.run_frame());
    // Registered band: the first pixel of each band's first line still
    // shows the previous band
    for band in 0..8u32 {
        let y = band * 8 + 1;
        assert_eq!(sys.sink.pixel(5, y), COLOR_BARS[band as usize], "line {}", y);
    }
}

#[test]
fn test_tilemap_under_backpressure() {
    let timings = VideoTimings::tiny(64, 32);
    let geometry = TileGeometry::new(64, 32, 16, 16);
    let tile_count = 3;
    let len = geometry.tile_len() * tile_count;
    let tiles = PixelLookupTable::new((0..len as u32).map(unpack_rgb).collect(), len).unwrap();
    let map = TileMap::generate(geometry.tiles_x(), geometry.tiles_y(), tile_count, 99);
    let renderer = TilemapRenderer::from_map(geometry, tiles, map.clone()).unwrap();

    let mut sys = VideoSystem::new(timings, SYS_CLK_HZ, Box::new(Gated::new(renderer)))
        .with_sink(FrameBuffer::new(64, 32).with_stall_period(3));

    assert!(sys.run_frame());
    assert_eq!(sys.sink.torn_frames, 0);
    for y in 0..32 {
        for x in 0..64 {
            let tile = map.get((y / 16 * 4 + x / 16) as usize) as u32;
            let address = tile * 256 + (y % 16) * 16 + (x % 16);
            assert_eq!(sys.sink.pixel(x, y), unpack_rgb(address), "pixel ({}, {})", x, y);
        }
    }
}

#[test]
fn test_logo_from_asset_bounces() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("logo.mem");

    // 4x2 logo, gray background with two colored pixels
    let gray = RGB8::new(0x40, 0x40, 0x40);
    let mut pixels = vec![gray; 8];
    pixels[0] = RED;
    pixels[7] = BLUE;
    save_mem(&path, &PixelLookupTable::new(pixels, 8).unwrap()).unwrap();

    let config = Config {
        pattern: PatternKind::Logo,
        custom_timing: Some(VideoTimings::tiny(64, 32)),
        sprite: Some(path),
        sprite_width: Some(4),
        sprite_height: Some(2),
        logo_background: Some("404040".into()),
        ..Config::default()
    };
    config.validate().unwrap();
    let mut sys = config.build_system().unwrap();
    assert_eq!(sys.pattern.name(), "logo");

    let mut corners = Vec::new();
    for _ in 0..3 {
        assert!(sys.run_frame());
        let (x, y) = (0..32)
            .flat_map(|y| (0..64).map(move |x| (x, y)))
            .find(|&(x, y)| sys.sink.pixel(x, y) == RED)
            .unwrap();
        assert_eq!(sys.sink.pixel(x + 3, y + 1), BLUE);
        // Background knocked out to black
        assert_eq!(sys.sink.pixel(x + 1, y), BLACK);
        assert_eq!(sys.sink.pixel(x, y + 1), BLACK);
        corners.push((x, y));
    }
    for pair in corners.windows(2) {
        assert_eq!(pair[1], (pair[0].0 + 1, pair[0].1 + 1));
    }
    assert_eq!(sys.sink.torn_frames, 0);
}
