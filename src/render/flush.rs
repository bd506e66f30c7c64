//! C7: tile flush — converts a finished tile accumulator into surface pixels.
//!
//! Mirrors `tile_flush` in `original_source/gsplat.c`: the float path clamps to `[0,1]` and
//! rounds, the fixed path right-shifts the u0.10 channel straight into the target bit depth.

use crate::surface::{PixelFormat, Surface};

use super::tile::{TileAccumulatorFixed, TileAccumulatorFloat, TILE_H, TILE_W};

pub fn flush_tile_float(acc: &TileAccumulatorFloat, surface: &mut dyn Surface, tile_x0: usize, tile_y0: usize) {
    let screen_h = surface.height();
    let screen_w = surface.width();
    let format = surface.format();
    let bpp = format.bpp();

    for ty in 0..TILE_H {
        let sy = tile_y0 + ty;
        if sy >= screen_h {
            break;
        }
        let row = ty * TILE_W;
        let scanline = surface.pixel_base_mut(sy);

        for tx in 0..TILE_W {
            let sx = tile_x0 + tx;
            if sx >= screen_w {
                break;
            }
            let idx = row + tx;
            let r = (acc.channels[0][idx].clamp(0.0, 1.0) * 255.0 + 0.5) as u32;
            let g = (acc.channels[1][idx].clamp(0.0, 1.0) * 255.0 + 0.5) as u32;
            let b = (acc.channels[2][idx].clamp(0.0, 1.0) * 255.0 + 0.5) as u32;
            write_pixel(scanline, sx * bpp, format, r, g, b);
        }
    }
}

pub fn flush_tile_fixed(acc: &TileAccumulatorFixed, surface: &mut dyn Surface, tile_x0: usize, tile_y0: usize) {
    let screen_h = surface.height();
    let screen_w = surface.width();
    let format = surface.format();
    let bpp = format.bpp();

    for ty in 0..TILE_H {
        let sy = tile_y0 + ty;
        if sy >= screen_h {
            break;
        }
        let row = ty * TILE_W;
        let scanline = surface.pixel_base_mut(sy);

        for tx in 0..TILE_W {
            let sx = tile_x0 + tx;
            if sx >= screen_w {
                break;
            }
            let idx = row + tx;
            let r8 = (acc.channels[0][idx] >> 2).min(255) as u32;
            let g8 = (acc.channels[1][idx] >> 2).min(255) as u32;
            let b8 = (acc.channels[2][idx] >> 2).min(255) as u32;
            write_pixel(scanline, sx * bpp, format, r8, g8, b8);
        }
    }
}

#[inline]
fn write_pixel(scanline: &mut [u8], byte_offset: usize, format: PixelFormat, r8: u32, g8: u32, b8: u32) {
    match format {
        PixelFormat::Argb8888 => {
            let packed = 0xFF00_0000u32 | (r8 << 16) | (g8 << 8) | b8;
            scanline[byte_offset..byte_offset + 4].copy_from_slice(&packed.to_le_bytes());
        }
        PixelFormat::Rgb565 => {
            let r5 = (r8 >> 3).min(31);
            let g6 = (g8 >> 2).min(63);
            let b5 = (b8 >> 3).min(31);
            let packed = ((r5 << 11) | (g6 << 5) | b5) as u16;
            scanline[byte_offset..byte_offset + 2].copy_from_slice(&packed.to_le_bytes());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::MemSurface;

    #[test]
    fn flush_float_white_pixel_to_argb8888() {
        let mut acc = TileAccumulatorFloat::new();
        acc.channels[0][0] = 1.0;
        acc.channels[1][0] = 1.0;
        acc.channels[2][0] = 1.0;
        let mut surface = MemSurface::new(TILE_W, TILE_H, PixelFormat::Argb8888);
        flush_tile_float(&acc, &mut surface, 0, 0);
        let bytes = surface.as_bytes();
        assert_eq!(&bytes[0..4], &[0xFF, 0xFF, 0xFF, 0xFF]);
    }

    #[test]
    fn flush_fixed_full_scale_to_rgb565() {
        let mut acc = TileAccumulatorFixed::new();
        acc.channels[0][0] = 1023;
        acc.channels[1][0] = 1023;
        acc.channels[2][0] = 1023;
        let mut surface = MemSurface::new(TILE_W, TILE_H, PixelFormat::Rgb565);
        flush_tile_fixed(&acc, &mut surface, 0, 0);
        let bytes = surface.as_bytes();
        let packed = u16::from_le_bytes([bytes[0], bytes[1]]);
        assert_eq!(packed, 0xFFFF);
    }

    #[test]
    fn flush_clips_at_surface_edge() {
        let acc = TileAccumulatorFloat::new();
        let mut surface = MemSurface::new(10, 10, PixelFormat::Argb8888);
        flush_tile_float(&acc, &mut surface, 0, 0);
    }
}
