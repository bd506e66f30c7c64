//! Tile geometry and the two tile accumulator shapes (§3, "Tile accumulator").
//!
//! Both accumulators are sized to comfortably fit inside one L1 data cache partition: 32x32x4
//! channels. The fixed variant packs each channel into a `u16` (u0.10 meaningful range), matching
//! `tile_buf[TILE_H*TILE_W*4]` in `original_source/gsplat.c`; the float variant is the same shape
//! in `f32` for the optionally-SIMD-widened regime.

pub const TILE_W: usize = 32;
pub const TILE_H: usize = 32;

/// Number of tiles needed to cover `extent` pixels along one axis, rounding up.
pub fn tile_count(extent: usize, tile_extent: usize) -> usize {
    extent.div_ceil(tile_extent)
}

#[derive(Clone)]
pub struct TileAccumulatorFloat {
    /// RGBA, row-major, 4 channels per pixel.
    pub channels: [[f32; TILE_W * TILE_H]; 4],
}

impl TileAccumulatorFloat {
    pub fn new() -> Self {
        Self { channels: [[0.0; TILE_W * TILE_H]; 4] }
    }

    pub fn clear(&mut self) {
        for c in &mut self.channels {
            c.fill(0.0);
        }
    }
}

impl Default for TileAccumulatorFloat {
    fn default() -> Self {
        Self::new()
    }
}

/// u0.10 fixed-point accumulator: 1020 represents 1.0 (color shifted left by 2 before blending).
#[derive(Clone)]
pub struct TileAccumulatorFixed {
    pub channels: [[u16; TILE_W * TILE_H]; 4],
}

impl TileAccumulatorFixed {
    pub fn new() -> Self {
        Self { channels: [[0u16; TILE_W * TILE_H]; 4] }
    }

    pub fn clear(&mut self) {
        for c in &mut self.channels {
            c.fill(0);
        }
    }
}

impl Default for TileAccumulatorFixed {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tile_count_rounds_up() {
        assert_eq!(tile_count(640, TILE_W), 20);
        assert_eq!(tile_count(100, 32), 4);
        assert_eq!(tile_count(0, 32), 0);
    }

    #[test]
    fn accumulator_fits_l1_budget() {
        let size = std::mem::size_of::<TileAccumulatorFixed>();
        assert!(size <= 16 * 1024, "fixed tile accumulator is {size} bytes, budget is 16KB");
    }
}
