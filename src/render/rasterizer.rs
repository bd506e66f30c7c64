//! C6: tile rasterizer, float and fixed-point regimes.
//!
//! Both regimes walk the same shape of loop: clip the splat's bbox to the tile, then for each
//! covered pixel evaluate an analytic 2D Gaussian and blend it "over" the accumulator, relying on
//! the caller having already ordered splats back-to-front. The fixed-point path is a direct port
//! of `rasterize_splat_tile` in `original_source/gsplat.c`, incremental finite-difference updates
//! included; the float path is the same algorithm at f32 precision, with an optional
//! `wide::f32x4`-widened inner loop for the quadratic-form evaluation (grounded in tiny-skia's
//! `pipeline::highp` use of `wide` for per-pixel math).

use wide::f32x4;

use crate::kernel::{FixedGaussianLut, FloatGaussianLut, FIXED_D2_CUTOFF_FP, FLOAT_D2_CUTOFF};
use crate::splat::{Splat2D, Splat2DFixed};

use super::tile::{TileAccumulatorFixed, TileAccumulatorFloat, TILE_H, TILE_W};

const MIN_WEIGHT: f32 = 1.0 / 255.0;

/// Clips a splat's screen bbox to a tile's local `[0, TILE_W) x [0, TILE_H)` range. Returns
/// `None` if the clipped range is empty.
fn clip_to_tile(
    bbox: crate::splat::BBox,
    tile_x0: i32,
    tile_y0: i32,
) -> Option<(i32, i32, i32, i32)> {
    let x0 = (bbox.x0 - tile_x0).max(0);
    let y0 = (bbox.y0 - tile_y0).max(0);
    let x1 = (bbox.x1 - tile_x0).min(TILE_W as i32 - 1);
    let y1 = (bbox.y1 - tile_y0).min(TILE_H as i32 - 1);
    if x0 > x1 || y0 > y1 {
        None
    } else {
        Some((x0, y0, x1, y1))
    }
}

/// Rasterizes one splat into the float tile accumulator. `simd` enables the widened inner loop.
pub fn rasterize_splat_float(
    acc: &mut TileAccumulatorFloat,
    splat: &Splat2D,
    tile_x0: i32,
    tile_y0: i32,
    lut: &FloatGaussianLut,
    simd: bool,
) {
    let Some((x0, y0, x1, y1)) = clip_to_tile(splat.bbox, tile_x0, tile_y0) else { return };
    let (a, b2, c) = splat.inv_cov;
    let [cr, cg, cb] = splat.color;
    let alpha = splat.opacity;

    for ty in y0..=y1 {
        let py = (tile_y0 + ty) as f32 + 0.5;
        let dy = py - splat.sy;
        let term_c = c * dy * dy;
        let row = ty as usize * TILE_W;

        let dx0 = (tile_x0 + x0) as f32 + 0.5 - splat.sx;

        if simd {
            rasterize_row_simd(acc, row, x0, x1, dx0, dy, a, b2, term_c, cr, cg, cb, alpha, lut);
        } else {
            rasterize_row_scalar(acc, row, x0, x1, dx0, dy, a, b2, term_c, cr, cg, cb, alpha, lut);
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn rasterize_row_scalar(
    acc: &mut TileAccumulatorFloat,
    row: usize,
    x0: i32,
    x1: i32,
    dx0: f32,
    dy: f32,
    a: f32,
    b2: f32,
    term_c: f32,
    cr: f32,
    cg: f32,
    cb: f32,
    alpha: f32,
    lut: &FloatGaussianLut,
) {
    let mut dx = dx0;
    let mut dx2 = dx * dx;
    let mut dxdy = dx * dy;

    for tx in x0..=x1 {
        let d2 = a * dx2 + b2 * dxdy + term_c;
        if d2 < FLOAT_D2_CUTOFF {
            let g = lut.eval(d2);
            let w = g * alpha;
            if w >= MIN_WEIGHT {
                blend_pixel(acc, row + tx as usize, cr, cg, cb, w);
            }
        }
        dx2 += 2.0 * dx + 1.0;
        dxdy += dy;
        dx += 1.0;
    }
}

#[allow(clippy::too_many_arguments)]
fn rasterize_row_simd(
    acc: &mut TileAccumulatorFloat,
    row: usize,
    x0: i32,
    x1: i32,
    dx0: f32,
    dy: f32,
    a: f32,
    b2: f32,
    term_c: f32,
    cr: f32,
    cg: f32,
    cb: f32,
    alpha: f32,
    lut: &FloatGaussianLut,
) {
    let count = (x1 - x0 + 1) as usize;
    let lane_offsets = f32x4::new([0.0, 1.0, 2.0, 3.0]);
    let dy_v = f32x4::splat(dy);
    let a_v = f32x4::splat(a);
    let b2_v = f32x4::splat(b2);
    let term_c_v = f32x4::splat(term_c);

    let mut chunk_start = 0usize;
    while chunk_start < count {
        let lanes = (count - chunk_start).min(4);
        let dx_base = dx0 + chunk_start as f32;
        let dx_v = f32x4::splat(dx_base) + lane_offsets;
        let d2_v = a_v * dx_v * dx_v + b2_v * dx_v * dy_v + term_c_v;
        let d2_arr = d2_v.to_array();

        for lane in 0..lanes {
            let d2 = d2_arr[lane];
            if d2 < FLOAT_D2_CUTOFF {
                let g = lut.eval(d2);
                let w = g * alpha;
                if w >= MIN_WEIGHT {
                    let tx = x0 as usize + chunk_start + lane;
                    blend_pixel(acc, row + tx, cr, cg, cb, w);
                }
            }
        }
        chunk_start += 4;
    }
}

#[inline]
fn blend_pixel(acc: &mut TileAccumulatorFloat, idx: usize, cr: f32, cg: f32, cb: f32, w: f32) {
    let omw = 1.0 - w;
    acc.channels[0][idx] = cr * w + acc.channels[0][idx] * omw;
    acc.channels[1][idx] = cg * w + acc.channels[1][idx] * omw;
    acc.channels[2][idx] = cb * w + acc.channels[2][idx] * omw;
    acc.channels[3][idx] = w + acc.channels[3][idx] * omw;
}

/// Rasterizes one splat into the fixed-point tile accumulator. Direct port of
/// `rasterize_splat_tile`: all arithmetic is integer, pixel spacing is 16 in s14.4, and dx²/dx·dy
/// are updated incrementally rather than recomputed per pixel.
pub fn rasterize_splat_fixed(acc: &mut TileAccumulatorFixed, splat: &Splat2DFixed, tile_x0: i32, tile_y0: i32, lut: &FixedGaussianLut) {
    let Some((x0, y0, x1, y1)) = clip_to_tile(splat.bbox, tile_x0, tile_y0) else { return };

    let a_fp = splat.cov_a_fp as i64;
    let b2_fp = splat.cov_b2_fp as i64;
    let c_fp = splat.cov_c_fp as i64;
    let sx_fp = splat.sx_fp;
    let sy_fp = splat.sy_fp;

    let cr = (splat.color[0] as i32) << 2;
    let cg = (splat.color[1] as i32) << 2;
    let cb = (splat.color[2] as i32) << 2;
    let opacity = splat.opacity as i32;

    for ty in y0..=y1 {
        let dy_fp = (tile_y0 + ty) * 16 + 8 - sy_fp;
        let dy2_s = ((dy_fp as i64 * dy_fp as i64) >> 4) as i32;
        let term_c = c_fp * dy2_s as i64;

        let row = ty as usize * TILE_W;

        let mut dx_fp = (tile_x0 + x0) * 16 + 8 - sx_fp;
        let mut dx2_raw = dx_fp * dx_fp;
        let mut dxdy_raw = dx_fp * dy_fp;

        for tx in x0..=x1 {
            let dx2_s = dx2_raw >> 4;
            let dxdy_s = dxdy_raw >> 4;

            let term_a = a_fp * dx2_s as i64;
            let term_b = b2_fp * dxdy_s as i64;
            let d2_sum = (term_a + term_b + term_c) as i32;

            if d2_sum >= 0 && d2_sum < FIXED_D2_CUTOFF_FP {
                let gauss = lut.eval(d2_sum) as u32;
                let w = ((gauss * opacity as u32) >> 17) as i32;
                if w > 0 {
                    let w = w.min(128);
                    let omw = 128 - w;
                    let idx = row + tx as usize;
                    let px = &mut acc.channels;
                    px[0][idx] = ((cr * w + px[0][idx] as i32 * omw) >> 7) as u16;
                    px[1][idx] = ((cg * w + px[1][idx] as i32 * omw) >> 7) as u16;
                    px[2][idx] = ((cb * w + px[2][idx] as i32 * omw) >> 7) as u16;
                    px[3][idx] = ((1020 * w + px[3][idx] as i32 * omw) >> 7) as u16;
                }
            }

            dx2_raw += (dx_fp << 5) + 256;
            dxdy_raw += dy_fp << 4;
            dx_fp += 16;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::splat::BBox;

    fn center_splat_float() -> Splat2D {
        Splat2D {
            sx: 16.0,
            sy: 16.0,
            depth: 1.0,
            inv_cov: (1.0, 0.0, 1.0),
            color: [1.0, 0.5, 0.25],
            opacity: 1.0,
            bbox: BBox { x0: 0, y0: 0, x1: 31, y1: 31 },
        }
    }

    #[test]
    fn float_center_pixel_is_near_full_color() {
        let lut = FloatGaussianLut::new();
        let mut acc = TileAccumulatorFloat::new();
        let splat = center_splat_float();
        rasterize_splat_float(&mut acc, &splat, 0, 0, &lut, false);
        let idx = 16 * TILE_W + 16;
        assert!(acc.channels[0][idx] > 0.9, "r={}", acc.channels[0][idx]);
        assert!(acc.channels[3][idx] > 0.9, "a={}", acc.channels[3][idx]);
    }

    #[test]
    fn float_simd_and_scalar_paths_agree() {
        let lut = FloatGaussianLut::new();
        let splat = center_splat_float();

        let mut acc_scalar = TileAccumulatorFloat::new();
        rasterize_splat_float(&mut acc_scalar, &splat, 0, 0, &lut, false);

        let mut acc_simd = TileAccumulatorFloat::new();
        rasterize_splat_float(&mut acc_simd, &splat, 0, 0, &lut, true);

        for c in 0..4 {
            for i in 0..TILE_W * TILE_H {
                let diff = (acc_scalar.channels[c][i] - acc_simd.channels[c][i]).abs();
                assert!(diff < 1e-5, "channel {c} pixel {i}: scalar={} simd={}", acc_scalar.channels[c][i], acc_simd.channels[c][i]);
            }
        }
    }

    #[test]
    fn splat_outside_tile_bbox_is_noop() {
        let lut = FloatGaussianLut::new();
        let mut acc = TileAccumulatorFloat::new();
        let mut splat = center_splat_float();
        splat.bbox = BBox { x0: 100, y0: 100, x1: 110, y1: 110 };
        rasterize_splat_float(&mut acc, &splat, 0, 0, &lut, false);
        assert!(acc.channels[3].iter().all(|&a| a == 0.0));
    }

    #[test]
    fn fixed_center_pixel_is_near_full_color() {
        let lut = FixedGaussianLut::new();
        let mut acc = TileAccumulatorFixed::new();
        let splat = Splat2DFixed {
            sx_fp: 16 * 16,
            sy_fp: 16 * 16,
            depth: 1.0,
            cov_a_fp: 16384,
            cov_b2_fp: 0,
            cov_c_fp: 16384,
            color: [255, 128, 64],
            opacity: 255,
            bbox: BBox { x0: 0, y0: 0, x1: 31, y1: 31 },
        };
        rasterize_splat_fixed(&mut acc, &splat, 0, 0, &lut);
        let idx = 16 * TILE_W + 16;
        assert!(acc.channels[0][idx] > 1000, "r={}", acc.channels[0][idx]);
        assert!(acc.channels[3][idx] > 1000, "a={}", acc.channels[3][idx]);
    }
}
