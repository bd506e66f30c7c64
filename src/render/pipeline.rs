//! C4: projector orchestration and the per-frame render driver that ties together the splat
//! store, depth sorter, tile rasterizer, and flush stage (C2/C5/C6/C7).
//!
//! Projection is grounded in `project_splats` from `original_source/gsplat.c`; the whole-frame
//! render driver below mirrors `rasterize_splats`' tile loop, parallelized across tiles with
//! `rayon` the way the teacher's band-parallel rasterizer parallelizes across scanline bands
//! (each tile owns a private accumulator, so there is no synchronization needed during
//! accumulation — only the final flush touches the shared surface, and that happens after the
//! parallel section).

use rayon::prelude::*;

use crate::camera::Camera;
use crate::kernel::{FixedGaussianLut, FloatGaussianLut};
use crate::sort::sort_by_depth;
use crate::splat::{
    compute_3sigma_extent, invert_2x2_covariance, project_covariance_to_2d, splat3d_cov_matrix,
    Splat2D, Splat2DFixed, BBox, NEAR_EPSILON,
};
use crate::store::{Regime, SplatStore};
use crate::surface::Surface;

use super::flush::{flush_tile_fixed, flush_tile_float};
use super::rasterizer::{rasterize_splat_fixed, rasterize_splat_float};
use super::tile::{tile_count, TileAccumulatorFixed, TileAccumulatorFloat, TILE_H, TILE_W};

/// Projects every splat in `store` into its float 2D record (step 1-8 of §4.4).
pub fn project_all_float(store: &mut SplatStore, camera: &Camera, width: usize, height: usize) {
    debug_assert_eq!(store.regime(), Regime::Float);
    store.ensure_2d_capacity();
    let (fx, fy) = camera.focal_lengths(width, height);
    let cx = width as f32 * 0.5;
    let cy = height as f32 * 0.5;

    let len = store.splats().len();
    for i in 0..len {
        let splat = store.splats()[i];
        store.splats_2d_float_mut()[i] = project_one_float(&splat, camera, fx, fy, cx, cy, width, height);
    }
}

fn project_one_float(
    splat: &crate::splat::Splat3D,
    camera: &Camera,
    fx: f32,
    fy: f32,
    cx: f32,
    cy: f32,
    width: usize,
    height: usize,
) -> Splat2D {
    let view_pos = camera.world_to_view(splat.position);
    if view_pos.z >= -NEAR_EPSILON {
        return Splat2D::CULLED;
    }

    let iz = -1.0 / view_pos.z;
    let sx = fx * view_pos.x * iz + cx;
    let sy = fy * view_pos.y * iz + cy;
    let depth = -view_pos.z;

    let cov3d = splat3d_cov_matrix(splat);
    let (ca, cb, cc) = project_covariance_to_2d(cov3d, camera, view_pos, fx, fy);

    let Some((inv_a, inv_b2, inv_c)) = invert_2x2_covariance(ca, cb, cc) else {
        return Splat2D::CULLED;
    };

    let (rx, ry) = compute_3sigma_extent(ca, cc);
    let mut bx0 = sx - rx;
    let mut by0 = sy - ry;
    let mut bx1 = sx + rx;
    let mut by1 = sy + ry;

    if bx1 < 0.0 || by1 < 0.0 || bx0 >= width as f32 || by0 >= height as f32 || bx0.is_nan() || by0.is_nan() {
        return Splat2D::CULLED;
    }

    bx0 = bx0.max(0.0);
    by0 = by0.max(0.0);
    bx1 = bx1.min(width as f32 - 1.0);
    by1 = by1.min(height as f32 - 1.0);

    Splat2D {
        sx,
        sy,
        depth,
        inv_cov: (inv_a, inv_b2, inv_c),
        color: [splat.color[0] as f32 / 255.0, splat.color[1] as f32 / 255.0, splat.color[2] as f32 / 255.0],
        opacity: splat.opacity as f32 / 255.0,
        bbox: BBox { x0: bx0 as i32, y0: by0 as i32, x1: bx1 as i32, y1: by1 as i32 },
    }
}

/// Projects every splat in `store` into its fixed-point 2D record, with the same fixed-width
/// clamps (`cov_a/c <= 3.999`, `cov_b2` in `[-4, 3.999]`) as `project_splats` in the C source.
pub fn project_all_fixed(store: &mut SplatStore, camera: &Camera, width: usize, height: usize) {
    debug_assert_eq!(store.regime(), Regime::Fixed);
    store.ensure_2d_capacity();
    let (fx, fy) = camera.focal_lengths(width, height);
    let cx = width as f32 * 0.5;
    let cy = height as f32 * 0.5;

    let len = store.splats().len();
    for i in 0..len {
        let splat = store.splats()[i];
        store.splats_2d_fixed_mut()[i] = project_one_fixed(&splat, camera, fx, fy, cx, cy, width, height);
    }
}

fn project_one_fixed(
    splat: &crate::splat::Splat3D,
    camera: &Camera,
    fx: f32,
    fy: f32,
    cx: f32,
    cy: f32,
    width: usize,
    height: usize,
) -> Splat2DFixed {
    let float_splat = project_one_float(splat, camera, fx, fy, cx, cy, width, height);
    if float_splat.is_culled() {
        return Splat2DFixed::CULLED;
    }

    let (inv_a, inv_b2, inv_c) = float_splat.inv_cov;
    let inv_a = inv_a.min(3.999);
    let inv_c = inv_c.min(3.999);
    let inv_b2 = inv_b2.clamp(-4.0, 3.999);

    Splat2DFixed {
        sx_fp: (float_splat.sx * 16.0 + 0.5) as i32,
        sy_fp: (float_splat.sy * 16.0 + 0.5) as i32,
        depth: float_splat.depth,
        cov_a_fp: (inv_a * 16384.0 + 0.5) as u16,
        cov_b2_fp: (inv_b2 * 16384.0) as i32,
        cov_c_fp: (inv_c * 16384.0 + 0.5) as u16,
        color: splat.color,
        opacity: splat.opacity,
        bbox: float_splat.bbox,
    }
}

/// Produces the back-to-front traversal permutation for the store's current 2D array (C5).
pub fn sort_store(store: &mut SplatStore) {
    let depths: Vec<f32> = match store.regime() {
        Regime::Float => store.splats_2d_float().iter().map(|s| s.depth).collect(),
        Regime::Fixed => store.splats_2d_fixed().iter().map(|s| s.depth).collect(),
    };
    let idx = store.sort_index_mut();
    sort_by_depth(&depths, idx);
}

/// Rasterizes and flushes every tile of the surface from the store's float 2D array and
/// permutation, in tile-row-major order with tile-level accumulation parallelized via rayon.
pub fn render_frame_float(store: &SplatStore, lut: &FloatGaussianLut, surface: &mut dyn Surface, simd: bool) {
    let width = surface.width();
    let height = surface.height();
    let tiles_x = tile_count(width, TILE_W);
    let tiles_y = tile_count(height, TILE_H);
    let splats = store.splats_2d_float();
    let order = store.sort_index();

    let accumulators: Vec<TileAccumulatorFloat> = (0..tiles_x * tiles_y)
        .into_par_iter()
        .map(|tile_idx| {
            let tile_x = tile_idx % tiles_x;
            let tile_y = tile_idx / tiles_x;
            let tpx = (tile_x * TILE_W) as i32;
            let tpy = (tile_y * TILE_H) as i32;

            let mut acc = TileAccumulatorFloat::new();
            for &idx in order {
                let splat = &splats[idx as usize];
                if !splat.bbox.overlaps_tile(tpx, tpy, TILE_W as i32, TILE_H as i32) {
                    continue;
                }
                rasterize_splat_float(&mut acc, splat, tpx, tpy, lut, simd);
            }
            acc
        })
        .collect();

    for (tile_idx, acc) in accumulators.iter().enumerate() {
        let tile_x = tile_idx % tiles_x;
        let tile_y = tile_idx / tiles_x;
        flush_tile_float(acc, surface, tile_x * TILE_W, tile_y * TILE_H);
    }
}

/// Fixed-point counterpart of [`render_frame_float`].
pub fn render_frame_fixed(store: &SplatStore, lut: &FixedGaussianLut, surface: &mut dyn Surface) {
    let width = surface.width();
    let height = surface.height();
    let tiles_x = tile_count(width, TILE_W);
    let tiles_y = tile_count(height, TILE_H);
    let splats = store.splats_2d_fixed();
    let order = store.sort_index();

    let accumulators: Vec<TileAccumulatorFixed> = (0..tiles_x * tiles_y)
        .into_par_iter()
        .map(|tile_idx| {
            let tile_x = tile_idx % tiles_x;
            let tile_y = tile_idx / tiles_x;
            let tpx = (tile_x * TILE_W) as i32;
            let tpy = (tile_y * TILE_H) as i32;

            let mut acc = TileAccumulatorFixed::new();
            for &idx in order {
                let splat = &splats[idx as usize];
                if !splat.bbox.overlaps_tile(tpx, tpy, TILE_W as i32, TILE_H as i32) {
                    continue;
                }
                rasterize_splat_fixed(&mut acc, splat, tpx, tpy, lut);
            }
            acc
        })
        .collect();

    for (tile_idx, acc) in accumulators.iter().enumerate() {
        let tile_x = tile_idx % tiles_x;
        let tile_y = tile_idx / tiles_x;
        flush_tile_fixed(acc, surface, tile_x * TILE_W, tile_y * TILE_H);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Vec3;
    use crate::splat::Splat3D;
    use crate::surface::{MemSurface, PixelFormat};

    fn camera_at_origin_facing(target: Vec3) -> Camera {
        let mut cam = Camera::new(Vec3::new(0.0, 0.0, 5.0), -std::f32::consts::FRAC_PI_2, 0.0);
        crate::camera::look_at_target(&mut cam, target);
        cam
    }

    #[test]
    fn centered_splat_projects_near_screen_center() {
        let camera = camera_at_origin_facing(Vec3::ZERO);
        let mut store = SplatStore::new(4, Regime::Float);
        store.push(Splat3D::new(Vec3::ZERO, [0.01, 0.0, 0.0, 0.01, 0.0, 0.01], [255, 0, 0], 255)).unwrap();
        project_all_float(&mut store, &camera, 640, 480);
        let s2 = &store.splats_2d_float()[0];
        assert!(!s2.is_culled());
        assert!((s2.sx - 320.0).abs() < 5.0);
        assert!((s2.sy - 240.0).abs() < 5.0);
    }

    #[test]
    fn splat_behind_camera_is_culled() {
        let camera = camera_at_origin_facing(Vec3::ZERO);
        let mut store = SplatStore::new(4, Regime::Float);
        let behind = camera.position + camera.forward * -2.0;
        store.push(Splat3D::new(behind, [0.01, 0.0, 0.0, 0.01, 0.0, 0.01], [0, 255, 0], 255)).unwrap();
        project_all_float(&mut store, &camera, 640, 480);
        assert!(store.splats_2d_float()[0].is_culled());
    }

    #[test]
    fn empty_store_renders_without_panic() {
        let store = SplatStore::new(4, Regime::Float);
        let lut = FloatGaussianLut::new();
        let mut surface = MemSurface::new(64, 64, PixelFormat::Argb8888);
        render_frame_float(&store, &lut, &mut surface, false);
        // Flush still runs over every tile, so untouched pixels are opaque black, not all-zero.
        assert!(surface.as_bytes().chunks(4).all(|p| p == [0, 0, 0, 0xFF]));
    }

    #[test]
    fn single_central_splat_paints_visible_pixels() {
        let camera = camera_at_origin_facing(Vec3::ZERO);
        let mut store = SplatStore::new(4, Regime::Float);
        store.push(Splat3D::new(Vec3::ZERO, [0.02, 0.0, 0.0, 0.02, 0.0, 0.02], [255, 0, 0], 255)).unwrap();
        project_all_float(&mut store, &camera, 64, 64);
        sort_store(&mut store);

        let lut = FloatGaussianLut::new();
        let mut surface = MemSurface::new(64, 64, PixelFormat::Argb8888);
        render_frame_float(&store, &lut, &mut surface, false);
        assert!(surface.as_bytes().iter().any(|&b| b != 0));
    }
}
