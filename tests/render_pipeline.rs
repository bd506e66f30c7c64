//! End-to-end scenarios exercising the whole frame loop (project -> sort -> rasterize -> flush)
//! against an in-memory surface, without any CLI process or real I/O device.

use gsplat_core::camera::{self, Camera};
use gsplat_core::kernel::FloatGaussianLut;
use gsplat_core::math::Vec3;
use gsplat_core::render::pipeline::{project_all_float, render_frame_float, sort_store};
use gsplat_core::splat::Splat3D;
use gsplat_core::store::{Regime, SplatStore};
use gsplat_core::surface::{MemSurface, PixelFormat, Surface};
use gsplat_core::transport::{packed_image, serial};

fn camera_facing_origin() -> Camera {
    let mut cam = Camera::new(Vec3::new(0.0, 0.0, 5.0), -std::f32::consts::FRAC_PI_2, 0.0);
    camera::look_at_target(&mut cam, Vec3::ZERO);
    cam
}

fn render_once(store: &mut SplatStore, camera: &Camera, surface: &mut MemSurface) {
    project_all_float(store, camera, surface.width(), surface.height());
    sort_store(store);
    let lut = FloatGaussianLut::new();
    render_frame_float(store, &lut, surface, true);
}

/// A tile with nothing rasterized into it still gets flushed, so its pixels are opaque black
/// (`0x00, 0x00, 0x00, 0xFF` in Argb8888's little-endian B,G,R,A order), not all-zero bytes.
fn is_opaque_black(bytes: &[u8]) -> bool {
    bytes.chunks(4).all(|p| p == [0, 0, 0, 0xFF])
}

#[test]
fn empty_scene_renders_a_blank_surface() {
    let mut store = SplatStore::new(1, Regime::Float);
    let camera = camera_facing_origin();
    let mut surface = MemSurface::new(64, 64, PixelFormat::Argb8888);
    render_once(&mut store, &camera, &mut surface);
    assert!(is_opaque_black(surface.as_bytes()));
}

#[test]
fn single_central_splat_paints_the_surface_center() {
    let mut store = SplatStore::new(1, Regime::Float);
    store.push(Splat3D::new(Vec3::ZERO, [0.02, 0.0, 0.0, 0.02, 0.0, 0.02], [255, 0, 0], 255)).unwrap();
    let camera = camera_facing_origin();
    let mut surface = MemSurface::new(64, 64, PixelFormat::Argb8888);
    render_once(&mut store, &camera, &mut surface);

    let stride = surface.stride();
    let base = 32 * stride + 32 * 4;
    let bytes = surface.as_bytes();
    // Argb8888 byte order is B,G,R,A; a red splat should dominate the red channel at center.
    assert!(bytes[base + 2] > 128);
}

#[test]
fn two_splats_composite_back_to_front_nearer_wins() {
    let mut store = SplatStore::new(2, Regime::Float);
    // Far splat: red, placed behind the near splat along the camera's view axis.
    store.push(Splat3D::new(Vec3::new(0.0, 0.0, 1.0), [0.05, 0.0, 0.0, 0.05, 0.0, 0.05], [255, 0, 0], 255)).unwrap();
    // Near splat: blue, fully opaque, should occlude the far one at the surface center.
    store.push(Splat3D::new(Vec3::new(0.0, 0.0, 2.0), [0.05, 0.0, 0.0, 0.05, 0.0, 0.05], [0, 0, 255], 255)).unwrap();

    let camera = camera_facing_origin();
    let mut surface = MemSurface::new(64, 64, PixelFormat::Argb8888);
    render_once(&mut store, &camera, &mut surface);

    let stride = surface.stride();
    let base = 32 * stride + 32 * 4;
    let bytes = surface.as_bytes();
    assert!(bytes[base] > bytes[base + 2], "nearer opaque blue splat should dominate over the farther red one");
}

#[test]
fn splat_behind_the_camera_is_culled_from_output() {
    let camera = camera_facing_origin();
    let mut store = SplatStore::new(1, Regime::Float);
    let behind = camera.position + camera.forward * -2.0;
    store.push(Splat3D::new(behind, [0.02, 0.0, 0.0, 0.02, 0.0, 0.02], [0, 255, 0], 255)).unwrap();
    let mut surface = MemSurface::new(64, 64, PixelFormat::Argb8888);
    render_once(&mut store, &camera, &mut surface);
    assert!(is_opaque_black(surface.as_bytes()));
}

#[test]
fn degenerate_covariance_is_culled_not_panicked() {
    let camera = camera_facing_origin();
    let mut store = SplatStore::new(1, Regime::Float);
    // Cross term (xy) dwarfs the diagonal: the projected 2D covariance determinant goes negative
    // even after the EWA regularizer, so this must cull rather than propagate NaN/inf downstream.
    store.push(Splat3D::new(Vec3::ZERO, [1.0, 100.0, 0.0, 1.0, 0.0, 1.0], [255, 255, 255], 255)).unwrap();
    let mut surface = MemSurface::new(64, 64, PixelFormat::Argb8888);
    render_once(&mut store, &camera, &mut surface);
    assert!(is_opaque_black(surface.as_bytes()));
}

#[test]
fn serial_transport_round_trips_a_full_scene_through_the_pipeline() {
    let original = vec![
        Splat3D::new(Vec3::new(0.1, -0.2, 0.3), [0.1, 0.0, 0.0, 0.1, 0.0, 0.1], [10, 20, 30], 200),
        Splat3D::new(Vec3::new(-0.3, 0.4, -0.1), [0.2, 0.0, 0.0, 0.2, 0.0, 0.2], [200, 150, 100], 255),
    ];
    let mut wire = Vec::new();
    serial::encode_splats(&mut wire, &original).unwrap();

    let mut cursor = std::io::Cursor::new(wire);
    let decoded = serial::decode_splats(&mut cursor).unwrap();
    assert_eq!(decoded.len(), original.len());

    let mut store = SplatStore::new(decoded.len(), Regime::Float);
    for splat in decoded {
        store.push(splat).unwrap();
    }

    let camera = camera_facing_origin();
    let mut surface = MemSurface::new(64, 64, PixelFormat::Argb8888);
    render_once(&mut store, &camera, &mut surface);
    assert!(surface.as_bytes().iter().any(|&b| b != 0));
}

#[test]
fn packed_image_transport_round_trips_a_full_scene_through_the_pipeline() {
    let original = vec![Splat3D::new(Vec3::new(0.0, 0.0, 0.0), [0.1, 0.0, 0.0, 0.1, 0.0, 0.1], [255, 255, 0], 255)];
    let bytes = packed_image::encode_splats(&original);
    let decoded = packed_image::decode_splats(&bytes).unwrap();
    assert_eq!(decoded.len(), 1);

    let mut store = SplatStore::new(1, Regime::Float);
    store.push(decoded[0]).unwrap();

    let camera = camera_facing_origin();
    let mut surface = MemSurface::new(64, 64, PixelFormat::Argb8888);
    render_once(&mut store, &camera, &mut surface);
    assert!(surface.as_bytes().iter().any(|&b| b != 0));
}
