//! Splat data model (§3 of the spec) and the EWA covariance math shared by both rasterizer
//! regimes. Orchestration (iterating a whole store, culling, writing into the parallel 2D
//! arrays) lives in `render::pipeline`; this module is the per-splat math kernel.

use crate::camera::Camera;
use crate::math::{mat3_mul, mat3_transpose, mat4_rotation_part, quat_to_rotation_matrix, Mat3, Vec3};

/// Depth value assigned to a culled splat. Always sorts to the far end of a back-to-front
/// permutation and is never treated as a real distance.
pub const DEPTH_SENTINEL: f32 = f32::INFINITY;

/// Minimum admissible determinant for a projected 2D covariance (invariant 1, §3).
pub const MIN_2D_DET: f32 = 1e-8;

/// Near-plane epsilon in world units (§4.4 step 1).
pub const NEAR_EPSILON: f32 = 0.1;

/// EWA low-pass regularizer added to both diagonal entries of the screen-space covariance.
pub const EWA_REGULARIZER: f32 = 0.3;

/// A 3D anisotropic Gaussian primitive, immutable for the duration of a render.
#[derive(Debug, Clone, Copy)]
pub struct Splat3D {
    pub position: Vec3,
    /// Symmetric 3x3 covariance packed as (xx, xy, xz, yy, yz, zz). Must be PSD.
    pub cov: [f32; 6],
    pub color: [u8; 3],
    pub opacity: u8,
}

impl Splat3D {
    pub fn new(position: Vec3, cov: [f32; 6], color: [u8; 3], opacity: u8) -> Self {
        Self { position, cov, color, opacity }
    }

    /// Builds a Splat3D from scale + quaternion rotation, the representation used by the
    /// standard 3D Gaussian Splatting training pipeline and by the `.ply`/`.splat` loaders.
    pub fn from_scale_rotation(
        position: Vec3,
        scale: Vec3,
        rotation: [f32; 4],
        color: [u8; 3],
        opacity: u8,
    ) -> Self {
        let cov3d = compute_3d_covariance(scale, rotation);
        Self {
            position,
            cov: [cov3d[0][0], cov3d[0][1], cov3d[0][2], cov3d[1][1], cov3d[1][2], cov3d[2][2]],
            color,
            opacity,
        }
    }

    fn cov_matrix(&self) -> Mat3 {
        let [xx, xy, xz, yy, yz, zz] = self.cov;
        [[xx, xy, xz], [xy, yy, yz], [xz, yz, zz]]
    }
}

/// Axis-aligned integer screen bounding box, clipped to the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BBox {
    pub x0: i32,
    pub y0: i32,
    pub x1: i32,
    pub y1: i32,
}

impl BBox {
    pub const EMPTY: BBox = BBox { x0: 0, y0: 0, x1: 0, y1: 0 };

    /// Half-open overlap test against a tile spanning `[tile_x0, tile_x0+w) x [tile_y0, tile_y0+h)`.
    #[inline]
    pub fn overlaps_tile(&self, tile_x0: i32, tile_y0: i32, w: i32, h: i32) -> bool {
        !(self.x1 < tile_x0 || self.x0 >= tile_x0 + w || self.y1 < tile_y0 || self.y0 >= tile_y0 + h)
    }
}

/// Projected 2D splat in the float rasterizer regime.
#[derive(Debug, Clone, Copy)]
pub struct Splat2D {
    pub sx: f32,
    pub sy: f32,
    pub depth: f32,
    /// (a, B, c) of the inverse 2x2 covariance, with `B` pre-doubled (`B = 2b`), so the
    /// rasterizer's quadratic form is `a*dx^2 + B*dx*dy + c*dy^2` with no further scaling.
    pub inv_cov: (f32, f32, f32),
    pub color: [f32; 3],
    pub opacity: f32,
    pub bbox: BBox,
}

impl Splat2D {
    pub const CULLED: Splat2D = Splat2D {
        sx: 0.0,
        sy: 0.0,
        depth: DEPTH_SENTINEL,
        inv_cov: (0.0, 0.0, 0.0),
        color: [0.0, 0.0, 0.0],
        opacity: 0.0,
        bbox: BBox::EMPTY,
    };

    pub fn is_culled(&self) -> bool {
        !self.depth.is_finite()
    }
}

/// Projected 2D splat in the fixed-point rasterizer regime.
///
/// Fixed-point formats (see §4.6): screen position s14.4, inverse-covariance coefficients
/// u2.14 (`a`, `c`) / s2.14 (`b2`, already doubled), color u0.8.
#[derive(Debug, Clone, Copy)]
pub struct Splat2DFixed {
    pub sx_fp: i32,
    pub sy_fp: i32,
    pub depth: f32,
    pub cov_a_fp: u16,
    pub cov_b2_fp: i32,
    pub cov_c_fp: u16,
    pub color: [u8; 3],
    pub opacity: u8,
    pub bbox: BBox,
}

impl Splat2DFixed {
    pub const CULLED: Splat2DFixed = Splat2DFixed {
        sx_fp: 0,
        sy_fp: 0,
        depth: DEPTH_SENTINEL,
        cov_a_fp: 0,
        cov_b2_fp: 0,
        cov_c_fp: 0,
        color: [0, 0, 0],
        opacity: 0,
        bbox: BBox::EMPTY,
    };

    pub fn is_culled(&self) -> bool {
        !self.depth.is_finite()
    }
}

/// Builds the 3x3 world-space covariance `R * diag(scale^2) * R^T` from a scale vector and a
/// rotation quaternion (the representation used by trained 3DGS scenes).
pub fn compute_3d_covariance(scale: Vec3, rotation: [f32; 4]) -> Mat3 {
    let r = quat_to_rotation_matrix(rotation);
    let s2 = [
        scale.x.max(1e-4) * scale.x.max(1e-4),
        scale.y.max(1e-4) * scale.y.max(1e-4),
        scale.z.max(1e-4) * scale.z.max(1e-4),
    ];
    let d = [[s2[0], 0.0, 0.0], [0.0, s2[1], 0.0], [0.0, 0.0, s2[2]]];
    mat3_mul(mat3_mul(r, d), mat3_transpose(r))
}

/// EWA projection of a 3D covariance to a 2D screen-space forward covariance (§4.4, steps 3-5).
/// `view_pos` is the splat's camera-space position (already computed by the caller).
pub fn project_covariance_to_2d(
    cov3d: Mat3,
    camera: &Camera,
    view_pos: Vec3,
    fx: f32,
    fy: f32,
) -> (f32, f32, f32) {
    let r = mat4_rotation_part(&camera.view);
    let cov_view = mat3_mul(mat3_mul(r, cov3d), mat3_transpose(r));

    let cz = view_pos.z;
    let inv_z = 1.0 / -cz;
    let inv_z2 = inv_z * inv_z;

    let j = [
        [fx * inv_z, 0.0, fx * view_pos.x * inv_z2],
        [0.0, fy * inv_z, fy * view_pos.y * inv_z2],
    ];

    let mut w = [[0.0; 3]; 2];
    for row in 0..2 {
        for col in 0..3 {
            w[row][col] = j[row][0] * r[0][col] + j[row][1] * r[1][col] + j[row][2] * r[2][col];
        }
    }

    let mut t = [[0.0; 3]; 2];
    for row in 0..2 {
        for col in 0..3 {
            t[row][col] =
                w[row][0] * cov_view[0][col] + w[row][1] * cov_view[1][col] + w[row][2] * cov_view[2][col];
        }
    }

    let ca = t[0][0] * w[0][0] + t[0][1] * w[0][1] + t[0][2] * w[0][2] + EWA_REGULARIZER;
    let cb = t[0][0] * w[1][0] + t[0][1] * w[1][1] + t[0][2] * w[1][2];
    let cc = t[1][0] * w[1][0] + t[1][1] * w[1][1] + t[1][2] * w[1][2] + EWA_REGULARIZER;

    (ca, cb, cc)
}

/// Inverts a symmetric 2x2 matrix `[[a,b],[b,c]]`. Returns `None` if `det < MIN_2D_DET`
/// (invariant 1, §3). `b` is pre-doubled in the returned tuple (see module docs).
pub fn invert_2x2_covariance(a: f32, b: f32, c: f32) -> Option<(f32, f32, f32)> {
    let det = a * c - b * b;
    if det < MIN_2D_DET {
        return None;
    }
    let inv_det = 1.0 / det;
    Some((c * inv_det, -2.0 * b * inv_det, a * inv_det))
}

/// 3-sigma axis-aligned screen-space radius from the *forward* (pre-inversion) 2D covariance.
pub fn compute_3sigma_extent(a: f32, c: f32) -> (f32, f32) {
    (3.0 * a.max(0.0).sqrt(), 3.0 * c.max(0.0).sqrt())
}

/// Unpacks the 3x3 covariance matrix from a `Splat3D`'s packed scalars.
pub fn splat3d_cov_matrix(splat: &Splat3D) -> Mat3 {
    splat.cov_matrix()
}
