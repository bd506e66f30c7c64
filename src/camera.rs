//! Camera model and view matrix (§4.3).
//!
//! Holds an explicit column-major 4x4 view matrix `view` alongside the yaw/pitch/basis
//! representation used by the movement helpers; `update_vectors` keeps the two in sync. The
//! sign convention matches the projector: a world point in front of the camera has a *negative*
//! view-space z, as in `original_source/gsplat.c`'s `cam_lookat`/`cam_project`.

use crate::math::{Mat4, Vec3};

#[derive(Debug, Clone)]
pub struct Camera {
    pub position: Vec3,
    pub forward: Vec3,
    pub right: Vec3,
    pub up: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    /// Column-major 4x4 view matrix: world-space point -> view-space point.
    pub view: Mat4,
}

impl Camera {
    pub fn new(position: Vec3, yaw: f32, pitch: f32) -> Self {
        let mut camera = Self {
            position,
            forward: Vec3::new(0.0, 0.0, -1.0),
            right: Vec3::new(1.0, 0.0, 0.0),
            up: Vec3::new(0.0, 1.0, 0.0),
            yaw,
            pitch,
            fov: std::f32::consts::PI / 3.0,
            near: 0.1,
            far: 1000.0,
            view: crate::math::MAT4_IDENTITY,
        };
        camera.update_vectors();
        camera
    }

    pub fn update_vectors(&mut self) {
        let forward = Vec3::new(
            self.yaw.cos() * self.pitch.cos(),
            self.pitch.sin(),
            self.yaw.sin() * self.pitch.cos(),
        )
        .normalize();

        let world_up = Vec3::new(0.0, 1.0, 0.0);
        let right = forward.cross(world_up).normalize();
        let up = right.cross(forward).normalize();

        self.forward = forward;
        self.right = if right.length_squared() < 1e-6 {
            Vec3::new(1.0, 0.0, 0.0)
        } else {
            right
        };
        self.up = up;
        self.view = look_at(self.position, self.right, self.up, self.forward);
    }

    /// World-space point to view space, `z` negative in front of the camera.
    pub fn world_to_view(&self, point: Vec3) -> Vec3 {
        crate::math::mat4_transform_point(&self.view, point)
    }

    pub fn focal_lengths(&self, width: usize, height: usize) -> (f32, f32) {
        let h = height.max(1) as f32;
        let w = width.max(1) as f32;
        let tan_half = (self.fov * 0.5).tan().max(1e-6);
        let fy = h / (2.0 * tan_half);
        let fx = fy * (w / h);
        (fx, fy)
    }
}

/// Builds the view matrix from an orthonormal camera basis, the way `cam_lookat` does in the
/// fixed-point renderer: row 0/1 are `right`/`up`, row 2 is `-forward` so that points in front
/// of the camera land at negative view-space z, row 3 is translation-only.
fn look_at(position: Vec3, right: Vec3, up: Vec3, forward: Vec3) -> Mat4 {
    let neg_forward = forward * -1.0;
    let tx = -right.dot(position);
    let ty = -up.dot(position);
    let tz = -neg_forward.dot(position);
    [
        right.x, up.x, neg_forward.x, 0.0,
        right.y, up.y, neg_forward.y, 0.0,
        right.z, up.z, neg_forward.z, 0.0,
        tx, ty, tz, 1.0,
    ]
}

pub fn reset(camera: &mut Camera) {
    *camera = Camera::new(Vec3::new(0.0, 0.0, 5.0), -std::f32::consts::FRAC_PI_2, 0.0);
}

pub fn move_forward(camera: &mut Camera, distance: f32) {
    camera.position += camera.forward * distance;
    camera.update_vectors();
}

pub fn move_right(camera: &mut Camera, distance: f32) {
    camera.position += camera.right * distance;
    camera.update_vectors();
}

pub fn move_up(camera: &mut Camera, distance: f32) {
    let world_up = crate::math::Vec3::new(0.0, 1.0, 0.0);
    camera.position += world_up * distance;
    camera.update_vectors();
}

pub fn adjust_pitch(camera: &mut Camera, delta: f32) {
    camera.pitch = (camera.pitch + delta).clamp(-1.5, 1.5);
    camera.update_vectors();
}

pub fn adjust_yaw(camera: &mut Camera, delta: f32) {
    camera.yaw += delta;
    camera.update_vectors();
}

pub fn look_at_target(camera: &mut Camera, target: Vec3) {
    let to_target = (target - camera.position).normalize();
    if to_target.length_squared() < 1e-8 {
        return;
    }
    camera.yaw = to_target.z.atan2(to_target.x);
    camera.pitch = to_target.y.clamp(-1.0, 1.0).asin();
    camera.update_vectors();
}

/// Places the camera on a fixed-radius orbit around the origin, looking inward. Used by the
/// frame driver for the `-frames` benchmark loop (mirrors `main.c`'s `angle = frame * 0.02f`).
pub fn orbit(camera: &mut Camera, angle: f32, radius: f32, height: f32) {
    camera.position = Vec3::new(angle.cos() * radius, height, angle.sin() * radius);
    look_at_target(camera, Vec3::ZERO);
}
