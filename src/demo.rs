use rand::{Rng, SeedableRng};
use rand::rngs::StdRng;
use std::f32::consts::TAU;
use crate::math::{clamp_u8, Vec3};
use crate::splat::Splat3D;

/// Uniform-in-ball test scene, ported from `generate_test_splats` in
/// `original_source/gsplat.c`: splats scattered in a sphere of radius 2, isotropic covariance,
/// color derived from position. `seed` makes a run reproducible (the C source fixed `srand(42)`).
pub fn generate_test_splats(count: usize, seed: u64) -> Vec<Splat3D> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut splats = Vec::with_capacity(count);

    for _ in 0..count {
        let u: f32 = rng.random();
        let v: f32 = rng.random();
        let w: f32 = rng.random();

        let theta = TAU * u;
        let phi = (2.0 * v - 1.0).acos();
        let r = 2.0 * w.cbrt();

        let position = Vec3::new(
            r * phi.sin() * theta.cos(),
            r * phi.sin() * theta.sin(),
            r * phi.cos(),
        );

        let variance = 0.005 + 0.02 * rng.random::<f32>();
        let scale = variance.sqrt();

        let color = [
            clamp_u8(128.0 + 60.0 * position.x),
            clamp_u8(128.0 + 60.0 * position.y),
            clamp_u8(128.0 + 60.0 * position.z),
        ];
        let opacity = 180 + rng.random_range(0..75u8);

        splats.push(Splat3D::from_scale_rotation(
            position,
            Vec3::new(scale, scale, scale),
            [1.0, 0.0, 0.0, 0.0],
            color,
            opacity,
        ));
    }

    splats
}
