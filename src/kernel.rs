//! C1: Gaussian kernel lookup table.
//!
//! Precomputes `exp(-d^2/2)` for `d^2` in `[0, D_CUT)`. Two variants are kept side by side
//! because the rasterizer's two numeric regimes (float / fixed-point, see `render::rasterizer`)
//! each want a different table shape: the float path interpolates between f32 samples, the
//! fixed-point path indexes a u0.16 table directly off a shifted accumulator with no
//! interpolation at all.

/// 3-sigma cutoff used by the float regime: d^2 >= 9.0 contributes nothing.
pub const FLOAT_D2_CUTOFF: f32 = 9.0;

/// Cutoff used by the fixed-point regime, expressed in u4.18 (d^2 * 2^18). 8.0 in that format.
pub const FIXED_D2_CUTOFF_FP: i32 = 8 << 18;

const FLOAT_LUT_ENTRIES: usize = 1024;

/// Float Gaussian LUT: `FLOAT_LUT_ENTRIES + 1` samples of `exp(-d^2/2)` over `[0, FLOAT_D2_CUTOFF)`,
/// linearly interpolated at lookup time.
#[derive(Debug, Clone)]
pub struct FloatGaussianLut {
    table: Box<[f32]>,
    step: f32,
}

impl FloatGaussianLut {
    pub fn new() -> Self {
        let step = FLOAT_D2_CUTOFF / FLOAT_LUT_ENTRIES as f32;
        let table: Box<[f32]> = (0..=FLOAT_LUT_ENTRIES)
            .map(|i| {
                let d2 = i as f32 * step;
                (-0.5 * d2).exp()
            })
            .collect();
        Self { table, step }
    }

    /// `exp(-d2/2)` for `d2 >= 0`, zero outside `[0, FLOAT_D2_CUTOFF)`.
    #[inline]
    pub fn eval(&self, d2: f32) -> f32 {
        if !(0.0..FLOAT_D2_CUTOFF).contains(&d2) {
            return 0.0;
        }
        let pos = d2 / self.step;
        let idx = pos as usize;
        let frac = pos - idx as f32;
        let lo = self.table[idx];
        let hi = self.table[idx + 1];
        lo + (hi - lo) * frac
    }
}

impl Default for FloatGaussianLut {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixed-point Gaussian LUT: 2048 u0.16 entries covering `d^2` in `[0, 8)`, no interpolation.
/// Index = `d2_fp >> 10` where `d2_fp` is `d^2` scaled by `2^18` (see `render::rasterizer`
/// fixed-point inner loop for the derivation of that shift).
#[derive(Debug, Clone)]
pub struct FixedGaussianLut {
    table: Box<[u16]>,
}

const FIXED_LUT_SIZE: usize = 2048;

impl FixedGaussianLut {
    pub fn new() -> Self {
        let table: Box<[u16]> = (0..FIXED_LUT_SIZE)
            .map(|i| {
                let d2 = i as f32 / 256.0;
                ((-0.5 * d2).exp() * 65535.0 + 0.5) as u16
            })
            .collect();
        Self { table }
    }

    /// Looks up a u4.18 fixed-point squared distance, returning a u0.16 Gaussian weight.
    /// Returns 0 if `d2_fp` is negative or at/past the cutoff.
    #[inline]
    pub fn eval(&self, d2_fp: i32) -> u16 {
        if d2_fp < 0 || d2_fp >= FIXED_D2_CUTOFF_FP {
            return 0;
        }
        let idx = (d2_fp >> 10) as usize;
        if idx >= FIXED_LUT_SIZE {
            return 0;
        }
        self.table[idx]
    }
}

impl Default for FixedGaussianLut {
    fn default() -> Self {
        Self::new()
    }
}
