//! C2: bounded splat store.
//!
//! Owns the 3D input array, the parallel 2D projected array, and the sort permutation. Capacity
//! is fixed at construction (an `N_max` the caller picks, e.g. from `--count` or a scene file
//! header) and the store never resizes, mirroring `splat_store_t`'s fixed `MAX_SPLATS` array in
//! `original_source/gsplat.c`.

use crate::splat::{Splat2D, Splat2DFixed, Splat3D};

#[derive(Debug)]
pub enum StoreError {
    CapacityExceeded { capacity: usize },
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::CapacityExceeded { capacity } => {
                write!(f, "splat store is full (capacity {capacity})")
            }
        }
    }
}

impl std::error::Error for StoreError {}

/// Numeric regime a store's 2D array is kept in, chosen once at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Regime {
    Float,
    Fixed,
}

/// Bounded container of splats plus their per-frame projected state.
pub struct SplatStore {
    capacity: usize,
    splats_3d: Vec<Splat3D>,
    splats_2d_float: Vec<Splat2D>,
    splats_2d_fixed: Vec<Splat2DFixed>,
    sort_idx: Vec<u32>,
    regime: Regime,
}

impl SplatStore {
    pub fn new(capacity: usize, regime: Regime) -> Self {
        Self {
            capacity,
            splats_3d: Vec::with_capacity(capacity),
            splats_2d_float: Vec::new(),
            splats_2d_fixed: Vec::new(),
            sort_idx: Vec::new(),
            regime,
        }
    }

    pub fn regime(&self) -> Regime {
        self.regime
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.splats_3d.len()
    }

    pub fn is_empty(&self) -> bool {
        self.splats_3d.is_empty()
    }

    pub fn clear(&mut self) {
        self.splats_3d.clear();
    }

    pub fn push(&mut self, splat: Splat3D) -> Result<(), StoreError> {
        if self.splats_3d.len() >= self.capacity {
            return Err(StoreError::CapacityExceeded { capacity: self.capacity });
        }
        self.splats_3d.push(splat);
        Ok(())
    }

    pub fn splats(&self) -> &[Splat3D] {
        &self.splats_3d
    }

    pub fn splats_2d_float(&self) -> &[Splat2D] {
        &self.splats_2d_float
    }

    pub fn splats_2d_fixed(&self) -> &[Splat2DFixed] {
        &self.splats_2d_fixed
    }

    pub fn sort_index(&self) -> &[u32] {
        &self.sort_idx
    }

    /// Grows the 2D arrays and permutation to match the current splat count, filling any new
    /// slots with the culled sentinel. Called once per frame before projection writes in place.
    pub fn ensure_2d_capacity(&mut self) {
        let n = self.splats_3d.len();
        match self.regime {
            Regime::Float => self.splats_2d_float.resize(n, Splat2D::CULLED),
            Regime::Fixed => self.splats_2d_fixed.resize(n, Splat2DFixed::CULLED),
        }
        self.sort_idx.resize(n, 0);
    }

    pub fn splats_2d_float_mut(&mut self) -> &mut [Splat2D] {
        &mut self.splats_2d_float
    }

    pub fn splats_2d_fixed_mut(&mut self) -> &mut [Splat2DFixed] {
        &mut self.splats_2d_fixed
    }

    pub fn sort_index_mut(&mut self) -> &mut [u32] {
        &mut self.sort_idx
    }
}
