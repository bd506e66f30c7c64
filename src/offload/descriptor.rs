//! Tile descriptor list and control-block handshake (C10).

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

use crate::splat::Splat2DFixed;
use crate::store::SplatStore;

#[derive(Debug)]
pub enum OffloadError {
    Timeout,
    DescriptorOverflow,
}

impl std::fmt::Display for OffloadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OffloadError::Timeout => write!(f, "accelerator handshake timed out"),
            OffloadError::DescriptorOverflow => write!(f, "descriptor region overflow"),
        }
    }
}

impl std::error::Error for OffloadError {}

/// One tile's worth of work: its origin, its inline splat records (already in fixed-point
/// rasterizer form), and the index of the next descriptor in the linked list (`None` for last).
#[derive(Debug, Clone)]
pub struct TileDescriptor {
    pub tile_px: i32,
    pub tile_py: i32,
    pub splats: Vec<Splat2DFixed>,
    pub next: Option<usize>,
}

/// Builds one descriptor per tile, in row-major order, each carrying the fixed-point splat
/// records whose bbox overlaps that tile. Mirrors the per-tile linked list `fpga_rasterize`
/// builds in DDR3, minus the physical addressing (no accelerator is actually addressed here).
pub fn build_descriptors(
    store: &SplatStore,
    tile_w: i32,
    tile_h: i32,
    tiles_x: usize,
    tiles_y: usize,
    max_splats_per_tile: usize,
) -> Result<Vec<TileDescriptor>, OffloadError> {
    let splats = store.splats_2d_fixed();
    let order = store.sort_index();

    let mut descriptors: Vec<TileDescriptor> = Vec::with_capacity(tiles_x * tiles_y);
    for ty in 0..tiles_y {
        let tpy = (ty * tile_h as usize) as i32;
        for tx in 0..tiles_x {
            let tpx = (tx * tile_w as usize) as i32;

            let mut tile_splats = Vec::new();
            for &idx in order {
                let s = &splats[idx as usize];
                if !s.bbox.overlaps_tile(tpx, tpy, tile_w, tile_h) {
                    continue;
                }
                if tile_splats.len() >= max_splats_per_tile {
                    return Err(OffloadError::DescriptorOverflow);
                }
                tile_splats.push(*s);
            }

            let this_idx = descriptors.len();
            if this_idx > 0 {
                let prev = this_idx - 1;
                descriptors[prev].next = Some(this_idx);
            }
            descriptors.push(TileDescriptor { tile_px: tpx, tile_py: tpy, splats: tile_splats, next: None });
        }
    }
    Ok(descriptors)
}

/// Size in bytes of one inline splat record in the descriptor body: screen position (2x i32),
/// inverse-covariance (u16, i32, u16), color (3x u8), opacity (u8).
const RECORD_SIZE: usize = 4 + 4 + 2 + 4 + 2 + 3 + 1;

impl TileDescriptor {
    /// Serializes the two 64-bit header words followed by the inline splat records, matching the
    /// layout `fpga_rasterize` writes into the descriptor region: qword 0 packs the tile's
    /// framebuffer base into the low 29 bits and the next descriptor's base into bits [60:32]
    /// (zero when this is the last tile); qword 1 packs splat count into bits [15:0] and the tile
    /// origin into bits [31:16] (x) and [47:32] (y).
    pub fn encode(&self, fb_qaddr: u64, next_qaddr: Option<u64>) -> Vec<u8> {
        let word0 = (fb_qaddr & 0x1FFF_FFFF) | (next_qaddr.unwrap_or(0) & 0x1FFF_FFFF) << 32;
        let word1 = (self.splats.len() as u64 & 0xFFFF)
            | ((self.tile_px as u64 & 0xFFFF) << 16)
            | ((self.tile_py as u64 & 0xFFFF) << 32);

        let mut out = Vec::with_capacity(16 + self.splats.len() * RECORD_SIZE);
        out.extend_from_slice(&word0.to_le_bytes());
        out.extend_from_slice(&word1.to_le_bytes());
        for s in &self.splats {
            out.extend_from_slice(&s.sx_fp.to_le_bytes());
            out.extend_from_slice(&s.sy_fp.to_le_bytes());
            out.extend_from_slice(&s.cov_a_fp.to_le_bytes());
            out.extend_from_slice(&s.cov_b2_fp.to_le_bytes());
            out.extend_from_slice(&s.cov_c_fp.to_le_bytes());
            out.extend_from_slice(&s.color);
            out.push(s.opacity);
        }
        out
    }
}

/// Four-word control block shared between the driver and the accelerator: splat pointer,
/// request flag, done flag, frame counter. Atomics stand in for the volatile shared-memory
/// semantics of the C control block, since there is no real second party touching this memory.
#[derive(Debug, Default)]
pub struct ControlBlock {
    pub pointer: AtomicU32,
    pub request_flag: AtomicU32,
    pub done_flag: AtomicU32,
    pub frame_counter: AtomicU32,
}

impl ControlBlock {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Simulates handing a frame to the accelerator: writes `first_tile_ptr` and raises the request
/// flag, then polls `done_flag` until it is set or `timeout` elapses. Returns the frame counter
/// on success, `Err(OffloadError::Timeout)` on timeout — the caller is expected to fall back to
/// the CPU rasterizer for that frame (§7(e)).
pub fn send(control: &ControlBlock, first_tile_ptr: u32, timeout: Duration, poll_interval: Duration) -> Result<u32, OffloadError> {
    control.pointer.store(first_tile_ptr, Ordering::SeqCst);
    control.done_flag.store(0, Ordering::SeqCst);
    control.request_flag.store(1, Ordering::SeqCst);

    let start = Instant::now();
    while control.done_flag.load(Ordering::SeqCst) == 0 {
        if start.elapsed() >= timeout {
            return Err(OffloadError::Timeout);
        }
        std::thread::sleep(poll_interval);
    }
    Ok(control.frame_counter.load(Ordering::SeqCst))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Vec3;
    use crate::render::pipeline::project_all_fixed;
    use crate::splat::Splat3D;
    use crate::store::Regime;

    #[test]
    fn send_times_out_when_accelerator_never_responds() {
        let control = ControlBlock::new();
        let result = send(&control, 0, Duration::from_millis(20), Duration::from_millis(5));
        assert!(matches!(result, Err(OffloadError::Timeout)));
    }

    #[test]
    fn send_succeeds_once_done_flag_is_set() {
        let control = ControlBlock::new();
        control.done_flag.store(1, Ordering::SeqCst);
        control.frame_counter.store(7, Ordering::SeqCst);
        let result = send(&control, 0, Duration::from_secs(1), Duration::from_millis(1));
        assert_eq!(result.unwrap(), 7);
    }

    #[test]
    fn descriptors_form_a_complete_linked_list() {
        let mut store = SplatStore::new(4, Regime::Fixed);
        store.push(Splat3D::new(Vec3::ZERO, [0.01, 0.0, 0.0, 0.01, 0.0, 0.01], [255, 255, 255], 255)).unwrap();
        let camera = crate::camera::Camera::new(Vec3::new(0.0, 0.0, 5.0), -std::f32::consts::FRAC_PI_2, 0.0);
        project_all_fixed(&mut store, &camera, 64, 64);

        let descriptors = build_descriptors(&store, 32, 32, 2, 2, 16).unwrap();
        assert_eq!(descriptors.len(), 4);
        for (i, d) in descriptors.iter().enumerate() {
            if i + 1 < descriptors.len() {
                assert_eq!(d.next, Some(i + 1));
            } else {
                assert_eq!(d.next, None);
            }
        }
    }

    #[test]
    fn encoded_header_words_carry_count_and_origin() {
        let descriptor = TileDescriptor { tile_px: 64, tile_py: 32, splats: Vec::new(), next: None };
        let bytes = descriptor.encode(0x100, Some(0x200));
        let word0 = u64::from_le_bytes(bytes[0..8].try_into().unwrap());
        let word1 = u64::from_le_bytes(bytes[8..16].try_into().unwrap());
        assert_eq!(word0 & 0x1FFF_FFFF, 0x100);
        assert_eq!((word0 >> 32) & 0x1FFF_FFFF, 0x200);
        assert_eq!(word1 & 0xFFFF, 0);
        assert_eq!((word1 >> 16) & 0xFFFF, 64);
        assert_eq!((word1 >> 32) & 0xFFFF, 32);
        assert_eq!(bytes.len(), 16);
    }

    #[test]
    fn overflow_is_reported_not_panicked() {
        let mut store = SplatStore::new(32, Regime::Fixed);
        let camera = crate::camera::Camera::new(Vec3::new(0.0, 0.0, 5.0), -std::f32::consts::FRAC_PI_2, 0.0);
        for _ in 0..20 {
            store.push(Splat3D::new(Vec3::ZERO, [0.01, 0.0, 0.0, 0.01, 0.0, 0.01], [255, 255, 255], 255)).unwrap();
        }
        project_all_fixed(&mut store, &camera, 64, 64);
        let result = build_descriptors(&store, 32, 32, 2, 2, 4);
        assert!(matches!(result, Err(OffloadError::DescriptorOverflow)));
    }
}
