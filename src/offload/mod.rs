//! C10: accelerator offload descriptor builder and handshake simulation.
//!
//! Ported from the FPGA offload path at the bottom of `original_source/gsplat.c`
//! (`fpga_rasterize`): per-tile linked descriptors followed by inline splat records, plus a
//! four-word control block used to hand a frame to the accelerator and poll for completion. This
//! module never touches real hardware — `send` simulates the handshake against a caller-supplied
//! [`ControlBlock`] so the CPU-fallback behavior is exercisable without one.

pub mod descriptor;

pub use descriptor::{build_descriptors, send, ControlBlock, OffloadError, TileDescriptor};
