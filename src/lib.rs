//! Tile-based software Gaussian-splat renderer core: EWA projection, radix depth sort, and a
//! float/fixed-point tile rasterizer, grounded in `original_source/gsplat.c`'s MiSTer/GA144
//! pipeline. The `gsplat` binary (`src/main.rs`) is a thin CLI driver over this library; the
//! library is split out so integration tests can exercise the pipeline against a `MemSurface`
//! without going through process startup.

pub mod camera;
pub mod cli;
pub mod demo;
pub mod kernel;
pub mod math;
pub mod offload;
pub mod render;
pub mod sink;
pub mod sort;
pub mod splat;
pub mod store;
pub mod surface;
pub mod transport;
