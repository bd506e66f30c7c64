//! C11 option surface, `clap`'s derive API matching the teacher's `Cli` struct.

use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "gsplat", version, about = "Tile-based software Gaussian-splat renderer")]
pub struct Cli {
    /// Number of procedurally generated test splats (ignored if a scene loads from a transport)
    #[arg(short = 'n', long, default_value_t = 10_000)]
    pub count: usize,

    /// Load a packed-image scene from this path instead of generating test splats
    #[arg(long, value_name = "PATH")]
    pub input_path: Option<PathBuf>,

    /// Read a serial-transport scene from this device path instead of generating test splats
    #[arg(long, value_name = "DEVICE")]
    pub serial_device: Option<PathBuf>,

    /// Route rasterization through the accelerator descriptor path, falling back to the CPU
    /// rasterizer on simulated handshake timeout
    #[arg(long)]
    pub offload: bool,

    /// Seed for the procedural test-splat generator, for deterministic orbit animation
    #[arg(long, default_value_t = 1)]
    pub seed: u64,

    /// Render N frames then exit (0 = run until SIGINT). Defaults to 5, matching the headless
    /// fallback the original hardware driver used whenever no real framebuffer was attached.
    #[arg(long, default_value_t = 5)]
    pub frames: u32,

    /// Dump each rendered frame as a PPM file (frame_NNNN.ppm) for headless inspection
    #[arg(long)]
    pub dump_frames: bool,

    /// Benchmark mode: render 100 frames, print timing stats, exit
    #[arg(long)]
    pub benchmark: bool,

    /// Extra per-frame diagnostics on stderr
    #[arg(short, long)]
    pub verbose: bool,

    /// Surface width in pixels
    #[arg(long, default_value_t = 640)]
    pub width: usize,

    /// Surface height in pixels
    #[arg(long, default_value_t = 480)]
    pub height: usize,

    /// Use the fixed-point numeric regime instead of float
    #[arg(long)]
    pub fixed: bool,
}
