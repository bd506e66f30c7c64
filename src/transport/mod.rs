//! C9: transports for loading scenes from outside the process.
//!
//! Two independent wire formats, both grounded in `original_source/gsplat.c`'s GA144/MiSTer
//! input paths: [`serial`] is the 18-bit-word serial protocol (`serdes_recv_splats`), and
//! [`packed_image`] is the splat-data-hidden-in-an-RGB-image format (`load_splats_png`). Neither
//! module owns the physical I/O device; both operate over anything implementing `Read`/`Write` or
//! a raw byte slice, so the CLI's `--serial-device` path and the round-trip test share one
//! implementation.

pub mod packed_image;
pub mod serial;

#[derive(Debug)]
pub enum TransportError {
    Io(std::io::Error),
    NoSync,
    BadCount(u32),
    Truncated,
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportError::Io(e) => write!(f, "transport I/O error: {e}"),
            TransportError::NoSync => write!(f, "no sync word found"),
            TransportError::BadCount(n) => write!(f, "bad splat count {n}"),
            TransportError::Truncated => write!(f, "truncated transport data"),
        }
    }
}

impl std::error::Error for TransportError {}

impl From<std::io::Error> for TransportError {
    fn from(e: std::io::Error) -> Self {
        TransportError::Io(e)
    }
}
