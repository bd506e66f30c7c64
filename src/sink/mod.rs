//! Debug sinks. The only implementation so far is the PPM dump used for headless testing,
//! matching `fb_dump_ppm` in `original_source/gsplat.c`.

pub mod ppm;
