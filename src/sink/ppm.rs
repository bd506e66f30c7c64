//! PPM (P6) debug dump of a finished surface, ported from `fb_dump_ppm`.

use std::io::Write;

use crate::surface::{MemSurface, PixelFormat, Surface};

/// Writes `surface` as a binary PPM (P6) image to `w`.
pub fn write_ppm(surface: &MemSurface, w: &mut impl Write) -> std::io::Result<()> {
    writeln!(w, "P6")?;
    writeln!(w, "{} {}", surface.width(), surface.height())?;
    writeln!(w, "255")?;

    let bytes = surface.as_bytes();
    let stride = surface.stride();

    for y in 0..surface.height() {
        let row = &bytes[y * stride..y * stride + stride];
        for x in 0..surface.width() {
            let rgb = match surface.format() {
                PixelFormat::Argb8888 => {
                    let base = x * 4;
                    [row[base + 2], row[base + 1], row[base]]
                }
                PixelFormat::Rgb565 => {
                    let base = x * 2;
                    let packed = u16::from_le_bytes([row[base], row[base + 1]]);
                    let r5 = (packed >> 11) & 0x1F;
                    let g6 = (packed >> 5) & 0x3F;
                    let b5 = packed & 0x1F;
                    [
                        ((r5 as u32 * 255) / 31) as u8,
                        ((g6 as u32 * 255) / 63) as u8,
                        ((b5 as u32 * 255) / 31) as u8,
                    ]
                }
            };
            w.write_all(&rgb)?;
        }
    }
    Ok(())
}
