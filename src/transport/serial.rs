//! Serial (GA144-style) transport: 18-bit words, each sent as 3 bytes with 6 significant bits
//! per byte, little-endian. Ported from the `unpack18`/`s1_16_to_float`/`serdes_recv_splats`
//! family of functions in `original_source/gsplat.c`.

use std::io::{Read, Write};

use crate::math::Vec3;
use crate::splat::Splat3D;

use super::TransportError;

const SYNC_WORD: u32 = 0x3FFFF;
const MAX_SYNC_ATTEMPTS: u32 = 1000;
const SPLAT_WORD_COUNT: usize = 11;

fn pack18(word: u32) -> [u8; 3] {
    [(word & 0x3F) as u8, ((word >> 6) & 0x3F) as u8, ((word >> 12) & 0x3F) as u8]
}

fn unpack18(bytes: [u8; 3]) -> u32 {
    (bytes[0] as u32 & 0x3F) | ((bytes[1] as u32 & 0x3F) << 6) | ((bytes[2] as u32 & 0x3F) << 12)
}

fn read_word(r: &mut impl Read) -> Result<u32, TransportError> {
    let mut buf = [0u8; 3];
    r.read_exact(&mut buf)?;
    Ok(unpack18(buf))
}

fn write_word(w: &mut impl Write, word: u32) -> Result<(), TransportError> {
    w.write_all(&pack18(word))?;
    Ok(())
}

/// s1.16 fixed-point (18-bit, sign-extended) to float.
fn s1_16_to_float(v: u32) -> f32 {
    let signed = if v & 0x20000 != 0 { (v | 0xFFFC_0000) as i32 } else { v as i32 };
    signed as f32 / 65536.0
}

fn float_to_s1_16(v: f32) -> u32 {
    ((v * 65536.0).round() as i32 as u32) & 0x3FFFF
}

/// u0.18 fixed-point to float.
fn u0_18_to_float(v: u32) -> f32 {
    v as f32 / 262144.0
}

fn float_to_u0_18(v: f32) -> u32 {
    (v.max(0.0) * 262144.0).round() as u32 & 0x3FFFF
}

/// Scans for the sync word, then reads `count` followed by `count` 11-word splat records.
pub fn decode_splats(r: &mut impl Read) -> Result<Vec<Splat3D>, TransportError> {
    let mut attempts = 0;
    loop {
        if read_word(r)? == SYNC_WORD {
            break;
        }
        attempts += 1;
        if attempts > MAX_SYNC_ATTEMPTS {
            return Err(TransportError::NoSync);
        }
    }

    let count = read_word(r)?;
    if count == 0 {
        return Err(TransportError::BadCount(count));
    }

    let mut splats = Vec::with_capacity(count as usize);
    for _ in 0..count {
        splats.push(decode_one_splat(r)?);
    }
    Ok(splats)
}

fn decode_one_splat(r: &mut impl Read) -> Result<Splat3D, TransportError> {
    let mut words = [0u32; SPLAT_WORD_COUNT];
    for w in &mut words {
        *w = read_word(r)?;
    }

    let position = Vec3::new(s1_16_to_float(words[0]), s1_16_to_float(words[1]), s1_16_to_float(words[2]));
    let mut cov = [0.0f32; 6];
    for (i, c) in cov.iter_mut().enumerate() {
        *c = u0_18_to_float(words[3 + i]);
    }

    let rgb = words[9];
    let r6 = ((rgb >> 12) & 0x3F) as u8;
    let g6 = ((rgb >> 6) & 0x3F) as u8;
    let b6 = (rgb & 0x3F) as u8;
    let color = [expand_6_to_8(r6), expand_6_to_8(g6), expand_6_to_8(b6)];

    let opacity = (words[10] & 0xFF) as u8;

    Ok(Splat3D::new(position, cov, color, opacity))
}

/// Replicates the top 2 bits into the low 2 bits, matching `(v << 2) | (v >> 4)` in the C decoder.
fn expand_6_to_8(v: u8) -> u8 {
    (v << 2) | (v >> 4)
}

fn compress_8_to_6(v: u8) -> u8 {
    v >> 2
}

/// Writes the sync word, count, and each splat's 11-word record. The inverse of `decode_splats`,
/// used by the round-trip test; not exercised by `original_source/gsplat.c`, which was
/// receive-only.
pub fn encode_splats(w: &mut impl Write, splats: &[Splat3D]) -> Result<(), TransportError> {
    write_word(w, SYNC_WORD)?;
    write_word(w, splats.len() as u32)?;
    for splat in splats {
        encode_one_splat(w, splat)?;
    }
    Ok(())
}

fn encode_one_splat(w: &mut impl Write, splat: &Splat3D) -> Result<(), TransportError> {
    write_word(w, float_to_s1_16(splat.position.x))?;
    write_word(w, float_to_s1_16(splat.position.y))?;
    write_word(w, float_to_s1_16(splat.position.z))?;
    for &c in &splat.cov {
        write_word(w, float_to_u0_18(c))?;
    }
    let r6 = compress_8_to_6(splat.color[0]) as u32;
    let g6 = compress_8_to_6(splat.color[1]) as u32;
    let b6 = compress_8_to_6(splat.color[2]) as u32;
    write_word(w, (r6 << 12) | (g6 << 6) | b6)?;
    write_word(w, splat.opacity as u32)?;
    Ok(())
}
