//! Packed-image transport: splat data hidden in the byte stream of an RGB image, as
//! `load_splats_png` decodes in `original_source/gsplat.c`. This module only understands the
//! raw byte layout (header + 18-byte records); decoding an actual PNG container is outside its
//! scope, matching the expanded spec's choice to decouple the transport from any image codec.

use crate::math::Vec3;
use crate::splat::Splat3D;

use super::TransportError;

const RECORD_SIZE: usize = 18;
const HEADER_SIZE: usize = 18;

/// Decodes splats from a raw RGB byte stream: a 2-byte little-endian count in the first record
/// slot, followed by `count` 18-byte splat records (s7.8 position, u0.8 covariance, u8 color and
/// alpha).
pub fn decode_splats(bytes: &[u8]) -> Result<Vec<Splat3D>, TransportError> {
    if bytes.len() < HEADER_SIZE {
        return Err(TransportError::Truncated);
    }

    let count = u16::from_le_bytes([bytes[0], bytes[1]]) as usize;
    let max_splats = (bytes.len() - HEADER_SIZE) / RECORD_SIZE;
    let count = count.min(max_splats);

    let mut splats = Vec::with_capacity(count);
    for i in 0..count {
        let offset = HEADER_SIZE + i * RECORD_SIZE;
        let record = &bytes[offset..offset + RECORD_SIZE];
        splats.push(decode_record(record));
    }
    Ok(splats)
}

fn decode_record(record: &[u8]) -> Splat3D {
    let ix = i16::from_le_bytes([record[0], record[1]]);
    let iy = i16::from_le_bytes([record[2], record[3]]);
    let iz = i16::from_le_bytes([record[4], record[5]]);
    let position = Vec3::new(ix as f32 / 256.0, iy as f32 / 256.0, iz as f32 / 256.0);

    let mut cov = [0.0f32; 6];
    for (i, c) in cov.iter_mut().enumerate() {
        *c = record[6 + i] as f32 / 256.0;
    }

    let color = [record[12], record[13], record[14]];
    let opacity = record[15];

    Splat3D::new(position, cov, color, opacity)
}

/// Encodes splats into the same raw byte layout `decode_splats` reads, for round-trip testing.
pub fn encode_splats(splats: &[Splat3D]) -> Vec<u8> {
    let mut out = vec![0u8; HEADER_SIZE + splats.len() * RECORD_SIZE];
    out[0..2].copy_from_slice(&(splats.len() as u16).to_le_bytes());

    for (i, splat) in splats.iter().enumerate() {
        let offset = HEADER_SIZE + i * RECORD_SIZE;
        let record = &mut out[offset..offset + RECORD_SIZE];
        record[0..2].copy_from_slice(&((splat.position.x * 256.0) as i16).to_le_bytes());
        record[2..4].copy_from_slice(&((splat.position.y * 256.0) as i16).to_le_bytes());
        record[4..6].copy_from_slice(&((splat.position.z * 256.0) as i16).to_le_bytes());
        for j in 0..6 {
            record[6 + j] = (splat.cov[j].clamp(0.0, 0.996) * 256.0) as u8;
        }
        record[12] = splat.color[0];
        record[13] = splat.color[1];
        record[14] = splat.color[2];
        record[15] = splat.opacity;
    }
    out
}
