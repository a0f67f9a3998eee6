//! Fixed-point component packing
//!
//! Converts normalized f32 components to the packed integer payloads used by
//! the quantized track formats:
//! - unorm k-bit: [0, 1] -> [0, 2^k - 1], `round(v * (2^k - 1))`, clamped
//! - snorm k-bit: [-1, 1] -> [0, 2^k - 1], `round((v + 1) * 0.5 * (2^k - 1))`
//! - packed 11/11/10: three unorm components in one u32,
//!   x: bits 0-10, y: bits 11-21, z: bits 22-31 (LSB-first)
//!
//! The 11/11/10 bit layout is part of the container contract.

use glam::Vec3;

/// Quantize a [0, 1] value to an unsigned `num_bits` integer
#[inline]
pub fn pack_unorm(value: f32, num_bits: u32) -> u32 {
    debug_assert!(num_bits > 0 && num_bits <= 23);
    let max_value = (1u32 << num_bits) - 1;
    let clamped = value.clamp(0.0, 1.0);
    (clamped * max_value as f32).round() as u32
}

/// Reconstruct a [0, 1] value from an unsigned `num_bits` integer
#[inline]
pub fn unpack_unorm(packed: u32, num_bits: u32) -> f32 {
    debug_assert!(num_bits > 0 && num_bits <= 23);
    let max_value = (1u32 << num_bits) - 1;
    debug_assert!(packed <= max_value);
    packed as f32 / max_value as f32
}

/// Quantize a [-1, 1] value to an unsigned `num_bits` integer
#[inline]
pub fn pack_snorm(value: f32, num_bits: u32) -> u32 {
    let clamped = value.clamp(-1.0, 1.0);
    pack_unorm((clamped + 1.0) * 0.5, num_bits)
}

/// Reconstruct a [-1, 1] value from an unsigned `num_bits` integer
#[inline]
pub fn unpack_snorm(packed: u32, num_bits: u32) -> f32 {
    unpack_unorm(packed, num_bits) * 2.0 - 1.0
}

/// Pack three [0, 1] components as u16 unorm values
#[inline]
pub fn pack_vector3_u48(v: Vec3) -> [u16; 3] {
    [
        pack_unorm(v.x, 16) as u16,
        pack_unorm(v.y, 16) as u16,
        pack_unorm(v.z, 16) as u16,
    ]
}

/// Reconstruct three [0, 1] components from u16 unorm values
#[inline]
pub fn unpack_vector3_u48(packed: [u16; 3]) -> Vec3 {
    Vec3::new(
        unpack_unorm(packed[0] as u32, 16),
        unpack_unorm(packed[1] as u32, 16),
        unpack_unorm(packed[2] as u32, 16),
    )
}

/// Pack three [0, 1] components into one u32 as 11/11/10 bits
#[inline]
pub fn pack_vector3_u32(v: Vec3) -> u32 {
    let x = pack_unorm(v.x, 11);
    let y = pack_unorm(v.y, 11);
    let z = pack_unorm(v.z, 10);
    x | (y << 11) | (z << 22)
}

/// Reconstruct three [0, 1] components from an 11/11/10 packed u32
#[inline]
pub fn unpack_vector3_u32(packed: u32) -> Vec3 {
    let x = packed & 0x7FF;
    let y = (packed >> 11) & 0x7FF;
    let z = (packed >> 22) & 0x3FF;
    Vec3::new(
        unpack_unorm(x, 11),
        unpack_unorm(y, 11),
        unpack_unorm(z, 10),
    )
}
