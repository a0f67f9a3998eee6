//! Quantization of animated streams into packed per-sample payloads
//!
//! The last stream transform. Float samples (possibly range-reduced to
//! [0, 1]) become the little-endian payloads the container's animated data
//! section stores verbatim:
//!
//! - Quat 128: x, y, z, w as f32
//! - Quat 96 / Vector3 96: x, y, z as f32
//! - Quat 48 / Vector3 48: x, y, z as u16 unorm
//! - Quat 32 / Vector3 32: 11/11/10 bits in one u32

use glam::Vec3;

use crate::formats::{RotationFormat, VectorFormat};
use crate::packing::{pack_unorm, pack_vector3_u32};
use crate::stream::BoneStream;

/// Pack every animated rotation track
pub fn quantize_rotation_streams(streams: &mut [BoneStream], format: RotationFormat) {
    for stream in streams.iter_mut() {
        if !stream.is_rotation_animated() {
            continue;
        }

        let mut packed = Vec::with_capacity(stream.rotations.len() * format.packed_size() as usize);
        for sample in &stream.rotations {
            match format {
                RotationFormat::Quat128 => {
                    packed.extend_from_slice(&sample.x.to_le_bytes());
                    packed.extend_from_slice(&sample.y.to_le_bytes());
                    packed.extend_from_slice(&sample.z.to_le_bytes());
                    packed.extend_from_slice(&sample.w.to_le_bytes());
                }
                RotationFormat::Quat96 => {
                    packed.extend_from_slice(&sample.x.to_le_bytes());
                    packed.extend_from_slice(&sample.y.to_le_bytes());
                    packed.extend_from_slice(&sample.z.to_le_bytes());
                }
                RotationFormat::Quat48 => pack_unorm48(sample.truncate(), &mut packed),
                RotationFormat::Quat32 => {
                    packed.extend_from_slice(&pack_vector3_u32(sample.truncate()).to_le_bytes());
                }
            }
        }
        stream.packed_rotations = packed;
    }
}

/// Pack every animated translation track
pub fn quantize_translation_streams(streams: &mut [BoneStream], format: VectorFormat) {
    for stream in streams.iter_mut() {
        if !stream.is_translation_animated() {
            continue;
        }

        let mut packed =
            Vec::with_capacity(stream.translations.len() * format.packed_size() as usize);
        for sample in &stream.translations {
            match format {
                VectorFormat::Vector96 => {
                    packed.extend_from_slice(&sample.x.to_le_bytes());
                    packed.extend_from_slice(&sample.y.to_le_bytes());
                    packed.extend_from_slice(&sample.z.to_le_bytes());
                }
                VectorFormat::Vector48 => pack_unorm48(*sample, &mut packed),
                VectorFormat::Vector32 => {
                    packed.extend_from_slice(&pack_vector3_u32(*sample).to_le_bytes());
                }
            }
        }
        stream.packed_translations = packed;
    }
}

#[inline]
fn pack_unorm48(v: Vec3, out: &mut Vec<u8>) {
    out.extend_from_slice(&(pack_unorm(v.x, 16) as u16).to_le_bytes());
    out.extend_from_slice(&(pack_unorm(v.y, 16) as u16).to_le_bytes());
    out.extend_from_slice(&(pack_unorm(v.z, 16) as u16).to_le_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    fn animated_stream(rotations: Vec<Vec4>, translations: Vec<Vec3>) -> BoneStream {
        BoneStream {
            rotations,
            translations,
            is_rotation_default: false,
            is_rotation_constant: false,
            is_translation_default: false,
            is_translation_constant: false,
            rotation_range: None,
            translation_range: None,
            packed_rotations: Vec::new(),
            packed_translations: Vec::new(),
        }
    }

    #[test]
    fn test_quat128_payload_is_full_floats() {
        let q = Vec4::new(0.1, 0.2, 0.3, 0.9273);
        let mut streams = vec![animated_stream(vec![q; 2], vec![Vec3::ZERO; 2])];
        quantize_rotation_streams(&mut streams, RotationFormat::Quat128);

        let packed = &streams[0].packed_rotations;
        assert_eq!(packed.len(), 2 * 16);
        assert_eq!(&packed[0..4], &0.1f32.to_le_bytes());
        assert_eq!(&packed[12..16], &0.9273f32.to_le_bytes());
    }

    #[test]
    fn test_quat48_payload_size_and_values() {
        // Range-reduced samples live in [0, 1]
        let q = Vec4::new(0.0, 0.5, 1.0, 0.0);
        let mut streams = vec![animated_stream(vec![q; 3], vec![Vec3::ZERO; 3])];
        quantize_rotation_streams(&mut streams, RotationFormat::Quat48);

        let packed = &streams[0].packed_rotations;
        assert_eq!(packed.len(), 3 * 6);
        assert_eq!(u16::from_le_bytes([packed[0], packed[1]]), 0);
        assert_eq!(u16::from_le_bytes([packed[2], packed[3]]), 32768);
        assert_eq!(u16::from_le_bytes([packed[4], packed[5]]), 65535);
    }

    #[test]
    fn test_vector32_payload() {
        let mut streams = vec![animated_stream(
            vec![Vec4::ZERO; 1],
            vec![Vec3::new(1.0, 0.0, 1.0)],
        )];
        quantize_translation_streams(&mut streams, VectorFormat::Vector32);

        let packed = &streams[0].packed_translations;
        assert_eq!(packed.len(), 4);
        let word = u32::from_le_bytes([packed[0], packed[1], packed[2], packed[3]]);
        assert_eq!(word, 0x7FF | (0x3FF << 22));
    }

    #[test]
    fn test_constant_tracks_not_packed() {
        let mut stream = animated_stream(vec![Vec4::ZERO; 4], vec![Vec3::ZERO; 4]);
        stream.is_rotation_constant = true;
        stream.is_translation_constant = true;
        let mut streams = vec![stream];
        quantize_rotation_streams(&mut streams, RotationFormat::Quat96);
        quantize_translation_streams(&mut streams, VectorFormat::Vector96);
        assert!(streams[0].packed_rotations.is_empty());
        assert!(streams[0].packed_translations.is_empty());
    }
}
