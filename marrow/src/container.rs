//! Compressed clip container
//!
//! A compressed clip is one contiguous little-endian buffer. No magic bytes;
//! the preamble carries the size, integrity hash, version and algorithm tag.
//!
//! # Layout
//! ```text
//! Preamble (12 bytes):
//! 0x00: size u32              - Total buffer size in bytes
//! 0x04: hash u32              - xxh3 (truncated) of everything past this field
//! 0x08: version u16           - Container version (currently 1)
//! 0x0A: algorithm u8          - Algorithm tag (0 = uniformly sampled)
//! 0x0B: reserved u8           - Must be 0
//!
//! Algorithm header (44 bytes, all section offsets are relative to 0x0C):
//! 0x00: num_bones u16
//! 0x02: rotation_format u8
//! 0x03: translation_format u8
//! 0x04: num_samples u32
//! 0x08: sample_rate u32
//! 0x0C: range_reduction u8
//! 0x0D: reserved [u8; 3]
//! 0x10: num_animated_rotation_tracks u32
//! 0x14: num_animated_translation_tracks u32
//! 0x18: default_tracks_bitset_offset u32
//! 0x1C: constant_tracks_bitset_offset u32
//! 0x20: constant_track_data_offset u32
//! 0x24: clip_range_data_offset u32
//! 0x28: animated_track_data_offset u32
//! ```
//!
//! Sections follow in the order the offsets are listed; constant, range and
//! animated data are 4-byte aligned. An offset of `u32::MAX` means the
//! section is absent. Bitsets hold 2 bits per bone (rotation, translation),
//! LSB-first in u32 words. Constant track data is bone-major, rotation
//! before translation, 3 x f32 per track (rotations implicit-W). Range data
//! is bone-major, all rotation ranges then all translation ranges, min and
//! extent as 3 x f32 each. Animated data is sample-major, bone-minor,
//! rotation before translation.

use xxhash_rust::xxh3::xxh3_64;

use crate::bitset::{bitset_size, bitset_test, rotation_track_bit, translation_track_bit, TRACKS_PER_BONE};
use crate::error::ClipError;
use crate::formats::{RotationFormat, VectorFormat, RANGE_REDUCTION_ROTATIONS, RANGE_REDUCTION_TRANSLATIONS};

/// Container version written by this encoder
pub const CONTAINER_VERSION: u16 = 1;

/// Algorithm tag for the uniformly sampled codec
pub const ALGORITHM_UNIFORMLY_SAMPLED: u8 = 0;

/// Sentinel offset marking an absent section
pub const INVALID_OFFSET: u32 = u32::MAX;

/// Bytes of one constant track sample (3 x f32)
pub const CONSTANT_TRACK_SIZE: u32 = 12;

/// Bytes of one track range (min + extent, 3 x f32 each)
pub const TRACK_RANGE_SIZE: u32 = 24;

/// Round `value` up to a multiple of `alignment` (a power of two)
#[inline]
pub const fn align_to(value: u32, alignment: u32) -> u32 {
    (value + alignment - 1) & !(alignment - 1)
}

/// Integrity hash: xxh3 of everything past the preamble's hash field
pub fn compute_hash(buffer: &[u8]) -> u32 {
    debug_assert!(buffer.len() >= ClipPreamble::SIZE);
    xxh3_64(&buffer[8..]) as u32
}

/// Container preamble (12 bytes)
#[derive(Debug, Clone, Copy)]
pub struct ClipPreamble {
    pub size: u32,
    pub hash: u32,
    pub version: u16,
    pub algorithm: u8,
}

impl ClipPreamble {
    pub const SIZE: usize = 12;

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        bytes[0..4].copy_from_slice(&self.size.to_le_bytes());
        bytes[4..8].copy_from_slice(&self.hash.to_le_bytes());
        bytes[8..10].copy_from_slice(&self.version.to_le_bytes());
        bytes[10] = self.algorithm;
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::SIZE {
            return None;
        }
        Some(Self {
            size: u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            hash: u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
            version: u16::from_le_bytes([bytes[8], bytes[9]]),
            algorithm: bytes[10],
        })
    }
}

/// Uniformly sampled algorithm header (44 bytes)
#[derive(Debug, Clone, Copy)]
pub struct ClipHeader {
    pub num_bones: u16,
    pub rotation_format: RotationFormat,
    pub translation_format: VectorFormat,
    pub num_samples: u32,
    pub sample_rate: u32,
    pub range_reduction: u8,
    pub num_animated_rotation_tracks: u32,
    pub num_animated_translation_tracks: u32,
    pub default_tracks_bitset_offset: u32,
    pub constant_tracks_bitset_offset: u32,
    pub constant_track_data_offset: u32,
    pub clip_range_data_offset: u32,
    pub animated_track_data_offset: u32,
}

impl ClipHeader {
    pub const SIZE: usize = 44;

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        bytes[0..2].copy_from_slice(&self.num_bones.to_le_bytes());
        bytes[2] = self.rotation_format as u8;
        bytes[3] = self.translation_format as u8;
        bytes[4..8].copy_from_slice(&self.num_samples.to_le_bytes());
        bytes[8..12].copy_from_slice(&self.sample_rate.to_le_bytes());
        bytes[12] = self.range_reduction;
        bytes[16..20].copy_from_slice(&self.num_animated_rotation_tracks.to_le_bytes());
        bytes[20..24].copy_from_slice(&self.num_animated_translation_tracks.to_le_bytes());
        bytes[24..28].copy_from_slice(&self.default_tracks_bitset_offset.to_le_bytes());
        bytes[28..32].copy_from_slice(&self.constant_tracks_bitset_offset.to_le_bytes());
        bytes[32..36].copy_from_slice(&self.constant_track_data_offset.to_le_bytes());
        bytes[36..40].copy_from_slice(&self.clip_range_data_offset.to_le_bytes());
        bytes[40..44].copy_from_slice(&self.animated_track_data_offset.to_le_bytes());
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::SIZE {
            return None;
        }
        Some(Self {
            num_bones: u16::from_le_bytes([bytes[0], bytes[1]]),
            rotation_format: RotationFormat::from_u8(bytes[2])?,
            translation_format: VectorFormat::from_u8(bytes[3])?,
            num_samples: u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
            sample_rate: u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]),
            range_reduction: bytes[12],
            num_animated_rotation_tracks: u32::from_le_bytes([
                bytes[16], bytes[17], bytes[18], bytes[19],
            ]),
            num_animated_translation_tracks: u32::from_le_bytes([
                bytes[20], bytes[21], bytes[22], bytes[23],
            ]),
            default_tracks_bitset_offset: u32::from_le_bytes([
                bytes[24], bytes[25], bytes[26], bytes[27],
            ]),
            constant_tracks_bitset_offset: u32::from_le_bytes([
                bytes[28], bytes[29], bytes[30], bytes[31],
            ]),
            constant_track_data_offset: u32::from_le_bytes([
                bytes[32], bytes[33], bytes[34], bytes[35],
            ]),
            clip_range_data_offset: u32::from_le_bytes([bytes[36], bytes[37], bytes[38], bytes[39]]),
            animated_track_data_offset: u32::from_le_bytes([
                bytes[40], bytes[41], bytes[42], bytes[43],
            ]),
        })
    }

    /// Size in bytes of each track bitset
    pub fn bitset_bytes(&self) -> u32 {
        bitset_size(self.num_bones as u32 * TRACKS_PER_BONE) * 4
    }

    /// True when animated rotation payloads went through range reduction
    pub fn reduces_rotations(&self) -> bool {
        self.range_reduction & RANGE_REDUCTION_ROTATIONS != 0
            && self.rotation_format != RotationFormat::Quat128
    }

    /// True when animated translation payloads went through range reduction
    pub fn reduces_translations(&self) -> bool {
        self.range_reduction & RANGE_REDUCTION_TRANSLATIONS != 0
    }

    /// Bytes of one sample-major animated frame across all animated tracks
    pub fn animated_pose_size(&self) -> u32 {
        self.rotation_format.packed_size() * self.num_animated_rotation_tracks
            + self.translation_format.packed_size() * self.num_animated_translation_tracks
    }

    pub fn duration(&self) -> f64 {
        (self.num_samples.saturating_sub(1)) as f64 / self.sample_rate as f64
    }
}

/// An owned compressed clip buffer, produced by the compressor
#[derive(Debug, Clone)]
pub struct CompressedClip {
    buffer: Vec<u8>,
}

impl CompressedClip {
    pub(crate) fn from_buffer(buffer: Vec<u8>) -> Self {
        debug_assert!(validate_compressed_clip(&buffer).is_ok());
        Self { buffer }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    pub fn size(&self) -> u32 {
        self.buffer.len() as u32
    }
}

/// Validate a compressed buffer before any sampling is allowed
///
/// Checks size, version, algorithm tag, hash, header field sanity and that
/// every declared section lies inside the buffer. Sampling a buffer that
/// passed validation cannot fail.
pub fn validate_compressed_clip(buffer: &[u8]) -> Result<(ClipPreamble, ClipHeader), ClipError> {
    let preamble = ClipPreamble::from_bytes(buffer)
        .ok_or_else(|| ClipError::CorruptClip("buffer too small for preamble".into()))?;

    if preamble.size as usize != buffer.len() {
        return Err(ClipError::CorruptClip(format!(
            "declared size {} does not match buffer size {}",
            preamble.size,
            buffer.len()
        )));
    }
    if preamble.version != CONTAINER_VERSION {
        return Err(ClipError::CorruptClip(format!(
            "unknown container version {}",
            preamble.version
        )));
    }
    if preamble.algorithm != ALGORITHM_UNIFORMLY_SAMPLED {
        return Err(ClipError::CorruptClip(format!(
            "unknown algorithm tag {}",
            preamble.algorithm
        )));
    }
    if preamble.hash != compute_hash(buffer) {
        return Err(ClipError::CorruptClip("hash mismatch".into()));
    }

    let header = ClipHeader::from_bytes(&buffer[ClipPreamble::SIZE..])
        .ok_or_else(|| ClipError::CorruptClip("buffer too small for header".into()))?;

    if header.num_bones == 0 || header.num_samples == 0 || header.sample_rate == 0 {
        return Err(ClipError::CorruptClip("empty clip header".into()));
    }
    if header.rotation_format.is_quantized() && !header.reduces_rotations() {
        return Err(ClipError::CorruptClip(
            "quantized rotation format without rotation range reduction".into(),
        ));
    }
    if header.translation_format.is_quantized() && !header.reduces_translations() {
        return Err(ClipError::CorruptClip(
            "quantized translation format without translation range reduction".into(),
        ));
    }

    let section_bytes = (buffer.len() - ClipPreamble::SIZE) as u32;
    let check_section = |offset: u32, size: u32, name: &str| -> Result<(), ClipError> {
        if size == 0 {
            return Ok(());
        }
        if offset == INVALID_OFFSET {
            return Err(ClipError::CorruptClip(format!("missing {} section", name)));
        }
        if offset.checked_add(size).map_or(true, |end| end > section_bytes) {
            return Err(ClipError::CorruptClip(format!(
                "{} section out of bounds ({} + {} > {})",
                name, offset, size, section_bytes
            )));
        }
        Ok(())
    };

    let bitset_bytes = header.bitset_bytes();
    check_section(header.default_tracks_bitset_offset, bitset_bytes, "default bitset")?;
    check_section(header.constant_tracks_bitset_offset, bitset_bytes, "constant bitset")?;

    // Count the tracks the bitsets promise and cross-check the header
    let defaults = read_bitset(buffer, header.default_tracks_bitset_offset, bitset_bytes);
    let constants = read_bitset(buffer, header.constant_tracks_bitset_offset, bitset_bytes);

    let mut num_constant_rotations = 0u32;
    let mut num_constant_translations = 0u32;
    let mut num_animated_rotations = 0u32;
    let mut num_animated_translations = 0u32;
    for bone_index in 0..header.num_bones {
        let rotation_bit = rotation_track_bit(bone_index);
        let translation_bit = translation_track_bit(bone_index);
        if bitset_test(&defaults, rotation_bit) && !bitset_test(&constants, rotation_bit) {
            return Err(ClipError::CorruptClip(format!(
                "bone {} rotation is default but not constant",
                bone_index
            )));
        }
        if bitset_test(&defaults, translation_bit) && !bitset_test(&constants, translation_bit) {
            return Err(ClipError::CorruptClip(format!(
                "bone {} translation is default but not constant",
                bone_index
            )));
        }
        if bitset_test(&constants, rotation_bit) {
            if !bitset_test(&defaults, rotation_bit) {
                num_constant_rotations += 1;
            }
        } else {
            num_animated_rotations += 1;
        }
        if bitset_test(&constants, translation_bit) {
            if !bitset_test(&defaults, translation_bit) {
                num_constant_translations += 1;
            }
        } else {
            num_animated_translations += 1;
        }
    }

    if num_animated_rotations != header.num_animated_rotation_tracks
        || num_animated_translations != header.num_animated_translation_tracks
    {
        return Err(ClipError::CorruptClip(
            "animated track counts disagree with bitsets".into(),
        ));
    }

    let constant_data_size =
        (num_constant_rotations + num_constant_translations) * CONSTANT_TRACK_SIZE;
    check_section(header.constant_track_data_offset, constant_data_size, "constant data")?;

    let mut range_data_size = 0;
    if header.reduces_rotations() {
        range_data_size += num_animated_rotations * TRACK_RANGE_SIZE;
    }
    if header.reduces_translations() {
        range_data_size += num_animated_translations * TRACK_RANGE_SIZE;
    }
    check_section(header.clip_range_data_offset, range_data_size, "range data")?;

    let animated_data_size = header
        .animated_pose_size()
        .checked_mul(header.num_samples)
        .ok_or_else(|| ClipError::CorruptClip("animated data size overflow".into()))?;
    check_section(header.animated_track_data_offset, animated_data_size, "animated data")?;

    Ok((preamble, header))
}

/// Copy a bitset section out of the buffer as u32 words
pub(crate) fn read_bitset(buffer: &[u8], header_offset: u32, num_bytes: u32) -> Vec<u32> {
    let start = ClipPreamble::SIZE + header_offset as usize;
    (0..num_bytes as usize / 4)
        .map(|word| {
            let at = start + word * 4;
            u32::from_le_bytes([buffer[at], buffer[at + 1], buffer[at + 2], buffer[at + 3]])
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_align_to() {
        assert_eq!(align_to(0, 4), 0);
        assert_eq!(align_to(1, 4), 4);
        assert_eq!(align_to(4, 4), 4);
        assert_eq!(align_to(13, 16), 16);
    }

    #[test]
    fn test_preamble_roundtrip() {
        let preamble = ClipPreamble {
            size: 1024,
            hash: 0xDEADBEEF,
            version: CONTAINER_VERSION,
            algorithm: ALGORITHM_UNIFORMLY_SAMPLED,
        };
        let bytes = preamble.to_bytes();
        assert_eq!(bytes.len(), ClipPreamble::SIZE);

        let parsed = ClipPreamble::from_bytes(&bytes).unwrap();
        assert_eq!(parsed.size, preamble.size);
        assert_eq!(parsed.hash, preamble.hash);
        assert_eq!(parsed.version, preamble.version);
        assert_eq!(parsed.algorithm, preamble.algorithm);
    }

    #[test]
    fn test_header_roundtrip() {
        let header = ClipHeader {
            num_bones: 25,
            rotation_format: RotationFormat::Quat48,
            translation_format: VectorFormat::Vector32,
            num_samples: 90,
            sample_rate: 30,
            range_reduction: RANGE_REDUCTION_ROTATIONS | RANGE_REDUCTION_TRANSLATIONS,
            num_animated_rotation_tracks: 20,
            num_animated_translation_tracks: 3,
            default_tracks_bitset_offset: 44,
            constant_tracks_bitset_offset: 52,
            constant_track_data_offset: 60,
            clip_range_data_offset: 120,
            animated_track_data_offset: INVALID_OFFSET,
        };
        let bytes = header.to_bytes();
        assert_eq!(bytes.len(), ClipHeader::SIZE);

        let parsed = ClipHeader::from_bytes(&bytes).unwrap();
        assert_eq!(parsed.num_bones, 25);
        assert_eq!(parsed.rotation_format, RotationFormat::Quat48);
        assert_eq!(parsed.translation_format, VectorFormat::Vector32);
        assert_eq!(parsed.num_samples, 90);
        assert_eq!(parsed.sample_rate, 30);
        assert_eq!(parsed.range_reduction, header.range_reduction);
        assert_eq!(parsed.animated_track_data_offset, INVALID_OFFSET);
    }

    #[test]
    fn test_header_rejects_unknown_format() {
        let mut bytes = ClipHeader {
            num_bones: 1,
            rotation_format: RotationFormat::Quat128,
            translation_format: VectorFormat::Vector96,
            num_samples: 1,
            sample_rate: 30,
            range_reduction: 0,
            num_animated_rotation_tracks: 0,
            num_animated_translation_tracks: 0,
            default_tracks_bitset_offset: 44,
            constant_tracks_bitset_offset: 48,
            constant_track_data_offset: INVALID_OFFSET,
            clip_range_data_offset: INVALID_OFFSET,
            animated_track_data_offset: INVALID_OFFSET,
        }
        .to_bytes();
        bytes[2] = 17;
        assert!(ClipHeader::from_bytes(&bytes).is_none());
    }

    #[test]
    fn test_validate_rejects_truncated_buffer() {
        assert!(matches!(
            validate_compressed_clip(&[0u8; 4]),
            Err(ClipError::CorruptClip(_))
        ));
    }

    #[test]
    fn test_header_duration() {
        let mut header = ClipHeader::from_bytes(
            &ClipHeader {
                num_bones: 1,
                rotation_format: RotationFormat::Quat128,
                translation_format: VectorFormat::Vector96,
                num_samples: 31,
                sample_rate: 30,
                range_reduction: 0,
                num_animated_rotation_tracks: 0,
                num_animated_translation_tracks: 0,
                default_tracks_bitset_offset: 44,
                constant_tracks_bitset_offset: 48,
                constant_track_data_offset: INVALID_OFFSET,
                clip_range_data_offset: INVALID_OFFSET,
                animated_track_data_offset: INVALID_OFFSET,
            }
            .to_bytes(),
        )
        .unwrap();
        assert_eq!(header.duration(), 1.0);
        header.num_samples = 1;
        assert_eq!(header.duration(), 0.0);
    }
}
