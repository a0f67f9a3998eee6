//! Random-access decoder for compressed clips
//!
//! [`DecompressionContext::bind`] validates a buffer once (size, version,
//! algorithm tag, hash, section bounds); after that every sampling call is
//! infallible and allocation free. Whole-pose decoding walks the bones with
//! running section cursors; single-bone decoding rebuilds the same cursors
//! by scanning the bitsets, so both paths produce bit-identical transforms.
//!
//! Default tracks decode to the bind pose, which lives in the skeleton, not
//! the buffer; sampling therefore takes the skeleton the clip was compressed
//! against.

use glam::{Quat, Vec3};

use crate::bitset::{bitset_test, rotation_track_bit, translation_track_bit};
use crate::clip::Skeleton;
use crate::container::{
    read_bitset, validate_compressed_clip, ClipHeader, ClipPreamble, CONSTANT_TRACK_SIZE,
    TRACK_RANGE_SIZE,
};
use crate::error::ClipError;
use crate::formats::{RotationFormat, VectorFormat};
use crate::math::{interpolation_keys, quat_from_positive_w, quat_nlerp, Transform32};
use crate::packing::{unpack_unorm, unpack_vector3_u32};
use crate::stream::TrackRange;

/// A validated, immutable view over a compressed clip buffer
pub struct DecompressionContext<'a> {
    buffer: &'a [u8],
    header: ClipHeader,
    default_tracks: Vec<u32>,
    constant_tracks: Vec<u32>,
}

/// Running cursors into the per-track sections while walking bones in order
#[derive(Debug, Clone, Copy, Default)]
struct TrackCursors {
    /// Bytes into the constant track data section
    constant_data: u32,
    /// Animated rotation tracks seen so far (indexes the rotation range block)
    rotation_range_index: u32,
    /// Animated translation tracks seen so far
    translation_range_index: u32,
    /// Bytes into one animated pose
    pose_cursor: u32,
}

impl<'a> DecompressionContext<'a> {
    /// Validate `buffer` and build a sampling view over it
    pub fn bind(buffer: &'a [u8]) -> Result<Self, ClipError> {
        let (_, header) = validate_compressed_clip(buffer)?;
        let bitset_bytes = header.bitset_bytes();
        let default_tracks = read_bitset(buffer, header.default_tracks_bitset_offset, bitset_bytes);
        let constant_tracks =
            read_bitset(buffer, header.constant_tracks_bitset_offset, bitset_bytes);
        Ok(Self {
            buffer,
            header,
            default_tracks,
            constant_tracks,
        })
    }

    pub fn header(&self) -> &ClipHeader {
        &self.header
    }

    pub fn duration(&self) -> f64 {
        self.header.duration()
    }

    /// Decode every bone's local transform at `sample_time` seconds
    pub fn decompress_pose(
        &self,
        skeleton: &Skeleton,
        sample_time: f32,
        out_pose: &mut [Transform32],
    ) {
        assert_eq!(
            skeleton.num_bones(),
            self.header.num_bones,
            "skeleton does not match the compressed clip"
        );
        assert_eq!(out_pose.len(), self.header.num_bones as usize);

        let keys = interpolation_keys(
            self.header.num_samples,
            self.header.sample_rate,
            sample_time as f64,
        );
        let mut cursors = TrackCursors::default();
        for (bone_index, out) in out_pose.iter_mut().enumerate() {
            let bone_index = bone_index as u16;
            *out = self.decode_bone(skeleton, bone_index, keys, &cursors);
            self.advance(bone_index, &mut cursors);
        }
    }

    /// Decode one bone's local transform at `sample_time` seconds
    ///
    /// Bit-identical to the corresponding element of a whole-pose decode.
    pub fn decompress_bone(
        &self,
        skeleton: &Skeleton,
        sample_time: f32,
        bone_index: u16,
    ) -> Transform32 {
        assert_eq!(
            skeleton.num_bones(),
            self.header.num_bones,
            "skeleton does not match the compressed clip"
        );
        assert!(bone_index < self.header.num_bones, "bone index out of range");

        let keys = interpolation_keys(
            self.header.num_samples,
            self.header.sample_rate,
            sample_time as f64,
        );
        let mut cursors = TrackCursors::default();
        for preceding in 0..bone_index {
            self.advance(preceding, &mut cursors);
        }
        self.decode_bone(skeleton, bone_index, keys, &cursors)
    }

    fn advance(&self, bone_index: u16, cursors: &mut TrackCursors) {
        let rotation_bit = rotation_track_bit(bone_index);
        let translation_bit = translation_track_bit(bone_index);

        if bitset_test(&self.constant_tracks, rotation_bit) {
            if !bitset_test(&self.default_tracks, rotation_bit) {
                cursors.constant_data += CONSTANT_TRACK_SIZE;
            }
        } else {
            cursors.rotation_range_index += 1;
            cursors.pose_cursor += self.header.rotation_format.packed_size();
        }
        if bitset_test(&self.constant_tracks, translation_bit) {
            if !bitset_test(&self.default_tracks, translation_bit) {
                cursors.constant_data += CONSTANT_TRACK_SIZE;
            }
        } else {
            cursors.translation_range_index += 1;
            cursors.pose_cursor += self.header.translation_format.packed_size();
        }
    }

    fn decode_bone(
        &self,
        skeleton: &Skeleton,
        bone_index: u16,
        (frame0, frame1, alpha): (u32, u32, f64),
        cursors: &TrackCursors,
    ) -> Transform32 {
        let bone = skeleton.bone(bone_index);
        let rotation_bit = rotation_track_bit(bone_index);
        let translation_bit = translation_track_bit(bone_index);

        let rotation_animated = !bitset_test(&self.constant_tracks, rotation_bit);

        let rotation = if bitset_test(&self.default_tracks, rotation_bit) {
            bone.bind_rotation.as_quat()
        } else if !rotation_animated {
            quat_from_positive_w(self.read_vec3(
                self.header.constant_track_data_offset,
                cursors.constant_data,
            ))
        } else {
            let q0 = self.read_rotation_sample(frame0, cursors);
            let q1 = self.read_rotation_sample(frame1, cursors);
            quat_nlerp(q0, q1, alpha as f32)
        };

        let translation = if bitset_test(&self.default_tracks, translation_bit) {
            bone.bind_translation.as_vec3()
        } else if bitset_test(&self.constant_tracks, translation_bit) {
            let offset = cursors.constant_data
                + if rotation_animated || bitset_test(&self.default_tracks, rotation_bit) {
                    0
                } else {
                    CONSTANT_TRACK_SIZE
                };
            self.read_vec3(self.header.constant_track_data_offset, offset)
        } else {
            let t0 = self.read_translation_sample(frame0, cursors, rotation_animated);
            let t1 = self.read_translation_sample(frame1, cursors, rotation_animated);
            t0.lerp(t1, alpha as f32)
        };

        Transform32 {
            rotation,
            translation,
        }
    }

    fn read_rotation_sample(&self, frame: u32, cursors: &TrackCursors) -> Quat {
        let at = frame * self.header.animated_pose_size() + cursors.pose_cursor;
        let section = self.header.animated_track_data_offset;

        match self.header.rotation_format {
            RotationFormat::Quat128 => {
                let x = self.read_f32(section, at);
                let y = self.read_f32(section, at + 4);
                let z = self.read_f32(section, at + 8);
                let w = self.read_f32(section, at + 12);
                Quat::from_xyzw(x, y, z, w)
            }
            RotationFormat::Quat96 => {
                let xyz = self.read_vec3(section, at);
                let xyz = self.invert_rotation_range(xyz, cursors);
                quat_from_positive_w(xyz)
            }
            RotationFormat::Quat48 => {
                let xyz = Vec3::new(
                    unpack_unorm(self.read_u16(section, at) as u32, 16),
                    unpack_unorm(self.read_u16(section, at + 2) as u32, 16),
                    unpack_unorm(self.read_u16(section, at + 4) as u32, 16),
                );
                let xyz = self.invert_rotation_range(xyz, cursors);
                quat_from_positive_w(xyz)
            }
            RotationFormat::Quat32 => {
                let xyz = unpack_vector3_u32(self.read_u32(section, at));
                let xyz = self.invert_rotation_range(xyz, cursors);
                quat_from_positive_w(xyz)
            }
        }
    }

    fn read_translation_sample(
        &self,
        frame: u32,
        cursors: &TrackCursors,
        rotation_animated: bool,
    ) -> Vec3 {
        let rotation_size = if rotation_animated {
            self.header.rotation_format.packed_size()
        } else {
            0
        };
        let at = frame * self.header.animated_pose_size() + cursors.pose_cursor + rotation_size;
        let section = self.header.animated_track_data_offset;

        let value = match self.header.translation_format {
            VectorFormat::Vector96 => self.read_vec3(section, at),
            VectorFormat::Vector48 => Vec3::new(
                unpack_unorm(self.read_u16(section, at) as u32, 16),
                unpack_unorm(self.read_u16(section, at + 2) as u32, 16),
                unpack_unorm(self.read_u16(section, at + 4) as u32, 16),
            ),
            VectorFormat::Vector32 => unpack_vector3_u32(self.read_u32(section, at)),
        };

        if self.header.reduces_translations() {
            let range = self.read_range(self.translation_range_offset(cursors));
            value * range.extent + range.min
        } else {
            value
        }
    }

    fn invert_rotation_range(&self, xyz: Vec3, cursors: &TrackCursors) -> Vec3 {
        if self.header.reduces_rotations() {
            let range = self.read_range(cursors.rotation_range_index * TRACK_RANGE_SIZE);
            xyz * range.extent + range.min
        } else {
            xyz
        }
    }

    /// Translation ranges follow every rotation range in the section
    fn translation_range_offset(&self, cursors: &TrackCursors) -> u32 {
        let rotation_block = if self.header.reduces_rotations() {
            self.header.num_animated_rotation_tracks * TRACK_RANGE_SIZE
        } else {
            0
        };
        rotation_block + cursors.translation_range_index * TRACK_RANGE_SIZE
    }

    fn read_range(&self, at: u32) -> TrackRange {
        let section = self.header.clip_range_data_offset;
        TrackRange {
            min: self.read_vec3(section, at),
            extent: self.read_vec3(section, at + 12),
        }
    }

    #[inline]
    fn section_at(&self, section_offset: u32, at: u32) -> usize {
        ClipPreamble::SIZE + section_offset as usize + at as usize
    }

    #[inline]
    fn read_f32(&self, section_offset: u32, at: u32) -> f32 {
        let i = self.section_at(section_offset, at);
        f32::from_le_bytes([
            self.buffer[i],
            self.buffer[i + 1],
            self.buffer[i + 2],
            self.buffer[i + 3],
        ])
    }

    #[inline]
    fn read_vec3(&self, section_offset: u32, at: u32) -> Vec3 {
        Vec3::new(
            self.read_f32(section_offset, at),
            self.read_f32(section_offset, at + 4),
            self.read_f32(section_offset, at + 8),
        )
    }

    #[inline]
    fn read_u16(&self, section_offset: u32, at: u32) -> u16 {
        let i = self.section_at(section_offset, at);
        u16::from_le_bytes([self.buffer[i], self.buffer[i + 1]])
    }

    #[inline]
    fn read_u32(&self, section_offset: u32, at: u32) -> u32 {
        let i = self.section_at(section_offset, at);
        u32::from_le_bytes([
            self.buffer[i],
            self.buffer[i + 1],
            self.buffer[i + 2],
            self.buffer[i + 3],
        ])
    }
}
