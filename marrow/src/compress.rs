//! Uniformly sampled clip encoder
//!
//! Runs the stream pipeline and assembles the compressed container described
//! in [`crate::container`]. Compression is deterministic: the same clip,
//! skeleton and settings always produce byte-identical buffers.

use bytemuck::cast_slice;
use glam::Vec3;

use crate::bitset::{bitset_set, bitset_size, rotation_track_bit, translation_track_bit, TRACKS_PER_BONE};
use crate::clip::{AnimationClip, Skeleton};
use crate::container::{
    align_to, compute_hash, ClipHeader, ClipPreamble, CompressedClip, ALGORITHM_UNIFORMLY_SAMPLED,
    CONSTANT_TRACK_SIZE, CONTAINER_VERSION, INVALID_OFFSET, TRACK_RANGE_SIZE,
};
use crate::error::ClipError;
use crate::formats::CompressionSettings;
use crate::stream::compact::compact_constant_streams;
use crate::stream::convert::{convert_clip_to_streams, convert_rotation_streams};
use crate::stream::quantize::{quantize_rotation_streams, quantize_translation_streams};
use crate::stream::range::{normalize_rotation_streams, normalize_translation_streams};
use crate::stream::BoneStream;

/// Per-type track counts after compaction
struct StreamCounts {
    constant_rotations: u32,
    constant_translations: u32,
    animated_rotations: u32,
    animated_translations: u32,
}

fn count_streams(streams: &[BoneStream]) -> StreamCounts {
    let mut counts = StreamCounts {
        constant_rotations: 0,
        constant_translations: 0,
        animated_rotations: 0,
        animated_translations: 0,
    };
    for stream in streams {
        if stream.is_rotation_constant {
            if !stream.is_rotation_default {
                counts.constant_rotations += 1;
            }
        } else {
            counts.animated_rotations += 1;
        }
        if stream.is_translation_constant {
            if !stream.is_translation_default {
                counts.constant_translations += 1;
            }
        } else {
            counts.animated_translations += 1;
        }
    }
    counts
}

/// Compress a raw clip against its skeleton
///
/// Returns the owned compressed buffer, or an error when the inputs or the
/// settings are invalid. The skeleton is only read; the compressed clip
/// keeps no reference to it.
pub fn compress_clip(
    clip: &AnimationClip,
    skeleton: &Skeleton,
    settings: &CompressionSettings,
) -> Result<CompressedClip, ClipError> {
    settings.validate()?;

    if clip.num_bones() != skeleton.num_bones() {
        return Err(ClipError::InvalidInput(format!(
            "clip has {} bones but the skeleton has {}",
            clip.num_bones(),
            skeleton.num_bones()
        )));
    }

    let num_bones = clip.num_bones();
    let num_samples = clip.num_samples();

    let mut streams = convert_clip_to_streams(clip);
    convert_rotation_streams(&mut streams, settings.rotation_format);
    compact_constant_streams(&mut streams, skeleton, settings.constant_threshold);
    if settings.reduces_rotations() {
        normalize_rotation_streams(&mut streams);
    }
    if settings.reduces_translations() {
        normalize_translation_streams(&mut streams);
    }
    quantize_rotation_streams(&mut streams, settings.rotation_format);
    quantize_translation_streams(&mut streams, settings.translation_format);

    let counts = count_streams(&streams);

    // Section sizes
    let bitset_bytes = bitset_size(num_bones as u32 * TRACKS_PER_BONE) * 4;
    let constant_data_size =
        (counts.constant_rotations + counts.constant_translations) * CONSTANT_TRACK_SIZE;
    let mut range_data_size = 0;
    if settings.reduces_rotations() {
        range_data_size += counts.animated_rotations * TRACK_RANGE_SIZE;
    }
    if settings.reduces_translations() {
        range_data_size += counts.animated_translations * TRACK_RANGE_SIZE;
    }
    let animated_pose_size = settings.rotation_format.packed_size() * counts.animated_rotations
        + settings.translation_format.packed_size() * counts.animated_translations;
    let animated_data_size = animated_pose_size * num_samples;

    // Section offsets, relative to the algorithm header
    let default_tracks_bitset_offset = ClipHeader::SIZE as u32;
    let constant_tracks_bitset_offset = default_tracks_bitset_offset + bitset_bytes;
    let constant_track_data_offset = constant_tracks_bitset_offset + bitset_bytes;
    let clip_range_data_offset = align_to(constant_track_data_offset + constant_data_size, 4);
    let animated_track_data_offset = align_to(clip_range_data_offset + range_data_size, 4);
    let total_size = ClipPreamble::SIZE as u32 + animated_track_data_offset + animated_data_size;

    let header = ClipHeader {
        num_bones,
        rotation_format: settings.rotation_format,
        translation_format: settings.translation_format,
        num_samples,
        sample_rate: clip.sample_rate(),
        range_reduction: settings.range_reduction,
        num_animated_rotation_tracks: counts.animated_rotations,
        num_animated_translation_tracks: counts.animated_translations,
        default_tracks_bitset_offset,
        constant_tracks_bitset_offset,
        constant_track_data_offset: if constant_data_size > 0 {
            constant_track_data_offset
        } else {
            INVALID_OFFSET
        },
        clip_range_data_offset: if range_data_size > 0 {
            clip_range_data_offset
        } else {
            INVALID_OFFSET
        },
        animated_track_data_offset: if animated_data_size > 0 {
            animated_track_data_offset
        } else {
            INVALID_OFFSET
        },
    };

    let mut buffer = Vec::with_capacity(total_size as usize);
    buffer.extend_from_slice(
        &ClipPreamble {
            size: total_size,
            hash: 0,
            version: CONTAINER_VERSION,
            algorithm: ALGORITHM_UNIFORMLY_SAMPLED,
        }
        .to_bytes(),
    );
    buffer.extend_from_slice(&header.to_bytes());

    write_track_bitset(&mut buffer, &streams, bitset_bytes, |stream| {
        (stream.is_rotation_default, stream.is_translation_default)
    });
    write_track_bitset(&mut buffer, &streams, bitset_bytes, |stream| {
        (stream.is_rotation_constant, stream.is_translation_constant)
    });

    write_constant_track_data(&mut buffer, &streams);
    pad_to(&mut buffer, ClipPreamble::SIZE as u32 + clip_range_data_offset);
    write_range_data(&mut buffer, &streams, settings);
    pad_to(&mut buffer, ClipPreamble::SIZE as u32 + animated_track_data_offset);
    write_animated_track_data(&mut buffer, &streams, num_samples, settings);

    debug_assert_eq!(buffer.len(), total_size as usize);

    let hash = compute_hash(&buffer);
    buffer[4..8].copy_from_slice(&hash.to_le_bytes());

    Ok(CompressedClip::from_buffer(buffer))
}

fn pad_to(buffer: &mut Vec<u8>, offset: u32) {
    debug_assert!(buffer.len() <= offset as usize);
    buffer.resize(offset as usize, 0);
}

fn write_track_bitset(
    buffer: &mut Vec<u8>,
    streams: &[BoneStream],
    bitset_bytes: u32,
    flags: impl Fn(&BoneStream) -> (bool, bool),
) {
    let mut words = vec![0u32; bitset_bytes as usize / 4];
    for (bone_index, stream) in streams.iter().enumerate() {
        let (rotation, translation) = flags(stream);
        bitset_set(&mut words, rotation_track_bit(bone_index as u16), rotation);
        bitset_set(&mut words, translation_track_bit(bone_index as u16), translation);
    }
    for word in words {
        buffer.extend_from_slice(&word.to_le_bytes());
    }
}

/// Constant samples, bone-major, rotation before translation, 3 x f32 each
///
/// Rotations store (x, y, z) with implicit W regardless of the animated
/// format; sign normalization during conversion makes this lossless.
fn write_constant_track_data(buffer: &mut Vec<u8>, streams: &[BoneStream]) {
    for stream in streams {
        if stream.is_rotation_constant && !stream.is_rotation_default {
            let sample = stream.rotations[0];
            push_vec3(buffer, sample.truncate());
        }
        if stream.is_translation_constant && !stream.is_translation_default {
            push_vec3(buffer, stream.translations[0]);
        }
    }
}

/// Track ranges, bone-major, all rotation ranges then all translation ranges
fn write_range_data(buffer: &mut Vec<u8>, streams: &[BoneStream], settings: &CompressionSettings) {
    if settings.reduces_rotations() {
        for stream in streams {
            if let Some(range) = stream.rotation_range {
                push_vec3(buffer, range.min);
                push_vec3(buffer, range.extent);
            }
        }
    }
    if settings.reduces_translations() {
        for stream in streams {
            if let Some(range) = stream.translation_range {
                push_vec3(buffer, range.min);
                push_vec3(buffer, range.extent);
            }
        }
    }
}

/// Animated payloads, sample-major then bone-minor, rotation before
/// translation, so two adjacent frames sit one pose stride apart
fn write_animated_track_data(
    buffer: &mut Vec<u8>,
    streams: &[BoneStream],
    num_samples: u32,
    settings: &CompressionSettings,
) {
    let rotation_size = settings.rotation_format.packed_size() as usize;
    let translation_size = settings.translation_format.packed_size() as usize;

    for sample_index in 0..num_samples as usize {
        for stream in streams {
            if stream.is_rotation_animated() {
                let at = sample_index * rotation_size;
                buffer.extend_from_slice(&stream.packed_rotations[at..at + rotation_size]);
            }
            if stream.is_translation_animated() {
                let at = sample_index * translation_size;
                buffer.extend_from_slice(&stream.packed_translations[at..at + translation_size]);
            }
        }
    }
}

#[inline]
fn push_vec3(buffer: &mut Vec<u8>, v: Vec3) {
    buffer.extend_from_slice(cast_slice(&v.to_array()));
}
