//! Algorithm tags and dispatch
//!
//! Every compressed buffer names its algorithm in the preamble; dispatch is
//! O(1) on that tag. Only the uniformly sampled codec exists today, but the
//! capability surface (compress, decompress pose, decompress bone, print
//! stats) is keyed through this enum so a second algorithm slots in without
//! touching callers.

use std::io::{self, Write};

use crate::clip::{AnimationClip, Skeleton};
use crate::compress::compress_clip;
use crate::container::{ClipPreamble, CompressedClip, ALGORITHM_UNIFORMLY_SAMPLED};
use crate::decompress::DecompressionContext;
use crate::error::ClipError;
use crate::formats::{range_reduction_name, CompressionSettings};

/// Compression algorithm identifier, stored in the container preamble
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    UniformlySampled,
}

impl Algorithm {
    pub const fn tag(self) -> u8 {
        match self {
            Self::UniformlySampled => ALGORITHM_UNIFORMLY_SAMPLED,
        }
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            ALGORITHM_UNIFORMLY_SAMPLED => Some(Self::UniformlySampled),
            _ => None,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::UniformlySampled => "Uniformly Sampled",
        }
    }

    /// Identify the algorithm of a compressed buffer from its preamble
    pub fn for_buffer(buffer: &[u8]) -> Result<Self, ClipError> {
        let preamble = ClipPreamble::from_bytes(buffer)
            .ok_or_else(|| ClipError::CorruptClip("buffer too small for preamble".into()))?;
        Self::from_tag(preamble.algorithm).ok_or_else(|| {
            ClipError::CorruptClip(format!("unknown algorithm tag {}", preamble.algorithm))
        })
    }

    /// Compress a clip with this algorithm
    pub fn compress(
        self,
        clip: &AnimationClip,
        skeleton: &Skeleton,
        settings: &CompressionSettings,
    ) -> Result<CompressedClip, ClipError> {
        match self {
            Self::UniformlySampled => compress_clip(clip, skeleton, settings),
        }
    }

    /// Write a human readable description of a bound clip
    pub fn print_stats(
        self,
        context: &DecompressionContext<'_>,
        out: &mut dyn Write,
    ) -> io::Result<()> {
        match self {
            Self::UniformlySampled => {
                let header = context.header();
                let num_animated_tracks =
                    header.num_animated_rotation_tracks + header.num_animated_translation_tracks;
                writeln!(out, "Clip rotation format: {}", header.rotation_format.name())?;
                writeln!(
                    out,
                    "Clip translation format: {}",
                    header.translation_format.name()
                )?;
                writeln!(
                    out,
                    "Clip range reduction: {}",
                    range_reduction_name(header.range_reduction)
                )?;
                writeln!(out, "Clip num animated tracks: {}", num_animated_tracks)?;
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clip::{AnimatedBone, Bone};
    use glam::{DQuat, DVec3};

    #[test]
    fn test_tag_roundtrip() {
        assert_eq!(Algorithm::from_tag(0), Some(Algorithm::UniformlySampled));
        assert_eq!(Algorithm::from_tag(1), None);
        assert_eq!(Algorithm::UniformlySampled.tag(), 0);
    }

    #[test]
    fn test_for_buffer_reads_preamble_tag() {
        let skeleton = Skeleton::new(vec![Bone {
            name: "root".into(),
            parent: None,
            bind_rotation: DQuat::IDENTITY,
            bind_translation: DVec3::ZERO,
            vertex_distance: 1.0,
        }])
        .unwrap();
        let clip = AnimationClip::new(
            "clip",
            30,
            vec![AnimatedBone {
                rotations: vec![DQuat::IDENTITY; 2],
                translations: vec![DVec3::ZERO; 2],
            }],
        )
        .unwrap();

        let compressed = Algorithm::UniformlySampled
            .compress(&clip, &skeleton, &CompressionSettings::default())
            .unwrap();
        assert_eq!(
            Algorithm::for_buffer(compressed.as_bytes()).unwrap(),
            Algorithm::UniformlySampled
        );

        let mut bytes = compressed.into_bytes();
        bytes[10] = 9;
        assert!(Algorithm::for_buffer(&bytes).is_err());
    }

    #[test]
    fn test_print_stats_output() {
        let skeleton = Skeleton::new(vec![Bone {
            name: "root".into(),
            parent: None,
            bind_rotation: DQuat::IDENTITY,
            bind_translation: DVec3::ZERO,
            vertex_distance: 1.0,
        }])
        .unwrap();
        let clip = AnimationClip::new(
            "clip",
            30,
            vec![AnimatedBone {
                rotations: (0..4)
                    .map(|i| DQuat::from_axis_angle(DVec3::X, i as f64 * 0.1))
                    .collect(),
                translations: vec![DVec3::ZERO; 4],
            }],
        )
        .unwrap();

        let compressed = Algorithm::UniformlySampled
            .compress(&clip, &skeleton, &CompressionSettings::default())
            .unwrap();
        let context = DecompressionContext::bind(compressed.as_bytes()).unwrap();

        let mut out = Vec::new();
        Algorithm::UniformlySampled
            .print_stats(&context, &mut out)
            .unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Quat 128"));
        assert!(text.contains("num animated tracks: 1"));
    }
}
