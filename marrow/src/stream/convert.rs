//! Clip to stream conversion and rotation representation normalization

use glam::Vec4;

use crate::clip::AnimationClip;
use crate::formats::RotationFormat;
use crate::stream::BoneStream;

/// Build one stream per bone from the raw clip, narrowing samples to f32
pub fn convert_clip_to_streams(clip: &AnimationClip) -> Vec<BoneStream> {
    clip.animated_bones()
        .iter()
        .map(|bone| BoneStream {
            rotations: bone
                .rotations
                .iter()
                .map(|q| {
                    let q = q.as_quat();
                    Vec4::new(q.x, q.y, q.z, q.w)
                })
                .collect(),
            translations: bone.translations.iter().map(|t| t.as_vec3()).collect(),
            is_rotation_default: false,
            is_rotation_constant: false,
            is_translation_default: false,
            is_translation_constant: false,
            rotation_range: None,
            translation_range: None,
            packed_rotations: Vec::new(),
            packed_translations: Vec::new(),
        })
        .collect()
}

/// Normalize every rotation sample's sign so that W >= 0
///
/// q and -q encode the same rotation. The implicit-W formats require the
/// flip before dropping W; applying it to Quat 128 as well keeps every
/// format's stream and constant data identical in meaning.
pub fn convert_rotation_streams(streams: &mut [BoneStream], _format: RotationFormat) {
    for stream in streams.iter_mut() {
        for sample in stream.rotations.iter_mut() {
            if sample.w < 0.0 {
                *sample = -*sample;
            }
        }
    }
}
