//! Constant and default track detection
//!
//! A track is default when every sample equals the bind pose within
//! tolerance, and constant when every sample equals its own first sample.
//! Defaults are a subset of constants: both flags are set and the track is
//! dropped entirely from the buffer. Plain constants keep one full precision
//! sample in the constant data section.

use glam::{Vec3, Vec4};

use crate::clip::Skeleton;
use crate::math::quat_ensure_positive_w;
use crate::stream::BoneStream;

/// Detect default and constant tracks and drop their per-frame data
///
/// Runs after rotation conversion, so rotation samples carry W >= 0 and the
/// bind rotation is sign-normalized before comparing.
pub fn compact_constant_streams(streams: &mut [BoneStream], skeleton: &Skeleton, threshold: f32) {
    for (bone_index, stream) in streams.iter_mut().enumerate() {
        let bone = skeleton.bone(bone_index as u16);

        let bind_rotation = quat_ensure_positive_w(bone.bind_rotation.as_quat());
        let bind_rotation = Vec4::new(
            bind_rotation.x,
            bind_rotation.y,
            bind_rotation.z,
            bind_rotation.w,
        );
        let bind_translation = bone.bind_translation.as_vec3();

        stream.is_rotation_default = stream
            .rotations
            .iter()
            .all(|sample| rotations_near(*sample, bind_rotation, threshold));
        stream.is_rotation_constant = stream.is_rotation_default
            || stream
                .rotations
                .iter()
                .all(|sample| rotations_near(*sample, stream.rotations[0], threshold));

        stream.is_translation_default = stream
            .translations
            .iter()
            .all(|sample| translations_near(*sample, bind_translation, threshold));
        stream.is_translation_constant = stream.is_translation_default
            || stream
                .translations
                .iter()
                .all(|sample| translations_near(*sample, stream.translations[0], threshold));

        // Constant tracks retain a single sample, default tracks none at all
        if stream.is_rotation_constant {
            stream.rotations.truncate(if stream.is_rotation_default { 0 } else { 1 });
        }
        if stream.is_translation_constant {
            stream
                .translations
                .truncate(if stream.is_translation_default { 0 } else { 1 });
        }
    }
}

/// Rotation equality within tolerance: |dot| >= 1 - threshold
#[inline]
fn rotations_near(lhs: Vec4, rhs: Vec4, threshold: f32) -> bool {
    lhs.dot(rhs).abs() >= 1.0 - threshold
}

/// Translation equality within tolerance: L-infinity distance < threshold
#[inline]
fn translations_near(lhs: Vec3, rhs: Vec3, threshold: f32) -> bool {
    (lhs - rhs).abs().max_element() < threshold
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clip::{AnimatedBone, AnimationClip, Bone};
    use crate::formats::RotationFormat;
    use crate::stream::convert::{convert_clip_to_streams, convert_rotation_streams};
    use glam::{DQuat, DVec3};

    const THRESHOLD: f32 = 1.0e-5;

    fn single_bone_skeleton(bind_rotation: DQuat, bind_translation: DVec3) -> Skeleton {
        Skeleton::new(vec![Bone {
            name: "root".into(),
            parent: None,
            bind_rotation,
            bind_translation,
            vertex_distance: 1.0,
        }])
        .unwrap()
    }

    fn streams_for(
        skeleton: &Skeleton,
        rotations: Vec<DQuat>,
        translations: Vec<DVec3>,
    ) -> Vec<BoneStream> {
        let clip =
            AnimationClip::new("clip", 30, vec![AnimatedBone { rotations, translations }]).unwrap();
        let mut streams = convert_clip_to_streams(&clip);
        convert_rotation_streams(&mut streams, RotationFormat::Quat96);
        compact_constant_streams(&mut streams, skeleton, THRESHOLD);
        streams
    }

    #[test]
    fn test_default_tracks_detected() {
        let bind = DQuat::from_axis_angle(DVec3::Y, 0.25);
        let skeleton = single_bone_skeleton(bind, DVec3::new(0.0, 1.0, 0.0));
        let streams = streams_for(
            &skeleton,
            vec![bind; 10],
            vec![DVec3::new(0.0, 1.0, 0.0); 10],
        );

        assert!(streams[0].is_rotation_default);
        assert!(streams[0].is_rotation_constant);
        assert!(streams[0].is_translation_default);
        assert!(streams[0].is_translation_constant);
        assert!(streams[0].rotations.is_empty());
        assert!(streams[0].translations.is_empty());
    }

    #[test]
    fn test_negated_bind_rotation_is_still_default() {
        let bind = DQuat::from_axis_angle(DVec3::X, 2.5);
        let skeleton = single_bone_skeleton(bind, DVec3::ZERO);
        let streams = streams_for(&skeleton, vec![-bind; 4], vec![DVec3::ZERO; 4]);
        assert!(streams[0].is_rotation_default);
    }

    #[test]
    fn test_constant_non_default_keeps_one_sample() {
        let skeleton = single_bone_skeleton(DQuat::IDENTITY, DVec3::ZERO);
        let constant = DQuat::from_axis_angle(DVec3::Y, core::f64::consts::FRAC_PI_4);
        let streams = streams_for(&skeleton, vec![constant; 8], vec![DVec3::ZERO; 8]);

        assert!(!streams[0].is_rotation_default);
        assert!(streams[0].is_rotation_constant);
        assert_eq!(streams[0].rotations.len(), 1);
        assert!(streams[0].is_translation_default);
    }

    #[test]
    fn test_animated_track_untouched() {
        let skeleton = single_bone_skeleton(DQuat::IDENTITY, DVec3::ZERO);
        let rotations: Vec<DQuat> = (0..6)
            .map(|i| DQuat::from_axis_angle(DVec3::Z, i as f64 * 0.2))
            .collect();
        let streams = streams_for(&skeleton, rotations, vec![DVec3::ZERO; 6]);

        assert!(!streams[0].is_rotation_constant);
        assert!(streams[0].is_rotation_animated());
        assert_eq!(streams[0].rotations.len(), 6);
    }
}
