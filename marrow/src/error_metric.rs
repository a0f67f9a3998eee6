//! Skeleton-space positional error metric
//!
//! Angular error on a bone near the root is worth more than the same error
//! on a fingertip: it propagates down the chain. Rather than comparing local
//! transforms, each bone is measured by the object-space position of a
//! virtual vertex placed `vertex_distance` along its local +X axis, in the
//! raw pose and the lossy pose. The clip error is the maximum distance over
//! every bone and every sampled time.

use glam::DVec3;

use crate::clip::{AnimationClip, Skeleton};
use crate::decompress::DecompressionContext;
use crate::math::{Transform32, Transform64};

/// Compose two transforms: `parent` applied after `local`
#[inline]
fn transform_mul(parent: &Transform64, local: &Transform64) -> Transform64 {
    Transform64 {
        rotation: (parent.rotation * local.rotation).normalize(),
        translation: parent.rotation * local.translation + parent.translation,
    }
}

/// Chain local transforms up the hierarchy into object space
///
/// Bones are topologically ordered, so every parent is resolved before its
/// children.
pub fn local_to_object_space(
    skeleton: &Skeleton,
    local_pose: &[Transform64],
    out_object_pose: &mut [Transform64],
) {
    debug_assert_eq!(local_pose.len(), skeleton.num_bones() as usize);
    debug_assert_eq!(out_object_pose.len(), local_pose.len());

    for (bone_index, bone) in skeleton.bones().iter().enumerate() {
        out_object_pose[bone_index] = match bone.parent {
            None => local_pose[bone_index],
            Some(parent) => {
                transform_mul(&out_object_pose[parent as usize], &local_pose[bone_index])
            }
        };
    }
}

/// Worst virtual-vertex deviation between two local poses, in object space
pub fn calculate_skeleton_error(
    skeleton: &Skeleton,
    raw_pose: &[Transform64],
    lossy_pose: &[Transform64],
) -> f64 {
    let num_bones = skeleton.num_bones() as usize;
    let mut raw_object = vec![Transform64::IDENTITY; num_bones];
    let mut lossy_object = vec![Transform64::IDENTITY; num_bones];
    local_to_object_space(skeleton, raw_pose, &mut raw_object);
    local_to_object_space(skeleton, lossy_pose, &mut lossy_object);

    let mut max_error = 0.0f64;
    for (bone_index, bone) in skeleton.bones().iter().enumerate() {
        let vertex = DVec3::new(bone.vertex_distance, 0.0, 0.0);
        let raw = raw_object[bone_index].rotation * vertex + raw_object[bone_index].translation;
        let lossy =
            lossy_object[bone_index].rotation * vertex + lossy_object[bone_index].translation;
        max_error = max_error.max(raw.distance(lossy));
    }
    max_error
}

/// Maximum error of a compressed clip over the sample grid and the endpoint
pub fn calculate_clip_max_error(
    clip: &AnimationClip,
    skeleton: &Skeleton,
    context: &DecompressionContext<'_>,
) -> f64 {
    let num_bones = skeleton.num_bones() as usize;
    let mut raw_pose = vec![Transform64::IDENTITY; num_bones];
    let mut lossy_pose_f32 = vec![Transform32::IDENTITY; num_bones];
    let mut lossy_pose = vec![Transform64::IDENTITY; num_bones];

    let duration = clip.duration();
    let sample_increment = 1.0 / clip.sample_rate() as f64;

    let mut measure = |sample_time: f64| {
        clip.sample_pose(sample_time, &mut raw_pose);
        context.decompress_pose(skeleton, sample_time as f32, &mut lossy_pose_f32);
        for (wide, narrow) in lossy_pose.iter_mut().zip(&lossy_pose_f32) {
            *wide = narrow.as_transform64();
        }
        calculate_skeleton_error(skeleton, &raw_pose, &lossy_pose)
    };

    let mut max_error = 0.0f64;
    let mut sample_time = 0.0;
    while sample_time < duration {
        max_error = max_error.max(measure(sample_time));
        sample_time += sample_increment;
    }
    // The loop can step past the duration; always measure the exact endpoint
    max_error.max(measure(duration))
}
