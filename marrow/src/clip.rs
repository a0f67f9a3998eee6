//! Raw clip model: skeleton and uniformly sampled animation tracks
//!
//! Raw data is kept in double precision; it only exists between reading an
//! input clip and producing the compressed buffer, and it is what the error
//! metric measures the lossy output against.

use glam::{DQuat, DVec3};

use crate::error::ClipError;
use crate::math::{dquat_nlerp, interpolation_keys, quat_is_finite, quat_is_normalized, Transform64};

/// One node of the skeleton hierarchy
#[derive(Debug, Clone)]
pub struct Bone {
    pub name: String,
    /// Parent bone index; `None` for the root
    pub parent: Option<u16>,
    pub bind_rotation: DQuat,
    pub bind_translation: DVec3,
    /// Radius of the virtual vertex used by the error metric
    pub vertex_distance: f64,
}

impl Bone {
    pub fn bind_transform(&self) -> Transform64 {
        Transform64 {
            rotation: self.bind_rotation,
            translation: self.bind_translation,
        }
    }
}

/// An ordered bone hierarchy
///
/// Bones are stored in topological order: every parent index is smaller than
/// the index of its children and exactly one bone is the root.
#[derive(Debug, Clone)]
pub struct Skeleton {
    bones: Vec<Bone>,
}

impl Skeleton {
    pub fn new(bones: Vec<Bone>) -> Result<Self, ClipError> {
        if bones.is_empty() {
            return Err(ClipError::InvalidInput("skeleton has no bones".into()));
        }
        if bones.len() > u16::MAX as usize {
            return Err(ClipError::InvalidInput(format!(
                "too many bones: {}",
                bones.len()
            )));
        }

        let mut num_roots = 0usize;
        for (index, bone) in bones.iter().enumerate() {
            match bone.parent {
                None => num_roots += 1,
                Some(parent) => {
                    if parent as usize >= index {
                        return Err(ClipError::InvalidInput(format!(
                            "bone '{}' is not in topological order (parent {} >= {})",
                            bone.name, parent, index
                        )));
                    }
                }
            }
            if !quat_is_finite(bone.bind_rotation) || !bone.bind_translation.is_finite() {
                return Err(ClipError::InvalidInput(format!(
                    "bone '{}' has a non-finite bind pose",
                    bone.name
                )));
            }
            if !quat_is_normalized(bone.bind_rotation) {
                return Err(ClipError::InvalidInput(format!(
                    "bone '{}' bind rotation is not normalized",
                    bone.name
                )));
            }
            if !(bone.vertex_distance.is_finite() && bone.vertex_distance >= 0.0) {
                return Err(ClipError::InvalidInput(format!(
                    "bone '{}' vertex distance must be non-negative",
                    bone.name
                )));
            }
        }
        if num_roots != 1 {
            return Err(ClipError::InvalidInput(format!(
                "skeleton must have exactly one root, found {}",
                num_roots
            )));
        }

        Ok(Self { bones })
    }

    pub fn num_bones(&self) -> u16 {
        self.bones.len() as u16
    }

    pub fn bones(&self) -> &[Bone] {
        &self.bones
    }

    pub fn bone(&self, bone_index: u16) -> &Bone {
        &self.bones[bone_index as usize]
    }
}

/// Rotation and translation tracks for one bone
#[derive(Debug, Clone)]
pub struct AnimatedBone {
    pub rotations: Vec<DQuat>,
    pub translations: Vec<DVec3>,
}

/// A uniformly sampled animation clip
#[derive(Debug, Clone)]
pub struct AnimationClip {
    name: String,
    bones: Vec<AnimatedBone>,
    num_samples: u32,
    sample_rate: u32,
}

impl AnimationClip {
    pub fn new(
        name: impl Into<String>,
        sample_rate: u32,
        bones: Vec<AnimatedBone>,
    ) -> Result<Self, ClipError> {
        let name = name.into();
        if sample_rate == 0 {
            return Err(ClipError::InvalidInput("sample rate must be positive".into()));
        }
        if bones.is_empty() {
            return Err(ClipError::InvalidInput("clip has no bones".into()));
        }

        let num_samples = bones[0].rotations.len();
        if num_samples == 0 {
            return Err(ClipError::InvalidInput("clip has no samples".into()));
        }
        if num_samples > u32::MAX as usize {
            return Err(ClipError::InvalidInput("clip has too many samples".into()));
        }

        for (bone_index, bone) in bones.iter().enumerate() {
            if bone.rotations.len() != num_samples || bone.translations.len() != num_samples {
                return Err(ClipError::InvalidInput(format!(
                    "bone {} track lengths ({}, {}) do not match the clip ({})",
                    bone_index,
                    bone.rotations.len(),
                    bone.translations.len(),
                    num_samples
                )));
            }
            for (sample_index, rotation) in bone.rotations.iter().enumerate() {
                if !quat_is_finite(*rotation) {
                    return Err(ClipError::InvalidInput(format!(
                        "bone {} rotation sample {} is not finite",
                        bone_index, sample_index
                    )));
                }
                if !quat_is_normalized(*rotation) {
                    return Err(ClipError::InvalidInput(format!(
                        "bone {} rotation sample {} is not normalized",
                        bone_index, sample_index
                    )));
                }
            }
            for (sample_index, translation) in bone.translations.iter().enumerate() {
                if !translation.is_finite() {
                    return Err(ClipError::InvalidInput(format!(
                        "bone {} translation sample {} is not finite",
                        bone_index, sample_index
                    )));
                }
            }
        }

        Ok(Self {
            name,
            bones,
            num_samples: num_samples as u32,
            sample_rate,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn num_bones(&self) -> u16 {
        self.bones.len() as u16
    }

    pub fn num_samples(&self) -> u32 {
        self.num_samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Clip length in seconds; a single-sample clip has zero duration
    pub fn duration(&self) -> f64 {
        (self.num_samples - 1) as f64 / self.sample_rate as f64
    }

    pub fn animated_bones(&self) -> &[AnimatedBone] {
        &self.bones
    }

    /// Size of the equivalent full precision runtime data, used for the
    /// compression ratio (quaternion + vector3, f32)
    pub fn raw_size(&self) -> u32 {
        self.num_bones() as u32 * self.num_samples * (16 + 12)
    }

    /// Sample every bone's local transform at `sample_time`
    ///
    /// Rotations interpolate with lerp + renormalize, matching the decoder.
    pub fn sample_pose(&self, sample_time: f64, out_pose: &mut [Transform64]) {
        debug_assert_eq!(out_pose.len(), self.bones.len());
        for (bone_index, out) in out_pose.iter_mut().enumerate() {
            *out = self.sample_bone(bone_index as u16, sample_time);
        }
    }

    /// Sample a single bone's local transform at `sample_time`
    pub fn sample_bone(&self, bone_index: u16, sample_time: f64) -> Transform64 {
        let bone = &self.bones[bone_index as usize];
        let (frame0, frame1, alpha) =
            interpolation_keys(self.num_samples, self.sample_rate, sample_time);

        let rotation = dquat_nlerp(
            bone.rotations[frame0 as usize],
            bone.rotations[frame1 as usize],
            alpha,
        );
        let translation = bone.translations[frame0 as usize]
            .lerp(bone.translations[frame1 as usize], alpha);
        Transform64 {
            rotation,
            translation,
        }
    }
}
