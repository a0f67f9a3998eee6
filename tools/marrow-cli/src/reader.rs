//! Clip document reader (JSON -> skeleton + raw clip)
//!
//! The document carries the skeleton (bones with parent names, bind pose and
//! vertex distance) and per-bone rotation/translation sample arrays. Bones
//! appear in topological order; parents are referenced by name. Bones
//! without a track entry hold their bind pose for the whole clip.

use std::collections::HashMap;

use anyhow::{anyhow, bail, Context, Result};
use glam::{DQuat, DVec3};
use serde::Deserialize;

use marrow::{AnimatedBone, AnimationClip, Bone, Skeleton};

#[derive(Deserialize)]
struct ClipDocument {
    clip: ClipMeta,
    bones: Vec<BoneDoc>,
    #[serde(default)]
    tracks: Vec<TrackDoc>,
}

#[derive(Deserialize)]
struct ClipMeta {
    name: String,
    sample_rate: u32,
    num_samples: u32,
}

#[derive(Deserialize)]
struct BoneDoc {
    name: String,
    parent: Option<String>,
    vertex_distance: f64,
    /// x, y, z, w
    bind_rotation: [f64; 4],
    bind_translation: [f64; 3],
}

#[derive(Deserialize)]
struct TrackDoc {
    bone: String,
    rotations: Vec<[f64; 4]>,
    translations: Vec<[f64; 3]>,
}

/// Parse a clip document into the codec's in-memory model
///
/// Syntax errors report the line and column from the JSON parser; semantic
/// errors name the offending bone or track.
pub fn read_clip(text: &str) -> Result<(AnimationClip, Skeleton)> {
    let document: ClipDocument = serde_json::from_str(text)
        .map_err(|err| anyhow!("line {} column {}: {}", err.line(), err.column(), err))?;

    if document.clip.num_samples == 0 {
        bail!("clip '{}' has no samples", document.clip.name);
    }

    let mut bone_indices = HashMap::new();
    let mut bones = Vec::with_capacity(document.bones.len());
    for (index, bone) in document.bones.iter().enumerate() {
        if bone_indices.insert(bone.name.clone(), index as u16).is_some() {
            bail!("duplicate bone name '{}'", bone.name);
        }
        let parent = match &bone.parent {
            None => None,
            Some(parent_name) => Some(
                *bone_indices
                    .get(parent_name)
                    .with_context(|| {
                        format!(
                            "bone '{}' references parent '{}' which is not defined before it",
                            bone.name, parent_name
                        )
                    })?,
            ),
        };
        bones.push(Bone {
            name: bone.name.clone(),
            parent,
            bind_rotation: quat_from_array(bone.bind_rotation),
            bind_translation: DVec3::from_array(bone.bind_translation),
            vertex_distance: bone.vertex_distance,
        });
    }

    let skeleton = Skeleton::new(bones).context("invalid skeleton")?;

    // Bones without a track entry hold their bind pose
    let num_samples = document.clip.num_samples as usize;
    let mut animated_bones: Vec<AnimatedBone> = skeleton
        .bones()
        .iter()
        .map(|bone| AnimatedBone {
            rotations: vec![bone.bind_rotation; num_samples],
            translations: vec![bone.bind_translation; num_samples],
        })
        .collect();

    for track in &document.tracks {
        let bone_index = *bone_indices
            .get(&track.bone)
            .with_context(|| format!("track references unknown bone '{}'", track.bone))?;
        if track.rotations.len() != num_samples || track.translations.len() != num_samples {
            bail!(
                "track for bone '{}' has {} rotation and {} translation samples, expected {}",
                track.bone,
                track.rotations.len(),
                track.translations.len(),
                num_samples
            );
        }
        animated_bones[bone_index as usize] = AnimatedBone {
            rotations: track.rotations.iter().copied().map(quat_from_array).collect(),
            translations: track
                .translations
                .iter()
                .map(|t| DVec3::from_array(*t))
                .collect(),
        };
    }

    let clip = AnimationClip::new(
        document.clip.name,
        document.clip.sample_rate,
        animated_bones,
    )
    .context("invalid clip")?;

    Ok((clip, skeleton))
}

#[inline]
fn quat_from_array([x, y, z, w]: [f64; 4]) -> DQuat {
    DQuat::from_xyzw(x, y, z, w)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL_CLIP: &str = r#"{
        "clip": { "name": "minimal", "sample_rate": 30, "num_samples": 2 },
        "bones": [
            {
                "name": "root",
                "parent": null,
                "vertex_distance": 1.0,
                "bind_rotation": [0.0, 0.0, 0.0, 1.0],
                "bind_translation": [0.0, 0.0, 0.0]
            },
            {
                "name": "child",
                "parent": "root",
                "vertex_distance": 0.5,
                "bind_rotation": [0.0, 0.0, 0.0, 1.0],
                "bind_translation": [0.0, 1.0, 0.0]
            }
        ],
        "tracks": [
            {
                "bone": "child",
                "rotations": [[0.0, 0.0, 0.0, 1.0], [0.0, 0.0, 0.0, 1.0]],
                "translations": [[0.0, 1.0, 0.0], [0.0, 1.5, 0.0]]
            }
        ]
    }"#;

    #[test]
    fn test_reads_minimal_document() {
        let (clip, skeleton) = read_clip(MINIMAL_CLIP).unwrap();
        assert_eq!(skeleton.num_bones(), 2);
        assert_eq!(skeleton.bone(1).parent, Some(0));
        assert_eq!(clip.num_samples(), 2);
        assert_eq!(clip.sample_rate(), 30);

        // Untracked root holds its bind pose
        assert_eq!(clip.animated_bones()[0].translations[1], DVec3::ZERO);
        assert_eq!(
            clip.animated_bones()[1].translations[1],
            DVec3::new(0.0, 1.5, 0.0)
        );
    }

    #[test]
    fn test_syntax_error_reports_line_and_column() {
        let err = read_clip("{\n  \"clip\": nope\n}").unwrap_err();
        let message = format!("{}", err);
        assert!(message.contains("line 2"), "message: {}", message);
        assert!(message.contains("column"), "message: {}", message);
    }

    #[test]
    fn test_unknown_parent_is_rejected() {
        let text = MINIMAL_CLIP.replace("\"parent\": \"root\"", "\"parent\": \"pelvis\"");
        let err = read_clip(&text).unwrap_err();
        assert!(format!("{:#}", err).contains("pelvis"));
    }

    #[test]
    fn test_track_length_mismatch_is_rejected() {
        let text = MINIMAL_CLIP.replace(
            "\"translations\": [[0.0, 1.0, 0.0], [0.0, 1.5, 0.0]]",
            "\"translations\": [[0.0, 1.0, 0.0]]",
        );
        assert!(read_clip(&text).is_err());
    }
}
