//! Per-clip range reduction
//!
//! For each animated track of the selected type, captures the per-component
//! minimum and extent over every sample and remaps the samples to [0, 1].
//! The decoder inverts with `value * extent + min`, so a zero extent decodes
//! back to the minimum exactly; the division by the extent only happens here,
//! guarded against zero.

use glam::Vec3;

use crate::stream::{BoneStream, TrackRange};

/// Guard against dividing by a zero extent when remapping
const MIN_EXTENT: f32 = 1.0e-8;

/// Range-reduce every animated rotation track (x, y, z components)
pub fn normalize_rotation_streams(streams: &mut [BoneStream]) {
    for stream in streams.iter_mut() {
        if !stream.is_rotation_animated() {
            continue;
        }

        let range = track_range(stream.rotations.iter().map(|s| s.truncate()));
        for sample in stream.rotations.iter_mut() {
            let remapped = remap(sample.truncate(), &range);
            sample.x = remapped.x;
            sample.y = remapped.y;
            sample.z = remapped.z;
        }
        stream.rotation_range = Some(range);
    }
}

/// Range-reduce every animated translation track
pub fn normalize_translation_streams(streams: &mut [BoneStream]) {
    for stream in streams.iter_mut() {
        if !stream.is_translation_animated() {
            continue;
        }

        let range = track_range(stream.translations.iter().copied());
        for sample in stream.translations.iter_mut() {
            *sample = remap(*sample, &range);
        }
        stream.translation_range = Some(range);
    }
}

fn track_range(samples: impl Iterator<Item = Vec3>) -> TrackRange {
    let mut min = Vec3::splat(f32::MAX);
    let mut max = Vec3::splat(f32::MIN);
    for sample in samples {
        min = min.min(sample);
        max = max.max(sample);
    }
    TrackRange {
        min,
        extent: max - min,
    }
}

#[inline]
fn remap(sample: Vec3, range: &TrackRange) -> Vec3 {
    let extent = range.extent.max(Vec3::splat(MIN_EXTENT));
    ((sample - range.min) / extent).clamp(Vec3::ZERO, Vec3::ONE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    fn animated_stream(translations: Vec<Vec3>) -> BoneStream {
        BoneStream {
            rotations: vec![Vec4::new(0.0, 0.0, 0.0, 1.0); translations.len()],
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
    fn test_translation_range_and_remap() {
        let mut streams = vec![animated_stream(vec![
            Vec3::new(-1.0, 2.0, 0.0),
            Vec3::new(1.0, 4.0, 0.0),
            Vec3::new(0.0, 3.0, 0.0),
        ])];
        normalize_translation_streams(&mut streams);

        let range = streams[0].translation_range.unwrap();
        assert_eq!(range.min, Vec3::new(-1.0, 2.0, 0.0));
        assert_eq!(range.extent, Vec3::new(2.0, 2.0, 0.0));

        assert_eq!(streams[0].translations[0], Vec3::new(0.0, 0.0, 0.0));
        assert_eq!(streams[0].translations[1], Vec3::new(1.0, 1.0, 0.0));
        assert_eq!(streams[0].translations[2].x, 0.5);
    }

    #[test]
    fn test_zero_extent_component_records_zero() {
        let mut streams = vec![animated_stream(vec![
            Vec3::new(0.0, 5.0, 1.0),
            Vec3::new(1.0, 5.0, 1.0),
        ])];
        normalize_translation_streams(&mut streams);

        let range = streams[0].translation_range.unwrap();
        assert_eq!(range.extent.y, 0.0);
        assert_eq!(range.extent.z, 0.0);
        // Remapped samples stay in [0, 1] with no NaN
        for sample in &streams[0].translations {
            assert!(sample.is_finite());
            assert!(sample.min_element() >= 0.0 && sample.max_element() <= 1.0);
        }
        // Inverting with the recorded zero extent restores the constant value
        assert_eq!(
            streams[0].translations[0].y * range.extent.y + range.min.y,
            5.0
        );
    }

    #[test]
    fn test_constant_track_skipped() {
        let mut stream = animated_stream(vec![Vec3::ZERO; 3]);
        stream.is_translation_constant = true;
        let mut streams = vec![stream];
        normalize_translation_streams(&mut streams);
        assert!(streams[0].translation_range.is_none());
    }

    #[test]
    fn test_rotation_components_remapped() {
        let mut stream = animated_stream(vec![Vec3::ZERO; 2]);
        stream.rotations = vec![
            Vec4::new(-0.5, 0.0, 0.1, 0.86),
            Vec4::new(0.5, 0.2, 0.3, 0.79),
        ];
        let mut streams = vec![stream];
        normalize_rotation_streams(&mut streams);

        let range = streams[0].rotation_range.unwrap();
        assert_eq!(range.min.x, -0.5);
        assert_eq!(range.extent.x, 1.0);
        assert_eq!(streams[0].rotations[0].x, 0.0);
        assert_eq!(streams[0].rotations[1].x, 1.0);
        // W is never remapped
        assert_eq!(streams[0].rotations[0].w, 0.86);
    }
}
