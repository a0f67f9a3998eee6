//! Settings matrix sweep and stats reporting

use std::io::Write;
use std::time::Instant;

use anyhow::{ensure, Context, Result};

use marrow::{
    calculate_clip_max_error, Algorithm, AnimationClip, CompressionSettings, DecompressionContext,
    RotationFormat, Skeleton, Transform32, VectorFormat, RANGE_REDUCTION_NONE,
    RANGE_REDUCTION_ROTATIONS, RANGE_REDUCTION_TRANSLATIONS,
};

/// Every valid (rotation format, translation format, range reduction)
/// combination; quantized formats only appear with their matching flag
pub fn settings_matrix() -> Vec<CompressionSettings> {
    let rotation_formats = [
        RotationFormat::Quat128,
        RotationFormat::Quat96,
        RotationFormat::Quat48,
        RotationFormat::Quat32,
    ];
    let translation_formats = [
        VectorFormat::Vector96,
        VectorFormat::Vector48,
        VectorFormat::Vector32,
    ];
    let range_reductions = [
        RANGE_REDUCTION_NONE,
        RANGE_REDUCTION_ROTATIONS,
        RANGE_REDUCTION_TRANSLATIONS,
        RANGE_REDUCTION_ROTATIONS | RANGE_REDUCTION_TRANSLATIONS,
    ];

    let mut matrix = Vec::new();
    for rotation_format in rotation_formats {
        for translation_format in translation_formats {
            for range_reduction in range_reductions {
                let settings =
                    CompressionSettings::new(rotation_format, translation_format, range_reduction);
                if settings.validate().is_ok() {
                    matrix.push(settings);
                }
            }
        }
    }
    matrix
}

/// Compress the clip under every configuration, measure, and write one stats
/// record per run
pub fn run_compression_matrix(
    clip: &AnimationClip,
    skeleton: &Skeleton,
    out: &mut dyn Write,
) -> Result<()> {
    for settings in settings_matrix() {
        try_settings(clip, skeleton, &settings, out)
            .with_context(|| format!("configuration {:?}", settings))?;
    }
    Ok(())
}

fn try_settings(
    clip: &AnimationClip,
    skeleton: &Skeleton,
    settings: &CompressionSettings,
    out: &mut dyn Write,
) -> Result<()> {
    let algorithm = Algorithm::UniformlySampled;

    let compression_start = Instant::now();
    let compressed = algorithm.compress(clip, skeleton, settings)?;
    let compression_time = compression_start.elapsed();

    let context = DecompressionContext::bind(compressed.as_bytes())?;
    let max_error = calculate_clip_max_error(clip, skeleton, &context);
    verify_single_bone_seek(skeleton, &context)?;

    let raw_size = clip.raw_size();
    let compressed_size = compressed.size();
    let compression_ratio = raw_size as f64 / compressed_size as f64;

    writeln!(out, "Clip algorithm: {}", algorithm.name())?;
    writeln!(out, "Clip raw size (bytes): {}", raw_size)?;
    writeln!(out, "Clip compressed size (bytes): {}", compressed_size)?;
    writeln!(out, "Clip compression ratio: {:.2} : 1", compression_ratio)?;
    writeln!(out, "Clip max error: {:.5}", max_error)?;
    writeln!(
        out,
        "Clip compression time (s): {:.6}",
        compression_time.as_secs_f64()
    )?;
    writeln!(out, "Clip duration (s): {:.3}", clip.duration())?;
    algorithm.print_stats(&context, out)?;
    writeln!(out)?;

    Ok(())
}

/// Decode the last bone alone at the clip endpoint and require the exact
/// bytes a whole-pose decode produces; proves the decoder can seek
fn verify_single_bone_seek(skeleton: &Skeleton, context: &DecompressionContext<'_>) -> Result<()> {
    let num_bones = skeleton.num_bones();
    let sample_time = context.duration() as f32;

    let mut pose = vec![Transform32::IDENTITY; num_bones as usize];
    context.decompress_pose(skeleton, sample_time, &mut pose);
    let single = context.decompress_bone(skeleton, sample_time, num_bones - 1);

    ensure!(
        single == pose[num_bones as usize - 1],
        "single bone decode diverged from pose decode at bone {}",
        num_bones - 1
    );
    Ok(())
}
