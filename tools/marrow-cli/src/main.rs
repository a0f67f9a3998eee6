//! marrow-cli - clip compression driver
//!
//! Reads a clip document (skeleton + sampled tracks), compresses it under
//! every codec configuration, measures the worst-case skeleton-space error
//! of each, and reports stats.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

mod reader;
mod stats;

#[derive(Parser)]
#[command(name = "marrow-cli")]
#[command(about = "Marrow clip compression driver")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compress a clip under every codec configuration and report stats
    Compress {
        /// Input clip document (JSON)
        input: PathBuf,

        /// Write stats to a file, or to stdout when no path is given
        #[arg(long, num_args = 0..=1, default_missing_value = "-")]
        stats: Option<PathBuf>,
    },

    /// Print a summary of a clip document without compressing it
    Info {
        /// Input clip document (JSON)
        input: PathBuf,
    },
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Compress { input, stats } => {
            let (clip, skeleton) = load_clip(&input)?;
            tracing::info!(
                "Compressing '{}': {} bones, {} samples at {} Hz",
                clip.name(),
                skeleton.num_bones(),
                clip.num_samples(),
                clip.sample_rate()
            );

            match stats {
                None => {
                    let mut sink = io::sink();
                    stats::run_compression_matrix(&clip, &skeleton, &mut sink)?;
                }
                Some(path) if path.as_os_str() == "-" => {
                    let stdout = io::stdout();
                    let mut out = stdout.lock();
                    stats::run_compression_matrix(&clip, &skeleton, &mut out)?;
                }
                Some(path) => {
                    let file = File::create(&path)
                        .with_context(|| format!("Failed to create stats file: {:?}", path))?;
                    let mut out = BufWriter::new(file);
                    stats::run_compression_matrix(&clip, &skeleton, &mut out)?;
                    out.flush()?;
                    tracing::info!("Stats written to {:?}", path);
                }
            }
            tracing::info!("Done!");
        }

        Commands::Info { input } => {
            let (clip, skeleton) = load_clip(&input)?;
            tracing::info!(
                "Clip '{}': {} bones, {} samples at {} Hz ({:.3}s, {} raw bytes)",
                clip.name(),
                skeleton.num_bones(),
                clip.num_samples(),
                clip.sample_rate(),
                clip.duration(),
                clip.raw_size()
            );
            for bone in skeleton.bones() {
                let parent = match bone.parent {
                    None => "(root)".to_string(),
                    Some(parent) => skeleton.bone(parent).name.clone(),
                };
                tracing::info!("  {} <- {}", bone.name, parent);
            }
        }
    }

    Ok(())
}

fn load_clip(path: &Path) -> Result<(marrow::AnimationClip, marrow::Skeleton)> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read clip: {:?}", path))?;
    reader::read_clip(&text).with_context(|| format!("Failed to parse clip: {:?}", path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    const TINY_CLIP: &str = r#"{
        "clip": { "name": "tiny", "sample_rate": 30, "num_samples": 3 },
        "bones": [
            {
                "name": "root",
                "parent": null,
                "vertex_distance": 1.0,
                "bind_rotation": [0.0, 0.0, 0.0, 1.0],
                "bind_translation": [0.0, 0.0, 0.0]
            }
        ],
        "tracks": [
            {
                "bone": "root",
                "rotations": [
                    [0.0, 0.0, 0.0, 1.0],
                    [0.0, 0.09983341664682815, 0.0, 0.9950041652780258],
                    [0.0, 0.19866933079506122, 0.0, 0.9800665778412416]
                ],
                "translations": [[0.0, 0.0, 0.0], [0.5, 0.0, 0.0], [1.0, 0.0, 0.0]]
            }
        ]
    }"#;

    #[test]
    fn test_load_clip_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tiny.json");
        let mut file = File::create(&path).unwrap();
        file.write_all(TINY_CLIP.as_bytes()).unwrap();

        let (clip, skeleton) = load_clip(&path).unwrap();
        assert_eq!(clip.num_samples(), 3);
        assert_eq!(skeleton.num_bones(), 1);

        let mut out = Vec::new();
        stats::run_compression_matrix(&clip, &skeleton, &mut out).unwrap();
        assert!(!out.is_empty());
    }

    #[test]
    fn test_load_clip_missing_file_fails() {
        assert!(load_clip(Path::new("/nonexistent/clip.json")).is_err());
    }
}
