//! Marrow: skeletal animation clip compression codec
//!
//! Compresses uniformly sampled skeletal animation clips (per-bone rotation
//! and translation tracks) into a compact self-describing buffer that a
//! runtime can sample at arbitrary times, within a measurable error budget.
//!
//! **This is a pure codec** - reading clip documents, file I/O and the
//! settings-matrix driver live in the `marrow-cli` tool; this crate only
//! transforms in-memory clips to bytes and back.
//!
//! # Pipeline
//!
//! ```text
//! AnimationClip -> BoneStream per bone
//!               -> rotation form conversion (implicit W, sign-normalized)
//!               -> constant / default track compaction
//!               -> per-clip range reduction to [0, 1]   (optional per type)
//!               -> fixed point quantization
//!               -> container writer -> CompressedClip bytes
//! bytes -> DecompressionContext::bind (validates once)
//!       -> decompress_pose / decompress_bone at any time t
//! ```
//!
//! Raw clips and the error metric use f64; streams and the decoder use f32.
//!
//! # Usage
//!
//! ```
//! use glam::{DQuat, DVec3};
//! use marrow::{
//!     AnimatedBone, AnimationClip, Bone, CompressionSettings, DecompressionContext, Skeleton,
//!     Transform32, compress_clip,
//! };
//!
//! let skeleton = Skeleton::new(vec![Bone {
//!     name: "root".into(),
//!     parent: None,
//!     bind_rotation: DQuat::IDENTITY,
//!     bind_translation: DVec3::ZERO,
//!     vertex_distance: 1.0,
//! }])
//! .unwrap();
//!
//! let clip = AnimationClip::new(
//!     "wave",
//!     30,
//!     vec![AnimatedBone {
//!         rotations: (0..30).map(|i| DQuat::from_axis_angle(DVec3::Y, i as f64 * 0.02)).collect(),
//!         translations: vec![DVec3::ZERO; 30],
//!     }],
//! )
//! .unwrap();
//!
//! let compressed = compress_clip(&clip, &skeleton, &CompressionSettings::default()).unwrap();
//! let context = DecompressionContext::bind(compressed.as_bytes()).unwrap();
//!
//! let mut pose = vec![Transform32::IDENTITY; 1];
//! context.decompress_pose(&skeleton, 0.5, &mut pose);
//! ```

pub mod algorithm;
pub mod bitset;
pub mod clip;
pub mod compress;
pub mod container;
pub mod decompress;
pub mod error;
pub mod error_metric;
pub mod formats;
pub mod math;
pub mod packing;
pub mod stream;

pub use algorithm::Algorithm;
pub use clip::{AnimatedBone, AnimationClip, Bone, Skeleton};
pub use compress::compress_clip;
pub use container::{
    ClipHeader, ClipPreamble, CompressedClip, ALGORITHM_UNIFORMLY_SAMPLED, CONTAINER_VERSION,
    INVALID_OFFSET,
};
pub use decompress::DecompressionContext;
pub use error::ClipError;
pub use error_metric::{calculate_clip_max_error, calculate_skeleton_error, local_to_object_space};
pub use formats::{
    range_reduction_name, CompressionSettings, RotationFormat, VectorFormat, RANGE_REDUCTION_NONE,
    RANGE_REDUCTION_ROTATIONS, RANGE_REDUCTION_TRANSLATIONS,
};
pub use math::{Transform32, Transform64};
