//! Mutable per-bone track streams, the compressor's working representation
//!
//! A clip is converted into one [`BoneStream`] per bone, then transformed in
//! place by four stages in strict order:
//!
//! 1. [`convert`] — copy raw samples to f32 and normalize rotation sign
//! 2. [`compact`] — detect default and constant tracks
//! 3. [`range`] — per-clip range reduction to [0, 1]
//! 4. [`quantize`] — produce the packed per-sample payloads
//!
//! Streams only live for the duration of one compression call; the container
//! writer copies what it needs and the streams are dropped.

use glam::{Vec3, Vec4};

pub mod compact;
pub mod convert;
pub mod quantize;
pub mod range;

/// Per-component minimum and extent of a track, captured before quantization
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackRange {
    pub min: Vec3,
    pub extent: Vec3,
}

/// Working state for one bone's rotation and translation tracks
#[derive(Debug, Clone)]
pub struct BoneStream {
    /// Rotation samples; W is kept non-negative after conversion and ignored
    /// by the implicit-W formats
    pub rotations: Vec<Vec4>,
    pub translations: Vec<Vec3>,

    /// Track equals the bind pose within tolerance
    pub is_rotation_default: bool,
    /// All samples equal within tolerance (defaults are also constant)
    pub is_rotation_constant: bool,
    pub is_translation_default: bool,
    pub is_translation_constant: bool,

    /// Present on animated tracks once range reduction ran
    pub rotation_range: Option<TrackRange>,
    pub translation_range: Option<TrackRange>,

    /// Packed per-sample payloads produced by the quantize stage
    pub packed_rotations: Vec<u8>,
    pub packed_translations: Vec<u8>,
}

impl BoneStream {
    /// True when per-frame rotation data survives into the animated section
    pub fn is_rotation_animated(&self) -> bool {
        !self.is_rotation_constant
    }

    /// True when per-frame translation data survives into the animated section
    pub fn is_translation_animated(&self) -> bool {
        !self.is_translation_constant
    }
}
