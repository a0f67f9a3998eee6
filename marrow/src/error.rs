//! Error types for clip compression and decompression

use thiserror::Error;

/// Errors that can occur when compressing a clip or binding a compressed buffer
#[derive(Debug, Error)]
pub enum ClipError {
    /// The raw clip or skeleton is malformed (empty, mismatched sample counts,
    /// non-finite samples, non-normalized rotations, bad hierarchy)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The compression settings are inconsistent, e.g. a quantized format
    /// selected without the matching range reduction flag
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The compressed buffer failed validation (truncated, hash mismatch,
    /// out-of-bounds section offset, unknown version or algorithm)
    #[error("Corrupt compressed clip: {0}")]
    CorruptClip(String),
}
