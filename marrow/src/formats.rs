//! Track sample formats and compression settings

use crate::error::ClipError;

/// No per-clip range reduction
pub const RANGE_REDUCTION_NONE: u8 = 0;
/// Range-reduce animated rotation tracks
pub const RANGE_REDUCTION_ROTATIONS: u8 = 1 << 0;
/// Range-reduce animated translation tracks
pub const RANGE_REDUCTION_TRANSLATIONS: u8 = 1 << 1;

/// Human readable name of a range reduction mask, for stats output
pub fn range_reduction_name(flags: u8) -> &'static str {
    match flags & (RANGE_REDUCTION_ROTATIONS | RANGE_REDUCTION_TRANSLATIONS) {
        RANGE_REDUCTION_NONE => "None",
        RANGE_REDUCTION_ROTATIONS => "Rotations",
        RANGE_REDUCTION_TRANSLATIONS => "Translations",
        _ => "Rotations | Translations",
    }
}

/// Storage format for animated rotation samples
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RotationFormat {
    /// Full quaternion, 4 x f32
    Quat128 = 0,
    /// Implicit W, 3 x f32
    Quat96 = 1,
    /// Implicit W, 3 x u16, requires rotation range reduction
    Quat48 = 2,
    /// Implicit W, 11/11/10 bits in one u32, requires rotation range reduction
    Quat32 = 3,
}

impl RotationFormat {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Quat128),
            1 => Some(Self::Quat96),
            2 => Some(Self::Quat48),
            3 => Some(Self::Quat32),
            _ => None,
        }
    }

    /// Size in bytes of one animated sample
    pub const fn packed_size(self) -> u32 {
        match self {
            Self::Quat128 => 16,
            Self::Quat96 => 12,
            Self::Quat48 => 6,
            Self::Quat32 => 4,
        }
    }

    /// True when W is dropped and reconstructed by the decoder
    pub const fn drops_w(self) -> bool {
        !matches!(self, Self::Quat128)
    }

    /// True when samples are stored as fixed point and range reduction is
    /// mandatory
    pub const fn is_quantized(self) -> bool {
        matches!(self, Self::Quat48 | Self::Quat32)
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Quat128 => "Quat 128",
            Self::Quat96 => "Quat 96",
            Self::Quat48 => "Quat 48",
            Self::Quat32 => "Quat 32",
        }
    }
}

/// Storage format for animated translation samples
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum VectorFormat {
    /// 3 x f32
    Vector96 = 0,
    /// 3 x u16, requires translation range reduction
    Vector48 = 1,
    /// 11/11/10 bits in one u32, requires translation range reduction
    Vector32 = 2,
}

impl VectorFormat {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Vector96),
            1 => Some(Self::Vector48),
            2 => Some(Self::Vector32),
            _ => None,
        }
    }

    /// Size in bytes of one animated sample
    pub const fn packed_size(self) -> u32 {
        match self {
            Self::Vector96 => 12,
            Self::Vector48 => 6,
            Self::Vector32 => 4,
        }
    }

    /// True when samples are stored as fixed point and range reduction is
    /// mandatory
    pub const fn is_quantized(self) -> bool {
        matches!(self, Self::Vector48 | Self::Vector32)
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Vector96 => "Vector3 96",
            Self::Vector48 => "Vector3 48",
            Self::Vector32 => "Vector3 32",
        }
    }
}

/// Settings for one compression run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompressionSettings {
    pub rotation_format: RotationFormat,
    pub translation_format: VectorFormat,
    /// Combination of `RANGE_REDUCTION_*` bits
    pub range_reduction: u8,
    /// Tolerance for constant and default track detection
    pub constant_threshold: f32,
}

impl Default for CompressionSettings {
    fn default() -> Self {
        Self {
            rotation_format: RotationFormat::Quat128,
            translation_format: VectorFormat::Vector96,
            range_reduction: RANGE_REDUCTION_NONE,
            constant_threshold: 1.0e-5,
        }
    }
}

impl CompressionSettings {
    pub fn new(
        rotation_format: RotationFormat,
        translation_format: VectorFormat,
        range_reduction: u8,
    ) -> Self {
        Self {
            rotation_format,
            translation_format,
            range_reduction,
            ..Self::default()
        }
    }

    /// True when animated rotation tracks are range reduced
    ///
    /// Quat 128 keeps full floats and bypasses range reduction even when the
    /// rotation flag is set.
    pub fn reduces_rotations(&self) -> bool {
        self.range_reduction & RANGE_REDUCTION_ROTATIONS != 0
            && self.rotation_format != RotationFormat::Quat128
    }

    /// True when animated translation tracks are range reduced
    pub fn reduces_translations(&self) -> bool {
        self.range_reduction & RANGE_REDUCTION_TRANSLATIONS != 0
    }

    /// Reject fixed point formats whose [0, 1] payload has no recorded range
    /// to map back through
    pub fn validate(&self) -> Result<(), ClipError> {
        if self.rotation_format.is_quantized()
            && self.range_reduction & RANGE_REDUCTION_ROTATIONS == 0
        {
            return Err(ClipError::InvalidConfiguration(format!(
                "{} requires rotation range reduction",
                self.rotation_format.name()
            )));
        }
        if self.translation_format.is_quantized()
            && self.range_reduction & RANGE_REDUCTION_TRANSLATIONS == 0
        {
            return Err(ClipError::InvalidConfiguration(format!(
                "{} requires translation range reduction",
                self.translation_format.name()
            )));
        }
        if !(0.0..1.0).contains(&self.constant_threshold) {
            return Err(ClipError::InvalidConfiguration(format!(
                "constant threshold {} out of range",
                self.constant_threshold
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_tags_roundtrip() {
        for format in [
            RotationFormat::Quat128,
            RotationFormat::Quat96,
            RotationFormat::Quat48,
            RotationFormat::Quat32,
        ] {
            assert_eq!(RotationFormat::from_u8(format as u8), Some(format));
        }
        for format in [
            VectorFormat::Vector96,
            VectorFormat::Vector48,
            VectorFormat::Vector32,
        ] {
            assert_eq!(VectorFormat::from_u8(format as u8), Some(format));
        }
        assert_eq!(RotationFormat::from_u8(4), None);
        assert_eq!(VectorFormat::from_u8(3), None);
    }

    #[test]
    fn test_packed_sizes() {
        assert_eq!(RotationFormat::Quat128.packed_size(), 16);
        assert_eq!(RotationFormat::Quat96.packed_size(), 12);
        assert_eq!(RotationFormat::Quat48.packed_size(), 6);
        assert_eq!(RotationFormat::Quat32.packed_size(), 4);
        assert_eq!(VectorFormat::Vector96.packed_size(), 12);
        assert_eq!(VectorFormat::Vector48.packed_size(), 6);
        assert_eq!(VectorFormat::Vector32.packed_size(), 4);
    }

    #[test]
    fn test_quantized_formats_require_range_reduction() {
        let settings = CompressionSettings::new(
            RotationFormat::Quat48,
            VectorFormat::Vector96,
            RANGE_REDUCTION_NONE,
        );
        assert!(matches!(
            settings.validate(),
            Err(ClipError::InvalidConfiguration(_))
        ));

        let settings = CompressionSettings::new(
            RotationFormat::Quat96,
            VectorFormat::Vector32,
            RANGE_REDUCTION_ROTATIONS,
        );
        assert!(matches!(
            settings.validate(),
            Err(ClipError::InvalidConfiguration(_))
        ));

        let settings = CompressionSettings::new(
            RotationFormat::Quat48,
            VectorFormat::Vector48,
            RANGE_REDUCTION_ROTATIONS | RANGE_REDUCTION_TRANSLATIONS,
        );
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_quat128_bypasses_rotation_range_reduction() {
        let settings = CompressionSettings::new(
            RotationFormat::Quat128,
            VectorFormat::Vector96,
            RANGE_REDUCTION_ROTATIONS,
        );
        assert!(settings.validate().is_ok());
        assert!(!settings.reduces_rotations());
    }

    #[test]
    fn test_range_reduction_names() {
        assert_eq!(range_reduction_name(RANGE_REDUCTION_NONE), "None");
        assert_eq!(range_reduction_name(RANGE_REDUCTION_ROTATIONS), "Rotations");
        assert_eq!(
            range_reduction_name(RANGE_REDUCTION_ROTATIONS | RANGE_REDUCTION_TRANSLATIONS),
            "Rotations | Translations"
        );
    }
}
