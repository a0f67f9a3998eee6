//! Quaternion and transform helpers shared by the compressor and decoder
//!
//! Builds on glam. The codec stores rotations in implicit-W form, so the
//! helpers here cover sign normalization, W reconstruction, and the nlerp
//! used at sampling time. Raw clips and the error metric run in f64, the
//! decoder runs in f32, matching the two transform types below.

use glam::{DQuat, DVec3, Quat, Vec3};

/// Normalization tolerance for single precision quaternions
pub const QUAT_EPSILON_F32: f32 = 1.0e-4;

/// Normalization tolerance for double precision quaternions
pub const QUAT_EPSILON_F64: f64 = 1.0e-8;

/// Runtime bone transform (rotation + translation)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform32 {
    pub rotation: Quat,
    pub translation: Vec3,
}

impl Transform32 {
    pub const IDENTITY: Self = Self {
        rotation: Quat::IDENTITY,
        translation: Vec3::ZERO,
    };

    /// Widen to the analysis precision
    pub fn as_transform64(&self) -> Transform64 {
        Transform64 {
            rotation: self.rotation.as_dquat(),
            translation: self.translation.as_dvec3(),
        }
    }
}

/// Analysis bone transform used for raw clips and error measurement
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform64 {
    pub rotation: DQuat,
    pub translation: DVec3,
}

impl Transform64 {
    pub const IDENTITY: Self = Self {
        rotation: DQuat::IDENTITY,
        translation: DVec3::ZERO,
    };
}

/// True when every component is finite
#[inline]
pub fn quat_is_finite(q: DQuat) -> bool {
    q.x.is_finite() && q.y.is_finite() && q.z.is_finite() && q.w.is_finite()
}

/// True when |length - 1| is within the double precision tolerance
#[inline]
pub fn quat_is_normalized(q: DQuat) -> bool {
    (q.length() - 1.0).abs() < QUAT_EPSILON_F64
}

/// True when |length - 1| is within the single precision tolerance
#[inline]
pub fn quat_is_normalized_f32(q: Quat) -> bool {
    (q.length() - 1.0).abs() < QUAT_EPSILON_F32
}

/// Flip the quaternion sign so that W >= 0
///
/// q and -q represent the same rotation, so this is lossless. Required
/// before dropping W: the decoder reconstructs it as a non-negative root.
#[inline]
pub fn quat_ensure_positive_w(q: Quat) -> Quat {
    if q.w < 0.0 {
        -q
    } else {
        q
    }
}

/// Reconstruct a quaternion from (x, y, z) with implicit non-negative W
///
/// `w = sqrt(max(0, 1 - x^2 - y^2 - z^2))`, then renormalized so that
/// quantization error in the three stored components cannot leave the
/// result denormalized.
#[inline]
pub fn quat_from_positive_w(xyz: Vec3) -> Quat {
    let w_squared = 1.0 - xyz.x * xyz.x - xyz.y * xyz.y - xyz.z * xyz.z;
    let w = w_squared.max(0.0).sqrt();
    Quat::from_xyzw(xyz.x, xyz.y, xyz.z, w).normalize()
}

/// Linear quaternion interpolation with renormalization (shortest path)
#[inline]
pub fn quat_nlerp(start: Quat, end: Quat, alpha: f32) -> Quat {
    let end = if start.dot(end) < 0.0 { -end } else { end };
    let x = start.x + (end.x - start.x) * alpha;
    let y = start.y + (end.y - start.y) * alpha;
    let z = start.z + (end.z - start.z) * alpha;
    let w = start.w + (end.w - start.w) * alpha;
    Quat::from_xyzw(x, y, z, w).normalize()
}

/// Double precision nlerp used when sampling raw clips
#[inline]
pub fn dquat_nlerp(start: DQuat, end: DQuat, alpha: f64) -> DQuat {
    let end = if start.dot(end) < 0.0 { -end } else { end };
    let x = start.x + (end.x - start.x) * alpha;
    let y = start.y + (end.y - start.y) * alpha;
    let z = start.z + (end.z - start.z) * alpha;
    let w = start.w + (end.w - start.w) * alpha;
    DQuat::from_xyzw(x, y, z, w).normalize()
}

/// Locate the two frames bracketing `sample_time` and the blend factor
///
/// `sample_time` is clamped to `[0, duration]`. At exactly the duration the
/// result is `(last, last, 0.0)` so decoding the endpoint never reads past
/// the final frame.
pub fn interpolation_keys(num_samples: u32, sample_rate: u32, sample_time: f64) -> (u32, u32, f64) {
    debug_assert!(num_samples > 0);
    debug_assert!(sample_rate > 0);

    let duration = (num_samples - 1) as f64 / sample_rate as f64;
    let sample_time = sample_time.clamp(0.0, duration);

    let frame = sample_time * sample_rate as f64;
    let frame0 = (frame.floor() as u32).min(num_samples - 1);
    let frame1 = (frame0 + 1).min(num_samples - 1);
    let alpha = frame - frame0 as f64;
    (frame0, frame1, alpha)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positive_w_reconstruction() {
        let q = Quat::from_axis_angle(Vec3::Y, 1.2).normalize();
        let q = quat_ensure_positive_w(q);
        let rebuilt = quat_from_positive_w(Vec3::new(q.x, q.y, q.z));
        assert!(q.dot(rebuilt).abs() > 0.999_999);
        assert!(rebuilt.w >= 0.0);
    }

    #[test]
    fn test_positive_w_clamps_negative_root() {
        // Components slightly outside the unit ball must not produce NaN
        let q = quat_from_positive_w(Vec3::new(0.8, 0.6, 0.1));
        assert!(q.is_finite());
        assert!(quat_is_normalized_f32(q));
    }

    #[test]
    fn test_nlerp_endpoints() {
        let a = Quat::from_axis_angle(Vec3::X, 0.3);
        let b = Quat::from_axis_angle(Vec3::X, 1.1);
        assert!(quat_nlerp(a, b, 0.0).dot(a) > 0.999_999);
        assert!(quat_nlerp(a, b, 1.0).dot(b) > 0.999_999);
    }

    #[test]
    fn test_nlerp_takes_shortest_path() {
        let a = Quat::from_axis_angle(Vec3::Z, 0.2);
        let b = -Quat::from_axis_angle(Vec3::Z, 0.4);
        let mid = quat_nlerp(a, b, 0.5);
        let expected = Quat::from_axis_angle(Vec3::Z, 0.3);
        assert!(mid.dot(expected).abs() > 0.999_99);
    }

    #[test]
    fn test_interpolation_keys_grid_and_endpoint() {
        // 10 samples at 30 Hz, duration = 9/30 s
        let (f0, f1, alpha) = interpolation_keys(10, 30, 0.0);
        assert_eq!((f0, f1), (0, 1));
        assert_eq!(alpha, 0.0);

        let (f0, f1, alpha) = interpolation_keys(10, 30, 4.0 / 30.0);
        assert_eq!((f0, f1), (4, 5));
        assert!(alpha.abs() < 1.0e-9);

        let (f0, f1, alpha) = interpolation_keys(10, 30, 9.0 / 30.0);
        assert_eq!((f0, f1), (9, 9));
        assert_eq!(alpha, 0.0);

        // Past the end clamps to the last frame
        let (f0, f1, _) = interpolation_keys(10, 30, 100.0);
        assert_eq!((f0, f1), (9, 9));
    }

    #[test]
    fn test_interpolation_keys_single_sample() {
        let (f0, f1, alpha) = interpolation_keys(1, 30, 0.5);
        assert_eq!((f0, f1), (0, 0));
        assert_eq!(alpha, 0.0);
    }
}
