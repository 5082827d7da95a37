//! Rotation quaternions and their conversions.
//!
//! Euler angles are stored in a [`Point`] as `(roll, pitch, yaw)` and describe the
//! rotation `Rz(yaw) * Ry(pitch) * Rx(roll)`. Rotation matrices act on column vectors.

use std::collections::BTreeMap;
use std::f64::consts::{FRAC_PI_2, PI};
use std::fmt;
use std::ops::{Mul, Neg};

use rand::Rng;

use crate::error::{GeometryError, Result};
use crate::point::{Matrix3, Point, ZERO_TOLERANCE};

/// Distance of `|sin(pitch)|` from one below which the Euler decomposition is treated
/// as gimbal locked.
pub const GIMBAL_LOCK_TOLERANCE: f64 = 1e-12;

/// A quaternion `w + xi + yj + zk`.
///
/// Only unit quaternions represent rotations. Non-unit values (for example finite
/// difference rates) are valid intermediate results; the operations that apply a
/// quaternion as a rotation normalise first and fail on a zero quaternion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quaternion {
    /// Scalar part.
    pub w: f64,
    /// First component of the vector part.
    pub x: f64,
    /// Second component of the vector part.
    pub y: f64,
    /// Third component of the vector part.
    pub z: f64,
}

impl Quaternion {
    /// The identity rotation.
    pub const IDENTITY: Self = Self::new(1.0, 0.0, 0.0, 0.0);

    /// Create a quaternion from its four components.
    #[inline]
    pub const fn new(w: f64, x: f64, y: f64, z: f64) -> Self {
        Self { w, x, y, z }
    }

    /// Create a quaternion from a scalar part and a vector part.
    #[inline]
    pub fn from_parts(w: f64, axis: Point) -> Self {
        Self::new(w, axis.x, axis.y, axis.z)
    }

    /// The vector part.
    #[inline]
    pub fn axis(&self) -> Point {
        Point::new(self.x, self.y, self.z)
    }

    /// Create a uniformly distributed random rotation.
    pub fn from_random() -> Self {
        let mut rng = rand::rng();

        let r1: f64 = rng.random();
        let r2: f64 = rng.random();
        let r3: f64 = rng.random();

        // Shoemake's method
        let one_minus_r1_sqrt = (1.0 - r1).sqrt();
        let r1_sqrt = r1.sqrt();

        Self::new(
            one_minus_r1_sqrt * (2.0 * PI * r2).cos(),
            one_minus_r1_sqrt * (2.0 * PI * r2).sin(),
            r1_sqrt * (2.0 * PI * r3).cos(),
            r1_sqrt * (2.0 * PI * r3).sin(),
        )
    }

    /// `[w, x, y, z]`.
    pub fn to_array(&self) -> [f64; 4] {
        [self.w, self.x, self.y, self.z]
    }

    /// `[w, x, y, z]` as a list.
    pub fn to_list(&self) -> Vec<f64> {
        self.to_array().to_vec()
    }

    /// `(w, x, y, z)`.
    pub fn to_tuple(&self) -> (f64, f64, f64, f64) {
        (self.w, self.x, self.y, self.z)
    }

    /// Export keyed by `{prefix}w`, `{prefix}x`, `{prefix}y`, `{prefix}z`.
    pub fn to_dict(&self, prefix: &str) -> BTreeMap<String, f64> {
        let mut dict = self.axis().to_dict(prefix);
        dict.insert(format!("{prefix}w"), self.w);
        dict
    }

    /// Read a quaternion back from a map produced by [`Quaternion::to_dict`].
    pub fn from_dict(values: &BTreeMap<String, f64>, prefix: &str) -> Result<Self> {
        let key = format!("{prefix}w");
        let w = values
            .get(&key)
            .copied()
            .ok_or(GeometryError::MissingKey(key))?;
        Ok(Self::from_parts(w, Point::from_dict(values, prefix)?))
    }

    /// Euclidean norm `|q|`.
    #[inline]
    pub fn magnitude(&self) -> f64 {
        (self.w * self.w + self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Divide every component by `|q|`.
    pub fn norm(&self) -> Result<Self> {
        let ab = self.magnitude();
        if ab < ZERO_TOLERANCE {
            return Err(GeometryError::degenerate(format!(
                "cannot normalise quaternion {self} with magnitude {ab}"
            )));
        }
        Ok(*self * (1.0 / ab))
    }

    /// Negate the vector part.
    #[inline]
    pub fn conjugate(&self) -> Self {
        Self::new(self.w, -self.x, -self.y, -self.z)
    }

    /// The normalised conjugate.
    pub fn inverse(&self) -> Result<Self> {
        self.conjugate().norm()
    }

    /// The representative of the same rotation with a non-negative scalar part.
    pub fn closest_to_identity(&self) -> Self {
        if self.w < 0.0 {
            -*self
        } else {
            *self
        }
    }

    /// Rotate `point` with the sandwich product `q (0, p) q⁻¹`.
    pub fn transform_point(&self, point: Point) -> Result<Point> {
        let q = self.norm()?;
        Ok((q * Self::from_parts(0.0, point) * q.conjugate()).axis())
    }

    /// Rotate the vector part by a matrix, leaving the scalar part unchanged.
    pub fn rotate_axes(&self, m: &Matrix3) -> Self {
        Self::from_parts(self.w, self.axis().rotate(m))
    }

    /// Build a rotation from `(roll, pitch, yaw)`.
    pub fn from_euler(euler: Point) -> Self {
        let half = euler * 0.5;
        let c = half.cosines();
        let s = half.sines();
        Self::new(
            c.y * c.z * c.x + s.y * s.z * s.x,
            c.y * c.z * s.x - s.y * s.z * c.x,
            s.y * c.z * c.x + c.y * s.z * s.x,
            c.y * s.z * c.x - s.y * c.z * s.x,
        )
    }

    /// Decompose a unit quaternion into `(roll, pitch, yaw)`.
    ///
    /// At gimbal lock (pitch at ±90°) roll and yaw are not separable: roll is reported as
    /// zero and yaw carries the combined angle, wrapped to `(-π, π]`.
    pub fn to_euler(&self) -> Point {
        let (w, x, y, z) = self.to_tuple();
        let sinp = 2.0 * (w * y - z * x);

        if sinp.abs() >= 1.0 - GIMBAL_LOCK_TOLERANCE {
            let pitch = FRAC_PI_2.copysign(sinp);
            return Point::new(0.0, pitch, wrap_angle(2.0 * z.atan2(w)));
        }

        let roll = (2.0 * (w * x + y * z)).atan2(1.0 - 2.0 * (x * x + y * y));
        let yaw = (2.0 * (w * z + x * y)).atan2(1.0 - 2.0 * (y * y + z * z));
        Point::new(roll, sinp.asin(), yaw)
    }

    /// The rotation matrix of the normalised quaternion.
    pub fn to_rotation_matrix(&self) -> Result<Matrix3> {
        let n = self.norm()?;
        let (s, x, y, z) = n.to_tuple();
        let (x2, y2, z2) = (x * x, y * y, z * z);
        Ok([
            [1.0 - 2.0 * (y2 + z2), 2.0 * x * y - 2.0 * s * z, 2.0 * s * y + 2.0 * x * z],
            [2.0 * x * y + 2.0 * s * z, 1.0 - 2.0 * (x2 + z2), -2.0 * s * x + 2.0 * y * z],
            [-2.0 * s * y + 2.0 * x * z, 2.0 * s * x + 2.0 * y * z, 1.0 - 2.0 * (x2 + y2)],
        ])
    }

    /// Recover a unit quaternion from a rotation matrix (Shepperd's method).
    ///
    /// The component with the largest magnitude is extracted first: `w` when the trace is
    /// positive, otherwise the axis of the largest diagonal element.
    pub fn from_rotation_matrix(m: &Matrix3) -> Result<Self> {
        let trace = m[0][0] + m[1][1] + m[2][2];

        let (q, s) = if trace > 0.0 {
            let s = (trace + 1.0).sqrt() * 2.0;
            (
                Self::new(
                    0.25 * s,
                    (m[2][1] - m[1][2]) / s,
                    (m[0][2] - m[2][0]) / s,
                    (m[1][0] - m[0][1]) / s,
                ),
                s,
            )
        } else if m[0][0] > m[1][1] && m[0][0] > m[2][2] {
            let s = (1.0 + m[0][0] - m[1][1] - m[2][2]).max(0.0).sqrt() * 2.0;
            (
                Self::new(
                    (m[2][1] - m[1][2]) / s,
                    0.25 * s,
                    (m[0][1] + m[1][0]) / s,
                    (m[0][2] + m[2][0]) / s,
                ),
                s,
            )
        } else if m[1][1] > m[2][2] {
            let s = (1.0 + m[1][1] - m[0][0] - m[2][2]).max(0.0).sqrt() * 2.0;
            (
                Self::new(
                    (m[0][2] - m[2][0]) / s,
                    (m[0][1] + m[1][0]) / s,
                    0.25 * s,
                    (m[1][2] + m[2][1]) / s,
                ),
                s,
            )
        } else {
            let s = (1.0 + m[2][2] - m[0][0] - m[1][1]).max(0.0).sqrt() * 2.0;
            (
                Self::new(
                    (m[1][0] - m[0][1]) / s,
                    (m[0][2] + m[2][0]) / s,
                    (m[1][2] + m[2][1]) / s,
                    0.25 * s,
                ),
                s,
            )
        };

        if s < ZERO_TOLERANCE {
            return Err(GeometryError::degenerate("matrix is not a rotation"));
        }
        q.norm()
    }

    /// Rotation by `|v|` about `v`, see [`Quaternion::from_axis_angle_scaled`].
    pub fn from_axis_angle(v: Point) -> Self {
        Self::from_axis_angle_scaled(v, 0.5)
    }

    /// Quaternion with half-angle `|v| * half_angle_factor` about the axis `v / |v|`.
    ///
    /// The rotation angle is `2 * |v| * half_angle_factor`: a factor of `0.5` rotates by
    /// `|v|` and a factor of `1.0` rotates by `2|v|`.
    ///
    /// Returns the identity for `|v|` below [`ZERO_TOLERANCE`].
    pub fn from_axis_angle_scaled(v: Point, half_angle_factor: f64) -> Self {
        let angle = v.magnitude();
        if angle < ZERO_TOLERANCE {
            return Self::IDENTITY;
        }
        let half = angle * half_angle_factor;
        Self::from_parts(half.cos(), v * (half.sin() / angle))
    }

    /// Axis-angle vector of a unit quaternion: the axis scaled by the rotation angle.
    ///
    /// Returns zero when the rotation angle is too small to define an axis.
    pub fn to_axis_angle(&self) -> Point {
        let w = self.w.clamp(-1.0, 1.0);
        let angle = 2.0 * w.acos();
        let s = (1.0 - w * w).sqrt();
        if s < ZERO_TOLERANCE {
            return Point::ZERO;
        }
        self.axis() * (angle / s)
    }

    /// World frame angular displacement taking `q` to `qdot`.
    pub fn axis_rates(q: &Quaternion, qdot: &Quaternion) -> Result<Point> {
        Ok((*qdot * q.conjugate())
            .norm()?
            .closest_to_identity()
            .to_axis_angle())
    }

    /// Body frame angular displacement taking `q` to `qdot`.
    pub fn body_axis_rates(q: &Quaternion, qdot: &Quaternion) -> Result<Point> {
        Ok((q.conjugate() * *qdot)
            .norm()?
            .closest_to_identity()
            .to_axis_angle())
    }

    /// Apply an angular displacement expressed in the world frame.
    pub fn rotate(&self, rate: Point) -> Result<Self> {
        (Self::from_axis_angle(rate) * *self).norm()
    }

    /// Apply an angular displacement expressed in the body frame.
    pub fn body_rotate(&self, rate: Point) -> Result<Self> {
        (*self * Self::from_axis_angle(rate)).norm()
    }
}

/// Wrap an angle into `(-π, π]`.
pub(crate) fn wrap_angle(angle: f64) -> f64 {
    let wrapped = (angle + PI).rem_euclid(2.0 * PI) - PI;
    if wrapped <= -PI {
        wrapped + 2.0 * PI
    } else {
        wrapped
    }
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl fmt::Display for Quaternion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Quaternion(w: {:.4}, x: {:.4}, y: {:.4}, z: {:.4})",
            self.w, self.x, self.y, self.z
        )
    }
}

impl From<[f64; 4]> for Quaternion {
    fn from(arr: [f64; 4]) -> Self {
        Self::new(arr[0], arr[1], arr[2], arr[3])
    }
}

impl From<Quaternion> for [f64; 4] {
    fn from(q: Quaternion) -> Self {
        q.to_array()
    }
}

/// Hamilton product.
impl Mul for Quaternion {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self::Output {
        let (a, b) = (self.axis(), rhs.axis());
        Self::from_parts(
            self.w * rhs.w - a.dot(b),
            b * self.w + a * rhs.w + a.cross(b),
        )
    }
}

impl Mul<f64> for Quaternion {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self::Output {
        Self::new(self.w * rhs, self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl Neg for Quaternion {
    type Output = Self;

    fn neg(self) -> Self::Output {
        self * -1.0
    }
}

impl approx::AbsDiffEq for Quaternion {
    type Epsilon = f64;

    fn default_epsilon() -> Self::Epsilon {
        f64::default_epsilon()
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: Self::Epsilon) -> bool {
        self.to_array()
            .iter()
            .zip(other.to_array().iter())
            .all(|(a, b)| a.abs_diff_eq(b, epsilon))
    }
}

impl approx::RelativeEq for Quaternion {
    fn default_max_relative() -> Self::Epsilon {
        f64::default_max_relative()
    }

    fn relative_eq(
        &self,
        other: &Self,
        epsilon: Self::Epsilon,
        max_relative: Self::Epsilon,
    ) -> bool {
        self.to_array()
            .iter()
            .zip(other.to_array().iter())
            .all(|(a, b)| a.relative_eq(b, epsilon, max_relative))
    }
}
