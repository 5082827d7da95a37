//! 3D point / free vector (double precision).

use std::collections::BTreeMap;
use std::fmt;
use std::ops::{Add, Deref, DerefMut, Div, Mul, Neg, Sub};

use crate::error::{GeometryError, Result};

/// Magnitude below which a vector is considered to have no direction.
pub const ZERO_TOLERANCE: f64 = 1e-6;

/// Default tolerance of the parallel / perpendicular predicates.
pub const PARALLEL_TOLERANCE: f64 = 1e-6;

/// Row-major 3x3 matrix, `m[row][col]`.
pub type Matrix3 = [[f64; 3]; 3];

/// The 3x3 identity matrix.
pub const IDENTITY_MATRIX: Matrix3 = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];

/// Multiply two row-major 3x3 matrices, `a * b`.
pub fn matmul3(a: &Matrix3, b: &Matrix3) -> Matrix3 {
    let mut out = [[0.0; 3]; 3];
    for (i, row) in out.iter_mut().enumerate() {
        for (j, val) in row.iter_mut().enumerate() {
            *val = a[i][0] * b[0][j] + a[i][1] * b[1][j] + a[i][2] * b[2][j];
        }
    }
    out
}

/// Transpose of a row-major 3x3 matrix.
pub fn transpose3(m: &Matrix3) -> Matrix3 {
    [
        [m[0][0], m[1][0], m[2][0]],
        [m[0][1], m[1][1], m[2][1]],
        [m[0][2], m[1][2], m[2][2]],
    ]
}

/// A point, or free vector, in 3D space.
///
/// This is a newtype wrapper around `glam::DVec3`. It is a value type: every arithmetic
/// operation returns a new instance.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[repr(transparent)]
pub struct Point(pub glam::DVec3);

impl Point {
    /// The origin.
    pub const ZERO: Self = Self(glam::DVec3::ZERO);

    /// Unit vector along x.
    pub const X: Self = Self(glam::DVec3::X);

    /// Unit vector along y.
    pub const Y: Self = Self(glam::DVec3::Y);

    /// Unit vector along z.
    pub const Z: Self = Self(glam::DVec3::Z);

    /// Create a new point from x, y and z components.
    #[inline]
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self(glam::DVec3::new(x, y, z))
    }

    /// Create a point from an array.
    #[inline]
    pub fn from_array(arr: [f64; 3]) -> Self {
        Self(glam::DVec3::from_array(arr))
    }

    /// Create a point from a slice holding exactly three values.
    pub fn from_slice(values: &[f64]) -> Result<Self> {
        match values {
            [x, y, z] => Ok(Self::new(*x, *y, *z)),
            _ => Err(GeometryError::ShapeMismatch {
                expected: 3,
                actual: values.len(),
            }),
        }
    }

    /// Read a point back from a map produced by [`Point::to_dict`].
    pub fn from_dict(values: &BTreeMap<String, f64>, prefix: &str) -> Result<Self> {
        let get = |key: &str| {
            let key = format!("{prefix}{key}");
            values
                .get(&key)
                .copied()
                .ok_or(GeometryError::MissingKey(key))
        };
        Ok(Self::new(get("x")?, get("y")?, get("z")?))
    }

    /// Convert to array.
    #[inline]
    pub fn to_array(self) -> [f64; 3] {
        self.0.to_array()
    }

    /// Convert to a vector of `[x, y, z]`.
    pub fn to_list(self) -> Vec<f64> {
        self.to_array().to_vec()
    }

    /// Convert to a `(x, y, z)` tuple.
    pub fn to_tuple(self) -> (f64, f64, f64) {
        (self.0.x, self.0.y, self.0.z)
    }

    /// Export the components keyed by `{prefix}x`, `{prefix}y` and `{prefix}z`.
    pub fn to_dict(self, prefix: &str) -> BTreeMap<String, f64> {
        BTreeMap::from([
            (format!("{prefix}x"), self.0.x),
            (format!("{prefix}y"), self.0.y),
            (format!("{prefix}z"), self.0.z),
        ])
    }

    /// Euclidean length, `sqrt(x² + y² + z²)`.
    #[inline]
    pub fn magnitude(self) -> f64 {
        self.0.length()
    }

    /// Rescale the vector to the given length.
    ///
    /// Fails with [`GeometryError::DegenerateInput`] when the vector has no direction.
    pub fn scale(self, value: f64) -> Result<Self> {
        raise_zero(&[self])?;
        Ok(self * (value / self.magnitude()))
    }

    /// The unit vector pointing the same way, `scale(1)`.
    pub fn unit(self) -> Result<Self> {
        self.scale(1.0)
    }

    /// Check whether all three components are equal to each other within `tolerance`.
    pub fn is_equal(self, tolerance: f64) -> bool {
        (self.0.x - self.0.y).abs() <= tolerance && (self.0.x - self.0.z).abs() <= tolerance
    }

    /// Componentwise cosine.
    pub fn cosines(self) -> Self {
        self.map(f64::cos)
    }

    /// Componentwise sine.
    pub fn sines(self) -> Self {
        self.map(f64::sin)
    }

    /// Componentwise arc cosine.
    pub fn acosines(self) -> Self {
        self.map(f64::acos)
    }

    /// Componentwise arc sine.
    pub fn asines(self) -> Self {
        self.map(f64::asin)
    }

    /// Apply `f` to every component.
    #[inline]
    pub fn map(self, f: impl Fn(f64) -> f64) -> Self {
        Self::new(f(self.0.x), f(self.0.y), f(self.0.z))
    }

    /// Multiply by a row-major rotation matrix, `m * p`.
    pub fn rotate(self, m: &Matrix3) -> Self {
        let (x, y, z) = self.to_tuple();
        Self::new(
            x * m[0][0] + y * m[0][1] + z * m[0][2],
            x * m[1][0] + y * m[1][1] + z * m[1][2],
            x * m[2][0] + y * m[2][1] + z * m[2][2],
        )
    }

    /// Distance between two points.
    pub fn unit_cost(self, other: &Point) -> f64 {
        (self - *other).magnitude()
    }

    /// Interpret the point as `(roll, pitch, yaw)` and build the rotation matrix
    /// `Rz(yaw) * Ry(pitch) * Rx(roll)`.
    pub fn to_rotation_matrix(self) -> Matrix3 {
        let s = self.sines();
        let c = self.cosines();
        [
            [
                c.z * c.y,
                c.z * s.y * s.x - c.x * s.z,
                c.x * c.z * s.y + s.x * s.z,
            ],
            [
                c.y * s.z,
                c.x * c.z + s.x * s.y * s.z,
                -c.z * s.x + c.x * s.y * s.z,
            ],
            [-s.y, c.y * s.x, c.x * c.y],
        ]
    }

    /// Dot product.
    #[inline]
    pub fn dot(self, other: Point) -> f64 {
        self.0.dot(other.0)
    }

    /// Cross product, `self × other`.
    #[inline]
    pub fn cross(self, other: Point) -> Point {
        Self(self.0.cross(other.0))
    }

    /// Cosine of the angle between two vectors.
    pub fn cos_angle_between(self, other: Point) -> Result<f64> {
        raise_zero(&[self, other])?;
        Ok(self.unit()?.dot(other.unit()?))
    }

    /// Angle between two vectors, in `[0, π]`.
    pub fn angle_between(self, other: Point) -> Result<f64> {
        Ok(self.cos_angle_between(other)?.clamp(-1.0, 1.0).acos())
    }

    /// Angle between the two lines spanned by the vectors, in `[0, π/2]`.
    pub fn min_angle_between(self, other: Point) -> Result<f64> {
        let angle = self.angle_between(other)? % std::f64::consts::PI;
        Ok(angle.min(std::f64::consts::PI - angle))
    }

    /// Check whether two vectors point the same way.
    pub fn is_parallel(self, other: Point, tolerance: f64) -> Result<bool> {
        raise_zero(&[self, other])?;
        if self == other {
            return Ok(true);
        }
        Ok((self.cos_angle_between(other)? - 1.0).abs() < tolerance)
    }

    /// Check whether two vectors point in opposite directions.
    pub fn is_anti_parallel(self, other: Point, tolerance: f64) -> Result<bool> {
        raise_zero(&[self, other])?;
        if self == -other {
            return Ok(true);
        }
        Ok((self.cos_angle_between(other)? + 1.0).abs() < tolerance)
    }

    /// Check whether two vectors are perpendicular.
    pub fn is_perpendicular(self, other: Point, tolerance: f64) -> Result<bool> {
        raise_zero(&[self, other])?;
        Ok(self.dot(other).abs() < tolerance)
    }

    /// Length of the projection of `self` onto `onto`, zero when either vector is degenerate.
    pub fn scalar_projection(self, onto: Point) -> f64 {
        match self.cos_angle_between(onto) {
            Ok(cos) => cos * self.magnitude(),
            Err(_) => 0.0,
        }
    }

    /// Projection of `self` onto the direction of `onto`.
    pub fn vector_projection(self, onto: Point) -> Point {
        if self.magnitude() == 0.0 {
            return Point::ZERO;
        }
        onto.scale(self.scalar_projection(onto))
            .unwrap_or(Point::ZERO)
    }

    /// A canonical unit vector perpendicular to `self`.
    ///
    /// Returns `y` for vectors along `z`, otherwise the horizontal perpendicular
    /// `(-y, x, 0)` normalised.
    pub fn arbitrary_perpendicular(self) -> Result<Point> {
        raise_zero(&[self])?;
        if self.0.x == 0.0 && self.0.y == 0.0 {
            return Ok(Point::Y);
        }
        Point::new(-self.0.y, self.0.x, 0.0).unit()
    }
}

/// Fail with [`GeometryError::DegenerateInput`] if any of the vectors is shorter than
/// [`ZERO_TOLERANCE`].
pub fn raise_zero(points: &[Point]) -> Result<()> {
    match points.iter().find(|p| p.magnitude() < ZERO_TOLERANCE) {
        Some(p) => Err(GeometryError::degenerate(format!(
            "magnitude of {p} is less than {ZERO_TOLERANCE}"
        ))),
        None => Ok(()),
    }
}

/// Arithmetic mean of a set of points.
pub fn mean_point(points: &[Point]) -> Result<Point> {
    if points.is_empty() {
        return Err(GeometryError::degenerate("mean of an empty point set"));
    }
    let sum = points.iter().fold(Point::ZERO, |acc, p| acc + *p);
    Ok(sum / points.len() as f64)
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Point(x: {:.4}, y: {:.4}, z: {:.4})",
            self.0.x, self.0.y, self.0.z
        )
    }
}

impl Deref for Point {
    type Target = glam::DVec3;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Point {
    #[inline]
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl From<glam::DVec3> for Point {
    #[inline]
    fn from(v: glam::DVec3) -> Self {
        Self(v)
    }
}

impl From<Point> for glam::DVec3 {
    #[inline]
    fn from(p: Point) -> Self {
        p.0
    }
}

impl From<[f64; 3]> for Point {
    #[inline]
    fn from(arr: [f64; 3]) -> Self {
        Self::from_array(arr)
    }
}

impl From<Point> for [f64; 3] {
    #[inline]
    fn from(p: Point) -> Self {
        p.to_array()
    }
}

// Arithmetic operations
impl Add for Point {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Add<f64> for Point {
    type Output = Self;

    #[inline]
    fn add(self, rhs: f64) -> Self::Output {
        Self(self.0 + rhs)
    }
}

impl Sub for Point {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl Sub<f64> for Point {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: f64) -> Self::Output {
        Self(self.0 - rhs)
    }
}

impl Mul for Point {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: Self) -> Self::Output {
        Self(self.0 * rhs.0)
    }
}

impl Mul<f64> for Point {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: f64) -> Self::Output {
        Self(self.0 * rhs)
    }
}

impl Mul<Point> for f64 {
    type Output = Point;

    #[inline]
    fn mul(self, rhs: Point) -> Self::Output {
        Point(rhs.0 * self)
    }
}

impl Div for Point {
    type Output = Self;

    #[inline]
    fn div(self, rhs: Self) -> Self::Output {
        Self(self.0 / rhs.0)
    }
}

impl Div<f64> for Point {
    type Output = Self;

    #[inline]
    fn div(self, rhs: f64) -> Self::Output {
        Self(self.0 / rhs)
    }
}

impl Neg for Point {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self::Output {
        Self(-self.0)
    }
}

impl approx::AbsDiffEq for Point {
    type Epsilon = f64;

    #[inline]
    fn default_epsilon() -> Self::Epsilon {
        f64::default_epsilon()
    }

    #[inline]
    fn abs_diff_eq(&self, other: &Self, epsilon: Self::Epsilon) -> bool {
        self.0.x.abs_diff_eq(&other.0.x, epsilon)
            && self.0.y.abs_diff_eq(&other.0.y, epsilon)
            && self.0.z.abs_diff_eq(&other.0.z, epsilon)
    }
}

impl approx::RelativeEq for Point {
    #[inline]
    fn default_max_relative() -> Self::Epsilon {
        f64::default_max_relative()
    }

    #[inline]
    fn relative_eq(
        &self,
        other: &Self,
        epsilon: Self::Epsilon,
        max_relative: Self::Epsilon,
    ) -> bool {
        self.0.x.relative_eq(&other.0.x, epsilon, max_relative)
            && self.0.y.relative_eq(&other.0.y, epsilon, max_relative)
            && self.0.z.relative_eq(&other.0.z, epsilon, max_relative)
    }
}
