//! Batched quaternions.

use std::f64::consts::FRAC_PI_2;
use std::ops::{Index, Mul};

use crate::error::{GeometryError, Result};
use crate::point::{Matrix3, Point};
use crate::points::Points;
use crate::quaternion::{wrap_angle, Quaternion, GIMBAL_LOCK_TOLERANCE};
use crate::table::Table;

/// Spike threshold, in robust standard deviations, applied to finite difference rates.
pub const DIFF_OUTLIER_STDS: f64 = 5.0;

/// A series of N quaternions, one per row.
///
/// Mirrors every [`Quaternion`] operation row by row. Operations between two series
/// require equal lengths.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Quaternions {
    /// The rows.
    pub data: Vec<Quaternion>,
}

impl Quaternions {
    /// Create a series from its rows.
    pub fn new(data: Vec<Quaternion>) -> Self {
        Self { data }
    }

    /// Create a series from an `N×4` array of `[w, x, y, z]` rows.
    pub fn from_rows(rows: &[[f64; 4]]) -> Self {
        Self::new(rows.iter().copied().map(Quaternion::from).collect())
    }

    /// Number of rows.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the series is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Iterate over the rows.
    pub fn iter(&self) -> std::slice::Iter<'_, Quaternion> {
        self.data.iter()
    }

    /// The w column.
    pub fn w(&self) -> Vec<f64> {
        self.data.iter().map(|q| q.w).collect()
    }

    /// The x column.
    pub fn x(&self) -> Vec<f64> {
        self.data.iter().map(|q| q.x).collect()
    }

    /// The y column.
    pub fn y(&self) -> Vec<f64> {
        self.data.iter().map(|q| q.y).collect()
    }

    /// The z column.
    pub fn z(&self) -> Vec<f64> {
        self.data.iter().map(|q| q.z).collect()
    }

    /// The vector parts.
    pub fn axis(&self) -> Points {
        self.data.iter().map(Quaternion::axis).collect()
    }

    /// Per-row magnitude.
    pub fn magnitudes(&self) -> Vec<f64> {
        self.data.iter().map(Quaternion::magnitude).collect()
    }

    /// Export to a table with columns `w, x, y, z` wrapped in `prefix` and `suffix`.
    pub fn to_table(&self, prefix: &str, suffix: &str) -> Table {
        let mut table = Table::with_labels(&["w", "x", "y", "z"], prefix, suffix);
        table.rows = self.data.iter().map(Quaternion::to_list).collect();
        table
    }

    fn check_len(&self, actual: usize) -> Result<()> {
        if actual != self.len() {
            return Err(GeometryError::ShapeMismatch {
                expected: self.len(),
                actual,
            });
        }
        Ok(())
    }

    fn try_map<T>(&self, f: impl Fn(&Quaternion) -> Result<T>) -> Result<Vec<T>> {
        self.data.iter().map(f).collect()
    }

    /// Normalise every row.
    pub fn norm(&self) -> Result<Self> {
        self.try_map(Quaternion::norm).map(Self::new)
    }

    /// Conjugate every row.
    pub fn conjugate(&self) -> Self {
        self.data.iter().map(Quaternion::conjugate).collect()
    }

    /// Invert every row.
    pub fn inverse(&self) -> Result<Self> {
        self.try_map(Quaternion::inverse).map(Self::new)
    }

    /// Flip rows with a negative scalar part.
    pub fn closest_to_identity(&self) -> Self {
        self.data.iter().map(Quaternion::closest_to_identity).collect()
    }

    /// Row-by-row Hamilton product `self[i] * other[i]`.
    pub fn mul_quaternions(&self, other: &Quaternions) -> Result<Self> {
        self.check_len(other.len())?;
        Ok(self
            .data
            .iter()
            .zip(other.data.iter())
            .map(|(a, b)| *a * *b)
            .collect())
    }

    /// Build a rotation per row of `(roll, pitch, yaw)`.
    pub fn from_euler(eulers: &Points) -> Self {
        eulers.iter().copied().map(Quaternion::from_euler).collect()
    }

    /// Decompose every row into `(roll, pitch, yaw)`.
    ///
    /// Uses the same convention as [`Quaternion::to_euler`]. The gimbal locked rows are
    /// selected with a mask over the whole series and overwrite the regular decomposition.
    pub fn to_euler(&self) -> Points {
        let sinp: Vec<f64> = self
            .data
            .iter()
            .map(|q| 2.0 * (q.w * q.y - q.z * q.x))
            .collect();
        let locked: Vec<bool> = sinp
            .iter()
            .map(|s| s.abs() >= 1.0 - GIMBAL_LOCK_TOLERANCE)
            .collect();

        let regular = self.data.iter().zip(sinp.iter()).map(|(q, s)| {
            Point::new(
                (2.0 * (q.w * q.x + q.y * q.z)).atan2(1.0 - 2.0 * (q.x * q.x + q.y * q.y)),
                s.clamp(-1.0, 1.0).asin(),
                (2.0 * (q.w * q.z + q.x * q.y)).atan2(1.0 - 2.0 * (q.y * q.y + q.z * q.z)),
            )
        });
        let gimbal = self.data.iter().zip(sinp.iter()).map(|(q, s)| {
            Point::new(0.0, FRAC_PI_2.copysign(*s), wrap_angle(2.0 * q.z.atan2(q.w)))
        });

        regular
            .zip(gimbal)
            .zip(locked)
            .map(|((r, g), lock)| if lock { g } else { r })
            .collect()
    }

    /// Rotation matrix per row.
    pub fn to_rotation_matrices(&self) -> Result<Vec<Matrix3>> {
        self.try_map(Quaternion::to_rotation_matrix)
    }

    /// Recover a quaternion per rotation matrix.
    pub fn from_rotation_matrices(matrices: &[Matrix3]) -> Result<Self> {
        matrices
            .iter()
            .map(Quaternion::from_rotation_matrix)
            .collect::<Result<Vec<_>>>()
            .map(Self::new)
    }

    /// Quaternion per axis-angle row, see [`Quaternion::from_axis_angle`].
    pub fn from_axis_angles(vectors: &Points) -> Self {
        vectors.iter().copied().map(Quaternion::from_axis_angle).collect()
    }

    /// Quaternion per axis-angle row, see [`Quaternion::from_axis_angle_scaled`].
    pub fn from_axis_angles_scaled(vectors: &Points, half_angle_factor: f64) -> Self {
        vectors
            .iter()
            .map(|v| Quaternion::from_axis_angle_scaled(*v, half_angle_factor))
            .collect()
    }

    /// Axis-angle vector per row.
    pub fn to_axis_angles(&self) -> Points {
        self.data.iter().map(Quaternion::to_axis_angle).collect()
    }

    /// Rotate `points[i]` by `self[i]`.
    pub fn transform_points(&self, points: &Points) -> Result<Points> {
        self.check_len(points.len())?;
        self.data
            .iter()
            .zip(points.iter())
            .map(|(q, p)| q.transform_point(*p))
            .collect::<Result<Vec<_>>>()
            .map(Points::new)
    }

    /// Apply a world frame angular displacement per row.
    pub fn rotate(&self, rates: &Points) -> Result<Self> {
        self.check_len(rates.len())?;
        self.data
            .iter()
            .zip(rates.iter())
            .map(|(q, r)| q.rotate(*r))
            .collect::<Result<Vec<_>>>()
            .map(Self::new)
    }

    /// Apply a body frame angular displacement per row.
    pub fn body_rotate(&self, rates: &Points) -> Result<Self> {
        self.check_len(rates.len())?;
        self.data
            .iter()
            .zip(rates.iter())
            .map(|(q, r)| q.body_rotate(*r))
            .collect::<Result<Vec<_>>>()
            .map(Self::new)
    }

    /// World frame angular displacement taking `q[i]` to `qdot[i]`.
    pub fn axis_rates(q: &Quaternions, qdot: &Quaternions) -> Result<Points> {
        q.check_len(qdot.len())?;
        q.data
            .iter()
            .zip(qdot.data.iter())
            .map(|(a, b)| Quaternion::axis_rates(a, b))
            .collect::<Result<Vec<_>>>()
            .map(Points::new)
    }

    /// Body frame angular displacement taking `q[i]` to `qdot[i]`.
    pub fn body_axis_rates(q: &Quaternions, qdot: &Quaternions) -> Result<Points> {
        q.check_len(qdot.len())?;
        q.data
            .iter()
            .zip(qdot.data.iter())
            .map(|(a, b)| Quaternion::body_axis_rates(a, b))
            .collect::<Result<Vec<_>>>()
            .map(Points::new)
    }

    /// World frame angular rate between consecutive rows.
    ///
    /// Row `i` holds the displacement from row `i` to row `i + 1` divided by `dt[i]`; the
    /// last row repeats the previous rate. Isolated spikes are replaced by their neighbours.
    pub fn diff(&self, dt: &[f64]) -> Result<Points> {
        self.finite_difference(dt, Quaternion::axis_rates)
    }

    /// Body frame angular rate between consecutive rows, see [`Quaternions::diff`].
    pub fn body_diff(&self, dt: &[f64]) -> Result<Points> {
        self.finite_difference(dt, Quaternion::body_axis_rates)
    }

    fn finite_difference(
        &self,
        dt: &[f64],
        rates: impl Fn(&Quaternion, &Quaternion) -> Result<Point>,
    ) -> Result<Points> {
        self.check_len(dt.len())?;
        if let Some(bad) = dt.iter().find(|t| **t <= 0.0) {
            return Err(GeometryError::degenerate(format!(
                "time step {bad} is not positive"
            )));
        }
        if self.len() < 2 {
            return Ok(Points::from_point(Point::ZERO, self.len()));
        }

        let mut out = self
            .data
            .windows(2)
            .zip(dt)
            .map(|(pair, t)| Ok(rates(&pair[0], &pair[1])? / *t))
            .collect::<Result<Vec<Point>>>()?;
        if let Some(last) = out.last().copied() {
            out.push(last);
        }

        Ok(Points::new(out).remove_outliers(DIFF_OUTLIER_STDS))
    }
}

impl Index<usize> for Quaternions {
    type Output = Quaternion;

    fn index(&self, index: usize) -> &Self::Output {
        &self.data[index]
    }
}

impl From<Vec<Quaternion>> for Quaternions {
    fn from(data: Vec<Quaternion>) -> Self {
        Self::new(data)
    }
}

impl FromIterator<Quaternion> for Quaternions {
    fn from_iter<I: IntoIterator<Item = Quaternion>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl Mul<f64> for &Quaternions {
    type Output = Quaternions;

    fn mul(self, rhs: f64) -> Self::Output {
        self.data.iter().map(|q| *q * rhs).collect()
    }
}

/// Left-multiply every row by a single quaternion.
impl Mul<&Quaternions> for Quaternion {
    type Output = Quaternions;

    fn mul(self, rhs: &Quaternions) -> Self::Output {
        rhs.data.iter().map(|q| self * *q).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    type TestResult = std::result::Result<(), Box<dyn std::error::Error>>;

    fn sample() -> Quaternions {
        Quaternions::from_rows(&[[0.0, 0.0, 0.0, 1.0], [0.4472136, 0.0, 0.0, 0.8944272]])
    }

    #[test]
    fn test_matches_single() -> TestResult {
        let qs = sample();
        let norm = qs.norm()?;
        let inv = qs.inverse()?;
        let squared = qs.mul_quaternions(&qs)?;
        for (i, q) in qs.iter().enumerate() {
            assert_eq!(qs.magnitudes()[i], q.magnitude());
            assert_eq!(norm[i], q.norm()?);
            assert_eq!(qs.conjugate()[i], q.conjugate());
            assert_eq!(inv[i], q.inverse()?);
            assert_eq!(squared[i], *q * *q);
        }
        assert_eq!(qs.w(), vec![0.0, 0.4472136]);
        assert_eq!(qs.axis()[1], Point::new(0.0, 0.0, 0.8944272));
        Ok(())
    }

    #[test]
    fn test_shape_mismatch() {
        let qs = sample();
        let one = Quaternions::from_rows(&[[1.0, 0.0, 0.0, 0.0]]);
        assert!(matches!(
            qs.mul_quaternions(&one),
            Err(GeometryError::ShapeMismatch { expected: 2, actual: 1 })
        ));
        assert!(qs.diff(&[0.1]).is_err());
    }

    #[test]
    fn test_euler_roundtrip() {
        let eulers = Points::from_rows(&[
            [0.0, 0.0, 0.0],
            [1.0, 1.0, 0.0],
            [-0.3, 0.2, 2.9],
            [0.1, -1.5, -3.0],
        ]);
        let back = Quaternions::from_euler(&eulers).to_euler();
        for (a, b) in back.iter().zip(eulers.iter()) {
            assert_abs_diff_eq!(*a, *b, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_euler_gimbal_matches_single() {
        let qs = Quaternions::from_euler(&Points::from_rows(&[
            [0.3, FRAC_PI_2, 0.5],
            [0.2, 0.1, 0.3],
            [0.3, -FRAC_PI_2, 0.5],
        ]));
        let batched = qs.to_euler();
        for (q, e) in qs.iter().zip(batched.iter()) {
            assert_eq!(q.to_euler(), *e);
        }
        assert_eq!(batched[0].x, 0.0);
        assert_eq!(batched[2].x, 0.0);
    }

    #[test]
    fn test_rotation_matrices_roundtrip() -> TestResult {
        let qs: Quaternions = (0..20).map(|_| Quaternion::from_random()).collect();
        let back = Quaternions::from_rotation_matrices(&qs.to_rotation_matrices()?)?;
        for (a, b) in qs.closest_to_identity().iter().zip(back.closest_to_identity().iter()) {
            assert_abs_diff_eq!(*a, *b, epsilon = 1e-9);
        }
        Ok(())
    }

    #[test]
    fn test_axis_angles_roundtrip() {
        let vectors = Points::from_rows(&[[0.0, 0.0, 0.0], [0.1, 0.2, -0.3], [1.0, 0.0, 0.0]]);
        let back = Quaternions::from_axis_angles(&vectors).to_axis_angles();
        for (a, b) in back.iter().zip(vectors.iter()) {
            assert_abs_diff_eq!(*a, *b, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_axis_rates() -> TestResult {
        let q = Quaternions::from_euler(&Points::from_point(Point::new(0.0, 0.0, FRAC_PI_2), 3));
        let qdot = Quaternions::from_euler(&Points::from_point(
            Point::new(5f64.to_radians(), 0.0, FRAC_PI_2),
            3,
        ));
        let rates = Quaternions::axis_rates(&q, &qdot)?;
        let body = Quaternions::body_axis_rates(&q, &qdot)?;
        for i in 0..3 {
            assert_abs_diff_eq!(rates[i].y.to_degrees(), 5.0, epsilon = 1e-7);
            assert_abs_diff_eq!(body[i].x.to_degrees(), 5.0, epsilon = 1e-7);
        }
        Ok(())
    }

    #[test]
    fn test_diff_constant_rate() -> TestResult {
        let rate = Point::new(0.0, 0.0, 0.5);
        let dt = 0.1;
        let mut q = Quaternion::IDENTITY;
        let mut rows = Vec::new();
        for _ in 0..10 {
            rows.push(q);
            q = q.rotate(rate * dt)?;
        }
        let qs = Quaternions::new(rows);
        let rates = qs.diff(&[dt; 10])?;
        let body_rates = qs.body_diff(&[dt; 10])?;
        assert_eq!(rates.len(), 10);
        for (r, b) in rates.iter().zip(body_rates.iter()) {
            assert_abs_diff_eq!(*r, rate, epsilon = 1e-9);
            assert_abs_diff_eq!(*b, rate, epsilon = 1e-9);
        }
        Ok(())
    }

    #[test]
    fn test_diff_across_half_turn() -> TestResult {
        // yaw passes through ±180°, the rate must stay smooth
        let yaws = [3.0, 3.1, -3.1, -3.0];
        let qs = Quaternions::from_euler(&Points::new(
            yaws.iter().map(|y| Point::new(0.0, 0.0, *y)).collect(),
        ));
        let rates = qs.diff(&[1.0; 4])?;
        let step = 2.0 * std::f64::consts::PI - 6.2;
        assert_relative_eq!(rates[0].z, 0.1, epsilon = 1e-9);
        assert_relative_eq!(rates[1].z, step, epsilon = 1e-9);
        assert_relative_eq!(rates[2].z, 0.1, epsilon = 1e-9);
        Ok(())
    }

    #[test]
    fn test_diff_rejects_bad_dt() {
        let qs = sample();
        assert!(matches!(
            qs.diff(&[0.1, 0.0]),
            Err(GeometryError::DegenerateInput(_))
        ));
    }

    #[test]
    fn test_to_table() {
        let table = sample().to_table("att_", "");
        assert_eq!(table.columns, vec!["att_w", "att_x", "att_y", "att_z"]);
        assert_eq!(table.rows[1], vec![0.4472136, 0.0, 0.0, 0.8944272]);
    }

    #[test]
    fn test_broadcast_mul() {
        let qs = sample();
        let left = Quaternion::IDENTITY * &qs;
        assert_eq!(left, qs);
        assert_eq!((&qs * 2.0)[1].w, 0.8944272);
    }
}
