//! Batched 3D points.

use std::ops::{Add, Div, Index, Mul, Neg, Sub};

use crate::error::{GeometryError, Result};
use crate::point::{Matrix3, Point, ZERO_TOLERANCE};
use crate::table::Table;

/// A series of N points, one per row.
///
/// Row-by-row operations between two series require equal lengths and report
/// [`GeometryError::ShapeMismatch`] otherwise. Operations against a single [`Point`] or a
/// scalar broadcast over every row and are exposed as operators.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Points {
    /// The rows.
    pub data: Vec<Point>,
}

impl Points {
    /// Create a series from its rows.
    pub fn new(data: Vec<Point>) -> Self {
        Self { data }
    }

    /// Repeat a single point `count` times.
    pub fn from_point(point: Point, count: usize) -> Self {
        Self::new(vec![point; count])
    }

    /// Create a series from an `N×3` row-major array.
    pub fn from_rows(rows: &[[f64; 3]]) -> Self {
        Self::new(rows.iter().copied().map(Point::from_array).collect())
    }

    /// Create a series from a flat row-major buffer of `x, y, z` triples.
    pub fn from_flat(values: &[f64]) -> Result<Self> {
        if values.len() % 3 != 0 {
            return Err(GeometryError::ShapeMismatch {
                expected: values.len() - values.len() % 3 + 3,
                actual: values.len(),
            });
        }
        Ok(Self::new(
            values
                .chunks_exact(3)
                .map(|c| Point::new(c[0], c[1], c[2]))
                .collect(),
        ))
    }

    /// The rows as `N×3` arrays.
    pub fn to_rows(&self) -> Vec<[f64; 3]> {
        self.data.iter().map(|p| p.to_array()).collect()
    }

    /// Export to a table with columns `{prefix}x{suffix}`, `{prefix}y{suffix}`,
    /// `{prefix}z{suffix}`.
    pub fn to_table(&self, prefix: &str, suffix: &str) -> Table {
        let mut table = Table::with_labels(&["x", "y", "z"], prefix, suffix);
        table.rows = self.data.iter().map(|p| p.to_list()).collect();
        table
    }

    /// Read a series back from a three column table.
    pub fn from_table(table: &Table) -> Result<Self> {
        if table.columns.len() != 3 {
            return Err(GeometryError::ShapeMismatch {
                expected: 3,
                actual: table.columns.len(),
            });
        }
        table
            .rows
            .iter()
            .map(|row| Point::from_slice(row))
            .collect::<Result<Vec<_>>>()
            .map(Self::new)
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
    pub fn iter(&self) -> std::slice::Iter<'_, Point> {
        self.data.iter()
    }

    /// The x column.
    pub fn x(&self) -> Vec<f64> {
        self.data.iter().map(|p| p.x).collect()
    }

    /// The y column.
    pub fn y(&self) -> Vec<f64> {
        self.data.iter().map(|p| p.y).collect()
    }

    /// The z column.
    pub fn z(&self) -> Vec<f64> {
        self.data.iter().map(|p| p.z).collect()
    }

    /// Per-row magnitude.
    pub fn magnitudes(&self) -> Vec<f64> {
        self.data.iter().map(|p| p.magnitude()).collect()
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

    fn zip_map<T>(&self, other: &Points, f: impl Fn(Point, Point) -> T) -> Result<Vec<T>> {
        self.check_len(other.len())?;
        Ok(self
            .data
            .iter()
            .zip(other.data.iter())
            .map(|(a, b)| f(*a, *b))
            .collect())
    }

    fn try_zip_map<T>(
        &self,
        other: &Points,
        f: impl Fn(Point, Point) -> Result<T>,
    ) -> Result<Vec<T>> {
        self.check_len(other.len())?;
        self.data
            .iter()
            .zip(other.data.iter())
            .map(|(a, b)| f(*a, *b))
            .collect()
    }

    fn map(&self, f: impl Fn(Point) -> Point) -> Points {
        Points::new(self.data.iter().copied().map(f).collect())
    }

    /// Row-by-row sum.
    pub fn add_points(&self, other: &Points) -> Result<Points> {
        self.zip_map(other, |a, b| a + b).map(Points::new)
    }

    /// Row-by-row difference.
    pub fn sub_points(&self, other: &Points) -> Result<Points> {
        self.zip_map(other, |a, b| a - b).map(Points::new)
    }

    /// Row-by-row componentwise product.
    pub fn mul_points(&self, other: &Points) -> Result<Points> {
        self.zip_map(other, |a, b| a * b).map(Points::new)
    }

    /// Row-by-row componentwise quotient.
    pub fn div_points(&self, other: &Points) -> Result<Points> {
        self.zip_map(other, |a, b| a / b).map(Points::new)
    }

    /// Multiply each row by its own scalar.
    pub fn mul_rows(&self, factors: &[f64]) -> Result<Points> {
        self.check_len(factors.len())?;
        Ok(Points::new(
            self.data
                .iter()
                .zip(factors)
                .map(|(p, f)| *p * *f)
                .collect(),
        ))
    }

    /// Divide each row by its own scalar.
    pub fn div_rows(&self, divisors: &[f64]) -> Result<Points> {
        self.check_len(divisors.len())?;
        Ok(Points::new(
            self.data
                .iter()
                .zip(divisors)
                .map(|(p, d)| *p / *d)
                .collect(),
        ))
    }

    /// Rescale every row to the given length.
    pub fn scale(&self, value: f64) -> Result<Points> {
        self.data
            .iter()
            .map(|p| p.scale(value))
            .collect::<Result<Vec<_>>>()
            .map(Points::new)
    }

    /// Per-row unit vectors.
    pub fn unit(&self) -> Result<Points> {
        self.scale(1.0)
    }

    /// Per-row dot product.
    pub fn dot(&self, other: &Points) -> Result<Vec<f64>> {
        self.zip_map(other, |a, b| a.dot(b))
    }

    /// Per-row cross product.
    pub fn cross(&self, other: &Points) -> Result<Points> {
        self.zip_map(other, |a, b| a.cross(b)).map(Points::new)
    }

    /// Per-row angle between the rows of two series.
    pub fn angle_between(&self, other: &Points) -> Result<Vec<f64>> {
        self.try_zip_map(other, |a, b| a.angle_between(b))
    }

    /// Per-row parallel test.
    pub fn is_parallel(&self, other: &Points, tolerance: f64) -> Result<Vec<bool>> {
        self.try_zip_map(other, |a, b| a.is_parallel(b, tolerance))
    }

    /// Per-row anti-parallel test.
    pub fn is_anti_parallel(&self, other: &Points, tolerance: f64) -> Result<Vec<bool>> {
        self.try_zip_map(other, |a, b| a.is_anti_parallel(b, tolerance))
    }

    /// Per-row perpendicular test.
    pub fn is_perpendicular(&self, other: &Points, tolerance: f64) -> Result<Vec<bool>> {
        self.try_zip_map(other, |a, b| a.is_perpendicular(b, tolerance))
    }

    /// Componentwise cosine.
    pub fn cosines(&self) -> Points {
        self.map(Point::cosines)
    }

    /// Componentwise sine.
    pub fn sines(&self) -> Points {
        self.map(Point::sines)
    }

    /// Componentwise arc cosine.
    pub fn acosines(&self) -> Points {
        self.map(Point::acosines)
    }

    /// Componentwise arc sine.
    pub fn asines(&self) -> Points {
        self.map(Point::asines)
    }

    /// Rotate every row by the same matrix.
    pub fn rotate(&self, m: &Matrix3) -> Points {
        self.map(|p| p.rotate(m))
    }

    /// Interpret each row as `(roll, pitch, yaw)` and build its rotation matrix.
    pub fn to_rotation_matrices(&self) -> Vec<Matrix3> {
        self.data.iter().map(|p| p.to_rotation_matrix()).collect()
    }

    /// Mean of all rows.
    pub fn mean(&self) -> Result<Point> {
        crate::point::mean_point(&self.data)
    }

    /// Replace isolated magnitude spikes by interpolating their neighbours.
    ///
    /// A row is a spike when its magnitude deviates from the median magnitude by more than
    /// `nstds` robust standard deviations (1.4826 × median absolute deviation) and neither
    /// neighbour does. Runs of consecutive deviating rows are kept as a genuine change. The
    /// spread is floored at 5% of the median magnitude so that near-constant series do not
    /// flag ordinary variation.
    pub fn remove_outliers(&self, nstds: f64) -> Points {
        let n = self.len();
        if n < 3 {
            return self.clone();
        }
        let mags = self.magnitudes();
        let centre = median(&mags);
        let deviations: Vec<f64> = mags.iter().map(|m| (m - centre).abs()).collect();
        let spread = (1.4826 * median(&deviations))
            .max(0.05 * centre.abs())
            .max(ZERO_TOLERANCE);
        let flagged: Vec<bool> = deviations.iter().map(|d| *d > nstds * spread).collect();

        let is_spike = |i: usize| {
            flagged[i] && (i == 0 || !flagged[i - 1]) && (i + 1 == n || !flagged[i + 1])
        };

        let mut data = self.data.clone();
        for i in (0..n).filter(|i| is_spike(*i)) {
            data[i] = match (i.checked_sub(1), (i + 1 < n).then_some(i + 1)) {
                (Some(prev), Some(next)) => (self.data[prev] + self.data[next]) * 0.5,
                (Some(prev), None) => self.data[prev],
                (None, Some(next)) => self.data[next],
                (None, None) => self.data[i],
            };
        }
        Points::new(data)
    }
}

fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) * 0.5
    } else {
        sorted[mid]
    }
}

impl Index<usize> for Points {
    type Output = Point;

    fn index(&self, index: usize) -> &Self::Output {
        &self.data[index]
    }
}

impl From<Vec<Point>> for Points {
    fn from(data: Vec<Point>) -> Self {
        Self::new(data)
    }
}

impl FromIterator<Point> for Points {
    fn from_iter<I: IntoIterator<Item = Point>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Points {
    type Item = &'a Point;
    type IntoIter = std::slice::Iter<'a, Point>;

    fn into_iter(self) -> Self::IntoIter {
        self.data.iter()
    }
}

// Broadcast operations against a single point or a scalar
macro_rules! impl_broadcast_op {
    ($trait:ident, $method:ident, $rhs:ty) => {
        impl $trait<$rhs> for &Points {
            type Output = Points;

            fn $method(self, rhs: $rhs) -> Self::Output {
                self.map(|p| $trait::$method(p, rhs))
            }
        }

        impl $trait<$rhs> for Points {
            type Output = Points;

            fn $method(self, rhs: $rhs) -> Self::Output {
                (&self).$method(rhs)
            }
        }
    };
}

impl_broadcast_op!(Add, add, Point);
impl_broadcast_op!(Sub, sub, Point);
impl_broadcast_op!(Mul, mul, Point);
impl_broadcast_op!(Div, div, Point);
impl_broadcast_op!(Add, add, f64);
impl_broadcast_op!(Sub, sub, f64);
impl_broadcast_op!(Mul, mul, f64);
impl_broadcast_op!(Div, div, f64);

impl Mul<&Points> for f64 {
    type Output = Points;

    fn mul(self, rhs: &Points) -> Self::Output {
        rhs * self
    }
}

impl Neg for &Points {
    type Output = Points;

    fn neg(self) -> Self::Output {
        self.map(|p| -p)
    }
}
