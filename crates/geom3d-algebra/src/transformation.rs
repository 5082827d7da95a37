//! Rigid transformations between coordinate frames.

use crate::error::Result;
use crate::frame::CoordinateFrame;
use crate::point::{matmul3, Matrix3, Point};
use crate::points::Points;
use crate::quaternion::Quaternion;
use crate::quaternions::Quaternions;

/// A rigid transformation: translate, then rotate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transformation {
    translation: Point,
    rotation: Quaternion,
    matrix: Matrix3,
}

impl Transformation {
    /// Create a transformation from a translation and a rotation.
    ///
    /// The rotation is normalised; a zero quaternion is rejected.
    pub fn new(translation: Point, rotation: Quaternion) -> Result<Self> {
        let rotation = rotation.norm()?;
        Ok(Self {
            translation,
            rotation,
            matrix: rotation.to_rotation_matrix()?,
        })
    }

    /// The transformation that changes nothing.
    pub fn identity() -> Self {
        Self {
            translation: Point::ZERO,
            rotation: Quaternion::IDENTITY,
            matrix: crate::point::IDENTITY_MATRIX,
        }
    }

    /// The transformation between two frames.
    ///
    /// The translation is `b.origin - a.origin`; the rotation is
    /// `b.inverse_rotation_matrix() * a.rotation_matrix()`.
    ///
    /// This rotates in the opposite sense to [`crate::transform_point`], which re-expresses
    /// a point of `a` in the axes of `b`.
    pub fn from_coords(a: &CoordinateFrame, b: &CoordinateFrame) -> Result<Self> {
        let rotation = Quaternion::from_rotation_matrix(&matmul3(
            &b.inverse_rotation_matrix(),
            &a.rotation_matrix(),
        ))?;
        Self::new(b.origin() - a.origin(), rotation)
    }

    /// The translation part.
    #[inline]
    pub fn translation(&self) -> Point {
        self.translation
    }

    /// The rotation part, a unit quaternion.
    #[inline]
    pub fn rotation(&self) -> Quaternion {
        self.rotation
    }

    /// Shift a point by the translation.
    pub fn translate(&self, point: Point) -> Point {
        point + self.translation
    }

    /// Rotate a point by the rotation.
    pub fn rotate(&self, point: Point) -> Point {
        point.rotate(&self.matrix)
    }

    /// Translate, then rotate.
    pub fn point(&self, point: Point) -> Point {
        self.rotate(self.translate(point))
    }

    /// [`Transformation::point`] for every row.
    pub fn points(&self, points: &Points) -> Points {
        points.iter().map(|p| self.point(*p)).collect()
    }

    /// [`Transformation::rotate`] for every row.
    pub fn rotate_points(&self, points: &Points) -> Points {
        points.rotate(&self.matrix)
    }

    /// Compose an orientation with the rotation, `rotation * q`.
    pub fn quat(&self, q: &Quaternion) -> Quaternion {
        self.rotation * *q
    }

    /// [`Transformation::quat`] for every row.
    pub fn quats(&self, qs: &Quaternions) -> Quaternions {
        self.rotation * qs
    }
}

impl Default for Transformation {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    type TestResult = std::result::Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn test_translate() -> TestResult {
        let a = CoordinateFrame::from_nothing();
        let b = a.translate(Point::X);
        let transform = Transformation::from_coords(&a, &b)?;
        assert_eq!(transform.translate(Point::ZERO), Point::X);
        assert_abs_diff_eq!(transform.point(Point::ZERO), Point::X, epsilon = 1e-12);
        Ok(())
    }

    #[test]
    fn test_rotate() -> TestResult {
        let cases = [
            (
                CoordinateFrame::from_nothing(),
                CoordinateFrame::from_zx(Point::ZERO, Point::Z, Point::new(0.0, -1.0, 0.0))?,
                Point::new(1.0, -1.0, 0.0),
            ),
            (
                CoordinateFrame::from_zx(Point::ZERO, Point::Z, Point::Y)?,
                CoordinateFrame::from_zx(Point::ZERO, Point::Z, Point::new(0.0, -1.0, 0.0))?,
                Point::new(-1.0, -1.0, 0.0),
            ),
        ];
        for (a, b, expected) in cases {
            let transform = Transformation::from_coords(&a, &b)?;
            assert_abs_diff_eq!(transform.rotate(Point::new(1.0, 1.0, 0.0)), expected, epsilon = 1e-12);
        }
        Ok(())
    }

    #[test]
    fn test_points_match_quaternion() -> TestResult {
        let transform = Transformation::new(Point::new(0.3, -0.2, 1.0), Quaternion::from_random())?;
        let points = Points::from_rows(&[[1.0, 2.0, 3.0], [-0.5, 0.0, 0.25], [0.0, 0.0, 0.0]]);
        let rotated = transform.rotate_points(&points);
        let moved = transform.points(&points);
        for i in 0..points.len() {
            let by_quat = transform.rotation().transform_point(points[i])?;
            assert_abs_diff_eq!(rotated[i], by_quat, epsilon = 1e-9);
            assert_abs_diff_eq!(
                moved[i],
                transform.rotation().transform_point(points[i] + transform.translation())?,
                epsilon = 1e-9
            );
        }
        Ok(())
    }

    #[test]
    fn test_new_normalises() -> TestResult {
        let transform = Transformation::new(Point::ZERO, Quaternion::new(2.0, 0.0, 0.0, 0.0))?;
        assert_eq!(transform.rotation(), Quaternion::IDENTITY);
        assert!(Transformation::new(Point::ZERO, Quaternion::new(0.0, 0.0, 0.0, 0.0)).is_err());
        Ok(())
    }

    #[test]
    fn test_quats() -> TestResult {
        let rotation = Quaternion::from_euler(Point::new(0.0, 0.0, 0.5));
        let transform = Transformation::new(Point::ZERO, rotation)?;
        let q = Quaternion::from_euler(Point::new(0.0, 0.0, 0.25));
        assert_abs_diff_eq!(
            transform.quat(&q).to_euler(),
            Point::new(0.0, 0.0, 0.75),
            epsilon = 1e-12
        );
        let qs = Quaternions::new(vec![q, Quaternion::IDENTITY]);
        assert_eq!(transform.quats(&qs)[0], transform.quat(&q));
        assert_eq!(Transformation::identity().quats(&qs), qs);
        Ok(())
    }
}
