//! Orthonormal coordinate frames.

use std::fmt;

use crate::error::{GeometryError, Result};
use crate::point::{Matrix3, Point, PARALLEL_TOLERANCE};
use crate::points::Points;
use crate::vector::{Plane, Vector};

/// An origin and three orthonormal, right-handed axes, all expressed in world coordinates.
///
/// Every constructor derives the missing axis with a cross product at construction time,
/// so a frame is always fully specified and `z = x × y` holds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateFrame {
    origin: Point,
    x_axis: Point,
    y_axis: Point,
    z_axis: Point,
}

impl CoordinateFrame {
    /// Create a frame from three axes, normalising each of them.
    ///
    /// Fails unless the axes are mutually perpendicular and right-handed.
    pub fn new(origin: Point, x_axis: Point, y_axis: Point, z_axis: Point) -> Result<Self> {
        let (x, y, z) = (x_axis.unit()?, y_axis.unit()?, z_axis.unit()?);
        let orthonormal = x.is_perpendicular(y, PARALLEL_TOLERANCE)?
            && y.is_perpendicular(z, PARALLEL_TOLERANCE)?
            && z.is_perpendicular(x, PARALLEL_TOLERANCE)?;
        if !orthonormal || (x.cross(y) - z).magnitude() > PARALLEL_TOLERANCE {
            return Err(GeometryError::degenerate(
                "axes do not form a right-handed orthonormal basis",
            ));
        }
        Ok(Self::from_unit_axes(origin, x, y, z))
    }

    fn from_unit_axes(origin: Point, x_axis: Point, y_axis: Point, z_axis: Point) -> Self {
        Self {
            origin,
            x_axis,
            y_axis,
            z_axis,
        }
    }

    /// The world frame: zero origin and identity axes.
    pub fn from_nothing() -> Self {
        Self::from_unit_axes(Point::ZERO, Point::X, Point::Y, Point::Z)
    }

    /// Frame from its x and y axes; `z = x × y`.
    ///
    /// `y` is re-derived as `z × x` so the result is orthonormal even when the inputs are
    /// only approximately perpendicular. Fails if either axis is zero or they are parallel.
    pub fn from_xy(origin: Point, x_axis: Point, y_axis: Point) -> Result<Self> {
        let x = x_axis.unit()?;
        let z = x.cross(y_axis.unit()?).unit()?;
        Ok(Self::from_unit_axes(origin, x, z.cross(x), z))
    }

    /// Frame from its y and z axes; `x = y × z`.
    pub fn from_yz(origin: Point, y_axis: Point, z_axis: Point) -> Result<Self> {
        let y = y_axis.unit()?;
        let x = y.cross(z_axis.unit()?).unit()?;
        Ok(Self::from_unit_axes(origin, x, y, x.cross(y)))
    }

    /// Frame from its z and x axes (z first); `y = z × x`.
    pub fn from_zx(origin: Point, z_axis: Point, x_axis: Point) -> Result<Self> {
        let z = z_axis.unit()?;
        let y = z.cross(x_axis.unit()?).unit()?;
        Ok(Self::from_unit_axes(origin, y.cross(z), y, z))
    }

    /// Frame from a z axis alone, with x chosen by [`Point::arbitrary_perpendicular`].
    pub fn from_z(origin: Point, z_axis: Point) -> Result<Self> {
        let z = z_axis.unit()?;
        let x = z.arbitrary_perpendicular()?;
        Ok(Self::from_unit_axes(origin, x, z.cross(x), z))
    }

    /// The world axes rotated by the `(roll, pitch, yaw)` rotation matrix, at `origin`.
    pub fn from_euler(origin: Point, angles: Point) -> Self {
        Self::from_nothing()
            .translate(origin)
            .rotate(&angles.to_rotation_matrix())
    }

    /// Origin in world coordinates.
    #[inline]
    pub fn origin(&self) -> Point {
        self.origin
    }

    /// Unit x axis.
    #[inline]
    pub fn x_axis(&self) -> Point {
        self.x_axis
    }

    /// Unit y axis.
    #[inline]
    pub fn y_axis(&self) -> Point {
        self.y_axis
    }

    /// Unit z axis.
    #[inline]
    pub fn z_axis(&self) -> Point {
        self.z_axis
    }

    /// Move the origin, keeping the axes.
    pub fn set_origin(&mut self, origin: Point) {
        self.origin = origin;
    }

    /// The same axes with the origin shifted by `offset`.
    pub fn translate(&self, offset: Point) -> Self {
        Self::from_unit_axes(self.origin + offset, self.x_axis, self.y_axis, self.z_axis)
    }

    /// Rotate the axes by a matrix, keeping the origin.
    pub fn rotate(&self, m: &Matrix3) -> Self {
        Self::from_unit_axes(
            self.origin,
            self.x_axis.rotate(m),
            self.y_axis.rotate(m),
            self.z_axis.rotate(m),
        )
    }

    /// Axes stacked as rows; maps world directions to local ones.
    pub fn rotation_matrix(&self) -> Matrix3 {
        [
            self.x_axis.to_array(),
            self.y_axis.to_array(),
            self.z_axis.to_array(),
        ]
    }

    /// Axes stacked as columns, the transpose of [`CoordinateFrame::rotation_matrix`].
    pub fn inverse_rotation_matrix(&self) -> Matrix3 {
        let (x, y, z) = (self.x_axis, self.y_axis, self.z_axis);
        [[x.x, y.x, z.x], [x.y, y.y, z.y], [x.z, y.z, z.z]]
    }

    /// Express a world point in this frame.
    pub fn to_local(&self, point: Point) -> Point {
        (point - self.origin).rotate(&self.rotation_matrix())
    }

    /// Express a point given in this frame in world coordinates.
    pub fn to_world(&self, point: Point) -> Point {
        point.rotate(&self.inverse_rotation_matrix()) + self.origin
    }

    /// The local xy plane (normal along z).
    pub fn xy_plane(&self) -> Plane {
        Plane::new(self.origin, self.z_axis)
    }

    /// The local yz plane (normal along x).
    pub fn yz_plane(&self) -> Plane {
        Plane::new(self.origin, self.x_axis)
    }

    /// The local zx plane (normal along y).
    pub fn zx_plane(&self) -> Plane {
        Plane::new(self.origin, self.y_axis)
    }

    /// Ray from the origin along x.
    pub fn x_vector(&self) -> Vector {
        Vector::new(self.origin, self.x_axis)
    }

    /// Ray from the origin along y.
    pub fn y_vector(&self) -> Vector {
        Vector::new(self.origin, self.y_axis)
    }

    /// Ray from the origin along z.
    pub fn z_vector(&self) -> Vector {
        Vector::new(self.origin, self.z_axis)
    }
}

impl Default for CoordinateFrame {
    fn default() -> Self {
        Self::from_nothing()
    }
}

impl fmt::Display for CoordinateFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CoordinateFrame(origin: {}, x: {}, y: {}, z: {})",
            self.origin, self.x_axis, self.y_axis, self.z_axis
        )
    }
}

/// Re-express `point`, given in `from`, in the frame `to`.
///
/// The rotation applied is the inverse of the one in
/// [`Transformation::from_coords`](crate::Transformation::from_coords) for the same frames.
pub fn transform_point(point: Point, from: &CoordinateFrame, to: &CoordinateFrame) -> Point {
    let world = point.rotate(&from.inverse_rotation_matrix()) + from.origin;
    (world - to.origin).rotate(&to.rotation_matrix())
}

/// [`transform_point`] for every row of `points`.
pub fn transform_points(points: &Points, from: &CoordinateFrame, to: &CoordinateFrame) -> Points {
    points.iter().map(|p| transform_point(*p, from, to)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::point::{matmul3, IDENTITY_MATRIX};
    use approx::assert_abs_diff_eq;
    use std::f64::consts::FRAC_PI_2;

    fn assert_right_handed(frame: &CoordinateFrame) {
        assert_abs_diff_eq!(frame.x_axis().cross(frame.y_axis()), frame.z_axis(), epsilon = 1e-12);
        assert_abs_diff_eq!(frame.x_axis().magnitude(), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(frame.y_axis().magnitude(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_from_nothing() {
        let frame = CoordinateFrame::from_nothing();
        assert_eq!(frame.rotation_matrix(), IDENTITY_MATRIX);
        assert_eq!(frame.inverse_rotation_matrix(), IDENTITY_MATRIX);
        assert_eq!(frame, CoordinateFrame::default());
    }

    #[test]
    fn test_constructors_agree() -> Result<()> {
        let origin = Point::new(1.0, 2.0, 3.0);
        let x = Point::new(0.0, 2.0, 0.0);
        let y = Point::new(0.0, 0.0, 0.5);
        let z = Point::new(3.0, 0.0, 0.0);

        let from_xy = CoordinateFrame::from_xy(origin, x, y)?;
        let from_yz = CoordinateFrame::from_yz(origin, y, z)?;
        let from_zx = CoordinateFrame::from_zx(origin, z, x)?;
        let full = CoordinateFrame::new(origin, x, y, z)?;
        for frame in [from_xy, from_yz, from_zx] {
            assert_right_handed(&frame);
            assert_abs_diff_eq!(frame.x_axis(), full.x_axis(), epsilon = 1e-12);
            assert_abs_diff_eq!(frame.y_axis(), full.y_axis(), epsilon = 1e-12);
            assert_abs_diff_eq!(frame.z_axis(), full.z_axis(), epsilon = 1e-12);
        }
        Ok(())
    }

    #[test]
    fn test_new_rejects_left_handed() {
        assert!(matches!(
            CoordinateFrame::new(Point::ZERO, Point::X, Point::Y, -Point::Z),
            Err(GeometryError::DegenerateInput(_))
        ));
        assert!(CoordinateFrame::new(Point::ZERO, Point::X, Point::X, Point::Z).is_err());
    }

    #[test]
    fn test_degenerate_axes() {
        assert!(CoordinateFrame::from_xy(Point::ZERO, Point::X, Point::new(2.0, 0.0, 0.0)).is_err());
        assert!(CoordinateFrame::from_zx(Point::ZERO, Point::ZERO, Point::X).is_err());
        assert!(CoordinateFrame::from_z(Point::ZERO, Point::ZERO).is_err());
    }

    #[test]
    fn test_from_z() -> Result<()> {
        let frame = CoordinateFrame::from_z(Point::ZERO, Point::new(0.0, 0.0, 2.0))?;
        assert_eq!(frame.x_axis(), Point::Y);
        assert_abs_diff_eq!(frame.y_axis(), Point::new(-1.0, 0.0, 0.0), epsilon = 1e-12);
        assert_right_handed(&frame);

        let tilted = CoordinateFrame::from_z(Point::ZERO, Point::new(1.0, 2.0, 3.0))?;
        assert_right_handed(&tilted);
        Ok(())
    }

    #[test]
    fn test_inverse_is_transpose() -> Result<()> {
        let frame = CoordinateFrame::from_xy(Point::ZERO, Point::new(1.0, 1.0, 0.0), Point::new(-1.0, 1.0, 1.0))?;
        let product = matmul3(&frame.rotation_matrix(), &frame.inverse_rotation_matrix());
        for i in 0..3 {
            for j in 0..3 {
                assert_abs_diff_eq!(product[i][j], IDENTITY_MATRIX[i][j], epsilon = 1e-12);
            }
        }
        Ok(())
    }

    #[test]
    fn test_local_world_roundtrip() -> Result<()> {
        let frame = CoordinateFrame::from_zx(
            Point::new(1.0, -2.0, 0.5),
            Point::new(0.0, 1.0, 1.0),
            Point::new(1.0, 0.0, 0.0),
        )?;
        let p = Point::new(4.0, 5.0, 6.0);
        assert_abs_diff_eq!(frame.to_world(frame.to_local(p)), p, epsilon = 1e-12);
        assert_abs_diff_eq!(frame.to_local(frame.origin()), Point::ZERO, epsilon = 1e-12);
        assert_abs_diff_eq!(
            transform_point(p, &CoordinateFrame::from_nothing(), &frame),
            frame.to_local(p),
            epsilon = 1e-12
        );
        Ok(())
    }

    #[test]
    fn test_transform_point() -> Result<()> {
        let world = CoordinateFrame::from_nothing();
        let shifted = world.translate(Point::new(1.0, 0.0, 0.0));
        assert_eq!(transform_point(Point::ZERO, &world, &shifted), Point::new(-1.0, 0.0, 0.0));

        let turned = CoordinateFrame::from_zx(Point::ZERO, Point::Z, Point::Y)?;
        let moved = transform_points(&Points::from_rows(&[[1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]), &world, &turned);
        assert_abs_diff_eq!(moved[0], Point::new(0.0, -1.0, 0.0), epsilon = 1e-12);
        assert_abs_diff_eq!(moved[1], Point::new(1.0, 0.0, 0.0), epsilon = 1e-12);
        Ok(())
    }

    #[test]
    fn test_transform_point_opposes_from_coords() -> Result<()> {
        let world = CoordinateFrame::from_nothing();
        let turned = CoordinateFrame::from_zx(Point::ZERO, Point::Z, Point::new(0.0, -1.0, 0.0))?;
        let p = Point::new(1.0, 1.0, 0.0);

        let expressed = transform_point(p, &world, &turned);
        assert_abs_diff_eq!(expressed, Point::new(-1.0, 1.0, 0.0), epsilon = 1e-12);

        let rotated = crate::Transformation::from_coords(&world, &turned)?.rotate(p);
        assert_abs_diff_eq!(rotated, Point::new(1.0, -1.0, 0.0), epsilon = 1e-12);
        assert_abs_diff_eq!(
            crate::Transformation::from_coords(&world, &turned)?.rotate(expressed),
            p,
            epsilon = 1e-12
        );
        Ok(())
    }

    #[test]
    fn test_from_euler() {
        let frame = CoordinateFrame::from_euler(Point::ZERO, Point::new(0.0, 0.0, FRAC_PI_2));
        assert_abs_diff_eq!(frame.x_axis(), Point::Y, epsilon = 1e-12);
        assert_abs_diff_eq!(frame.y_axis(), -Point::X, epsilon = 1e-12);
        assert_abs_diff_eq!(frame.z_axis(), Point::Z, epsilon = 1e-12);
    }

    #[test]
    fn test_planes_and_vectors() {
        let frame = CoordinateFrame::from_nothing().translate(Point::Z);
        assert_eq!(frame.xy_plane(), Plane::new(Point::Z, Point::Z));
        assert_eq!(frame.yz_plane().normal(), Point::X);
        assert_eq!(frame.zx_plane().normal(), Point::Y);
        assert_eq!(frame.z_vector(), Vector::new(Point::Z, Point::Z));
        assert_eq!(frame.x_vector().direction, Point::X);
        assert_eq!(frame.y_vector().direction, Point::Y);
    }
}
