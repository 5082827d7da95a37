//! Circles in a plane and in space, and three-point arcs.

use std::cell::OnceCell;
use std::f64::consts::PI;

use crate::error::Result;
use crate::frame::CoordinateFrame;
use crate::line::Line;
use crate::point::Point;
use crate::vector::{plane_plane_intersect, vector_plane_intersect, Plane, Vector};

/// A circle in the local xy plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Circle2D {
    /// Centre; only x and y are meaningful.
    pub centre: Point,
    /// Radius.
    pub radius: f64,
}

impl Circle2D {
    /// Create a new circle.
    pub fn new(centre: Point, radius: f64) -> Self {
        Self { centre, radius }
    }

    /// `[centre_x, centre_y, radius]`.
    pub fn to_array(&self) -> [f64; 3] {
        [self.centre.x, self.centre.y, self.radius]
    }

    /// Signed in-plane distance from `point` to the perimeter, positive outside.
    pub fn radial_distance(&self, point: Point) -> f64 {
        let offset = point - self.centre;
        offset.x.hypot(offset.y) - self.radius
    }

    /// Absolute in-plane distance from `point` to the perimeter.
    pub fn unit_cost(&self, point: Point) -> f64 {
        self.radial_distance(point).abs()
    }
}

impl Default for Circle2D {
    fn default() -> Self {
        Self::new(Point::ZERO, 1.0)
    }
}

/// In-plane offset from `point` to the nearest point of the perimeter.
///
/// The z component is ignored. A point on the centre is sent along x.
pub fn distance_to_circle_2d(point: Point, circle: &Circle2D) -> Point {
    let to_centre = Point::new(circle.centre.x - point.x, circle.centre.y - point.y, 0.0);
    match to_centre.unit() {
        Ok(direction) => to_centre - direction * circle.radius,
        Err(_) => Point::new(circle.radius, 0.0, 0.0),
    }
}

/// A circle embedded in space: a 2D circle in the xy plane of a coordinate frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Circle3D {
    frame: CoordinateFrame,
    circle: Circle2D,
}

impl Circle3D {
    /// Combine a frame and a circle in its xy plane.
    pub fn new(frame: CoordinateFrame, circle: Circle2D) -> Self {
        Self { frame, circle }
    }

    /// A circle of `radius` around `axis`, lying in the plane through the axis origin.
    pub fn from_axis(axis: &Vector, radius: f64) -> Result<Self> {
        Ok(Self::new(
            CoordinateFrame::from_z(axis.origin, axis.direction)?,
            Circle2D::new(Point::ZERO, radius),
        ))
    }

    /// The circle through three points.
    ///
    /// The central axis is the intersection of the perpendicular bisector planes of the
    /// chords `start-mid` and `mid-end`. Fails for colinear or coincident points.
    pub fn from_three_points(start: Point, mid: Point, end: Point) -> Result<Self> {
        let axis = plane_plane_intersect(
            &Line::new(start, mid).parametric_plane(0.5)?,
            &Line::new(mid, end).parametric_plane(0.5)?,
        )?;
        let centre = vector_plane_intersect(&axis, &Plane::new(start, axis.direction))?;
        Ok(Self::new(
            CoordinateFrame::from_z(centre, axis.direction)?,
            Circle2D::new(Point::ZERO, (centre - start).magnitude()),
        ))
    }

    /// The frame the circle lives in.
    pub fn frame(&self) -> &CoordinateFrame {
        &self.frame
    }

    /// The circle in frame coordinates.
    pub fn circle(&self) -> &Circle2D {
        &self.circle
    }

    /// Replace the circle in frame coordinates.
    pub fn set_circle(&mut self, circle: Circle2D) {
        self.circle = circle;
    }

    /// Radius.
    pub fn radius(&self) -> f64 {
        self.circle.radius
    }

    /// Centre in world coordinates.
    pub fn centre(&self) -> Point {
        self.frame.to_world(self.circle.centre)
    }

    /// Ray through the world centre along the frame z axis.
    pub fn axis(&self) -> Vector {
        Vector::new(self.centre(), self.frame.z_axis())
    }

    /// Move the frame origin onto the circle centre, leaving the local centre at zero.
    pub fn refresh_centre(&mut self) {
        if self.circle.centre.x != 0.0 || self.circle.centre.y != 0.0 {
            self.frame.set_origin(self.centre());
            self.circle.centre = Point::ZERO;
        }
    }

    /// A copy with [`Circle3D::refresh_centre`] applied.
    pub fn copy_refreshed(&self) -> Self {
        let mut copy = *self;
        copy.refresh_centre();
        copy
    }

    /// World offset from `point` to the nearest point of the circle.
    pub fn distance_to_point(&self, point: Point) -> Point {
        let local = self.frame.to_local(point);
        let in_plane = distance_to_circle_2d(local, &self.circle);
        let offset = in_plane + Point::new(0.0, 0.0, self.circle.centre.z - local.z);
        offset.rotate(&self.frame.inverse_rotation_matrix())
    }

    /// Distance from `point` to the circle.
    pub fn unit_cost(&self, point: Point) -> f64 {
        self.distance_to_point(point).magnitude()
    }
}

/// Sum of the distances from every point to the circle.
pub fn sum_distance_to_circle_3d(points: &[Point], circle: &Circle3D) -> f64 {
    points.iter().map(|p| circle.unit_cost(*p)).sum()
}

#[derive(Debug, Clone)]
struct ArcGeometry {
    circle: Circle3D,
    angle: f64,
}

/// A circular arc from `start` through `mid` to `end`.
///
/// The circle and included angle are derived on first access and cached; changing any of
/// the three points clears the cache.
#[derive(Debug, Clone)]
pub struct Arc {
    start: Point,
    mid: Point,
    end: Point,
    derived: OnceCell<Result<ArcGeometry>>,
}

impl Arc {
    /// Create an arc from three points on it.
    pub fn new(start: Point, mid: Point, end: Point) -> Self {
        Self {
            start,
            mid,
            end,
            derived: OnceCell::new(),
        }
    }

    /// First point.
    pub fn start(&self) -> Point {
        self.start
    }

    /// Point between start and end.
    pub fn mid(&self) -> Point {
        self.mid
    }

    /// Last point.
    pub fn end(&self) -> Point {
        self.end
    }

    /// Replace the first point.
    pub fn set_start(&mut self, start: Point) {
        self.start = start;
        self.derived = OnceCell::new();
    }

    /// Replace the middle point.
    pub fn set_mid(&mut self, mid: Point) {
        self.mid = mid;
        self.derived = OnceCell::new();
    }

    /// Replace the last point.
    pub fn set_end(&mut self, end: Point) {
        self.end = end;
        self.derived = OnceCell::new();
    }

    fn geometry(&self) -> Result<&ArcGeometry> {
        self.derived
            .get_or_init(|| self.derive())
            .as_ref()
            .map_err(Clone::clone)
    }

    fn derive(&self) -> Result<ArcGeometry> {
        let circle = Circle3D::from_three_points(self.start, self.mid, self.end)?;
        let polar = |p: Point| {
            let local = circle.frame().to_local(p);
            local.y.atan2(local.x)
        };
        let (s, m, e) = (polar(self.start), polar(self.mid), polar(self.end));
        let sweep = (e - s).rem_euclid(2.0 * PI);
        let angle = if (m - s).rem_euclid(2.0 * PI) <= sweep {
            sweep
        } else {
            2.0 * PI - sweep
        };
        Ok(ArcGeometry { circle, angle })
    }

    /// The circle the arc lies on.
    pub fn circle(&self) -> Result<Circle3D> {
        Ok(self.geometry()?.circle)
    }

    /// Angle swept from start to end through mid, in `(0, 2π)`.
    pub fn angle(&self) -> Result<f64> {
        Ok(self.geometry()?.angle)
    }
}

impl Default for Arc {
    fn default() -> Self {
        Self::new(Point::new(-1.0, 0.0, 0.0), Point::Y, Point::X)
    }
}
