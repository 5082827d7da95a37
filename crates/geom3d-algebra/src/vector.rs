//! Rays and planes: an origin plus a direction.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::{GeometryError, Result};
use crate::point::{raise_zero, Point, PARALLEL_TOLERANCE, ZERO_TOLERANCE};

/// Maximum point-to-plane distance accepted by the coplanarity checks.
pub const COPLANAR_TOLERANCE: f64 = 1e-3;

/// A ray through `origin` pointing along `direction`.
///
/// Two vectors compare equal when their origins match and their directions are parallel;
/// the length of the direction is irrelevant.
#[derive(Debug, Clone, Copy)]
pub struct Vector {
    /// A point on the ray.
    pub origin: Point,
    /// Direction of the ray, not necessarily unit length.
    pub direction: Point,
}

impl Vector {
    /// Create a new vector.
    pub fn new(origin: Point, direction: Point) -> Self {
        Self { origin, direction }
    }

    /// The same ray with a unit direction.
    pub fn unit(&self) -> Result<Self> {
        Ok(Self::new(self.origin, self.direction.unit()?))
    }

    /// `[ox, oy, oz, dx, dy, dz]`.
    pub fn to_array(&self) -> [f64; 6] {
        let (o, d) = (self.origin, self.direction);
        [o.x, o.y, o.z, d.x, d.y, d.z]
    }

    /// Origin followed by direction, as a list.
    pub fn to_list(&self) -> Vec<f64> {
        self.to_array().to_vec()
    }

    /// Export keyed by `{prefix}origin_{x,y,z}` and `{prefix}direction_{x,y,z}`.
    pub fn to_dict(&self, prefix: &str) -> BTreeMap<String, f64> {
        let mut dict = self.origin.to_dict(&format!("{prefix}origin_"));
        dict.extend(self.direction.to_dict(&format!("{prefix}direction_")));
        dict
    }

    /// Closest point on the (infinite) line to `point`.
    pub fn project_point(&self, point: Point) -> Point {
        project_point_to_vector(point, self)
    }

    /// Distance from `point` to the line.
    pub fn unit_cost(&self, point: Point) -> f64 {
        distance_to_vector(point, self).magnitude()
    }
}

impl Default for Vector {
    fn default() -> Self {
        Self::new(Point::ZERO, Point::X)
    }
}

impl PartialEq for Vector {
    fn eq(&self, other: &Self) -> bool {
        self.origin == other.origin
            && self
                .direction
                .is_parallel(other.direction, PARALLEL_TOLERANCE)
                .unwrap_or(false)
    }
}

impl fmt::Display for Vector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Vector(origin: {}, direction: {})", self.origin, self.direction)
    }
}

/// A plane through `origin` with the given normal.
///
/// Shares its data layout with [`Vector`] but measures distances perpendicular to the
/// normal rather than to the line.
#[derive(Debug, Clone, Copy)]
pub struct Plane(Vector);

impl Plane {
    /// Create a plane from a point on it and its normal.
    pub fn new(origin: Point, normal: Point) -> Self {
        Self(Vector::new(origin, normal))
    }

    /// Reinterpret a vector as a plane whose normal is the vector's direction.
    pub fn from_vector(vector: Vector) -> Self {
        Self(vector)
    }

    /// A point on the plane.
    #[inline]
    pub fn origin(&self) -> Point {
        self.0.origin
    }

    /// The plane normal, not necessarily unit length.
    #[inline]
    pub fn normal(&self) -> Point {
        self.0.direction
    }

    /// Move the plane so that it passes through `origin`.
    pub fn set_origin(&mut self, origin: Point) {
        self.0.origin = origin;
    }

    /// Replace the plane normal.
    pub fn set_normal(&mut self, normal: Point) {
        self.0.direction = normal;
    }

    /// The normal ray of the plane.
    pub fn as_vector(&self) -> &Vector {
        &self.0
    }

    /// The same plane with its normal flipped.
    pub fn reverse(&self) -> Self {
        Self::new(self.origin(), -self.normal())
    }

    /// `[ox, oy, oz, nx, ny, nz]`.
    pub fn to_array(&self) -> [f64; 6] {
        self.0.to_array()
    }

    /// Origin followed by normal, as a list.
    pub fn to_list(&self) -> Vec<f64> {
        self.0.to_list()
    }

    /// See [`Vector::to_dict`].
    pub fn to_dict(&self, prefix: &str) -> BTreeMap<String, f64> {
        self.0.to_dict(prefix)
    }

    /// Signed distance from `point` to the plane, positive on the side the normal points to.
    pub fn distance_to_point(&self, point: Point) -> f64 {
        distance_to_plane(point, self)
    }

    /// Whether `point` lies in the plane within `tolerance`.
    pub fn contains_point(&self, point: Point, tolerance: f64) -> bool {
        is_point_in_plane(point, self, tolerance)
    }

    /// Absolute distance from `point` to the plane.
    pub fn unit_cost(&self, point: Point) -> f64 {
        distance_to_plane(point, self).abs()
    }
}

impl Default for Plane {
    fn default() -> Self {
        Self::new(Point::ZERO, Point::Z)
    }
}

impl PartialEq for Plane {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl fmt::Display for Plane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Plane(origin: {}, normal: {})", self.origin(), self.normal())
    }
}

fn normals_parallel(a: Point, b: Point) -> Result<bool> {
    Ok(a.is_parallel(b, PARALLEL_TOLERANCE)? || a.is_anti_parallel(b, PARALLEL_TOLERANCE)?)
}

/// Signed distance from `point` to `plane`.
pub fn distance_to_plane(point: Point, plane: &Plane) -> f64 {
    (point - plane.origin()).scalar_projection(plane.normal())
}

/// Whether `point` lies within `tolerance` of `plane`.
pub fn is_point_in_plane(point: Point, plane: &Plane, tolerance: f64) -> bool {
    distance_to_plane(point, plane).abs() < tolerance
}

/// Whether two planes coincide: the origin of `a` lies in `b` and the normals are parallel
/// in either sense.
pub fn is_coplanar(a: &Plane, b: &Plane, tolerance: f64) -> Result<bool> {
    Ok(is_point_in_plane(a.origin(), b, tolerance) && normals_parallel(a.normal(), b.normal())?)
}

/// Closest point on the line through `vector` to `point`.
pub fn project_point_to_vector(point: Point, vector: &Vector) -> Point {
    (point - vector.origin).vector_projection(vector.direction) + vector.origin
}

/// Offset from `point` to its projection onto the line through `vector`.
pub fn distance_to_vector(point: Point, vector: &Vector) -> Point {
    project_point_to_vector(point, vector) - point
}

/// Signed distance along `vector`'s unit direction from its origin to `plane`.
///
/// Fails when the vector runs parallel to the plane.
pub fn distance_along_vector_to_plane(vector: &Vector, plane: &Plane) -> Result<f64> {
    raise_zero(&[vector.direction, plane.normal()])?;
    let direction = vector.direction.unit()?;
    let normal = plane.normal().unit()?;
    let denom = direction.dot(normal);
    if denom.abs() < ZERO_TOLERANCE {
        return Err(GeometryError::degenerate(
            "vector is parallel to the plane and never meets it",
        ));
    }
    Ok((plane.origin() - vector.origin).dot(normal) / denom)
}

/// Point where the line through `vector` meets `plane`.
pub fn vector_plane_intersect(vector: &Vector, plane: &Plane) -> Result<Point> {
    let distance = distance_along_vector_to_plane(vector, plane)?;
    Ok(vector.origin + vector.direction.unit()? * distance)
}

/// Line of intersection of two planes, directed along `n1 × n2`.
///
/// Fails when the planes are parallel.
pub fn plane_plane_intersect(plane1: &Plane, plane2: &Plane) -> Result<Vector> {
    if normals_parallel(plane1.normal(), plane2.normal())? {
        return Err(GeometryError::degenerate("planes are parallel"));
    }
    let axis = plane1.normal().cross(plane2.normal());
    let towards_line = Vector::new(plane1.origin(), plane1.normal().cross(axis));
    let origin = vector_plane_intersect(&towards_line, plane2)?;
    Ok(Vector::new(origin, axis))
}

/// The single point shared by three planes.
///
/// Fails when any two of the planes are parallel.
pub fn plane_plane_plane_intersect(plane1: &Plane, plane2: &Plane, plane3: &Plane) -> Result<Point> {
    if normals_parallel(plane1.normal(), plane3.normal())?
        || normals_parallel(plane2.normal(), plane3.normal())?
    {
        return Err(GeometryError::degenerate("planes are parallel"));
    }
    let line = plane_plane_intersect(plane1, plane2)?;
    vector_plane_intersect(&line, plane3)
}
