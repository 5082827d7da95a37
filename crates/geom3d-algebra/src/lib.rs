//! Geometric algebra for geom3d.
//!
//! This crate provides:
//! - `Point` / `Points`, double precision 3D vectors (newtype over glam) and their batched form
//! - `Vector`, `Plane` and `Line` with projection and intersection helpers
//! - `Quaternion` / `Quaternions` with Euler, axis-angle and rotation-matrix conversions
//! - `CoordinateFrame` and `Transformation` for moving between frames
//! - `Circle2D`, `Circle3D` and `Arc`

mod circle;
mod error;
mod frame;
mod line;
mod point;
mod points;
mod quaternion;
mod quaternions;
mod table;
mod transformation;
mod vector;

pub use circle::{distance_to_circle_2d, sum_distance_to_circle_3d, Arc, Circle2D, Circle3D};
pub use error::{GeometryError, Result};
pub use frame::{transform_point, transform_points, CoordinateFrame};
pub use line::{check_extend_line, lines_from_points, Line};
pub use point::{
    matmul3, mean_point, raise_zero, transpose3, Matrix3, Point, IDENTITY_MATRIX,
    PARALLEL_TOLERANCE, ZERO_TOLERANCE,
};
pub use points::Points;
pub use quaternion::{Quaternion, GIMBAL_LOCK_TOLERANCE};
pub use quaternions::{Quaternions, DIFF_OUTLIER_STDS};
pub use table::Table;
pub use transformation::Transformation;
pub use vector::{
    distance_along_vector_to_plane, distance_to_plane, distance_to_vector, is_coplanar,
    is_point_in_plane, plane_plane_intersect, plane_plane_plane_intersect,
    project_point_to_vector, vector_plane_intersect, Plane, Vector, COPLANAR_TOLERANCE,
};

// Re-export the glam vector backing `Point`
pub use glam::DVec3;
