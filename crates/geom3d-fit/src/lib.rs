//! Least-squares fitting of geometric primitives to point sets.
//!
//! A [`DataFitting`] session binds a point set to an initial guess of a [`Fittable`]
//! shape and solves for the parameters selected as free. [`fit_circle_3d`] chains a plane
//! fit and an in-plane circle fit to recover a circle in space.

mod error;
mod factor;
mod fitting;
mod params;

pub use error::FitError;
pub use fitting::{fit_circle_3d, fit_circle_3d_with, DataFitting, FitReport, FitState};
pub use params::{Circle2DParam, Fittable, PointParam, VectorParam};
