//! Non-linear least squares for geom3d.
//!
//! Problems are built from named Euclidean [`Variable`]s and [`Factor`]s that produce
//! residuals over them, then minimized with [`LevenbergMarquardt`].

mod factor;
mod levenberg_marquardt;
mod linear_system;
mod problem;
mod variable;

#[cfg(test)]
mod test_utils;

// Re-exports
pub use factor::{Factor, FactorError, FactorResult, LinearizationResult};
pub use levenberg_marquardt::{
    LevenbergMarquardt, OptimizerError, OptimizerResult, TerminationReason,
};
pub use problem::{Problem, ProblemError};
pub use variable::Variable;
