use geom3d_algebra::GeometryError;
use geom3d_optim::OptimizerError;
use thiserror::Error;

/// Errors raised by a fitting session.
#[derive(Debug, Error)]
pub enum FitError {
    /// A geometric operation on the inputs or the fitted shape failed.
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    /// The least-squares solver could not run.
    #[error(transparent)]
    Optimizer(#[from] OptimizerError),

    /// The session was given no points to fit.
    #[error("No points to fit")]
    NoPoints,

    /// Every parameter of the shape is held fixed.
    #[error("No free parameters selected")]
    NoFreeParameters,
}
