//! Factor trait for least-squares optimization
//!
//! Factors represent constraints or measurements. Each factor computes a residual (error)
//! and optionally a Jacobian with respect to the connected variables. A factor that does
//! not provide a Jacobian is differentiated numerically by the optimizer.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FactorError {
    /// Invalid dimension mismatch
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Jacobian computation failed
    #[error("Jacobian computation failed: {0}")]
    JacobianFailed(String),

    /// Invalid parameter values
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),
}

/// Result type for factor operations
pub type FactorResult<T> = Result<T, FactorError>;

/// Output of factor linearization
#[derive(Debug, Clone)]
pub struct LinearizationResult {
    /// Residual vector (error)
    pub residual: Vec<f64>,
    /// Jacobian matrix (row-major, flattened)
    /// Shape: (residual_dim, jacobian_cols)
    pub jacobian: Option<Vec<f64>>,
    /// Number of Jacobian columns (total dimension of the connected variables)
    pub jacobian_cols: usize,
}

impl LinearizationResult {
    /// Create a new linearization result
    pub fn new(residual: Vec<f64>, jacobian: Option<Vec<f64>>, jacobian_cols: usize) -> Self {
        Self {
            residual,
            jacobian,
            jacobian_cols,
        }
    }

    /// A result carrying only the residual.
    pub fn residual_only(residual: Vec<f64>, jacobian_cols: usize) -> Self {
        Self::new(residual, None, jacobian_cols)
    }

    /// Get the residual dimension
    pub fn residual_dim(&self) -> usize {
        self.residual.len()
    }
}

/// Trait for factor (constraint) implementations.
///
/// # Implementing Custom Factors
///
/// 1. Define the residual function `r(x)` from the connected variable values
/// 2. Return the Jacobian `J = ∂r/∂x` when asked, or `None` to let the optimizer
///    differentiate `r` by central differences
/// 3. Report the residual and variable dimensions
pub trait Factor: Send + Sync {
    /// Compute the residual and optionally the Jacobian at the given parameter values.
    ///
    /// # Arguments
    ///
    /// * `params` - Slice of variable values (one slice per connected variable)
    /// * `compute_jacobian` - Whether a Jacobian is requested
    fn linearize(&self, params: &[&[f64]], compute_jacobian: bool)
        -> FactorResult<LinearizationResult>;

    /// Get the dimension of the residual vector.
    fn residual_dim(&self) -> usize;

    /// Get the number of variables this factor connects.
    fn num_variables(&self) -> usize;

    /// Get the dimension of a specific connected variable.
    fn variable_dim(&self, idx: usize) -> usize;

    /// Get the total dimension of all connected variables.
    fn total_dim(&self) -> usize {
        (0..self.num_variables()).map(|i| self.variable_dim(i)).sum()
    }
}
