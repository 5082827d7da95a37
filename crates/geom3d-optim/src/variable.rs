//! Variables for least-squares optimization
//!
//! Variables are the named Euclidean parameter blocks an optimizer updates.

/// A variable in an optimization problem.
#[derive(Debug, Clone)]
pub struct Variable {
    /// Name of the variable (used for referencing in factors)
    pub name: String,
    /// Degrees of freedom
    pub dim: usize,
    /// Current parameter values
    pub values: Vec<f64>,
}

impl Variable {
    /// Create a new Euclidean variable.
    ///
    /// # Arguments
    ///
    /// * `name` - Name of the variable
    /// * `dim` - Dimension (e.g., 3 for a 3D point)
    pub fn euclidean(name: impl Into<String>, dim: usize) -> Self {
        Self {
            name: name.into(),
            dim,
            values: vec![0.0; dim],
        }
    }

    /// Get the dimension (degrees of freedom) of this variable.
    pub fn dim(&self) -> usize {
        self.dim
    }
}
