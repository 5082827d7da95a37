use thiserror::Error;

/// Error types for the geometry kernel.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    /// A zero-length direction, colinear points or parallel planes were supplied where a
    /// well-defined direction, angle or intersection is required.
    #[error("Degenerate input: {0}")]
    DegenerateInput(String),

    /// The shapes of two batched operands cannot be combined.
    #[error("Shape mismatch: expected {expected} rows, got {actual}")]
    ShapeMismatch {
        /// Number of rows (or values) required by the operation.
        expected: usize,
        /// Number of rows (or values) supplied.
        actual: usize,
    },

    /// A dictionary export could not be read back because a key was missing.
    #[error("Missing key '{0}'")]
    MissingKey(String),
}

impl GeometryError {
    pub(crate) fn degenerate(reason: impl Into<String>) -> Self {
        GeometryError::DegenerateInput(reason.into())
    }
}

/// Result type alias for the geometry kernel.
pub type Result<T> = std::result::Result<T, GeometryError>;
