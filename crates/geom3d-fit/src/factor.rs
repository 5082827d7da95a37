use geom3d_algebra::Point;
use geom3d_optim::{Factor, FactorError, FactorResult, LinearizationResult};

use crate::params::Fittable;

/// Residuals of every data point against a shape whose free parameters are the single
/// connected variable.
///
/// No analytic Jacobian is provided; the solver differentiates numerically.
pub(crate) struct ShapeFactor<S: Fittable> {
    points: Vec<Point>,
    base: S,
    free: Vec<S::Param>,
}

impl<S: Fittable> ShapeFactor<S> {
    pub(crate) fn new(points: Vec<Point>, base: S, free: Vec<S::Param>) -> Self {
        Self { points, base, free }
    }

    /// The base shape with `values` written into the free parameters.
    pub(crate) fn shape_with(&self, values: &[f64]) -> S {
        let mut shape = self.base.clone();
        for (param, value) in self.free.iter().zip(values) {
            shape.set(*param, *value);
        }
        shape
    }
}

impl<S: Fittable> Factor for ShapeFactor<S> {
    fn linearize(
        &self,
        params: &[&[f64]],
        _compute_jacobian: bool,
    ) -> FactorResult<LinearizationResult> {
        let [values] = params else {
            return Err(FactorError::DimensionMismatch {
                expected: 1,
                actual: params.len(),
            });
        };
        if values.len() != self.free.len() {
            return Err(FactorError::DimensionMismatch {
                expected: self.free.len(),
                actual: values.len(),
            });
        }

        let shape = self.shape_with(values);
        let mut residual = Vec::with_capacity(self.residual_dim());
        for point in &self.points {
            shape
                .residuals(*point, &mut residual)
                .map_err(|e| FactorError::InvalidParameters(e.to_string()))?;
        }

        Ok(LinearizationResult::residual_only(residual, self.free.len()))
    }

    fn residual_dim(&self) -> usize {
        self.points.len() * S::RESIDUAL_DIM
    }

    fn num_variables(&self) -> usize {
        1
    }

    fn variable_dim(&self, _idx: usize) -> usize {
        self.free.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::Circle2DParam;
    use geom3d_algebra::Circle2D;

    #[test]
    fn test_shape_factor_residuals() -> Result<(), Box<dyn std::error::Error>> {
        let points = vec![Point::new(2.0, 0.0, 0.0), Point::new(0.0, 3.0, 0.0)];
        let factor = ShapeFactor::new(
            points,
            Circle2D::new(Point::ZERO, 1.0),
            vec![Circle2DParam::Radius],
        );

        assert_eq!(factor.residual_dim(), 2);
        assert_eq!(factor.total_dim(), 1);

        let radius = [2.0];
        let result = factor.linearize(&[&radius[..]], true)?;
        assert!(result.jacobian.is_none());
        assert_eq!(result.residual, vec![0.0, 1.0]);
        Ok(())
    }
}
