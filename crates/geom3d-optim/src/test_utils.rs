//! Factors shared by the solver unit tests.

use crate::factor::{Factor, FactorError, FactorResult, LinearizationResult};

/// A simple prior factor that penalizes deviation from a target value.
///
/// Residual: r = x - target
#[derive(Debug, Clone)]
pub(crate) struct PriorFactor {
    /// Target value
    pub(crate) target: Vec<f64>,
}

impl PriorFactor {
    /// Create a new prior factor
    pub(crate) fn new(target: Vec<f64>) -> Self {
        Self { target }
    }
}

impl Factor for PriorFactor {
    fn linearize(
        &self,
        params: &[&[f64]],
        compute_jacobian: bool,
    ) -> FactorResult<LinearizationResult> {
        let [x] = params else {
            return Err(FactorError::DimensionMismatch {
                expected: 1,
                actual: params.len(),
            });
        };
        if x.len() != self.target.len() {
            return Err(FactorError::DimensionMismatch {
                expected: self.target.len(),
                actual: x.len(),
            });
        }

        let residual: Vec<f64> = x.iter().zip(&self.target).map(|(xi, ti)| xi - ti).collect();

        // Jacobian is the identity
        let jacobian = compute_jacobian.then(|| {
            let n = x.len();
            let mut jac = vec![0.0; n * n];
            for i in 0..n {
                jac[i * n + i] = 1.0;
            }
            jac
        });

        Ok(LinearizationResult::new(residual, jacobian, x.len()))
    }

    fn residual_dim(&self) -> usize {
        self.target.len()
    }

    fn num_variables(&self) -> usize {
        1
    }

    fn variable_dim(&self, _idx: usize) -> usize {
        self.target.len()
    }
}

mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_prior_factor() -> Result<(), Box<dyn std::error::Error>> {
        let factor = PriorFactor::new(vec![1.0, 2.0, 3.0]);
        let params = [1.5, 2.5, 3.5];

        let result = factor.linearize(&[&params], true)?;

        assert_eq!(result.residual_dim(), 3);
        for r in &result.residual {
            assert_relative_eq!(*r, 0.5);
        }
        let jacobian = result.jacobian.ok_or("missing jacobian")?;
        assert_eq!(
            jacobian,
            vec![1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0]
        );
        Ok(())
    }

    #[test]
    fn test_prior_factor_wrong_dim() {
        let factor = PriorFactor::new(vec![1.0, 2.0]);
        let params = [1.0];
        assert!(matches!(
            factor.linearize(&[&params], false),
            Err(FactorError::DimensionMismatch {
                expected: 2,
                actual: 1
            })
        ));
    }
}
