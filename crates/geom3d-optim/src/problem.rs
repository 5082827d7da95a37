//! Optimization problem definition

use std::collections::HashMap;
use std::fmt;

use thiserror::Error;

use super::factor::{Factor, FactorError};
use super::variable::Variable;

/// Errors raised while building or evaluating a problem.
#[derive(Debug, Error)]
pub enum ProblemError {
    /// A variable with this name is already registered
    #[error("Variable '{name}' already exists")]
    DuplicateVariable { name: String },

    /// A factor references an unknown variable
    #[error("Variable '{name}' not found")]
    VariableNotFound { name: String },

    /// Values or factor connections have the wrong size
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// A factor failed to evaluate
    #[error("Factor evaluation failed: {0}")]
    FactorEvaluation(#[from] FactorError),
}

/// A least-squares problem: named variables and the factors that constrain them.
#[derive(Default)]
pub struct Problem {
    variables: HashMap<String, Variable>,
    factors: Vec<(Box<dyn Factor>, Vec<String>)>,
}

impl Problem {
    /// Create an empty problem.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a variable with its initial values.
    pub fn add_variable(
        &mut self,
        mut var: Variable,
        initial_values: Vec<f64>,
    ) -> Result<(), ProblemError> {
        if self.variables.contains_key(&var.name) {
            return Err(ProblemError::DuplicateVariable { name: var.name });
        }
        if initial_values.len() != var.dim() {
            return Err(ProblemError::DimensionMismatch {
                expected: var.dim(),
                actual: initial_values.len(),
            });
        }
        var.values = initial_values;
        self.variables.insert(var.name.clone(), var);
        Ok(())
    }

    /// Add a factor connecting the named variables, in the order the factor expects them.
    pub fn add_factor(
        &mut self,
        factor: Box<dyn Factor>,
        var_names: Vec<String>,
    ) -> Result<(), ProblemError> {
        if var_names.len() != factor.num_variables() {
            return Err(ProblemError::DimensionMismatch {
                expected: factor.num_variables(),
                actual: var_names.len(),
            });
        }
        for (idx, name) in var_names.iter().enumerate() {
            let var = self
                .variables
                .get(name)
                .ok_or_else(|| ProblemError::VariableNotFound { name: name.clone() })?;
            if var.dim() != factor.variable_dim(idx) {
                return Err(ProblemError::DimensionMismatch {
                    expected: factor.variable_dim(idx),
                    actual: var.dim(),
                });
            }
        }
        self.factors.push((factor, var_names));
        Ok(())
    }

    /// Registered variables by name.
    pub fn get_variables(&self) -> &HashMap<String, Variable> {
        &self.variables
    }

    /// Mutable access to the registered variables.
    pub fn get_variables_mut(&mut self) -> &mut HashMap<String, Variable> {
        &mut self.variables
    }

    /// Current values of a variable.
    pub fn variable_values(&self, name: &str) -> Option<&[f64]> {
        self.variables.get(name).map(|v| v.values.as_slice())
    }

    /// Factors with the names of the variables they connect.
    pub fn get_factors(&self) -> &[(Box<dyn Factor>, Vec<String>)] {
        &self.factors
    }

    /// Total number of scalar residuals.
    pub fn residual_dim(&self) -> usize {
        self.factors.iter().map(|(f, _)| f.residual_dim()).sum()
    }

    /// Gather the current values of the variables a factor connects.
    pub(crate) fn factor_params(&self, var_names: &[String]) -> Result<Vec<&[f64]>, ProblemError> {
        var_names
            .iter()
            .map(|name| {
                self.variable_values(name)
                    .ok_or_else(|| ProblemError::VariableNotFound { name: name.clone() })
            })
            .collect()
    }

    /// Sum of squared residuals over all factors at the current values.
    pub fn compute_total_cost(&self) -> Result<f64, ProblemError> {
        let mut cost = 0.0;
        for (factor, var_names) in &self.factors {
            let params = self.factor_params(var_names)?;
            let result = factor.linearize(&params, false)?;
            cost += result.residual.iter().map(|r| r * r).sum::<f64>();
        }
        Ok(cost)
    }
}

impl fmt::Debug for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Problem")
            .field("variables", &self.variables)
            .field("num_factors", &self.factors.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::PriorFactor;
    use approx::assert_relative_eq;

    #[test]
    fn test_add_variable() -> Result<(), Box<dyn std::error::Error>> {
        let mut problem = Problem::new();
        problem.add_variable(Variable::euclidean("x", 2), vec![1.0, 2.0])?;

        assert_eq!(problem.variable_values("x"), Some([1.0, 2.0].as_slice()));
        assert!(matches!(
            problem.add_variable(Variable::euclidean("x", 2), vec![0.0, 0.0]),
            Err(ProblemError::DuplicateVariable { .. })
        ));
        assert!(matches!(
            problem.add_variable(Variable::euclidean("y", 2), vec![0.0]),
            Err(ProblemError::DimensionMismatch {
                expected: 2,
                actual: 1
            })
        ));
        Ok(())
    }

    #[test]
    fn test_add_factor_checks() -> Result<(), Box<dyn std::error::Error>> {
        let mut problem = Problem::new();
        problem.add_variable(Variable::euclidean("x", 2), vec![0.0, 0.0])?;

        let missing = problem.add_factor(
            Box::new(PriorFactor::new(vec![1.0, 1.0])),
            vec!["y".to_string()],
        );
        assert!(matches!(missing, Err(ProblemError::VariableNotFound { .. })));

        let wrong_dim = problem.add_factor(
            Box::new(PriorFactor::new(vec![1.0, 1.0, 1.0])),
            vec!["x".to_string()],
        );
        assert!(matches!(
            wrong_dim,
            Err(ProblemError::DimensionMismatch { .. })
        ));

        problem.add_factor(
            Box::new(PriorFactor::new(vec![1.0, 1.0])),
            vec!["x".to_string()],
        )?;
        assert_eq!(problem.get_factors().len(), 1);
        assert_eq!(problem.residual_dim(), 2);
        Ok(())
    }

    #[test]
    fn test_total_cost() -> Result<(), Box<dyn std::error::Error>> {
        let mut problem = Problem::new();
        problem.add_variable(Variable::euclidean("x", 2), vec![1.0, 3.0])?;
        problem.add_factor(
            Box::new(PriorFactor::new(vec![0.0, 1.0])),
            vec!["x".to_string()],
        )?;

        // 1^2 + 2^2
        assert_relative_eq!(problem.compute_total_cost()?, 5.0);
        Ok(())
    }
}
