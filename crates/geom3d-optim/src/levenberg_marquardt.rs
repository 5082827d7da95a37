//! Levenberg-Marquardt optimizer for non-linear least squares optimization
//!
//! The Levenberg-Marquardt algorithm is a trust-region method that combines
//! the advantages of gradient descent and Gauss-Newton methods. It solves
//! the damped normal equations: (J^T J + λI) δ = -J^T r

use nalgebra::{DMatrix, DVector};
use thiserror::Error;

use super::factor::FactorError;
use super::linear_system::{LinearSystemBuilder, VariableLayout};
use super::problem::{Problem, ProblemError};

/// Errors that can occur during optimization.
#[derive(Debug, Error)]
pub enum OptimizerError {
    /// Problem-related error
    #[error("Problem error: {0}")]
    Problem(#[from] ProblemError),

    /// Factor evaluation failed
    #[error("Factor evaluation failed: {0}")]
    Factor(#[from] FactorError),

    /// Linear system solve failed (singular matrix)
    #[error("Linear system solve failed: {0}")]
    SolveFailed(String),

    /// Numerical instability detected
    #[error("Numerical instability: {0}")]
    NumericalInstability(String),
}

/// Result of an optimization run.
#[derive(Debug, Clone)]
pub struct OptimizerResult {
    /// Final cost (sum of squared residuals)
    pub final_cost: f64,
    /// Number of iterations performed
    pub iterations: usize,
    /// Reason for termination
    pub termination_reason: TerminationReason,
}

/// Reason why the optimizer terminated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TerminationReason {
    /// Converged: cost change below tolerance
    CostConverged,
    /// Converged: gradient norm below tolerance
    GradientConverged,
    /// Converged: step norm below tolerance
    StepConverged,
    /// Maximum iterations reached
    MaxIterations,
    /// Lambda exceeded maximum (likely numerical issues)
    LambdaMaxExceeded,
}

impl TerminationReason {
    /// Whether the run stopped on one of the convergence criteria.
    pub fn is_converged(&self) -> bool {
        matches!(
            self,
            TerminationReason::CostConverged
                | TerminationReason::GradientConverged
                | TerminationReason::StepConverged
        )
    }
}

/// Levenberg-Marquardt optimizer configuration.
#[derive(Debug, Clone)]
pub struct LevenbergMarquardt {
    /// Initial damping parameter
    pub lambda_init: f64,
    /// Maximum damping parameter
    pub lambda_max: f64,
    /// Factor for lambda adaptation
    pub lambda_factor: f64,
    /// Maximum number of iterations
    pub max_iterations: usize,
    /// Convergence threshold for relative cost change
    pub cost_tolerance: f64,
    /// Convergence threshold for gradient norm
    pub gradient_tolerance: f64,
    /// Convergence threshold for the step norm, relative to the parameter norm
    pub step_tolerance: f64,
    /// Relative step for numerical Jacobians
    pub jacobian_step: f64,
}

impl Default for LevenbergMarquardt {
    fn default() -> Self {
        Self {
            lambda_init: 1e-3,
            lambda_max: 1e10,
            lambda_factor: 10.0,
            max_iterations: 50,
            cost_tolerance: 1e-6,
            gradient_tolerance: 1e-6,
            step_tolerance: 1e-12,
            jacobian_step: 1e-6,
        }
    }
}

impl LevenbergMarquardt {
    /// Smallest damping value lambda can decay to.
    const LAMBDA_MIN: f64 = 1e-10;

    /// Set the initial damping parameter.
    pub fn with_lambda_init(mut self, lambda_init: f64) -> Self {
        self.lambda_init = lambda_init;
        self
    }

    /// Set the maximum number of iterations.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Set the relative cost change threshold.
    pub fn with_cost_tolerance(mut self, cost_tolerance: f64) -> Self {
        self.cost_tolerance = cost_tolerance;
        self
    }

    /// Set the gradient norm threshold.
    pub fn with_gradient_tolerance(mut self, gradient_tolerance: f64) -> Self {
        self.gradient_tolerance = gradient_tolerance;
        self
    }

    /// Set the relative step norm threshold.
    pub fn with_step_tolerance(mut self, step_tolerance: f64) -> Self {
        self.step_tolerance = step_tolerance;
        self
    }

    /// Set the relative step used for numerical Jacobians.
    pub fn with_jacobian_step(mut self, jacobian_step: f64) -> Self {
        self.jacobian_step = jacobian_step;
        self
    }

    /// Minimize the problem in place, leaving the best parameters found in its variables.
    pub fn optimize(&self, problem: &mut Problem) -> Result<OptimizerResult, OptimizerError> {
        if problem.get_variables().is_empty() {
            return Err(OptimizerError::NumericalInstability(
                "No variables in problem".to_string(),
            ));
        }

        if problem.get_factors().is_empty() {
            return Err(OptimizerError::NumericalInstability(
                "No factors in problem".to_string(),
            ));
        }

        let layout = VariableLayout::from_problem(problem);
        if layout.total_dim == 0 {
            return Err(OptimizerError::NumericalInstability(
                "Total parameter dimension is zero".to_string(),
            ));
        }

        let mut current_cost = problem.compute_total_cost()?;
        if !current_cost.is_finite() {
            return Err(OptimizerError::NumericalInstability(
                "Initial cost is not finite".to_string(),
            ));
        }

        let mut lambda = self.lambda_init;
        let mut iterations = 0;

        loop {
            if iterations >= self.max_iterations {
                return Ok(self.finish(current_cost, iterations, TerminationReason::MaxIterations));
            }

            // Build normal equations: J^T J and J^T r
            let (jtj, jtr) = LinearSystemBuilder::build(problem, &layout, self.jacobian_step)?;

            let gradient_norm = jtr.norm();
            if gradient_norm < self.gradient_tolerance {
                return Ok(self.finish(
                    current_cost,
                    iterations,
                    TerminationReason::GradientConverged,
                ));
            }

            let delta = self.solve_damped_system(jtj, &jtr, lambda)?;

            let param_norm = Self::parameter_norm(problem, &layout);
            if delta.norm() <= self.step_tolerance * (param_norm + self.step_tolerance) {
                return Ok(self.finish(current_cost, iterations, TerminationReason::StepConverged));
            }

            let snapshot = self.apply_step(problem, &layout, &delta)?;
            let new_cost = problem.compute_total_cost()?;
            iterations += 1;

            if new_cost.is_finite() && new_cost < current_cost {
                let relative_cost_change = (current_cost - new_cost) / current_cost;
                current_cost = new_cost;
                lambda = (lambda / self.lambda_factor).max(Self::LAMBDA_MIN);

                log::debug!(
                    "LM iteration {iterations}: accepted, cost {current_cost:.6e}, lambda {lambda:.1e}"
                );

                if relative_cost_change < self.cost_tolerance {
                    return Ok(self.finish(
                        current_cost,
                        iterations,
                        TerminationReason::CostConverged,
                    ));
                }
            } else {
                // Step did not improve the cost: restore and increase damping
                self.revert_step(problem, &layout, snapshot)?;
                lambda *= self.lambda_factor;

                log::debug!(
                    "LM iteration {iterations}: rejected, cost {current_cost:.6e}, lambda {lambda:.1e}"
                );

                if lambda > self.lambda_max {
                    return Ok(self.finish(
                        current_cost,
                        iterations,
                        TerminationReason::LambdaMaxExceeded,
                    ));
                }
            }
        }
    }

    fn finish(
        &self,
        final_cost: f64,
        iterations: usize,
        termination_reason: TerminationReason,
    ) -> OptimizerResult {
        log::debug!(
            "LM finished after {iterations} iterations ({termination_reason:?}), cost {final_cost:.6e}"
        );
        OptimizerResult {
            final_cost,
            iterations,
            termination_reason,
        }
    }

    /// Solve the damped system (J^T J + λI) δ = -J^T r.
    fn solve_damped_system(
        &self,
        mut jtj: DMatrix<f64>,
        jtr: &DVector<f64>,
        lambda: f64,
    ) -> Result<DVector<f64>, OptimizerError> {
        for i in 0..jtj.nrows() {
            jtj[(i, i)] += lambda;
        }

        let rhs = -jtr;
        let delta = jtj
            .lu()
            .solve(&rhs)
            .ok_or_else(|| OptimizerError::SolveFailed("LU solve failed".to_string()))?;

        if delta.iter().any(|d| !d.is_finite()) {
            return Err(OptimizerError::NumericalInstability(
                "Non-finite step".to_string(),
            ));
        }

        Ok(delta)
    }

    fn parameter_norm(problem: &Problem, layout: &VariableLayout) -> f64 {
        layout
            .var_names
            .iter()
            .filter_map(|name| problem.variable_values(name))
            .flatten()
            .map(|v| v * v)
            .sum::<f64>()
            .sqrt()
    }

    /// Add the step to every variable, returning the previous values.
    fn apply_step(
        &self,
        problem: &mut Problem,
        layout: &VariableLayout,
        delta: &DVector<f64>,
    ) -> Result<Vec<Vec<f64>>, OptimizerError> {
        let variables = problem.get_variables_mut();
        let mut snapshot = Vec::with_capacity(layout.var_names.len());

        for (idx, var_name) in layout.var_names.iter().enumerate() {
            let var = variables
                .get_mut(var_name)
                .ok_or_else(|| ProblemError::VariableNotFound {
                    name: var_name.clone(),
                })?;

            snapshot.push(var.values.clone());

            let start = layout.global_starts[idx];
            let block = &delta.as_slice()[start..start + layout.dims[idx]];
            for (value, step) in var.values.iter_mut().zip(block) {
                *value += step;
            }
        }

        Ok(snapshot)
    }

    /// Revert the step to the previous values.
    fn revert_step(
        &self,
        problem: &mut Problem,
        layout: &VariableLayout,
        snapshot: Vec<Vec<f64>>,
    ) -> Result<(), OptimizerError> {
        let variables = problem.get_variables_mut();

        for (var_name, old_vals) in layout.var_names.iter().zip(snapshot) {
            let var = variables
                .get_mut(var_name)
                .ok_or_else(|| ProblemError::VariableNotFound {
                    name: var_name.clone(),
                })?;
            var.values = old_vals;
        }

        Ok(())
    }
}
