use std::collections::HashMap;

use nalgebra::{DMatrix, DVector};

use super::factor::{Factor, FactorError};
use super::levenberg_marquardt::OptimizerError;
use super::problem::{Problem, ProblemError};

/// Precomputed variable ordering and dimension layout for optimization.
#[derive(Debug, Clone)]
pub struct VariableLayout {
    pub var_names: Vec<String>,
    pub var_index_map: HashMap<String, usize>,
    pub global_starts: Vec<usize>,
    pub dims: Vec<usize>,
    pub total_dim: usize,
}

impl VariableLayout {
    pub fn from_problem(problem: &Problem) -> Self {
        let variables = problem.get_variables();
        let mut var_names: Vec<String> = variables.keys().cloned().collect();
        var_names.sort();

        let var_index_map: HashMap<String, usize> = var_names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();

        let mut total_dim = 0;
        let mut dims = Vec::with_capacity(var_names.len());
        let mut global_starts = Vec::with_capacity(var_names.len());

        for name in &var_names {
            global_starts.push(total_dim);
            let dim = variables[name].dim();
            dims.push(dim);
            total_dim += dim;
        }

        Self {
            var_names,
            var_index_map,
            global_starts,
            dims,
            total_dim,
        }
    }
}

/// Builds the normal equations `J^T J` and `J^T r` from the factors of a problem.
pub struct LinearSystemBuilder;

impl LinearSystemBuilder {
    /// `jacobian_step` is the relative step used for factors without an analytic Jacobian.
    pub fn build(
        problem: &Problem,
        layout: &VariableLayout,
        jacobian_step: f64,
    ) -> Result<(DMatrix<f64>, DVector<f64>), OptimizerError> {
        let mut jtj = DMatrix::<f64>::zeros(layout.total_dim, layout.total_dim);
        let mut jtr = DVector::<f64>::zeros(layout.total_dim);

        for (factor, factor_var_names) in problem.get_factors() {
            let params = problem.factor_params(factor_var_names)?;
            let result = factor.linearize(&params, true)?;
            let residual_dim = result.residual_dim();

            let mut mapping: Vec<(usize, usize, usize)> =
                Vec::with_capacity(factor_var_names.len());
            let mut factor_col_offset = 0;
            for name in factor_var_names {
                let var_idx = *layout
                    .var_index_map
                    .get(name)
                    .ok_or_else(|| ProblemError::VariableNotFound { name: name.clone() })?;
                let dim = layout.dims[var_idx];
                mapping.push((layout.global_starts[var_idx], dim, factor_col_offset));
                factor_col_offset += dim;
            }
            let cols = factor_col_offset;

            let jacobian = match result.jacobian {
                Some(jacobian) => {
                    if result.jacobian_cols != cols || jacobian.len() != residual_dim * cols {
                        return Err(FactorError::DimensionMismatch {
                            expected: residual_dim * cols,
                            actual: jacobian.len(),
                        }
                        .into());
                    }
                    jacobian
                }
                None => central_difference(&**factor, &params, residual_dim, jacobian_step)?,
            };

            let j = DMatrix::from_row_slice(residual_dim, cols, &jacobian);
            let r = DVector::from_column_slice(&result.residual);
            let local_jtj = j.transpose() * &j;
            let local_jtr = j.transpose() * r;

            for &(start_i, dim_i, offset_i) in &mapping {
                for &(start_j, dim_j, offset_j) in &mapping {
                    let mut block = jtj.view_mut((start_i, start_j), (dim_i, dim_j));
                    block += local_jtj.view((offset_i, offset_j), (dim_i, dim_j));
                }
                let mut block = jtr.rows_mut(start_i, dim_i);
                block += local_jtr.rows(offset_i, dim_i);
            }
        }

        Ok((jtj, jtr))
    }
}

/// Row-major Jacobian of a factor's residual by central differences.
///
/// Each parameter is perturbed by `step * max(1, |x|)`.
pub(crate) fn central_difference(
    factor: &dyn Factor,
    params: &[&[f64]],
    residual_dim: usize,
    step: f64,
) -> Result<Vec<f64>, FactorError> {
    let cols: usize = params.iter().map(|p| p.len()).sum();
    let mut jacobian = vec![0.0; residual_dim * cols];
    let mut owned: Vec<Vec<f64>> = params.iter().map(|p| p.to_vec()).collect();

    let evaluate = |values: &[Vec<f64>]| -> Result<Vec<f64>, FactorError> {
        let refs: Vec<&[f64]> = values.iter().map(Vec::as_slice).collect();
        let residual = factor.linearize(&refs, false)?.residual;
        if residual.len() != residual_dim {
            return Err(FactorError::DimensionMismatch {
                expected: residual_dim,
                actual: residual.len(),
            });
        }
        Ok(residual)
    };

    let mut col = 0;
    for var_idx in 0..owned.len() {
        for k in 0..owned[var_idx].len() {
            let x = owned[var_idx][k];
            let h = step * x.abs().max(1.0);

            owned[var_idx][k] = x + h;
            let forward = evaluate(&owned)?;
            owned[var_idx][k] = x - h;
            let backward = evaluate(&owned)?;
            owned[var_idx][k] = x;

            for row in 0..residual_dim {
                let d = (forward[row] - backward[row]) / (2.0 * h);
                if !d.is_finite() {
                    return Err(FactorError::JacobianFailed(format!(
                        "non-finite derivative for parameter {col}"
                    )));
                }
                jacobian[row * cols + col] = d;
            }
            col += 1;
        }
    }

    Ok(jacobian)
}
