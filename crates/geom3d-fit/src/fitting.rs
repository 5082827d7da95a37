//! Fitting sessions and the staged 3D circle fit.

use geom3d_algebra::{mean_point, Circle2D, Circle3D, Plane, Point};
use geom3d_optim::{LevenbergMarquardt, Problem, TerminationReason, Variable};
use nalgebra::{Matrix3, Vector3};

use crate::error::FitError;
use crate::factor::ShapeFactor;
use crate::params::{Circle2DParam, Fittable, VectorParam};

const PARAMS_VARIABLE: &str = "params";

/// Lifecycle of a [`DataFitting`] session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitState {
    /// Points and initial shape bound, default free parameters.
    Created,
    /// Free parameters or solver chosen explicitly.
    Configured,
    /// A fit has run and its parameters were written back.
    Solved,
}

/// Outcome of [`DataFitting::run_fit`].
#[derive(Debug, Clone, PartialEq)]
pub struct FitReport {
    /// Why the solver stopped.
    pub termination_reason: TerminationReason,
    /// Number of solver iterations.
    pub iterations: usize,
    /// Final sum of squared residuals.
    pub final_cost: f64,
    /// Fitted values of the free parameters, in selection order.
    pub parameters: Vec<f64>,
}

impl FitReport {
    /// Whether the solver stopped on a convergence criterion.
    pub fn converged(&self) -> bool {
        self.termination_reason.is_converged()
    }
}

/// Least-squares fit of a shape to a set of points.
///
/// The session owns its working copy of the shape. Running the fit adjusts the selected
/// free parameters to minimise the residuals of every point against the shape, holding
/// the rest at their initial values.
///
/// # Example
///
/// ```
/// use geom3d_algebra::{Circle2D, Point};
/// use geom3d_fit::DataFitting;
///
/// let points = vec![
///     Point::new(1.0, 1.0, 0.0),
///     Point::new(1.0, -1.0, 0.0),
///     Point::new(-1.0, -1.0, 0.0),
///     Point::new(-1.0, 1.0, 0.0),
/// ];
/// let mut fit = DataFitting::new(points, Circle2D::new(Point::new(0.5, 0.5, 0.0), 2.0));
/// let report = fit.run_fit().unwrap();
///
/// assert!(report.converged());
/// assert!((fit.shape().radius - 2f64.sqrt()).abs() < 1e-6);
/// ```
#[derive(Debug, Clone)]
pub struct DataFitting<S: Fittable> {
    points: Vec<Point>,
    shape: S,
    free: Vec<S::Param>,
    solver: LevenbergMarquardt,
    state: FitState,
    report: Option<FitReport>,
}

impl<S: Fittable> DataFitting<S> {
    /// Bind `points` to an initial guess, freeing the parameters the shape declares
    /// fittable.
    pub fn new(points: impl Into<Vec<Point>>, initial_shape: S) -> Self {
        Self {
            points: points.into(),
            shape: initial_shape,
            free: S::fittable().to_vec(),
            solver: LevenbergMarquardt::default(),
            state: FitState::Created,
            report: None,
        }
    }

    /// Select the free parameters. Duplicates are dropped, first occurrence wins.
    pub fn set_free_parameters(&mut self, params: &[S::Param]) {
        self.free.clear();
        for param in params {
            if !self.free.contains(param) {
                self.free.push(*param);
            }
        }
        self.state = FitState::Configured;
    }

    /// Builder form of [`DataFitting::set_free_parameters`].
    pub fn with_free_parameters(mut self, params: &[S::Param]) -> Self {
        self.set_free_parameters(params);
        self
    }

    /// Use a configured solver instead of the default.
    pub fn with_solver(mut self, solver: LevenbergMarquardt) -> Self {
        self.solver = solver;
        if self.state == FitState::Created {
            self.state = FitState::Configured;
        }
        self
    }

    /// The data points.
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// The current shape: the initial guess before a fit, the fitted shape after.
    pub fn shape(&self) -> &S {
        &self.shape
    }

    /// Consume the session and return its shape.
    pub fn into_shape(self) -> S {
        self.shape
    }

    /// The selected free parameters.
    pub fn free_parameters(&self) -> &[S::Param] {
        &self.free
    }

    /// Current lifecycle state.
    pub fn state(&self) -> FitState {
        self.state
    }

    /// Report of the last fit, if any.
    pub fn report(&self) -> Option<&FitReport> {
        self.report.as_ref()
    }

    /// Sum of the unit costs of every point against the current shape.
    pub fn total_unit_cost(&self) -> f64 {
        self.points.iter().map(|p| self.shape.unit_cost(*p)).sum()
    }

    /// Solve for the free parameters and write them back into the shape.
    ///
    /// Non-convergence is not an error: the best parameters found are still applied and
    /// the report says why the solver stopped.
    pub fn run_fit(&mut self) -> Result<FitReport, FitError> {
        if self.points.is_empty() {
            return Err(FitError::NoPoints);
        }
        if self.free.is_empty() {
            return Err(FitError::NoFreeParameters);
        }

        let initial: Vec<f64> = self.free.iter().map(|p| self.shape.get(*p)).collect();
        let factor = ShapeFactor::new(self.points.clone(), self.shape.clone(), self.free.clone());

        let mut problem = Problem::new();
        problem
            .add_variable(Variable::euclidean(PARAMS_VARIABLE, initial.len()), initial)
            .map_err(geom3d_optim::OptimizerError::from)?;
        problem
            .add_factor(Box::new(factor), vec![PARAMS_VARIABLE.to_string()])
            .map_err(geom3d_optim::OptimizerError::from)?;

        let result = self.solver.optimize(&mut problem)?;

        let parameters = problem
            .variable_values(PARAMS_VARIABLE)
            .map(<[f64]>::to_vec)
            .unwrap_or_default();
        for (param, value) in self.free.iter().zip(&parameters) {
            self.shape.set(*param, *value);
        }

        let report = FitReport {
            termination_reason: result.termination_reason,
            iterations: result.iterations,
            final_cost: result.final_cost,
            parameters,
        };
        if !report.converged() {
            log::warn!(
                "fit did not converge ({:?}) after {} iterations, cost {:.6e}",
                report.termination_reason,
                report.iterations,
                report.final_cost
            );
        }

        self.state = FitState::Solved;
        self.report = Some(report.clone());
        Ok(report)
    }
}

/// Fit a circle to points in space with the default solver.
///
/// See [`fit_circle_3d_with`].
pub fn fit_circle_3d(points: &[Point]) -> Result<Circle3D, FitError> {
    fit_circle_3d_with(points, &LevenbergMarquardt::default())
}

/// Fit a circle to points in space in two stages.
///
/// A plane through the centroid is fitted first (normal only, seeded from the point
/// scatter), then a circle is fitted
/// to the points expressed in a frame on that plane. The result has its frame origin on
/// the fitted centre.
pub fn fit_circle_3d_with(
    points: &[Point],
    solver: &LevenbergMarquardt,
) -> Result<Circle3D, FitError> {
    if points.is_empty() {
        return Err(FitError::NoPoints);
    }

    let centroid = mean_point(points)?;
    let seed = Plane::new(centroid, plane_normal_seed(points, centroid));
    let mut plane_fit = DataFitting::new(points, seed)
        .with_free_parameters(&VectorParam::DIRECTION)
        .with_solver(solver.clone());
    let plane_report = plane_fit.run_fit()?;
    let plane = plane_fit.into_shape();
    log::debug!(
        "circle fit: plane stage {:?}, normal {}",
        plane_report.termination_reason,
        plane.normal()
    );

    let mut circle = Circle3D::from_axis(plane.as_vector(), 1.0)?;
    let local: Vec<Point> = points.iter().map(|p| circle.frame().to_local(*p)).collect();

    let mut circle_fit = DataFitting::new(local.as_slice(), Circle2D::new(mean_point(&local)?, 1.0))
        .with_free_parameters(&Circle2DParam::ALL)
        .with_solver(solver.clone());
    let circle_report = circle_fit.run_fit()?;
    log::debug!(
        "circle fit: circle stage {:?}, radius {:.6}",
        circle_report.termination_reason,
        circle_fit.shape().radius
    );

    circle.set_circle(circle_fit.into_shape());
    circle.refresh_centre();
    Ok(circle)
}

/// Initial plane normal: the eigenvector of the smallest eigenvalue of the centred scatter
/// matrix, oriented towards `+z`. Falls back to `Point::Z` when the points do not spread.
fn plane_normal_seed(points: &[Point], centroid: Point) -> Point {
    let mut scatter = Matrix3::<f64>::zeros();
    for p in points {
        let d = *p - centroid;
        let d = Vector3::new(d.x, d.y, d.z);
        scatter += d * d.transpose();
    }
    if scatter.norm() < f64::EPSILON {
        return Point::Z;
    }

    let eig = scatter.symmetric_eigen();
    let smallest = eig
        .eigenvalues
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.total_cmp(b.1))
        .map(|(index, _)| index)
        .unwrap_or(2);
    let column = eig.eigenvectors.column(smallest);
    let normal = Point::new(column[0], column[1], column[2]);

    if !normal.is_finite() || normal.magnitude() < f64::EPSILON {
        return Point::Z;
    }
    if normal.z < 0.0 {
        -normal
    } else {
        normal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use geom3d_algebra::{distance_to_plane, distance_to_vector, Vector, PARALLEL_TOLERANCE};

    fn diagonal(sign: f64) -> Vec<Point> {
        (0..5)
            .map(|i| {
                let t = 2.5 * i as f64;
                Point::new(t, sign * t, 0.0)
            })
            .collect()
    }

    fn square() -> Vec<Point> {
        vec![
            Point::new(1.0, 1.0, 0.0),
            Point::new(1.0, -1.0, 0.0),
            Point::new(-1.0, -1.0, 0.0),
            Point::new(-1.0, 1.0, 0.0),
        ]
    }

    #[test]
    fn test_fit_vector() -> Result<(), Box<dyn std::error::Error>> {
        let points = diagonal(1.0);
        let mut fit = DataFitting::new(points.clone(), Vector::new(mean_point(&points)?, Point::X));
        fit.run_fit()?;

        let direction = fit.shape().direction;
        let target = Point::new(1.0, 1.0, 0.0);
        assert!(
            direction.is_parallel(target, PARALLEL_TOLERANCE)?
                || direction.is_anti_parallel(target, PARALLEL_TOLERANCE)?
        );
        assert!(distance_to_vector(Point::new(1.0, 1.0, 0.0), fit.shape()).magnitude() < 1e-5);
        assert!(distance_to_vector(Point::ZERO, fit.shape()).magnitude() < 1e-5);
        assert_eq!(fit.state(), FitState::Solved);
        Ok(())
    }

    #[test]
    fn test_fit_plane() -> Result<(), Box<dyn std::error::Error>> {
        let mut points = diagonal(1.0);
        points.extend(diagonal(-1.0));
        let mut fit = DataFitting::new(points, Plane::new(Point::ZERO, Point::new(0.1, -0.2, 1.0)));
        let report = fit.run_fit()?;

        assert!(report.converged());
        assert_eq!(report.parameters.len(), 3);
        let normal = fit.shape().normal();
        assert!(normal.is_parallel(Point::Z, PARALLEL_TOLERANCE)?);
        assert!(distance_to_plane(Point::new(1.0, 1.0, 0.0), fit.shape()).abs() < 1e-5);
        Ok(())
    }

    #[test]
    fn test_fit_circle_2d() -> Result<(), Box<dyn std::error::Error>> {
        let mut fit = DataFitting::new(square(), Circle2D::new(Point::new(0.5, 0.5, 0.0), 2.0));
        assert_eq!(fit.state(), FitState::Created);
        let report = fit.run_fit()?;

        assert!(report.converged());
        assert_relative_eq!(fit.shape().radius, 2f64.sqrt(), epsilon = 1e-6);
        assert!(fit.shape().centre.magnitude() < 1e-6);
        assert!(fit.total_unit_cost() < 1e-5);
        Ok(())
    }

    #[test]
    fn test_fit_point_centroid() -> Result<(), Box<dyn std::error::Error>> {
        let mut fit = DataFitting::new(square(), Point::new(3.0, -2.0, 1.0));
        fit.run_fit()?;
        assert!(fit.shape().magnitude() < 1e-6);
        Ok(())
    }

    #[test]
    fn test_fixed_parameters_untouched() -> Result<(), Box<dyn std::error::Error>> {
        let mut fit = DataFitting::new(square(), Circle2D::new(Point::new(0.5, 0.5, 0.0), 2.0));
        fit.set_free_parameters(&[Circle2DParam::Radius, Circle2DParam::Radius]);
        assert_eq!(fit.state(), FitState::Configured);
        assert_eq!(fit.free_parameters(), &[Circle2DParam::Radius]);

        fit.run_fit()?;
        assert_eq!(fit.shape().centre, Point::new(0.5, 0.5, 0.0));
        Ok(())
    }

    #[test]
    fn test_fit_errors() {
        let mut empty = DataFitting::new(Vec::<Point>::new(), Circle2D::default());
        assert!(matches!(empty.run_fit(), Err(FitError::NoPoints)));

        let mut fixed = DataFitting::new(square(), Circle2D::default()).with_free_parameters(&[]);
        assert!(matches!(fixed.run_fit(), Err(FitError::NoFreeParameters)));
        assert!(fixed.report().is_none());
    }

    #[test]
    fn test_fit_circle_3d() -> Result<(), Box<dyn std::error::Error>> {
        let circle = fit_circle_3d(&square())?;
        let axis = circle.axis();

        assert!(axis.direction.is_parallel(Point::Z, PARALLEL_TOLERANCE)?);
        assert!(axis.origin.magnitude() < 1e-6);
        assert_relative_eq!(circle.radius(), 2f64.sqrt(), epsilon = 1e-6);
        Ok(())
    }

    #[test]
    fn test_fit_circle_3d_tilted() -> Result<(), Box<dyn std::error::Error>> {
        let centre = Point::new(1.0, 2.0, 3.0);
        let normal = Point::new(0.0, 1.0, 1.0).unit()?;
        let u = normal.arbitrary_perpendicular()?.unit()?;
        let v = normal.cross(u);
        let points: Vec<Point> = (0..12)
            .map(|i| {
                let theta = i as f64 * std::f64::consts::TAU / 12.0;
                centre + u * (2.0 * theta.cos()) + v * (2.0 * theta.sin())
            })
            .collect();

        let circle = fit_circle_3d(&points)?;
        assert_relative_eq!(circle.radius(), 2.0, epsilon = 1e-5);
        assert!((circle.centre() - centre).magnitude() < 1e-5);
        let axis = circle.axis().direction;
        assert!(
            axis.is_parallel(normal, 1e-6)? || axis.is_anti_parallel(normal, 1e-6)?
        );
        Ok(())
    }

    #[test]
    fn test_fit_circle_3d_vertical_plane() -> Result<(), Box<dyn std::error::Error>> {
        let points: Vec<Point> = (0..12)
            .map(|i| {
                let theta = i as f64 * std::f64::consts::TAU / 12.0;
                Point::new(2.0 * theta.cos(), 0.0, 2.0 * theta.sin())
            })
            .collect();

        let circle = fit_circle_3d(&points)?;
        assert_relative_eq!(circle.radius(), 2.0, epsilon = 1e-6);
        assert!(circle.centre().magnitude() < 1e-6);
        let axis = circle.axis().direction;
        assert!(
            axis.is_parallel(Point::Y, 1e-6)? || axis.is_anti_parallel(Point::Y, 1e-6)?
        );
        Ok(())
    }

    #[test]
    fn test_plane_normal_seed() -> Result<(), Box<dyn std::error::Error>> {
        let points = vec![
            Point::new(1.0, 0.0, 0.0),
            Point::new(-1.0, 0.0, 0.0),
            Point::new(0.0, 3.0, -2.0),
            Point::new(0.0, -3.0, 2.0),
        ];
        let seed = plane_normal_seed(&points, mean_point(&points)?);
        let expected = Point::new(0.0, 2.0, 3.0).unit()?;
        assert!(seed.is_parallel(expected, 1e-9)?);
        assert!(seed.z >= 0.0);

        assert_eq!(plane_normal_seed(&[Point::ZERO], Point::ZERO), Point::Z);
        Ok(())
    }

    #[test]
    fn test_fit_circle_3d_empty() {
        assert!(matches!(fit_circle_3d(&[]), Err(FitError::NoPoints)));
    }
}
