use approx::assert_abs_diff_eq;
use geom3d::algebra::{Circle2D, Point, Vector, PARALLEL_TOLERANCE};
use geom3d::fit::{fit_circle_3d, fit_circle_3d_with, DataFitting, FitState, VectorParam};
use geom3d::optim::{LevenbergMarquardt, TerminationReason};

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn square() -> Vec<Point> {
    vec![
        Point::new(1.0, 1.0, 0.0),
        Point::new(1.0, -1.0, 0.0),
        Point::new(-1.0, -1.0, 0.0),
        Point::new(-1.0, 1.0, 0.0),
    ]
}

#[test]
fn circle_2d_from_offset_guess() -> TestResult {
    let mut fit = DataFitting::new(square(), Circle2D::new(Point::new(0.5, 0.5, 0.0), 2.0));
    let report = fit.run_fit()?;

    assert!(report.converged());
    assert_eq!(fit.state(), FitState::Solved);
    assert_abs_diff_eq!(fit.shape().radius, 2f64.sqrt(), epsilon = 1e-6);
    assert_abs_diff_eq!(fit.shape().centre, Point::ZERO, epsilon = 1e-6);
    Ok(())
}

#[test]
fn circle_3d_in_xy_plane() -> TestResult {
    let circle = fit_circle_3d(&square())?;
    let axis = circle.axis();
    assert!(axis.direction.is_parallel(Point::Z, PARALLEL_TOLERANCE)?);
    assert_abs_diff_eq!(axis.origin, Point::ZERO, epsilon = 1e-6);
    Ok(())
}

#[test]
fn circle_3d_with_configured_solver() -> TestResult {
    let shifted: Vec<Point> = square()
        .into_iter()
        .map(|p| p + Point::new(0.0, 0.0, 4.0))
        .collect();
    let solver = LevenbergMarquardt::default()
        .with_max_iterations(100)
        .with_gradient_tolerance(1e-10);
    let circle = fit_circle_3d_with(&shifted, &solver)?;
    assert_abs_diff_eq!(circle.centre(), Point::new(0.0, 0.0, 4.0), epsilon = 1e-6);
    assert_abs_diff_eq!(circle.radius(), 2f64.sqrt(), epsilon = 1e-6);
    Ok(())
}

#[test]
fn iteration_cap_reports_non_convergence() -> TestResult {
    let guess = Circle2D::new(Point::new(0.5, 0.5, 0.0), 2.0);
    let initial_cost: f64 = square()
        .iter()
        .map(|p| guess.radial_distance(*p).powi(2))
        .sum();
    let mut fit = DataFitting::new(square(), guess)
        .with_solver(LevenbergMarquardt::default().with_max_iterations(1));
    let report = fit.run_fit()?;

    assert_eq!(report.termination_reason, TerminationReason::MaxIterations);
    assert!(!report.converged());
    assert!(report.final_cost <= initial_cost);
    // best-effort parameters are still applied
    assert_eq!(report.parameters, fit.shape().to_array().to_vec());
    Ok(())
}

#[test]
fn line_with_fixed_origin() -> TestResult {
    let points: Vec<Point> = (0..5)
        .map(|i| Point::new(1.0, 2.0, 3.0) + Point::new(1.0, 0.0, 1.0) * i as f64)
        .collect();
    let mut fit = DataFitting::new(points, Vector::new(Point::new(1.0, 2.0, 3.0), Point::X))
        .with_free_parameters(&VectorParam::DIRECTION);
    fit.run_fit()?;

    assert_eq!(fit.shape().origin, Point::new(1.0, 2.0, 3.0));
    let direction = fit.shape().direction;
    assert!(direction.is_parallel(Point::new(1.0, 0.0, 1.0), 1e-6)?);
    Ok(())
}

#[test]
fn circle_3d_in_plane_containing_z() -> TestResult {
    let centre = Point::new(3.0, 1.0, -2.0);
    let points: Vec<Point> = (0..8)
        .map(|i| {
            let theta = i as f64 * std::f64::consts::TAU / 8.0;
            centre + Point::new(0.0, 1.5 * theta.cos(), 1.5 * theta.sin())
        })
        .collect();

    let circle = fit_circle_3d(&points)?;
    assert_abs_diff_eq!(circle.radius(), 1.5, epsilon = 1e-6);
    assert_abs_diff_eq!(circle.centre(), centre, epsilon = 1e-6);
    let axis = circle.axis().direction;
    assert!(axis.is_parallel(Point::X, 1e-6)? || axis.is_anti_parallel(Point::X, 1e-6)?);
    Ok(())
}
