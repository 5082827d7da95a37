//! Parameter model of the shapes that can be fitted to point sets.
//!
//! Every fittable shape names its scalar parameters with a small enum and exposes them
//! through [`Fittable`], so a fitting session can free any subset of them while the rest
//! stay at their initial values.

use std::fmt;

use geom3d_algebra::{raise_zero, Circle2D, Plane, Point, Result, Vector};

/// A shape whose scalar parameters can be adjusted by least squares.
pub trait Fittable: Clone + Send + Sync + 'static {
    /// Names of the scalar parameters of the shape.
    type Param: Copy + PartialEq + fmt::Debug + Send + Sync + 'static;

    /// Number of residuals produced per data point.
    const RESIDUAL_DIM: usize;

    /// Parameters freed by default.
    fn fittable() -> &'static [Self::Param];

    /// Current value of a parameter.
    fn get(&self, param: Self::Param) -> f64;

    /// Overwrite a parameter.
    fn set(&mut self, param: Self::Param, value: f64);

    /// Append the residuals of `point` against the shape to `out`.
    ///
    /// The squared norm of the appended residuals equals the squared unit cost.
    fn residuals(&self, point: Point, out: &mut Vec<f64>) -> Result<()>;

    /// Distance from `point` to the shape.
    fn unit_cost(&self, point: Point) -> f64;
}

/// Parameters of a [`Point`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointParam {
    X,
    Y,
    Z,
}

impl PointParam {
    /// All three coordinates.
    pub const ALL: [PointParam; 3] = [PointParam::X, PointParam::Y, PointParam::Z];
}

/// Parameters of a [`Vector`] or [`Plane`]: origin then direction (normal).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VectorParam {
    OriginX,
    OriginY,
    OriginZ,
    DirectionX,
    DirectionY,
    DirectionZ,
}

impl VectorParam {
    /// The origin components.
    pub const ORIGIN: [VectorParam; 3] = [
        VectorParam::OriginX,
        VectorParam::OriginY,
        VectorParam::OriginZ,
    ];

    /// The direction components.
    pub const DIRECTION: [VectorParam; 3] = [
        VectorParam::DirectionX,
        VectorParam::DirectionY,
        VectorParam::DirectionZ,
    ];

    /// Origin and direction.
    pub const ALL: [VectorParam; 6] = [
        VectorParam::OriginX,
        VectorParam::OriginY,
        VectorParam::OriginZ,
        VectorParam::DirectionX,
        VectorParam::DirectionY,
        VectorParam::DirectionZ,
    ];
}

/// Parameters of a [`Circle2D`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Circle2DParam {
    CentreX,
    CentreY,
    Radius,
}

impl Circle2DParam {
    /// The in-plane centre.
    pub const CENTRE: [Circle2DParam; 2] = [Circle2DParam::CentreX, Circle2DParam::CentreY];

    /// Centre and radius.
    pub const ALL: [Circle2DParam; 3] = [
        Circle2DParam::CentreX,
        Circle2DParam::CentreY,
        Circle2DParam::Radius,
    ];
}

fn point_component(point: &Point, param: PointParam) -> f64 {
    match param {
        PointParam::X => point.x,
        PointParam::Y => point.y,
        PointParam::Z => point.z,
    }
}

fn point_component_mut(point: &mut Point, param: PointParam) -> &mut f64 {
    match param {
        PointParam::X => &mut point.x,
        PointParam::Y => &mut point.y,
        PointParam::Z => &mut point.z,
    }
}

fn split_vector_param(param: VectorParam) -> (bool, PointParam) {
    match param {
        VectorParam::OriginX => (true, PointParam::X),
        VectorParam::OriginY => (true, PointParam::Y),
        VectorParam::OriginZ => (true, PointParam::Z),
        VectorParam::DirectionX => (false, PointParam::X),
        VectorParam::DirectionY => (false, PointParam::Y),
        VectorParam::DirectionZ => (false, PointParam::Z),
    }
}

impl Fittable for Point {
    type Param = PointParam;
    const RESIDUAL_DIM: usize = 3;

    fn fittable() -> &'static [PointParam] {
        &PointParam::ALL
    }

    fn get(&self, param: PointParam) -> f64 {
        point_component(self, param)
    }

    fn set(&mut self, param: PointParam, value: f64) {
        *point_component_mut(self, param) = value;
    }

    fn residuals(&self, point: Point, out: &mut Vec<f64>) -> Result<()> {
        let offset = point - *self;
        out.extend([offset.x, offset.y, offset.z]);
        Ok(())
    }

    fn unit_cost(&self, point: Point) -> f64 {
        Point::unit_cost(*self, &point)
    }
}

impl Fittable for Vector {
    type Param = VectorParam;
    const RESIDUAL_DIM: usize = 3;

    fn fittable() -> &'static [VectorParam] {
        &VectorParam::ALL
    }

    fn get(&self, param: VectorParam) -> f64 {
        match split_vector_param(param) {
            (true, c) => point_component(&self.origin, c),
            (false, c) => point_component(&self.direction, c),
        }
    }

    fn set(&mut self, param: VectorParam, value: f64) {
        match split_vector_param(param) {
            (true, c) => *point_component_mut(&mut self.origin, c) = value,
            (false, c) => *point_component_mut(&mut self.direction, c) = value,
        }
    }

    fn residuals(&self, point: Point, out: &mut Vec<f64>) -> Result<()> {
        raise_zero(&[self.direction])?;
        let offset = geom3d_algebra::distance_to_vector(point, self);
        out.extend([offset.x, offset.y, offset.z]);
        Ok(())
    }

    fn unit_cost(&self, point: Point) -> f64 {
        Vector::unit_cost(self, point)
    }
}

impl Fittable for Plane {
    type Param = VectorParam;
    const RESIDUAL_DIM: usize = 1;

    fn fittable() -> &'static [VectorParam] {
        &VectorParam::DIRECTION
    }

    fn get(&self, param: VectorParam) -> f64 {
        match split_vector_param(param) {
            (true, c) => point_component(&self.origin(), c),
            (false, c) => point_component(&self.normal(), c),
        }
    }

    fn set(&mut self, param: VectorParam, value: f64) {
        match split_vector_param(param) {
            (true, c) => {
                let mut origin = self.origin();
                *point_component_mut(&mut origin, c) = value;
                self.set_origin(origin);
            }
            (false, c) => {
                let mut normal = self.normal();
                *point_component_mut(&mut normal, c) = value;
                self.set_normal(normal);
            }
        }
    }

    fn residuals(&self, point: Point, out: &mut Vec<f64>) -> Result<()> {
        raise_zero(&[self.normal()])?;
        out.push(self.distance_to_point(point));
        Ok(())
    }

    fn unit_cost(&self, point: Point) -> f64 {
        Plane::unit_cost(self, point)
    }
}

impl Fittable for Circle2D {
    type Param = Circle2DParam;
    const RESIDUAL_DIM: usize = 1;

    fn fittable() -> &'static [Circle2DParam] {
        &Circle2DParam::ALL
    }

    fn get(&self, param: Circle2DParam) -> f64 {
        match param {
            Circle2DParam::CentreX => self.centre.x,
            Circle2DParam::CentreY => self.centre.y,
            Circle2DParam::Radius => self.radius,
        }
    }

    fn set(&mut self, param: Circle2DParam, value: f64) {
        match param {
            Circle2DParam::CentreX => self.centre.x = value,
            Circle2DParam::CentreY => self.centre.y = value,
            Circle2DParam::Radius => self.radius = value,
        }
    }

    fn residuals(&self, point: Point, out: &mut Vec<f64>) -> Result<()> {
        out.push(self.radial_distance(point));
        Ok(())
    }

    fn unit_cost(&self, point: Point) -> f64 {
        Circle2D::unit_cost(self, point)
    }
}
