use crate::error::{GeometryError, Result};
use crate::point::Point;
use crate::vector::{Plane, Vector};

/// A straight segment between two points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Line {
    /// Start of the segment.
    pub start: Point,
    /// End of the segment.
    pub end: Point,
}

impl Line {
    /// Create a segment from `start` to `end`.
    pub fn new(start: Point, end: Point) -> Self {
        Self { start, end }
    }

    /// The ray from `start` towards `end`, with the segment as its direction.
    pub fn vector(&self) -> Vector {
        Vector::new(self.start, self.end - self.start)
    }

    /// Length of the segment.
    pub fn length(&self) -> f64 {
        (self.end - self.start).magnitude()
    }

    /// Move `end` along the segment direction so that the length becomes `value`.
    pub fn set_length(&mut self, value: f64) -> Result<()> {
        self.end = self.start + (self.end - self.start).unit()? * value;
        Ok(())
    }

    /// Point at proportion `t` of the way from `start` to `end`.
    pub fn parametric_point(&self, t: f64) -> Point {
        self.start * (1.0 - t) + self.end * t
    }

    /// Plane through `parametric_point(t)` normal to the segment.
    pub fn parametric_plane(&self, t: f64) -> Result<Plane> {
        Ok(Plane::new(
            self.parametric_point(t),
            (self.end - self.start).unit()?,
        ))
    }
}

impl Default for Line {
    fn default() -> Self {
        Self::new(Point::ZERO, Point::Z)
    }
}

/// Decide whether `new_end` extends `line` or starts a new segment.
///
/// The extension from `line.start` to `new_end` is accepted when the old end stays within
/// `tolerance` of it. Returns `(true, line.end -> new_end)` for a new segment, otherwise
/// `(false, extended)`.
pub fn check_extend_line(line: &Line, new_end: Point, tolerance: f64) -> (bool, Line) {
    let extended = Line::new(line.start, new_end);
    if extended.vector().unit_cost(line.end) > tolerance {
        (true, Line::new(line.end, new_end))
    } else {
        (false, extended)
    }
}

/// Simplify a polyline into as few straight segments as possible within `tolerance`.
pub fn lines_from_points(points: &[Point], tolerance: f64) -> Result<Vec<Line>> {
    let [first, second, rest @ ..] = points else {
        return Err(GeometryError::ShapeMismatch {
            expected: 2,
            actual: points.len(),
        });
    };
    let mut lines = vec![Line::new(*first, *second)];
    for point in rest {
        let Some(last) = lines.last_mut() else {
            break;
        };
        match check_extend_line(last, *point, tolerance) {
            (true, line) => lines.push(line),
            (false, line) => *last = line,
        }
    }
    Ok(lines)
}
