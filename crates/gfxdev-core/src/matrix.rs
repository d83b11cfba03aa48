//! The vertex transformation matrix
//!
//! Only vertex-path and shape drawing goes through the matrix; rectangles,
//! clip regions and text positions use the origin stack alone, the way
//! widget code expects.

use crate::error::{Result, SurfaceError};
use crate::geometry::Point;

/// 2D affine transform: `x' = x·a + y·c + x0`, `y' = x·b + y·d + y0`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub x: f64,
    pub y: f64,
}

impl Matrix {
    pub const IDENTITY: Matrix = Matrix {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        x: 0.0,
        y: 0.0,
    };

    pub const fn new(a: f64, b: f64, c: f64, d: f64, x: f64, y: f64) -> Self {
        Self { a, b, c, d, x, y }
    }

    pub fn translation(x: f64, y: f64) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, x, y)
    }

    pub fn scaling(sx: f64, sy: f64) -> Self {
        Self::new(sx, 0.0, 0.0, sy, 0.0, 0.0)
    }

    /// Rotation by `degrees`, counter-clockwise on screen (y grows down)
    pub fn rotation(degrees: f64) -> Self {
        let (s, c) = if degrees == 0.0 {
            (0.0, 1.0)
        } else if degrees == 90.0 {
            (1.0, 0.0)
        } else if degrees == 180.0 {
            (0.0, -1.0)
        } else if degrees == 270.0 || degrees == -90.0 {
            (-1.0, 0.0)
        } else {
            degrees.to_radians().sin_cos()
        };
        Self::new(c, -s, s, c, 0.0, 0.0)
    }

    /// `m` applied first, then `self`
    pub fn pre_multiply(&self, m: &Matrix) -> Matrix {
        Matrix {
            a: m.a * self.a + m.b * self.c,
            b: m.a * self.b + m.b * self.d,
            c: m.c * self.a + m.d * self.c,
            d: m.c * self.b + m.d * self.d,
            x: m.x * self.a + m.y * self.c + self.x,
            y: m.x * self.b + m.y * self.d + self.y,
        }
    }

    pub fn transform(&self, p: Point) -> Point {
        Point::new(
            p.x * self.a + p.y * self.c + self.x,
            p.x * self.b + p.y * self.d + self.y,
        )
    }

    /// Transform a distance, ignoring the translation part
    pub fn transform_distance(&self, dx: f64, dy: f64) -> Point {
        Point::new(dx * self.a + dy * self.c, dx * self.b + dy * self.d)
    }

    pub fn is_identity(&self) -> bool {
        *self == Matrix::IDENTITY
    }

    /// Geometric mean of the axis scales, used to size flattened curves
    pub fn mean_scale(&self) -> f64 {
        (self.a * self.d - self.b * self.c).abs().sqrt()
    }
}

impl Default for Matrix {
    fn default() -> Self {
        Matrix::IDENTITY
    }
}

/// Saved matrices
///
/// The stack is bounded like its widget-toolkit ancestors; pushing past
/// the bound drops the push with a warning and leaves the matrix as is.
#[derive(Debug, Clone, PartialEq)]
pub struct MatrixStack {
    current: Matrix,
    saved: Vec<Matrix>,
}

/// Maximum number of saved matrices
pub const MATRIX_STACK_DEPTH: usize = 32;

impl MatrixStack {
    pub fn new() -> Self {
        Self {
            current: Matrix::IDENTITY,
            saved: Vec::new(),
        }
    }

    pub fn current(&self) -> &Matrix {
        &self.current
    }

    pub fn depth(&self) -> usize {
        self.saved.len()
    }

    pub fn push(&mut self) {
        if self.saved.len() >= MATRIX_STACK_DEPTH {
            log::warn!("Matrix stack full ({MATRIX_STACK_DEPTH}), push_matrix ignored");
            return;
        }
        self.saved.push(self.current);
    }

    pub fn pop(&mut self) -> Result<()> {
        match self.saved.pop() {
            Some(m) => {
                self.current = m;
                Ok(())
            },
            None => {
                log::warn!("pop_matrix called with no matching push_matrix");
                Err(SurfaceError::MatrixUnderflow.into())
            },
        }
    }

    /// Concatenate `m` in front of the current matrix
    pub fn mult(&mut self, m: &Matrix) {
        self.current = self.current.pre_multiply(m);
    }

    pub fn reset(&mut self) {
        self.current = Matrix::IDENTITY;
        self.saved.clear();
    }
}

impl Default for MatrixStack {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Point, b: Point) -> bool {
        (a.x - b.x).abs() < 1e-9 && (a.y - b.y).abs() < 1e-9
    }

    #[test]
    fn test_translate_then_scale() {
        let mut stack = MatrixStack::new();
        stack.mult(&Matrix::translation(10.0, 20.0));
        stack.mult(&Matrix::scaling(2.0, 3.0));
        // Scale applies to the vertex first, then the translation
        let p = stack.current().transform(Point::new(1.0, 1.0));
        assert!(close(p, Point::new(12.0, 23.0)));
    }

    #[test]
    fn test_rotation_quarter_turn() {
        let m = Matrix::rotation(90.0);
        let p = m.transform(Point::new(1.0, 0.0));
        // Counter-clockwise on a y-down screen moves +x to -y
        assert!(close(p, Point::new(0.0, -1.0)));
    }

    #[test]
    fn test_push_pop_restores() {
        let mut stack = MatrixStack::new();
        stack.push();
        stack.mult(&Matrix::scaling(5.0, 5.0));
        assert!(!stack.current().is_identity());
        stack.pop().unwrap();
        assert!(stack.current().is_identity());
        assert!(stack.pop().is_err());
    }

    #[test]
    fn test_push_past_depth_is_ignored() {
        let mut stack = MatrixStack::new();
        for _ in 0..MATRIX_STACK_DEPTH + 3 {
            stack.push();
        }
        assert_eq!(stack.depth(), MATRIX_STACK_DEPTH);
    }

    #[test]
    fn test_mean_scale() {
        assert!((Matrix::scaling(2.0, 8.0).mean_scale() - 4.0).abs() < 1e-9);
    }
}
