//! Glyph outlines flattened into polygon contours
//!
//! Faces trace outlines in a y-down space with the baseline origin at
//! (0, 0). [`GlyphPath`] places each glyph at its pen position, rotates the
//! run around its start and flattens curves into line segments the scan
//! converter can fill.

use gfxdev_core::{OutlineSink, Point};

/// Collects flattened contours for a whole text run
#[derive(Debug)]
pub struct GlyphPath {
    contours: Vec<Vec<Point>>,
    current: Vec<Point>,
    origin: Point,
    pen: f64,
    cos: f64,
    sin: f64,
    last: Point,
}

/// Line segments per curve; glyphs are small, so a fixed count suffices
const CURVE_STEPS: usize = 8;

impl GlyphPath {
    /// Run starting at `origin`, rotated counter-clockwise by `angle` degrees
    pub fn new(origin: Point, angle: f64) -> Self {
        let rad = angle.to_radians();
        Self {
            contours: Vec::new(),
            current: Vec::new(),
            origin,
            pen: 0.0,
            cos: rad.cos(),
            sin: rad.sin(),
            last: Point::default(),
        }
    }

    /// Move the pen to `advance` units past the run start
    pub fn set_pen(&mut self, advance: f64) {
        self.pen = advance;
    }

    /// Run-local coordinates to device space
    pub fn place(&self, x: f64, y: f64) -> Point {
        let x = x + self.pen;
        // Counter-clockwise on screen, where y grows downward
        Point::new(
            self.origin.x + x * self.cos + y * self.sin,
            self.origin.y - x * self.sin + y * self.cos,
        )
    }

    fn push(&mut self, x: f64, y: f64) {
        self.last = Point::new(x, y);
        let p = self.place(x, y);
        self.current.push(p);
    }

    fn end_contour(&mut self) {
        if self.current.len() >= 3 {
            self.contours.push(std::mem::take(&mut self.current));
        } else {
            self.current.clear();
        }
    }

    pub fn into_contours(mut self) -> Vec<Vec<Point>> {
        self.end_contour();
        self.contours
    }

    pub fn is_empty(&self) -> bool {
        self.contours.is_empty() && self.current.is_empty()
    }
}

impl OutlineSink for GlyphPath {
    fn move_to(&mut self, x: f64, y: f64) {
        self.end_contour();
        self.push(x, y);
    }

    fn line_to(&mut self, x: f64, y: f64) {
        self.push(x, y);
    }

    fn quad_to(&mut self, cx: f64, cy: f64, x: f64, y: f64) {
        let p0 = self.last;
        for i in 1..=CURVE_STEPS {
            let t = i as f64 / CURVE_STEPS as f64;
            let mt = 1.0 - t;
            self.push(
                mt * mt * p0.x + 2.0 * mt * t * cx + t * t * x,
                mt * mt * p0.y + 2.0 * mt * t * cy + t * t * y,
            );
        }
    }

    fn cubic_to(&mut self, c1x: f64, c1y: f64, c2x: f64, c2y: f64, x: f64, y: f64) {
        let p0 = self.last;
        for i in 1..=CURVE_STEPS {
            let t = i as f64 / CURVE_STEPS as f64;
            let mt = 1.0 - t;
            let (a, b, c, d) = (mt * mt * mt, 3.0 * mt * mt * t, 3.0 * mt * t * t, t * t * t);
            self.push(
                a * p0.x + b * c1x + c * c2x + d * x,
                a * p0.y + b * c1y + c * c2y + d * y,
            );
        }
    }

    fn close(&mut self) {
        self.end_contour();
    }
}
