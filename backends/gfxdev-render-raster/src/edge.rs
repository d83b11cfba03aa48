//! Polygon edges for scanline filling
//!
//! An edge is one non-horizontal segment of a contour, normalised to run
//! downward. Scanline `y` samples at `y + 0.5`, so an edge covers the
//! scanlines whose centers fall in `[top, bottom)`.

use gfxdev_core::Point;

/// One segment of a contour, ready for scanning
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    /// Topmost end point
    x0: f64,
    y0: f64,
    /// Change in x per unit of y
    dxdy: f64,
    /// +1 when the original segment pointed down, -1 when up
    pub direction: i8,
    /// First scanline crossed (inclusive)
    pub y_min: i32,
    /// Last scanline crossed (inclusive)
    pub y_max: i32,
}

impl Edge {
    /// Build an edge from two points
    ///
    /// Returns `None` for horizontal segments and for segments that cross
    /// no scanline center.
    pub fn new(a: Point, b: Point) -> Option<Self> {
        if a.y == b.y || !a.y.is_finite() || !b.y.is_finite() {
            return None;
        }
        let (top, bottom, direction) = if a.y < b.y { (a, b, 1) } else { (b, a, -1) };

        let y_min = (top.y - 0.5).ceil() as i32;
        let y_max = (bottom.y - 0.5).ceil() as i32 - 1;
        if y_min > y_max {
            return None;
        }

        Some(Edge {
            x0: top.x,
            y0: top.y,
            dxdy: (bottom.x - top.x) / (bottom.y - top.y),
            direction,
            y_min,
            y_max,
        })
    }

    /// X position where the edge crosses the center of scanline `y`
    #[inline]
    pub fn x_at(&self, y: i32) -> f64 {
        self.x0 + (y as f64 + 0.5 - self.y0) * self.dxdy
    }

    #[inline]
    pub fn is_active(&self, y: i32) -> bool {
        y >= self.y_min && y <= self.y_max
    }
}

/// Edges of one or more closed contours
#[derive(Debug, Clone, Default)]
pub struct EdgeList {
    edges: Vec<Edge>,
}

impl EdgeList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            edges: Vec::with_capacity(capacity),
        }
    }

    /// Add a contour, closing it back to its first point
    pub fn add_contour(&mut self, points: &[Point]) {
        if points.len() < 2 {
            return;
        }
        for pair in points.windows(2) {
            self.add_line(pair[0], pair[1]);
        }
        if let (Some(&first), Some(&last)) = (points.first(), points.last()) {
            self.add_line(last, first);
        }
    }

    pub fn add_line(&mut self, a: Point, b: Point) {
        if let Some(edge) = Edge::new(a, b) {
            self.edges.push(edge);
        }
    }

    /// Order edges by first scanline
    pub fn sort_by_y(&mut self) {
        self.edges.sort_by_key(|e| e.y_min);
    }

    /// Scanline range touched by any edge, inclusive
    pub fn y_range(&self) -> Option<(i32, i32)> {
        let y0 = self.edges.iter().map(|e| e.y_min).min()?;
        let y1 = self.edges.iter().map(|e| e.y_max).max()?;
        Some((y0, y1))
    }

    pub fn clear(&mut self) {
        self.edges.clear();
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    #[inline]
    pub fn as_slice(&self) -> &[Edge] {
        &self.edges
    }
}
