//! Vertex paths and curve flattening
//!
//! Complex shapes are built vertex by vertex between a `begin_*` and the
//! matching `end_*`. Curves and arcs are flattened into straight segments
//! here, once, so every driver receives plain polylines and polygons.

use std::f64::consts::PI;

use crate::geometry::Point;

/// What the vertices of a path become when it ends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    /// Individual dots
    Points,
    /// Open polyline
    Line,
    /// Closed outline
    Loop,
    /// Filled convex polygon
    Polygon,
    /// Filled polygon with any number of contours separated by gaps
    ComplexPolygon,
}

/// A path under construction
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VertexPath {
    kind: Option<PathKind>,
    contours: Vec<Vec<Point>>,
}

impl VertexPath {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new path, discarding any unfinished one
    pub fn begin(&mut self, kind: PathKind) {
        if self.kind.is_some() {
            log::debug!("Discarding unfinished {:?} path", self.kind);
        }
        self.kind = Some(kind);
        self.contours.clear();
        self.contours.push(Vec::new());
    }

    pub fn kind(&self) -> Option<PathKind> {
        self.kind
    }

    pub fn is_active(&self) -> bool {
        self.kind.is_some()
    }

    /// Append a vertex; repeated vertices collapse into one
    pub fn add(&mut self, p: Point) {
        if self.kind.is_none() {
            return;
        }
        if let Some(contour) = self.contours.last_mut() {
            if contour.last() != Some(&p) || self.kind == Some(PathKind::Points) {
                contour.push(p);
            }
        }
    }

    /// End the current contour and start another
    ///
    /// Empty contours are not kept, so consecutive gaps are harmless.
    pub fn gap(&mut self) {
        if self.kind.is_none() {
            return;
        }
        if self.contours.last().is_some_and(|c| !c.is_empty()) {
            self.contours.push(Vec::new());
        }
    }

    /// Finish the path, handing back its contours
    ///
    /// Returns `None` when no path was begun or when `kind` does not match
    /// the one that was begun.
    pub fn finish(&mut self, kind: PathKind) -> Option<Vec<Vec<Point>>> {
        match self.kind.take() {
            Some(begun) if begun == kind => {
                let mut contours = std::mem::take(&mut self.contours);
                contours.retain(|c| !c.is_empty());
                Some(contours)
            },
            Some(begun) => {
                log::warn!("end_{kind:?} does not match begin_{begun:?}; path dropped");
                self.contours.clear();
                None
            },
            None => None,
        }
    }
}

/// Number of straight segments for a curve of `radius` device pixels
///
/// Chosen so the chord deviates from the true arc by at most a quarter
/// pixel.
pub fn segments_for_radius(radius: f64, sweep_degrees: f64) -> usize {
    let radius = radius.abs();
    let sweep = sweep_degrees.abs().min(360.0).to_radians();
    if radius < 0.5 || sweep == 0.0 {
        return 4;
    }
    let step = 2.0 * (1.0 - 0.25 / radius).max(-1.0).acos();
    let n = if step > 0.0 { (sweep / step).ceil() } else { 4.0 };
    (n as usize).clamp(4, 720)
}

/// Points along an elliptical arc
///
/// Angles are in degrees, counter-clockwise from three o'clock with y
/// growing downward; `end < start` sweeps clockwise. Both end points are
/// included.
pub fn arc_points(
    cx: f64,
    cy: f64,
    rx: f64,
    ry: f64,
    start: f64,
    end: f64,
    segments: usize,
) -> Vec<Point> {
    let segments = segments.max(1);
    let a0 = start * PI / 180.0;
    let sweep = (end - start) * PI / 180.0;
    (0..=segments)
        .map(|i| {
            let a = a0 + sweep * i as f64 / segments as f64;
            Point::new(cx + rx * a.cos(), cy - ry * a.sin())
        })
        .collect()
}

/// Points along a cubic Bézier, including both end points
pub fn cubic_points(p0: Point, p1: Point, p2: Point, p3: Point, segments: usize) -> Vec<Point> {
    let segments = segments.max(1);
    (0..=segments)
        .map(|i| {
            let t = i as f64 / segments as f64;
            let mt = 1.0 - t;
            let w0 = mt * mt * mt;
            let w1 = 3.0 * mt * mt * t;
            let w2 = 3.0 * mt * t * t;
            let w3 = t * t * t;
            Point::new(
                w0 * p0.x + w1 * p1.x + w2 * p2.x + w3 * p3.x,
                w0 * p0.y + w1 * p1.y + w2 * p2.y + w3 * p3.y,
            )
        })
        .collect()
}

/// Segments for a cubic, from the length of its control polygon
pub fn segments_for_cubic(p0: Point, p1: Point, p2: Point, p3: Point) -> usize {
    let dist = |a: Point, b: Point| ((b.x - a.x).powi(2) + (b.y - a.y).powi(2)).sqrt();
    let length = dist(p0, p1) + dist(p1, p2) + dist(p2, p3);
    ((length / 4.0).ceil() as usize).clamp(4, 256)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gap_splits_contours() {
        let mut path = VertexPath::new();
        path.begin(PathKind::ComplexPolygon);
        path.add(Point::new(0.0, 0.0));
        path.add(Point::new(10.0, 0.0));
        path.add(Point::new(10.0, 10.0));
        path.gap();
        path.gap();
        path.add(Point::new(3.0, 3.0));
        path.add(Point::new(7.0, 3.0));
        path.add(Point::new(7.0, 7.0));
        let contours = path.finish(PathKind::ComplexPolygon).unwrap();
        assert_eq!(contours.len(), 2);
        assert_eq!(contours[1].len(), 3);
        assert!(!path.is_active());
    }

    #[test]
    fn test_duplicate_vertices_collapse() {
        let mut path = VertexPath::new();
        path.begin(PathKind::Line);
        path.add(Point::new(1.0, 1.0));
        path.add(Point::new(1.0, 1.0));
        path.add(Point::new(2.0, 1.0));
        assert_eq!(path.finish(PathKind::Line).unwrap()[0].len(), 2);
    }

    #[test]
    fn test_mismatched_end_drops_path() {
        let mut path = VertexPath::new();
        path.begin(PathKind::Loop);
        path.add(Point::new(1.0, 1.0));
        assert!(path.finish(PathKind::Polygon).is_none());
        assert!(path.finish(PathKind::Loop).is_none());
    }

    #[test]
    fn test_vertex_without_begin_is_ignored() {
        let mut path = VertexPath::new();
        path.add(Point::new(1.0, 1.0));
        assert!(path.finish(PathKind::Line).is_none());
    }

    #[test]
    fn test_arc_end_points() {
        let pts = arc_points(0.0, 0.0, 10.0, 5.0, 0.0, 90.0, 8);
        assert_eq!(pts.len(), 9);
        assert!((pts[0].x - 10.0).abs() < 1e-9);
        assert!((pts[8].y + 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_segments_grow_with_radius() {
        let small = segments_for_radius(2.0, 360.0);
        let large = segments_for_radius(200.0, 360.0);
        assert!(small >= 4);
        assert!(large > small);
        assert!(large <= 720);
    }

    #[test]
    fn test_cubic_end_points() {
        let p0 = Point::new(0.0, 0.0);
        let p3 = Point::new(30.0, 0.0);
        let pts = cubic_points(p0, Point::new(10.0, 10.0), Point::new(20.0, 10.0), p3, 10);
        assert_eq!(pts[0], p0);
        assert!((pts[10].x - 30.0).abs() < 1e-9);
    }
}
