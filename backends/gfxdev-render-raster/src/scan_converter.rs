//! Scan converter: polygons to horizontal pixel spans
//!
//! A pixel is inside a polygon when its center is, by the chosen fill
//! rule. There is no anti-aliasing; this is the X11/GDI look. Spans come
//! out already clipped to a pixel rectangle, so callers write them straight
//! into the buffer.

use gfxdev_core::{FillRule, Point, Rect};

use crate::edge::{Edge, EdgeList};

/// Turns contours into spans inside a clip rectangle
#[derive(Debug)]
pub struct ScanConverter {
    edges: EdgeList,
    fill_rule: FillRule,
    bounds: Rect,
}

impl ScanConverter {
    /// Converter that only emits spans inside `bounds`
    pub fn new(bounds: Rect) -> Self {
        Self {
            edges: EdgeList::with_capacity(32),
            fill_rule: FillRule::NonZero,
            bounds,
        }
    }

    pub fn set_fill_rule(&mut self, rule: FillRule) {
        self.fill_rule = rule;
    }

    pub fn fill_rule(&self) -> FillRule {
        self.fill_rule
    }

    /// Add a closed contour
    pub fn add_contour(&mut self, points: &[Point]) {
        self.edges.add_contour(points);
    }

    pub fn reset(&mut self) {
        self.edges.clear();
    }

    /// Emit every covered span as `(y, x_start, x_end)`, `x_end` exclusive
    pub fn spans<F>(&mut self, mut emit: F)
    where
        F: FnMut(i32, i32, i32),
    {
        if self.bounds.is_empty() || self.edges.is_empty() {
            return;
        }
        let Some((y_first, y_last)) = self.edges.y_range() else {
            return;
        };
        let y_start = y_first.max(self.bounds.y);
        let y_end = y_last.min(self.bounds.bottom() - 1);
        if y_start > y_end {
            return;
        }

        self.edges.sort_by_y();
        let edges = self.edges.as_slice();
        let mut next = edges.partition_point(|e| e.y_min < y_start);
        let mut active: Vec<Edge> = edges[..next]
            .iter()
            .filter(|e| e.is_active(y_start))
            .copied()
            .collect();
        let mut crossings: Vec<(f64, i8)> = Vec::with_capacity(16);

        for y in y_start..=y_end {
            while next < edges.len() && edges[next].y_min <= y {
                active.push(edges[next]);
                next += 1;
            }
            active.retain(|e| e.y_max >= y);
            if active.is_empty() {
                if next >= edges.len() {
                    break;
                }
                continue;
            }

            crossings.clear();
            crossings.extend(active.iter().map(|e| (e.x_at(y), e.direction)));
            crossings.sort_by(|a, b| a.0.total_cmp(&b.0));

            let mut winding = 0i32;
            let mut span_start = 0.0;
            for &(x, direction) in &crossings {
                let was_inside = self.inside(winding);
                winding += match self.fill_rule {
                    FillRule::NonZero => direction as i32,
                    FillRule::EvenOdd => 1,
                };
                let is_inside = self.inside(winding);
                if !was_inside && is_inside {
                    span_start = x;
                } else if was_inside && !is_inside {
                    self.emit_span(y, span_start, x, &mut emit);
                }
            }
        }
    }

    #[inline]
    fn inside(&self, winding: i32) -> bool {
        match self.fill_rule {
            FillRule::NonZero => winding != 0,
            FillRule::EvenOdd => winding % 2 != 0,
        }
    }

    /// Pixels whose centers lie in `[x_left, x_right)`, clipped
    fn emit_span<F>(&self, y: i32, x_left: f64, x_right: f64, emit: &mut F)
    where
        F: FnMut(i32, i32, i32),
    {
        let x0 = ((x_left - 0.5).ceil() as i64).max(self.bounds.x as i64);
        let x1 = ((x_right - 0.5).ceil() as i64).min(self.bounds.right() as i64);
        if x0 < x1 {
            emit(y, x0 as i32, x1 as i32);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x: f64, y: f64, size: f64) -> Vec<Point> {
        vec![
            Point::new(x, y),
            Point::new(x + size, y),
            Point::new(x + size, y + size),
            Point::new(x, y + size),
        ]
    }

    fn render(sc: &mut ScanConverter, width: usize, height: usize) -> Vec<u8> {
        let mut bitmap = vec![0u8; width * height];
        sc.spans(|y, x0, x1| {
            for x in x0..x1 {
                bitmap[y as usize * width + x as usize] += 1;
            }
        });
        bitmap
    }

    #[test]
    fn test_integer_square_covers_exact_pixels() {
        let mut sc = ScanConverter::new(Rect::new(0, 0, 10, 10));
        sc.add_contour(&square(2.0, 2.0, 6.0));
        let bitmap = render(&mut sc, 10, 10);
        assert_eq!(bitmap.iter().filter(|&&p| p == 1).count(), 36);
        assert_eq!(bitmap[2 * 10 + 2], 1);
        assert_eq!(bitmap[7 * 10 + 7], 1);
        assert_eq!(bitmap[8 * 10 + 8], 0);
        assert_eq!(bitmap[10 + 2], 0);
    }

    #[test]
    fn test_even_odd_hole() {
        let mut sc = ScanConverter::new(Rect::new(0, 0, 10, 10));
        sc.set_fill_rule(FillRule::EvenOdd);
        sc.add_contour(&square(0.0, 0.0, 10.0));
        sc.add_contour(&square(3.0, 3.0, 4.0));
        let bitmap = render(&mut sc, 10, 10);
        assert_eq!(bitmap[5 * 10 + 5], 0);
        assert_eq!(bitmap[10 + 1], 1);
        assert_eq!(bitmap.iter().filter(|&&p| p == 1).count(), 100 - 16);
    }

    #[test]
    fn test_nonzero_same_direction_fills_hole() {
        let mut sc = ScanConverter::new(Rect::new(0, 0, 10, 10));
        sc.add_contour(&square(0.0, 0.0, 10.0));
        sc.add_contour(&square(3.0, 3.0, 4.0));
        let bitmap = render(&mut sc, 10, 10);
        assert_eq!(bitmap[5 * 10 + 5], 1);
    }

    #[test]
    fn test_nonzero_reversed_inner_is_hole() {
        let mut sc = ScanConverter::new(Rect::new(0, 0, 10, 10));
        sc.add_contour(&square(0.0, 0.0, 10.0));
        let mut inner = square(3.0, 3.0, 4.0);
        inner.reverse();
        sc.add_contour(&inner);
        let bitmap = render(&mut sc, 10, 10);
        assert_eq!(bitmap[5 * 10 + 5], 0);
    }

    #[test]
    fn test_spans_clipped_to_bounds() {
        let mut sc = ScanConverter::new(Rect::new(2, 2, 3, 3));
        sc.add_contour(&square(-100.0, -100.0, 300.0));
        let bitmap = render(&mut sc, 10, 10);
        assert_eq!(bitmap.iter().filter(|&&p| p == 1).count(), 9);
        assert_eq!(bitmap[2 * 10 + 2], 1);
        assert_eq!(bitmap[5 * 10 + 5], 0);
    }

    #[test]
    fn test_triangle_area_is_plausible() {
        let mut sc = ScanConverter::new(Rect::new(0, 0, 20, 20));
        sc.add_contour(&[
            Point::new(5.0, 5.0),
            Point::new(15.0, 5.0),
            Point::new(10.0, 15.0),
        ]);
        let bitmap = render(&mut sc, 20, 20);
        let filled = bitmap.iter().filter(|&&p| p == 1).count();
        assert!((40..=60).contains(&filled), "filled {filled}");
    }

    #[test]
    fn test_empty_bounds_emit_nothing() {
        let mut sc = ScanConverter::new(Rect::new(0, 0, 0, 0));
        sc.add_contour(&square(0.0, 0.0, 5.0));
        let mut count = 0;
        sc.spans(|_, _, _| count += 1);
        assert_eq!(count, 0);
    }
}
