//! Points and rectangles, in logical and device space
//!
//! Widget code speaks integer logical coordinates ([`Rect`]). Drivers get
//! floating device coordinates ([`RectF`], [`Point`]) after translation and
//! HiDPI scaling have been applied.

/// A point in floating coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// An axis-aligned integer rectangle
///
/// Width or height of zero or less is a degenerate rectangle. Degenerate
/// rectangles are valid values; drawing one simply does nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    /// True when the rectangle covers no pixels
    pub fn is_empty(&self) -> bool {
        self.w <= 0 || self.h <= 0
    }

    /// Exclusive right edge
    pub fn right(&self) -> i32 {
        self.x.saturating_add(self.w)
    }

    /// Exclusive bottom edge
    pub fn bottom(&self) -> i32 {
        self.y.saturating_add(self.h)
    }

    /// Overlap of two rectangles
    ///
    /// When the rectangles do not overlap the result is a zero-size
    /// rectangle anchored at the clamped corner, so it stays deterministic.
    pub fn intersect(&self, other: &Rect) -> Rect {
        let x0 = self.x.max(other.x);
        let y0 = self.y.max(other.y);
        let x1 = self.right().min(other.right());
        let y1 = self.bottom().min(other.bottom());
        Rect::new(
            x0,
            y0,
            x1.saturating_sub(x0).max(0),
            y1.saturating_sub(y0).max(0),
        )
    }

    /// True when `other` lies entirely inside `self`
    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x && y >= self.y && x < self.right() && y < self.bottom()
    }

    /// Move by `(dx, dy)`, pinning at the edges of the `i32` range
    pub fn offset(&self, dx: i32, dy: i32) -> Rect {
        Rect::new(self.x.saturating_add(dx), self.y.saturating_add(dy), self.w, self.h)
    }

    pub fn to_f(self) -> RectF {
        RectF::new(self.x as f64, self.y as f64, self.w as f64, self.h as f64)
    }
}

/// A rectangle in device space
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RectF {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl RectF {
    pub const fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    pub fn is_empty(&self) -> bool {
        self.w <= 0.0 || self.h <= 0.0
    }

    pub fn right(&self) -> f64 {
        self.x + self.w
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.h
    }

    pub fn intersect(&self, other: &RectF) -> RectF {
        let x0 = self.x.max(other.x);
        let y0 = self.y.max(other.y);
        let x1 = self.right().min(other.right());
        let y1 = self.bottom().min(other.bottom());
        RectF::new(x0, y0, (x1 - x0).max(0.0), (y1 - y0).max(0.0))
    }

    /// Pixel rows and columns whose centers fall inside the rectangle
    ///
    /// Returns `(x0, y0, x1, y1)` with exclusive upper bounds. This is the
    /// sampling rule every raster driver uses, so a rectangle with integer
    /// corners covers exactly its integer pixels.
    pub fn pixel_bounds(&self) -> (i64, i64, i64, i64) {
        let x0 = (self.x - 0.5).ceil() as i64;
        let y0 = (self.y - 0.5).ceil() as i64;
        let x1 = (self.right() - 0.5).ceil() as i64;
        let y1 = (self.bottom() - 0.5).ceil() as i64;
        (x0, y0, x1.max(x0), y1.max(y0))
    }
}

/// Outcome of testing a rectangle against the current clip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipBox {
    /// Nothing of the rectangle is visible
    Outside,
    /// The whole rectangle is visible; carries the rectangle unchanged
    Inside(Rect),
    /// The rectangle straddles the clip edge; carries the visible part
    Partial(Rect),
}

impl ClipBox {
    /// Visible part of the queried rectangle, if any
    pub fn visible(&self) -> Option<Rect> {
        match self {
            ClipBox::Outside => None,
            ClipBox::Inside(r) | ClipBox::Partial(r) => Some(*r),
        }
    }
}

/// Coordinate formatting for text-based vector output
///
/// At most three decimals, trailing zeros dropped, never `-0`.
#[derive(Debug, Clone, Copy)]
pub struct Num(pub f64);

impl std::fmt::Display for Num {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let rounded = (self.0 * 1000.0).round() / 1000.0;
        let v = if rounded == 0.0 { 0.0 } else { rounded };
        let text = format!("{v:.3}");
        f.write_str(text.trim_end_matches('0').trim_end_matches('.'))
    }
}
