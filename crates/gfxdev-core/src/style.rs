//! Line style state: width, dashes, caps and joins
//!
//! A width of zero means "the thinnest visible line", one device pixel at
//! scale 1. Dash lengths are expressed in multiples of the effective line
//! width, so a dotted 3-pixel line stays dotted rather than turning solid.

use crate::geometry::Point;

/// Dash pattern of a stroke
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Dash {
    #[default]
    Solid,
    /// `-------`
    Dash,
    /// `.......`
    Dot,
    /// `_._._._`
    DashDot,
    /// `_.._.._`
    DashDotDot,
    /// Alternating on/off lengths in line-width units; an empty or
    /// all-zero pattern behaves like `Solid`.
    Custom(Vec<u8>),
}

/// How open stroke ends are finished
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cap {
    #[default]
    Flat,
    Round,
    Square,
}

/// How stroke segments meet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Join {
    #[default]
    Miter,
    Round,
    Bevel,
}

/// Complete line state
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LineStyle {
    /// Logical width; zero selects the thin line
    pub width: f32,
    pub dash: Dash,
    pub cap: Cap,
    pub join: Join,
}

impl LineStyle {
    pub fn solid(width: f32) -> Self {
        Self {
            width,
            ..Self::default()
        }
    }

    pub fn with_dash(mut self, dash: Dash) -> Self {
        self.dash = dash;
        self
    }

    pub fn with_cap(mut self, cap: Cap) -> Self {
        self.cap = cap;
        self
    }

    pub fn with_join(mut self, join: Join) -> Self {
        self.join = join;
        self
    }

    /// Width after the thin-line rule is applied
    pub fn effective_width(&self) -> f32 {
        if self.width <= 0.0 {
            1.0
        } else {
            self.width
        }
    }

    /// On/off lengths in device units for a stroke of `device_width`
    ///
    /// Returns an empty vector for solid lines.
    pub fn dash_pattern(&self, device_width: f64) -> Vec<f64> {
        let units: Vec<u8> = match &self.dash {
            Dash::Solid => Vec::new(),
            Dash::Dash => vec![3, 1],
            Dash::Dot => vec![1, 1],
            Dash::DashDot => vec![3, 1, 1, 1],
            Dash::DashDotDot => vec![3, 1, 1, 1, 1, 1],
            Dash::Custom(pattern) => pattern.clone(),
        };
        if units.iter().all(|&u| u == 0) {
            return Vec::new();
        }
        let mut pattern: Vec<f64> = units.iter().map(|&u| u as f64 * device_width).collect();
        // Odd patterns repeat twice so on/off alternation stays consistent
        if pattern.len() % 2 == 1 {
            let copy = pattern.clone();
            pattern.extend(copy);
        }
        pattern
    }
}

/// Split a polyline into the "on" pieces of a dash pattern
///
/// The pattern continues across vertices. A solid (empty) pattern returns
/// the input as a single piece.
pub fn dash_polyline(points: &[Point], pattern: &[f64]) -> Vec<Vec<Point>> {
    if pattern.is_empty() || pattern.iter().all(|&p| p <= 0.0) {
        return vec![points.to_vec()];
    }

    let mut pieces = Vec::new();
    let mut current: Vec<Point> = Vec::new();
    let mut dash_index = 0usize;
    let mut remaining = pattern[0];
    let mut on = true;

    if let Some(&first) = points.first() {
        current.push(first);
    }

    for pair in points.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        let dx = b.x - a.x;
        let dy = b.y - a.y;
        let length = (dx * dx + dy * dy).sqrt();
        let mut travelled = 0.0;

        while length - travelled > remaining {
            travelled += remaining;
            let p = Point::new(a.x + dx * travelled / length, a.y + dy * travelled / length);
            if on {
                current.push(p);
                pieces.push(std::mem::take(&mut current));
            } else {
                current = vec![p];
            }
            on = !on;
            dash_index = (dash_index + 1) % pattern.len();
            remaining = pattern[dash_index];
        }

        remaining -= length - travelled;
        if on {
            current.push(b);
        } else {
            current.clear();
            current.push(b);
        }
    }

    if on && current.len() > 1 {
        pieces.push(current);
    }
    pieces
}
