//! Clip and translation stacks
//!
//! Both stacks are never empty. The clip stack bottoms out in `None`
//! ("no clip"); the origin stack bottoms out in `(0, 0)`. Every push stores
//! the fully composed value, so a pop restores the previous entry exactly.

use crate::error::{Result, SurfaceError};
use crate::geometry::{ClipBox, Rect};

/// Stack of rectangular clip regions in logical coordinates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipStack {
    entries: Vec<Option<Rect>>,
}

impl ClipStack {
    pub fn new() -> Self {
        Self {
            entries: vec![None],
        }
    }

    /// Current region; `None` means unbounded
    pub fn top(&self) -> Option<Rect> {
        self.entries.last().copied().flatten()
    }

    /// Number of pushed regions above the unbounded bottom entry
    pub fn depth(&self) -> usize {
        self.entries.len() - 1
    }

    /// Intersect `rect` with the current region and push the result
    ///
    /// A degenerate `rect` pushes an empty region: everything is clipped
    /// until the matching pop.
    pub fn push(&mut self, rect: Rect) {
        let rect = if rect.is_empty() {
            Rect::new(rect.x, rect.y, 0, 0)
        } else {
            rect
        };
        let next = match self.top() {
            Some(current) => current.intersect(&rect),
            None => rect,
        };
        self.entries.push(Some(next));
    }

    /// Push an unbounded region
    pub fn push_none(&mut self) {
        self.entries.push(None);
    }

    pub fn pop(&mut self) -> Result<()> {
        if self.entries.len() <= 1 {
            log::warn!("pop_clip called with no matching push_clip");
            return Err(SurfaceError::ClipUnderflow.into());
        }
        self.entries.pop();
        Ok(())
    }

    /// Classify `rect` against the current region
    pub fn clip_box(&self, rect: Rect) -> ClipBox {
        if rect.is_empty() {
            return ClipBox::Outside;
        }
        match self.top() {
            None => ClipBox::Inside(rect),
            Some(clip) => {
                let visible = clip.intersect(&rect);
                if visible.is_empty() {
                    ClipBox::Outside
                } else if visible == rect {
                    ClipBox::Inside(rect)
                } else {
                    ClipBox::Partial(visible)
                }
            },
        }
    }

    /// False only when `rect` is certainly invisible
    pub fn not_clipped(&self, rect: Rect) -> bool {
        !matches!(self.clip_box(rect), ClipBox::Outside)
    }

    /// Drop everything above the bottom entry
    pub fn reset(&mut self) {
        self.entries.truncate(1);
    }
}

impl Default for ClipStack {
    fn default() -> Self {
        Self::new()
    }
}

/// Stack of composed origin offsets
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginStack {
    entries: Vec<(i32, i32)>,
}

impl OriginStack {
    pub fn new() -> Self {
        Self {
            entries: vec![(0, 0)],
        }
    }

    pub fn origin(&self) -> (i32, i32) {
        self.entries.last().copied().unwrap_or((0, 0))
    }

    pub fn depth(&self) -> usize {
        self.entries.len() - 1
    }

    /// Move the origin by `(dx, dy)` relative to the current one
    pub fn translate(&mut self, dx: i32, dy: i32) {
        let (x, y) = self.origin();
        self.entries
            .push((x.saturating_add(dx), y.saturating_add(dy)));
    }

    pub fn untranslate(&mut self) -> Result<()> {
        if self.entries.len() <= 1 {
            log::warn!("untranslate called with no matching translate");
            return Err(SurfaceError::OriginUnderflow.into());
        }
        self.entries.pop();
        Ok(())
    }

    pub fn reset(&mut self) {
        self.entries.truncate(1);
    }
}

impl Default for OriginStack {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bottom_is_unbounded() {
        let clip = ClipStack::new();
        assert_eq!(clip.top(), None);
        assert_eq!(clip.depth(), 0);
        let huge = Rect::new(-100_000, -100_000, 200_000, 200_000);
        assert_eq!(clip.clip_box(huge), ClipBox::Inside(huge));
    }

    #[test]
    fn test_nested_clips_intersect() {
        let mut clip = ClipStack::new();
        clip.push(Rect::new(10, 10, 20, 20));
        clip.push(Rect::new(15, 15, 20, 20));
        assert_eq!(clip.top(), Some(Rect::new(15, 15, 15, 15)));
        clip.pop().unwrap();
        assert_eq!(clip.top(), Some(Rect::new(10, 10, 20, 20)));
        clip.pop().unwrap();
        assert_eq!(clip.top(), None);
    }

    #[test]
    fn test_pop_underflow_keeps_bottom() {
        let mut clip = ClipStack::new();
        let err = clip.pop().unwrap_err();
        assert!(matches!(
            err,
            crate::GfxError::Surface(SurfaceError::ClipUnderflow)
        ));
        assert_eq!(clip.depth(), 0);
        assert_eq!(clip.top(), None);
    }

    #[test]
    fn test_push_none_disables_clip() {
        let mut clip = ClipStack::new();
        clip.push(Rect::new(0, 0, 5, 5));
        clip.push_none();
        assert_eq!(clip.clip_box(Rect::new(50, 50, 5, 5)), ClipBox::Inside(Rect::new(50, 50, 5, 5)));
        clip.pop().unwrap();
        assert_eq!(clip.clip_box(Rect::new(50, 50, 5, 5)), ClipBox::Outside);
    }

    #[test]
    fn test_degenerate_push_clips_everything() {
        let mut clip = ClipStack::new();
        clip.push(Rect::new(5, 5, 0, 10));
        assert!(!clip.not_clipped(Rect::new(0, 0, 100, 100)));
    }

    #[test]
    fn test_clip_box_tri_state() {
        let mut clip = ClipStack::new();
        clip.push(Rect::new(0, 0, 10, 10));
        assert_eq!(clip.clip_box(Rect::new(20, 20, 5, 5)), ClipBox::Outside);
        assert_eq!(
            clip.clip_box(Rect::new(2, 2, 5, 5)),
            ClipBox::Inside(Rect::new(2, 2, 5, 5))
        );
        assert_eq!(
            clip.clip_box(Rect::new(5, 5, 10, 10)),
            ClipBox::Partial(Rect::new(5, 5, 5, 5))
        );
        // Touching the edge is outside: rectangles are half-open
        assert_eq!(clip.clip_box(Rect::new(10, 0, 5, 5)), ClipBox::Outside);
    }

    #[test]
    fn test_origin_composes() {
        let mut origin = OriginStack::new();
        origin.translate(10, 5);
        origin.translate(-3, 2);
        assert_eq!(origin.origin(), (7, 7));
        origin.untranslate().unwrap();
        assert_eq!(origin.origin(), (10, 5));
        origin.untranslate().unwrap();
        assert_eq!(origin.origin(), (0, 0));
        assert!(origin.untranslate().is_err());
    }
}
