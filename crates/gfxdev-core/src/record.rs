//! A driver that records what it is asked to draw
//!
//! [`RecordingDriver`] keeps every device-space call as a [`DrawCommand`]
//! instead of painting. It is what tests use to observe the exact stream a
//! surface hands to its driver, and it doubles as a "dry run" target for
//! measuring how much a scene would draw.

use std::any::Any;

use crate::color::Color;
use crate::driver::{Features, GraphicsDriver, TextRun};
use crate::font::FontId;
use crate::geometry::{Point, Rect, RectF};
use crate::image::{ImageId, ImageView, RgbImage};
use crate::state::{DrawState, FillRule};

/// One recorded driver call
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Activate,
    Deactivate,
    ClipChanged(Option<RectF>),
    FillRect {
        rect: RectF,
        color: Color,
    },
    StrokePolyline {
        points: Vec<Point>,
        closed: bool,
        color: Color,
        width: f64,
    },
    FillPolygon {
        contours: Vec<Vec<Point>>,
        rule: FillRule,
        color: Color,
    },
    Points {
        points: Vec<Point>,
        color: Color,
    },
    Text {
        text: String,
        x: f64,
        y: f64,
        angle: f64,
        font: FontId,
        size: f64,
        rtl: bool,
        color: Color,
    },
    Image {
        width: u32,
        height: u32,
        depth: u8,
        dst: RectF,
    },
    Cached {
        id: ImageId,
        src: Rect,
        dst: RectF,
    },
    Uncache(ImageId),
    Flush,
}

/// Driver that appends every call to a list
#[derive(Debug, Default)]
pub struct RecordingDriver {
    features: Features,
    commands: Vec<DrawCommand>,
}

impl RecordingDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report `features` from `features()`, to stand in for other backends
    pub fn with_features(features: Features) -> Self {
        Self {
            features,
            commands: Vec::new(),
        }
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    /// Hand over the recorded commands, leaving the list empty
    pub fn take(&mut self) -> Vec<DrawCommand> {
        std::mem::take(&mut self.commands)
    }

    /// Number of calls that would have put ink on the target
    pub fn paint_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| {
                !matches!(
                    c,
                    DrawCommand::Activate
                        | DrawCommand::Deactivate
                        | DrawCommand::ClipChanged(_)
                        | DrawCommand::Uncache(_)
                        | DrawCommand::Flush
                )
            })
            .count()
    }
}

impl GraphicsDriver for RecordingDriver {
    fn name(&self) -> &'static str {
        "record"
    }

    fn features(&self) -> Features {
        self.features
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn activate(&mut self, _state: &DrawState) {
        self.commands.push(DrawCommand::Activate);
    }

    fn deactivate(&mut self) {
        self.commands.push(DrawCommand::Deactivate);
    }

    fn clip_changed(&mut self, state: &DrawState) {
        self.commands
            .push(DrawCommand::ClipChanged(state.device_clip()));
    }

    fn fill_rect(&mut self, state: &DrawState, rect: RectF) {
        self.commands.push(DrawCommand::FillRect {
            rect,
            color: state.color(),
        });
    }

    fn stroke_polyline(&mut self, state: &DrawState, points: &[Point], closed: bool) {
        self.commands.push(DrawCommand::StrokePolyline {
            points: points.to_vec(),
            closed,
            color: state.color(),
            width: state.device_line_width(),
        });
    }

    fn fill_polygon(&mut self, state: &DrawState, contours: &[Vec<Point>], rule: FillRule) {
        self.commands.push(DrawCommand::FillPolygon {
            contours: contours.to_vec(),
            rule,
            color: state.color(),
        });
    }

    fn draw_points(&mut self, state: &DrawState, points: &[Point]) {
        self.commands.push(DrawCommand::Points {
            points: points.to_vec(),
            color: state.color(),
        });
    }

    fn draw_text(&mut self, state: &DrawState, run: &TextRun<'_>) {
        self.commands.push(DrawCommand::Text {
            text: run.text.to_string(),
            x: run.x,
            y: run.y,
            angle: run.angle,
            font: run.font,
            size: run.size,
            rtl: run.rtl,
            color: state.color(),
        });
    }

    fn draw_image(&mut self, _state: &DrawState, image: &ImageView<'_>, dst: RectF) {
        self.commands.push(DrawCommand::Image {
            width: image.width(),
            height: image.height(),
            depth: image.depth(),
            dst,
        });
    }

    fn draw_cached(&mut self, _state: &DrawState, image: &RgbImage, src: Rect, dst: RectF) {
        self.commands.push(DrawCommand::Cached {
            id: image.id(),
            src,
            dst,
        });
    }

    fn uncache_image(&mut self, id: ImageId) {
        self.commands.push(DrawCommand::Uncache(id));
    }

    fn flush(&mut self) {
        self.commands.push(DrawCommand::Flush);
    }
}
