use std::cell::RefCell;
use std::rc::Rc;

use gfxdev_core::record::{DrawCommand, RecordingDriver};
use gfxdev_core::{
    ClipBox, Features, GfxError, Rect, RenderContext, Surface, SurfaceError, SurfaceRef,
};
use proptest::prelude::*;

fn recording_surface() -> Surface {
    Surface::new(Box::new(RecordingDriver::new()), 1.0)
}

#[derive(Debug, Clone)]
enum ClipOp {
    Push(i32, i32, i32, i32),
    NoClip,
    Pop,
}

fn clip_op() -> impl Strategy<Value = ClipOp> {
    prop_oneof![
        6 => (-20..80i32, -20..80i32, -5..60i32, -5..60i32)
            .prop_map(|(x, y, w, h)| ClipOp::Push(x, y, w, h)),
        1 => Just(ClipOp::NoClip),
        3 => Just(ClipOp::Pop),
    ]
}

// Every pop restores exactly the region that was current before its push
proptest! {
    #[test]
    fn clip_stack_restores_every_level(ops in prop::collection::vec(clip_op(), 1..40)) {
        let mut s = recording_surface();
        let mut history = vec![s.clip_region()];
        for op in ops {
            match op {
                ClipOp::Push(x, y, w, h) => s.push_clip(x, y, w, h),
                ClipOp::NoClip => s.push_no_clip(),
                ClipOp::Pop => {
                    if history.len() > 1 {
                        history.pop();
                        prop_assert!(s.pop_clip().is_ok());
                    } else {
                        prop_assert!(s.pop_clip().is_err());
                    }
                    prop_assert_eq!(s.clip_region(), history[history.len() - 1]);
                    continue;
                },
            }
            history.push(s.clip_region());
        }
        history.pop();
        while let Some(expected) = history.pop() {
            prop_assert!(s.pop_clip().is_ok());
            prop_assert_eq!(s.clip_region(), expected);
        }
        prop_assert!(s.pop_clip().is_err());
    }
}

// Nested clips only ever shrink the region
proptest! {
    #[test]
    fn nested_clip_stays_inside_parent(
        outer in (-20..80i32, -20..80i32, 1..60i32, 1..60i32),
        inner in (-20..80i32, -20..80i32, 1..60i32, 1..60i32),
    ) {
        let mut s = recording_surface();
        s.push_clip(outer.0, outer.1, outer.2, outer.3);
        s.push_clip(inner.0, inner.1, inner.2, inner.3);
        let parent = Rect::new(outer.0, outer.1, outer.2, outer.3);
        if let Some(region) = s.clip_region() {
            prop_assert!(region.is_empty() || parent.contains_rect(&region));
        }
    }
}

proptest! {
    #[test]
    fn origin_stack_restores_every_level(
        steps in prop::collection::vec((-50..50i32, -50..50i32), 0..30),
    ) {
        let mut s = recording_surface();
        let mut history = vec![s.origin()];
        for (dx, dy) in steps {
            s.translate(dx, dy);
            history.push(s.origin());
        }
        history.pop();
        while let Some(expected) = history.pop() {
            prop_assert!(s.untranslate().is_ok());
            prop_assert_eq!(s.origin(), expected);
        }
        prop_assert!(matches!(
            s.untranslate(),
            Err(GfxError::Surface(SurfaceError::OriginUnderflow))
        ));
    }
}

// Geometry anywhere in the i32 range is clipped, never overflowed
proptest! {
    #[test]
    fn far_off_screen_geometry_is_harmless(
        origin in (any::<i32>(), any::<i32>()),
        clip in (any::<i32>(), any::<i32>(), any::<i32>(), any::<i32>()),
        query in (any::<i32>(), any::<i32>(), any::<i32>(), any::<i32>()),
    ) {
        let mut s = recording_surface();
        s.translate(origin.0, origin.1);
        s.push_clip(clip.0, clip.1, clip.2, clip.3);
        let _ = s.clip_box(query.0, query.1, query.2, query.3);
        let _ = s.not_clipped(query.0, query.1, query.2, query.3);
        s.rect(query.0, query.1, query.2, query.3);
        s.rectf(query.0, query.1, query.2, query.3);
        prop_assert!(s.pop_clip().is_ok());
        prop_assert!(s.untranslate().is_ok());
        prop_assert_eq!(s.origin(), (0, 0));
    }
}

#[test]
fn nested_clip_scenario() {
    let mut s = recording_surface();
    s.push_clip(10, 10, 20, 20);
    s.push_clip(15, 15, 20, 20);
    assert_eq!(s.clip_region(), Some(Rect::new(15, 15, 15, 15)));
    s.pop_clip().unwrap();
    assert_eq!(s.clip_region(), Some(Rect::new(10, 10, 20, 20)));
    s.pop_clip().unwrap();
    assert_eq!(s.clip_region(), None);
}

proptest! {
    #[test]
    fn clip_box_classifies_against_region(
        x in 0..80i32,
        y in 0..80i32,
        w in 1..40i32,
        h in 1..40i32,
    ) {
        let mut s = recording_surface();
        let region = Rect::new(20, 20, 40, 30);
        s.push_clip(region.x, region.y, region.w, region.h);

        let q = Rect::new(x, y, w, h);
        let overlap = region.intersect(&q);
        match s.clip_box(q.x, q.y, q.w, q.h) {
            ClipBox::Outside => prop_assert!(overlap.is_empty(), "{:?} reported outside", q),
            ClipBox::Inside(r) => {
                prop_assert!(region.contains_rect(&q));
                prop_assert_eq!(r, q);
            },
            ClipBox::Partial(r) => {
                prop_assert!(!overlap.is_empty());
                prop_assert!(!region.contains_rect(&q));
                prop_assert_eq!(r, overlap);
            },
        }
    }
}

#[test]
fn clip_box_reports_in_caller_coordinates() {
    let mut s = recording_surface();
    s.translate(100, 100);
    s.push_clip(0, 0, 10, 10);
    assert_eq!(s.clip_region(), Some(Rect::new(100, 100, 10, 10)));
    assert_eq!(
        s.clip_box(5, 5, 10, 10),
        ClipBox::Partial(Rect::new(5, 5, 5, 5))
    );
    assert!(s.not_clipped(0, 0, 1, 1));
    assert!(!s.not_clipped(-10, -10, 5, 5));
}

#[test]
fn redirected_drawing_stays_on_target() {
    let window = Rc::new(RefCell::new(recording_surface()));
    let printer = Rc::new(RefCell::new(Surface::new(
        Box::new(RecordingDriver::with_features(Features::PRINTER | Features::VECTOR)),
        1.0,
    )));
    let window_ref: SurfaceRef = window.clone();
    let printer_ref: SurfaceRef = printer.clone();

    let mut ctx = RenderContext::new();
    ctx.set_current(&window_ref).unwrap();
    ctx.push_current(&printer_ref).unwrap();
    let printing = ctx
        .draw(|s| {
            s.line(0, 0, 10, 10);
            s.draw_text("page 1", 10, 20);
            s.has_feature(Features::PRINTER)
        })
        .unwrap();
    ctx.pop_current().unwrap();
    assert!(printing);
    assert!(ctx.is_current(&window_ref));

    let window_cmds = window
        .borrow_mut()
        .driver_as_mut::<RecordingDriver>()
        .map(|d| d.take())
        .unwrap_or_default();
    assert_eq!(
        window_cmds,
        vec![
            DrawCommand::Activate,
            DrawCommand::Deactivate,
            DrawCommand::Activate
        ]
    );
    let printer_paint = printer
        .borrow()
        .driver_as::<RecordingDriver>()
        .map(|d| d.paint_count())
        .unwrap_or(0);
    assert_eq!(printer_paint, 2);
}

#[test]
fn overflowing_push_is_refused() {
    let mut ctx = RenderContext::new();
    let surfaces: Vec<SurfaceRef> = (0..17)
        .map(|_| Rc::new(RefCell::new(recording_surface())) as SurfaceRef)
        .collect();
    for s in surfaces.iter().take(16) {
        ctx.push_current(s).unwrap();
    }
    assert!(ctx.push_current(&surfaces[16]).is_err());
    assert!(ctx.is_current(&surfaces[15]));

    // Unwinding still works all the way down
    for _ in 0..16 {
        ctx.pop_current().unwrap();
    }
    assert!(ctx.current().is_none());
    assert!(ctx.pop_current().is_err());
}
