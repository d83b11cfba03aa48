//! Integration tests for the raster backend: redirection, snapshots and
//! compositing through image surfaces

use std::cell::RefCell;
use std::rc::Rc;

use gfxdev_core::{
    Color, ContextConfig, Features, GfxError, LineStyle, RenderContext, Surface, SurfaceDevice,
    SurfaceError, SurfaceRef,
};
use gfxdev_render_raster::{
    FrameCapture, ImageSurface, Offscreen, RasterDriver, WindowSurface,
};

fn offscreen(w: u32, h: u32) -> Rc<RefCell<ImageSurface>> {
    Rc::new(RefCell::new(ImageSurface::new(w, h, false, 1.0).unwrap()))
}

fn pixels(surface: &Rc<RefCell<ImageSurface>>) -> Vec<u8> {
    surface.borrow().offscreen().unwrap().pixels().to_vec()
}

#[test]
fn offscreen_fill_reads_back_exactly() {
    let window = Rc::new(RefCell::new(
        WindowSurface::new(FrameCapture::new(), 50, 50, 1.0).unwrap(),
    ));
    let window_ref: SurfaceRef = window.clone();
    let target = offscreen(100, 100);
    let target_ref: SurfaceRef = target.clone();

    let mut ctx = RenderContext::new();
    ctx.set_current(&window_ref).unwrap();
    ctx.push_current(&target_ref).unwrap();
    ctx.draw(|s| {
        s.set_color(Color::from_hex(0xFF0000));
        s.rectf(0, 0, 100, 100);
    })
    .unwrap();
    ctx.pop_current().unwrap();

    let image = target.borrow_mut().image().unwrap();
    assert_eq!((image.width(), image.height()), (100, 100));
    assert_eq!(image.depth(), 3);
    assert!(image.pixels().chunks(3).all(|px| px == [255, 0, 0]));
}

#[test]
fn redirection_leaves_previous_surface_untouched() {
    let first = offscreen(40, 40);
    let second = offscreen(40, 40);
    let first_ref: SurfaceRef = first.clone();
    let second_ref: SurfaceRef = second.clone();
    let before = pixels(&first);

    let mut ctx = RenderContext::new();
    ctx.set_current(&first_ref).unwrap();
    ctx.push_current(&second_ref).unwrap();
    ctx.draw(|s| {
        s.set_color(Color::BLUE);
        s.rectf(5, 5, 10, 10);
        s.line(0, 0, 39, 39);
        s.draw_text("redirected", 2, 30);
    })
    .unwrap();
    ctx.pop_current().unwrap();

    assert!(ctx.is_current(&first_ref));
    assert_eq!(pixels(&first), before);
    assert_ne!(pixels(&second), before);
}

#[test]
fn snapshot_is_isolated_from_later_drawing() {
    let target = offscreen(20, 20);
    let image = {
        let mut t = target.borrow_mut();
        t.surface_mut().set_color(Color::GREEN);
        t.surface_mut().rectf(0, 0, 10, 10);
        t.image().unwrap()
    };
    let frozen = image.pixels().to_vec();

    let mut t = target.borrow_mut();
    t.surface_mut().set_color(Color::BLACK);
    t.surface_mut().rectf(0, 0, 20, 20);
    assert_eq!(image.pixels(), frozen.as_slice());
    assert_eq!(image.pixel(15, 15), Color::WHITE);
    assert_eq!(t.image().unwrap().pixel(15, 15), Color::BLACK);
}

#[test]
fn degenerate_draws_leave_buffer_unchanged() {
    let target = offscreen(30, 30);
    let before = pixels(&target);
    {
        let mut t = target.borrow_mut();
        let s = t.surface_mut();
        s.set_color(Color::RED);
        s.set_line_style(LineStyle::solid(3.0));
        for (w, h) in [(0, 10), (10, 0), (-5, 10), (10, -5), (0, 0)] {
            s.rectf(5, 5, w, h);
            s.rect(5, 5, w, h);
            s.rounded_rect(5, 5, w, h, 2);
            s.rounded_rectf(5, 5, w, h, 2);
            s.ellipse(5, 5, w, h);
            s.filled_ellipse(5, 5, w, h);
            s.arc(5, 5, w, h, 0.0, 180.0);
            s.pie(5, 5, w, h, 0.0, 90.0);
            s.focus_rect(5, 5, w, h);
            s.rectf_rgb(5, 5, w, h, 0, 0, 255);
            s.draw_image_mono(&[0u8; 16], 5, 5, w, h);
        }
        s.draw_text("", 5, 20);
        s.begin_polygon();
        s.end_polygon();
        s.begin_complex_polygon();
        s.vertex(1.0, 1.0);
        s.end_complex_polygon();
    }
    assert_eq!(pixels(&target), before);
}

#[test]
fn complex_polygon_even_odd_leaves_hole() {
    let target = offscreen(20, 20);
    {
        let mut t = target.borrow_mut();
        let s = t.surface_mut();
        s.set_color(Color::BLACK);
        s.begin_complex_polygon();
        for (x, y) in [(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)] {
            s.vertex(x, y);
        }
        s.gap();
        for (x, y) in [(3.0, 3.0), (7.0, 3.0), (7.0, 7.0), (3.0, 7.0)] {
            s.vertex(x, y);
        }
        s.end_complex_polygon();
    }
    let image = target.borrow_mut().image().unwrap();
    for y in 0..10 {
        for x in 0..10 {
            let in_hole = (3..7).contains(&x) && (3..7).contains(&y);
            let expected = if in_hole { Color::WHITE } else { Color::BLACK };
            assert_eq!(image.pixel(x, y), expected, "pixel ({x}, {y})");
        }
    }
    assert_eq!(image.pixel(10, 5), Color::WHITE);
}

#[test]
fn overflowing_push_keeps_sixteenth_surface() {
    let surfaces: Vec<Rc<RefCell<ImageSurface>>> = (0..17).map(|_| offscreen(4, 4)).collect();
    let refs: Vec<SurfaceRef> = surfaces.iter().map(|s| s.clone() as SurfaceRef).collect();

    let mut ctx = RenderContext::new();
    for r in refs.iter().take(16) {
        ctx.push_current(r).unwrap();
    }
    let err = ctx.push_current(&refs[16]).unwrap_err();
    assert!(matches!(
        err,
        GfxError::Surface(SurfaceError::StackOverflow { capacity: 16 })
    ));
    assert!(ctx.is_current(&refs[15]));

    ctx.draw(|s| {
        s.set_color(Color::RED);
        s.rectf(0, 0, 4, 4);
    })
    .unwrap();
    assert_eq!(surfaces[15].borrow_mut().image().unwrap().pixel(0, 0), Color::RED);
    assert_eq!(surfaces[16].borrow_mut().image().unwrap().pixel(0, 0), Color::WHITE);
}

#[test]
fn configured_capacity_is_honored() {
    let mut ctx = RenderContext::with_config(ContextConfig::default().with_stack_capacity(2));
    let refs: Vec<SurfaceRef> = (0..3).map(|_| offscreen(2, 2) as SurfaceRef).collect();
    ctx.push_current(&refs[0]).unwrap();
    ctx.push_current(&refs[1]).unwrap();
    assert!(ctx.push_current(&refs[2]).is_err());
    assert!(ctx.is_current(&refs[1]));
}

#[test]
fn nested_offscreen_composites_into_parent() {
    let parent = offscreen(20, 20);
    let child = offscreen(5, 5);
    let parent_ref: SurfaceRef = parent.clone();
    let child_ref: SurfaceRef = child.clone();

    let mut ctx = RenderContext::new();
    ctx.push_current(&parent_ref).unwrap();
    ctx.draw_into(&child_ref, |s| {
        s.set_color(Color::BLUE);
        s.rectf(0, 0, 5, 5);
    })
    .unwrap();
    assert!(ctx.is_current(&parent_ref));

    ctx.draw(|s| child.borrow_mut().draw_onto(s, 10, 10))
        .unwrap()
        .unwrap();
    ctx.pop_current().unwrap();

    let image = parent.borrow_mut().image().unwrap();
    assert_eq!(image.pixel(10, 10), Color::BLUE);
    assert_eq!(image.pixel(14, 14), Color::BLUE);
    assert_eq!(image.pixel(15, 15), Color::WHITE);
    assert_eq!(image.pixel(9, 9), Color::WHITE);
}

#[test]
fn drawing_surface_onto_itself_is_busy() {
    let target = offscreen(8, 8);
    let target_ref: SurfaceRef = target.clone();
    let mut ctx = RenderContext::new();
    ctx.set_current(&target_ref).unwrap();
    let result = ctx.draw(|_| ctx.draw(|_| ()));
    assert!(matches!(
        result,
        Ok(Err(GfxError::Surface(SurfaceError::Busy)))
    ));
}

#[test]
fn high_res_snapshot_draws_at_logical_size() {
    let hidpi = Rc::new(RefCell::new(ImageSurface::new(10, 10, true, 2.0).unwrap()));
    {
        let mut h = hidpi.borrow_mut();
        h.surface_mut().set_color(Color::RED);
        h.surface_mut().rectf(0, 0, 10, 10);
    }
    let hi = hidpi.borrow_mut().highres_image().unwrap();
    assert_eq!((hi.width(), hi.height()), (20, 20));
    assert_eq!((hi.display_width(), hi.display_height()), (10, 10));

    let target = offscreen(30, 30);
    {
        let mut t = target.borrow_mut();
        hidpi.borrow_mut().draw_onto(t.surface_mut(), 5, 5).unwrap();
    }
    let image = target.borrow_mut().image().unwrap();
    assert_eq!(image.pixel(5, 5), Color::RED);
    assert_eq!(image.pixel(14, 14), Color::RED);
    assert_eq!(image.pixel(15, 15), Color::WHITE);
}

#[test]
fn detached_buffer_outlives_surface() {
    let mut surface = ImageSurface::new(6, 6, false, 1.0).unwrap();
    surface.translate(2, 2);
    surface.surface_mut().set_color(Color::BLACK);
    surface.surface_mut().rectf(0, 0, 2, 2);
    surface.untranslate().unwrap();
    assert_eq!(surface.origin(), (0, 0));

    let buffer: Offscreen = surface.into_offscreen().unwrap();
    assert_eq!(buffer.pixel(2, 2), Color::BLACK);
    assert_eq!(buffer.pixel(1, 1), Color::WHITE);

    // The same buffer can be wrapped again and keeps its contents
    let mut again = ImageSurface::from_offscreen(buffer);
    assert_eq!(again.image().unwrap().pixel(3, 3), Color::BLACK);
}

#[test]
fn dropped_current_surface_reports_no_surface() {
    let mut ctx = RenderContext::new();
    {
        let temp: SurfaceRef = offscreen(4, 4);
        ctx.set_current(&temp).unwrap();
    }
    assert!(ctx.current().is_none());
    assert!(matches!(
        ctx.draw(|_| ()),
        Err(GfxError::Surface(SurfaceError::NoCurrentSurface))
    ));
}

#[test]
fn window_presents_when_replaced() {
    let window = Rc::new(RefCell::new(
        WindowSurface::new(FrameCapture::new(), 16, 16, 1.0).unwrap(),
    ));
    let window_ref: SurfaceRef = window.clone();
    let other: SurfaceRef = offscreen(4, 4);

    let mut ctx = RenderContext::new();
    ctx.set_current(&window_ref).unwrap();
    ctx.draw(|s| {
        assert!(s.has_feature(Features::NATIVE));
        s.set_color(Color::BLUE);
        s.rectf(0, 0, 8, 8);
    })
    .unwrap();
    ctx.set_current(&other).unwrap();

    let w = window.borrow();
    assert_eq!(w.frames(), 1);
    assert_eq!(w.presenter().binds(), 1);
    let frame = w.presenter().last_frame().unwrap();
    assert_eq!(frame.pixel(4, 4), Color::BLUE);
}

#[test]
fn raster_surface_without_image_wrapper() {
    let mut s = Surface::new(Box::new(RasterDriver::new(10, 10).unwrap()), 1.0);
    s.set_color(Color::RED);
    s.push_clip(0, 0, 5, 10);
    s.rectf(0, 0, 10, 10);
    s.pop_clip().unwrap();
    let buffer = s.driver_as::<RasterDriver>().unwrap().buffer();
    assert_eq!(buffer.pixel(4, 4), Color::RED);
    assert_eq!(buffer.pixel(5, 4), Color::WHITE);
}
