//! Integration tests for the tiny-skia backend

use std::cell::RefCell;
use std::rc::Rc;

use gfxdev_core::{Color, Dash, LineStyle, RenderContext, SurfaceDevice, SurfaceRef};
use gfxdev_render_skia::{SkiaDriver, SkiaSurface};

fn surface(w: u32, h: u32, scale: f64) -> Rc<RefCell<SkiaSurface>> {
    Rc::new(RefCell::new(SkiaSurface::new(w, h, scale).unwrap()))
}

fn pixel(surface: &Rc<RefCell<SkiaSurface>>, x: u32, y: u32) -> Color {
    surface.borrow().driver().unwrap().pixel(x, y).unwrap()
}

#[test]
fn current_surface_receives_drawing() {
    let target = surface(30, 30, 1.0);
    let target_ref: SurfaceRef = target.clone();

    let mut ctx = RenderContext::new();
    ctx.set_current(&target_ref).unwrap();
    ctx.draw(|s| {
        s.set_color(Color::GREEN);
        s.rectf(0, 0, 30, 30);
    })
    .unwrap();

    let image = target.borrow().image().unwrap();
    assert_eq!(image.depth(), 3);
    assert!(image.pixels().chunks(3).all(|px| px == [0, 255, 0]));
}

#[test]
fn zero_size_is_rejected() {
    assert!(SkiaSurface::new(0, 10, 1.0).is_err());
}

#[test]
fn hidpi_snapshot_keeps_logical_size() {
    let target = surface(10, 8, 2.0);
    {
        let mut t = target.borrow_mut();
        t.surface_mut().set_color(Color::RED);
        t.surface_mut().rectf(5, 0, 5, 8);
    }
    let image = target.borrow().image().unwrap();
    assert_eq!((image.width(), image.height()), (20, 16));
    assert_eq!((image.display_width(), image.display_height()), (10, 8));
    assert_eq!(image.pixel(15, 8), Color::RED);
    assert_eq!(image.pixel(4, 8), Color::WHITE);
}

#[test]
fn dashed_stroke_leaves_gaps() {
    let target = surface(40, 10, 1.0);
    {
        let mut t = target.borrow_mut();
        let s = t.surface_mut();
        s.set_line_style(LineStyle::solid(2.0).with_dash(Dash::Dash));
        s.line(0, 5, 39, 5);
    }
    // Pattern is 6 on, 2 off, starting at the first pixel center
    assert_eq!(pixel(&target, 3, 5), Color::BLACK);
    assert_eq!(pixel(&target, 7, 5), Color::WHITE);
    assert_eq!(pixel(&target, 11, 5), Color::BLACK);
}

#[test]
fn text_without_outlines_still_marks() {
    let target = surface(60, 30, 1.0);
    {
        let mut t = target.borrow_mut();
        t.surface_mut().draw_text("Hi", 5, 20);
    }
    let snapshot = target.borrow().image().unwrap();
    let inked = snapshot
        .pixels()
        .chunks(3)
        .filter(|px| px[0] < 128)
        .count();
    assert!(inked > 0);
}

#[test]
fn translated_drawing_lands_offset() {
    let target = surface(20, 20, 1.0);
    {
        let mut t = target.borrow_mut();
        let s = t.surface_mut();
        s.translate(10, 10);
        s.set_color(Color::BLUE);
        s.rectf(0, 0, 5, 5);
        s.untranslate().unwrap();
    }
    assert_eq!(pixel(&target, 12, 12), Color::BLUE);
    assert_eq!(pixel(&target, 2, 2), Color::WHITE);
}

#[test]
fn driver_is_reachable_by_downcast() {
    let target = surface(4, 4, 1.0);
    let t = target.borrow();
    assert!(t.surface().driver_as::<SkiaDriver>().is_some());
    assert_eq!(t.surface().driver().name(), "skia");
}
