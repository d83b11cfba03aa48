//! Integration tests for the PDF backend

use std::cell::RefCell;
use std::rc::Rc;

use gfxdev_core::record::RecordingDriver;
use gfxdev_core::{
    Color, FillRule, FontId, RenderContext, RgbImage, Surface, SurfaceDevice, SurfaceRef,
};
use gfxdev_render_pdf::PdfSurface;

fn text(pdf: &[u8]) -> String {
    String::from_utf8_lossy(pdf).into_owned()
}

#[test]
fn print_job_draws_into_page_content() {
    let screen: SurfaceRef = Rc::new(RefCell::new(Surface::new(
        Box::new(RecordingDriver::new()),
        1.0,
    )));
    let job = Rc::new(RefCell::new(PdfSurface::new(200, 100).unwrap()));
    let job_ref: SurfaceRef = job.clone();

    let mut ctx = RenderContext::new();
    ctx.set_current(&screen).unwrap();
    ctx.push_current(&job_ref).unwrap();
    job.borrow_mut().begin_page().unwrap();
    ctx.draw(|s| {
        s.set_color(Color::RED);
        s.rectf(10, 20, 30, 40);
    })
    .unwrap();
    job.borrow_mut().end_page().unwrap();
    ctx.pop_current().unwrap();
    assert!(ctx.is_current(&screen));

    let pdf = text(&job.borrow_mut().finish().unwrap());
    assert!(pdf.starts_with("%PDF-1.4\n"));
    assert!(pdf.contains("q\n1 0 0 -1 0 100 cm\n"));
    assert!(pdf.contains("1 0 0 rg\n10 20 30 40 re f\n"));
    assert!(pdf.contains("/MediaBox [0 0 200 100]"));
}

#[test]
fn page_tree_counts_pages() {
    let mut job = PdfSurface::new(50, 50).unwrap();
    for _ in 0..3 {
        job.begin_page().unwrap();
        job.surface_mut().rectf(0, 0, 5, 5);
        job.end_page().unwrap();
    }
    assert_eq!(job.pages(), 3);
    let pdf = text(&job.finish().unwrap());
    assert!(pdf.contains("/Count 3 >>"));
    assert_eq!(pdf.matches("/Type /Page ").count(), 3);
}

#[test]
fn zero_size_rejected() {
    assert!(PdfSurface::new(0, 10).is_err());
}

#[test]
fn text_selects_standard_font() {
    let mut job = PdfSurface::new(200, 100).unwrap();
    job.begin_page().unwrap();
    {
        let s = job.surface_mut();
        s.set_font(FontId::TimesBold, 12.0);
        s.draw_text("Hi", 10, 50);
        s.draw_text("again", 10, 70);
    }
    let pdf = text(&job.finish().unwrap());
    assert_eq!(
        pdf.matches("/BaseFont /Times-Bold /Encoding /WinAnsiEncoding").count(),
        1
    );
    assert!(pdf.contains("q\n1 0 0 -1 10 50 cm\nBT\n/F1 12 Tf\n0 0 Td\n(Hi) Tj\nET\nQ\n"));
}

#[test]
fn clip_is_reapplied_on_new_page() {
    let mut job = PdfSurface::new(100, 100).unwrap();
    job.begin_page().unwrap();
    job.surface_mut().push_clip(0, 0, 40, 40);
    job.surface_mut().rectf(0, 0, 60, 60);
    job.end_page().unwrap();
    job.begin_page().unwrap();
    job.surface_mut().rectf(0, 0, 60, 60);
    let pdf = text(&job.finish().unwrap());
    assert_eq!(pdf.matches("q\n0 0 40 40 re W n\n").count(), 2);
}

#[test]
fn even_odd_fill_uses_star_operator() {
    let mut job = PdfSurface::new(20, 20).unwrap();
    job.begin_page().unwrap();
    {
        let s = job.surface_mut();
        s.set_fill_rule(FillRule::EvenOdd);
        s.begin_complex_polygon();
        for (x, y) in [(0.0, 0.0), (10.0, 0.0), (10.0, 10.0)] {
            s.vertex(x, y);
        }
        s.gap();
        for (x, y) in [(2.0, 1.0), (8.0, 1.0), (8.0, 6.0)] {
            s.vertex(x, y);
        }
        s.end_complex_polygon();
    }
    let pdf = text(&job.finish().unwrap());
    assert_eq!(pdf.matches("h\n").count(), 2);
    assert!(pdf.contains("f*\n"));
}

#[test]
fn cached_image_is_one_xobject() {
    let mut job = PdfSurface::new(20, 20).unwrap();
    job.begin_page().unwrap();
    let image = RgbImage::new(vec![255, 0, 0, 128, 0, 0, 255, 255], 2, 1, 4).unwrap();
    {
        let s = job.surface_mut();
        s.draw_rgb(&image, 1, 1);
        s.draw_rgb(&image, 5, 5);
    }
    assert_eq!(job.driver().unwrap().image_count(), 1);
    let pdf = text(&job.finish().unwrap());
    assert_eq!(pdf.matches("/Im1 Do").count(), 2);
    assert!(pdf.contains("2 0 0 -1 1 2 cm\n/Im1 Do\n"));
    assert!(pdf.contains("/SMask"));
}

#[test]
fn uncache_writes_a_fresh_xobject() {
    let mut job = PdfSurface::new(20, 20).unwrap();
    job.begin_page().unwrap();
    let image = RgbImage::new(vec![0, 0, 0], 1, 1, 3).unwrap();
    {
        let s = job.surface_mut();
        s.draw_rgb(&image, 0, 0);
        s.uncache(&image);
        s.draw_rgb(&image, 0, 0);
    }
    assert_eq!(job.driver().unwrap().image_count(), 2);
    let pdf = text(&job.finish().unwrap());
    assert!(!pdf.contains("/SMask"));
}
