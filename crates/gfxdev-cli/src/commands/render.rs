//! Render command implementation
//!
//! Builds the requested surface, redirects drawing to it through a
//! [`RenderContext`], draws the scene and writes the result.

use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use gfxdev_core::{ContextConfig, RenderContext, RgbImage, SurfaceDevice, SurfaceRef};
use gfxdev_export::{exporter_for, write_file};
use gfxdev_fontdb::FontDatabase;
use gfxdev_render_pdf::PdfSurface;
use gfxdev_render_ps::PostScriptSurface;
use gfxdev_render_raster::{FrameCapture, ImageSurface, WindowSurface};
use gfxdev_render_skia::SkiaSurface;
use gfxdev_render_svg::SvgSurface;

use crate::cli::{Backend, RenderArgs};
use crate::scene::{render_icon, Scene};

/// What a render produced, for the summary line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rendered {
    Image { width: u32, height: u32 },
    Document { pages: u32 },
}

pub fn run(args: &RenderArgs, config: ContextConfig) -> Result<Rendered> {
    if args.width == 0 || args.height == 0 {
        bail!("canvas must not be empty ({}x{})", args.width, args.height);
    }
    let scale = args.scale.unwrap_or(config.display_scale);
    if !(scale.is_finite() && scale > 0.0) {
        bail!("scale must be a positive number, got {scale}");
    }

    let mut scene = Scene::new(&args.title, args.width, args.height).with_icon(render_icon(32)?);
    if let Some(path) = &args.font_file {
        let registry = FontDatabase::new()
            .registry_with(path)
            .with_context(|| format!("loading {}", path.display()))?;
        scene = scene.with_fonts(Arc::new(registry));
    }

    let output = args.output_path();
    let mut ctx = RenderContext::with_config(config);
    log::info!(
        "Rendering {}x{} with the {:?} backend to {}",
        args.width,
        args.height,
        args.backend,
        output.display()
    );

    let rendered = match args.backend {
        Backend::Raster => {
            let surface = shared(ImageSurface::new(args.width, args.height, scale != 1.0, scale)?);
            draw_once(&mut ctx, &surface, &scene)?;
            let image = surface.borrow_mut().image()?;
            save_image(args, &image, &output)?
        },
        Backend::Skia => {
            let surface = shared(SkiaSurface::new(args.width, args.height, scale)?);
            draw_once(&mut ctx, &surface, &scene)?;
            let image = surface.borrow().image()?;
            save_image(args, &image, &output)?
        },
        Backend::Window => {
            let window = shared(WindowSurface::new(
                FrameCapture::new(),
                args.width,
                args.height,
                scale,
            )?);
            // Popping the window ends it as current, which presents the frame
            draw_once(&mut ctx, &window, &scene)?;
            let image = {
                let window = window.borrow();
                let frame = window
                    .presenter()
                    .last_frame()
                    .context("window presented no frame")?;
                frame.to_rgb_image()?
            };
            save_image(args, &image, &output)?
        },
        Backend::Svg => {
            let surface = shared(SvgSurface::new(args.width, args.height)?);
            draw_once(&mut ctx, &surface, &scene)?;
            surface.borrow().write_to(&output)?;
            Rendered::Document { pages: 1 }
        },
        Backend::Ps | Backend::Eps => {
            let job = if args.backend == Backend::Eps {
                PostScriptSurface::eps(args.width, args.height)?
            } else {
                PostScriptSurface::new(args.width, args.height)?
            };
            let job = shared(job);
            let pages = if args.backend == Backend::Eps { 1 } else { args.pages.max(1) };
            print_pages(&mut ctx, &job, &scene, pages, |job, open| {
                if open {
                    job.begin_page()
                } else {
                    job.end_page()
                }
            })?;
            job.borrow_mut().write_to(&output)?;
            Rendered::Document { pages }
        },
        Backend::Pdf => {
            let job = shared(PdfSurface::new(args.width, args.height)?);
            let pages = args.pages.max(1);
            print_pages(&mut ctx, &job, &scene, pages, |job, open| {
                if open {
                    job.begin_page()
                } else {
                    job.end_page()
                }
            })?;
            job.borrow_mut().write_to(&output)?;
            Rendered::Document { pages }
        },
    };
    Ok(rendered)
}

fn shared<T>(device: T) -> Rc<RefCell<T>> {
    Rc::new(RefCell::new(device))
}

/// Redirect to `device`, draw the scene, and restore the previous target
fn draw_once<T: SurfaceDevice + 'static>(
    ctx: &mut RenderContext,
    device: &Rc<RefCell<T>>,
    scene: &Scene,
) -> Result<()> {
    let target: SurfaceRef = device.clone();
    ctx.draw_into(&target, |s| scene.draw(s, 0))??;
    Ok(())
}

/// Print job: `page` opens (true) or closes (false) a page on the device
fn print_pages<T, F>(
    ctx: &mut RenderContext,
    device: &Rc<RefCell<T>>,
    scene: &Scene,
    pages: u32,
    page: F,
) -> Result<()>
where
    T: SurfaceDevice + 'static,
    F: Fn(&mut T, bool) -> gfxdev_core::Result<()>,
{
    let target: SurfaceRef = device.clone();
    ctx.push_current(&target)?;
    let result = (|| -> Result<()> {
        for n in 0..pages {
            page(&mut *device.borrow_mut(), true)?;
            ctx.draw(|s| scene.draw(s, n))??;
            page(&mut *device.borrow_mut(), false)?;
        }
        Ok(())
    })();
    // Restore the previous target even when a page failed
    ctx.pop_current()?;
    result
}

fn save_image(args: &RenderArgs, image: &RgbImage, output: &Path) -> Result<Rendered> {
    let exporter = exporter_for(&args.image_format())?;
    write_file(exporter.as_ref(), image, output)?;
    Ok(Rendered::Image {
        width: image.width(),
        height: image.height(),
    })
}
