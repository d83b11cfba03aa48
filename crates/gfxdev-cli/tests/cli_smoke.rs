//! CLI Smoke Tests
//!
//! `info` runs through the real binary; `render` is driven through the
//! library so every backend is exercised without process overhead.

use std::fs;
use std::path::PathBuf;
use std::process::Command;

use clap::Parser;
use gfxdev_cli::cli::{Cli, Commands, RenderArgs};
use gfxdev_cli::commands::render::{self, Rendered};
use gfxdev_core::ContextConfig;

/// A fresh output path under the system temp dir
fn temp_output(name: &str) -> PathBuf {
    let mut path = std::env::temp_dir();
    path.push(format!("gfxdev_test_{}_{name}", std::process::id()));
    path
}

fn render_args(extra: &[&str]) -> RenderArgs {
    let mut argv = vec!["gfxdev", "render"];
    argv.extend_from_slice(extra);
    match Cli::parse_from(argv).command {
        Commands::Render(args) => args,
        other => panic!("expected render, got {other:?}"),
    }
}

fn render_to(name: &str, extra: &[&str]) -> (Rendered, Vec<u8>) {
    let output = temp_output(name);
    let out = output.to_string_lossy().into_owned();
    let mut argv = vec!["-o", out.as_str()];
    argv.extend_from_slice(extra);
    let rendered = render::run(&render_args(&argv), ContextConfig::default()).unwrap();
    let bytes = fs::read(&output).unwrap();
    let _ = fs::remove_file(&output);
    (rendered, bytes)
}

#[test]
fn test_info_lists_backends() {
    let output = Command::new(env!("CARGO_BIN_EXE_gfxdev"))
        .arg("info")
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Backends:"));
    assert!(stdout.contains("pdf"));
    assert!(stdout.contains("stack capacity    16"));
}

#[test]
fn test_raster_png() {
    let (rendered, bytes) = render_to("raster.png", &["-b", "raster"]);
    assert_eq!(
        rendered,
        Rendered::Image {
            width: 320,
            height: 200
        }
    );
    assert!(bytes.starts_with(b"\x89PNG\r\n\x1a\n"));
}

#[test]
fn test_skia_ppm_at_double_scale() {
    let (rendered, bytes) = render_to("skia.ppm", &["-b", "skia", "-s", "2"]);
    assert_eq!(
        rendered,
        Rendered::Image {
            width: 640,
            height: 400
        }
    );
    assert!(bytes.starts_with(b"P6\n640 400\n255\n"));
}

#[test]
fn test_window_frame_is_captured() {
    let (rendered, bytes) = render_to("window.pgm", &["-b", "window", "-W", "100", "-H", "80"]);
    assert_eq!(
        rendered,
        Rendered::Image {
            width: 100,
            height: 80
        }
    );
    assert!(bytes.starts_with(b"P5\n100 80\n255\n"));
}

#[test]
fn test_svg_document() {
    let (_, bytes) = render_to("dialog.svg", &["-b", "svg", "-t", "Hello & bye"]);
    let svg = String::from_utf8(bytes).unwrap();
    assert!(svg.contains("<svg"));
    assert!(svg.contains("Hello &amp; bye"));
    assert!(svg.contains("clip-path="));
}

#[test]
fn test_postscript_pages() {
    let (rendered, bytes) = render_to("dialog.ps", &["-b", "ps", "--pages", "2"]);
    assert_eq!(rendered, Rendered::Document { pages: 2 });
    let ps = String::from_utf8(bytes).unwrap();
    assert!(ps.contains("%%Pages: 2\n"));
    assert!(ps.contains("(Page 2) show"));
}

#[test]
fn test_eps_ignores_page_count() {
    let (rendered, bytes) = render_to("dialog.eps", &["-b", "eps", "--pages", "3"]);
    assert_eq!(rendered, Rendered::Document { pages: 1 });
    assert!(bytes.starts_with(b"%!PS-Adobe-3.0 EPSF-3.0\n"));
}

#[test]
fn test_pdf_document() {
    let (rendered, bytes) = render_to("dialog.pdf", &["-b", "pdf"]);
    assert_eq!(rendered, Rendered::Document { pages: 1 });
    assert!(bytes.starts_with(b"%PDF-1.4\n"));
    assert!(bytes.ends_with(b"%%EOF\n"));
}

#[test]
fn test_bad_input_fails() {
    let config = ContextConfig::default();
    assert!(render::run(&render_args(&["-W", "0"]), config).is_err());
    assert!(render::run(&render_args(&["--scale=-1"]), config).is_err());
    let out = temp_output("bad.gif");
    let out = out.to_string_lossy().into_owned();
    assert!(render::run(&render_args(&["-o", out.as_str()]), config).is_err());
    let missing = ["--font-file", "/nonexistent/font.ttf"];
    assert!(render::run(&render_args(&missing), config).is_err());
}
