//! Info command implementation
//!
//! Lists the drivers this build can draw with and what they write.

use anyhow::Result;
use gfxdev_core::ContextConfig;

pub fn run(config: &ContextConfig) -> Result<()> {
    println!("gfxdev v{}", env!("CARGO_PKG_VERSION"));
    println!();
    print_backends();
    println!();
    print_formats();
    println!();
    println!("Context:");
    println!("  stack capacity    {}", config.stack_capacity);
    println!("  overflow policy   {:?}", config.overflow_policy);
    println!("  display scale     {}", config.display_scale);
    Ok(())
}

fn print_backends() {
    println!("Backends:");
    println!("  raster            - Scanline rasterizer, offscreen image surface");
    println!("  skia              - tiny-skia, anti-aliased");
    println!("  window            - Window surface presenting to memory");
    println!("  svg               - SVG 1.1 document");
    println!("  ps                - PostScript Level 2, multi-page");
    println!("  eps               - Encapsulated PostScript, one page");
    println!("  pdf               - PDF 1.4, multi-page");
}

fn print_formats() {
    println!("Image formats (raster, skia, window):");
    println!("  png               - Portable Network Graphics");
    println!("  ppm / pgm / pbm   - Binary Netpbm color, gray, bitmap");
}
