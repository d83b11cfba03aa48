//! CLI argument definitions using Clap v4

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};

/// gfxdev - draw the demo dialog on any graphics driver
#[derive(Parser, Debug)]
#[command(name = "gfxdev")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// More log output (-v debug, -vv trace); RUST_LOG wins when set
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List drivers and output formats
    #[command(alias = "i")]
    Info,

    /// Draw the demo scene and write it to a file
    #[command(alias = "r")]
    Render(RenderArgs),
}

/// Where the scene is drawn
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Backend {
    /// Built-in scanline rasterizer (offscreen image surface)
    Raster,
    /// tiny-skia, anti-aliased
    Skia,
    /// Window surface with an in-memory presenter
    Window,
    Svg,
    Ps,
    Eps,
    Pdf,
}

impl Backend {
    /// Pixel-producing drivers need an image format; the rest write documents
    pub fn is_raster(self) -> bool {
        matches!(self, Backend::Raster | Backend::Skia | Backend::Window)
    }

    pub fn default_extension(self) -> &'static str {
        match self {
            Backend::Raster | Backend::Skia | Backend::Window => "png",
            Backend::Svg => "svg",
            Backend::Ps => "ps",
            Backend::Eps => "eps",
            Backend::Pdf => "pdf",
        }
    }
}

/// Arguments for the render command
#[derive(Parser, Debug)]
pub struct RenderArgs {
    /// Driver to draw with
    #[arg(short = 'b', long = "backend", value_enum, default_value = "raster")]
    pub backend: Backend,

    /// Output file (defaults to dialog.<ext>)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Image format for pixel backends: png, ppm, pgm, pbm (from the extension if omitted)
    #[arg(short = 'f', long = "format")]
    pub format: Option<String>,

    /// Logical width
    #[arg(short = 'W', long = "width", default_value = "320")]
    pub width: u32,

    /// Logical height
    #[arg(short = 'H', long = "height", default_value = "200")]
    pub height: u32,

    /// Display scale; pixel backends render this many times denser
    #[arg(short = 's', long = "scale")]
    pub scale: Option<f64>,

    /// Title drawn in the dialog's title bar
    #[arg(short = 't', long = "title", default_value = "gfxdev")]
    pub title: String,

    /// Font file used for every font slot
    #[arg(long = "font-file")]
    pub font_file: Option<PathBuf>,

    /// Pages to print (ps and pdf)
    #[arg(long = "pages", default_value = "1")]
    pub pages: u32,
}

impl RenderArgs {
    pub fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| PathBuf::from(format!("dialog.{}", self.backend.default_extension())))
    }

    /// Explicit format, else the output extension, else png
    pub fn image_format(&self) -> String {
        self.format
            .clone()
            .or_else(|| {
                self.output
                    .as_ref()
                    .and_then(|p| p.extension())
                    .map(|ext| ext.to_string_lossy().into_owned())
            })
            .unwrap_or_else(|| "png".to_string())
    }
}
