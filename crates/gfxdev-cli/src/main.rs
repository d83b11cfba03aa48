//! gfxdev CLI - draw the demo dialog with any graphics driver

use anyhow::Result;
use clap::Parser;
use gfxdev_cli::cli::{Cli, Commands};
use gfxdev_cli::commands::{self, render::Rendered};
use gfxdev_core::ContextConfig;

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    // GFXDEV_* variables tune the redirection stack and default scale
    let config = ContextConfig::from_env()?;

    match cli.command {
        Commands::Info => commands::info::run(&config),
        Commands::Render(args) => {
            let output = args.output_path();
            match commands::render::run(&args, config)? {
                Rendered::Image { width, height } => {
                    println!("✓ Rendered {width}×{height} pixels to {}", output.display())
                },
                Rendered::Document { pages } => {
                    println!("✓ Wrote {pages} page(s) to {}", output.display())
                },
            }
            Ok(())
        },
    }
}
