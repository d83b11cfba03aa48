//! Command-line front end for the gfxdev drivers
//!
//! The `gfxdev` binary draws one demo dialog ([`scene::Scene`]) on any
//! backend: raster images, a presented window frame, SVG, PostScript, EPS
//! or PDF. The library half exposes the pieces so tests can drive them
//! without spawning the binary.

pub mod cli;
pub mod commands;
pub mod scene;
