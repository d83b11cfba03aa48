//! Error types for gfxdev
//!
//! Degenerate drawing input is never an error: a zero-size rectangle or an
//! empty string simply draws nothing. What does surface here are broken
//! stack discipline and exhausted resources.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, GfxError>;

/// Main error type for gfxdev
#[derive(Debug, Error)]
pub enum GfxError {
    #[error("Surface error: {0}")]
    Surface(#[from] SurfaceError),

    #[error("Rendering failed: {0}")]
    Render(#[from] RenderError),

    #[error("Export failed: {0}")]
    Export(#[from] ExportError),

    #[error("Font error: {0}")]
    Font(#[from] FontError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Redirection and state stack violations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SurfaceError {
    #[error("Surface stack overflow (capacity {capacity})")]
    StackOverflow { capacity: usize },

    #[error("Surface stack underflow: pop_current without matching push_current")]
    StackUnderflow,

    #[error("No current surface")]
    NoCurrentSurface,

    #[error("Surface is already borrowed for drawing")]
    Busy,

    #[error("Clip stack underflow")]
    ClipUnderflow,

    #[error("Translation stack underflow")]
    OriginUnderflow,

    #[error("Matrix stack underflow")]
    MatrixUnderflow,
}

/// Rendering resource errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error("Invalid dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("Could not allocate {bytes} bytes for a pixel buffer")]
    AllocationFailed { bytes: usize },

    #[error("Buffer too small: expected {expected} bytes, got {actual}")]
    BufferTooSmall { expected: usize, actual: usize },

    #[error("Unsupported image depth: {0}")]
    UnsupportedDepth(u8),

    #[error("Backend error: {0}")]
    Backend(String),
}

/// Export errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExportError {
    #[error("Format not supported: {0}")]
    FormatNotSupported(String),

    #[error("Encoding failed: {0}")]
    EncodingFailed(String),

    #[error("Write failed: {0}")]
    WriteFailed(String),
}

/// Font loading errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FontError {
    #[error("Font file not found: {0}")]
    FileNotFound(String),

    #[error("Invalid font data")]
    InvalidData,
}
