//! Paged glyph atlas font rendering
//!
//! This crate provides:
//! - Lazily generated atlas pages covering fixed-size buckets of codepoints
//! - Multi-font fallback (first font that can display a character wins)
//! - Asynchronous, cancellable pre-baking of a configured character set
//! - `§`-prefixed color control codes
//! - Per-call draw batching keyed by atlas texture
//!
//! GPU work is delegated to a [`RenderBackend`]; font parsing is delegated to
//! [`FontHandle`] implementations such as [`SwashFont`].

pub mod backend;
pub mod batch;
pub mod cache;
pub mod color;
pub mod config;
pub mod control;
pub mod font;
pub mod headless;
pub mod page;
pub mod prebake;
pub mod rasterizer;
pub mod registry;
pub mod renderer;
pub mod scale;
#[cfg(feature = "wgpu")]
pub mod wgpu_backend;

pub use backend::{BackendError, GlyphVertex, RenderBackend};
pub use color::{palette_color, Color, PALETTE};
pub use config::FontRendererConfig;
pub use control::{strip_control_codes, ControlCodes, Token, ESCAPE};
pub use font::{FontHandle, FontSet, GlyphBitmap, GlyphExtent, GlyphPixels};
pub use headless::{HeadlessBackend, RecordedDraw};
pub use page::{AtlasPage, Glyph, PageKey, TextureId};
pub use prebake::{
    CancellationToken, InlineExecutor, PrebakeOutcome, TaskExecutor, TaskHandle, ThreadExecutor,
    TokioExecutor,
};
pub use rasterizer::SwashFont;
pub use registry::{FontRegistry, GenericFont};
pub use renderer::{FontRenderer, FontRendererBuilder};
pub use scale::{FixedScale, ScaleSource, SharedScale};
#[cfg(feature = "wgpu")]
pub use wgpu_backend::{TextDrawCall, WgpuBackend};

use thiserror::Error;

/// Text rendering errors
#[derive(Error, Debug)]
pub enum TextError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(&'static str),

    #[error("Font renderer is already initialized")]
    AlreadyInitialized,

    #[error("Character {c:?} is outside atlas page range {start:#x}..{end:#x}")]
    OutOfPageRange { c: char, start: u32, end: u32 },

    #[error("Glyph not found for codepoint: {0:?}")]
    GlyphNotFound(char),

    #[error("Failed to load font: {0}")]
    FontLoadError(String),

    #[error("Invalid font data")]
    InvalidFontData,

    #[error("Invalid configuration: {0}")]
    Config(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, TextError>;
