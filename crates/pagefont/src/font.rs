//! Font-source boundary
//!
//! A [`FontHandle`] is one font at one pixel size. A [`FontSet`] is the ordered
//! fallback list the renderer asks, in order, whether it can display a character.

use crate::{Result, TextError};
use std::fmt;
use std::sync::Arc;

/// Logical size of a character cell at the font's pixel size
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GlyphExtent {
    /// Horizontal advance in pixels
    pub width: f32,
    /// Line height (ascent + descent + leading) in pixels
    pub height: f32,
}

/// Pixel payload of a rasterized glyph
#[derive(Debug, Clone, PartialEq)]
pub enum GlyphPixels {
    /// One coverage byte per pixel, drawn white with coverage as alpha
    Coverage(Vec<u8>),
    /// Four bytes per pixel (color glyphs)
    Rgba(Vec<u8>),
}

/// A rasterized glyph image positioned relative to the pen origin on the baseline
#[derive(Debug, Clone, PartialEq)]
pub struct GlyphBitmap {
    /// Offset from the pen origin to the left edge
    pub left: i32,
    /// Offset from the baseline up to the top edge
    pub top: i32,
    pub width: u32,
    pub height: u32,
    pub pixels: GlyphPixels,
}

/// One font at one pixel size
///
/// Implementations must be cheap to [`derive`](FontHandle::derive) and safe to
/// use from the pre-bake worker.
pub trait FontHandle: Send + Sync + fmt::Debug {
    /// A copy of this font at another pixel size
    fn derive(&self, size_px: f32) -> Arc<dyn FontHandle>;

    /// Pixel size this handle measures and rasterizes at
    fn size_px(&self) -> f32;

    /// Whether the font has a real glyph for `c`
    fn can_display(&self, c: char) -> bool;

    /// Cell size of `c`
    fn measure(&self, c: char) -> GlyphExtent;

    /// Distance from the top of a line to the baseline, in pixels
    fn ascent(&self) -> f32;

    /// Rasterize `c`, or `None` if it has no ink (e.g. space).
    /// Characters the font cannot display render its missing-glyph shape.
    fn rasterize(&self, c: char) -> Option<GlyphBitmap>;
}

/// Ordered, non-empty list of interchangeable fonts
#[derive(Debug, Clone)]
pub struct FontSet {
    fonts: Arc<[Arc<dyn FontHandle>]>,
}

impl FontSet {
    pub fn new(fonts: Vec<Arc<dyn FontHandle>>) -> Result<Self> {
        if fonts.is_empty() {
            return Err(TextError::InvalidArgument("font list must not be empty"));
        }
        Ok(Self {
            fonts: fonts.into(),
        })
    }

    /// First font that can display `c`, or the first font (missing glyph) if none can
    pub fn select(&self, c: char) -> &Arc<dyn FontHandle> {
        self.fonts
            .iter()
            .find(|font| font.can_display(c))
            .unwrap_or(&self.fonts[0])
    }

    /// Every font re-created at `size_px`
    pub fn derive(&self, size_px: f32) -> Self {
        Self {
            fonts: self.fonts.iter().map(|font| font.derive(size_px)).collect(),
        }
    }

    pub fn fonts(&self) -> &[Arc<dyn FontHandle>] {
        &self.fonts
    }

    pub fn len(&self) -> usize {
        self.fonts.len()
    }

    /// Always false: a set cannot be built from an empty list
    pub fn is_empty(&self) -> bool {
        false
    }
}
