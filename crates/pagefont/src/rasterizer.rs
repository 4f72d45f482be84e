//! Glyph rasterization using swash
//!
//! [`SwashFont`] is a [`FontHandle`] over raw TTF/OTF/TTC bytes. Metrics come
//! from the font tables; glyph images are rendered as 8-bit coverage (or RGBA
//! for color glyphs).

use crate::font::{FontHandle, GlyphBitmap, GlyphExtent, GlyphPixels};
use crate::{Result, TextError};
use std::cell::RefCell;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use swash::scale::image::Content;
use swash::scale::{Render, ScaleContext, Source, StrikeWith};
use swash::zeno::Format;
use swash::{CacheKey, FontRef};

thread_local! {
    /// Swash scale context (caches scaling state), one per rasterizing thread
    static SCALE_CONTEXT: RefCell<ScaleContext> = RefCell::new(ScaleContext::new());
}

/// A font face loaded from memory, at one pixel size
#[derive(Clone)]
pub struct SwashFont {
    data: Arc<[u8]>,
    offset: u32,
    key: CacheKey,
    name: Option<String>,
    size_px: f32,
}

impl SwashFont {
    /// Parse face `index` of a font file held in memory
    pub fn from_bytes(data: impl Into<Arc<[u8]>>, index: usize, size_px: f32) -> Result<Self> {
        let data: Arc<[u8]> = data.into();
        let (offset, key) = {
            let font = FontRef::from_index(&data, index).ok_or(TextError::InvalidFontData)?;
            (font.offset, font.key)
        };
        Ok(Self {
            data,
            offset,
            key,
            name: None,
            size_px,
        })
    }

    /// Read and parse face `index` of a font file
    pub fn from_path(path: impl AsRef<Path>, index: usize, size_px: f32) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|e| {
            TextError::FontLoadError(format!("Failed to read font file {:?}: {}", path, e))
        })?;
        Self::from_bytes(data, index, size_px)
    }

    /// Same face at another pixel size
    pub fn with_size(mut self, size_px: f32) -> Self {
        self.size_px = size_px;
        self
    }

    /// Attach a display name (used in logs and `Debug` output)
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn font(&self) -> FontRef<'_> {
        FontRef {
            data: &self.data,
            offset: self.offset,
            key: self.key,
        }
    }

    /// Font units to pixels
    fn units_to_px(&self) -> f32 {
        let units_per_em = self.font().metrics(&[]).units_per_em.max(1);
        self.size_px / units_per_em as f32
    }
}

impl fmt::Debug for SwashFont {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SwashFont")
            .field("name", &self.name)
            .field("offset", &self.offset)
            .field("size_px", &self.size_px)
            .finish()
    }
}

impl FontHandle for SwashFont {
    fn derive(&self, size_px: f32) -> Arc<dyn FontHandle> {
        Arc::new(Self {
            size_px,
            ..self.clone()
        })
    }

    fn size_px(&self) -> f32 {
        self.size_px
    }

    fn can_display(&self, c: char) -> bool {
        self.font().charmap().map(c) != 0
    }

    fn measure(&self, c: char) -> GlyphExtent {
        let font = self.font();
        let glyph_id = font.charmap().map(c);
        let metrics = font.metrics(&[]);
        let scale = self.units_to_px();
        GlyphExtent {
            width: font.glyph_metrics(&[]).advance_width(glyph_id) * scale,
            height: (metrics.ascent + metrics.descent.abs() + metrics.leading) * scale,
        }
    }

    fn ascent(&self) -> f32 {
        self.font().metrics(&[]).ascent * self.units_to_px()
    }

    fn rasterize(&self, c: char) -> Option<GlyphBitmap> {
        let font = self.font();
        // unmapped characters map to glyph 0, the font's own missing-glyph box
        let glyph_id = font.charmap().map(c);

        let image = SCALE_CONTEXT.with(|context| {
            let mut context = context.borrow_mut();
            let mut scaler = context.builder(font).size(self.size_px).build();
            let mut render = Render::new(&[
                Source::ColorOutline(0),
                Source::ColorBitmap(StrikeWith::BestFit),
                Source::Outline,
            ]);
            render.format(Format::Alpha);
            render.render(&mut scaler, glyph_id)
        })?;

        let placement = image.placement;
        if placement.width == 0 || placement.height == 0 {
            return None;
        }
        let pixels = match image.content {
            Content::Color => GlyphPixels::Rgba(image.data),
            Content::Mask | Content::SubpixelMask => GlyphPixels::Coverage(image.data),
        };
        Some(GlyphBitmap {
            left: placement.left,
            top: placement.top,
            width: placement.width,
            height: placement.height,
            pixels,
        })
    }
}
