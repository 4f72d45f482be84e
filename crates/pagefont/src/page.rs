//! Atlas pages
//!
//! A page covers `chars_per_page` consecutive codepoints. Nothing is measured
//! or rasterized until the first glyph is requested; the whole range is then
//! packed row by row into one bitmap. [`AtlasPage::bake`] is CPU-only and may
//! run on the pre-bake worker, [`AtlasPage::upload`] touches the GPU and must
//! run on the render thread.

use crate::backend::RenderBackend;
use crate::font::{FontSet, GlyphPixels};
use crate::{Result, TextError};
use image::{Rgba, RgbaImage};
use rustc_hash::FxHashMap;
use std::fmt;
use std::ops::Range;
use std::sync::atomic::{AtomicU64, Ordering};

/// One past the last Unicode scalar value
pub(crate) const MAX_CODEPOINT: u32 = 0x11_0000;

slotmap::new_key_type! {
    /// Arena handle of an [`AtlasPage`]. Stale after the page is dropped from the arena.
    pub struct PageKey;
}

/// Identifier a page's texture is registered under with the [`RenderBackend`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(u64);

impl TextureId {
    /// A process-wide unique identifier
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TextureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pagefont/atlas/{}", self.0)
    }
}

/// One rasterized character's place in its page's bitmap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Glyph {
    /// Left edge in the atlas, in pixels
    pub x: u32,
    /// Top edge in the atlas, in pixels
    pub y: u32,
    /// Cell width; also the horizontal advance
    pub width: u32,
    /// Cell height (line height of the font that drew it)
    pub height: u32,
    pub character: char,
    /// Owning page (lookup only)
    pub page: PageKey,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Residency {
    /// Only in CPU memory (or not baked at all)
    Cpu,
    Uploaded,
    /// Upload was refused by the backend; not retried
    Failed,
}

/// Glyphs for one bucket of codepoints, backed by one texture
#[derive(Debug)]
pub struct AtlasPage {
    key: PageKey,
    range: Range<u32>,
    fonts: FontSet,
    texture: TextureId,
    padding: u32,
    width: u32,
    height: u32,
    generated: bool,
    residency: Residency,
    bitmap: Option<RgbaImage>,
    glyphs: FxHashMap<char, Glyph>,
}

impl AtlasPage {
    /// Create an empty page for `range`. No glyph work happens until first use.
    pub fn new(key: PageKey, range: Range<u32>, fonts: FontSet, padding: u32) -> Self {
        Self {
            key,
            range,
            fonts,
            texture: TextureId::next(),
            padding,
            width: 0,
            height: 0,
            generated: false,
            residency: Residency::Cpu,
            bitmap: None,
            glyphs: FxHashMap::default(),
        }
    }

    pub fn key(&self) -> PageKey {
        self.key
    }

    pub fn range(&self) -> Range<u32> {
        self.range.clone()
    }

    pub fn contains(&self, c: char) -> bool {
        self.range.contains(&(c as u32))
    }

    pub fn texture(&self) -> TextureId {
        self.texture
    }

    /// Bitmap dimensions; zero until baked
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Whether layout and rasterization are done
    pub fn is_generated(&self) -> bool {
        self.generated
    }

    /// Whether the texture currently lives on the GPU
    pub fn is_uploaded(&self) -> bool {
        self.residency == Residency::Uploaded
    }

    /// The page bitmap between baking and upload
    pub fn bitmap(&self) -> Option<&RgbaImage> {
        self.bitmap.as_ref()
    }

    pub fn glyph_count(&self) -> usize {
        self.glyphs.len()
    }

    /// Glyph for `c`, baking the page first if needed
    pub fn glyph(&mut self, c: char) -> Result<Glyph> {
        if !self.contains(c) {
            return Err(TextError::OutOfPageRange {
                c,
                start: self.range.start,
                end: self.range.end,
            });
        }
        self.bake();
        self.glyphs
            .get(&c)
            .copied()
            .ok_or(TextError::GlyphNotFound(c))
    }

    /// Bake and upload. Render thread only.
    pub fn generate<B: RenderBackend + ?Sized>(&mut self, backend: &mut B) -> bool {
        self.bake();
        self.upload(backend)
    }

    /// Lay out and rasterize every character of the range into a CPU bitmap.
    /// No-op once generated.
    pub fn bake(&mut self) {
        if self.generated {
            return;
        }
        tracing::debug!(
            "Generating glyph page {} ({} characters)",
            describe_range(&self.range),
            self.range.len()
        );

        let span = self.range.end - self.range.start - 1;
        let chars_per_row = (((span as f64).sqrt().ceil() * 1.5) as u32).max(1);
        let padding = self.padding;

        // only scalar values can be placed
        let capacity = self.range.end.min(MAX_CODEPOINT).saturating_sub(self.range.start);
        let mut planned = Vec::with_capacity(capacity as usize);
        let (mut cursor_x, mut cursor_y) = (0u32, 0u32);
        let (mut max_x, mut max_y) = (0u32, 0u32);
        let mut row_count = 0u32;
        let mut row_height = 0u32;

        for c in self.range.clone().filter_map(char::from_u32) {
            let extent = self.fonts.select(c).measure(c);
            let width = extent.width.max(0.0).ceil() as u32;
            let height = extent.height.max(0.0).ceil() as u32;

            if row_count >= chars_per_row {
                cursor_x = 0;
                cursor_y += row_height + padding;
                row_count = 0;
                row_height = 0;
            }

            max_x = max_x.max(cursor_x + width);
            max_y = max_y.max(cursor_y + height);
            row_height = row_height.max(height);

            planned.push(Glyph {
                x: cursor_x,
                y: cursor_y,
                width,
                height,
                character: c,
                page: self.key,
            });
            cursor_x += width + padding;
            row_count += 1;
        }

        let width = (max_x + padding).max(1);
        let height = (max_y + padding).max(1);
        let mut bitmap = RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 0]));

        self.glyphs.clear();
        for glyph in planned {
            let font = self.fonts.select(glyph.character);
            if let Some(raster) = font.rasterize(glyph.character) {
                let baseline = glyph.y as i32 + font.ascent().ceil() as i32;
                let origin_x = glyph.x as i32 + raster.left;
                let origin_y = baseline - raster.top;
                blit(&mut bitmap, origin_x, origin_y, raster.width, &raster.pixels);
            }
            self.glyphs.insert(glyph.character, glyph);
        }

        self.width = width;
        self.height = height;
        self.bitmap = Some(bitmap);
        self.residency = Residency::Cpu;
        self.generated = true;
    }

    /// Register the baked bitmap as this page's texture. Render thread only.
    ///
    /// Returns whether the texture is usable for drawing. A refused upload is
    /// logged and the page stays unusable until destroyed.
    pub fn upload<B: RenderBackend + ?Sized>(&mut self, backend: &mut B) -> bool {
        if !self.generated {
            self.bake();
        }
        match self.residency {
            Residency::Uploaded => return true,
            Residency::Failed => return false,
            Residency::Cpu => {}
        }
        let Some(bitmap) = self.bitmap.take() else {
            return false;
        };
        match backend.upload_texture(self.texture, &bitmap) {
            Ok(()) => {
                self.residency = Residency::Uploaded;
                true
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to upload glyph page {:#x}..{:#x} as {}: {}",
                    self.range.start,
                    self.range.end,
                    self.texture,
                    e
                );
                self.residency = Residency::Failed;
                false
            }
        }
    }

    /// Release the texture and forget every glyph. Safe to call repeatedly;
    /// the next [`glyph`](Self::glyph) call bakes from scratch.
    pub fn destroy<B: RenderBackend + ?Sized>(&mut self, backend: &mut B) {
        if self.residency == Residency::Uploaded {
            backend.destroy_texture(self.texture);
        }
        self.residency = Residency::Cpu;
        self.bitmap = None;
        self.glyphs.clear();
        self.width = 0;
        self.height = 0;
        self.generated = false;
    }
}

/// `'A'..='Z' (0x41..0x5b)`; non-scalar bounds are shown as `?`
fn describe_range(range: &Range<u32>) -> String {
    let show = |cp: u32| char::from_u32(cp).map_or_else(|| "?".to_string(), |c| format!("{c:?}"));
    format!(
        "{}..={} ({:#x}..{:#x})",
        show(range.start),
        show(range.end.saturating_sub(1)),
        range.start,
        range.end
    )
}

fn blit(target: &mut RgbaImage, origin_x: i32, origin_y: i32, width: u32, pixels: &GlyphPixels) {
    if width == 0 {
        return;
    }
    let (target_width, target_height) = target.dimensions();
    let mut put = |i: usize, color: Rgba<u8>| {
        let x = origin_x + (i as u32 % width) as i32;
        let y = origin_y + (i as u32 / width) as i32;
        if x >= 0 && y >= 0 && (x as u32) < target_width && (y as u32) < target_height {
            target.put_pixel(x as u32, y as u32, color);
        }
    };
    match pixels {
        GlyphPixels::Coverage(coverage) => {
            for (i, &alpha) in coverage.iter().enumerate() {
                if alpha != 0 {
                    put(i, Rgba([255, 255, 255, alpha]));
                }
            }
        }
        GlyphPixels::Rgba(rgba) => {
            for (i, px) in rgba.chunks_exact(4).enumerate() {
                if px[3] != 0 {
                    put(i, Rgba([px[0], px[1], px[2], px[3]]));
                }
            }
        }
    }
}
