//! Per-call draw batching
//!
//! Glyph draws are grouped by their page's texture so each texture is bound
//! once per call, whatever order the glyphs appear in the string. Groups are
//! flushed in first-use order.

use crate::backend::{GlyphVertex, RenderBackend};
use crate::cache::GlyphCache;
use crate::color::Color;
use crate::page::{Glyph, TextureId};
use indexmap::IndexMap;

/// A queued glyph draw, in device pixels relative to the string origin
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawEntry {
    pub x: f32,
    pub y: f32,
    pub color: Color,
    pub glyph: Glyph,
}

#[derive(Debug, Default)]
pub struct DrawBatch {
    groups: IndexMap<TextureId, Vec<DrawEntry>>,
    vertices: Vec<GlyphVertex>,
}

impl DrawBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, texture: TextureId, entry: DrawEntry) {
        self.groups.entry(texture).or_default().push(entry);
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Number of distinct textures queued
    pub fn texture_count(&self) -> usize {
        self.groups.len()
    }

    pub fn clear(&mut self) {
        self.groups.clear();
    }

    /// Upload pending pages, then bind each texture once and submit its quads.
    ///
    /// Positions are emitted in logical pixels: `origin + device / scale`.
    /// Groups whose page is gone or whose texture cannot be uploaded are skipped.
    /// The batch is empty afterwards.
    pub fn flush<B: RenderBackend + ?Sized>(
        &mut self,
        cache: &mut GlyphCache,
        backend: &mut B,
        origin: [f32; 2],
        scale: f32,
    ) {
        let inv_scale = 1.0 / scale;
        for (texture, entries) in self.groups.drain(..) {
            let Some(first) = entries.first() else {
                continue;
            };
            let Some(page) = cache.page_mut(first.glyph.page) else {
                continue;
            };
            if !page.upload(backend) {
                continue;
            }
            let (atlas_width, atlas_height) = page.dimensions();
            let (atlas_width, atlas_height) = (atlas_width as f32, atlas_height as f32);

            self.vertices.clear();
            for entry in &entries {
                let glyph = &entry.glyph;
                let x0 = origin[0] + entry.x * inv_scale;
                let y0 = origin[1] + entry.y * inv_scale;
                let x1 = x0 + glyph.width as f32 * inv_scale;
                let y1 = y0 + glyph.height as f32 * inv_scale;

                let u0 = glyph.x as f32 / atlas_width;
                let v0 = glyph.y as f32 / atlas_height;
                let u1 = (glyph.x + glyph.width) as f32 / atlas_width;
                let v1 = (glyph.y + glyph.height) as f32 / atlas_height;

                let color = entry.color.to_array();
                self.vertices.extend_from_slice(&[
                    GlyphVertex {
                        position: [x0, y1],
                        uv: [u0, v1],
                        color,
                    },
                    GlyphVertex {
                        position: [x1, y1],
                        uv: [u1, v1],
                        color,
                    },
                    GlyphVertex {
                        position: [x1, y0],
                        uv: [u1, v0],
                        color,
                    },
                    GlyphVertex {
                        position: [x0, y0],
                        uv: [u0, v0],
                        color,
                    },
                ]);
            }

            backend.bind_texture(texture);
            backend.submit_quads(&self.vertices);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::tests::BoxFont;
    use crate::font::FontSet;
    use crate::headless::HeadlessBackend;

    fn cache() -> GlyphCache {
        let fonts = FontSet::new(vec![BoxFont::new(10.0, 'A'..='Z')]).unwrap();
        GlyphCache::new(fonts, 16, 1)
    }

    fn entry(cache: &mut GlyphCache, c: char, x: f32) -> (TextureId, DrawEntry) {
        let glyph = cache.resolve(c).unwrap();
        let texture = cache.page(glyph.page).unwrap().texture();
        (
            texture,
            DrawEntry {
                x,
                y: 0.0,
                color: Color::WHITE,
                glyph,
            },
        )
    }

    #[test]
    fn test_groups_by_texture() {
        let mut cache = cache();
        let mut batch = DrawBatch::new();
        // 'A' and 'C' share a page, 'Q' is on the next one
        for (c, x) in [('A', 0.0), ('Q', 5.0), ('C', 10.0)] {
            let (texture, entry) = entry(&mut cache, c, x);
            batch.push(texture, entry);
        }
        assert_eq!(batch.texture_count(), 2);

        let mut backend = HeadlessBackend::new();
        batch.flush(&mut cache, &mut backend, [0.0, 0.0], 1.0);
        assert!(batch.is_empty());
        assert_eq!(backend.bind_count(), 2);
        assert_eq!(backend.draws()[0].quad_count(), 2);
        assert_eq!(backend.draws()[1].quad_count(), 1);
    }

    #[test]
    fn test_quad_geometry() {
        let mut cache = cache();
        let mut batch = DrawBatch::new();
        let (texture, entry) = entry(&mut cache, 'A', 10.0);
        let glyph = entry.glyph;
        batch.push(texture, entry);

        let mut backend = HeadlessBackend::new();
        batch.flush(&mut cache, &mut backend, [100.0, 50.0], 2.0);

        let (width, height) = cache.page(glyph.page).unwrap().dimensions();
        let vertices = &backend.draws()[0].vertices;
        assert_eq!(vertices.len(), 4);
        // top-left corner
        assert_eq!(vertices[3].position, [105.0, 50.0]);
        assert_eq!(
            vertices[3].uv,
            [glyph.x as f32 / width as f32, glyph.y as f32 / height as f32]
        );
        // bottom-right corner
        assert_eq!(
            vertices[1].position,
            [105.0 + glyph.width as f32 / 2.0, 50.0 + glyph.height as f32 / 2.0]
        );
        assert!(vertices.iter().all(|v| v.color == [1.0, 1.0, 1.0, 1.0]));
    }

    #[test]
    fn test_failed_upload_skips_group() {
        let mut cache = cache();
        let mut batch = DrawBatch::new();
        let (texture, entry) = entry(&mut cache, 'A', 0.0);
        batch.push(texture, entry);

        let mut backend = HeadlessBackend::new();
        backend.set_fail_uploads(true);
        batch.flush(&mut cache, &mut backend, [0.0, 0.0], 1.0);
        assert!(backend.draws().is_empty());
        assert!(batch.is_empty());
    }
}
