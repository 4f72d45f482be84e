//! Page arena and resolved-glyph memo
//!
//! Shared between the render thread and the pre-bake worker behind one
//! `parking_lot::Mutex`; every read or write of pages or glyphs happens with
//! that lock held.

use crate::backend::RenderBackend;
use crate::font::FontSet;
use crate::page::{AtlasPage, Glyph, PageKey};
use crate::Result;
use rustc_hash::FxHashMap;
use slotmap::SlotMap;

#[derive(Debug)]
pub struct GlyphCache {
    fonts: FontSet,
    chars_per_page: u32,
    padding: u32,
    pages: SlotMap<PageKey, AtlasPage>,
    /// Page keys in creation order
    order: Vec<PageKey>,
    resolved: FxHashMap<char, Glyph>,
}

impl GlyphCache {
    pub fn new(fonts: FontSet, chars_per_page: u32, padding: u32) -> Self {
        Self {
            fonts,
            chars_per_page,
            padding,
            pages: SlotMap::with_key(),
            order: Vec::new(),
            resolved: FxHashMap::default(),
        }
    }

    /// Glyph for `c`, creating and baking its page on first use
    pub fn resolve(&mut self, c: char) -> Result<Glyph> {
        if let Some(glyph) = self.resolved.get(&c) {
            return Ok(*glyph);
        }

        let existing = self
            .order
            .iter()
            .copied()
            .find(|&key| self.pages[key].contains(c));
        let key = match existing {
            Some(key) => key,
            None => self.create_page(c),
        };

        let glyph = self.pages[key].glyph(c)?;
        self.resolved.insert(c, glyph);
        Ok(glyph)
    }

    fn create_page(&mut self, c: char) -> PageKey {
        let base = (c as u32 / self.chars_per_page) * self.chars_per_page;
        let range = base..base.saturating_add(self.chars_per_page);
        let fonts = self.fonts.clone();
        let padding = self.padding;
        let key = self
            .pages
            .insert_with_key(|key| AtlasPage::new(key, range, fonts, padding));
        self.order.push(key);
        key
    }

    pub fn page(&self, key: PageKey) -> Option<&AtlasPage> {
        self.pages.get(key)
    }

    pub fn page_mut(&mut self, key: PageKey) -> Option<&mut AtlasPage> {
        self.pages.get_mut(key)
    }

    /// Pages in creation order
    pub fn pages(&self) -> impl Iterator<Item = &AtlasPage> {
        self.order.iter().map(|&key| &self.pages[key])
    }

    pub fn page_count(&self) -> usize {
        self.order.len()
    }

    pub fn resolved_count(&self) -> usize {
        self.resolved.len()
    }

    /// Destroy every page and forget every glyph, then switch to `fonts`
    pub fn reset<B: RenderBackend + ?Sized>(&mut self, fonts: FontSet, backend: &mut B) {
        self.destroy_all(backend);
        self.fonts = fonts;
    }

    /// Destroy every page and forget every glyph
    pub fn destroy_all<B: RenderBackend + ?Sized>(&mut self, backend: &mut B) {
        for key in self.order.drain(..) {
            if let Some(mut page) = self.pages.remove(key) {
                page.destroy(backend);
            }
        }
        self.pages.clear();
        self.resolved.clear();
    }
}
