//! Font registry for system font discovery and caching
//!
//! Uses fontdb to find faces by family name or generic category and loads them
//! as [`SwashFont`]s, so a host can build a renderer's fallback list from names.

use crate::font::FontHandle;
use crate::rasterizer::SwashFont;
use crate::{Result, TextError};
use fontdb::{Database, Family, Query, Source, Stretch, Style, Weight};
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Generic font category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GenericFont {
    #[default]
    SansSerif,
    Serif,
    Monospace,
}

/// Font registry that discovers and caches fonts
pub struct FontRegistry {
    db: Database,
    /// Loaded faces by family key (None = known missing)
    faces: FxHashMap<String, Option<SwashFont>>,
}

impl FontRegistry {
    /// Registry over every installed system font
    pub fn new() -> Self {
        let mut db = Database::new();
        db.load_system_fonts();
        Self::with_database(db)
    }

    /// Registry over a prepared fontdb database
    pub fn with_database(db: Database) -> Self {
        Self {
            db,
            faces: FxHashMap::default(),
        }
    }

    /// Add font file contents; returns how many faces were found in it
    pub fn load_font_data(&mut self, data: Vec<u8>) -> usize {
        let before = self.db.len();
        self.db.load_font_data(data);
        self.db.len() - before
    }

    /// Load a family by name (e.g. "Inter", "Noto Sans CJK JP") at `size_px`
    pub fn load_font(&mut self, name: &str, size_px: f32) -> Result<SwashFont> {
        self.load_family(name.to_string(), Family::Name(name), size_px)
    }

    /// Load the face fontdb resolves for a generic category
    pub fn load_generic(&mut self, generic: GenericFont, size_px: f32) -> Result<SwashFont> {
        let family = match generic {
            GenericFont::SansSerif => Family::SansSerif,
            GenericFont::Serif => Family::Serif,
            GenericFont::Monospace => Family::Monospace,
        };
        self.load_family(format!("__generic_{:?}", generic), family, size_px)
    }

    /// Fallback list from family names, in order. Missing families are skipped
    /// with a warning; fails only if none could be loaded.
    pub fn load_fallback_chain(
        &mut self,
        names: &[&str],
        size_px: f32,
    ) -> Result<Vec<Arc<dyn FontHandle>>> {
        let mut chain: Vec<Arc<dyn FontHandle>> = Vec::with_capacity(names.len());
        for name in names {
            match self.load_font(name, size_px) {
                Ok(font) => chain.push(Arc::new(font)),
                Err(e) => tracing::warn!("Skipping fallback font '{}': {}", name, e),
            }
        }
        if chain.is_empty() {
            return Err(TextError::FontLoadError(format!(
                "none of {:?} could be loaded",
                names
            )));
        }
        Ok(chain)
    }

    /// Whether a family with this name is known
    pub fn has_font(&self, name: &str) -> bool {
        self.db.faces().any(|face| {
            face.families
                .iter()
                .any(|(family, _)| family.eq_ignore_ascii_case(name))
        })
    }

    /// All known family names, sorted and deduplicated
    pub fn list_families(&self) -> Vec<String> {
        let mut families: Vec<String> = self
            .db
            .faces()
            .flat_map(|face| face.families.iter().map(|(family, _)| family.clone()))
            .collect();
        families.sort();
        families.dedup();
        families
    }

    fn load_family(&mut self, cache_key: String, family: Family<'_>, size_px: f32) -> Result<SwashFont> {
        // Check cache first (includes failed lookups as None)
        if let Some(cached) = self.faces.get(&cache_key) {
            return cached
                .as_ref()
                .map(|font| font.clone().with_size(size_px))
                .ok_or_else(|| TextError::FontLoadError(format!("'{}' not found (cached)", cache_key)));
        }

        let query = Query {
            families: &[family],
            weight: Weight::NORMAL,
            style: Style::Normal,
            stretch: Stretch::Normal,
        };
        let Some(id) = self.db.query(&query) else {
            self.faces.insert(cache_key.clone(), None);
            return Err(TextError::FontLoadError(format!("'{}' not found", cache_key)));
        };

        let font = self.load_face_by_id(id, size_px)?;
        tracing::debug!("Loaded font {:?}", font);
        self.faces.insert(cache_key, Some(font.clone()));
        Ok(font)
    }

    fn load_face_by_id(&self, id: fontdb::ID, size_px: f32) -> Result<SwashFont> {
        let (src, face_index) = self
            .db
            .face_source(id)
            .ok_or_else(|| TextError::FontLoadError("Font source not found".to_string()))?;

        let data = match src {
            Source::File(path) => std::fs::read(&path).map_err(|e| {
                TextError::FontLoadError(format!("Failed to read font file {:?}: {}", path, e))
            })?,
            Source::Binary(arc) => arc.as_ref().as_ref().to_vec(),
            Source::SharedFile(_path, data) => data.as_ref().as_ref().to_vec(),
        };

        let font = SwashFont::from_bytes(data, face_index as usize, size_px)?;
        let name = self
            .db
            .face(id)
            .and_then(|face| face.families.first().map(|(family, _)| family.clone()));
        Ok(match name {
            Some(name) => font.with_name(name),
            None => font,
        })
    }
}

impl Default for FontRegistry {
    fn default() -> Self {
        Self::new()
    }
}
