//! In-memory render backend
//!
//! Keeps uploaded page bitmaps and records every draw call, for offscreen
//! inspection and tests.

use crate::backend::{BackendError, GlyphVertex, RenderBackend};
use crate::page::TextureId;
use image::RgbaImage;
use rustc_hash::FxHashMap;

/// One recorded `bind_texture` + `submit_quads` pair
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedDraw {
    pub texture: Option<TextureId>,
    pub vertices: Vec<GlyphVertex>,
}

impl RecordedDraw {
    pub fn quad_count(&self) -> usize {
        self.vertices.len() / 4
    }
}

#[derive(Debug, Default)]
pub struct HeadlessBackend {
    textures: FxHashMap<TextureId, RgbaImage>,
    bound: Option<TextureId>,
    draws: Vec<RecordedDraw>,
    binds: usize,
    uploads: usize,
    destroyed: usize,
    max_dimension: Option<u32>,
    fail_uploads: bool,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject textures larger than `max` in either dimension, like a real device
    pub fn with_max_dimension(max: u32) -> Self {
        Self {
            max_dimension: Some(max),
            ..Self::default()
        }
    }

    /// Make every following upload fail
    pub fn set_fail_uploads(&mut self, fail: bool) {
        self.fail_uploads = fail;
    }

    /// Textures currently registered, in id order
    pub fn live_textures(&self) -> Vec<TextureId> {
        let mut ids: Vec<TextureId> = self.textures.keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn texture(&self, id: TextureId) -> Option<&RgbaImage> {
        self.textures.get(&id)
    }

    pub fn draws(&self) -> &[RecordedDraw] {
        &self.draws
    }

    /// Forget recorded draws, keeping textures
    pub fn take_draws(&mut self) -> Vec<RecordedDraw> {
        std::mem::take(&mut self.draws)
    }

    pub fn bind_count(&self) -> usize {
        self.binds
    }

    pub fn upload_count(&self) -> usize {
        self.uploads
    }

    pub fn destroyed_count(&self) -> usize {
        self.destroyed
    }
}

impl RenderBackend for HeadlessBackend {
    fn upload_texture(&mut self, id: TextureId, bitmap: &RgbaImage) -> Result<(), BackendError> {
        if self.fail_uploads {
            return Err(BackendError::Upload(format!("uploads disabled for {id}")));
        }
        if let Some(max) = self.max_dimension {
            let (width, height) = bitmap.dimensions();
            if width > max || height > max {
                return Err(BackendError::TextureTooLarge { width, height, max });
            }
        }
        self.textures.insert(id, bitmap.clone());
        self.uploads += 1;
        Ok(())
    }

    fn destroy_texture(&mut self, id: TextureId) {
        if self.textures.remove(&id).is_some() {
            self.destroyed += 1;
        }
        if self.bound == Some(id) {
            self.bound = None;
        }
    }

    fn bind_texture(&mut self, id: TextureId) {
        self.bound = Some(id);
        self.binds += 1;
    }

    fn submit_quads(&mut self, vertices: &[GlyphVertex]) {
        self.draws.push(RecordedDraw {
            texture: self.bound,
            vertices: vertices.to_vec(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_texture_lifecycle() {
        let mut backend = HeadlessBackend::new();
        let id = TextureId::next();
        backend.upload_texture(id, &RgbaImage::new(4, 4)).unwrap();
        assert_eq!(backend.live_textures(), vec![id]);
        backend.destroy_texture(id);
        backend.destroy_texture(id);
        assert!(backend.live_textures().is_empty());
        assert_eq!(backend.destroyed_count(), 1);
    }

    #[test]
    fn test_records_bound_texture() {
        let mut backend = HeadlessBackend::new();
        let id = TextureId::next();
        backend.bind_texture(id);
        backend.submit_quads(&[GlyphVertex::default(); 4]);
        assert_eq!(backend.draws().len(), 1);
        assert_eq!(backend.draws()[0].texture, Some(id));
        assert_eq!(backend.draws()[0].quad_count(), 1);
    }

    #[test]
    fn test_max_dimension() {
        let mut backend = HeadlessBackend::with_max_dimension(8);
        let result = backend.upload_texture(TextureId::next(), &RgbaImage::new(9, 2));
        assert!(matches!(
            result,
            Err(BackendError::TextureTooLarge { width: 9, height: 2, max: 8 })
        ));
    }
}
