//! GPU boundary
//!
//! The renderer never owns a graphics pipeline. It registers page bitmaps as
//! textures and feeds textured quads to whatever implements [`RenderBackend`].
//! Every method is called on the render thread only.

use crate::page::TextureId;
use image::RgbaImage;
use thiserror::Error;

/// Texture registration errors
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Texture {width}x{height} exceeds the device limit of {max}")]
    TextureTooLarge { width: u32, height: u32, max: u32 },

    #[error("Texture upload failed: {0}")]
    Upload(String),
}

/// Glyph quad vertex
///
/// Memory layout:
/// - `position`: `vec2<f32>` - logical pixels
/// - `uv`: `vec2<f32>` - normalized atlas coordinates
/// - `color`: `vec4<f32>` - RGBA tint
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GlyphVertex {
    pub position: [f32; 2],
    pub uv: [f32; 2],
    pub color: [f32; 4],
}

/// Texture and draw submission target
pub trait RenderBackend {
    /// Register `bitmap` as the texture `id`
    fn upload_texture(&mut self, id: TextureId, bitmap: &RgbaImage) -> Result<(), BackendError>;

    /// Release the texture `id`
    fn destroy_texture(&mut self, id: TextureId);

    /// Make `id` the texture subsequent quads sample from
    fn bind_texture(&mut self, id: TextureId);

    /// Draw quads; four vertices per quad (bottom-left, bottom-right, top-right, top-left)
    fn submit_quads(&mut self, vertices: &[GlyphVertex]);
}

impl<B: RenderBackend + ?Sized> RenderBackend for &mut B {
    fn upload_texture(&mut self, id: TextureId, bitmap: &RgbaImage) -> Result<(), BackendError> {
        (**self).upload_texture(id, bitmap)
    }

    fn destroy_texture(&mut self, id: TextureId) {
        (**self).destroy_texture(id)
    }

    fn bind_texture(&mut self, id: TextureId) {
        (**self).bind_texture(id)
    }

    fn submit_quads(&mut self, vertices: &[GlyphVertex]) {
        (**self).submit_quads(vertices)
    }
}

impl<B: RenderBackend + ?Sized> RenderBackend for Box<B> {
    fn upload_texture(&mut self, id: TextureId, bitmap: &RgbaImage) -> Result<(), BackendError> {
        (**self).upload_texture(id, bitmap)
    }

    fn destroy_texture(&mut self, id: TextureId) {
        (**self).destroy_texture(id)
    }

    fn bind_texture(&mut self, id: TextureId) {
        (**self).bind_texture(id)
    }

    fn submit_quads(&mut self, vertices: &[GlyphVertex]) {
        (**self).submit_quads(vertices)
    }
}
