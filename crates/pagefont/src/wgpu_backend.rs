//! wgpu render backend
//!
//! Atlas pages become `Rgba8UnormSrgb` textures. Draw submissions are
//! collected into a per-frame vertex list plus one [`TextDrawCall`] per bound
//! texture; the host's text pipeline uploads the vertices, binds
//! [`WgpuBackend::view`] for each call and draws its range.

use crate::backend::{BackendError, GlyphVertex, RenderBackend};
use crate::page::TextureId;
use image::RgbaImage;
use rustc_hash::FxHashMap;
use std::ops::Range;
use std::sync::Arc;
use wgpu::util::DeviceExt;

/// A contiguous run of quads sampling one texture
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextDrawCall {
    pub texture: TextureId,
    /// Range into [`WgpuBackend::vertices`]
    pub vertices: Range<u32>,
}

struct GpuTexture {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
}

pub struct WgpuBackend {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    textures: FxHashMap<TextureId, GpuTexture>,
    bound: Option<TextureId>,
    vertices: Vec<GlyphVertex>,
    calls: Vec<TextDrawCall>,
}

impl WgpuBackend {
    pub fn new(device: Arc<wgpu::Device>, queue: Arc<wgpu::Queue>) -> Self {
        Self {
            device,
            queue,
            textures: FxHashMap::default(),
            bound: None,
            vertices: Vec::new(),
            calls: Vec::new(),
        }
    }

    /// View for sampling a live atlas texture
    pub fn view(&self, id: TextureId) -> Option<&wgpu::TextureView> {
        self.textures.get(&id).map(|texture| &texture.view)
    }

    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    /// Vertices submitted since the last [`clear_frame`](Self::clear_frame)
    pub fn vertices(&self) -> &[GlyphVertex] {
        &self.vertices
    }

    /// Vertex data ready for a vertex buffer
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    pub fn draw_calls(&self) -> &[TextDrawCall] {
        &self.calls
    }

    /// Forget this frame's vertices and calls; textures stay
    pub fn clear_frame(&mut self) {
        self.vertices.clear();
        self.calls.clear();
    }
}

/// Index list drawing `quads` quads as two triangles each
pub fn quad_indices(quads: u32) -> Vec<u32> {
    (0..quads)
        .flat_map(|quad| {
            let base = quad * 4;
            [base, base + 1, base + 2, base + 2, base + 3, base]
        })
        .collect()
}

impl RenderBackend for WgpuBackend {
    fn upload_texture(&mut self, id: TextureId, bitmap: &RgbaImage) -> Result<(), BackendError> {
        let (width, height) = bitmap.dimensions();
        let max = self.device.limits().max_texture_dimension_2d;
        if width > max || height > max {
            return Err(BackendError::TextureTooLarge { width, height, max });
        }

        let label = id.to_string();
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let texture = self.device.create_texture_with_data(
            &self.queue,
            &wgpu::TextureDescriptor {
                label: Some(&label),
                size: wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8UnormSrgb,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            bitmap.as_raw(),
        );
        if let Some(e) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(BackendError::Upload(e.to_string()));
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        self.textures.insert(
            id,
            GpuTexture { texture, view },
        );
        Ok(())
    }

    fn destroy_texture(&mut self, id: TextureId) {
        if let Some(gpu) = self.textures.remove(&id) {
            gpu.texture.destroy();
        }
        if self.bound == Some(id) {
            self.bound = None;
        }
    }

    fn bind_texture(&mut self, id: TextureId) {
        self.bound = Some(id);
    }

    fn submit_quads(&mut self, vertices: &[GlyphVertex]) {
        let Some(texture) = self.bound else {
            tracing::warn!("Glyph quads submitted without a bound texture");
            return;
        };
        let start = self.vertices.len() as u32;
        self.vertices.extend_from_slice(vertices);
        let end = self.vertices.len() as u32;
        match self.calls.last_mut() {
            Some(last) if last.texture == texture && last.vertices.end == start => {
                last.vertices.end = end;
            }
            _ => self.calls.push(TextDrawCall {
                texture,
                vertices: start..end,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quad_indices() {
        assert_eq!(quad_indices(2), vec![0, 1, 2, 2, 3, 0, 4, 5, 6, 6, 7, 4]);
        assert!(quad_indices(0).is_empty());
    }
}
