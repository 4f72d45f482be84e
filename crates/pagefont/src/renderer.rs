//! Font renderer
//!
//! Resolves characters to atlas glyphs (creating pages on first use), lays out
//! strings with `§` color codes, and draws them as one quad batch per atlas
//! texture.
//!
//! Glyph metrics are baked in device pixels at the current UI scale. Before
//! every draw or measure call the scale is polled; if it changed, every page is
//! destroyed and the renderer is initialized again at the new scale.

use crate::backend::RenderBackend;
use crate::batch::{DrawBatch, DrawEntry};
use crate::cache::GlyphCache;
use crate::color::Color;
use crate::config::FontRendererConfig;
use crate::control::{strip_control_codes, ControlCodes, Token};
use crate::font::{FontHandle, FontSet};
use crate::page::{Glyph, PageKey, TextureId};
use crate::prebake::{self, PrebakeOutcome, TaskExecutor, TaskHandle, ThreadExecutor};
use crate::scale::{FixedScale, ScaleSource};
use crate::{Result, TextError};
use parking_lot::Mutex;
use std::sync::Arc;

/// Builder for [`FontRenderer`]
pub struct FontRendererBuilder<B: RenderBackend> {
    fonts: Vec<Arc<dyn FontHandle>>,
    backend: B,
    config: FontRendererConfig,
    scale: Arc<dyn ScaleSource>,
    executor: Arc<dyn TaskExecutor>,
}

impl<B: RenderBackend> FontRendererBuilder<B> {
    /// Replace the whole configuration
    pub fn config(mut self, config: FontRendererConfig) -> Self {
        self.config = config;
        self
    }

    pub fn chars_per_page(mut self, chars_per_page: u32) -> Self {
        self.config.chars_per_page = chars_per_page;
        self
    }

    pub fn padding(mut self, padding: u32) -> Self {
        self.config.padding = padding;
        self
    }

    /// Characters to bake in the background on every (re)initialization
    pub fn prebake(mut self, chars: impl Into<String>) -> Self {
        self.config.prebake = Some(chars.into());
        self
    }

    /// Where the UI scale is read from (default: fixed at 1)
    pub fn scale_source(mut self, scale: impl ScaleSource + 'static) -> Self {
        self.scale = Arc::new(scale);
        self
    }

    /// Where pre-bake jobs run (default: a dedicated thread per job)
    pub fn executor(mut self, executor: impl TaskExecutor + 'static) -> Self {
        self.executor = Arc::new(executor);
        self
    }

    /// Validate the parameters and initialize the renderer
    pub fn build(self) -> Result<FontRenderer<B>> {
        self.config.validate()?;
        let fonts = FontSet::new(self.fonts)?;
        let cache = GlyphCache::new(
            fonts.clone(),
            self.config.chars_per_page,
            self.config.padding,
        );

        let mut renderer = FontRenderer {
            config: self.config,
            fonts,
            backend: self.backend,
            scale: self.scale,
            executor: self.executor,
            cache: Arc::new(Mutex::new(cache)),
            batch: DrawBatch::new(),
            scale_mul: 1,
            last_ui_scale: 0,
            prebake: None,
            last_prebake: None,
            initialized: false,
        };
        renderer.initialize()?;
        Ok(renderer)
    }
}

/// Paged glyph atlas text renderer
///
/// Every method must be called from the render thread. Pre-bake jobs share the
/// glyph cache with it through a lock but never touch the backend.
pub struct FontRenderer<B: RenderBackend> {
    config: FontRendererConfig,
    /// Fonts at their original size; scaled copies live in the cache
    fonts: FontSet,
    backend: B,
    scale: Arc<dyn ScaleSource>,
    executor: Arc<dyn TaskExecutor>,
    cache: Arc<Mutex<GlyphCache>>,
    batch: DrawBatch,
    scale_mul: u32,
    last_ui_scale: u32,
    prebake: Option<TaskHandle>,
    /// How the most recent pre-bake ended
    last_prebake: Option<PrebakeOutcome>,
    initialized: bool,
}

impl<B: RenderBackend> FontRenderer<B> {
    /// Renderer with the default page layout (256 chars per page, padding 5, no pre-bake)
    pub fn new(fonts: Vec<Arc<dyn FontHandle>>, size_px: f32, backend: B) -> Result<Self> {
        Self::builder(fonts, size_px, backend).build()
    }

    /// Start configuring a renderer
    ///
    /// `fonts` are asked in order whether they can display a character; if none
    /// can, the first font's missing-glyph shape is drawn. `size_px` is in
    /// logical pixels.
    pub fn builder(
        fonts: Vec<Arc<dyn FontHandle>>,
        size_px: f32,
        backend: B,
    ) -> FontRendererBuilder<B> {
        FontRendererBuilder {
            fonts,
            backend,
            config: FontRendererConfig::new(size_px),
            scale: Arc::new(FixedScale::default()),
            executor: Arc::new(ThreadExecutor),
        }
    }

    /// Derive scaled fonts for the current UI scale and schedule the pre-bake.
    ///
    /// Fails with [`TextError::AlreadyInitialized`] unless the renderer is new
    /// or was [closed](Self::close).
    pub fn initialize(&mut self) -> Result<()> {
        if self.initialized {
            return Err(TextError::AlreadyInitialized);
        }
        let ui_scale = self.scale.ui_scale().max(1);
        self.last_ui_scale = ui_scale;
        self.scale_mul = ui_scale;

        let scaled = self.fonts.derive(self.config.size_px * ui_scale as f32);
        self.cache.lock().reset(scaled, &mut self.backend);
        self.initialized = true;

        if let Some(chars) = self.config.prebake_chars().map(str::to_owned) {
            self.prebake = Some(self.spawn_prebake(chars));
        }
        Ok(())
    }

    fn spawn_prebake(&self, chars: String) -> TaskHandle {
        let cache = Arc::clone(&self.cache);
        prebake::spawn_task(self.executor.as_ref(), move |token| {
            let mut resolved = 0;
            for c in chars.chars() {
                if token.is_cancelled() {
                    return PrebakeOutcome::Cancelled { resolved };
                }
                if let Err(e) = cache.lock().resolve(c) {
                    return PrebakeOutcome::Failed(e.to_string());
                }
                resolved += 1;
            }
            tracing::trace!("Pre-baked {} characters", resolved);
            PrebakeOutcome::Completed { resolved }
        })
    }

    /// Block until an outstanding pre-bake finishes. Its failure only means the
    /// glyphs get resolved on demand instead.
    fn await_prebake(&mut self) {
        let Some(task) = self.prebake.as_mut() else {
            return;
        };
        let outcome = task.wait();
        if let PrebakeOutcome::Failed(reason) = &outcome {
            tracing::warn!("Glyph pre-bake failed, resolving on demand: {}", reason);
        }
        self.last_prebake = Some(outcome);
        self.prebake = None;
    }

    fn cancel_prebake(&mut self) {
        let Some(mut task) = self.prebake.take() else {
            return;
        };
        task.cancel();
        let outcome = task.wait();
        match &outcome {
            PrebakeOutcome::Failed(reason) => {
                tracing::warn!("Glyph pre-bake failed: {}", reason)
            }
            outcome => tracing::debug!("Glyph pre-bake stopped: {:?}", outcome),
        }
        self.last_prebake = Some(outcome);
    }

    /// Initialize if closed; rebuild everything if the UI scale moved
    fn ensure_current(&mut self) -> Result<()> {
        if !self.initialized {
            return self.initialize();
        }
        let ui_scale = self.scale.ui_scale().max(1);
        if ui_scale != self.last_ui_scale {
            tracing::debug!(
                "UI scale changed from {} to {}, rebuilding glyph pages",
                self.last_ui_scale,
                ui_scale
            );
            self.close();
            self.initialize()?;
        }
        Ok(())
    }

    /// Glyph for `c`, memoized until the next rescale or close
    pub fn glyph(&mut self, c: char) -> Result<Glyph> {
        self.ensure_current()?;
        self.cache.lock().resolve(c)
    }

    /// Draw `text` with its top-left corner at (`x`, `y`) in logical pixels
    pub fn draw_string(&mut self, text: &str, x: f32, y: f32, color: impl Into<Color>) -> Result<()> {
        self.await_prebake();
        self.ensure_current()?;

        let base = color.into();
        let mut cache = self.cache.lock();
        self.batch.clear();
        if let Err(e) = queue_glyphs(&mut cache, &mut self.batch, text, base) {
            self.batch.clear();
            return Err(e);
        }
        self.batch
            .flush(&mut cache, &mut self.backend, [x, y], self.scale_mul as f32);
        Ok(())
    }

    /// Draw `text` horizontally centered on `x`
    pub fn draw_centered_string(
        &mut self,
        text: &str,
        x: f32,
        y: f32,
        color: impl Into<Color>,
    ) -> Result<()> {
        let width = self.string_width(text)?;
        self.draw_string(text, x - width / 2.0, y, color)
    }

    /// Width of the widest line, in logical pixels. Control codes take no space.
    pub fn string_width(&mut self, text: &str) -> Result<f32> {
        self.ensure_current()?;
        let scale = self.scale_mul as f32;
        let mut cache = self.cache.lock();

        let mut widest = 0.0f32;
        let mut line = 0.0f32;
        for c in strip_control_codes(text).chars() {
            if c == '\n' {
                widest = widest.max(line);
                line = 0.0;
                continue;
            }
            line += cache.resolve(c)?.width as f32 / scale;
        }
        Ok(widest.max(line))
    }

    /// Sum of line heights (tallest glyph per line), in logical pixels.
    /// Empty lines, and the empty string, count as one space high. A trailing
    /// newline does not start another line.
    pub fn string_height(&mut self, text: &str) -> Result<f32> {
        self.ensure_current()?;
        let scale = self.scale_mul as f32;
        let mut cache = self.cache.lock();

        let stripped = strip_control_codes(text);
        let body = stripped.strip_suffix('\n').unwrap_or(&stripped);
        let mut total = 0.0f32;
        for line_text in body.split('\n') {
            let mut line = 0.0f32;
            for c in line_text.chars() {
                line = line.max(cache.resolve(c)?.height as f32 / scale);
            }
            if line == 0.0 {
                line = cache.resolve(' ')?.height as f32 / scale;
            }
            total += line;
        }
        Ok(total)
    }

    /// Stop any pre-bake, destroy every page and clear the caches.
    ///
    /// The renderer stays usable: the next draw or measure call initializes it again.
    pub fn close(&mut self) {
        self.cancel_prebake();
        self.cache.lock().destroy_all(&mut self.backend);
        self.batch.clear();
        self.initialized = false;
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Whether a pre-bake job is still running
    pub fn is_prebake_pending(&mut self) -> bool {
        self.prebake
            .as_mut()
            .is_some_and(|task| !task.is_finished())
    }

    /// Outcome of the most recent pre-bake that was waited for or cancelled
    pub fn last_prebake_outcome(&self) -> Option<&PrebakeOutcome> {
        self.last_prebake.as_ref()
    }

    /// Device pixels per logical pixel the current pages were baked at
    pub fn scale_multiplier(&self) -> u32 {
        self.scale_mul
    }

    pub fn page_count(&self) -> usize {
        self.cache.lock().page_count()
    }

    pub fn resolved_count(&self) -> usize {
        self.cache.lock().resolved_count()
    }

    /// Texture of a live page
    pub fn page_texture(&self, page: PageKey) -> Option<TextureId> {
        self.cache.lock().page(page).map(|page| page.texture())
    }

    pub fn config(&self) -> &FontRendererConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}

impl<B: RenderBackend> Drop for FontRenderer<B> {
    fn drop(&mut self) {
        self.close();
    }
}

/// Run the control-code state machine over `text`, queueing visible glyphs
fn queue_glyphs(cache: &mut GlyphCache, batch: &mut DrawBatch, text: &str, base: Color) -> Result<()> {
    let mut color = base;
    let (mut x, mut y) = (0.0f32, 0.0f32);
    let mut line_height = 0u32;

    for token in ControlCodes::new(text) {
        match token {
            Token::Color(rgb) => color = base.with_rgb(rgb),
            Token::Reset => color = base,
            Token::Unknown(_) => {}
            Token::Newline => {
                if line_height == 0 {
                    line_height = cache.resolve(' ')?.height;
                }
                y += line_height as f32;
                x = 0.0;
                line_height = 0;
            }
            Token::Char(c) => {
                let glyph = cache.resolve(c)?;
                line_height = line_height.max(glyph.height);
                // blank glyphs only advance the pen
                if !c.is_whitespace() {
                    if let Some(page) = cache.page(glyph.page) {
                        batch.push(
                            page.texture(),
                            DrawEntry {
                                x,
                                y,
                                color,
                                glyph,
                            },
                        );
                    }
                }
                x += glyph.width as f32;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::tests::BoxFont;
    use crate::headless::HeadlessBackend;
    use crate::prebake::InlineExecutor;

    fn renderer() -> FontRenderer<HeadlessBackend> {
        FontRenderer::builder(vec![BoxFont::new(10.0, 'A'..='Z')], 10.0, HeadlessBackend::new())
            .executor(InlineExecutor)
            .build()
            .unwrap()
    }

    #[test]
    fn test_double_initialize_fails() {
        let mut renderer = renderer();
        assert!(renderer.is_initialized());
        assert!(matches!(
            renderer.initialize(),
            Err(TextError::AlreadyInitialized)
        ));
        renderer.close();
        assert!(renderer.initialize().is_ok());
    }

    #[test]
    fn test_invalid_construction() {
        let empty = FontRenderer::new(Vec::new(), 10.0, HeadlessBackend::new());
        assert!(matches!(empty, Err(TextError::InvalidArgument(_))));

        let fonts = || vec![BoxFont::new(10.0, 'A'..='Z')];
        assert!(FontRenderer::new(fonts(), 0.0, HeadlessBackend::new()).is_err());
        assert!(FontRenderer::builder(fonts(), 10.0, HeadlessBackend::new())
            .chars_per_page(4)
            .build()
            .is_err());
        assert!(FontRenderer::builder(fonts(), 10.0, HeadlessBackend::new())
            .padding(0)
            .build()
            .is_err());
    }

    #[test]
    fn test_construction_is_lazy() {
        let renderer = renderer();
        assert_eq!(renderer.page_count(), 0);
        assert_eq!(renderer.backend().upload_count(), 0);
    }

    #[test]
    fn test_inline_prebake_fills_cache() {
        let mut renderer =
            FontRenderer::builder(vec![BoxFont::new(10.0, 'A'..='Z')], 10.0, HeadlessBackend::new())
                .executor(InlineExecutor)
                .prebake("ABCЖ")
                .build()
                .unwrap();
        assert!(!renderer.is_prebake_pending());
        assert_eq!(renderer.resolved_count(), 4);
        assert_eq!(renderer.page_count(), 2);
        // baked on the CPU only
        assert_eq!(renderer.backend().upload_count(), 0);

        renderer.draw_string("A", 0.0, 0.0, Color::WHITE).unwrap();
        assert_eq!(renderer.backend().upload_count(), 1);
    }

    #[test]
    fn test_measure_does_not_upload() {
        let mut renderer = renderer();
        renderer.string_width("HELLO").unwrap();
        renderer.string_height("HELLO").unwrap();
        assert_eq!(renderer.page_count(), 1);
        assert_eq!(renderer.backend().upload_count(), 0);
    }

    #[test]
    fn test_usable_after_close() {
        let mut renderer = renderer();
        renderer.draw_string("AB", 0.0, 0.0, Color::WHITE).unwrap();
        renderer.close();
        assert!(!renderer.is_initialized());
        assert!(renderer.backend().live_textures().is_empty());

        renderer.draw_string("AB", 0.0, 0.0, Color::WHITE).unwrap();
        assert!(renderer.is_initialized());
        assert_eq!(renderer.backend().live_textures().len(), 1);
    }

    #[test]
    fn test_trailing_newline_adds_no_line() {
        let mut renderer = renderer();
        let one = renderer.string_height("A").unwrap();
        assert_eq!(renderer.string_height("A\n").unwrap(), one);
        assert_eq!(renderer.string_height("\n").unwrap(), one);
        assert_eq!(renderer.string_height("A\n\n").unwrap(), one * 2.0);
        assert_eq!(renderer.string_height("A\nB").unwrap(), one * 2.0);
    }

    #[test]
    fn test_inline_prebake_outcome_is_recorded() {
        let mut renderer =
            FontRenderer::builder(vec![BoxFont::new(10.0, 'A'..='Z')], 10.0, HeadlessBackend::new())
                .executor(InlineExecutor)
                .prebake("AB")
                .build()
                .unwrap();
        assert!(renderer.last_prebake_outcome().is_none());
        renderer.draw_string("A", 0.0, 0.0, Color::WHITE).unwrap();
        assert_eq!(
            renderer.last_prebake_outcome(),
            Some(&PrebakeOutcome::Completed { resolved: 2 })
        );
    }

    #[test]
    fn test_whitespace_is_not_queued() {
        let mut renderer = renderer();
        renderer.draw_string(" \t ", 0.0, 0.0, Color::WHITE).unwrap();
        assert!(renderer.backend().draws().is_empty());
        assert_eq!(renderer.backend().upload_count(), 0);
    }
}
