//! Shared fixtures for the integration tests

#![allow(dead_code)]

use pagefont::{FontHandle, GlyphBitmap, GlyphExtent, GlyphPixels};
use std::sync::Arc;
use std::time::Duration;

/// Route `tracing` output to the test harness (`RUST_LOG=pagefont=debug`)
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Synthetic font: every printable character is a solid block half an em
/// wide, a space is a quarter em, lines are 1.2 em tall.
#[derive(Debug, Clone)]
pub struct BlockFont {
    size_px: f32,
    /// Slept on every measurement, to keep page bakes busy
    delay: Option<Duration>,
}

impl BlockFont {
    pub fn new(size_px: f32) -> Arc<dyn FontHandle> {
        Arc::new(Self {
            size_px,
            delay: None,
        })
    }

    pub fn slow(size_px: f32, delay: Duration) -> Arc<dyn FontHandle> {
        Arc::new(Self {
            size_px,
            delay: Some(delay),
        })
    }
}

impl FontHandle for BlockFont {
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
        !c.is_control()
    }

    fn measure(&self, c: char) -> GlyphExtent {
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        let em = if c == ' ' { 0.25 } else { 0.5 };
        GlyphExtent {
            width: self.size_px * em,
            height: self.size_px * 1.2,
        }
    }

    fn ascent(&self) -> f32 {
        self.size_px
    }

    fn rasterize(&self, c: char) -> Option<GlyphBitmap> {
        if c.is_whitespace() {
            return None;
        }
        let width = (self.size_px * 0.5) as u32;
        let height = self.size_px as u32;
        Some(GlyphBitmap {
            left: 0,
            top: height as i32,
            width,
            height,
            pixels: GlyphPixels::Coverage(vec![255; (width * height) as usize]),
        })
    }
}
