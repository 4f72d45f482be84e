//! Font renderer configuration
//!
//! Can be built in code or deserialized from a TOML table:
//!
//! ```toml
//! size_px = 9.0
//! chars_per_page = 256
//! padding = 5
//! prebake = "ABCDEFGHIJKLMNOPQRSTUVWXYZ"
//! ```

use crate::page::MAX_CODEPOINT;
use crate::{Result, TextError};
use serde::{Deserialize, Serialize};

/// Construction parameters for a [`FontRenderer`](crate::FontRenderer)
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FontRendererConfig {
    /// Font size in logical pixels. One logical pixel = `ui_scale` device pixels.
    pub size_px: f32,
    /// How many consecutive codepoints one atlas page covers
    #[serde(default = "default_chars_per_page")]
    pub chars_per_page: u32,
    /// Padding between glyphs on a page, in device pixels
    #[serde(default = "default_padding")]
    pub padding: u32,
    /// Characters to bake off the render thread whenever the renderer is (re)initialized
    #[serde(default)]
    pub prebake: Option<String>,
}

fn default_chars_per_page() -> u32 {
    256
}

fn default_padding() -> u32 {
    5
}

impl FontRendererConfig {
    /// Config with the given size and default page layout (256 chars, padding 5, no pre-bake)
    pub fn new(size_px: f32) -> Self {
        Self {
            size_px,
            chars_per_page: default_chars_per_page(),
            padding: default_padding(),
            prebake: None,
        }
    }

    pub fn with_chars_per_page(mut self, chars_per_page: u32) -> Self {
        self.chars_per_page = chars_per_page;
        self
    }

    pub fn with_padding(mut self, padding: u32) -> Self {
        self.padding = padding;
        self
    }

    pub fn with_prebake(mut self, chars: impl Into<String>) -> Self {
        self.prebake = Some(chars.into());
        self
    }

    /// Parse a config from a TOML document
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the parameters a renderer cannot work with
    pub fn validate(&self) -> Result<()> {
        if !(self.size_px > 0.0) || !self.size_px.is_finite() {
            return Err(TextError::InvalidArgument("size_px must be a positive number"));
        }
        if self.chars_per_page <= 4 {
            return Err(TextError::InvalidArgument("unreasonable chars_per_page count"));
        }
        if self.chars_per_page > MAX_CODEPOINT {
            return Err(TextError::InvalidArgument(
                "chars_per_page exceeds the Unicode codepoint range",
            ));
        }
        if self.padding == 0 {
            return Err(TextError::InvalidArgument("padding must be > 0"));
        }
        Ok(())
    }

    /// Pre-bake characters, if any were configured
    pub(crate) fn prebake_chars(&self) -> Option<&str> {
        self.prebake.as_deref().filter(|chars| !chars.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = FontRendererConfig::new(9.0);
        assert_eq!(config.chars_per_page, 256);
        assert_eq!(config.padding, 5);
        assert!(config.prebake.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_invalid_parameters() {
        for config in [
            FontRendererConfig::new(0.0),
            FontRendererConfig::new(-3.0),
            FontRendererConfig::new(f32::NAN),
            FontRendererConfig::new(f32::INFINITY),
            FontRendererConfig::new(10.0).with_chars_per_page(4),
            FontRendererConfig::new(10.0).with_chars_per_page(0x11_0001),
            FontRendererConfig::new(10.0).with_chars_per_page(1 << 30),
            FontRendererConfig::new(10.0).with_padding(0),
        ] {
            assert!(
                matches!(config.validate(), Err(TextError::InvalidArgument(_))),
                "{config:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_whole_codepoint_range_fits_one_page() {
        let config = FontRendererConfig::new(10.0).with_chars_per_page(0x11_0000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_toml_rejects_oversized_pages() {
        assert!(matches!(
            FontRendererConfig::from_toml_str("size_px = 10.0\nchars_per_page = 1073741824"),
            Err(TextError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_from_toml() {
        let config = FontRendererConfig::from_toml_str(
            r#"
            size_px = 12.5
            padding = 2
            prebake = "abc"
            "#,
        )
        .unwrap();
        assert_eq!(config.size_px, 12.5);
        assert_eq!(config.chars_per_page, 256);
        assert_eq!(config.padding, 2);
        assert_eq!(config.prebake_chars(), Some("abc"));
    }

    #[test]
    fn test_from_toml_validates() {
        assert!(matches!(
            FontRendererConfig::from_toml_str("size_px = 10.0\nchars_per_page = 3"),
            Err(TextError::InvalidArgument(_))
        ));
        assert!(matches!(
            FontRendererConfig::from_toml_str("padding = 1"),
            Err(TextError::Config(_))
        ));
    }

    #[test]
    fn test_empty_prebake_is_ignored() {
        let config = FontRendererConfig::new(10.0).with_prebake("");
        assert_eq!(config.prebake_chars(), None);
    }
}
