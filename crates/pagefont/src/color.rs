//! Text colors and the control-code palette

/// RGBA color with 0.0-1.0 components
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const WHITE: Color = Color::rgba(1.0, 1.0, 1.0, 1.0);
    pub const BLACK: Color = Color::rgba(0.0, 0.0, 0.0, 1.0);

    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub fn from_rgba8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self::rgba(
            r as f32 / 255.0,
            g as f32 / 255.0,
            b as f32 / 255.0,
            a as f32 / 255.0,
        )
    }

    /// Opaque color from a `0xRRGGBB` value
    pub fn from_rgb_u32(rgb: u32) -> Self {
        Self::from_rgba8((rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8, 255)
    }

    /// Same alpha, different color channels
    pub fn with_rgb(self, rgb: Color) -> Self {
        Self {
            r: rgb.r,
            g: rgb.g,
            b: rgb.b,
            a: self.a,
        }
    }

    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl From<[f32; 4]> for Color {
    fn from([r, g, b, a]: [f32; 4]) -> Self {
        Self::rgba(r, g, b, a)
    }
}

impl From<Color> for [f32; 4] {
    fn from(color: Color) -> Self {
        color.to_array()
    }
}

/// Control-code colors `0`-`f`, as `0xRRGGBB`
pub const PALETTE: [u32; 16] = [
    0x000000, 0x0000AA, 0x00AA00, 0x00AAAA, 0xAA0000, 0xAA00AA, 0xFFAA00, 0xAAAAAA, 0x555555,
    0x5555FF, 0x55FF55, 0x55FFFF, 0xFF5555, 0xFF55FF, 0xFFFF55, 0xFFFFFF,
];

/// Palette color for a code character (case-insensitive hex digit)
pub fn palette_color(code: char) -> Option<Color> {
    code.to_digit(16)
        .map(|index| Color::from_rgb_u32(PALETTE[index as usize]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_palette_lookup_is_case_insensitive() {
        assert_eq!(palette_color('c'), palette_color('C'));
        assert_eq!(palette_color('c'), Some(Color::from_rgb_u32(0xFF5555)));
        assert_eq!(palette_color('0'), Some(Color::BLACK));
        assert_eq!(palette_color('f'), Some(Color::WHITE));
    }

    #[test]
    fn test_palette_rejects_non_hex() {
        assert_eq!(palette_color('r'), None);
        assert_eq!(palette_color('g'), None);
        assert_eq!(palette_color('§'), None);
    }

    #[test]
    fn test_with_rgb_keeps_alpha() {
        let base = Color::rgba(0.1, 0.2, 0.3, 0.5);
        let tinted = base.with_rgb(Color::from_rgb_u32(0xFF0000));
        assert_eq!(tinted.to_array(), [1.0, 0.0, 0.0, 0.5]);
    }
}
