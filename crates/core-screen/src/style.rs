//! Graphic attributes carried by every cell.

/// Cell color: a 4-bit or 8-bit palette entry, a 24-bit truecolor value,
/// or the renderer's default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Color {
    #[default]
    Default,
    /// 16-color palette (0-7 normal, 8-15 bright).
    Idx4(u8),
    /// 256-color palette.
    Idx8(u8),
    /// Truecolor.
    Rgb(u8, u8, u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FontStyle {
    #[default]
    Regular,
    Bold,
    Italic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Decoration {
    #[default]
    None,
    Underline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Intensity {
    #[default]
    Normal,
    Bright,
}

/// The full attribute set applied to newly written cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Style {
    pub fg: Color,
    pub bg: Color,
    pub font_style: FontStyle,
    pub decoration: Decoration,
    pub intensity: Intensity,
}
