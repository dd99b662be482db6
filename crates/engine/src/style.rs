use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// 24-bit RGB colour, written as `#RRGGBB`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb(pub u32);

impl Rgb {
    pub const BLACK: Rgb = Rgb(0x000000);
    pub const MARKER_YELLOW: Rgb = Rgb(0xFFEB00);

    pub fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Rgb(((r as u32) << 16) | ((g as u32) << 8) | (b as u32))
    }

    pub fn r(&self) -> u8 {
        ((self.0 >> 16) & 0xFF) as u8
    }

    pub fn g(&self) -> u8 {
        ((self.0 >> 8) & 0xFF) as u8
    }

    pub fn b(&self) -> u8 {
        (self.0 & 0xFF) as u8
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:06X}", self.0 & 0xFF_FFFF)
    }
}

/// Accepts `#RRGGBB`, `RRGGBB`, and Excel's `AARRGGBB` (alpha dropped).
impl FromStr for Rgb {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.trim().trim_start_matches('#');
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(format!("invalid colour '{s}': expected #RRGGBB"));
        }
        let hex = match hex.len() {
            6 => hex,
            8 => &hex[2..],
            _ => return Err(format!("invalid colour '{s}': expected #RRGGBB")),
        };
        u32::from_str_radix(hex, 16)
            .map(Rgb)
            .map_err(|_| format!("invalid colour '{s}': expected #RRGGBB"))
    }
}

impl Serialize for Rgb {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Rgb {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HorizontalAlign {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerticalAlign {
    Top,
    Center,
    Bottom,
}

/// The visual marker put on matched cells: thin border on all four sides,
/// solid fill, aligned and wrapped text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighlightStyle {
    pub border_color: Rgb,
    pub fill: Rgb,
    pub horizontal: HorizontalAlign,
    pub vertical: VerticalAlign,
    pub wrap_text: bool,
}

impl Default for HighlightStyle {
    fn default() -> Self {
        Self {
            border_color: Rgb::BLACK,
            fill: Rgb::MARKER_YELLOW,
            horizontal: HorizontalAlign::Left,
            vertical: VerticalAlign::Center,
            wrap_text: true,
        }
    }
}

impl HighlightStyle {
    pub fn with_fill(mut self, fill: Rgb) -> Self {
        self.fill = fill;
        self
    }

    pub fn with_border_color(mut self, color: Rgb) -> Self {
        self.border_color = color;
        self
    }
}
