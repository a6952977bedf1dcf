//! Theme loading: btop-style `theme[key]="value"` files and hex → ratatui Color.

use crate::Palette;
use crate::game::BlockColor;
use ratatui::style::Color;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Block colours plus the UI colours around the boards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Theme {
    /// Indexed by [`BlockColor::index`]: red, green, blue, yellow, purple, orange.
    pub blocks: [Color; 6],
    /// Special items (bombs, missiles).
    pub special: Color,
    /// Canvas background.
    pub bg: Color,
    /// Grid dots and borders.
    pub div_line: Color,
    /// Body text.
    pub main_fg: Color,
    /// Titles and highlights.
    pub title: Color,
    /// Secondary text (players not ready yet, hints).
    pub inactive_fg: Color,
}

#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("cannot read theme file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid hex colour: {0}")]
    InvalidHex(String),
}

/// Pure canvas colours: the six named block colours at full saturation.
const CLASSIC_BLOCKS: [Color; 6] = [
    Color::Rgb(255, 0, 0),
    Color::Rgb(0, 255, 0),
    Color::Rgb(0, 0, 255),
    Color::Rgb(255, 255, 0),
    Color::Rgb(255, 0, 255),
    Color::Rgb(255, 128, 0),
];

impl Default for Theme {
    fn default() -> Self {
        Self::classic()
    }
}

impl Theme {
    pub fn classic() -> Self {
        Self {
            blocks: CLASSIC_BLOCKS,
            special: Color::Rgb(0xF5, 0xF5, 0xF5),
            bg: Color::Rgb(0x1E, 0x1F, 0x24),
            div_line: Color::Rgb(0x4B, 0x50, 0x5C),
            main_fg: Color::Rgb(0xAB, 0xB2, 0xBF),
            title: Color::Rgb(0xE5, 0xC0, 0x7B),
            inactive_fg: Color::Rgb(0x5C, 0x63, 0x70),
        }
    }

    /// Load a btop-style theme file (`theme[key]="#RRGGBB"`), then apply `palette`.
    /// With no path, or a path that does not exist, the classic colours are used.
    pub fn load(path: Option<&Path>, palette: Palette) -> Result<Self, ThemeError> {
        let mut theme = match path {
            Some(p) if p.exists() => {
                let s = std::fs::read_to_string(p)?;
                Self::from_map(&parse_theme_file(&s))?
            }
            _ => Self::classic(),
        };
        theme.apply_palette(palette);
        Ok(theme)
    }

    /// Replace the block colours for high-contrast or colorblind play.
    pub fn apply_palette(&mut self, palette: Palette) {
        match palette {
            Palette::Normal => {}
            Palette::HighContrast => {
                self.blocks = CLASSIC_BLOCKS;
                self.bg = Color::Black;
                self.special = Color::White;
            }
            Palette::Colorblind => {
                // Okabe-Ito style set; red and green are never the only difference.
                self.blocks = [
                    Color::Rgb(0xD5, 0x5E, 0x00),
                    Color::Rgb(0x00, 0x9E, 0x73),
                    Color::Rgb(0x00, 0x72, 0xB2),
                    Color::Rgb(0xF0, 0xE4, 0x42),
                    Color::Rgb(0xCC, 0x79, 0xA7),
                    Color::Rgb(0xE6, 0x9F, 0x00),
                ];
            }
        }
    }

    /// Keys not present fall back to the classic theme. A present key with a bad value is an error.
    fn from_map(map: &HashMap<String, String>) -> Result<Self, ThemeError> {
        let get = |keys: &[&str], fallback: Color| -> Result<Color, ThemeError> {
            keys.iter()
                .find_map(|k| map.get(*k))
                .map_or(Ok(fallback), |v| parse_hex(v))
        };
        let classic = Self::classic();
        Ok(Self {
            blocks: [
                get(&["block_red", "cpu_end"], CLASSIC_BLOCKS[0])?,
                get(&["block_green", "mem_box"], CLASSIC_BLOCKS[1])?,
                get(&["block_blue", "cpu_box"], CLASSIC_BLOCKS[2])?,
                get(&["block_yellow"], CLASSIC_BLOCKS[3])?,
                get(&["block_purple", "net_box"], CLASSIC_BLOCKS[4])?,
                get(&["block_orange"], CLASSIC_BLOCKS[5])?,
            ],
            special: get(&["special", "hi_fg"], classic.special)?,
            bg: get(&["main_bg", "meter_bg"], classic.bg)?,
            div_line: get(&["div_line"], classic.div_line)?,
            main_fg: get(&["main_fg"], classic.main_fg)?,
            title: get(&["title"], classic.title)?,
            inactive_fg: get(&["inactive_fg"], classic.inactive_fg)?,
        })
    }

    #[inline]
    pub fn block_color(&self, color: BlockColor) -> Color {
        self.blocks[color.index()]
    }
}

/// Parse btop-style theme file into key -> value map. Blank values are skipped.
fn parse_theme_file(s: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for line in s.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some(stripped) = line.strip_prefix("theme[") else {
            continue;
        };
        let Some((key, rest)) = stripped.split_once(']') else {
            continue;
        };
        let Some((_, value)) = rest.split_once('=') else {
            continue;
        };
        let value = value.trim().trim_matches('"').trim_matches('\'').trim();
        if !value.is_empty() {
            map.insert(key.trim().to_string(), value.to_string());
        }
    }
    map
}

/// Parse hex colour "#RRGGBB" or "#RGB" into ratatui Color.
pub fn parse_hex(s: &str) -> Result<Color, ThemeError> {
    let hex = s.trim().trim_start_matches('#');
    let invalid = || ThemeError::InvalidHex(s.trim().to_string());
    if !hex.is_ascii() {
        return Err(invalid());
    }
    let channel = |range: std::ops::Range<usize>, scale: u8| {
        u8::from_str_radix(&hex[range], 16)
            .map(|v| v * scale)
            .map_err(|_| invalid())
    };
    match hex.len() {
        6 => Ok(Color::Rgb(channel(0..2, 1)?, channel(2..4, 1)?, channel(4..6, 1)?)),
        3 => Ok(Color::Rgb(channel(0..1, 17)?, channel(1..2, 17)?, channel(2..3, 17)?)),
        _ => Err(invalid()),
    }
}
