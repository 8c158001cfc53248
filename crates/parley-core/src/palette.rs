//! Accent color palette and the bottom-sheet picker state.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ConfigError;

/// Colour applied to the user's own message bubbles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AccentColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl AccentColor {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl Default for AccentColor {
    fn default() -> Self {
        PALETTE[0].color
    }
}

impl fmt::Display for AccentColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl FromStr for AccentColor {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::InvalidColor(s.to_string());
        let hex = s.trim().strip_prefix('#').ok_or_else(invalid)?;
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(invalid());
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());
        Ok(Self::rgb(channel(0)?, channel(2)?, channel(4)?))
    }
}

impl Serialize for AccentColor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for AccentColor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A named palette entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Swatch {
    pub name: &'static str,
    pub color: AccentColor,
}

pub const PALETTE_COLUMNS: usize = 5;

pub const PALETTE: [Swatch; 10] = [
    Swatch { name: "Blue", color: AccentColor::rgb(0x00, 0x7A, 0xFF) },
    Swatch { name: "Indigo", color: AccentColor::rgb(0x58, 0x56, 0xD6) },
    Swatch { name: "Purple", color: AccentColor::rgb(0xAF, 0x52, 0xDE) },
    Swatch { name: "Pink", color: AccentColor::rgb(0xFF, 0x2D, 0x55) },
    Swatch { name: "Red", color: AccentColor::rgb(0xFF, 0x3B, 0x30) },
    Swatch { name: "Orange", color: AccentColor::rgb(0xFF, 0x95, 0x00) },
    Swatch { name: "Yellow", color: AccentColor::rgb(0xFF, 0xCC, 0x00) },
    Swatch { name: "Green", color: AccentColor::rgb(0x34, 0xC7, 0x59) },
    Swatch { name: "Teal", color: AccentColor::rgb(0x30, 0xB0, 0xC7) },
    Swatch { name: "Graphite", color: AccentColor::rgb(0x48, 0x48, 0x4A) },
];

/// Modal colour picker. `select` is the only way the accent changes.
#[derive(Debug, Clone)]
pub struct ColorPicker {
    open: bool,
    highlighted: usize,
    accent: AccentColor,
}

impl ColorPicker {
    pub fn new(accent: AccentColor) -> Self {
        Self {
            open: false,
            highlighted: 0,
            accent,
        }
    }

    /// Opens the sheet with the current accent highlighted, if it is in the palette
    pub fn open(&mut self) {
        self.highlighted = PALETTE
            .iter()
            .position(|s| s.color == self.accent)
            .unwrap_or(0);
        self.open = true;
    }

    pub fn close(&mut self) {
        self.open = false;
    }

    pub fn select(&mut self, color: AccentColor) {
        self.accent = color;
        self.close();
    }

    pub fn select_highlighted(&mut self) {
        let color = PALETTE[self.highlighted].color;
        tracing::debug!(accent = %color, "accent color selected");
        self.select(color);
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn accent(&self) -> AccentColor {
        self.accent
    }

    pub fn highlighted(&self) -> usize {
        self.highlighted
    }

    pub fn highlight(&mut self, idx: usize) {
        if idx < PALETTE.len() {
            self.highlighted = idx;
        }
    }

    pub fn move_right(&mut self) {
        self.highlighted = (self.highlighted + 1).min(PALETTE.len() - 1);
    }

    pub fn move_left(&mut self) {
        self.highlighted = self.highlighted.saturating_sub(1);
    }

    pub fn move_down(&mut self) {
        let next = self.highlighted + PALETTE_COLUMNS;
        if next < PALETTE.len() {
            self.highlighted = next;
        }
    }

    pub fn move_up(&mut self) {
        if self.highlighted >= PALETTE_COLUMNS {
            self.highlighted -= PALETTE_COLUMNS;
        }
    }
}

impl Default for ColorPicker {
    fn default() -> Self {
        Self::new(AccentColor::default())
    }
}
