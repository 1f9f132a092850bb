//! Canvas Palette
//!
//! The closed set of colors a canvas pixel may take. The order is fixed:
//! a palette index sent by a client refers to a position in [`PALETTE`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of colors in the palette
pub const PALETTE_SIZE: usize = 24;

/// An RGB color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb(pub [u8; 3]);

impl Rgb {
    /// Create a color from its components
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self([r, g, b])
    }

    const fn from_u24(value: u32) -> Self {
        Self([(value >> 16) as u8, (value >> 8) as u8, value as u8])
    }

    /// Format as an upper-case `#RRGGBB` string
    #[must_use]
    pub fn to_hex(self) -> String {
        let [r, g, b] = self.0;
        format!("#{:02X}{:02X}{:02X}", r, g, b)
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Error returned when a string is not a `#RRGGBB` color
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseColorError(String);

impl fmt::Display for ParseColorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "not a #RRGGBB color: {}", self.0)
    }
}

impl std::error::Error for ParseColorError {}

impl FromStr for Rgb {
    type Err = ParseColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix('#').unwrap_or(s);
        if digits.len() != 6 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ParseColorError(s.to_string()));
        }
        u32::from_str_radix(digits, 16)
            .map(Self::from_u24)
            .map_err(|_| ParseColorError(s.to_string()))
    }
}

/// The fixed canvas palette
pub const PALETTE: [Rgb; PALETTE_SIZE] = [
    Rgb::from_u24(0xBE0039),
    Rgb::from_u24(0xFF4500),
    Rgb::from_u24(0xFFA800),
    Rgb::from_u24(0xFFD635),
    Rgb::from_u24(0x00A368),
    Rgb::from_u24(0x00CC78),
    Rgb::from_u24(0x7EED56),
    Rgb::from_u24(0x00756F),
    Rgb::from_u24(0x009EAA),
    Rgb::from_u24(0x2450A4),
    Rgb::from_u24(0x3690EA),
    Rgb::from_u24(0x51E9F4),
    Rgb::from_u24(0x493AC1),
    Rgb::from_u24(0x6A5CFF),
    Rgb::from_u24(0x811E9F),
    Rgb::from_u24(0xB44AC0),
    Rgb::from_u24(0xFF3881),
    Rgb::from_u24(0xFF99AA),
    Rgb::from_u24(0x6D482F),
    Rgb::from_u24(0x9C6926),
    Rgb::from_u24(0x000000),
    Rgb::from_u24(0x898D90),
    Rgb::from_u24(0xD4D7D9),
    Rgb::from_u24(0xFFFFFF),
];

/// A color value as it may reach the validator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorValue<'a> {
    /// `#RRGGBB` string, case-insensitive
    Hex(&'a str),
    /// Raw RGB triple
    Rgb(Rgb),
    /// Position in the palette
    Index(i64),
}

/// Membership checks against [`PALETTE`]
#[derive(Debug, Clone, Copy, Default)]
pub struct Palette;

impl Palette {
    /// All palette colors in index order
    #[must_use]
    pub fn colors(&self) -> &'static [Rgb; PALETTE_SIZE] {
        &PALETTE
    }

    /// Check any color value for membership
    #[must_use]
    pub fn is_valid_color(&self, value: ColorValue<'_>) -> bool {
        match value {
            ColorValue::Hex(hex) => self.contains_hex(hex),
            ColorValue::Rgb(rgb) => self.contains(rgb),
            ColorValue::Index(index) => self.is_valid_index(index),
        }
    }

    /// Check an RGB triple
    #[inline]
    #[must_use]
    pub fn contains(&self, rgb: Rgb) -> bool {
        PALETTE.contains(&rgb)
    }

    /// Check a `#RRGGBB` string; malformed strings are simply not members
    #[must_use]
    pub fn contains_hex(&self, hex: &str) -> bool {
        hex.parse::<Rgb>().map(|rgb| self.contains(rgb)).unwrap_or(false)
    }

    /// Check that an index addresses a palette entry
    #[must_use]
    pub fn is_valid_index(&self, index: i64) -> bool {
        usize::try_from(index).is_ok_and(|i| i < PALETTE_SIZE)
    }

    /// Position of a color in the palette
    #[must_use]
    pub fn index_of(&self, rgb: Rgb) -> Option<usize> {
        PALETTE.iter().position(|c| *c == rgb)
    }

    /// Color at a palette index
    #[must_use]
    pub fn get(&self, index: usize) -> Option<Rgb> {
        PALETTE.get(index).copied()
    }
}
