// SPDX-License-Identifier: MIT

//!
//! Parse, blend, and write the colours used in feature styles
//!

use crate::lerp;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Errors that can arise in relation to a [`Colour`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ColourError {
    #[error("Colour `{0}` is not #rrggbb, #rrggbbaa, or a known colour name")]
    Unrecognised(String),
}

/// The `Colour` type.  The alpha channel is only present if the colour was
/// written with one (e.g. `#ab66efcc`).  Serialised as a hex string.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Colour {
    r: u8,
    g: u8,
    b: u8,
    a: Option<u8>,
}

/// The colour names datasets may use in place of hex values
const NAMED_COLOURS: [(&str, [u8; 3]); 10] = [
    ("white", [0xff, 0xff, 0xff]),
    ("black", [0x00, 0x00, 0x00]),
    ("red", [0xff, 0x00, 0x00]),
    ("green", [0x00, 0x80, 0x00]),
    ("blue", [0x00, 0x00, 0xff]),
    ("gray", [0x80, 0x80, 0x80]),
    ("grey", [0x80, 0x80, 0x80]),
    ("yellow", [0xff, 0xff, 0x00]),
    ("orange", [0xff, 0xa5, 0x00]),
    ("purple", [0x80, 0x00, 0x80]),
];

impl From<Colour> for [u8; 3] {
    fn from(value: Colour) -> Self {
        [value.r, value.g, value.b]
    }
}

impl From<[u8; 3]> for Colour {
    fn from(value: [u8; 3]) -> Self {
        Colour::from_rgb(value[0], value[1], value[2])
    }
}

impl Colour {
    /// Create a colour from RGB values
    pub const fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Colour { r, g, b, a: None }
    }

    /// Create a colour from RGBA values
    pub const fn from_rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Colour { r, g, b, a: Some(a) }
    }

    /// Parse either a hex colour or a colour name (e.g. `white`)
    pub fn parse(colour: &str) -> Result<Self, ColourError> {
        let trimmed = colour.trim();
        NAMED_COLOURS
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(trimmed))
            .map(|(_, rgb)| Colour::from(*rgb))
            .map_or_else(|| Colour::from_hex(trimmed), Ok)
    }

    /// Create a colour from a hex colour (e.g. `#ab66ef`, `ab66ef`, `#ab66efff`)
    pub fn from_hex(hex_colour: &str) -> Result<Self, ColourError> {
        let unrecognised = || ColourError::Unrecognised(hex_colour.to_string());

        let digits = hex_colour.trim();
        let digits = digits.strip_prefix('#').unwrap_or(digits);
        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(unrecognised());
        }

        // All ASCII from here, so byte slicing is safe
        let channel = |index: usize| u8::from_str_radix(&digits[index..index + 2], 16);
        match digits.len() {
            6 => match (channel(0), channel(2), channel(4)) {
                (Ok(r), Ok(g), Ok(b)) => Ok(Colour::from_rgb(r, g, b)),
                _ => Err(unrecognised()),
            },
            8 => match (channel(0), channel(2), channel(4), channel(6)) {
                (Ok(r), Ok(g), Ok(b), Ok(a)) => Ok(Colour::from_rgba(r, g, b, a)),
                _ => Err(unrecognised()),
            },
            _ => Err(unrecognised()),
        }
    }

    /// Get a colour as RGB values
    pub fn as_rgb(&self) -> (u8, u8, u8) {
        (self.r, self.g, self.b)
    }

    /// Get the alpha channel, if the colour has one
    pub fn alpha(&self) -> Option<u8> {
        self.a
    }

    /// To get RGB as, say, #0affc3 (or #0affc380 with an alpha channel)
    pub fn to_hex(&self) -> String {
        // {:02x} means print as hex, requesting 2 chars (pad left with "0" if only 1 char otherwise)
        let (r, g, b) = self.as_rgb();
        match self.a {
            Some(a) => format!("#{r:02x}{g:02x}{b:02x}{a:02x}"),
            None => format!("#{r:02x}{g:02x}{b:02x}"),
        }
    }

    /// Blend channel by channel towards `other`.  Channels are rounded half
    /// away from zero, so halfway between `#000000` and `#ffffff` is
    /// `#808080`.  If only one side has an alpha channel, the other is taken
    /// to be opaque.
    pub fn blend(self, other: Colour, ratio: f64) -> Colour {
        let mix = |from: u8, to: u8| -> u8 {
            lerp(f64::from(from), f64::from(to), ratio)
                .round()
                .clamp(0.0, 255.0) as u8
        };
        let a = match (self.a, other.a) {
            (None, None) => None,
            (from, to) => Some(mix(from.unwrap_or(u8::MAX), to.unwrap_or(u8::MAX))),
        };
        Colour {
            r: mix(self.r, other.r),
            g: mix(self.g, other.g),
            b: mix(self.b, other.b),
            a,
        }
    }
}

impl Serialize for Colour {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Colour {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let colour = String::deserialize(deserializer)?;
        Colour::parse(&colour).map_err(serde::de::Error::custom)
    }
}
