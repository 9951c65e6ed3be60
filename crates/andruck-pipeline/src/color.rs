//! Color primitives: RGB triples, hex parsing, and Rec.601 luminance.
//!
//! Everything in the pipeline works in gamma-space 8-bit channel values;
//! no linear-light conversion is performed anywhere. Luminance uses the
//! Rec.601 weights `0.299 R + 0.587 G + 0.114 B`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// An opaque RGB color with 8-bit channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

/// Process cyan ink.
pub const INK_CYAN: Rgb = Rgb::new(0x00, 0x9F, 0xCE);
/// Process magenta ink.
pub const INK_MAGENTA: Rgb = Rgb::new(0xD4, 0x00, 0x6A);
/// Process yellow ink.
pub const INK_YELLOW: Rgb = Rgb::new(0xF5, 0xD8, 0x00);
/// Process black (key) ink.
pub const INK_KEY: Rgb = Rgb::new(0x10, 0x0C, 0x08);

impl Rgb {
    /// Construct from channel values.
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Pure white.
    pub const WHITE: Self = Self::new(255, 255, 255);

    /// Parse a `#rrggbb` hex string (leading `#` optional).
    ///
    /// Returns `None` for anything that is not exactly six hex digits.
    #[must_use]
    pub fn parse_hex(s: &str) -> Option<Self> {
        let digits = s.strip_prefix('#').unwrap_or(s);
        if digits.len() != 6 || !digits.is_ascii() {
            return None;
        }
        let r = u8::from_str_radix(&digits[0..2], 16).ok()?;
        let g = u8::from_str_radix(&digits[2..4], 16).ok()?;
        let b = u8::from_str_radix(&digits[4..6], 16).ok()?;
        Some(Self::new(r, g, b))
    }

    /// Channel values as an array, in R, G, B order.
    #[must_use]
    pub const fn channels(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }

    /// This color with every channel scaled by `factor` (clamped on store).
    #[must_use]
    pub fn scaled(self, factor: f64) -> Self {
        let scale = |c: u8| (f64::from(c) * factor).clamp(0.0, 255.0).round() as u8;
        Self::new(scale(self.r), scale(self.g), scale(self.b))
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Rec.601 luminance of 8-bit channel values, on the 0–255 scale.
#[must_use]
pub fn luminance(r: u8, g: u8, b: u8) -> f64 {
    0.299 * f64::from(r) + 0.587 * f64::from(g) + 0.114 * f64::from(b)
}

/// Linear interpolation between `a` and `b` by `t` (unclamped).
#[must_use]
pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// Clamp a float to the storable 8-bit range and round.
#[must_use]
pub fn clamp_u8(v: f64) -> u8 {
    v.clamp(0.0, 255.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_hex_with_and_without_hash() {
        assert_eq!(Rgb::parse_hex("#f0ead8"), Some(Rgb::new(0xF0, 0xEA, 0xD8)));
        assert_eq!(Rgb::parse_hex("f0ead8"), Some(Rgb::new(0xF0, 0xEA, 0xD8)));
    }

    #[test]
    fn parse_hex_rejects_bad_input() {
        assert_eq!(Rgb::parse_hex(""), None);
        assert_eq!(Rgb::parse_hex("#fff"), None);
        assert_eq!(Rgb::parse_hex("#gggggg"), None);
        assert_eq!(Rgb::parse_hex("#1234567"), None);
    }

    #[test]
    fn display_round_trips_through_parse() {
        let c = Rgb::new(0x00, 0x9F, 0xCE);
        assert_eq!(Rgb::parse_hex(&c.to_string()), Some(c));
    }

    #[test]
    fn luminance_of_extremes() {
        assert_eq!(luminance(0, 0, 0), 0.0);
        assert!((luminance(255, 255, 255) - 255.0).abs() < 1e-9);
    }

    #[test]
    fn luminance_weights_green_heaviest() {
        assert!(luminance(0, 255, 0) > luminance(255, 0, 0));
        assert!(luminance(255, 0, 0) > luminance(0, 0, 255));
    }

    #[test]
    fn clamp_u8_saturates() {
        assert_eq!(clamp_u8(-5.0), 0);
        assert_eq!(clamp_u8(300.0), 255);
        assert_eq!(clamp_u8(127.6), 128);
    }

    #[test]
    fn scaled_darkens() {
        let c = INK_CYAN.scaled(0.6);
        assert!(c.r <= INK_CYAN.r && c.g < INK_CYAN.g && c.b < INK_CYAN.b);
    }
}
