//! Background colors for canvas padding.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::types::PipelineError;

/// An RGBA8 color parsed from a hex string.
///
/// Accepts `#rgb`, `#rgba`, `#rrggbb`, and `#rrggbbaa` (the leading `#`
/// is optional). Always formats as lowercase `#rrggbbaa`, which is the
/// form hashed into cache fingerprints, so `#FFF` and `#ffffffff` name the
/// same thumbnail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color(pub [u8; 4]);

impl Color {
    /// Opaque white, the default canvas background.
    pub const WHITE: Self = Self([255, 255, 255, 255]);

    /// Fully transparent black.
    pub const TRANSPARENT: Self = Self([0, 0, 0, 0]);

    /// Convert to an `image` pixel.
    #[must_use]
    pub const fn to_rgba(self) -> image::Rgba<u8> {
        image::Rgba(self.0)
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b, a] = self.0;
        write!(f, "#{r:02x}{g:02x}{b:02x}{a:02x}")
    }
}

impl FromStr for Color {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || PipelineError::invalid(format!("invalid color '{s}'"));
        let hex = s.trim();
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(invalid());
        }

        let nibble = |i: usize| u8::from_str_radix(&hex[i..=i], 16).map_err(|_| invalid());
        let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());

        let rgba = match hex.len() {
            3 | 4 => {
                let mut out = [255; 4];
                for (i, slot) in out.iter_mut().take(hex.len()).enumerate() {
                    *slot = nibble(i)? * 0x11;
                }
                out
            }
            6 | 8 => {
                let mut out = [255; 4];
                for (i, slot) in out.iter_mut().take(hex.len() / 2).enumerate() {
                    *slot = byte(i * 2)?;
                }
                out
            }
            _ => return Err(invalid()),
        };
        Ok(Self(rgba))
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parses_long_form() {
        assert_eq!("#ff8000".parse::<Color>().unwrap(), Color([255, 128, 0, 255]));
    }

    #[test]
    fn parses_short_form_without_hash() {
        assert_eq!("f80".parse::<Color>().unwrap(), Color([255, 136, 0, 255]));
    }

    #[test]
    fn parses_alpha_forms() {
        assert_eq!("#0000".parse::<Color>().unwrap(), Color::TRANSPARENT);
        assert_eq!(
            "#11223344".parse::<Color>().unwrap(),
            Color([0x11, 0x22, 0x33, 0x44])
        );
    }

    #[test]
    fn equivalent_spellings_display_identically() {
        let a: Color = "#FFF".parse().unwrap();
        let b: Color = "#ffffffff".parse().unwrap();
        assert_eq!(a.to_string(), b.to_string());
        assert_eq!(a.to_string(), "#ffffffff");
    }

    #[test]
    fn rejects_bad_input() {
        for bad in ["", "#", "#12", "#12345", "#ggg", "white", "#ffé"] {
            assert!(
                matches!(bad.parse::<Color>(), Err(PipelineError::InvalidArgument(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn default_is_white() {
        assert_eq!(Color::default(), Color::WHITE);
    }

    #[test]
    fn serde_uses_hex_string() {
        let json = serde_json::to_string(&Color::WHITE).unwrap();
        assert_eq!(json, "\"#ffffffff\"");
        let back: Color = serde_json::from_str("\"#000\"").unwrap();
        assert_eq!(back, Color([0, 0, 0, 255]));
    }
}
