//! CSS-style color parsing for filter parameters.
//!
//! Accepts `#rgb`, `#rgba`, `#rrggbb`, `#rrggbbaa`, `rgb(r, g, b)` and
//! `rgba(r, g, b, a)`. Alpha is kept in `0.0..=1.0`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{Error, Result};

/// An sRGB color with straight alpha.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f64,
}

impl Color {
    pub const WHITE: Color = Color::rgb(255, 255, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Parse a color string.
    pub fn parse(input: &str) -> Result<Self> {
        let s = input.trim();
        if let Some(hex) = s.strip_prefix('#') {
            return parse_hex(hex).ok_or_else(|| Error::InvalidColor(input.to_string()));
        }
        let lower = s.to_ascii_lowercase();
        let body = lower
            .strip_prefix("rgba(")
            .or_else(|| lower.strip_prefix("rgb("))
            .and_then(|rest| rest.strip_suffix(')'));
        match body {
            Some(body) => parse_functional(body).ok_or_else(|| Error::InvalidColor(input.to_string())),
            None => parse_hex(s).ok_or_else(|| Error::InvalidColor(input.to_string())),
        }
    }

    /// Channels as `[r, g, b]` bytes.
    pub fn rgb_bytes(&self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }

    /// Channels normalized to `0.0..=1.0`.
    pub fn to_unit(&self) -> [f32; 4] {
        [
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
            self.a as f32,
        ]
    }

    /// `#RRGGBB`, or `#RRGGBBAA` when not opaque.
    pub fn to_hex(&self) -> String {
        if self.a >= 1.0 {
            format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
        } else {
            let a = (self.a.clamp(0.0, 1.0) * 255.0).round() as u8;
            format!("#{:02X}{:02X}{:02X}{:02X}", self.r, self.g, self.b, a)
        }
    }
}

impl FromStr for Color {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Serialized as its hex string.
impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Color::parse(&s).map_err(serde::de::Error::custom)
    }
}

fn parse_hex(hex: &str) -> Option<Color> {
    if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let nibble = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok().map(|v| v * 17);
    let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    match hex.len() {
        3 => Some(Color::rgb(nibble(0)?, nibble(1)?, nibble(2)?)),
        4 => Some(Color { a: nibble(3)? as f64 / 255.0, ..Color::rgb(nibble(0)?, nibble(1)?, nibble(2)?) }),
        6 => Some(Color::rgb(byte(0)?, byte(2)?, byte(4)?)),
        8 => Some(Color { a: byte(6)? as f64 / 255.0, ..Color::rgb(byte(0)?, byte(2)?, byte(4)?) }),
        _ => None,
    }
}

fn parse_functional(body: &str) -> Option<Color> {
    let parts: Vec<&str> = body.split(',').map(str::trim).collect();
    if parts.len() != 3 && parts.len() != 4 {
        return None;
    }
    let channel = |s: &str| -> Option<u8> {
        let v = match s.strip_suffix('%') {
            Some(pct) => pct.parse::<f64>().ok()? * 2.55,
            None => s.parse::<f64>().ok()?,
        };
        Some(v.round().clamp(0.0, 255.0) as u8)
    };
    let a = match parts.get(3) {
        Some(s) => s.parse::<f64>().ok()?.clamp(0.0, 1.0),
        None => 1.0,
    };
    Some(Color { r: channel(parts[0])?, g: channel(parts[1])?, b: channel(parts[2])?, a })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_forms() {
        assert_eq!(Color::parse("#F95C63").unwrap(), Color::rgb(0xF9, 0x5C, 0x63));
        assert_eq!(Color::parse("#fff").unwrap(), Color::WHITE);
        assert_eq!(Color::parse("FFFFFF").unwrap(), Color::WHITE);
        let c = Color::parse("#00000080").unwrap();
        assert!((c.a - 128.0 / 255.0).abs() < 1e-9);
    }

    #[test]
    fn test_parse_functional() {
        let c = Color::parse("rgba(10, 20, 30, 0.5)").unwrap();
        assert_eq!(c.rgb_bytes(), [10, 20, 30]);
        assert_eq!(c.a, 0.5);
        assert_eq!(Color::parse("rgb(100%, 0%, 0%)").unwrap().rgb_bytes(), [255, 0, 0]);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(Color::parse("#12345").is_err());
        assert!(Color::parse("rgb(1,2)").is_err());
        assert!(Color::parse("blue-ish").is_err());
    }

    #[test]
    fn test_serde_as_hex_string() {
        let json = serde_json::to_string(&Color::rgb(249, 92, 99)).unwrap();
        assert_eq!(json, "\"#F95C63\"");
        let c: Color = serde_json::from_str("\"rgb(1, 2, 3)\"").unwrap();
        assert_eq!(c.rgb_bytes(), [1, 2, 3]);
        assert!(serde_json::from_str::<Color>("\"nope\"").is_err());
    }

    #[test]
    fn test_to_hex() {
        assert_eq!(Color::rgb(249, 92, 99).to_hex(), "#F95C63");
        assert_eq!("#fff".parse::<Color>().unwrap().to_string(), "#FFFFFF");
    }
}
