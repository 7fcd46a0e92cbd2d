// PixelDeck
// copyright zipxing@hotmail.com 2022～2025

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RgbColor {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    pub alpha: u8,
}

impl RgbColor {
    pub const BLACK: RgbColor = RgbColor::new(0, 0, 0);
    pub const WHITE: RgbColor = RgbColor::new(255, 255, 255);
    pub const CLEAR: RgbColor = RgbColor::with_alpha(0, 0, 0, 0);

    pub const fn new(red: u8, green: u8, blue: u8) -> RgbColor {
        RgbColor {
            red,
            green,
            blue,
            alpha: 255,
        }
    }

    pub const fn with_alpha(red: u8, green: u8, blue: u8, alpha: u8) -> RgbColor {
        RgbColor {
            red,
            green,
            blue,
            alpha,
        }
    }

    /// Channel-wise product, used for tinting.
    pub fn modulate(self, tint: RgbColor) -> RgbColor {
        let m = |a: u8, b: u8| ((a as u16 * b as u16 + 127) / 255) as u8;
        RgbColor::with_alpha(
            m(self.red, tint.red),
            m(self.green, tint.green),
            m(self.blue, tint.blue),
            m(self.alpha, tint.alpha),
        )
    }

    /// `self` composited over `dst`.
    pub fn over(self, dst: RgbColor) -> RgbColor {
        let a = self.alpha as u32;
        let mix = |s: u8, d: u8| ((s as u32 * a + d as u32 * (255 - a) + 127) / 255) as u8;
        RgbColor::with_alpha(
            mix(self.red, dst.red),
            mix(self.green, dst.green),
            mix(self.blue, dst.blue),
            (a + dst.alpha as u32 * (255 - a) / 255) as u8,
        )
    }

    pub fn to_f32(self) -> [f32; 4] {
        [
            self.red as f32 / 255.0,
            self.green as f32 / 255.0,
            self.blue as f32 / 255.0,
            self.alpha as f32 / 255.0,
        ]
    }

    pub fn hex(self) -> HexColor {
        HexColor(self)
    }
}

/// `rrggbb`, followed by `aa` unless the color is opaque.
pub struct HexColor(RgbColor);

impl fmt::Display for HexColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = self.0;
        write!(f, "{:02x}{:02x}{:02x}", c.red, c.green, c.blue)?;
        if c.alpha != 255 {
            write!(f, "{:02x}", c.alpha)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex() {
        assert_eq!(RgbColor::new(255, 0, 16).hex().to_string(), "ff0010");
        assert_eq!(
            RgbColor::with_alpha(1, 2, 3, 128).hex().to_string(),
            "01020380"
        );
    }

    #[test]
    fn test_blend() {
        let red = RgbColor::new(255, 0, 0);
        assert_eq!(red.over(RgbColor::BLACK), red);
        assert_eq!(RgbColor::CLEAR.over(red), red);
        let half = RgbColor::with_alpha(255, 255, 255, 128).over(RgbColor::BLACK);
        assert_eq!(half.red, 128);
        assert_eq!(half.alpha, 255);
        assert_eq!(RgbColor::WHITE.modulate(red), red);
    }
}
