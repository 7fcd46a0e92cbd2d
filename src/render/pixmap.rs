// PixelDeck
// copyright zipxing@hotmail.com 2022～2025

use super::RgbColor;
use crate::error::{DeckError, DeckResult};
use crate::util::Size;

/// Row-major RGBA pixel buffer, the content a texture is made from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixMap {
    size: Size,
    pixels: Vec<RgbColor>,
}

impl PixMap {
    pub fn new(size: Size, fill: RgbColor) -> PixMap {
        let n = (size.width.max(0) * size.height.max(0)) as usize;
        PixMap {
            size,
            pixels: vec![fill; n],
        }
    }

    pub fn from_rgba(width: u32, height: u32, bytes: &[u8]) -> DeckResult<PixMap> {
        if bytes.len() != (width * height * 4) as usize {
            return Err(DeckError::Image(format!(
                "{} bytes can't be a {}x{} rgba image",
                bytes.len(),
                width,
                height
            )));
        }
        let pixels = bytes
            .chunks_exact(4)
            .map(|p| RgbColor::with_alpha(p[0], p[1], p[2], p[3]))
            .collect();
        Ok(PixMap {
            size: Size::new(width as i32, height as i32),
            pixels,
        })
    }

    #[cfg(feature = "image")]
    pub fn load(path: &str) -> DeckResult<PixMap> {
        let img = image::open(path)
            .map_err(|e| DeckError::Image(format!("{}: {}", path, e)))?
            .to_rgba8();
        PixMap::from_rgba(img.width(), img.height(), img.as_raw())
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn get(&self, x: i32, y: i32) -> RgbColor {
        if x < 0 || y < 0 || x >= self.size.width || y >= self.size.height {
            return RgbColor::CLEAR;
        }
        self.pixels[(y * self.size.width + x) as usize]
    }

    pub fn set(&mut self, x: i32, y: i32, color: RgbColor) {
        if x < 0 || y < 0 || x >= self.size.width || y >= self.size.height {
            return;
        }
        self.pixels[(y * self.size.width + x) as usize] = color;
    }

    pub fn to_rgba(&self) -> Vec<u8> {
        self.pixels
            .iter()
            .flat_map(|c| [c.red, c.green, c.blue, c.alpha])
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixmap_access() {
        let mut pm = PixMap::new(Size::new(2, 2), RgbColor::BLACK);
        pm.set(1, 0, RgbColor::WHITE);
        pm.set(5, 5, RgbColor::WHITE);
        assert_eq!(pm.get(1, 0), RgbColor::WHITE);
        assert_eq!(pm.get(-1, 0), RgbColor::CLEAR);
        let bytes = pm.to_rgba();
        assert_eq!(&bytes[4..8], &[255, 255, 255, 255]);
        assert_eq!(PixMap::from_rgba(2, 2, &bytes).unwrap(), pm);
        assert!(PixMap::from_rgba(3, 2, &bytes).is_err());
    }
}
