//! Packed ARGB pixel buffer and color helpers

use reliefshade_core::{Error, Result};

/// A rectangular buffer of packed 32-bit ARGB pixels, row-major.
///
/// Layout per pixel: `a << 24 | r << 16 | g << 8 | b`. New buffers are
/// zeroed, i.e. fully transparent. Renderers write into disjoint row
/// ranges of the buffer and never resize it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: usize,
    height: usize,
    pixels: Vec<u32>,
}

impl PixelBuffer {
    /// Create a transparent buffer.
    pub fn new(width: usize, height: usize) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidDimensions {
                rows: height,
                cols: width,
            });
        }
        Ok(Self {
            width,
            height,
            pixels: vec![0; width * height],
        })
    }

    /// Buffer width in pixels
    pub fn width(&self) -> usize {
        self.width
    }

    /// Buffer height in pixels
    pub fn height(&self) -> usize {
        self.height
    }

    /// Raw row-major pixel data
    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    /// Mutable raw row-major pixel data
    pub fn pixels_mut(&mut self) -> &mut [u32] {
        &mut self.pixels
    }

    /// Pixel at (col, row)
    pub fn get(&self, col: usize, row: usize) -> u32 {
        self.pixels[row * self.width + col]
    }

    /// Set pixel at (col, row)
    pub fn set(&mut self, col: usize, row: usize, argb: u32) {
        self.pixels[row * self.width + col] = argb;
    }
}

/// Pack channel bytes into an ARGB pixel.
pub const fn argb(a: u8, r: u8, g: u8, b: u8) -> u32 {
    (a as u32) << 24 | (r as u32) << 16 | (g as u32) << 8 | b as u32
}

/// Alpha byte of an ARGB pixel.
pub const fn alpha(argb: u32) -> u8 {
    (argb >> 24) as u8
}

/// Red byte of an ARGB pixel.
pub const fn red(argb: u32) -> u8 {
    (argb >> 16) as u8
}

/// Green byte of an ARGB pixel.
pub const fn green(argb: u32) -> u8 {
    (argb >> 8) as u8
}

/// Blue byte of an ARGB pixel.
pub const fn blue(argb: u32) -> u8 {
    argb as u8
}

/// Mix two RGB colors and attach an alpha value.
///
/// `c1` and `c2` must carry a zero alpha byte. `weight` is the weight of
/// `c2` in 0..=255; `a` is the alpha of the result in 0..=255.
pub fn mix_colors(c1: u32, c2: u32, a: u32, weight: u32) -> u32 {
    let blend = |ch1: u32, ch2: u32| -> u32 {
        (weight as i32 * (ch2 as i32 - ch1 as i32) / 255 + ch1 as i32) as u32
    };

    let r = blend(c1 >> 16 & 0xFF, c2 >> 16 & 0xFF);
    let g = blend(c1 >> 8 & 0xFF, c2 >> 8 & 0xFF);
    let b = blend(c1 & 0xFF, c2 & 0xFF);

    a << 24 | r << 16 | g << 8 | b
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_buffer_is_transparent() {
        let buf = PixelBuffer::new(4, 3).unwrap();
        assert_eq!(buf.width(), 4);
        assert_eq!(buf.height(), 3);
        assert!(buf.pixels().iter().all(|&p| p == 0));
    }

    #[test]
    fn test_rejects_empty_buffer() {
        assert!(PixelBuffer::new(0, 3).is_err());
        assert!(PixelBuffer::new(3, 0).is_err());
    }

    #[test]
    fn test_argb_roundtrip() {
        let c = argb(0x12, 0x34, 0x56, 0x78);
        assert_eq!(c, 0x1234_5678);
        assert_eq!(alpha(c), 0x12);
        assert_eq!(red(c), 0x34);
        assert_eq!(green(c), 0x56);
        assert_eq!(blue(c), 0x78);
    }

    #[test]
    fn test_mix_colors_endpoints() {
        let black = 0x0000_0000;
        let white = 0x00FF_FFFF;
        assert_eq!(mix_colors(black, white, 255, 0), 0xFF00_0000);
        assert_eq!(mix_colors(black, white, 255, 255), 0xFFFF_FFFF);
    }

    #[test]
    fn test_mix_colors_midpoint() {
        let c = mix_colors(0x0000_0000, 0x00FF_FFFF, 128, 128);
        assert_eq!(alpha(c), 128);
        // 128 * 255 / 255 = 128
        assert_eq!(red(c), 128);
        assert_eq!(green(c), 128);
        assert_eq!(blue(c), 128);
    }
}
