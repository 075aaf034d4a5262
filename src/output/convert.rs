use crate::types::Frame;
use clap::ValueEnum;
use v4l::FourCC;

/// Raw pixel layouts a loopback device can be fed
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PixelFormat {
    /// Packed YUV 4:2:2, `Y0 U Y1 V`
    Yuyv,
    /// Packed 8-bit RGB
    Rgb24,
    /// Packed 8-bit BGR
    Bgr24,
}

impl PixelFormat {
    pub fn fourcc(self) -> FourCC {
        match self {
            Self::Yuyv => FourCC::new(b"YUYV"),
            Self::Rgb24 => FourCC::new(b"RGB3"),
            Self::Bgr24 => FourCC::new(b"BGR3"),
        }
    }

    /// Serialize an RGB frame in this layout
    pub fn encode(self, frame: &Frame) -> Vec<u8> {
        match self {
            Self::Yuyv => rgb_to_yuyv(frame),
            Self::Rgb24 => frame.as_raw().clone(),
            Self::Bgr24 => rgb_to_bgr(frame),
        }
    }
}

/// Convert RGB frame to YUV422 (YUYV) format
fn rgb_to_yuyv(frame: &Frame) -> Vec<u8> {
    let (width, height) = frame.dimensions();
    let mut yuyv = Vec::with_capacity((width.div_ceil(2) * 4 * height) as usize);

    for y in 0..height {
        for x in (0..width).step_by(2) {
            let pixel1 = frame.get_pixel(x, y);
            let pixel2 = if x + 1 < width {
                frame.get_pixel(x + 1, y)
            } else {
                pixel1
            };

            let (y1, u1, v1) = rgb_to_yuv(pixel1[0], pixel1[1], pixel1[2]);
            let (y2, u2, v2) = rgb_to_yuv(pixel2[0], pixel2[1], pixel2[2]);

            // Chroma is shared by the pair
            let u = ((u1 as u16 + u2 as u16) / 2) as u8;
            let v = ((v1 as u16 + v2 as u16) / 2) as u8;

            yuyv.extend_from_slice(&[y1, u, y2, v]);
        }
    }

    yuyv
}

fn rgb_to_yuv(r: u8, g: u8, b: u8) -> (u8, u8, u8) {
    let r = r as f32;
    let g = g as f32;
    let b = b as f32;

    let y = (0.299 * r + 0.587 * g + 0.114 * b).round().clamp(0.0, 255.0) as u8;
    let u = ((-0.147 * r - 0.289 * g + 0.436 * b) + 128.0).round().clamp(0.0, 255.0) as u8;
    let v = ((0.615 * r - 0.515 * g - 0.100 * b) + 128.0).round().clamp(0.0, 255.0) as u8;

    (y, u, v)
}

fn rgb_to_bgr(frame: &Frame) -> Vec<u8> {
    let mut bgr = frame.as_raw().clone();
    for pixel in bgr.chunks_exact_mut(3) {
        pixel.swap(0, 2);
    }
    bgr
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn bgr_swaps_outer_channels_only() {
        let frame = RgbImage::from_pixel(2, 1, Rgb([1, 2, 3]));
        assert_eq!(PixelFormat::Bgr24.encode(&frame), vec![3, 2, 1, 3, 2, 1]);
        assert_eq!(PixelFormat::Rgb24.encode(&frame), vec![1, 2, 3, 1, 2, 3]);
    }

    #[test]
    fn yuyv_packs_two_pixels_in_four_bytes() {
        let frame = RgbImage::from_pixel(4, 2, Rgb([0, 0, 0]));
        let bytes = PixelFormat::Yuyv.encode(&frame);
        assert_eq!(bytes.len(), 4 * 2 * 2);
        assert_eq!(&bytes[..4], &[0, 128, 0, 128]);
    }

    #[test]
    fn yuyv_pads_odd_width_with_last_pixel() {
        let frame = RgbImage::from_pixel(3, 1, Rgb([255, 255, 255]));
        let bytes = PixelFormat::Yuyv.encode(&frame);
        assert_eq!(bytes.len(), 8);
        assert_eq!(bytes[4], 255);
        assert_eq!(bytes[6], 255);
    }

    #[test]
    fn gray_has_neutral_chroma() {
        let (y, u, v) = rgb_to_yuv(128, 128, 128);
        assert_eq!(y, 128);
        assert_eq!(u, 128);
        assert_eq!(v, 128);
    }

    #[test]
    fn fourcc_codes() {
        assert_eq!(PixelFormat::Yuyv.fourcc(), FourCC::new(b"YUYV"));
        assert_eq!(PixelFormat::Bgr24.fourcc(), FourCC::new(b"BGR3"));
    }
}
