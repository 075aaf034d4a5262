use image::{ImageBuffer, Luma, RgbImage};

/// A captured video frame in RGB channel order.
///
/// Channel order is converted to whatever the output needs only inside the
/// output sinks.
pub type Frame = RgbImage;

/// Foreground opacity: 1.0 keeps the frame pixel, 0.0 replaces it.
/// Dimensions match the frame it was built from.
pub type Mask = ImageBuffer<Luma<f32>, Vec<f32>>;

/// Render a mask as a grayscale frame for visualization
pub fn mask_to_frame(mask: &Mask) -> Frame {
    let (width, height) = mask.dimensions();
    RgbImage::from_fn(width, height, |x, y| {
        let value = (mask.get_pixel(x, y)[0] * 255.0).round().clamp(0.0, 255.0) as u8;
        image::Rgb([value, value, value])
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_renders_as_gray_levels() {
        let mut mask = Mask::new(2, 1);
        mask.put_pixel(0, 0, Luma([1.0]));
        mask.put_pixel(1, 0, Luma([0.5]));

        let frame = mask_to_frame(&mask);
        assert_eq!(frame.get_pixel(0, 0).0, [255, 255, 255]);
        assert_eq!(frame.get_pixel(1, 0).0, [128, 128, 128]);
    }
}
