//! Blends a frame against its replacement using the foreground mask.
//!
//! `composite` takes the frame by value and blends in place, returning the
//! same buffer. Blending happens in the frame's RGB order; any channel
//! reordering for the output device is left to the sink.

mod replacement;

pub use replacement::ReplacementSource;
#[cfg(test)]
pub use replacement::blur_reference;

use crate::types::{Frame, Mask};
use rayon::prelude::*;

/// `out = frame * mask + replacement * (1 - mask)` per channel, rounded to nearest.
///
/// # Panics
/// If the mask, or an image replacement, differs in size from the frame.
pub fn composite(mut frame: Frame, mask: &Mask, replacement: &ReplacementSource) -> Frame {
    let _span = tracing::debug_span!("composite").entered();

    assert_eq!(
        frame.dimensions(),
        mask.dimensions(),
        "mask must match frame size"
    );

    let width = frame.width() as usize;
    if width == 0 || frame.height() == 0 {
        return frame;
    }

    let row_len = width * 3;
    let alpha_rows = mask.as_raw().par_chunks_exact(width);
    let data: &mut [u8] = &mut frame;
    let rows = data.par_chunks_exact_mut(row_len);

    match replacement {
        ReplacementSource::FlatColor(color) => {
            let color = color.0;
            rows.zip(alpha_rows).for_each(|(row, alphas)| {
                for (pixel, &alpha) in row.chunks_exact_mut(3).zip(alphas) {
                    for (value, &back) in pixel.iter_mut().zip(&color) {
                        *value = blend(*value, back, alpha);
                    }
                }
            });
        }
        ReplacementSource::StaticImage(image) | ReplacementSource::BlurredSelf(image) => {
            assert_eq!(
                image.dimensions(),
                mask.dimensions(),
                "replacement must match frame size"
            );

            let back_rows = image.as_raw().par_chunks_exact(row_len);
            rows.zip(alpha_rows)
                .zip(back_rows)
                .for_each(|((row, alphas), back_row)| {
                    for ((pixel, &alpha), back) in row
                        .chunks_exact_mut(3)
                        .zip(alphas)
                        .zip(back_row.chunks_exact(3))
                    {
                        for (value, &back) in pixel.iter_mut().zip(back) {
                            *value = blend(*value, back, alpha);
                        }
                    }
                });
        }
    }

    frame
}

#[inline]
fn blend(front: u8, back: u8, alpha: f32) -> u8 {
    (front as f32 * alpha + back as f32 * (1.0 - alpha))
        .round()
        .clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb, RgbImage};

    fn gradient(width: u32, height: u32) -> Frame {
        RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x * 20) as u8, (y * 30) as u8, ((x + y) * 7) as u8])
        })
    }

    fn uniform_mask(width: u32, height: u32, value: f32) -> Mask {
        Mask::from_pixel(width, height, Luma([value]))
    }

    fn sources(width: u32, height: u32) -> Vec<ReplacementSource> {
        vec![
            ReplacementSource::FlatColor(Rgb([0, 255, 0])),
            ReplacementSource::StaticImage(RgbImage::from_pixel(width, height, Rgb([10, 20, 30]))),
            ReplacementSource::BlurredSelf(blur_reference(&gradient(width, height), 5)),
        ]
    }

    #[test]
    fn full_mask_keeps_frame() {
        let frame = gradient(7, 5);
        for source in sources(7, 5) {
            let out = composite(frame.clone(), &uniform_mask(7, 5, 1.0), &source);
            assert_eq!(out, frame);
        }
    }

    #[test]
    fn empty_mask_shows_replacement() {
        let frame = gradient(7, 5);
        for source in sources(7, 5) {
            let out = composite(frame.clone(), &uniform_mask(7, 5, 0.0), &source);
            let expected = match &source {
                ReplacementSource::FlatColor(color) => RgbImage::from_pixel(7, 5, *color),
                ReplacementSource::StaticImage(image) | ReplacementSource::BlurredSelf(image) => {
                    image.clone()
                }
            };
            assert_eq!(out, expected);
        }
    }

    #[test]
    fn output_keeps_frame_size() {
        let frame = gradient(9, 4);
        for source in sources(9, 4) {
            let out = composite(frame.clone(), &uniform_mask(9, 4, 0.3), &source);
            assert_eq!(out.dimensions(), (9, 4));
        }
    }

    #[test]
    fn half_mask_averages_every_channel() {
        let frame = RgbImage::from_pixel(2, 2, Rgb([100, 0, 200]));
        let out = composite(
            frame,
            &uniform_mask(2, 2, 0.5),
            &ReplacementSource::FlatColor(Rgb([0, 100, 50])),
        );
        assert!(out.pixels().all(|p| p.0 == [50, 50, 125]));
    }

    #[test]
    fn channels_are_not_reordered() {
        let frame = RgbImage::from_pixel(3, 3, Rgb([255, 0, 0]));
        let mut mask = uniform_mask(3, 3, 1.0);
        mask.put_pixel(1, 1, Luma([0.0]));

        let out = composite(frame, &mask, &ReplacementSource::FlatColor(Rgb([0, 0, 255])));
        assert_eq!(out.get_pixel(0, 0).0, [255, 0, 0]);
        assert_eq!(out.get_pixel(1, 1).0, [0, 0, 255]);
    }

    #[test]
    #[should_panic(expected = "replacement must match")]
    fn mismatched_static_image_panics() {
        composite(
            gradient(4, 4),
            &uniform_mask(4, 4, 0.5),
            &ReplacementSource::StaticImage(RgbImage::new(5, 4)),
        );
    }

    #[test]
    #[should_panic(expected = "mask must match")]
    fn mismatched_mask_panics() {
        composite(
            gradient(4, 4),
            &uniform_mask(3, 4, 0.5),
            &ReplacementSource::FlatColor(Rgb([0, 0, 0])),
        );
    }
}
