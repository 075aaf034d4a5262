use crate::config::{sigma_for_aperture, Background, PipelineConfig};
use crate::types::Frame;
use image::{imageops, Rgb};
use imageproc::filter::gaussian_blur_f32;

/// Pixels that show through wherever the mask is below 1
#[derive(Debug, Clone, PartialEq)]
pub enum ReplacementSource {
    /// One color broadcast to every pixel
    FlatColor(Rgb<u8>),
    /// A picture the same size as the frame
    StaticImage(Frame),
    /// The reference frame, Gaussian-blurred
    BlurredSelf(Frame),
}

impl ReplacementSource {
    /// Derive the replacement for a freshly captured reference.
    ///
    /// A static image that does not match the reference size is resized to
    /// it, since the camera may negotiate a resolution other than the one
    /// requested.
    pub fn from_background(
        background: &Background,
        reference: &Frame,
        config: &PipelineConfig,
    ) -> Self {
        match background {
            Background::FlatColor(color) => Self::FlatColor(*color),
            Background::StaticImage(image) => {
                let (width, height) = reference.dimensions();
                if image.dimensions() != (width, height) {
                    tracing::warn!(
                        "Resizing background image from {:?} to {}x{}",
                        image.dimensions(),
                        width,
                        height
                    );
                    Self::StaticImage(imageops::resize(
                        image,
                        width,
                        height,
                        imageops::FilterType::Lanczos3,
                    ))
                } else {
                    Self::StaticImage(image.clone())
                }
            }
            Background::BlurredSelf => {
                Self::BlurredSelf(blur_reference(reference, config.background_blur_size))
            }
        }
    }

    /// Bring the replacement in line with a new reference.
    /// Only `BlurredSelf` depends on the reference.
    pub fn refresh(&mut self, reference: &Frame, config: &PipelineConfig) {
        if let Self::BlurredSelf(blurred) = self {
            *blurred = blur_reference(reference, config.background_blur_size);
        }
    }
}

/// Gaussian blur with an odd aperture of `size` pixels
pub fn blur_reference(reference: &Frame, size: u32) -> Frame {
    let _span = tracing::debug_span!("blur_reference").entered();
    gaussian_blur_f32(reference, sigma_for_aperture(size))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    fn checkerboard(width: u32, height: u32) -> Frame {
        RgbImage::from_fn(width, height, |x, y| {
            if (x + y) % 2 == 0 {
                Rgb([255, 255, 255])
            } else {
                Rgb([0, 0, 0])
            }
        })
    }

    #[test]
    fn flat_color_ignores_reference() {
        let source = ReplacementSource::from_background(
            &Background::FlatColor(Rgb([0, 255, 0])),
            &checkerboard(4, 4),
            &PipelineConfig::default(),
        );
        assert_eq!(source, ReplacementSource::FlatColor(Rgb([0, 255, 0])));
    }

    #[test]
    fn blurred_self_smooths_reference() {
        let reference = checkerboard(16, 16);
        let source = ReplacementSource::from_background(
            &Background::BlurredSelf,
            &reference,
            &PipelineConfig::default(),
        );

        let ReplacementSource::BlurredSelf(blurred) = source else {
            panic!("expected blurred reference");
        };
        assert_eq!(blurred.dimensions(), (16, 16));
        let center = blurred.get_pixel(8, 8)[0];
        assert!((100..=155).contains(&center), "center {center}");
    }

    #[test]
    fn refresh_follows_new_reference() {
        let config = PipelineConfig::default();
        let mut source = ReplacementSource::from_background(
            &Background::BlurredSelf,
            &RgbImage::from_pixel(8, 8, Rgb([0, 0, 0])),
            &config,
        );

        let bright = RgbImage::from_pixel(8, 8, Rgb([200, 200, 200]));
        source.refresh(&bright, &config);

        assert_eq!(source, ReplacementSource::BlurredSelf(blur_reference(&bright, 51)));
    }

    #[test]
    fn refresh_leaves_static_sources_alone() {
        let config = PipelineConfig::default();
        let image = checkerboard(8, 8);
        let mut source = ReplacementSource::StaticImage(image.clone());

        source.refresh(&RgbImage::new(8, 8), &config);
        assert_eq!(source, ReplacementSource::StaticImage(image));
    }

    #[test]
    fn static_image_is_fitted_to_reference() {
        let source = ReplacementSource::from_background(
            &Background::StaticImage(RgbImage::from_pixel(8, 8, Rgb([9, 9, 9]))),
            &RgbImage::new(4, 6),
            &PipelineConfig::default(),
        );

        let ReplacementSource::StaticImage(image) = source else {
            panic!("expected static image");
        };
        assert_eq!(image.dimensions(), (4, 6));
    }
}
