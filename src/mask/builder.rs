use super::kernel::StructuringElement;
use crate::config::{sigma_for_aperture, PipelineConfig};
use crate::types::{Frame, Mask};
use image::{GrayImage, Luma, RgbImage};
use imageproc::filter::{gaussian_blur_f32, median_filter};

/// Turns a frame and the reference frame into a soft foreground mask.
///
/// The pipeline is fixed: absolute difference, luma, global threshold,
/// median denoise, erode, dilate, Gaussian edge softening, normalize.
#[derive(Debug, Clone)]
pub struct MaskBuilder {
    element: StructuringElement,
    threshold: u8,
    median_radius: u32,
    erode_iterations: u32,
    dilate_iterations: u32,
    edge_sigma: f32,
}

impl MaskBuilder {
    /// `config` is expected to have passed [`PipelineConfig::validate`]
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            element: StructuringElement::square(config.kernel_size),
            threshold: config.threshold,
            median_radius: config.median_size / 2,
            erode_iterations: config.erode_iterations,
            dilate_iterations: config.dilate_iterations,
            edge_sigma: sigma_for_aperture(config.edge_blur_size),
        }
    }

    /// Build the mask for `frame` against `reference`.
    ///
    /// # Panics
    /// If the two frames differ in size.
    pub fn build_mask(&self, frame: &Frame, reference: &Frame) -> Mask {
        let _span = tracing::debug_span!("build_mask").entered();

        let binary = self.threshold_mask(frame, reference);
        let cleaned = self.clean(&binary);
        let softened = gaussian_blur_f32(&cleaned, self.edge_sigma);

        normalize(&softened)
    }

    /// Steps up to the hard cutoff: 255 where the luma of the difference
    /// exceeds the threshold, 0 elsewhere
    pub fn threshold_mask(&self, frame: &Frame, reference: &Frame) -> GrayImage {
        assert_eq!(
            frame.dimensions(),
            reference.dimensions(),
            "frame and reference must have the same size"
        );

        binarize(&luma(&difference(frame, reference)), self.threshold)
    }

    /// Median denoise followed by the erode/dilate passes
    pub fn clean(&self, binary: &GrayImage) -> GrayImage {
        let _span = tracing::debug_span!("morphology").entered();

        let mut mask = median_filter(binary, self.median_radius, self.median_radius);
        for _ in 0..self.erode_iterations {
            mask = self.element.erode(&mask);
        }
        for _ in 0..self.dilate_iterations {
            mask = self.element.dilate(&mask);
        }
        mask
    }
}

fn difference(frame: &Frame, reference: &Frame) -> RgbImage {
    let mut delta = frame.clone();
    for (out, reference) in delta.pixels_mut().zip(reference.pixels()) {
        for (value, reference) in out.0.iter_mut().zip(reference.0) {
            *value = value.abs_diff(reference);
        }
    }
    delta
}

/// BT.601 weights in integer form, rounded
fn luma(image: &RgbImage) -> GrayImage {
    let (width, height) = image.dimensions();
    GrayImage::from_fn(width, height, |x, y| {
        let [r, g, b] = image.get_pixel(x, y).0;
        let weighted = r as u32 * 299 + g as u32 * 587 + b as u32 * 114;
        Luma([((weighted + 500) / 1000) as u8])
    })
}

fn binarize(gray: &GrayImage, threshold: u8) -> GrayImage {
    let mut binary = gray.clone();
    for pixel in binary.pixels_mut() {
        pixel[0] = if pixel[0] > threshold { 255 } else { 0 };
    }
    binary
}

fn normalize(gray: &GrayImage) -> Mask {
    let (width, height) = gray.dimensions();
    Mask::from_fn(width, height, |x, y| {
        Luma([gray.get_pixel(x, y)[0] as f32 / 255.0])
    })
}
