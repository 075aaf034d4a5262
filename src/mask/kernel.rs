use image::GrayImage;
use imageproc::distance_transform::Norm;
use imageproc::morphology;

/// Square, uniformly weighted structuring element shared by erosion and dilation.
///
/// A K×K all-ones square is the set of pixels within Chebyshev distance
/// K / 2 of the anchor, so the morphology runs as an L∞ distance test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StructuringElement {
    size: u32,
}

impl StructuringElement {
    /// Build a `size`×`size` element. `size` must be odd and at most 511.
    pub fn square(size: u32) -> Self {
        debug_assert!(size % 2 == 1, "structuring element size must be odd");
        debug_assert!(size <= crate::config::MAX_KERNEL_SIZE);
        Self { size }
    }

    pub fn radius(&self) -> u8 {
        (self.size / 2) as u8
    }

    /// The element itself: a `size`×`size` grid of ones
    #[cfg(test)]
    pub fn weights(&self) -> GrayImage {
        GrayImage::from_pixel(self.size, self.size, image::Luma([1]))
    }

    /// Shrink non-zero regions by one application of the element
    pub fn erode(&self, mask: &GrayImage) -> GrayImage {
        morphology::erode(mask, Norm::LInf, self.radius())
    }

    /// Grow non-zero regions by one application of the element
    pub fn dilate(&self, mask: &GrayImage) -> GrayImage {
        morphology::dilate(mask, Norm::LInf, self.radius())
    }
}
