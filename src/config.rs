use crate::error::ConfigError;
use crate::types::Frame;
use image::Rgb;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Largest structuring element the morphology backend accepts (radius 255).
pub const MAX_KERNEL_SIZE: u32 = 511;

/// Numeric parameters of the mask pipeline.
///
/// Sizes are odd aperture diameters in pixels. Built once at startup and
/// passed by reference into the mask builder and compositor.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Side of the square structuring element used by erosion and dilation
    pub kernel_size: u32,
    /// Luma delta a pixel must exceed to count as foreground
    pub threshold: u8,
    /// Median filter aperture applied to the binary mask
    pub median_size: u32,
    pub erode_iterations: u32,
    pub dilate_iterations: u32,
    /// Gaussian aperture used to soften mask edges
    pub edge_blur_size: u32,
    /// Gaussian aperture used to blur the reference for `BlurredSelf`
    pub background_blur_size: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            kernel_size: 5,
            threshold: 10,
            median_size: 21,
            erode_iterations: 2,
            dilate_iterations: 3,
            edge_blur_size: 21,
            background_blur_size: 51,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("kernel size", self.kernel_size),
            ("median size", self.median_size),
            ("edge blur size", self.edge_blur_size),
            ("background blur size", self.background_blur_size),
        ] {
            if value == 0 || value % 2 == 0 {
                return Err(ConfigError::EvenOrZeroSize { name, value });
            }
        }

        if self.kernel_size > MAX_KERNEL_SIZE {
            return Err(ConfigError::KernelTooLarge(self.kernel_size));
        }

        if self.dilate_iterations < self.erode_iterations {
            return Err(ConfigError::DilationBelowErosion {
                erode: self.erode_iterations,
                dilate: self.dilate_iterations,
            });
        }

        Ok(())
    }
}

/// Gaussian sigma for an odd aperture, using the usual `0.3 * ((k - 1) / 2 - 1) + 0.8` rule
pub fn sigma_for_aperture(size: u32) -> f32 {
    0.3 * ((size as f32 - 1.0) * 0.5 - 1.0) + 0.8
}

/// What replaces the background, as chosen on the command line
#[derive(Debug, Clone, PartialEq)]
pub enum BackgroundChoice {
    Color,
    Blur,
    Image(PathBuf),
}

impl FromStr for BackgroundChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" => Err("background must not be empty".to_string()),
            "color" | "chromakey" => Ok(Self::Color),
            "blur" => Ok(Self::Blur),
            path => Ok(Self::Image(PathBuf::from(path))),
        }
    }
}

/// Resolved background, ready for the session.
///
/// `BlurredSelf` carries no pixels: it is derived from the reference frame
/// once one exists.
#[derive(Debug, Clone)]
pub enum Background {
    FlatColor(Rgb<u8>),
    StaticImage(Frame),
    BlurredSelf,
}

impl Background {
    /// Resolve a command-line choice, loading and checking the image if one is named
    pub fn resolve(
        choice: &BackgroundChoice,
        color: Rgb<u8>,
        width: u32,
        height: u32,
    ) -> Result<Self, ConfigError> {
        match choice {
            BackgroundChoice::Color => Ok(Self::FlatColor(color)),
            BackgroundChoice::Blur => Ok(Self::BlurredSelf),
            BackgroundChoice::Image(path) => load_background_image(path, width, height)
                .map(Self::StaticImage),
        }
    }
}

fn load_background_image(path: &Path, width: u32, height: u32) -> Result<Frame, ConfigError> {
    tracing::info!("Loading background image from {}", path.display());

    let image = image::open(path)
        .map_err(|source| ConfigError::ImageRead {
            path: path.to_path_buf(),
            source,
        })?
        .to_rgb8();

    if image.dimensions() != (width, height) {
        return Err(ConfigError::ImageSize {
            path: path.to_path_buf(),
            expected: (width, height),
            actual: image.dimensions(),
        });
    }

    Ok(image)
}

/// Parse an `R,G,B` triplet
pub fn parse_color(s: &str) -> Result<Rgb<u8>, ConfigError> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    if parts.len() != 3 {
        return Err(ConfigError::Color(s.to_string()));
    }

    let mut channels = [0u8; 3];
    for (channel, part) in channels.iter_mut().zip(&parts) {
        *channel = part
            .parse()
            .map_err(|_| ConfigError::Color(s.to_string()))?;
    }

    Ok(Rgb(channels))
}
