use std::path::PathBuf;
use thiserror::Error;

/// Failures of the capture device. Always fatal for a session.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("failed to open camera {device}: {reason}")]
    Open { device: String, reason: String },

    #[error("capture source used before configure")]
    NotConfigured,

    #[error("failed to read frame: {0}")]
    Read(String),

    #[error("failed to decode frame: {0}")]
    Decode(String),

    #[error("frame is {actual:?}, expected {expected:?}")]
    FrameSize {
        expected: (u32, u32),
        actual: (u32, u32),
    },
}

/// Failures writing to the output destination.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("failed to open output {target}: {reason}")]
    Open { target: String, reason: String },

    #[error("output format negotiation failed: {0}")]
    Format(String),

    #[error("failed to encode frame: {0}")]
    Encode(#[from] image::ImageError),

    #[error("failed to write frame: {0}")]
    Write(#[from] std::io::Error),

    #[error("output is closed")]
    Closed,
}

/// Invalid startup configuration. Reported before streaming begins.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} must be a positive odd number, got {value}")]
    EvenOrZeroSize { name: &'static str, value: u32 },

    #[error("structuring element size {0} exceeds 511")]
    KernelTooLarge(u32),

    #[error("dilate count {dilate} is smaller than erode count {erode}")]
    DilationBelowErosion { erode: u32, dilate: u32 },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("invalid color {0:?}, expected R,G,B")]
    Color(String),

    #[error("failed to read background image {path}: {source}")]
    ImageRead {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("background image {path} is {actual:?}, expected {expected:?}")]
    ImageSize {
        path: PathBuf,
        expected: (u32, u32),
        actual: (u32, u32),
    },
}

/// Anything that stops a running session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error(transparent)]
    Sink(#[from] SinkError),
}
