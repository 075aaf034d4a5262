mod convert;
mod encoder;
mod loopback;

pub use convert::PixelFormat;
pub use encoder::{EncoderOutput, ImageContainer};
pub use loopback::V4L2Output;

use crate::error::SinkError;
use crate::types::Frame;
use image::imageops;
use std::borrow::Cow;

/// Trait for output destinations
pub trait OutputSink {
    /// Write a frame to the output
    fn submit(&mut self, frame: &Frame) -> Result<(), SinkError>;

    /// Get the expected output resolution
    fn resolution(&self) -> (u32, u32);
}

impl<T: OutputSink + ?Sized> OutputSink for Box<T> {
    fn submit(&mut self, frame: &Frame) -> Result<(), SinkError> {
        (**self).submit(frame)
    }

    fn resolution(&self) -> (u32, u32) {
        (**self).resolution()
    }
}

/// Resize `frame` to the negotiated size if it differs
fn fit_to(frame: &Frame, width: u32, height: u32) -> Cow<'_, Frame> {
    if frame.dimensions() == (width, height) {
        Cow::Borrowed(frame)
    } else {
        Cow::Owned(imageops::resize(
            frame,
            width,
            height,
            imageops::FilterType::Lanczos3,
        ))
    }
}
