mod v4l_capture;

pub use v4l_capture::WebcamCapture;

use crate::error::CaptureError;
use crate::types::Frame;

/// Trait for camera capture sources
pub trait CaptureSource {
    /// Request a resolution and frame rate and start streaming
    fn configure(&mut self, width: u32, height: u32, target_fps: u32) -> Result<(), CaptureError>;

    /// Block until the next frame is available
    fn next_frame(&mut self) -> Result<Frame, CaptureError>;

    /// Resolution actually delivered by the source
    fn resolution(&self) -> (u32, u32);
}
