use super::{fit_to, OutputSink, PixelFormat};
use crate::error::SinkError;
use crate::types::Frame;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use v4l::video::Output;
use v4l::{Device, Format};

/// Writes frames as raw bytes in a fixed pixel format and size
pub struct RawFrameWriter<W: Write> {
    writer: W,
    width: u32,
    height: u32,
    format: PixelFormat,
}

impl<W: Write> RawFrameWriter<W> {
    pub fn new(writer: W, width: u32, height: u32, format: PixelFormat) -> Self {
        Self {
            writer,
            width,
            height,
            format,
        }
    }

    pub fn write_frame(&mut self, frame: &Frame) -> Result<(), SinkError> {
        let frame = fit_to(frame, self.width, self.height);
        let bytes = self.format.encode(&frame);
        self.writer.write_all(&bytes)?;
        Ok(())
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// Output to a v4l2loopback device
pub struct V4L2Output {
    // Held open so the negotiated format stays in effect
    _device: Device,
    writer: RawFrameWriter<File>,
}

impl V4L2Output {
    pub fn new<P: AsRef<Path>>(
        device_path: P,
        width: u32,
        height: u32,
        format: PixelFormat,
    ) -> Result<Self, SinkError> {
        let path = device_path.as_ref();
        tracing::info!(
            "Opening v4l2loopback device at {} ({}x{}, {:?})",
            path.display(),
            width,
            height,
            format
        );

        let open_error = |err: std::io::Error| SinkError::Open {
            target: path.display().to_string(),
            reason: err.to_string(),
        };

        let device = Device::with_path(path).map_err(open_error)?;

        let requested = Format::new(width, height, format.fourcc());
        let negotiated = Output::set_format(&device, &requested)
            .map_err(|err| SinkError::Format(err.to_string()))?;
        if negotiated.width != width
            || negotiated.height != height
            || negotiated.fourcc != requested.fourcc
        {
            return Err(SinkError::Format(format!(
                "device accepted {}x{} {} instead of {}x{} {}",
                negotiated.width,
                negotiated.height,
                negotiated.fourcc,
                width,
                height,
                requested.fourcc
            )));
        }

        let file = File::options().write(true).open(path).map_err(open_error)?;

        tracing::info!("v4l2loopback device opened successfully");

        Ok(Self {
            _device: device,
            writer: RawFrameWriter::new(file, width, height, format),
        })
    }
}

impl OutputSink for V4L2Output {
    fn submit(&mut self, frame: &Frame) -> Result<(), SinkError> {
        self.writer.write_frame(frame)
    }

    fn resolution(&self) -> (u32, u32) {
        (self.writer.width, self.writer.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn writes_frames_back_to_back() {
        let mut writer = RawFrameWriter::new(Vec::new(), 2, 2, PixelFormat::Bgr24);
        writer
            .write_frame(&RgbImage::from_pixel(2, 2, Rgb([1, 2, 3])))
            .unwrap();
        writer
            .write_frame(&RgbImage::from_pixel(2, 2, Rgb([4, 5, 6])))
            .unwrap();

        let bytes = writer.into_inner();
        assert_eq!(bytes.len(), 2 * 2 * 3 * 2);
        assert_eq!(&bytes[..3], &[3, 2, 1]);
        assert_eq!(&bytes[12..15], &[6, 5, 4]);
    }

    #[test]
    fn resizes_to_negotiated_size() {
        let mut writer = RawFrameWriter::new(Vec::new(), 4, 2, PixelFormat::Rgb24);
        writer
            .write_frame(&RgbImage::from_pixel(8, 4, Rgb([50, 50, 50])))
            .unwrap();
        assert_eq!(writer.into_inner().len(), 4 * 2 * 3);
    }

    #[test]
    fn missing_device_fails_to_open() {
        let result = V4L2Output::new("/nonexistent/video99", 640, 480, PixelFormat::Yuyv);
        assert!(matches!(result, Err(SinkError::Open { .. })));
    }
}
