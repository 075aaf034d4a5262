use super::CaptureSource;
use crate::error::CaptureError;
use crate::types::Frame;
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{
    CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType, Resolution,
};
use nokhwa::Camera;

/// Webcam opened through nokhwa. The camera is opened by `configure`.
pub struct WebcamCapture {
    index: CameraIndex,
    camera: Option<Camera>,
    width: u32,
    height: u32,
}

impl WebcamCapture {
    /// `device` is a camera index (`"0"`) or a device path (`"/dev/video2"`)
    pub fn new(device: &str) -> Self {
        Self {
            index: camera_index(device),
            camera: None,
            width: 0,
            height: 0,
        }
    }
}

fn camera_index(device: &str) -> CameraIndex {
    match device.parse::<u32>() {
        Ok(index) => CameraIndex::Index(index),
        Err(_) => CameraIndex::String(device.to_string()),
    }
}

impl CaptureSource for WebcamCapture {
    fn configure(&mut self, width: u32, height: u32, target_fps: u32) -> Result<(), CaptureError> {
        tracing::info!(
            "Initializing webcam {} at {}x{} @ {} fps",
            self.index,
            width,
            height,
            target_fps
        );

        let format = CameraFormat::new(Resolution::new(width, height), FrameFormat::MJPEG, target_fps);
        let requested = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(format));

        let open_error = |err: nokhwa::NokhwaError| CaptureError::Open {
            device: self.index.to_string(),
            reason: err.to_string(),
        };

        let mut camera = Camera::new(self.index.clone(), requested).map_err(open_error)?;
        camera.open_stream().map_err(open_error)?;

        let resolution = camera.resolution();
        self.width = resolution.width();
        self.height = resolution.height();

        tracing::info!(
            "Webcam streaming at {}x{} @ {} fps",
            self.width,
            self.height,
            camera.frame_rate()
        );

        self.camera = Some(camera);
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Frame, CaptureError> {
        let camera = self.camera.as_mut().ok_or(CaptureError::NotConfigured)?;

        let buffer = camera
            .frame()
            .map_err(|err| CaptureError::Read(err.to_string()))?;

        let decoded = buffer
            .decode_image::<RgbFormat>()
            .map_err(|err| CaptureError::Decode(err.to_string()))?;

        let (width, height) = (decoded.width(), decoded.height());
        Frame::from_raw(width, height, decoded.into_raw())
            .ok_or_else(|| CaptureError::Decode("decoded buffer is too small".to_string()))
    }

    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}
