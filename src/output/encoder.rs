use super::{fit_to, OutputSink};
use crate::error::SinkError;
use crate::types::Frame;
use clap::ValueEnum;
use image::codecs::bmp::BmpEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ExtendedColorType, ImageEncoder};
use std::io::{ErrorKind, Write};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::time::{Duration, Instant};

/// How long the encoder gets to flush after stdin closes before it is killed
const EXIT_GRACE: Duration = Duration::from_secs(2);

/// Image container each frame is wrapped in on the encoder pipe
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ImageContainer {
    Png,
    Bmp,
}

impl ImageContainer {
    fn codec_name(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Bmp => "bmp",
        }
    }
}

/// Output through an external encoder process fed one image per frame on stdin
pub struct EncoderOutput {
    child: Child,
    stdin: Option<ChildStdin>,
    width: u32,
    height: u32,
    container: ImageContainer,
}

impl EncoderOutput {
    pub fn spawn(
        program: &str,
        args: &[String],
        width: u32,
        height: u32,
        container: ImageContainer,
    ) -> Result<Self, SinkError> {
        tracing::info!("Starting encoder: {} {}", program, args.join(" "));

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .spawn()
            .map_err(|err| SinkError::Open {
                target: program.to_string(),
                reason: err.to_string(),
            })?;

        let stdin = child.stdin.take();

        Ok(Self {
            child,
            stdin,
            width,
            height,
            container,
        })
    }

    /// ffmpeg arguments that decode the image pipe and write to a v4l2 device
    pub fn ffmpeg_args(target: &str, fps: u32, container: ImageContainer) -> Vec<String> {
        [
            "-loglevel",
            "error",
            "-f",
            "image2pipe",
            "-framerate",
            &fps.to_string(),
            "-c:v",
            container.codec_name(),
            "-i",
            "-",
            "-pix_fmt",
            "yuv420p",
            "-f",
            "v4l2",
            target,
        ]
        .iter()
        .map(|arg| arg.to_string())
        .collect()
    }

    fn encode(&self, frame: &Frame) -> Result<Vec<u8>, SinkError> {
        let (width, height) = frame.dimensions();
        let mut bytes = Vec::new();

        match self.container {
            ImageContainer::Png => PngEncoder::new_with_quality(
                &mut bytes,
                CompressionType::Fast,
                FilterType::NoFilter,
            )
            .write_image(frame.as_raw(), width, height, ExtendedColorType::Rgb8)?,
            ImageContainer::Bmp => BmpEncoder::new(&mut bytes).write_image(
                frame.as_raw(),
                width,
                height,
                ExtendedColorType::Rgb8,
            )?,
        }

        Ok(bytes)
    }
}

impl OutputSink for EncoderOutput {
    fn submit(&mut self, frame: &Frame) -> Result<(), SinkError> {
        let frame = fit_to(frame, self.width, self.height);
        let bytes = self.encode(&frame)?;

        let stdin = self.stdin.as_mut().ok_or(SinkError::Closed)?;
        match stdin.write_all(&bytes) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::BrokenPipe => {
                self.stdin = None;
                Err(SinkError::Closed)
            }
            Err(err) => Err(err.into()),
        }
    }

    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

impl Drop for EncoderOutput {
    fn drop(&mut self) {
        // Closing stdin lets the encoder flush and exit
        drop(self.stdin.take());

        let deadline = Instant::now() + EXIT_GRACE;
        loop {
            match self.child.try_wait() {
                Ok(Some(status)) if !status.success() => {
                    tracing::warn!("Encoder exited with {}", status);
                    return;
                }
                Ok(Some(_)) => {
                    tracing::debug!("Encoder exited cleanly");
                    return;
                }
                Ok(None) if Instant::now() < deadline => {
                    std::thread::sleep(Duration::from_millis(20));
                }
                Ok(None) => break,
                Err(err) => {
                    tracing::warn!("Failed to wait for encoder: {}", err);
                    break;
                }
            }
        }

        tracing::warn!("Encoder still running after {:?}, killing it", EXIT_GRACE);
        if let Err(err) = self.child.kill() {
            tracing::warn!("Failed to kill encoder: {}", err);
        }
        if let Err(err) = self.child.wait() {
            tracing::warn!("Failed to reap encoder: {}", err);
        }
    }
}
