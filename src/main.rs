mod capture;
mod compositor;
mod config;
mod control;
mod error;
mod mask;
mod output;
mod session;
mod types;

use anyhow::{Context, Result};
use capture::{CaptureSource, WebcamCapture};
use clap::{Parser, ValueEnum};
use config::{parse_color, Background, BackgroundChoice, PipelineConfig};
use control::StdinControl;
use error::ConfigError;
use image::Rgb;
use output::{EncoderOutput, ImageContainer, OutputSink, PixelFormat, V4L2Output};
use session::{Session, SessionOptions};

/// Where composited frames go
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SinkKind {
    /// Write raw frames to a v4l2loopback device
    V4l2,
    /// Pipe encoded images into an external encoder process
    Encoder,
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input camera index or device path
    #[arg(short, long, default_value = "0")]
    input: String,

    /// Output v4l2loopback device, or the encoder's output target
    #[arg(short, long, default_value = "/dev/video10")]
    output: String,

    /// Output realization
    #[arg(long, value_enum, default_value_t = SinkKind::V4l2)]
    sink: SinkKind,

    /// Pixel format negotiated with the v4l2loopback device
    #[arg(long, value_enum, default_value_t = PixelFormat::Yuyv)]
    pixel_format: PixelFormat,

    /// Encoder program for the encoder sink
    #[arg(long, default_value = "ffmpeg")]
    encoder: String,

    /// Image container used on the encoder pipe
    #[arg(long, value_enum, default_value_t = ImageContainer::Png)]
    container: ImageContainer,

    /// Capture and output width
    #[arg(long, default_value_t = 640)]
    width: u32,

    /// Capture and output height
    #[arg(long, default_value_t = 480)]
    height: u32,

    /// Target frames per second
    #[arg(long, default_value_t = 30)]
    fps: u32,

    /// Background replacement: `color`, `blur`, or a path to an image
    #[arg(short, long, default_value = "blur")]
    background: BackgroundChoice,

    /// Replacement color as R,G,B when --background color
    #[arg(long, value_parser = parse_color, default_value = "0,255,0")]
    color: Rgb<u8>,

    /// Side of the square structuring element for erode/dilate
    #[arg(long, default_value_t = 5)]
    kernel_size: u32,

    /// Luma difference above which a pixel is foreground
    #[arg(long, default_value_t = 10)]
    threshold: u8,

    /// Median filter aperture for mask denoising
    #[arg(long, default_value_t = 21)]
    median_size: u32,

    /// Number of erosion passes
    #[arg(long, default_value_t = 2)]
    erode: u32,

    /// Number of dilation passes (at least --erode)
    #[arg(long, default_value_t = 3)]
    dilate: u32,

    /// Gaussian aperture that softens mask edges
    #[arg(long, default_value_t = 21)]
    edge_blur: u32,

    /// Gaussian aperture for the blurred background
    #[arg(long, default_value_t = 51)]
    background_blur: u32,

    /// Check for keyboard commands every N frames
    #[arg(long, default_value_t = 1)]
    poll_every: u32,

    /// Drop frames the output rejects instead of stopping
    #[arg(long)]
    drop_failed_frames: bool,

    /// Show the mask (grayscale) instead of the composite
    #[arg(long)]
    show_mask: bool,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

impl Args {
    fn pipeline_config(&self) -> Result<PipelineConfig, ConfigError> {
        for (name, value) in [
            ("width", self.width),
            ("height", self.height),
            ("fps", self.fps),
            ("poll interval", self.poll_every),
        ] {
            if value == 0 {
                return Err(ConfigError::Zero(name));
            }
        }

        let config = PipelineConfig {
            kernel_size: self.kernel_size,
            threshold: self.threshold,
            median_size: self.median_size,
            erode_iterations: self.erode,
            dilate_iterations: self.dilate,
            edge_blur_size: self.edge_blur,
            background_blur_size: self.background_blur,
        };
        config.validate()?;
        Ok(config)
    }

    fn session_options(&self) -> SessionOptions {
        SessionOptions {
            target_fps: self.fps,
            poll_every: self.poll_every,
            drop_failed_frames: self.drop_failed_frames,
            show_mask: self.show_mask,
        }
    }

    fn open_output(&self) -> Result<Box<dyn OutputSink>> {
        let sink: Box<dyn OutputSink> = match self.sink {
            SinkKind::V4l2 => Box::new(
                V4L2Output::new(&self.output, self.width, self.height, self.pixel_format)
                    .context("Failed to initialize v4l2loopback output")?,
            ),
            SinkKind::Encoder => {
                let args = EncoderOutput::ffmpeg_args(&self.output, self.fps, self.container);
                Box::new(
                    EncoderOutput::spawn(&self.encoder, &args, self.width, self.height, self.container)
                        .context("Failed to start encoder output")?,
                )
            }
        };
        Ok(sink)
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    tracing::info!("backsub starting");
    tracing::info!("Resolution: {}x{} @ {} fps", args.width, args.height, args.fps);

    let config = args
        .pipeline_config()
        .context("Invalid pipeline configuration")?;
    tracing::debug!("Pipeline: {:?}", config);

    let background = Background::resolve(&args.background, args.color, args.width, args.height)
        .context("Invalid background")?;
    tracing::info!("Background: {:?}", args.background);

    let mut capture = WebcamCapture::new(&args.input);
    capture
        .configure(args.width, args.height, args.fps)
        .context("Failed to initialize webcam capture")?;
    if capture.resolution() != (args.width, args.height) {
        tracing::warn!(
            "Camera delivers {:?} instead of {}x{}",
            capture.resolution(),
            args.width,
            args.height
        );
    }

    let output = args.open_output()?;
    tracing::info!("Output: {:?}", output.resolution());

    let control = StdinControl::spawn().context("Failed to start control input")?;

    let mut session = Session::new(
        capture,
        output,
        control,
        config,
        background,
        args.session_options(),
    );
    session.run().context("Session failed")?;

    Ok(())
}
