//! Frame loop: owns the reference frame and drives capture, masking,
//! compositing and output one tick at a time.

mod stats;

pub use stats::PipelineStats;

use crate::capture::CaptureSource;
use crate::compositor::{composite, ReplacementSource};
use crate::config::{Background, PipelineConfig};
use crate::control::{ControlInput, ControlSignal};
use crate::error::{CaptureError, SessionError, SinkError};
use crate::mask::MaskBuilder;
use crate::output::OutputSink;
use crate::types::{mask_to_frame, Frame};
use std::time::{Duration, Instant};

const STATS_INTERVAL: u64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    AwaitingFirstFrame,
    Streaming,
    Stopped,
}

/// What a single tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The first frame became the reference; nothing was emitted
    ReferenceCaptured,
    Emitted,
    /// The sink rejected the frame and the session is set to drop such frames
    Dropped,
    /// The session had already stopped; nothing was captured
    Stopped,
}

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub target_fps: u32,
    /// Poll control input once every this many streaming ticks
    pub poll_every: u32,
    /// Log and skip frames the sink rejects instead of stopping
    pub drop_failed_frames: bool,
    /// Emit the mask as a grayscale image instead of the composite
    pub show_mask: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            target_fps: 30,
            poll_every: 1,
            drop_failed_frames: false,
            show_mask: false,
        }
    }
}

/// State carried between ticks while streaming
struct Scene {
    reference: Frame,
    replacement: ReplacementSource,
}

enum Phase {
    AwaitingFirstFrame,
    Streaming(Scene),
    Stopped,
}

pub struct Session<C, O, K> {
    capture: C,
    output: O,
    control: K,
    config: PipelineConfig,
    builder: MaskBuilder,
    background: Background,
    options: SessionOptions,
    phase: Phase,
    stats: PipelineStats,
    ticks: u64,
}

impl<C, O, K> Session<C, O, K>
where
    C: CaptureSource,
    O: OutputSink,
    K: ControlInput,
{
    /// `config` is expected to be validated already
    pub fn new(
        capture: C,
        output: O,
        control: K,
        config: PipelineConfig,
        background: Background,
        options: SessionOptions,
    ) -> Self {
        Self {
            capture,
            output,
            control,
            builder: MaskBuilder::new(&config),
            config,
            background,
            options,
            phase: Phase::AwaitingFirstFrame,
            stats: PipelineStats::default(),
            ticks: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        match self.phase {
            Phase::AwaitingFirstFrame => SessionState::AwaitingFirstFrame,
            Phase::Streaming(_) => SessionState::Streaming,
            Phase::Stopped => SessionState::Stopped,
        }
    }

    #[cfg(test)]
    pub fn reference(&self) -> Option<&Frame> {
        match &self.phase {
            Phase::Streaming(scene) => Some(&scene.reference),
            _ => None,
        }
    }

    #[cfg(test)]
    pub fn replacement(&self) -> Option<&ReplacementSource> {
        match &self.phase {
            Phase::Streaming(scene) => Some(&scene.replacement),
            _ => None,
        }
    }

    pub fn stats(&self) -> &PipelineStats {
        &self.stats
    }

    /// Run ticks until quit is requested or an error stops the session
    pub fn run(&mut self) -> Result<(), SessionError> {
        let frame_duration = Duration::from_secs_f32(1.0 / self.options.target_fps.max(1) as f32);

        tracing::info!("Starting main pipeline loop");
        tracing::info!("Type 'c' + Enter to recapture the background, 'q' + Enter to quit");

        loop {
            let loop_start = Instant::now();

            let outcome = self.tick()?;
            if matches!(outcome, TickOutcome::Emitted | TickOutcome::Dropped)
                && self.stats.frames % STATS_INTERVAL == 0
            {
                self.stats.log();
            }

            if self.state() == SessionState::Stopped {
                break;
            }

            // Frame rate limiting
            let elapsed = loop_start.elapsed();
            if elapsed < frame_duration {
                std::thread::sleep(frame_duration - elapsed);
            }
        }

        tracing::info!("Session stopped after {} frames", self.stats.frames);
        Ok(())
    }

    /// Advance the state machine by one frame.
    ///
    /// Any error is fatal: the session moves to `Stopped` and later ticks
    /// do nothing.
    pub fn tick(&mut self) -> Result<TickOutcome, SessionError> {
        let result = match self.phase {
            Phase::AwaitingFirstFrame => self.capture_reference(),
            Phase::Streaming(_) => self.stream_frame(),
            Phase::Stopped => return Ok(TickOutcome::Stopped),
        };

        if let Err(err) = &result {
            tracing::error!("Stopping session: {}", err);
            self.phase = Phase::Stopped;
        }
        result
    }

    fn next_frame(&mut self) -> Result<Frame, CaptureError> {
        let start = Instant::now();
        let frame = self.capture.next_frame()?;
        self.stats.capture += start.elapsed();
        Ok(frame)
    }

    fn poll_control(&mut self) -> Option<ControlSignal> {
        let due = self.ticks % u64::from(self.options.poll_every.max(1)) == 0;
        self.ticks += 1;
        if due {
            self.control.poll()
        } else {
            None
        }
    }

    fn capture_reference(&mut self) -> Result<TickOutcome, SessionError> {
        let reference = self.next_frame()?;
        let replacement =
            ReplacementSource::from_background(&self.background, &reference, &self.config);

        tracing::info!(
            "Captured reference frame at {}x{}",
            reference.width(),
            reference.height()
        );

        self.phase = Phase::Streaming(Scene {
            reference,
            replacement,
        });
        Ok(TickOutcome::ReferenceCaptured)
    }

    fn stream_frame(&mut self) -> Result<TickOutcome, SessionError> {
        let frame = self.next_frame()?;
        let signal = self.poll_control();

        let Phase::Streaming(scene) = &mut self.phase else {
            return Ok(TickOutcome::Stopped);
        };

        if frame.dimensions() != scene.reference.dimensions() {
            return Err(CaptureError::FrameSize {
                expected: scene.reference.dimensions(),
                actual: frame.dimensions(),
            }
            .into());
        }

        // The raw frame becomes the reference only after this tick is done
        let recaptured = (signal == Some(ControlSignal::Recapture)).then(|| frame.clone());

        let start = Instant::now();
        let mask = self.builder.build_mask(&frame, &scene.reference);
        self.stats.mask += start.elapsed();

        let start = Instant::now();
        let composed = if self.options.show_mask {
            mask_to_frame(&mask)
        } else {
            composite(frame, &mask, &scene.replacement)
        };
        self.stats.composite += start.elapsed();

        let start = Instant::now();
        let outcome = Self::emit(&mut self.output, &composed, self.options.drop_failed_frames)?;
        self.stats.output += start.elapsed();
        self.stats.frames += 1;

        if let Some(reference) = recaptured {
            scene.replacement.refresh(&reference, &self.config);
            scene.reference = reference;
            tracing::info!("Recaptured reference frame");
        }

        if signal == Some(ControlSignal::Quit) {
            tracing::info!("Quit requested");
            self.phase = Phase::Stopped;
        }

        Ok(outcome)
    }

    fn emit(output: &mut O, frame: &Frame, drop_failed_frames: bool) -> Result<TickOutcome, SinkError> {
        match output.submit(frame) {
            Ok(()) => Ok(TickOutcome::Emitted),
            Err(err) if drop_failed_frames => {
                tracing::warn!("Dropping frame: {}", err);
                Ok(TickOutcome::Dropped)
            }
            Err(err) => Err(err),
        }
    }
}
