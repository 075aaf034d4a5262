use std::time::Duration;

/// Running per-stage timings, logged as averages
#[derive(Debug, Default, Clone)]
pub struct PipelineStats {
    pub frames: u64,
    pub capture: Duration,
    pub mask: Duration,
    pub composite: Duration,
    pub output: Duration,
}

impl PipelineStats {
    /// Average milliseconds per frame for capture, mask, composite and output
    pub fn averages_ms(&self) -> [f64; 4] {
        let frames = self.frames.max(1) as f64;
        [self.capture, self.mask, self.composite, self.output]
            .map(|total| total.as_secs_f64() * 1000.0 / frames)
    }

    pub fn log(&self) {
        let [capture, mask, composite, output] = self.averages_ms();
        let total = capture + mask + composite + output;
        let fps = if total > 0.0 { 1000.0 / total } else { 0.0 };

        tracing::info!(
            "Frame {}: capture={:.1}ms, mask={:.1}ms, composite={:.1}ms, output={:.1}ms, total={:.1}ms, fps={:.1}",
            self.frames,
            capture,
            mask,
            composite,
            output,
            total,
            fps
        );
    }
}
