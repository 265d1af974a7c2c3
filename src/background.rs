use crate::capture::FrameSource;
use crate::error::PipelineError;
use image::RgbImage;

/// One reference frame of the empty scene, captured while no subject
/// is in view. Cloak pixels are filled from this frame.
///
/// Replacement is whole-frame only: a capture builds the new reference
/// completely before swapping it in, so a failed refresh leaves the
/// previous background intact and the compositor never sees a torn
/// frame.
pub struct BackgroundModel {
    frame: Option<RgbImage>,
}

impl BackgroundModel {
    pub fn new() -> Self {
        Self { frame: None }
    }

    /// Capture a fresh reference from `source`.
    ///
    /// Reads `warmup` frames, discards the first third while exposure
    /// and white balance settle, and averages the remainder channel-wise
    /// (integer sums, truncating division) to suppress sensor noise.
    pub fn capture(
        &mut self,
        source: &mut dyn FrameSource,
        warmup: usize,
    ) -> Result<(), PipelineError> {
        if warmup == 0 {
            return Err(PipelineError::Capture("warmup frame count is zero".into()));
        }
        tracing::info!("Capturing background over {} warmup frames", warmup);

        let settle = warmup / 3;
        let mut sums: Vec<u32> = Vec::new();
        let mut dimensions = (0u32, 0u32);
        let mut averaged = 0u32;

        for i in 0..warmup {
            let frame = source
                .next_frame()
                .map_err(|e| PipelineError::Capture(format!("source failed mid-burst: {e}")))?
                .ok_or_else(|| {
                    PipelineError::Capture(format!(
                        "source ended after {i} of {warmup} warmup frames"
                    ))
                })?;

            if i < settle {
                continue;
            }
            if sums.is_empty() {
                dimensions = frame.dimensions();
                sums = vec![0u32; frame.as_raw().len()];
            } else if frame.dimensions() != dimensions {
                return Err(PipelineError::dimension_mismatch(
                    dimensions,
                    frame.dimensions(),
                ));
            }
            for (sum, &channel) in sums.iter_mut().zip(frame.as_raw()) {
                *sum += channel as u32;
            }
            averaged += 1;
        }

        let data: Vec<u8> = sums.iter().map(|&s| (s / averaged) as u8).collect();
        let (width, height) = dimensions;
        let frame = RgbImage::from_raw(width, height, data)
            .ok_or_else(|| PipelineError::Capture("averaged buffer size mismatch".into()))?;

        tracing::info!(
            "Background captured: {}x{} averaged over {} frames",
            width,
            height,
            averaged
        );
        self.frame = Some(frame);
        Ok(())
    }

    /// The stored reference frame.
    pub fn current(&self) -> Result<&RgbImage, PipelineError> {
        self.frame.as_ref().ok_or(PipelineError::NotInitialized)
    }

    /// Re-run capture, keeping the old reference until the new one is
    /// fully built.
    pub fn refresh(
        &mut self,
        source: &mut dyn FrameSource,
        warmup: usize,
    ) -> Result<(), PipelineError> {
        tracing::info!("Refreshing background");
        self.capture(source, warmup)
    }
}

impl Default for BackgroundModel {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    /// Scripted source yielding a fixed list of frames then end-of-stream.
    struct ScriptedSource {
        frames: Vec<RgbImage>,
        resolution: (u32, u32),
    }

    impl ScriptedSource {
        fn new(frames: Vec<RgbImage>) -> Self {
            let resolution = frames[0].dimensions();
            let mut frames = frames;
            frames.reverse();
            Self { frames, resolution }
        }
    }

    impl FrameSource for ScriptedSource {
        fn next_frame(&mut self) -> Result<Option<RgbImage>, PipelineError> {
            Ok(self.frames.pop())
        }

        fn resolution(&self) -> (u32, u32) {
            self.resolution
        }
    }

    fn solid(value: u8) -> RgbImage {
        RgbImage::from_pixel(4, 4, Rgb([value, value, value]))
    }

    #[test]
    fn current_before_capture_is_not_initialized() {
        let model = BackgroundModel::new();
        assert_eq!(model.current().unwrap_err(), PipelineError::NotInitialized);
    }

    #[test]
    fn capture_averages_past_the_settle_window() {
        // 6 frames, first 2 discarded; average of 100,100,200,200 = 150.
        let mut source = ScriptedSource::new(vec![
            solid(0),
            solid(0),
            solid(100),
            solid(100),
            solid(200),
            solid(200),
        ]);
        let mut model = BackgroundModel::new();
        model.capture(&mut source, 6).unwrap();
        assert_eq!(model.current().unwrap().get_pixel(2, 2), &Rgb([150, 150, 150]));
    }

    #[test]
    fn capture_fails_when_source_runs_dry() {
        let mut source = ScriptedSource::new(vec![solid(10), solid(10)]);
        let mut model = BackgroundModel::new();
        let err = model.capture(&mut source, 6).unwrap_err();
        assert!(matches!(err, PipelineError::Capture(_)));
        // No partial background is ever stored.
        assert_eq!(model.current().unwrap_err(), PipelineError::NotInitialized);
    }

    #[test]
    fn failed_refresh_keeps_previous_background() {
        let mut source = ScriptedSource::new(vec![solid(30); 3]);
        let mut model = BackgroundModel::new();
        model.capture(&mut source, 3).unwrap();

        let mut short = ScriptedSource::new(vec![solid(250)]);
        assert!(model.refresh(&mut short, 3).is_err());
        assert_eq!(model.current().unwrap().get_pixel(0, 0), &Rgb([30, 30, 30]));
    }
}
