use crate::error::PipelineError;
use crate::segmentation::{ColorRange, Hsv};
use std::time::Duration;

/// Session configuration for the cloak pipeline.
///
/// Fixed for the lifetime of one session; build a new controller to
/// reconfigure.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// HSV ranges treated as cloak, OR-combined. Defaults to the two
    /// sub-ranges covering red on either side of the hue wrap.
    pub color_ranges: Vec<ColorRange>,
    /// Majority-blur window, odd. Default 7.
    pub blur_kernel: usize,
    /// Structuring element for the morphological open. Default 5.
    pub open_kernel: usize,
    /// Structuring element for the final dilate. Default 5.
    pub dilate_kernel: usize,
    /// Frames read for background capture; the first third is discarded
    /// while the camera settles. Default 30 (roughly three seconds of a
    /// slow webcam).
    pub warmup_frames: usize,
    /// Bound on a single frame acquisition before the source is
    /// declared stalled. Default 2 s.
    pub stall_timeout: Duration,
    /// Target frame rate for the processing loop. Default 30.
    pub target_fps: u32,
}

impl PipelineConfig {
    /// Reject settings the refiner and background capture cannot work
    /// with; checked once when a session starts.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.blur_kernel == 0 || self.blur_kernel % 2 == 0 {
            return Err(PipelineError::InvalidConfig(format!(
                "blur kernel must be odd and positive, got {}",
                self.blur_kernel
            )));
        }
        if self.open_kernel == 0 || self.dilate_kernel == 0 {
            return Err(PipelineError::InvalidConfig(
                "morphology kernels must be positive".into(),
            ));
        }
        if self.warmup_frames == 0 {
            return Err(PipelineError::InvalidConfig(
                "warmup frame count must be positive".into(),
            ));
        }
        if self.target_fps == 0 {
            return Err(PipelineError::InvalidConfig(
                "target fps must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// The classic red cloak: hue wraps zero, so two sub-ranges.
pub fn default_red_ranges() -> Vec<ColorRange> {
    vec![
        ColorRange::new(Hsv::new(0, 120, 70), Hsv::new(10, 255, 255))
            .expect("bounds are ordered"),
        ColorRange::new(Hsv::new(170, 120, 70), Hsv::new(179, 255, 255))
            .expect("bounds are ordered"),
    ]
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            color_ranges: default_red_ranges(),
            blur_kernel: 7,
            open_kernel: 5,
            dilate_kernel: 5,
            warmup_frames: 30,
            stall_timeout: Duration::from_secs(2),
            target_fps: 30,
        }
    }
}
