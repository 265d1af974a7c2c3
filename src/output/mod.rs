mod loopback;

pub use loopback::LoopbackSink;

use crate::error::PipelineError;
use image::RgbImage;

/// Destination for composited frames: a virtual camera, a display
/// surface, or a test collector.
pub trait FrameSink {
    /// Emit one frame.
    fn write_frame(&mut self, frame: &RgbImage) -> Result<(), PipelineError>;
}
