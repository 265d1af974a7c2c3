mod image_seq;
mod watchdog;
mod webcam;

pub use image_seq::ImageSequenceSource;
pub use watchdog::WatchdogSource;
pub use webcam::WebcamSource;

use crate::error::PipelineError;
use image::RgbImage;

/// A live camera or file feed delivering frames in capture order.
pub trait FrameSource {
    /// Pull the next frame, advancing the device/file cursor.
    ///
    /// `Ok(None)` means the stream is cleanly exhausted (a file feed
    /// fully consumed); `Err` means the device failed. A live camera
    /// never returns `Ok(None)`.
    fn next_frame(&mut self) -> Result<Option<RgbImage>, PipelineError>;

    /// Resolution of the frames this source delivers.
    fn resolution(&self) -> (u32, u32);
}
