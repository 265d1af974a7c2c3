//! Real-time "invisibility cloak" effect.
//!
//! A session captures a static background while the scene is empty,
//! then replaces every pixel matching the configured HSV ranges with
//! the corresponding background pixel, frame by frame. The
//! [`PipelineController`] owns the camera and the processing loop;
//! `start()` / `stop()` are the whole control surface.

pub mod background;
pub mod capture;
pub mod composite;
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod segmentation;

pub use background::BackgroundModel;
pub use capture::{FrameSource, ImageSequenceSource, WatchdogSource, WebcamSource};
pub use composite::composite;
pub use config::{default_red_ranges, PipelineConfig};
pub use error::PipelineError;
pub use output::{FrameSink, LoopbackSink};
pub use pipeline::{PipelineController, PipelineState, SinkFactory, SourceFactory};
pub use segmentation::{ColorRange, ColorSegmenter, Hsv, Mask, MaskRefiner};
