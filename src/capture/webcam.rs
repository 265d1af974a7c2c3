use super::FrameSource;
use crate::error::PipelineError;
use image::RgbImage;
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{CameraIndex, RequestedFormat, RequestedFormatType};
use nokhwa::Camera;

/// Live webcam feed backed by nokhwa.
///
/// Owns the device handle for its lifetime; dropping the source closes
/// the stream and releases the camera.
pub struct WebcamSource {
    camera: Camera,
    width: u32,
    height: u32,
}

impl WebcamSource {
    pub fn open(device_index: u32) -> Result<Self, PipelineError> {
        tracing::info!("Opening webcam {}", device_index);

        let index = CameraIndex::Index(device_index);
        let requested =
            RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestResolution);

        let mut camera = Camera::new(index, requested)
            .map_err(|e| PipelineError::Device(format!("failed to open camera: {e}")))?;

        camera
            .open_stream()
            .map_err(|e| PipelineError::Device(format!("failed to open camera stream: {e}")))?;

        let resolution = camera.resolution();
        let (width, height) = (resolution.width(), resolution.height());
        tracing::info!("Webcam {} streaming at {}x{}", device_index, width, height);

        Ok(Self {
            camera,
            width,
            height,
        })
    }
}

impl FrameSource for WebcamSource {
    fn next_frame(&mut self) -> Result<Option<RgbImage>, PipelineError> {
        let frame = self
            .camera
            .frame()
            .map_err(|e| PipelineError::Device(format!("failed to read frame: {e}")))?;

        let decoded = frame
            .decode_image::<RgbFormat>()
            .map_err(|e| PipelineError::Device(format!("failed to decode frame: {e}")))?;

        Ok(Some(decoded))
    }

    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}
