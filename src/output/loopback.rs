use super::FrameSink;
use crate::error::PipelineError;
use image::RgbImage;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// v4l2loopback sink: raw YUYV frames written straight to the device
/// file, which is the format the loopback module hands to readers.
pub struct LoopbackSink {
    file: File,
    width: u32,
    height: u32,
}

impl LoopbackSink {
    /// Open the loopback device, fixing the frame dimensions it will
    /// accept for the session.
    pub fn open<P: AsRef<Path>>(device_path: P, width: u32, height: u32) -> Result<Self, PipelineError> {
        let path = device_path.as_ref();
        tracing::info!(
            "Opening v4l2loopback device {} at {}x{}",
            path.display(),
            width,
            height
        );

        let file = File::options().write(true).open(path).map_err(|e| {
            PipelineError::Sink(format!("failed to open {}: {e}", path.display()))
        })?;

        Ok(Self {
            file,
            width,
            height,
        })
    }
}

impl FrameSink for LoopbackSink {
    fn write_frame(&mut self, frame: &RgbImage) -> Result<(), PipelineError> {
        if frame.dimensions() != (self.width, self.height) {
            return Err(PipelineError::dimension_mismatch(
                (self.width, self.height),
                frame.dimensions(),
            ));
        }

        let yuyv = rgb_to_yuyv(frame);
        self.file
            .write_all(&yuyv)
            .map_err(|e| PipelineError::Sink(format!("loopback write failed: {e}")))
    }
}

/// Pack an RGB frame into YUYV (4:2:2): per pixel pair, two luma
/// samples and one averaged chroma pair.
fn rgb_to_yuyv(frame: &RgbImage) -> Vec<u8> {
    let (width, height) = frame.dimensions();
    let mut yuyv = Vec::with_capacity((width * height * 2) as usize);

    for y in 0..height {
        for x in (0..width).step_by(2) {
            let first = frame.get_pixel(x, y);
            let second = if x + 1 < width {
                frame.get_pixel(x + 1, y)
            } else {
                first
            };

            let (y0, u0, v0) = rgb_to_yuv(first[0], first[1], first[2]);
            let (y1, u1, v1) = rgb_to_yuv(second[0], second[1], second[2]);

            yuyv.push(y0);
            yuyv.push(((u0 as u16 + u1 as u16) / 2) as u8);
            yuyv.push(y1);
            yuyv.push(((v0 as u16 + v1 as u16) / 2) as u8);
        }
    }

    yuyv
}

/// BT.601 RGB to YUV.
fn rgb_to_yuv(r: u8, g: u8, b: u8) -> (u8, u8, u8) {
    let r = r as f32;
    let g = g as f32;
    let b = b as f32;

    let y = (0.299 * r + 0.587 * g + 0.114 * b).clamp(0.0, 255.0) as u8;
    let u = ((-0.147 * r - 0.289 * g + 0.436 * b) + 128.0).clamp(0.0, 255.0) as u8;
    let v = ((0.615 * r - 0.515 * g - 0.100 * b) + 128.0).clamp(0.0, 255.0) as u8;

    (y, u, v)
}
