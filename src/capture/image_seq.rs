use super::FrameSource;
use crate::error::PipelineError;
use image::RgbImage;
use std::path::{Path, PathBuf};

/// Frame source backed by a fixed list of image files, used for
/// offline runs and reproducing sessions without a camera.
///
/// Frames are decoded lazily in list order. Every image must decode to
/// the same dimensions as the first; a mismatching file is a device
/// error, not a silent resize.
pub struct ImageSequenceSource {
    paths: Vec<PathBuf>,
    cursor: usize,
    resolution: (u32, u32),
}

impl ImageSequenceSource {
    pub fn open(paths: Vec<PathBuf>) -> Result<Self, PipelineError> {
        let first = paths
            .first()
            .ok_or_else(|| PipelineError::Device("image sequence is empty".into()))?;
        let frame = decode(first)?;
        Ok(Self {
            resolution: frame.dimensions(),
            paths,
            cursor: 0,
        })
    }
}

fn decode(path: &Path) -> Result<RgbImage, PipelineError> {
    let img = image::open(path)
        .map_err(|e| PipelineError::Device(format!("failed to decode {}: {e}", path.display())))?;
    Ok(img.to_rgb8())
}

impl FrameSource for ImageSequenceSource {
    fn next_frame(&mut self) -> Result<Option<RgbImage>, PipelineError> {
        let Some(path) = self.paths.get(self.cursor) else {
            return Ok(None);
        };
        let frame = decode(path)?;
        if frame.dimensions() != self.resolution {
            return Err(PipelineError::Device(format!(
                "{} is {}x{}, sequence is {}x{}",
                path.display(),
                frame.dimensions().0,
                frame.dimensions().1,
                self.resolution.0,
                self.resolution.1
            )));
        }
        self.cursor += 1;
        Ok(Some(frame))
    }

    fn resolution(&self) -> (u32, u32) {
        self.resolution
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use std::fs;

    fn fixture_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("cloakfx-{name}-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn save_frame(dir: &Path, name: &str, width: u32, height: u32, value: u8) -> PathBuf {
        let path = dir.join(name);
        RgbImage::from_pixel(width, height, Rgb([value, 0, 0]))
            .save(&path)
            .unwrap();
        path
    }

    #[test]
    fn frames_decode_in_list_order_then_end_of_stream() {
        let dir = fixture_dir("seq-order");
        let paths = vec![
            save_frame(&dir, "a.png", 4, 3, 10),
            save_frame(&dir, "b.png", 4, 3, 20),
        ];

        let mut source = ImageSequenceSource::open(paths).unwrap();
        assert_eq!(source.resolution(), (4, 3));
        assert_eq!(
            source.next_frame().unwrap().unwrap().get_pixel(0, 0),
            &Rgb([10, 0, 0])
        );
        assert_eq!(
            source.next_frame().unwrap().unwrap().get_pixel(0, 0),
            &Rgb([20, 0, 0])
        );
        assert!(source.next_frame().unwrap().is_none());

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn mismatched_dimensions_are_a_device_error() {
        let dir = fixture_dir("seq-mismatch");
        let paths = vec![
            save_frame(&dir, "a.png", 4, 3, 10),
            save_frame(&dir, "wide.png", 5, 3, 20),
        ];

        let mut source = ImageSequenceSource::open(paths).unwrap();
        assert!(source.next_frame().unwrap().is_some());
        assert!(matches!(
            source.next_frame(),
            Err(PipelineError::Device(_))
        ));

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn empty_sequence_is_rejected_on_open() {
        assert!(matches!(
            ImageSequenceSource::open(Vec::new()),
            Err(PipelineError::Device(_))
        ));
    }

    #[test]
    fn undecodable_file_is_a_device_error() {
        let dir = fixture_dir("seq-garbage");
        let path = dir.join("not-an-image.png");
        fs::write(&path, b"not a png").unwrap();

        assert!(matches!(
            ImageSequenceSource::open(vec![path]),
            Err(PipelineError::Device(_))
        ));

        let _ = fs::remove_dir_all(dir);
    }
}
