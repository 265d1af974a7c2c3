mod hsv;
mod refine;
pub mod types;

pub use hsv::rgb_to_hsv;
pub use refine::MaskRefiner;
pub use types::{ColorRange, Hsv, Mask};

use image::RgbImage;

/// Thresholds frames against a fixed set of HSV ranges.
///
/// The range set is decided at session start; hues that wrap the color
/// circle (red) are expressed as multiple sub-ranges, OR-combined here.
pub struct ColorSegmenter {
    ranges: Vec<ColorRange>,
}

impl ColorSegmenter {
    pub fn new(ranges: Vec<ColorRange>) -> Self {
        Self { ranges }
    }

    /// Classify every pixel of `frame` against the configured ranges.
    ///
    /// Deterministic and side-effect-free. An empty range set yields an
    /// all-false mask (nothing is cloaked).
    pub fn segment(&self, frame: &RgbImage) -> Mask {
        let (width, height) = frame.dimensions();
        let mut mask = Mask::new(width, height);
        if self.ranges.is_empty() {
            return mask;
        }

        for (x, y, pixel) in frame.enumerate_pixels() {
            let px = rgb_to_hsv(pixel[0], pixel[1], pixel[2]);
            if self.ranges.iter().any(|r| r.contains(px)) {
                mask.set(x, y, true);
            }
        }
        mask
    }
}
