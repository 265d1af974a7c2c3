use crate::error::PipelineError;
use crate::segmentation::Mask;
use image::RgbImage;

/// Merge the live frame with the background under the refined mask:
/// cloak pixels come from the background, everything else from the
/// live frame.
///
/// Pure and deterministic. All three inputs must share dimensions.
pub fn composite(
    live: &RgbImage,
    mask: &Mask,
    background: &RgbImage,
) -> Result<RgbImage, PipelineError> {
    let expected = live.dimensions();
    if mask.dimensions() != expected {
        return Err(PipelineError::dimension_mismatch(expected, mask.dimensions()));
    }
    if background.dimensions() != expected {
        return Err(PipelineError::dimension_mismatch(
            expected,
            background.dimensions(),
        ));
    }

    Ok(RgbImage::from_fn(expected.0, expected.1, |x, y| {
        if mask.get(x, y) {
            *background.get_pixel(x, y)
        } else {
            *live.get_pixel(x, y)
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn checkerboard_mask_selects_per_pixel() {
        let live = RgbImage::from_pixel(6, 4, Rgb([10, 20, 30]));
        let background = RgbImage::from_pixel(6, 4, Rgb([200, 210, 220]));
        let mask = Mask::from_fn(6, 4, |x, y| (x + y) % 2 == 0);

        let out = composite(&live, &mask, &background).unwrap();
        for y in 0..4 {
            for x in 0..6 {
                let expected = if (x + y) % 2 == 0 {
                    Rgb([200, 210, 220])
                } else {
                    Rgb([10, 20, 30])
                };
                assert_eq!(out.get_pixel(x, y), &expected, "pixel ({x},{y})");
            }
        }
    }

    #[test]
    fn mismatched_background_is_rejected() {
        let live = RgbImage::new(6, 4);
        let background = RgbImage::new(5, 4);
        let mask = Mask::new(6, 4);
        let err = composite(&live, &mask, &background).unwrap_err();
        assert!(matches!(err, PipelineError::DimensionMismatch { .. }));
    }

    #[test]
    fn mismatched_mask_is_rejected() {
        let live = RgbImage::new(6, 4);
        let background = RgbImage::new(6, 4);
        let mask = Mask::new(6, 5);
        let err = composite(&live, &mask, &background).unwrap_err();
        assert!(matches!(err, PipelineError::DimensionMismatch { .. }));
    }

    #[test]
    fn all_false_mask_returns_live_frame() {
        let live = RgbImage::from_fn(3, 3, |x, y| Rgb([x as u8, y as u8, 7]));
        let background = RgbImage::from_pixel(3, 3, Rgb([255, 255, 255]));
        let out = composite(&live, &Mask::new(3, 3), &background).unwrap();
        assert_eq!(out, live);
    }
}
