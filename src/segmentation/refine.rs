use super::types::Mask;
use crate::error::PipelineError;

/// Denoises a raw segmentation mask.
///
/// Runs three passes in order: a majority box blur that knocks out
/// salt-and-pepper noise, a morphological open (erode then dilate) that
/// removes isolated speckles, and a final dilate that grows the mask
/// slightly past the cloak edge so no fringe of un-replaced pixels
/// survives compositing. Operates on the boolean mask only; no color
/// information is consulted.
///
/// Kernel sizes are square structuring elements. Even sizes behave as
/// the next odd size up (the window is centered on each pixel).
pub struct MaskRefiner {
    blur_kernel: usize,
    open_kernel: usize,
    dilate_kernel: usize,
}

impl MaskRefiner {
    pub fn new(
        blur_kernel: usize,
        open_kernel: usize,
        dilate_kernel: usize,
    ) -> Result<Self, PipelineError> {
        if blur_kernel == 0 || blur_kernel % 2 == 0 {
            return Err(PipelineError::InvalidConfig(format!(
                "blur kernel must be odd and positive, got {blur_kernel}"
            )));
        }
        if open_kernel == 0 || dilate_kernel == 0 {
            return Err(PipelineError::InvalidConfig(
                "morphology kernels must be positive".into(),
            ));
        }
        Ok(Self {
            blur_kernel,
            open_kernel,
            dilate_kernel,
        })
    }

    /// Refine `mask` in place: smooth, open, dilate.
    pub fn refine(&self, mask: &mut Mask) {
        smooth(mask, self.blur_kernel / 2);
        open(mask, self.open_kernel / 2);
        dilate(mask, self.dilate_kernel / 2);
    }
}

impl Default for MaskRefiner {
    /// A 7x7 blur window and 5x5 structuring elements hold up well at
    /// webcam resolutions.
    fn default() -> Self {
        Self::new(7, 5, 5).expect("default kernels are valid")
    }
}

/// Majority vote over the window: a cell becomes true when at least
/// half the in-bounds window cells are true. Isolated flips disappear
/// while solid region boundaries stay put.
fn smooth(mask: &mut Mask, radius: usize) {
    let (width, height) = mask.dimensions();
    let snapshot = mask.clone();
    let r = radius as i64;

    for y in 0..height as i64 {
        for x in 0..width as i64 {
            let mut cells = 0u32;
            let mut set = 0u32;
            for wy in (y - r).max(0)..=(y + r).min(height as i64 - 1) {
                for wx in (x - r).max(0)..=(x + r).min(width as i64 - 1) {
                    cells += 1;
                    if snapshot.get(wx as u32, wy as u32) {
                        set += 1;
                    }
                }
            }
            mask.set(x as u32, y as u32, set * 2 >= cells);
        }
    }
}

/// Erode then dilate with the same element. Out-of-bounds cells count
/// as true for erosion and false for dilation, the adjoint pair on a
/// bounded frame, which keeps the open step idempotent.
fn open(mask: &mut Mask, radius: usize) {
    erode(mask, radius);
    dilate(mask, radius);
}

fn erode(mask: &mut Mask, radius: usize) {
    let (width, height) = mask.dimensions();
    let snapshot = mask.clone();
    let r = radius as i64;

    for y in 0..height as i64 {
        for x in 0..width as i64 {
            let mut keep = true;
            'window: for wy in (y - r).max(0)..=(y + r).min(height as i64 - 1) {
                for wx in (x - r).max(0)..=(x + r).min(width as i64 - 1) {
                    if !snapshot.get(wx as u32, wy as u32) {
                        keep = false;
                        break 'window;
                    }
                }
            }
            mask.set(x as u32, y as u32, keep);
        }
    }
}

fn dilate(mask: &mut Mask, radius: usize) {
    let (width, height) = mask.dimensions();
    let snapshot = mask.clone();
    let r = radius as i64;

    for y in 0..height as i64 {
        for x in 0..width as i64 {
            let mut hit = false;
            'window: for wy in (y - r).max(0)..=(y + r).min(height as i64 - 1) {
                for wx in (x - r).max(0)..=(x + r).min(width as i64 - 1) {
                    if snapshot.get(wx as u32, wy as u32) {
                        hit = true;
                        break 'window;
                    }
                }
            }
            mask.set(x as u32, y as u32, hit);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn speckled(width: u32, height: u32) -> Mask {
        // Solid block with one isolated speck and one hole.
        let mut mask = Mask::from_fn(width, height, |x, y| {
            (4..12).contains(&x) && (4..12).contains(&y)
        });
        mask.set(0, 0, true); // speck
        mask.set(7, 7, false); // hole
        mask
    }

    #[test]
    fn open_removes_isolated_speck() {
        let mut mask = speckled(16, 16);
        open(&mut mask, 1);
        assert!(!mask.get(0, 0));
        // Block interior survives.
        assert!(mask.get(8, 8));
    }

    #[test]
    fn open_is_idempotent() {
        let mut once = speckled(16, 16);
        open(&mut once, 2);
        let mut twice = once.clone();
        open(&mut twice, 2);
        assert_eq!(once, twice);
    }

    #[test]
    fn dilate_grows_region() {
        let mut mask = Mask::from_fn(8, 8, |x, y| x == 4 && y == 4);
        dilate(&mut mask, 1);
        assert_eq!(mask.count_set(), 9);
        assert!(mask.get(3, 3));
        assert!(mask.get(5, 5));
    }

    #[test]
    fn smooth_fills_pinholes_and_drops_specks() {
        let mut mask = speckled(16, 16);
        smooth(&mut mask, 3);
        assert!(!mask.get(0, 0));
        assert!(mask.get(7, 7));
    }

    #[test]
    fn refine_preserves_dimensions() {
        let mut mask = speckled(20, 10);
        MaskRefiner::default().refine(&mut mask);
        assert_eq!(mask.dimensions(), (20, 10));
    }

    #[test]
    fn refine_keeps_empty_mask_empty() {
        let mut mask = Mask::new(12, 12);
        MaskRefiner::default().refine(&mut mask);
        assert!(mask.is_all_false());
    }

    #[test]
    fn bad_kernel_sizes_are_errors_not_panics() {
        assert!(matches!(
            MaskRefiner::new(6, 5, 5),
            Err(PipelineError::InvalidConfig(_))
        ));
        assert!(matches!(
            MaskRefiner::new(7, 0, 5),
            Err(PipelineError::InvalidConfig(_))
        ));
        assert!(matches!(
            MaskRefiner::new(7, 5, 0),
            Err(PipelineError::InvalidConfig(_))
        ));
    }
}
