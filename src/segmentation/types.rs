use crate::error::PipelineError;

/// A pixel in HSV space, 8-bit OpenCV convention:
/// hue 0..=179 (degrees halved), saturation and value 0..=255.
///
/// The halved hue keeps the full circle inside a byte, so the widely
/// published threshold tables (e.g. red at 0-10 and 170-179) apply
/// directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hsv {
    pub h: u8,
    pub s: u8,
    pub v: u8,
}

impl Hsv {
    pub const fn new(h: u8, s: u8, v: u8) -> Self {
        Self { h, s, v }
    }
}

/// An inclusive lower/upper bound pair in HSV space.
///
/// A single range cannot wrap the hue circle; hues that straddle zero
/// (red) are configured as an ordered set of sub-ranges combined with
/// logical OR by the segmenter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorRange {
    lower: Hsv,
    upper: Hsv,
}

impl ColorRange {
    /// Build a range, rejecting bounds where lower exceeds upper on any
    /// channel.
    pub fn new(lower: Hsv, upper: Hsv) -> Result<Self, PipelineError> {
        if lower.h > upper.h || lower.s > upper.s || lower.v > upper.v {
            return Err(PipelineError::InvalidColorRange {
                lower: (lower.h, lower.s, lower.v),
                upper: (upper.h, upper.s, upper.v),
            });
        }
        Ok(Self { lower, upper })
    }

    /// Channel-wise inclusive membership test.
    pub fn contains(&self, px: Hsv) -> bool {
        px.h >= self.lower.h
            && px.h <= self.upper.h
            && px.s >= self.lower.s
            && px.s <= self.upper.s
            && px.v >= self.lower.v
            && px.v <= self.upper.v
    }

    pub fn lower(&self) -> Hsv {
        self.lower
    }

    pub fn upper(&self) -> Hsv {
        self.upper
    }
}

/// Binary cloak mask matching the frame dimensions, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    width: u32,
    height: u32,
    data: Vec<bool>,
}

impl Mask {
    /// All-false mask of the given dimensions.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![false; (width * height) as usize],
        }
    }

    pub fn from_fn<F: FnMut(u32, u32) -> bool>(width: u32, height: u32, mut f: F) -> Self {
        let mut data = Vec::with_capacity((width * height) as usize);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Self {
            width,
            height,
            data,
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> bool {
        self.data[(y * self.width + x) as usize]
    }

    #[inline]
    pub fn set(&mut self, x: u32, y: u32, value: bool) {
        self.data[(y * self.width + x) as usize] = value;
    }

    /// Number of true cells, used for logging and tests.
    pub fn count_set(&self) -> usize {
        self.data.iter().filter(|&&b| b).count()
    }

    pub fn is_all_false(&self) -> bool {
        self.data.iter().all(|&b| !b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_rejects_inverted_bounds() {
        let res = ColorRange::new(Hsv::new(10, 0, 0), Hsv::new(5, 255, 255));
        assert!(matches!(res, Err(PipelineError::InvalidColorRange { .. })));
    }

    #[test]
    fn range_bounds_are_inclusive() {
        let range = ColorRange::new(Hsv::new(0, 120, 70), Hsv::new(10, 255, 255)).unwrap();
        assert!(range.contains(Hsv::new(0, 120, 70)));
        assert!(range.contains(Hsv::new(10, 255, 255)));
        assert!(!range.contains(Hsv::new(11, 200, 200)));
        assert!(!range.contains(Hsv::new(5, 119, 200)));
    }
}
