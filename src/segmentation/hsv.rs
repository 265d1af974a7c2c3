use super::types::Hsv;

/// Convert an 8-bit RGB triple to 8-bit HSV.
///
/// Pure integer arithmetic so any given triple maps to the same HSV
/// value on every platform and every run:
///
/// - `v = max(r, g, b)`
/// - `s = (max - min) * 255 / max`, or 0 when `max` is 0
/// - `h` is the standard dominant-channel hue in degrees
///   (`60 * (g - b) / delta` off red, plus 120 off green, plus 240 off
///   blue, wrapped into 0..360), halved into 0..=179
///
/// Ties between channels resolve in r, g, b order.
pub fn rgb_to_hsv(r: u8, g: u8, b: u8) -> Hsv {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = (max - min) as i32;

    let v = max;
    let s = if max == 0 {
        0
    } else {
        ((delta as u32 * 255) / max as u32) as u8
    };

    let h = if delta == 0 {
        0
    } else {
        let (ri, gi, bi) = (r as i32, g as i32, b as i32);
        let deg = if max == r {
            (60 * (gi - bi)) / delta
        } else if max == g {
            120 + (60 * (bi - ri)) / delta
        } else {
            240 + (60 * (ri - gi)) / delta
        };
        let deg = if deg < 0 { deg + 360 } else { deg };
        (deg / 2) as u8
    };

    Hsv::new(h, s, v)
}
