//! Random hue / lightness / saturation jitter.
//!
//! Pixels are converted to 8-bit HLS (H in `[0, 180]`, L and S in
//! `[0, 255]`), shifted by one offset per channel for the whole image,
//! clamped and converted back.

use ndarray::{Array3, Axis};
use rand::{Rng, RngCore};

/// Upper clamp for (H, L, S)
const HLS_LIMITS: [i32; 3] = [180, 255, 255];

/// Maps a hue sextant to the `(b, g, r)` picks from `[p2, p1, falling, rising]`
const SECTOR_TAB: [[usize; 3]; 6] = [
    [1, 3, 0],
    [1, 0, 2],
    [3, 0, 1],
    [0, 2, 1],
    [0, 1, 3],
    [2, 1, 0],
];

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_byte(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

/// Convert one BGR pixel to HLS.
#[must_use]
#[allow(clippy::float_cmp)]
pub fn bgr_to_hls(pixel: [u8; 3]) -> [u8; 3] {
    let b = f32::from(pixel[0]) / 255.0;
    let g = f32::from(pixel[1]) / 255.0;
    let r = f32::from(pixel[2]) / 255.0;

    let vmax = r.max(g).max(b);
    let vmin = r.min(g).min(b);
    let diff = vmax - vmin;
    let l = (vmax + vmin) * 0.5;

    let (mut h, mut s) = (0.0, 0.0);
    if diff > f32::EPSILON {
        s = if l < 0.5 {
            diff / (vmax + vmin)
        } else {
            diff / (2.0 - vmax - vmin)
        };
        let d = 60.0 / diff;
        h = if vmax == r {
            (g - b) * d
        } else if vmax == g {
            (b - r) * d + 120.0
        } else {
            (r - g) * d + 240.0
        };
        if h < 0.0 {
            h += 360.0;
        }
    }

    [to_byte(h * 0.5), to_byte(l * 255.0), to_byte(s * 255.0)]
}

/// Convert one HLS pixel back to BGR.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn hls_to_bgr(pixel: [u8; 3]) -> [u8; 3] {
    let l = f32::from(pixel[1]) / 255.0;
    let s = f32::from(pixel[2]) / 255.0;
    if pixel[2] == 0 {
        let v = to_byte(l * 255.0);
        return [v, v, v];
    }

    let p2 = if l <= 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let p1 = 2.0 * l - p2;

    let mut h = f32::from(pixel[0]) * (6.0 / 180.0);
    if h < 0.0 {
        h += 6.0;
    } else if h >= 6.0 {
        h -= 6.0;
    }
    let sector = (h.floor() as usize).min(5);
    let frac = h - sector as f32;

    let tab = [p2, p1, p1 + (p2 - p1) * (1.0 - frac), p1 + (p2 - p1) * frac];
    let pick = SECTOR_TAB[sector];
    [
        to_byte(tab[pick[0]] * 255.0),
        to_byte(tab[pick[1]] * 255.0),
        to_byte(tab[pick[2]] * 255.0),
    ]
}

/// Per-image HLS offsets, in channel order (H, L, S)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HlsShift(pub [i32; 3]);

/// Maximum absolute shift per channel
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ColorJitter {
    pub random_h: i32,
    pub random_s: i32,
    pub random_l: i32,
}

impl ColorJitter {
    #[must_use]
    pub fn new(random_h: i32, random_s: i32, random_l: i32) -> Self {
        ColorJitter {
            random_h,
            random_s,
            random_l,
        }
    }

    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.random_h == 0 && self.random_s == 0 && self.random_l == 0
    }

    /// Draw the hue, saturation and lightness offsets, in that order.
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    pub fn sample(&self, rng: &mut dyn RngCore) -> HlsShift {
        let mut draw = |range: i32| {
            let range = range as f32;
            (rng.gen::<f32>() * range * 2.0 - range) as i32
        };
        let h = draw(self.random_h);
        let s = draw(self.random_s);
        let l = draw(self.random_l);
        HlsShift([h, l, s])
    }

    /// Draw offsets and apply them to a BGR image in place.
    ///
    /// Does nothing, and draws nothing, when every range is zero.
    pub fn apply(&self, image: &mut Array3<u8>, rng: &mut dyn RngCore) {
        if self.is_noop() {
            return;
        }
        let shift = self.sample(rng);
        tracing::debug!(?shift, "color jitter");
        apply_shift(image, shift);
    }
}

/// Add `shift` to every pixel of a BGR image in HLS space.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn apply_shift(image: &mut Array3<u8>, shift: HlsShift) {
    for mut pixel in image.lanes_mut(Axis(2)) {
        let hls = bgr_to_hls([pixel[0], pixel[1], pixel[2]]);
        let mut shifted = [0u8; 3];
        for k in 0..3 {
            shifted[k] = (i32::from(hls[k]) + shift.0[k]).clamp(0, HLS_LIMITS[k]) as u8;
        }
        let bgr = hls_to_bgr(shifted);
        pixel[0] = bgr[0];
        pixel[1] = bgr[1];
        pixel[2] = bgr[2];
    }
}
