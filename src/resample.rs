//! Resize and affine-warp kernels for `(H, W, C)` byte rasters.
//!
//! Geometry follows the usual pixel-centre convention for resizing
//! (`src = (dst + 0.5) * scale - 0.5`) with replicated borders, and the
//! pixel-corner convention with a constant border for warping.

use ndarray::{Array3, ArrayView3};
use std::f64::consts::PI;

use crate::affine::{apply_affine_transform, invert_affine, AffineTransform};
use crate::geometry::ensure_shape;
use crate::interp::InterMethod;

const CUBIC_A: f32 = -0.75;

/// Per-output-index list of `(source index, weight)` pairs along one axis
type AxisTaps = Vec<Vec<(usize, f32)>>;

/// Interpolation weights for fractional offset `t` in `[0, 1)`.
///
/// Returns the offset of the first tap relative to `floor(position)` and the
/// weights of the consecutive taps.
#[allow(clippy::cast_possible_truncation)]
fn kernel_weights(method: InterMethod, t: f32) -> (isize, Vec<f32>) {
    match method {
        InterMethod::Nearest => (0, vec![1.0]),
        InterMethod::Bilinear | InterMethod::Area => (0, vec![1.0 - t, t]),
        InterMethod::Bicubic => {
            let a = CUBIC_A;
            let x = t;
            let w0 = ((a * (x + 1.0) - 5.0 * a) * (x + 1.0) + 8.0 * a) * (x + 1.0) - 4.0 * a;
            let w1 = ((a + 2.0) * x - (a + 3.0)) * x * x + 1.0;
            let w2 = ((a + 2.0) * (1.0 - x) - (a + 3.0)) * (1.0 - x) * (1.0 - x) + 1.0;
            (-1, vec![w0, w1, w2, 1.0 - w0 - w1 - w2])
        }
        InterMethod::Lanczos4 => {
            let mut weights: Vec<f64> = (0..8)
                .map(|i| {
                    let d = f64::from(t) + 3.0 - f64::from(i);
                    if d.abs() < 1e-9 {
                        1.0
                    } else {
                        4.0 * (PI * d).sin() * (PI * d / 4.0).sin() / (PI * PI * d * d)
                    }
                })
                .collect();
            let sum: f64 = weights.iter().sum();
            for w in &mut weights {
                *w /= sum;
            }
            (-3, weights.into_iter().map(|w| w as f32).collect())
        }
    }
}

/// Build the taps for resizing one axis from `src_len` to `dst_len` samples.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn axis_taps(src_len: usize, dst_len: usize, method: InterMethod) -> AxisTaps {
    let scale = src_len as f64 / dst_len as f64;
    let last = src_len as isize - 1;
    let clamp = |i: isize| i.clamp(0, last) as usize;

    (0..dst_len)
        .map(|d| {
            let d = d as f64;
            match method {
                InterMethod::Nearest => {
                    let s = ((d * scale).floor() as usize).min(src_len - 1);
                    vec![(s, 1.0)]
                }
                InterMethod::Area if scale > 1.0 => {
                    // exact box average over [d*scale, (d+1)*scale)
                    let start = d * scale;
                    let end = (d + 1.0) * scale;
                    let first = start.floor() as isize;
                    let past = end.ceil() as isize;
                    (first..past)
                        .filter_map(|i| {
                            let lo = start.max(i as f64);
                            let hi = end.min((i + 1) as f64);
                            (hi > lo).then(|| (clamp(i), ((hi - lo) / scale) as f32))
                        })
                        .collect()
                }
                InterMethod::Area => {
                    let sx = (d * scale).floor();
                    let fx = (d + 1.0) - (sx + 1.0) / scale;
                    let fx: f32 = if fx <= 0.0 { 0.0 } else { (fx - fx.floor()) as f32 };
                    let sx = sx as isize;
                    vec![(clamp(sx), 1.0 - fx), (clamp(sx + 1), fx)]
                }
                _ => {
                    let f = (d + 0.5) * scale - 0.5;
                    let sx = f.floor();
                    let (offset, weights) = kernel_weights(method, (f - sx) as f32);
                    let start = sx as isize + offset;
                    weights
                        .into_iter()
                        .enumerate()
                        .map(|(k, w)| (clamp(start + k as isize), w))
                        .collect()
                }
            }
        })
        .collect()
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn saturate(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

/// Resize `src` into `dst` with shape `(out_h, out_w, C)`.
pub fn resize_into(
    src: ArrayView3<'_, u8>,
    dst: &mut Array3<u8>,
    out_size: (usize, usize),
    method: InterMethod,
) {
    let (src_h, src_w, channels) = src.dim();
    let (out_h, out_w) = out_size;
    ensure_shape(dst, (out_h, out_w, channels));
    if src_h == 0 || src_w == 0 || out_h == 0 || out_w == 0 {
        return;
    }

    let x_taps = axis_taps(src_w, out_w, method);
    let y_taps = axis_taps(src_h, out_h, method);

    // horizontal pass
    let mut rows = Array3::<f32>::zeros((src_h, out_w, channels));
    for y in 0..src_h {
        for (x, taps) in x_taps.iter().enumerate() {
            for c in 0..channels {
                rows[[y, x, c]] = taps
                    .iter()
                    .map(|&(sx, w)| w * f32::from(src[[y, sx, c]]))
                    .sum();
            }
        }
    }

    // vertical pass
    for (y, taps) in y_taps.iter().enumerate() {
        for x in 0..out_w {
            for c in 0..channels {
                let acc: f32 = taps.iter().map(|&(sy, w)| w * rows[[sy, x, c]]).sum();
                dst[[y, x, c]] = saturate(acc);
            }
        }
    }
}

/// Warp `src` through `transform` into an `(out_h, out_w, C)` canvas.
///
/// `transform` maps source coordinates to destination coordinates; sample
/// taps that fall outside the source read `fill` on every channel.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn warp_affine_into(
    src: ArrayView3<'_, u8>,
    dst: &mut Array3<u8>,
    transform: &AffineTransform,
    out_size: (usize, usize),
    method: InterMethod,
    fill: u8,
) {
    let (src_h, src_w, channels) = src.dim();
    let (out_h, out_w) = out_size;
    ensure_shape(dst, (out_h, out_w, channels));

    let inverse = invert_affine(transform);
    let sample = |ix: isize, iy: isize, c: usize| -> f32 {
        if ix < 0 || iy < 0 || ix >= src_w as isize || iy >= src_h as isize {
            f32::from(fill)
        } else {
            f32::from(src[[iy as usize, ix as usize, c]])
        }
    };

    for y in 0..out_h {
        for x in 0..out_w {
            let (sx, sy) = apply_affine_transform((x as f32, y as f32), &inverse);
            if method == InterMethod::Nearest {
                let (ix, iy) = (sx.round() as isize, sy.round() as isize);
                for c in 0..channels {
                    dst[[y, x, c]] = saturate(sample(ix, iy, c));
                }
                continue;
            }

            let (fx, fy) = (sx.floor(), sy.floor());
            let (ox, wx) = kernel_weights(method, sx - fx);
            let (oy, wy) = kernel_weights(method, sy - fy);
            let (bx, by) = (fx as isize + ox, fy as isize + oy);
            for c in 0..channels {
                let mut acc = 0.0;
                for (j, wj) in wy.iter().enumerate() {
                    for (i, wi) in wx.iter().enumerate() {
                        acc += wj * wi * sample(bx + i as isize, by + j as isize, c);
                    }
                }
                dst[[y, x, c]] = saturate(acc);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    const ALL_METHODS: [InterMethod; 5] = [
        InterMethod::Nearest,
        InterMethod::Bilinear,
        InterMethod::Bicubic,
        InterMethod::Area,
        InterMethod::Lanczos4,
    ];

    fn gradient(h: usize, w: usize) -> Array3<u8> {
        Array3::from_shape_fn((h, w, 3), |(y, x, c)| (y * 20 + x * 3 + c) as u8)
    }

    #[test]
    fn test_kernel_weights_sum_to_one() {
        for method in ALL_METHODS {
            for t in [0.0, 0.25, 0.5, 0.9] {
                let (_, weights) = kernel_weights(method, t);
                let sum: f32 = weights.iter().sum();
                assert!((sum - 1.0).abs() < 1e-4, "{method:?} t={t} sum={sum}");
            }
        }
    }

    #[test]
    fn test_uniform_image_stays_uniform() {
        let src = Array3::from_elem((7, 9, 3), 10u8);
        for method in ALL_METHODS {
            for out in [(4, 4), (13, 5), (20, 30)] {
                let mut dst = Array3::zeros((0, 0, 0));
                resize_into(src.view(), &mut dst, out, method);
                assert_eq!(dst.dim(), (out.0, out.1, 3));
                assert!(dst.iter().all(|&v| v == 10), "{method:?} {out:?}");
            }
        }
    }

    #[test]
    fn test_same_size_resize_is_identity() {
        let src = gradient(5, 6);
        for method in ALL_METHODS {
            let mut dst = Array3::zeros((0, 0, 0));
            resize_into(src.view(), &mut dst, (5, 6), method);
            assert_eq!(dst, src, "{method:?}");
        }
    }

    #[test]
    fn test_nearest_downscale_picks_floor_samples() {
        let src = Array3::from_shape_fn((4, 4, 1), |(y, x, _)| (y * 4 + x) as u8);
        let mut dst = Array3::zeros((0, 0, 0));
        resize_into(src.view(), &mut dst, (2, 2), InterMethod::Nearest);
        assert_eq!(dst.into_raw_vec(), vec![0, 2, 8, 10]);
    }

    #[test]
    fn test_nearest_never_invents_values() {
        let src =
            Array3::from_shape_fn((5, 7, 1), |(y, x, _)| if (x + y) % 2 == 0 { 3 } else { 9 });
        for out in [(3, 3), (11, 13), (5, 2)] {
            let mut dst = Array3::zeros((0, 0, 0));
            resize_into(src.view(), &mut dst, out, InterMethod::Nearest);
            assert!(dst.iter().all(|&v| v == 3 || v == 9));
        }
    }

    #[test]
    fn test_area_downscale_averages_blocks() {
        let src = Array3::from_shape_fn((2, 2, 1), |(y, x, _)| [[0u8, 100], [100, 200]][y][x]);
        let mut dst = Array3::zeros((0, 0, 0));
        resize_into(src.view(), &mut dst, (1, 1), InterMethod::Area);
        assert_eq!(dst[[0, 0, 0]], 100);
    }

    #[test]
    fn test_bilinear_upscale_interpolates_between_samples() {
        let src = Array3::from_shape_fn((1, 2, 1), |(_, x, _)| if x == 0 { 0 } else { 200 });
        let mut dst = Array3::zeros((0, 0, 0));
        resize_into(src.view(), &mut dst, (1, 4), InterMethod::Bilinear);
        assert_eq!(dst.into_raw_vec(), vec![0, 50, 150, 200]);
    }

    #[test]
    fn test_identity_warp_copies_source() {
        let src = gradient(6, 5);
        let transform = AffineTransform::identity();
        for method in ALL_METHODS {
            let mut dst = Array3::zeros((0, 0, 0));
            warp_affine_into(src.view(), &mut dst, &transform, (6, 5), method, 255);
            assert_eq!(dst, src, "{method:?}");
        }
    }

    #[test]
    fn test_warp_fills_outside_source() {
        let src = Array3::from_elem((4, 4, 3), 10u8);
        let transform = AffineTransform::new(0.0, 1.0, 4.0, 0.0);
        let mut dst = Array3::zeros((0, 0, 0));
        warp_affine_into(src.view(), &mut dst, &transform, (4, 8), InterMethod::Nearest, 77);
        assert_eq!(dst.dim(), (4, 8, 3));
        assert!(dst.slice(ndarray::s![.., ..4, ..]).iter().all(|&v| v == 77));
        assert!(dst.slice(ndarray::s![.., 4.., ..]).iter().all(|&v| v == 10));
    }
}
