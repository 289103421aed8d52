/// Crop, pad and flip helpers shared by images and label masks
use ndarray::{s, Array3, ArrayView3};

/// Axis-aligned region in pixel coordinates
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rect {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

impl Rect {
    #[must_use]
    pub fn new(x: usize, y: usize, width: usize, height: usize) -> Self {
        Rect {
            x,
            y,
            width,
            height,
        }
    }

    /// Borrow the region out of `src`.
    ///
    /// # Panics
    /// Panics if the region extends past the edge of `src`.
    #[must_use]
    pub fn view<'a>(&self, src: ArrayView3<'a, u8>) -> ArrayView3<'a, u8> {
        src.slice_move(s![self.y..self.y + self.height, self.x..self.x + self.width, ..])
    }

    /// Shrink the rectangle so it lies inside a `width` x `height` raster,
    /// keeping at least one pixel on each axis.
    #[must_use]
    pub fn clamp_to(self, width: usize, height: usize) -> Self {
        let x = self.x.min(width.saturating_sub(1));
        let y = self.y.min(height.saturating_sub(1));
        Rect {
            x,
            y,
            width: self.width.clamp(1, width - x),
            height: self.height.clamp(1, height - y),
        }
    }
}

/// Constant border widths in pixels
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Border {
    pub top: usize,
    pub bottom: usize,
    pub left: usize,
    pub right: usize,
}

impl Border {
    #[must_use]
    pub fn uniform(size: usize) -> Self {
        Border {
            top: size,
            bottom: size,
            left: size,
            right: size,
        }
    }

    #[must_use]
    pub fn horizontal(size: usize) -> Self {
        Border {
            left: size,
            right: size,
            ..Border::default()
        }
    }

    #[must_use]
    pub fn vertical(size: usize) -> Self {
        Border {
            top: size,
            bottom: size,
            ..Border::default()
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.top == 0 && self.bottom == 0 && self.left == 0 && self.right == 0
    }
}

/// Reallocate `buf` only when its shape differs from `shape`.
pub(crate) fn ensure_shape(buf: &mut Array3<u8>, shape: (usize, usize, usize)) {
    if buf.dim() != shape {
        *buf = Array3::zeros(shape);
    }
}

/// Copy `src` into `dst` unchanged.
pub fn copy_into(src: ArrayView3<'_, u8>, dst: &mut Array3<u8>) {
    ensure_shape(dst, src.dim());
    dst.assign(&src);
}

/// Copy the `roi` region of `src` into `dst`.
///
/// # Panics
/// Panics if `roi` extends past the edge of `src`.
pub fn crop_into(src: ArrayView3<'_, u8>, dst: &mut Array3<u8>, roi: Rect) {
    let region = roi.view(src);
    ensure_shape(dst, region.dim());
    dst.assign(&region);
}

/// Surround `src` with a constant `fill` border.
pub fn pad_into(src: ArrayView3<'_, u8>, dst: &mut Array3<u8>, border: Border, fill: u8) {
    let (h, w, channels) = src.dim();
    ensure_shape(
        dst,
        (
            border.top + h + border.bottom,
            border.left + w + border.right,
            channels,
        ),
    );
    dst.fill(fill);
    dst.slice_mut(s![border.top..border.top + h, border.left..border.left + w, ..])
        .assign(&src);
}

/// Mirror `src` left to right.
pub fn flip_horizontal_into(src: ArrayView3<'_, u8>, dst: &mut Array3<u8>) {
    ensure_shape(dst, src.dim());
    dst.assign(&src.slice(s![.., ..;-1, ..]));
}
