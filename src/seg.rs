//! The default segmentation augmenter.
//!
//! Image-only mode: resize, affine warp (rotate / shear / scale / aspect),
//! pad, crop, colour jitter.
//!
//! Joint mode: resize, random scale/aspect crop, pad, mirror (with optional
//! left/right class swap), colour jitter, letterbox to the target aspect,
//! resize to target, label-id remap, label-only rescale. Every geometric step
//! is applied to image and mask with the same parameters; the mask is always
//! resampled with nearest neighbour.
//!
//! Random draws happen in a fixed order, so a seeded generator reproduces a
//! sample exactly.

use ndarray::ArrayView3;
use rand::{Rng, RngCore};
use tracing::{debug, info, trace};

use crate::affine::AffineTransform;
use crate::augmenter::{Augmenter, SegSample, Stages, Workspace};
use crate::color::ColorJitter;
use crate::config::{defaults, parse_rotate_list, AugmentConfig};
use crate::error::{Error, Result};
use crate::geometry::{crop_into, flip_horizontal_into, pad_into, Border, Rect};
use crate::interp::{ensure_image_mode_code, ensure_joint_mode_code, InterMethod};
use crate::labels::{remap_labels_into, swap_lanes, LabelIdMap, LanePair, IGNORE_LABEL};
use crate::resample::{resize_into, warp_affine_into};

/// Segmentation augmenter; immutable after construction.
#[derive(Clone, Debug)]
pub struct SegAugmenter {
    config: AugmentConfig,
    rotate_list: Vec<i32>,
    jitter: ColorJitter,
    lanes: Option<LanePair>,
}

impl SegAugmenter {
    /// Registry name
    pub const NAME: &'static str = "seg_aug_default";

    /// Validate `config` and parse `rotate_list` once.
    pub fn new(config: AugmentConfig) -> Result<Self> {
        config.validate()?;
        let rotate_list = parse_rotate_list(&config.rotate_list)?;
        let jitter = ColorJitter::new(config.random_h, config.random_s, config.random_l);
        let lanes = LanePair::new(config.left_lane_id, config.right_lane_id);
        info!(
            data_shape = ?config.data_shape,
            inter_method = config.inter_method,
            rotate_choices = rotate_list.len(),
            "segmentation augmenter ready"
        );
        Ok(SegAugmenter {
            config,
            rotate_list,
            jitter,
            lanes,
        })
    }

    #[must_use]
    pub fn config(&self) -> &AugmentConfig {
        &self.config
    }

    fn fill(&self) -> u8 {
        self.config.fill()
    }

    /// Whether any option of the image-only affine step differs from its default
    #[allow(clippy::float_cmp)]
    fn wants_affine(&self) -> bool {
        let c = &self.config;
        c.max_rotate_angle > 0
            || c.max_shear_ratio > 0.0
            || c.rotate > 0
            || !self.rotate_list.is_empty()
            || c.max_random_scale != defaults::MAX_RANDOM_SCALE
            || c.min_random_scale != defaults::MIN_RANDOM_SCALE
            || c.max_aspect_ratio != defaults::MAX_ASPECT_RATIO
            || c.max_img_size != defaults::MAX_IMG_SIZE
            || c.min_img_size != defaults::MIN_IMG_SIZE
    }

    /// Whether the joint random scale/aspect crop runs
    #[allow(clippy::float_cmp)]
    fn wants_scale_crop(&self) -> bool {
        let c = &self.config;
        c.max_random_scale != 1.0
            || c.min_random_scale != 1.0
            || (c.max_aspect_ratio > 0.0 && c.min_aspect_ratio > 0.0)
    }

    /// Draw the warp parameters and warp the image.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    fn random_affine(&self, img: &mut Stages<'_, '_>, rng: &mut dyn RngCore) -> Result<()> {
        let c = &self.config;
        let (h, w) = img.dims();

        let shear = rng.gen::<f32>() * c.max_shear_ratio * 2.0 - c.max_shear_ratio;
        let mut angle = rng.gen_range(-c.max_rotate_angle..=c.max_rotate_angle);
        if c.rotate > 0 {
            angle = c.rotate;
        }
        if !self.rotate_list.is_empty() {
            angle = self.rotate_list[rng.gen_range(0..self.rotate_list.len())];
        }
        let scale =
            rng.gen::<f32>() * (c.max_random_scale - c.min_random_scale) + c.min_random_scale;
        let ratio = rng.gen::<f32>() * c.max_aspect_ratio * 2.0 - c.max_aspect_ratio + 1.0;
        let hs = 2.0 * scale / (1.0 + ratio);
        let ws = ratio * hs;

        let new_w = c.min_img_size.max(c.max_img_size.min(scale * w as f32));
        let new_h = c.min_img_size.max(c.max_img_size.min(scale * h as f32));
        let (out_w, out_h) = (new_w as usize, new_h as usize);
        if out_w == 0 || out_h == 0 {
            return Err(Error::invalid(
                "max_random_scale/min_img_size",
                format!("affine output {new_w}x{new_h} is empty"),
            ));
        }

        let transform =
            AffineTransform::augment(angle as f32, shear, hs, ws, (w, h), (new_w, new_h));
        ensure_image_mode_code(c.inter_method)?;
        let method = InterMethod::select(c.inter_method, (w, h), (out_w, out_h), rng)?;
        debug!(angle, shear, scale, ratio, out_w, out_h, ?method, "affine warp");

        let fill = self.fill();
        img.apply(|src, dst| warp_affine_into(src, dst, &transform, (out_h, out_w), method, fill));
        Ok(())
    }

    /// Crop (and possibly resize) the image to `data_shape`.
    #[allow(clippy::cast_sign_loss)]
    fn crop_to_target(&self, img: &mut Stages<'_, '_>, rng: &mut dyn RngCore) -> Result<()> {
        let c = &self.config;
        let (th, tw) = (c.target_height(), c.target_width());
        let (h, w) = img.dims();

        if c.has_crop_range() {
            // both sizes are positive after validation
            let (min_size, max_size) = (c.min_crop_size as usize, c.max_crop_size as usize);
            if w < max_size || h < max_size || max_size < min_size {
                return Err(Error::CropTooLarge {
                    width: w,
                    height: h,
                    max_crop_size: c.max_crop_size,
                    min_crop_size: c.min_crop_size,
                });
            }
            let size = rng.gen_range(min_size..=max_size);
            let (x, y) = self.crop_origin(w - size, h - size, rng);
            let roi = Rect::new(x, y, size, size);
            let method = InterMethod::select(c.inter_method, (size, size), (tw, th), rng)?;
            debug!(?roi, ?method, "crop range");
            img.apply(|src, dst| resize_into(roi.view(src), dst, (th, tw), method));
        } else {
            if h < th || w < tw {
                return Err(Error::ImageSmallerThanShape {
                    width: w,
                    height: h,
                    target_width: tw,
                    target_height: th,
                });
            }
            let (x, y) = self.crop_origin(w - tw, h - th, rng);
            let roi = Rect::new(x, y, tw, th);
            debug!(?roi, "crop to data shape");
            img.apply(|src, dst| crop_into(src, dst, roi));
        }
        Ok(())
    }

    /// Random origin within the margins when `rand_crop` is set, else centred.
    /// Draws y before x.
    fn crop_origin(
        &self,
        margin_x: usize,
        margin_y: usize,
        rng: &mut dyn RngCore,
    ) -> (usize, usize) {
        if self.config.rand_crop {
            let y = rng.gen_range(0..=margin_y);
            let x = rng.gen_range(0..=margin_x);
            (x, y)
        } else {
            (margin_x / 2, margin_y / 2)
        }
    }

    /// Random scale / aspect-ratio crop rectangle for a `w` x `h` raster.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    fn scale_crop_rect(&self, w: usize, h: usize, rng: &mut dyn RngCore) -> Rect {
        let c = &self.config;
        let mut scale = 1.0_f32;
        if c.max_random_scale >= c.min_random_scale {
            scale = rng.gen::<f32>() * (c.max_random_scale - c.min_random_scale)
                + c.min_random_scale;
        }
        let min_ratio = c.min_aspect_ratio.max(scale * scale);
        let max_ratio = c.max_aspect_ratio.min(1.0 / scale / scale);
        let mut ratio = 1.0_f32;
        if max_ratio > min_ratio {
            ratio = (rng.gen::<f32>() * (max_ratio - min_ratio) + min_ratio).sqrt();
        }
        let ws = scale * ratio;
        let hs = scale / ratio;
        let left = rng.gen::<f32>() * (1.0 - ws);
        let top = rng.gen::<f32>() * (1.0 - hs);
        debug!(scale, ratio, left, top, "scale/aspect crop");

        let (wf, hf) = (w as f32, h as f32);
        Rect::new(
            (left * wf) as usize,
            (top * hf) as usize,
            (ws * wf) as usize,
            (hs * hf) as usize,
        )
        .clamp_to(w, h)
    }
}

/// Output `(height, width)` when scaling the shorter edge to `size`.
fn shorter_edge_size(size: usize, h: usize, w: usize) -> (usize, usize) {
    if h > w {
        (size * h / w, size)
    } else {
        (size, size * w / h)
    }
}

/// Symmetric border bringing an `oh` x `ow` raster to the `th` x `tw` aspect.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn letterbox_border(oh: usize, ow: usize, th: usize, tw: usize) -> Border {
    let (oh, ow, th, tw) = (oh as f64, ow as f64, th as f64, tw as f64);
    if oh / ow > th / tw {
        Border::horizontal(((oh * tw / th - ow) / 2.0) as usize)
    } else if ow / oh > tw / th {
        Border::vertical(((ow * th / tw - oh) / 2.0) as usize)
    } else {
        Border::default()
    }
}

fn check_image(image: &ArrayView3<'_, u8>) -> Result<()> {
    let (h, w, channels) = image.dim();
    if channels != 3 || h == 0 || w == 0 {
        return Err(Error::ShapeMismatch {
            expected: "non-empty (H, W, 3) image".to_string(),
            actual: format!("{:?}", image.dim()),
        });
    }
    Ok(())
}

fn check_mask(mask: &ArrayView3<'_, u8>, image: &ArrayView3<'_, u8>) -> Result<()> {
    let (h, w, _) = image.dim();
    if mask.dim() != (h, w, 1) {
        return Err(Error::ShapeMismatch {
            expected: format!("({h}, {w}, 1) mask"),
            actual: format!("{:?}", mask.dim()),
        });
    }
    Ok(())
}

impl Augmenter for SegAugmenter {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    #[allow(clippy::cast_sign_loss)]
    fn process_image<'w>(
        &self,
        image: ArrayView3<'_, u8>,
        rng: &mut dyn RngCore,
        ws: &'w mut Workspace,
    ) -> Result<ArrayView3<'w, u8>> {
        check_image(&image)?;
        let c = &self.config;
        let mut img = Stages::new(image, &mut ws.image);

        if c.resize != -1 {
            let (h, w) = img.dims();
            let (new_h, new_w) = shorter_edge_size(c.resize as usize, h, w);
            ensure_image_mode_code(c.inter_method)?;
            let method = InterMethod::select(c.inter_method, (w, h), (new_w, new_h), rng)?;
            debug!(new_w, new_h, ?method, "resize shorter edge");
            img.apply(|src, dst| resize_into(src, dst, (new_h, new_w), method));
        }

        if self.wants_affine() {
            self.random_affine(&mut img, rng)?;
        }

        if c.pad > 0 {
            let border = Border::uniform(c.pad as usize);
            let fill = self.fill();
            img.apply(|src, dst| pad_into(src, dst, border, fill));
        }

        self.crop_to_target(&mut img, rng)?;

        if !self.jitter.is_noop() {
            img.modify(|buf| self.jitter.apply(buf, &mut *rng));
        }

        Ok(img.finish())
    }

    #[allow(clippy::cast_sign_loss)]
    fn process_with_mask<'w>(
        &self,
        image: ArrayView3<'_, u8>,
        mask: ArrayView3<'_, u8>,
        rng: &mut dyn RngCore,
        label_map: &LabelIdMap,
        ws: &'w mut Workspace,
    ) -> Result<SegSample<'w>> {
        check_image(&image)?;
        check_mask(&mask, &image)?;
        let c = &self.config;
        let Workspace {
            image: image_buffers,
            mask: mask_buffers,
        } = ws;
        let mut img = Stages::new(image, image_buffers);
        let mut lbl = Stages::new(mask, mask_buffers);

        if c.resize != -1 {
            let (h, w) = img.dims();
            let (new_h, new_w) = shorter_edge_size(c.resize as usize, h, w);
            ensure_joint_mode_code(c.inter_method)?;
            let method = InterMethod::select(c.inter_method, (w, h), (new_w, new_h), rng)?;
            debug!(new_w, new_h, ?method, "resize shorter edge");
            img.apply(|src, dst| resize_into(src, dst, (new_h, new_w), method));
            lbl.apply(|src, dst| resize_into(src, dst, (new_h, new_w), InterMethod::Nearest));
        }

        if self.wants_scale_crop() {
            let (h, w) = img.dims();
            let roi = self.scale_crop_rect(w, h, rng);
            img.apply(|src, dst| crop_into(src, dst, roi));
            lbl.apply(|src, dst| crop_into(src, dst, roi));
        }

        if c.pad > 0 {
            let border = Border::uniform(c.pad as usize);
            let fill = self.fill();
            img.apply(|src, dst| pad_into(src, dst, border, fill));
            lbl.apply(|src, dst| pad_into(src, dst, border, IGNORE_LABEL));
        }

        let mirror_enabled = c.rand_mirror_prob > 0.0 && c.rand_mirror_prob <= 1.0;
        if mirror_enabled && rng.gen::<f32>() < c.rand_mirror_prob {
            debug!(lanes = ?self.lanes, "mirror");
            img.apply(flip_horizontal_into);
            lbl.apply(flip_horizontal_into);
            if let Some(pair) = self.lanes {
                lbl.modify(|buf| swap_lanes(buf, pair));
            }
        }

        if !self.jitter.is_noop() {
            img.modify(|buf| self.jitter.apply(buf, &mut *rng));
        }

        let (th, tw) = (c.target_height(), c.target_width());
        let (oh, ow) = img.dims();
        let border = letterbox_border(oh, ow, th, tw);
        if border.is_empty() {
            trace!(ow, oh, "same aspect ratio");
        } else {
            debug!(?border, "letterbox");
            let fill = self.fill();
            img.apply(|src, dst| pad_into(src, dst, border, fill));
            lbl.apply(|src, dst| pad_into(src, dst, border, IGNORE_LABEL));
        }

        let (h, w) = img.dims();
        let method = InterMethod::select(c.inter_method, (w, h), (tw, th), rng)?;
        img.apply(|src, dst| resize_into(src, dst, (th, tw), method));
        lbl.apply(|src, dst| resize_into(src, dst, (th, tw), InterMethod::Nearest));
        debug_assert_eq!(img.dims(), lbl.dims());

        lbl.apply(|src, dst| remap_labels_into(src, dst, label_map));

        if c.label_scale > 0.0 {
            let (lh, lw) = c.label_dims();
            lbl.apply(|src, dst| resize_into(src, dst, (lh, lw), InterMethod::Nearest));
        }

        Ok(SegSample {
            image: img.finish(),
            mask: lbl.finish(),
        })
    }
}
