/// Augmentation options and their validation
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::error::{Error, Result};
use crate::interp::ACCEPTED_CODES;

/// Default value of every optional field.
pub mod defaults {
    pub const RESIZE: i32 = -1;
    pub const RAND_CROP: bool = false;
    pub const MAX_ROTATE_ANGLE: i32 = 0;
    pub const MAX_ASPECT_RATIO: f32 = 1.0;
    pub const MIN_ASPECT_RATIO: f32 = 0.1;
    pub const MAX_SHEAR_RATIO: f32 = 0.0;
    pub const MAX_CROP_SIZE: i32 = -1;
    pub const MIN_CROP_SIZE: i32 = -1;
    pub const MAX_RANDOM_SCALE: f32 = 1.0;
    pub const MIN_RANDOM_SCALE: f32 = 1.0;
    pub const MIN_IMG_SIZE: f32 = 0.0;
    pub const MAX_IMG_SIZE: f32 = 1e10;
    pub const RANDOM_H: i32 = 0;
    pub const RANDOM_S: i32 = 0;
    pub const RANDOM_L: i32 = 0;
    pub const ROTATE: i32 = -1;
    pub const ROTATE_LIST: &str = "";
    pub const FILL_VALUE: i32 = 255;
    pub const INTER_METHOD: i32 = 1;
    pub const PAD: i32 = 0;
    pub const RAND_MIRROR: bool = false;
    pub const RAND_MIRROR_PROB: f32 = 0.5;
    pub const LEFT_LANE_ID: i32 = -1;
    pub const RIGHT_LANE_ID: i32 = -1;
    pub const LABEL_SCALE: f32 = 1.0;
}

fn d_resize() -> i32 {
    defaults::RESIZE
}

fn d_rand_crop() -> bool {
    defaults::RAND_CROP
}

fn d_max_rotate_angle() -> i32 {
    defaults::MAX_ROTATE_ANGLE
}

fn d_max_aspect_ratio() -> f32 {
    defaults::MAX_ASPECT_RATIO
}

fn d_min_aspect_ratio() -> f32 {
    defaults::MIN_ASPECT_RATIO
}

fn d_max_shear_ratio() -> f32 {
    defaults::MAX_SHEAR_RATIO
}

fn d_max_crop_size() -> i32 {
    defaults::MAX_CROP_SIZE
}

fn d_min_crop_size() -> i32 {
    defaults::MIN_CROP_SIZE
}

fn d_max_random_scale() -> f32 {
    defaults::MAX_RANDOM_SCALE
}

fn d_min_random_scale() -> f32 {
    defaults::MIN_RANDOM_SCALE
}

fn d_min_img_size() -> f32 {
    defaults::MIN_IMG_SIZE
}

fn d_max_img_size() -> f32 {
    defaults::MAX_IMG_SIZE
}

fn d_random_h() -> i32 {
    defaults::RANDOM_H
}

fn d_random_s() -> i32 {
    defaults::RANDOM_S
}

fn d_random_l() -> i32 {
    defaults::RANDOM_L
}

fn d_rotate() -> i32 {
    defaults::ROTATE
}

fn d_rotate_list() -> String {
    defaults::ROTATE_LIST.to_string()
}

fn d_fill_value() -> i32 {
    defaults::FILL_VALUE
}

fn d_inter_method() -> i32 {
    defaults::INTER_METHOD
}

fn d_pad() -> i32 {
    defaults::PAD
}

fn d_rand_mirror() -> bool {
    defaults::RAND_MIRROR
}

fn d_rand_mirror_prob() -> f32 {
    defaults::RAND_MIRROR_PROB
}

fn d_left_lane_id() -> i32 {
    defaults::LEFT_LANE_ID
}

fn d_right_lane_id() -> i32 {
    defaults::RIGHT_LANE_ID
}

fn d_label_scale() -> f32 {
    defaults::LABEL_SCALE
}

/// Configuration for one augmenter instance, fixed for its lifetime.
///
/// `data_shape` is `[channels, height, width]` of the output image and is the
/// only required field.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct AugmentConfig {
    /// Resize the shorter edge to this size first (-1 = off)
    #[serde(default = "d_resize")]
    pub resize: i32,
    #[serde(default = "d_rand_crop")]
    pub rand_crop: bool,
    /// Rotate by a random integer angle in `[-v, v]` degrees
    #[serde(default = "d_max_rotate_angle")]
    pub max_rotate_angle: i32,
    #[serde(default = "d_max_aspect_ratio")]
    pub max_aspect_ratio: f32,
    #[serde(default = "d_min_aspect_ratio")]
    pub min_aspect_ratio: f32,
    /// Shear `(x, y) -> (x + m*y, y)` with `m` in `[-v, v]`
    #[serde(default = "d_max_shear_ratio")]
    pub max_shear_ratio: f32,
    #[serde(default = "d_max_crop_size")]
    pub max_crop_size: i32,
    #[serde(default = "d_min_crop_size")]
    pub min_crop_size: i32,
    #[serde(default = "d_max_random_scale")]
    pub max_random_scale: f32,
    #[serde(default = "d_min_random_scale")]
    pub min_random_scale: f32,
    #[serde(default = "d_min_img_size")]
    pub min_img_size: f32,
    #[serde(default = "d_max_img_size")]
    pub max_img_size: f32,
    #[serde(default = "d_random_h")]
    pub random_h: i32,
    #[serde(default = "d_random_s")]
    pub random_s: i32,
    #[serde(default = "d_random_l")]
    pub random_l: i32,
    /// Fixed rotation angle; overrides `max_rotate_angle` when positive
    #[serde(default = "d_rotate")]
    pub rotate: i32,
    /// Comma separated angles; a uniformly drawn entry overrides both
    /// `rotate` and `max_rotate_angle`
    #[serde(default = "d_rotate_list")]
    pub rotate_list: String,
    #[serde(default = "d_fill_value")]
    pub fill_value: i32,
    /// 0-NN 1-bilinear 2-cubic 3-area 4-lanczos4 9-auto 10-rand
    #[serde(default = "d_inter_method")]
    pub inter_method: i32,
    #[serde(default = "d_pad")]
    pub pad: i32,
    /// Accepted for compatibility; mirroring is governed by `rand_mirror_prob`
    #[serde(default = "d_rand_mirror")]
    pub rand_mirror: bool,
    #[serde(default = "d_rand_mirror_prob")]
    pub rand_mirror_prob: f32,
    #[serde(default = "d_left_lane_id")]
    pub left_lane_id: i32,
    #[serde(default = "d_right_lane_id")]
    pub right_lane_id: i32,
    pub data_shape: [usize; 3],
    /// Mask-only output scale, matching a coarser prediction stride
    #[serde(default = "d_label_scale")]
    pub label_scale: f32,
}

impl AugmentConfig {
    /// Configuration with every option at its default.
    #[must_use]
    pub fn new(data_shape: [usize; 3]) -> Self {
        AugmentConfig {
            resize: defaults::RESIZE,
            rand_crop: defaults::RAND_CROP,
            max_rotate_angle: defaults::MAX_ROTATE_ANGLE,
            max_aspect_ratio: defaults::MAX_ASPECT_RATIO,
            min_aspect_ratio: defaults::MIN_ASPECT_RATIO,
            max_shear_ratio: defaults::MAX_SHEAR_RATIO,
            max_crop_size: defaults::MAX_CROP_SIZE,
            min_crop_size: defaults::MIN_CROP_SIZE,
            max_random_scale: defaults::MAX_RANDOM_SCALE,
            min_random_scale: defaults::MIN_RANDOM_SCALE,
            min_img_size: defaults::MIN_IMG_SIZE,
            max_img_size: defaults::MAX_IMG_SIZE,
            random_h: defaults::RANDOM_H,
            random_s: defaults::RANDOM_S,
            random_l: defaults::RANDOM_L,
            rotate: defaults::ROTATE,
            rotate_list: defaults::ROTATE_LIST.to_string(),
            fill_value: defaults::FILL_VALUE,
            inter_method: defaults::INTER_METHOD,
            pad: defaults::PAD,
            rand_mirror: defaults::RAND_MIRROR,
            rand_mirror_prob: defaults::RAND_MIRROR_PROB,
            left_lane_id: defaults::LEFT_LANE_ID,
            right_lane_id: defaults::RIGHT_LANE_ID,
            data_shape,
            label_scale: defaults::LABEL_SCALE,
        }
    }

    /// Parse a configuration from a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    /// Check every option once, before any sample is processed.
    pub fn validate(&self) -> Result<()> {
        let [channels, height, width] = self.data_shape;
        if channels == 0 || height == 0 || width == 0 {
            return Err(Error::invalid(
                "data_shape",
                format!("all dimensions must be non-zero, got {:?}", self.data_shape),
            ));
        }
        if channels != 3 {
            return Err(Error::invalid(
                "data_shape",
                format!("expected 3 channels, got {channels}"),
            ));
        }
        if !ACCEPTED_CODES.contains(&self.inter_method) {
            return Err(Error::invalid(
                "inter_method",
                format!("{} is not one of {ACCEPTED_CODES:?}", self.inter_method),
            ));
        }
        if self.resize != -1 && self.resize <= 0 {
            return Err(Error::invalid("resize", "must be -1 or positive"));
        }
        if self.pad < 0 {
            return Err(Error::invalid("pad", "must be non-negative"));
        }
        if self.max_rotate_angle < 0 {
            return Err(Error::invalid("max_rotate_angle", "must be non-negative"));
        }
        if self.random_h < 0 || self.random_s < 0 || self.random_l < 0 {
            return Err(Error::invalid("random_h/random_s/random_l", "must be non-negative"));
        }
        if self.has_crop_range() && (self.max_crop_size <= 0 || self.min_crop_size <= 0) {
            return Err(Error::invalid(
                "min_crop_size/max_crop_size",
                "both must be positive when a crop range is set",
            ));
        }
        if self.label_scale > 0.0 {
            let (h, w) = self.label_dims();
            if h == 0 || w == 0 {
                return Err(Error::invalid(
                    "label_scale",
                    format!("{} shrinks the label map to nothing", self.label_scale),
                ));
            }
        }
        parse_rotate_list(&self.rotate_list)?;
        Ok(())
    }

    /// Output height from `data_shape`.
    #[must_use]
    pub fn target_height(&self) -> usize {
        self.data_shape[1]
    }

    /// Output width from `data_shape`.
    #[must_use]
    pub fn target_width(&self) -> usize {
        self.data_shape[2]
    }

    /// Border colour as a byte.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn fill(&self) -> u8 {
        self.fill_value.clamp(0, 255) as u8
    }

    pub(crate) fn has_crop_range(&self) -> bool {
        self.max_crop_size != -1 || self.min_crop_size != -1
    }

    /// Mask dimensions after label-only scaling, truncated like the output size.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub(crate) fn label_dims(&self) -> (usize, usize) {
        (
            (self.target_height() as f32 * self.label_scale) as usize,
            (self.target_width() as f32 * self.label_scale) as usize,
        )
    }
}

/// Parse a comma separated list of integer angles, e.g. `"0,90,180"`.
///
/// An empty (or all-whitespace) string yields an empty list.
pub fn parse_rotate_list(raw: &str) -> Result<Vec<i32>> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    raw.split(',')
        .map(|item| {
            let item = item.trim();
            item.parse::<i32>().map_err(|e| {
                Error::invalid("rotate_list", format!("{item:?} is not an integer: {e}"))
            })
        })
        .collect()
}
