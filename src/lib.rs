//! Randomized image / label-mask augmentation for semantic segmentation.
//!
//! [`SegAugmenter`] turns one stored (image, mask) pair into one fixed-size
//! training sample, mirroring every geometric change onto the mask while
//! colour jitter and label remapping touch only one side.

pub mod affine;
pub mod augmenter;
pub mod color;
pub mod config;
pub mod error;
pub mod geometry;
pub mod interp;
pub mod labels;
pub mod record;
pub mod resample;
pub mod seg;

#[cfg(feature = "python")]
mod python;

pub use augmenter::{Augmenter, AugmenterRegistry, SegSample, Workspace};
pub use config::AugmentConfig;
pub use error::{Error, Result};
pub use interp::InterMethod;
pub use labels::{LabelIdMap, IGNORE_LABEL};
pub use record::{SegRecord, SegRecordHeader};
pub use seg::SegAugmenter;
